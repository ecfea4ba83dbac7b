//! Server configuration from environment.

use std::env;
use std::str::FromStr;

use siren_core::{AnalysisConfig, SearchConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub street_provider_url: String,
    pub street_data_path: String,
    pub street_timeout_s: u64,
    pub street_retries: u32,
    pub street_retry_backoff_ms: u64,
    pub street_query_padding_m: f64,
    pub terrain_provider_url: String,
    pub terrain_timeout_s: u64,
    pub obstacle_overpass_url: String,
    pub obstacle_timeout_s: u64,
    pub cache_capacity: usize,
    pub max_expanded_nodes: usize,
    pub terrain_samples: usize,
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn text(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            street_provider_url: String::new(),
            street_data_path: String::new(),
            street_timeout_s: 8,
            street_retries: 1,
            street_retry_backoff_ms: 250,
            street_query_padding_m: 500.0,
            terrain_provider_url: "https://api.open-meteo.com/v1/elevation".to_string(),
            terrain_timeout_s: 5,
            obstacle_overpass_url: String::new(),
            obstacle_timeout_s: 10,
            cache_capacity: 100,
            max_expanded_nodes: SearchConfig::default().max_expanded_nodes,
            terrain_samples: AnalysisConfig::default().samples,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parsed("SIREN_PORT", defaults.server_port),
            street_provider_url: text("SIREN_STREET_PROVIDER_URL", ""),
            street_data_path: text("SIREN_STREET_DATA_PATH", ""),
            street_timeout_s: parsed("SIREN_STREET_TIMEOUT_S", defaults.street_timeout_s),
            street_retries: parsed("SIREN_STREET_RETRIES", defaults.street_retries),
            street_retry_backoff_ms: parsed(
                "SIREN_STREET_RETRY_BACKOFF_MS",
                defaults.street_retry_backoff_ms,
            ),
            street_query_padding_m: parsed(
                "SIREN_STREET_QUERY_PADDING_M",
                defaults.street_query_padding_m,
            ),
            terrain_provider_url: text("SIREN_TERRAIN_PROVIDER_URL", &defaults.terrain_provider_url),
            terrain_timeout_s: parsed("SIREN_TERRAIN_TIMEOUT_S", defaults.terrain_timeout_s),
            obstacle_overpass_url: text("SIREN_OBSTACLE_OVERPASS_URL", ""),
            obstacle_timeout_s: parsed("SIREN_OBSTACLE_TIMEOUT_S", defaults.obstacle_timeout_s),
            cache_capacity: parsed("SIREN_CACHE_CAPACITY", defaults.cache_capacity),
            max_expanded_nodes: parsed("SIREN_MAX_EXPANDED_NODES", defaults.max_expanded_nodes),
            terrain_samples: parsed("SIREN_TERRAIN_SAMPLES", defaults.terrain_samples),
        }
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            max_expanded_nodes: self.max_expanded_nodes.max(1),
        }
    }

    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            samples: self.terrain_samples.max(2),
            ..AnalysisConfig::default()
        }
    }
}
