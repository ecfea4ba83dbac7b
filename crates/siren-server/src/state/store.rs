//! In-memory state store using DashMap.

use dashmap::DashMap;
use siren_core::{HazardZone, OptimizationRequest, OptimizationResult, TrafficCondition};

use crate::config::Config;
use crate::optimizer::RouteOptimizer;

/// Application state: hazard/traffic overlays plus the optimizer.
///
/// Any overlay mutation clears the optimization cache, since cached results
/// were computed against the old overlays.
pub struct AppState {
    config: Config,
    optimizer: RouteOptimizer,
    hazards: DashMap<String, HazardZone>,
    traffic: DashMap<String, TrafficCondition>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let optimizer = RouteOptimizer::from_config(&config);
        Self::with_optimizer(config, optimizer)
    }

    pub fn with_optimizer(config: Config, optimizer: RouteOptimizer) -> Self {
        Self {
            config,
            optimizer,
            hazards: DashMap::new(),
            traffic: DashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn optimizer(&self) -> &RouteOptimizer {
        &self.optimizer
    }

    /// Optimize against a snapshot of the current overlays.
    pub async fn optimize(&self, request: &OptimizationRequest) -> OptimizationResult {
        let hazards = self.get_hazards();
        let traffic = self.get_traffic();
        self.optimizer.optimize(request, &hazards, &traffic).await
    }

    fn invalidate_routes(&self) {
        if !self.optimizer.cache().is_empty() {
            tracing::debug!("Overlay changed, clearing optimization cache");
            self.optimizer.cache().clear();
        }
    }

    // ========== HAZARDS ==========

    /// Insert or replace a hazard zone.
    pub fn upsert_hazard(&self, zone: HazardZone) {
        self.hazards.insert(zone.id.clone(), zone);
        self.invalidate_routes();
    }

    pub fn get_hazard(&self, id: &str) -> Option<HazardZone> {
        self.hazards.get(id).map(|r| r.value().clone())
    }

    /// All zones, ordered by id.
    pub fn get_hazards(&self) -> Vec<HazardZone> {
        let mut zones: Vec<HazardZone> = self.hazards.iter().map(|r| r.value().clone()).collect();
        zones.sort_by(|a, b| a.id.cmp(&b.id));
        zones
    }

    pub fn remove_hazard(&self, id: &str) -> bool {
        let removed = self.hazards.remove(id).is_some();
        if removed {
            self.invalidate_routes();
        }
        removed
    }

    // ========== TRAFFIC ==========

    pub fn upsert_traffic(&self, condition: TrafficCondition) {
        self.traffic.insert(condition.id.clone(), condition);
        self.invalidate_routes();
    }

    pub fn get_traffic(&self) -> Vec<TrafficCondition> {
        let mut all: Vec<TrafficCondition> =
            self.traffic.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn remove_traffic(&self, id: &str) -> bool {
        let removed = self.traffic.remove(id).is_some();
        if removed {
            self.invalidate_routes();
        }
        removed
    }
}
