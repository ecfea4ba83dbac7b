//! Plain-text summary of an optimization result.

use siren_core::{OptimizationResult, Route};
use std::fmt::Write;

fn route_line(label: &str, route: &Route) -> String {
    format!(
        "{label} {} [{}]: {:.2} km, {:.1} min, max slope {:.1} deg, {} hazards",
        route.name,
        route.optimization.method,
        route.total_distance_m / 1000.0,
        route.total_time_s / 60.0,
        route.max_slope_deg,
        route.hazard_count()
    )
}

pub fn render_summary(result: &OptimizationResult) -> String {
    let mut out = String::new();
    if !result.success {
        let _ = writeln!(
            out,
            "Optimization failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
        return out;
    }

    let _ = writeln!(
        out,
        "{} candidate(s) in {:.1} ms{}{}",
        result.routes.len(),
        result.optimization_time_ms,
        if result.cached { " (cached)" } else { "" },
        if result.degraded { " (degraded)" } else { "" }
    );
    match &result.best_route {
        Some(best) => {
            let _ = writeln!(out, "{}", route_line("Best:", best));
        }
        None => {
            let _ = writeln!(out, "No route found.");
        }
    }
    for (idx, alt) in result.alternatives.iter().enumerate() {
        let _ = writeln!(out, "{}", route_line(&format!("Alt {}:", idx + 1), alt));
    }

    if let Some(terrain) = &result.terrain {
        let _ = writeln!(
            out,
            "Terrain: safety {:.0}, obstacle avoidance {:.0}%, road coverage {:.0}%",
            terrain.safety_score, terrain.obstacle_avoidance_pct, terrain.road_coverage_pct
        );
    }

    let report = &result.constraints;
    if !report.satisfied.is_empty() {
        let _ = writeln!(out, "Satisfied: {}", report.satisfied.join(", "));
    }
    for violation in &report.violated {
        let _ = writeln!(out, "Violated: {violation}");
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "Warning: {warning}");
    }
    for recommendation in &result.recommendations {
        let _ = writeln!(out, "- {recommendation}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_core::RoutingError;

    #[test]
    fn failure_prints_error() {
        let result = OptimizationResult::failure(
            &RoutingError::MissingCoordinate("origin".to_string()),
            0.2,
        );
        let text = render_summary(&result);
        assert!(text.starts_with("Optimization failed: missing coordinate: origin"));
    }

    #[test]
    fn empty_success_mentions_missing_route_and_warnings() {
        let mut result = OptimizationResult::failure(&RoutingError::InvalidRequest(String::new()), 1.0);
        result.success = true;
        result.error = None;
        result.error_kind = None;
        result.constraints.warnings.push("no path connects the requested stops".to_string());
        let text = render_summary(&result);
        assert!(text.contains("0 candidate(s)"));
        assert!(text.contains("No route found."));
        assert!(text.contains("Warning: no path connects"));
    }
}
