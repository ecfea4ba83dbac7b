//! Hard-constraint filtering of route candidates.

use serde::{Deserialize, Serialize};

use crate::models::Route;
use crate::request::RouteConstraints;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    MaxDistance,
    MaxTime,
    MaxSlope,
    AvoidHazards,
}

impl ConstraintKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MaxDistance => "max_distance",
            Self::MaxTime => "max_time",
            Self::MaxSlope => "max_slope",
            Self::AvoidHazards => "avoid_hazards",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub route_id: String,
    pub constraint: ConstraintKind,
    pub limit: f64,
    pub actual: f64,
}

impl Violation {
    /// How far past the limit, relative to it.
    fn overshoot(&self) -> f64 {
        if self.limit > 0.0 {
            (self.actual - self.limit) / self.limit
        } else {
            self.actual
        }
    }

    fn describe(&self) -> String {
        match self.constraint {
            ConstraintKind::MaxDistance => format!(
                "{}: distance {:.0} m exceeds {:.0} m",
                self.route_id, self.actual, self.limit
            ),
            ConstraintKind::MaxTime => format!(
                "{}: travel time {:.0} s exceeds {:.0} s",
                self.route_id, self.actual, self.limit
            ),
            ConstraintKind::MaxSlope => format!(
                "{}: slope {:.1} deg exceeds {:.1} deg",
                self.route_id, self.actual, self.limit
            ),
            ConstraintKind::AvoidHazards => format!(
                "{}: crosses {} hazard(s)",
                self.route_id, self.actual as usize
            ),
        }
    }
}

/// Which constraints could be met, which candidates broke them, and
/// non-fatal concerns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintReport {
    pub satisfied: Vec<String>,
    pub violated: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub accepted: Vec<Route>,
    pub rejected: Vec<(Route, Vec<Violation>)>,
    pub report: ConstraintReport,
    /// No candidate passed, so `accepted` holds the least-bad one.
    pub least_bad: bool,
}

/// Every constraint `route` breaks. `enforce_hazards` toggles the hazard check.
pub fn violations(route: &Route, constraints: &RouteConstraints, enforce_hazards: bool) -> Vec<Violation> {
    let mut found = Vec::new();
    let mut check = |constraint, limit: Option<f64>, actual: f64| {
        if let Some(limit) = limit {
            if actual > limit {
                found.push(Violation {
                    route_id: route.id.clone(),
                    constraint,
                    limit,
                    actual,
                });
            }
        }
    };
    check(ConstraintKind::MaxDistance, constraints.max_distance_m, route.total_distance_m);
    check(ConstraintKind::MaxTime, constraints.max_time_s, route.total_time_s);
    check(ConstraintKind::MaxSlope, constraints.max_slope_deg, route.max_slope_deg);
    if enforce_hazards {
        check(ConstraintKind::AvoidHazards, Some(0.0), route.hazard_count() as f64);
    }
    found
}

fn active_constraints(constraints: &RouteConstraints) -> Vec<ConstraintKind> {
    let mut active = Vec::new();
    if constraints.max_distance_m.is_some() {
        active.push(ConstraintKind::MaxDistance);
    }
    if constraints.max_time_s.is_some() {
        active.push(ConstraintKind::MaxTime);
    }
    if constraints.max_slope_deg.is_some() {
        active.push(ConstraintKind::MaxSlope);
    }
    if constraints.avoid_hazards {
        active.push(ConstraintKind::AvoidHazards);
    }
    active
}

/// Drop candidates breaking hard limits and build the constraint report.
///
/// When hazard avoidance is requested but every candidate crosses a hazard,
/// the hazard check becomes a warning. When every candidate still fails, the
/// one with the fewest violations (then the smallest overshoot) is kept.
pub fn validate_routes(routes: Vec<Route>, constraints: &RouteConstraints) -> Validation {
    let mut validation = Validation::default();
    if routes.is_empty() {
        return validation;
    }

    let hazard_free_exists = routes.iter().any(|r| r.hazard_count() == 0);
    let enforce_hazards = constraints.avoid_hazards && hazard_free_exists;
    if constraints.avoid_hazards && !hazard_free_exists {
        validation
            .report
            .warnings
            .push("no completely hazard-free route exists".to_string());
    }

    for route in routes {
        let found = violations(&route, constraints, enforce_hazards);
        if found.is_empty() {
            validation.accepted.push(route);
        } else {
            validation
                .report
                .violated
                .extend(found.iter().map(Violation::describe));
            validation.rejected.push((route, found));
        }
    }

    for kind in active_constraints(constraints) {
        let breaks = |route: &Route| {
            violations(route, constraints, enforce_hazards)
                .iter()
                .any(|v| v.constraint == kind)
        };
        let someone_meets = validation.accepted.iter().any(|r| !breaks(r))
            || validation.rejected.iter().any(|(r, _)| !breaks(r));
        let hazard_downgraded = kind == ConstraintKind::AvoidHazards && !enforce_hazards;
        if someone_meets && !hazard_downgraded {
            validation.report.satisfied.push(kind.as_str().to_string());
        }
    }

    if validation.accepted.is_empty() {
        let best_idx = validation
            .rejected
            .iter()
            .enumerate()
            .min_by(|(_, (_, a)), (_, (_, b))| {
                let overshoot = |v: &Vec<Violation>| v.iter().map(Violation::overshoot).sum::<f64>();
                a.len()
                    .cmp(&b.len())
                    .then_with(|| overshoot(a).total_cmp(&overshoot(b)))
            })
            .map(|(idx, _)| idx);
        if let Some(idx) = best_idx {
            let (route, _) = validation.rejected.remove(idx);
            validation.report.warnings.push(format!(
                "all candidates violate constraints; returning least-bad route {}",
                route.id
            ));
            validation.accepted.push(route);
            validation.least_bad = true;
        }
    }

    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        EmergencyPriority, OptimizationMetadata, RoadCondition, RoadType, RouteSegment,
        RouteSegmentProperties, RouteVariant, SegmentAccessibility, VehicleType,
    };
    use crate::spatial::Coordinate;

    fn route(id: &str, distance_m: f64, slope_deg: f64, hazards: usize) -> Route {
        let segment = RouteSegment {
            street_id: Some(id.to_string()),
            start: Coordinate::new(0.0, 0.0),
            end: Coordinate::new(0.01, 0.0),
            geometry: vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.01, 0.0)],
            properties: RouteSegmentProperties {
                distance_m,
                travel_time_s: distance_m / 10.0,
                elevation_gain_m: 0.0,
                elevation_loss_m: 0.0,
                slope_deg,
                road_type: RoadType::Local,
                condition: RoadCondition::Good,
                lit: true,
                hazards_detected: (0..hazards).map(|i| format!("h{i}")).collect(),
                traffic: Vec::new(),
                accessibility: SegmentAccessibility::default(),
            },
        };
        Route::assemble(
            id.to_string(),
            Vec::new(),
            vec![segment],
            VehicleType::Civilian,
            EmergencyPriority::Low,
            OptimizationMetadata {
                method: "a_star".to_string(),
                variant: RouteVariant::DirectShortest,
                performance_score: 100.0,
                reliability_score: 100.0,
                nodes_visited: 1,
            },
        )
    }

    #[test]
    fn drops_routes_over_distance_limit() {
        let constraints = RouteConstraints {
            max_distance_m: Some(1_000.0),
            ..RouteConstraints::default()
        };
        let result = validate_routes(vec![route("a", 900.0, 0.0, 0), route("b", 1_500.0, 0.0, 0)], &constraints);
        assert_eq!(result.accepted.len(), 1);
        assert_eq!(result.accepted[0].id, "a");
        assert_eq!(result.report.satisfied, vec!["max_distance"]);
        assert_eq!(result.report.violated.len(), 1);
        assert!(!result.least_bad);
    }

    #[test]
    fn hazardous_routes_dropped_when_clean_one_exists() {
        let constraints = RouteConstraints {
            avoid_hazards: true,
            ..RouteConstraints::default()
        };
        let result = validate_routes(vec![route("risky", 500.0, 0.0, 2), route("clean", 900.0, 0.0, 0)], &constraints);
        assert_eq!(result.accepted.len(), 1);
        assert_eq!(result.accepted[0].id, "clean");
        assert!(result.report.warnings.is_empty());
        assert_eq!(result.report.satisfied, vec!["avoid_hazards"]);
    }

    #[test]
    fn unavoidable_hazard_becomes_warning() {
        let constraints = RouteConstraints {
            avoid_hazards: true,
            ..RouteConstraints::default()
        };
        let result = validate_routes(vec![route("a", 500.0, 0.0, 1), route("b", 700.0, 0.0, 1)], &constraints);
        assert_eq!(result.accepted.len(), 2);
        assert_eq!(
            result.report.warnings,
            vec!["no completely hazard-free route exists".to_string()]
        );
        assert!(result.report.satisfied.is_empty());
    }

    #[test]
    fn all_failing_returns_least_bad_with_warning() {
        let constraints = RouteConstraints {
            max_distance_m: Some(100.0),
            max_slope_deg: Some(5.0),
            ..RouteConstraints::default()
        };
        let result = validate_routes(
            vec![
                route("both", 300.0, 10.0, 0),
                route("far", 400.0, 1.0, 0),
                route("close", 150.0, 1.0, 0),
            ],
            &constraints,
        );
        assert!(result.least_bad);
        assert_eq!(result.accepted.len(), 1);
        assert_eq!(result.accepted[0].id, "close");
        assert_eq!(result.rejected.len(), 2);
        assert_eq!(result.report.satisfied, vec!["max_slope"]);
        assert!(result.report.warnings[0].contains("least-bad"));
    }

    #[test]
    fn no_constraints_accepts_everything() {
        let result = validate_routes(vec![route("a", 1e6, 45.0, 3)], &RouteConstraints::default());
        assert_eq!(result.accepted.len(), 1);
        assert_eq!(result.report, ConstraintReport::default());
    }
}
