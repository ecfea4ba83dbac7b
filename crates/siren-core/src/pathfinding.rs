//! A* search over the implicit street-segment graph.
//!
//! Nodes are segment indices in a [`StreetNetwork`]; edges connect segments
//! whose endpoints touch. `g` accumulates [`EdgeCost`] including the start
//! segment, and `h` is the great-circle distance in km between segment
//! centers. Equal f-scores are ordered by g and then by segment index, so a
//! given input always yields the same path.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::cost::EdgeCost;
use crate::error::{Result, RoutingError};
use crate::models::StreetSegment;
use crate::street_index::StreetNetwork;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Expansion bound; the search gives up (truncated) beyond it.
    pub max_expanded_nodes: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_expanded_nodes: 50_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathResult {
    /// Chain of connected segments from start to end. Empty when no path exists.
    pub segments: Vec<StreetSegment>,
    pub total_cost: f64,
    pub nodes_visited: usize,
    /// True when the expansion bound stopped the search.
    pub truncated: bool,
}

impl PathResult {
    pub fn found(&self) -> bool {
        !self.segments.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    segment: usize,
    g_score: FloatOrd,
    f_score: FloatOrd,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
            .then_with(|| self.segment.cmp(&other.segment))
    }
}

/// Find the minimum-cost chain of connected segments between two segment ids.
///
/// Unknown ids are an error; an unreachable destination is not, and yields an
/// empty [`PathResult`].
pub fn find_path<C: EdgeCost + ?Sized>(
    network: &StreetNetwork,
    start_id: &str,
    end_id: &str,
    cost: &C,
    config: &SearchConfig,
) -> Result<PathResult> {
    let start = network
        .index_of(start_id)
        .ok_or_else(|| RoutingError::UnknownSegment(start_id.to_string()))?;
    let end = network
        .index_of(end_id)
        .ok_or_else(|| RoutingError::UnknownSegment(end_id.to_string()))?;
    Ok(search(network, start, end, cost, config))
}

/// A* between two segment indices of `network`.
pub fn search<C: EdgeCost + ?Sized>(
    network: &StreetNetwork,
    start: usize,
    end: usize,
    cost: &C,
    config: &SearchConfig,
) -> PathResult {
    if start >= network.len() || end >= network.len() {
        return PathResult::default();
    }

    let goal_center = network.segment_at(end).center();
    let heuristic = |idx: usize| network.segment_at(idx).center().distance_to(&goal_center) / 1000.0;
    let edge_cost = |idx: usize| {
        let value = cost.cost(network.segment_at(idx));
        if value.is_finite() && value >= 0.0 {
            value
        } else {
            f64::INFINITY
        }
    };

    let start_g = edge_cost(start);
    if !start_g.is_finite() {
        return PathResult::default();
    }

    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    let mut closed_set: HashSet<usize> = HashSet::new();
    let mut g_score: HashMap<usize, f64> = HashMap::new();
    let mut came_from: HashMap<usize, usize> = HashMap::new();

    g_score.insert(start, start_g);
    open_set.push(Reverse(OpenNode {
        segment: start,
        g_score: FloatOrd(start_g),
        f_score: FloatOrd(start_g + heuristic(start)),
    }));

    let mut nodes_visited = 0usize;
    let mut reached = false;
    let mut truncated = false;

    while let Some(Reverse(current)) = open_set.pop() {
        if closed_set.contains(&current.segment) {
            continue;
        }
        let best_g = g_score
            .get(&current.segment)
            .copied()
            .unwrap_or(f64::INFINITY);
        if current.g_score.0 > best_g + 1e-12 {
            continue;
        }

        nodes_visited += 1;
        if current.segment == end {
            reached = true;
            break;
        }
        if nodes_visited >= config.max_expanded_nodes {
            truncated = true;
            break;
        }

        closed_set.insert(current.segment);

        for next in network.neighbors(current.segment) {
            if closed_set.contains(&next) {
                continue;
            }
            let step = edge_cost(next);
            if !step.is_finite() {
                continue;
            }
            let tentative_g = best_g + step;
            if tentative_g < g_score.get(&next).copied().unwrap_or(f64::INFINITY) {
                came_from.insert(next, current.segment);
                g_score.insert(next, tentative_g);
                open_set.push(Reverse(OpenNode {
                    segment: next,
                    g_score: FloatOrd(tentative_g),
                    f_score: FloatOrd(tentative_g + heuristic(next)),
                }));
            }
        }
    }

    if !reached {
        return PathResult {
            segments: Vec::new(),
            total_cost: 0.0,
            nodes_visited,
            truncated,
        };
    }

    let mut indices = vec![end];
    let mut cursor = end;
    while let Some(prev) = came_from.get(&cursor) {
        indices.push(*prev);
        cursor = *prev;
    }
    indices.reverse();

    PathResult {
        segments: indices
            .into_iter()
            .map(|idx| network.segment_at(idx).clone())
            .collect(),
        total_cost: g_score.get(&end).copied().unwrap_or(0.0),
        nodes_visited,
        truncated: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostModel;
    use crate::models::{RouteVariant, StreetProperties, VehicleType};
    use crate::spatial::{meters_to_lat, meters_to_lon, Coordinate};
    use crate::street_index::test_support::chain;
    use crate::vehicle::filter_segments;

    fn seg(id: &str, from: Coordinate, to: Coordinate, props: StreetProperties) -> StreetSegment {
        StreetSegment {
            id: id.to_string(),
            geometry: vec![from, to],
            properties: props,
        }
    }

    /// Two parallel routes from A to B: a short northern one with a bad
    /// segment and a longer southern detour.
    fn diamond(north_props: StreetProperties) -> StreetNetwork {
        let lat = 37.77;
        let dx = meters_to_lon(200.0, lat);
        let dy = meters_to_lat(150.0, lat);
        let a = Coordinate::new(-122.42, lat);
        let n = Coordinate::new(-122.42 + dx, lat + dy);
        let s1 = Coordinate::new(-122.42 + dx * 0.5, lat - dy * 1.5);
        let s2 = Coordinate::new(-122.42 + dx * 1.5, lat - dy * 1.5);
        let b = Coordinate::new(-122.42 + dx * 2.0, lat);
        let end = Coordinate::new(-122.42 + dx * 3.0, lat);
        let start = Coordinate::new(-122.42 - dx, lat);
        let plain = StreetProperties::default();
        let (network, _) = StreetNetwork::from_segments(vec![
            seg("start", start, a, plain.clone()),
            seg("north_a", a, n, north_props),
            seg("north_b", n, b, plain.clone()),
            seg("south_a", a, s1, plain.clone()),
            seg("south_b", s1, s2, plain.clone()),
            seg("south_c", s2, b, plain.clone()),
            seg("end", b, end, plain),
        ]);
        network
    }

    fn ids(result: &PathResult) -> Vec<&str> {
        result.segments.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn finds_straight_chain() {
        let (network, _) = StreetNetwork::from_segments(chain(6, StreetProperties::default()));
        let cost = |s: &StreetSegment| s.length_km();
        let result = find_path(&network, "s0", "s5", &cost, &SearchConfig::default()).unwrap();
        assert_eq!(ids(&result), vec!["s0", "s1", "s2", "s3", "s4", "s5"]);
        assert!(!result.truncated);
    }

    #[test]
    fn start_equals_end_returns_single_segment() {
        let (network, _) = StreetNetwork::from_segments(chain(3, StreetProperties::default()));
        let cost = |s: &StreetSegment| s.length_km();
        let result = find_path(&network, "s1", "s1", &cost, &SearchConfig::default()).unwrap();
        assert_eq!(ids(&result), vec!["s1"]);
    }

    #[test]
    fn prefers_shorter_branch_when_costs_are_plain() {
        let network = diamond(StreetProperties::default());
        let cost = |s: &StreetSegment| s.length_km();
        let result = find_path(&network, "start", "end", &cost, &SearchConfig::default()).unwrap();
        assert_eq!(ids(&result), vec!["start", "north_a", "north_b", "end"]);
    }

    #[test]
    fn penalties_divert_around_hazard_segment() {
        let network = diamond(StreetProperties {
            hazard_zone: true,
            ..StreetProperties::default()
        });
        let model = CostModel::new(VehicleType::Civilian, RouteVariant::DirectShortest);
        let result = find_path(&network, "start", "end", &model, &SearchConfig::default()).unwrap();
        assert_eq!(
            ids(&result),
            vec!["start", "south_a", "south_b", "south_c", "end"]
        );
    }

    #[test]
    fn disconnected_graph_returns_empty_path() {
        let mut segments = chain(2, StreetProperties::default());
        segments.push(seg(
            "island",
            Coordinate::new(-122.30, 37.70),
            Coordinate::new(-122.299, 37.70),
            StreetProperties::default(),
        ));
        let (network, _) = StreetNetwork::from_segments(segments);
        let cost = |s: &StreetSegment| s.length_km();
        let result = find_path(&network, "s0", "island", &cost, &SearchConfig::default()).unwrap();
        assert!(!result.found());
        assert!(!result.truncated);
    }

    #[test]
    fn unknown_segment_is_an_error() {
        let (network, _) = StreetNetwork::from_segments(chain(2, StreetProperties::default()));
        let cost = |s: &StreetSegment| s.length_km();
        let err = find_path(&network, "s0", "nope", &cost, &SearchConfig::default()).unwrap_err();
        assert_eq!(err, RoutingError::UnknownSegment("nope".to_string()));
    }

    #[test]
    fn expansion_bound_truncates_search() {
        let (network, _) = StreetNetwork::from_segments(chain(20, StreetProperties::default()));
        let cost = |s: &StreetSegment| s.length_km();
        let config = SearchConfig {
            max_expanded_nodes: 3,
        };
        let result = find_path(&network, "s0", "s19", &cost, &config).unwrap();
        assert!(!result.found());
        assert!(result.truncated);
    }

    #[test]
    fn path_has_no_repeated_segments_and_respects_vehicle_filter() {
        let mut segments = chain(8, StreetProperties {
            emergency_access: true,
            ..StreetProperties::default()
        });
        segments[3].properties.max_weight_kg = Some(1_000.0);
        let filtered = filter_segments(&segments, VehicleType::FireEngine);
        let (network, _) = StreetNetwork::from_segments(filtered);
        let model = CostModel::new(VehicleType::FireEngine, RouteVariant::DirectShortest);

        let blocked = find_path(&network, "s0", "s7", &model, &SearchConfig::default()).unwrap();
        assert!(!blocked.found(), "the only bridge is too weak for a fire engine");

        let ok = find_path(&network, "s4", "s7", &model, &SearchConfig::default()).unwrap();
        let mut seen = HashSet::new();
        for segment in &ok.segments {
            assert!(seen.insert(segment.id.clone()), "segment repeated: {}", segment.id);
            assert!(crate::vehicle::VehicleProfile::for_vehicle(VehicleType::FireEngine)
                .permits(segment));
        }
    }

    #[test]
    fn infinite_cost_segments_are_impassable() {
        let (network, _) = StreetNetwork::from_segments(chain(4, StreetProperties::default()));
        let cost = |s: &StreetSegment| if s.id == "s2" { f64::INFINITY } else { s.length_km() };
        let result = find_path(&network, "s0", "s3", &cost, &SearchConfig::default()).unwrap();
        assert!(!result.found());
    }
}
