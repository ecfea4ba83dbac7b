//! Street network index with endpoint-grid connectivity.
//!
//! Two segments are connected when an endpoint of one lies within
//! [`CONNECTION_TOLERANCE_M`] of an endpoint of the other. Endpoints are
//! bucketed into a uniform grid whose cells are at least the tolerance wide,
//! so a connectivity lookup only inspects the 3x3 neighbouring cells.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::RoutingError;
use crate::models::{SegmentId, StreetSegment};
use crate::spatial::{distance_to_polyline_m, meters_to_lat, meters_to_lon, midpoint, Coordinate};

pub const CONNECTION_TOLERANCE_M: f64 = 50.0;

/// Access filters applied to a street query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreetFilters {
    pub emergency_access_only: bool,
    pub evacuation_routes_only: bool,
}

impl StreetFilters {
    pub fn accepts(&self, segment: &StreetSegment) -> bool {
        (!self.emergency_access_only || segment.properties.emergency_access)
            && (!self.evacuation_routes_only || segment.properties.evacuation_route)
    }
}

/// Geographic query sent to the street data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreetQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_access_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evacuation_routes_only: Option<bool>,
}

impl StreetQuery {
    /// Query covering origin, destination and waypoints plus a padding ring.
    pub fn covering(points: &[Coordinate], padding_m: f64) -> Option<Self> {
        let first = points.first()?;
        let last = points.last()?;
        let center = midpoint(first, last);
        let reach = points
            .iter()
            .map(|p| p.distance_to(&center))
            .fold(0.0, f64::max);
        Some(Self {
            latitude: center.lat,
            longitude: center.lon,
            radius_meters: reach + padding_m.max(0.0),
            emergency_access_only: None,
            evacuation_routes_only: None,
        })
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.longitude, self.latitude)
    }

    pub fn filters(&self) -> StreetFilters {
        StreetFilters {
            emergency_access_only: self.emergency_access_only.unwrap_or(false),
            evacuation_routes_only: self.evacuation_routes_only.unwrap_or(false),
        }
    }
}

type CellKey = (i64, i64);

#[derive(Debug, Clone)]
pub struct StreetNetwork {
    segments: Vec<StreetSegment>,
    index_by_id: HashMap<SegmentId, usize>,
    endpoint_grid: HashMap<CellKey, Vec<usize>>,
    cell_lat_deg: f64,
    cell_lon_deg: f64,
    tolerance_m: f64,
}

impl Default for StreetNetwork {
    fn default() -> Self {
        Self::build(Vec::new(), CONNECTION_TOLERANCE_M)
    }
}

impl StreetNetwork {
    /// Build an index from raw segments, normalizing each one.
    ///
    /// Malformed segments and duplicate ids are skipped and returned so the
    /// caller can log them.
    pub fn from_segments(raw: Vec<StreetSegment>) -> (Self, Vec<RoutingError>) {
        let mut rejected = Vec::new();
        let mut seen = HashSet::new();
        let mut segments = Vec::with_capacity(raw.len());
        for segment in raw {
            if seen.contains(&segment.id) {
                rejected.push(RoutingError::MalformedSegment {
                    id: segment.id,
                    reason: "duplicate id".to_string(),
                });
                continue;
            }
            match segment.normalized() {
                Ok(segment) => {
                    seen.insert(segment.id.clone());
                    segments.push(segment);
                }
                Err(err) => rejected.push(err),
            }
        }
        (Self::build(segments, CONNECTION_TOLERANCE_M), rejected)
    }

    fn build(segments: Vec<StreetSegment>, tolerance_m: f64) -> Self {
        // Cells span at least the tolerance in haversine meters at every
        // endpoint latitude. The 1% margin covers ellipsoid vs sphere.
        let cell_m = tolerance_m * 1.01;
        let max_abs_lat = segments
            .iter()
            .flat_map(|s| [s.start().lat.abs(), s.end().lat.abs()])
            .fold(0.0, f64::max)
            .min(89.0);
        let cell_lat_deg = meters_to_lat(cell_m, 0.0);
        let cell_lon_deg = meters_to_lon(cell_m, max_abs_lat);

        let mut network = Self {
            index_by_id: HashMap::with_capacity(segments.len()),
            endpoint_grid: HashMap::new(),
            segments,
            cell_lat_deg,
            cell_lon_deg,
            tolerance_m,
        };
        for idx in 0..network.segments.len() {
            let id = network.segments[idx].id.clone();
            network.index_by_id.insert(id, idx);
            for endpoint in [network.segments[idx].start(), network.segments[idx].end()] {
                let cell = network.cell_of(&endpoint);
                let bucket = network.endpoint_grid.entry(cell).or_default();
                if !bucket.contains(&idx) {
                    bucket.push(idx);
                }
            }
        }
        network
    }

    fn cell_of(&self, coord: &Coordinate) -> CellKey {
        (
            (coord.lon / self.cell_lon_deg).floor() as i64,
            (coord.lat / self.cell_lat_deg).floor() as i64,
        )
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[StreetSegment] {
        &self.segments
    }

    pub fn get(&self, id: &str) -> Option<&StreetSegment> {
        self.index_by_id.get(id).map(|idx| &self.segments[*idx])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn segment_at(&self, idx: usize) -> &StreetSegment {
        &self.segments[idx]
    }

    /// Segments intersecting a circle that pass the access filters.
    pub fn query(
        &self,
        center: &Coordinate,
        radius_m: f64,
        filters: &StreetFilters,
    ) -> Vec<StreetSegment> {
        self.segments
            .iter()
            .filter(|segment| filters.accepts(segment))
            .filter(|segment| distance_to_polyline_m(center, &segment.geometry) <= radius_m)
            .cloned()
            .collect()
    }

    /// Indices of segments connected to `idx`, ascending.
    pub fn neighbors(&self, idx: usize) -> Vec<usize> {
        let Some(segment) = self.segments.get(idx) else {
            return Vec::new();
        };
        let endpoints = [segment.start(), segment.end()];
        let mut found = Vec::new();
        for endpoint in &endpoints {
            let (cx, cy) = self.cell_of(endpoint);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let cell = (cx.saturating_add(dx), cy.saturating_add(dy));
                    let Some(bucket) = self.endpoint_grid.get(&cell) else {
                        continue;
                    };
                    for &other in bucket {
                        if other == idx || found.contains(&other) {
                            continue;
                        }
                        let candidate = &self.segments[other];
                        let touches = [candidate.start(), candidate.end()]
                            .iter()
                            .any(|p| p.distance_to(endpoint) <= self.tolerance_m);
                        if touches {
                            found.push(other);
                        }
                    }
                }
            }
        }
        found.sort_unstable();
        found
    }

    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(a), Some(b)) => self.neighbors(a).contains(&b),
            _ => false,
        }
    }

    /// Segment closest to a coordinate; ties go to the lowest index.
    pub fn nearest_segment(&self, coord: &Coordinate) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, segment) in self.segments.iter().enumerate() {
            let dist = distance_to_polyline_m(coord, &segment.geometry);
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((idx, dist)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Distance from a coordinate to the closest segment, in meters.
    pub fn distance_to_network_m(&self, coord: &Coordinate) -> f64 {
        self.segments
            .iter()
            .map(|segment| distance_to_polyline_m(coord, &segment.geometry))
            .fold(f64::INFINITY, f64::min)
    }

    /// New network restricted to the given segments.
    pub fn with_segments(&self, segments: Vec<StreetSegment>) -> Self {
        Self::build(segments, self.tolerance_m)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::chain;
    use super::*;
    use crate::models::StreetProperties;

    #[test]
    fn chain_segments_are_connected_end_to_end() {
        let (network, rejected) = StreetNetwork::from_segments(chain(4, StreetProperties::default()));
        assert!(rejected.is_empty());
        assert_eq!(network.neighbors(0), vec![1]);
        assert_eq!(network.neighbors(1), vec![0, 2]);
        assert!(network.are_connected("s2", "s3"));
        assert!(!network.are_connected("s0", "s3"));
    }

    #[test]
    fn endpoints_within_tolerance_connect_across_gap() {
        let gap = meters_to_lon(30.0, 37.77);
        let segments = vec![
            StreetSegment {
                id: "a".to_string(),
                geometry: vec![Coordinate::new(-122.42, 37.77), Coordinate::new(-122.419, 37.77)],
                properties: StreetProperties::default(),
            },
            StreetSegment {
                id: "b".to_string(),
                geometry: vec![
                    Coordinate::new(-122.419 + gap, 37.77),
                    Coordinate::new(-122.418, 37.77),
                ],
                properties: StreetProperties::default(),
            },
        ];
        let (network, _) = StreetNetwork::from_segments(segments);
        assert!(network.are_connected("a", "b"));
    }

    #[test]
    fn malformed_and_duplicate_segments_are_rejected() {
        let mut segments = chain(2, StreetProperties::default());
        segments.push(segments[0].clone());
        segments.push(StreetSegment {
            id: "broken".to_string(),
            geometry: vec![Coordinate::new(-122.4, 37.7)],
            properties: StreetProperties::default(),
        });
        let (network, rejected) = StreetNetwork::from_segments(segments);
        assert_eq!(network.len(), 2);
        assert_eq!(rejected.len(), 2);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let mut segments = chain(2, StreetProperties::default());
        let last = segments[1].end();
        segments.push(StreetSegment {
            id: "bad".to_string(),
            geometry: vec![last, Coordinate::new(1e30, 37.78)],
            properties: StreetProperties::default(),
        });
        segments.push(StreetSegment {
            id: "polar".to_string(),
            geometry: vec![last, Coordinate::new(last.lon, 91.0)],
            properties: StreetProperties::default(),
        });
        let (network, rejected) = StreetNetwork::from_segments(segments);
        assert_eq!(network.len(), 2);
        assert_eq!(rejected.len(), 2);
        assert!(rejected
            .iter()
            .all(|err| matches!(err, RoutingError::MalformedSegment { .. })));
        assert_eq!(network.neighbors(1), vec![0]);
    }

    #[test]
    fn connections_hold_far_poleward_of_first_segment() {
        let lon = 10.0;
        let gap = meters_to_lon(45.0, 70.001);
        let segments = vec![
            StreetSegment {
                id: "equator".to_string(),
                geometry: vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.001, 0.0)],
                properties: StreetProperties::default(),
            },
            StreetSegment {
                id: "a".to_string(),
                geometry: vec![Coordinate::new(lon, 70.0), Coordinate::new(lon, 70.001)],
                properties: StreetProperties::default(),
            },
            StreetSegment {
                id: "b".to_string(),
                geometry: vec![
                    Coordinate::new(lon + gap, 70.001),
                    Coordinate::new(lon + gap, 70.002),
                ],
                properties: StreetProperties::default(),
            },
        ];
        let (network, rejected) = StreetNetwork::from_segments(segments);
        assert!(rejected.is_empty());
        let a = network.get("a").unwrap();
        let b = network.get("b").unwrap();
        assert!(a.end().distance_to(&b.start()) < CONNECTION_TOLERANCE_M);
        assert!(network.are_connected("a", "b"));
        assert!(!network.are_connected("equator", "a"));
    }

    #[test]
    fn query_applies_radius_and_filters() {
        let mut segments = chain(5, StreetProperties::default());
        segments[0].properties.emergency_access = true;
        let (network, _) = StreetNetwork::from_segments(segments);
        let center = Coordinate::new(-122.42, 37.77);

        let near = network.query(&center, 150.0, &StreetFilters::default());
        assert_eq!(near.len(), 2);

        let filters = StreetFilters {
            emergency_access_only: true,
            evacuation_routes_only: false,
        };
        let emergency = network.query(&center, 10_000.0, &filters);
        assert_eq!(emergency.len(), 1);
        assert_eq!(emergency[0].id, "s0");
    }

    #[test]
    fn nearest_segment_picks_closest() {
        let (network, _) = StreetNetwork::from_segments(chain(3, StreetProperties::default()));
        let point = network.segment_at(2).center();
        assert_eq!(network.nearest_segment(&point), Some(2));
        assert_eq!(StreetNetwork::default().nearest_segment(&point), None);
    }

    #[test]
    fn covering_query_reaches_all_points() {
        let points = [Coordinate::new(-122.42, 37.77), Coordinate::new(-122.40, 37.79)];
        let query = StreetQuery::covering(&points, 500.0).unwrap();
        let center = query.center();
        for p in &points {
            assert!(p.distance_to(&center) <= query.radius_meters);
        }
    }
}
