//! Geometry helpers shared by the street index, pathfinding and analysis stages.

use serde::{Deserialize, Serialize};

/// A WGS84 position. Serialized as a `[lon, lat]` array, the order used by
/// GeoJSON and the dashboard payloads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    /// Finite and within |lon| <= 180, |lat| <= 90.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.lon.abs() <= 180.0 && self.lat.abs() <= 90.0
    }

    /// Great-circle distance to another coordinate in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance(self.lat, self.lon, other.lat, other.lon)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(value: [f64; 2]) -> Self {
        Self {
            lon: value[0],
            lat: value[1],
        }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(value: Coordinate) -> Self {
        [value.lon, value.lat]
    }
}

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters using the Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Geographic midpoint of two coordinates along the great circle.
pub fn midpoint(a: &Coordinate, b: &Coordinate) -> Coordinate {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let lambda1 = a.lon.to_radians();
    let dlambda = (b.lon - a.lon).to_radians();

    let bx = phi2.cos() * dlambda.cos();
    let by = phi2.cos() * dlambda.sin();
    let phi_m = (phi1.sin() + phi2.sin()).atan2(((phi1.cos() + bx).powi(2) + by * by).sqrt());
    let lambda_m = lambda1 + by.atan2(phi1.cos() + bx);

    Coordinate::new(lambda_m.to_degrees(), phi_m.to_degrees())
}

/// Total length of a polyline in meters.
pub fn polyline_length_m(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance_to(&pair[1]))
        .sum()
}

/// Point halfway along a polyline by travelled distance.
///
/// Falls back to the first vertex for zero-length lines.
pub fn polyline_center(points: &[Coordinate]) -> Option<Coordinate> {
    let total = polyline_length_m(points);
    if total <= f64::EPSILON {
        return points.first().copied();
    }
    interpolate_along(points, 0.5)
}

/// Position at `fraction` (0..=1) of the travelled distance along a polyline.
pub fn interpolate_along(points: &[Coordinate], fraction: f64) -> Option<Coordinate> {
    let first = *points.first()?;
    if points.len() == 1 {
        return Some(first);
    }
    let total = polyline_length_m(points);
    if total <= f64::EPSILON {
        return Some(first);
    }
    let target = total * fraction.clamp(0.0, 1.0);
    let mut travelled = 0.0;
    for pair in points.windows(2) {
        let leg = pair[0].distance_to(&pair[1]);
        if travelled + leg >= target {
            let t = if leg > 0.0 { (target - travelled) / leg } else { 0.0 };
            return Some(Coordinate::new(
                pair[0].lon + (pair[1].lon - pair[0].lon) * t,
                pair[0].lat + (pair[1].lat - pair[0].lat) * t,
            ));
        }
        travelled += leg;
    }
    points.last().copied()
}

/// Evenly spaced samples along a polyline, endpoints included.
pub fn sample_polyline(points: &[Coordinate], count: usize) -> Vec<Coordinate> {
    if points.is_empty() || count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return points.first().copied().into_iter().collect();
    }
    (0..count)
        .filter_map(|idx| interpolate_along(points, idx as f64 / (count - 1) as f64))
        .collect()
}

// ==== ENU (East-North-Up) Coordinate Conversion ====

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Convert a north/south offset in meters to degrees latitude.
pub fn meters_to_lat(meters: f64, ref_lat_deg: f64) -> f64 {
    meters / meters_per_deg_lat(ref_lat_deg).max(1e-9)
}

/// Convert an east/west offset in meters to degrees longitude.
pub fn meters_to_lon(meters: f64, ref_lat_deg: f64) -> f64 {
    meters / meters_per_deg_lon(ref_lat_deg).max(1e-9)
}

/// Calculate bearing from point 1 to point 2 in radians.
/// Returns bearing in radians, 0 = north, π/2 = east.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Offset a position by distance and bearing.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_m` - Distance in meters
/// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Minimum distance from a point to a line segment in meters.
///
/// Projects into a local ENU frame anchored at the segment start, which is
/// accurate for street-scale segments.
pub fn distance_to_segment_m(point: &Coordinate, seg_start: &Coordinate, seg_end: &Coordinate) -> f64 {
    let ref_lat = seg_start.lat;
    let m_lat = meters_per_deg_lat(ref_lat);
    let m_lon = meters_per_deg_lon(ref_lat);

    let px = (point.lon - seg_start.lon) * m_lon;
    let py = (point.lat - seg_start.lat) * m_lat;
    let sx = (seg_end.lon - seg_start.lon) * m_lon;
    let sy = (seg_end.lat - seg_start.lat) * m_lat;

    let seg_len_sq = sx * sx + sy * sy;
    if seg_len_sq < 0.0001 {
        return (px * px + py * py).sqrt();
    }

    let t = ((px * sx + py * sy) / seg_len_sq).clamp(0.0, 1.0);
    let dx = px - t * sx;
    let dy = py - t * sy;
    (dx * dx + dy * dy).sqrt()
}

/// Minimum distance from a point to any leg of a polyline, in meters.
pub fn distance_to_polyline_m(point: &Coordinate, polyline: &[Coordinate]) -> f64 {
    match polyline {
        [] => f64::INFINITY,
        [only] => point.distance_to(only),
        _ => polyline
            .windows(2)
            .map(|pair| distance_to_segment_m(point, &pair[0], &pair[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Ray-casting point-in-polygon test. Vertices are `[lon, lat]` coordinates.
pub fn point_in_polygon(point: &Coordinate, polygon: &[Coordinate]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (polygon[i].lon, polygon[i].lat);
        let (xj, yj) = (polygon[j].lon, polygon[j].lat);
        if ((yi > point.lat) != (yj > point.lat))
            && (point.lon < (xj - xi) * (point.lat - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_distance(37.77, -122.42, 37.77, -122.42);
        assert!(dist < 0.001);
    }

    #[test]
    fn coordinate_serializes_as_lon_lat_array() {
        let coord = Coordinate::new(-122.42, 37.77);
        let json = serde_json::to_string(&coord).unwrap();
        assert_eq!(json, "[-122.42,37.77]");
        let back: Coordinate = serde_json::from_str("[-122.4,37.79]").unwrap();
        assert_eq!(back, Coordinate::new(-122.4, 37.79));
    }

    #[test]
    fn coordinate_validity_checks_range() {
        assert!(Coordinate::new(-180.0, 90.0).is_valid());
        assert!(Coordinate::new(180.0, -90.0).is_valid());
        assert!(!Coordinate::new(180.5, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -90.5).is_valid());
        assert!(!Coordinate::new(1e30, 37.78).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn midpoint_is_equidistant() {
        let a = Coordinate::new(-122.42, 37.77);
        let b = Coordinate::new(-122.40, 37.79);
        let mid = midpoint(&a, &b);
        let da = mid.distance_to(&a);
        let db = mid.distance_to(&b);
        assert!((da - db).abs() < 0.5, "da={da} db={db}");
    }

    #[test]
    fn polyline_center_splits_travelled_distance() {
        let line = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.001),
            Coordinate::new(0.0, 0.003),
        ];
        let center = polyline_center(&line).unwrap();
        assert!((center.lat - 0.0015).abs() < 1e-6);
    }

    #[test]
    fn sample_polyline_includes_endpoints() {
        let line = vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.01, 0.0)];
        let samples = sample_polyline(&line, 5);
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0], line[0]);
        assert!((samples[4].lon - 0.01).abs() < 1e-9);
    }

    #[test]
    fn distance_to_segment_measures_perpendicular_offset() {
        let start = Coordinate::new(-117.0, 33.0);
        let end = Coordinate::new(-116.99, 33.0);
        let north = meters_to_lat(40.0, 33.0);
        let point = Coordinate::new(-116.995, 33.0 + north);
        let dist = distance_to_segment_m(&point, &start, &end);
        assert!((dist - 40.0).abs() < 0.5, "got {dist}");
    }

    #[test]
    fn point_in_polygon_handles_square() {
        let square = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(0.0, 1.0),
        ];
        assert!(point_in_polygon(&Coordinate::new(0.5, 0.5), &square));
        assert!(!point_in_polygon(&Coordinate::new(1.5, 0.5), &square));
    }
}
