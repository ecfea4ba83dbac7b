//! Vehicle profiles and the street-segment constraint filter.

use serde::Serialize;

use crate::models::{StreetSegment, VehicleType};

/// Fixed physical/operational limits of a vehicle class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VehicleProfile {
    pub vehicle_type: VehicleType,
    pub weight_kg: f64,
    pub height_m: f64,
    pub width_m: f64,
    pub min_lanes: u32,
    pub require_emergency_access: bool,
    pub avoid_hazard_zones: bool,
}

const PROFILES: [VehicleProfile; 5] = [
    VehicleProfile {
        vehicle_type: VehicleType::Civilian,
        weight_kg: 2_000.0,
        height_m: 2.0,
        width_m: 2.0,
        min_lanes: 1,
        require_emergency_access: false,
        avoid_hazard_zones: true,
    },
    VehicleProfile {
        vehicle_type: VehicleType::FireEngine,
        weight_kg: 15_000.0,
        height_m: 3.5,
        width_m: 2.5,
        min_lanes: 1,
        require_emergency_access: true,
        avoid_hazard_zones: false,
    },
    VehicleProfile {
        vehicle_type: VehicleType::Ambulance,
        weight_kg: 5_000.0,
        height_m: 3.0,
        width_m: 2.3,
        min_lanes: 1,
        require_emergency_access: true,
        avoid_hazard_zones: false,
    },
    VehicleProfile {
        vehicle_type: VehicleType::PoliceCar,
        weight_kg: 2_500.0,
        height_m: 1.8,
        width_m: 2.0,
        min_lanes: 1,
        require_emergency_access: true,
        avoid_hazard_zones: false,
    },
    VehicleProfile {
        vehicle_type: VehicleType::RescueTruck,
        weight_kg: 12_000.0,
        height_m: 3.4,
        width_m: 2.5,
        min_lanes: 1,
        require_emergency_access: true,
        avoid_hazard_zones: false,
    },
];

impl VehicleProfile {
    pub fn for_vehicle(vehicle_type: VehicleType) -> &'static VehicleProfile {
        PROFILES
            .iter()
            .find(|profile| profile.vehicle_type == vehicle_type)
            .unwrap_or(&PROFILES[0])
    }

    /// Check whether a single segment is usable by this vehicle.
    pub fn permits(&self, segment: &StreetSegment) -> bool {
        let props = &segment.properties;
        let fits = |capacity: Option<f64>, need: f64| capacity.map_or(true, |cap| cap >= need);

        if !fits(props.max_weight_kg, self.weight_kg)
            || !fits(props.max_height_m, self.height_m)
            || !fits(props.max_width_m, self.width_m)
        {
            return false;
        }
        if props.lanes < self.min_lanes {
            return false;
        }
        if self.require_emergency_access && !props.emergency_access {
            return false;
        }
        if self.avoid_hazard_zones && props.hazard_zone {
            return false;
        }
        true
    }
}

/// Narrow a segment set to those usable by `vehicle_type`.
pub fn filter_segments(segments: &[StreetSegment], vehicle_type: VehicleType) -> Vec<StreetSegment> {
    let profile = VehicleProfile::for_vehicle(vehicle_type);
    segments
        .iter()
        .filter(|segment| profile.permits(segment))
        .cloned()
        .collect()
}
