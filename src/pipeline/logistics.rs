//! Logistics stage: one costed route per destination market.
//!
//! Pairs missing from the distance table get a random distance in
//! [`FALLBACK_DISTANCE_KM`]. That value is simulation noise standing in for a
//! mapping lookup, not a geocoding result, so tests that need exact routes
//! either use known pairs or a fixed jitter source.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, info};

use crate::error::PlannerError;
use crate::jitter::JitterSource;
use crate::reference::ReferenceData;
use crate::trace::ExecutionTrace;
use crate::types::{LogisticsPlan, Route, RouteDetails, TransportRequirements, VehicleType};

// Tools: distance_km, estimate_transport_cost, generate_route, transport_requirements

pub const FALLBACK_DISTANCE_KM: (u32, u32) = (100, 1100);
const BASE_SPEED_KMH: f64 = 50.0;
const WAYPOINT_THRESHOLD_KM: f64 = 500.0;
const TOLL_RATE_PER_KM: f64 = 0.05;
const COST_SPREAD: f64 = 0.10;
const REFRIGERATION_THRESHOLD_KG: f64 = 5000.0;

pub fn distance_km(
    reference: &ReferenceData,
    from: &str,
    to: &str,
    jitter: &mut dyn JitterSource,
) -> f64 {
    match reference.known_distance(from, to) {
        Some(km) => km,
        None => {
            let (lo, hi) = FALLBACK_DISTANCE_KM;
            let km = f64::from(jitter.int_inclusive(lo, hi));
            debug!("🗺️ No distance for {} -> {}, using simulated {} km", from, to, km);
            km
        }
    }
}

/// `distance × rate × tons`, jittered ±10% and rounded to whole currency units.
pub fn estimate_transport_cost(
    reference: &ReferenceData,
    distance_km: f64,
    quantity_kg: f64,
    vehicle: VehicleType,
    jitter: &mut dyn JitterSource,
) -> f64 {
    let rate = reference.transport_rate(vehicle);
    let base_cost = distance_km * rate * (quantity_kg / 1000.0);
    (base_cost * jitter.factor(1.0, COST_SPREAD)).round()
}

pub fn generate_route(
    reference: &ReferenceData,
    origin: &str,
    destination: &str,
    quantity_kg: f64,
    jitter: &mut dyn JitterSource,
) -> Route {
    let distance = distance_km(reference, origin, destination, jitter);

    let roads = &reference.road_conditions;
    let (road_name, speed_factor) = roads
        .get(jitter.pick(roads.len()))
        .map(|r| (r.name.as_str(), r.speed_factor))
        .unwrap_or(("highway", 1.0));
    let avg_speed = BASE_SPEED_KMH * speed_factor;
    let travel_time = round_to(distance / avg_speed, 1);

    let mut waypoints = Vec::new();
    if distance > WAYPOINT_THRESHOLD_KM {
        waypoints.push(format!("Waypoint near {}km", (distance / 2.0) as i64));
    }

    let transport_cost =
        estimate_transport_cost(reference, distance, quantity_kg, VehicleType::Truck, jitter);

    Route {
        from: origin.to_string(),
        to: destination.to_string(),
        distance,
        estimated_time: travel_time,
        transport_cost,
        route_details: RouteDetails {
            waypoints,
            road_conditions: vec![road_name.to_string()],
            tolls: (distance * TOLL_RATE_PER_KM).round(),
        },
    }
}

/// Vehicle and handling needs for the whole consignment.
pub fn transport_requirements(quantity_kg: f64) -> TransportRequirements {
    let special_requirements = if quantity_kg > REFRIGERATION_THRESHOLD_KG {
        vec!["refrigeration".to_string()]
    } else {
        Vec::new()
    };

    TransportRequirements {
        vehicle_type: VehicleType::Truck,
        capacity_tons: (quantity_kg / 1000.0).ceil(),
        special_requirements,
    }
}

/// Logistics stage: fails when there is nowhere to ship to.
pub fn plan_logistics(
    reference: &ReferenceData,
    origin: &str,
    destinations: &[String],
    quantity_kg: f64,
    now: DateTime<Utc>,
    jitter: &mut dyn JitterSource,
    trace: &mut ExecutionTrace,
) -> Result<LogisticsPlan, PlannerError> {
    if destinations.is_empty() {
        return Err(PlannerError::NoDestinations);
    }

    let routes: Vec<Route> = destinations
        .iter()
        .map(|dest| generate_route(reference, origin, dest, quantity_kg, jitter))
        .collect();
    let requirements = transport_requirements(quantity_kg);

    trace.record(
        "generate_routes",
        json!({
            "origin": origin,
            "destinations": destinations,
            "routesCount": routes.len(),
            "vehicleType": requirements.vehicle_type.as_str(),
        }),
    );

    let total_cost = routes.iter().map(|r| r.transport_cost).sum();
    let longest_hours = routes
        .iter()
        .map(|r| r.estimated_time)
        .fold(0.0_f64, f64::max);
    let estimated_arrival = now + Duration::seconds((longest_hours * 3600.0) as i64);

    info!(
        "🚚 Planned {} routes from {} (total cost {:.0})",
        routes.len(),
        origin,
        total_cost
    );

    Ok(LogisticsPlan {
        routes,
        total_cost,
        estimated_arrival,
        transport_requirements: requirements,
    })
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jitter::{FixedJitter, RngJitter};

    #[test]
    fn test_known_pair_midpoint_route() {
        let reference = ReferenceData::default();
        let mut jitter = FixedJitter::midpoint();
        let route = generate_route(&reference, "Delhi", "Mumbai", 2000.0, &mut jitter);

        assert_eq!(route.distance, 1400.0);
        // 1400 km * 1.2 * 2 t
        assert_eq!(route.transport_cost, 3360.0);
        assert_eq!(route.route_details.road_conditions, vec!["state_road"]);
        // 1400 / (50 * 0.8)
        assert_eq!(route.estimated_time, 35.0);
        assert_eq!(route.route_details.waypoints, vec!["Waypoint near 700km"]);
        assert_eq!(route.route_details.tolls, 70.0);
    }

    #[test]
    fn test_short_route_has_no_waypoint() {
        let reference = ReferenceData::default();
        let route = generate_route(&reference, "mumbai", "pune", 1000.0, &mut FixedJitter(0.0));
        assert!(route.route_details.waypoints.is_empty());
        assert_eq!(route.route_details.road_conditions, vec!["highway"]);
        assert_eq!(route.estimated_time, 3.0);
        // 150 * 1.2 * 1 * 0.9
        assert_eq!(route.transport_cost, 162.0);
    }

    #[test]
    fn test_unknown_pair_uses_bounded_fallback() {
        let reference = ReferenceData::default();
        let mut jitter = RngJitter::seeded(3);
        for _ in 0..50 {
            let km = distance_km(&reference, "Nashik", "Azadpur Mandi", &mut jitter);
            assert!((100.0..=1100.0).contains(&km));
            assert_eq!(km.fract(), 0.0);
        }
        assert_eq!(
            distance_km(&reference, "Nashik", "Azadpur Mandi", &mut FixedJitter::midpoint()),
            600.0
        );
    }

    #[test]
    fn test_cost_jitter_within_ten_percent() {
        let reference = ReferenceData::default();
        let mut jitter = RngJitter::seeded(11);
        for _ in 0..50 {
            let truck = VehicleType::Truck;
            let cost = estimate_transport_cost(&reference, 1000.0, 1000.0, truck, &mut jitter);
            assert!((1080.0..=1320.0).contains(&cost));
        }
        let mut fixed = FixedJitter::midpoint();
        let pickup =
            estimate_transport_cost(&reference, 100.0, 1000.0, VehicleType::Pickup, &mut fixed);
        assert_eq!(pickup, 150.0);
    }

    #[test]
    fn test_requirements_round_up_and_refrigerate() {
        let small = transport_requirements(1200.0);
        assert_eq!(small.capacity_tons, 2.0);
        assert!(small.special_requirements.is_empty());
        assert_eq!(small.vehicle_type, VehicleType::Truck);

        let large = transport_requirements(5001.0);
        assert_eq!(large.capacity_tons, 6.0);
        assert_eq!(large.special_requirements, vec!["refrigeration"]);

        assert!(transport_requirements(5000.0).special_requirements.is_empty());
    }

    #[test]
    fn test_plan_has_one_route_per_destination() {
        let reference = ReferenceData::default();
        let mut trace = ExecutionTrace::new();
        let destinations = vec!["Mumbai".to_string(), "Chandigarh".to_string()];
        let now = Utc::now();
        let plan = plan_logistics(
            &reference,
            "Delhi",
            &destinations,
            1000.0,
            now,
            &mut FixedJitter::midpoint(),
            &mut trace,
        )
        .unwrap();

        assert_eq!(plan.routes.len(), 2);
        assert_eq!(plan.routes[1].to, "Chandigarh");
        assert_eq!(plan.total_cost, 1680.0 + 300.0);
        assert_eq!(plan.estimated_arrival, now + Duration::seconds(35 * 3600));
        assert_eq!(trace.actions(), vec!["generate_routes"]);
        assert_eq!(trace.steps[0].result["routesCount"], 2);
        assert_eq!(trace.steps[0].result["vehicleType"], "truck");
    }

    #[test]
    fn test_no_destinations_fails() {
        let mut trace = ExecutionTrace::new();
        let err = plan_logistics(
            &ReferenceData::default(),
            "Delhi",
            &[],
            1000.0,
            Utc::now(),
            &mut FixedJitter::midpoint(),
            &mut trace,
        )
        .unwrap_err();
        assert_eq!(err, PlannerError::NoDestinations);
        assert!(trace.is_empty());
    }
}
