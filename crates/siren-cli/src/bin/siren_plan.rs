//! CLI tool to request an emergency route from the Siren server.

use clap::Parser;
use siren_cli::client::{parse_coordinate, parse_goal, parse_vehicle};
use siren_cli::{render_summary, PlanClient};
use siren_core::{Coordinate, OptimizationGoal, OptimizationRequest, RouteConstraints, VehicleType};

/// Plan a route between two points
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Siren Server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Origin as lon,lat
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    from: Coordinate,

    /// Destination as lon,lat
    #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
    to: Coordinate,

    /// Intermediate stop as lon,lat (repeatable)
    #[arg(long = "via", value_parser = parse_coordinate, allow_hyphen_values = true)]
    waypoints: Vec<Coordinate>,

    /// civilian, fire_engine, ambulance, police_car or rescue_truck
    #[arg(long, value_parser = parse_vehicle, default_value = "civilian")]
    vehicle: VehicleType,

    /// fastest, shortest, safest, most_accessible or balanced
    #[arg(long, value_parser = parse_goal, default_value = "balanced")]
    goal: OptimizationGoal,

    #[arg(long)]
    avoid_hazards: bool,

    #[arg(long)]
    max_distance_m: Option<f64>,

    #[arg(long)]
    max_time_s: Option<f64>,

    #[arg(long)]
    max_slope_deg: Option<f64>,

    /// Print the raw JSON result
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let request = OptimizationRequest {
        waypoints: args.waypoints,
        vehicle_type: args.vehicle,
        goal: args.goal,
        constraints: RouteConstraints {
            max_distance_m: args.max_distance_m,
            max_time_s: args.max_time_s,
            max_slope_deg: args.max_slope_deg,
            avoid_hazards: args.avoid_hazards,
        },
        ..OptimizationRequest::new(args.from, args.to)
    };

    let client = PlanClient::new(&args.url)?;
    let result = client.optimize(&request)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_summary(&result));
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
