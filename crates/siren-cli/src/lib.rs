//! Siren CLI - command line client for the route optimization server.
//!
//! - siren-plan: submit an optimization request and print the ranked routes

pub mod client;
pub mod report;

pub use client::PlanClient;
pub use report::render_summary;
