//! Shared library surface for the route optimization server and its tests.

pub mod api;
pub mod backoff;
pub mod cache;
pub mod config;
pub mod obstacles;
pub mod optimizer;
pub mod state;
pub mod streets;
pub mod terrain;
