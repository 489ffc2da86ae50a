// src/handlers/mod.rs

pub mod probes;

pub use probes::{full_report, health_routes, liveness, readiness, startup};
