//! Host process wiring for the Luno audit pipeline: configuration, tracing,
//! logger construction, and event intake.

pub mod audit_factory;
pub mod config;
pub mod error;
pub mod ingest;
pub mod telemetry;
