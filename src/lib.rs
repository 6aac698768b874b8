// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod dates;
pub mod ingest;
pub mod insight;
pub mod llm;
pub mod metrics;
pub mod notify;
pub mod prompt;
pub mod sentiment;
pub mod telemetry;

pub use crate::api::router;
pub use crate::insight::{InsightGenerator, InsightKind, InsightResult, InsightStatus};
