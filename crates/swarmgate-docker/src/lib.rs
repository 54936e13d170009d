//! Docker Engine API implementation of the swarmgate orchestrator trait.
//!
//! Talks to the local Docker socket via `bollard` and flattens the API models
//! into the narrow summaries consumed by discovery.

mod client;

pub use client::DockerOrchestrator;
