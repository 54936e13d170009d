//! Core reconciliation engine for swarmgate.
//!
//! Keeps a proxy's backend routing table synchronized with a dynamic set of
//! containerized game servers managed by Docker, and routes newly connected
//! sessions to a computed default backend with graceful fallback on failure.
//!
//! The engine is trait-driven at every external seam: the orchestrator client
//! ([`orchestrator::Orchestrator`]), the routing table ([`routing::RoutingTable`])
//! and the session/connection layer ([`session::SessionGateway`]) are all
//! collaborators supplied by the host. `swarmgate-docker` provides the Docker
//! implementation of the orchestrator trait.

use std::time::Duration;

pub mod discovery;
pub mod error;
pub mod health;
pub mod naming;
pub mod orchestrator;
pub mod reconciler;
pub mod routing;
pub mod selector;
pub mod session;

pub use discovery::{DiscoveryConfig, DiscoveryMode};
pub use error::{Result, SwarmgateError};
pub use orchestrator::Orchestrator;
pub use reconciler::{Reconciler, ReconcilerConfig};
pub use routing::{BackendRecord, MemoryRoutingTable, RoutingTable};
pub use session::{KickDisposition, SessionGateway, SessionRouter};

/// Internal port every game server listens on. Never exposed on the host; all
/// traffic stays on the container network.
pub const GAME_PORT: u16 = 25565;

/// Label marking a workload as managed by this system. Services and containers
/// without it are not game servers and are ignored entirely.
pub const OWNERSHIP_LABEL: &str = "com.plexverse.project.id";

/// Reserved identity of the proxy itself. Workloads resolving to this name are
/// never registered as backends.
pub const PROXY_MARKER: &str = "velocity";

/// Interval between reconciliation cycles.
pub const RECONCILE_INTERVAL: Duration = Duration::from_secs(10);
