//! The reconciliation engine.
//!
//! A single periodic task drives cycles sequentially: discover the current
//! healthy replicas, register newcomers with the routing table, unregister
//! vanished entries, then refresh the default backend. A failed cycle leaves
//! all state untouched and simply retries on the next tick.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::discovery::{self, DiscoveryConfig, DiscoveryMode};
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::routing::{BackendRecord, RoutingTable};
use crate::selector;
use crate::RECONCILE_INTERVAL;

/// Reconciler configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Interval between reconciliation cycles.
    pub interval: Duration,
    pub discovery: DiscoveryConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: RECONCILE_INTERVAL,
            discovery: DiscoveryConfig::default(),
        }
    }
}

/// Registered-set mirror and cached default, mutated only by the reconciler.
///
/// The write lock is held across the whole synchronous mutation of a cycle,
/// so concurrent readers observe either the pre-cycle or the post-cycle
/// state, never a partially updated set.
#[derive(Debug, Default)]
struct RegistryState {
    /// Mirror of the routing table's live backend set.
    registered: BTreeSet<String>,
    /// Cached default target; revalidated on read.
    default_backend: Option<String>,
}

/// Outcome of one successful reconciliation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub mode: DiscoveryMode,
    /// Replicas observed this cycle.
    pub discovered: usize,
    /// Backends newly registered this cycle.
    pub registered: usize,
    /// Backends unregistered this cycle.
    pub unregistered: usize,
}

/// Keeps the routing table synchronized with the orchestrator.
pub struct Reconciler {
    orchestrator: Arc<dyn Orchestrator>,
    routing: Arc<dyn RoutingTable>,
    config: ReconcilerConfig,
    state: RwLock<RegistryState>,
}

impl Reconciler {
    pub fn new(
        orchestrator: Arc<dyn Orchestrator>,
        routing: Arc<dyn RoutingTable>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            orchestrator,
            routing,
            config,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Runs an initial discovery pass, then spawns the periodic cycle task.
    ///
    /// A failure of the initial pass is logged and recovered; the periodic
    /// task retries on schedule. The engine stops when the host aborts the
    /// returned handle.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("Starting initial backend discovery");
            match self.run_cycle().await {
                Ok(summary) => info!(
                    "Initial discovery complete, {} backend(s) registered",
                    summary.discovered
                ),
                Err(e) => warn!("Initial discovery failed: {}", e),
            }

            info!(
                "Scheduled periodic backend discovery every {:?}",
                self.config.interval
            );
            let mut interval = tokio::time::interval(self.config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                // Awaiting the cycle before the next tick guarantees cycles
                // never overlap.
                match self.run_cycle().await {
                    Ok(summary) => debug!(
                        "Cycle complete ({:?}): {} discovered, {} registered, {} unregistered",
                        summary.mode, summary.discovered, summary.registered, summary.unregistered
                    ),
                    Err(e) => error!("Error discovering backends: {}", e),
                }
            }
        })
    }

    /// Runs one reconciliation cycle.
    ///
    /// Idempotent: with unchanged orchestrator state a second run performs no
    /// registrations or unregistrations. A discovery error aborts the cycle
    /// before any state is touched.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let snapshot = discovery::discover(&*self.orchestrator, &self.config.discovery).await?;

        let mut state = self.state.write().await;
        let mut registered = 0;

        for (id, instance) in &snapshot.instances {
            // Absence from the routing table is tolerated and healed; the
            // table is authoritative, the local set only mirrors it.
            if !self.routing.is_registered(id) {
                self.routing.register(BackendRecord {
                    id: id.clone(),
                    address: instance.address.clone(),
                    port: self.config.discovery.port,
                });
                info!(
                    "Registered backend {} at {}:{}",
                    id, instance.address, self.config.discovery.port
                );
                registered += 1;
            }
            state.registered.insert(id.clone());
        }

        let vanished: Vec<String> = state
            .registered
            .iter()
            .filter(|id| !snapshot.instances.contains_key(*id))
            .cloned()
            .collect();
        if !vanished.is_empty() {
            info!(
                "Removing {} backend(s) no longer running: {:?}",
                vanished.len(),
                vanished
            );
        }
        for id in &vanished {
            self.routing.unregister(id);
            state.registered.remove(id);
            info!("Unregistered backend {}", id);
        }

        state.default_backend = selector::select_default(&state.registered, &*self.routing);

        Ok(CycleSummary {
            mode: snapshot.mode,
            discovered: snapshot.instances.len(),
            registered,
            unregistered: vanished.len(),
        })
    }

    /// The current default backend for newly connecting sessions.
    ///
    /// Returns the cached choice while it is still a live registered backend,
    /// otherwise recomputes it. `None` means no backends are available.
    pub async fn default_backend(&self) -> Option<String> {
        {
            let state = self.state.read().await;
            if let Some(id) = &state.default_backend {
                if self.routing.is_registered(id) {
                    return Some(id.clone());
                }
            }
        }

        let mut state = self.state.write().await;
        state.default_backend = selector::select_default(&state.registered, &*self.routing);
        if let Some(id) = &state.default_backend {
            info!("Default backend set to {}", id);
        } else {
            warn!("No backends available for default connection");
        }
        state.default_backend.clone()
    }

    /// Snapshot of the currently tracked backend ids.
    pub async fn registered(&self) -> BTreeSet<String> {
        self.state.read().await.registered.clone()
    }

    /// The backend record a session should be routed to, if any.
    pub async fn lookup(&self, id: &str) -> Option<BackendRecord> {
        self.routing.lookup(id)
    }
}
