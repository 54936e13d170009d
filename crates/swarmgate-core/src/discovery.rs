//! Topology discovery: enumerating the current healthy game-server replicas.
//!
//! Two interchangeable strategies, selected per cycle by an explicit detection
//! step: orchestrated-service mode (Swarm services and their tasks) and
//! flat-container mode (plain running containers). Both produce the same
//! shape: the set of backend ids live this cycle and their network addresses.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::health;
use crate::naming::{self, NameDialect};
use crate::orchestrator::{Orchestrator, ServiceSummary};
use crate::{GAME_PORT, OWNERSHIP_LABEL, PROXY_MARKER};

/// Discovery parameters. Defaults match the fixed deployment contract.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Label a workload must carry to be treated as a managed game server.
    pub ownership_label: String,
    /// Workloads resolving to (or containing) this name are the proxy itself.
    pub proxy_marker: String,
    /// Internal port every backend listens on.
    pub port: u16,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ownership_label: OWNERSHIP_LABEL.to_string(),
            proxy_marker: PROXY_MARKER.to_string(),
            port: GAME_PORT,
        }
    }
}

/// Which topology strategy produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Swarm services with per-service task listings.
    Orchestrated,
    /// Plain running containers grouped by logical base name.
    FlatContainer,
}

/// One healthy replica observed in the current cycle. Derived fresh each
/// cycle, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredInstance {
    /// Per-replica backend identifier, `logicalName-N`.
    pub backend_id: String,
    /// Logical service name shared by all replicas of the workload.
    pub logical_name: String,
    /// Host part of the backend address; resolves on the container network.
    pub address: String,
}

/// Result of one discovery cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySnapshot {
    pub mode: DiscoveryMode,
    /// Instances keyed by backend id.
    pub instances: BTreeMap<String, DiscoveredInstance>,
}

/// The detected topology for one cycle.
enum Topology {
    Orchestrated(Vec<ServiceSummary>),
    FlatContainer,
}

/// Runs one discovery cycle against the orchestrator.
///
/// Mode detection failure (the daemon rejects the service listing because
/// cluster mode is disabled, or the listing is empty) is not fatal: it falls
/// back to flat-container mode within the same cycle. Errors from the chosen
/// strategy itself are propagated and abort the cycle.
pub async fn discover(
    orchestrator: &dyn Orchestrator,
    config: &DiscoveryConfig,
) -> Result<DiscoverySnapshot> {
    match detect_topology(orchestrator).await {
        Topology::Orchestrated(services) => {
            discover_from_services(orchestrator, config, services).await
        }
        Topology::FlatContainer => discover_from_containers(orchestrator, config).await,
    }
}

/// Detects which topology strategy to use this cycle.
///
/// "Not in cluster mode" is an ordinary outcome here, not an exceptional
/// condition: any failure of the service listing selects flat-container mode.
async fn detect_topology(orchestrator: &dyn Orchestrator) -> Topology {
    match orchestrator.list_services().await {
        Ok(services) if !services.is_empty() => Topology::Orchestrated(services),
        Ok(_) => {
            debug!("No services found, using flat-container mode");
            Topology::FlatContainer
        }
        Err(e) => {
            debug!("Service listing unavailable ({}), using flat-container mode", e);
            Topology::FlatContainer
        }
    }
}

async fn discover_from_services(
    orchestrator: &dyn Orchestrator,
    config: &DiscoveryConfig,
    services: Vec<ServiceSummary>,
) -> Result<DiscoverySnapshot> {
    let mut instances = BTreeMap::new();

    for service in services {
        let logical = naming::resolve(&service.name, NameDialect::Underscore).logical;

        if logical == config.proxy_marker {
            debug!("Skipping proxy service {}", service.name);
            continue;
        }

        // Docker puts workload labels on the container template; fall back to
        // service-level labels when the template carries none.
        let labels = if service.task_template_labels.is_empty() {
            &service.labels
        } else {
            &service.task_template_labels
        };
        if !labels.contains_key(&config.ownership_label) {
            debug!("Service {} has no ownership label, skipping", service.name);
            continue;
        }

        let mut tasks = orchestrator.list_tasks(&service.id).await?;
        tasks.retain(|task| {
            let eligible = health::task_is_eligible(&task.run_state, task.error_text.as_deref());
            if !eligible {
                debug!("Task {} of {} is not healthy, skipping", task.id, service.name);
            }
            eligible
        });

        // Sort by task id so ordinal assignment is reproducible across cycles
        // regardless of API response ordering.
        tasks.sort_by(|a, b| a.id.cmp(&b.id));

        for (index, _task) in tasks.iter().enumerate() {
            let backend_id = format!("{}-{}", logical, index + 1);
            instances.insert(
                backend_id.clone(),
                DiscoveredInstance {
                    backend_id,
                    logical_name: logical.clone(),
                    // The full service name resolves in the overlay network.
                    address: service.name.clone(),
                },
            );
        }
    }

    Ok(DiscoverySnapshot {
        mode: DiscoveryMode::Orchestrated,
        instances,
    })
}

async fn discover_from_containers(
    orchestrator: &dyn Orchestrator,
    config: &DiscoveryConfig,
) -> Result<DiscoverySnapshot> {
    let containers = orchestrator.list_running_containers().await?;

    // Group healthy managed containers by logical base name; raw container
    // names are kept as the stable sort key for ordinal assignment.
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for container in &containers {
        if !health::container_is_eligible(&container.status_text) {
            debug!(
                "Container {} is not healthy ({}), skipping",
                container.id, container.status_text
            );
            continue;
        }
        if !container.labels.contains_key(&config.ownership_label) {
            continue;
        }
        let Some(raw_name) = container.names.first() else {
            continue;
        };
        let name = raw_name.strip_prefix('/').unwrap_or(raw_name);

        if name.contains(&config.proxy_marker) {
            debug!("Skipping proxy container {}", name);
            continue;
        }

        let logical = naming::resolve_auto(name).logical;
        groups.entry(logical).or_default().push(name.to_string());
    }

    let mut instances = BTreeMap::new();
    for (logical, mut names) in groups {
        names.sort();
        for (index, _name) in names.iter().enumerate() {
            let backend_id = format!("{}-{}", logical, index + 1);
            instances.insert(
                backend_id.clone(),
                DiscoveredInstance {
                    backend_id,
                    logical_name: logical.clone(),
                    // The compose network aliases the service name.
                    address: logical.clone(),
                },
            );
        }
    }

    Ok(DiscoverySnapshot {
        mode: DiscoveryMode::FlatContainer,
        instances,
    })
}
