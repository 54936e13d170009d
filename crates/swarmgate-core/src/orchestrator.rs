//! The orchestrator client collaborator.
//!
//! Narrow view of the container orchestrator consumed by discovery. The
//! `swarmgate-docker` crate implements this over the Docker Engine API; tests
//! use in-memory fakes.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

/// An orchestrator-level service (Swarm mode).
#[derive(Debug, Clone, Default)]
pub struct ServiceSummary {
    pub id: String,
    /// Full service name, including any stack prefix. DNS-resolvable inside
    /// the orchestrator's overlay network.
    pub name: String,
    /// Service-level labels.
    pub labels: HashMap<String, String>,
    /// Labels on the service's container template. Docker places workload
    /// labels here rather than on the service spec itself.
    pub task_template_labels: HashMap<String, String>,
}

/// One task (replica instance) of a Swarm service.
#[derive(Debug, Clone, Default)]
pub struct TaskSummary {
    pub id: String,
    /// Lowercase run-state, e.g. `"running"`, `"pending"`.
    pub run_state: String,
    /// Error text reported by the orchestrator, if any.
    pub error_text: Option<String>,
}

/// A plain container (flat-container mode).
#[derive(Debug, Clone, Default)]
pub struct ContainerSummary {
    pub id: String,
    /// Container names as reported by the API, usually with a leading `/`.
    pub names: Vec<String>,
    pub labels: HashMap<String, String>,
    /// Free-text status line, e.g. `"Up 5 seconds (healthy)"`.
    pub status_text: String,
}

/// Narrow interface to the container orchestrator.
///
/// Listing calls are issued once per reconciliation cycle, not per replica.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Lists orchestrator-level services. Fails or returns empty when the
    /// daemon is not in cluster mode.
    async fn list_services(&self) -> Result<Vec<ServiceSummary>>;

    /// Lists the tasks of one service.
    async fn list_tasks(&self, service_id: &str) -> Result<Vec<TaskSummary>>;

    /// Lists running containers only.
    async fn list_running_containers(&self) -> Result<Vec<ContainerSummary>>;
}
