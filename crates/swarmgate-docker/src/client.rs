use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::service::ListServicesOptions;
use bollard::task::ListTasksOptions;
use bollard::Docker;
use tracing::info;

use swarmgate_core::orchestrator::{ContainerSummary, ServiceSummary, TaskSummary};
use swarmgate_core::{Orchestrator, Result, SwarmgateError};

/// Orchestrator client backed by the local Docker daemon.
pub struct DockerOrchestrator {
    docker: Docker,
}

impl DockerOrchestrator {
    /// Connects to the Docker socket using the platform defaults
    /// (`unix:///var/run/docker.sock` on Linux).
    ///
    /// A connection failure here is fatal to the subsystem's activation; the
    /// caller is expected to log it once and not retry.
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| SwarmgateError::Orchestrator(format!("Failed to connect to Docker socket: {e}")))?;
        info!("Connected to Docker socket");
        Ok(Self { docker })
    }
}

fn orchestrator_err(e: bollard::errors::Error) -> SwarmgateError {
    SwarmgateError::Orchestrator(e.to_string())
}

#[async_trait]
impl Orchestrator for DockerOrchestrator {
    async fn list_services(&self) -> Result<Vec<ServiceSummary>> {
        let services = self
            .docker
            .list_services(None::<ListServicesOptions<String>>)
            .await
            .map_err(orchestrator_err)?;

        Ok(services
            .into_iter()
            .map(|service| {
                let spec = service.spec.unwrap_or_default();
                let task_template_labels = spec
                    .task_template
                    .and_then(|template| template.container_spec)
                    .and_then(|container| container.labels)
                    .unwrap_or_default();
                ServiceSummary {
                    id: service.id.unwrap_or_default(),
                    name: spec.name.unwrap_or_default(),
                    labels: spec.labels.unwrap_or_default(),
                    task_template_labels,
                }
            })
            .collect())
    }

    async fn list_tasks(&self, service_id: &str) -> Result<Vec<TaskSummary>> {
        let filters = HashMap::from([("service", vec![service_id])]);
        let tasks = self
            .docker
            .list_tasks(Some(ListTasksOptions { filters }))
            .await
            .map_err(orchestrator_err)?;

        Ok(tasks
            .into_iter()
            .map(|task| {
                let status = task.status.unwrap_or_default();
                TaskSummary {
                    id: task.id.unwrap_or_default(),
                    run_state: status
                        .state
                        .map(|state| format!("{state:?}").to_lowercase())
                        .unwrap_or_default(),
                    error_text: status.err,
                }
            })
            .collect())
    }

    async fn list_running_containers(&self) -> Result<Vec<ContainerSummary>> {
        let options = ListContainersOptions {
            filters: HashMap::from([("status", vec!["running"])]),
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(orchestrator_err)?;

        Ok(containers
            .into_iter()
            .map(|container| ContainerSummary {
                id: container.id.unwrap_or_default(),
                names: container.names.unwrap_or_default(),
                labels: container.labels.unwrap_or_default(),
                status_text: container.status.unwrap_or_default(),
            })
            .collect())
    }
}
