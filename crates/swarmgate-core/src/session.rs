//! Session routing: sending newly connected sessions to the default backend.
//!
//! Each session's in-flight routing attempt is tracked as a pending entry so
//! that a later rejection from the target backend can be translated into a
//! user-facing reason instead of a generic proxy error. The connect-completion
//! path and the kick handler race on the same entry; delete-if-present
//! semantics make the loser's action a no-op.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::reconciler::Reconciler;

/// Message shown when no default backend exists. Terminal, no retry.
const NO_BACKENDS_MESSAGE: &str = "No servers available. Please try again later.";

/// Fallback reason when a rejection carries no detail at all.
const GENERIC_FAILURE: &str = "Connection failed";

/// Fallback reason when a transport error carries no message.
const GENERIC_ERROR: &str = "Connection error";

/// Fallback shown for a kick without a reason.
const GENERIC_KICK: &str = "Disconnected from server";

/// Result of an asynchronous connect request, as reported by the routing
/// primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Success,
    /// The target refused the connection. `reason` is the structured reason
    /// text when the backend supplied one; `status` is the routing layer's
    /// own status label.
    Rejected {
        reason: Option<String>,
        status: Option<String>,
    },
}

/// What the routing layer should do with a kick event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KickDisposition {
    /// Replace the generic disconnect message with the backend-supplied
    /// reason.
    DisconnectWith(String),
    /// Not our session or not our pending target; the event passes through
    /// unmodified.
    PassThrough,
}

/// Narrow interface to the proxy's session/connection layer.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Issues an asynchronous connect request toward a backend. Transport
    /// errors surface as `Err`; an answered-but-refused request surfaces as
    /// `Ok(ConnectOutcome::Rejected { .. })`.
    async fn connect(&self, session: Uuid, backend_id: &str) -> Result<ConnectOutcome>;

    /// Terminates a session with a user-facing message.
    async fn terminate(&self, session: Uuid, message: &str);
}

/// Routes newly connected sessions and correlates later rejections.
pub struct SessionRouter {
    reconciler: Arc<Reconciler>,
    gateway: Arc<dyn SessionGateway>,
    /// Pending routing attempts, session id to target backend id. At most
    /// one entry per session.
    pending: DashMap<Uuid, String>,
}

impl SessionRouter {
    pub fn new(reconciler: Arc<Reconciler>, gateway: Arc<dyn SessionGateway>) -> Self {
        Self {
            reconciler,
            gateway,
            pending: DashMap::new(),
        }
    }

    /// Routes a newly started session to the current default backend.
    ///
    /// Runs as an independent task per session; failures are recovered at the
    /// session level and never propagate.
    pub async fn handle_session_start(&self, session: Uuid) {
        let Some(target) = self.reconciler.default_backend().await else {
            warn!("No default backend available for session {}", session);
            self.gateway.terminate(session, NO_BACKENDS_MESSAGE).await;
            return;
        };

        self.pending.insert(session, target.clone());
        info!("Connecting session {} to default backend {}", session, target);

        match self.gateway.connect(session, &target).await {
            Ok(ConnectOutcome::Success) => {
                self.pending.remove(&session);
                info!("Session {} connected to {}", session, target);
            }
            Ok(ConnectOutcome::Rejected { reason, status }) => {
                self.pending.remove(&session);
                // Most specific reason available: structured reason, then the
                // status label, then the generic fallback.
                let reason = reason
                    .or(status)
                    .unwrap_or_else(|| GENERIC_FAILURE.to_string());
                warn!(
                    "Failed to connect session {} to {}: {}",
                    session, target, reason
                );
                self.terminate_with_target(session, &target, &reason).await;
            }
            Err(e) => {
                self.pending.remove(&session);
                warn!("Error connecting session {} to {}: {}", session, target, e);
                let reason = e.to_string();
                let reason = if reason.is_empty() { GENERIC_ERROR } else { &reason };
                self.terminate_with_target(session, &target, reason).await;
            }
        }
    }

    /// Handles a kick event emitted by a backend for a session.
    ///
    /// Only intercepts the kick when a pending entry for this exact
    /// `(session, backend)` pair still exists; anything else is not this
    /// system's concern and passes through.
    pub fn handle_kick(&self, session: Uuid, backend_id: &str, reason: &str) -> KickDisposition {
        if self
            .pending
            .remove_if(&session, |_, target| target == backend_id)
            .is_none()
        {
            return KickDisposition::PassThrough;
        }

        let reason = if reason.is_empty() { GENERIC_KICK } else { reason };
        warn!(
            "Session {} was kicked from default backend {}: {}",
            session, backend_id, reason
        );
        KickDisposition::DisconnectWith(reason.to_string())
    }

    /// Target backend of a session's pending attempt, if any.
    pub fn pending_target(&self, session: Uuid) -> Option<String> {
        self.pending.get(&session).map(|entry| entry.value().clone())
    }

    async fn terminate_with_target(&self, session: Uuid, target: &str, reason: &str) {
        self.gateway
            .terminate(session, &format!("Failed to connect to {target}: {reason}"))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SwarmgateError;
    use crate::orchestrator::{ContainerSummary, Orchestrator, ServiceSummary, TaskSummary};
    use crate::reconciler::ReconcilerConfig;
    use crate::routing::MemoryRoutingTable;
    use crate::OWNERSHIP_LABEL;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Orchestrator fake exposing a fixed container set.
    struct StaticContainers(Vec<String>);

    #[async_trait]
    impl Orchestrator for StaticContainers {
        async fn list_services(&self) -> Result<Vec<ServiceSummary>> {
            Ok(Vec::new())
        }

        async fn list_tasks(&self, _service_id: &str) -> Result<Vec<TaskSummary>> {
            Ok(Vec::new())
        }

        async fn list_running_containers(&self) -> Result<Vec<ContainerSummary>> {
            Ok(self
                .0
                .iter()
                .map(|name| ContainerSummary {
                    id: format!("id-{name}"),
                    names: vec![format!("/{name}")],
                    labels: HashMap::from([(OWNERSHIP_LABEL.to_string(), "game".to_string())]),
                    status_text: "Up 5 seconds".to_string(),
                })
                .collect())
        }
    }

    /// What the scripted gateway should answer to the next connect.
    enum Script {
        Succeed,
        Reject {
            reason: Option<String>,
            status: Option<String>,
        },
        Fail(String),
    }

    struct ScriptedGateway {
        script: Script,
        terminations: Mutex<Vec<(Uuid, String)>>,
    }

    impl ScriptedGateway {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                terminations: Mutex::new(Vec::new()),
            })
        }

        fn terminations(&self) -> Vec<(Uuid, String)> {
            self.terminations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SessionGateway for ScriptedGateway {
        async fn connect(&self, _session: Uuid, _backend_id: &str) -> Result<ConnectOutcome> {
            match &self.script {
                Script::Succeed => Ok(ConnectOutcome::Success),
                Script::Reject { reason, status } => Ok(ConnectOutcome::Rejected {
                    reason: reason.clone(),
                    status: status.clone(),
                }),
                Script::Fail(message) => Err(SwarmgateError::Connection(message.clone())),
            }
        }

        async fn terminate(&self, session: Uuid, message: &str) {
            self.terminations
                .lock()
                .unwrap()
                .push((session, message.to_string()));
        }
    }

    async fn router_with_backends(
        containers: &[&str],
        gateway: Arc<ScriptedGateway>,
    ) -> SessionRouter {
        let orchestrator = Arc::new(StaticContainers(
            containers.iter().map(|s| s.to_string()).collect(),
        ));
        let reconciler = Arc::new(Reconciler::new(
            orchestrator,
            Arc::new(MemoryRoutingTable::new()),
            ReconcilerConfig::default(),
        ));
        reconciler.run_cycle().await.unwrap();
        SessionRouter::new(reconciler, gateway)
    }

    #[tokio::test]
    async fn test_successful_connect_clears_pending() {
        let gateway = ScriptedGateway::new(Script::Succeed);
        let router = router_with_backends(&["stack_lobby_1"], gateway.clone()).await;

        let session = Uuid::new_v4();
        router.handle_session_start(session).await;
        assert_eq!(router.pending_target(session), None);
        assert!(gateway.terminations().is_empty());
    }

    #[tokio::test]
    async fn test_no_backends_terminates_immediately() {
        let gateway = ScriptedGateway::new(Script::Succeed);
        let router = router_with_backends(&[], gateway.clone()).await;

        let session = Uuid::new_v4();
        router.handle_session_start(session).await;

        let terminations = gateway.terminations();
        assert_eq!(terminations.len(), 1);
        assert_eq!(terminations[0].1, NO_BACKENDS_MESSAGE);
        assert_eq!(router.pending_target(session), None);
    }

    #[tokio::test]
    async fn test_rejection_reason_forwarded() {
        let gateway = ScriptedGateway::new(Script::Reject {
            reason: Some("timeout".to_string()),
            status: Some("SERVER_DISCONNECTED".to_string()),
        });
        let router = router_with_backends(&["stack_lobby_1"], gateway.clone()).await;

        let session = Uuid::new_v4();
        router.handle_session_start(session).await;

        let terminations = gateway.terminations();
        assert_eq!(terminations.len(), 1);
        assert!(terminations[0].1.contains("lobby-1"));
        assert!(terminations[0].1.contains("timeout"));
        assert_eq!(router.pending_target(session), None);
    }

    #[tokio::test]
    async fn test_status_label_used_without_structured_reason() {
        let gateway = ScriptedGateway::new(Script::Reject {
            reason: None,
            status: Some("CONNECTION_IN_PROGRESS".to_string()),
        });
        let router = router_with_backends(&["stack_lobby_1"], gateway.clone()).await;

        router.handle_session_start(Uuid::new_v4()).await;
        assert!(gateway.terminations()[0].1.contains("CONNECTION_IN_PROGRESS"));
    }

    #[tokio::test]
    async fn test_bare_rejection_uses_generic_reason() {
        let gateway = ScriptedGateway::new(Script::Reject {
            reason: None,
            status: None,
        });
        let router = router_with_backends(&["stack_lobby_1"], gateway.clone()).await;

        router.handle_session_start(Uuid::new_v4()).await;
        assert!(gateway.terminations()[0].1.contains(GENERIC_FAILURE));
    }

    #[tokio::test]
    async fn test_transport_error_reason_forwarded() {
        let gateway = ScriptedGateway::new(Script::Fail("connection refused".to_string()));
        let router = router_with_backends(&["stack_lobby_1"], gateway.clone()).await;

        let session = Uuid::new_v4();
        router.handle_session_start(session).await;

        let terminations = gateway.terminations();
        assert!(terminations[0].1.contains("lobby-1"));
        assert!(terminations[0].1.contains("connection refused"));
        assert_eq!(router.pending_target(session), None);
    }

    #[tokio::test]
    async fn test_matching_kick_replaces_message() {
        let gateway = ScriptedGateway::new(Script::Succeed);
        let router = router_with_backends(&["stack_lobby_1"], gateway).await;

        let session = Uuid::new_v4();
        router.pending.insert(session, "lobby-1".to_string());

        let disposition = router.handle_kick(session, "lobby-1", "Server is full");
        assert_eq!(
            disposition,
            KickDisposition::DisconnectWith("Server is full".to_string())
        );
        assert_eq!(router.pending_target(session), None);
    }

    #[tokio::test]
    async fn test_mismatched_kick_passes_through() {
        let gateway = ScriptedGateway::new(Script::Succeed);
        let router = router_with_backends(&["stack_lobby_1", "stack_arena_1"], gateway).await;

        let session = Uuid::new_v4();
        router.pending.insert(session, "arena-1".to_string());

        let disposition = router.handle_kick(session, "lobby-1", "whatever");
        assert_eq!(disposition, KickDisposition::PassThrough);
        // The pending entry for the real target survives.
        assert_eq!(router.pending_target(session), Some("arena-1".to_string()));
    }

    #[tokio::test]
    async fn test_kick_without_pending_entry_passes_through() {
        let gateway = ScriptedGateway::new(Script::Succeed);
        let router = router_with_backends(&["stack_lobby_1"], gateway).await;

        let disposition = router.handle_kick(Uuid::new_v4(), "lobby-1", "whatever");
        assert_eq!(disposition, KickDisposition::PassThrough);
    }

    #[tokio::test]
    async fn test_kick_without_reason_uses_generic_message() {
        let gateway = ScriptedGateway::new(Script::Succeed);
        let router = router_with_backends(&["stack_lobby_1"], gateway).await;

        let session = Uuid::new_v4();
        router.pending.insert(session, "lobby-1".to_string());

        let disposition = router.handle_kick(session, "lobby-1", "");
        assert_eq!(
            disposition,
            KickDisposition::DisconnectWith(GENERIC_KICK.to_string())
        );
    }
}
