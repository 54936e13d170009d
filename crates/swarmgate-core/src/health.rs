//! Health classification for discovered workload instances.
//!
//! Pure predicates with no I/O. The two orchestrator topologies report health
//! differently: Swarm tasks carry a run-state plus an error string, while flat
//! containers only expose a free-text status line.

/// Status-text markers that disqualify a container.
///
/// A container with no health check configured has no parenthesized health
/// info at all; absence of health info is not a failure signal.
const UNHEALTHY_MARKERS: [&str; 3] = ["(unhealthy)", "(health: starting)", "(health: unhealthy)"];

/// Whether a Swarm task is eligible for registration.
///
/// Eligible iff the task is in the `running` state and carries no non-empty
/// error string.
pub fn task_is_eligible(run_state: &str, error_text: Option<&str>) -> bool {
    run_state == "running" && error_text.map_or(true, str::is_empty)
}

/// Whether a container is eligible for registration, judged from its free-text
/// status line (e.g. `"Up 5 seconds (healthy)"`).
pub fn container_is_eligible(status_text: &str) -> bool {
    !UNHEALTHY_MARKERS
        .iter()
        .any(|marker| status_text.contains(marker))
}
