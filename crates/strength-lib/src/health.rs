//! Health tracking for the prediction server
//!
//! Component statuses follow what the server actually does:
//! - `artifact`: unhealthy until a model artifact has been loaded
//! - `predictor`: degraded after a failed inference, unhealthy after
//!   repeated consecutive failures, healthy again on the next success
//! - `history`: degraded while the session store is full and evicting

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive inference failures before the predictor is reported unhealthy
pub const UNHEALTHY_AFTER_FAILURES: u32 = 5;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<&'static str, ComponentHealth>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names reported by `/healthz`
pub mod components {
    pub const ARTIFACT: &str = "artifact";
    pub const PREDICTOR: &str = "predictor";
    pub const HISTORY: &str = "history";
}

#[derive(Debug)]
struct HealthState {
    artifact: ComponentHealth,
    predictor: ComponentHealth,
    history: ComponentHealth,
    consecutive_failures: u32,
    ready: bool,
}

/// Shared health state, cheap to clone
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(HealthState {
                artifact: ComponentHealth::new(
                    ComponentStatus::Unhealthy,
                    Some("Model artifact not loaded".to_string()),
                ),
                predictor: ComponentHealth::new(ComponentStatus::Healthy, None),
                history: ComponentHealth::new(ComponentStatus::Healthy, None),
                consecutive_failures: 0,
                ready: false,
            })),
        }
    }

    /// The artifact has been loaded; `description` names model and schema
    pub async fn record_artifact_loaded(&self, description: impl Into<String>) {
        let mut state = self.state.write().await;
        state.artifact = ComponentHealth::new(ComponentStatus::Healthy, Some(description.into()));
    }

    pub async fn record_prediction_success(&self) {
        let mut state = self.state.write().await;
        if state.consecutive_failures == 0 && state.predictor.status == ComponentStatus::Healthy {
            return;
        }
        state.consecutive_failures = 0;
        state.predictor = ComponentHealth::new(ComponentStatus::Healthy, None);
    }

    pub async fn record_prediction_failure(&self, error: impl Into<String>) {
        let mut state = self.state.write().await;
        state.consecutive_failures += 1;
        let status = if state.consecutive_failures >= UNHEALTHY_AFTER_FAILURES {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        };
        let message = format!(
            "{} ({} consecutive failure(s))",
            error.into(),
            state.consecutive_failures
        );
        state.predictor = ComponentHealth::new(status, Some(message));
    }

    /// Session store occupancy after a history write
    pub async fn record_history_usage(&self, sessions: usize, max_sessions: usize) {
        let mut state = self.state.write().await;
        state.history = if sessions >= max_sessions {
            ComponentHealth::new(
                ComponentStatus::Degraded,
                Some(format!(
                    "Session limit of {} reached, evicting least recently used",
                    max_sessions
                )),
            )
        } else {
            ComponentHealth::new(ComponentStatus::Healthy, None)
        };
    }

    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        let components = BTreeMap::from([
            (components::ARTIFACT, state.artifact.clone()),
            (components::PREDICTOR, state.predictor.clone()),
            (components::HISTORY, state.history.clone()),
        ]);
        let status = overall_status(components.values().map(|c| c.status));
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = self.state.read().await.ready;
        let health = self.health().await;

        let reason = if !ready {
            Some("Server not yet initialized")
        } else if health.status == ComponentStatus::Unhealthy {
            Some("Critical component unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

/// Worst status wins
fn overall_status(statuses: impl Iterator<Item = ComponentStatus>) -> ComponentStatus {
    statuses.fold(ComponentStatus::Healthy, |worst, s| match (worst, s) {
        (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
            ComponentStatus::Unhealthy
        }
        (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
            ComponentStatus::Degraded
        }
        _ => ComponentStatus::Healthy,
    })
}
