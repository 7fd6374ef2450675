use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub processed_count: u64,
    pub error_count: u64,
    pub last_processed_at: Option<DateTime<Utc>>,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: HealthState::Healthy,
            processed_count: 0,
            error_count: 0,
            last_processed_at: None,
        }
    }
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

/// Why a tick counted as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The work unit produced a value that did not pass classification.
    Invalid,
    /// The work unit itself failed; the service is marked unhealthy.
    Fatal,
}

/// Shared owner of the service health counters.
///
/// Cloning hands out another handle to the same state. Callers only ever get
/// copies of the status back, never a reference into it.
#[derive(Debug, Clone, Default)]
pub struct HealthTracker {
    inner: Arc<RwLock<HealthStatus>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> HealthStatus {
        self.inner.read().await.clone()
    }

    /// Returns the updated counters so callers can throttle on them.
    pub async fn record_success(&self) -> HealthStatus {
        let mut health = self.inner.write().await;
        health.processed_count += 1;
        health.last_processed_at = Some(Utc::now());
        health.status = HealthState::Healthy;
        health.clone()
    }

    pub async fn record_failure(&self, kind: FailureKind) -> HealthStatus {
        let mut health = self.inner.write().await;
        health.error_count += 1;
        if kind == FailureKind::Fatal {
            health.status = HealthState::Unhealthy;
        }
        health.clone()
    }
}
