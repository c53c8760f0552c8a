//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: CheckResult,
    /// Object storage for story assets; unconfigured means uploads
    /// resolve to absent locators, not request failures
    pub storage: CheckResult,
    /// Curriculum generation; disabled until an API key is configured
    pub generation: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn status_only(status: &str) -> Self {
        Self {
            status: status.to_string(),
            latency_ms: None,
            error: None,
        }
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: mosaic_common::VERSION.to_string(),
    })
}

/// Readiness probe.
///
/// The database is the only hard dependency; storage and generation are
/// reported for operators but degrade at request time instead of taking
/// the service out of rotation.
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let start = std::time::Instant::now();

    let database = match state.db.ping().await {
        Ok(_) => CheckResult {
            status: "up".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => CheckResult {
            status: "down".to_string(),
            latency_ms: None,
            error: Some(e.to_string()),
        },
    };

    let storage_configured = state.config.storage.base_url.is_some()
        && state.config.storage.service_key.is_some();
    let storage = CheckResult::status_only(if storage_configured {
        "configured"
    } else {
        "unconfigured"
    });

    let generation = CheckResult::status_only(if state.curriculum.is_some() {
        "configured"
    } else {
        "disabled"
    });

    let all_healthy = database.status == "up";

    Json(ReadyResponse {
        status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks {
            database,
            storage,
            generation,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::app_state;
    use mosaic_common::db::MemoryStoryStore;
    use mosaic_common::generation::MockGenerator;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_reports_version() {
        let Json(body) = health().await;
        assert_eq!(body.status, "healthy");
        assert_eq!(body.version, mosaic_common::VERSION);
    }

    #[tokio::test]
    async fn test_ready_reports_each_dependency() {
        // test state has no live database, no storage config, no key
        let state = app_state(Arc::new(MemoryStoryStore::new()), None);

        let Json(body) = ready(State(state)).await;

        assert_eq!(body.status, "not_ready");
        assert_eq!(body.checks.database.status, "down");
        assert!(body.checks.database.error.is_some());
        assert_eq!(body.checks.storage.status, "unconfigured");
        assert_eq!(body.checks.generation.status, "disabled");
    }

    #[tokio::test]
    async fn test_ready_marks_generation_configured_with_key() {
        let state = app_state(
            Arc::new(MemoryStoryStore::new()),
            Some(Arc::new(MockGenerator::returning("unused"))),
        );

        let Json(body) = ready(State(state)).await;

        assert_eq!(body.checks.generation.status, "configured");
    }
}
