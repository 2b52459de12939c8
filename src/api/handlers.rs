//! Endpoint handlers

use super::error::ApiResult;
use crate::context::DetectorContext;
use crate::features::RequestRecord;
use crate::policy::Prediction;
use crate::storage::{ThreatRecord, ThreatStats};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub type SharedContext = Arc<DetectorContext>;

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub status: &'static str,
}

/// Enqueue for asynchronous scoring. The verdict is never returned here.
pub async fn analyze(
    State(ctx): State<SharedContext>,
    body: Result<Json<RequestRecord>, JsonRejection>,
) -> ApiResult<Json<QueuedResponse>> {
    let Json(record) = body?;
    ctx.detector().submit(record)?;
    Ok(Json(QueuedResponse { status: "queued" }))
}

/// Score synchronously. Failures collapse to a benign verdict with zero confidence.
pub async fn predict(
    State(ctx): State<SharedContext>,
    body: Result<Json<RequestRecord>, JsonRejection>,
) -> Json<Prediction> {
    let record = match body {
        Ok(Json(record)) => record,
        Err(e) => {
            debug!(error = %e.body_text(), "predict body rejected; falling back");
            return Json(Prediction::fallback());
        }
    };
    let scorer = ctx.scorer().clone();
    let prediction = match tokio::task::spawn_blocking(move || scorer.score(&record)).await {
        Ok(Ok(p)) => p,
        Ok(Err(e)) => {
            debug!(error = %e, "predict fell back to default");
            Prediction::fallback()
        }
        Err(e) => {
            tracing::error!(error = %e, "predict task failed");
            Prediction::fallback()
        }
    };
    Json(prediction)
}

#[derive(Debug, Default, Deserialize)]
pub struct ThreatFilter {
    pub limit: Option<usize>,
    pub attack_type: Option<String>,
    pub ip: Option<String>,
}

pub async fn list_threats(
    State(ctx): State<SharedContext>,
    filter: Result<Query<ThreatFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<ThreatRecord>>> {
    let Query(filter) = filter?;
    let queries = ctx.queries().clone();
    let threats = tokio::task::spawn_blocking(move || {
        queries.query(filter.limit, filter.attack_type.as_deref(), filter.ip.as_deref())
    })
    .await??;
    Ok(Json(threats))
}

pub async fn threat_stats(State(ctx): State<SharedContext>) -> ApiResult<Json<ThreatStats>> {
    let queries = ctx.queries().clone();
    let stats = tokio::task::spawn_blocking(move || queries.stats()).await??;
    Ok(Json(stats))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    #[serde(rename = "modelVersion")]
    model_version: String,
    running: bool,
    timestamp: i64,
}

pub async fn health(State(ctx): State<SharedContext>) -> Json<HealthResponse> {
    let running = ctx.detector().is_running();
    Json(HealthResponse {
        status: if running { "healthy" } else { "stopped" },
        version: env!("CARGO_PKG_VERSION"),
        model_version: ctx.model_version().to_string(),
        running,
        timestamp: chrono::Utc::now().timestamp(),
    })
}
