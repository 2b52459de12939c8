//! HTTP boundary over the detector context.

mod error;
mod handlers;

pub use error::{ApiError, ApiResult};
pub use handlers::{HealthResponse, QueuedResponse, SharedContext, ThreatFilter};

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/analyze", post(handlers::analyze))
        .route("/predict", post(handlers::predict))
        .route("/threats", get(handlers::list_threats))
        .route("/threats/stats", get(handlers::threat_stats))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
