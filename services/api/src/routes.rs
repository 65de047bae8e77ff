use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;

use admissions::workflows::admission::applications::{
    admission_router, AdmissionState, ApplicationRepository,
};
use admissions::workflows::admission::catalog::CourseCatalog;
use admissions::workflows::admission::identity::IdentityProvider;
use admissions::workflows::admission::seats::SeatLedger;

pub(crate) fn with_admission_routes<R, C, L, I>(
    state: AdmissionState<R, C, L, I>,
) -> axum::Router
where
    R: ApplicationRepository + 'static,
    C: CourseCatalog + 'static,
    L: SeatLedger + 'static,
    I: IdentityProvider + 'static,
{
    admission_router(state)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
