pub mod parcels;
pub mod payments;
pub mod riders;
pub mod tracking;
pub mod users;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(parcels::router())
        .merge(payments::router())
        .merge(riders::router())
        .merge(tracking::router())
        .merge(users::router())
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws/tracking", get(ws::ws_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                tracing::info_span!("http_request", method = %req.method(), uri = %req.uri())
            }),
        )
}

async fn root() -> &'static str {
    "Welcome to the Parcel Service API!"
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    parcels: usize,
    riders: usize,
    users: usize,
    payments: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        parcels: state.parcels.len(),
        riders: state.riders.len(),
        users: state.users.len(),
        payments: state.payments.len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
