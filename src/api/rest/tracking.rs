use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::parcels::is_admin;
use crate::auth::AuthUser;
use crate::engine::tracking::{append_event, events_for};
use crate::error::AppError;
use crate::models::tracking::TrackingEvent;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trackParcel", post(track_parcel))
        .route("/track/:tracking_id", get(get_tracking))
}

#[derive(Deserialize)]
pub struct TrackParcelRequest {
    pub tracking_id: String,
    pub parcel_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

async fn track_parcel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<TrackParcelRequest>,
) -> Result<(StatusCode, Json<TrackingEvent>), AppError> {
    if payload.status.trim().is_empty() {
        return Err(AppError::BadRequest("status cannot be empty".to_string()));
    }

    let parcel = state
        .parcels
        .get(&payload.parcel_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("parcel {} not found", payload.parcel_id)))?;

    if parcel.tracking_id != payload.tracking_id {
        return Err(AppError::BadRequest(
            "tracking_id does not belong to parcel".to_string(),
        ));
    }

    let allowed = parcel.rider_email.as_deref() == Some(user.email.as_str())
        || is_admin(&state, &user.email);
    if !allowed {
        return Err(AppError::Forbidden("Forbidden access".to_string()));
    }

    let event = append_event(
        &state,
        &parcel.tracking_id,
        parcel.id,
        payload.status.trim(),
        payload.message,
        &user.email,
    );

    Ok((StatusCode::CREATED, Json(event)))
}

async fn get_tracking(
    State(state): State<Arc<AppState>>,
    Path(tracking_id): Path<String>,
) -> Json<Vec<TrackingEvent>> {
    Json(events_for(&state, &tracking_id))
}
