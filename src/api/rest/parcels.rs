use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AdminUser, AuthUser, RiderUser};
use crate::engine::lifecycle::{self, ParcelDraft};
use crate::error::AppError;
use crate::models::parcel::{DeliveryStatus, Parcel, PaymentStatus};
use crate::models::rider::Rider;
use crate::models::user::Role;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/parcels", get(list_parcels).post(create_parcel))
        .route("/parcels/:id", get(get_parcel).delete(delete_parcel))
        .route("/parcels/:id/assign", patch(assign_rider))
        .route("/parcels/:id/pickup", patch(mark_picked_up))
        .route("/parcels/:id/delivered", patch(mark_delivered))
        .route("/parcels/:id/cashout", patch(cash_out))
}

#[derive(Deserialize)]
pub struct ParcelQuery {
    pub email: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub delivery_status: Option<DeliveryStatus>,
}

#[derive(Deserialize)]
pub struct AssignRiderRequest {
    pub rider_id: Uuid,
}

#[derive(Serialize)]
pub struct AssignmentResponse {
    pub parcel: Parcel,
    pub rider: Rider,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub id: Uuid,
    pub deleted_count: u32,
}

pub(crate) fn is_admin(state: &AppState, email: &str) -> bool {
    state
        .user_by_email(email)
        .is_some_and(|user| user.role == Role::Admin)
}

async fn list_parcels(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ParcelQuery>,
) -> Result<Json<Vec<Parcel>>, AppError> {
    let requested = query.email.map(|email| email.trim().to_lowercase());

    let owner = if is_admin(&state, &user.email) {
        requested
    } else {
        match requested {
            Some(email) if email != user.email => {
                return Err(AppError::Forbidden("Forbidden access".to_string()));
            }
            _ => Some(user.email.clone()),
        }
    };

    let mut parcels: Vec<Parcel> = state
        .parcels
        .iter()
        .map(|entry| entry.value().clone())
        .filter(|parcel| owner.as_ref().is_none_or(|email| &parcel.created_by == email))
        .filter(|parcel| {
            query
                .payment_status
                .is_none_or(|status| parcel.payment_status == status)
        })
        .filter(|parcel| {
            query
                .delivery_status
                .is_none_or(|status| parcel.delivery_status == status)
        })
        .collect();
    parcels.sort_by(|a, b| b.creation_date.cmp(&a.creation_date));

    Ok(Json(parcels))
}

async fn create_parcel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<ParcelDraft>,
) -> Result<(StatusCode, Json<Parcel>), AppError> {
    let parcel = lifecycle::create_parcel(&state, &user.email, payload)?;
    Ok((StatusCode::CREATED, Json(parcel)))
}

async fn get_parcel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Parcel>, AppError> {
    let parcel = state
        .parcels
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("parcel {} not found", id)))?;

    let visible = parcel.created_by == user.email
        || parcel.rider_email.as_deref() == Some(user.email.as_str())
        || is_admin(&state, &user.email);
    if !visible {
        return Err(AppError::Forbidden("Forbidden access".to_string()));
    }

    Ok(Json(parcel))
}

async fn delete_parcel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let admin = is_admin(&state, &user.email);
    let removed = lifecycle::delete_parcel(&state, id, &user.email, admin).await?;

    Ok(Json(DeleteResponse {
        id: removed.id,
        deleted_count: 1,
    }))
}

async fn assign_rider(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRiderRequest>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let (parcel, rider) = lifecycle::assign_rider(&state, id, payload.rider_id, &admin.email).await?;
    Ok(Json(AssignmentResponse { parcel, rider }))
}

async fn mark_picked_up(
    State(state): State<Arc<AppState>>,
    RiderUser(rider): RiderUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Parcel>, AppError> {
    let parcel = lifecycle::mark_picked_up(&state, id, &rider.email).await?;
    Ok(Json(parcel))
}

async fn mark_delivered(
    State(state): State<Arc<AppState>>,
    RiderUser(rider): RiderUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Parcel>, AppError> {
    let parcel = lifecycle::mark_delivered(&state, id, &rider.email).await?;
    Ok(Json(parcel))
}

async fn cash_out(
    State(state): State<Arc<AppState>>,
    RiderUser(rider): RiderUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Parcel>, AppError> {
    let parcel = lifecycle::cash_out(&state, id, &rider.email).await?;
    Ok(Json(parcel))
}
