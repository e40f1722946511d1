use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AdminUser, AuthUser, RiderUser};
use crate::error::AppError;
use crate::models::parcel::{DeliveryStatus, Parcel, RiderMoney};
use crate::models::rider::{Rider, RiderEarnings, RiderStatus, WorkStatus};
use crate::models::user::Role;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/riders", get(list_riders).post(apply_rider))
        .route("/riders/pending", get(pending_riders))
        .route("/riders/active", get(active_riders))
        .route("/riders/activeRiders", get(available_riders))
        .route("/riders/earnings", get(earnings))
        .route("/riders/parcels", get(assigned_parcels))
        .route("/riders/completed", get(completed_parcels))
        .route("/riders/:id/status", patch(update_rider_status))
}

#[derive(Deserialize)]
pub struct ApplyRiderRequest {
    pub name: String,
    pub phone: Option<String>,
    pub district: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RiderStatus,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct DistrictQuery {
    pub district: Option<String>,
}

fn collect_riders(state: &AppState, keep: impl Fn(&Rider) -> bool) -> Vec<Rider> {
    let mut riders: Vec<Rider> = state
        .riders
        .iter()
        .filter(|entry| keep(entry.value()))
        .map(|entry| entry.value().clone())
        .collect();
    riders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    riders
}

fn parcels_of(state: &AppState, email: &str, keep: impl Fn(&Parcel) -> bool) -> Vec<Parcel> {
    state
        .parcels
        .iter()
        .filter(|entry| entry.value().rider_email.as_deref() == Some(email))
        .filter(|entry| keep(entry.value()))
        .map(|entry| entry.value().clone())
        .collect()
}

async fn apply_rider(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<ApplyRiderRequest>,
) -> Result<(StatusCode, Json<Rider>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if payload.district.trim().is_empty() {
        return Err(AppError::BadRequest("district cannot be empty".to_string()));
    }

    let rider = Rider {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        email: user.email.clone(),
        phone: payload.phone,
        district: payload.district.trim().to_string(),
        status: RiderStatus::Pending,
        work_status: WorkStatus::Idle,
        total_earning: 0.0,
        created_at: Utc::now(),
    };

    if !state.insert_rider(rider.clone()) {
        return Err(AppError::Conflict(format!(
            "{} has already applied",
            user.email
        )));
    }
    info!(rider_id = %rider.id, email = %rider.email, "rider application received");
    Ok((StatusCode::CREATED, Json(rider)))
}

async fn list_riders(State(state): State<Arc<AppState>>, _admin: AdminUser) -> Json<Vec<Rider>> {
    Json(collect_riders(&state, |_| true))
}

async fn pending_riders(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Json<Vec<Rider>> {
    Json(collect_riders(&state, |rider| {
        rider.status == RiderStatus::Pending
    }))
}

async fn active_riders(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<Rider>> {
    let needle = query
        .search
        .map(|search| search.trim().to_lowercase())
        .filter(|search| !search.is_empty());

    Json(collect_riders(&state, |rider| {
        rider.status == RiderStatus::Active
            && needle.as_ref().is_none_or(|needle| {
                rider.name.to_lowercase().contains(needle) || rider.email.contains(needle)
            })
    }))
}

/// Riders that can take a parcel right now, optionally limited to a district.
async fn available_riders(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<DistrictQuery>,
) -> Json<Vec<Rider>> {
    let district = query
        .district
        .map(|district| district.trim().to_string())
        .filter(|district| !district.is_empty());

    Json(collect_riders(&state, |rider| {
        rider.is_available()
            && district
                .as_ref()
                .is_none_or(|district| rider.district.eq_ignore_ascii_case(district))
    }))
}

async fn update_rider_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Rider>, AppError> {
    let _guard = state.lifecycle_lock.lock().await;

    let rider = {
        let mut rider = state
            .riders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("rider {} not found", id)))?;

        if payload.status == RiderStatus::Pending && rider.work_status == WorkStatus::InDelivery {
            return Err(AppError::Conflict(format!(
                "rider {} is in delivery",
                id
            )));
        }

        rider.status = payload.status;
        rider.clone()
    };

    match payload.status {
        RiderStatus::Active => match state.user_by_email(&rider.email) {
            Some(user) if user.role == Role::Admin => {}
            Some(_) => {
                state.set_role_by_email(&rider.email, Role::Rider);
            }
            None => {
                state.register_user(&rider.email, Some(rider.name.clone()), Role::Rider);
            }
        },
        RiderStatus::Pending => {
            let is_rider = state
                .user_by_email(&rider.email)
                .is_some_and(|user| user.role == Role::Rider);
            if is_rider {
                state.set_role_by_email(&rider.email, Role::User);
            }
        }
    }

    info!(rider_id = %id, status = ?payload.status, by = %admin.email, "rider status updated");
    Ok(Json(rider))
}

async fn earnings(
    State(state): State<Arc<AppState>>,
    RiderUser(user): RiderUser,
) -> Result<Json<RiderEarnings>, AppError> {
    let rider = state
        .rider_by_email(&user.email)
        .ok_or_else(|| AppError::NotFound(format!("rider {} not found", user.email)))?;

    let delivered = parcels_of(&state, &user.email, |parcel| {
        parcel.delivery_status == DeliveryStatus::Delivered
    });
    let earned_with = |money: RiderMoney| {
        delivered
            .iter()
            .filter(|parcel| parcel.rider_money == money)
            .filter_map(|parcel| parcel.rider_earning)
            .fold(0.0, |total, earning| total + earning)
    };

    Ok(Json(RiderEarnings {
        total_earning: rider.total_earning,
        cashed_out: earned_with(RiderMoney::CashedOut),
        pending_cashout: earned_with(RiderMoney::None),
        delivered_count: delivered.len(),
    }))
}

async fn assigned_parcels(
    State(state): State<Arc<AppState>>,
    RiderUser(user): RiderUser,
) -> Json<Vec<Parcel>> {
    let mut parcels = parcels_of(&state, &user.email, |parcel| {
        parcel.delivery_status != DeliveryStatus::Delivered
    });
    parcels.sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at));
    Json(parcels)
}

async fn completed_parcels(
    State(state): State<Arc<AppState>>,
    RiderUser(user): RiderUser,
) -> Json<Vec<Parcel>> {
    let mut parcels = parcels_of(&state, &user.email, |parcel| {
        parcel.delivery_status == DeliveryStatus::Delivered
    });
    parcels.sort_by(|a, b| b.delivered_at.cmp(&a.delivered_at));
    Json(parcels)
}
