use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::rest::parcels::is_admin;
use crate::auth::{AdminUser, AuthUser};
use crate::error::AppError;
use crate::models::rider::WorkStatus;
use crate::models::user::{Role, User};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(register_user))
        .route("/users/role", get(get_role))
        .route("/users/search", get(search_users))
        .route("/users/:id/role", patch(update_role))
}

#[derive(Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterUserResponse {
    pub message: &'static str,
    pub inserted: bool,
    pub user: User,
}

#[derive(Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

#[derive(Serialize)]
pub struct RoleResponse {
    pub role: Role,
}

#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<RegisterUserResponse>), AppError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::BadRequest("email is required".to_string()));
    }
    if email != user.email && !is_admin(&state, &user.email) {
        return Err(AppError::Forbidden("Forbidden access".to_string()));
    }

    let (stored, inserted) = state.register_user(&email, payload.name, Role::User);

    if inserted {
        info!(user_id = %stored.id, email = %stored.email, "user registered");
        Ok((
            StatusCode::CREATED,
            Json(RegisterUserResponse {
                message: "User created",
                inserted,
                user: stored,
            }),
        ))
    } else {
        Ok((
            StatusCode::OK,
            Json(RegisterUserResponse {
                message: "User already exists",
                inserted,
                user: stored,
            }),
        ))
    }
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Json<Vec<User>> {
    let mut users: Vec<User> = state
        .users
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(users)
}

async fn get_role(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<EmailQuery>,
) -> Result<Json<RoleResponse>, AppError> {
    let email = query
        .email
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("email is required".to_string()))?;

    let user = state
        .user_by_email(&email)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(RoleResponse { role: user.role }))
}

async fn search_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<EmailQuery>,
) -> Json<Vec<User>> {
    let Some(needle) = query
        .email
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
    else {
        return Json(Vec::new());
    };

    let users = state
        .users
        .iter()
        .filter(|entry| entry.value().email.contains(&needle))
        .map(|entry| entry.value().clone())
        .collect();
    Json(users)
}

async fn update_role(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<User>, AppError> {
    let _guard = state.lifecycle_lock.lock().await;

    let mut user = state
        .users
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", id)))?;

    // a rider mid-delivery must keep the role that lets them finish it
    let in_delivery = state
        .rider_by_email(&user.email)
        .is_some_and(|rider| rider.work_status == WorkStatus::InDelivery);
    if in_delivery && payload.role != Role::Rider {
        return Err(AppError::Conflict(format!(
            "user {} has a rider in delivery",
            id
        )));
    }

    user.role = payload.role;
    info!(user_id = %id, role = ?payload.role, by = %admin.email, "role updated");

    Ok(Json(user.clone()))
}
