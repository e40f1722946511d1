use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::warn;

use crate::error::AppError;
use crate::models::user::Role;
use crate::state::AppState;

/// Caller whose bearer token was accepted by the identity provider.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// Authenticated caller whose stored role is `admin`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// Authenticated caller whose stored role is `rider`.
#[derive(Debug, Clone)]
pub struct RiderUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

        let identity = state.identity.verify(token).await.inspect_err(|_| {
            warn!("invalid or expired identity token");
        })?;

        Ok(AuthUser {
            uid: identity.uid,
            email: identity.email,
        })
    }
}

async fn require_role(
    parts: &mut Parts,
    state: &Arc<AppState>,
    required: Role,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;

    match state.user_by_email(&user.email) {
        Some(stored) if stored.role == required => Ok(user),
        _ => {
            warn!(email = %user.email, required = ?required, "role check failed");
            Err(AppError::Forbidden("Forbidden access".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Admin).await.map(AdminUser)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RiderUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Rider).await.map(RiderUser)
    }
}
