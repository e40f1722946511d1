use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::parcels::is_admin;
use crate::auth::AuthUser;
use crate::engine::lifecycle::{self, PaymentDraft};
use crate::error::AppError;
use crate::models::payment::Payment;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments", get(list_payments).post(create_payment))
        .route("/create-payment-intent", post(create_payment_intent))
}

#[derive(Deserialize)]
pub struct PaymentQuery {
    pub email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub parcel_id: Uuid,
    pub amount: f64,
    pub payment_method: String,
    #[serde(alias = "tnxId")]
    pub transaction_id: String,
}

#[derive(Deserialize)]
pub struct PaymentIntentRequest {
    pub amount: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

async fn list_payments(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<PaymentQuery>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let email = query
        .email
        .map(|email| email.trim().to_lowercase())
        .unwrap_or_else(|| user.email.clone());

    if email != user.email && !is_admin(&state, &user.email) {
        return Err(AppError::Forbidden("Forbidden access".to_string()));
    }

    let mut payments: Vec<Payment> = state
        .payments
        .iter()
        .filter(|entry| entry.value().email == email)
        .map(|entry| entry.value().clone())
        .collect();
    payments.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));

    Ok(Json(payments))
}

async fn create_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<Json<Payment>, AppError> {
    let payment = lifecycle::record_payment(
        &state,
        &user.email,
        PaymentDraft {
            parcel_id: payload.parcel_id,
            amount: payload.amount,
            payment_method: payload.payment_method,
            transaction_id: payload.transaction_id,
        },
    )
    .await?;

    Ok(Json(payment))
}

async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(payload): Json<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, AppError> {
    if payload.amount == 0 {
        return Err(AppError::BadRequest("amount must be > 0".to_string()));
    }

    let intent = state.gateway.create_payment_intent(payload.amount).await?;
    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}
