//! Client for the external payment gateway.
//!
//! Only payment-intent creation is exposed; the gateway keeps its own state
//! and the service records completed payments in its ledger separately.

use std::time::Duration;

use axum::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::PaymentConfig;
use crate::error::AppError;
use crate::models::payment::PaymentIntent;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(&self, amount: u64) -> Result<PaymentIntent, AppError>;
}

/// Stripe-compatible gateway talking to `POST /v1/payment_intents`.
pub struct StripeGateway {
    client: Client,
    api_key: String,
    base_url: String,
    currency: String,
}

#[derive(Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
    amount: u64,
    currency: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: GatewayErrorBody,
}

#[derive(Deserialize)]
struct GatewayErrorBody {
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(&self, amount: u64) -> Result<PaymentIntent, AppError> {
        let url = format!("{}/v1/payment_intents", self.base_url);
        let amount_field = amount.to_string();
        let form = [
            ("amount", amount_field.as_str()),
            ("currency", self.currency.as_str()),
            ("payment_method_types[]", "card"),
        ];

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .form(&form)
            .send()
            .await
            .map_err(|err| {
                error!(error = %err, "payment gateway unreachable");
                AppError::Gateway(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| format!("gateway responded with {status}"));
            error!(%status, %message, "payment intent rejected");
            return Err(AppError::Gateway(message));
        }

        let intent = response
            .json::<IntentResponse>()
            .await
            .map_err(|err| AppError::Gateway(format!("malformed gateway response: {err}")))?;

        info!(intent_id = %intent.id, amount = intent.amount, "payment intent created");

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency,
        })
    }
}
