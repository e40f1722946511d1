#![allow(dead_code)]

use std::sync::Arc;

use axum::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use parcel_service::api::rest::router;
use parcel_service::auth::{IdentityClaims, JwtIdentityVerifier};
use parcel_service::config::{Config, IdentityConfig};
use parcel_service::error::AppError;
use parcel_service::gateway::PaymentGateway;
use parcel_service::models::payment::PaymentIntent;
use parcel_service::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";
pub const ISSUER: &str = "test-issuer";
pub const AUDIENCE: &str = "test-aud";
pub const ADMIN: &str = "admin@example.com";

pub struct FakeGateway {
    pub fail: bool,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_intent(&self, amount: u64) -> Result<PaymentIntent, AppError> {
        if self.fail {
            return Err(AppError::Gateway("card_declined".to_string()));
        }
        Ok(PaymentIntent {
            id: format!("pi_{amount}"),
            client_secret: format!("pi_{amount}_secret"),
            amount,
            currency: "usd".to_string(),
        })
    }
}

pub fn config() -> Config {
    Config {
        identity: IdentityConfig {
            secret: SECRET.to_string(),
            issuer: ISSUER.to_string(),
            audience: AUDIENCE.to_string(),
        },
        bootstrap_admin_email: Some(ADMIN.to_string()),
        ..Config::default()
    }
}

pub fn setup_with_gateway(fail: bool) -> (Router, Arc<AppState>) {
    let config = config();
    let state = Arc::new(AppState::new(
        &config,
        Arc::new(JwtIdentityVerifier::new(&config.identity)),
        Arc::new(FakeGateway { fail }),
    ));
    (router(state.clone()), state)
}

pub fn setup() -> (Router, Arc<AppState>) {
    setup_with_gateway(false)
}

pub fn token(email: &str) -> String {
    let now = Utc::now();
    let claims = IdentityClaims {
        sub: format!("uid-{email}"),
        email: email.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(10)).timestamp(),
        iss: ISSUER.to_string(),
        aud: AUDIENCE.to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn request(method: &str, uri: &str, email: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(email) = email {
        builder = builder.header("authorization", format!("Bearer {}", token(email)));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

pub fn parcel_body(sender_district: &str, receiver_district: &str, cost: f64) -> Value {
    json!({
        "title": "Birthday gift",
        "parcel_type": "non_document",
        "weight_kg": 1.5,
        "sender_name": "Sam",
        "sender_district": sender_district,
        "receiver_name": "Rae",
        "receiver_district": receiver_district,
        "receiver_address": "12 Lake Road",
        "cost": cost
    })
}

pub async fn create_parcel(app: &Router, owner: &str, cost: f64) -> Value {
    let (status, body) = send(
        app,
        request("POST", "/parcels", Some(owner), Some(parcel_body("Dhaka", "Dhaka", cost))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

pub async fn pay_parcel(app: &Router, owner: &str, parcel: &Value) -> Value {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/payments",
            Some(owner),
            Some(json!({
                "parcelId": parcel["id"],
                "amount": parcel["cost"],
                "paymentMethod": "card",
                "transactionId": "pi_test_1"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

/// Registers `email`, files a rider application and has the admin approve it.
pub async fn active_rider(app: &Router, email: &str, district: &str) -> Value {
    let (status, _) = send(
        app,
        request("POST", "/users", Some(email), Some(json!({ "email": email }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, rider) = send(
        app,
        request(
            "POST",
            "/riders",
            Some(email),
            Some(json!({ "name": "Rider Ron", "phone": "555-0100", "district": district })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = rider["id"].as_str().unwrap();
    let (status, rider) = send(
        app,
        request(
            "PATCH",
            &format!("/riders/{id}/status"),
            Some(ADMIN),
            Some(json!({ "status": "active" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    rider
}
