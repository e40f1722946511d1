use std::sync::Arc;

use parcel_service::api;
use parcel_service::auth::{IdentityVerifier, JwtIdentityVerifier};
use parcel_service::config::Config;
use parcel_service::error::AppError;
use parcel_service::gateway::{PaymentGateway, StripeGateway};
use parcel_service::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    if config.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(config.log_level.clone()))
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(config.log_level.clone()))
            .with_target(false)
            .compact()
            .init();
    }

    let identity: Arc<dyn IdentityVerifier> = Arc::new(JwtIdentityVerifier::new(&config.identity));
    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(&config.payment)?);

    let shared_state = Arc::new(AppState::new(&config, identity, gateway));
    if let Some(email) = &config.bootstrap_admin_email {
        tracing::info!(%email, "bootstrap admin seeded");
    }

    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    tracing::info!(
        parcels = shared_state.parcels.len(),
        payments = shared_state.payments.len(),
        "http server stopped"
    );

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
