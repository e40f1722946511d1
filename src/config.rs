use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub json_logs: bool,
    pub event_buffer_size: usize,
    pub identity: IdentityConfig,
    pub payment: PaymentConfig,
    pub earnings: EarningRates,
    pub bootstrap_admin_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub api_key: String,
    pub base_url: String,
    pub currency: String,
    pub timeout_secs: u64,
}

/// Share of a parcel's cost credited to the rider who delivers it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarningRates {
    pub same_district: f64,
    pub cross_district: f64,
}

impl Default for EarningRates {
    fn default() -> Self {
        Self {
            same_district: 0.8,
            cross_district: 0.3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 5000,
            log_level: "info".to_string(),
            json_logs: false,
            event_buffer_size: 1024,
            identity: IdentityConfig {
                secret: String::new(),
                issuer: "parcel-identity".to_string(),
                audience: "parcel-service".to_string(),
            },
            payment: PaymentConfig {
                api_key: String::new(),
                base_url: "https://api.stripe.com".to_string(),
                currency: "usd".to_string(),
                timeout_secs: 30,
            },
            earnings: EarningRates::default(),
            bootstrap_admin_email: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logs: env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            identity: IdentityConfig {
                secret: required("IDENTITY_JWT_SECRET")?,
                issuer: env::var("IDENTITY_ISSUER").unwrap_or(defaults.identity.issuer),
                audience: env::var("IDENTITY_AUDIENCE").unwrap_or(defaults.identity.audience),
            },
            payment: PaymentConfig {
                api_key: required("PAYMENT_GATEWAY_KEY")?,
                base_url: env::var("PAYMENT_GATEWAY_URL").unwrap_or(defaults.payment.base_url),
                currency: env::var("PAYMENT_CURRENCY").unwrap_or(defaults.payment.currency),
                timeout_secs: parse_or_default("PAYMENT_TIMEOUT_SECS", defaults.payment.timeout_secs)?,
            },
            earnings: EarningRates {
                same_district: parse_or_default("SAME_DISTRICT_RATE", defaults.earnings.same_district)?,
                cross_district: parse_or_default(
                    "CROSS_DISTRICT_RATE",
                    defaults.earnings.cross_district,
                )?,
            },
            bootstrap_admin_email: env::var("BOOTSTRAP_ADMIN_EMAIL")
                .ok()
                .map(|email| email.trim().to_lowercase())
                .filter(|email| !email.is_empty()),
        })
    }
}

fn required(key: &str) -> Result<String, AppError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Internal(format!("missing required setting {key}"))),
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
