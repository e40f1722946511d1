pub mod extractors;

use axum::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::IdentityConfig;
use crate::error::AppError;

pub use extractors::{AdminUser, AuthUser, RiderUser};

/// Identity established by the external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: String,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AppError>;
}

/// Claims carried by identity tokens issued by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

pub struct JwtIdentityVerifier {
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    pub fn new(config: &IdentityConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(std::slice::from_ref(&config.audience));
        validation.set_issuer(std::slice::from_ref(&config.issuer));

        Self {
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AppError> {
        let data = decode::<IdentityClaims>(token, &self.decoding, &self.validation)
            .map_err(|err| {
                debug!(error = %err, "identity token rejected");
                AppError::Forbidden("Forbidden access".to_string())
            })?;

        let email = data.claims.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::Forbidden("Forbidden access".to_string()));
        }

        Ok(VerifiedIdentity {
            uid: data.claims.sub,
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    fn config() -> IdentityConfig {
        IdentityConfig {
            secret: "dev-secret".to_string(),
            issuer: "test-issuer".to_string(),
            audience: "test-aud".to_string(),
        }
    }

    fn sign(secret: &str, iss: &str, aud: &str, email: &str, ttl: Duration) -> String {
        let now = Utc::now();
        let claims = IdentityClaims {
            sub: "uid-1".to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: iss.to_string(),
            aud: aud.to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("sign token")
    }

    #[tokio::test]
    async fn accepts_valid_token_and_normalizes_email() {
        let verifier = JwtIdentityVerifier::new(&config());
        let token = sign(
            "dev-secret",
            "test-issuer",
            "test-aud",
            " Alice@Example.com",
            Duration::minutes(5),
        );

        let identity = verifier.verify(&token).await.expect("verify token");
        assert_eq!(identity.uid, "uid-1");
        assert_eq!(identity.email, "alice@example.com");
    }

    #[tokio::test]
    async fn rejects_wrong_audience() {
        let verifier = JwtIdentityVerifier::new(&config());
        let token = sign(
            "dev-secret",
            "test-issuer",
            "other-aud",
            "a@example.com",
            Duration::minutes(5),
        );

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let verifier = JwtIdentityVerifier::new(&config());
        let token = sign(
            "dev-secret",
            "test-issuer",
            "test-aud",
            "a@example.com",
            Duration::hours(-2),
        );

        assert!(verifier.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn rejects_foreign_signature() {
        let verifier = JwtIdentityVerifier::new(&config());
        let token = sign(
            "other-secret",
            "test-issuer",
            "test-aud",
            "a@example.com",
            Duration::minutes(5),
        );

        assert!(verifier.verify(&token).await.is_err());
    }
}
