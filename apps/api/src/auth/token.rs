//! Bearer token issuance and verification.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const MIN_SECRET_KEY_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employer,
    User,
}

/// Claims carried by every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Payload {
    pub fn new(email: &str, role: Role, duration: Duration) -> Self {
        let issued_at = Utc::now().timestamp();
        Payload {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
            iat: issued_at,
            exp: issued_at.saturating_add(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is invalid")]
    Invalid,

    #[error("secret key must be at least {MIN_SECRET_KEY_SIZE} characters")]
    WeakKey,

    #[error("token encoding failed: {0}")]
    Encode(String),
}

/// Issues and verifies bearer tokens.
///
/// Carried in `AppState` as `Arc<dyn TokenMaker>`.
pub trait TokenMaker: Send + Sync {
    fn create_token(
        &self,
        email: &str,
        role: Role,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError>;

    fn verify_token(&self, token: &str) -> Result<Payload, TokenError>;
}

/// HS256 JSON Web Tokens signed with a symmetric key.
pub struct JwtMaker {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtMaker {
    pub fn new(secret_key: &str) -> Result<Self, TokenError> {
        if secret_key.len() < MIN_SECRET_KEY_SIZE {
            return Err(TokenError::WeakKey);
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Ok(JwtMaker {
            encoding: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding: DecodingKey::from_secret(secret_key.as_bytes()),
            validation,
        })
    }
}

impl TokenMaker for JwtMaker {
    fn create_token(
        &self,
        email: &str,
        role: Role,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError> {
        let payload = Payload::new(email, role, duration);
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &payload, &self.encoding)
            .map_err(|err| TokenError::Encode(err.to_string()))?;
        Ok((token, payload))
    }

    fn verify_token(&self, token: &str) -> Result<Payload, TokenError> {
        jsonwebtoken::decode::<Payload>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
