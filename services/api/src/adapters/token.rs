//! services/api/src/adapters/token.rs
//!
//! This module contains the session token adapter. It implements the
//! `SessionTokenService` port with HS256-signed JSON Web Tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use taskboard_core::domain::{IssuedToken, SessionIdentity};
use taskboard_core::ports::{PortError, PortResult, SessionTokenService};
use tracing::debug;

use crate::config::{Config, ConfigError};

/// The signed claims: the identity payload as given, plus issue and expiry times.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    identity: Map<String, Value>,
    iat: i64,
    exp: i64,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `SessionTokenService` port using JWTs.
#[derive(Clone)]
pub struct JwtSessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtSessionTokens {
    /// Creates a new `JwtSessionTokens` signing with `secret`.
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let ttl = Duration::from_std(config.token_ttl).map_err(|e| {
            ConfigError::InvalidValue("TOKEN_TTL_HOURS".to_string(), e.to_string())
        })?;
        Ok(Self::new(config.token_secret.as_bytes(), ttl))
    }
}

//=========================================================================================
// `SessionTokenService` Trait Implementation
//=========================================================================================

impl SessionTokenService for JwtSessionTokens {
    fn issue(&self, identity: &SessionIdentity) -> PortResult<IssuedToken> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.ttl;

        let mut payload = identity.claims().clone();
        payload.remove("iat");
        payload.remove("exp");
        let claims = Claims {
            identity: payload,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| PortError::Unexpected(format!("failed to sign session token: {}", e)))?;
        Ok(IssuedToken {
            token,
            expires_at,
            ttl: self.ttl,
        })
    }

    fn verify(&self, token: &str) -> PortResult<SessionIdentity> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!("Rejected session token: {}", e);
            PortError::Unauthorized
        })?;
        Ok(SessionIdentity::new(data.claims.identity))
    }
}
