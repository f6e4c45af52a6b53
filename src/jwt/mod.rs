//! JWT token handling
//!
//! One process secret signs two independent scopes, separated by audience
//! and a `token_type` discriminator: owner tokens (issued by the owner
//! subsystem, verified here) and respondent tokens (issued here, scoped to
//! a single instance respondent). Neither scope verifies as the other.

use crate::config::JwtConfig;
use crate::error::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audience claim for owner-scope tokens
pub const OWNER_AUDIENCE: &str = "formgate-owner";
/// Audience claim for respondent-scope tokens
pub const RESPONDENT_AUDIENCE: &str = "formgate-respondent";

/// Owner token claims (issued by the owner-authentication subsystem)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerClaims {
    /// Subject (owner account ID)
    pub sub: String,
    /// Email
    pub email: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Token type discriminator (prevents token confusion across scopes)
    #[serde(default)]
    pub token_type: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Respondent token claims (issued after respondent authentication)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondentClaims {
    /// Subject (respondent ID)
    pub sub: String,
    /// Respondent username within the instance
    pub username: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Token type discriminator (prevents token confusion across scopes)
    #[serde(default)]
    pub token_type: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// JWT token manager
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Create a Validation with a strict leeway (5 seconds) instead of the
    /// default 60 seconds, so tokens expire promptly while tolerating minor
    /// clock skew.
    fn strict_validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.leeway = 5;
        v
    }

    /// Create a respondent access token (fixed lifetime, default 24h)
    pub fn create_respondent_token(&self, respondent_id: Uuid, username: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.respondent_token_ttl_secs);

        let claims = RespondentClaims {
            sub: respondent_id.to_string(),
            username: username.to_string(),
            iss: self.config.issuer.clone(),
            aud: RESPONDENT_AUDIENCE.to_string(),
            token_type: "respondent".to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key).map_err(|e| AppError::Internal(e.into()))
    }

    /// Verify and decode a respondent token
    pub fn verify_respondent_token(&self, token: &str) -> Result<RespondentClaims> {
        let mut validation = self.strict_validation();
        validation.set_audience(&[RESPONDENT_AUDIENCE]);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<RespondentClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }

    /// Create an owner token. In production owner tokens come from the
    /// owner-authentication subsystem (same process secret); this mirrors
    /// its claims for local tooling and tests.
    pub fn create_owner_token(&self, owner_id: Uuid, email: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(1);

        let claims = OwnerClaims {
            sub: owner_id.to_string(),
            email: email.to_string(),
            iss: self.config.issuer.clone(),
            aud: OWNER_AUDIENCE.to_string(),
            token_type: "owner".to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key).map_err(|e| AppError::Internal(e.into()))
    }

    /// Verify and decode an owner token
    pub fn verify_owner_token(&self, token: &str) -> Result<OwnerClaims> {
        let mut validation = self.strict_validation();
        validation.set_audience(&[OWNER_AUDIENCE]);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<OwnerClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }

    /// Respondent token TTL in seconds
    pub fn respondent_token_ttl(&self) -> i64 {
        self.config.respondent_token_ttl_secs
    }
}
