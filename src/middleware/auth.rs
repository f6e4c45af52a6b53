//! Owner authentication extractor
//!
//! Owner identity comes from the owner-authentication subsystem as a
//! bearer token; this extractor verifies the owner scope and hands the
//! identity to handlers. Respondent-scope tokens are rejected here.

use crate::domain::StringUuid;
use crate::error::AppError;
use crate::jwt::JwtManager;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

/// Authenticated instance owner extracted from the bearer token
#[derive(Debug, Clone)]
pub struct OwnerIdentity {
    pub user_id: StringUuid,
    pub email: String,
}

impl<S> FromRequestParts<S> for OwnerIdentity
where
    JwtManager: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;

        let header = header.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid authorization header encoding".to_string())
        })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized("Authorization header must use Bearer scheme".to_string())
        })?;

        let claims = JwtManager::from_ref(state)
            .verify_owner_token(token)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        let user_id = claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))?;

        Ok(Self {
            user_id,
            email: claims.email,
        })
    }
}
