//! Credential issuer
//!
//! Authenticates respondents and mints short-lived, instance-scoped access
//! tokens. Password authentication answers identically for "no such user"
//! and "wrong password" so usernames cannot be enumerated.

use super::verify_password;
use crate::domain::{Instance, Respondent, RespondentOrigin};
use crate::error::{AppError, Result};
use crate::jwt::JwtManager;
use crate::repository::RespondentRepository;
use std::sync::Arc;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub struct CredentialService<R: RespondentRepository> {
    repo: Arc<R>,
    jwt_manager: JwtManager,
    /// Hash verified on the unknown-user path to keep its timing in line
    /// with the wrong-password path.
    dummy_hash: String,
}

impl<R: RespondentRepository> CredentialService<R> {
    pub fn new(repo: Arc<R>, jwt_manager: JwtManager) -> Result<Self> {
        let dummy_hash = super::hash_password("formgate-credential-padding")?;
        Ok(Self {
            repo,
            jwt_manager,
            dummy_hash,
        })
    }

    /// Authenticate a list-origin respondent by password and mint a token.
    pub async fn authenticate_password(
        &self,
        instance: &Instance,
        username: &str,
        password: &str,
    ) -> Result<String> {
        let respondent = self
            .repo
            .find_by_username(
                instance.id,
                username,
                Some(RespondentOrigin::ListImported),
            )
            .await?;

        let Some(respondent) = respondent else {
            verify_password(password, &self.dummy_hash);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(password, &respondent.password_hash) {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.issue(&respondent)
    }

    /// Mint a token for an admitted OAuth identity; admission has already
    /// happened, so this never rejects.
    pub fn issue_for_oauth_identity(&self, respondent: &Respondent) -> Result<String> {
        self.issue(respondent)
    }

    fn issue(&self, respondent: &Respondent) -> Result<String> {
        self.jwt_manager
            .create_respondent_token(*respondent.id, &respondent.username)
    }
}
