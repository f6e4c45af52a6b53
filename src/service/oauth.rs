//! OAuth exchange coordinator
//!
//! Orchestrates the two-step handshake with the external identity
//! provider. Each handshake's context is stashed under its own
//! anti-forgery state value with a short TTL; a callback whose state
//! cannot be found in the stash (expired, replayed or forged) fails
//! closed.

use super::{Admission, AdmissionService, CredentialService, RespondentService};
use crate::cache::{HandshakeEntry, HandshakeStore};
use crate::config::OAuthConfig;
use crate::error::{AppError, Result};
use crate::oauth::{generate_state, IdentityProvider, GOOGLE_PROVIDER};
use crate::repository::{InstanceRepository, OwnerAccountRepository, RespondentRepository};
use std::sync::Arc;
use url::Url;

/// Where the callback sends the respondent's browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Admitted: redirect carries the access token
    Granted { redirect_url: String },
    /// Rejected by the domain admission policy
    Denied { redirect_url: String },
}

impl CallbackOutcome {
    pub fn redirect_url(&self) -> &str {
        match self {
            CallbackOutcome::Granted { redirect_url } => redirect_url,
            CallbackOutcome::Denied { redirect_url } => redirect_url,
        }
    }
}

pub struct OAuthService<P, H, I, R, O>
where
    P: IdentityProvider,
    H: HandshakeStore,
    I: InstanceRepository,
    R: RespondentRepository,
    O: OwnerAccountRepository,
{
    provider: Arc<P>,
    store: Arc<H>,
    instances: Arc<I>,
    respondents: Arc<RespondentService<R>>,
    admission: Arc<AdmissionService<O>>,
    credentials: Arc<CredentialService<R>>,
    config: OAuthConfig,
}

impl<P, H, I, R, O> OAuthService<P, H, I, R, O>
where
    P: IdentityProvider,
    H: HandshakeStore,
    I: InstanceRepository,
    R: RespondentRepository,
    O: OwnerAccountRepository,
{
    pub fn new(
        provider: Arc<P>,
        store: Arc<H>,
        instances: Arc<I>,
        respondents: Arc<RespondentService<R>>,
        admission: Arc<AdmissionService<O>>,
        credentials: Arc<CredentialService<R>>,
        config: OAuthConfig,
    ) -> Self {
        Self {
            provider,
            store,
            instances,
            respondents,
            admission,
            credentials,
            config,
        }
    }

    /// Begin a handshake: validate the redirect target, stash the instance
    /// context under a fresh state value and hand back the provider's
    /// authorization URL for the caller to redirect to.
    pub async fn start(
        &self,
        instance_hash: &str,
        provider_name: &str,
        redirect_uri: &str,
    ) -> Result<String> {
        if provider_name != GOOGLE_PROVIDER {
            return Err(AppError::BadRequest(format!(
                "Unknown identity provider '{}'",
                provider_name
            )));
        }

        if !self
            .config
            .allowed_redirect_uris
            .iter()
            .any(|uri| uri == redirect_uri)
        {
            return Err(AppError::BadRequest("Invalid redirect URI".to_string()));
        }

        let instance = self
            .instances
            .find_by_hash(instance_hash)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Instance with the provided hash does not exist".to_string())
            })?;

        let state = generate_state();
        let entry = HandshakeEntry {
            instance_hash: instance.hash.clone(),
            redirect_uri: redirect_uri.to_string(),
        };
        self.store.put(&state, &entry).await?;

        Ok(self.provider.authorization_url(redirect_uri, &state))
    }

    /// Complete a handshake: consume the stash, exchange the code, run
    /// admission and either mint a token or send the respondent to the
    /// not-allowed destination.
    pub async fn callback(&self, code: &str, state: &str) -> Result<CallbackOutcome> {
        let entry = self
            .store
            .take(state)
            .await?
            .ok_or(AppError::HandshakeExpired)?;

        let instance = self
            .instances
            .find_by_hash(&entry.instance_hash)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Instance with the provided hash does not exist".to_string())
            })?;

        let identity = self
            .provider
            .exchange_code(code, &entry.redirect_uri)
            .await?;

        match self.admission.admit(&instance, &identity).await? {
            Admission::Rejected => Ok(CallbackOutcome::Denied {
                redirect_url: self.config.frontend_not_allowed_url.clone(),
            }),
            Admission::Accepted => {
                let respondent = self
                    .respondents
                    .upsert_oauth_identity(&instance, &identity)
                    .await?;

                // The respondent record now carries the identity; the
                // provisional account from the external exchange goes away
                // on this path too.
                self.admission
                    .discard_provisional_account(&identity.email)
                    .await?;

                let token = self.credentials.issue_for_oauth_identity(&respondent)?;

                let mut redirect_url = Url::parse(&self.config.frontend_redirect_url)
                    .map_err(|e| {
                        AppError::Internal(anyhow::anyhow!("Invalid frontend redirect URL: {}", e))
                    })?;
                redirect_url.query_pairs_mut().append_pair("access", &token);

                Ok(CallbackOutcome::Granted {
                    redirect_url: redirect_url.into(),
                })
            }
        }
    }
}
