//! Google OAuth2 provider client

use super::IdentityProvider;
use crate::config::OAuthConfig;
use crate::domain::VerifiedIdentity;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const GOOGLE_SCOPES: &str = "openid email profile";

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Userinfo endpoint response
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: String,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

/// Google OAuth2 client
pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
    http_client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(config: &OAuthConfig) -> Self {
        Self::with_endpoints(
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
            GOOGLE_AUTH_URL.to_string(),
            GOOGLE_TOKEN_URL.to_string(),
            GOOGLE_USERINFO_URL.to_string(),
        )
    }

    /// Construct against explicit endpoints (tests point this at a local
    /// mock server).
    pub fn with_endpoints(
        client_id: String,
        client_secret: String,
        auth_url: String,
        token_url: String,
        userinfo_url: String,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client_id,
            client_secret,
            auth_url,
            token_url,
            userinfo_url,
            http_client,
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        let mut url = Url::parse(&self.auth_url).expect("Invalid authorization endpoint URL");
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("response_type", "code");
            pairs.append_pair("client_id", &self.client_id);
            pairs.append_pair("redirect_uri", redirect_uri);
            pairs.append_pair("scope", GOOGLE_SCOPES);
            pairs.append_pair("state", state);
        }
        url.to_string()
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<VerifiedIdentity> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Token exchange rejected ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Invalid token response: {}", e)))?;

        let response = self
            .http_client
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Userinfo request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Provider(format!(
                "Userinfo request rejected ({})",
                status
            )));
        }

        let userinfo: GoogleUserInfo = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Invalid userinfo response: {}", e)))?;

        Ok(VerifiedIdentity {
            email: userinfo.email,
            first_name: userinfo.given_name.unwrap_or_default(),
            last_name: userinfo.family_name.unwrap_or_default(),
        })
    }
}
