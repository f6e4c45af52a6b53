//! External identity provider client
//!
//! The provider is a black box behind [`IdentityProvider`]: given a
//! redirect it produces an authorization URL, and given the callback code
//! it returns a verified identity (email, first name, last name).

pub mod google;

pub use google::GoogleProvider;

use crate::domain::VerifiedIdentity;
use crate::error::Result;
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};

/// Provider path segment recognized by the handshake endpoints
pub const GOOGLE_PROVIDER: &str = "google";

/// Length of generated anti-forgery state tokens
const STATE_LEN: usize = 32;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the provider's authorization URL for the given redirect and
    /// anti-forgery state.
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String;

    /// Complete the code exchange and return the verified identity.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<VerifiedIdentity>;
}

/// Generate a fresh anti-forgery state token
pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}
