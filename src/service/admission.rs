//! Domain admission policy
//!
//! Gates OAuth-origin respondent creation on the instance's allowed-domain
//! list. The external provider completes its own handshake before we can
//! see the email, so a provisional owner account may already exist by the
//! time admission runs; rejection destroys it.

use crate::domain::{Instance, VerifiedIdentity};
use crate::error::{AppError, Result};
use crate::repository::OwnerAccountRepository;
use std::sync::Arc;

/// Outcome of the admission decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Rejected,
}

pub struct AdmissionService<O: OwnerAccountRepository> {
    owners: Arc<O>,
}

impl<O: OwnerAccountRepository> AdmissionService<O> {
    pub fn new(owners: Arc<O>) -> Self {
        Self { owners }
    }

    /// Decide admission for a verified identity. The wildcard sentinel
    /// admits everyone; otherwise the email's domain (everything after the
    /// first `@`) must be a member of the allow-list. Rejection also purges
    /// any provisional account for that email.
    pub async fn admit(
        &self,
        instance: &Instance,
        identity: &VerifiedIdentity,
    ) -> Result<Admission> {
        if instance.allows_any_domain() {
            return Ok(Admission::Accepted);
        }

        let domain = identity.email.split_once('@').map(|(_, domain)| domain);
        let admitted = match domain {
            Some(domain) => instance.allowed_domains.iter().any(|d| d == domain),
            None => false,
        };

        if admitted {
            Ok(Admission::Accepted)
        } else {
            tracing::info!(
                instance = %instance.hash,
                "Rejected identity outside allowed domains"
            );
            self.discard_provisional_account(&identity.email).await?;
            Ok(Admission::Rejected)
        }
    }

    /// Delete the provisional account the external exchange may have
    /// created for this email. A missing account is not an error.
    pub async fn discard_provisional_account(&self, email: &str) -> Result<()> {
        if let Some(account) = self.owners.find_by_email(email).await? {
            match self.owners.delete(account.id).await {
                Ok(()) | Err(AppError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
