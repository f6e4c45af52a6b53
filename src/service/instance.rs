//! Instance registry service

use crate::domain::{
    AuthType, CreateInstanceInput, Instance, InstanceStatusView, NewInstance, StringUuid,
    UpdateInstanceInput, WILDCARD_DOMAIN,
};
use crate::error::{AppError, Result};
use crate::repository::InstanceRepository;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Length of the opaque public instance identifier
pub const INSTANCE_HASH_LEN: usize = 16;

/// The identifier space makes collisions practically improbable, but the
/// contract does not assume it: insertion retries on a colliding hash.
const MAX_HASH_ATTEMPTS: u32 = 5;

/// Generate a fresh opaque instance identifier (16 hex chars)
fn generate_instance_hash() -> String {
    let mut hash = Uuid::new_v4().simple().to_string();
    hash.truncate(INSTANCE_HASH_LEN);
    hash
}

pub struct InstanceService<I: InstanceRepository> {
    repo: Arc<I>,
}

impl<I: InstanceRepository> InstanceService<I> {
    pub fn new(repo: Arc<I>) -> Self {
        Self { repo }
    }

    /// Resolve an instance by its public hash, without authorization.
    pub async fn resolve(&self, hash: &str) -> Result<Instance> {
        self.repo
            .find_by_hash(hash)
            .await?
            .ok_or_else(|| AppError::NotFound("Instance with the provided hash does not exist".to_string()))
    }

    /// Resolve an instance only if it belongs to the given owner. A foreign
    /// instance reads as NotFound, never leaking its existence.
    pub async fn resolve_for_owner(&self, hash: &str, owner_id: StringUuid) -> Result<Instance> {
        match self.repo.find_by_hash(hash).await? {
            Some(instance) if instance.owner_id == owner_id => Ok(instance),
            _ => Err(AppError::NotFound(
                "Instance with the provided hash does not exist".to_string(),
            )),
        }
    }

    pub async fn list_for_owner(&self, owner_id: StringUuid) -> Result<Vec<Instance>> {
        self.repo.list_by_owner(owner_id).await
    }

    pub async fn create(&self, owner_id: StringUuid, input: CreateInstanceInput) -> Result<Instance> {
        input.validate()?;

        let allowed_domains = match input.allowed_domains {
            Some(domains) if !domains.is_empty() => domains,
            _ if input.auth_type == AuthType::OpenWithinOrganization => {
                return Err(AppError::Validation(
                    "allowed_domains is required for organization-restricted instances".to_string(),
                ));
            }
            _ => vec![WILDCARD_DOMAIN.to_string()],
        };

        for attempt in 1..=MAX_HASH_ATTEMPTS {
            let new_instance = NewInstance {
                hash: generate_instance_hash(),
                owner_id,
                name: input.name.clone(),
                description: input.description.clone(),
                auth_type: input.auth_type,
                status: input.status,
                allowed_domains: allowed_domains.clone(),
            };

            match self.repo.insert(&new_instance).await {
                Err(AppError::Conflict(_)) => {
                    tracing::warn!(attempt, "Instance hash collision, retrying");
                    continue;
                }
                other => return other,
            }
        }

        Err(AppError::Internal(anyhow::anyhow!(
            "Exhausted instance identifier generation attempts"
        )))
    }

    /// Update an instance. Unlike owner-scoped reads, a mutation against an
    /// instance the caller does not own is a semantic PermissionDenied.
    pub async fn update(
        &self,
        hash: &str,
        owner_id: StringUuid,
        input: UpdateInstanceInput,
    ) -> Result<Instance> {
        input.validate()?;

        let existing = self.resolve(hash).await?;
        if existing.owner_id != owner_id {
            return Err(AppError::Forbidden(
                "You do not have permission to edit this instance".to_string(),
            ));
        }

        self.repo.update(existing.id, &input).await
    }

    /// Delete an instance; respondents cascade at the storage layer.
    pub async fn delete(&self, hash: &str, owner_id: StringUuid) -> Result<()> {
        let existing = self.resolve(hash).await?;
        if existing.owner_id != owner_id {
            return Err(AppError::Forbidden(
                "You do not have permission to delete this instance".to_string(),
            ));
        }

        self.repo.delete(existing.id).await
    }

    /// The only field subset exposed without authentication.
    pub async fn public_status(&self, hash: &str) -> Result<InstanceStatusView> {
        let instance = self.resolve(hash).await?;
        Ok(InstanceStatusView::from(&instance))
    }
}
