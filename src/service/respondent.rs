//! Respondent store service

use super::hash_password;
use crate::domain::{
    CreateRespondentInput, Instance, NewRespondent, Respondent, RespondentOrigin, StringUuid,
    UpdateRespondentInput, VerifiedIdentity,
};
use crate::error::{AppError, Result};
use crate::import::{map_rows, ColumnMapping, Dataset};
use crate::repository::RespondentRepository;
use rand::{distributions::Alphanumeric, Rng};
use std::sync::Arc;
use validator::Validate;

pub struct RespondentService<R: RespondentRepository> {
    repo: Arc<R>,
}

impl<R: RespondentRepository> RespondentService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn list_by_origin(
        &self,
        instance_id: StringUuid,
        origin: RespondentOrigin,
    ) -> Result<Vec<Respondent>> {
        self.repo.list_by_origin(instance_id, origin).await
    }

    pub async fn get_by_username(
        &self,
        instance_id: StringUuid,
        username: &str,
        origin: Option<RespondentOrigin>,
    ) -> Result<Respondent> {
        self.repo
            .find_by_username(instance_id, username, origin)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Respondent '{}' not found", username)))
    }

    /// Create a single respondent; duplicate (instance, username) is a
    /// Conflict straight from the storage constraint.
    pub async fn create(
        &self,
        instance_id: StringUuid,
        origin: RespondentOrigin,
        fields: NewRespondent,
    ) -> Result<Respondent> {
        fields.validate()?;

        let input = CreateRespondentInput {
            instance_id,
            origin,
            first_name: fields.first_name,
            last_name: fields.last_name,
            username: fields.username,
            password_hash: hash_password(&fields.password)?,
        };
        self.repo.insert(&input).await
    }

    /// Idempotent per (instance, email): re-verification of a known OAuth
    /// identity returns the existing record. The stored credential is a
    /// hashed random placeholder; OAuth respondents never authenticate by
    /// password.
    pub async fn upsert_oauth_identity(
        &self,
        instance: &Instance,
        identity: &VerifiedIdentity,
    ) -> Result<Respondent> {
        if let Some(existing) = self
            .repo
            .find_by_username(
                instance.id,
                &identity.email,
                Some(RespondentOrigin::OauthVerified),
            )
            .await?
        {
            return Ok(existing);
        }

        let placeholder: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        let input = CreateRespondentInput {
            instance_id: instance.id,
            origin: RespondentOrigin::OauthVerified,
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            username: identity.email.clone(),
            password_hash: hash_password(&placeholder)?,
        };

        match self.repo.insert(&input).await {
            Ok(respondent) => Ok(respondent),
            // Lost a creation race with a concurrent verification of the
            // same identity; the winner's record is the answer.
            Err(AppError::Conflict(msg)) => self
                .repo
                .find_by_username(
                    instance.id,
                    &identity.email,
                    Some(RespondentOrigin::OauthVerified),
                )
                .await?
                .ok_or(AppError::Conflict(msg)),
            Err(e) => Err(e),
        }
    }

    /// Bulk import: validate everything, hash passwords, then commit the
    /// batch in one transaction. No respondent is committed unless all are.
    pub async fn import(
        &self,
        instance: &Instance,
        mapping: &ColumnMapping,
        dataset: &Dataset,
    ) -> Result<u64> {
        let rows = map_rows(dataset, mapping)?;

        let mut inputs = Vec::with_capacity(rows.len());
        for row in rows {
            inputs.push(CreateRespondentInput {
                instance_id: instance.id,
                origin: RespondentOrigin::ListImported,
                first_name: row.first_name,
                last_name: row.last_name,
                username: row.username,
                password_hash: hash_password(&row.password)?,
            });
        }

        self.repo.insert_batch(&inputs).await
    }

    pub async fn update(
        &self,
        instance_id: StringUuid,
        username: &str,
        input: UpdateRespondentInput,
    ) -> Result<Respondent> {
        input.validate()?;
        self.repo.update(instance_id, username, &input).await
    }

    pub async fn delete(&self, instance_id: StringUuid, username: &str) -> Result<()> {
        self.repo.delete(instance_id, username).await
    }
}
