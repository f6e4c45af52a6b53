//! Common test utilities: in-memory repository doubles and fixtures.
//!
//! The in-memory repositories enforce the same uniqueness contracts as the
//! database constraints, so service-level properties (Conflict on
//! duplicates, all-or-nothing batches) can be exercised without MySQL.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use formgate::config::{JwtConfig, OAuthConfig};
use formgate::domain::{
    CreateRespondentInput, Instance, NewInstance, OwnerAccount, Respondent, RespondentOrigin,
    StringUuid, UpdateInstanceInput, UpdateRespondentInput, VerifiedIdentity,
};
use formgate::error::{AppError, Result};
use formgate::jwt::JwtManager;
use formgate::oauth::IdentityProvider;
use formgate::repository::{InstanceRepository, OwnerAccountRepository, RespondentRepository};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn jwt_manager() -> JwtManager {
    JwtManager::new(JwtConfig {
        secret: "integration-test-secret-key".to_string(),
        issuer: "https://formgate.test".to_string(),
        respondent_token_ttl_secs: 86400,
    })
}

pub fn oauth_config() -> OAuthConfig {
    OAuthConfig {
        google_client_id: "client-id".to_string(),
        google_client_secret: "client-secret".to_string(),
        allowed_redirect_uris: vec!["http://localhost:3000/auth".to_string()],
        frontend_redirect_url: "http://localhost:3000/live".to_string(),
        frontend_not_allowed_url: "http://localhost:3000/not-allowed".to_string(),
    }
}

// ==================== Instance repository ====================

#[derive(Default)]
pub struct MemoryInstanceRepository {
    rows: Mutex<Vec<Instance>>,
}

impl MemoryInstanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl InstanceRepository for MemoryInstanceRepository {
    async fn insert(&self, input: &NewInstance) -> Result<Instance> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|i| i.hash == input.hash) {
            return Err(AppError::Conflict(format!(
                "Instance hash {} already exists",
                input.hash
            )));
        }

        let now = Utc::now();
        let instance = Instance {
            id: StringUuid::new_v4(),
            hash: input.hash.clone(),
            owner_id: input.owner_id,
            name: input.name.clone(),
            description: input.description.clone(),
            auth_type: input.auth_type,
            status: input.status,
            allowed_domains: input.allowed_domains.clone(),
            created_at: now,
            last_modified: now,
        };
        rows.push(instance.clone());
        Ok(instance)
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<Instance>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|i| i.hash == hash).cloned())
    }

    async fn list_by_owner(&self, owner_id: StringUuid) -> Result<Vec<Instance>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update(&self, id: StringUuid, input: &UpdateInstanceInput) -> Result<Instance> {
        let mut rows = self.rows.lock().unwrap();
        let instance = rows
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Instance {} not found", id)))?;

        if let Some(name) = &input.name {
            instance.name = name.clone();
        }
        if let Some(description) = &input.description {
            instance.description = description.clone();
        }
        if let Some(auth_type) = input.auth_type {
            instance.auth_type = auth_type;
        }
        if let Some(status) = input.status {
            instance.status = status;
        }
        if let Some(domains) = &input.allowed_domains {
            instance.allowed_domains = domains.clone();
        }
        instance.last_modified = Utc::now();
        Ok(instance.clone())
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|i| i.id != id);
        if rows.len() == before {
            return Err(AppError::NotFound(format!("Instance {} not found", id)));
        }
        Ok(())
    }
}

/// Instance repository double whose first N inserts report a hash
/// collision, to exercise the identifier retry path.
pub struct CollidingInstanceRepository {
    inner: MemoryInstanceRepository,
    remaining_collisions: AtomicUsize,
    pub attempts: AtomicUsize,
}

impl CollidingInstanceRepository {
    pub fn new(collisions: usize) -> Self {
        Self {
            inner: MemoryInstanceRepository::new(),
            remaining_collisions: AtomicUsize::new(collisions),
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl InstanceRepository for CollidingInstanceRepository {
    async fn insert(&self, input: &NewInstance) -> Result<Instance> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.remaining_collisions.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_collisions.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::Conflict(format!(
                "Instance hash {} already exists",
                input.hash
            )));
        }
        self.inner.insert(input).await
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<Instance>> {
        self.inner.find_by_hash(hash).await
    }

    async fn list_by_owner(&self, owner_id: StringUuid) -> Result<Vec<Instance>> {
        self.inner.list_by_owner(owner_id).await
    }

    async fn update(&self, id: StringUuid, input: &UpdateInstanceInput) -> Result<Instance> {
        self.inner.update(id, input).await
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        self.inner.delete(id).await
    }
}

// ==================== Respondent repository ====================

#[derive(Default)]
pub struct MemoryRespondentRepository {
    rows: Mutex<Vec<Respondent>>,
}

impl MemoryRespondentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn build(input: &CreateRespondentInput) -> Respondent {
        Respondent {
            id: StringUuid::new_v4(),
            instance_id: input.instance_id,
            origin: input.origin,
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            username: input.username.clone(),
            password_hash: input.password_hash.clone(),
            has_voted: false,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl RespondentRepository for MemoryRespondentRepository {
    async fn insert(&self, input: &CreateRespondentInput) -> Result<Respondent> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.instance_id == input.instance_id && r.username == input.username)
        {
            return Err(AppError::Conflict(format!(
                "Respondent '{}' already exists for this instance",
                input.username
            )));
        }
        let respondent = Self::build(input);
        rows.push(respondent.clone());
        Ok(respondent)
    }

    async fn insert_batch(&self, inputs: &[CreateRespondentInput]) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let mut staged: Vec<Respondent> = Vec::with_capacity(inputs.len());

        for input in inputs {
            let duplicate = rows
                .iter()
                .chain(staged.iter())
                .any(|r| r.instance_id == input.instance_id && r.username == input.username);
            if duplicate {
                return Err(AppError::Conflict(format!(
                    "Respondent '{}' already exists for this instance",
                    input.username
                )));
            }
            staged.push(Self::build(input));
        }

        let count = staged.len() as u64;
        rows.extend(staged);
        Ok(count)
    }

    async fn find_by_username(
        &self,
        instance_id: StringUuid,
        username: &str,
        origin: Option<RespondentOrigin>,
    ) -> Result<Option<Respondent>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|r| {
                r.instance_id == instance_id
                    && r.username == username
                    && origin.map_or(true, |o| r.origin == o)
            })
            .cloned())
    }

    async fn list_by_origin(
        &self,
        instance_id: StringUuid,
        origin: RespondentOrigin,
    ) -> Result<Vec<Respondent>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.instance_id == instance_id && r.origin == origin)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        instance_id: StringUuid,
        username: &str,
        input: &UpdateRespondentInput,
    ) -> Result<Respondent> {
        let mut rows = self.rows.lock().unwrap();
        let respondent = rows
            .iter_mut()
            .find(|r| r.instance_id == instance_id && r.username == username)
            .ok_or_else(|| AppError::NotFound(format!("Respondent '{}' not found", username)))?;

        if let Some(first_name) = &input.first_name {
            respondent.first_name = first_name.clone();
        }
        if let Some(last_name) = &input.last_name {
            respondent.last_name = last_name.clone();
        }
        if let Some(has_voted) = input.has_voted {
            respondent.has_voted = has_voted;
        }
        Ok(respondent.clone())
    }

    async fn delete(&self, instance_id: StringUuid, username: &str) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !(r.instance_id == instance_id && r.username == username));
        if rows.len() == before {
            return Err(AppError::NotFound(format!(
                "Respondent '{}' not found",
                username
            )));
        }
        Ok(())
    }
}

// ==================== Owner account repository ====================

#[derive(Default)]
pub struct MemoryOwnerRepository {
    rows: Mutex<Vec<OwnerAccount>>,
}

impl MemoryOwnerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, email: &str) -> OwnerAccount {
        let account = OwnerAccount {
            id: StringUuid::new_v4(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(account.clone());
        account
    }

    pub fn contains(&self, email: &str) -> bool {
        self.rows.lock().unwrap().iter().any(|a| a.email == email)
    }
}

#[async_trait]
impl OwnerAccountRepository for MemoryOwnerRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<OwnerAccount>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|a| a.email == email).cloned())
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|a| a.id != id);
        if rows.len() == before {
            return Err(AppError::NotFound(format!("Account {} not found", id)));
        }
        Ok(())
    }
}

// ==================== Identity provider doubles ====================

/// Provider double that verifies every exchange to the same identity
pub struct StaticProvider {
    pub identity: VerifiedIdentity,
}

impl StaticProvider {
    pub fn new(email: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            identity: VerifiedIdentity {
                email: email.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticProvider {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "https://provider.test/auth?redirect_uri={}&state={}",
            redirect_uri, state
        )
    }

    async fn exchange_code(&self, _code: &str, _redirect_uri: &str) -> Result<VerifiedIdentity> {
        Ok(self.identity.clone())
    }
}

/// Provider double whose exchange always fails
pub struct FailingProvider;

#[async_trait]
impl IdentityProvider for FailingProvider {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "https://provider.test/auth?redirect_uri={}&state={}",
            redirect_uri, state
        )
    }

    async fn exchange_code(&self, _code: &str, _redirect_uri: &str) -> Result<VerifiedIdentity> {
        Err(AppError::Provider("invalid_grant".to_string()))
    }
}
