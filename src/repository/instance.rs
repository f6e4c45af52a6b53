//! Instance repository

use crate::domain::{Instance, NewInstance, StringUuid, UpdateInstanceInput};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Insert a new instance row. A hash collision surfaces as `Conflict`
    /// so the caller can retry with a fresh hash.
    async fn insert(&self, input: &NewInstance) -> Result<Instance>;
    async fn find_by_hash(&self, hash: &str) -> Result<Option<Instance>>;
    async fn list_by_owner(&self, owner_id: StringUuid) -> Result<Vec<Instance>>;
    async fn update(&self, id: StringUuid, input: &UpdateInstanceInput) -> Result<Instance>;
    async fn delete(&self, id: StringUuid) -> Result<()>;
}

pub struct InstanceRepositoryImpl {
    pool: MySqlPool,
}

impl InstanceRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstanceRepository for InstanceRepositoryImpl {
    async fn insert(&self, input: &NewInstance) -> Result<Instance> {
        let id = StringUuid::new_v4();
        let domains_json = serde_json::to_string(&input.allowed_domains)
            .map_err(|e| AppError::Internal(e.into()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO instances
                (id, hash, owner_id, name, description, auth_type, status, allowed_domains,
                 created_at, last_modified)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(&input.hash)
        .bind(input.owner_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.auth_type)
        .bind(input.status)
        .bind(&domains_json)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::Conflict(format!(
                    "Instance hash {} already exists",
                    input.hash
                )));
            }
            Err(e) => return Err(e.into()),
        }

        self.find_by_hash(&input.hash)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create instance")))
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<Instance>> {
        let instance = sqlx::query_as::<_, Instance>(
            r#"
            SELECT id, hash, owner_id, name, description, auth_type, status, allowed_domains,
                   created_at, last_modified
            FROM instances
            WHERE hash = ?
            "#,
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(instance)
    }

    async fn list_by_owner(&self, owner_id: StringUuid) -> Result<Vec<Instance>> {
        let instances = sqlx::query_as::<_, Instance>(
            r#"
            SELECT id, hash, owner_id, name, description, auth_type, status, allowed_domains,
                   created_at, last_modified
            FROM instances
            WHERE owner_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(instances)
    }

    async fn update(&self, id: StringUuid, input: &UpdateInstanceInput) -> Result<Instance> {
        let existing = sqlx::query_as::<_, Instance>(
            r#"
            SELECT id, hash, owner_id, name, description, auth_type, status, allowed_domains,
                   created_at, last_modified
            FROM instances
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Instance {} not found", id)))?;

        let name = input.name.as_ref().unwrap_or(&existing.name);
        let description = input.description.as_ref().unwrap_or(&existing.description);
        let auth_type = input.auth_type.unwrap_or(existing.auth_type);
        let status = input.status.unwrap_or(existing.status);
        let allowed_domains = input
            .allowed_domains
            .as_ref()
            .unwrap_or(&existing.allowed_domains);
        let domains_json = serde_json::to_string(allowed_domains)
            .map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            r#"
            UPDATE instances
            SET name = ?, description = ?, auth_type = ?, status = ?, allowed_domains = ?,
                last_modified = NOW()
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(auth_type)
        .bind(status)
        .bind(&domains_json)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.find_by_hash(&existing.hash)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to update instance")))
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM instances WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Instance {} not found", id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    #[tokio::test]
    async fn test_mock_instance_repository() {
        let mut mock = MockInstanceRepository::new();

        let instance = Instance {
            hash: "0123456789abcdef".to_string(),
            ..Instance::default()
        };
        let instance_clone = instance.clone();

        mock.expect_find_by_hash()
            .with(eq("0123456789abcdef"))
            .returning(move |_| Ok(Some(instance_clone.clone())));

        let result = mock.find_by_hash("0123456789abcdef").await.unwrap();
        assert!(result.is_some());
    }
}
