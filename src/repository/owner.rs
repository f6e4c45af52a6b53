//! Owner account repository
//!
//! The owner-authentication subsystem is external; this repository only
//! covers the slice of it the admission cleanup path needs: lookup and
//! deletion of provisional accounts by email.

use crate::domain::{OwnerAccount, StringUuid};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OwnerAccountRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<OwnerAccount>>;
    async fn delete(&self, id: StringUuid) -> Result<()>;
}

pub struct OwnerAccountRepositoryImpl {
    pool: MySqlPool,
}

impl OwnerAccountRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OwnerAccountRepository for OwnerAccountRepositoryImpl {
    async fn find_by_email(&self, email: &str) -> Result<Option<OwnerAccount>> {
        let account = sqlx::query_as::<_, OwnerAccount>(
            r#"
            SELECT id, email, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn delete(&self, id: StringUuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Account {} not found", id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    #[tokio::test]
    async fn test_mock_owner_account_repository() {
        let mut mock = MockOwnerAccountRepository::new();

        mock.expect_find_by_email()
            .with(eq("bob@acme.com"))
            .returning(|_| Ok(None));

        let result = mock.find_by_email("bob@acme.com").await.unwrap();
        assert!(result.is_none());
    }
}
