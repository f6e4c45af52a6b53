//! Respondent repository

use crate::domain::{
    CreateRespondentInput, Respondent, RespondentOrigin, StringUuid, UpdateRespondentInput,
};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RespondentRepository: Send + Sync {
    /// Insert a single respondent. Duplicate (instance, username) surfaces
    /// as `Conflict`; the database constraint makes this atomic under
    /// concurrent creation.
    async fn insert(&self, input: &CreateRespondentInput) -> Result<Respondent>;
    /// Insert a batch in one transaction; nothing is committed on any failure.
    async fn insert_batch(&self, inputs: &[CreateRespondentInput]) -> Result<u64>;
    async fn find_by_username(
        &self,
        instance_id: StringUuid,
        username: &str,
        origin: Option<RespondentOrigin>,
    ) -> Result<Option<Respondent>>;
    async fn list_by_origin(
        &self,
        instance_id: StringUuid,
        origin: RespondentOrigin,
    ) -> Result<Vec<Respondent>>;
    async fn update(
        &self,
        instance_id: StringUuid,
        username: &str,
        input: &UpdateRespondentInput,
    ) -> Result<Respondent>;
    async fn delete(&self, instance_id: StringUuid, username: &str) -> Result<()>;
}

pub struct RespondentRepositoryImpl {
    pool: MySqlPool,
}

impl RespondentRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const INSERT_SQL: &str = r#"
INSERT INTO respondents
    (id, instance_id, origin, first_name, last_name, username, password_hash, has_voted, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, false, NOW())
"#;

fn conflict_for(input: &CreateRespondentInput) -> AppError {
    AppError::Conflict(format!(
        "Respondent '{}' already exists for this instance",
        input.username
    ))
}

#[async_trait]
impl RespondentRepository for RespondentRepositoryImpl {
    async fn insert(&self, input: &CreateRespondentInput) -> Result<Respondent> {
        let id = StringUuid::new_v4();

        let result = sqlx::query(INSERT_SQL)
            .bind(id)
            .bind(input.instance_id)
            .bind(input.origin)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.username)
            .bind(&input.password_hash)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(conflict_for(input));
            }
            Err(e) => return Err(e.into()),
        }

        self.find_by_username(input.instance_id, &input.username, None)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create respondent")))
    }

    async fn insert_batch(&self, inputs: &[CreateRespondentInput]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        for input in inputs {
            let id = StringUuid::new_v4();
            let result = sqlx::query(INSERT_SQL)
                .bind(id)
                .bind(input.instance_id)
                .bind(input.origin)
                .bind(&input.first_name)
                .bind(&input.last_name)
                .bind(&input.username)
                .bind(&input.password_hash)
                .execute(&mut *tx)
                .await;

            match result {
                Ok(_) => {}
                // Dropping the transaction rolls the batch back.
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    return Err(conflict_for(input));
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit().await?;
        Ok(inputs.len() as u64)
    }

    async fn find_by_username(
        &self,
        instance_id: StringUuid,
        username: &str,
        origin: Option<RespondentOrigin>,
    ) -> Result<Option<Respondent>> {
        let respondent = match origin {
            Some(origin) => {
                sqlx::query_as::<_, Respondent>(
                    r#"
                    SELECT id, instance_id, origin, first_name, last_name, username,
                           password_hash, has_voted, created_at
                    FROM respondents
                    WHERE instance_id = ? AND username = ? AND origin = ?
                    "#,
                )
                .bind(instance_id)
                .bind(username)
                .bind(origin)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Respondent>(
                    r#"
                    SELECT id, instance_id, origin, first_name, last_name, username,
                           password_hash, has_voted, created_at
                    FROM respondents
                    WHERE instance_id = ? AND username = ?
                    "#,
                )
                .bind(instance_id)
                .bind(username)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(respondent)
    }

    async fn list_by_origin(
        &self,
        instance_id: StringUuid,
        origin: RespondentOrigin,
    ) -> Result<Vec<Respondent>> {
        let respondents = sqlx::query_as::<_, Respondent>(
            r#"
            SELECT id, instance_id, origin, first_name, last_name, username,
                   password_hash, has_voted, created_at
            FROM respondents
            WHERE instance_id = ? AND origin = ?
            ORDER BY created_at ASC, username ASC
            "#,
        )
        .bind(instance_id)
        .bind(origin)
        .fetch_all(&self.pool)
        .await?;

        Ok(respondents)
    }

    async fn update(
        &self,
        instance_id: StringUuid,
        username: &str,
        input: &UpdateRespondentInput,
    ) -> Result<Respondent> {
        let existing = self
            .find_by_username(instance_id, username, None)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Respondent '{}' not found", username)))?;

        let first_name = input.first_name.as_ref().unwrap_or(&existing.first_name);
        let last_name = input.last_name.as_ref().unwrap_or(&existing.last_name);
        let has_voted = input.has_voted.unwrap_or(existing.has_voted);

        sqlx::query(
            r#"
            UPDATE respondents
            SET first_name = ?, last_name = ?, has_voted = ?
            WHERE instance_id = ? AND username = ?
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(has_voted)
        .bind(instance_id)
        .bind(username)
        .execute(&self.pool)
        .await?;

        self.find_by_username(instance_id, username, None)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to update respondent")))
    }

    async fn delete(&self, instance_id: StringUuid, username: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM respondents WHERE instance_id = ? AND username = ?")
            .bind(instance_id)
            .bind(username)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Respondent '{}' not found",
                username
            )));
        }

        Ok(())
    }
}
