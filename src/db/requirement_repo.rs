// src/db/requirement_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::store::RequirementStore, models::requirement::Requirement};

#[derive(Clone)]
pub struct RequirementRepository {
    pool: PgPool,
}

impl RequirementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequirementStore for RequirementRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Requirement>, AppError> {
        let requirement =
            sqlx::query_as::<_, Requirement>("SELECT * FROM requirements WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(requirement)
    }

    async fn create(&self, requirement: &Requirement) -> Result<Requirement, AppError> {
        let created = sqlx::query_as::<_, Requirement>(
            r#"
            INSERT INTO requirements (
                id, envelope_id, action, role, auth, document_key, signer_key,
                status, remote_key, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(requirement.id)
        .bind(requirement.envelope_id)
        .bind(requirement.action)
        .bind(&requirement.role)
        .bind(requirement.auth)
        .bind(&requirement.document_key)
        .bind(&requirement.signer_key)
        .bind(requirement.status)
        .bind(&requirement.remote_key)
        .bind(requirement.created_at)
        .bind(requirement.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(&self, requirement: &Requirement) -> Result<Requirement, AppError> {
        let updated = sqlx::query_as::<_, Requirement>(
            r#"
            UPDATE requirements
            SET action = $2, role = $3, auth = $4, document_key = $5, signer_key = $6,
                status = $7, remote_key = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(requirement.id)
        .bind(requirement.action)
        .bind(&requirement.role)
        .bind(requirement.auth)
        .bind(&requirement.document_key)
        .bind(&requirement.signer_key)
        .bind(requirement.status)
        .bind(&requirement.remote_key)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| AppError::not_found("requisito", requirement.id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM requirements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("requisito", id));
        }
        Ok(())
    }

    async fn list_by_envelope(&self, envelope_id: Uuid) -> Result<Vec<Requirement>, AppError> {
        let requirements = sqlx::query_as::<_, Requirement>(
            "SELECT * FROM requirements WHERE envelope_id = $1 ORDER BY created_at",
        )
        .bind(envelope_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requirements)
    }

    async fn find_by_remote_key(&self, remote_key: &str) -> Result<Option<Requirement>, AppError> {
        let requirement =
            sqlx::query_as::<_, Requirement>("SELECT * FROM requirements WHERE remote_key = $1")
                .bind(remote_key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(requirement)
    }
}
