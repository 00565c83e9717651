// src/db/signatory_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::store::SignatoryStore, models::signatory::Signatory};

// Nome da constraint criada na migration
const UNIQUE_EMAIL_CONSTRAINT: &str = "signatories_envelope_id_email_key";

#[derive(Clone)]
pub struct SignatoryRepository {
    pool: PgPool,
}

impl SignatoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Traduz a violação de unicidade (envelope_id, email) para regra de negócio
fn map_unique_violation(e: sqlx::Error, signatory: &Signatory) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() && db_err.constraint() == Some(UNIQUE_EMAIL_CONSTRAINT) {
            return AppError::BusinessRuleViolation(format!(
                "e-mail '{}' já está cadastrado no envelope {}",
                signatory.email, signatory.envelope_id
            ));
        }
    }
    e.into()
}

#[async_trait]
impl SignatoryStore for SignatoryRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Signatory>, AppError> {
        let signatory = sqlx::query_as::<_, Signatory>("SELECT * FROM signatories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(signatory)
    }

    async fn create(&self, signatory: &Signatory) -> Result<Signatory, AppError> {
        let events = &signatory.communicate_events;
        sqlx::query_as::<_, Signatory>(
            r#"
            INSERT INTO signatories (
                id, envelope_id, name, email, birthday, phone_number, has_documentation,
                "group", document_signed, signature_request, signature_reminder,
                remote_key, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(signatory.id)
        .bind(signatory.envelope_id)
        .bind(&signatory.name)
        .bind(&signatory.email)
        .bind(signatory.birthday)
        .bind(&signatory.phone_number)
        .bind(signatory.has_documentation)
        .bind(signatory.group)
        .bind(events.document_signed)
        .bind(events.signature_request)
        .bind(events.signature_reminder)
        .bind(&signatory.remote_key)
        .bind(signatory.created_at)
        .bind(signatory.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, signatory))
    }

    async fn update(&self, signatory: &Signatory) -> Result<Signatory, AppError> {
        let events = &signatory.communicate_events;
        let updated = sqlx::query_as::<_, Signatory>(
            r#"
            UPDATE signatories
            SET envelope_id = $2, name = $3, email = $4, birthday = $5, phone_number = $6,
                has_documentation = $7, "group" = $8, document_signed = $9,
                signature_request = $10, signature_reminder = $11, remote_key = $12,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(signatory.id)
        .bind(signatory.envelope_id)
        .bind(&signatory.name)
        .bind(&signatory.email)
        .bind(signatory.birthday)
        .bind(&signatory.phone_number)
        .bind(signatory.has_documentation)
        .bind(signatory.group)
        .bind(events.document_signed)
        .bind(events.signature_request)
        .bind(events.signature_reminder)
        .bind(&signatory.remote_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, signatory))?;

        updated.ok_or_else(|| AppError::not_found("signatário", signatory.id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM signatories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("signatário", id));
        }
        Ok(())
    }

    async fn list_by_envelope(&self, envelope_id: Uuid) -> Result<Vec<Signatory>, AppError> {
        let signatories = sqlx::query_as::<_, Signatory>(
            "SELECT * FROM signatories WHERE envelope_id = $1 ORDER BY created_at",
        )
        .bind(envelope_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(signatories)
    }
}
