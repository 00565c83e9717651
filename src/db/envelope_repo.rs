// src/db/envelope_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::EnvelopeStore,
    models::envelope::{Envelope, EnvelopeStatus},
};

// Repositório da tabela 'envelopes'
#[derive(Clone)]
pub struct EnvelopeRepository {
    pool: PgPool,
}

impl EnvelopeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnvelopeStore for EnvelopeRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Envelope>, AppError> {
        let envelope = sqlx::query_as::<_, Envelope>("SELECT * FROM envelopes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(envelope)
    }

    async fn create(&self, envelope: &Envelope) -> Result<Envelope, AppError> {
        let created = sqlx::query_as::<_, Envelope>(
            r#"
            INSERT INTO envelopes (
                id, name, locale, status, document_ids, signatory_emails,
                remote_key, remote_raw_data, deadline_at, remind_interval, auto_close,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(envelope.id)
        .bind(&envelope.name)
        .bind(&envelope.locale)
        .bind(envelope.status)
        .bind(&envelope.document_ids)
        .bind(&envelope.signatory_emails)
        .bind(&envelope.remote_key)
        .bind(&envelope.remote_raw_data)
        .bind(envelope.deadline_at)
        .bind(envelope.remind_interval)
        .bind(envelope.auto_close)
        .bind(envelope.created_at)
        .bind(envelope.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(&self, envelope: &Envelope) -> Result<Envelope, AppError> {
        let updated = sqlx::query_as::<_, Envelope>(
            r#"
            UPDATE envelopes
            SET name = $2, locale = $3, status = $4, document_ids = $5,
                signatory_emails = $6, remote_key = $7, remote_raw_data = $8,
                deadline_at = $9, remind_interval = $10, auto_close = $11,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(envelope.id)
        .bind(&envelope.name)
        .bind(&envelope.locale)
        .bind(envelope.status)
        .bind(&envelope.document_ids)
        .bind(&envelope.signatory_emails)
        .bind(&envelope.remote_key)
        .bind(&envelope.remote_raw_data)
        .bind(envelope.deadline_at)
        .bind(envelope.remind_interval)
        .bind(envelope.auto_close)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| AppError::not_found("envelope", envelope.id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM envelopes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("envelope", id));
        }
        Ok(())
    }

    async fn list(&self, status: Option<EnvelopeStatus>) -> Result<Vec<Envelope>, AppError> {
        // Filtro opcional: NULL devolve todos
        let envelopes = sqlx::query_as::<_, Envelope>(
            r#"
            SELECT * FROM envelopes
            WHERE ($1::envelope_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(envelopes)
    }

    async fn find_by_remote_key(&self, remote_key: &str) -> Result<Option<Envelope>, AppError> {
        let envelope =
            sqlx::query_as::<_, Envelope>("SELECT * FROM envelopes WHERE remote_key = $1")
                .bind(remote_key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(envelope)
    }
}
