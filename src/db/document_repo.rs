// src/db/document_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::store::DocumentStore, models::document::Document};

#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let document = sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(document)
    }

    async fn create(&self, document: &Document) -> Result<Document, AppError> {
        let created = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (
                id, envelope_id, name, file_path, from_content, size, mime_type,
                status, remote_key, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(document.id)
        .bind(document.envelope_id)
        .bind(&document.name)
        .bind(&document.file_path)
        .bind(document.from_content)
        .bind(document.size)
        .bind(&document.mime_type)
        .bind(document.status)
        .bind(&document.remote_key)
        .bind(document.created_at)
        .bind(document.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(&self, document: &Document) -> Result<Document, AppError> {
        let updated = sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents
            SET envelope_id = $2, name = $3, file_path = $4, from_content = $5,
                size = $6, mime_type = $7, status = $8, remote_key = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(document.id)
        .bind(document.envelope_id)
        .bind(&document.name)
        .bind(&document.file_path)
        .bind(document.from_content)
        .bind(document.size)
        .bind(&document.mime_type)
        .bind(document.status)
        .bind(&document.remote_key)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| AppError::not_found("documento", document.id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("documento", id));
        }
        Ok(())
    }

    async fn list_by_envelope(&self, envelope_id: Uuid) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE envelope_id = $1 ORDER BY created_at",
        )
        .bind(envelope_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    async fn find_by_remote_key(&self, remote_key: &str) -> Result<Option<Document>, AppError> {
        let document =
            sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE remote_key = $1")
                .bind(remote_key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(document)
    }
}
