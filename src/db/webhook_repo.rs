// src/db/webhook_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::WebhookStore,
    models::webhook::{Webhook, WebhookStatus},
};

#[derive(Clone)]
pub struct WebhookRepository {
    pool: PgPool,
}

impl WebhookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookStore for WebhookRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Webhook>, AppError> {
        let webhook = sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(webhook)
    }

    async fn create(&self, webhook: &Webhook) -> Result<Webhook, AppError> {
        let created = sqlx::query_as::<_, Webhook>(
            r#"
            INSERT INTO webhooks (
                id, event_name, document_key, account_key, status, raw_payload,
                processed_at, error_message, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(webhook.id)
        .bind(&webhook.event_name)
        .bind(&webhook.document_key)
        .bind(&webhook.account_key)
        .bind(webhook.status)
        .bind(&webhook.raw_payload)
        .bind(webhook.processed_at)
        .bind(&webhook.error_message)
        .bind(webhook.created_at)
        .bind(webhook.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    // raw_payload fica fora do SET: o corpo recebido nunca é reescrito
    async fn update(&self, webhook: &Webhook) -> Result<Webhook, AppError> {
        let updated = sqlx::query_as::<_, Webhook>(
            r#"
            UPDATE webhooks
            SET status = $2, processed_at = $3, error_message = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(webhook.id)
        .bind(webhook.status)
        .bind(webhook.processed_at)
        .bind(&webhook.error_message)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| AppError::not_found("webhook", webhook.id))
    }

    async fn list_by_status(&self, status: Option<WebhookStatus>) -> Result<Vec<Webhook>, AppError> {
        let webhooks = sqlx::query_as::<_, Webhook>(
            r#"
            SELECT * FROM webhooks
            WHERE ($1::webhook_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(webhooks)
    }
}
