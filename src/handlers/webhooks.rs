// src/handlers/webhooks.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::{context::RequestContext, error::AppError},
    config::AppState,
    models::webhook::{Webhook, WebhookStatus},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListWebhooksQuery {
    pub status: Option<WebhookStatus>,
}

/// Ingestão: o corpo é lido como texto para ser gravado verbatim.
#[utoipa::path(
    post,
    path = "/api/webhooks/clicksign",
    tag = "Webhooks",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Evento processado", body = Webhook),
        (status = 400, description = "Corpo inválido (não gravado)"),
        (status = 404, description = "Envelope do evento não encontrado (webhook marcado como 'failed')"),
        (status = 409, description = "Envelope já concluído (webhook marcado como 'failed')")
    )
)]
pub async fn receive_clicksign(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let webhook = app_state.webhook_service.process_webhook(&ctx, body).await?;
    Ok((StatusCode::OK, Json(webhook)))
}

#[utoipa::path(
    get,
    path = "/api/webhooks",
    tag = "Webhooks",
    params(ListWebhooksQuery),
    responses(
        (status = 200, description = "Webhooks recebidos", body = Vec<Webhook>)
    )
)]
pub async fn list_webhooks(
    State(app_state): State<AppState>,
    Query(query): Query<ListWebhooksQuery>,
) -> Result<impl IntoResponse, AppError> {
    let webhooks = app_state.webhook_service.list(query.status).await?;
    Ok((StatusCode::OK, Json(webhooks)))
}

#[utoipa::path(
    get,
    path = "/api/webhooks/{webhook_id}",
    tag = "Webhooks",
    params(("webhook_id" = Uuid, Path, description = "ID do webhook")),
    responses(
        (status = 200, description = "Webhook", body = Webhook),
        (status = 404, description = "Não encontrado")
    )
)]
pub async fn get_webhook(
    State(app_state): State<AppState>,
    Path(webhook_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let webhook = app_state.webhook_service.get(webhook_id).await?;
    Ok((StatusCode::OK, Json(webhook)))
}

#[utoipa::path(
    post,
    path = "/api/webhooks/{webhook_id}/retry",
    tag = "Webhooks",
    params(("webhook_id" = Uuid, Path, description = "ID do webhook")),
    responses(
        (status = 200, description = "Webhook de volta a 'pending'", body = Webhook),
        (status = 409, description = "Webhook não está 'failed'")
    )
)]
pub async fn retry_webhook(
    State(app_state): State<AppState>,
    Path(webhook_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let webhook = app_state.webhook_service.retry(webhook_id).await?;
    Ok((StatusCode::OK, Json(webhook)))
}

#[utoipa::path(
    post,
    path = "/api/webhooks/{webhook_id}/process",
    tag = "Webhooks",
    params(("webhook_id" = Uuid, Path, description = "ID do webhook")),
    responses(
        (status = 200, description = "Webhook reprocessado", body = Webhook),
        (status = 409, description = "Webhook não está 'pending'")
    )
)]
pub async fn process_webhook(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(webhook_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let webhook = app_state
        .webhook_service
        .process_stored_webhook(&ctx, webhook_id)
        .await?;
    Ok((StatusCode::OK, Json(webhook)))
}
