// src/handlers/signatories.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{context::RequestContext, error::AppError},
    config::AppState,
    models::signatory::{NewSignatory, Signatory, SignatoryChanges},
    services::signatory_service::SendSignatoriesReport,
};

// ---
// Payload: SendSignatories
// ---
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendSignatoriesPayload {
    // Mensagem opcional da notificação
    #[validate(length(max = 500, message = "mensagem muito longa"))]
    pub message: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/envelopes/{envelope_id}/signatories",
    tag = "Signatories",
    request_body = NewSignatory,
    params(("envelope_id" = Uuid, Path, description = "ID do envelope")),
    responses(
        (status = 201, description = "Signatário adicionado", body = Signatory),
        (status = 409, description = "E-mail duplicado, limite de 50 ou status do envelope não permite")
    )
)]
pub async fn create_signatory(
    State(app_state): State<AppState>,
    Path(envelope_id): Path<Uuid>,
    Json(payload): Json<NewSignatory>,
) -> Result<impl IntoResponse, AppError> {
    let signatory = app_state
        .signatory_service
        .create(envelope_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(signatory)))
}

#[utoipa::path(
    get,
    path = "/api/envelopes/{envelope_id}/signatories",
    tag = "Signatories",
    params(("envelope_id" = Uuid, Path, description = "ID do envelope")),
    responses(
        (status = 200, description = "Signatários do envelope", body = Vec<Signatory>)
    )
)]
pub async fn list_signatories(
    State(app_state): State<AppState>,
    Path(envelope_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let signatories = app_state.signatory_service.list(envelope_id).await?;
    Ok((StatusCode::OK, Json(signatories)))
}

#[utoipa::path(
    get,
    path = "/api/signatories/{signatory_id}",
    tag = "Signatories",
    params(("signatory_id" = Uuid, Path, description = "ID do signatário")),
    responses(
        (status = 200, description = "Signatário", body = Signatory),
        (status = 404, description = "Não encontrado")
    )
)]
pub async fn get_signatory(
    State(app_state): State<AppState>,
    Path(signatory_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let signatory = app_state.signatory_service.get(signatory_id).await?;
    Ok((StatusCode::OK, Json(signatory)))
}

#[utoipa::path(
    patch,
    path = "/api/signatories/{signatory_id}",
    tag = "Signatories",
    request_body = SignatoryChanges,
    params(("signatory_id" = Uuid, Path, description = "ID do signatário")),
    responses(
        (status = 200, description = "Signatário atualizado (ou movido de envelope)", body = Signatory),
        (status = 409, description = "Status do envelope não permite a alteração")
    )
)]
pub async fn update_signatory(
    State(app_state): State<AppState>,
    Path(signatory_id): Path<Uuid>,
    Json(payload): Json<SignatoryChanges>,
) -> Result<impl IntoResponse, AppError> {
    let signatory = app_state
        .signatory_service
        .update(signatory_id, payload)
        .await?;
    Ok((StatusCode::OK, Json(signatory)))
}

#[utoipa::path(
    delete,
    path = "/api/signatories/{signatory_id}",
    tag = "Signatories",
    params(("signatory_id" = Uuid, Path, description = "ID do signatário")),
    responses(
        (status = 204, description = "Signatário removido"),
        (status = 409, description = "Envelope fora de 'draft'")
    )
)]
pub async fn delete_signatory(
    State(app_state): State<AppState>,
    Path(signatory_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.signatory_service.delete(signatory_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/envelopes/{envelope_id}/send",
    tag = "Signatories",
    request_body = SendSignatoriesPayload,
    params(("envelope_id" = Uuid, Path, description = "ID do envelope")),
    responses(
        (status = 200, description = "Resultado por signatário", body = SendSignatoriesReport),
        (status = 400, description = "Envelope não está ativado")
    )
)]
pub async fn send_signatories(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(envelope_id): Path<Uuid>,
    Json(payload): Json<SendSignatoriesPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let report = app_state
        .signatory_service
        .send_signatories(&ctx, envelope_id, payload.message)
        .await?;
    Ok((StatusCode::OK, Json(report)))
}
