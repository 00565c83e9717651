// src/handlers/envelopes.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    common::{context::RequestContext, error::AppError},
    config::AppState,
    models::{
        document::{Document, NewDocument},
        envelope::{Envelope, EnvelopeChanges, EnvelopeStatus, NewEnvelope},
        requirement::NewRequirement,
    },
};

// ---
// Payload: CreateEnvelope
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnvelopePayload {
    #[serde(flatten)]
    pub envelope: NewEnvelope,

    // Criados no provedor depois do envelope, na ordem recebida
    #[serde(default)]
    pub documents: Vec<NewDocument>,

    // Falhas aqui não desfazem o envelope
    #[serde(default)]
    pub requirements: Vec<NewRequirement>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListEnvelopesQuery {
    /// draft | sent | pending | completed | cancelled
    pub status: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/envelopes",
    tag = "Envelopes",
    request_body = CreateEnvelopePayload,
    responses(
        (status = 201, description = "Envelope criado. Com documentos devolve EnvelopeWithDocuments; com requisitos, EnvelopeWithRequirements", body = Envelope),
        (status = 400, description = "Payload inválido"),
        (status = 409, description = "Regra de negócio violada"),
        (status = 500, description = "Provedor recusou ou está indisponível")
    )
)]
pub async fn create_envelope(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<CreateEnvelopePayload>,
) -> Result<Response, AppError> {
    let service = &app_state.envelope_service;

    let response = match (payload.documents.is_empty(), payload.requirements.is_empty()) {
        (true, true) => {
            let envelope = service.create_envelope(&ctx, payload.envelope).await?;
            (StatusCode::CREATED, Json(envelope)).into_response()
        }
        (false, true) => {
            let created = service
                .create_envelope_with_documents(&ctx, payload.envelope, payload.documents)
                .await?;
            (StatusCode::CREATED, Json(created)).into_response()
        }
        (true, false) => {
            let created = service
                .create_envelope_with_requirements(&ctx, payload.envelope, payload.requirements)
                .await?;
            (StatusCode::CREATED, Json(created)).into_response()
        }
        (false, false) => {
            return Err(AppError::ValidationFailed(
                "envie os requisitos depois que os documentos existirem no provedor".to_string(),
            ));
        }
    };

    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/envelopes",
    tag = "Envelopes",
    params(ListEnvelopesQuery),
    responses(
        (status = 200, description = "Lista de envelopes", body = Vec<Envelope>)
    )
)]
pub async fn list_envelopes(
    State(app_state): State<AppState>,
    Query(query): Query<ListEnvelopesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<EnvelopeStatus>)
        .transpose()?;

    let envelopes = app_state.envelope_service.list(status).await?;
    Ok((StatusCode::OK, Json(envelopes)))
}

#[utoipa::path(
    get,
    path = "/api/envelopes/{envelope_id}",
    tag = "Envelopes",
    params(("envelope_id" = Uuid, Path, description = "ID do envelope")),
    responses(
        (status = 200, description = "Envelope", body = Envelope),
        (status = 404, description = "Envelope não encontrado")
    )
)]
pub async fn get_envelope(
    State(app_state): State<AppState>,
    Path(envelope_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let envelope = app_state.envelope_service.get(envelope_id).await?;
    Ok((StatusCode::OK, Json(envelope)))
}

#[utoipa::path(
    patch,
    path = "/api/envelopes/{envelope_id}",
    tag = "Envelopes",
    request_body = EnvelopeChanges,
    params(("envelope_id" = Uuid, Path, description = "ID do envelope")),
    responses(
        (status = 200, description = "Envelope atualizado", body = Envelope),
        (status = 409, description = "Envelope fora de 'draft'")
    )
)]
pub async fn update_envelope(
    State(app_state): State<AppState>,
    Path(envelope_id): Path<Uuid>,
    Json(payload): Json<EnvelopeChanges>,
) -> Result<impl IntoResponse, AppError> {
    let envelope = app_state.envelope_service.update(envelope_id, payload).await?;
    Ok((StatusCode::OK, Json(envelope)))
}

#[utoipa::path(
    delete,
    path = "/api/envelopes/{envelope_id}",
    tag = "Envelopes",
    params(("envelope_id" = Uuid, Path, description = "ID do envelope")),
    responses(
        (status = 204, description = "Envelope excluído"),
        (status = 409, description = "Só envelopes em 'draft' ou 'cancelled' podem ser excluídos")
    )
)]
pub async fn delete_envelope(
    State(app_state): State<AppState>,
    Path(envelope_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.envelope_service.delete(envelope_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/envelopes/{envelope_id}/activate",
    tag = "Envelopes",
    params(("envelope_id" = Uuid, Path, description = "ID do envelope")),
    responses(
        (status = 200, description = "Envelope ativado (draft -> sent)", body = Envelope),
        (status = 400, description = "Envelope ainda não existe no provedor"),
        (status = 409, description = "Transição inválida")
    )
)]
pub async fn activate_envelope(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(envelope_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let envelope = app_state.envelope_service.activate(&ctx, envelope_id).await?;
    Ok((StatusCode::OK, Json(envelope)))
}

#[utoipa::path(
    get,
    path = "/api/envelopes/{envelope_id}/documents",
    tag = "Documents",
    params(("envelope_id" = Uuid, Path, description = "ID do envelope")),
    responses(
        (status = 200, description = "Documentos do envelope", body = Vec<Document>)
    )
)]
pub async fn list_documents(
    State(app_state): State<AppState>,
    Path(envelope_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let documents = app_state.envelope_service.list_documents(envelope_id).await?;
    Ok((StatusCode::OK, Json(documents)))
}

#[utoipa::path(
    post,
    path = "/api/envelopes/{envelope_id}/documents",
    tag = "Documents",
    request_body = NewDocument,
    params(("envelope_id" = Uuid, Path, description = "ID do envelope")),
    responses(
        (status = 201, description = "Documento criado no provedor", body = Document),
        (status = 400, description = "Envelope ainda não existe no provedor")
    )
)]
pub async fn add_document(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(envelope_id): Path<Uuid>,
    Json(payload): Json<NewDocument>,
) -> Result<impl IntoResponse, AppError> {
    let document = app_state
        .envelope_service
        .add_document(&ctx, envelope_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}
