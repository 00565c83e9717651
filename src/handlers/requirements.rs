// src/handlers/requirements.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{context::RequestContext, error::AppError},
    config::AppState,
    models::requirement::{BulkRequirementOperation, NewRequirement, Requirement},
    services::requirement_service::BulkRequirementResult,
};

// ---
// Payload: lote atômico
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequirementsPayload {
    // {"op":"add", ...atributos} | {"op":"remove","remoteKey":"..."}
    #[schema(value_type = Vec<Object>)]
    pub operations: Vec<BulkRequirementOperation>,
}

#[utoipa::path(
    post,
    path = "/api/envelopes/{envelope_id}/requirements",
    tag = "Requirements",
    request_body = NewRequirement,
    params(("envelope_id" = Uuid, Path, description = "ID do envelope")),
    responses(
        (status = 201, description = "Requisito criado local e remotamente", body = Requirement),
        (status = 400, description = "Inválido ou envelope ainda não existe no provedor")
    )
)]
pub async fn create_requirement(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(envelope_id): Path<Uuid>,
    Json(payload): Json<NewRequirement>,
) -> Result<impl IntoResponse, AppError> {
    let requirement = app_state
        .requirement_service
        .create(&ctx, envelope_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(requirement)))
}

#[utoipa::path(
    post,
    path = "/api/envelopes/{envelope_id}/requirements/bulk",
    tag = "Requirements",
    request_body = BulkRequirementsPayload,
    params(("envelope_id" = Uuid, Path, description = "ID do envelope")),
    responses(
        (status = 200, description = "Lote aplicado", body = BulkRequirementResult),
        (status = 500, description = "Provedor recusou o lote (nada foi aplicado)")
    )
)]
pub async fn bulk_requirements(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(envelope_id): Path<Uuid>,
    Json(payload): Json<BulkRequirementsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let result = app_state
        .requirement_service
        .create_bulk(&ctx, envelope_id, payload.operations)
        .await?;
    Ok((StatusCode::OK, Json(result)))
}

#[utoipa::path(
    get,
    path = "/api/envelopes/{envelope_id}/requirements",
    tag = "Requirements",
    params(("envelope_id" = Uuid, Path, description = "ID do envelope")),
    responses(
        (status = 200, description = "Requisitos do envelope", body = Vec<Requirement>)
    )
)]
pub async fn list_requirements(
    State(app_state): State<AppState>,
    Path(envelope_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let requirements = app_state.requirement_service.list(envelope_id).await?;
    Ok((StatusCode::OK, Json(requirements)))
}

#[utoipa::path(
    post,
    path = "/api/requirements/{requirement_id}/complete",
    tag = "Requirements",
    params(("requirement_id" = Uuid, Path, description = "ID do requisito")),
    responses(
        (status = 200, description = "Requisito concluído", body = Requirement),
        (status = 409, description = "Requisito já concluído")
    )
)]
pub async fn complete_requirement(
    State(app_state): State<AppState>,
    Path(requirement_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let requirement = app_state.requirement_service.complete(requirement_id).await?;
    Ok((StatusCode::OK, Json(requirement)))
}

#[utoipa::path(
    delete,
    path = "/api/requirements/{requirement_id}",
    tag = "Requirements",
    params(("requirement_id" = Uuid, Path, description = "ID do requisito")),
    responses(
        (status = 204, description = "Requisito removido localmente"),
        (status = 404, description = "Não encontrado")
    )
)]
pub async fn delete_requirement(
    State(app_state): State<AppState>,
    Path(requirement_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.requirement_service.delete(requirement_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
