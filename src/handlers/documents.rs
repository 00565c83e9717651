// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, models::document::Document};

#[utoipa::path(
    post,
    path = "/api/documents/{document_id}/prepare",
    tag = "Documents",
    params(("document_id" = Uuid, Path, description = "ID do documento")),
    responses(
        (status = 200, description = "Documento em 'processing'", body = Document),
        (status = 409, description = "Documento não está 'ready'")
    )
)]
pub async fn prepare_document(
    State(app_state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let document = app_state.envelope_service.prepare_document(document_id).await?;
    Ok((StatusCode::OK, Json(document)))
}
