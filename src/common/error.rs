// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::gateway::RemoteError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Não encontrado: {0}")]
    NotFound(String),

    #[error("Erro de validação: {0}")]
    ValidationFailed(String),

    // Erros do `validator` nos payloads (detalhes por campo)
    #[error("Erro de validação")]
    InvalidPayload(#[from] validator::ValidationErrors),

    #[error("Regra de negócio violada: {0}")]
    BusinessRuleViolation(String),

    #[error("Pré-condição não atendida: {0}")]
    PreconditionFailed(String),

    #[error("Provedor de assinatura indisponível: {0}")]
    RemoteUnavailable(RemoteError),

    #[error("Provedor de assinatura recusou a requisição: {0}")]
    RemoteRejected(RemoteError),

    #[error("Falha de persistência: {0}")]
    PersistenceFailed(String),

    #[error("Envelope {0} já está concluído")]
    AlreadyCompleted(Uuid),

    #[error("{entity} já está em estado final ({status})")]
    AlreadyInTerminalState { entity: String, status: String },

    #[error("Transição inválida: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Estado inválido: {0}")]
    InvalidState(String),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} {}", entity, id))
    }

    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        AppError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ValidationFailed(_) | AppError::InvalidPayload(_) => "VALIDATION_FAILED",
            AppError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            AppError::PreconditionFailed(_) => "PRECONDITION_FAILED",
            AppError::RemoteUnavailable(_) => "REMOTE_UNAVAILABLE",
            AppError::RemoteRejected(_) => "REMOTE_REJECTED",
            AppError::PersistenceFailed(_) => "PERSISTENCE_FAILED",
            AppError::AlreadyCompleted(_) => "ALREADY_COMPLETED",
            AppError::AlreadyInTerminalState { .. } => "ALREADY_IN_TERMINAL_STATE",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationFailed(_)
            | AppError::InvalidPayload(_)
            | AppError::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            AppError::BusinessRuleViolation(_)
            | AppError::AlreadyCompleted(_)
            | AppError::AlreadyInTerminalState { .. }
            | AppError::InvalidTransition { .. }
            | AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::RemoteUnavailable(_)
            | AppError::RemoteRejected(_)
            | AppError::PersistenceFailed(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Rede/timeout vira "indisponível"; qualquer resposta do provedor vira "recusado".
impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        if err.is_network() {
            AppError::RemoteUnavailable(err)
        } else {
            AppError::RemoteRejected(err)
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("registro".to_string()),
            other => AppError::PersistenceFailed(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        let body = match &self {
            // Retorna todos os detalhes da validação.
            AppError::InvalidPayload(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "code": code,
                    "details": details,
                })
            }
            AppError::RemoteRejected(remote) | AppError::RemoteUnavailable(remote) => {
                tracing::error!("Erro do provedor de assinatura: {}", remote);
                json!({
                    "error": self.to_string(),
                    "code": code,
                    "provider": {
                        "status": remote.status,
                        "type": remote.error_type,
                        "code": remote.code,
                        "message": remote.message,
                    },
                })
            }
            AppError::PersistenceFailed(_) | AppError::InternalServerError(_) => {
                tracing::error!("Erro Interno do Servidor: {:?}", self);
                json!({ "error": "Ocorreu um erro inesperado.", "code": code })
            }
            _ => json!({ "error": self.to_string(), "code": code }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RemoteErrorKind;

    #[test]
    fn network_errors_map_to_unavailable() {
        let err: AppError = RemoteError::network("connection reset").into();
        assert!(matches!(err, AppError::RemoteUnavailable(_)));
    }

    #[test]
    fn provider_errors_map_to_rejected() {
        let err: AppError = RemoteError::new(RemoteErrorKind::Server, "boom").into();
        assert!(matches!(err, AppError::RemoteRejected(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_kinds_map_to_409() {
        assert_eq!(AppError::AlreadyCompleted(Uuid::nil()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::BusinessRuleViolation("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::PreconditionFailed("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
