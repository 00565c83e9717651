// src/models/webhook.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "webhook_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Pending,
    Processed,
    Failed,
}

impl fmt::Display for WebhookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Failed => "failed",
        })
    }
}

// Eventos conhecidos do provedor. Nomes novos caem em `Unknown` e são aceitos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    AutoClose,
    Sign,
    SignatureStarted,
    AddSigner,
    Upload,
    Unknown(String),
}

impl WebhookEvent {
    pub fn parse(name: &str) -> Self {
        match name {
            "auto_close" => Self::AutoClose,
            "sign" => Self::Sign,
            "signature_started" => Self::SignatureStarted,
            "add_signer" => Self::AddSigner,
            "upload" => Self::Upload,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::AutoClose => "auto_close",
            Self::Sign => "sign",
            Self::SignatureStarted => "signature_started",
            Self::AddSigner => "add_signer",
            Self::Upload => "upload",
            Self::Unknown(name) => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: Uuid,
    #[schema(example = "auto_close")]
    pub event_name: String,
    pub document_key: Option<String>,
    pub account_key: Option<String>,
    pub status: WebhookStatus,
    // Corpo recebido, gravado verbatim. Nunca é alterado.
    pub raw_payload: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    pub fn received(payload: &WebhookPayload, raw_payload: String) -> Self {
        let now = Utc::now();
        let document = payload.document.as_ref();
        Self {
            id: Uuid::new_v4(),
            event_name: payload.event.name.clone(),
            document_key: document.and_then(|d| d.key.clone()),
            account_key: document.and_then(|d| d.account_key.clone()),
            status: WebhookStatus::Pending,
            raw_payload,
            processed_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn event(&self) -> WebhookEvent {
        WebhookEvent::parse(&self.event_name)
    }

    // =========================================================================
    //  MÁQUINA DE ESTADOS
    // =========================================================================

    pub fn mark_processed(&mut self) -> Result<(), AppError> {
        self.ensure_pending(WebhookStatus::Processed)?;
        self.status = WebhookStatus::Processed;
        self.processed_at = Some(Utc::now());
        self.error_message = None;
        Ok(())
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) -> Result<(), AppError> {
        self.ensure_pending(WebhookStatus::Failed)?;
        self.status = WebhookStatus::Failed;
        self.processed_at = Some(Utc::now());
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Única saída de `failed`: volta para `pending` e limpa o erro.
    pub fn retry(&mut self) -> Result<(), AppError> {
        if self.status != WebhookStatus::Failed {
            return Err(AppError::invalid_transition(self.status, WebhookStatus::Pending));
        }
        self.status = WebhookStatus::Pending;
        self.processed_at = None;
        self.error_message = None;
        Ok(())
    }

    fn ensure_pending(&self, target: WebhookStatus) -> Result<(), AppError> {
        if self.status != WebhookStatus::Pending {
            return Err(AppError::invalid_transition(self.status, target));
        }
        Ok(())
    }
}

// --- Corpo recebido do provedor ---
// Só os campos usados no roteamento; o resto fica no raw_payload.

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub event: WebhookEventData,
    pub document: Option<WebhookDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub name: String,
    pub data: Option<Value>,
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookDocument {
    pub key: Option<String>,
    pub account_key: Option<String>,
    pub status: Option<String>,
    pub metadata: Option<Value>,
}

impl WebhookDocument {
    // Procura um UUID nos metadados que nós mesmos enviamos ao provedor
    pub fn metadata_id(&self, field: &str) -> Option<Uuid> {
        self.metadata
            .as_ref()?
            .get(field)?
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

impl WebhookPayload {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::ValidationFailed(format!("payload de webhook inválido: {}", e)))
    }
}
