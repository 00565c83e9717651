// src/models/envelope.rs

use std::{collections::HashSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;
use crate::models::signatory::MAX_SIGNATORIES_PER_ENVELOPE;

pub const DEFAULT_REMIND_INTERVAL: i32 = 3;
pub const DEFAULT_LOCALE: &str = "pt-BR";

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "envelope_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Draft,
    Sent,
    Pending,
    Completed,
    Cancelled,
}

impl EnvelopeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    // draft -> sent só via ativação; qualquer não-terminal pode ir para completed/cancelled.
    pub fn can_transition_to(self, target: EnvelopeStatus) -> bool {
        use EnvelopeStatus::*;
        match (self, target) {
            (Completed | Cancelled, _) => false,
            (Draft, Sent) => true,
            (Sent, Pending) => true,
            (_, Completed | Cancelled) => true,
            (from, to) => from == to,
        }
    }

    // Regras de gate para signatários
    pub fn allows_signatory_addition(self) -> bool {
        matches!(self, Self::Draft | Self::Sent)
    }

    pub fn allows_signatory_update(self) -> bool {
        !self.is_terminal()
    }

    pub fn allows_signatory_removal(self) -> bool {
        self == Self::Draft
    }
}

impl fmt::Display for EnvelopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvelopeStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(AppError::ValidationFailed(format!(
                "status de envelope desconhecido: '{}'",
                other
            ))),
        }
    }
}

// --- Entidade ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub id: Uuid,
    #[schema(example = "Contrato de Prestação de Serviços")]
    pub name: String,
    #[schema(example = "pt-BR")]
    pub locale: String,
    pub status: EnvelopeStatus,
    pub document_ids: Vec<Uuid>,
    pub signatory_emails: Vec<String>,
    // Vazio até o provedor aceitar o envelope
    pub remote_key: Option<String>,
    // Snapshot opaco da resposta/evento do provedor (JSON verbatim)
    pub remote_raw_data: Option<String>,
    pub deadline_at: Option<DateTime<Utc>>,
    #[schema(example = 3)]
    pub remind_interval: i32,
    pub auto_close: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Envelope {
    /// Valida o payload, aplica as regras de negócio e os defaults.
    pub fn new(input: NewEnvelope) -> Result<Self, AppError> {
        input.validate()?;

        let status = match input.status.as_deref().map(str::trim) {
            None | Some("") => EnvelopeStatus::Draft,
            Some(raw) => {
                let status = raw.parse::<EnvelopeStatus>()?;
                if status != EnvelopeStatus::Draft {
                    return Err(AppError::ValidationFailed(format!(
                        "envelope deve ser criado em 'draft', recebido '{}'",
                        status
                    )));
                }
                status
            }
        };

        validate_signatory_emails(&input.signatory_emails)?;

        let now = Utc::now();
        if let Some(deadline) = input.deadline_at {
            if deadline <= now {
                return Err(AppError::ValidationFailed(
                    "deadlineAt deve estar no futuro".to_string(),
                ));
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            locale: input.locale.unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            status,
            document_ids: Vec::new(),
            signatory_emails: input.signatory_emails,
            remote_key: None,
            remote_raw_data: None,
            deadline_at: input.deadline_at,
            remind_interval: input.remind_interval.unwrap_or(DEFAULT_REMIND_INTERVAL),
            auto_close: input.auto_close.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn has_remote_key(&self) -> bool {
        self.remote_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn mark_created_remotely(&mut self, remote_key: String, raw_data: String) {
        self.remote_key = Some(remote_key);
        self.remote_raw_data = Some(raw_data);
    }

    // =========================================================================
    //  MÁQUINA DE ESTADOS
    // =========================================================================

    /// draft -> sent. Exige que o envelope já exista no provedor.
    pub fn activate(&mut self) -> Result<(), AppError> {
        if !self.has_remote_key() {
            return Err(AppError::PreconditionFailed(format!(
                "envelope {} ainda não foi criado no provedor",
                self.id
            )));
        }
        if self.status != EnvelopeStatus::Draft {
            return Err(AppError::invalid_transition(self.status, EnvelopeStatus::Sent));
        }
        self.status = EnvelopeStatus::Sent;
        Ok(())
    }

    pub fn set_status(&mut self, target: EnvelopeStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(target) {
            return Err(AppError::invalid_transition(self.status, target));
        }
        if self.status == EnvelopeStatus::Draft && target == EnvelopeStatus::Sent {
            return self.activate();
        }
        self.status = target;
        Ok(())
    }

    pub fn set_status_str(&mut self, target: &str) -> Result<(), AppError> {
        let target = target.parse::<EnvelopeStatus>()?;
        self.set_status(target)
    }

    pub fn complete(&mut self) -> Result<(), AppError> {
        self.set_status(EnvelopeStatus::Completed)
    }

    pub fn cancel(&mut self) -> Result<(), AppError> {
        self.set_status(EnvelopeStatus::Cancelled)
    }

    pub fn apply_changes(&mut self, changes: EnvelopeChanges) -> Result<(), AppError> {
        changes.validate()?;

        if self.status.is_terminal() {
            return Err(AppError::AlreadyInTerminalState {
                entity: format!("envelope {}", self.id),
                status: self.status.to_string(),
            });
        }
        if self.status != EnvelopeStatus::Draft {
            return Err(AppError::InvalidState(format!(
                "envelope {} só pode ser alterado em 'draft' (atual: '{}')",
                self.id, self.status
            )));
        }

        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(deadline) = changes.deadline_at {
            self.deadline_at = Some(deadline);
        }
        if let Some(interval) = changes.remind_interval {
            self.remind_interval = interval;
        }
        if let Some(auto_close) = changes.auto_close {
            self.auto_close = auto_close;
        }
        Ok(())
    }
}

/// Quantidade máxima e unicidade (comparação exata, sem normalizar caixa).
pub fn validate_signatory_emails(emails: &[String]) -> Result<(), AppError> {
    if emails.len() > MAX_SIGNATORIES_PER_ENVELOPE {
        return Err(AppError::BusinessRuleViolation(format!(
            "envelope aceita no máximo {} signatários (recebidos {})",
            MAX_SIGNATORIES_PER_ENVELOPE,
            emails.len()
        )));
    }

    let mut seen = HashSet::with_capacity(emails.len());
    for email in emails {
        if !seen.insert(email.as_str()) {
            return Err(AppError::BusinessRuleViolation(format!(
                "e-mail de signatário duplicado no envelope: {}",
                email
            )));
        }
    }
    Ok(())
}

// --- Payloads ---

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewEnvelope {
    #[validate(length(min = 1, max = 255, message = "required"))]
    #[schema(example = "Contrato de Prestação de Serviços")]
    pub name: String,

    #[schema(example = "pt-BR")]
    pub locale: Option<String>,

    // Só aceita vazio ou "draft"
    pub status: Option<String>,

    #[serde(default)]
    pub signatory_emails: Vec<String>,

    pub deadline_at: Option<DateTime<Utc>>,

    #[validate(range(min = 1, max = 30, message = "deve estar entre 1 e 30 dias"))]
    #[schema(example = 3)]
    pub remind_interval: Option<i32>,

    pub auto_close: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeChanges {
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub name: Option<String>,
    pub deadline_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 30, message = "deve estar entre 1 e 30 dias"))]
    pub remind_interval: Option<i32>,
    pub auto_close: Option<bool>,
}
