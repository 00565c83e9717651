// src/models/signatory.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

pub const MAX_SIGNATORIES_PER_ENVELOPE: usize = 50;

// Canal usado pelo provedor para cada tipo de comunicação
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "communication_channel", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CommunicationChannel {
    #[default]
    Email,
    Sms,
    #[serde(rename = "none")]
    #[sqlx(rename = "none")]
    Disabled,
}

impl CommunicationChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Disabled => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunicateEvents {
    #[serde(default)]
    pub document_signed: CommunicationChannel,
    #[serde(default)]
    pub signature_request: CommunicationChannel,
    #[serde(default)]
    pub signature_reminder: CommunicationChannel,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Signatory {
    pub id: Uuid,
    pub envelope_id: Uuid,
    #[schema(example = "Maria Souza")]
    pub name: String,
    #[schema(example = "maria@example.com")]
    pub email: String,
    pub birthday: Option<NaiveDate>,
    #[schema(example = "+5511999999999")]
    pub phone_number: Option<String>,
    pub has_documentation: bool,
    pub group: Option<i32>,
    #[sqlx(flatten)]
    pub communicate_events: CommunicateEvents,
    // Preenchida quando o signatário é enviado ao provedor
    pub remote_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Signatory {
    pub fn new(envelope_id: Uuid, input: NewSignatory) -> Result<Self, AppError> {
        input.validate()?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            envelope_id,
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            birthday: input.birthday,
            phone_number: input.phone_number,
            has_documentation: input.has_documentation.unwrap_or(false),
            group: input.group,
            communicate_events: input.communicate_events.unwrap_or_default(),
            remote_key: None,
            created_at: now,
            updated_at: now,
        })
    }

    // Não mexe em envelope_id: a troca de envelope é validada pelo service.
    pub fn apply_changes(&mut self, changes: &SignatoryChanges) {
        if let Some(name) = &changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(email) = &changes.email {
            self.email = email.trim().to_string();
        }
        if let Some(birthday) = changes.birthday {
            self.birthday = Some(birthday);
        }
        if let Some(phone) = &changes.phone_number {
            self.phone_number = Some(phone.clone());
        }
        if let Some(has_documentation) = changes.has_documentation {
            self.has_documentation = has_documentation;
        }
        if let Some(group) = changes.group {
            self.group = Some(group);
        }
        if let Some(events) = changes.communicate_events {
            self.communicate_events = events;
        }
    }
}

// --- Payloads ---

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewSignatory {
    #[validate(length(min = 1, max = 255, message = "required"))]
    #[schema(example = "Maria Souza")]
    pub name: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "maria@example.com")]
    pub email: String,

    pub birthday: Option<NaiveDate>,

    #[validate(length(min = 8, max = 20, message = "telefone inválido"))]
    pub phone_number: Option<String>,

    pub has_documentation: Option<bool>,

    #[validate(range(min = 1, message = "grupo deve ser positivo"))]
    pub group: Option<i32>,

    pub communicate_events: Option<CommunicateEvents>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatoryChanges {
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub name: Option<String>,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,

    pub birthday: Option<NaiveDate>,

    #[validate(length(min = 8, max = 20, message = "telefone inválido"))]
    pub phone_number: Option<String>,

    pub has_documentation: Option<bool>,

    #[validate(range(min = 1, message = "grupo deve ser positivo"))]
    pub group: Option<i32>,

    pub communicate_events: Option<CommunicateEvents>,

    // Troca o signatário de envelope
    pub envelope_id: Option<Uuid>,
}
