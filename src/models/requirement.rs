// src/models/requirement.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

pub const DEFAULT_REQUIREMENT_ROLE: &str = "sign";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "requirement_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequirementAction {
    Agree,
    Sign,
    ProvideEvidence,
}

impl RequirementAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agree => "agree",
            Self::Sign => "sign",
            Self::ProvideEvidence => "provide_evidence",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "requirement_auth", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequirementAuth {
    Email,
    IcpBrasil,
}

impl RequirementAuth {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::IcpBrasil => "icp_brasil",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "requirement_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequirementStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: Uuid,
    pub envelope_id: Uuid,
    pub action: RequirementAction,
    #[schema(example = "sign")]
    pub role: String,
    pub auth: Option<RequirementAuth>,
    // Referências remotas (chaves no provedor)
    pub document_key: Option<String>,
    pub signer_key: Option<String>,
    pub status: RequirementStatus,
    pub remote_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Requirement {
    pub fn new(envelope_id: Uuid, input: NewRequirement) -> Result<Self, AppError> {
        input.check()?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            envelope_id,
            action: input.action,
            role: input
                .role
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REQUIREMENT_ROLE.to_string()),
            auth: input.auth,
            document_key: input.document_key,
            signer_key: input.signer_key,
            status: RequirementStatus::Pending,
            remote_key: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn complete(&mut self) -> Result<(), AppError> {
        if self.status != RequirementStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "requisito {} já está concluído",
                self.id
            )));
        }
        self.status = RequirementStatus::Completed;
        Ok(())
    }

    /// Atributos enviados ao provedor.
    pub fn data(&self) -> RequirementData {
        RequirementData {
            action: self.action,
            role: self.role.clone(),
            auth: self.auth,
            document_key: self.document_key.clone(),
            signer_key: self.signer_key.clone(),
        }
    }
}

// Dados de um requisito como o provedor os recebe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementData {
    pub action: RequirementAction,
    pub role: String,
    pub auth: Option<RequirementAuth>,
    pub document_key: Option<String>,
    pub signer_key: Option<String>,
}

// Operação do lote atômico (`atomic:operations`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementOperation {
    Add(RequirementData),
    Remove { remote_key: String },
}

// --- Payloads ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewRequirement {
    pub action: RequirementAction,

    #[validate(length(min = 1, max = 50, message = "required"))]
    #[schema(example = "sign")]
    pub role: Option<String>,

    pub auth: Option<RequirementAuth>,

    pub document_key: Option<String>,

    pub signer_key: Option<String>,
}

impl NewRequirement {
    // Validação completa antes de qualquer I/O
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;
        if self.action == RequirementAction::ProvideEvidence && self.auth.is_none() {
            return Err(AppError::ValidationFailed(
                "requisito 'provide_evidence' exige o campo 'auth'".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum BulkRequirementOperation {
    Add {
        #[serde(flatten)]
        data: NewRequirement,
    },
    Remove {
        #[serde(rename = "remoteKey")]
        remote_key: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_req(action: RequirementAction, auth: Option<RequirementAuth>) -> NewRequirement {
        NewRequirement {
            action,
            role: None,
            auth,
            document_key: Some("doc-1".into()),
            signer_key: Some("signer-1".into()),
        }
    }

    #[test]
    fn provide_evidence_requires_auth() {
        let err = Requirement::new(Uuid::new_v4(), new_req(RequirementAction::ProvideEvidence, None))
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));

        let req = Requirement::new(
            Uuid::new_v4(),
            new_req(RequirementAction::ProvideEvidence, Some(RequirementAuth::IcpBrasil)),
        )
        .unwrap();
        assert_eq!(req.auth, Some(RequirementAuth::IcpBrasil));
    }

    #[test]
    fn role_defaults_to_sign() {
        let req = Requirement::new(Uuid::new_v4(), new_req(RequirementAction::Agree, None)).unwrap();
        assert_eq!(req.role, "sign");
        assert_eq!(req.status, RequirementStatus::Pending);
    }

    #[test]
    fn complete_only_from_pending() {
        let mut req = Requirement::new(Uuid::new_v4(), new_req(RequirementAction::Sign, None)).unwrap();
        req.complete().unwrap();
        assert_eq!(req.status, RequirementStatus::Completed);
        assert!(matches!(req.complete(), Err(AppError::InvalidState(_))));
    }

    #[test]
    fn bulk_operations_deserialize() {
        let ops: Vec<BulkRequirementOperation> = serde_json::from_str(
            r#"[
                {"op":"add","action":"provide_evidence","auth":"email","documentKey":"d","signerKey":"s"},
                {"op":"remove","remoteKey":"req-9"}
            ]"#,
        )
        .unwrap();

        assert!(matches!(&ops[0], BulkRequirementOperation::Add { data } if data.auth == Some(RequirementAuth::Email)));
        assert!(matches!(&ops[1], BulkRequirementOperation::Remove { remote_key } if remote_key == "req-9"));
    }
}
