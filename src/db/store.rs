// src/db/store.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        document::Document,
        envelope::{Envelope, EnvelopeStatus},
        requirement::Requirement,
        signatory::Signatory,
        webhook::{Webhook, WebhookStatus},
    },
};

// Contratos de persistência consumidos pelos services.
// Sem transações expostas: cada chamada é independente.

#[async_trait]
pub trait EnvelopeStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Envelope>, AppError>;
    async fn create(&self, envelope: &Envelope) -> Result<Envelope, AppError>;
    async fn update(&self, envelope: &Envelope) -> Result<Envelope, AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
    async fn list(&self, status: Option<EnvelopeStatus>) -> Result<Vec<Envelope>, AppError>;
    async fn find_by_remote_key(&self, remote_key: &str) -> Result<Option<Envelope>, AppError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError>;
    async fn create(&self, document: &Document) -> Result<Document, AppError>;
    async fn update(&self, document: &Document) -> Result<Document, AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
    async fn list_by_envelope(&self, envelope_id: Uuid) -> Result<Vec<Document>, AppError>;
    async fn find_by_remote_key(&self, remote_key: &str) -> Result<Option<Document>, AppError>;
}

#[async_trait]
pub trait SignatoryStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Signatory>, AppError>;
    /// Viola `BusinessRuleViolation` se o e-mail já existir no envelope.
    async fn create(&self, signatory: &Signatory) -> Result<Signatory, AppError>;
    async fn update(&self, signatory: &Signatory) -> Result<Signatory, AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
    async fn list_by_envelope(&self, envelope_id: Uuid) -> Result<Vec<Signatory>, AppError>;
}

#[async_trait]
pub trait RequirementStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Requirement>, AppError>;
    async fn create(&self, requirement: &Requirement) -> Result<Requirement, AppError>;
    async fn update(&self, requirement: &Requirement) -> Result<Requirement, AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
    async fn list_by_envelope(&self, envelope_id: Uuid) -> Result<Vec<Requirement>, AppError>;
    async fn find_by_remote_key(&self, remote_key: &str) -> Result<Option<Requirement>, AppError>;
}

#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Webhook>, AppError>;
    async fn create(&self, webhook: &Webhook) -> Result<Webhook, AppError>;
    async fn update(&self, webhook: &Webhook) -> Result<Webhook, AppError>;
    async fn list_by_status(&self, status: Option<WebhookStatus>) -> Result<Vec<Webhook>, AppError>;
}
