// src/gateway.rs

pub mod clicksign;
pub mod error;

pub use clicksign::ClicksignGateway;
pub use error::{RemoteError, RemoteErrorKind};

use async_trait::async_trait;

use crate::{
    common::context::RequestContext,
    models::{
        document::Document,
        envelope::Envelope,
        requirement::{RequirementData, RequirementOperation},
        signatory::Signatory,
    },
};

// Resposta da criação de envelope: chave remota + corpo bruto (opaco)
#[derive(Debug, Clone)]
pub struct RemoteEnvelope {
    pub key: String,
    pub raw_data: String,
}

// Documento pronto para upload (conteúdo já em bytes)
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
    // Vão como metadados; o provedor devolve nos webhooks
    pub document_id: uuid::Uuid,
    pub envelope_id: Option<uuid::Uuid>,
}

impl DocumentUpload {
    pub fn new(document: &Document, content: Vec<u8>) -> Self {
        Self {
            filename: document.upload_filename(),
            content_type: document.content_type().to_string(),
            content,
            document_id: document.id,
            envelope_id: document.envelope_id,
        }
    }
}

/// Contrato com o provedor de assinatura. Todas as chamadas são RPCs opacas:
/// devolvem a chave atribuída pelo provedor ou um erro classificado.
#[async_trait]
pub trait SigningGateway: Send + Sync {
    async fn create_envelope(
        &self,
        ctx: &RequestContext,
        envelope: &Envelope,
    ) -> Result<RemoteEnvelope, RemoteError>;

    async fn activate_envelope(&self, ctx: &RequestContext, remote_key: &str) -> Result<(), RemoteError>;

    async fn create_document(
        &self,
        ctx: &RequestContext,
        envelope_key: &str,
        document: &DocumentUpload,
    ) -> Result<String, RemoteError>;

    async fn create_requirement(
        &self,
        ctx: &RequestContext,
        envelope_key: &str,
        requirement: &RequirementData,
    ) -> Result<String, RemoteError>;

    /// Lote atômico. Devolve as chaves criadas, na ordem das operações `add`.
    async fn create_bulk_requirements(
        &self,
        ctx: &RequestContext,
        envelope_key: &str,
        operations: &[RequirementOperation],
    ) -> Result<Vec<String>, RemoteError>;

    async fn create_signer(
        &self,
        ctx: &RequestContext,
        envelope_key: &str,
        signer: &Signatory,
    ) -> Result<String, RemoteError>;

    async fn notify_signers(
        &self,
        ctx: &RequestContext,
        envelope_key: &str,
        message: Option<&str>,
    ) -> Result<(), RemoteError>;
}
