// src/services/envelope_service.rs

//! Orquestração da criação de envelopes entre o banco local e o provedor.
//!
//! O provedor é o único passo sem transação. Tudo que é gravado localmente antes
//! dele registra uma compensação; se a chamada remota falhar, as compensações
//! rodam em ordem inversa e o erro do provedor é devolvido intacto.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{context::RequestContext, error::AppError, saga::Compensations},
    db::{DocumentStore, EnvelopeStore},
    gateway::{DocumentUpload, SigningGateway},
    models::{
        document::{Document, DocumentContent, NewDocument},
        envelope::{Envelope, EnvelopeChanges, EnvelopeStatus, NewEnvelope},
        requirement::{NewRequirement, Requirement},
    },
    services::requirement_service::RequirementService,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeWithDocuments {
    pub envelope: Envelope,
    pub documents: Vec<Document>,
}

// Falha de um requisito individual; não desfaz o envelope
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequirementFailure {
    pub index: usize,
    pub code: String,
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeWithRequirements {
    pub envelope: Envelope,
    pub requirements: Vec<Requirement>,
    pub failures: Vec<RequirementFailure>,
}

impl EnvelopeWithRequirements {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

// Documento validado + conteúdo que será enviado (não persistido)
struct PendingDocument {
    document: Document,
    content: DocumentContent,
}

#[derive(Clone)]
pub struct EnvelopeService {
    envelopes: Arc<dyn EnvelopeStore>,
    documents: Arc<dyn DocumentStore>,
    gateway: Arc<dyn SigningGateway>,
    requirements: RequirementService,
}

impl EnvelopeService {
    pub fn new(
        envelopes: Arc<dyn EnvelopeStore>,
        documents: Arc<dyn DocumentStore>,
        gateway: Arc<dyn SigningGateway>,
        requirements: RequirementService,
    ) -> Self {
        Self {
            envelopes,
            documents,
            gateway,
            requirements,
        }
    }

    // =========================================================================
    //  1. CRIAÇÃO (SAGA)
    // =========================================================================

    pub async fn create_envelope(
        &self,
        ctx: &RequestContext,
        input: NewEnvelope,
    ) -> Result<Envelope, AppError> {
        let envelope = Envelope::new(input)?;
        self.create_local_then_remote(ctx, envelope, Compensations::new())
            .await
    }

    /// Documentos são validados e gravados antes do envelope, que passa a
    /// referenciar os IDs locais. Depois do envelope existir no provedor, cada
    /// documento é criado lá na ordem recebida. Uma falha de documento aborta a
    /// operação, mas o que já foi criado fica como está.
    pub async fn create_envelope_with_documents(
        &self,
        ctx: &RequestContext,
        input: NewEnvelope,
        documents: Vec<NewDocument>,
    ) -> Result<EnvelopeWithDocuments, AppError> {
        // 1. Validação completa, sem I/O de escrita
        let mut envelope = Envelope::new(input)?;
        let mut pending = Vec::with_capacity(documents.len());
        for input in documents {
            pending.push(prepare_document(input).await?);
        }

        // 2. Documentos locais (sem envelope ainda)
        let mut compensations = Compensations::new();
        for item in &mut pending {
            item.document = match self.documents.create(&item.document).await {
                Ok(saved) => saved,
                Err(e) => return Err(compensations.rollback(e).await),
            };
            let store = self.documents.clone();
            let doc_id = item.document.id;
            compensations.push(format!("remover documento {}", doc_id), move || async move {
                store.delete(doc_id).await
            });
        }
        envelope.document_ids = pending.iter().map(|p| p.document.id).collect();

        // 3. Envelope local + remoto (compensa documentos e envelope se falhar)
        let envelope = self
            .create_local_then_remote(ctx, envelope, compensations)
            .await?;

        // 4. Associa os documentos ao envelope
        for item in &mut pending {
            item.document.envelope_id = Some(envelope.id);
            item.document = self.documents.update(&item.document).await?;
        }

        // 5. Documentos no provedor, um a um, gravando a chave assim que sai
        let mut created = Vec::with_capacity(pending.len());
        for item in pending {
            let document = self.upload_document(ctx, &envelope, item).await?;
            created.push(document);
        }

        Ok(EnvelopeWithDocuments {
            envelope,
            documents: created,
        })
    }

    /// Requisitos são aditivos: falhas ficam no resultado, o envelope continua criado.
    pub async fn create_envelope_with_requirements(
        &self,
        ctx: &RequestContext,
        input: NewEnvelope,
        requirements: Vec<NewRequirement>,
    ) -> Result<EnvelopeWithRequirements, AppError> {
        let envelope = self.create_envelope(ctx, input).await?;

        let mut created = Vec::new();
        let mut failures = Vec::new();
        for (index, input) in requirements.into_iter().enumerate() {
            match self
                .requirements
                .create_for_envelope(ctx, &envelope, input)
                .await
            {
                Ok(requirement) => created.push(requirement),
                Err(e) => {
                    tracing::warn!(
                        correlation_id = %ctx.correlation_id,
                        envelope_id = %envelope.id,
                        index,
                        error = %e,
                        "Requisito não foi criado; envelope mantido"
                    );
                    failures.push(RequirementFailure {
                        index,
                        code: e.error_code().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(EnvelopeWithRequirements {
            envelope,
            requirements: created,
            failures,
        })
    }

    async fn create_local_then_remote(
        &self,
        ctx: &RequestContext,
        envelope: Envelope,
        mut compensations: Compensations,
    ) -> Result<Envelope, AppError> {
        // 1. Grava local em draft, sem chave remota
        let mut envelope = match self.envelopes.create(&envelope).await {
            Ok(saved) => saved,
            Err(e) => return Err(compensations.rollback(e).await),
        };
        tracing::info!(
            correlation_id = %ctx.correlation_id,
            envelope_id = %envelope.id,
            "📝 Envelope gravado localmente (draft)"
        );

        let store = self.envelopes.clone();
        let envelope_id = envelope.id;
        compensations.push(format!("remover envelope {}", envelope_id), move || async move {
            store.delete(envelope_id).await
        });

        // 2. Cria no provedor
        let remote = match self.gateway.create_envelope(ctx, &envelope).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::error!(
                    correlation_id = %ctx.correlation_id,
                    envelope_id = %envelope_id,
                    error = %e,
                    "🔥 Provedor recusou a criação do envelope"
                );
                return Err(compensations.rollback(e.into()).await);
            }
        };
        compensations.commit();

        // 3. Grava a chave remota + snapshot bruto
        let remote_key = remote.key.clone();
        envelope.mark_created_remotely(remote.key, remote.raw_data);
        let saved = self.envelopes.update(&envelope).await.inspect_err(|e| {
            tracing::error!(
                correlation_id = %ctx.correlation_id,
                envelope_id = %envelope_id,
                remote_key = %remote_key,
                error = %e,
                "Envelope criado no provedor, mas a chave não foi gravada localmente"
            );
        })?;

        tracing::info!(
            correlation_id = %ctx.correlation_id,
            envelope_id = %saved.id,
            remote_key = %remote_key,
            "✅ Envelope criado no provedor"
        );
        Ok(saved)
    }

    // Cria um documento no provedor e grava a chave (ready -> processing)
    async fn upload_document(
        &self,
        ctx: &RequestContext,
        envelope: &Envelope,
        item: PendingDocument,
    ) -> Result<Document, AppError> {
        let PendingDocument {
            mut document,
            content,
        } = item;
        let envelope_key = envelope.remote_key.as_deref().unwrap_or_default();

        let bytes = read_content(&document, content).await?;
        let upload = DocumentUpload::new(&document, bytes);

        let remote_key = self
            .gateway
            .create_document(ctx, envelope_key, &upload)
            .await
            .map_err(|e| {
                tracing::error!(
                    correlation_id = %ctx.correlation_id,
                    envelope_id = %envelope.id,
                    document = %document.name,
                    error = %e,
                    "🔥 Falha ao criar documento no provedor"
                );
                AppError::from(e.with_context(format!("documento '{}'", document.name)))
            })?;

        document.remote_key = Some(remote_key.clone());
        document.prepare_for_signing()?;
        let saved = self.documents.update(&document).await?;

        tracing::info!(
            correlation_id = %ctx.correlation_id,
            envelope_id = %envelope.id,
            document_id = %saved.id,
            remote_key = %remote_key,
            "📄 Documento criado no provedor"
        );
        Ok(saved)
    }

    /// Adiciona um documento a um envelope que já existe no provedor.
    pub async fn add_document(
        &self,
        ctx: &RequestContext,
        envelope_id: Uuid,
        input: NewDocument,
    ) -> Result<Document, AppError> {
        let mut item = prepare_document(input).await?;

        let mut envelope = self.get(envelope_id).await?;
        if !envelope.has_remote_key() {
            return Err(AppError::PreconditionFailed(format!(
                "envelope {} precisa ser criado no provedor antes dos documentos",
                envelope.id
            )));
        }
        if envelope.status.is_terminal() {
            return Err(AppError::AlreadyInTerminalState {
                entity: format!("envelope {}", envelope.id),
                status: envelope.status.to_string(),
            });
        }

        item.document.envelope_id = Some(envelope.id);
        item.document = self.documents.create(&item.document).await?;

        let mut compensations = Compensations::new();
        let store = self.documents.clone();
        let doc_id = item.document.id;
        compensations.push(format!("remover documento {}", doc_id), move || async move {
            store.delete(doc_id).await
        });

        let document = match self.upload_document(ctx, &envelope, item).await {
            Ok(document) => document,
            Err(e) => return Err(compensations.rollback(e).await),
        };
        compensations.commit();

        envelope.document_ids.push(document.id);
        if let Err(e) = self.envelopes.update(&envelope).await {
            tracing::warn!(
                envelope_id = %envelope.id,
                document_id = %document.id,
                error = %e,
                "Documento criado, mas a lista do envelope não foi atualizada"
            );
        }
        Ok(document)
    }

    pub async fn list_documents(&self, envelope_id: Uuid) -> Result<Vec<Document>, AppError> {
        self.get(envelope_id).await?;
        self.documents.list_by_envelope(envelope_id).await
    }

    /// ready -> processing, sem chamada remota.
    pub async fn prepare_document(&self, document_id: Uuid) -> Result<Document, AppError> {
        let mut document = self
            .documents
            .get_by_id(document_id)
            .await?
            .ok_or_else(|| AppError::not_found("documento", document_id))?;

        document.prepare_for_signing()?;
        self.documents.update(&document).await
    }

    // =========================================================================
    //  2. CICLO DE VIDA
    // =========================================================================

    /// draft -> sent. O status local só é gravado depois do provedor confirmar.
    pub async fn activate(&self, ctx: &RequestContext, id: Uuid) -> Result<Envelope, AppError> {
        let current = self.get(id).await?;

        let mut activated = current.clone();
        activated.activate()?;

        let remote_key = current.remote_key.as_deref().unwrap_or_default();
        self.gateway
            .activate_envelope(ctx, remote_key)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    correlation_id = %ctx.correlation_id,
                    envelope_id = %id,
                    error = %e,
                    "🔥 Provedor recusou a ativação; status local mantido"
                );
            })?;

        let saved = self.envelopes.update(&activated).await?;
        tracing::info!(
            correlation_id = %ctx.correlation_id,
            envelope_id = %id,
            "🚀 Envelope ativado"
        );
        Ok(saved)
    }

    pub async fn get(&self, id: Uuid) -> Result<Envelope, AppError> {
        self.envelopes
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("envelope", id))
    }

    pub async fn list(&self, status: Option<EnvelopeStatus>) -> Result<Vec<Envelope>, AppError> {
        self.envelopes.list(status).await
    }

    pub async fn update(&self, id: Uuid, changes: EnvelopeChanges) -> Result<Envelope, AppError> {
        let mut envelope = self.get(id).await?;
        envelope.apply_changes(changes)?;
        self.envelopes.update(&envelope).await
    }

    // Exclusão física só em draft ou cancelled
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let envelope = self.get(id).await?;
        if !matches!(envelope.status, EnvelopeStatus::Draft | EnvelopeStatus::Cancelled) {
            return Err(AppError::InvalidState(format!(
                "envelope {} em '{}' não pode ser excluído",
                id, envelope.status
            )));
        }
        self.envelopes.delete(id).await?;
        tracing::info!(envelope_id = %id, "🗑️ Envelope excluído");
        Ok(())
    }
}

// Valida o payload e, para arquivos em disco, confere existência e tamanho
async fn prepare_document(input: NewDocument) -> Result<PendingDocument, AppError> {
    let (mut document, content) = Document::from_new(input)?;
    if let DocumentContent::File(path) = &content {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            AppError::ValidationFailed(format!(
                "documento '{}': arquivo '{}' inacessível ({})",
                document.name, path, e
            ))
        })?;
        document.size = metadata.len() as i64;
    }
    Ok(PendingDocument { document, content })
}

async fn read_content(document: &Document, content: DocumentContent) -> Result<Vec<u8>, AppError> {
    match content {
        DocumentContent::Inline(bytes) => Ok(bytes),
        DocumentContent::File(path) => tokio::fs::read(&path).await.map_err(|e| {
            AppError::ValidationFailed(format!(
                "documento '{}': falha ao ler '{}' ({})",
                document.name, path, e
            ))
        }),
    }
}
