// src/services/webhook_service.rs

//! Reconciliação dos eventos assíncronos do provedor.
//!
//! O corpo recebido é gravado como `pending` antes de qualquer processamento,
//! então toda falha fica diagnosticável e pode ser reprocessada. Cada tentativa
//! termina em `processed` ou `failed`.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{context::RequestContext, error::AppError},
    db::{DocumentStore, EnvelopeStore, WebhookStore},
    models::{
        document::{Document, DocumentStatus},
        envelope::{Envelope, EnvelopeStatus},
        webhook::{Webhook, WebhookDocument, WebhookEvent, WebhookPayload, WebhookStatus},
    },
};

// Campos de metadados que enviamos junto com cada documento
const METADATA_ENVELOPE_ID: &str = "envelope_id";
const METADATA_DOCUMENT_ID: &str = "document_id";

#[derive(Clone)]
pub struct WebhookService {
    webhooks: Arc<dyn WebhookStore>,
    envelopes: Arc<dyn EnvelopeStore>,
    documents: Arc<dyn DocumentStore>,
}

impl WebhookService {
    pub fn new(
        webhooks: Arc<dyn WebhookStore>,
        envelopes: Arc<dyn EnvelopeStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            webhooks,
            envelopes,
            documents,
        }
    }

    /// Recebe o corpo bruto, grava e processa.
    pub async fn process_webhook(
        &self,
        ctx: &RequestContext,
        raw_payload: String,
    ) -> Result<Webhook, AppError> {
        let payload = WebhookPayload::parse(&raw_payload)?;

        // 1. Persiste antes de processar
        let webhook = self
            .webhooks
            .create(&Webhook::received(&payload, raw_payload))
            .await?;
        tracing::info!(
            correlation_id = %ctx.correlation_id,
            webhook_id = %webhook.id,
            event = %webhook.event_name,
            "📥 Webhook recebido"
        );

        self.dispatch_and_record(ctx, webhook, &payload).await
    }

    /// Reprocessa um webhook já gravado (depois de um `retry`).
    pub async fn process_stored_webhook(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Webhook, AppError> {
        let mut webhook = self.get(id).await?;
        if webhook.status != WebhookStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "webhook {} precisa estar 'pending' para ser processado (atual: '{}')",
                id, webhook.status
            )));
        }

        let payload = match WebhookPayload::parse(&webhook.raw_payload) {
            Ok(payload) => payload,
            Err(e) => {
                webhook.mark_failed(e.to_string())?;
                self.webhooks.update(&webhook).await?;
                return Err(e);
            }
        };

        self.dispatch_and_record(ctx, webhook, &payload).await
    }

    /// failed -> pending. Não reprocessa: quem dispara é o gatilho externo.
    pub async fn retry(&self, id: Uuid) -> Result<Webhook, AppError> {
        let mut webhook = self.get(id).await?;
        webhook.retry()?;
        let saved = self.webhooks.update(&webhook).await?;
        tracing::info!(webhook_id = %id, "🔁 Webhook liberado para reprocessamento");
        Ok(saved)
    }

    pub async fn get(&self, id: Uuid) -> Result<Webhook, AppError> {
        self.webhooks
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("webhook", id))
    }

    pub async fn list(&self, status: Option<WebhookStatus>) -> Result<Vec<Webhook>, AppError> {
        self.webhooks.list_by_status(status).await
    }

    // =========================================================================
    //  DESPACHO
    // =========================================================================

    async fn dispatch_and_record(
        &self,
        ctx: &RequestContext,
        webhook: Webhook,
        payload: &WebhookPayload,
    ) -> Result<Webhook, AppError> {
        match self.dispatch(ctx, &webhook, payload).await {
            Ok(()) => {
                let mut processed = webhook.clone();
                processed.mark_processed()?;
                match self.webhooks.update(&processed).await {
                    Ok(saved) => {
                        tracing::info!(
                            correlation_id = %ctx.correlation_id,
                            webhook_id = %saved.id,
                            "✅ Webhook processado"
                        );
                        Ok(saved)
                    }
                    Err(err) => {
                        // O efeito já foi aplicado; a linha não pode ficar em pending
                        self.record_failure(
                            ctx,
                            webhook,
                            format!("processado, mas o resultado não foi gravado: {}", err),
                        )
                        .await?;
                        Err(err)
                    }
                }
            }
            Err(err) => {
                tracing::warn!(
                    correlation_id = %ctx.correlation_id,
                    webhook_id = %webhook.id,
                    event = %webhook.event_name,
                    error = %err,
                    "Webhook falhou"
                );
                self.record_failure(ctx, webhook, err.to_string()).await?;
                Err(err)
            }
        }
    }

    async fn record_failure(
        &self,
        ctx: &RequestContext,
        mut webhook: Webhook,
        message: String,
    ) -> Result<(), AppError> {
        webhook.mark_failed(message)?;
        if let Err(e) = self.webhooks.update(&webhook).await {
            tracing::error!(
                correlation_id = %ctx.correlation_id,
                webhook_id = %webhook.id,
                error = %e,
                "🔥 Falha ao registrar erro do webhook; a linha ficou em pending"
            );
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        ctx: &RequestContext,
        webhook: &Webhook,
        payload: &WebhookPayload,
    ) -> Result<(), AppError> {
        match webhook.event() {
            WebhookEvent::AutoClose => self.handle_auto_close(ctx, webhook, payload).await,
            event @ (WebhookEvent::Sign
            | WebhookEvent::SignatureStarted
            | WebhookEvent::AddSigner
            | WebhookEvent::Upload) => {
                // Só registra; o corpo já está gravado no webhook
                tracing::info!(
                    correlation_id = %ctx.correlation_id,
                    webhook_id = %webhook.id,
                    event = event.name(),
                    document_key = ?webhook.document_key,
                    "Evento registrado"
                );
                Ok(())
            }
            WebhookEvent::Unknown(name) => {
                tracing::info!(
                    correlation_id = %ctx.correlation_id,
                    webhook_id = %webhook.id,
                    event = %name,
                    "Evento desconhecido aceito sem efeito"
                );
                Ok(())
            }
        }
    }

    /// Conclui o envelope. Um envelope já concluído é erro explícito, para que
    /// entregas duplicadas fiquem visíveis.
    async fn handle_auto_close(
        &self,
        ctx: &RequestContext,
        webhook: &Webhook,
        payload: &WebhookPayload,
    ) -> Result<(), AppError> {
        let document = payload.document.as_ref().ok_or_else(|| {
            AppError::ValidationFailed("evento auto_close sem o bloco 'document'".to_string())
        })?;

        let mut envelope = self.resolve_envelope(document).await?;
        if envelope.status == EnvelopeStatus::Completed {
            return Err(AppError::AlreadyCompleted(envelope.id));
        }

        envelope.complete()?;
        envelope.remote_raw_data = Some(webhook.raw_payload.clone());
        let envelope = self.envelopes.update(&envelope).await?;

        tracing::info!(
            correlation_id = %ctx.correlation_id,
            webhook_id = %webhook.id,
            envelope_id = %envelope.id,
            "🏁 Envelope concluído pelo provedor"
        );

        // Melhor esforço: falha aqui não falha o webhook
        if let Err(e) = self.mark_document_sent(document).await {
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                webhook_id = %webhook.id,
                envelope_id = %envelope.id,
                error = %e,
                "Envelope concluído, mas o documento não foi atualizado"
            );
        }
        Ok(())
    }

    // Metadados primeiro; depois pela chave remota (do envelope ou do documento)
    async fn resolve_envelope(&self, document: &WebhookDocument) -> Result<Envelope, AppError> {
        if let Some(id) = document.metadata_id(METADATA_ENVELOPE_ID) {
            if let Some(envelope) = self.envelopes.get_by_id(id).await? {
                return Ok(envelope);
            }
        }

        if let Some(key) = document.key.as_deref().filter(|k| !k.is_empty()) {
            if let Some(envelope) = self.envelopes.find_by_remote_key(key).await? {
                return Ok(envelope);
            }
            if let Some(envelope_id) = self
                .documents
                .find_by_remote_key(key)
                .await?
                .and_then(|d| d.envelope_id)
            {
                if let Some(envelope) = self.envelopes.get_by_id(envelope_id).await? {
                    return Ok(envelope);
                }
            }
        }

        Err(AppError::NotFound(format!(
            "envelope do evento (chave '{}')",
            document.key.as_deref().unwrap_or("-")
        )))
    }

    async fn mark_document_sent(&self, document: &WebhookDocument) -> Result<(), AppError> {
        let Some(mut local) = self.resolve_document(document).await? else {
            return Ok(());
        };
        if local.status == DocumentStatus::Sent {
            return Ok(());
        }
        local.mark_sent();
        self.documents.update(&local).await?;
        Ok(())
    }

    async fn resolve_document(&self, document: &WebhookDocument) -> Result<Option<Document>, AppError> {
        if let Some(id) = document.metadata_id(METADATA_DOCUMENT_ID) {
            if let Some(local) = self.documents.get_by_id(id).await? {
                return Ok(Some(local));
            }
        }
        match document.key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => self.documents.find_by_remote_key(key).await,
            None => Ok(None),
        }
    }
}
