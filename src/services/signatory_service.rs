// src/services/signatory_service.rs

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{context::RequestContext, error::AppError, locks::EnvelopeLocks},
    db::{EnvelopeStore, SignatoryStore},
    gateway::SigningGateway,
    models::{
        envelope::{Envelope, EnvelopeStatus},
        signatory::{NewSignatory, Signatory, SignatoryChanges, MAX_SIGNATORIES_PER_ENVELOPE},
    },
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatorySendResult {
    pub signatory_id: Uuid,
    pub email: String,
    pub remote_key: Option<String>,
    // Já tinha chave remota; não foi reenviado
    pub skipped: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendSignatoriesReport {
    pub envelope_id: Uuid,
    pub results: Vec<SignatorySendResult>,
    pub notified: bool,
}

impl SendSignatoriesReport {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.error.is_some()).count()
    }
}

#[derive(Clone)]
pub struct SignatoryService {
    envelopes: Arc<dyn EnvelopeStore>,
    signatories: Arc<dyn SignatoryStore>,
    gateway: Arc<dyn SigningGateway>,
    locks: EnvelopeLocks,
}

impl SignatoryService {
    pub fn new(
        envelopes: Arc<dyn EnvelopeStore>,
        signatories: Arc<dyn SignatoryStore>,
        gateway: Arc<dyn SigningGateway>,
        locks: EnvelopeLocks,
    ) -> Self {
        Self {
            envelopes,
            signatories,
            gateway,
            locks,
        }
    }

    // =========================================================================
    //  1. INCLUSÃO / ALTERAÇÃO / REMOÇÃO
    // =========================================================================

    /// Conta e insere sob o lock do envelope. A constraint única do banco cobre
    /// o caso de outro processo inserindo ao mesmo tempo.
    pub async fn create(&self, envelope_id: Uuid, input: NewSignatory) -> Result<Signatory, AppError> {
        let signatory = Signatory::new(envelope_id, input)?;

        let _guard = self.locks.lock(envelope_id).await;

        let envelope = self.load_envelope(envelope_id).await?;
        ensure_allows_addition(&envelope)?;
        let roster = self.roster(&envelope).await?;
        roster.ensure_unique_email(&signatory.email, None)?;
        roster.ensure_capacity()?;

        let created = self.signatories.create(&signatory).await?;
        self.refresh_envelope_emails(envelope_id, &roster.reserved).await;

        tracing::info!(
            envelope_id = %envelope_id,
            signatory_id = %created.id,
            "✍️ Signatário adicionado"
        );
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, changes: SignatoryChanges) -> Result<Signatory, AppError> {
        changes.validate()?;

        let (_guards, mut signatory) = self.lock_signatory(id, changes.envelope_id).await?;
        let source_id = signatory.envelope_id;
        let target_id = changes.envelope_id.filter(|target| *target != source_id);

        let source = self.load_envelope(source_id).await?;
        if !source.status.allows_signatory_update() {
            return Err(AppError::BusinessRuleViolation(format!(
                "signatários do envelope {} não podem ser alterados em '{}'",
                source.id, source.status
            )));
        }
        let source_roster = self.roster(&source).await?;

        let email = changes.email.as_deref().map(str::trim).unwrap_or(&signatory.email).to_string();

        let target = match target_id {
            Some(target_id) => {
                if !source.status.allows_signatory_removal() {
                    return Err(AppError::BusinessRuleViolation(format!(
                        "signatário não pode sair do envelope {} em '{}'",
                        source.id, source.status
                    )));
                }
                let target = self.load_envelope(target_id).await?;
                ensure_allows_addition(&target)?;
                let target_roster = self.roster(&target).await?;
                target_roster.ensure_unique_email(&email, Some(id))?;
                target_roster.ensure_capacity()?;
                Some((target, target_roster))
            }
            None => {
                if email != signatory.email {
                    source_roster.ensure_unique_email(&email, Some(id))?;
                }
                None
            }
        };

        signatory.apply_changes(&changes);
        if let Some((target, _)) = &target {
            signatory.envelope_id = target.id;
        }
        let saved = self.signatories.update(&signatory).await?;

        self.refresh_envelope_emails(source.id, &source_roster.reserved).await;
        if let Some((target, target_roster)) = target {
            tracing::info!(
                signatory_id = %id,
                from = %source_id,
                to = %target.id,
                "🔀 Signatário movido de envelope"
            );
            self.refresh_envelope_emails(target.id, &target_roster.reserved).await;
        }
        Ok(saved)
    }

    /// Só em draft: um signatário já exposto não some silenciosamente.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let (_guards, signatory) = self.lock_signatory(id, None).await?;

        let envelope = self.load_envelope(signatory.envelope_id).await?;
        if !envelope.status.allows_signatory_removal() {
            return Err(AppError::BusinessRuleViolation(format!(
                "signatários do envelope {} não podem ser removidos em '{}'",
                envelope.id, envelope.status
            )));
        }
        let roster = self.roster(&envelope).await?;

        self.signatories.delete(id).await?;
        self.refresh_envelope_emails(envelope.id, &roster.reserved).await;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Signatory, AppError> {
        self.load_signatory(id).await
    }

    pub async fn list(&self, envelope_id: Uuid) -> Result<Vec<Signatory>, AppError> {
        self.load_envelope(envelope_id).await?;
        self.signatories.list_by_envelope(envelope_id).await
    }

    // =========================================================================
    //  2. ENVIO AO PROVEDOR
    // =========================================================================

    /// Envia cada signatário ainda sem chave. Envios são independentes entre si;
    /// nada é desfeito quando um deles falha.
    pub async fn send_signatories(
        &self,
        ctx: &RequestContext,
        envelope_id: Uuid,
        message: Option<String>,
    ) -> Result<SendSignatoriesReport, AppError> {
        let envelope = self.load_envelope(envelope_id).await?;
        if envelope.status != EnvelopeStatus::Sent || !envelope.has_remote_key() {
            return Err(AppError::PreconditionFailed(format!(
                "envelope {} precisa estar ativado para enviar signatários (atual: '{}')",
                envelope.id, envelope.status
            )));
        }
        let envelope_key = envelope.remote_key.as_deref().unwrap_or_default();

        let signatories = self.signatories.list_by_envelope(envelope_id).await?;
        let mut results = Vec::with_capacity(signatories.len());
        let mut sent = 0usize;

        for mut signatory in signatories {
            if signatory.remote_key.is_some() {
                results.push(SignatorySendResult {
                    signatory_id: signatory.id,
                    email: signatory.email.clone(),
                    remote_key: signatory.remote_key.clone(),
                    skipped: true,
                    error: None,
                });
                continue;
            }

            match self.gateway.create_signer(ctx, envelope_key, &signatory).await {
                Ok(key) => {
                    sent += 1;
                    signatory.remote_key = Some(key.clone());
                    if let Err(e) = self.signatories.update(&signatory).await {
                        tracing::error!(
                            correlation_id = %ctx.correlation_id,
                            signatory_id = %signatory.id,
                            remote_key = %key,
                            error = %e,
                            "Signatário criado no provedor, mas a chave não foi gravada"
                        );
                    }
                    results.push(SignatorySendResult {
                        signatory_id: signatory.id,
                        email: signatory.email,
                        remote_key: Some(key),
                        skipped: false,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        correlation_id = %ctx.correlation_id,
                        signatory_id = %signatory.id,
                        error = %e,
                        "Falha ao enviar signatário"
                    );
                    results.push(SignatorySendResult {
                        signatory_id: signatory.id,
                        email: signatory.email,
                        remote_key: None,
                        skipped: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let mut notified = false;
        if sent > 0 {
            match self
                .gateway
                .notify_signers(ctx, envelope_key, message.as_deref())
                .await
            {
                Ok(()) => notified = true,
                Err(e) => tracing::warn!(
                    correlation_id = %ctx.correlation_id,
                    envelope_id = %envelope_id,
                    error = %e,
                    "Signatários enviados, mas a notificação falhou"
                ),
            }
        }

        let report = SendSignatoriesReport {
            envelope_id,
            results,
            notified,
        };
        tracing::info!(
            correlation_id = %ctx.correlation_id,
            envelope_id = %envelope_id,
            sent,
            failed = report.failed(),
            "📨 Envio de signatários concluído"
        );
        Ok(report)
    }

    // =========================================================================
    //  3. REGRAS
    // =========================================================================

    // Trava o envelope atual do signatário. Se ele mudou de envelope entre a
    // leitura e o lock, solta e tenta de novo com o envelope certo.
    async fn lock_signatory(
        &self,
        id: Uuid,
        target: Option<Uuid>,
    ) -> Result<(Vec<OwnedMutexGuard<()>>, Signatory), AppError> {
        for _ in 0..LOCK_ATTEMPTS {
            let current = self.load_signatory(id).await?;
            let source_id = current.envelope_id;
            let guards = match target.filter(|t| *t != source_id) {
                Some(target) => self.locks.lock_pair(source_id, target).await,
                None => vec![self.locks.lock(source_id).await],
            };

            let signatory = self.load_signatory(id).await?;
            if signatory.envelope_id == source_id {
                return Ok((guards, signatory));
            }
            tracing::debug!(signatory_id = %id, "Signatário mudou de envelope durante o lock");
        }

        Err(AppError::InvalidState(format!(
            "signatário {} está sendo movido entre envelopes; tente novamente",
            id
        )))
    }

    async fn roster(&self, envelope: &Envelope) -> Result<Roster, AppError> {
        let rows = self.signatories.list_by_envelope(envelope.id).await?;
        let reserved = envelope
            .signatory_emails
            .iter()
            .filter(|email| !rows.iter().any(|s| &s.email == *email))
            .cloned()
            .collect();
        Ok(Roster {
            envelope_id: envelope.id,
            rows,
            reserved,
        })
    }

    // Lista do envelope = e-mails informados na criação sem linha própria + linhas atuais.
    // Relê o envelope para não sobrescrever o status.
    async fn refresh_envelope_emails(&self, envelope_id: Uuid, reserved: &[String]) {
        let result = async {
            let mut envelope = self.load_envelope(envelope_id).await?;
            let signatories = self.signatories.list_by_envelope(envelope_id).await?;
            envelope.signatory_emails = reserved
                .iter()
                .cloned()
                .chain(signatories.into_iter().map(|s| s.email))
                .collect();
            self.envelopes.update(&envelope).await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(
                envelope_id = %envelope_id,
                error = %e,
                "Não foi possível atualizar os e-mails do envelope"
            );
        }
    }

    async fn load_envelope(&self, id: Uuid) -> Result<Envelope, AppError> {
        self.envelopes
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("envelope", id))
    }

    async fn load_signatory(&self, id: Uuid) -> Result<Signatory, AppError> {
        self.signatories
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("signatário", id))
    }
}

const LOCK_ATTEMPTS: usize = 3;

// Quem ocupa vaga no envelope: as linhas de signatário e os e-mails que vieram
// na criação do envelope e ainda não têm linha.
struct Roster {
    envelope_id: Uuid,
    rows: Vec<Signatory>,
    reserved: Vec<String>,
}

impl Roster {
    // Comparação exata de e-mail, sem normalizar caixa
    fn ensure_unique_email(&self, email: &str, except: Option<Uuid>) -> Result<(), AppError> {
        let taken = self
            .rows
            .iter()
            .any(|s| s.email == email && Some(s.id) != except)
            || self.reserved.iter().any(|r| r == email);
        if taken {
            return Err(AppError::BusinessRuleViolation(format!(
                "e-mail '{}' já está cadastrado no envelope {}",
                email, self.envelope_id
            )));
        }
        Ok(())
    }

    fn ensure_capacity(&self) -> Result<(), AppError> {
        if self.rows.len() + self.reserved.len() >= MAX_SIGNATORIES_PER_ENVELOPE {
            return Err(AppError::BusinessRuleViolation(format!(
                "envelope {} já tem o máximo de {} signatários",
                self.envelope_id, MAX_SIGNATORIES_PER_ENVELOPE
            )));
        }
        Ok(())
    }
}

fn ensure_allows_addition(envelope: &Envelope) -> Result<(), AppError> {
    if !envelope.status.allows_signatory_addition() {
        return Err(AppError::BusinessRuleViolation(format!(
            "envelope {} em '{}' não aceita novos signatários",
            envelope.id, envelope.status
        )));
    }
    Ok(())
}
