// src/services/requirement_service.rs

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{context::RequestContext, error::AppError, saga::Compensations},
    db::{EnvelopeStore, RequirementStore},
    gateway::{RemoteError, SigningGateway},
    models::{
        envelope::Envelope,
        requirement::{BulkRequirementOperation, NewRequirement, Requirement, RequirementOperation},
    },
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequirementResult {
    pub created: Vec<Requirement>,
    pub removed: Vec<String>,
}

#[derive(Clone)]
pub struct RequirementService {
    envelopes: Arc<dyn EnvelopeStore>,
    requirements: Arc<dyn RequirementStore>,
    gateway: Arc<dyn SigningGateway>,
}

impl RequirementService {
    pub fn new(
        envelopes: Arc<dyn EnvelopeStore>,
        requirements: Arc<dyn RequirementStore>,
        gateway: Arc<dyn SigningGateway>,
    ) -> Self {
        Self {
            envelopes,
            requirements,
            gateway,
        }
    }

    /// Cria um requisito: local primeiro, depois no provedor.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        envelope_id: Uuid,
        input: NewRequirement,
    ) -> Result<Requirement, AppError> {
        // Validação antes de qualquer I/O
        let requirement = Requirement::new(envelope_id, input)?;
        let envelope = self.load_remote_envelope(envelope_id).await?;
        self.create_keyed(ctx, &envelope, requirement).await
    }

    /// Mesmo fluxo de `create`, para um envelope já carregado.
    pub async fn create_for_envelope(
        &self,
        ctx: &RequestContext,
        envelope: &Envelope,
        input: NewRequirement,
    ) -> Result<Requirement, AppError> {
        let requirement = Requirement::new(envelope.id, input)?;
        ensure_remote(envelope)?;
        self.create_keyed(ctx, envelope, requirement).await
    }

    async fn create_keyed(
        &self,
        ctx: &RequestContext,
        envelope: &Envelope,
        requirement: Requirement,
    ) -> Result<Requirement, AppError> {
        let envelope_key = envelope.remote_key.as_deref().unwrap_or_default();

        // 1. Grava local
        let mut requirement = self.requirements.create(&requirement).await?;

        let mut compensations = Compensations::new();
        let store = self.requirements.clone();
        let local_id = requirement.id;
        compensations.push(format!("remover requisito {}", local_id), move || async move {
            store.delete(local_id).await
        });

        // 2. Cria no provedor
        let remote_key = match self
            .gateway
            .create_requirement(ctx, envelope_key, &requirement.data())
            .await
        {
            Ok(key) => key,
            Err(e) => {
                tracing::error!(
                    correlation_id = %ctx.correlation_id,
                    envelope_id = %envelope.id,
                    requirement_id = %local_id,
                    error = %e,
                    "🔥 Falha ao criar requisito no provedor"
                );
                return Err(compensations.rollback(e.into()).await);
            }
        };
        compensations.commit();
        requirement.remote_key = Some(remote_key.clone());

        // 3. Grava a chave. O requisito existe nos dois lados, então falha aqui não desfaz nada.
        match self.requirements.update(&requirement).await {
            Ok(saved) => {
                tracing::info!(
                    correlation_id = %ctx.correlation_id,
                    requirement_id = %saved.id,
                    remote_key = %remote_key,
                    "✅ Requisito criado"
                );
                Ok(saved)
            }
            Err(e) => {
                tracing::error!(
                    correlation_id = %ctx.correlation_id,
                    requirement_id = %requirement.id,
                    remote_key = %remote_key,
                    error = %e,
                    "Requisito criado no provedor, mas a chave não foi gravada localmente"
                );
                Ok(requirement)
            }
        }
    }

    /// Lote atômico: o provedor aplica tudo ou nada; o lado local só reflete após o sucesso.
    pub async fn create_bulk(
        &self,
        ctx: &RequestContext,
        envelope_id: Uuid,
        operations: Vec<BulkRequirementOperation>,
    ) -> Result<BulkRequirementResult, AppError> {
        if operations.is_empty() {
            return Err(AppError::ValidationFailed(
                "o lote precisa de ao menos uma operação".to_string(),
            ));
        }

        // 1. Valida todas as inclusões antes de falar com o provedor
        let mut additions = Vec::new();
        let mut remote_ops = Vec::with_capacity(operations.len());
        let mut removals = Vec::new();
        for op in operations {
            match op {
                BulkRequirementOperation::Add { data } => {
                    let requirement = Requirement::new(envelope_id, data)?;
                    remote_ops.push(RequirementOperation::Add(requirement.data()));
                    additions.push(requirement);
                }
                BulkRequirementOperation::Remove { remote_key } => {
                    if remote_key.trim().is_empty() {
                        return Err(AppError::ValidationFailed(
                            "operação 'remove' exige remoteKey".to_string(),
                        ));
                    }
                    remote_ops.push(RequirementOperation::Remove {
                        remote_key: remote_key.clone(),
                    });
                    removals.push(remote_key);
                }
            }
        }

        let envelope = self.load_remote_envelope(envelope_id).await?;
        let envelope_key = envelope.remote_key.as_deref().unwrap_or_default();

        // 2. Uma única chamada remota
        let keys = self
            .gateway
            .create_bulk_requirements(ctx, envelope_key, &remote_ops)
            .await?;

        if keys.len() != additions.len() {
            return Err(RemoteError::serialization(format!(
                "provedor devolveu {} chaves para {} inclusões",
                keys.len(),
                additions.len()
            ))
            .into());
        }

        // 3. Reflete localmente
        let mut created = Vec::with_capacity(additions.len());
        for (mut requirement, key) in additions.into_iter().zip(keys) {
            requirement.remote_key = Some(key);
            let saved = self.requirements.create(&requirement).await.inspect_err(|e| {
                tracing::error!(
                    correlation_id = %ctx.correlation_id,
                    envelope_id = %envelope_id,
                    error = %e,
                    "Lote aplicado no provedor, mas falhou ao gravar requisito local"
                );
            })?;
            created.push(saved);
        }

        for remote_key in &removals {
            if let Some(existing) = self.requirements.find_by_remote_key(remote_key).await? {
                self.requirements.delete(existing.id).await?;
            }
        }

        tracing::info!(
            correlation_id = %ctx.correlation_id,
            envelope_id = %envelope_id,
            created = created.len(),
            removed = removals.len(),
            "✅ Lote de requisitos aplicado"
        );

        Ok(BulkRequirementResult {
            created,
            removed: removals,
        })
    }

    pub async fn list(&self, envelope_id: Uuid) -> Result<Vec<Requirement>, AppError> {
        if self.envelopes.get_by_id(envelope_id).await?.is_none() {
            return Err(AppError::not_found("envelope", envelope_id));
        }
        self.requirements.list_by_envelope(envelope_id).await
    }

    pub async fn complete(&self, id: Uuid) -> Result<Requirement, AppError> {
        let mut requirement = self
            .requirements
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("requisito", id))?;

        requirement.complete()?;
        self.requirements.update(&requirement).await
    }

    // Só local: o provedor não é avisado
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if self.requirements.get_by_id(id).await?.is_none() {
            return Err(AppError::not_found("requisito", id));
        }
        self.requirements.delete(id).await
    }

    async fn load_remote_envelope(&self, envelope_id: Uuid) -> Result<Envelope, AppError> {
        let envelope = self
            .envelopes
            .get_by_id(envelope_id)
            .await?
            .ok_or_else(|| AppError::not_found("envelope", envelope_id))?;
        ensure_remote(&envelope)?;
        Ok(envelope)
    }
}

fn ensure_remote(envelope: &Envelope) -> Result<(), AppError> {
    if !envelope.has_remote_key() {
        return Err(AppError::PreconditionFailed(format!(
            "envelope {} precisa ser criado no provedor antes dos requisitos",
            envelope.id
        )));
    }
    Ok(())
}
