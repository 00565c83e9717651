// tests/common/mod.rs
//
// Stores em memória + gateway roteirizado. Nenhum teste precisa de banco.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use assinatura_backend::{
    common::{context::RequestContext, error::AppError, locks::EnvelopeLocks},
    config::Stores,
    db::{DocumentStore, EnvelopeStore, RequirementStore, SignatoryStore, WebhookStore},
    gateway::{DocumentUpload, RemoteEnvelope, RemoteError, SigningGateway},
    models::{
        document::Document,
        envelope::{Envelope, EnvelopeStatus, NewEnvelope},
        requirement::{Requirement, RequirementData, RequirementOperation},
        signatory::{NewSignatory, Signatory},
        webhook::{Webhook, WebhookStatus},
    },
    services::{
        envelope_service::EnvelopeService, requirement_service::RequirementService,
        signatory_service::SignatoryService, webhook_service::WebhookService,
    },
};

// =============================================================================
//  TABELA EM MEMÓRIA
// =============================================================================

pub struct Table<T> {
    rows: Mutex<HashMap<Uuid, T>>,
    pub fail_create: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            fail_create: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }
}

impl<T: Clone> Table<T> {
    fn get(&self, id: Uuid) -> Option<T> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    fn insert(&self, id: Uuid, row: T) -> Result<T, AppError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::PersistenceFailed("insert falhou".into()));
        }
        self.rows.lock().unwrap().insert(id, row.clone());
        Ok(row)
    }

    fn replace(&self, id: Uuid, row: T) -> Result<T, AppError> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(AppError::PersistenceFailed("update falhou".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&id) {
            return Err(AppError::NotFound(format!("registro {}", id)));
        }
        rows.insert(id, row.clone());
        Ok(row)
    }

    fn remove(&self, id: Uuid) -> Result<(), AppError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::PersistenceFailed("delete falhou".into()));
        }
        match self.rows.lock().unwrap().remove(&id) {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("registro {}", id))),
        }
    }

    fn find(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| pred(row))
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<T> {
        self.find(|_| true)
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn put(&self, id: Uuid, row: T) {
        self.rows.lock().unwrap().insert(id, row);
    }

    pub fn row(&self, id: Uuid) -> Option<T> {
        self.get(id)
    }
}

// =============================================================================
//  STORES
// =============================================================================

#[derive(Default)]
pub struct MemoryEnvelopes(pub Table<Envelope>);

#[async_trait]
impl EnvelopeStore for MemoryEnvelopes {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Envelope>, AppError> {
        Ok(self.0.get(id))
    }
    async fn create(&self, envelope: &Envelope) -> Result<Envelope, AppError> {
        self.0.insert(envelope.id, envelope.clone())
    }
    async fn update(&self, envelope: &Envelope) -> Result<Envelope, AppError> {
        let mut row = envelope.clone();
        row.updated_at = Utc::now();
        self.0.replace(envelope.id, row)
    }
    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.0.remove(id)
    }
    async fn list(&self, status: Option<EnvelopeStatus>) -> Result<Vec<Envelope>, AppError> {
        Ok(self.0.find(|e| status.is_none_or(|s| e.status == s)))
    }
    async fn find_by_remote_key(&self, remote_key: &str) -> Result<Option<Envelope>, AppError> {
        Ok(self
            .0
            .find(|e| e.remote_key.as_deref() == Some(remote_key))
            .into_iter()
            .next())
    }
}

#[derive(Default)]
pub struct MemoryDocuments(pub Table<Document>);

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self.0.get(id))
    }
    async fn create(&self, document: &Document) -> Result<Document, AppError> {
        self.0.insert(document.id, document.clone())
    }
    async fn update(&self, document: &Document) -> Result<Document, AppError> {
        self.0.replace(document.id, document.clone())
    }
    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.0.remove(id)
    }
    async fn list_by_envelope(&self, envelope_id: Uuid) -> Result<Vec<Document>, AppError> {
        let mut docs = self.0.find(|d| d.envelope_id == Some(envelope_id));
        docs.sort_by_key(|d| d.created_at);
        Ok(docs)
    }
    async fn find_by_remote_key(&self, remote_key: &str) -> Result<Option<Document>, AppError> {
        Ok(self
            .0
            .find(|d| d.remote_key.as_deref() == Some(remote_key))
            .into_iter()
            .next())
    }
}

// Reproduz a constraint única (envelope_id, email) do banco
#[derive(Default)]
pub struct MemorySignatories(pub Table<Signatory>);

impl MemorySignatories {
    fn ensure_unique(&self, signatory: &Signatory) -> Result<(), AppError> {
        let clash = self.0.find(|s| {
            s.id != signatory.id
                && s.envelope_id == signatory.envelope_id
                && s.email == signatory.email
        });
        if !clash.is_empty() {
            return Err(AppError::BusinessRuleViolation(format!(
                "e-mail '{}' já está cadastrado no envelope {}",
                signatory.email, signatory.envelope_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SignatoryStore for MemorySignatories {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Signatory>, AppError> {
        Ok(self.0.get(id))
    }
    async fn create(&self, signatory: &Signatory) -> Result<Signatory, AppError> {
        tokio::task::yield_now().await;
        self.ensure_unique(signatory)?;
        self.0.insert(signatory.id, signatory.clone())
    }
    async fn update(&self, signatory: &Signatory) -> Result<Signatory, AppError> {
        self.ensure_unique(signatory)?;
        self.0.replace(signatory.id, signatory.clone())
    }
    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.0.remove(id)
    }
    async fn list_by_envelope(&self, envelope_id: Uuid) -> Result<Vec<Signatory>, AppError> {
        // Cede a vez para expor corridas entre "conta" e "insere"
        tokio::task::yield_now().await;
        let mut rows = self.0.find(|s| s.envelope_id == envelope_id);
        rows.sort_by_key(|s| s.created_at);
        Ok(rows)
    }
}

#[derive(Default)]
pub struct MemoryRequirements(pub Table<Requirement>);

#[async_trait]
impl RequirementStore for MemoryRequirements {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Requirement>, AppError> {
        Ok(self.0.get(id))
    }
    async fn create(&self, requirement: &Requirement) -> Result<Requirement, AppError> {
        self.0.insert(requirement.id, requirement.clone())
    }
    async fn update(&self, requirement: &Requirement) -> Result<Requirement, AppError> {
        self.0.replace(requirement.id, requirement.clone())
    }
    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.0.remove(id)
    }
    async fn list_by_envelope(&self, envelope_id: Uuid) -> Result<Vec<Requirement>, AppError> {
        Ok(self.0.find(|r| r.envelope_id == envelope_id))
    }
    async fn find_by_remote_key(&self, remote_key: &str) -> Result<Option<Requirement>, AppError> {
        Ok(self
            .0
            .find(|r| r.remote_key.as_deref() == Some(remote_key))
            .into_iter()
            .next())
    }
}

#[derive(Default)]
// O segundo campo falha só as gravações que marcam `processed`
pub struct MemoryWebhooks(pub Table<Webhook>, pub AtomicBool);

#[async_trait]
impl WebhookStore for MemoryWebhooks {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Webhook>, AppError> {
        Ok(self.0.get(id))
    }
    async fn create(&self, webhook: &Webhook) -> Result<Webhook, AppError> {
        self.0.insert(webhook.id, webhook.clone())
    }
    async fn update(&self, webhook: &Webhook) -> Result<Webhook, AppError> {
        // raw_payload nunca é reescrito, igual ao repositório Postgres
        if webhook.status == WebhookStatus::Processed && self.1.load(Ordering::SeqCst) {
            return Err(AppError::PersistenceFailed("update falhou".into()));
        }
        let stored = self
            .0
            .get(webhook.id)
            .ok_or_else(|| AppError::NotFound(format!("webhook {}", webhook.id)))?;
        let mut row = webhook.clone();
        row.raw_payload = stored.raw_payload;
        self.0.replace(webhook.id, row)
    }
    async fn list_by_status(&self, status: Option<WebhookStatus>) -> Result<Vec<Webhook>, AppError> {
        Ok(self.0.find(|w| status.is_none_or(|s| w.status == s)))
    }
}

// =============================================================================
//  GATEWAY ROTEIRIZADO
// =============================================================================

/// Registra cada chamada ("create_document:contrato.pdf") e falha as que
/// forem programadas com `fail`. Chaves geradas: "env-1", "doc-2", ...
#[derive(Default)]
pub struct MockGateway {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, RemoteError>>,
    counter: AtomicUsize,
    pub uploads: Mutex<Vec<DocumentUpload>>,
    pub bulk_operations: Mutex<Vec<RequirementOperation>>,
}

impl MockGateway {
    /// `op` pode ser o nome da operação ou "operação:detalhe".
    pub fn fail(&self, op: &str, error: RemoteError) {
        self.failures.lock().unwrap().insert(op.to_string(), error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.as_str() == op || c.starts_with(&format!("{}:", op)))
            .count()
    }

    fn call(&self, op: &str, detail: Option<&str>) -> Result<(), RemoteError> {
        let full = match detail {
            Some(d) => format!("{}:{}", op, d),
            None => op.to_string(),
        };
        self.calls.lock().unwrap().push(full.clone());

        let failures = self.failures.lock().unwrap();
        match failures.get(&full).or_else(|| failures.get(op)) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_key(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", prefix, n)
    }
}

#[async_trait]
impl SigningGateway for MockGateway {
    async fn create_envelope(
        &self,
        _ctx: &RequestContext,
        envelope: &Envelope,
    ) -> Result<RemoteEnvelope, RemoteError> {
        self.call("create_envelope", Some(&envelope.name))?;
        let key = self.next_key("env");
        Ok(RemoteEnvelope {
            raw_data: format!(r#"{{"data":{{"id":"{}","type":"envelopes"}}}}"#, key),
            key,
        })
    }

    async fn activate_envelope(&self, _ctx: &RequestContext, remote_key: &str) -> Result<(), RemoteError> {
        self.call("activate_envelope", Some(remote_key))
    }

    async fn create_document(
        &self,
        _ctx: &RequestContext,
        _envelope_key: &str,
        document: &DocumentUpload,
    ) -> Result<String, RemoteError> {
        self.call("create_document", Some(&document.filename))?;
        self.uploads.lock().unwrap().push(document.clone());
        Ok(self.next_key("doc"))
    }

    async fn create_requirement(
        &self,
        _ctx: &RequestContext,
        _envelope_key: &str,
        requirement: &RequirementData,
    ) -> Result<String, RemoteError> {
        self.call("create_requirement", Some(requirement.action.as_str()))?;
        Ok(self.next_key("req"))
    }

    async fn create_bulk_requirements(
        &self,
        _ctx: &RequestContext,
        _envelope_key: &str,
        operations: &[RequirementOperation],
    ) -> Result<Vec<String>, RemoteError> {
        self.call("create_bulk_requirements", None)?;
        self.bulk_operations
            .lock()
            .unwrap()
            .extend(operations.iter().cloned());
        Ok(operations
            .iter()
            .filter(|op| matches!(op, RequirementOperation::Add(_)))
            .map(|_| self.next_key("req"))
            .collect())
    }

    async fn create_signer(
        &self,
        _ctx: &RequestContext,
        _envelope_key: &str,
        signer: &Signatory,
    ) -> Result<String, RemoteError> {
        self.call("create_signer", Some(&signer.email))?;
        Ok(self.next_key("signer"))
    }

    async fn notify_signers(
        &self,
        _ctx: &RequestContext,
        envelope_key: &str,
        _message: Option<&str>,
    ) -> Result<(), RemoteError> {
        self.call("notify_signers", Some(envelope_key))
    }
}

// =============================================================================
//  HARNESS
// =============================================================================

pub struct Harness {
    pub envelopes: Arc<MemoryEnvelopes>,
    pub documents: Arc<MemoryDocuments>,
    pub signatories: Arc<MemorySignatories>,
    pub requirements: Arc<MemoryRequirements>,
    pub webhooks: Arc<MemoryWebhooks>,
    pub gateway: Arc<MockGateway>,
    pub envelope_service: EnvelopeService,
    pub requirement_service: RequirementService,
    pub signatory_service: SignatoryService,
    pub webhook_service: WebhookService,
    pub locks: EnvelopeLocks,
    pub ctx: RequestContext,
}

impl Harness {
    pub fn new() -> Self {
        let envelopes = Arc::new(MemoryEnvelopes::default());
        let documents = Arc::new(MemoryDocuments::default());
        let signatories = Arc::new(MemorySignatories::default());
        let requirements = Arc::new(MemoryRequirements::default());
        let webhooks = Arc::new(MemoryWebhooks::default());
        let gateway = Arc::new(MockGateway::default());

        let requirement_service =
            RequirementService::new(envelopes.clone(), requirements.clone(), gateway.clone());
        let envelope_service = EnvelopeService::new(
            envelopes.clone(),
            documents.clone(),
            gateway.clone(),
            requirement_service.clone(),
        );
        let locks = EnvelopeLocks::new();
        let signatory_service = SignatoryService::new(
            envelopes.clone(),
            signatories.clone(),
            gateway.clone(),
            locks.clone(),
        );
        let webhook_service =
            WebhookService::new(webhooks.clone(), envelopes.clone(), documents.clone());

        Self {
            envelopes,
            documents,
            signatories,
            requirements,
            webhooks,
            gateway,
            envelope_service,
            requirement_service,
            signatory_service,
            webhook_service,
            locks,
            ctx: RequestContext::new("test-correlation"),
        }
    }

    pub fn stores(&self) -> Stores {
        Stores {
            envelopes: self.envelopes.clone(),
            documents: self.documents.clone(),
            signatories: self.signatories.clone(),
            requirements: self.requirements.clone(),
            webhooks: self.webhooks.clone(),
        }
    }

    /// Envelope criado no provedor (draft, com chave remota).
    pub async fn remote_envelope(&self, name: &str) -> Envelope {
        self.envelope_service
            .create_envelope(&self.ctx, new_envelope(name))
            .await
            .expect("envelope deveria ser criado")
    }

    /// Envelope gravado direto no store, no status pedido.
    pub fn envelope_in(&self, status: EnvelopeStatus, remote_key: Option<&str>) -> Envelope {
        let mut envelope = Envelope::new(new_envelope("Direto no store")).unwrap();
        envelope.status = status;
        envelope.remote_key = remote_key.map(str::to_string);
        self.envelopes.0.put(envelope.id, envelope.clone());
        envelope
    }
}

pub fn new_envelope(name: &str) -> NewEnvelope {
    NewEnvelope {
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn new_signatory(email: &str) -> NewSignatory {
    NewSignatory {
        name: "Signatário".to_string(),
        email: email.to_string(),
        ..Default::default()
    }
}

// "%PDF-1.4\n"
pub const PDF_BASE64: &str = "JVBERi0xLjQK";
