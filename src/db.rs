pub mod store;
pub use store::{DocumentStore, EnvelopeStore, RequirementStore, SignatoryStore, WebhookStore};

pub mod envelope_repo;
pub use envelope_repo::EnvelopeRepository;
pub mod document_repo;
pub use document_repo::DocumentRepository;
pub mod signatory_repo;
pub use signatory_repo::SignatoryRepository;
pub mod requirement_repo;
pub use requirement_repo::RequirementRepository;
pub mod webhook_repo;
pub use webhook_repo::WebhookRepository;
