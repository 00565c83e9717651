// src/common/context.rs

use uuid::Uuid;

// Contexto da requisição que atravessa o service até o gateway remoto.
// O cancelamento é o drop do future: a chamada HTTP em andamento é abortada,
// mas o que já foi gravado localmente permanece.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
}

impl RequestContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
        }
    }

    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}
