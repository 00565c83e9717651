// src/gateway/error.rs

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

// Classificação dos erros do provedor remoto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Authentication,
    Client,
    Server,
    Serialization,
    Network,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Authentication => "autenticação",
            Self::Client => "requisição inválida",
            Self::Server => "erro do provedor",
            Self::Serialization => "serialização",
            Self::Network => "rede",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Error)]
#[error("[{kind}] {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub status: Option<u16>,
    // Campos vindos do corpo de erro do provedor (`errors[0]`)
    pub error_type: Option<String>,
    pub code: Option<String>,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            error_type: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Network, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Serialization, message)
    }

    /// Classifica uma resposta HTTP não-2xx do provedor.
    /// 401/403 -> autenticação, demais 4xx -> cliente, 5xx -> servidor.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => RemoteErrorKind::Authentication,
            400..=499 => RemoteErrorKind::Client,
            _ => RemoteErrorKind::Server,
        };

        let provider = serde_json::from_str::<ProviderErrorBody>(body)
            .ok()
            .and_then(|b| b.errors.into_iter().next());

        let (error_type, code, message) = match provider {
            Some(e) => {
                let message = e
                    .detail
                    .clone()
                    .or_else(|| e.title.clone())
                    .unwrap_or_else(|| format!("HTTP {}", status));
                (e.title, e.code, message)
            }
            None if body.trim().is_empty() => (None, None, format!("HTTP {}", status)),
            None => (None, None, format!("HTTP {}: {}", status, body.trim())),
        };

        Self {
            kind,
            status: Some(status),
            error_type,
            code,
            message,
        }
    }

    // Prefixa a mensagem com a entidade que falhou (ex: "documento 'contrato.pdf'")
    pub fn with_context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{}: {}", context, self.message);
        self
    }

    pub fn is_network(&self) -> bool {
        self.kind == RemoteErrorKind::Network
    }
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    errors: Vec<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    title: Option<String>,
    detail: Option<String>,
    code: Option<String>,
}
