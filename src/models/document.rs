// src/models/document.rs

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

pub const ALLOWED_MIME_TYPES: [&str; 5] = ["pdf", "jpeg", "jpg", "png", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "document_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Draft,
    Ready,
    Processing,
    Sent,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Processing => "processing",
            Self::Sent => "sent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub envelope_id: Option<Uuid>,
    #[schema(example = "contrato.pdf")]
    pub name: String,
    // Caminho no disco, ou None quando veio como conteúdo inline (base64)
    pub file_path: Option<String>,
    pub from_content: bool,
    pub size: i64,
    #[schema(example = "pdf")]
    pub mime_type: String,
    pub status: DocumentStatus,
    pub remote_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Conteúdo que será enviado ao provedor. Não é persistido.
#[derive(Debug, Clone)]
pub enum DocumentContent {
    Inline(Vec<u8>),
    File(String),
}

impl Document {
    /// Valida o payload e monta o documento em `ready`.
    /// Para arquivos em disco o tamanho é preenchido pelo service.
    pub fn from_new(input: NewDocument) -> Result<(Self, DocumentContent), AppError> {
        input.validate()?;

        let (uri_mime, content) = match (input.file_path, input.content_base64) {
            (Some(_), Some(_)) => {
                return Err(AppError::ValidationFailed(format!(
                    "documento '{}': informe filePath ou contentBase64, não ambos",
                    input.name
                )));
            }
            (None, None) => {
                return Err(AppError::ValidationFailed(format!(
                    "documento '{}': filePath ou contentBase64 é obrigatório",
                    input.name
                )));
            }
            (Some(path), None) => (None, DocumentContent::File(path)),
            (None, Some(encoded)) => {
                let (uri_mime, bytes) = decode_content(&input.name, &encoded)?;
                (uri_mime, DocumentContent::Inline(bytes))
            }
        };

        let raw_mime = input.mime_type.or(uri_mime).ok_or_else(|| {
            AppError::ValidationFailed(format!("documento '{}': mimeType é obrigatório", input.name))
        })?;
        let mime_type = normalize_mime_type(&raw_mime)?;

        let (file_path, from_content, size) = match &content {
            DocumentContent::Inline(bytes) => (None, true, bytes.len() as i64),
            DocumentContent::File(path) => (Some(path.clone()), false, 0),
        };

        let now = Utc::now();
        let document = Self {
            id: Uuid::new_v4(),
            envelope_id: None,
            name: input.name.trim().to_string(),
            file_path,
            from_content,
            size,
            mime_type,
            status: DocumentStatus::Ready,
            remote_key: None,
            created_at: now,
            updated_at: now,
        };

        Ok((document, content))
    }

    pub fn content_type(&self) -> &'static str {
        match self.mime_type.as_str() {
            "pdf" => "application/pdf",
            "png" => "image/png",
            "gif" => "image/gif",
            _ => "image/jpeg",
        }
    }

    // O provedor exige extensão no nome do arquivo
    pub fn upload_filename(&self) -> String {
        let lower = self.name.to_lowercase();
        if ALLOWED_MIME_TYPES.iter().any(|ext| lower.ends_with(&format!(".{}", ext))) {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.mime_type)
        }
    }

    // =========================================================================
    //  MÁQUINA DE ESTADOS
    // =========================================================================

    pub fn prepare_for_signing(&mut self) -> Result<(), AppError> {
        if self.status != DocumentStatus::Ready {
            return Err(AppError::InvalidState(format!(
                "documento '{}' precisa estar 'ready' para ser preparado (atual: '{}')",
                self.name,
                self.status.as_str()
            )));
        }
        self.status = DocumentStatus::Processing;
        Ok(())
    }

    // Só a reconciliação chega em `sent`. Nunca regride.
    pub fn mark_sent(&mut self) {
        self.status = DocumentStatus::Sent;
    }
}

/// Aceita "pdf", "application/pdf", "image/png"... e devolve a forma curta.
pub fn normalize_mime_type(raw: &str) -> Result<String, AppError> {
    let lower = raw.trim().to_lowercase();
    let short = lower.rsplit('/').next().unwrap_or(&lower);

    if ALLOWED_MIME_TYPES.contains(&short) {
        Ok(short.to_string())
    } else {
        Err(AppError::ValidationFailed(format!(
            "tipo de arquivo não suportado: '{}' (permitidos: {})",
            raw,
            ALLOWED_MIME_TYPES.join(", ")
        )))
    }
}

// Aceita base64 puro ou data URI ("data:application/pdf;base64,....")
fn decode_content(name: &str, encoded: &str) -> Result<(Option<String>, Vec<u8>), AppError> {
    let encoded = encoded.trim();
    let (mime, payload) = match encoded.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest.split_once(',').ok_or_else(|| {
                AppError::ValidationFailed(format!("documento '{}': data URI inválida", name))
            })?;
            let mime = header.strip_suffix(";base64").unwrap_or(header);
            (Some(mime.to_string()).filter(|m| !m.is_empty()), data)
        }
        None => (None, encoded),
    };

    let bytes = STANDARD.decode(payload).map_err(|e| {
        AppError::ValidationFailed(format!("documento '{}': base64 inválido ({})", name, e))
    })?;

    if bytes.is_empty() {
        return Err(AppError::ValidationFailed(format!(
            "documento '{}': conteúdo vazio",
            name
        )));
    }
    Ok((mime, bytes))
}

// --- Payloads ---

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    #[validate(length(min = 1, max = 255, message = "required"))]
    #[schema(example = "contrato.pdf")]
    pub name: String,

    pub file_path: Option<String>,

    #[schema(example = "data:application/pdf;base64,JVBERi0xLjQK")]
    pub content_base64: Option<String>,

    #[schema(example = "application/pdf")]
    pub mime_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline(name: &str, mime: Option<&str>, content: &str) -> NewDocument {
        NewDocument {
            name: name.into(),
            file_path: None,
            content_base64: Some(content.into()),
            mime_type: mime.map(Into::into),
        }
    }

    #[test]
    fn normalizes_allowed_mime_types() {
        assert_eq!(normalize_mime_type("application/pdf").unwrap(), "pdf");
        assert_eq!(normalize_mime_type("image/JPG").unwrap(), "jpg");
        assert_eq!(normalize_mime_type("gif").unwrap(), "gif");
        assert!(matches!(
            normalize_mime_type("application/msword"),
            Err(AppError::ValidationFailed(_))
        ));
    }

    #[test]
    fn inline_content_is_decoded() {
        // "%PDF-1.4\n"
        let (doc, content) =
            Document::from_new(inline("contrato", Some("application/pdf"), "JVBERi0xLjQK")).unwrap();
        assert!(doc.from_content);
        assert_eq!(doc.size, 9);
        assert_eq!(doc.status, DocumentStatus::Ready);
        assert_eq!(doc.upload_filename(), "contrato.pdf");
        assert!(matches!(content, DocumentContent::Inline(b) if b.starts_with(b"%PDF")));
    }

    #[test]
    fn data_uri_provides_mime_type() {
        let (doc, _) =
            Document::from_new(inline("foto.png", None, "data:image/png;base64,iVBORw0KGgo=")).unwrap();
        assert_eq!(doc.mime_type, "png");
        assert_eq!(doc.content_type(), "image/png");
        assert_eq!(doc.upload_filename(), "foto.png");
    }

    #[test]
    fn rejects_bad_content() {
        assert!(Document::from_new(inline("a", Some("pdf"), "%%%not-base64")).is_err());
        assert!(Document::from_new(inline("a", Some("docx"), "JVBERi0xLjQK")).is_err());
        assert!(Document::from_new(inline("a", None, "JVBERi0xLjQK")).is_err());
        assert!(Document::from_new(NewDocument {
            name: "a".into(),
            mime_type: Some("pdf".into()),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn prepare_requires_ready() {
        let (mut doc, _) = Document::from_new(inline("a.pdf", Some("pdf"), "JVBERi0xLjQK")).unwrap();
        doc.prepare_for_signing().unwrap();
        assert_eq!(doc.status, DocumentStatus::Processing);
        assert!(matches!(doc.prepare_for_signing(), Err(AppError::InvalidState(_))));

        doc.mark_sent();
        assert_eq!(doc.status, DocumentStatus::Sent);
        assert!(doc.prepare_for_signing().is_err());
    }
}
