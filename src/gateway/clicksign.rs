// src/gateway/clicksign.rs

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Method};
use serde_json::{json, Map, Value};

use crate::{
    common::context::RequestContext,
    gateway::{DocumentUpload, RemoteEnvelope, RemoteError, SigningGateway},
    models::{
        envelope::Envelope,
        requirement::{RequirementAction, RequirementData, RequirementOperation},
        signatory::Signatory,
    },
};

const JSON_API: &str = "application/vnd.api+json";
const REQUEST_ID_HEADER: &str = "x-request-id";

// Cliente da API v3 (JSON:API) da Clicksign
#[derive(Clone)]
pub struct ClicksignGateway {
    client: Client,
    base_url: String,
    access_token: String,
}

impl ClicksignGateway {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::network(format!("falha ao montar cliente HTTP: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3{}", self.base_url, path)
    }

    /// Envia a requisição e devolve o corpo bruto + o JSON já decodificado.
    async fn send(
        &self,
        ctx: &RequestContext,
        method: Method,
        path: &str,
        body: Value,
    ) -> Result<(String, Value), RemoteError> {
        let url = self.url(path);
        tracing::debug!(
            correlation_id = %ctx.correlation_id,
            method = %method,
            url = %url,
            "➡️ Chamando Clicksign"
        );

        let payload = serde_json::to_vec(&body)
            .map_err(|e| RemoteError::serialization(format!("falha ao serializar requisição: {}", e)))?;

        let response = self
            .client
            .request(method, &url)
            .header(reqwest::header::AUTHORIZATION, &self.access_token)
            .header(reqwest::header::CONTENT_TYPE, JSON_API)
            .header(reqwest::header::ACCEPT, JSON_API)
            .header(REQUEST_ID_HEADER, &ctx.correlation_id)
            .body(payload)
            .send()
            .await
            .map_err(|e| RemoteError::network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::network(e.to_string()))?;

        if !status.is_success() {
            let err = RemoteError::from_status(status.as_u16(), &text);
            tracing::warn!(
                correlation_id = %ctx.correlation_id,
                status = status.as_u16(),
                error = %err,
                "Clicksign recusou a requisição"
            );
            return Err(err);
        }

        if text.trim().is_empty() {
            return Ok((text, Value::Null));
        }

        let parsed = serde_json::from_str(&text)
            .map_err(|e| RemoteError::serialization(format!("resposta inválida do provedor: {}", e)))?;
        Ok((text, parsed))
    }

    async fn create_resource(
        &self,
        ctx: &RequestContext,
        path: &str,
        resource: Value,
    ) -> Result<(String, String), RemoteError> {
        let (raw, parsed) = self.send(ctx, Method::POST, path, json!({ "data": resource })).await?;
        let key = resource_id(&parsed)?;
        Ok((key, raw))
    }
}

fn resource_id(document: &Value) -> Result<String, RemoteError> {
    document
        .get("data")
        .and_then(|d| d.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RemoteError::serialization("resposta sem 'data.id'"))
}

fn envelope_resource(envelope: &Envelope) -> Value {
    let mut attributes = Map::new();
    attributes.insert("name".into(), json!(envelope.name));
    attributes.insert("locale".into(), json!(envelope.locale));
    attributes.insert("auto_close".into(), json!(envelope.auto_close));
    attributes.insert("remind_interval".into(), json!(envelope.remind_interval));
    if let Some(deadline) = envelope.deadline_at {
        attributes.insert("deadline_at".into(), json!(deadline.to_rfc3339()));
    }
    json!({ "type": "envelopes", "attributes": attributes })
}

fn requirement_resource(data: &RequirementData) -> Value {
    let mut attributes = Map::new();
    attributes.insert("action".into(), json!(data.action.as_str()));
    if data.action != RequirementAction::ProvideEvidence {
        attributes.insert("role".into(), json!(data.role));
    }
    if let Some(auth) = data.auth {
        attributes.insert("auth".into(), json!(auth.as_str()));
    }

    let mut relationships = Map::new();
    if let Some(document) = &data.document_key {
        relationships.insert(
            "document".into(),
            json!({ "data": { "type": "documents", "id": document } }),
        );
    }
    if let Some(signer) = &data.signer_key {
        relationships.insert(
            "signer".into(),
            json!({ "data": { "type": "signers", "id": signer } }),
        );
    }

    json!({
        "type": "requirements",
        "attributes": attributes,
        "relationships": relationships,
    })
}

fn signer_resource(signer: &Signatory) -> Value {
    let events = &signer.communicate_events;
    json!({
        "type": "signers",
        "attributes": {
            "name": signer.name,
            "email": signer.email,
            "birthday": signer.birthday.map(|d| d.format("%Y-%m-%d").to_string()),
            "phone_number": signer.phone_number,
            "has_documentation": signer.has_documentation,
            "group": signer.group,
            "communicate_events": {
                "document_signed": events.document_signed.as_str(),
                "signature_request": events.signature_request.as_str(),
                "signature_reminder": events.signature_reminder.as_str(),
            },
        },
    })
}

#[async_trait]
impl SigningGateway for ClicksignGateway {
    async fn create_envelope(
        &self,
        ctx: &RequestContext,
        envelope: &Envelope,
    ) -> Result<RemoteEnvelope, RemoteError> {
        let (key, raw_data) = self
            .create_resource(ctx, "/envelopes", envelope_resource(envelope))
            .await?;
        Ok(RemoteEnvelope { key, raw_data })
    }

    async fn activate_envelope(&self, ctx: &RequestContext, remote_key: &str) -> Result<(), RemoteError> {
        let body = json!({
            "data": {
                "id": remote_key,
                "type": "envelopes",
                "attributes": { "status": "running" },
            }
        });
        self.send(ctx, Method::PATCH, &format!("/envelopes/{}", remote_key), body)
            .await?;
        Ok(())
    }

    async fn create_document(
        &self,
        ctx: &RequestContext,
        envelope_key: &str,
        document: &DocumentUpload,
    ) -> Result<String, RemoteError> {
        let resource = json!({
            "type": "documents",
            "attributes": {
                "filename": document.filename,
                "content_base64": format!(
                    "data:{};base64,{}",
                    document.content_type,
                    STANDARD.encode(&document.content)
                ),
                "metadata": {
                    "document_id": document.document_id,
                    "envelope_id": document.envelope_id,
                },
            },
        });
        let (key, _) = self
            .create_resource(ctx, &format!("/envelopes/{}/documents", envelope_key), resource)
            .await?;
        Ok(key)
    }

    async fn create_requirement(
        &self,
        ctx: &RequestContext,
        envelope_key: &str,
        requirement: &RequirementData,
    ) -> Result<String, RemoteError> {
        let (key, _) = self
            .create_resource(
                ctx,
                &format!("/envelopes/{}/requirements", envelope_key),
                requirement_resource(requirement),
            )
            .await?;
        Ok(key)
    }

    async fn create_bulk_requirements(
        &self,
        ctx: &RequestContext,
        envelope_key: &str,
        operations: &[RequirementOperation],
    ) -> Result<Vec<String>, RemoteError> {
        let ops: Vec<Value> = operations
            .iter()
            .map(|op| match op {
                RequirementOperation::Add(data) => {
                    json!({ "op": "add", "data": requirement_resource(data) })
                }
                RequirementOperation::Remove { remote_key } => json!({
                    "op": "remove",
                    "ref": { "type": "requirements", "id": remote_key },
                }),
            })
            .collect();

        let (_, parsed) = self
            .send(
                ctx,
                Method::POST,
                &format!("/envelopes/{}/bulk_requirements", envelope_key),
                json!({ "atomic:operations": ops }),
            )
            .await?;

        let results = parsed
            .get("atomic:results")
            .and_then(Value::as_array)
            .ok_or_else(|| RemoteError::serialization("resposta sem 'atomic:results'"))?;

        if results.len() != operations.len() {
            return Err(RemoteError::serialization(format!(
                "lote com {} operações devolveu {} resultados",
                operations.len(),
                results.len()
            )));
        }

        operations
            .iter()
            .zip(results)
            .filter(|(op, _)| matches!(op, RequirementOperation::Add(_)))
            .map(|(_, result)| resource_id(result))
            .collect()
    }

    async fn create_signer(
        &self,
        ctx: &RequestContext,
        envelope_key: &str,
        signer: &Signatory,
    ) -> Result<String, RemoteError> {
        let (key, _) = self
            .create_resource(
                ctx,
                &format!("/envelopes/{}/signers", envelope_key),
                signer_resource(signer),
            )
            .await?;
        Ok(key)
    }

    async fn notify_signers(
        &self,
        ctx: &RequestContext,
        envelope_key: &str,
        message: Option<&str>,
    ) -> Result<(), RemoteError> {
        let body = json!({
            "data": {
                "type": "notifications",
                "attributes": { "message": message },
            }
        });
        self.send(
            ctx,
            Method::POST,
            &format!("/envelopes/{}/notifications", envelope_key),
            body,
        )
        .await?;
        Ok(())
    }
}
