// tests/clicksign_gateway_test.rs

use std::time::Duration;

use assinatura_backend::{
    common::context::RequestContext,
    gateway::{ClicksignGateway, DocumentUpload, RemoteErrorKind, SigningGateway},
    models::{
        envelope::{Envelope, NewEnvelope},
        requirement::{RequirementAction, RequirementAuth, RequirementData, RequirementOperation},
    },
};
use serde_json::json;
use uuid::Uuid;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const TOKEN: &str = "token-de-teste";

fn gateway(server: &MockServer) -> ClicksignGateway {
    ClicksignGateway::new(format!("{}/", server.uri()), TOKEN, Duration::from_secs(5)).unwrap()
}

fn ctx() -> RequestContext {
    RequestContext::new("req-123")
}

fn envelope() -> Envelope {
    Envelope::new(NewEnvelope {
        name: "Contrato".into(),
        ..Default::default()
    })
    .unwrap()
}

fn requirement(action: RequirementAction) -> RequirementData {
    RequirementData {
        action,
        role: "sign".into(),
        auth: Some(RequirementAuth::Email),
        document_key: Some("doc-1".into()),
        signer_key: Some("signer-1".into()),
    }
}

#[tokio::test]
async fn create_envelope_sends_json_api_request() {
    let server = MockServer::start().await;
    let body = json!({ "data": { "id": "env-abc", "type": "envelopes" } });

    Mock::given(method("POST"))
        .and(path("/api/v3/envelopes"))
        .and(header("authorization", TOKEN))
        .and(header("content-type", "application/vnd.api+json"))
        .and(header("accept", "application/vnd.api+json"))
        .and(header("x-request-id", "req-123"))
        .and(body_partial_json(json!({
            "data": {
                "type": "envelopes",
                "attributes": { "name": "Contrato", "locale": "pt-BR", "auto_close": true, "remind_interval": 3 }
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let remote = gateway(&server).create_envelope(&ctx(), &envelope()).await.unwrap();

    assert_eq!(remote.key, "env-abc");
    let raw: serde_json::Value = serde_json::from_str(&remote.raw_data).unwrap();
    assert_eq!(raw, body);
}

#[tokio::test]
async fn activate_patches_status_running() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v3/envelopes/env-abc"))
        .and(body_partial_json(json!({
            "data": { "id": "env-abc", "attributes": { "status": "running" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": "env-abc" } })))
        .expect(1)
        .mount(&server)
        .await;

    gateway(&server).activate_envelope(&ctx(), "env-abc").await.unwrap();
}

#[tokio::test]
async fn document_upload_carries_data_uri_and_metadata() {
    let server = MockServer::start().await;
    let document_id = Uuid::new_v4();
    let envelope_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/api/v3/envelopes/env-abc/documents"))
        .and(body_partial_json(json!({
            "data": {
                "type": "documents",
                "attributes": {
                    "filename": "contrato.pdf",
                    "content_base64": "data:application/pdf;base64,JVBERi0xLjQK",
                    "metadata": {
                        "document_id": document_id.to_string(),
                        "envelope_id": envelope_id.to_string()
                    }
                }
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "data": { "id": "doc-xyz" } })))
        .expect(1)
        .mount(&server)
        .await;

    let upload = DocumentUpload {
        filename: "contrato.pdf".into(),
        content_type: "application/pdf".into(),
        content: b"%PDF-1.4\n".to_vec(),
        document_id,
        envelope_id: Some(envelope_id),
    };
    let key = gateway(&server)
        .create_document(&ctx(), "env-abc", &upload)
        .await
        .unwrap();
    assert_eq!(key, "doc-xyz");
}

#[tokio::test]
async fn provide_evidence_omits_role() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/envelopes/env-abc/requirements"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "data": { "id": "req-1" } })))
        .mount(&server)
        .await;

    gateway(&server)
        .create_requirement(&ctx(), "env-abc", &requirement(RequirementAction::ProvideEvidence))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let attributes = &sent["data"]["attributes"];
    assert_eq!(attributes["action"], "provide_evidence");
    assert_eq!(attributes["auth"], "email");
    assert!(attributes.get("role").is_none());
    assert_eq!(sent["data"]["relationships"]["signer"]["data"]["id"], "signer-1");
}

// =============================================================================
//  CLASSIFICAÇÃO DE ERROS
// =============================================================================

#[tokio::test]
async fn unauthorized_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{ "title": "Unauthorized", "detail": "token inválido", "code": "401" }]
        })))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .create_envelope(&ctx(), &envelope())
        .await
        .unwrap_err();

    assert_eq!(err.kind, RemoteErrorKind::Authentication);
    assert_eq!(err.status, Some(401));
    assert_eq!(err.error_type.as_deref(), Some("Unauthorized"));
    assert_eq!(err.message, "token inválido");
}

#[tokio::test]
async fn unprocessable_is_client_error_with_provider_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": [{ "title": "Unprocessable Entity", "detail": "name can't be blank", "code": "blank" }]
        })))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .create_envelope(&ctx(), &envelope())
        .await
        .unwrap_err();

    assert_eq!(err.kind, RemoteErrorKind::Client);
    assert_eq!(err.status, Some(422));
    assert_eq!(err.code.as_deref(), Some("blank"));
    assert_eq!(err.message, "name can't be blank");
    assert!(!err.is_network());
}

#[tokio::test]
async fn unavailable_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .create_envelope(&ctx(), &envelope())
        .await
        .unwrap_err();

    assert_eq!(err.kind, RemoteErrorKind::Server);
    assert_eq!(err.status, Some(503));
    assert_eq!(err.message, "HTTP 503");
}

#[tokio::test]
async fn malformed_success_body_is_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .create_envelope(&ctx(), &envelope())
        .await
        .unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Serialization);

    server.reset().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "data": {} })))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .create_envelope(&ctx(), &envelope())
        .await
        .unwrap_err();
    assert_eq!(err.kind, RemoteErrorKind::Serialization);
}

#[tokio::test]
async fn closed_port_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway =
        ClicksignGateway::new(format!("http://{}", addr), TOKEN, Duration::from_secs(2)).unwrap();
    let err = gateway
        .create_envelope(&ctx(), &envelope())
        .await
        .unwrap_err();

    assert_eq!(err.kind, RemoteErrorKind::Network);
    assert!(err.is_network());
}

// =============================================================================
//  LOTE ATÔMICO
// =============================================================================

#[tokio::test]
async fn bulk_returns_keys_for_additions_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/envelopes/env-abc/bulk_requirements"))
        .and(body_partial_json(json!({
            "atomic:operations": [
                { "op": "remove", "ref": { "type": "requirements", "id": "req-old" } },
                { "op": "add", "data": { "type": "requirements", "attributes": { "action": "sign" } } },
                { "op": "add", "data": { "type": "requirements", "attributes": { "action": "agree" } } }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "atomic:results": [
                {},
                { "data": { "id": "req-new-1" } },
                { "data": { "id": "req-new-2" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let keys = gateway(&server)
        .create_bulk_requirements(
            &ctx(),
            "env-abc",
            &[
                RequirementOperation::Remove {
                    remote_key: "req-old".into(),
                },
                RequirementOperation::Add(requirement(RequirementAction::Sign)),
                RequirementOperation::Add(requirement(RequirementAction::Agree)),
            ],
        )
        .await
        .unwrap();

    assert_eq!(keys, vec!["req-new-1".to_string(), "req-new-2".to_string()]);
}

#[tokio::test]
async fn bulk_result_count_mismatch_is_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "atomic:results": [{ "data": { "id": "req-new-1" } }]
        })))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .create_bulk_requirements(
            &ctx(),
            "env-abc",
            &[
                RequirementOperation::Add(requirement(RequirementAction::Sign)),
                RequirementOperation::Add(requirement(RequirementAction::Agree)),
            ],
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, RemoteErrorKind::Serialization);
}

#[tokio::test]
async fn notification_posts_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/envelopes/env-abc/notifications"))
        .and(body_partial_json(json!({
            "data": { "type": "notifications", "attributes": { "message": "Assine, por favor" } }
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    gateway(&server)
        .notify_signers(&ctx(), "env-abc", Some("Assine, por favor"))
        .await
        .unwrap();
}
