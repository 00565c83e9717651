// tests/http_test.rs
//
// Router completo sobre stores em memória. O pool é preguiçoso e nunca conecta.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use assinatura_backend::{config::AppState, models::envelope::EnvelopeStatus, routes};
use common::Harness;

fn app(h: &Harness) -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/assinatura_test")
        .unwrap();
    routes::router(AppState::build(pool, h.stores(), h.gateway.clone()))
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, request_id, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_echoes_request_id() {
    let h = Harness::new();
    let request = Request::get("/api/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();

    let (status, request_id, body) = call(app(&h), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(request_id.as_deref(), Some("abc-123"));
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn create_envelope_returns_created() {
    let h = Harness::new();

    let (status, request_id, body) = call(
        app(&h),
        post_json("/api/envelopes", json!({ "name": "Contrato", "remindInterval": 5 })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(request_id.is_some());
    assert_eq!(body["status"], "draft");
    assert_eq!(body["remoteKey"], "env-1");
    assert_eq!(body["remindInterval"], 5);
}

#[tokio::test]
async fn documents_and_requirements_together_are_rejected() {
    let h = Harness::new();

    let (status, _, body) = call(
        app(&h),
        post_json(
            "/api/envelopes",
            json!({
                "name": "Contrato",
                "documents": [{ "name": "a.pdf", "contentBase64": common::PDF_BASE64, "mimeType": "pdf" }],
                "requirements": [{ "action": "sign" }]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn signatory_conflict_maps_to_409() {
    let h = Harness::new();
    let envelope = h.envelope_in(EnvelopeStatus::Draft, None);
    let uri = format!("/api/envelopes/{}/signatories", envelope.id);
    let payload = json!({ "name": "Maria", "email": "maria@example.com" });

    let (status, _, _) = call(app(&h), post_json(&uri, payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = call(app(&h), post_json(&uri, payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "BUSINESS_RULE_VIOLATION");
}

#[tokio::test]
async fn webhook_ingest_and_listing() {
    let h = Harness::new();
    let envelope = h.envelope_in(EnvelopeStatus::Sent, Some("env-x"));
    let raw = json!({
        "event": { "name": "auto_close", "data": {} },
        "document": { "key": "env-x", "metadata": { "envelope_id": envelope.id } }
    });

    let (status, _, body) = call(app(&h), post_json("/api/webhooks/clicksign", raw)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processed");

    let (status, _, body) = call(
        app(&h),
        Request::get("/api/webhooks?status=processed")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _, body) = call(
        app(&h),
        post_json("/api/webhooks/clicksign", json!({ "nada": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn remote_failure_exposes_provider_details() {
    let h = Harness::new();
    h.gateway.fail(
        "create_envelope",
        assinatura_backend::gateway::RemoteError {
            kind: assinatura_backend::gateway::RemoteErrorKind::Client,
            status: Some(422),
            error_type: Some("Unprocessable Entity".into()),
            code: Some("blank".into()),
            message: "name can't be blank".into(),
        },
    );

    let (status, _, body) = call(app(&h), post_json("/api/envelopes", json!({ "name": "X" }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "REMOTE_REJECTED");
    assert_eq!(body["provider"]["status"], 422);
    assert_eq!(body["provider"]["code"], "blank");
}

#[tokio::test]
async fn unknown_status_filter_is_bad_request() {
    let h = Harness::new();
    let (status, _, _) = call(
        app(&h),
        Request::get("/api/envelopes?status=arquivado")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
