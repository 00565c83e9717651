// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::correlation::correlation_middleware};

pub fn router(app_state: AppState) -> Router {
    let envelope_routes = Router::new()
        .route(
            "/",
            post(handlers::envelopes::create_envelope).get(handlers::envelopes::list_envelopes),
        )
        .route(
            "/{envelope_id}",
            get(handlers::envelopes::get_envelope)
                .patch(handlers::envelopes::update_envelope)
                .delete(handlers::envelopes::delete_envelope),
        )
        .route("/{envelope_id}/activate", post(handlers::envelopes::activate_envelope))
        .route("/{envelope_id}/send", post(handlers::signatories::send_signatories))
        .route(
            "/{envelope_id}/documents",
            post(handlers::envelopes::add_document).get(handlers::envelopes::list_documents),
        )
        .route(
            "/{envelope_id}/signatories",
            post(handlers::signatories::create_signatory)
                .get(handlers::signatories::list_signatories),
        )
        .route(
            "/{envelope_id}/requirements",
            post(handlers::requirements::create_requirement)
                .get(handlers::requirements::list_requirements),
        )
        .route(
            "/{envelope_id}/requirements/bulk",
            post(handlers::requirements::bulk_requirements),
        );

    let signatory_routes = Router::new().route(
        "/{signatory_id}",
        get(handlers::signatories::get_signatory)
            .patch(handlers::signatories::update_signatory)
            .delete(handlers::signatories::delete_signatory),
    );

    let requirement_routes = Router::new()
        .route(
            "/{requirement_id}",
            axum::routing::delete(handlers::requirements::delete_requirement),
        )
        .route(
            "/{requirement_id}/complete",
            post(handlers::requirements::complete_requirement),
        );

    let document_routes = Router::new().route(
        "/{document_id}/prepare",
        post(handlers::documents::prepare_document),
    );

    let webhook_routes = Router::new()
        .route("/", get(handlers::webhooks::list_webhooks))
        .route("/clicksign", post(handlers::webhooks::receive_clicksign))
        .route("/{webhook_id}", get(handlers::webhooks::get_webhook))
        .route("/{webhook_id}/retry", post(handlers::webhooks::retry_webhook))
        .route("/{webhook_id}/process", post(handlers::webhooks::process_webhook));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(handlers::health::health))
        .nest("/api/envelopes", envelope_routes)
        .nest("/api/signatories", signatory_routes)
        .nest("/api/requirements", requirement_routes)
        .nest("/api/documents", document_routes)
        .nest("/api/webhooks", webhook_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn(correlation_middleware))
        .with_state(app_state)
}
