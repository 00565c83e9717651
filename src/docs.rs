// src/docs.rs

use utoipa::OpenApi;

use crate::{handlers, models, services};

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Envelopes ---
        handlers::envelopes::create_envelope,
        handlers::envelopes::list_envelopes,
        handlers::envelopes::get_envelope,
        handlers::envelopes::update_envelope,
        handlers::envelopes::delete_envelope,
        handlers::envelopes::activate_envelope,

        // --- Documents ---
        handlers::envelopes::list_documents,
        handlers::envelopes::add_document,
        handlers::documents::prepare_document,

        // --- Signatories ---
        handlers::signatories::create_signatory,
        handlers::signatories::list_signatories,
        handlers::signatories::get_signatory,
        handlers::signatories::update_signatory,
        handlers::signatories::delete_signatory,
        handlers::signatories::send_signatories,

        // --- Requirements ---
        handlers::requirements::create_requirement,
        handlers::requirements::bulk_requirements,
        handlers::requirements::list_requirements,
        handlers::requirements::complete_requirement,
        handlers::requirements::delete_requirement,

        // --- Webhooks ---
        handlers::webhooks::receive_clicksign,
        handlers::webhooks::list_webhooks,
        handlers::webhooks::get_webhook,
        handlers::webhooks::retry_webhook,
        handlers::webhooks::process_webhook,
    ),
    components(
        schemas(
            // --- Envelopes ---
            models::envelope::EnvelopeStatus,
            models::envelope::Envelope,
            models::envelope::NewEnvelope,
            models::envelope::EnvelopeChanges,
            handlers::envelopes::CreateEnvelopePayload,
            services::envelope_service::EnvelopeWithDocuments,
            services::envelope_service::EnvelopeWithRequirements,
            services::envelope_service::RequirementFailure,

            // --- Documents ---
            models::document::DocumentStatus,
            models::document::Document,
            models::document::NewDocument,

            // --- Signatories ---
            models::signatory::CommunicationChannel,
            models::signatory::CommunicateEvents,
            models::signatory::Signatory,
            models::signatory::NewSignatory,
            models::signatory::SignatoryChanges,
            handlers::signatories::SendSignatoriesPayload,
            services::signatory_service::SendSignatoriesReport,
            services::signatory_service::SignatorySendResult,

            // --- Requirements ---
            models::requirement::RequirementAction,
            models::requirement::RequirementAuth,
            models::requirement::RequirementStatus,
            models::requirement::Requirement,
            models::requirement::NewRequirement,
            handlers::requirements::BulkRequirementsPayload,
            services::requirement_service::BulkRequirementResult,

            // --- Webhooks ---
            models::webhook::WebhookStatus,
            models::webhook::Webhook,
        )
    ),
    tags(
        (name = "Health", description = "Disponibilidade do serviço"),
        (name = "Envelopes", description = "Criação e ciclo de vida dos envelopes"),
        (name = "Documents", description = "Documentos enviados para assinatura"),
        (name = "Signatories", description = "Signatários e envio ao provedor"),
        (name = "Requirements", description = "Requisitos de assinatura (individual e em lote)"),
        (name = "Webhooks", description = "Eventos recebidos do provedor")
    )
)]
pub struct ApiDoc;
