pub mod envelope_service;
pub mod requirement_service;
pub mod signatory_service;
pub mod webhook_service;
