pub mod document;
pub mod envelope;
pub mod requirement;
pub mod signatory;
pub mod webhook;
