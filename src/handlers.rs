pub mod documents;
pub mod envelopes;
pub mod health;
pub mod requirements;
pub mod signatories;
pub mod webhooks;
