// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::locks::EnvelopeLocks,
    db::{
        DocumentRepository, DocumentStore, EnvelopeRepository, EnvelopeStore, RequirementRepository,
        RequirementStore, SignatoryRepository, SignatoryStore, WebhookRepository, WebhookStore,
    },
    gateway::{ClicksignGateway, SigningGateway},
    services::{
        envelope_service::EnvelopeService, requirement_service::RequirementService,
        signatory_service::SignatoryService, webhook_service::WebhookService,
    },
};

pub const DEFAULT_CLICKSIGN_BASE_URL: &str = "https://sandbox.clicksign.com";
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub clicksign_base_url: String,
    pub clicksign_access_token: String,
    pub clicksign_timeout: Duration,
    pub server_addr: String,
}

impl Config {
    /// Lê o ambiente (com suporte a `.env`).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} deve ser definida", name))
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            clicksign_base_url: lookup("CLICKSIGN_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CLICKSIGN_BASE_URL.to_string()),
            clicksign_access_token: required("CLICKSIGN_ACCESS_TOKEN")?,
            clicksign_timeout: Duration::from_secs(parse_or(&lookup, "CLICKSIGN_TIMEOUT_SECS", 30)?),
            server_addr: lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: '{}'", name, raw)),
        None => Ok(default),
    }
}

// Implementações de persistência usadas pelos services
#[derive(Clone)]
pub struct Stores {
    pub envelopes: Arc<dyn EnvelopeStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub signatories: Arc<dyn SignatoryStore>,
    pub requirements: Arc<dyn RequirementStore>,
    pub webhooks: Arc<dyn WebhookStore>,
}

impl Stores {
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            envelopes: Arc::new(EnvelopeRepository::new(pool.clone())),
            documents: Arc::new(DocumentRepository::new(pool.clone())),
            signatories: Arc::new(SignatoryRepository::new(pool.clone())),
            requirements: Arc::new(RequirementRepository::new(pool.clone())),
            webhooks: Arc::new(WebhookRepository::new(pool.clone())),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub envelope_service: EnvelopeService,
    pub requirement_service: RequirementService,
    pub signatory_service: SignatoryService,
    pub webhook_service: WebhookService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let gateway = ClicksignGateway::new(
            config.clicksign_base_url.clone(),
            config.clicksign_access_token.clone(),
            config.clicksign_timeout,
        )?;

        let stores = Stores::postgres(&db_pool);
        Ok(Self::build(db_pool, stores, Arc::new(gateway)))
    }

    // --- Monta o gráfico de dependências ---
    pub fn build(db_pool: PgPool, stores: Stores, gateway: Arc<dyn SigningGateway>) -> Self {
        let requirement_service = RequirementService::new(
            stores.envelopes.clone(),
            stores.requirements.clone(),
            gateway.clone(),
        );
        let envelope_service = EnvelopeService::new(
            stores.envelopes.clone(),
            stores.documents.clone(),
            gateway.clone(),
            requirement_service.clone(),
        );
        let signatory_service = SignatoryService::new(
            stores.envelopes.clone(),
            stores.signatories.clone(),
            gateway,
            EnvelopeLocks::new(),
        );
        let webhook_service = WebhookService::new(
            stores.webhooks.clone(),
            stores.envelopes.clone(),
            stores.documents.clone(),
        );

        Self {
            db_pool,
            envelope_service,
            requirement_service,
            signatory_service,
            webhook_service,
        }
    }
}
