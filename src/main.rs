//! Hook server for the CMS database
//!
//! Configuration is read from the YAML file named by `CMS_AUTOMATION_CONFIG`
//! when set, then overridden by `FRONT_END_LINK`, `PAGE_WEB_HOOK_API_KEY`,
//! `DATABASE_URL` and `BIND_ADDRESS`.

use cms_automation::prelude::*;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AutomationConfig::from_env()?;
    config.warn_missing();

    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    tracing::info!("Connected to the database");

    let pages = Arc::new(PostgresPageStore::new(pool.clone(), &config.pages_collection));
    let schema = Arc::new(PostgresSchemaStore::new(pool, &config.schema));
    let notifier = Arc::new(WebhookNotifier::new(&config));

    let bind_address = config.bind_address.clone();
    ServerBuilder::new()
        .register_extension(FormCollectionsExtension::new(
            schema,
            &config.forms_collection,
            config.batch_chunk_size,
        ))
        .register_extension(PagesAutomationExtension::new(
            pages,
            notifier,
            &config.pages_collection,
            config.cascade_statuses.clone(),
        ))
        .with_config(config)
        .serve(&bind_address)
        .await
}
