use anyhow::{bail, Context, Result};
use locale_index_sync::config::Config;
use locale_index_sync::{ElasticsearchClient, PgStore, Reindexer};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("locale_index_sync=info".parse()?),
        )
        .init();

    info!("Starting search reindex job");

    // Load configuration from environment
    let config = Config::from_env()?;
    let ty = Arc::new(config.entity_type()?);
    let scope = config.scope(&ty)?;

    info!(
        "Entity '{}' ({} strategy), locales: {}",
        ty.name(),
        ty.mapper().strategy_name(),
        ty.locales()
            .iter()
            .map(|locale| locale.code())
            .collect::<Vec<_>>()
            .join(", ")
    );

    // Step 1: Connect to the relational store
    let store = PgStore::connect(&config.database_url, &config.entity_table)
        .await
        .context("Failed to connect to database")?;

    // Step 2: Build the search client
    let client = ElasticsearchClient::new(&config.search_url).with_retry(config.retry_config());
    let reindexer = Reindexer::new(ty.clone(), store, client);

    // Step 3: Create indices if requested
    if config.create_indices {
        info!("Creating indices");
        let report = reindexer.engine().create_indices(&scope).await;
        if !report.is_success() {
            for failure in report.failures() {
                warn!("Index {} not created: {:?}", failure.index, failure.result);
            }
            bail!("Index creation failed: {}", report);
        }
    }

    // Step 4: Reindex every record
    let summary = reindexer.run(&scope).await?;
    info!("Reindexed {} record(s)", summary.entities);

    if !summary.is_success() {
        bail!(
            "{} record(s) failed to reindex: {:?}",
            summary.failed_entities.len(),
            summary.failed_entities
        );
    }

    info!("Reindex completed successfully!");
    Ok(())
}
