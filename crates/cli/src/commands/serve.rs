//! `fieldrep serve`: start the HTTP API.

use anyhow::Context;
use fieldrep_gateway::AppState;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub async fn run(config_path: Option<&Path>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let store = super::open_store(&config).await?;
    if config.database.seed_on_start {
        let report = fieldrep_store::seed_if_empty(store.as_ref()).await?;
        if !report.is_empty() {
            info!(hcps = report.hcps, interactions = report.interactions, "Seeded sample data");
        }
    }

    let provider = fieldrep_providers::build_from_config(&config)
        .context("Failed to configure the model provider")?;

    info!(
        store = store.name(),
        provider = %config.provider,
        model = %config.model,
        "Starting FieldRep API"
    );

    let state = Arc::new(AppState::new(config, store, provider));
    fieldrep_gateway::serve(state).await.context("Gateway stopped")?;
    Ok(())
}
