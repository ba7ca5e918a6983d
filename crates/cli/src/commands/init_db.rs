//! `fieldrep init-db`: create tables and load sample data.

use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let store = super::open_store(&config).await?;

    let report = fieldrep_store::seed_if_empty(store.as_ref()).await?;
    println!("  Database: {}", config.database.url);
    if report.is_empty() {
        println!("  Tables ready. Existing data left untouched.");
    } else {
        println!(
            "  Tables ready. Inserted {} HCPs and {} interactions.",
            report.hcps, report.interactions
        );
    }
    Ok(())
}
