//! `fieldrep config`: inspect and initialize configuration.

use anyhow::Context;
use fieldrep_config::AppConfig;
use std::path::Path;

/// Print the effective configuration. Secrets are redacted by `Debug`.
pub fn show(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);

    println!("  Config file: {}", path.display());
    println!(
        "  API key:     {}",
        if config.has_api_key() { "configured" } else { "missing" }
    );
    println!();
    println!("{config:#?}");
    Ok(())
}

/// Write the default config TOML unless a file already exists.
pub fn init(config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path);

    if path.exists() && !force {
        println!("  Config already exists at {}", path.display());
        println!("  Use --force to overwrite.");
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("  Wrote {}", path.display());
    println!("  Set FIELDREP_API_KEY (or GROQ_API_KEY) before running `fieldrep chat`.");
    Ok(())
}
