//! Provider construction from configuration.
//!
//! Resolves the active provider's base URL and API key, then wraps the HTTP
//! client in the bounded-retry layer.

use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::RetryProvider;
use fieldrep_config::AppConfig;
use fieldrep_core::error::ProviderError;
use fieldrep_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the configured provider, ready for the dispatch loop and tools.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.provider.as_str();
    let provider_config = config.providers.get(name);

    let base_url = match provider_config.and_then(|p| p.api_url.clone()) {
        Some(url) => url,
        None => default_base_url(name)?,
    };

    let api_key = match (config.resolved_api_key(), requires_key(name)) {
        (Some(key), _) => key,
        (None, false) => String::new(),
        (None, true) => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{name}' (set FIELDREP_API_KEY or GROQ_API_KEY)"
            )));
        }
    };

    let timeout = Duration::from_secs(config.agent.request_timeout_secs);
    let http = OpenAiCompatProvider::new(name, &base_url, api_key)
        // The retry layer owns the real deadline; leave the socket a little slack.
        .with_timeout(timeout + Duration::from_secs(5));

    info!(
        provider = name,
        base_url = %base_url,
        timeout_secs = timeout.as_secs(),
        max_retries = config.agent.max_retries,
        "Model provider configured"
    );

    Ok(Arc::new(
        RetryProvider::new(Arc::new(http))
            .with_timeout(timeout)
            .with_max_retries(config.agent.max_retries),
    ))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> Result<String, ProviderError> {
    match provider_name {
        "groq" => Ok("https://api.groq.com/openai/v1".into()),
        "openai" => Ok("https://api.openai.com/v1".into()),
        "openrouter" => Ok("https://openrouter.ai/api/v1".into()),
        "ollama" => Ok("http://localhost:11434/v1".into()),
        other => Err(ProviderError::NotConfigured(format!(
            "unknown provider '{other}'; set providers.{other}.api_url"
        ))),
    }
}

fn requires_key(provider_name: &str) -> bool {
    provider_name != "ollama"
}
