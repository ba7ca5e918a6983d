//! Generate insights tool: ask the model to analyse an HCP's recent
//! interactions.
//!
//! Looks back `days` (default 30, clamped to a year) and hands at most ten
//! interactions to the model, newest first, with notes cut to a short
//! excerpt. A model failure becomes a `Failed` result, never an error, so
//! the dispatch loop can keep going.

use crate::ToolSettings;
use crate::args::{self, HcpRef};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use fieldrep_core::error::ToolError;
use fieldrep_core::provider::{Provider, ProviderRequest};
use fieldrep_core::record::{DATE_FORMAT, Hcp, Interaction};
use fieldrep_core::store::RecordStore;
use fieldrep_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_DAYS: i64 = 30;
const MAX_DAYS: i64 = 365;
const MAX_INTERACTIONS: usize = 10;
const EXCERPT_CHARS: usize = 100;
const INSIGHT_MAX_TOKENS: u32 = 400;

#[derive(Debug, Deserialize)]
struct InsightArgs {
    #[serde(alias = "hcp_id", alias = "hcp_name")]
    hcp: HcpRef,
    #[serde(default)]
    days: Option<i64>,
}

pub struct GenerateInsightsTool {
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn Provider>,
    settings: ToolSettings,
}

impl GenerateInsightsTool {
    pub fn new(
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn Provider>,
        settings: ToolSettings,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }
}

fn excerpt(notes: &str) -> String {
    let mut chars = notes.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn build_prompt(hcp: &Hcp, days: i64, interactions: &[Interaction]) -> String {
    let mut prompt = format!(
        "Analyze these interactions with Dr. {} ({}, {}) from the last {days} days and provide insights:\n\n",
        hcp.name, hcp.specialty, hcp.hospital
    );
    for i in interactions {
        let _ = writeln!(
            prompt,
            "- {} {}: {} (Products: {})",
            i.created_at.format(DATE_FORMAT),
            i.kind,
            excerpt(&i.notes),
            i.products_discussed.as_deref().unwrap_or("none"),
        );
    }
    prompt.push_str(
        "\nProvide:\n\
         1. Engagement level (High/Medium/Low)\n\
         2. Key interests and concerns\n\
         3. Recommended next steps\n\
         4. Products to focus on",
    );
    prompt
}

#[async_trait]
impl Tool for GenerateInsightsTool {
    fn name(&self) -> &str {
        "generate_insights"
    }

    fn description(&self) -> &str {
        "Analyse recent interactions with an HCP: engagement level, key interests, \
         recommended next steps, and products to focus on."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "hcp_id": {
                    "type": "integer",
                    "description": "ID of the HCP (a name is also accepted)"
                },
                "days": {
                    "type": "integer",
                    "description": "How many days to look back (default 30)",
                    "default": 30
                }
            },
            "required": ["hcp_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: InsightArgs = args::parse(self.name(), arguments)?;
        let days = args.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS);

        let Some(hcp) = args.hcp.resolve(self.store.as_ref()).await? else {
            return Ok(ToolResult::not_found(format!("HCP {} not found.", args.hcp)));
        };

        let since = Utc::now() - Duration::days(days);
        let interactions = self
            .store
            .recent_interactions(hcp.id, since, MAX_INTERACTIONS)
            .await?;
        if interactions.is_empty() {
            return Ok(ToolResult::not_found(format!(
                "No interactions found for HCP ID {} in the last {days} days.",
                hcp.id
            ))
            .with_record(hcp.id));
        }

        let request = ProviderRequest::single_prompt(
            &self.settings.insight_model,
            build_prompt(&hcp, days, &interactions),
        )
        .with_temperature(self.settings.insight_temperature)
        .with_max_tokens(INSIGHT_MAX_TOKENS);

        match self.provider.complete(request).await {
            Ok(response) => {
                info!(hcp_id = hcp.id, days, analysed = interactions.len(), "Insights generated");
                Ok(ToolResult::success(response.message.content.trim()).with_record(hcp.id))
            }
            Err(e) => {
                warn!(hcp_id = hcp.id, error = %e, "Insight generation failed");
                Ok(ToolResult::failed(format!(
                    "Insight generation is unavailable right now: {e}"
                ))
                .with_record(hcp.id))
            }
        }
    }
}
