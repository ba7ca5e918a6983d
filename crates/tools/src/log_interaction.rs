//! Log interaction tool: record a contact with an HCP.
//!
//! When summaries are enabled, the model is asked for a short summary that
//! is appended to the stored notes. A failed summary never blocks the log.

use crate::ToolSettings;
use crate::args::{self, HcpRef};
use async_trait::async_trait;
use fieldrep_core::error::ToolError;
use fieldrep_core::provider::{Provider, ProviderRequest};
use fieldrep_core::record::{Hcp, InteractionKind, NewInteraction, Sentiment};
use fieldrep_core::store::RecordStore;
use fieldrep_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SUMMARY_MAX_TOKENS: u32 = 200;

#[derive(Debug, Deserialize)]
struct LogArgs {
    #[serde(alias = "hcp_name", alias = "hcp_id")]
    hcp: HcpRef,
    #[serde(alias = "kind", alias = "type")]
    interaction_type: String,
    notes: String,
    #[serde(default, alias = "products_discussed", alias = "topics")]
    products: Option<String>,
    #[serde(default)]
    materials_shared: Option<String>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    follow_up_required: bool,
}

pub struct LogInteractionTool {
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn Provider>,
    settings: ToolSettings,
}

impl LogInteractionTool {
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

    async fn summarize(&self, hcp: &Hcp, kind: InteractionKind, args: &LogArgs) -> Option<String> {
        let prompt = format!(
            "Summarize this HCP interaction in at most two sentences.\n\n\
             HCP: Dr. {} ({})\n\
             Interaction Type: {}\n\
             Notes: {}\n\
             Products: {}",
            hcp.name,
            hcp.specialty,
            kind,
            args.notes,
            args.products.as_deref().unwrap_or(""),
        );
        let request = ProviderRequest::single_prompt(&self.settings.model, prompt)
            .with_temperature(self.settings.summary_temperature)
            .with_max_tokens(SUMMARY_MAX_TOKENS);

        match self.provider.complete(request).await {
            Ok(response) => {
                let summary = response.message.content.trim().to_string();
                (!summary.is_empty()).then_some(summary)
            }
            Err(e) => {
                warn!(hcp_id = hcp.id, error = %e, "Summary unavailable, logging without it");
                None
            }
        }
    }
}

#[async_trait]
impl Tool for LogInteractionTool {
    fn name(&self) -> &str {
        "log_interaction"
    }

    fn description(&self) -> &str {
        "Log a new interaction with a healthcare professional (HCP). \
         Use this when the user describes a visit, call, email or webinar they had with an HCP."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "hcp": {
                    "type": "string",
                    "description": "HCP name (titles like 'Dr.' are fine) or numeric HCP id"
                },
                "interaction_type": {
                    "type": "string",
                    "enum": ["visit", "call", "email", "webinar"],
                    "description": "How the contact happened"
                },
                "notes": {
                    "type": "string",
                    "description": "What was discussed"
                },
                "products": {
                    "type": "string",
                    "description": "Comma-separated products or topics discussed (optional)"
                },
                "sentiment": {
                    "type": "string",
                    "enum": ["positive", "neutral", "negative"],
                    "description": "How the HCP received the conversation (optional)"
                },
                "follow_up_required": {
                    "type": "boolean",
                    "description": "Whether a follow-up is needed (optional)"
                }
            },
            "required": ["hcp", "interaction_type", "notes"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: LogArgs = args::parse(self.name(), arguments)?;

        let Some(hcp) = args.hcp.resolve(self.store.as_ref()).await? else {
            return Ok(ToolResult::not_found(format!("HCP not found: '{}'.", args.hcp)));
        };

        let Ok(kind) = args.interaction_type.parse::<InteractionKind>() else {
            return Ok(ToolResult::invalid(format!(
                "Invalid interaction type '{}'. Use one of: visit, call, email, webinar.",
                args.interaction_type
            )));
        };

        let sentiment = match args.sentiment.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<Sentiment>() {
                Ok(s) => Some(s),
                Err(_) => {
                    return Ok(ToolResult::invalid(format!(
                        "Invalid sentiment '{raw}'. Use one of: positive, neutral, negative."
                    )));
                }
            },
        };

        let summary = if self.settings.summarize_on_log {
            self.summarize(&hcp, kind, &args).await
        } else {
            None
        };

        let mut notes = args.notes.clone();
        if let Some(summary) = &summary {
            notes.push_str("\n\nAI Summary: ");
            notes.push_str(summary);
        }

        let mut new = NewInteraction::new(hcp.id, kind, notes)
            .with_products(args.products.unwrap_or_default())
            .with_follow_up(args.follow_up_required);
        new.materials_shared = args.materials_shared.filter(|m| !m.trim().is_empty());
        new.sentiment = sentiment;

        let record = self.store.create_interaction(new).await?;
        info!(interaction_id = record.id, hcp_id = hcp.id, kind = %kind, "Interaction logged");
        debug!(summarized = summary.is_some(), "Log summary");

        let mut output = format!("Interaction logged successfully (ID: {}).", record.id);
        if let Some(summary) = summary {
            output.push_str(" Summary: ");
            output.push_str(&summary);
        }
        Ok(ToolResult::success(output).with_record(record.id))
    }
}
