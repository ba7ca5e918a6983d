//! Schedule follow-up tool: mark an interaction as needing a follow-up on a date.

use crate::args;
use async_trait::async_trait;
use fieldrep_core::error::ToolError;
use fieldrep_core::record::{DATE_FORMAT, parse_date};
use fieldrep_core::store::RecordStore;
use fieldrep_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ScheduleArgs {
    #[serde(deserialize_with = "args::record_id")]
    interaction_id: i64,
    #[serde(alias = "date")]
    followup_date: String,
}

pub struct ScheduleFollowupTool {
    store: Arc<dyn RecordStore>,
}

impl ScheduleFollowupTool {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ScheduleFollowupTool {
    fn name(&self) -> &str {
        "schedule_followup"
    }

    fn description(&self) -> &str {
        "Schedule a follow-up for an existing interaction on a given date (YYYY-MM-DD)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "interaction_id": {
                    "type": "integer",
                    "description": "ID of the interaction to follow up on"
                },
                "followup_date": {
                    "type": "string",
                    "description": "Follow-up date in YYYY-MM-DD format"
                }
            },
            "required": ["interaction_id", "followup_date"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: ScheduleArgs = args::parse(self.name(), arguments)?;
        let id = args.interaction_id;

        if self.store.get_interaction(id).await?.is_none() {
            return Ok(ToolResult::not_found(format!("Interaction {id} not found.")));
        }

        let Some(date) = parse_date(&args.followup_date) else {
            return Ok(ToolResult::invalid(format!(
                "Invalid date '{}'. Use YYYY-MM-DD.",
                args.followup_date
            )));
        };

        if self.store.schedule_follow_up(id, date).await?.is_none() {
            return Ok(ToolResult::not_found(format!("Interaction {id} not found.")));
        }

        info!(interaction_id = id, %date, "Follow-up scheduled");
        Ok(ToolResult::success(format!(
            "Follow-up scheduled for {} (Interaction ID: {id}).",
            date.format(DATE_FORMAT)
        ))
        .with_record(id))
    }
}
