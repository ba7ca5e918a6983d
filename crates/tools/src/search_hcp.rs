//! Search HCP tool: find HCPs by name, specialty, or hospital.

use crate::args;
use async_trait::async_trait;
use fieldrep_core::error::ToolError;
use fieldrep_core::store::RecordStore;
use fieldrep_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;

const SEARCH_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchArgs {
    #[serde(alias = "q", alias = "name")]
    query: String,
}

pub struct SearchHcpTool {
    store: Arc<dyn RecordStore>,
}

impl SearchHcpTool {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SearchHcpTool {
    fn name(&self) -> &str {
        "search_hcp"
    }

    fn description(&self) -> &str {
        "Search healthcare professionals by name, specialty, or hospital. \
         Returns up to 10 matches with their IDs."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to match against name, specialty, or hospital"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: SearchArgs = args::parse(self.name(), arguments)?;
        let hcps = self.store.search_hcps(&args.query, SEARCH_LIMIT).await?;

        if hcps.is_empty() {
            return Ok(ToolResult::success(format!(
                "No HCPs found matching '{}'.",
                args.query
            )));
        }

        let mut output = String::from("Found HCPs:");
        for hcp in &hcps {
            let _ = write!(
                output,
                "\n- Dr. {} (ID {}) - {} at {}",
                hcp.name, hcp.id, hcp.specialty, hcp.hospital
            );
        }
        Ok(ToolResult::success(output))
    }
}
