//! Edit interaction tool: change one field of an existing interaction.

use crate::args;
use async_trait::async_trait;
use fieldrep_core::error::ToolError;
use fieldrep_core::record::EditableField;
use fieldrep_core::store::RecordStore;
use fieldrep_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
struct EditArgs {
    #[serde(deserialize_with = "args::record_id")]
    interaction_id: i64,
    field: String,
    #[serde(alias = "value")]
    new_value: String,
}

pub struct EditInteractionTool {
    store: Arc<dyn RecordStore>,
}

impl EditInteractionTool {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for EditInteractionTool {
    fn name(&self) -> &str {
        "edit_interaction"
    }

    fn description(&self) -> &str {
        "Edit one field of an existing interaction. \
         Editable fields: notes, interaction_type, products_discussed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "interaction_id": {
                    "type": "integer",
                    "description": "ID of the interaction to edit"
                },
                "field": {
                    "type": "string",
                    "enum": ["notes", "interaction_type", "products_discussed"],
                    "description": "The field to change"
                },
                "new_value": {
                    "type": "string",
                    "description": "The new value for the field"
                }
            },
            "required": ["interaction_id", "field", "new_value"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: EditArgs = args::parse(self.name(), arguments)?;
        let id = args.interaction_id;

        if self.store.get_interaction(id).await?.is_none() {
            return Ok(ToolResult::not_found(format!("Interaction {id} not found.")));
        }

        let field: EditableField = match args.field.parse() {
            Ok(field) => field,
            Err(message) => return Ok(ToolResult::invalid(message)),
        };
        let patch = match field.apply(&args.new_value) {
            Ok(patch) => patch,
            Err(message) => return Ok(ToolResult::invalid(message)),
        };

        // The row can vanish between the check and the write.
        if self.store.update_interaction(id, patch).await?.is_none() {
            return Ok(ToolResult::not_found(format!("Interaction {id} not found.")));
        }

        info!(interaction_id = id, field = %field, "Interaction edited");
        Ok(ToolResult::success(format!(
            "Interaction {id} updated successfully. {field} changed to: {}",
            args.new_value
        ))
        .with_record(id))
    }
}
