//! The CRM tools the FieldRep agent can call.
//!
//! Each tool reads or writes the record store; two of them also make a
//! tool-less completion against the model:
//! - `log_interaction` asks for a short summary to append to the notes
//! - `generate_insights` asks for an engagement analysis
//!
//! The same registry backs the dispatch loop and the direct tool routes.

pub mod args;
pub mod edit_interaction;
pub mod generate_insights;
pub mod log_interaction;
pub mod schedule_followup;
pub mod search_hcp;

use fieldrep_config::AppConfig;
use fieldrep_core::provider::Provider;
use fieldrep_core::store::RecordStore;
use fieldrep_core::tool::ToolRegistry;
use std::sync::Arc;

pub use edit_interaction::EditInteractionTool;
pub use generate_insights::GenerateInsightsTool;
pub use log_interaction::LogInteractionTool;
pub use schedule_followup::ScheduleFollowupTool;
pub use search_hcp::SearchHcpTool;

/// Model settings for the tools that call the model themselves.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    /// Model for the log summary
    pub model: String,
    /// Model for insights
    pub insight_model: String,
    pub summarize_on_log: bool,
    pub summary_temperature: f32,
    pub insight_temperature: f32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".into(),
            insight_model: "llama-3.3-70b-versatile".into(),
            summarize_on_log: true,
            summary_temperature: 0.3,
            insight_temperature: 0.5,
        }
    }
}

impl From<&AppConfig> for ToolSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            insight_model: config.insight_model().to_string(),
            summarize_on_log: config.agent.summarize_on_log,
            summary_temperature: config.agent.summary_temperature,
            insight_temperature: config.agent.insight_temperature,
        }
    }
}

/// Create a registry holding all five CRM tools over one store and provider.
pub fn default_registry(
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn Provider>,
    settings: ToolSettings,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(LogInteractionTool::new(
        store.clone(),
        provider.clone(),
        settings.clone(),
    )));
    registry.register(Box::new(EditInteractionTool::new(store.clone())));
    registry.register(Box::new(SearchHcpTool::new(store.clone())));
    registry.register(Box::new(GenerateInsightsTool::new(
        store.clone(),
        provider,
        settings,
    )));
    registry.register(Box::new(ScheduleFollowupTool::new(store)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldrep_core::testing::SequentialMockProvider;
    use fieldrep_store::InMemoryStore;

    #[test]
    fn registry_holds_the_five_tools() {
        let registry = default_registry(
            Arc::new(InMemoryStore::new()),
            Arc::new(SequentialMockProvider::new(vec![])),
            ToolSettings::default(),
        );
        assert_eq!(
            registry.names(),
            vec![
                "edit_interaction",
                "generate_insights",
                "log_interaction",
                "schedule_followup",
                "search_hcp",
            ]
        );
    }

    #[test]
    fn every_schema_is_an_object_with_required_fields() {
        let registry = default_registry(
            Arc::new(InMemoryStore::new()),
            Arc::new(SequentialMockProvider::new(vec![])),
            ToolSettings::default(),
        );
        for def in registry.definitions() {
            assert_eq!(def.parameters["type"], "object", "{}", def.name);
            assert!(def.parameters["required"].is_array(), "{}", def.name);
            assert!(!def.description.is_empty());
        }
    }

    #[test]
    fn settings_follow_config() {
        let mut config = AppConfig::default();
        config.agent.insight_model = Some("gemma2-9b-it".into());
        config.agent.summarize_on_log = false;
        let settings = ToolSettings::from(&config);
        assert_eq!(settings.model, config.model);
        assert_eq!(settings.insight_model, "gemma2-9b-it");
        assert!(!settings.summarize_on_log);
    }
}
