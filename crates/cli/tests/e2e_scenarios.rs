//! End-to-end scenarios across the dispatch loop, the tools and both store
//! backends, with the model replaced by a scripted provider.

use fieldrep_agent::{DispatchLoop, DispatchStatus};
use fieldrep_core::message::{Conversation, Message, Role};
use fieldrep_core::provider::Provider;
use fieldrep_core::record::{InteractionKind, NewHcp, NewInteraction};
use fieldrep_core::store::RecordStore;
use fieldrep_core::testing::{
    SequentialMockProvider, make_text_response, make_tool_call, make_tool_call_response,
};
use fieldrep_core::tool::{ToolCall, ToolRegistry, ToolStatus};
use fieldrep_store::{InMemoryStore, SqliteStore};
use fieldrep_tools::ToolSettings;
use serde_json::json;
use std::sync::Arc;

/// Two HCPs and three interactions, none of them flagged for follow-up.
async fn fixture_stores() -> Vec<Arc<dyn RecordStore>> {
    let stores: Vec<Arc<dyn RecordStore>> = vec![
        Arc::new(InMemoryStore::new()),
        Arc::new(SqliteStore::in_memory().await.unwrap()),
    ];
    for store in &stores {
        let smith = store
            .create_hcp(NewHcp::new("John Smith", "Cardiology", "City General Hospital"))
            .await
            .unwrap();
        let chen = store
            .create_hcp(NewHcp::new("Michael Chen", "Oncology", "Regional Cancer Institute"))
            .await
            .unwrap();
        for (hcp, kind) in [
            (smith.id, InteractionKind::Visit),
            (chen.id, InteractionKind::Email),
            (smith.id, InteractionKind::Call),
        ] {
            store
                .create_interaction(NewInteraction::new(hcp, kind, "fixture"))
                .await
                .unwrap();
        }
    }
    stores
}

fn registry(
    store: &Arc<dyn RecordStore>,
    provider: &Arc<SequentialMockProvider>,
    settings: ToolSettings,
) -> Arc<ToolRegistry> {
    let provider: Arc<dyn Provider> = provider.clone();
    Arc::new(fieldrep_tools::default_registry(store.clone(), provider, settings))
}

fn no_summary() -> ToolSettings {
    ToolSettings {
        summarize_on_log: false,
        ..ToolSettings::default()
    }
}

fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: format!("call_{name}"),
        name: name.into(),
        arguments,
    }
}

#[tokio::test]
async fn log_interaction_by_honorific_name() {
    for store in fixture_stores().await {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let tools = registry(&store, &provider, no_summary());
        let before = store.count_interactions().await.unwrap();

        let result = tools
            .execute(&call(
                "log_interaction",
                json!({
                    "hcp_name": "Dr. Smith",
                    "interaction_type": "visit",
                    "notes": "discussed CardioMax trial",
                    "products": "CardioMax"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(result.status, ToolStatus::Success, "{}", store.name());
        assert!(result.output.contains("logged successfully"));
        let id = result.record_id.unwrap();
        assert!(result.output.contains(&id.to_string()));
        assert_eq!(store.count_interactions().await.unwrap(), before + 1);

        let stored = store.get_interaction(id).await.unwrap().unwrap();
        let smith = store.find_hcp_by_name("John Smith").await.unwrap().unwrap();
        assert_eq!(stored.hcp_id, smith.id);
        assert_eq!(stored.kind, InteractionKind::Visit);
        assert_eq!(stored.products_discussed.as_deref(), Some("CardioMax"));
        assert_eq!(provider.call_count(), 0);
    }
}

#[tokio::test]
async fn edit_of_missing_interaction_leaves_store_unchanged() {
    for store in fixture_stores().await {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let tools = registry(&store, &provider, no_summary());
        let before = store.list_interactions().await.unwrap();

        let result = tools
            .execute(&call(
                "edit_interaction",
                json!({"interaction_id": 7, "field": "outcomes", "new_value": "follow-up scheduled"}),
            ))
            .await
            .unwrap();

        assert_eq!(result.status, ToolStatus::NotFound, "{}", store.name());
        assert!(result.output.contains("not found"));
        assert_eq!(store.list_interactions().await.unwrap(), before);
    }
}

#[tokio::test]
async fn chat_turn_logs_interaction_and_confirms() {
    for store in fixture_stores().await {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(
                vec![make_tool_call(
                    "log_interaction",
                    json!({
                        "hcp_name": "Chen",
                        "interaction_type": "visit",
                        "notes": "Met to review Oncology trial results",
                        "products": "OncoSafe"
                    }),
                )],
                "Logging that visit.",
            ),
            make_text_response("Reviewed oncology trial results with Dr. Chen."),
            make_text_response("Done. I logged your visit with Dr. Michael Chen."),
        ]));
        let tools = registry(&store, &provider, ToolSettings::default());
        let dispatch = DispatchLoop::new(provider.clone(), "mock-model", tools);
        let before = store.count_interactions().await.unwrap();

        let mut conversation = Conversation::new();
        conversation.push(Message::user("I met with Dr. Chen about Oncology trial results"));
        let outcome = dispatch.run(&mut conversation).await.unwrap();

        assert_eq!(outcome.status, DispatchStatus::Completed, "{}", store.name());
        assert_eq!(outcome.reply, "Done. I logged your visit with Dr. Michael Chen.");
        assert_eq!(outcome.turns, 2);
        assert!(outcome.interaction_logged());
        // Two dispatch turns plus the summary request made by the tool.
        assert_eq!(provider.call_count(), 3);

        assert_eq!(store.count_interactions().await.unwrap(), before + 1);
        let chen = store.find_hcp_by_name("Chen").await.unwrap().unwrap();
        let logged = store
            .get_interaction(outcome.invocations[0].record_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(logged.hcp_id, chen.id);
        assert!(logged.notes.contains("AI Summary: Reviewed oncology trial results"));

        let roles: Vec<Role> = conversation.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert!(conversation.messages[3].content.contains("logged successfully"));
    }
}

#[tokio::test]
async fn malformed_followup_date_is_rejected() {
    for store in fixture_stores().await {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let tools = registry(&store, &provider, no_summary());

        let result = tools
            .execute(&call(
                "schedule_followup",
                json!({"interaction_id": 3, "followup_date": "2025-13-40"}),
            ))
            .await
            .unwrap();

        assert_eq!(result.status, ToolStatus::Invalid, "{}", store.name());
        assert!(result.output.contains("Invalid date"));
        let third = store.get_interaction(3).await.unwrap().unwrap();
        assert!(!third.follow_up_required);
        assert!(third.followup_date.is_none());
    }
}

#[tokio::test]
async fn model_outage_ends_chat_with_unavailable_reply() {
    for store in fixture_stores().await {
        let provider = Arc::new(SequentialMockProvider::failing(
            fieldrep_core::error::ProviderError::Network("connection reset".into()),
            1,
        ));
        let tools = registry(&store, &provider, no_summary());
        let dispatch = DispatchLoop::new(provider.clone(), "mock-model", tools);
        let before = store.count_interactions().await.unwrap();

        let mut conversation = Conversation::new();
        conversation.push(Message::user("Log a call with Dr. Smith"));
        let outcome = dispatch.run(&mut conversation).await.unwrap();

        assert_eq!(outcome.status, DispatchStatus::ModelUnavailable, "{}", store.name());
        assert_eq!(outcome.reply, fieldrep_agent::UNAVAILABLE_REPLY);
        assert_eq!(store.count_interactions().await.unwrap(), before);
    }
}
