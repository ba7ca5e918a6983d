//! REST endpoints.
//!
//! - `GET    /health`                 - liveness
//! - `GET    /api/hcps`               - list HCPs
//! - `POST   /api/hcps`               - create an HCP
//! - `GET    /api/hcps/{id}`          - one HCP
//! - `GET    /api/interactions`       - list interactions, newest first
//! - `POST   /api/interactions`       - create an interaction
//! - `GET    /api/interactions/{id}`  - one interaction
//! - `PUT    /api/interactions/{id}`  - partial update
//! - `DELETE /api/interactions/{id}`  - delete
//! - `POST   /api/chat`               - one chat request through the dispatch loop
//! - `GET    /api/tools`              - tool definitions
//! - `POST   /api/tools/{name}`       - invoke one tool directly

use crate::SharedState;
use crate::error::ApiError;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use fieldrep_agent::DispatchStatus;
use fieldrep_core::message::{Conversation, Message};
use fieldrep_core::provider::ToolDefinition;
use fieldrep_core::record::{Hcp, Interaction, InteractionPatch, NewHcp, NewInteraction};
use fieldrep_core::tool::ToolStatus;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/hcps", get(list_hcps_handler).post(create_hcp_handler))
        .route("/api/hcps/{id}", get(get_hcp_handler))
        .route(
            "/api/interactions",
            get(list_interactions_handler).post(create_interaction_handler),
        )
        .route(
            "/api/interactions/{id}",
            get(get_interaction_handler)
                .put(update_interaction_handler)
                .delete(delete_interaction_handler),
        )
        .route("/api/chat", post(chat_handler))
        .route("/api/tools", get(list_tools_handler))
        .route("/api/tools/{name}", post(invoke_tool_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Only the two conversational roles may be replayed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolCallSummary {
    pub tool: String,
    pub status: ToolStatus,
    pub record_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub status: DispatchStatus,
    pub interaction_logged: bool,
    pub turns: usize,
    pub tool_calls: Vec<ToolCallSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<ToolDefinition>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolInvocationResponse {
    pub status: ToolStatus,
    pub record_id: Option<i64>,
    pub output: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

async fn list_hcps_handler(State(state): State<SharedState>) -> Result<Json<Vec<Hcp>>, ApiError> {
    Ok(Json(state.store.list_hcps().await?))
}

async fn create_hcp_handler(
    State(state): State<SharedState>,
    Json(payload): Json<NewHcp>,
) -> Result<(StatusCode, Json<Hcp>), ApiError> {
    payload.validate().map_err(ApiError::BadRequest)?;
    let hcp = state.store.create_hcp(payload).await?;
    info!(hcp_id = hcp.id, "HCP created");
    Ok((StatusCode::CREATED, Json(hcp)))
}

async fn get_hcp_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Hcp>, ApiError> {
    state
        .store
        .get_hcp(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("HCP {id} not found")))
}

async fn list_interactions_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<Interaction>>, ApiError> {
    Ok(Json(state.store.list_interactions().await?))
}

async fn create_interaction_handler(
    State(state): State<SharedState>,
    Json(payload): Json<NewInteraction>,
) -> Result<(StatusCode, Json<Interaction>), ApiError> {
    if state.store.get_hcp(payload.hcp_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("HCP {} not found", payload.hcp_id)));
    }
    let interaction = state.store.create_interaction(payload).await?;
    info!(interaction_id = interaction.id, hcp_id = interaction.hcp_id, "Interaction created");
    Ok((StatusCode::CREATED, Json(interaction)))
}

async fn get_interaction_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Interaction>, ApiError> {
    state
        .store
        .get_interaction(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Interaction {id} not found")))
}

async fn update_interaction_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(patch): Json<InteractionPatch>,
) -> Result<Json<Interaction>, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".into()));
    }
    let updated = state
        .store
        .update_interaction(id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Interaction {id} not found")))?;
    info!(interaction_id = id, "Interaction updated");
    Ok(Json(updated))
}

async fn delete_interaction_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.store.delete_interaction(id).await? {
        return Err(ApiError::NotFound(format!("Interaction {id} not found")));
    }
    info!(interaction_id = id, "Interaction deleted");
    Ok(Json(MessageResponse {
        message: format!("Interaction {id} deleted"),
    }))
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".into()));
    }
    info!(history = payload.history.len(), "Chat request");

    let mut history: Vec<Message> = payload
        .history
        .into_iter()
        .map(|turn| match turn.role {
            HistoryRole::User => Message::user(turn.content),
            HistoryRole::Assistant => Message::assistant(turn.content),
        })
        .collect();
    history.push(Message::user(payload.message));
    let mut conversation = Conversation::from_history(history);

    let outcome = state.dispatch.run(&mut conversation).await?;
    if outcome.status != DispatchStatus::Completed {
        warn!(status = %outcome.status, "Chat ended early");
    }

    Ok(Json(ChatResponse {
        interaction_logged: outcome.interaction_logged(),
        tool_calls: outcome
            .invocations
            .into_iter()
            .map(|i| ToolCallSummary {
                tool: i.tool,
                status: i.status,
                record_id: i.record_id,
            })
            .collect(),
        reply: outcome.reply,
        status: outcome.status,
        turns: outcome.turns,
    }))
}

async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolListResponse> {
    let tools = state.tools.definitions();
    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}

async fn invoke_tool_handler(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(arguments): Json<serde_json::Value>,
) -> Result<Json<ToolInvocationResponse>, ApiError> {
    let tool = state
        .tools
        .get(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Tool '{name}' not found")))?;

    let result = tool.execute(arguments).await?;
    info!(tool = %name, status = %result.status, "Direct tool invocation");
    Ok(Json(ToolInvocationResponse {
        status: result.status,
        record_id: result.record_id,
        output: result.output,
    }))
}
