//! The dispatch loop implementation.

use crate::prompt::{DEFAULT_SYSTEM_PROMPT, render_system_prompt};
use chrono::Utc;
use fieldrep_config::AppConfig;
use fieldrep_core::error::{Error, ToolError};
use fieldrep_core::event::{DomainEvent, EventBus};
use fieldrep_core::message::{Conversation, Message};
use fieldrep_core::provider::{Provider, ProviderRequest};
use fieldrep_core::tool::{ToolCall, ToolRegistry, ToolStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub const TURN_LIMIT_REPLY: &str = "I could not complete this request within the allowed number of steps. Please try rephrasing or breaking it into smaller requests.";

pub const UNAVAILABLE_REPLY: &str =
    "The assistant is unavailable right now. Please try again shortly.";

const DEFAULT_MAX_TURNS: usize = 10;

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// The model answered with plain text.
    Completed,
    /// The turn cap was hit before the model stopped requesting tools.
    TurnLimit,
    /// The model could not be reached or answered with garbage.
    ModelUnavailable,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::TurnLimit => "turn_limit",
            Self::ModelUnavailable => "model_unavailable",
        }
    }
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The loop's states. `Done` is terminal.
#[derive(Debug)]
pub enum DispatchState {
    AwaitModel,
    HaveResponse(Message),
    InvokeTool(ToolCall),
    Done(DispatchStatus),
}

/// One tool execution performed during a dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool: String,
    pub status: ToolStatus,
    pub record_id: Option<i64>,
    pub output: String,
}

/// The result of dispatching one chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub reply: String,
    pub status: DispatchStatus,
    /// Model invocations made
    pub turns: usize,
    pub invocations: Vec<ToolInvocation>,
}

impl DispatchOutcome {
    /// Whether a new interaction was stored during this request.
    pub fn interaction_logged(&self) -> bool {
        self.invocations
            .iter()
            .any(|i| i.tool == "log_interaction" && i.status == ToolStatus::Success)
    }
}

/// Drives one conversation through model turns and tool calls.
pub struct DispatchLoop {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_turns: usize,
    system_prompt: String,
    tools: Arc<ToolRegistry>,
    event_bus: Arc<EventBus>,
}

impl DispatchLoop {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            max_turns: DEFAULT_MAX_TURNS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            tools,
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// Build a loop with the chat model settings from config.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: &AppConfig,
    ) -> Self {
        let loop_ = Self::new(provider, config.model.clone(), tools)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_max_turns(config.agent.max_turns);
        match &config.agent.system_prompt_override {
            Some(prompt) => loop_.with_system_prompt(prompt.clone()),
            None => loop_,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Cap on model invocations per request. Values below 1 are raised to 1.
    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max.max(1);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = bus;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Run the conversation to a terminal state.
    ///
    /// Only a record store failure is returned as `Err`; model failures and
    /// tool-level problems end up in the outcome.
    pub async fn run(&self, conversation: &mut Conversation) -> Result<DispatchOutcome, Error> {
        let conversation_id = conversation.id.to_string();
        info!(
            conversation_id = %conversation_id,
            messages = conversation.messages.len(),
            "Dispatching conversation"
        );

        let prompt = render_system_prompt(&self.system_prompt, Utc::now().date_naive());
        conversation.ensure_system_prompt(&prompt);

        let definitions = self.tools.definitions();
        let mut turns = 0;
        let mut invocations = Vec::new();
        let mut state = DispatchState::AwaitModel;

        let status = loop {
            state = match state {
                DispatchState::AwaitModel => {
                    if turns >= self.max_turns {
                        warn!(conversation_id = %conversation_id, turns, "Turn limit reached");
                        conversation.push(Message::assistant(TURN_LIMIT_REPLY));
                        DispatchState::Done(DispatchStatus::TurnLimit)
                    } else {
                        turns += 1;
                        debug!(conversation_id = %conversation_id, turn = turns, "Awaiting model");
                        let request = ProviderRequest {
                            model: self.model.clone(),
                            messages: conversation.messages.clone(),
                            temperature: self.temperature,
                            max_tokens: self.max_tokens,
                            tools: definitions.clone(),
                        };
                        match self.provider.complete(request).await {
                            Ok(response) => {
                                self.event_bus.publish(DomainEvent::ResponseGenerated {
                                    conversation_id: conversation_id.clone(),
                                    model: response.model.clone(),
                                    tokens_used: response.usage.as_ref().map_or(0, |u| u.total_tokens),
                                    requested_tools: response.message.tool_calls.len(),
                                    timestamp: Utc::now(),
                                });
                                DispatchState::HaveResponse(response.message)
                            }
                            Err(e) => {
                                warn!(
                                    conversation_id = %conversation_id,
                                    provider = self.provider.name(),
                                    error = %e,
                                    "Model unavailable"
                                );
                                conversation.push(Message::assistant(UNAVAILABLE_REPLY));
                                DispatchState::Done(DispatchStatus::ModelUnavailable)
                            }
                        }
                    }
                }
                DispatchState::HaveResponse(mut message) => {
                    let call = self.select_call(&conversation_id, &mut message);
                    conversation.push(message);
                    match call {
                        Some(call) => DispatchState::InvokeTool(call),
                        None => DispatchState::Done(DispatchStatus::Completed),
                    }
                }
                DispatchState::InvokeTool(call) => {
                    let invocation = self.invoke(&conversation_id, &call).await?;
                    conversation.push(Message::tool_result(&call.id, &invocation.output));
                    invocations.push(invocation);
                    DispatchState::AwaitModel
                }
                DispatchState::Done(status) => break status,
            };
        };

        let reply = conversation
            .last_assistant()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        self.event_bus.publish(DomainEvent::DispatchFinished {
            conversation_id: conversation_id.clone(),
            status: status.as_str().to_string(),
            turns,
            timestamp: Utc::now(),
        });
        info!(
            conversation_id = %conversation_id,
            status = %status,
            turns,
            tool_calls = invocations.len(),
            "Dispatch finished"
        );

        Ok(DispatchOutcome {
            reply,
            status,
            turns,
            invocations,
        })
    }

    /// Pick the first requested call naming a registered tool and drop the
    /// rest. The message keeps only the honored call so every call id gets
    /// exactly one observation.
    fn select_call(&self, conversation_id: &str, message: &mut Message) -> Option<ToolCall> {
        if !message.requests_tools() {
            return None;
        }

        let mut requested = std::mem::take(&mut message.tool_calls);
        let honored = requested
            .iter()
            .position(|c| self.tools.contains(&c.name))
            .map(|index| requested.remove(index));

        if !requested.is_empty() {
            let dropped: Vec<String> = requested.into_iter().map(|c| c.name).collect();
            warn!(
                conversation_id = %conversation_id,
                dropped = ?dropped,
                "Ignoring tool calls beyond the first registered one"
            );
            self.event_bus.publish(DomainEvent::ToolCallsDropped {
                conversation_id: conversation_id.to_string(),
                dropped,
                timestamp: Utc::now(),
            });
        }

        let honored = honored?;
        let arguments = if honored.arguments.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&honored.arguments).unwrap_or_else(|e| {
                warn!(tool = %honored.name, error = %e, "Tool arguments are not valid JSON");
                serde_json::Value::Null
            })
        };
        let call = ToolCall {
            id: honored.id.clone(),
            name: honored.name.clone(),
            arguments,
        };
        message.tool_calls.push(honored);
        Some(call)
    }

    async fn invoke(&self, conversation_id: &str, call: &ToolCall) -> Result<ToolInvocation, Error> {
        let start = Instant::now();
        let result = self.tools.execute(call).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let invocation = match result {
            Ok(result) => ToolInvocation {
                tool: call.name.clone(),
                status: result.status,
                record_id: result.record_id,
                output: result.render().to_string(),
            },
            Err(ToolError::Store(e)) => {
                error!(conversation_id = %conversation_id, tool = %call.name, error = %e, "Record store failed");
                return Err(Error::Store(e));
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call rejected");
                let status = match e {
                    ToolError::NotFound(_) => ToolStatus::NotFound,
                    _ => ToolStatus::Invalid,
                };
                ToolInvocation {
                    tool: call.name.clone(),
                    status,
                    record_id: None,
                    output: format!("Error: {e}"),
                }
            }
        };

        debug!(tool = %call.name, status = %invocation.status, duration_ms, "Tool executed");
        self.event_bus.publish(DomainEvent::ToolExecuted {
            conversation_id: conversation_id.to_string(),
            tool_name: call.name.clone(),
            status: invocation.status.as_str().to_string(),
            record_id: invocation.record_id,
            duration_ms,
            timestamp: Utc::now(),
        });
        Ok(invocation)
    }
}
