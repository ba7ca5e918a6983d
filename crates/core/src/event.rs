//! Domain events published while a chat request is dispatched.
//!
//! The dispatch loop publishes onto an [`EventBus`]; the CLI chat command
//! subscribes in verbose mode to show each model turn and tool call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The model produced an assistant turn
    ResponseGenerated {
        conversation_id: String,
        model: String,
        tokens_used: u32,
        requested_tools: usize,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        conversation_id: String,
        tool_name: String,
        status: String,
        record_id: Option<i64>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Extra tool calls in one assistant turn were not honored
    ToolCallsDropped {
        conversation_id: String,
        dropped: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// The dispatch loop reached a terminal state
    DispatchFinished {
        conversation_id: String,
        status: String,
        turns: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
