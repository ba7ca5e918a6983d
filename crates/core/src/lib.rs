//! # FieldRep Core
//!
//! Domain types, traits, and error definitions for the FieldRep CRM agent.
//! This crate has **no framework dependencies**: it defines the domain model
//! (HCPs, interactions, conversations, tools, the model boundary) that all
//! other crates implement against.
//!
//! Every collaborator of the dispatch loop is a trait here:
//! - [`Provider`]: the hosted language model
//! - [`Tool`]: a side-effecting operation the model may request
//! - [`RecordStore`]: the CRUD store holding HCPs and interactions

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod record;
pub mod store;
pub mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use record::{
    EditableField, Hcp, Interaction, InteractionKind, InteractionPatch, NewHcp, NewInteraction,
    Sentiment,
};
pub use store::RecordStore;
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolStatus};
