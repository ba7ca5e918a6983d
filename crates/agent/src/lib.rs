//! The dispatch loop: the heart of FieldRep's chat endpoint.
//!
//! One chat request runs as a small state machine:
//!
//! 1. **AwaitModel**: send the conversation and tool schemas to the model
//! 2. **HaveResponse**: plain text ends the request; a tool request moves on
//! 3. **InvokeTool**: run exactly one tool, append its observation, go to 1
//! 4. **Done**: terminal, with a reply and a [`DispatchStatus`]
//!
//! The loop is bounded by a turn cap and never panics on model failures;
//! those end the request with a fixed "unavailable" reply instead.

pub mod dispatch;
pub mod prompt;

pub use dispatch::{
    DispatchLoop, DispatchOutcome, DispatchState, DispatchStatus, ToolInvocation,
    TURN_LIMIT_REPLY, UNAVAILABLE_REPLY,
};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, render_system_prompt};
