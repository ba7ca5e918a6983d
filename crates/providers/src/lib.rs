//! LLM Provider implementations for FieldRep.
//!
//! All providers implement the `fieldrep_core::Provider` trait.
//! [`build_from_config`] assembles the configured client behind the
//! bounded-retry layer.

pub mod openai_compat;
pub mod retry;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryProvider;
pub use router::{build_from_config, default_base_url};
