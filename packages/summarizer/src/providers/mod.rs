//! HTTP implementations of the collaborator traits.

pub mod context;
pub mod openai;

pub use context::{ContextChain, DuckDuckGoContext, WikipediaContext};
pub use openai::OpenAiGenerator;
