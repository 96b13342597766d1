//! Collaborator seams of the summarization core.
//!
//! The core never talks to a browser, an LLM endpoint or a storage medium
//! directly; applications implement these traits (or use the ones in
//! [`crate::providers`] and [`crate::stores`]).

pub mod clock;
pub mod context;
pub mod generator;
pub mod source;
pub mod store;
