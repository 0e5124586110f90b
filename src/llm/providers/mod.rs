//! Hosted LLM provider implementations.

pub mod openrouter;

pub use openrouter::{OpenRouterProvider, DEFAULT_CONCEPT_MODEL};
