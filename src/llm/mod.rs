//! LLM integration for puzzle-forge.
//!
//! The generative concept source needs exactly one capability from an LLM:
//! turn a prompt into text. That capability is the [`LlmProvider`] trait.
//! Two HTTP implementations are provided:
//!
//! - [`OpenRouterProvider`]: hosted OpenRouter endpoint with retry on transient errors
//! - [`LiteLlmClient`]: any LiteLLM / OpenAI-compatible endpoint configured from the environment
//!
//! ```ignore
//! use puzzle_forge::llm::{GenerationRequest, LlmProvider, Message, OpenRouterProvider};
//!
//! let provider = OpenRouterProvider::new(std::env::var("OPENROUTER_API_KEY")?);
//! let request = GenerationRequest::new("", vec![Message::user("List three colors")]);
//! let response = provider.generate(request).await?;
//! println!("{}", response.first_content().unwrap_or_default());
//! ```

pub mod litellm;
pub mod providers;

pub use litellm::{
    Choice, GenerationRequest, GenerationResponse, LiteLlmClient, LlmProvider, Message, Usage,
};
pub use providers::{OpenRouterProvider, DEFAULT_CONCEPT_MODEL};
