//! puzzle-forge: batch tooling for a remote puzzle catalog.
//!
//! This library sources transformation concepts, drives the catalog's
//! job → puzzle creation protocol at a bounded rate, imports local ARC
//! datasets and normalizes legacy catalog tags.

pub mod catalog;
pub mod cli;
pub mod concepts;
pub mod dataset;
pub mod error;
pub mod keys;
pub mod llm;
pub mod maintenance;
pub mod pipeline;
pub mod utils;

// Re-export commonly used error types
pub use error::{BatchError, ConceptError, DatasetError, GatewayError, LlmError};
