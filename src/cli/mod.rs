//! Command-line interface for puzzle-forge.
//!
//! Provides commands for batch puzzle generation, dataset import, tag
//! maintenance, job inspection and admin key generation.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
