//! CLI module for the stackplan tool.
//!
//! This module provides the command-line interface for validating,
//! planning and applying deployment descriptors.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
