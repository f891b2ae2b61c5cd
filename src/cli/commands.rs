//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stackplan - Dependency-ordered provisioning plans from a deployment descriptor.
#[derive(Parser, Debug)]
#[command(name = "stackplan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the deployment descriptor.
    #[arg(short, long, global = true, env = "STACKPLAN_DESCRIPTOR")]
    pub descriptor: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter descriptor and .env example.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the deployment descriptor.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Generate and display the deployment plan.
    Plan {
        /// Show execution waves and intent payloads.
        #[arg(long)]
        detailed: bool,
    },

    /// Execute the deployment plan against the dry-run backend.
    Apply {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Continue on errors.
        #[arg(long)]
        continue_on_error: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_with_globals() {
        let cli = Cli::try_parse_from([
            "stackplan",
            "plan",
            "--detailed",
            "-d",
            "stack.json",
            "--output",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.descriptor, Some(PathBuf::from("stack.json")));
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Plan { detailed: true }));
    }

    #[test]
    fn test_descriptor_short_flag_on_plan() {
        let cli = Cli::try_parse_from(["stackplan", "plan", "--detailed", "-d", "file"]).unwrap();
        assert_eq!(cli.descriptor, Some(PathBuf::from("file")));
        assert!(matches!(cli.command, Commands::Plan { detailed: true }));

        let cli = Cli::try_parse_from(["stackplan", "-d", "file", "plan"]).unwrap();
        assert_eq!(cli.descriptor, Some(PathBuf::from("file")));
        assert!(matches!(cli.command, Commands::Plan { detailed: false }));
    }

    #[test]
    fn test_every_subcommand_builds() {
        use clap::CommandFactory;
        let command = Cli::command();
        for name in ["init", "validate", "plan", "apply"] {
            let mut sub = command.find_subcommand(name).unwrap().clone();
            sub.build();
        }
    }

    #[test]
    fn test_parse_apply_flags() {
        let cli = Cli::try_parse_from(["stackplan", "-v", "apply", "-y", "--continue-on-error"])
            .unwrap();

        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Apply {
                yes: true,
                continue_on_error: true
            }
        ));
    }

    #[test]
    fn test_init_defaults_to_current_dir() {
        let cli = Cli::try_parse_from(["stackplan", "init"]).unwrap();
        match cli.command {
            Commands::Init { path, force } => {
                assert_eq!(path, PathBuf::from("."));
                assert!(!force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_command_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
