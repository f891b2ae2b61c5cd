//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::planner::{DeploymentPlan, ExecutionResult, IntentKind, IntentOutcome};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan intent row for table display.
#[derive(Tabled)]
struct PlanIntentRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Intent")]
    id: String,
    #[tabled(rename = "Depends on")]
    depends_on: String,
}

/// Execution result row for table display.
#[derive(Tabled)]
struct ExecutionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Intent")]
    id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a deployment plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &DeploymentPlan, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                if detailed {
                    serde_json::to_string_pretty(plan).unwrap_or_default()
                } else {
                    serde_json::to_string_pretty(&PlanJson::from(plan)).unwrap_or_default()
                }
            }
            OutputFormat::Text => Self::format_plan_text(plan, detailed),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &DeploymentPlan, detailed: bool) -> String {
        if plan.is_empty() {
            return format!("{} Nothing to provision.\n", "✓".green());
        }

        let mut output = String::new();

        let _ = writeln!(output, "\n📋 Deployment Plan");
        let _ = writeln!(
            output,
            "   Descriptor hash: {}",
            Self::truncate(&plan.descriptor_hash, 12)
        );
        if let Some(region) = &plan.region {
            let _ = writeln!(output, "   Region: {region}");
        }
        output.push('\n');

        let rows: Vec<PlanIntentRow> = plan
            .intents
            .iter()
            .enumerate()
            .map(|(i, intent)| PlanIntentRow {
                index: i + 1,
                kind: Self::format_kind(intent.kind),
                id: intent.id.clone(),
                depends_on: Self::truncate(
                    &intent
                        .depends_on
                        .iter()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(", "),
                    60,
                ),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let summary: Vec<String> = plan
            .counts_by_kind()
            .iter()
            .map(|(kind, count)| format!("{count} {kind}"))
            .collect();
        let _ = writeln!(
            output,
            "\nPlan: {} intents to create ({})",
            plan.intent_count().to_string().green(),
            summary.join(", ")
        );

        if detailed {
            let _ = writeln!(output, "\nExecution waves:");
            for (depth, wave) in plan.waves().iter().enumerate() {
                let _ = writeln!(output, "   Wave {depth}:");
                for intent in wave {
                    let _ = writeln!(output, "     - {}", intent.description());
                }
            }
        }

        output
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = ValidationJson {
                    valid: result.is_valid(),
                    errors: result
                        .errors
                        .iter()
                        .map(|e| IssueJson {
                            field: e.field.clone(),
                            message: e.message.clone(),
                        })
                        .collect(),
                    warnings: result.warnings.clone(),
                };
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Descriptor is valid!\n", "✓".green())
                } else {
                    let mut output = format!(
                        "{} Descriptor has {} error(s):\n",
                        "✗".red(),
                        result.error_count()
                    );
                    for issue in &result.errors {
                        let _ = writeln!(output, "   - {issue}");
                    }
                    output
                };

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                } else if result.warning_count() > 0 {
                    let _ = writeln!(
                        output,
                        "   ({} warning(s), use --warnings to show)",
                        result.warning_count()
                    );
                }

                output
            }
        }
    }

    /// Formats a plan execution result.
    #[must_use]
    pub fn format_execution(&self, result: &ExecutionResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => {
                let status = if result.success {
                    format!("{} Apply successful", "✓".green())
                } else {
                    format!("{} Apply failed", "✗".red())
                };

                let mut output = format!("{status} (run {}, {} backend)\n\n", result.run_id, result.backend);

                let rows: Vec<ExecutionRow> = result
                    .results
                    .iter()
                    .map(|r| {
                        let (status, detail) = match &r.outcome {
                            IntentOutcome::Applied { handle } => (
                                "applied".green().to_string(),
                                handle.as_ref().map(ToString::to_string).unwrap_or_default(),
                            ),
                            IntentOutcome::Failed { error } => {
                                ("failed".red().to_string(), Self::truncate(error, 60))
                            }
                            IntentOutcome::Skipped { dependency } => (
                                "skipped".yellow().to_string(),
                                format!("after failed {dependency}"),
                            ),
                        };
                        ExecutionRow {
                            index: r.index + 1,
                            id: r.intent_id.clone(),
                            status,
                            detail,
                        }
                    })
                    .collect();

                if !rows.is_empty() {
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                let _ = writeln!(output, "\n{result}");
                output
            }
        }
    }

    /// Formats an intent kind with color.
    fn format_kind(kind: IntentKind) -> String {
        let label = kind.to_string();
        match kind {
            IntentKind::Lambda | IntentKind::Table => label.green().to_string(),
            IntentKind::GrantAccess => label.yellow().to_string(),
            IntentKind::Network | IntentKind::Cluster | IntentKind::NodeGroup => {
                label.cyan().to_string()
            }
            IntentKind::K8sManifest => label.dimmed().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }

    /// Formats a success message.
    #[must_use]
    pub fn success(&self, message: &str) -> String {
        self.message("success", &"✓".green().to_string(), message)
    }

    /// Formats an error message.
    #[must_use]
    pub fn error(&self, message: &str) -> String {
        self.message("error", &"✗".red().to_string(), message)
    }

    /// Formats a warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        self.message("warning", &"⚠".yellow().to_string(), message)
    }

    /// Formats a status message in the configured format.
    fn message(&self, status: &str, symbol: &str, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": status, "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{symbol} {message}"),
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlanJson {
    descriptor_hash: String,
    region: Option<String>,
    intent_count: usize,
    intents: Vec<IntentJson>,
}

#[derive(Serialize)]
struct IntentJson {
    id: String,
    kind: String,
    description: String,
    depends_on: Vec<String>,
}

impl From<&DeploymentPlan> for PlanJson {
    fn from(plan: &DeploymentPlan) -> Self {
        Self {
            descriptor_hash: plan.descriptor_hash.clone(),
            region: plan.region.clone(),
            intent_count: plan.intent_count(),
            intents: plan
                .intents
                .iter()
                .map(|i| IntentJson {
                    id: i.id.clone(),
                    kind: i.kind.to_string(),
                    description: i.description(),
                    depends_on: i.depends_on.iter().cloned().collect(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ValidationJson {
    valid: bool,
    errors: Vec<IssueJson>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct IssueJson {
    field: String,
    message: String,
}
