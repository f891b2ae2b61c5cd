//! Plan executor for applying deployment plans.
//!
//! This module walks a plan in order and dispatches each intent to a
//! provisioning backend, handing it the handles of the resources the intent
//! depends on.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::backend::{ProvisioningBackend, ResourceHandle};
use crate::error::{BackendError, Result, StackPlanError};

use super::intent::{IntentKind, IntentPayload, ResourceIntent};
use super::plan::DeploymentPlan;

/// Executor for deployment plans.
pub struct PlanExecutor<'a> {
    /// Backend receiving the intents.
    backend: &'a dyn ProvisioningBackend,
    /// Whether to continue on errors.
    continue_on_error: bool,
}

/// Outcome of a single intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntentOutcome {
    /// The backend accepted the intent.
    Applied {
        /// Handle of the created resource, if the backend returns one.
        handle: Option<ResourceHandle>,
    },
    /// The backend or the executor failed the intent.
    Failed {
        /// Error message.
        error: String,
    },
    /// Not attempted because a dependency did not apply.
    Skipped {
        /// Dependency that did not apply.
        dependency: String,
    },
}

/// Result of executing a single intent.
#[derive(Debug, Clone, Serialize)]
pub struct IntentResult {
    /// Position in the plan.
    pub index: usize,
    /// Intent id.
    pub intent_id: String,
    /// Intent kind.
    pub kind: IntentKind,
    /// What happened.
    pub outcome: IntentOutcome,
}

impl IntentResult {
    /// Returns true if the intent was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self.outcome, IntentOutcome::Applied { .. })
    }
}

/// Result of executing the entire plan.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Identifier of this run.
    pub run_id: String,
    /// Backend type the plan was executed against.
    pub backend: &'static str,
    /// Individual intent results.
    pub results: Vec<IntentResult>,
    /// Total intents executed.
    pub total_executed: usize,
    /// Number of applied intents.
    pub successful: usize,
    /// Number of failed intents.
    pub failed: usize,
    /// Number of skipped intents (due to dependency failures).
    pub skipped: usize,
    /// Number of intents never reached because execution stopped early.
    pub not_attempted: usize,
    /// Whether the entire plan succeeded.
    pub success: bool,
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} applied, {} failed, {} skipped",
            self.successful, self.failed, self.skipped
        )?;
        if self.not_attempted > 0 {
            write!(f, ", {} not attempted", self.not_attempted)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for PlanExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanExecutor")
            .field("backend", &self.backend.backend_type())
            .field("continue_on_error", &self.continue_on_error)
            .finish()
    }
}

impl<'a> PlanExecutor<'a> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(backend: &'a dyn ProvisioningBackend) -> Self {
        Self {
            backend,
            continue_on_error: false,
        }
    }

    /// Sets whether to continue on errors.
    #[must_use]
    pub const fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Executes a deployment plan.
    ///
    /// Failed intents are reported in the result, not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan is not topologically ordered.
    pub async fn execute(&self, plan: &DeploymentPlan) -> Result<ExecutionResult> {
        let run_id = generate_run_id();
        info!(
            run_id = %run_id,
            backend = self.backend.backend_type(),
            "Executing deployment plan with {} intents",
            plan.intent_count()
        );

        if !plan.is_topologically_ordered() {
            return Err(StackPlanError::internal(
                "Refusing to execute a plan that is not topologically ordered",
            ));
        }

        let mut results = Vec::with_capacity(plan.intent_count());
        let mut handles: HashMap<&str, ResourceHandle> = HashMap::new();
        let mut unapplied: HashSet<&str> = HashSet::new();

        for (idx, intent) in plan.intents.iter().enumerate() {
            let blocked = intent
                .depends_on
                .iter()
                .find(|dep| unapplied.contains(dep.as_str()));

            if let Some(dependency) = blocked {
                warn!("Skipping {} due to failed dependency {}", intent.id, dependency);
                unapplied.insert(intent.id.as_str());
                results.push(IntentResult {
                    index: idx,
                    intent_id: intent.id.clone(),
                    kind: intent.kind,
                    outcome: IntentOutcome::Skipped {
                        dependency: dependency.clone(),
                    },
                });
                continue;
            }

            info!("Executing intent {}: {}", idx, intent.description());

            let outcome = match self.apply(intent, &handles).await {
                Ok(handle) => {
                    if let Some(handle) = &handle {
                        handles.insert(intent.id.as_str(), handle.clone());
                    }
                    IntentOutcome::Applied { handle }
                }
                Err(e) => {
                    error!("Failed to apply {}: {}", intent.id, e);
                    unapplied.insert(intent.id.as_str());
                    IntentOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };

            let failed = matches!(outcome, IntentOutcome::Failed { .. });
            results.push(IntentResult {
                index: idx,
                intent_id: intent.id.clone(),
                kind: intent.kind,
                outcome,
            });

            if failed && !self.continue_on_error {
                break;
            }
        }

        let successful = results.iter().filter(|r| r.is_applied()).count();
        let failed = results
            .iter()
            .filter(|r| matches!(r.outcome, IntentOutcome::Failed { .. }))
            .count();
        let skipped = results
            .iter()
            .filter(|r| matches!(r.outcome, IntentOutcome::Skipped { .. }))
            .count();

        let execution_result = ExecutionResult {
            run_id,
            backend: self.backend.backend_type(),
            total_executed: results.len(),
            successful,
            failed,
            skipped,
            not_attempted: plan.intent_count() - results.len(),
            success: failed == 0 && skipped == 0 && results.len() == plan.intent_count(),
            results,
        };

        info!(run_id = %execution_result.run_id, "Execution finished: {execution_result}");
        Ok(execution_result)
    }

    /// Applies a single intent.
    async fn apply(
        &self,
        intent: &ResourceIntent,
        handles: &HashMap<&str, ResourceHandle>,
    ) -> Result<Option<ResourceHandle>> {
        let handle_of = |dependency: &str| {
            handles.get(dependency).ok_or_else(|| {
                StackPlanError::Backend(BackendError::MissingHandle {
                    intent: intent.id.clone(),
                    dependency: dependency.to_string(),
                })
            })
        };

        match &intent.payload {
            IntentPayload::Lambda(spec) => self.backend.create_lambda(spec).await.map(Some),
            IntentPayload::Table(spec) => self.backend.create_table(spec).await.map(Some),
            IntentPayload::GrantAccess(grant) => {
                let table = handle_of(&grant.table)?;
                let lambda = handle_of(&grant.lambda)?;
                self.backend.grant_read_write(table, lambda).await?;
                Ok(None)
            }
            IntentPayload::Network(spec) => self.backend.create_network(spec).await.map(Some),
            IntentPayload::Cluster(spec) => {
                let network = spec.network.as_deref().map(handle_of).transpose()?;
                self.backend.create_cluster(spec, network).await.map(Some)
            }
            IntentPayload::NodeGroup(group) => {
                let cluster = handle_of(&group.cluster)?;
                self.backend.create_node_group(&group.spec, cluster).await?;
                Ok(None)
            }
            IntentPayload::Manifest(manifest) => {
                let cluster = handle_of(&manifest.cluster)?;
                self.backend.apply_manifest(cluster, manifest).await?;
                Ok(None)
            }
        }
    }
}

/// Generates a unique run identifier for the current process.
#[must_use]
pub fn generate_run_id() -> String {
    let hostname = hostname::get().map_or_else(
        |_| String::from("unknown"),
        |h| h.to_string_lossy().to_string(),
    );

    let pid = std::process::id();
    let uuid = &Uuid::new_v4().to_string()[..8];

    format!("{hostname}-{pid}-{uuid}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DryRunBackend;
    use crate::config::{DeploymentDescriptor, PlannerSettings};
    use crate::planner::{Planner, manifests::ids};

    fn plan(json: &str) -> DeploymentPlan {
        let planner = Planner::new(
            PlannerSettings::new().with_masters_principal("arn:aws:iam::123456789012:root"),
        )
        .unwrap();
        let descriptor: DeploymentDescriptor = serde_json::from_str(json).unwrap();
        planner.plan(&descriptor).unwrap()
    }

    const DESCRIPTOR: &str = r#"{
        "lambdas": [{"serviceName": "orders"}],
        "tables": [{"name": "items", "primaryKey": "id", "ttlEnabled": true}],
        "vpc": {"name": "net"},
        "eks": {"name": "main"}
    }"#;

    fn outcome<'r>(result: &'r ExecutionResult, id: &str) -> &'r IntentOutcome {
        &result
            .results
            .iter()
            .find(|r| r.intent_id == id)
            .unwrap()
            .outcome
    }

    #[test]
    fn test_execute_full_plan() {
        let plan = plan(DESCRIPTOR);
        let backend = DryRunBackend::new();

        let result = tokio_test::block_on(PlanExecutor::new(&backend).execute(&plan)).unwrap();

        assert!(result.success);
        assert_eq!(result.successful, plan.intent_count());
        assert_eq!(result.backend, "dry-run");
        assert_eq!(
            outcome(&result, "main"),
            &IntentOutcome::Applied {
                handle: Some(ResourceHandle::new("dry-run://cluster/main"))
            }
        );

        let calls = tokio_test::block_on(backend.calls());
        assert_eq!(calls.len(), plan.intent_count());
        assert!(calls.iter().any(|c| {
            c.operation == "grant_read_write"
                && c.target == "dry-run://table/items -> dry-run://lambda/orders"
        }));
    }

    #[test]
    fn test_stops_at_first_failure() {
        let plan = plan(DESCRIPTOR);
        let backend = DryRunBackend::new().with_rejection("items");

        let result = tokio_test::block_on(PlanExecutor::new(&backend).execute(&plan)).unwrap();

        assert!(!result.success);
        assert_eq!(result.failed, 1);
        assert_eq!(result.successful, 1);
        assert_eq!(result.total_executed, 2);
        assert_eq!(result.not_attempted, plan.intent_count() - 2);
    }

    #[test]
    fn test_continue_on_error_skips_dependents() {
        let plan = plan(DESCRIPTOR);
        let backend = DryRunBackend::new().with_rejection("main");

        let result = tokio_test::block_on(
            PlanExecutor::new(&backend)
                .with_continue_on_error(true)
                .execute(&plan),
        )
        .unwrap();

        assert!(!result.success);
        assert_eq!(result.failed, 1);
        assert_eq!(result.skipped, 15);
        assert_eq!(result.not_attempted, 0);
        assert!(matches!(
            outcome(&result, "main-custom-node-group"),
            IntentOutcome::Skipped { dependency } if dependency == "main"
        ));
        assert!(matches!(
            outcome(&result, ids::DASHBOARD_SERVICE),
            IntentOutcome::Skipped { .. }
        ));
        assert!(matches!(
            outcome(&result, "items-grant-orders-lambda"),
            IntentOutcome::Applied { handle: None }
        ));
    }

    #[test]
    fn test_empty_plan_succeeds() {
        let plan = plan("{}");
        let backend = DryRunBackend::new();
        let result = tokio_test::block_on(PlanExecutor::new(&backend).execute(&plan)).unwrap();

        assert!(result.success);
        assert_eq!(result.total_executed, 0);
        assert_eq!(result.to_string(), "0 applied, 0 failed, 0 skipped");
    }

    #[test]
    fn test_unordered_plan_rejected() {
        let mut plan = plan(DESCRIPTOR);
        plan.intents.reverse();
        let backend = DryRunBackend::new();

        let result = tokio_test::block_on(PlanExecutor::new(&backend).execute(&plan));
        assert!(result.is_err());
        assert!(tokio_test::block_on(backend.calls()).is_empty());
    }

    #[test]
    fn test_run_id_generation() {
        let id1 = generate_run_id();
        let id2 = generate_run_id();

        assert_ne!(id1, id2);
        assert!(id1.contains(&std::process::id().to_string()));
    }
}
