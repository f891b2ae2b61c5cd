//! Deployment planning module.
//!
//! This module turns a validated descriptor into an ordered set of resource
//! intents and drives those intents through a provisioning backend.

mod assembler;
mod builder;
mod engine;
mod executor;
mod intent;
pub mod manifests;
mod plan;

pub use assembler::DependencyAssembler;
pub use builder::IntentBuilder;
pub use engine::Planner;
pub use executor::{ExecutionResult, IntentOutcome, IntentResult, PlanExecutor, generate_run_id};
pub use intent::{
    AccessLevel, ClusterPayload, CodeSource, GrantPayload, IntentKind, IntentPayload,
    LambdaPayload, ManifestPayload, NodeGroupPayload, RemovalPolicy, ResourceIntent,
    TablePayload,
};
pub use manifests::addon_bundle;
pub use plan::DeploymentPlan;
