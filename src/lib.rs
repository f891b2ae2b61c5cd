// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Stackplan
//!
//! A deployment planner that turns a declarative descriptor of cloud
//! resources into a dependency-ordered provisioning plan.
//!
//! ## Overview
//!
//! Stackplan reads a JSON or YAML descriptor declaring Lambda functions,
//! tables, a network and a Kubernetes cluster, and produces:
//!
//! - One backend-agnostic intent per resource, grant, node group and manifest
//! - Explicit dependency edges between those intents
//! - A deterministic, topologically ordered plan a backend can execute
//!
//! ## Architecture
//!
//! Planning is a two-phase protocol:
//!
//! 1. **Settings**: Explicit [`config::PlannerSettings`], never ambient globals
//! 2. **Plan**: [`planner::Planner::plan`] validates, builds and orders intents
//! 3. **Execute**: [`planner::PlanExecutor`] dispatches intents to a
//!    [`backend::ProvisioningBackend`]
//!
//! ## Modules
//!
//! - [`config`]: Descriptor parsing, validation, hashing and settings
//! - [`planner`]: Intent construction, ordering and plan execution
//! - [`backend`]: Provisioning backend trait and the dry-run backend
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```json
//! {
//!   "lambdas": [{ "serviceName": "orders", "language": "node" }],
//!   "tables": [{ "name": "orders-table", "primaryKeyAttribute": "id", "ttlEnabled": true }],
//!   "vpc": { "name": "main-vpc" },
//!   "eks": { "name": "main-cluster" }
//! }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod planner;

// ============================================================================
// Re-exports
// ============================================================================

pub use backend::{DryRunBackend, ProvisioningBackend, ResourceHandle};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{DeploymentDescriptor, DescriptorLoader, DescriptorValidator, PlannerSettings};
pub use error::{Result, StackPlanError};
pub use planner::{DeploymentPlan, ExecutionResult, PlanExecutor, Planner, ResourceIntent};
