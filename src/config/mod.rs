//! Configuration module for the stackplan planner.
//!
//! This module handles everything that feeds a planning run:
//! - Parsing deployment descriptors from JSON or YAML
//! - Validation of descriptor values
//! - Computing descriptor hashes for plan fingerprints
//! - Explicit planner settings sourced from the environment

mod descriptor;
mod parser;
mod validator;
mod hash;
mod settings;

pub use descriptor::{
    CapacityMode, ClusterLogType, ClusterSpec, DeploymentDescriptor, LambdaLanguage, LambdaSpec,
    NetworkSpec, NodeGroupSpec, TableSpec,
};
pub use parser::{DEFAULT_DESCRIPTOR_FILES, DescriptorFormat, DescriptorLoader, find_descriptor_file};
pub use validator::{DescriptorValidator, ValidationIssue, ValidationResult};
pub use hash::DescriptorHasher;
pub use settings::{CODE_DIR_ENV, MASTERS_PRINCIPAL_ENV, PlannerSettings, REGION_ENV};
