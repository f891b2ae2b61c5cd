//! The deployment planner.
//!
//! Planning is a two-phase protocol: construct a [`Planner`] with explicit
//! settings, then call [`Planner::plan`]. Nothing derived from a descriptor
//! exists until `plan` has returned, and it returns either a complete plan
//! or an error.

use std::path::Path;
use tracing::{info, warn};

use crate::config::{
    DeploymentDescriptor, DescriptorHasher, DescriptorLoader, DescriptorValidator, PlannerSettings,
};
use crate::error::Result;

use super::assembler::DependencyAssembler;
use super::builder::IntentBuilder;
use super::plan::DeploymentPlan;

/// Deployment planner: validate, build, order.
#[derive(Debug)]
pub struct Planner {
    /// Settings for every run of this planner.
    settings: PlannerSettings,
    /// Descriptor validator.
    validator: DescriptorValidator,
    /// Descriptor hasher.
    hasher: DescriptorHasher,
    /// Intent sorter.
    assembler: DependencyAssembler,
}

impl Planner {
    /// Creates a planner.
    ///
    /// A missing masters principal is accepted here. It is only required
    /// once a descriptor that declares a cluster is planned, so planners
    /// for cluster-free descriptors need no principal at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are malformed.
    pub fn new(settings: PlannerSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            validator: DescriptorValidator::new(),
            hasher: DescriptorHasher::new(),
            assembler: DependencyAssembler::new(),
        })
    }

    /// Returns the planner settings.
    #[must_use]
    pub const fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    /// Plans a descriptor.
    ///
    /// # Errors
    ///
    /// Returns a validation error for invalid descriptors, a configuration
    /// error when a cluster is planned without a masters principal, and a
    /// planning error if the intent graph cannot be ordered.
    pub fn plan(&self, descriptor: &DeploymentDescriptor) -> Result<DeploymentPlan> {
        let validation = self.validator.validate(descriptor)?;
        for warning in &validation.warnings {
            warn!("{warning}");
        }

        let intents = IntentBuilder::new(&self.settings).build(descriptor)?;
        let ordered = self.assembler.order(intents)?;

        let descriptor_hash = self.hasher.hash_descriptor(descriptor);
        info!(
            intents = ordered.len(),
            hash = %self.hasher.short_hash(&descriptor_hash),
            "Planned deployment"
        );

        Ok(DeploymentPlan::new(
            &descriptor_hash,
            self.settings.region.clone(),
            ordered,
        ))
    }

    /// Loads a descriptor file and plans it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be loaded, or any
    /// error [`Planner::plan`] returns.
    pub fn plan_file(&self, path: impl AsRef<Path>) -> Result<DeploymentPlan> {
        let descriptor = DescriptorLoader::new().load(path)?;
        self.plan(&descriptor)
    }
}
