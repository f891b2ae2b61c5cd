//! Planner settings.
//!
//! Values the planner needs that do not belong in a descriptor: who may
//! administer created clusters, which region the plan targets, and where
//! Lambda code lives when a descriptor does not say. Settings are built
//! once and passed to the planner explicitly.

use crate::error::{ConfigError, Result, StackPlanError};
use std::path::PathBuf;
use tracing::debug;

/// Environment variable holding the cluster masters principal ARN.
pub const MASTERS_PRINCIPAL_ENV: &str = "STACKPLAN_MASTERS_PRINCIPAL_ARN";

/// Environment variable holding the target region.
pub const REGION_ENV: &str = "STACKPLAN_REGION";

/// Environment variable overriding the default code directory.
pub const CODE_DIR_ENV: &str = "STACKPLAN_CODE_DIR";

/// Fallback region variable used by AWS tooling.
const AWS_REGION_ENV: &str = "AWS_REGION";

/// Code directory used when a Lambda has no code location.
const DEFAULT_CODE_DIR: &str = "lambdas";

/// Explicit settings for a planning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerSettings {
    /// Principal allowed to assume the cluster masters role.
    pub masters_principal_arn: Option<String>,
    /// Target region.
    pub region: Option<String>,
    /// Code directory used when a Lambda has no code location.
    pub default_code_dir: PathBuf,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            masters_principal_arn: None,
            region: None,
            default_code_dir: PathBuf::from(DEFAULT_CODE_DIR),
        }
    }
}

impl PlannerSettings {
    /// Creates settings with no principal, no region and the default code directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the masters principal ARN.
    #[must_use]
    pub fn with_masters_principal(mut self, arn: impl Into<String>) -> Self {
        self.masters_principal_arn = Some(arn.into());
        self
    }

    /// Sets the target region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the default code directory.
    #[must_use]
    pub fn with_default_code_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_code_dir = dir.into();
        self
    }

    /// Builds settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but malformed.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::new();

        if let Ok(arn) = std::env::var(MASTERS_PRINCIPAL_ENV) {
            debug!("Using masters principal from {MASTERS_PRINCIPAL_ENV}");
            settings.masters_principal_arn = Some(arn);
        }

        settings.region = std::env::var(REGION_ENV)
            .or_else(|_| std::env::var(AWS_REGION_ENV))
            .ok();

        if let Ok(dir) = std::env::var(CODE_DIR_ENV) {
            debug!("Using default code directory from {CODE_DIR_ENV}");
            settings.default_code_dir = PathBuf::from(dir);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Checks that present values are well formed.
    ///
    /// # Errors
    ///
    /// Returns an error for an ARN that is not an ARN or an empty region.
    pub fn validate(&self) -> Result<()> {
        if let Some(arn) = &self.masters_principal_arn
            && !is_arn(arn)
        {
            return Err(StackPlanError::Config(ConfigError::InvalidSetting {
                name: String::from(MASTERS_PRINCIPAL_ENV),
                reason: format!("'{arn}' is not an ARN"),
            }));
        }

        if self.region.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(StackPlanError::Config(ConfigError::InvalidSetting {
                name: String::from(REGION_ENV),
                reason: String::from("region cannot be empty"),
            }));
        }

        Ok(())
    }

    /// Returns the masters principal, required whenever a cluster is planned.
    ///
    /// # Errors
    ///
    /// Returns an error if no principal was configured.
    pub fn require_masters_principal(&self) -> Result<&str> {
        self.masters_principal_arn.as_deref().ok_or_else(|| {
            StackPlanError::Config(ConfigError::MissingSetting {
                name: String::from(MASTERS_PRINCIPAL_ENV),
            })
        })
    }
}

/// Checks the `arn:partition:service:region:account:resource` shape.
fn is_arn(value: &str) -> bool {
    let parts: Vec<&str> = value.splitn(6, ':').collect();
    parts.len() == 6 && parts[0] == "arn" && !parts[1].is_empty() && !parts[5].is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_arn() {
        assert!(is_arn("arn:aws:iam::123456789012:user/deployer"));
        assert!(!is_arn("deployer"));
        assert!(!is_arn("arn:aws:iam::123456789012:"));
    }

    #[test]
    fn test_validate_rejects_bad_arn() {
        let settings = PlannerSettings::new().with_masters_principal("not-an-arn");
        assert!(matches!(
            settings.validate(),
            Err(StackPlanError::Config(ConfigError::InvalidSetting { .. }))
        ));
    }

    #[test]
    fn test_require_masters_principal() {
        let settings = PlannerSettings::new();
        assert!(matches!(
            settings.require_masters_principal(),
            Err(StackPlanError::Config(ConfigError::MissingSetting { .. }))
        ));

        let settings = settings.with_masters_principal("arn:aws:iam::1:role/admin");
        assert_eq!(
            settings.require_masters_principal().unwrap(),
            "arn:aws:iam::1:role/admin"
        );
    }

    #[test]
    fn test_default_code_dir() {
        assert_eq!(PlannerSettings::new().default_code_dir, PathBuf::from("lambdas"));
    }
}
