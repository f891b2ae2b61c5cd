//! Descriptor validation.
//!
//! This module checks a parsed descriptor before any intents are built,
//! so that planning is all-or-nothing.

use crate::error::{ConfigError, Result, StackPlanError};
use crate::planner::manifests::ids;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::descriptor::{ClusterSpec, DeploymentDescriptor, LambdaSpec, NetworkSpec, TableSpec};

/// Smallest memory size a function can be given, in MB.
const MIN_MEMORY_MB: u32 = 128;

/// Largest memory size a function can be given, in MB.
const MAX_MEMORY_MB: u32 = 10_240;

/// Validator for deployment descriptors.
#[derive(Debug, Default)]
pub struct DescriptorValidator;

/// Validation result containing all findings.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationIssue>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationIssue {
    /// The entry that failed validation, with its index and name.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl DescriptorValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a deployment descriptor.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any are found.
    pub fn validate(&self, descriptor: &DeploymentDescriptor) -> Result<ValidationResult> {
        let result = self.check(descriptor);

        if let Some(first_error) = result.errors.first() {
            return Err(StackPlanError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }));
        }

        debug!(warnings = result.warnings.len(), "Descriptor validation passed");
        Ok(result)
    }

    /// Collects every error and warning without failing.
    #[must_use]
    pub fn check(&self, descriptor: &DeploymentDescriptor) -> ValidationResult {
        let mut result = ValidationResult::default();

        if descriptor.is_empty() {
            result
                .warnings
                .push(String::from("Descriptor declares no resources"));
        }

        Self::validate_lambdas(&descriptor.lambdas, &mut result);
        Self::validate_tables(&descriptor.tables, !descriptor.lambdas.is_empty(), &mut result);

        if let Some(network) = &descriptor.vpc {
            Self::validate_network(network, &mut result);
            if descriptor.eks.is_none() {
                result.warnings.push(format!(
                    "vpc: Network '{}' is declared without a cluster",
                    network.name
                ));
            }
        }

        if let Some(cluster) = &descriptor.eks {
            Self::validate_cluster(cluster, &mut result);
        }

        Self::validate_intent_ids(descriptor, &mut result);

        result
    }

    /// Checks that no two kinds of entry derive the same intent id.
    ///
    /// Duplicates within one kind are reported by the per-kind checks.
    fn validate_intent_ids(descriptor: &DeploymentDescriptor, result: &mut ValidationResult) {
        let named = |name: &str| !name.trim().is_empty();
        let lambda_ids: Vec<String> = descriptor
            .lambdas
            .iter()
            .filter(|l| named(l.service_name.as_str()))
            .map(LambdaSpec::intent_id)
            .collect();

        // (intent id, kind, field)
        let mut claims: Vec<(String, &str, String)> = Vec::new();

        for (i, lambda) in descriptor.lambdas.iter().enumerate() {
            if named(lambda.service_name.as_str()) {
                claims.push((lambda.intent_id(), "lambda", format!("lambdas[{i}].serviceName")));
            }
        }

        for (i, table) in descriptor.tables.iter().enumerate() {
            if !named(table.name.as_str()) {
                continue;
            }
            claims.push((table.name.clone(), "table", format!("tables[{i}].name")));
            if table.ttl_enabled {
                for lambda_id in &lambda_ids {
                    claims.push((table.grant_id(lambda_id), "grant", format!("tables[{i}].ttlEnabled")));
                }
            }
        }

        if let Some(network) = descriptor.vpc.as_ref().filter(|n| named(n.name.as_str())) {
            claims.push((network.name.clone(), "network", String::from("vpc.name")));
        }

        if let Some(cluster) = descriptor.eks.as_ref().filter(|c| named(c.name.as_str())) {
            claims.push((cluster.name.clone(), "cluster", String::from("eks.name")));
            claims.push((cluster.node_group_id(), "node group", String::from("eks.nodeGroup.name")));
            for id in ids::ALL {
                claims.push((id.to_string(), "manifest", String::from("eks")));
            }
        }

        let mut owners: HashMap<&str, (&str, &str)> = HashMap::new();
        for (id, kind, field) in &claims {
            match owners.get(id.as_str()) {
                Some((owner_kind, _)) if owner_kind == kind => {}
                Some((owner_kind, owner_field)) => result.errors.push(ValidationIssue {
                    field: field.clone(),
                    message: format!(
                        "Intent id '{id}' of this {kind} is already taken by the {owner_kind} at {owner_field}"
                    ),
                }),
                None => {
                    owners.insert(id.as_str(), (*kind, field.as_str()));
                }
            }
        }
    }

    /// Validates Lambda functions.
    fn validate_lambdas(lambdas: &[LambdaSpec], result: &mut ValidationResult) {
        let mut seen_names = HashSet::new();

        for (i, lambda) in lambdas.iter().enumerate() {
            let prefix = format!("lambdas[{i}]");

            if lambda.service_name.trim().is_empty() {
                result.errors.push(ValidationIssue {
                    field: format!("{prefix}.serviceName"),
                    message: String::from("Service name cannot be empty"),
                });
                continue;
            }

            if !seen_names.insert(lambda.service_name.as_str()) {
                result.errors.push(ValidationIssue {
                    field: format!("{prefix}.serviceName"),
                    message: format!("Duplicate service name: {}", lambda.service_name),
                });
            }

            if lambda.memory_mb == 0 {
                result.errors.push(ValidationIssue {
                    field: format!("{prefix}.memoryMB"),
                    message: format!("Lambda '{}' must have a positive memory size", lambda.service_name),
                });
            } else if !(MIN_MEMORY_MB..=MAX_MEMORY_MB).contains(&lambda.memory_mb) {
                result.warnings.push(format!(
                    "{prefix}.memoryMB: {} MB for '{}' is outside {MIN_MEMORY_MB}..={MAX_MEMORY_MB}",
                    lambda.memory_mb, lambda.service_name
                ));
            }

            if lambda.handler_entry.trim().is_empty() {
                result.errors.push(ValidationIssue {
                    field: format!("{prefix}.handlerEntry"),
                    message: format!("Lambda '{}' has an empty handler", lambda.service_name),
                });
            }
        }
    }

    /// Validates tables.
    fn validate_tables(tables: &[TableSpec], has_lambdas: bool, result: &mut ValidationResult) {
        let mut seen_names = HashSet::new();

        for (i, table) in tables.iter().enumerate() {
            let prefix = format!("tables[{i}]");

            if table.name.trim().is_empty() {
                result.errors.push(ValidationIssue {
                    field: format!("{prefix}.name"),
                    message: String::from("Table name cannot be empty"),
                });
            } else if !seen_names.insert(table.name.as_str()) {
                result.errors.push(ValidationIssue {
                    field: format!("{prefix}.name"),
                    message: format!("Duplicate table name: {}", table.name),
                });
            }

            if table.primary_key_attribute.trim().is_empty() {
                result.errors.push(ValidationIssue {
                    field: format!("{prefix}.primaryKeyAttribute"),
                    message: format!("Table '{}' has an empty primary key attribute", table.name),
                });
            }

            if table.ttl_enabled {
                if table.ttl_attribute.trim().is_empty() {
                    result.errors.push(ValidationIssue {
                        field: format!("{prefix}.ttlAttribute"),
                        message: format!("Table '{}' enables TTL without an attribute", table.name),
                    });
                }
                if !has_lambdas {
                    result.warnings.push(format!(
                        "{prefix}: Table '{}' enables TTL but no lambdas are declared to grant access to",
                        table.name
                    ));
                }
            }
        }
    }

    /// Validates the network.
    fn validate_network(network: &NetworkSpec, result: &mut ValidationResult) {
        if network.name.trim().is_empty() {
            result.errors.push(ValidationIssue {
                field: String::from("vpc.name"),
                message: String::from("Network name cannot be empty"),
            });
        }

        if network.max_azs == 0 {
            result.errors.push(ValidationIssue {
                field: String::from("vpc.maxAzs"),
                message: String::from("Network must span at least one availability zone"),
            });
        }
    }

    /// Validates the cluster and its node group.
    fn validate_cluster(cluster: &ClusterSpec, result: &mut ValidationResult) {
        if cluster.name.trim().is_empty() {
            result.errors.push(ValidationIssue {
                field: String::from("eks.name"),
                message: String::from("Cluster name cannot be empty"),
            });
        }

        let group = &cluster.node_group;
        if group.max_size == 0 {
            result.errors.push(ValidationIssue {
                field: String::from("eks.nodeGroup.maxSize"),
                message: String::from("Node group maximum size must be at least 1"),
            });
        }

        if group.min_size > group.desired_size || group.desired_size > group.max_size {
            result.errors.push(ValidationIssue {
                field: String::from("eks.nodeGroup"),
                message: format!(
                    "Node group '{}' requires minSize <= desiredSize <= maxSize (got {} / {} / {})",
                    group.name, group.min_size, group.desired_size, group.max_size
                ),
            });
        }

        if group.instance_type.trim().is_empty() {
            result.errors.push(ValidationIssue {
                field: String::from("eks.nodeGroup.instanceType"),
                message: String::from("Node group instance type cannot be empty"),
            });
        }
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> DeploymentDescriptor {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_primary_key_names_entry() {
        let descriptor = parse(
            r#"{"tables": [{"name": "ok", "primaryKey": "id"}, {"name": "bad", "primaryKey": ""}]}"#,
        );
        let err = DescriptorValidator::new().validate(&descriptor).unwrap_err();

        match err {
            StackPlanError::Config(ConfigError::ValidationError { message, field }) => {
                assert_eq!(field.as_deref(), Some("tables[1].primaryKeyAttribute"));
                assert!(message.contains("bad"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_primary_key_is_validation_error() {
        let descriptor = parse(r#"{"tables": [{"name": "items"}]}"#);
        let err = DescriptorValidator::new().validate(&descriptor).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_duplicate_service_names() {
        let descriptor = parse(r#"{"lambdas": [{"serviceName": "a"}, {"serviceName": "a"}]}"#);
        let result = DescriptorValidator::new().check(&descriptor);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors[0].field, "lambdas[1].serviceName");
    }

    #[test]
    fn test_node_group_sizes() {
        let descriptor = parse(
            r#"{"eks": {"name": "main", "nodeGroup": {"minSize": 3, "desiredSize": 1, "maxSize": 2}}}"#,
        );
        let result = DescriptorValidator::new().check(&descriptor);
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].field, "eks.nodeGroup");
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let descriptor = parse(
            r#"{
                "lambdas": [{"serviceName": "big", "memoryMB": 20000}],
                "vpc": {"name": "net"}
            }"#,
        );
        let result = DescriptorValidator::new().validate(&descriptor).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 2);
    }

    #[test]
    fn test_table_and_cluster_share_a_name() {
        let descriptor = parse(
            r#"{"tables": [{"name": "main", "primaryKey": "id"}], "eks": {"name": "main"}}"#,
        );
        let result = DescriptorValidator::new().check(&descriptor);

        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors[0].field, "eks.name");
        assert!(result.errors[0].message.contains("tables[0].name"));
    }

    #[test]
    fn test_table_named_like_a_lambda() {
        let descriptor = parse(
            r#"{"lambdas": [{"serviceName": "x"}], "tables": [{"name": "x-lambda", "primaryKey": "id"}]}"#,
        );
        let err = DescriptorValidator::new().validate(&descriptor).unwrap_err();

        match err {
            StackPlanError::Config(ConfigError::ValidationError { message, field }) => {
                assert_eq!(field.as_deref(), Some("tables[0].name"));
                assert!(message.contains("x-lambda"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_table_named_like_a_bundle_manifest() {
        let descriptor = parse(
            &format!(
                r#"{{"tables": [{{"name": "{}", "primaryKey": "id"}}], "eks": {{"name": "main"}}}}"#,
                ids::METRICS_SERVICE_ACCOUNT
            ),
        );
        let result = DescriptorValidator::new().check(&descriptor);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors[0].field, "eks");
    }

    #[test]
    fn test_distinct_names_do_not_collide() {
        let descriptor = parse(
            r#"{
                "lambdas": [{"serviceName": "orders"}],
                "tables": [{"name": "items", "primaryKey": "id", "ttlEnabled": true}],
                "vpc": {"name": "net"},
                "eks": {"name": "main"}
            }"#,
        );
        assert!(DescriptorValidator::new().check(&descriptor).is_valid());
    }

    #[test]
    fn test_empty_descriptor_warns() {
        let result = DescriptorValidator::new()
            .validate(&DeploymentDescriptor::default())
            .unwrap();
        assert_eq!(result.warning_count(), 1);
    }
}
