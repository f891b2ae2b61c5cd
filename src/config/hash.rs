//! Descriptor hashing for plan fingerprints.
//!
//! Every plan records the hash of the descriptor it was built from, so two
//! plans can be compared without diffing their intents.

use sha2::{Digest, Sha256};

use super::descriptor::{ClusterSpec, DeploymentDescriptor, LambdaSpec, NetworkSpec, TableSpec};

/// Hasher for computing descriptor fingerprints.
#[derive(Debug, Default)]
pub struct DescriptorHasher;

impl DescriptorHasher {
    /// Creates a new descriptor hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of the entire descriptor.
    ///
    /// Declaration order of lambdas and tables is part of the hash because
    /// it determines grant emission and tie-breaking in the plan.
    #[must_use]
    pub fn hash_descriptor(&self, descriptor: &DeploymentDescriptor) -> String {
        let mut hasher = Sha256::new();

        for lambda in &descriptor.lambdas {
            hasher.update(b"lambda");
            hasher.update(self.hash_lambda(lambda).as_bytes());
        }

        for table in &descriptor.tables {
            hasher.update(b"table");
            Self::update_table(&mut hasher, table);
        }

        if let Some(network) = &descriptor.vpc {
            hasher.update(b"vpc");
            Self::update_network(&mut hasher, network);
        }

        if let Some(cluster) = &descriptor.eks {
            hasher.update(b"eks");
            Self::update_cluster(&mut hasher, cluster);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a hash for a single Lambda function.
    #[must_use]
    pub fn hash_lambda(&self, lambda: &LambdaSpec) -> String {
        let mut hasher = Sha256::new();

        update_str(&mut hasher, &lambda.service_name);
        update_str(&mut hasher, lambda.language.runtime());
        hasher.update(lambda.memory_mb.to_be_bytes());
        update_str(&mut hasher, &lambda.handler_entry);
        update_opt(&mut hasher, lambda.code_location.as_deref());

        // BTreeMap iterates in key order
        update_len(&mut hasher, lambda.environment_vars.len());
        for (key, value) in &lambda.environment_vars {
            update_str(&mut hasher, key);
            update_str(&mut hasher, value);
        }

        hex::encode(hasher.finalize())
    }

    fn update_table(hasher: &mut Sha256, table: &TableSpec) {
        update_str(hasher, &table.name);
        update_str(hasher, &table.primary_key_attribute);
        hasher.update([u8::from(table.ttl_enabled)]);
        update_str(hasher, &table.ttl_attribute);
    }

    fn update_network(hasher: &mut Sha256, network: &NetworkSpec) {
        update_str(hasher, &network.name);
        update_str(hasher, &network.cidr);
        hasher.update(network.max_azs.to_be_bytes());
    }

    fn update_cluster(hasher: &mut Sha256, cluster: &ClusterSpec) {
        update_str(hasher, &cluster.name);
        update_str(hasher, &cluster.kubernetes_version);

        let group = &cluster.node_group;
        update_str(hasher, &group.name);
        hasher.update(group.min_size.to_be_bytes());
        hasher.update(group.max_size.to_be_bytes());
        hasher.update(group.desired_size.to_be_bytes());
        update_str(hasher, &group.instance_type);
        update_str(hasher, &group.capacity_mode.to_string());
        hasher.update(group.disk_size_gb.to_be_bytes());
        update_str(hasher, &group.ami_type);

        // Planned clusters carry log types sorted and deduped
        let mut logging = cluster.logging.clone();
        logging.sort_unstable();
        logging.dedup();
        update_len(hasher, logging.len());
        for log_type in logging {
            hasher.update([log_type as u8]);
        }
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

/// Feeds a length prefix, keeping adjacent fields from running together.
fn update_len(hasher: &mut Sha256, len: usize) {
    hasher.update((len as u64).to_be_bytes());
}

fn update_str(hasher: &mut Sha256, value: &str) {
    update_len(hasher, value.len());
    hasher.update(value.as_bytes());
}

fn update_opt(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(value) => {
            hasher.update([1u8]);
            update_str(hasher, value);
        }
        None => hasher.update([0u8]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> DeploymentDescriptor {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_descriptor_hash_deterministic() {
        let hasher = DescriptorHasher::new();
        let descriptor = parse(r#"{"lambdas": [{"serviceName": "foo"}], "eks": {"name": "main"}}"#);

        assert_eq!(
            hasher.hash_descriptor(&descriptor),
            hasher.hash_descriptor(&descriptor.clone())
        );
    }

    #[test]
    fn test_ttl_flag_changes_hash() {
        let hasher = DescriptorHasher::new();
        let without = parse(r#"{"tables": [{"name": "t", "primaryKey": "id"}]}"#);
        let with = parse(r#"{"tables": [{"name": "t", "primaryKey": "id", "ttlEnabled": true}]}"#);

        assert_ne!(hasher.hash_descriptor(&without), hasher.hash_descriptor(&with));
    }

    #[test]
    fn test_log_type_order_ignored() {
        let hasher = DescriptorHasher::new();
        let a = parse(r#"{"eks": {"name": "main", "logging": ["api", "audit"]}}"#);
        let b = parse(r#"{"eks": {"name": "main", "logging": ["audit", "api"]}}"#);

        assert_eq!(hasher.hash_descriptor(&a), hasher.hash_descriptor(&b));
    }

    #[test]
    fn test_field_boundaries_change_hash() {
        let hasher = DescriptorHasher::new();
        let pairs = [
            (
                r#"{"tables": [{"name": "ab", "primaryKey": "c"}]}"#,
                r#"{"tables": [{"name": "a", "primaryKey": "bc"}]}"#,
            ),
            (
                r#"{"lambdas": [{"serviceName": "f", "environmentVars": {"AB": "C"}}]}"#,
                r#"{"lambdas": [{"serviceName": "f", "environmentVars": {"A": "BC"}}]}"#,
            ),
            (
                r#"{"lambdas": [{"serviceName": "f"}]}"#,
                r#"{"lambdas": [{"serviceName": "f", "codeLocation": ""}]}"#,
            ),
            (
                r#"{"vpc": {"name": "net", "cidr": "10.0.0.0/1"}}"#,
                r#"{"vpc": {"name": "net1", "cidr": "0.0.0.0/1"}}"#,
            ),
        ];

        for (left, right) in pairs {
            assert_ne!(
                hasher.hash_descriptor(&parse(left)),
                hasher.hash_descriptor(&parse(right)),
                "{left} vs {right}"
            );
        }
    }

    #[test]
    fn test_duplicate_log_types_ignored() {
        let hasher = DescriptorHasher::new();
        let a = parse(r#"{"eks": {"name": "main", "logging": ["api", "audit"]}}"#);
        let b = parse(r#"{"eks": {"name": "main", "logging": ["api", "audit", "api"]}}"#);

        assert_eq!(hasher.hash_descriptor(&a), hasher.hash_descriptor(&b));
    }

    #[test]
    fn test_short_hash() {
        let hasher = DescriptorHasher::new();
        assert_eq!(hasher.short_hash("abcdef1234567890"), "abcdef12");
    }
}
