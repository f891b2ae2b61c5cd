//! Deployment descriptor types.
//!
//! This module defines the structs that map to a deployment descriptor
//! (`deploy.json` or its YAML equivalent). A descriptor is immutable once
//! loaded and fully describes the resources a planning run should produce.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// The root of a deployment descriptor.
///
/// Unknown top-level keys are ignored so that newer descriptors still load.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentDescriptor {
    /// Lambda functions, in declaration order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub lambdas: Vec<LambdaSpec>,
    /// `DynamoDB` tables, in declaration order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tables: Vec<TableSpec>,
    /// Optional network (VPC) configuration.
    #[serde(default)]
    pub vpc: Option<NetworkSpec>,
    /// Optional Kubernetes cluster configuration.
    #[serde(default)]
    pub eks: Option<ClusterSpec>,
}

/// A single Lambda function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LambdaSpec {
    /// Service name; the intent id is derived from it.
    #[serde(rename = "serviceName", alias = "service")]
    pub service_name: String,
    /// Function language.
    #[serde(default)]
    pub language: LambdaLanguage,
    /// Memory size in MB.
    #[serde(
        rename = "memoryMB",
        alias = "memory",
        default = "default_memory_mb",
        deserialize_with = "deserialize_memory"
    )]
    pub memory_mb: u32,
    /// Handler entry point.
    #[serde(rename = "handlerEntry", alias = "handler", default = "default_handler")]
    pub handler_entry: String,
    /// Code asset location. Falls back to the planner's default code directory.
    #[serde(rename = "codeLocation", alias = "codePath", default)]
    pub code_location: Option<String>,
    /// Environment variables passed to the function.
    #[serde(
        rename = "environmentVars",
        alias = "environmentProperties",
        default,
        deserialize_with = "null_as_empty_map"
    )]
    pub environment_vars: BTreeMap<String, String>,
}

/// Lambda function languages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LambdaLanguage {
    /// Node.js.
    #[default]
    #[serde(alias = "nodejs")]
    Node,
    /// Java.
    Java,
}

/// A single `DynamoDB` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSpec {
    /// Table name; also the intent id.
    pub name: String,
    /// Partition key attribute name. Must not be empty.
    #[serde(rename = "primaryKeyAttribute", alias = "primaryKey", default)]
    pub primary_key_attribute: String,
    /// Whether TTL expiry is enabled.
    #[serde(rename = "ttlEnabled", default)]
    pub ttl_enabled: bool,
    /// Attribute holding the expiry timestamp.
    #[serde(rename = "ttlAttribute", default = "default_ttl_attribute")]
    pub ttl_attribute: String,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkSpec {
    /// Network name; also the intent id.
    pub name: String,
    /// Address range.
    #[serde(default = "default_cidr")]
    pub cidr: String,
    /// Maximum number of availability zones.
    #[serde(rename = "maxAzs", default = "default_max_azs")]
    pub max_azs: u32,
}

/// Kubernetes cluster configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterSpec {
    /// Cluster name; also the intent id.
    pub name: String,
    /// Kubernetes version.
    #[serde(rename = "kubernetesVersion", default = "default_kubernetes_version")]
    pub kubernetes_version: String,
    /// Managed node group.
    #[serde(rename = "nodeGroup", default)]
    pub node_group: NodeGroupSpec,
    /// Control plane log types to enable.
    #[serde(default = "default_log_types")]
    pub logging: Vec<ClusterLogType>,
}

/// Managed node group configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeGroupSpec {
    /// Node group name.
    #[serde(default = "default_node_group_name")]
    pub name: String,
    /// Minimum node count.
    #[serde(rename = "minSize", default = "default_min_size")]
    pub min_size: u32,
    /// Maximum node count.
    #[serde(rename = "maxSize", default = "default_max_size")]
    pub max_size: u32,
    /// Desired node count.
    #[serde(rename = "desiredSize", default = "default_desired_size")]
    pub desired_size: u32,
    /// Instance type.
    #[serde(rename = "instanceType", default = "default_instance_type")]
    pub instance_type: String,
    /// Capacity mode.
    #[serde(rename = "capacityMode", default)]
    pub capacity_mode: CapacityMode,
    /// Root disk size in GB.
    #[serde(rename = "diskSizeGb", default = "default_disk_size_gb")]
    pub disk_size_gb: u32,
    /// Machine image family.
    #[serde(rename = "amiType", default = "default_ami_type")]
    pub ami_type: String,
}

/// Node group capacity modes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CapacityMode {
    /// Spot capacity.
    #[default]
    Spot,
    /// On-demand capacity.
    OnDemand,
}

/// Control plane log types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterLogType {
    /// API server logs.
    Api,
    /// Audit logs.
    Audit,
    /// Authenticator logs.
    Authenticator,
    /// Controller manager logs.
    ControllerManager,
    /// Scheduler logs.
    Scheduler,
}

// Default value functions

const fn default_memory_mb() -> u32 {
    512
}

fn default_handler() -> String {
    String::from("app.handler")
}

fn default_ttl_attribute() -> String {
    String::from("TTL")
}

fn default_cidr() -> String {
    String::from("10.0.0.0/16")
}

const fn default_max_azs() -> u32 {
    2
}

fn default_kubernetes_version() -> String {
    String::from("1.28")
}

fn default_log_types() -> Vec<ClusterLogType> {
    vec![
        ClusterLogType::Api,
        ClusterLogType::Authenticator,
        ClusterLogType::Audit,
    ]
}

fn default_node_group_name() -> String {
    String::from("custom-node-group")
}

const fn default_min_size() -> u32 {
    1
}

const fn default_max_size() -> u32 {
    2
}

const fn default_desired_size() -> u32 {
    1
}

fn default_instance_type() -> String {
    String::from("t3.medium")
}

const fn default_disk_size_gb() -> u32 {
    100
}

fn default_ami_type() -> String {
    String::from("AL2_X86_64")
}

impl Default for NodeGroupSpec {
    fn default() -> Self {
        Self {
            name: default_node_group_name(),
            min_size: default_min_size(),
            max_size: default_max_size(),
            desired_size: default_desired_size(),
            instance_type: default_instance_type(),
            capacity_mode: CapacityMode::default(),
            disk_size_gb: default_disk_size_gb(),
            ami_type: default_ami_type(),
        }
    }
}

// Lenient field decoding

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_empty_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Memory may be written as a number or as a numeric string.
fn deserialize_memory<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawMemory {
        Number(u32),
        Text(String),
    }

    match Option::<RawMemory>::deserialize(deserializer)? {
        None => Ok(default_memory_mb()),
        Some(RawMemory::Number(mb)) => Ok(mb),
        Some(RawMemory::Text(text)) => text
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid memory size '{text}'"))),
    }
}

impl LambdaLanguage {
    /// Returns the runtime identifier for this language.
    #[must_use]
    pub const fn runtime(self) -> &'static str {
        match self {
            Self::Node => "nodejs18.x",
            Self::Java => "java21",
        }
    }
}

impl LambdaSpec {
    /// Returns the deterministic intent id for this function.
    #[must_use]
    pub fn intent_id(&self) -> String {
        format!("{}-lambda", self.service_name)
    }
}

impl TableSpec {
    /// Returns the intent id of this table's grant to a function.
    #[must_use]
    pub fn grant_id(&self, lambda_id: &str) -> String {
        format!("{}-grant-{lambda_id}", self.name)
    }
}

impl ClusterSpec {
    /// Returns the intent id of the cluster's node group.
    #[must_use]
    pub fn node_group_id(&self) -> String {
        format!("{}-{}", self.name, self.node_group.name)
    }
}

impl DeploymentDescriptor {
    /// Returns true if the descriptor declares no resources at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lambdas.is_empty() && self.tables.is_empty() && self.vpc.is_none() && self.eks.is_none()
    }

    /// Returns the number of tables with TTL enabled.
    #[must_use]
    pub fn ttl_table_count(&self) -> usize {
        self.tables.iter().filter(|t| t.ttl_enabled).count()
    }
}

impl std::fmt::Display for CapacityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Spot => "SPOT",
            Self::OnDemand => "ON_DEMAND",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lambda_defaults() {
        let lambda: LambdaSpec = serde_json::from_str(r#"{"serviceName": "foo"}"#).unwrap();
        assert_eq!(lambda.service_name, "foo");
        assert_eq!(lambda.language, LambdaLanguage::Node);
        assert_eq!(lambda.memory_mb, 512);
        assert_eq!(lambda.handler_entry, "app.handler");
        assert!(lambda.code_location.is_none());
        assert!(lambda.environment_vars.is_empty());
        assert_eq!(lambda.intent_id(), "foo-lambda");
    }

    #[test]
    fn test_lambda_legacy_field_names() {
        let json = r#"{
            "service": "orders",
            "language": "java",
            "memory": "1024",
            "handler": "com.example.Handler",
            "codePath": "build/orders.jar",
            "environmentProperties": {"NAME": "x"}
        }"#;
        let lambda: LambdaSpec = serde_json::from_str(json).unwrap();
        assert_eq!(lambda.service_name, "orders");
        assert_eq!(lambda.language.runtime(), "java21");
        assert_eq!(lambda.memory_mb, 1024);
        assert_eq!(lambda.handler_entry, "com.example.Handler");
        assert_eq!(lambda.code_location.as_deref(), Some("build/orders.jar"));
        assert_eq!(lambda.environment_vars.get("NAME").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_memory_rejects_garbage() {
        let result: Result<LambdaSpec, _> =
            serde_json::from_str(r#"{"serviceName": "foo", "memoryMB": "lots"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_null_lists_default_to_empty() {
        let descriptor: DeploymentDescriptor =
            serde_json::from_str(r#"{"lambdas": null, "tables": null, "extra": 1}"#).unwrap();
        assert!(descriptor.is_empty());
    }

    #[test]
    fn test_cluster_defaults() {
        let cluster: ClusterSpec = serde_json::from_str(r#"{"name": "main"}"#).unwrap();
        assert_eq!(cluster.kubernetes_version, "1.28");
        assert_eq!(cluster.node_group.instance_type, "t3.medium");
        assert_eq!(cluster.node_group.capacity_mode, CapacityMode::Spot);
        assert_eq!(cluster.logging.len(), 3);
    }

    #[test]
    fn test_capacity_mode_parse() {
        let group: NodeGroupSpec =
            serde_json::from_str(r#"{"capacityMode": "on-demand"}"#).unwrap();
        assert_eq!(group.capacity_mode, CapacityMode::OnDemand);
        assert_eq!(group.capacity_mode.to_string(), "ON_DEMAND");
    }
}
