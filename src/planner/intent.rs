//! Resource intents.
//!
//! An intent is a backend-agnostic "create or configure this" action with
//! explicit dependency edges. Intents are produced by the builder, ordered
//! by the assembler and consumed, never mutated, by a backend.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::config::{ClusterLogType, NetworkSpec, NodeGroupSpec};

/// Kinds of resource intents.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntentKind {
    /// Lambda function.
    Lambda,
    /// `DynamoDB` table.
    Table,
    /// Network (VPC).
    Network,
    /// Kubernetes cluster.
    Cluster,
    /// Managed node group.
    NodeGroup,
    /// Table access grant for a function.
    GrantAccess,
    /// Kubernetes manifest applied to the cluster.
    K8sManifest,
}

/// A single resource intent.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResourceIntent {
    /// Unique, run-stable id.
    pub id: String,
    /// Intent kind, always matching the payload.
    pub kind: IntentKind,
    /// Kind-specific data for the backend.
    pub payload: IntentPayload,
    /// Ids of intents that must be applied first.
    #[serde(rename = "dependsOn")]
    pub depends_on: BTreeSet<String>,
}

/// Kind-specific intent data.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IntentPayload {
    /// Create a Lambda function.
    Lambda(LambdaPayload),
    /// Create a table.
    Table(TablePayload),
    /// Create a network.
    Network(NetworkSpec),
    /// Create a cluster.
    Cluster(ClusterPayload),
    /// Create a node group in a cluster.
    NodeGroup(NodeGroupPayload),
    /// Grant a function access to a table.
    GrantAccess(GrantPayload),
    /// Apply a manifest to a cluster.
    Manifest(ManifestPayload),
}

/// Lambda function to create.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LambdaPayload {
    /// Service name the function belongs to.
    pub service_name: String,
    /// Runtime identifier.
    pub runtime: String,
    /// Memory size in MB.
    pub memory_mb: u32,
    /// Handler entry point.
    pub handler: String,
    /// Where the code asset comes from.
    pub code: CodeSource,
    /// Environment variables.
    pub environment: BTreeMap<String, String>,
}

/// Source of a function's code asset.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "source", content = "path", rename_all = "camelCase")]
pub enum CodeSource {
    /// Location given in the descriptor, used verbatim.
    Declared(String),
    /// The planner's default asset directory.
    DefaultAssets(PathBuf),
}

/// Table to create.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TablePayload {
    /// Table name.
    pub name: String,
    /// String partition key attribute.
    pub partition_key: String,
    /// TTL attribute, when expiry is enabled.
    pub ttl_attribute: Option<String>,
    /// What happens to the table when it leaves the deployment.
    pub removal_policy: RemovalPolicy,
}

/// Removal policies for stateful resources.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    /// Delete the resource and its data.
    Destroy,
}

/// Access grant between a table and a function.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GrantPayload {
    /// Table intent id.
    pub table: String,
    /// Lambda intent id.
    pub lambda: String,
    /// Granted access.
    pub access: AccessLevel,
}

/// Table access levels.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    /// Read and write data.
    ReadWrite,
}

/// Cluster to create.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClusterPayload {
    /// Cluster name.
    pub name: String,
    /// Kubernetes version.
    pub kubernetes_version: String,
    /// Principal allowed to assume the masters role.
    pub masters_principal_arn: String,
    /// Network intent id, when the cluster runs in a declared network.
    pub network: Option<String>,
    /// Control plane log types.
    pub logging: Vec<ClusterLogType>,
    /// Nodes created with the cluster itself; capacity comes from node groups.
    pub default_capacity: u32,
    /// Subnet placement for worker nodes.
    pub subnet_type: String,
}

/// Node group to create.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NodeGroupPayload {
    /// Cluster intent id.
    pub cluster: String,
    /// Node group settings.
    pub spec: NodeGroupSpec,
}

/// Kubernetes manifest to apply.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ManifestPayload {
    /// Cluster intent id.
    pub cluster: String,
    /// Manifest document.
    pub document: serde_json::Value,
    /// Managed policies the backend attaches to the identity behind a
    /// service account manifest.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_policies: Vec<String>,
}

impl ResourceIntent {
    /// Creates an intent with no dependencies.
    #[must_use]
    pub fn new(id: impl Into<String>, payload: IntentPayload) -> Self {
        Self {
            id: id.into(),
            kind: payload.kind(),
            payload,
            depends_on: BTreeSet::new(),
        }
    }

    /// Adds a dependency on another intent.
    #[must_use]
    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.depends_on.insert(id.into());
        self
    }

    /// Returns true if this intent has no dependencies.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.depends_on.is_empty()
    }

    /// Returns a human-readable description of the intent.
    #[must_use]
    pub fn description(&self) -> String {
        match &self.payload {
            IntentPayload::Lambda(lambda) => {
                format!("Create {} function '{}'", lambda.runtime, self.id)
            }
            IntentPayload::Table(table) => format!("Create table '{}'", table.name),
            IntentPayload::Network(network) => {
                format!("Create network '{}' ({})", network.name, network.cidr)
            }
            IntentPayload::Cluster(cluster) => format!(
                "Create Kubernetes {} cluster '{}'",
                cluster.kubernetes_version, cluster.name
            ),
            IntentPayload::NodeGroup(group) => format!(
                "Create node group '{}' in '{}'",
                group.spec.name, group.cluster
            ),
            IntentPayload::GrantAccess(grant) => format!(
                "Grant {} read/write on '{}'",
                grant.lambda, grant.table
            ),
            IntentPayload::Manifest(manifest) => {
                format!("Apply manifest '{}' to '{}'", self.id, manifest.cluster)
            }
        }
    }
}

impl IntentPayload {
    /// Returns the intent kind this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> IntentKind {
        match self {
            Self::Lambda(_) => IntentKind::Lambda,
            Self::Table(_) => IntentKind::Table,
            Self::Network(_) => IntentKind::Network,
            Self::Cluster(_) => IntentKind::Cluster,
            Self::NodeGroup(_) => IntentKind::NodeGroup,
            Self::GrantAccess(_) => IntentKind::GrantAccess,
            Self::Manifest(_) => IntentKind::K8sManifest,
        }
    }
}

impl CodeSource {
    /// Returns the asset path as a string.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Declared(path) => path.clone(),
            Self::DefaultAssets(dir) => dir.display().to_string(),
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Lambda => "lambda",
            Self::Table => "table",
            Self::Network => "network",
            Self::Cluster => "cluster",
            Self::NodeGroup => "node-group",
            Self::GrantAccess => "grant",
            Self::K8sManifest => "manifest",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ResourceIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.id)?;
        if !self.depends_on.is_empty() {
            let deps: Vec<&str> = self.depends_on.iter().map(String::as_str).collect();
            write!(f, " (after {})", deps.join(", "))?;
        }
        Ok(())
    }
}
