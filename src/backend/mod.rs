//! Provisioning backends.
//!
//! A backend is the external system that turns intents into real resources.
//! The planner never talks to a backend; the plan executor does, one intent
//! at a time, in plan order.

mod dry_run;

pub use dry_run::{BackendCall, DryRunBackend};

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{NetworkSpec, NodeGroupSpec};
use crate::error::Result;
use crate::planner::{ClusterPayload, LambdaPayload, ManifestPayload, TablePayload};

/// Opaque reference to a resource created by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    /// Wraps a backend-provided identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for provisioning backends.
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Creates a Lambda function.
    async fn create_lambda(&self, spec: &LambdaPayload) -> Result<ResourceHandle>;

    /// Creates a table.
    async fn create_table(&self, spec: &TablePayload) -> Result<ResourceHandle>;

    /// Grants a function read/write access to a table.
    async fn grant_read_write(
        &self,
        table: &ResourceHandle,
        lambda: &ResourceHandle,
    ) -> Result<()>;

    /// Creates a network.
    async fn create_network(&self, spec: &NetworkSpec) -> Result<ResourceHandle>;

    /// Creates a cluster, placed in the network when one is given.
    async fn create_cluster(
        &self,
        spec: &ClusterPayload,
        network: Option<&ResourceHandle>,
    ) -> Result<ResourceHandle>;

    /// Creates a managed node group in a cluster.
    async fn create_node_group(&self, spec: &NodeGroupSpec, cluster: &ResourceHandle)
        -> Result<()>;

    /// Applies a Kubernetes manifest to a cluster.
    async fn apply_manifest(&self, cluster: &ResourceHandle, manifest: &ManifestPayload)
        -> Result<()>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl ProvisioningBackend for Box<dyn ProvisioningBackend> {
    async fn create_lambda(&self, spec: &LambdaPayload) -> Result<ResourceHandle> {
        (**self).create_lambda(spec).await
    }

    async fn create_table(&self, spec: &TablePayload) -> Result<ResourceHandle> {
        (**self).create_table(spec).await
    }

    async fn grant_read_write(
        &self,
        table: &ResourceHandle,
        lambda: &ResourceHandle,
    ) -> Result<()> {
        (**self).grant_read_write(table, lambda).await
    }

    async fn create_network(&self, spec: &NetworkSpec) -> Result<ResourceHandle> {
        (**self).create_network(spec).await
    }

    async fn create_cluster(
        &self,
        spec: &ClusterPayload,
        network: Option<&ResourceHandle>,
    ) -> Result<ResourceHandle> {
        (**self).create_cluster(spec, network).await
    }

    async fn create_node_group(
        &self,
        spec: &NodeGroupSpec,
        cluster: &ResourceHandle,
    ) -> Result<()> {
        (**self).create_node_group(spec, cluster).await
    }

    async fn apply_manifest(
        &self,
        cluster: &ResourceHandle,
        manifest: &ManifestPayload,
    ) -> Result<()> {
        (**self).apply_manifest(cluster, manifest).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
