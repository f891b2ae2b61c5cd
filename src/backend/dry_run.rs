//! In-process backend that provisions nothing.
//!
//! Every call is recorded and answered with a synthetic handle, which makes
//! this backend useful for previewing an apply and for exercising the
//! executor without cloud credentials.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::{NetworkSpec, NodeGroupSpec};
use crate::error::{BackendError, Result, StackPlanError};
use crate::planner::{ClusterPayload, LambdaPayload, ManifestPayload, TablePayload};

use super::{ProvisioningBackend, ResourceHandle};

/// Handle scheme used by the dry-run backend.
const HANDLE_SCHEME: &str = "dry-run://";

/// A call received by the dry-run backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendCall {
    /// Backend operation.
    pub operation: &'static str,
    /// Resource the operation targeted.
    pub target: String,
}

impl std::fmt::Display for BackendCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.operation, self.target)
    }
}

/// Recording backend returning `dry-run://{kind}/{name}` handles.
#[derive(Debug, Default)]
pub struct DryRunBackend {
    /// Calls in the order they were received.
    calls: Mutex<Vec<BackendCall>>,
    /// Targets whose operations are rejected.
    rejected: BTreeSet<String>,
}

impl DryRunBackend {
    /// Creates a new dry-run backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every operation on the given target.
    #[must_use]
    pub fn with_rejection(mut self, target: impl Into<String>) -> Self {
        self.rejected.insert(target.into());
        self
    }

    /// Returns the recorded calls.
    pub async fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().await.clone()
    }

    /// Records a call, failing it if its target is rejected.
    async fn record(&self, operation: &'static str, target: String) -> Result<()> {
        if self.rejected.contains(&target) {
            return Err(StackPlanError::Backend(BackendError::rejected(
                operation,
                target,
                "rejected by dry-run backend",
            )));
        }

        debug!(operation, target = %target, "Dry-run call");
        self.calls.lock().await.push(BackendCall { operation, target });
        Ok(())
    }

    /// Builds a synthetic handle.
    fn handle(kind: &str, name: &str) -> ResourceHandle {
        ResourceHandle::new(format!("{HANDLE_SCHEME}{kind}/{name}"))
    }

    /// Returns the `kind/name` label of a manifest document.
    fn manifest_label(manifest: &ManifestPayload) -> String {
        let kind = manifest.document["kind"].as_str().unwrap_or("Unknown");
        let name = manifest.document["metadata"]["name"]
            .as_str()
            .unwrap_or("unnamed");
        format!("{kind}/{name}")
    }
}

#[async_trait]
impl ProvisioningBackend for DryRunBackend {
    async fn create_lambda(&self, spec: &LambdaPayload) -> Result<ResourceHandle> {
        self.record("create_lambda", spec.service_name.clone()).await?;
        Ok(Self::handle("lambda", &spec.service_name))
    }

    async fn create_table(&self, spec: &TablePayload) -> Result<ResourceHandle> {
        self.record("create_table", spec.name.clone()).await?;
        Ok(Self::handle("table", &spec.name))
    }

    async fn grant_read_write(
        &self,
        table: &ResourceHandle,
        lambda: &ResourceHandle,
    ) -> Result<()> {
        self.record("grant_read_write", format!("{table} -> {lambda}"))
            .await
    }

    async fn create_network(&self, spec: &NetworkSpec) -> Result<ResourceHandle> {
        self.record("create_network", spec.name.clone()).await?;
        Ok(Self::handle("network", &spec.name))
    }

    async fn create_cluster(
        &self,
        spec: &ClusterPayload,
        network: Option<&ResourceHandle>,
    ) -> Result<ResourceHandle> {
        if let Some(network) = network {
            debug!(cluster = %spec.name, network = %network, "Placing cluster in network");
        }
        self.record("create_cluster", spec.name.clone()).await?;
        Ok(Self::handle("cluster", &spec.name))
    }

    async fn create_node_group(
        &self,
        spec: &NodeGroupSpec,
        cluster: &ResourceHandle,
    ) -> Result<()> {
        self.record("create_node_group", format!("{cluster}#{}", spec.name))
            .await
    }

    async fn apply_manifest(
        &self,
        cluster: &ResourceHandle,
        manifest: &ManifestPayload,
    ) -> Result<()> {
        self.record(
            "apply_manifest",
            format!("{cluster}#{}", Self::manifest_label(manifest)),
        )
        .await
    }

    fn backend_type(&self) -> &'static str {
        "dry-run"
    }
}
