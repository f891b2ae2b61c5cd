//! Resource intent builder.
//!
//! Maps a descriptor to intents in a fixed emission order: lambdas, tables
//! (each followed by its grants), network, cluster, node group and the
//! manifest bundle. Ids are derived from descriptor names only, so the same
//! descriptor always yields the same ids.

use tracing::{debug, warn};

use crate::config::{
    ClusterLogType, ClusterSpec, DeploymentDescriptor, LambdaSpec, NetworkSpec, PlannerSettings,
    TableSpec,
};
use crate::error::Result;

use super::intent::{
    AccessLevel, ClusterPayload, CodeSource, GrantPayload, IntentPayload, LambdaPayload,
    NodeGroupPayload, RemovalPolicy, ResourceIntent, TablePayload,
};
use super::manifests::addon_bundle;

/// Subnet placement for cluster worker nodes.
const WORKER_SUBNET_TYPE: &str = "PRIVATE_WITH_EGRESS";

/// Builder turning descriptors into resource intents.
#[derive(Debug)]
pub struct IntentBuilder<'a> {
    /// Planner settings.
    settings: &'a PlannerSettings,
}

impl<'a> IntentBuilder<'a> {
    /// Creates a new builder.
    #[must_use]
    pub const fn new(settings: &'a PlannerSettings) -> Self {
        Self { settings }
    }

    /// Builds all intents for a descriptor, in emission order.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor declares a cluster but no masters
    /// principal is configured.
    pub fn build(&self, descriptor: &DeploymentDescriptor) -> Result<Vec<ResourceIntent>> {
        let mut intents = Vec::new();

        let lambda_ids: Vec<String> = descriptor
            .lambdas
            .iter()
            .map(|lambda| {
                let intent = self.lambda_intent(lambda);
                let id = intent.id.clone();
                intents.push(intent);
                id
            })
            .collect();

        for table in &descriptor.tables {
            intents.push(Self::table_intent(table));
            intents.extend(Self::grant_intents(table, &lambda_ids));
        }

        let network_id = descriptor.vpc.as_ref().map(|network| {
            let intent = Self::network_intent(network);
            let id = intent.id.clone();
            intents.push(intent);
            id
        });

        if let Some(cluster) = &descriptor.eks {
            intents.extend(self.cluster_intents(cluster, network_id.as_deref())?);
        }

        debug!(count = intents.len(), "Built resource intents");
        Ok(intents)
    }

    /// Builds the intent for a single Lambda function.
    fn lambda_intent(&self, lambda: &LambdaSpec) -> ResourceIntent {
        let code = lambda.code_location.as_ref().map_or_else(
            || CodeSource::DefaultAssets(self.settings.default_code_dir.clone()),
            |location| CodeSource::Declared(location.clone()),
        );

        ResourceIntent::new(
            lambda.intent_id(),
            IntentPayload::Lambda(LambdaPayload {
                service_name: lambda.service_name.clone(),
                runtime: lambda.language.runtime().to_string(),
                memory_mb: lambda.memory_mb,
                handler: lambda.handler_entry.clone(),
                code,
                environment: lambda.environment_vars.clone(),
            }),
        )
    }

    /// Builds the intent for a single table.
    fn table_intent(table: &TableSpec) -> ResourceIntent {
        ResourceIntent::new(
            table.name.clone(),
            IntentPayload::Table(TablePayload {
                name: table.name.clone(),
                partition_key: table.primary_key_attribute.clone(),
                ttl_attribute: table.ttl_enabled.then(|| table.ttl_attribute.clone()),
                removal_policy: RemovalPolicy::Destroy,
            }),
        )
    }

    /// Builds read/write grants from a table to every function built so far.
    ///
    /// Grants are only emitted for TTL-enabled tables.
    fn grant_intents(table: &TableSpec, lambda_ids: &[String]) -> Vec<ResourceIntent> {
        if !table.ttl_enabled {
            if !lambda_ids.is_empty() {
                debug!(
                    table = %table.name,
                    "TTL disabled, no lambda access grants emitted"
                );
            }
            return Vec::new();
        }

        if !lambda_ids.is_empty() {
            warn!(
                table = %table.name,
                lambdas = lambda_ids.len(),
                "Granting lambda access because TTL is enabled; access follows the TTL flag"
            );
        }

        lambda_ids
            .iter()
            .map(|lambda_id| {
                ResourceIntent::new(
                    table.grant_id(lambda_id),
                    IntentPayload::GrantAccess(GrantPayload {
                        table: table.name.clone(),
                        lambda: lambda_id.clone(),
                        access: AccessLevel::ReadWrite,
                    }),
                )
                .with_dependency(table.name.clone())
                .with_dependency(lambda_id.clone())
            })
            .collect()
    }

    /// Builds the network intent.
    fn network_intent(network: &NetworkSpec) -> ResourceIntent {
        ResourceIntent::new(network.name.clone(), IntentPayload::Network(network.clone()))
    }

    /// Builds the cluster, its node group and the manifest bundle.
    fn cluster_intents(
        &self,
        cluster: &ClusterSpec,
        network_id: Option<&str>,
    ) -> Result<Vec<ResourceIntent>> {
        let principal = self.settings.require_masters_principal()?;

        let mut cluster_intent = ResourceIntent::new(
            cluster.name.clone(),
            IntentPayload::Cluster(ClusterPayload {
                name: cluster.name.clone(),
                kubernetes_version: cluster.kubernetes_version.clone(),
                masters_principal_arn: principal.to_string(),
                network: network_id.map(String::from),
                logging: canonical_log_types(&cluster.logging),
                default_capacity: 0,
                subnet_type: String::from(WORKER_SUBNET_TYPE),
            }),
        );
        if let Some(network) = network_id {
            cluster_intent = cluster_intent.with_dependency(network);
        }

        let node_group_id = cluster.node_group_id();
        let node_group_intent = ResourceIntent::new(
            node_group_id.clone(),
            IntentPayload::NodeGroup(NodeGroupPayload {
                cluster: cluster.name.clone(),
                spec: cluster.node_group.clone(),
            }),
        )
        .with_dependency(cluster.name.clone());

        let mut intents = vec![cluster_intent, node_group_intent];
        intents.extend(addon_bundle(&cluster.name, &node_group_id));
        Ok(intents)
    }
}

/// Sorts and dedups control plane log types.
fn canonical_log_types(logging: &[ClusterLogType]) -> Vec<ClusterLogType> {
    let mut logging = logging.to_vec();
    logging.sort_unstable();
    logging.dedup();
    logging
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, StackPlanError};
    use crate::planner::IntentKind;
    use std::path::PathBuf;

    const PRINCIPAL: &str = "arn:aws:iam::123456789012:user/deployer";

    fn settings() -> PlannerSettings {
        PlannerSettings::new().with_masters_principal(PRINCIPAL)
    }

    fn parse(json: &str) -> DeploymentDescriptor {
        serde_json::from_str(json).unwrap()
    }

    fn count(intents: &[ResourceIntent], kind: IntentKind) -> usize {
        intents.iter().filter(|i| i.kind == kind).count()
    }

    #[test]
    fn test_lambda_defaults() {
        let settings = settings();
        let intents = IntentBuilder::new(&settings)
            .build(&parse(r#"{"lambdas": [{"serviceName": "foo"}]}"#))
            .unwrap();

        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].id, "foo-lambda");
        match &intents[0].payload {
            IntentPayload::Lambda(lambda) => {
                assert_eq!(lambda.memory_mb, 512);
                assert_eq!(lambda.handler, "app.handler");
                assert_eq!(lambda.runtime, "nodejs18.x");
                assert_eq!(lambda.code, CodeSource::DefaultAssets(PathBuf::from("lambdas")));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_declared_code_location_used_verbatim() {
        let settings = settings().with_default_code_dir("/opt/assets");
        let intents = IntentBuilder::new(&settings)
            .build(&parse(
                r#"{"lambdas": [{"serviceName": "a", "codeLocation": "./dist/a"}, {"serviceName": "b"}]}"#,
            ))
            .unwrap();

        let codes: Vec<String> = intents
            .iter()
            .filter_map(|i| match &i.payload {
                IntentPayload::Lambda(l) => Some(l.code.path()),
                _ => None,
            })
            .collect();
        assert_eq!(codes, vec!["./dist/a", "/opt/assets"]);
    }

    #[test]
    fn test_ttl_table_grants_every_lambda() {
        let settings = settings();
        let intents = IntentBuilder::new(&settings)
            .build(&parse(
                r#"{
                    "lambdas": [{"serviceName": "a"}, {"serviceName": "b"}, {"serviceName": "c"}],
                    "tables": [{"name": "items", "primaryKey": "id", "ttlEnabled": true}]
                }"#,
            ))
            .unwrap();

        assert_eq!(count(&intents, IntentKind::GrantAccess), 3);
        let grant = intents.iter().find(|i| i.id == "items-grant-b-lambda").unwrap();
        assert!(grant.depends_on.contains("items"));
        assert!(grant.depends_on.contains("b-lambda"));
    }

    #[test]
    fn test_table_without_ttl_grants_nothing() {
        let settings = settings();
        let intents = IntentBuilder::new(&settings)
            .build(&parse(
                r#"{
                    "lambdas": [{"serviceName": "a"}, {"serviceName": "b"}],
                    "tables": [{"name": "items", "primaryKey": "id"}]
                }"#,
            ))
            .unwrap();

        assert_eq!(count(&intents, IntentKind::GrantAccess), 0);
        match &intents[2].payload {
            IntentPayload::Table(table) => assert!(table.ttl_attribute.is_none()),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_cluster_without_network() {
        let settings = settings();
        let intents = IntentBuilder::new(&settings)
            .build(&parse(r#"{"eks": {"name": "main"}}"#))
            .unwrap();

        let cluster = intents.iter().find(|i| i.kind == IntentKind::Cluster).unwrap();
        assert!(cluster.is_root());

        let node_group = intents.iter().find(|i| i.kind == IntentKind::NodeGroup).unwrap();
        assert_eq!(node_group.id, "main-custom-node-group");
        assert!(node_group.depends_on.contains("main"));
        assert_eq!(count(&intents, IntentKind::K8sManifest), 14);
    }

    #[test]
    fn test_cluster_waits_for_network() {
        let settings = settings();
        let intents = IntentBuilder::new(&settings)
            .build(&parse(r#"{"vpc": {"name": "net"}, "eks": {"name": "main"}}"#))
            .unwrap();

        let cluster = intents.iter().find(|i| i.kind == IntentKind::Cluster).unwrap();
        assert_eq!(cluster.depends_on.iter().collect::<Vec<_>>(), vec!["net"]);
        match &cluster.payload {
            IntentPayload::Cluster(payload) => {
                assert_eq!(payload.network.as_deref(), Some("net"));
                assert_eq!(payload.masters_principal_arn, PRINCIPAL);
                assert_eq!(payload.default_capacity, 0);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_cluster_requires_principal() {
        let settings = PlannerSettings::new();
        let result = IntentBuilder::new(&settings).build(&parse(r#"{"eks": {"name": "main"}}"#));
        assert!(matches!(
            result,
            Err(StackPlanError::Config(ConfigError::MissingSetting { .. }))
        ));
    }

    #[test]
    fn test_cluster_log_types_are_canonical() {
        let settings = settings();
        let intents = IntentBuilder::new(&settings)
            .build(&parse(
                r#"{"eks": {"name": "main", "logging": ["audit", "api", "audit"]}}"#,
            ))
            .unwrap();

        match &intents[0].payload {
            IntentPayload::Cluster(payload) => assert_eq!(
                payload.logging,
                vec![ClusterLogType::Api, ClusterLogType::Audit]
            ),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let settings = settings();
        let descriptor = parse(
            r#"{
                "lambdas": [{"serviceName": "a"}],
                "tables": [{"name": "t", "primaryKey": "id", "ttlEnabled": true}],
                "vpc": {"name": "net"},
                "eks": {"name": "main"}
            }"#,
        );
        let builder = IntentBuilder::new(&settings);
        assert_eq!(builder.build(&descriptor).unwrap(), builder.build(&descriptor).unwrap());
    }
}
