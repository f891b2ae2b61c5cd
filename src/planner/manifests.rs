//! Fixed manifest bundle applied to every planned cluster.
//!
//! The bundle installs the Kubernetes dashboard (namespace, service account,
//! deployment, service and RBAC) and metrics-server (service account,
//! deployment and RBAC). Every manifest waits for the node group; edges
//! inside the bundle order namespaces before the objects living in them,
//! roles before their bindings and service accounts before anything that
//! references them.

use serde_json::{Value, json};

use super::intent::{IntentPayload, ManifestPayload, ResourceIntent};

/// Namespace the dashboard lives in.
pub const DASHBOARD_NAMESPACE: &str = "kubernetes-dashboard";

/// Namespace metrics-server lives in.
pub const METRICS_NAMESPACE: &str = "kube-system";

const DASHBOARD_IMAGE: &str = "kubernetesui/dashboard:v2.6.0";
const METRICS_SERVER_IMAGE: &str = "registry.k8s.io/metrics-server/metrics-server:v0.6.4";
const DASHBOARD_MANAGED_POLICY: &str = "AmazonEKSClusterPolicy";
const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Intent ids of the dashboard manifests.
pub mod ids {
    /// Dashboard namespace.
    pub const DASHBOARD_NAMESPACE: &str = "kubernetes-dashboard-namespace";
    /// Dashboard service account.
    pub const DASHBOARD_SERVICE_ACCOUNT: &str = "kubernetes-dashboard-sa";
    /// Dashboard deployment.
    pub const DASHBOARD_DEPLOYMENT: &str = "kubernetes-dashboard-deployment";
    /// Dashboard service.
    pub const DASHBOARD_SERVICE: &str = "kubernetes-dashboard-service";
    /// Dashboard namespaced role.
    pub const DASHBOARD_ROLE: &str = "kubernetes-dashboard-rbac";
    /// Dashboard role binding.
    pub const DASHBOARD_ROLE_BINDING: &str = "kubernetes-dashboard-rolebinding";
    /// Dashboard read-only cluster role.
    pub const DASHBOARD_CLUSTER_ROLE: &str = "kubernetes-dashboard-clusterrole";
    /// Dashboard cluster role binding.
    pub const DASHBOARD_CLUSTER_ROLE_BINDING: &str = "kubernetes-dashboard-clusterrolebinding";
    /// Metrics-server deployment.
    pub const METRICS_DEPLOYMENT: &str = "metrics-server-deployment";
    /// Metrics-server service account.
    pub const METRICS_SERVICE_ACCOUNT: &str = "metrics-server-serviceaccount";
    /// Metrics-server auth delegator cluster role.
    pub const METRICS_AUTH_ROLE: &str = "metrics-server-auth-reader";
    /// Metrics-server auth delegator binding.
    pub const METRICS_AUTH_BINDING: &str = "metrics-server-auth-reader-binding";
    /// Aggregated metrics reader cluster role.
    pub const METRICS_READER_ROLE: &str = "metrics-server-resource-reader";
    /// Aggregated metrics reader binding.
    pub const METRICS_READER_BINDING: &str = "metrics-server-resource-reader-binding";

    /// Every bundle id, in emission order.
    pub const ALL: [&str; 14] = [
        DASHBOARD_NAMESPACE,
        DASHBOARD_SERVICE_ACCOUNT,
        DASHBOARD_DEPLOYMENT,
        DASHBOARD_SERVICE,
        DASHBOARD_ROLE,
        DASHBOARD_ROLE_BINDING,
        DASHBOARD_CLUSTER_ROLE,
        DASHBOARD_CLUSTER_ROLE_BINDING,
        METRICS_DEPLOYMENT,
        METRICS_SERVICE_ACCOUNT,
        METRICS_AUTH_ROLE,
        METRICS_AUTH_BINDING,
        METRICS_READER_ROLE,
        METRICS_READER_BINDING,
    ];
}

/// Builds the manifest bundle for a cluster, gated on its node group.
#[must_use]
pub fn addon_bundle(cluster: &str, node_group: &str) -> Vec<ResourceIntent> {
    let manifest = |id: &str, document: Value, after: &[&str]| {
        after.iter().fold(
            ResourceIntent::new(
                id,
                IntentPayload::Manifest(ManifestPayload {
                    cluster: cluster.to_string(),
                    document,
                    managed_policies: Vec::new(),
                }),
            )
            .with_dependency(node_group),
            |intent, dep| intent.with_dependency(*dep),
        )
    };

    let mut dashboard_sa = manifest(
        ids::DASHBOARD_SERVICE_ACCOUNT,
        service_account("kubernetes-dashboard", DASHBOARD_NAMESPACE),
        &[ids::DASHBOARD_NAMESPACE],
    );
    if let IntentPayload::Manifest(payload) = &mut dashboard_sa.payload {
        payload.managed_policies.push(String::from(DASHBOARD_MANAGED_POLICY));
    }

    vec![
        manifest(ids::DASHBOARD_NAMESPACE, dashboard_namespace(), &[]),
        dashboard_sa,
        manifest(
            ids::DASHBOARD_DEPLOYMENT,
            dashboard_deployment(),
            &[ids::DASHBOARD_NAMESPACE, ids::DASHBOARD_SERVICE_ACCOUNT],
        ),
        manifest(
            ids::DASHBOARD_SERVICE,
            dashboard_service(),
            &[ids::DASHBOARD_DEPLOYMENT],
        ),
        manifest(ids::DASHBOARD_ROLE, dashboard_role(), &[ids::DASHBOARD_NAMESPACE]),
        manifest(
            ids::DASHBOARD_ROLE_BINDING,
            binding(
                "RoleBinding",
                "kubernetes-dashboard",
                Some(DASHBOARD_NAMESPACE),
                "Role",
                "kubernetes-dashboard",
                ("kubernetes-dashboard", DASHBOARD_NAMESPACE),
            ),
            &[ids::DASHBOARD_ROLE, ids::DASHBOARD_SERVICE_ACCOUNT],
        ),
        manifest(ids::DASHBOARD_CLUSTER_ROLE, dashboard_cluster_role(), &[]),
        manifest(
            ids::DASHBOARD_CLUSTER_ROLE_BINDING,
            binding(
                "ClusterRoleBinding",
                "kubernetes-dashboard-read-only",
                None,
                "ClusterRole",
                "kubernetes-dashboard-read-only",
                ("kubernetes-dashboard", DASHBOARD_NAMESPACE),
            ),
            &[ids::DASHBOARD_CLUSTER_ROLE, ids::DASHBOARD_SERVICE_ACCOUNT],
        ),
        manifest(
            ids::METRICS_DEPLOYMENT,
            metrics_server_deployment(),
            &[ids::METRICS_SERVICE_ACCOUNT],
        ),
        manifest(
            ids::METRICS_SERVICE_ACCOUNT,
            service_account("metrics-server", METRICS_NAMESPACE),
            &[],
        ),
        manifest(ids::METRICS_AUTH_ROLE, metrics_auth_delegator_role(), &[]),
        manifest(
            ids::METRICS_AUTH_BINDING,
            binding(
                "ClusterRoleBinding",
                "metrics-server:system:auth-delegator",
                None,
                "ClusterRole",
                "metrics-server:system:auth-delegator",
                ("metrics-server", METRICS_NAMESPACE),
            ),
            &[ids::METRICS_AUTH_ROLE, ids::METRICS_SERVICE_ACCOUNT],
        ),
        manifest(ids::METRICS_READER_ROLE, metrics_reader_role(), &[]),
        manifest(
            ids::METRICS_READER_BINDING,
            binding(
                "ClusterRoleBinding",
                "metrics-server:system:resource-reader",
                None,
                "ClusterRole",
                "system:aggregated-metrics-reader",
                ("metrics-server", METRICS_NAMESPACE),
            ),
            &[ids::METRICS_READER_ROLE, ids::METRICS_SERVICE_ACCOUNT],
        ),
    ]
}

fn dashboard_labels() -> Value {
    json!({ "k8s-app": "kubernetes-dashboard" })
}

fn dashboard_namespace() -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": DASHBOARD_NAMESPACE }
    })
}

fn service_account(name: &str, namespace: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ServiceAccount",
        "metadata": { "name": name, "namespace": namespace }
    })
}

fn dashboard_deployment() -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "labels": dashboard_labels(),
            "name": "kubernetes-dashboard",
            "namespace": DASHBOARD_NAMESPACE
        },
        "spec": {
            "replicas": 1,
            "selector": { "matchLabels": dashboard_labels() },
            "template": {
                "metadata": { "labels": dashboard_labels() },
                "spec": {
                    "serviceAccountName": "kubernetes-dashboard",
                    "containers": [{
                        "name": "kubernetes-dashboard",
                        "image": DASHBOARD_IMAGE,
                        "ports": [{ "containerPort": 8443 }],
                        "args": ["--namespace=kubernetes-dashboard", "--token-ttl=3600"],
                        "volumeMounts": [
                            { "name": "kubernetes-dashboard-certs", "mountPath": "/certs" },
                            { "name": "dashboard-tmp", "mountPath": "/tmp" }
                        ],
                        "livenessProbe": {
                            "httpGet": { "path": "/", "port": 9090, "scheme": "HTTP" },
                            "initialDelaySeconds": 30,
                            "timeoutSeconds": 5,
                            "periodSeconds": 10,
                            "failureThreshold": 3
                        },
                        "securityContext": {
                            "allowPrivilegeEscalation": false,
                            "readOnlyRootFilesystem": true,
                            "runAsUser": 1001,
                            "runAsGroup": 1001
                        }
                    }],
                    "volumes": [
                        { "name": "kubernetes-dashboard-certs", "emptyDir": {} },
                        { "name": "dashboard-tmp", "emptyDir": {} }
                    ]
                }
            }
        }
    })
}

fn dashboard_service() -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "labels": dashboard_labels(),
            "name": "kubernetes-dashboard",
            "namespace": DASHBOARD_NAMESPACE
        },
        "spec": {
            "ports": [{ "port": 443, "targetPort": 9090, "nodePort": 30001 }],
            "selector": dashboard_labels(),
            "type": "NodePort"
        }
    })
}

fn rule(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> Value {
    json!({ "apiGroups": api_groups, "resources": resources, "verbs": verbs })
}

fn dashboard_role() -> Value {
    const READ: &[&str] = &["get", "list", "watch"];

    json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "Role",
        "metadata": { "name": "kubernetes-dashboard", "namespace": DASHBOARD_NAMESPACE },
        "rules": [
            rule(&[""], &["secrets"], &["get", "list", "watch", "create", "update"]),
            rule(&[""], &["services"], READ),
            rule(&[""], &["configmaps"], READ),
            rule(&["apps"], &["deployments", "replicasets"], READ),
            rule(&[""], &["events"], &["list", "watch"]),
            rule(&["networking.k8s.io"], &["ingresses"], READ),
            rule(&["storage.k8s.io"], &["persistentvolumeclaims", "storageclasses"], READ),
            rule(&[""], &["namespaces"], READ),
            rule(&[RBAC_API_GROUP], &["roles", "rolebindings"], READ)
        ]
    })
}

fn dashboard_cluster_role() -> Value {
    json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "ClusterRole",
        "metadata": { "name": "kubernetes-dashboard-read-only" },
        "rules": [rule(
            &["*", ""],
            &[
                "pods", "deployments", "replicasets", "statefulsets", "daemonsets", "jobs",
                "cronjobs", "services", "endpoints", "ingresses", "persistentvolumeclaims",
                "persistentvolumes", "nodes", "namespaces", "roles", "rolebindings", "secrets",
                "configmaps", "events",
            ],
            &["get", "list", "watch"],
        )]
    })
}

/// Builds a role binding granting a role to one service account.
fn binding(
    kind: &str,
    name: &str,
    namespace: Option<&str>,
    role_kind: &str,
    role_name: &str,
    (account, account_namespace): (&str, &str),
) -> Value {
    let mut metadata = json!({ "name": name });
    if let Some(ns) = namespace {
        metadata["namespace"] = json!(ns);
    }

    json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": kind,
        "metadata": metadata,
        "subjects": [{
            "kind": "ServiceAccount",
            "name": account,
            "namespace": account_namespace
        }],
        "roleRef": { "apiGroup": RBAC_API_GROUP, "kind": role_kind, "name": role_name }
    })
}

fn metrics_server_deployment() -> Value {
    let labels = json!({ "k8s-app": "metrics-server" });

    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": "metrics-server", "namespace": METRICS_NAMESPACE, "labels": labels },
        "spec": {
            "selector": { "matchLabels": labels },
            "template": {
                "metadata": { "labels": labels },
                "spec": {
                    "serviceAccountName": "metrics-server",
                    "volumes": [{ "name": "tmp-dir", "emptyDir": {} }],
                    "containers": [{
                        "name": "metrics-server",
                        "image": METRICS_SERVER_IMAGE,
                        "args": [
                            "--kubelet-preferred-address-types=InternalIP,ExternalIP,Hostname",
                            "--kubelet-use-node-status-port",
                            "--metric-resolution=15s"
                        ],
                        "volumeMounts": [{ "name": "tmp-dir", "mountPath": "/tmp" }],
                        "livenessProbe": {
                            "httpGet": { "path": "/livez", "port": 10250, "scheme": "HTTPS" },
                            "initialDelaySeconds": 5,
                            "timeoutSeconds": 5
                        }
                    }]
                }
            }
        }
    })
}

fn metrics_auth_delegator_role() -> Value {
    json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "ClusterRole",
        "metadata": { "name": "metrics-server:system:auth-delegator" },
        "rules": [
            rule(&["authentication.k8s.io"], &["tokenreviews"], &["create"]),
            rule(&["authorization.k8s.io"], &["subjectaccessreviews"], &["create"])
        ]
    })
}

fn metrics_reader_role() -> Value {
    json!({
        "apiVersion": "rbac.authorization.k8s.io/v1",
        "kind": "ClusterRole",
        "metadata": {
            "name": "system:aggregated-metrics-reader",
            "labels": {
                "rbac.authorization.k8s.io/aggregate-to-view": "true",
                "rbac.authorization.k8s.io/aggregate-to-edit": "true",
                "rbac.authorization.k8s.io/aggregate-to-admin": "true"
            }
        },
        "rules": [rule(&["metrics.k8s.io"], &["nodes", "pods"], &["get", "list", "watch"])]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bundle_ids_are_unique() {
        let bundle = addon_bundle("main", "custom-node-group");
        let ids: HashSet<&str> = bundle.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), bundle.len());
        assert_eq!(bundle.len(), 14);
    }

    #[test]
    fn test_bundle_ids_match_reserved_list() {
        let bundle = addon_bundle("main", "ng");
        let emitted: Vec<&str> = bundle.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(emitted, ids::ALL);
    }

    #[test]
    fn test_every_manifest_waits_for_node_group() {
        for intent in addon_bundle("main", "custom-node-group") {
            assert!(intent.depends_on.contains("custom-node-group"), "{}", intent.id);
        }
    }

    #[test]
    fn test_bindings_follow_their_roles() {
        let bundle = addon_bundle("main", "ng");
        let find = |id: &str| bundle.iter().find(|i| i.id == id).unwrap();

        assert!(find(ids::DASHBOARD_CLUSTER_ROLE_BINDING)
            .depends_on
            .contains(ids::DASHBOARD_CLUSTER_ROLE));
        assert!(find(ids::METRICS_AUTH_BINDING)
            .depends_on
            .contains(ids::METRICS_SERVICE_ACCOUNT));
        assert!(find(ids::DASHBOARD_SERVICE)
            .depends_on
            .contains(ids::DASHBOARD_DEPLOYMENT));
    }

    #[test]
    fn test_dashboard_service_account_carries_policy() {
        let bundle = addon_bundle("main", "ng");
        let sa = bundle
            .iter()
            .find(|i| i.id == ids::DASHBOARD_SERVICE_ACCOUNT)
            .unwrap();

        match &sa.payload {
            IntentPayload::Manifest(m) => {
                assert_eq!(m.managed_policies, vec![DASHBOARD_MANAGED_POLICY.to_string()]);
                assert_eq!(m.document["kind"], "ServiceAccount");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_binding_namespace_only_when_given() {
        let cluster_scoped = binding("ClusterRoleBinding", "b", None, "ClusterRole", "r", ("sa", "ns"));
        assert!(cluster_scoped["metadata"].get("namespace").is_none());

        let namespaced = binding("RoleBinding", "b", Some("ns"), "Role", "r", ("sa", "ns"));
        assert_eq!(namespaced["metadata"]["namespace"], "ns");
    }
}
