//! Main and secondary workload sets (4.E.1, 4.E.2).
//!
//! Grounded on `internal/resource/statefulset_utils.go`'s `ConfigureContainerWithGlobalSettings`
//! / `ConfigureContainerWithNodeSettings` / `ConfigureStatefulSetWithGlobalSettings` /
//! `ConfigureStatefulSetWithNodeSettings`, folded into a single desired-state builder rather than
//! the Go source's mutate-in-place sequence, since every field here is computed fresh each
//! reconcile rather than patched onto a long-lived object.

use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVarSource, ExecAction, HTTPGetAction, Lifecycle, LifecycleHandler, PersistentVolumeClaimVolumeSource,
    PodSpec, PodTemplateSpec, Probe, ProbeHandler, ResourceRequirements, SecretKeySelector, SecretVolumeSource, Volume,
    VolumeSource,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::{Resource, ResourceExt};

use operator_api::consts::{
    DATABASE_PROPERTIES_MOUNT_PATH, DATABASE_PROPERTIES_SUB_PATH, DATABASE_PROPERTIES_VOLUME_NAME,
    TEAMCITY_CONTAINER_NAME,
};

use crate::crd::common::{CustomPersistentVolumeClaim, GlobalContainerDefaults, Node};
use crate::crd::v1beta1::TeamCity;
use crate::labels;

use super::env::{build_env_vars, startup_properties_to_server_opts};

/// Desired shape of a node's workload set, computed fresh on every reconcile.
#[must_use]
pub fn build(cluster: &TeamCity, node: &Node, role: &str) -> StatefulSet {
    let namespace = cluster.namespace().unwrap_or_default();
    let labels = labels::workload_set_labels(&cluster.name_any(), &node.name, role, &node.annotations);
    let selector = LabelSelector {
        match_labels: Some(labels.clone()),
        ..LabelSelector::default()
    };

    let claims = cluster.all_persistent_volume_claims();
    let mut volumes: Vec<Volume> = claims.iter().map(|c| claim_volume(c)).collect();
    if cluster.database_secret_provided() {
        volumes.push(database_secret_volume(&cluster.spec.database_secret.secret));
    }

    let container = build_container(cluster, node, &claims);

    StatefulSet {
        metadata: ObjectMeta {
            name: Some(node.name.clone()),
            namespace: Some(namespace),
            labels: Some(labels.clone()),
            owner_references: cluster.controller_owner_ref(&()).map(|r| vec![r]),
            ..ObjectMeta::default()
        },
        spec: Some(StatefulSetSpec {
            replicas: Some(1),
            service_name: node.name.clone(),
            selector,
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    annotations: Some(node.annotations.clone()),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    init_containers: Some(node.spec.init_containers.clone()),
                    node_selector: node.spec.node_selector.clone(),
                    affinity: node.spec.affinity.clone(),
                    security_context: node.spec.pod_security_context.clone(),
                    volumes: Some(volumes),
                    ..PodSpec::default()
                }),
            },
            ..StatefulSetSpec::default()
        }),
        status: None,
    }
}

fn claim_volume(claim: &CustomPersistentVolumeClaim) -> Volume {
    Volume {
        name: claim.name.clone(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: claim.name.clone(),
            read_only: None,
        }),
        ..Volume::default()
    }
}

fn database_secret_volume(secret_name: &str) -> Volume {
    Volume {
        name: DATABASE_PROPERTIES_VOLUME_NAME.to_owned(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_owned()),
            ..SecretVolumeSource::default()
        }),
        ..Volume::default()
    }
}

fn build_container(cluster: &TeamCity, node: &Node, claims: &[&CustomPersistentVolumeClaim]) -> Container {
    let defaults: &GlobalContainerDefaults = &cluster.spec.container_defaults;
    let data_dir = cluster.data_dir_path();

    let mut responsibilities_suffix = String::new();
    if !node.spec.responsibilities.is_empty() {
        let joined = node.spec.responsibilities.iter().cloned().collect::<Vec<_>>().join(",");
        responsibilities_suffix = format!(" -Dteamcity.server.responsibilities={joined}");
    }
    let mut extra_server_opts = startup_properties_to_server_opts(&cluster.spec.startup_properties_config);
    extra_server_opts.push_str(&responsibilities_suffix);

    let memory_request_bytes = memory_request_bytes(&node.spec.requests);
    let mut env = build_env_vars(
        &node.name,
        cluster.spec.xmx_percentage,
        memory_request_bytes,
        data_dir,
        &extra_server_opts,
        &node.spec.env,
    );
    if cluster.database_secret_provided() {
        env.extend(database_env_vars(&cluster.spec.database_secret.secret));
    }

    let mut volume_mounts: Vec<_> = claims
        .iter()
        .map(|c| c.volume_mount.clone().into())
        .collect();
    if cluster.database_secret_provided() {
        volume_mounts.push(k8s_openapi::api::core::v1::VolumeMount {
            name: DATABASE_PROPERTIES_VOLUME_NAME.to_owned(),
            mount_path: format!("{data_dir}{DATABASE_PROPERTIES_MOUNT_PATH}"),
            sub_path: Some(DATABASE_PROPERTIES_SUB_PATH.to_owned()),
            ..k8s_openapi::api::core::v1::VolumeMount::default()
        });
    }

    Container {
        name: TEAMCITY_CONTAINER_NAME.to_owned(),
        image: Some(cluster.spec.image.clone()),
        image_pull_policy: Some("IfNotPresent".to_owned()),
        ports: Some(vec![defaults.container_port()]),
        env: Some(env),
        volume_mounts: Some(volume_mounts),
        resources: Some(ResourceRequirements {
            requests: node.spec.requests.requests.clone(),
            limits: node.spec.limits.limits.clone(),
            ..ResourceRequirements::default()
        }),
        liveness_probe: Some(probe_with_endpoint(
            node.spec.liveness_probe_settings.as_ref().unwrap_or(&defaults.liveness_probe_settings),
            &defaults.readiness_endpoint,
        )),
        readiness_probe: Some(probe_with_endpoint(
            node.spec.readiness_probe_settings.as_ref().unwrap_or(&defaults.readiness_probe_settings),
            &defaults.readiness_endpoint,
        )),
        startup_probe: Some(probe_with_endpoint(
            node.spec.startup_probe_settings.as_ref().unwrap_or(&defaults.startup_probe_settings),
            &defaults.health_endpoint,
        )),
        lifecycle: Some(Lifecycle {
            pre_stop: Some(LifecycleHandler {
                exec: Some(ExecAction {
                    command: Some(vec![
                        "/bin/sh".to_owned(),
                        "-c".to_owned(),
                        "/opt/teamcity/bin/shutdown.sh".to_owned(),
                    ]),
                }),
                ..LifecycleHandler::default()
            }),
            ..Lifecycle::default()
        }),
        ..Container::default()
    }
}

fn probe_with_endpoint(settings: &Probe, endpoint: &HTTPGetAction) -> Probe {
    Probe {
        http_get: Some(endpoint.clone()),
        ..settings.clone()
    }
}

fn memory_request_bytes(requests: &ResourceRequirements) -> i64 {
    requests
        .requests
        .as_ref()
        .and_then(|r| r.get("memory"))
        .and_then(|q| utils::quantity::parse_quantity_bytes(&q.0))
        .unwrap_or(0)
}

fn database_env_vars(secret_name: &str) -> Vec<k8s_openapi::api::core::v1::EnvVar> {
    let from_key = |key: &str| {
        Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: Some(secret_name.to_owned()),
                key: key.to_owned(),
                optional: None,
            }),
            ..EnvVarSource::default()
        })
    };
    vec![
        k8s_openapi::api::core::v1::EnvVar {
            name: "TEAMCITY_DB_USER".to_owned(),
            value_from: from_key("connectionProperties.user"),
            ..k8s_openapi::api::core::v1::EnvVar::default()
        },
        k8s_openapi::api::core::v1::EnvVar {
            name: "TEAMCITY_DB_PASSWORD".to_owned(),
            value_from: from_key("connectionProperties.password"),
            ..k8s_openapi::api::core::v1::EnvVar::default()
        },
        k8s_openapi::api::core::v1::EnvVar {
            name: "TEAMCITY_DB_URL".to_owned(),
            value_from: from_key("connectionUrl"),
            ..k8s_openapi::api::core::v1::EnvVar::default()
        },
    ]
}

/// All workload sets owned by `cluster`: main first, then every secondary (4.E.2's desired set).
#[must_use]
pub fn build_all(cluster: &TeamCity) -> Vec<StatefulSet> {
    let mut sets = vec![build(cluster, &cluster.spec.main_node, operator_api::consts::ROLE_MAIN)];
    sets.extend(
        cluster
            .spec
            .secondary_nodes
            .iter()
            .map(|n| build(cluster, n, operator_api::consts::ROLE_SECONDARY)),
    );
    sets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::minimal_cluster;

    #[test]
    fn main_workload_set_is_pinned_to_a_single_replica() {
        let cluster = minimal_cluster("test", "default");
        let sts = build(&cluster, &cluster.spec.main_node, operator_api::consts::ROLE_MAIN);
        assert_eq!(sts.spec.unwrap().replicas, Some(1));
    }

    #[test]
    fn container_env_includes_heap_and_data_path() {
        let cluster = minimal_cluster("test", "default");
        let sts = build(&cluster, &cluster.spec.main_node, operator_api::consts::ROLE_MAIN);
        let container = &sts.spec.unwrap().template.spec.unwrap().containers[0];
        let env = container.env.as_ref().unwrap();
        assert!(env.iter().any(|v| v.name == "TEAMCITY_SERVER_MEM_OPTS"));
        assert!(env.iter().any(|v| v.name == "TEAMCITY_DATA_PATH"));
    }

    #[test]
    fn database_secret_adds_volume_and_db_env_vars() {
        let cluster = crate::crd::test_fixtures::with_database_secret(minimal_cluster("test", "default"), "db-secret");
        let sts = build(&cluster, &cluster.spec.main_node, operator_api::consts::ROLE_MAIN);
        let pod = sts.spec.unwrap().template.spec.unwrap();
        assert!(pod.volumes.unwrap().iter().any(|v| v.name == "database-properties"));
        let env = pod.containers[0].env.as_ref().unwrap();
        assert!(env.iter().any(|v| v.name == "TEAMCITY_DB_USER"));
    }

    #[test]
    fn build_all_orders_main_before_secondaries() {
        let cluster = crate::crd::test_fixtures::with_secondary(minimal_cluster("test", "default"), "secondary-1");
        let sets = build_all(&cluster);
        assert_eq!(sets[0].metadata.name.as_deref(), Some("main"));
        assert_eq!(sets[1].metadata.name.as_deref(), Some("secondary-1"));
    }
}
