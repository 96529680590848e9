//! Builders producing literal `TeamCity` objects for the property and scenario tests described
//! in the testable-properties section: minimal single-node clusters, with a database secret,
//! with startup properties, multi-node, and so on. Kept in its own module (rather than copy-
//! pasted into every test module) so every component's tests start from the same fixtures.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::common::{ClaimVolumeMount, CustomPersistentVolumeClaim, Node, NodeSpec};
use super::v1beta1::{TeamCity, TeamCitySpec};

fn resource_requirements(memory: &str, cpu: &str) -> ResourceRequirements {
    let mut requests = BTreeMap::new();
    requests.insert("memory".to_owned(), Quantity(memory.to_owned()));
    requests.insert("cpu".to_owned(), Quantity(cpu.to_owned()));
    ResourceRequirements {
        requests: Some(requests),
        ..ResourceRequirements::default()
    }
}

/// Scenario 1: a minimal single-node cluster with one data-dir claim.
#[must_use]
pub fn minimal_cluster(name: &str, namespace: &str) -> TeamCity {
    TeamCity {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some(namespace.to_owned()),
            ..ObjectMeta::default()
        },
        spec: TeamCitySpec {
            image: "jetbrains/teamcity-server:latest".to_owned(),
            main_node: Node {
                name: "main".to_owned(),
                spec: NodeSpec {
                    requests: resource_requirements("1000", "1"),
                    ..NodeSpec::default()
                },
                ..Node::default()
            },
            data_dir_volume_claim: CustomPersistentVolumeClaim {
                name: "data-dir".to_owned(),
                volume_mount: ClaimVolumeMount {
                    name: "default-storage".to_owned(),
                    mount_path: "/storage".to_owned(),
                },
                spec: Default::default(),
            },
            xmx_percentage: 95,
            ..TeamCitySpec::default()
        },
        status: None,
    }
}

/// Scenario 2: adds a database secret reference.
#[must_use]
pub fn with_database_secret(mut cluster: TeamCity, secret_name: &str) -> TeamCity {
    cluster.spec.database_secret.secret = secret_name.to_owned();
    cluster
}

/// Scenario 3: adds startup properties.
#[must_use]
pub fn with_startup_properties(mut cluster: TeamCity, props: &[(&str, &str)]) -> TeamCity {
    cluster.spec.startup_properties_config = props
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    cluster
}

/// Scenario 5/6: adds a secondary node with the given name.
#[must_use]
pub fn with_secondary(mut cluster: TeamCity, name: &str) -> TeamCity {
    cluster.spec.secondary_nodes.push(Node {
        name: name.to_owned(),
        spec: NodeSpec {
            requests: resource_requirements("1000", "1"),
            ..NodeSpec::default()
        },
        ..Node::default()
    });
    cluster
}
