//! Front-end `Ingress` builder (4.E.3).

use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

use crate::crd::v1beta1::TeamCity;
use crate::labels;

/// One desired `Ingress` per entry in `cluster.spec.ingress_list`.
#[must_use]
pub fn build_all(cluster: &TeamCity) -> Vec<Ingress> {
    let namespace = cluster.namespace().unwrap_or_default();
    cluster
        .spec
        .ingress_list
        .iter()
        .map(|entry| Ingress {
            metadata: ObjectMeta {
                name: Some(entry.name.clone()),
                namespace: Some(namespace.clone()),
                labels: Some(labels::cluster_labels(&cluster.name_any(), &entry.annotations)),
                annotations: Some(entry.annotations.clone()),
                owner_references: cluster.controller_owner_ref(&()).map(|r| vec![r]),
                ..ObjectMeta::default()
            },
            spec: Some(entry.spec.clone()),
            status: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::common::IngressEntry;
    use crate::crd::test_fixtures::minimal_cluster;

    #[test]
    fn builds_one_ingress_per_entry() {
        let mut cluster = minimal_cluster("test", "default");
        cluster.spec.ingress_list = vec![IngressEntry {
            name: "tc-web".to_owned(),
            ..IngressEntry::default()
        }];
        let ingresses = build_all(&cluster);
        assert_eq!(ingresses.len(), 1);
        assert_eq!(ingresses[0].metadata.name.as_deref(), Some("tc-web"));
    }
}
