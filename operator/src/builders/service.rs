//! Front-end `Service` builder (4.E.3).

use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

use crate::crd::v1beta1::TeamCity;
use crate::labels;

/// One desired `Service` per entry in `cluster.spec.service_list`, named and shaped from the
/// entry; labels recomputed from D and the owner reference (re)set to the cluster.
#[must_use]
pub fn build_all(cluster: &TeamCity) -> Vec<Service> {
    let namespace = cluster.namespace().unwrap_or_default();
    cluster
        .spec
        .service_list
        .iter()
        .map(|entry| Service {
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
    use crate::crd::common::ServiceEntry;
    use crate::crd::test_fixtures::minimal_cluster;

    #[test]
    fn builds_one_service_per_entry() {
        let mut cluster = minimal_cluster("test", "default");
        cluster.spec.service_list = vec![ServiceEntry {
            name: "tc-http".to_owned(),
            ..ServiceEntry::default()
        }];
        let services = build_all(&cluster);
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].metadata.name.as_deref(), Some("tc-http"));
    }
}
