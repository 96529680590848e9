//! Standalone `PersistentVolumeClaim` builder (4.E.3).
//!
//! Covers every claim in `TeamCity::all_persistent_volume_claims` -- the data-dir claim and any
//! additional claims -- as opposed to `builders::statefulset`, which only references these
//! claims by name when wiring pod volumes.

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

use crate::crd::v1beta1::TeamCity;
use crate::labels;

#[must_use]
pub fn build_all(cluster: &TeamCity) -> Vec<PersistentVolumeClaim> {
    let namespace = cluster.namespace().unwrap_or_default();
    cluster
        .all_persistent_volume_claims()
        .into_iter()
        .map(|claim| PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(claim.name.clone()),
                namespace: Some(namespace.clone()),
                labels: Some(labels::cluster_labels(&cluster.name_any(), &std::collections::BTreeMap::new())),
                owner_references: cluster.controller_owner_ref(&()).map(|r| vec![r]),
                ..ObjectMeta::default()
            },
            spec: Some(claim.spec.clone()),
            status: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::minimal_cluster;

    #[test]
    fn builds_one_claim_for_data_dir() {
        let cluster = minimal_cluster("test", "default");
        let claims = build_all(&cluster);
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].metadata.name.as_deref(), Some("data-dir"));
    }
}
