//! Optional dedicated `ServiceAccount` builder (4.E.3).

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

use crate::crd::v1beta1::TeamCity;
use crate::labels;

/// `None` when the cluster doesn't request a dedicated service account.
#[must_use]
pub fn build(cluster: &TeamCity) -> Option<ServiceAccount> {
    let account = cluster.spec.service_account.as_ref()?;
    let namespace = cluster.namespace().unwrap_or_default();
    Some(ServiceAccount {
        metadata: ObjectMeta {
            name: Some(account.name.clone()),
            namespace: Some(namespace),
            labels: Some(labels::cluster_labels(&cluster.name_any(), &std::collections::BTreeMap::new())),
            owner_references: cluster.controller_owner_ref(&()).map(|r| vec![r]),
            ..ObjectMeta::default()
        },
        ..ServiceAccount::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::common::ServiceAccountSpec;
    use crate::crd::test_fixtures::minimal_cluster;

    #[test]
    fn absent_when_not_requested() {
        let cluster = minimal_cluster("test", "default");
        assert!(build(&cluster).is_none());
    }

    #[test]
    fn builds_named_account_when_requested() {
        let mut cluster = minimal_cluster("test", "default");
        cluster.spec.service_account = Some(ServiceAccountSpec { name: "tc-sa".to_owned() });
        let account = build(&cluster).expect("account");
        assert_eq!(account.metadata.name.as_deref(), Some("tc-sa"));
    }
}
