//! `v1beta1` is the hub version: the current, multi-node, checkpoint-aware shape of the
//! cluster object, with the data-dir claim distinguished from the rest of the claim list.

use garde::Validate;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{
    CustomPersistentVolumeClaim, DatabaseSecret, GlobalContainerDefaults, IngressEntry, Node,
    ServiceAccountSpec, ServiceEntry, TeamCityStatus,
};

/// The TeamCity cluster object, current shape.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, Validate)]
#[kube(
    group = "jetbrains.com",
    version = "v1beta1",
    kind = "TeamCity",
    namespaced,
    status = "TeamCityStatus",
    shortname = "tc",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct TeamCitySpec {
    #[garde(length(min = 1))]
    pub image: String,
    #[garde(dive)]
    pub main_node: Node,
    #[serde(default)]
    #[garde(dive)]
    pub secondary_nodes: Vec<Node>,
    #[garde(dive)]
    pub data_dir_volume_claim: CustomPersistentVolumeClaim,
    #[serde(default)]
    #[garde(dive)]
    pub persistent_volume_claims: Vec<CustomPersistentVolumeClaim>,
    #[garde(range(min = 1))]
    pub xmx_percentage: i64,
    #[garde(dive)]
    pub container_defaults: GlobalContainerDefaults,
    #[serde(default)]
    #[garde(dive)]
    pub database_secret: DatabaseSecret,
    #[serde(default)]
    #[garde(skip)]
    pub startup_properties_config: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    #[garde(dive)]
    pub service_list: Vec<ServiceEntry>,
    #[serde(default)]
    #[garde(dive)]
    pub ingress_list: Vec<IngressEntry>,
    #[serde(default)]
    #[garde(skip)]
    pub service_account: Option<ServiceAccountSpec>,
}

impl TeamCity {
    #[must_use]
    pub fn is_multi_node(&self) -> bool {
        !self.spec.secondary_nodes.is_empty()
    }

    #[must_use]
    pub fn data_dir_path(&self) -> &str {
        &self.spec.data_dir_volume_claim.volume_mount.mount_path
    }

    /// Secondaries first, then main -- the engine relies on this order for precondition checks.
    #[must_use]
    pub fn all_nodes(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.spec.secondary_nodes.iter().collect();
        nodes.push(&self.spec.main_node);
        nodes
    }

    /// Additional claims first, then the distinguished data-dir claim.
    #[must_use]
    pub fn all_persistent_volume_claims(&self) -> Vec<&CustomPersistentVolumeClaim> {
        let mut claims: Vec<&CustomPersistentVolumeClaim> =
            self.spec.persistent_volume_claims.iter().collect();
        claims.push(&self.spec.data_dir_volume_claim);
        claims
    }

    #[must_use]
    pub fn database_secret_provided(&self) -> bool {
        !self.spec.database_secret.secret.is_empty()
    }

    #[must_use]
    pub fn startup_properties_provided(&self) -> bool {
        !self.spec.startup_properties_config.is_empty()
    }

    #[must_use]
    pub fn service_account_provided(&self) -> bool {
        self.spec.service_account.is_some()
    }

    #[must_use]
    pub fn uses_zero_down_time_upgrade_policy(&self) -> bool {
        self.annotations()
            .get(operator_api::consts::UPDATE_POLICY_ANNOTATION)
            .map(String::as_str)
            == Some(operator_api::consts::UPDATE_POLICY_ZERO_DOWN_TIME)
    }
}

impl Node {
    #[must_use]
    pub fn uses_update_with_ro_policy(&self) -> bool {
        self.annotations
            .get(operator_api::consts::UPDATE_POLICY_ANNOTATION)
            .map(String::as_str)
            == Some(operator_api::consts::UPDATE_POLICY_UPDATE_WITH_RO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::minimal_cluster;

    #[test]
    fn all_nodes_orders_secondaries_before_main() {
        let mut cluster = minimal_cluster("test", "default");
        cluster.spec.secondary_nodes.push(Node {
            name: "secondary-1".to_owned(),
            ..Node::default()
        });
        let names: Vec<&str> = cluster.all_nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["secondary-1", "main"]);
    }

    #[test]
    fn is_multi_node_reflects_secondary_presence() {
        let mut cluster = minimal_cluster("test", "default");
        assert!(!cluster.is_multi_node());
        cluster.spec.secondary_nodes.push(Node::default());
        assert!(cluster.is_multi_node());
    }
}
