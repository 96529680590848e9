//! `v1alpha1` is the legacy (spoke) shape of the cluster object: a single flat
//! `persistentVolumeClaims` list whose first entry plays the role `v1beta1` gives its own
//! distinguished `dataDirVolumeClaim` field. Kept only for conversion (`crd::convert`); the
//! reconciliation engine always operates on `v1beta1::TeamCity`.

use garde::Validate;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{
    CustomPersistentVolumeClaim, DatabaseSecret, GlobalContainerDefaults, IngressEntry, Node,
    ServiceAccountSpec, ServiceEntry, TeamCityStatus,
};

/// The TeamCity cluster object, legacy shape.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, Validate)]
#[kube(
    group = "jetbrains.com",
    version = "v1alpha1",
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
    /// First entry is the distinguished data-dir claim; see `crd::convert`.
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
