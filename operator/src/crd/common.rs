//! Types shared, field-for-field, between the two API versions of the cluster object.
//!
//! Per the version-conversion surface (`crd::convert`), only the shape of the persistent-volume-
//! claim list differs between `v1alpha1` and `v1beta1`; everything else here maps identically.

use std::collections::BTreeMap;

use garde::Validate;
use k8s_openapi::api::core::v1::{
    Affinity, Container, ContainerPort, HTTPGetAction, PersistentVolumeClaimSpec,
    PodSecurityContext, Probe, ResourceRequirements, ServiceSpec, VolumeMount,
};
use k8s_openapi::api::networking::v1::IngressSpec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A main or secondary node within a cluster.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema, Validate)]
pub struct Node {
    #[garde(length(min = 1))]
    pub name: String,
    #[serde(default)]
    #[garde(skip)]
    pub annotations: BTreeMap<String, String>,
    #[garde(dive)]
    pub spec: NodeSpec,
}

/// Per-node resource shape and behavior. `requests` is mandatory: the heap-size calculation in
/// the main workload set builder depends on `requests.memory` being present.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema, Validate)]
pub struct NodeSpec {
    #[garde(skip)]
    pub requests: ResourceRequirements,
    #[serde(default)]
    #[garde(skip)]
    pub limits: ResourceRequirements,
    #[serde(default)]
    #[garde(skip)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    #[garde(skip)]
    pub init_containers: Vec<Container>,
    #[serde(default)]
    #[garde(skip)]
    pub node_selector: Option<BTreeMap<String, String>>,
    #[serde(default)]
    #[garde(skip)]
    pub affinity: Option<Affinity>,
    #[serde(default)]
    #[garde(skip)]
    pub pod_security_context: Option<PodSecurityContext>,
    #[serde(default)]
    #[garde(skip)]
    pub liveness_probe_settings: Option<Probe>,
    #[serde(default)]
    #[garde(skip)]
    pub readiness_probe_settings: Option<Probe>,
    #[serde(default)]
    #[garde(skip)]
    pub startup_probe_settings: Option<Probe>,
    /// Closed set drawn from `operator_api::consts::ALL_RESPONSIBILITIES`.
    #[serde(default)]
    #[garde(skip)]
    pub responsibilities: BTreeSet<String>,
}

/// A persistent volume claim the cluster wants mounted into the main and every secondary node.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema, Validate)]
pub struct CustomPersistentVolumeClaim {
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(dive)]
    pub volume_mount: ClaimVolumeMount,
    #[garde(skip)]
    pub spec: PersistentVolumeClaimSpec,
}

/// The subset of `VolumeMount` a claim needs; both fields are required (invariant 3).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema, Validate)]
pub struct ClaimVolumeMount {
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(length(min = 1))]
    pub mount_path: String,
}

impl From<ClaimVolumeMount> for VolumeMount {
    fn from(value: ClaimVolumeMount) -> Self {
        Self {
            name: value.name,
            mount_path: value.mount_path,
            ..VolumeMount::default()
        }
    }
}

/// Reference to a secret carrying `database.properties`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema, Validate)]
pub struct DatabaseSecret {
    #[serde(default)]
    #[garde(skip)]
    pub secret: String,
}

/// A named front-end `Service` the operator should materialize alongside the cluster.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema, Validate)]
pub struct ServiceEntry {
    #[garde(length(min = 1))]
    pub name: String,
    #[serde(default)]
    #[garde(skip)]
    pub annotations: BTreeMap<String, String>,
    #[garde(skip)]
    pub spec: ServiceSpec,
}

/// A named front-end `Ingress` the operator should materialize alongside the cluster.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema, Validate)]
pub struct IngressEntry {
    #[garde(length(min = 1))]
    pub name: String,
    #[serde(default)]
    #[garde(skip)]
    pub annotations: BTreeMap<String, String>,
    #[garde(skip)]
    pub spec: IngressSpec,
}

/// Optional dedicated `ServiceAccount` for the cluster's pods.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema, Validate)]
pub struct ServiceAccountSpec {
    #[garde(length(min = 1))]
    pub name: String,
}

/// `Status` subresource of the cluster object. Written only by this controller.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct TeamCityStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub message: String,
}

impl TeamCityStatus {
    pub const STATE_SUCCESS: &'static str = "success";
    pub const STATE_ERROR: &'static str = "error";

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            state: Self::STATE_SUCCESS.to_owned(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: Self::STATE_ERROR.to_owned(),
            message: message.into(),
        }
    }
}

/// Global defaults shared by every node's container, common to both API versions.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, Validate)]
pub struct GlobalContainerDefaults {
    #[garde(range(min = 1))]
    pub port: i32,
    #[serde(default)]
    #[garde(skip)]
    pub liveness_probe_settings: Probe,
    #[serde(default)]
    #[garde(skip)]
    pub readiness_probe_settings: Probe,
    #[serde(default)]
    #[garde(skip)]
    pub startup_probe_settings: Probe,
    #[garde(skip)]
    pub readiness_endpoint: HTTPGetAction,
    #[garde(skip)]
    pub health_endpoint: HTTPGetAction,
}

impl Default for GlobalContainerDefaults {
    fn default() -> Self {
        Self {
            port: 8111,
            liveness_probe_settings: Probe::default(),
            readiness_probe_settings: Probe::default(),
            startup_probe_settings: Probe::default(),
            readiness_endpoint: HTTPGetAction::default(),
            health_endpoint: HTTPGetAction::default(),
        }
    }
}

impl GlobalContainerDefaults {
    #[must_use]
    pub fn container_port(&self) -> ContainerPort {
        ContainerPort {
            name: Some("tc-server-port".to_owned()),
            container_port: self.port,
            ..ContainerPort::default()
        }
    }
}
