//! Ephemeral read-only replica created and destroyed only by the upgrade state machine (4.E.4),
//! and the recreation-detection check that decides whether H must run at all (4.E.5).
//!
//! Grounded on `internal/resource/update_with_ro_utils.go`: `BuildROStatefulSet` /
//! `UpdateROStatefulSet` copy the main node's pod template and recompute only the environment,
//! and `ChangesRequireNodeStatefulSetRestart` compares a freshly-built desired pod spec against
//! the live one via a semantic superset check.

use k8s_openapi::api::apps::v1::StatefulSet;

use operator_api::consts::{RO_NODE_SUFFIX, ROLE_UPDATE_WITH_RO};

use crate::crd::common::Node;
use crate::crd::v1beta1::TeamCity;

use super::statefulset;

/// Name of the read-only replica derived from the main node's name.
#[must_use]
pub fn replica_name(cluster: &TeamCity) -> String {
    format!("{}{RO_NODE_SUFFIX}", cluster.spec.main_node.name)
}

/// Desired shape of the read-only replica: the main node's pod template, same resource requests,
/// environment recomputed under the replica's own name so `TEAMCITY_SERVER_OPTS`'s node id and
/// heap-dump path match the replica rather than main.
#[must_use]
pub fn build(cluster: &TeamCity) -> StatefulSet {
    let mut replica_node = cluster.spec.main_node.clone();
    replica_node.name = replica_name(cluster);
    statefulset::build(cluster, &replica_node, ROLE_UPDATE_WITH_RO)
}

/// True iff the desired pod spec for `node` is not already a semantic superset of `existing`'s
/// pod spec -- i.e. applying the desired spec would change something the live object doesn't
/// already have. Drives the H entry criterion for the zero-downtime policy.
#[must_use]
pub fn changes_require_restart(cluster: &TeamCity, node: &Node, existing: &StatefulSet) -> bool {
    let desired = statefulset::build(cluster, node, super::role_for(cluster, node));
    let Some(desired_pod) = desired.spec.and_then(|s| s.template.spec) else {
        return false;
    };
    let Some(existing_pod) = existing.spec.clone().and_then(|s| s.template.spec) else {
        return true;
    };
    !is_semantic_superset(&existing_pod, &desired_pod)
}

/// Deep-derivative-style comparison: every field the desired spec sets must equal the existing
/// spec's value. Unset fields on the desired side never force a restart (an `Option::None` is
/// satisfied by anything), matching `equality.Semantic.DeepDerivative`'s treatment of zero values.
fn is_semantic_superset(
    existing: &k8s_openapi::api::core::v1::PodSpec,
    desired: &k8s_openapi::api::core::v1::PodSpec,
) -> bool {
    let existing_json = serde_json::to_value(existing).unwrap_or_default();
    let desired_json = serde_json::to_value(desired).unwrap_or_default();
    json_is_derivative_subset(&desired_json, &existing_json)
}

fn json_is_derivative_subset(desired: &serde_json::Value, existing: &serde_json::Value) -> bool {
    match (desired, existing) {
        (serde_json::Value::Null, _) => true,
        (serde_json::Value::Object(d), serde_json::Value::Object(e)) => d
            .iter()
            .all(|(k, v)| e.get(k).is_some_and(|ev| json_is_derivative_subset(v, ev)) || is_zero(v)),
        (serde_json::Value::Array(d), serde_json::Value::Array(e)) => {
            d.len() == e.len() && d.iter().zip(e).all(|(dv, ev)| json_is_derivative_subset(dv, ev))
        }
        (d, e) => d == e,
    }
}

fn is_zero(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(a) => a.is_empty(),
        serde_json::Value::Object(o) => o.is_empty(),
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::minimal_cluster;

    #[test]
    fn replica_name_appends_suffix_to_main() {
        let cluster = minimal_cluster("test", "default");
        assert_eq!(replica_name(&cluster), "main-update-replica");
    }

    #[test]
    fn identical_spec_does_not_require_restart() {
        let cluster = minimal_cluster("test", "default");
        let existing = statefulset::build(&cluster, &cluster.spec.main_node, operator_api::consts::ROLE_MAIN);
        assert!(!changes_require_restart(&cluster, &cluster.spec.main_node, &existing));
    }

    #[test]
    fn image_change_requires_restart() {
        let cluster = minimal_cluster("test", "default");
        let existing = statefulset::build(&cluster, &cluster.spec.main_node, operator_api::consts::ROLE_MAIN);
        let mut changed = cluster.clone();
        changed.spec.image = "jetbrains/teamcity-server:new".to_owned();
        assert!(changes_require_restart(&changed, &changed.spec.main_node, &existing));
    }
}
