//! Event predicates (Component F): decides whether a reconcile is worth acting on.
//!
//! Grounded on `internal/predicate/predicate.go`, adapted to where this kube version's
//! `Controller::owns` exposes no per-event predicate hook: `cluster_delete_passes` gates the
//! top-level reconcile wrapper against a delete whose final state is unknown, and
//! `statefulset_update_passes`/`pvc_update_passes` gate each child write in the sweep against the
//! live object's current spec, so a controller-only status write on a child never causes a
//! spurious patch even though it still triggers the owning cluster's reconcile.

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;

/// Whether a delete event should still trigger a reconcile. `final_state_known = false` means the
/// platform could not confirm the object's last observed state before it disappeared; the source
/// this is grounded on skips those to avoid reconciling against stale data.
#[must_use]
pub fn cluster_delete_passes(final_state_known: bool) -> bool {
    final_state_known
}

/// Workload-set updates pass only when the spec actually changed.
#[must_use]
pub fn statefulset_update_passes(old: &StatefulSet, new: &StatefulSet) -> bool {
    spec_changed(&old.spec, &new.spec)
}

/// Persistent-claim updates pass only when the spec actually changed.
#[must_use]
pub fn pvc_update_passes(old: &PersistentVolumeClaim, new: &PersistentVolumeClaim) -> bool {
    spec_changed(&old.spec, &new.spec)
}

/// `reflect.DeepEqual(x, y) || equality.Semantic.DeepDerivative(x, y)`: specs are equivalent
/// either when they're identical or when `new` is a semantic superset of `old` (fields `old` left
/// unset never count as a difference). Serializing to JSON and comparing structurally is the
/// direct Rust analogue, since these types don't implement a derivative-equality trait of their
/// own.
fn spec_changed<T: serde::Serialize>(old: &T, new: &T) -> bool {
    let old_json = serde_json::to_value(old).unwrap_or_default();
    let new_json = serde_json::to_value(new).unwrap_or_default();
    !(old_json == new_json || is_derivative_subset(&old_json, &new_json))
}

fn is_derivative_subset(old: &serde_json::Value, new: &serde_json::Value) -> bool {
    match (old, new) {
        (serde_json::Value::Null, _) => true,
        (serde_json::Value::Object(o), serde_json::Value::Object(n)) => o
            .iter()
            .all(|(k, v)| n.get(k).is_some_and(|nv| is_derivative_subset(v, nv))),
        (serde_json::Value::Array(o), serde_json::Value::Array(n)) => {
            o.len() == n.len() && o.iter().zip(n).all(|(ov, nv)| is_derivative_subset(ov, nv))
        }
        (o, n) => o == n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_with_unknown_final_state_is_filtered() {
        assert!(!cluster_delete_passes(false));
        assert!(cluster_delete_passes(true));
    }

    #[test]
    fn statefulset_update_with_unchanged_spec_is_filtered() {
        let sts = StatefulSet::default();
        let mut new = sts.clone();
        new.metadata.resource_version = Some("2".to_owned());
        assert!(!statefulset_update_passes(&sts, &new));
    }

    #[test]
    fn statefulset_update_with_changed_replicas_passes() {
        let old = StatefulSet::default();
        let mut new = old.clone();
        new.spec.get_or_insert_with(Default::default).replicas = Some(3);
        assert!(statefulset_update_passes(&old, &new));
    }
}
