//! Deterministic label sets for selection, ownership, and role tagging.
//!
//! Grounded on `internal/metadata/label.go`: default labels always win; user-provided labels
//! only fill gaps.

use std::collections::BTreeMap;

use operator_api::consts::{LABEL_COMPONENT, LABEL_COMPONENT_VALUE, LABEL_NAME, LABEL_NODE_NAME, LABEL_PART_OF, LABEL_PART_OF_VALUE, LABEL_ROLE};

fn default_labels(cluster_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_owned(), cluster_name.to_owned()),
        (LABEL_COMPONENT.to_owned(), LABEL_COMPONENT_VALUE.to_owned()),
        (LABEL_PART_OF.to_owned(), LABEL_PART_OF_VALUE.to_owned()),
    ])
}

/// Default labels for any object owned by `cluster_name`, with `user_labels` merged in without
/// overriding any default key.
#[must_use]
pub fn cluster_labels(cluster_name: &str, user_labels: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut labels = default_labels(cluster_name);
    for (k, v) in user_labels {
        labels.entry(k.clone()).or_insert_with(|| v.clone());
    }
    labels
}

/// The label selector for a cluster's owned objects: the default labels alone, with no node or
/// role qualifier. Matches every object this operator owns regardless of role.
#[must_use]
pub fn cluster_selector(cluster_name: &str) -> BTreeMap<String, String> {
    default_labels(cluster_name)
}

/// Labels (and matching selector) for a single workload set: default labels plus the node name
/// and role.
#[must_use]
pub fn workload_set_labels(
    cluster_name: &str,
    node_name: &str,
    role: &str,
    user_labels: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut labels = cluster_labels(cluster_name, user_labels);
    labels.insert(LABEL_NODE_NAME.to_owned(), node_name.to_owned());
    labels.insert(LABEL_ROLE.to_owned(), role.to_owned());
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keys_are_never_overridden_by_user_labels() {
        let mut user = BTreeMap::new();
        user.insert(LABEL_NAME.to_owned(), "attacker-controlled".to_owned());
        user.insert("team".to_owned(), "ci-platform".to_owned());

        let labels = cluster_labels("test", &user);
        assert_eq!(labels.get(LABEL_NAME).map(String::as_str), Some("test"));
        assert_eq!(labels.get("team").map(String::as_str), Some("ci-platform"));
    }

    #[test]
    fn workload_set_labels_add_node_and_role_without_losing_defaults() {
        let labels = workload_set_labels("test", "main", operator_api::consts::ROLE_MAIN, &BTreeMap::new());
        assert_eq!(labels.get(LABEL_NODE_NAME).map(String::as_str), Some("main"));
        assert_eq!(labels.get(LABEL_ROLE).map(String::as_str), Some(operator_api::consts::ROLE_MAIN));
        assert_eq!(labels.get(LABEL_NAME).map(String::as_str), Some("test"));
    }

    #[test]
    fn selector_matches_workload_set_default_subset() {
        let selector = cluster_selector("test");
        let sts_labels = workload_set_labels("test", "main", operator_api::consts::ROLE_MAIN, &BTreeMap::new());
        assert!(selector.iter().all(|(k, v)| sts_labels.get(k) == Some(v)));
    }
}
