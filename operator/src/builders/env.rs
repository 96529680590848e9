//! Deterministic environment variable construction for a node's container.
//!
//! Grounded on `internal/resource/statefulset_utils.go`: `MY_IP` is always a `fieldRef`
//! pointing at `status.podIP`, prepended ahead of every other variable; the remaining defaults
//! (`TEAMCITY_DATA_PATH`, `TEAMCITY_LOGS_PATH`, `TEAMCITY_SERVER_MEM_OPTS`,
//! `TEAMCITY_SERVER_OPTS`) are merged with the node's own `env` map -- the node's value wins on
//! key collision -- then emitted in sorted-key order so rebuilding the same inputs always
//! produces byte-identical `EnvVar` lists and never trips a spurious statefulset diff.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, ObjectFieldSelector};

use utils::quantity::{decimal_quantity, heap_bytes};

/// `-Xmx<value>`, where `<value>` is the decimal-quantity rendering of
/// `xmx_percentage% of memory_request_bytes` (`internal/resource/statefulset_utils.go`'s
/// `xmxValueCalculator`).
#[must_use]
pub fn server_mem_opts(xmx_percentage: i64, memory_request_bytes: i64) -> String {
    format!("-Xmx{}", decimal_quantity(heap_bytes(xmx_percentage, memory_request_bytes)))
}

/// The fixed JVM flags plus the per-node heap-dump path, node id, root URL, and any startup-
/// properties-derived `-D` flags appended verbatim at the end.
#[must_use]
pub fn server_opts(data_dir_path: &str, node_name: &str, extra_server_opts: &str) -> String {
    format!(
        "-XX:+HeapDumpOnOutOfMemoryError -XX:+DisableExplicitGC \
         -XX:HeapDumpPath={data_dir_path}/memoryDumps/{node_name} \
         -Dteamcity.server.nodeId={node_name} \
         -Dteamcity.server.rootURL=http://$(MY_IP){extra_server_opts}"
    )
}

/// Renders `startup_properties` as space-separated `-Dkey=value` flags, sorted by key so the
/// result is stable across reconciles.
#[must_use]
pub fn startup_properties_to_server_opts(startup_properties: &BTreeMap<String, String>) -> String {
    startup_properties
        .iter()
        .map(|(k, v)| format!(" -D{k}={v}"))
        .collect()
}

fn pod_ip_env_var() -> EnvVar {
    EnvVar {
        name: "MY_IP".to_owned(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                field_path: "status.podIP".to_owned(),
                ..ObjectFieldSelector::default()
            }),
            ..EnvVarSource::default()
        }),
        ..EnvVar::default()
    }
}

/// Builds the full, deterministically-ordered env var list for a node's container.
#[must_use]
pub fn build_env_vars(
    node_name: &str,
    xmx_percentage: i64,
    memory_request_bytes: i64,
    data_dir_path: &str,
    extra_server_opts: &str,
    node_env: &BTreeMap<String, String>,
) -> Vec<EnvVar> {
    let mut merged = BTreeMap::new();
    merged.insert("TEAMCITY_DATA_PATH".to_owned(), data_dir_path.to_owned());
    merged.insert("TEAMCITY_LOGS_PATH".to_owned(), format!("{data_dir_path}/logs"));
    merged.insert(
        "TEAMCITY_SERVER_MEM_OPTS".to_owned(),
        server_mem_opts(xmx_percentage, memory_request_bytes),
    );
    merged.insert(
        "TEAMCITY_SERVER_OPTS".to_owned(),
        server_opts(data_dir_path, node_name, extra_server_opts),
    );
    for (k, v) in node_env {
        merged.insert(k.clone(), v.clone());
    }

    let mut vars = Vec::with_capacity(merged.len() + 1);
    vars.push(pod_ip_env_var());
    vars.extend(merged.into_iter().map(|(name, value)| EnvVar {
        name,
        value: Some(value),
        ..EnvVar::default()
    }));
    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_env_overrides_default_on_key_collision() {
        let mut node_env = BTreeMap::new();
        node_env.insert("TEAMCITY_DATA_PATH".to_owned(), "/custom".to_owned());
        let vars = build_env_vars("main", 95, 1_000_000_000, "/data", "", &node_env);
        let data_path = vars.iter().find(|v| v.name == "TEAMCITY_DATA_PATH").unwrap();
        assert_eq!(data_path.value.as_deref(), Some("/custom"));
    }

    #[test]
    fn pod_ip_is_always_first_and_uses_field_ref() {
        let vars = build_env_vars("main", 95, 1_000_000_000, "/data", "", &BTreeMap::new());
        assert_eq!(vars[0].name, "MY_IP");
        assert!(vars[0].value_from.is_some());
    }

    #[test]
    fn env_var_order_is_deterministic_across_calls() {
        let mut node_env = BTreeMap::new();
        node_env.insert("ZZZ".to_owned(), "1".to_owned());
        node_env.insert("AAA".to_owned(), "2".to_owned());
        let a = build_env_vars("main", 95, 1_000_000_000, "/data", "", &node_env);
        let b = build_env_vars("main", 95, 1_000_000_000, "/data", "", &node_env);
        let names_a: Vec<&str> = a.iter().map(|v| v.name.as_str()).collect();
        let names_b: Vec<&str> = b.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names_a, names_b);
        assert_eq!(names_a, vec!["MY_IP", "AAA", "TEAMCITY_DATA_PATH", "TEAMCITY_LOGS_PATH", "TEAMCITY_SERVER_MEM_OPTS", "TEAMCITY_SERVER_OPTS", "ZZZ"]);
    }

    #[test]
    fn startup_properties_are_sorted_and_flag_formatted() {
        let mut props = BTreeMap::new();
        props.insert("teamcity.z".to_owned(), "1".to_owned());
        props.insert("teamcity.a".to_owned(), "2".to_owned());
        assert_eq!(
            startup_properties_to_server_opts(&props),
            " -Dteamcity.a=2 -Dteamcity.z=1"
        );
    }
}
