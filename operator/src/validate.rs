//! Admission validation (Component C): structural checks run on create/update.
//!
//! Field-shape checks (non-empty names, positive percentages) are expressed as `garde`
//! annotations directly on the CRD types (`crd::common`, `crd::v1beta1`) and run via
//! `garde::Validate::validate`. The checks below are the ones `garde` cannot express on its
//! own: cross-field and cross-node invariants, plus the database-secret content check grounded
//! on `internal/validator/database_secret_validator.go`.

use std::collections::BTreeMap;

use garde::Validate;
use k8s_openapi::api::core::v1::Secret;
use thiserror::Error;

use operator_api::consts::{
    ALL_RESPONSIBILITIES, DATABASE_SECRET_KEY, RESP_CAN_PROCESS_USER_DATA_MODIFICATION_REQUESTS,
    RESP_MAIN_NODE,
};

use crate::crd::v1beta1::TeamCity;

/// Rejects the write.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("spec validation failed: {0}")]
    Field(#[from] garde::Report),
    #[error("spec.mainNode.spec.requests is missing a memory request")]
    MissingMainMemoryRequest,
    #[error("spec.secondaryNodes[{0}].spec.requests is missing a memory request")]
    MissingSecondaryMemoryRequest(usize),
    #[error("node responsibility sets are invalid: {0}")]
    InvalidResponsibilities(String),
    #[error("database secret {secret:?} is missing required key {key:?}")]
    DatabaseSecretMissingKey { secret: String, key: &'static str },
    #[error("database secret {secret:?} is missing required property {property:?}")]
    DatabaseSecretMissingProperty { secret: String, property: &'static str },
}

/// A non-fatal observation accompanying an otherwise successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning(pub String);

/// Runs every structural check in Component C against `cluster`.
///
/// # Errors
/// The first violated invariant is returned; callers surface it as the admission rejection
/// message.
pub fn validate_cluster(cluster: &TeamCity) -> Result<Vec<Warning>, ValidationError> {
    cluster.spec.validate(&())?;

    if memory_request(&cluster.spec.main_node.spec.requests).is_none() {
        return Err(ValidationError::MissingMainMemoryRequest);
    }
    for (idx, node) in cluster.spec.secondary_nodes.iter().enumerate() {
        if memory_request(&node.spec.requests).is_none() {
            return Err(ValidationError::MissingSecondaryMemoryRequest(idx));
        }
    }

    let warnings = validate_responsibilities(cluster).map_err(ValidationError::InvalidResponsibilities)?;
    Ok(warnings)
}

fn memory_request(requests: &k8s_openapi::api::core::v1::ResourceRequirements) -> Option<&str> {
    requests
        .requests
        .as_ref()?
        .get("memory")
        .map(|q| q.0.as_str())
        .filter(|s| !s.is_empty())
}

/// Invariant (5): if any node declares responsibilities, main must be a superset of the two
/// mandatory ones and a subset of the full set; every secondary must be a subset of the four
/// non-`MAIN_NODE` values. Returns an advisory warning (never an error) when the union across
/// all nodes is a strict subset of the full five-element set.
fn validate_responsibilities(cluster: &TeamCity) -> Result<Vec<Warning>, String> {
    let any_declared = !cluster.spec.main_node.spec.responsibilities.is_empty()
        || cluster
            .spec
            .secondary_nodes
            .iter()
            .any(|n| !n.spec.responsibilities.is_empty());
    if !any_declared {
        return Ok(Vec::new());
    }

    let all: std::collections::BTreeSet<&str> = ALL_RESPONSIBILITIES.iter().copied().collect();
    let main = &cluster.spec.main_node.spec.responsibilities;

    let mandatory = [RESP_MAIN_NODE, RESP_CAN_PROCESS_USER_DATA_MODIFICATION_REQUESTS];
    for resp in mandatory {
        if !main.contains(resp) {
            return Err(format!(
                "main node must include responsibility {resp:?}, got {main:?}"
            ));
        }
    }
    if let Some(bogus) = main.iter().find(|r| !all.contains(r.as_str())) {
        return Err(format!("main node declares unknown responsibility {bogus:?}"));
    }

    let non_main: std::collections::BTreeSet<&str> = all
        .iter()
        .copied()
        .filter(|r| *r != RESP_MAIN_NODE)
        .collect();
    for (idx, node) in cluster.spec.secondary_nodes.iter().enumerate() {
        for resp in &node.spec.responsibilities {
            if !non_main.contains(resp.as_str()) {
                return Err(format!(
                    "secondary node {idx} declares a responsibility it may not hold: {resp:?}"
                ));
            }
        }
    }

    let mut union: std::collections::BTreeSet<&str> = main.iter().map(String::as_str).collect();
    for node in &cluster.spec.secondary_nodes {
        union.extend(node.spec.responsibilities.iter().map(String::as_str));
    }
    if union != all {
        let missing: Vec<&str> = all.difference(&union).copied().collect();
        return Ok(vec![Warning(format!(
            "responsibilities {missing:?} are not claimed by any node"
        ))]);
    }
    Ok(Vec::new())
}

/// Checks that `secret` carries a well-formed `database.properties` entry (Component C,
/// supplemented by `internal/validator/database_secret_validator.go`).
///
/// # Errors
/// Returns the specific missing key or property.
pub fn validate_database_secret(secret_name: &str, secret: &Secret) -> Result<(), ValidationError> {
    let data = secret.data.as_ref();
    let content = data
        .and_then(|d| d.get(DATABASE_SECRET_KEY))
        .ok_or_else(|| ValidationError::DatabaseSecretMissingKey {
            secret: secret_name.to_owned(),
            key: DATABASE_SECRET_KEY,
        })?;

    let properties = parse_properties(&content.0);
    for required in ["connectionUrl", "connectionProperties.user", "connectionProperties.password"] {
        if !properties.contains_key(required) {
            return Err(ValidationError::DatabaseSecretMissingProperty {
                secret: secret_name.to_owned(),
                property: match required {
                    "connectionUrl" => "connectionUrl",
                    "connectionProperties.user" => "connectionProperties.user",
                    _ => "connectionProperties.password",
                },
            });
        }
    }
    Ok(())
}

fn parse_properties(bytes: &[u8]) -> BTreeMap<String, String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::minimal_cluster;
    use k8s_openapi::ByteString;
    use operator_api::consts::{
        RESP_CAN_CHECK_FOR_CHANGES, RESP_CAN_PROCESS_BUILD_MESSAGES, RESP_CAN_PROCESS_BUILD_TRIGGERS,
    };

    #[test]
    fn minimal_cluster_validates_cleanly() {
        let cluster = minimal_cluster("test", "default");
        assert_eq!(validate_cluster(&cluster).unwrap(), Vec::new());
    }

    #[test]
    fn zero_xmx_percentage_is_rejected() {
        let mut cluster = minimal_cluster("test", "default");
        cluster.spec.xmx_percentage = 0;
        assert!(validate_cluster(&cluster).is_err());
    }

    #[test]
    fn missing_memory_request_is_rejected() {
        let mut cluster = minimal_cluster("test", "default");
        cluster.spec.main_node.spec.requests.requests = None;
        assert!(matches!(
            validate_cluster(&cluster),
            Err(ValidationError::MissingMainMemoryRequest)
        ));
    }

    #[test]
    fn incomplete_responsibility_union_is_a_warning_not_an_error() {
        let mut cluster = minimal_cluster("test", "default");
        cluster.spec.main_node.spec.responsibilities = [
            RESP_MAIN_NODE.to_owned(),
            RESP_CAN_PROCESS_USER_DATA_MODIFICATION_REQUESTS.to_owned(),
        ]
        .into_iter()
        .collect();
        let warnings = validate_cluster(&cluster).unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn complete_responsibility_union_produces_no_warning() {
        let mut cluster = minimal_cluster("test", "default");
        cluster.spec.main_node.spec.responsibilities = [
            RESP_MAIN_NODE.to_owned(),
            RESP_CAN_PROCESS_USER_DATA_MODIFICATION_REQUESTS.to_owned(),
        ]
        .into_iter()
        .collect();
        cluster = crate::crd::test_fixtures::with_secondary(cluster, "secondary-1");
        cluster.spec.secondary_nodes[0].spec.responsibilities = [
            RESP_CAN_PROCESS_BUILD_MESSAGES.to_owned(),
            RESP_CAN_CHECK_FOR_CHANGES.to_owned(),
            RESP_CAN_PROCESS_BUILD_TRIGGERS.to_owned(),
        ]
        .into_iter()
        .collect();
        assert_eq!(validate_cluster(&cluster).unwrap(), Vec::new());
    }

    #[test]
    fn database_secret_requires_all_three_properties() {
        let mut data = std::collections::BTreeMap::new();
        data.insert(
            DATABASE_SECRET_KEY.to_owned(),
            ByteString(b"connectionUrl=jdbc:postgresql://db/tc\nconnectionProperties.user=tc".to_vec()),
        );
        let secret = Secret {
            data: Some(data),
            ..Secret::default()
        };
        let err = validate_database_secret("db-sec", &secret).unwrap_err();
        assert!(matches!(err, ValidationError::DatabaseSecretMissingProperty { .. }));
    }
}
