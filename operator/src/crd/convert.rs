//! Lossless, bidirectional mapping between `v1alpha1` (legacy) and `v1beta1` (current).
//!
//! Grounded on `api/v1alpha1/teamcity_conversion.go`'s `ConvertTo`/`ConvertFrom`: the only
//! structural difference is that the current shape slices the first entry off the legacy
//! `persistentVolumeClaims` list and promotes it to a distinguished `dataDirVolumeClaim` field.
//! Every other field copies across identity-wise, including metadata and status.

use thiserror::Error;

use super::{v1alpha1, v1beta1};

/// A legacy object had an empty `persistentVolumeClaims` list, so there is no candidate for the
/// distinguished data-dir claim.
#[derive(Debug, Error)]
#[error("cannot convert v1alpha1 TeamCity {0:?}: persistentVolumeClaims is empty, expected at least one entry to promote to dataDirVolumeClaim")]
pub struct MissingDataDirClaim(Option<String>);

/// `v1alpha1 -> v1beta1`.
///
/// # Errors
/// Returns `MissingDataDirClaim` when `src.spec.persistent_volume_claims` is empty.
pub fn to_hub(src: &v1alpha1::TeamCity) -> Result<v1beta1::TeamCity, MissingDataDirClaim> {
    let mut claims = src.spec.persistent_volume_claims.clone();
    if claims.is_empty() {
        return Err(MissingDataDirClaim(src.metadata.name.clone()));
    }
    let data_dir = claims.remove(0);

    Ok(v1beta1::TeamCity {
        metadata: src.metadata.clone(),
        spec: v1beta1::TeamCitySpec {
            image: src.spec.image.clone(),
            main_node: src.spec.main_node.clone(),
            secondary_nodes: src.spec.secondary_nodes.clone(),
            data_dir_volume_claim: data_dir,
            persistent_volume_claims: claims,
            xmx_percentage: src.spec.xmx_percentage,
            container_defaults: src.spec.container_defaults.clone(),
            database_secret: src.spec.database_secret.clone(),
            startup_properties_config: src.spec.startup_properties_config.clone(),
            service_list: src.spec.service_list.clone(),
            ingress_list: src.spec.ingress_list.clone(),
            service_account: src.spec.service_account.clone(),
        },
        status: src.status.clone(),
    })
}

/// `v1beta1 -> v1alpha1`. Total: always succeeds.
#[must_use]
pub fn from_hub(src: &v1beta1::TeamCity) -> v1alpha1::TeamCity {
    let mut claims = Vec::with_capacity(src.spec.persistent_volume_claims.len() + 1);
    claims.push(src.spec.data_dir_volume_claim.clone());
    claims.extend(src.spec.persistent_volume_claims.iter().cloned());

    v1alpha1::TeamCity {
        metadata: src.metadata.clone(),
        spec: v1alpha1::TeamCitySpec {
            image: src.spec.image.clone(),
            main_node: src.spec.main_node.clone(),
            secondary_nodes: src.spec.secondary_nodes.clone(),
            persistent_volume_claims: claims,
            xmx_percentage: src.spec.xmx_percentage,
            container_defaults: src.spec.container_defaults.clone(),
            database_secret: src.spec.database_secret.clone(),
            startup_properties_config: src.spec.startup_properties_config.clone(),
            service_list: src.spec.service_list.clone(),
            ingress_list: src.spec.ingress_list.clone(),
            service_account: src.spec.service_account.clone(),
        },
        status: src.status.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::common::CustomPersistentVolumeClaim;

    fn claim(name: &str) -> CustomPersistentVolumeClaim {
        CustomPersistentVolumeClaim {
            name: name.to_owned(),
            ..CustomPersistentVolumeClaim::default()
        }
    }

    #[test]
    fn round_trip_preserves_claim_order_and_distinguishes_first_as_data_dir() {
        let mut legacy = v1alpha1::TeamCity::new("test", v1alpha1::TeamCitySpec::default());
        legacy.spec.persistent_volume_claims =
            vec![claim("data-dir"), claim("logs"), claim("cache")];

        let hub = to_hub(&legacy).expect("conversion");
        assert_eq!(hub.spec.data_dir_volume_claim.name, "data-dir");
        assert_eq!(
            hub.spec
                .persistent_volume_claims
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>(),
            vec!["logs", "cache"]
        );

        let back = from_hub(&hub);
        assert_eq!(
            back.spec
                .persistent_volume_claims
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>(),
            vec!["data-dir", "logs", "cache"]
        );
    }

    #[test]
    fn empty_claim_list_is_rejected() {
        let legacy = v1alpha1::TeamCity::new("test", v1alpha1::TeamCitySpec::default());
        assert!(to_hub(&legacy).is_err());
    }
}
