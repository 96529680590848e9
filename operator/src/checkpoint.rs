//! Checkpoint store (Component G): the external, cluster-namespaced record of upgrade progress.
//!
//! Grounded on `internal/checkpoint/checkpoint.go` and `internal/checkpoint/stage.go`: the
//! checkpoint is a `ConfigMap` named `update-checkpoint-<cluster>` with a single data key
//! `stage`. Unlike the source this is grounded on -- whose `DoCheckpointWithDesiredStage` calls
//! `Update` and then unconditionally returns `nil`, discarding any write error -- every write
//! path here returns `Result` and a failed write is always surfaced to the caller.

use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use thiserror::Error;

use operator_api::consts::{CHECKPOINT_NAME_PREFIX, CHECKPOINT_STAGE_KEY};
use operator_api::Stage;

use crate::crd::v1beta1::TeamCity;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint {0:?} carries an unparseable stage tag {1:?}")]
    UnparseableStage(String, String),
    #[error("checkpoint {0:?} is missing its {key:?} data key", key = CHECKPOINT_STAGE_KEY)]
    MissingStageKey(String),
    #[error("cannot advance checkpoint {name:?} from {current} to {desired}: not a legal transition")]
    IllegalTransition { name: String, current: Stage, desired: Stage },
    #[error("kubernetes api error")]
    Kube(#[from] kube::Error),
}

/// Name of the checkpoint `ConfigMap` for `cluster_name`.
#[must_use]
pub fn checkpoint_name(cluster_name: &str) -> String {
    format!("{CHECKPOINT_NAME_PREFIX}-{cluster_name}")
}

pub struct Checkpoint {
    api: Api<ConfigMap>,
    name: String,
    field_manager: String,
}

impl Checkpoint {
    #[must_use]
    pub fn new(client: Client, namespace: &str, cluster_name: &str, field_manager: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            name: checkpoint_name(cluster_name),
            field_manager: field_manager.to_owned(),
        }
    }

    /// Reads the current stage, if the checkpoint object exists.
    ///
    /// # Errors
    /// Returns `MissingStageKey`/`UnparseableStage` if the object exists but is malformed, or
    /// `Kube` for any API error other than not-found.
    pub async fn fetch_current(&self) -> Result<Option<Stage>, CheckpointError> {
        match self.api.get(&self.name).await {
            Ok(cm) => self.stage_from_config_map(&cm).map(Some),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn stage_from_config_map(&self, cm: &ConfigMap) -> Result<Stage, CheckpointError> {
        let raw = cm
            .data
            .as_ref()
            .and_then(|d| d.get(CHECKPOINT_STAGE_KEY))
            .ok_or_else(|| CheckpointError::MissingStageKey(self.name.clone()))?;
        Stage::parse(raw).ok_or_else(|| CheckpointError::UnparseableStage(self.name.clone(), raw.clone()))
    }

    /// Creates the checkpoint at `stage` via server-side apply. Idempotent: re-applying the same
    /// stage is a no-op.
    ///
    /// # Errors
    /// Propagates any Kubernetes API error.
    pub async fn create(&self, namespace: &str, stage: Stage) -> Result<(), CheckpointError> {
        self.write(namespace, stage).await
    }

    /// # Errors
    /// Propagates any Kubernetes API error.
    pub async fn update(&self, namespace: &str, stage: Stage) -> Result<(), CheckpointError> {
        self.write(namespace, stage).await
    }

    async fn write(&self, namespace: &str, stage: Stage) -> Result<(), CheckpointError> {
        let cm = ConfigMap {
            metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(namespace.to_owned()),
                ..Default::default()
            },
            data: Some(std::collections::BTreeMap::from([(
                CHECKPOINT_STAGE_KEY.to_owned(),
                stage.to_string(),
            )])),
            ..ConfigMap::default()
        };
        self.api
            .patch(&self.name, &PatchParams::apply(&self.field_manager), &Patch::Apply(&cm))
            .await?;
        Ok(())
    }

    /// Deletes the checkpoint, tolerating a prior delete.
    ///
    /// # Errors
    /// Propagates any Kubernetes API error other than not-found.
    pub async fn delete(&self) -> Result<(), CheckpointError> {
        match self.api.delete(&self.name, &kube::api::DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads the current stage (creating the checkpoint at its initial stage if absent) then
    /// advances to `desired`, enforcing invariant (6). Every failure path -- including the
    /// initial create -- surfaces as `Err`.
    ///
    /// # Errors
    /// Returns `IllegalTransition` if `desired` doesn't satisfy invariant (6), or any error from
    /// the underlying read/write.
    pub async fn try_advance(&self, namespace: &str, cluster: &TeamCity, desired: Stage) -> Result<Stage, CheckpointError> {
        let current = match self.fetch_current().await? {
            Some(stage) => stage,
            None => {
                let initial = initial_stage(cluster);
                self.create(namespace, initial).await?;
                initial
            }
        };
        if !current.can_advance_to(desired) {
            return Err(CheckpointError::IllegalTransition {
                name: self.name.clone(),
                current,
                desired,
            });
        }
        if desired != current {
            self.update(namespace, desired).await?;
        }
        Ok(desired)
    }
}

/// `ReplicaReady` for a multi-node cluster (a secondary already serves as the natural read-only
/// replica), else `UpdateInitiated`.
#[must_use]
pub fn initial_stage(cluster: &TeamCity) -> Stage {
    if cluster.is_multi_node() {
        Stage::ReplicaReady
    } else {
        Stage::UpdateInitiated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::{minimal_cluster, with_secondary};

    #[test]
    fn checkpoint_name_is_prefixed_with_cluster() {
        assert_eq!(checkpoint_name("my-cluster"), "update-checkpoint-my-cluster");
    }

    #[test]
    fn initial_stage_is_replica_ready_for_multi_node() {
        let cluster = with_secondary(minimal_cluster("test", "default"), "secondary-1");
        assert_eq!(initial_stage(&cluster), Stage::ReplicaReady);
    }

    #[test]
    fn initial_stage_is_update_initiated_for_single_node() {
        let cluster = minimal_cluster("test", "default");
        assert_eq!(initial_stage(&cluster), Stage::UpdateInitiated);
    }
}
