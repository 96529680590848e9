//! Upgrade state machine (Component H): rotates the main node behind a temporary read-only
//! replica so the cluster never drops below one serving node mid-upgrade.
//!
//! Grounded on `internal/controller/checkpoint_stages.go`'s per-stage handlers. The
//! `ReplicaReady` handler deliberately does not requeue: advancing the checkpoint to
//! `MainShuttingDown` and returning is what lets the engine's ordinary create/update sweep
//! (Component I) restart the main workload set in the very same reconcile, rather than this
//! module reaching into the statefulset builder itself.

use k8s_openapi::api::apps::v1::StatefulSet;
use kube::{Api, Client};
use thiserror::Error;

use operator_api::Stage;

use crate::builders;
use crate::checkpoint::{Checkpoint, CheckpointError};
use crate::crd::v1beta1::TeamCity;

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("kubernetes api error")]
    Kube(#[from] kube::Error),
}

/// Outcome of a single H step.
pub struct StepOutcome {
    pub requeue: bool,
}

impl StepOutcome {
    fn requeue() -> Self {
        Self { requeue: true }
    }
    fn settle() -> Self {
        Self { requeue: false }
    }
}

/// Runs exactly one step of the state machine for `cluster`, currently sitting at `current`.
///
/// # Errors
/// Surfaces any checkpoint or Kubernetes API failure; callers treat this as a terminal error for
/// the reconcile (recorded on `Status`).
pub async fn step(
    client: &Client,
    namespace: &str,
    field_manager: &str,
    cluster: &TeamCity,
    checkpoint: &Checkpoint,
    current: Stage,
) -> Result<StepOutcome, UpgradeError> {
    match current {
        Stage::UpdateInitiated => {
            checkpoint.try_advance(namespace, cluster, Stage::ReplicaCreated).await?;
            Ok(StepOutcome::requeue())
        }
        Stage::ReplicaCreated => {
            let replica = builders::replica::build(cluster);
            builders::apply(client, namespace, field_manager, &replica).await?;
            checkpoint.try_advance(namespace, cluster, Stage::ReplicaStarting).await?;
            Ok(StepOutcome::requeue())
        }
        Stage::ReplicaStarting => {
            let api: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);
            let replica_name = builders::replica::replica_name(cluster);
            if let Ok(replica) = api.get(&replica_name).await {
                if available_replicas(&replica) > 0 {
                    checkpoint.try_advance(namespace, cluster, Stage::ReplicaReady).await?;
                }
            }
            Ok(StepOutcome::requeue())
        }
        Stage::ReplicaReady => {
            checkpoint.try_advance(namespace, cluster, Stage::MainShuttingDown).await?;
            Ok(StepOutcome::settle())
        }
        Stage::MainShuttingDown => {
            let api: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);
            if let Ok(main) = api.get(&cluster.spec.main_node.name).await {
                if is_newest_generation(&main) && node_update_finished(&main) {
                    checkpoint.try_advance(namespace, cluster, Stage::MainReady).await?;
                }
            }
            Ok(StepOutcome::requeue())
        }
        Stage::MainReady => {
            let replica_name = builders::replica::replica_name(cluster);
            builders::delete_if_present::<StatefulSet>(client, namespace, &replica_name).await?;
            checkpoint.try_advance(namespace, cluster, Stage::UpdateFinished).await?;
            Ok(StepOutcome::requeue())
        }
        Stage::UpdateFinished => {
            checkpoint.delete().await?;
            Ok(StepOutcome::settle())
        }
    }
}

/// `isNewestGeneration(sts) <=> sts.generation == sts.status.observedGeneration`.
#[must_use]
pub fn is_newest_generation(sts: &StatefulSet) -> bool {
    let generation = sts.metadata.generation;
    let observed = sts.status.as_ref().and_then(|s| s.observed_generation);
    generation.is_some() && generation == observed
}

/// `nodeUpdateFinished(sts) <=> currentRevision == updateRevision && (readyReplicas == 1 ||
/// availableReplicas == 1)`.
#[must_use]
pub fn node_update_finished(sts: &StatefulSet) -> bool {
    let Some(status) = sts.status.as_ref() else { return false };
    let revisions_match = status.current_revision.is_some() && status.current_revision == status.update_revision;
    let has_one_ready = status.ready_replicas == Some(1) || status.available_replicas == Some(1);
    revisions_match && has_one_ready
}

fn available_replicas(sts: &StatefulSet) -> i32 {
    sts.status.as_ref().and_then(|s| s.available_replicas).unwrap_or(0)
}

/// Whether the engine must enter H this reconcile: a checkpoint already exists, or any node under
/// the zero-downtime policy needs a restart.
#[must_use]
pub fn upgrade_needed(ongoing: bool, any_node_requires_restart: bool) -> bool {
    ongoing || any_node_requires_restart
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_generation_requires_matching_observed_generation() {
        let mut sts = StatefulSet {
            metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                generation: Some(3),
                ..Default::default()
            },
            ..StatefulSet::default()
        };
        assert!(!is_newest_generation(&sts));
        sts.status = Some(k8s_openapi::api::apps::v1::StatefulSetStatus {
            observed_generation: Some(3),
            ..Default::default()
        });
        assert!(is_newest_generation(&sts));
    }

    #[test]
    fn node_update_finished_requires_matching_revisions_and_one_ready() {
        let mut sts = StatefulSet {
            status: Some(k8s_openapi::api::apps::v1::StatefulSetStatus {
                current_revision: Some("rev-1".to_owned()),
                update_revision: Some("rev-1".to_owned()),
                ready_replicas: Some(1),
                ..Default::default()
            }),
            ..StatefulSet::default()
        };
        assert!(node_update_finished(&sts));
        sts.status.as_mut().unwrap().ready_replicas = None;
        assert!(!node_update_finished(&sts));
        sts.status.as_mut().unwrap().available_replicas = Some(1);
        assert!(node_update_finished(&sts));
    }

    #[test]
    fn upgrade_is_needed_when_checkpoint_already_exists() {
        assert!(upgrade_needed(true, false));
        assert!(upgrade_needed(false, true));
        assert!(!upgrade_needed(false, false));
    }
}
