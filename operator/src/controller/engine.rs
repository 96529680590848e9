//! Reconciliation engine (Component I): the per-event logic that runs for a single cluster.
//!
//! Grounded on `deploy/src/controller/cluster.rs`'s `ClusterController` for the shape of a single
//! pass (extract fields, build every child in a fixed order, surface errors per-step) and on
//! `internal/controller/checkpoint_stages.go`'s dispatcher for how the upgrade gate interacts
//! with the ordinary sweep. Builder writes go through server-side apply (`builders::apply`)
//! instead of the Go source's manual get-then-update, so "create-or-update with conflict retry"
//! reduces to a single idempotent patch per desired object.

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use kube::api::{ListParams, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::runtime::controller::Action;
use kube::{Api, Client, ResourceExt};
use thiserror::Error;
use tracing::{info, warn};

use operator_api::consts::{LABEL_NAME, LABEL_ROLE, ROLE_SECONDARY};

use crate::builders;
use crate::checkpoint::Checkpoint;
use crate::crd::common::TeamCityStatus;
use crate::crd::v1beta1::TeamCity;
use crate::predicate;
use crate::upgrade;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cluster object is missing {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Checkpoint(#[from] crate::checkpoint::CheckpointError),
    #[error(transparent)]
    Upgrade(#[from] crate::upgrade::UpgradeError),
    #[error("kubernetes api error")]
    Kube(#[from] kube::Error),
    #[error("finalizer bookkeeping failed")]
    Finalizer(#[source] Box<kube::runtime::finalizer::Error<EngineError>>),
}

/// Shared state handed to every reconcile.
pub struct Context {
    pub client: Client,
    pub requeue_interval: Duration,
    pub finalizer: String,
    pub field_manager: String,
}

/// Runs one full reconcile pass for `cluster` (Component I's steps 3-7; fetch and
/// finalize-on-delete are handled by the caller via `kube::runtime::finalizer`).
///
/// # Errors
/// Any error here is terminal for this reconcile and is recorded on `Status` by the caller.
pub async fn reconcile(cluster: &TeamCity, ctx: &Context) -> Result<Action, EngineError> {
    let namespace = cluster
        .namespace()
        .ok_or(EngineError::MissingField(".metadata.namespace"))?;
    let client = &ctx.client;

    let checkpoint = Checkpoint::new(client.clone(), &namespace, &cluster.name_any(), &ctx.field_manager);
    let current_stage = checkpoint.fetch_current().await?;
    let ongoing = current_stage.is_some();

    let zero_down_time = cluster.uses_zero_down_time_upgrade_policy();
    let any_node_requires_restart = if zero_down_time {
        any_node_requires_restart(client, &namespace, cluster).await?
    } else {
        false
    };

    if upgrade::upgrade_needed(ongoing, any_node_requires_restart) {
        let stage = match current_stage {
            Some(stage) => stage,
            None => crate::checkpoint::initial_stage(cluster),
        };
        let outcome = upgrade::step(client, &namespace, &ctx.field_manager, cluster, &checkpoint, stage).await?;
        if outcome.requeue {
            return Ok(Action::requeue(ctx.requeue_interval));
        }
    }

    let upgrade_active = checkpoint.fetch_current().await?.is_some();
    sweep(client, &namespace, &ctx.field_manager, cluster, upgrade_active).await?;

    if !zero_down_time {
        let main_converged = main_converged(client, &namespace, cluster, upgrade_active).await?;
        if !main_converged {
            return Ok(Action::requeue(ctx.requeue_interval));
        }
    }

    write_status_if_changed(client, &namespace, &ctx.field_manager, cluster, TeamCityStatus::success("Successfully reconciled")).await?;

    if checkpoint.fetch_current().await?.is_some() {
        return Ok(Action::requeue(ctx.requeue_interval));
    }
    Ok(Action::requeue(ctx.requeue_interval * 10))
}

/// Called on delete, after the finalizer's cleanup event fires. Owner references already cascade-
/// delete every child object; there is nothing left to do beyond the finalizer removal itself,
/// which `kube::runtime::finalizer` performs once this returns successfully.
///
/// # Errors
/// Never currently fails; kept fallible to match the `finalizer()` callback signature.
pub async fn cleanup(cluster: &TeamCity) -> Result<Action, EngineError> {
    info!(cluster = %cluster.name_any(), "cluster deleted, owner-reference cascade will remove children");
    Ok(Action::await_change())
}

async fn any_node_requires_restart(client: &Client, namespace: &str, cluster: &TeamCity) -> Result<bool, EngineError> {
    let api: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);
    for node in cluster.all_nodes() {
        if !node.uses_update_with_ro_policy() && !cluster.uses_zero_down_time_upgrade_policy() {
            continue;
        }
        if let Ok(existing) = api.get(&node.name).await {
            if builders::replica::changes_require_restart(cluster, node, &existing) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Sweep step: deletes obsolete children, then creates-or-updates every desired object in the
/// fixed builder order (main set, secondary sets, services, ingresses, claims, service account).
/// Workload-set and claim writes are gated by Component F's update predicates: a write is skipped
/// entirely when the live object's spec already matches the desired one, rather than sending the
/// API server a no-op patch on every pass.
async fn sweep(client: &Client, namespace: &str, field_manager: &str, cluster: &TeamCity, upgrade_active: bool) -> Result<(), EngineError> {
    let main_converged = main_converged(client, namespace, cluster, upgrade_active).await?;

    delete_obsolete_statefulsets(client, namespace, cluster).await?;
    let main = builders::statefulset::build(cluster, &cluster.spec.main_node, operator_api::consts::ROLE_MAIN);
    apply_statefulset_if_changed(client, namespace, field_manager, &main).await?;

    if main_converged {
        for node in &cluster.spec.secondary_nodes {
            let desired = builders::statefulset::build(cluster, node, ROLE_SECONDARY);
            apply_statefulset_if_changed(client, namespace, field_manager, &desired).await?;
        }
    }

    let desired_services: std::collections::BTreeSet<String> =
        cluster.spec.service_list.iter().map(|s| s.name.clone()).collect();
    delete_obsolete_by_name::<Service>(client, namespace, cluster, &desired_services).await;
    for service in builders::service::build_all(cluster) {
        builders::apply(client, namespace, field_manager, &service).await?;
    }

    let desired_ingresses: std::collections::BTreeSet<String> =
        cluster.spec.ingress_list.iter().map(|i| i.name.clone()).collect();
    delete_obsolete_by_name::<k8s_openapi::api::networking::v1::Ingress>(client, namespace, cluster, &desired_ingresses).await;
    for ingress in builders::ingress::build_all(cluster) {
        builders::apply(client, namespace, field_manager, &ingress).await?;
    }

    let desired_claims: std::collections::BTreeSet<String> =
        cluster.all_persistent_volume_claims().iter().map(|c| c.name.clone()).collect();
    delete_obsolete_by_name::<k8s_openapi::api::core::v1::PersistentVolumeClaim>(client, namespace, cluster, &desired_claims).await;
    for claim in builders::pvc::build_all(cluster) {
        apply_pvc_if_changed(client, namespace, field_manager, &claim).await?;
    }

    if let Some(account) = builders::service_account::build(cluster) {
        builders::apply::<ServiceAccount>(client, namespace, field_manager, &account).await?;
    }
    Ok(())
}

/// Applies `desired` unless a live `StatefulSet` of the same name already has an equivalent spec
/// (Component F's `statefulset_update_passes`), so an unchanged child costs a `get` instead of a
/// `get` plus a patch.
async fn apply_statefulset_if_changed(client: &Client, namespace: &str, field_manager: &str, desired: &StatefulSet) -> Result<(), EngineError> {
    let api: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);
    let should_apply = match api.get_opt(&desired.name_any()).await? {
        Some(live) => predicate::statefulset_update_passes(&live, desired),
        None => true,
    };
    if should_apply {
        builders::apply(client, namespace, field_manager, desired).await?;
    }
    Ok(())
}

/// Same gating as `apply_statefulset_if_changed`, for `PersistentVolumeClaim`s.
async fn apply_pvc_if_changed(
    client: &Client,
    namespace: &str,
    field_manager: &str,
    desired: &k8s_openapi::api::core::v1::PersistentVolumeClaim,
) -> Result<(), EngineError> {
    let api: Api<k8s_openapi::api::core::v1::PersistentVolumeClaim> = Api::namespaced(client.clone(), namespace);
    let should_apply = match api.get_opt(&desired.name_any()).await? {
        Some(live) => predicate::pvc_update_passes(&live, desired),
        None => true,
    };
    if should_apply {
        builders::apply(client, namespace, field_manager, desired).await?;
    }
    Ok(())
}

/// Lists every object of kind `K` owned by `cluster` (matched by the default label set) and
/// deletes any whose name is not in `desired`. Logged rather than surfaced: a transient list
/// failure here shouldn't fail the whole sweep when the create/update half can still proceed.
async fn delete_obsolete_by_name<K>(
    client: &Client,
    namespace: &str,
    cluster: &TeamCity,
    desired: &std::collections::BTreeSet<String>,
) where
    K: kube::Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + serde::de::DeserializeOwned + std::fmt::Debug + ResourceExt,
{
    let api: Api<K> = Api::namespaced(client.clone(), namespace);
    let selector = format!("{LABEL_NAME}={}", cluster.name_any());
    match api.list(&ListParams::default().labels(&selector)).await {
        Ok(live) => {
            for item in live.items {
                let name = item.name_any();
                if !desired.contains(&name) {
                    if let Err(e) = builders::delete_if_present::<K>(client, namespace, &name).await {
                        warn!(error = %e, object = %name, "failed to delete obsolete object");
                    }
                }
            }
        }
        Err(e) => warn!(error = %e, "failed to list objects for obsolete check"),
    }
}

/// Lists every secondary workload set in-namespace and deletes the ones whose name is no longer
/// in the desired set (4.E.2's `GetObsoleteObjects`).
async fn delete_obsolete_statefulsets(client: &Client, namespace: &str, cluster: &TeamCity) -> Result<(), EngineError> {
    let api: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);
    let selector = format!("{LABEL_NAME}={},{LABEL_ROLE}={ROLE_SECONDARY}", cluster.name_any());
    let desired: std::collections::BTreeSet<&str> =
        cluster.spec.secondary_nodes.iter().map(|n| n.name.as_str()).collect();
    let live = api.list(&ListParams::default().labels(&selector)).await?;
    for item in live.items {
        let name = item.name_any();
        if !desired.contains(name.as_str()) {
            builders::delete_if_present::<StatefulSet>(client, namespace, &name).await?;
        }
    }
    Ok(())
}

/// Precondition for secondary workload sets: main must be fully converged and no upgrade active.
async fn main_converged(client: &Client, namespace: &str, cluster: &TeamCity, upgrade_active: bool) -> Result<bool, EngineError> {
    if upgrade_active {
        return Ok(false);
    }
    let api: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);
    let Ok(main) = api.get(&cluster.spec.main_node.name).await else {
        return Ok(false);
    };
    let Some(status) = main.status.as_ref() else {
        return Ok(false);
    };
    let observed_matches = main.metadata.generation.is_some() && main.metadata.generation == status.observed_generation;
    let revisions_match = status.current_revision.is_some() && status.current_revision == status.update_revision;
    let one_ready = status.ready_replicas == Some(1);
    Ok(observed_matches && revisions_match && one_ready)
}

async fn write_status_if_changed(
    client: &Client,
    namespace: &str,
    field_manager: &str,
    cluster: &TeamCity,
    status: TeamCityStatus,
) -> Result<(), EngineError> {
    if cluster.status.as_ref() == Some(&status) {
        return Ok(());
    }
    let api: Api<TeamCity> = Api::namespaced(client.clone(), namespace);
    let patch = serde_json::json!({ "status": status });
    api.patch_status(&cluster.name_any(), &PatchParams::apply(field_manager), &kube::api::Patch::Merge(&patch))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::test_fixtures::minimal_cluster;

    #[test]
    fn status_is_considered_unchanged_when_equal() {
        let mut cluster = minimal_cluster("test", "default");
        let status = TeamCityStatus::success("Successfully reconciled");
        cluster.status = Some(status.clone());
        assert_eq!(cluster.status.as_ref(), Some(&status));
    }
}
