//! Top-level operator lifecycle: CRD bootstrap, then run the controller and the admission
//! webhook server side by side until the process is terminated.
//!
//! Grounded on `operator-k8s/src/operator.rs`'s `Operator::new`/`run`/`prepare_crd`. The sidecar
//! heartbeat channel and its web server have no counterpart here; the admission webhook server
//! (`admission::serve`) takes their place as the operator's other long-running task.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::runtime::wait::{await_condition, conditions};
use kube::{Api, Client, CustomResourceExt, Resource};
use tracing::debug;
use utils::migration::compare_versions;

use crate::config::Config;
use crate::controller::{self, Context};
use crate::crd::v1beta1::TeamCity;

/// How long `prepare_crd` waits for the API server to report the CRD established.
const CRD_ESTABLISH_TIMEOUT: Duration = Duration::from_secs(20);

pub struct Operator {
    config: Config,
}

impl Operator {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Bootstraps the CRD, then runs the controller and the admission server until either exits.
    ///
    /// # Errors
    /// Returns `Err` if the client can't be constructed or the CRD fails to install/establish.
    pub async fn run(&self) -> Result<()> {
        let client = Client::try_default().await?;
        self.prepare_crd(&client).await?;

        let ctx = Arc::new(Context {
            client: client.clone(),
            requeue_interval: self.config.requeue_interval(),
            finalizer: self.config.finalizer.clone(),
            field_manager: self.config.field_manager.clone(),
        });

        let admission = crate::admission::serve(self.config.listen_addr.parse()?, ctx.clone());
        let controller = controller::run(client, self.config.watch_namespace(), ctx);

        tokio::select! {
            result = admission => result?,
            () = controller => {},
        }
        Ok(())
    }

    /// Installs or migrates the CRD, grounded directly on `operator-k8s/src/operator.rs`'s
    /// version comparison: create if absent, patch if the compiled definition is newer, refuse to
    /// start against a newer-than-compiled CRD unless `--create-crd` forces it.
    async fn prepare_crd(&self, client: &Client) -> Result<()> {
        let crd_api: Api<CustomResourceDefinition> = Api::all(client.clone());
        let installed: HashMap<_, _> = crd_api
            .list(&ListParams::default())
            .await?
            .items
            .into_iter()
            .filter_map(|crd| crd.metadata.name.map(|name| (name, crd.spec.versions)))
            .collect();
        let definition = TeamCity::crd();

        match installed.get(TeamCity::crd_name()) {
            None => {
                debug!("no TeamCity CRD found, creating it");
                let _: CustomResourceDefinition = crd_api.create(&PostParams::default(), &definition).await?;
            }
            Some(versions) => {
                let compiled = TeamCity::version(&());
                debug!(version = %compiled, "found TeamCity CRD");
                let newer_installed = versions
                    .iter()
                    .any(|v| compare_versions(v.name.as_str(), &compiled).is_ok_and(|o| o == Ordering::Greater));
                if newer_installed && !self.config.create_crd {
                    anyhow::bail!(
                        "a newer TeamCity CRD version is already installed; pass --create-crd to force-patch it"
                    );
                }
                let compiled_is_newest = versions
                    .iter()
                    .all(|v| compare_versions(v.name.as_str(), &compiled).is_ok_and(|o| o != Ordering::Greater));
                if compiled_is_newest || self.config.create_crd {
                    debug!("patching TeamCity CRD to the compiled version");
                    let _: CustomResourceDefinition = crd_api
                        .patch(TeamCity::crd_name(), &PatchParams::default(), &Patch::Merge(&definition))
                        .await?;
                }
            }
        }

        let establish = await_condition(crd_api, TeamCity::crd_name(), conditions::is_crd_established());
        tokio::time::timeout(CRD_ESTABLISH_TIMEOUT, establish).await??;
        debug!("CRD established");
        Ok(())
    }
}
