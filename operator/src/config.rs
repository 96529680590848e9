use std::time::Duration;

use clap::Parser;

/// TeamCity operator config.
#[derive(Debug, Parser)]
#[non_exhaustive]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The namespace to watch.
    #[arg(long, default_value = "default")]
    pub namespace: String,
    /// Watch every namespace; `namespace` is ignored when this is true.
    #[arg(long, default_value = "false")]
    pub cluster_wide: bool,
    /// Create or patch the CRD at startup regardless of the version already installed.
    #[arg(long, default_value = "false")]
    pub create_crd: bool,
    /// The cluster's DNS suffix, used when building in-cluster URLs.
    #[arg(long, default_value = "cluster.local")]
    pub cluster_suffix: String,
    /// Delay, in seconds, before retrying a reconcile that asked to be requeued.
    #[arg(long, default_value_t = 5)]
    pub requeue_interval_secs: u64,
    /// Finalizer string attached to every cluster object. Overridable for test harnesses.
    #[arg(long, default_value_t = operator_api::consts::FINALIZER.to_owned())]
    pub finalizer: String,
    /// Server-side-apply field manager identity.
    #[arg(long, default_value_t = operator_api::consts::DEFAULT_FIELD_MANAGER.to_owned())]
    pub field_manager: String,
    /// Address the admission webhook server listens on.
    #[arg(long, default_value = "0.0.0.0:8443")]
    pub listen_addr: String,
}

impl Config {
    #[must_use]
    pub fn watch_namespace(&self) -> Option<String> {
        if self.cluster_wide {
            None
        } else {
            Some(self.namespace.clone())
        }
    }

    #[must_use]
    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_interval_secs)
    }
}
