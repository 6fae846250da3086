
use duration_string::DurationString;
use serde::Deserialize;

/// Settings for building a [`SharedInformerRegistry`] from a configuration file.
///
/// [`SharedInformerRegistry`]: crate::services::backends::kubernetes::informer_registry::SharedInformerRegistry
#[derive(Debug, Clone, Deserialize)]
pub struct InformerRegistrySettings {
    /// Interval between full relists of every informer, e.g. `10m`. `0s` disables resync.
    pub resync_interval: DurationString,
    pub kubeconfig: KubeConfigSource,
}

/// Where the Kubernetes client configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum KubeConfigSource {
    /// A kubeconfig file on disk.
    File { path: String },
    /// A shell command printing a kubeconfig document to stdout.
    Command { command: String },
    /// The service account mounted into the pod.
    InCluster,
}
