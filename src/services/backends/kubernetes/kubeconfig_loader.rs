
use crate::configuration::models::informer_registry_settings::KubeConfigSource;
use anyhow::bail;
use async_trait::async_trait;
use kube::Config;
use kube::config::Kubeconfig;
use log::{debug, info};
use std::process::Command;

/// Produces the client configuration the informer registry connects with.
#[async_trait]
pub trait KubeConfigLoader: Send + Sync {
    async fn load(&self) -> anyhow::Result<Config>;
}

#[async_trait]
impl KubeConfigLoader for KubeConfigSource {
    async fn load(&self) -> anyhow::Result<Config> {
        match self {
            KubeConfigSource::File { path } => from_file(path).await,
            KubeConfigSource::Command { command } => from_command(command).await,
            KubeConfigSource::InCluster => from_cluster(),
        }
    }
}

/// Runs `command` with `sh -c` and reads a kubeconfig document from its stdout.
pub async fn from_command(command: &str) -> anyhow::Result<Config> {
    info!("Loading kubeconfig from command: {:?}", command);
    let output = Command::new("sh").arg("-c").arg(command).output()?;
    if !output.status.success() {
        bail!(
            "Failed to execute command: {:?}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    from_yaml(&String::from_utf8(output.stdout)?).await
}

pub async fn from_file(path: &str) -> anyhow::Result<Config> {
    info!("Loading kubeconfig file: {:?}", path);
    let kubeconfig = tokio::fs::read_to_string(path).await?;
    from_yaml(&kubeconfig).await
}

pub fn from_cluster() -> anyhow::Result<Config> {
    info!("Loading in-cluster Kubernetes configuration");
    Ok(Config::incluster()?)
}

async fn from_yaml(kubeconfig: &str) -> anyhow::Result<Config> {
    let kubeconfig: Kubeconfig = serde_yml::from_str(kubeconfig)?;
    debug!(
        "Using kubeconfig context {:?}",
        kubeconfig.current_context.as_deref().unwrap_or_default()
    );
    Ok(Config::from_custom_kubeconfig(kubeconfig, &Default::default()).await?)
}
