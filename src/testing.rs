use crate::contracts::authorization::v1::cluster_policy::{ClusterPolicy, ClusterPolicySpec};
use crate::contracts::authorization::v1::policy::{Policy, PolicySpec};
use crate::services::backends::kubernetes::resource_update_handler::{
    ResourceUpdate, ResourceUpdateHandler,
};
use async_trait::async_trait;
use kube::{Client, Config, CustomResource, Resource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub mod fake_list_watch;
#[cfg(test)]
pub mod informer_registry_context;

pub use fake_list_watch::FakeListWatch;

/// Cluster-scoped resource used to exercise informers independently of the authorization kinds.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "testing.authorization.io",
    version = "v1",
    kind = "Widget",
    plural = "widgets"
)]
pub struct WidgetSpec {
    pub size: u32,
}

pub fn widget(name: &str) -> Widget {
    Widget::new(name, WidgetSpec::default())
}

pub fn labeled_widget(name: &str, labels: &[(&str, &str)]) -> Widget {
    let mut widget = widget(name);
    widget.metadata.labels = Some(
        labels
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<BTreeMap<_, _>>(),
    );
    widget
}

pub fn cluster_policy(name: &str) -> ClusterPolicy {
    ClusterPolicy::new(name, ClusterPolicySpec::default())
}

pub fn policy(namespace: &str, name: &str) -> Policy {
    let mut policy = Policy::new(name, PolicySpec::default());
    policy.metadata.namespace = Some(namespace.to_string());
    policy
}

/// A client for an address nothing listens on. Every remote call fails; useful to prove
/// that a test is served by an override. Must be created inside a tokio runtime.
///
/// COVERAGE: disabled since this is a testing helper
#[cfg_attr(coverage, coverage(off))]
pub fn unreachable_client() -> Client {
    let config = Config::new("http://127.0.0.1:9".parse().expect("valid cluster url"));
    Client::try_from(config).expect("client for an unreachable cluster")
}

/// Polls `condition` until it holds or `timeout` elapses. Returns the last result.
pub async fn eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return condition();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Remembers the names of the objects it was handed.
pub struct RecordingUpdateHandler<K> {
    applied: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    failures: AtomicUsize,
    _resource: PhantomData<fn() -> K>,
}

impl<K> RecordingUpdateHandler<K> {
    pub fn new() -> Self {
        RecordingUpdateHandler {
            applied: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            failures: AtomicUsize::new(0),
            _resource: PhantomData,
        }
    }

    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().expect("applied lock").clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().expect("deleted lock").clone()
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

impl<K> Default for RecordingUpdateHandler<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K> ResourceUpdateHandler<K> for RecordingUpdateHandler<K>
where
    K: Resource + Send + Sync + 'static,
{
    async fn handle_update(&self, update: &ResourceUpdate<K>) {
        match update {
            ResourceUpdate::Applied(object) => {
                self.applied.lock().expect("applied lock").push(object.name_any())
            }
            ResourceUpdate::Deleted(object) => {
                self.deleted.lock().expect("deleted lock").push(object.name_any())
            }
            ResourceUpdate::Failed(_) => {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}
