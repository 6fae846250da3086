pub mod event_stream;
#[cfg(test)]
mod tests;

use crate::services::backends::kubernetes::resource_kind::ResourceKind;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use kube::api::{ListParams, ObjectList, WatchEvent, WatchParams};
use kube::{Api, Resource};
use log::warn;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// The pair of remote calls a synchronized cache uses to stay current.
#[async_trait]
pub trait ListWatch<K>: Send + Sync
where
    K: Clone + Send + 'static,
{
    async fn list(&self, params: &ListParams) -> kube::Result<ObjectList<K>>;

    async fn watch(
        &self,
        params: &WatchParams,
        resource_version: &str,
    ) -> kube::Result<BoxStream<'static, kube::Result<WatchEvent<K>>>>;
}

#[async_trait]
impl<K> ListWatch<K> for Api<K>
where
    K: Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    async fn list(&self, params: &ListParams) -> kube::Result<ObjectList<K>> {
        Api::list(self, params).await
    }

    async fn watch(
        &self,
        params: &WatchParams,
        resource_version: &str,
    ) -> kube::Result<BoxStream<'static, kube::Result<WatchEvent<K>>>> {
        Api::watch(self, params, resource_version).await.map(StreamExt::boxed)
    }
}

/// Looks up a caller-supplied list-watch source for a resource kind.
///
/// Sources are type-erased: the value behind the returned `Any` is an
/// `Arc<dyn ListWatch<K>>` for the element type of the kind.
pub trait ListWatchResolver: Send + Sync {
    fn resolve(&self, kind: &ResourceKind) -> Option<Arc<dyn Any + Send + Sync>>;
}

/// Resolves the typed override for `kind`, if one was registered with a matching element type.
pub fn resolve_list_watch<K>(
    resolver: &dyn ListWatchResolver,
    kind: &ResourceKind,
) -> Option<Arc<dyn ListWatch<K>>>
where
    K: Clone + Send + 'static,
{
    let source = resolver.resolve(kind)?;
    match source.downcast_ref::<Arc<dyn ListWatch<K>>>() {
        Some(source) => Some(source.clone()),
        None => {
            warn!(
                "Ignoring custom list-watch for {}: it was registered for a different element type",
                kind
            );
            None
        }
    }
}

/// Map of list-watch overrides keyed by resource kind. Empty by default, so every
/// kind falls back to its remote client source.
#[derive(Clone, Default)]
pub struct CustomListWatches {
    sources: HashMap<ResourceKind, Arc<dyn Any + Send + Sync>>,
}

impl CustomListWatches {
    pub fn new() -> Self {
        CustomListWatches::default()
    }

    /// Registers `source` for the kind derived from `K`.
    pub fn with<K>(self, source: impl ListWatch<K> + 'static) -> Self
    where
        K: Resource<DynamicType = ()> + Clone + Send + 'static,
    {
        self.register(ResourceKind::of::<K>(), source)
    }

    pub fn register<K>(mut self, kind: ResourceKind, source: impl ListWatch<K> + 'static) -> Self
    where
        K: Clone + Send + 'static,
    {
        let source: Arc<dyn ListWatch<K>> = Arc::new(source);
        self.sources.insert(kind, Arc::new(source));
        self
    }

    pub fn contains(&self, kind: &ResourceKind) -> bool {
        self.sources.contains_key(kind)
    }
}

impl ListWatchResolver for CustomListWatches {
    fn resolve(&self, kind: &ResourceKind) -> Option<Arc<dyn Any + Send + Sync>> {
        self.sources.get(kind).cloned()
    }
}
