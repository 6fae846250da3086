#[cfg(test)]
mod tests;

use crate::services::backends::kubernetes::indexer::{
    Indexers, NAMESPACE_INDEX, name_key, namespace_index_func,
};
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Construction parameters that differ between cluster-scoped and namespace-scoped kinds.
pub trait ScopePolicy: Send + Sync + 'static {
    const NAMESPACED: bool;

    fn indexers<K>() -> Indexers<K>
    where
        K: Resource + 'static;

    /// The remote client source used when no override is registered.
    fn default_list_watch<K>(client: Client) -> Api<K>
    where
        K: Resource<DynamicType = ()>;
}

impl ScopePolicy for ClusterResourceScope {
    const NAMESPACED: bool = false;

    fn indexers<K>() -> Indexers<K>
    where
        K: Resource + 'static,
    {
        Indexers::new().keyed_by(name_key::<K>)
    }

    fn default_list_watch<K>(client: Client) -> Api<K>
    where
        K: Resource<DynamicType = ()>,
    {
        Api::all(client)
    }
}

impl ScopePolicy for NamespaceResourceScope {
    const NAMESPACED: bool = true;

    fn indexers<K>() -> Indexers<K>
    where
        K: Resource + 'static,
    {
        Indexers::new().with(NAMESPACE_INDEX, namespace_index_func::<K>)
    }

    /// Spans every namespace; per-namespace scoping happens in the listers.
    fn default_list_watch<K>(client: Client) -> Api<K>
    where
        K: Resource<DynamicType = ()>,
    {
        Api::all(client)
    }
}

/// A resource type the informer registry can build a synchronized cache for.
pub trait InformedResource:
    Resource<DynamicType = (), Scope: ScopePolicy>
    + Clone
    + Debug
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> InformedResource for K where
    K: Resource<DynamicType = (), Scope: ScopePolicy>
        + Clone
        + Debug
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}
