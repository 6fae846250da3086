
use crate::services::backends::kubernetes::indexer::{NAMESPACE_INDEX, namespaced_key};
use crate::services::backends::kubernetes::resource_kind::ResourceKind;
use crate::services::backends::kubernetes::scope_policy::InformedResource;
use crate::services::backends::kubernetes::shared_index_informer::SharedIndexInformer;
use crate::services::backends::kubernetes::status::Status;
use crate::services::backends::kubernetes::status::not_found_details::NotFoundDetails;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::Resource;
use kube::core::{Selector, SelectorExt};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only view over an informer's local store.
///
/// Reads never leave the process: they may be stale, and return nothing while the
/// informer has not synced yet. Cluster-scoped kinds are read with [`Lister::get`],
/// namespace-scoped kinds through [`Lister::namespace`].
pub struct Lister<K> {
    informer: Arc<SharedIndexInformer<K>>,
}

impl<K> Clone for Lister<K> {
    fn clone(&self) -> Self {
        Lister {
            informer: self.informer.clone(),
        }
    }
}

impl<K> Lister<K>
where
    K: InformedResource,
{
    pub fn new(informer: Arc<SharedIndexInformer<K>>) -> Self {
        Lister { informer }
    }

    pub fn kind(&self) -> &ResourceKind {
        self.informer.kind()
    }

    pub fn informer(&self) -> &Arc<SharedIndexInformer<K>> {
        &self.informer
    }

    /// Every object matching `selector`, in store order, across all namespaces.
    pub fn list(&self, selector: &Selector) -> Vec<Arc<K>> {
        filter_by_selector(self.informer.indexer().list(), selector)
    }
}

impl<K> Lister<K>
where
    K: InformedResource + Resource<Scope = ClusterResourceScope>,
{
    pub fn get(&self, name: &str) -> Result<Arc<K>, Status> {
        self.informer
            .indexer()
            .get_by_key(name)
            .ok_or_else(|| Status::NotFound(NotFoundDetails::new(self.kind().clone(), name, None)))
    }
}

impl<K> Lister<K>
where
    K: InformedResource + Resource<Scope = NamespaceResourceScope>,
{
    pub fn namespace(&self, namespace: &str) -> NamespaceLister<K> {
        NamespaceLister {
            informer: self.informer.clone(),
            namespace: namespace.to_string(),
        }
    }
}

/// Reads of a namespace-scoped kind restricted to one namespace.
pub struct NamespaceLister<K> {
    informer: Arc<SharedIndexInformer<K>>,
    namespace: String,
}

impl<K> NamespaceLister<K>
where
    K: InformedResource + Resource<Scope = NamespaceResourceScope>,
{
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn list(&self, selector: &Selector) -> Vec<Arc<K>> {
        // The namespace index is installed on every namespace-scoped informer
        let objects = self
            .informer
            .indexer()
            .by_index(NAMESPACE_INDEX, &self.namespace)
            .unwrap_or_default();
        filter_by_selector(objects, selector)
    }

    pub fn get(&self, name: &str) -> Result<Arc<K>, Status> {
        self.informer
            .indexer()
            .get_by_key(&namespaced_key(&self.namespace, name))
            .ok_or_else(|| {
                Status::NotFound(NotFoundDetails::new(
                    self.informer.kind().clone(),
                    name,
                    Some(&self.namespace),
                ))
            })
    }
}

fn filter_by_selector<K: Resource>(objects: Vec<Arc<K>>, selector: &Selector) -> Vec<Arc<K>> {
    if selector.selects_all() {
        return objects;
    }
    let no_labels = BTreeMap::new();
    objects
        .into_iter()
        .filter(|object| selector.matches(object.meta().labels.as_ref().unwrap_or(&no_labels)))
        .collect()
}
