#[cfg(test)]
mod tests;

use crate::services::backends::kubernetes::status::Status;
use kube::{Resource, ResourceExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

/// Name of the index installed on namespace-scoped kinds.
pub const NAMESPACE_INDEX: &str = "namespace";

pub type IndexFunc<K> = Arc<dyn Fn(&K) -> Vec<String> + Send + Sync>;

pub type KeyFunc<K> = Arc<dyn Fn(&K) -> String + Send + Sync>;

/// The store key function and the named index functions installed on an [`Indexer`].
pub struct Indexers<K> {
    key_func: KeyFunc<K>,
    funcs: BTreeMap<String, IndexFunc<K>>,
}

impl<K> Indexers<K>
where
    K: Resource + 'static,
{
    /// Keys objects with [`object_key`] and installs no index.
    pub fn new() -> Self {
        Indexers {
            key_func: Arc::new(object_key::<K>),
            funcs: BTreeMap::new(),
        }
    }

    pub fn keyed_by<F>(mut self, func: F) -> Self
    where
        F: Fn(&K) -> String + Send + Sync + 'static,
    {
        self.key_func = Arc::new(func);
        self
    }

    pub fn with<F>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(&K) -> Vec<String> + Send + Sync + 'static,
    {
        self.funcs.insert(name.to_string(), Arc::new(func));
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.funcs.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

impl<K> Indexers<K> {
    fn key(&self, object: &K) -> String {
        (self.key_func)(object)
    }

    fn evaluate(&self, object: &K) -> BTreeMap<String, Vec<String>> {
        self.funcs
            .iter()
            .map(|(name, func)| (name.clone(), func(object)))
            .collect()
    }
}

impl<K> Default for Indexers<K>
where
    K: Resource + 'static,
{
    fn default() -> Self {
        Indexers::new()
    }
}

impl<K> Clone for Indexers<K> {
    fn clone(&self) -> Self {
        Indexers {
            key_func: self.key_func.clone(),
            funcs: self.funcs.clone(),
        }
    }
}

/// Indexes an object by its namespace. Cluster-scoped objects land under the empty value.
pub fn namespace_index_func<K: Resource>(object: &K) -> Vec<String> {
    vec![object.meta().namespace.clone().unwrap_or_default()]
}

/// Store key of an object: `namespace/name`, or just `name` without a namespace.
pub fn object_key<K: Resource>(object: &K) -> String {
    match object.meta().namespace.as_deref() {
        Some(namespace) if !namespace.is_empty() => namespaced_key(namespace, &object.name_any()),
        _ => object.name_any(),
    }
}

/// Store key of a cluster-scoped object: its name, whatever namespace it carries.
pub fn name_key<K: Resource>(object: &K) -> String {
    object.name_any()
}

pub fn namespaced_key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

struct StoredObject<K> {
    sequence: u64,
    object: Arc<K>,
    index_values: BTreeMap<String, Vec<String>>,
}

struct IndexerState<K> {
    items: HashMap<String, StoredObject<K>>,
    indices: HashMap<String, HashMap<String, HashSet<String>>>,
    next_sequence: u64,
}

impl<K> IndexerState<K> {
    fn new() -> Self {
        IndexerState {
            items: HashMap::new(),
            indices: HashMap::new(),
            next_sequence: 0,
        }
    }

    fn insert(&mut self, indexers: &Indexers<K>, key: String, object: K) -> Arc<K> {
        let sequence = match self.items.get(&key) {
            Some(existing) => existing.sequence,
            None => {
                self.next_sequence += 1;
                self.next_sequence
            }
        };
        self.remove_key(&key);

        let index_values = indexers.evaluate(&object);
        for (index_name, values) in &index_values {
            let index = self.indices.entry(index_name.clone()).or_default();
            for value in values {
                index.entry(value.clone()).or_default().insert(key.clone());
            }
        }
        let object = Arc::new(object);
        self.items.insert(
            key,
            StoredObject {
                sequence,
                object: object.clone(),
                index_values,
            },
        );
        object
    }

    fn remove_key(&mut self, key: &str) -> Option<StoredObject<K>> {
        let stored = self.items.remove(key)?;
        for (index_name, values) in &stored.index_values {
            let Some(index) = self.indices.get_mut(index_name) else {
                continue;
            };
            for value in values {
                if let Some(keys) = index.get_mut(value) {
                    keys.remove(key);
                    if keys.is_empty() {
                        index.remove(value);
                    }
                }
            }
        }
        Some(stored)
    }

    fn ordered<'a>(&self, keys: impl Iterator<Item = &'a String>) -> Vec<(String, Arc<K>)> {
        let mut entries: Vec<(u64, String, Arc<K>)> = keys
            .filter_map(|key| {
                self.items
                    .get(key)
                    .map(|stored| (stored.sequence, key.clone(), stored.object.clone()))
            })
            .collect();
        entries.sort_by_key(|(sequence, _, _)| *sequence);
        entries.into_iter().map(|(_, key, object)| (key, object)).collect()
    }
}

struct IndexerInner<K> {
    indexers: Indexers<K>,
    state: RwLock<IndexerState<K>>,
    synced: watch::Sender<bool>,
}

/// Thread-safe local store of one resource kind with named secondary indices.
///
/// Listing returns objects in insertion order: the order of the last full list,
/// followed by objects that arrived through watch events since. Clones share the
/// same underlying store.
pub struct Indexer<K> {
    inner: Arc<IndexerInner<K>>,
}

impl<K> Clone for Indexer<K> {
    fn clone(&self) -> Self {
        Indexer {
            inner: self.inner.clone(),
        }
    }
}

impl<K> Indexer<K>
where
    K: Resource + 'static,
{
    pub fn new(indexers: Indexers<K>) -> Self {
        let (synced, _) = watch::channel(false);
        Indexer {
            inner: Arc::new(IndexerInner {
                indexers,
                state: RwLock::new(IndexerState::new()),
                synced,
            }),
        }
    }

    pub fn get_by_key(&self, key: &str) -> Option<Arc<K>> {
        self.read().items.get(key).map(|stored| stored.object.clone())
    }

    pub fn list(&self) -> Vec<Arc<K>> {
        let state = self.read();
        state
            .ordered(state.items.keys())
            .into_iter()
            .map(|(_, object)| object)
            .collect()
    }

    pub fn list_keys(&self) -> Vec<String> {
        let state = self.read();
        state
            .ordered(state.items.keys())
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Objects whose index function for `index_name` produced `indexed_value`.
    pub fn by_index(&self, index_name: &str, indexed_value: &str) -> Result<Vec<Arc<K>>, Status> {
        Ok(self
            .indexed(index_name, indexed_value)?
            .into_iter()
            .map(|(_, object)| object)
            .collect())
    }

    pub fn index_keys(&self, index_name: &str, indexed_value: &str) -> Result<Vec<String>, Status> {
        Ok(self
            .indexed(index_name, indexed_value)?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    pub fn list_index_func_values(&self, index_name: &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .read()
            .indices
            .get(index_name)
            .map(|index| index.keys().cloned().collect())
            .unwrap_or_default();
        values.sort();
        values
    }

    pub fn index_names(&self) -> Vec<String> {
        self.inner.indexers.names()
    }

    /// True once the first full list has been applied.
    pub fn has_synced(&self) -> bool {
        *self.inner.synced.borrow()
    }

    pub async fn wait_until_synced(&self) {
        let mut synced = self.inner.synced.subscribe();
        // The sender lives as long as `self`, so the wait only ends once synced.
        let _ = synced.wait_for(|synced| *synced).await;
    }

    /// True when both handles point at the same store.
    pub fn ptr_eq(&self, other: &Indexer<K>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Replaces the whole content with a fresh full list and marks the store synced.
    ///
    /// Returns the stored objects in list order and the objects that were dropped
    /// because the list no longer contains them.
    pub(crate) fn replace(&self, objects: Vec<K>) -> (Vec<Arc<K>>, Vec<Arc<K>>) {
        let (applied, removed) = {
            let mut state = self.write();
            let previous = std::mem::replace(&mut *state, IndexerState::new());
            let applied: Vec<Arc<K>> = objects
                .into_iter()
                .map(|object| {
                    let key = self.inner.indexers.key(&object);
                    state.insert(&self.inner.indexers, key, object)
                })
                .collect();
            let removed: Vec<Arc<K>> = previous
                .ordered(previous.items.keys())
                .into_iter()
                .filter(|(key, _)| !state.items.contains_key(key))
                .map(|(_, object)| object)
                .collect();
            (applied, removed)
        };
        self.inner.synced.send_replace(true);
        (applied, removed)
    }

    pub(crate) fn upsert(&self, object: K) -> Arc<K> {
        let key = self.inner.indexers.key(&object);
        self.write().insert(&self.inner.indexers, key, object)
    }

    pub(crate) fn remove(&self, object: &K) -> Option<Arc<K>> {
        self.write()
            .remove_key(&self.inner.indexers.key(object))
            .map(|stored| stored.object)
    }

    fn indexed(
        &self,
        index_name: &str,
        indexed_value: &str,
    ) -> Result<Vec<(String, Arc<K>)>, Status> {
        if !self.inner.indexers.funcs.contains_key(index_name) {
            return Err(Status::IndexNotFound(index_name.to_string()));
        }
        let state = self.read();
        let keys = state
            .indices
            .get(index_name)
            .and_then(|index| index.get(indexed_value));
        let Some(keys) = keys else {
            return Ok(Vec::new());
        };
        Ok(state.ordered(keys.iter()))
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexerState<K>> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexerState<K>> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
