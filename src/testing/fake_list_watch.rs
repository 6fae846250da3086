use crate::services::backends::kubernetes::indexer::object_key;
use crate::services::backends::kubernetes::list_watch::ListWatch;
use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use futures::stream::BoxStream;
use kube::Resource;
use kube::api::{ListParams, WatchParams};
use kube::core::watch::{Bookmark, BookmarkMeta};
use kube::core::{ErrorResponse, ListMeta, ObjectList, TypeMeta, WatchEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

enum Change<K> {
    Upserted { created: bool, object: K },
    Deleted(K),
}

impl<K: Clone> Change<K> {
    fn to_event(&self) -> WatchEvent<K> {
        match self {
            Change::Upserted { created: true, object } => WatchEvent::Added(object.clone()),
            Change::Upserted { created: false, object } => WatchEvent::Modified(object.clone()),
            Change::Deleted(object) => WatchEvent::Deleted(object.clone()),
        }
    }
}

struct FakeState<K> {
    objects: Vec<K>,
    resource_version: u64,
    history: Vec<(u64, Change<K>)>,
    watchers: Vec<UnboundedSender<kube::Result<WatchEvent<K>>>>,
    fail_lists: bool,
    fail_watches: Option<u16>,
    watch_versions: Vec<String>,
}

impl<K> FakeState<K>
where
    K: Resource + Clone,
{
    fn record(&mut self, change: Change<K>) {
        self.broadcast(|| Ok(change.to_event()));
        self.history.push((self.resource_version, change));
    }

    fn broadcast(&mut self, item: impl Fn() -> kube::Result<WatchEvent<K>>) {
        self.watchers.retain(|watcher| watcher.unbounded_send(item()).is_ok());
    }

    fn remove(&mut self, object: &K) -> Option<K> {
        let key = object_key(object);
        let position = self
            .objects
            .iter()
            .position(|existing| object_key(existing) == key)?;
        self.resource_version += 1;
        let mut removed = self.objects.remove(position);
        removed.meta_mut().resource_version = Some(self.resource_version.to_string());
        Some(removed)
    }
}

struct FakeInner<K> {
    state: Mutex<FakeState<K>>,
    list_calls: AtomicUsize,
    watch_calls: AtomicUsize,
}

/// In-memory list-watch source.
///
/// Every mutation bumps a resource version, stamps it on the object and is pushed to
/// the open watches. A watch opened at an older resource version first replays what
/// it missed. Clones share the same state.
pub struct FakeListWatch<K> {
    inner: Arc<FakeInner<K>>,
}

impl<K> Clone for FakeListWatch<K> {
    fn clone(&self) -> Self {
        FakeListWatch {
            inner: self.inner.clone(),
        }
    }
}

impl<K> FakeListWatch<K>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    pub fn new(objects: Vec<K>) -> Self {
        let fake = FakeListWatch {
            inner: Arc::new(FakeInner {
                state: Mutex::new(FakeState {
                    objects: Vec::new(),
                    resource_version: 0,
                    history: Vec::new(),
                    watchers: Vec::new(),
                    fail_lists: false,
                    fail_watches: None,
                    watch_versions: Vec::new(),
                }),
                list_calls: AtomicUsize::new(0),
                watch_calls: AtomicUsize::new(0),
            }),
        };
        for object in objects {
            fake.apply(object);
        }
        fake
    }

    /// Creates or replaces the object with the same key.
    pub fn apply(&self, mut object: K) {
        let mut state = self.lock();
        state.resource_version += 1;
        object.meta_mut().resource_version = Some(state.resource_version.to_string());
        let key = object_key(&object);
        let existing = state
            .objects
            .iter_mut()
            .find(|existing| object_key(&**existing) == key);
        let created = match existing {
            Some(existing) => {
                *existing = object.clone();
                false
            }
            None => {
                state.objects.push(object.clone());
                true
            }
        };
        state.record(Change::Upserted { created, object });
    }

    /// Removes the object and notifies the open watches.
    pub fn delete(&self, object: &K) {
        let mut state = self.lock();
        if let Some(removed) = state.remove(object) {
            state.record(Change::Deleted(removed));
        }
    }

    /// Removes the object without a watch event, so only a relist can notice.
    pub fn delete_silently(&self, object: &K) {
        self.lock().remove(object);
    }

    /// Makes subsequent list calls fail with an internal server error.
    pub fn fail_lists(&self, fail: bool) {
        self.lock().fail_lists = fail;
    }

    /// Makes subsequent watch calls fail with an API error of the given code.
    pub fn fail_watches(&self, code: Option<u16>) {
        self.lock().fail_watches = code;
    }

    /// Sends an error event with the given code to the open watches.
    pub fn push_error(&self, code: u16) {
        self.lock().broadcast(|| Ok(WatchEvent::Error(api_error_response(code))));
    }

    /// Fails the open watch streams with an API error of the given code.
    pub fn break_watches(&self, code: u16) {
        self.lock().broadcast(|| Err(api_error(code)));
    }

    /// Sends a bookmark at `resource_version` to the open watches.
    pub fn push_bookmark(&self, resource_version: &str) {
        self.lock().broadcast(|| {
            Ok(WatchEvent::Bookmark(Bookmark {
                types: TypeMeta::default(),
                metadata: BookmarkMeta {
                    resource_version: resource_version.to_string(),
                    annotations: Default::default(),
                },
            }))
        });
    }

    /// Resource versions passed to the watch calls so far, in call order.
    pub fn watch_resource_versions(&self) -> Vec<String> {
        self.lock().watch_versions.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.inner.list_calls.load(Ordering::SeqCst)
    }

    pub fn watch_calls(&self) -> usize {
        self.inner.watch_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, FakeState<K>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<K> ListWatch<K> for FakeListWatch<K>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    async fn list(&self, _params: &ListParams) -> kube::Result<ObjectList<K>> {
        self.inner.list_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        if state.fail_lists {
            return Err(api_error(500));
        }
        Ok(ObjectList {
            types: TypeMeta {
                api_version: "v1".to_string(),
                kind: "List".to_string(),
            },
            metadata: ListMeta {
                resource_version: Some(state.resource_version.to_string()),
                ..ListMeta::default()
            },
            items: state.objects.clone(),
        })
    }

    async fn watch(
        &self,
        _params: &WatchParams,
        resource_version: &str,
    ) -> kube::Result<BoxStream<'static, kube::Result<WatchEvent<K>>>> {
        self.inner.watch_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        state.watch_versions.push(resource_version.to_string());
        if let Some(code) = state.fail_watches {
            return Err(api_error(code));
        }
        let since: u64 = resource_version.parse().unwrap_or_default();
        let (sender, receiver) = unbounded();
        for (_, change) in state.history.iter().filter(|(version, _)| *version > since) {
            let _ = sender.unbounded_send(Ok(change.to_event()));
        }
        state.watchers.push(sender);
        Ok(receiver.boxed())
    }
}

fn api_error(code: u16) -> kube::Error {
    kube::Error::Api(api_error_response(code))
}

fn api_error_response(code: u16) -> ErrorResponse {
    let reason = match code {
        410 => "Expired",
        _ => "InternalError",
    };
    ErrorResponse {
        status: "Failure".to_string(),
        message: format!("request failed with {}", code),
        reason: reason.to_string(),
        code,
    }
}
