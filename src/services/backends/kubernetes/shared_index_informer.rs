
use crate::services::backends::kubernetes::indexer::{Indexer, Indexers};
use crate::services::backends::kubernetes::list_watch::ListWatch;
use crate::services::backends::kubernetes::list_watch::event_stream::list_watch_stream;
use crate::services::backends::kubernetes::resource_kind::ResourceKind;
use crate::services::backends::kubernetes::resource_update_handler::{
    ResourceUpdate, ResourceUpdateHandler,
};
use futures::StreamExt;
use kube::Resource;
use kube::runtime::{WatchStreamExt, watcher};
use log::{debug, info, warn};
use std::fmt::Debug;
use std::pin::pin;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

type Handlers<K> = Arc<RwLock<Vec<Arc<dyn ResourceUpdateHandler<K>>>>>;

/// Local indexed mirror of one resource kind, kept eventually consistent with the
/// remote store by its list-watch source.
///
/// Synchronization runs on a tokio task spawned by [`SharedIndexInformer::start`];
/// until then the indexer stays empty and unsynced.
pub struct SharedIndexInformer<K> {
    kind: ResourceKind,
    indexer: Indexer<K>,
    source: Arc<dyn ListWatch<K>>,
    resync_period: Duration,
    handlers: Handlers<K>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<K> SharedIndexInformer<K>
where
    K: Resource + Clone + Debug + Send + Sync + 'static,
{
    pub fn new(
        kind: ResourceKind,
        source: Arc<dyn ListWatch<K>>,
        indexers: Indexers<K>,
        resync_period: Duration,
    ) -> Self {
        SharedIndexInformer {
            kind,
            indexer: Indexer::new(indexers),
            source,
            resync_period,
            handlers: Arc::new(RwLock::new(Vec::new())),
            task: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn indexer(&self) -> Indexer<K> {
        self.indexer.clone()
    }

    pub fn resync_period(&self) -> Duration {
        self.resync_period
    }

    /// Registers a handler for every subsequent update. Handlers added after start
    /// only see updates from that point on.
    pub fn add_event_handler(&self, handler: Arc<dyn ResourceUpdateHandler<K>>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    pub fn has_synced(&self) -> bool {
        self.indexer.has_synced()
    }

    pub async fn wait_until_synced(&self) {
        self.indexer.wait_until_synced().await
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Spawns the synchronization task on the current tokio runtime.
    ///
    /// Returns false if the informer was started before; an informer runs at most once.
    pub fn start(&self) -> bool {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return false;
        }
        info!(
            "Starting informer for {} with resync period {:?}",
            self.kind, self.resync_period
        );
        *task = Some(tokio::spawn(run(
            self.kind.clone(),
            self.source.clone(),
            self.resync_period,
            self.indexer.clone(),
            self.handlers.clone(),
        )));
        true
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            task.abort();
            debug!("Informer for {} stopped", self.kind);
        }
    }
}

impl<K> Drop for SharedIndexInformer<K> {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().unwrap_or_else(PoisonError::into_inner).as_ref() {
            task.abort();
        }
    }
}

async fn run<K>(
    kind: ResourceKind,
    source: Arc<dyn ListWatch<K>>,
    resync_period: Duration,
    indexer: Indexer<K>,
    handlers: Handlers<K>,
) where
    K: Resource + Clone + Debug + Send + Sync + 'static,
{
    let mut events = pin!(list_watch_stream(source, resync_period).default_backoff());
    let mut applier = EventApplier::new(indexer);

    while let Some(event) = events.next().await {
        let updates = match event {
            Ok(event) => applier.apply(event),
            Err(e) => {
                warn!("List-watch of {} failed: {}", kind, e);
                vec![ResourceUpdate::Failed(e)]
            }
        };
        if updates.is_empty() {
            continue;
        }
        let handlers = handlers.read().unwrap_or_else(PoisonError::into_inner).clone();
        for update in &updates {
            for handler in &handlers {
                handler.handle_update(update).await;
            }
        }
    }
}

/// Applies watcher events to an indexer. A full list is buffered until `InitDone`
/// and then swapped in at once, so readers never observe a half-applied relist.
struct EventApplier<K> {
    indexer: Indexer<K>,
    buffer: Vec<K>,
}

impl<K> EventApplier<K>
where
    K: Resource + Clone + 'static,
{
    fn new(indexer: Indexer<K>) -> Self {
        EventApplier {
            indexer,
            buffer: Vec::new(),
        }
    }

    fn apply(&mut self, event: watcher::Event<K>) -> Vec<ResourceUpdate<K>> {
        match event {
            watcher::Event::Init => {
                self.buffer.clear();
                Vec::new()
            }
            watcher::Event::InitApply(object) => {
                self.buffer.push(object);
                Vec::new()
            }
            watcher::Event::InitDone => {
                let (applied, removed) = self.indexer.replace(std::mem::take(&mut self.buffer));
                debug!(
                    "Replaced store content: {} objects listed, {} dropped",
                    applied.len(),
                    removed.len()
                );
                applied
                    .into_iter()
                    .map(ResourceUpdate::Applied)
                    .chain(removed.into_iter().map(ResourceUpdate::Deleted))
                    .collect()
            }
            watcher::Event::Apply(object) => {
                vec![ResourceUpdate::Applied(self.indexer.upsert(object))]
            }
            watcher::Event::Delete(object) => self
                .indexer
                .remove(&object)
                .map(ResourceUpdate::Deleted)
                .into_iter()
                .collect(),
        }
    }
}
