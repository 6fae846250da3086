pub mod composed_update_handler;
pub mod logging_update_handler;

use async_trait::async_trait;
use kube::Resource;
use kube::runtime::watcher;
use std::sync::Arc;

/// A change an informer applied to its local store, or a failure of its list-watch.
///
/// Objects are the same shared instances the informer's listers return.
#[derive(Debug)]
pub enum ResourceUpdate<K> {
    Applied(Arc<K>),
    Deleted(Arc<K>),
    Failed(watcher::Error),
}

#[async_trait]
pub trait ResourceUpdateHandler<K>: Send + Sync
where
    K: Resource + Send + Sync,
{
    async fn handle_update(&self, update: &ResourceUpdate<K>);
}
