
use crate::services::backends::kubernetes::resource_update_handler::{
    ResourceUpdate, ResourceUpdateHandler,
};
use async_trait::async_trait;
use kube::Resource;
use std::sync::Arc;

/// Forwards every update to each of its handlers, in registration order.
pub struct ComposedUpdateHandler<K> {
    handlers: Vec<Arc<dyn ResourceUpdateHandler<K>>>,
}

impl<K> ComposedUpdateHandler<K> {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn add_handler(mut self, handler: Arc<dyn ResourceUpdateHandler<K>>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<K> Default for ComposedUpdateHandler<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for ComposedUpdateHandler<K> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

#[async_trait]
impl<K> ResourceUpdateHandler<K> for ComposedUpdateHandler<K>
where
    K: Resource + Send + Sync + 'static,
{
    async fn handle_update(&self, update: &ResourceUpdate<K>) {
        for handler in &self.handlers {
            handler.handle_update(update).await;
        }
    }
}
