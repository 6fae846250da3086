use crate::services::backends::kubernetes::resource_update_handler::{
    ResourceUpdate, ResourceUpdateHandler,
};
use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use log::{debug, warn};
use std::fmt::Debug;

pub struct LoggingUpdateHandler;

#[async_trait]
impl<K> ResourceUpdateHandler<K> for LoggingUpdateHandler
where
    K: Resource + Debug + Send + Sync + 'static,
{
    async fn handle_update(&self, update: &ResourceUpdate<K>) {
        match update {
            ResourceUpdate::Applied(object) => debug!(
                "Applied resource: {:?} in namespace {:?}",
                object.name_any(),
                object.namespace()
            ),
            ResourceUpdate::Deleted(object) => debug!(
                "Deleted resource: {:?} in namespace {:?}",
                object.name_any(),
                object.namespace()
            ),
            ResourceUpdate::Failed(e) => warn!("Error processing event: {}", e),
        }
    }
}
