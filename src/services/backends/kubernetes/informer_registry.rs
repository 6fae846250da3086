
use crate::configuration::models::informer_registry_settings::InformerRegistrySettings;
use crate::services::backends::kubernetes::indexer::Indexer;
use crate::services::backends::kubernetes::kubeconfig_loader::KubeConfigLoader;
use crate::services::backends::kubernetes::list_watch::{
    CustomListWatches, ListWatch, ListWatchResolver, resolve_list_watch,
};
use crate::services::backends::kubernetes::lister::Lister;
use crate::services::backends::kubernetes::resource_kind::ResourceKind;
use crate::services::backends::kubernetes::scope_policy::{InformedResource, ScopePolicy};
use crate::services::backends::kubernetes::shared_index_informer::SharedIndexInformer;
use async_trait::async_trait;
use futures::future::join_all;
use kube::{Client, Resource};
use log::{debug, info};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Type-erased lifecycle operations of a registered informer.
#[async_trait]
trait InformerControl: Send + Sync {
    fn start(&self) -> bool;
    fn stop(&self);
    async fn wait_until_synced(&self);
}

#[async_trait]
impl<K> InformerControl for SharedIndexInformer<K>
where
    K: Resource + Clone + Debug + Send + Sync + 'static,
{
    fn start(&self) -> bool {
        SharedIndexInformer::start(self)
    }

    fn stop(&self) {
        SharedIndexInformer::stop(self)
    }

    async fn wait_until_synced(&self) {
        SharedIndexInformer::wait_until_synced(self).await
    }
}

/// Both handles point at the same informer: `informer` for typed access, `control`
/// for lifecycle operations across all kinds.
struct RegisteredInformer {
    informer: Arc<dyn Any + Send + Sync>,
    control: Arc<dyn InformerControl>,
}

/// Process-wide table of synchronized caches, one per resource kind.
///
/// The first request for a kind constructs its informer; every later request for
/// that kind, from any thread, gets the same instance. Informers are never replaced
/// or removed for the lifetime of the registry.
///
/// Informers do not synchronize on construction. Call [`SharedInformerRegistry::start`]
/// once the consumers have requested what they need, and again for informers
/// requested afterwards.
pub struct SharedInformerRegistry {
    client: Client,
    default_resync: Duration,
    custom_list_watches: Arc<dyn ListWatchResolver>,
    informers: Mutex<HashMap<ResourceKind, RegisteredInformer>>,
}

impl SharedInformerRegistry {
    pub fn new(client: Client, default_resync: Duration) -> Self {
        SharedInformerRegistry {
            client,
            default_resync,
            custom_list_watches: Arc::new(CustomListWatches::default()),
            informers: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the override resolver. Overrides only affect kinds constructed afterwards.
    pub fn with_custom_list_watches(mut self, resolver: Arc<dyn ListWatchResolver>) -> Self {
        self.custom_list_watches = resolver;
        self
    }

    pub async fn from_settings(settings: &InformerRegistrySettings) -> anyhow::Result<Self> {
        let config = settings.kubeconfig.load().await?;
        let client = Client::try_from(config)?;
        Ok(SharedInformerRegistry::new(client, settings.resync_interval.into()))
    }

    pub fn default_resync(&self) -> Duration {
        self.default_resync
    }

    /// Returns the informer for `K`, constructing it on first use.
    ///
    /// # Panics
    ///
    /// If another Rust type with the same group and plural name was registered first.
    pub fn informer_for<K>(&self) -> Arc<SharedIndexInformer<K>>
    where
        K: InformedResource,
    {
        let kind = ResourceKind::of::<K>();
        let mut informers = self.lock();

        if let Some(existing) = informers.get(&kind) {
            return existing
                .informer
                .clone()
                .downcast::<SharedIndexInformer<K>>()
                .unwrap_or_else(|_| {
                    panic!(
                        "Resource kind {} is already registered for a type other than {}",
                        kind,
                        std::any::type_name::<K>()
                    )
                });
        }

        let informer = Arc::new(self.new_informer::<K>(kind.clone()));
        informers.insert(
            kind,
            RegisteredInformer {
                informer: informer.clone(),
                control: informer.clone(),
            },
        );
        informer
    }

    pub fn indexer_for<K>(&self) -> Indexer<K>
    where
        K: InformedResource,
    {
        self.informer_for::<K>().indexer()
    }

    pub fn lister_for<K>(&self) -> Lister<K>
    where
        K: InformedResource,
    {
        Lister::new(self.informer_for::<K>())
    }

    /// Kinds constructed so far, sorted.
    pub fn kinds(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<ResourceKind> = self.lock().keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Starts every constructed informer that is not running yet and returns how many
    /// were started. Must be called from within a tokio runtime.
    pub fn start(&self) -> usize {
        let started = self
            .controls()
            .into_iter()
            .filter(|(_, control)| control.start())
            .count();
        debug!("Started {} informers", started);
        started
    }

    pub fn stop(&self) {
        for (kind, control) in self.controls() {
            debug!("Stopping informer for {}", kind);
            control.stop();
        }
    }

    /// Waits until each constructed informer has applied its first full list, giving up
    /// on an informer after `timeout`.
    pub async fn wait_for_cache_sync(&self, timeout: Duration) -> HashMap<ResourceKind, bool> {
        let waits = self.controls().into_iter().map(|(kind, control)| async move {
            let synced = tokio::time::timeout(timeout, control.wait_until_synced())
                .await
                .is_ok();
            (kind, synced)
        });
        join_all(waits).await.into_iter().collect()
    }

    fn new_informer<K>(&self, kind: ResourceKind) -> SharedIndexInformer<K>
    where
        K: InformedResource,
    {
        let custom = resolve_list_watch::<K>(self.custom_list_watches.as_ref(), &kind);
        let source: Arc<dyn ListWatch<K>> = match custom {
            Some(custom) => {
                info!("Using custom list-watch for {}", kind);
                custom
            }
            None => {
                let client = self.client.clone();
                Arc::new(<K::Scope as ScopePolicy>::default_list_watch::<K>(client))
            }
        };
        info!("Constructed shared informer for {}", kind);
        SharedIndexInformer::new(
            kind,
            source,
            <K::Scope as ScopePolicy>::indexers::<K>(),
            self.default_resync,
        )
    }

    /// Snapshot of the registered informers, so no caller awaits while holding the lock.
    fn controls(&self) -> Vec<(ResourceKind, Arc<dyn InformerControl>)> {
        self.lock()
            .iter()
            .map(|(kind, registered)| (kind.clone(), registered.control.clone()))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ResourceKind, RegisteredInformer>> {
        self.informers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
