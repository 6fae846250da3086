
use crate::contracts::authorization::v1::cluster_policy::ClusterPolicy;
use crate::contracts::authorization::v1::cluster_policy_binding::ClusterPolicyBinding;
use crate::contracts::authorization::v1::policy::Policy;
use crate::contracts::authorization::v1::policy_binding::PolicyBinding;
use crate::services::backends::kubernetes::indexer::Indexer;
use crate::services::backends::kubernetes::informer_registry::SharedInformerRegistry;
use crate::services::backends::kubernetes::lister::Lister;
use crate::services::backends::kubernetes::scope_policy::InformedResource;
use crate::services::backends::kubernetes::shared_index_informer::SharedIndexInformer;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed entry points to the caches of the authorization kinds.
#[derive(Clone)]
pub struct AuthorizationInformers {
    registry: Arc<SharedInformerRegistry>,
}

impl AuthorizationInformers {
    pub fn new(registry: Arc<SharedInformerRegistry>) -> Self {
        AuthorizationInformers { registry }
    }

    pub fn registry(&self) -> &Arc<SharedInformerRegistry> {
        &self.registry
    }

    pub fn cluster_policies(&self) -> KindInformer<ClusterPolicy> {
        self.kind()
    }

    pub fn cluster_policy_bindings(&self) -> KindInformer<ClusterPolicyBinding> {
        self.kind()
    }

    pub fn policies(&self) -> KindInformer<Policy> {
        self.kind()
    }

    pub fn policy_bindings(&self) -> KindInformer<PolicyBinding> {
        self.kind()
    }

    fn kind<K>(&self) -> KindInformer<K> {
        KindInformer {
            registry: self.registry.clone(),
            _resource: PhantomData,
        }
    }
}

/// Accessor for one kind. Holds no informer itself: every call goes through the
/// registry, so all accessors of a kind share one cache.
pub struct KindInformer<K> {
    registry: Arc<SharedInformerRegistry>,
    _resource: PhantomData<fn() -> K>,
}

impl<K> KindInformer<K>
where
    K: InformedResource,
{
    pub fn informer(&self) -> Arc<SharedIndexInformer<K>> {
        self.registry.informer_for::<K>()
    }

    pub fn indexer(&self) -> Indexer<K> {
        self.registry.indexer_for::<K>()
    }

    pub fn lister(&self) -> Lister<K> {
        self.registry.lister_for::<K>()
    }
}
