use crate::contracts::authorization::v1::cluster_policy::ClusterPolicy;
use crate::contracts::authorization::v1::cluster_policy_binding::ClusterPolicyBinding;
use crate::contracts::authorization::v1::policy::Policy;
use crate::contracts::authorization::v1::policy_binding::PolicyBinding;
use crate::services::backends::kubernetes::informer_registry::SharedInformerRegistry;
use crate::services::backends::kubernetes::list_watch::CustomListWatches;
use crate::testing::{FakeListWatch, Widget, unreachable_client};
use std::sync::Arc;
use std::time::Duration;
use test_context::AsyncTestContext;

/// A registry whose every kind is served by an in-memory source. The client points
/// nowhere, so a read that reaches it never succeeds.
pub struct InformerRegistryContext {
    pub registry: Arc<SharedInformerRegistry>,
    pub widgets: FakeListWatch<Widget>,
    pub cluster_policies: FakeListWatch<ClusterPolicy>,
    pub cluster_policy_bindings: FakeListWatch<ClusterPolicyBinding>,
    pub policies: FakeListWatch<Policy>,
    pub policy_bindings: FakeListWatch<PolicyBinding>,
}

impl InformerRegistryContext {
    pub const SYNC_TIMEOUT: Duration = Duration::from_secs(5);
}

impl AsyncTestContext for InformerRegistryContext {
    async fn setup() -> Self {
        let widgets = FakeListWatch::new(Vec::new());
        let cluster_policies = FakeListWatch::new(Vec::new());
        let cluster_policy_bindings = FakeListWatch::new(Vec::new());
        let policies = FakeListWatch::new(Vec::new());
        let policy_bindings = FakeListWatch::new(Vec::new());

        let overrides = CustomListWatches::new()
            .with::<Widget>(widgets.clone())
            .with::<ClusterPolicy>(cluster_policies.clone())
            .with::<ClusterPolicyBinding>(cluster_policy_bindings.clone())
            .with::<Policy>(policies.clone())
            .with::<PolicyBinding>(policy_bindings.clone());
        let registry = SharedInformerRegistry::new(unreachable_client(), Duration::ZERO)
            .with_custom_list_watches(Arc::new(overrides));

        InformerRegistryContext {
            registry: Arc::new(registry),
            widgets,
            cluster_policies,
            cluster_policy_bindings,
            policies,
            policy_bindings,
        }
    }

    async fn teardown(self) {
        self.registry.stop();
    }
}
