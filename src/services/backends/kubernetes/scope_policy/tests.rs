use crate::contracts::authorization::v1::cluster_policy::ClusterPolicy;
use crate::contracts::authorization::v1::policy::Policy;
use crate::services::backends::kubernetes::indexer::NAMESPACE_INDEX;
use crate::services::backends::kubernetes::scope_policy::ScopePolicy;
use crate::services::backends::kubernetes::indexer::Indexer;
use crate::testing::{cluster_policy, policy};
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};

#[test]
fn test_cluster_scope_installs_no_index() {
    assert!(!ClusterResourceScope::NAMESPACED);
    assert!(ClusterResourceScope::indexers::<ClusterPolicy>().is_empty());
}

#[test]
fn test_namespace_scope_installs_namespace_index() {
    assert!(NamespaceResourceScope::NAMESPACED);
    assert_eq!(
        NamespaceResourceScope::indexers::<Policy>().names(),
        vec![NAMESPACE_INDEX.to_string()]
    );
}

#[test]
fn test_store_keys_follow_scope() {
    // Arrange
    let mut namespaced_cluster_policy = cluster_policy("default");
    namespaced_cluster_policy.metadata.namespace = Some("team-a".to_string());
    let cluster_policies = Indexer::new(ClusterResourceScope::indexers::<ClusterPolicy>());
    let policies = Indexer::new(NamespaceResourceScope::indexers::<Policy>());

    // Act
    cluster_policies.upsert(namespaced_cluster_policy);
    policies.upsert(policy("team-a", "default"));

    // Assert
    assert_eq!(cluster_policies.list_keys(), vec!["default"]);
    assert_eq!(policies.list_keys(), vec!["team-a/default"]);
}
