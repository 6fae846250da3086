use crate::contracts::authorization::v1::policy::Policy;
use crate::services::backends::kubernetes::indexer::{
    Indexer, Indexers, NAMESPACE_INDEX, namespace_index_func, object_key,
};
use crate::testing::{policy, widget};

fn namespaced_indexer() -> Indexer<Policy> {
    Indexer::new(Indexers::new().with(NAMESPACE_INDEX, namespace_index_func::<Policy>))
}

fn names(objects: Vec<std::sync::Arc<Policy>>) -> Vec<String> {
    objects
        .iter()
        .map(|policy| policy.metadata.name.clone().unwrap_or_default())
        .collect()
}

#[test]
fn test_object_key() {
    assert_eq!(object_key(&policy("team-a", "default")), "team-a/default");
    assert_eq!(object_key(&widget("a")), "a");
}

#[test]
fn test_replace_keeps_list_order() {
    // Arrange
    let indexer = namespaced_indexer();

    // Act
    indexer.replace(vec![
        policy("team-b", "zeta"),
        policy("team-a", "alpha"),
        policy("team-a", "mid"),
    ]);

    // Assert
    assert!(indexer.has_synced());
    assert_eq!(names(indexer.list()), vec!["zeta", "alpha", "mid"]);
    assert_eq!(indexer.list_keys(), vec!["team-b/zeta", "team-a/alpha", "team-a/mid"]);
}

#[test]
fn test_upsert_keeps_position_of_existing_object() {
    let indexer = namespaced_indexer();
    indexer.replace(vec![policy("team-a", "first"), policy("team-a", "second")]);

    let mut updated = policy("team-a", "first");
    updated.spec.last_modified = Some("now".to_string());
    indexer.upsert(updated);
    indexer.upsert(policy("team-a", "third"));

    assert_eq!(names(indexer.list()), vec!["first", "second", "third"]);
    let first = indexer.get_by_key("team-a/first").unwrap();
    assert_eq!(first.spec.last_modified.as_deref(), Some("now"));
}

#[test]
fn test_namespace_index_follows_updates() {
    // Arrange
    let indexer = namespaced_indexer();
    indexer.replace(vec![
        policy("team-a", "one"),
        policy("team-b", "two"),
        policy("team-a", "three"),
    ]);

    // Act
    indexer.remove(&policy("team-a", "one"));
    indexer.upsert(policy("team-c", "four"));

    // Assert
    assert_eq!(names(indexer.by_index(NAMESPACE_INDEX, "team-a").unwrap()), vec!["three"]);
    assert_eq!(indexer.index_keys(NAMESPACE_INDEX, "team-c").unwrap(), vec!["team-c/four"]);
    assert!(indexer.by_index(NAMESPACE_INDEX, "team-z").unwrap().is_empty());
    assert_eq!(
        indexer.list_index_func_values(NAMESPACE_INDEX),
        vec!["team-a", "team-b", "team-c"]
    );
}

#[test]
fn test_removing_last_object_drops_index_value() {
    let indexer = namespaced_indexer();
    indexer.replace(vec![policy("team-a", "only")]);

    indexer.remove(&policy("team-a", "only"));

    assert!(indexer.is_empty());
    assert!(indexer.list_index_func_values(NAMESPACE_INDEX).is_empty());
}

#[test]
fn test_unknown_index() {
    let indexer: Indexer<Policy> = Indexer::new(Indexers::default());

    let error = indexer.by_index(NAMESPACE_INDEX, "team-a").unwrap_err();

    assert!(!error.is_not_found());
    assert_eq!(error.to_string(), "Index with name 'namespace' does not exist");
}

#[test]
fn test_replace_drops_objects_missing_from_list() {
    let indexer = namespaced_indexer();
    indexer.replace(vec![policy("team-a", "kept"), policy("team-a", "gone")]);

    let (applied, removed) = indexer.replace(vec![policy("team-a", "kept")]);

    assert_eq!(names(applied), vec!["kept"]);
    assert_eq!(names(removed), vec!["gone"]);
    assert_eq!(indexer.len(), 1);
    assert!(indexer.get_by_key("team-a/gone").is_none());
    assert_eq!(indexer.index_keys(NAMESPACE_INDEX, "team-a").unwrap(), vec!["team-a/kept"]);
}

#[test]
fn test_clones_share_the_store() {
    let indexer = namespaced_indexer();
    let clone = indexer.clone();

    indexer.upsert(policy("team-a", "shared"));

    assert!(clone.ptr_eq(&indexer));
    assert!(clone.get_by_key("team-a/shared").is_some());
    assert!(!clone.ptr_eq(&namespaced_indexer()));
}

#[tokio::test]
async fn test_wait_until_synced() {
    let indexer = namespaced_indexer();
    assert!(!indexer.has_synced());

    let waiter = {
        let indexer = indexer.clone();
        tokio::spawn(async move { indexer.wait_until_synced().await })
    };
    indexer.replace(Vec::new());

    tokio::time::timeout(std::time::Duration::from_secs(5), waiter)
        .await
        .expect("indexer should report synced")
        .unwrap();
}
