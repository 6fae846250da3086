use crate::contracts::authorization::v1::policy::Policy;
use crate::services::backends::kubernetes::list_watch::event_stream::list_watch_stream;
use crate::services::backends::kubernetes::list_watch::{
    CustomListWatches, ListWatch, ListWatchResolver, resolve_list_watch,
};
use crate::services::backends::kubernetes::resource_kind::ResourceKind;
use crate::testing::{FakeListWatch, Widget, widget};
use futures::StreamExt;
use futures::stream::BoxStream;
use kube::ResourceExt;
use kube::api::ListParams;
use kube::runtime::watcher;
use std::sync::Arc;
use std::time::Duration;

type Events = BoxStream<'static, watcher::Result<watcher::Event<Widget>>>;

async fn next_event(events: &mut Events) -> watcher::Result<watcher::Event<Widget>> {
    tokio::time::timeout(Duration::from_secs(5), events.next())
        .await
        .expect("event within timeout")
        .expect("stream never ends")
}

/// Runs through the initial list, then waits for one watch event so the watch is open.
async fn watching(fake: &FakeListWatch<Widget>) -> Events {
    let mut events = list_watch_stream::<Widget>(Arc::new(fake.clone()), Duration::ZERO);
    for _ in 0..3 {
        next_event(&mut events).await.unwrap();
    }
    fake.apply(widget("b"));
    assert_eq!(event_name(next_event(&mut events).await.unwrap()), "apply:b");
    events
}

fn event_name(event: watcher::Event<Widget>) -> String {
    match event {
        watcher::Event::Init => "init".to_string(),
        watcher::Event::InitApply(object) => format!("init-apply:{}", object.name_any()),
        watcher::Event::InitDone => "init-done".to_string(),
        watcher::Event::Apply(object) => format!("apply:{}", object.name_any()),
        watcher::Event::Delete(object) => format!("delete:{}", object.name_any()),
    }
}

#[test]
fn test_default_resolver_has_no_overrides() {
    let overrides = CustomListWatches::default();

    assert!(overrides.resolve(&ResourceKind::of::<Widget>()).is_none());
    assert!(resolve_list_watch::<Widget>(&overrides, &ResourceKind::of::<Widget>()).is_none());
}

#[tokio::test]
async fn test_registered_override_resolves() {
    // Arrange
    let fake = FakeListWatch::new(vec![widget("a")]);
    let overrides = CustomListWatches::new().with::<Widget>(fake.clone());

    // Act
    let source = resolve_list_watch::<Widget>(&overrides, &ResourceKind::of::<Widget>()).unwrap();
    let list = source.list(&ListParams::default()).await.unwrap();

    // Assert
    assert!(overrides.contains(&ResourceKind::of::<Widget>()));
    assert_eq!(list.items.len(), 1);
    assert_eq!(fake.list_calls(), 1);
}

#[test]
fn test_override_of_another_type_is_ignored() {
    let overrides = CustomListWatches::new().register::<Policy>(
        ResourceKind::of::<Widget>(),
        FakeListWatch::<Policy>::new(Vec::new()),
    );

    assert!(overrides.contains(&ResourceKind::of::<Widget>()));
    assert!(resolve_list_watch::<Widget>(&overrides, &ResourceKind::of::<Widget>()).is_none());
}

#[tokio::test]
async fn test_list_then_watch() {
    // Arrange
    let fake = FakeListWatch::new(vec![widget("a"), widget("b")]);
    let mut events = list_watch_stream::<Widget>(Arc::new(fake.clone()), Duration::ZERO);

    // Act
    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(event_name(next_event(&mut events).await.unwrap()));
    }
    fake.apply(widget("c"));
    seen.push(event_name(next_event(&mut events).await.unwrap()));
    fake.delete(&widget("a"));
    seen.push(event_name(next_event(&mut events).await.unwrap()));

    // Assert
    assert_eq!(
        seen,
        vec![
            "init",
            "init-apply:a",
            "init-apply:b",
            "init-done",
            "apply:c",
            "delete:a"
        ]
    );
    assert_eq!(fake.list_calls(), 1);
    assert_eq!(fake.watch_calls(), 1);
}

#[tokio::test]
async fn test_list_failure_is_reported_and_retried() {
    let fake = FakeListWatch::new(vec![widget("a")]);
    fake.fail_lists(true);
    let mut events = list_watch_stream::<Widget>(Arc::new(fake.clone()), Duration::ZERO);

    let failure = next_event(&mut events).await;
    fake.fail_lists(false);
    let retried = next_event(&mut events).await;

    assert!(matches!(failure, Err(watcher::Error::InitialListFailed(_))));
    assert!(matches!(retried, Ok(watcher::Event::Init)));
    assert_eq!(fake.list_calls(), 2);
}

#[tokio::test]
async fn test_resync_relists() {
    // Arrange
    let fake = FakeListWatch::new(vec![widget("a")]);
    let resync_period = Duration::from_millis(50);
    let mut events = list_watch_stream::<Widget>(Arc::new(fake.clone()), resync_period);
    for _ in 0..3 {
        next_event(&mut events).await.unwrap();
    }

    // Act
    fake.delete_silently(&widget("a"));
    let after_resync = next_event(&mut events).await.unwrap();
    let done = next_event(&mut events).await.unwrap();

    // Assert
    assert_eq!(event_name(after_resync), "init");
    assert_eq!(event_name(done), "init-done");
    assert_eq!(fake.list_calls(), 2);
}

#[tokio::test]
async fn test_gone_watch_event_relists() {
    // Arrange
    let fake = FakeListWatch::new(vec![widget("a")]);
    let mut events = watching(&fake).await;

    // Act
    fake.push_error(410);
    let failure = next_event(&mut events).await;
    let relisted = next_event(&mut events).await;

    // Assert
    assert!(matches!(failure, Err(watcher::Error::WatchError(ref e)) if e.code == 410));
    assert!(matches!(relisted, Ok(watcher::Event::Init)));
    assert_eq!(fake.list_calls(), 2);
}

#[tokio::test]
async fn test_gone_watch_start_relists() {
    // Arrange
    let fake = FakeListWatch::new(vec![widget("a")]);
    fake.fail_watches(Some(410));
    let mut events = list_watch_stream::<Widget>(Arc::new(fake.clone()), Duration::ZERO);
    for _ in 0..3 {
        next_event(&mut events).await.unwrap();
    }

    // Act
    let failure = next_event(&mut events).await;
    fake.fail_watches(None);
    let relisted = next_event(&mut events).await;

    // Assert
    assert!(matches!(failure, Err(watcher::Error::WatchStartFailed(_))));
    assert!(matches!(relisted, Ok(watcher::Event::Init)));
    assert_eq!(fake.list_calls(), 2);
}

#[tokio::test]
async fn test_gone_watch_stream_relists() {
    // Arrange
    let fake = FakeListWatch::new(vec![widget("a")]);
    let mut events = watching(&fake).await;

    // Act
    fake.break_watches(410);
    let failure = next_event(&mut events).await;
    let relisted = next_event(&mut events).await;

    // Assert
    assert!(matches!(failure, Err(watcher::Error::WatchFailed(_))));
    assert!(matches!(relisted, Ok(watcher::Event::Init)));
    assert_eq!(fake.list_calls(), 2);
}

#[tokio::test]
async fn test_watch_error_resumes_from_last_resource_version() {
    // Arrange
    let fake = FakeListWatch::new(vec![widget("a")]);
    let mut events = watching(&fake).await;

    // Act
    fake.push_error(500);
    let failure = next_event(&mut events).await;
    fake.apply(widget("c"));
    let resumed = next_event(&mut events).await.unwrap();

    // Assert
    assert!(matches!(failure, Err(watcher::Error::WatchError(ref e)) if e.code == 500));
    assert_eq!(event_name(resumed), "apply:c");
    assert_eq!(fake.list_calls(), 1);
    assert_eq!(fake.watch_resource_versions(), vec!["1", "2"]);
}

#[tokio::test]
async fn test_bookmark_advances_resource_version() {
    // Arrange
    let fake = FakeListWatch::new(vec![widget("a")]);
    let mut events = watching(&fake).await;

    // Act
    fake.push_bookmark("7");
    fake.push_error(500);
    let failure = next_event(&mut events).await;
    let idle = tokio::time::timeout(Duration::from_millis(100), events.next()).await;

    // Assert
    assert!(matches!(failure, Err(watcher::Error::WatchError(_))));
    assert!(idle.is_err());
    assert_eq!(fake.watch_resource_versions(), vec!["1", "7"]);
}

#[tokio::test]
async fn test_resync_relists_while_watch_start_fails() {
    // Arrange
    let fake = FakeListWatch::new(vec![widget("a")]);
    fake.fail_watches(Some(500));
    let resync_period = Duration::from_millis(50);
    let mut events = list_watch_stream::<Widget>(Arc::new(fake.clone()), resync_period);
    for _ in 0..3 {
        next_event(&mut events).await.unwrap();
    }

    // Act
    let mut relisted = false;
    for _ in 0..100 {
        if let Ok(watcher::Event::Init) = next_event(&mut events).await {
            relisted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Assert
    assert!(relisted);
    assert_eq!(fake.list_calls(), 2);
}
