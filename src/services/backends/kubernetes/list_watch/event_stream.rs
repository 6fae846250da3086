use crate::services::backends::kubernetes::list_watch::ListWatch;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use kube::Resource;
use kube::api::{ListParams, WatchEvent, WatchParams};
use kube::core::ErrorResponse;
use kube::runtime::watcher;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

/// Server-side timeout of a single watch request. The watch is reopened when it ends.
const WATCH_TIMEOUT_SECONDS: u32 = 290;

enum State<K> {
    Empty,
    InitListed {
        objects: std::vec::IntoIter<K>,
        resource_version: String,
    },
    InitDone {
        resource_version: String,
        resync_at: Option<Instant>,
    },
    Watching {
        resource_version: String,
        resync_at: Option<Instant>,
        stream: BoxStream<'static, kube::Result<WatchEvent<K>>>,
    },
}

enum Polled<K> {
    Resync,
    Event(Option<kube::Result<WatchEvent<K>>>),
}

/// Drives `source` as a never-ending stream of watcher events.
///
/// A full list is emitted as `Init`, one `InitApply` per object and `InitDone`; watch
/// events follow as `Apply` and `Delete`. When `resync_period` is non-zero the source
/// is relisted every period. Errors are yielded as items and the stream carries on,
/// so callers are expected to add a backoff.
pub fn list_watch_stream<K>(
    source: Arc<dyn ListWatch<K>>,
    resync_period: Duration,
) -> BoxStream<'static, watcher::Result<watcher::Event<K>>>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    stream::unfold(State::Empty, move |state| {
        let source = source.clone();
        async move { Some(step(source.as_ref(), resync_period, state).await) }
    })
    .boxed()
}

async fn step<K>(
    source: &dyn ListWatch<K>,
    resync_period: Duration,
    mut state: State<K>,
) -> (watcher::Result<watcher::Event<K>>, State<K>)
where
    K: Resource + Clone + Send + Sync + 'static,
{
    loop {
        state = match state {
            State::Empty => match source.list(&ListParams::default()).await {
                Ok(list) => {
                    let resource_version = list.metadata.resource_version.filter(|v| !v.is_empty());
                    let Some(resource_version) = resource_version else {
                        return (Err(watcher::Error::NoResourceVersion), State::Empty);
                    };
                    debug!(
                        "Listed {} objects at resource version {}",
                        list.items.len(),
                        resource_version
                    );
                    let objects = list.items.into_iter();
                    return (
                        Ok(watcher::Event::Init),
                        State::InitListed {
                            objects,
                            resource_version,
                        },
                    );
                }
                Err(e) => return (Err(watcher::Error::InitialListFailed(e)), State::Empty),
            },
            State::InitListed {
                mut objects,
                resource_version,
            } => match objects.next() {
                Some(object) => {
                    return (
                        Ok(watcher::Event::InitApply(object)),
                        State::InitListed {
                            objects,
                            resource_version,
                        },
                    );
                }
                None => {
                    let resync_at = resync_deadline(resync_period);
                    return (
                        Ok(watcher::Event::InitDone),
                        State::InitDone {
                            resource_version,
                            resync_at,
                        },
                    );
                }
            },
            State::InitDone {
                resource_version,
                resync_at,
            } => {
                if resync_at.is_some_and(|deadline| Instant::now() >= deadline) {
                    debug!("Resync period of {:?} elapsed, relisting", resync_period);
                    state = State::Empty;
                    continue;
                }
                let params = WatchParams::default().timeout(WATCH_TIMEOUT_SECONDS);
                match source.watch(&params, &resource_version).await {
                    Ok(stream) => State::Watching {
                        resource_version,
                        resync_at,
                        stream,
                    },
                    Err(e) => {
                        let next = if is_gone(&e) {
                            State::Empty
                        } else {
                            State::InitDone {
                                resource_version,
                                resync_at,
                            }
                        };
                        return (Err(watcher::Error::WatchStartFailed(e)), next);
                    }
                }
            }
            State::Watching {
                resource_version,
                resync_at,
                mut stream,
            } => {
                let polled = match resync_at {
                    Some(deadline) => tokio::select! {
                        _ = sleep_until(deadline) => Polled::Resync,
                        event = stream.next() => Polled::Event(event),
                    },
                    None => Polled::Event(stream.next().await),
                };
                match polled {
                    Polled::Resync => {
                        debug!("Resync period of {:?} elapsed, relisting", resync_period);
                        State::Empty
                    }
                    Polled::Event(None) => State::InitDone {
                        resource_version,
                        resync_at,
                    },
                    Polled::Event(Some(Ok(
                        WatchEvent::Added(object) | WatchEvent::Modified(object),
                    ))) => {
                        let resource_version = observed_version(&object, resource_version);
                        return (
                            Ok(watcher::Event::Apply(object)),
                            State::Watching {
                                resource_version,
                                resync_at,
                                stream,
                            },
                        );
                    }
                    Polled::Event(Some(Ok(WatchEvent::Deleted(object)))) => {
                        let resource_version = observed_version(&object, resource_version);
                        return (
                            Ok(watcher::Event::Delete(object)),
                            State::Watching {
                                resource_version,
                                resync_at,
                                stream,
                            },
                        );
                    }
                    Polled::Event(Some(Ok(WatchEvent::Bookmark(bookmark)))) => State::Watching {
                        resource_version: bookmark.metadata.resource_version,
                        resync_at,
                        stream,
                    },
                    Polled::Event(Some(Ok(WatchEvent::Error(error)))) => {
                        // 410: the resource version is too old to resume from
                        let next = if error.code == 410 {
                            State::Empty
                        } else {
                            State::InitDone {
                                resource_version,
                                resync_at,
                            }
                        };
                        return (Err(watcher::Error::WatchError(error)), next);
                    }
                    Polled::Event(Some(Err(e))) => {
                        let next = if is_gone(&e) {
                            State::Empty
                        } else {
                            State::InitDone {
                                resource_version,
                                resync_at,
                            }
                        };
                        return (Err(watcher::Error::WatchFailed(e)), next);
                    }
                }
            }
        }
    }
}

fn resync_deadline(resync_period: Duration) -> Option<Instant> {
    (!resync_period.is_zero()).then(|| Instant::now() + resync_period)
}

fn observed_version<K: Resource>(object: &K, last: String) -> String {
    object.meta().resource_version.clone().unwrap_or(last)
}

fn is_gone(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(ErrorResponse { code: 410, .. }))
}
