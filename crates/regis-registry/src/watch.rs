//! Typed, filtered view over a raw store watch.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use futures::Stream;
use regis_store::{RawEvent, RawWatch, WatchEnd};
use regis_types::{CodecError, RawObject, Resource, WatchEvent};
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticSink, DropReason};

/// Predicate deciding which resources a watch forwards.
pub type WatchPredicate<K> = Box<dyn Fn(&K) -> bool + Send + Sync>;

/// Lifecycle of a watch subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchState {
    /// Subscribed, nothing delivered yet.
    Open,
    /// At least one event delivered.
    Streaming,
    /// Stopped by the caller or ended by the store. Terminal.
    Closed,
}

/// A stream of typed watch events for kind `K`.
///
/// Each raw change is decoded, checked against `K::KIND`, stamped with its
/// version and run through the predicate. Payloads of another kind, or that
/// do not decode, are reported to the diagnostic sink and skipped; they
/// never end the stream. The stream ends after [`WatchStream::stop`], when
/// dropped, or when the store ends the subscription.
pub struct WatchStream<K: Resource> {
    raw: RawWatch,
    predicate: WatchPredicate<K>,
    sink: Arc<dyn DiagnosticSink>,
    state: WatchState,
}

impl<K: Resource> WatchStream<K> {
    pub fn new(raw: RawWatch, predicate: WatchPredicate<K>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            raw,
            predicate,
            sink,
            state: WatchState::Open,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Why the stream ended, once it has. A lagged watch must be reopened
    /// from the last version seen to avoid missing changes.
    pub fn end_reason(&self) -> Option<WatchEnd> {
        self.raw.end_reason()
    }

    /// Cancel the subscription. Takes effect immediately: events already
    /// buffered are discarded and the stream yields `None` from now on.
    pub fn stop(&mut self) {
        if self.state != WatchState::Closed {
            debug!(kind = K::NAME, "watch stopped");
        }
        self.state = WatchState::Closed;
        self.raw.stop();
    }

    /// Receive the next forwarded event, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<WatchEvent<K>> {
        futures::future::poll_fn(|cx| self.poll_event(cx)).await
    }

    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Option<WatchEvent<K>>> {
        if self.state == WatchState::Closed {
            return Poll::Ready(None);
        }
        loop {
            match ready!(self.raw.poll_recv(cx)) {
                Some(raw) => {
                    if let Some(event) = self.adapt(raw) {
                        self.state = WatchState::Streaming;
                        return Poll::Ready(Some(event));
                    }
                }
                None => {
                    debug!(kind = K::NAME, reason = ?self.raw.end_reason(), "watch ended by store");
                    self.state = WatchState::Closed;
                    return Poll::Ready(None);
                }
            }
        }
    }

    fn adapt(&self, raw: RawEvent) -> Option<WatchEvent<K>> {
        let RawEvent { event_type, record } = raw;
        let typed = RawObject::decode(&record.data).and_then(RawObject::into_typed::<K>);
        let mut object = match typed {
            Ok(object) => object,
            Err(err) => {
                let reason = match err {
                    CodecError::KindMismatch { found, .. } => DropReason::UnexpectedKind { found },
                    other => DropReason::Undecodable {
                        error: other.to_string(),
                    },
                };
                self.sink.record(Diagnostic {
                    watch_kind: K::NAME,
                    key: record.key,
                    version: record.version,
                    reason,
                });
                return None;
            }
        };
        object.meta_mut().resource_version = Some(record.version.to_string());
        if !(self.predicate)(&object) {
            return None;
        }
        Some(WatchEvent::new(event_type, object))
    }
}

impl<K: Resource> Stream for WatchStream<K> {
    type Item = WatchEvent<K>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_event(cx)
    }
}

impl<K: Resource> fmt::Debug for WatchStream<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchStream")
            .field("kind", &K::NAME)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::InMemorySink;
    use crate::testing::{gadget, widget, Widget};
    use futures::StreamExt;
    use regis_store::StoredRecord;
    use regis_types::{encode, EventType};
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};

    struct Harness {
        feed: mpsc::Sender<RawEvent>,
        stop: oneshot::Receiver<()>,
        sink: Arc<InMemorySink>,
        stream: WatchStream<Widget>,
    }

    fn harness(predicate: WatchPredicate<Widget>) -> Harness {
        let (feed, rx) = mpsc::channel(16);
        let (stop_tx, stop) = oneshot::channel();
        let sink = Arc::new(InMemorySink::new());
        let stream = WatchStream::new(RawWatch::new(rx, stop_tx), predicate, sink.clone());
        Harness {
            feed,
            stop,
            sink,
            stream,
        }
    }

    fn raw(event_type: EventType, key: &str, data: Vec<u8>, version: u64) -> RawEvent {
        RawEvent {
            event_type,
            record: StoredRecord::new(key, data, version),
        }
    }

    async fn next(stream: &mut WatchStream<Widget>) -> Option<WatchEvent<Widget>> {
        tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out waiting on watch")
    }

    #[tokio::test]
    async fn forwards_typed_events_with_versions() {
        let mut h = harness(Box::new(|_| true));
        let data = encode(&widget("w1", 3)).unwrap();
        h.feed.send(raw(EventType::Added, "/widgets/w1", data.clone(), 4)).await.unwrap();
        h.feed.send(raw(EventType::Deleted, "/widgets/w1", data, 5)).await.unwrap();

        let added = next(&mut h.stream).await.unwrap();
        assert_eq!(added.event_type(), EventType::Added);
        assert_eq!(added.object().id(), "w1");
        assert_eq!(added.object().resource_version(), Some("4"));
        assert_eq!(h.stream.state(), WatchState::Streaming);

        let deleted = next(&mut h.stream).await.unwrap();
        assert_eq!(deleted.event_type(), EventType::Deleted);
        assert_eq!(deleted.object().resource_version(), Some("5"));
    }

    #[tokio::test]
    async fn foreign_kinds_are_diagnosed_and_skipped() {
        let mut h = harness(Box::new(|_| true));
        let foreign = encode(&gadget("g1")).unwrap();
        h.feed.send(raw(EventType::Added, "/widgets/g1", foreign, 1)).await.unwrap();
        h.feed.send(raw(EventType::Added, "/widgets/bad", b"{oops".to_vec(), 2)).await.unwrap();
        let good = encode(&widget("w1", 1)).unwrap();
        h.feed.send(raw(EventType::Added, "/widgets/w1", good, 3)).await.unwrap();

        let event = next(&mut h.stream).await.unwrap();
        assert_eq!(event.object().id(), "w1");

        let diagnostics = h.sink.entries();
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].watch_kind, "widget");
        assert_eq!(diagnostics[0].key, "/widgets/g1");
        assert_eq!(
            diagnostics[0].reason,
            DropReason::UnexpectedKind {
                found: "Gadget".into()
            }
        );
        assert!(matches!(diagnostics[1].reason, DropReason::Undecodable { .. }));
        assert_eq!(diagnostics[1].version, 2);
    }

    #[tokio::test]
    async fn predicate_filters_without_diagnostics() {
        let mut h = harness(Box::new(|w: &Widget| w.size > 5));
        for (id, size, version) in [("small", 1, 1), ("big", 10, 2)] {
            let data = encode(&widget(id, size)).unwrap();
            h.feed
                .send(raw(EventType::Added, &format!("/widgets/{id}"), data, version))
                .await
                .unwrap();
        }
        assert_eq!(next(&mut h.stream).await.unwrap().object().id(), "big");
        assert!(h.sink.is_empty());
    }

    #[tokio::test]
    async fn stop_ends_stream_without_draining() {
        let mut h = harness(Box::new(|_| true));
        let data = encode(&widget("w1", 1)).unwrap();
        h.feed.send(raw(EventType::Added, "/widgets/w1", data, 1)).await.unwrap();

        assert_eq!(h.stream.state(), WatchState::Open);
        h.stream.stop();
        assert_eq!(h.stream.state(), WatchState::Closed);
        assert!(next(&mut h.stream).await.is_none());
        assert_eq!(h.stream.end_reason(), Some(WatchEnd::Stopped));
        assert!(h.stop.await.is_ok());
    }

    #[tokio::test]
    async fn upstream_end_is_end_of_stream() {
        let mut h = harness(Box::new(|_| true));
        drop(h.feed);
        assert!(next(&mut h.stream).await.is_none());
        assert_eq!(h.stream.state(), WatchState::Closed);
        assert!(h.stream.recv().await.is_none());
    }
}
