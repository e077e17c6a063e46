use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};

use crate::record::RawEvent;

/// Why a subscription stopped producing events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchEnd {
    /// The consumer called [`RawWatch::stop`].
    Stopped,
    /// The store was closed or dropped.
    StoreClosed,
    /// The consumer fell behind the change feed and `skipped` changes were
    /// lost, so the subscription was ended rather than continued with a gap.
    Lagged { skipped: u64 },
}

impl fmt::Display for WatchEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped by consumer"),
            Self::StoreClosed => write!(f, "store closed"),
            Self::Lagged { skipped } => write!(f, "lagged, {skipped} changes skipped"),
        }
    }
}

/// Producer-side handle for recording why a subscription ended.
///
/// Only the first recorded reason is kept.
#[derive(Clone, Debug, Default)]
pub struct EndSignal(Arc<OnceLock<WatchEnd>>);

impl EndSignal {
    pub fn record(&self, end: WatchEnd) {
        let _ = self.0.set(end);
    }

    pub fn get(&self) -> Option<WatchEnd> {
        self.0.get().copied()
    }
}

/// A cancellable subscription to store changes.
///
/// Events are produced by the store independently of the consumer and
/// buffered in a bounded channel. The stream ends when the store terminates
/// the subscription or after [`RawWatch::stop`]. Dropping the watch stops it.
/// Once ended, [`RawWatch::end_reason`] tells the cases apart.
#[derive(Debug)]
pub struct RawWatch {
    events: mpsc::Receiver<RawEvent>,
    stop: Option<oneshot::Sender<()>>,
    end: EndSignal,
}

impl RawWatch {
    /// Wrap the receiving half of a subscription. The store side must stop
    /// producing once `stop` fires or is dropped.
    pub fn new(events: mpsc::Receiver<RawEvent>, stop: oneshot::Sender<()>) -> Self {
        Self {
            events,
            stop: Some(stop),
            end: EndSignal::default(),
        }
    }

    /// Handle the producer uses to record why it stopped. Record the reason
    /// before dropping the event sender.
    pub fn end_signal(&self) -> EndSignal {
        self.end.clone()
    }

    /// Why the subscription ended, or `None` while it is still live or when
    /// the producer went away without saying.
    pub fn end_reason(&self) -> Option<WatchEnd> {
        self.end.get()
    }

    /// Cancel the subscription. Buffered events are discarded and every
    /// later receive returns `None`.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            self.end.record(WatchEnd::Stopped);
            let _ = stop.send(());
        }
        self.events.close();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_none()
    }

    /// Receive the next change, or `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<RawEvent> {
        if self.is_stopped() {
            return None;
        }
        self.events.recv().await
    }

    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<RawEvent>> {
        if self.is_stopped() {
            return Poll::Ready(None);
        }
        self.events.poll_recv(cx)
    }
}

impl Stream for RawWatch {
    type Item = RawEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_recv(cx)
    }
}
