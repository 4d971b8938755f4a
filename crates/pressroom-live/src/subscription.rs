//! Cancellable notification stream.
//!
//! A [`Subscription`] is the consumer half of one live-update connection.
//! The producer half, [`Feed`], is driven by the transport task (or by a
//! test). Cancellation is synchronous: once [`Subscription::cancel`] returns,
//! the stream yields nothing further, even if notifications were already
//! buffered.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::error::ConnectionError;

/// A new result for the subscribed query.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Position in the stream, starting at 1. Diagnostic only.
    pub sequence: u64,
    /// The `data` member of the GraphQL response.
    pub payload: Value,
}

/// One item delivered by a subscription.
pub type Notification = Result<Update, ConnectionError>;

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    task: Mutex<Option<AbortHandle>>,
}

/// Shared cancellation flag, also owning the transport task.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    /// Mark the subscription cancelled and abort its transport task.
    pub fn cancel(&self) {
        if self.state.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.state.task.lock().take() {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Tie a transport task to this handle. A task attached after
    /// cancellation is aborted immediately.
    pub fn attach(&self, task: AbortHandle) {
        let mut slot = self.state.task.lock();
        if self.is_cancelled() {
            task.abort();
        } else {
            *slot = Some(task);
        }
    }
}

/// Producer half of a subscription.
#[derive(Debug)]
pub struct Feed {
    tx: mpsc::Sender<Notification>,
    cancel: CancelHandle,
    sequence: u64,
}

impl Feed {
    /// Push an update. Returns `false` once the consumer is gone.
    pub async fn update(&mut self, payload: Value) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.sequence += 1;
        let update = Update {
            sequence: self.sequence,
            payload,
        };
        self.tx.send(Ok(update)).await.is_ok()
    }

    /// Push a terminal error and close the feed.
    pub async fn fail(self, error: ConnectionError) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _ = self.tx.send(Err(error)).await;
    }

    /// Whether the consumer has cancelled or dropped the subscription.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

/// Consumer half: a stream of [`Notification`]s for one query.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Notification>,
    cancel: CancelHandle,
}

impl Subscription {
    /// Create a connected feed/subscription pair with a bounded buffer.
    pub fn channel(capacity: usize) -> (Feed, Subscription) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancelHandle::default();
        let feed = Feed {
            tx,
            cancel: cancel.clone(),
            sequence: 0,
        };
        (feed, Subscription { rx, cancel })
    }

    /// Tear the subscription down.
    ///
    /// Releases the connection and discards anything already buffered.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A handle that cancels this subscription from elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl Stream for Subscription {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            // cancel() may have raced the receive from another handle
            Poll::Ready(Some(_)) if self.cancel.is_cancelled() => Poll::Ready(None),
            other => other,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn updates_arrive_in_order_with_sequence() {
        let (mut feed, mut sub) = Subscription::channel(8);
        for n in 1..=3 {
            assert!(feed.update(json!({ "n": n })).await);
        }
        for n in 1..=3u64 {
            let update = sub.next().await.unwrap().unwrap();
            assert_eq!(update.sequence, n);
            assert_eq!(update.payload["n"], n);
        }
    }

    #[tokio::test]
    async fn cancel_discards_buffered_notifications() {
        let (mut feed, mut sub) = Subscription::channel(8);
        feed.update(json!({ "n": 1 })).await;
        feed.update(json!({ "n": 2 })).await;
        sub.cancel();
        assert!(sub.next().await.is_none());
        assert!(feed.is_closed());
        assert!(!feed.update(json!({ "n": 3 })).await);
    }

    #[tokio::test]
    async fn external_handle_cancels_stream() {
        let (mut feed, mut sub) = Subscription::channel(8);
        feed.update(json!({})).await;
        sub.cancel_handle().cancel();
        assert!(sub.is_cancelled());
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn drop_closes_feed() {
        let (feed, sub) = Subscription::channel(1);
        drop(sub);
        assert!(feed.is_closed());
    }

    #[tokio::test]
    async fn fail_delivers_error() {
        let (feed, mut sub) = Subscription::channel(1);
        feed.fail(ConnectionError::closed()).await;
        let err = sub.next().await.unwrap().unwrap_err();
        assert_eq!(err.code, "CONNECTION_CLOSED");
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn cancel_aborts_attached_task() {
        let (_feed, mut sub) = Subscription::channel(1);
        let task = tokio::spawn(std::future::pending::<()>());
        sub.cancel_handle().attach(task.abort_handle());
        sub.cancel();
        assert!(task.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn attach_after_cancel_aborts_immediately() {
        let handle = CancelHandle::default();
        handle.cancel();
        let task = tokio::spawn(std::future::pending::<()>());
        handle.attach(task.abort_handle());
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
