//! Per-mount live view state machine.
//!
//! ```text
//! mount ─▶ Connecting ─attach─▶ Subscribed ⇄ Updating
//!              │                    │
//!              └──────fail──────────┴──error──▶ Errored
//!
//! any state ─unmount─▶ Unmounted
//! ```
//!
//! The view holds the latest query result. It starts from the server-side
//! snapshot so first paint never shows empty content, and each update
//! replaces the held result wholesale. Nothing is applied once the view
//! is errored or unmounted.

use futures::{Stream, StreamExt};
use pressroom_core::QueryDescriptor;
use pressroom_core::metrics::{adjust_gauge, increment};
use serde_json::Value;

use crate::error::ConnectionError;
use crate::subscription::{Notification, Subscription};

/// Lifecycle of one mounted live view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    /// Mounted with a snapshot, subscription not yet open.
    Connecting,
    /// Waiting for the next notification.
    Subscribed,
    /// Applying an update.
    Updating,
    /// The subscription failed; the error is shown instead of content.
    Errored,
    /// Torn down; the subscription is cancelled.
    Unmounted,
}

/// Result of applying one notification.
#[derive(Debug, PartialEq)]
pub enum Outcome<R> {
    /// The held result changed and was re-rendered.
    Rendered(R),
    /// The subscription failed.
    Errored(ConnectionError),
    /// The view no longer accepts notifications.
    Ignored,
}

/// One mounted instance of live content.
#[derive(Debug)]
pub struct LiveView {
    descriptor: QueryDescriptor,
    state: LiveState,
    data: Value,
    subscription: Option<Subscription>,
}

impl LiveView {
    /// Mount a view seeded with the gateway's snapshot.
    pub fn mount(descriptor: QueryDescriptor, initial: Value) -> Self {
        adjust_gauge("live_subscriptions_active", 1.0);
        Self {
            descriptor,
            state: LiveState::Connecting,
            data: initial,
            subscription: None,
        }
    }

    /// Hand the opened subscription to the view.
    pub fn attach(&mut self, mut subscription: Subscription) {
        if self.state != LiveState::Connecting {
            subscription.cancel();
            return;
        }
        self.subscription = Some(subscription);
        self.state = LiveState::Subscribed;
    }

    /// Record a failure to open the subscription.
    pub fn fail(&mut self, error: ConnectionError) -> Outcome<()> {
        match self.apply(Err(error), |_| ()) {
            Outcome::Errored(error) => Outcome::Errored(error),
            _ => Outcome::Ignored,
        }
    }

    /// Apply one notification, re-rendering on success.
    pub fn apply<R>(
        &mut self,
        notification: Notification,
        render: impl FnOnce(&Value) -> R,
    ) -> Outcome<R> {
        if matches!(self.state, LiveState::Errored | LiveState::Unmounted) {
            return Outcome::Ignored;
        }

        match notification {
            Ok(update) => {
                self.state = LiveState::Updating;
                self.data = update.payload;
                tracing::trace!(
                    query = self.descriptor.document().name,
                    sequence = update.sequence,
                    "applying live update"
                );
                let rendered = render(&self.data);
                self.state = LiveState::Subscribed;
                increment("live_updates_total", 1);
                Outcome::Rendered(rendered)
            }
            Err(error) => {
                tracing::warn!(
                    query = self.descriptor.document().name,
                    code = %error.code,
                    message = %error.message,
                    "live view errored"
                );
                self.state = LiveState::Errored;
                if let Some(mut subscription) = self.subscription.take() {
                    subscription.cancel();
                }
                increment("live_errors_total", 1);
                Outcome::Errored(error)
            }
        }
    }

    /// Wait for the next notification and apply it.
    ///
    /// Returns `None` when the view is not subscribed. A subscription that
    /// ends without an error is reported as a closed connection.
    pub async fn next<R>(&mut self, render: impl FnOnce(&Value) -> R) -> Option<Outcome<R>> {
        if self.state != LiveState::Subscribed {
            return None;
        }
        let subscription = self.subscription.as_mut()?;
        let notification = subscription
            .next()
            .await
            .unwrap_or_else(|| Err(ConnectionError::closed()));
        Some(self.apply(notification, render))
    }

    /// Tear the view down and cancel its subscription.
    pub fn unmount(&mut self) {
        if self.state == LiveState::Unmounted {
            return;
        }
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.state = LiveState::Unmounted;
        adjust_gauge("live_subscriptions_active", -1.0);
    }

    /// Drive the view as a stream of outcomes, ending after an error.
    pub fn into_stream<R, F>(self, render: F) -> impl Stream<Item = Outcome<R>>
    where
        F: FnMut(&Value) -> R,
    {
        futures::stream::unfold((self, render), |(mut view, mut render)| async move {
            let outcome = view.next(&mut render).await?;
            Some((outcome, (view, render)))
        })
    }

}

#[cfg(test)]
impl LiveView {
    fn state(&self) -> LiveState {
        self.state
    }

    fn data(&self) -> &Value {
        &self.data
    }
}

impl Drop for LiveView {
    fn drop(&mut self) {
        self.unmount();
    }
}
