//! Live-update subscriptions for draft content.
//!
//! While draft mode is active, a page subscribes to change notifications for
//! the exact query + variables it rendered, and re-renders on every push.
//!
//! # Modules
//!
//! - [`sse`] - Incremental server-sent-events frame decoder
//! - [`subscription`] - Cancellable stream of notifications
//! - [`client`] - Listen-channel handshake and transport
//! - [`view`] - Per-mount state machine that applies notifications
//!
//! # Flow
//!
//! ```text
//! ┌──────────────┐  POST {query, variables}   ┌────────────────┐
//! │ ListenClient │ ─────────────────────────▶ │  listen API    │
//! └──────┬───────┘ ◀──── {url} ────────────── └────────────────┘
//!        │ GET url (text/event-stream)
//!        ▼
//! ┌──────────────┐  Result<Update, ConnectionError>  ┌──────────┐
//! │ Subscription │ ────────────────────────────────▶ │ LiveView │ ─▶ render
//! └──────────────┘                                   └──────────┘
//! ```
//!
//! Notifications are applied strictly in arrival order. Dropping or
//! cancelling a subscription releases the connection; no notification is
//! yielded after `cancel()` returns.

pub mod client;
pub mod error;
pub mod sse;
pub mod subscription;
pub mod view;

pub use client::{ListenClient, ListenConfig, LiveSource};
pub use error::{ConnectionError, Error, Result};
pub use subscription::{CancelHandle, Feed, Notification, Subscription, Update};
pub use view::{LiveState, LiveView, Outcome};
