//! Core types and shared utilities for the pressroom content stack.
//!
//! This crate provides:
//! - Query descriptors and the published/draft access model
//! - The process-wide cache tag used for all-or-nothing invalidation
//! - Edit-location token decoding (invisible metadata embedded in draft text)
//! - The typed message protocol spoken with an embedding preview host
//! - Prometheus metrics helpers
//! - Shared error types
//!
//! Nothing in here performs I/O against the CMS; the `pressroom-live` and
//! `pressroom-site` crates own the transports.

mod access;
pub mod bridge;
mod descriptor;
mod error;
pub mod metrics;
mod path;
pub mod stega;

pub use access::{AccessMode, CACHE_TAG, CacheTag, Credential, Credentials};
pub use bridge::BridgeMessage;
pub use descriptor::{QueryDescriptor, QueryDocument};
pub use error::{Error, Result};
pub use path::is_relative_url;
pub use stega::{EditLocationToken, EditTarget};
