//! Pressroom Site - CMS-backed pages with draft mode and live updates.
//!
//! This crate serves pages rendered from a headless CMS. Visitors see
//! published content from a tagged in-process cache; editors who enter
//! draft mode see unpublished content, receive live updates without
//! reloading, and can click any text to open the field that produced it.
//!
//! # Architecture
//!
//! - **Session**: A signed cookie carries the per-request draft flag
//! - **Gateway**: Executes GraphQL queries with the credential the mode
//!   selects, caching every result under a single invalidation tag
//! - **Dispatch**: Renders pages statically, or as a live container that
//!   the browser upgrades through `/live`
//! - **Render**: maud templates; draft renders annotate edit regions
//! - **Plugins**: Preview links, SEO analysis and post-deploy setup
//!   endpoints for the CMS interface
//!
//! # Request Flow
//!
//! ```text
//! GET /real-time-updates/{slug}
//!   │
//!   ├─ session cookie ─▶ DraftSession
//!   ├─ Gateway::execute (site + page, concurrently)
//!   └─ published: static HTML
//!      draft:     snapshot HTML + LiveProps ─▶ GET /live ─▶ SSE updates
//! ```
//!
//! # Security
//!
//! - All dynamic content is HTML-escaped by maud
//! - Draft-mode redirects only accept relative URLs
//! - Webhook and plugin endpoints require the shared secret token

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod draft_mode;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod management;
pub mod queries;
pub mod records;
pub mod render;
pub mod routes;
pub mod session;
pub mod setup;
pub mod state;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use routes::router;
pub use state::AppState;
