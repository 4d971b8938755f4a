//! Route definitions for the site service.
//!
//! ## Pages
//!
//! - `GET /` - Home page
//! - `GET /basic`, `GET /basic/page/{slug}` - Static CMS pages
//! - `GET /real-time-updates`, `GET /real-time-updates/{slug}` - Live CMS pages
//! - `GET /live?props=` - Server-sent live updates for a draft page
//! - `GET /health` - Health check (JSON)
//!
//! ## API (JSON envelope, CORS, `OPTIONS` preflight)
//!
//! - `GET /draft-mode/enable?token=&url=` - Enter draft mode and redirect
//! - `GET /draft-mode/disable?url=` - Leave draft mode and redirect
//! - `POST /invalidate-cache?token=` - Drop every cached query result
//! - `POST /preview-links?token=` - Web-previews plugin webhook
//! - `GET /seo-analysis?token=&itemId=...` - SEO plugin metadata endpoint
//! - `POST /post-deploy` - Install plugins and the invalidation webhook

mod draft_mode;
mod health;
mod home;
mod invalidate;
mod live;
mod pages;
mod post_deploy;
mod preview_links;
mod seo_analysis;

use std::any::Any;

use axum::Router;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;

use crate::envelope::{self, preflight};
use crate::error::not_found_page;
use crate::state::AppState;

/// Build the complete site router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::home_page))
        .route("/health", get(health::health_check))
        .route("/basic", get(pages::basic))
        .route("/basic/page/{slug}", get(pages::basic_slug))
        .route("/real-time-updates", get(pages::realtime_updates))
        .route("/real-time-updates/{slug}", get(pages::realtime_updates_slug))
        .route("/live", get(live::live_updates))
        .route(
            "/draft-mode/enable",
            get(draft_mode::enable).options(preflight),
        )
        .route(
            "/draft-mode/disable",
            get(draft_mode::disable).options(preflight),
        )
        .route(
            "/invalidate-cache",
            post(invalidate::invalidate_cache).options(preflight),
        )
        .route(
            "/preview-links",
            post(preview_links::preview_links).options(preflight),
        )
        .route(
            "/seo-analysis",
            get(seo_analysis::seo_analysis).options(preflight),
        )
        .route(
            "/post-deploy",
            post(post_deploy::post_deploy).options(preflight),
        )
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

async fn not_found() -> Response {
    not_found_page()
}

/// Turn a handler panic into the failure envelope.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "handler panicked");
    envelope::failure(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!("Internal server error"),
    )
}
