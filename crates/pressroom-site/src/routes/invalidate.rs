//! Cache invalidation webhook.
//!
//! Every cached query result carries the same tag, so any notification
//! drops the whole cache regardless of what the payload says changed.

use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::envelope;
use crate::error::SiteError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    token: Option<String>,
}

/// `POST /invalidate-cache?token=`
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Response, SiteError> {
    if !state.config.token_matches(query.token.as_deref()) {
        return Err(SiteError::Unauthorized);
    }
    state.gateway.invalidate()?;
    tracing::info!("content cache invalidated");
    Ok(envelope::success(None))
}
