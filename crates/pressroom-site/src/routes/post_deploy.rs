//! One-time project setup, called right after the first deployment.
//!
//! The caller proves itself with a management API token in the body; no
//! shared secret is needed.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Response;
use pressroom_core::Credential;
use serde::Deserialize;

use crate::envelope;
use crate::error::SiteError;
use crate::setup::Setup;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostDeployRequest {
    datocms_api_token: String,
    frontend_url: String,
}

/// `POST /post-deploy`
pub async fn post_deploy(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, SiteError> {
    let request: PostDeployRequest = serde_json::from_slice(&body)
        .map_err(|e| SiteError::invalid(format!("Invalid request body: {e}")))?;

    let setup = Setup::new(
        state.management.as_ref(),
        Credential::new(request.datocms_api_token),
        &request.frontend_url,
        &state.config.secret_api_token,
    )?;
    setup.run().await?;

    Ok(envelope::success(None))
}
