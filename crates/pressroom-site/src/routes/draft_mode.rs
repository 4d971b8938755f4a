//! Draft-mode toggle endpoints.

use axum::extract::{Query, State};
use serde::Deserialize;

use crate::draft_mode::{self as controller, Toggle};
use crate::error::SiteError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleQuery {
    token: Option<String>,
    url: Option<String>,
}

/// `GET /draft-mode/enable?token=&url=`
pub async fn enable(
    State(state): State<AppState>,
    Query(query): Query<ToggleQuery>,
) -> Result<Toggle, SiteError> {
    let toggle = controller::enable(
        &state.config,
        &state.session_key,
        query.token.as_deref(),
        query.url.as_deref(),
    )?;
    metrics::counter!("draft_mode_toggles_total", "action" => "enable").increment(1);
    tracing::debug!(location = %toggle.location, "draft mode enabled");
    Ok(toggle)
}

/// `GET /draft-mode/disable?url=`
pub async fn disable(
    State(state): State<AppState>,
    Query(query): Query<ToggleQuery>,
) -> Result<Toggle, SiteError> {
    let toggle = controller::disable(&state.session_key, query.url.as_deref())?;
    metrics::counter!("draft_mode_toggles_total", "action" => "disable").increment(1);
    tracing::debug!(location = %toggle.location, "draft mode disabled");
    Ok(toggle)
}

#[cfg(test)]
mod tests {
    use crate::routes::router;
    use crate::session::COOKIE_NAME;
    use crate::testing::{FakeContent, body_json, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::json;
    use tower::ServiceExt;

    async fn get(uri: &str) -> axum::response::Response {
        router(test_state(&FakeContent::new()))
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn enable_redirects_and_sets_embeddable_cookie() {
        let response = get("/draft-mode/enable?token=s3cret&url=%2Freal-time-updates%2Fhello").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/real-time-updates/hello");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with(&format!("{COOKIE_NAME}=")));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Partitioned"));
    }

    #[tokio::test]
    async fn enable_with_wrong_token_is_401() {
        let response = get("/draft-mode/enable?token=nope&url=/").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!response.headers().contains_key(header::SET_COOKIE));
        assert_eq!(
            body_json(response).await,
            json!({ "success": false, "error": "Invalid token" })
        );
    }

    #[tokio::test]
    async fn absolute_url_is_422() {
        let response = get("/draft-mode/enable?token=s3cret&url=https%3A%2F%2Fevil.example").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!response.headers().contains_key(header::SET_COOKIE));

        let response = get("/draft-mode/disable?url=%2F%2Fevil.example").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn disable_needs_no_token() {
        let response = get("/draft-mode/disable?url=/basic").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/basic");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }
}
