//! Home page listing the page templates.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use maud::html;

use crate::dispatch::html_response;
use crate::render::components::{Shell, page_shell};
use crate::state::AppState;

/// Render the home page.
pub async fn home_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let draft = state.session_key.read(&headers).is_draft();
    let body = html! {
        h3 { "Choose your preferred template:" }
        ul class="home-templates" {
            li {
                a href="/basic" { "Basic:" }
                " "
                span { "Simpler code, great to start exploring" }
            }
            li {
                a href="/real-time-updates" { "Real-time Updates:" }
                " "
                span {
                    "Slightly more complex code, but content updates in real-time when Draft Mode is on"
                }
            }
        }
    };

    let markup = page_shell(
        Shell {
            fallback_title: "Home | Tech Starter Kit",
            draft,
            ..Shell::default()
        },
        body,
    );
    html_response(markup, draft)
}
