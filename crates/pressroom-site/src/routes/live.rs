//! Live updates for draft pages over server-sent events.
//!
//! The browser sends back the [`LiveProps`] its page was rendered with.
//! We mount a [`LiveView`] seeded with the gateway snapshot, subscribe to
//! the same query, and push a re-rendered fragment for every update. A
//! failure to load the snapshot or to subscribe, or a later channel
//! failure, is sent once as `channel-error` and ends the stream. Closing
//! the connection drops the view, which cancels the upstream subscription.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use maud::html;
use pressroom_core::QueryDescriptor;
use pressroom_live::{ConnectionError, LiveView, Outcome};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::dispatch::LiveProps;
use crate::error::SiteError;
use crate::render::content::{RecordLinks, error_block};
use crate::render::{LiveFrame, render_fragment};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    props: Option<String>,
}

fn event(name: &'static str, payload: &impl Serialize) -> Option<Event> {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, event = name, "failed to encode live event");
            None
        }
    }
}

/// Render one update into an `update` event.
fn render_update(data: &Value, links: RecordLinks) -> Option<Event> {
    match render_fragment(data, links, true) {
        Ok(fragment) => event("update", &LiveFrame::from(fragment)),
        Err(SiteError::NotFound(_)) => {
            let missing = html! {
                p class="live-missing" { "This page is no longer available." }
            };
            event(
                "update",
                &LiveFrame {
                    html: missing.into_string(),
                    regions: Vec::new(),
                },
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to render live update");
            None
        }
    }
}

fn error_event(error: &ConnectionError) -> Option<Event> {
    event(
        "channel-error",
        &json!({ "code": error.code, "html": error_block(error).into_string() }),
    )
}

fn to_event(outcome: Outcome<Option<Event>>) -> Option<Event> {
    match outcome {
        Outcome::Rendered(event) => event,
        Outcome::Errored(error) => error_event(&error),
        Outcome::Ignored => None,
    }
}

/// Mount a view on the gateway snapshot and subscribe it.
///
/// On failure the view is already errored and the error to report is
/// returned alongside it.
async fn open_view(
    state: &AppState,
    descriptor: &QueryDescriptor,
) -> (LiveView, Option<ConnectionError>) {
    let snapshot = state.gateway.execute(descriptor).await;
    let initial = match &snapshot {
        Ok(data) => Value::clone(data),
        Err(_) => Value::Null,
    };
    let mut view = LiveView::mount(descriptor.clone(), initial);

    let failure = match snapshot {
        Err(e) => Some(ConnectionError::new("SNAPSHOT_FAILED", e.to_string())),
        Ok(_) => match state.live.subscribe(descriptor).await {
            Ok(subscription) => {
                view.attach(subscription);
                None
            }
            Err(e) => Some(ConnectionError::from(e)),
        },
    };

    let failure = failure.and_then(|error| match view.fail(error) {
        Outcome::Errored(error) => Some(error),
        _ => None,
    });
    (view, failure)
}

/// `GET /live?props=`
pub async fn live_updates(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LiveQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, SiteError> {
    if !state.session_key.read(&headers).is_draft() {
        return Err(SiteError::Unauthorized);
    }

    let raw = query
        .props
        .ok_or_else(|| SiteError::invalid("Missing live props"))?;
    let props: LiveProps = serde_json::from_str(&raw)
        .map_err(|e| SiteError::invalid(format!("Invalid live props: {e}")))?;
    if !props.route.is_live() {
        return Err(SiteError::invalid("Route has no live updates"));
    }

    let descriptor = props.descriptor(true);
    let (view, opening_error) = open_view(&state, &descriptor).await;

    tracing::debug!(
        query = descriptor.document().name,
        subscribed = opening_error.is_none(),
        "live view mounted"
    );

    let links = props.route.links();
    let updates = view.into_stream(move |data| render_update(data, links));
    let stream = futures::stream::iter(opening_error.map(Outcome::Errored))
        .chain(updates)
        .filter_map(|outcome| futures::future::ready(to_event(outcome)))
        .map(Ok);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
