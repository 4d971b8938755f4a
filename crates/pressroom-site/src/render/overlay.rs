//! Edit-region annotation.
//!
//! Draft responses carry an invisible edit-location token at the end of
//! every text value. While rendering, each text value goes through an
//! [`Annotator`]: the token is stripped from the visible text and, when
//! click-to-edit is on, the text is wrapped in a numbered
//! `<span data-edit-region>` whose target is recorded in the region
//! manifest. Each manifest entry carries the ready-made `openItem`
//! envelope the browser overlay posts to the preview host on click.

use maud::{Markup, PreEscaped, html};
use pressroom_core::{BridgeMessage, stega};
use serde::Serialize;
use serde_json::Value;

/// One clickable region of the rendered page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub id: usize,
    /// Editing URL, opened in a new tab when there is no preview host.
    pub href: String,
    /// `openItem` envelope for the preview host.
    pub open: Value,
}

/// Collects edit regions while a page renders.
#[derive(Debug, Default)]
pub struct Annotator {
    enabled: bool,
    regions: Vec<Region>,
}

impl Annotator {
    /// An annotator that wraps tokenized text in edit regions.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            regions: Vec::new(),
        }
    }

    /// Strip-only annotator, for published pages.
    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Render a text value, recording its edit region if it has one.
    pub fn text(&mut self, text: &str) -> Markup {
        let (visible, token) = stega::split(text);
        let target = match token {
            Some(token) if self.enabled => match token.target() {
                Ok(target) => target,
                Err(e) => {
                    tracing::debug!(error = %e, "edit token without a usable target");
                    return html! { (&*visible) };
                }
            },
            _ => return html! { (&*visible) },
        };
        let open = match BridgeMessage::open_item(&target).to_envelope() {
            Ok(open) => open,
            Err(e) => {
                tracing::debug!(error = %e, "failed to build openItem envelope");
                return html! { (&*visible) };
            }
        };

        let id = self.regions.len();
        let markup = html! {
            span data-edit-region=(id) data-edit-url=(target.href) { (&*visible) }
        };
        self.regions.push(Region {
            id,
            href: target.href,
            open,
        });
        markup
    }

    /// Visible form of a value used inside an attribute (alt text, titles).
    pub fn attr(&self, text: &str) -> String {
        stega::strip(text).into_owned()
    }

    pub fn into_regions(self) -> Vec<Region> {
        self.regions
    }
}

/// Embed a JSON value in a `<script type="application/json">` element.
///
/// `<` is escaped so a value can never close the element early.
pub fn json_script(id: &str, value: &impl Serialize) -> Markup {
    let json = serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c");
    html! {
        script id=(id) type="application/json" { (PreEscaped(json)) }
    }
}
