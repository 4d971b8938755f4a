//! Page content rendering.
//!
//! Turns the `page` member of a page query result into markup: the title,
//! the structured-text body with its embedded blocks and record links, and
//! the publication footer. Every text value goes through the
//! [`Annotator`] so draft pages get their edit regions.
//!
//! Structured text is a small JSON document tree:
//!
//! ```text
//! root ─┬─ paragraph ── span("Hello", marks=[strong])
//!       ├─ heading(level=2) ── span
//!       ├─ list(bulleted) ── listItem ── paragraph ── ...
//!       ├─ code(language, code)
//!       ├─ block(item=<id>)           -> looked up in `blocks`
//!       └─ paragraph ── itemLink(item=<id>) ── span
//!                                     -> looked up in `links`
//! ```

use std::collections::HashMap;

use maud::{Markup, html};
use pressroom_live::ConnectionError;
use serde::Deserialize;
use serde_json::Value;

use super::components::SeoTag;
use super::overlay::Annotator;
use crate::error::SiteError;

/// Where links to other page records point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLinks {
    /// Every record link goes to the home page.
    Home,
    /// Record links go to `{prefix}{slug}`.
    Prefix(&'static str),
}

impl RecordLinks {
    fn href(self, record: &Value) -> String {
        match (self, record.get("slug").and_then(Value::as_str)) {
            (Self::Prefix(prefix), Some(slug)) if !slug.is_empty() => format!("{prefix}{slug}"),
            _ => "/".to_string(),
        }
    }
}

/// The page record selected by every page query.
#[derive(Debug, Clone, Deserialize)]
pub struct PageRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "_firstPublishedAt", default)]
    pub first_published_at: Option<String>,
    #[serde(rename = "_seoMetaTags", default)]
    pub seo_meta_tags: Vec<SeoTag>,
    #[serde(rename = "structuredText", default)]
    pub structured_text: Option<StructuredText>,
}

/// A structured-text field with its referenced records.
#[derive(Debug, Clone, Deserialize)]
pub struct StructuredText {
    pub value: Value,
    #[serde(default)]
    pub blocks: Vec<Value>,
    #[serde(default)]
    pub links: Vec<Value>,
}

/// Pull the page record out of a query result.
///
/// A missing record is [`SiteError::NotFound`].
pub fn page_record(data: &Value) -> Result<PageRecord, SiteError> {
    match data.get("page") {
        None | Some(Value::Null) => Err(SiteError::NotFound("page".to_string())),
        Some(page) => serde_json::from_value(page.clone())
            .map_err(|e| SiteError::Internal(anyhow::anyhow!("malformed page payload: {e}"))),
    }
}

/// Render the page body: title, structured text and publication footer.
pub fn render_page(page: &PageRecord, links: RecordLinks, annotator: &mut Annotator) -> Markup {
    html! {
        h1 { (annotator.text(page.title.as_deref().unwrap_or_default())) }
        @if let Some(text) = &page.structured_text {
            div class="structured-text" {
                (StructuredTextRenderer::new(text, links, annotator).render())
            }
        }
        @if let Some(published) = &page.first_published_at {
            footer class="published" { "Published at " (format_date(published)) }
        }
    }
}

/// Render a query result, or the not-found error.
pub fn render_data(
    data: &Value,
    links: RecordLinks,
    annotator: &mut Annotator,
) -> Result<Markup, SiteError> {
    let page = page_record(data)?;
    Ok(render_page(&page, links, annotator))
}

/// Inline error block for a failed live connection.
pub fn error_block(error: &ConnectionError) -> Markup {
    html! {
        div class="live-error" role="alert" {
            pre { (error.code) } ": " (error.message)
        }
    }
}

fn format_date(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Lowercase, dash-separated anchor for a heading.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn children(node: &Value) -> &[Value] {
    node.get("children")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn str_field<'v>(node: &'v Value, key: &str) -> Option<&'v str> {
    node.get(key).and_then(Value::as_str)
}

/// Visible text of a node and its descendants.
fn plain_text(node: &Value) -> String {
    match str_field(node, "value") {
        Some(value) => pressroom_core::stega::strip(value).into_owned(),
        None => children(node).iter().map(plain_text).collect(),
    }
}

fn by_id(records: &[Value]) -> HashMap<&str, &Value> {
    records
        .iter()
        .filter_map(|r| str_field(r, "id").map(|id| (id, r)))
        .collect()
}

struct StructuredTextRenderer<'a> {
    document: &'a Value,
    blocks: HashMap<&'a str, &'a Value>,
    links: HashMap<&'a str, &'a Value>,
    record_links: RecordLinks,
    annotator: &'a mut Annotator,
}

impl<'a> StructuredTextRenderer<'a> {
    fn new(text: &'a StructuredText, record_links: RecordLinks, annotator: &'a mut Annotator) -> Self {
        Self {
            document: text.value.get("document").unwrap_or(&text.value),
            blocks: by_id(&text.blocks),
            links: by_id(&text.links),
            record_links,
            annotator,
        }
    }

    fn render(&mut self) -> Markup {
        let document = self.document;
        self.node(document)
    }

    fn children(&mut self, node: &Value) -> Markup {
        html! {
            @for child in children(node) {
                (self.node(child))
            }
        }
    }

    fn node(&mut self, node: &Value) -> Markup {
        match str_field(node, "type").unwrap_or_default() {
            "root" => self.children(node),
            "paragraph" => html! { p { (self.children(node)) } },
            "heading" => self.heading(node),
            "list" => {
                let items = self.children(node);
                if str_field(node, "style") == Some("numbered") {
                    html! { ol { (items) } }
                } else {
                    html! { ul { (items) } }
                }
            }
            "listItem" => html! { li { (self.children(node)) } },
            "blockquote" => html! {
                figure class="quote" {
                    blockquote { (self.children(node)) }
                    @if let Some(attribution) = str_field(node, "attribution") {
                        figcaption { "— " (self.annotator.text(attribution)) }
                    }
                }
            },
            "code" => {
                let language = str_field(node, "language").unwrap_or("text");
                let code = self.annotator.attr(str_field(node, "code").unwrap_or_default());
                html! {
                    pre class={ "language-" (language) } { code { (code) } }
                }
            }
            "thematicBreak" => html! { hr; },
            "span" => self.span(node),
            "link" => {
                let url = str_field(node, "url").unwrap_or("#");
                html! { a href=(url) { (self.children(node)) } }
            }
            "itemLink" => {
                let href = self.linked(node).map(|r| self.record_links.href(r));
                match href {
                    Some(href) => html! { a href=(href) { (self.children(node)) } },
                    None => self.children(node),
                }
            }
            "inlineItem" => match self.linked(node) {
                Some(record) => self.inline_record(record),
                None => html! {},
            },
            "block" | "inlineBlock" => {
                let block = str_field(node, "item").and_then(|id| self.blocks.get(id).copied());
                match block {
                    Some(block) => self.block(block),
                    None => html! {},
                }
            }
            other => {
                tracing::debug!(node_type = other, "skipping unknown structured-text node");
                html! {}
            }
        }
    }

    fn linked(&self, node: &Value) -> Option<&'a Value> {
        str_field(node, "item").and_then(|id| self.links.get(id).copied())
    }

    fn heading(&mut self, node: &Value) -> Markup {
        let level = node
            .get("level")
            .and_then(Value::as_u64)
            .unwrap_or(2)
            .clamp(1, 6);
        let slug = slugify(&plain_text(node));
        let inner = if slug.is_empty() {
            self.children(node)
        } else {
            let children = self.children(node);
            html! { a href={ "#" (slug) } { (children) } }
        };
        let id = (!slug.is_empty()).then_some(slug);
        match level {
            1 => html! { h1 id=[id] { (inner) } },
            2 => html! { h2 id=[id] { (inner) } },
            3 => html! { h3 id=[id] { (inner) } },
            4 => html! { h4 id=[id] { (inner) } },
            5 => html! { h5 id=[id] { (inner) } },
            _ => html! { h6 id=[id] { (inner) } },
        }
    }

    fn span(&mut self, node: &Value) -> Markup {
        let mut markup = self.annotator.text(str_field(node, "value").unwrap_or_default());
        let marks = node
            .get("marks")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for mark in marks.iter().filter_map(Value::as_str) {
            markup = match mark {
                "strong" => html! { strong { (markup) } },
                "emphasis" => html! { em { (markup) } },
                "underline" => html! { u { (markup) } },
                "strikethrough" => html! { s { (markup) } },
                "code" => html! { code { (markup) } },
                "highlight" => html! { mark { (markup) } },
                _ => markup,
            };
        }
        markup
    }

    fn inline_record(&mut self, record: &Value) -> Markup {
        match str_field(record, "__typename") {
            Some("PageRecord") => {
                let href = self.record_links.href(record);
                html! {
                    a class="pill" href=(href) {
                        (self.annotator.text(str_field(record, "title").unwrap_or_default()))
                    }
                }
            }
            _ => html! {},
        }
    }

    fn block(&mut self, block: &Value) -> Markup {
        match str_field(block, "__typename") {
            Some("ImageBlockRecord") => {
                let asset = &block["asset"];
                html! {
                    figure {
                        (self.image(&asset["responsiveImage"]))
                        @if let Some(title) = str_field(asset, "title") {
                            figcaption { (self.annotator.text(title)) }
                        }
                    }
                }
            }
            Some("ImageGalleryBlockRecord") => {
                let assets = block["assets"].as_array().map(Vec::as_slice).unwrap_or_default();
                html! {
                    div class="gallery" {
                        div {
                            @for asset in assets {
                                figure {
                                    (self.image(&asset["responsiveImage"]))
                                    @if let Some(title) = str_field(asset, "title") {
                                        figcaption { (self.annotator.text(title)) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
            Some("VideoBlockRecord") => {
                let asset = &block["asset"];
                html! {
                    figure {
                        (self.video(&asset["video"]))
                        @if let Some(title) = str_field(asset, "title") {
                            figcaption { (self.annotator.text(title)) }
                        }
                    }
                }
            }
            other => {
                tracing::debug!(typename = ?other, "skipping unknown block");
                html! {}
            }
        }
    }

    fn image(&self, image: &Value) -> Markup {
        let Some(src) = str_field(image, "src") else {
            return html! {};
        };
        let alt = self.annotator.attr(str_field(image, "alt").unwrap_or_default());
        html! {
            img src=(src)
                srcset=[str_field(image, "srcSet")]
                sizes=[str_field(image, "sizes")]
                width=[image.get("width").and_then(Value::as_u64)]
                height=[image.get("height").and_then(Value::as_u64)]
                alt=(alt)
                loading="lazy";
        }
    }

    fn video(&self, video: &Value) -> Markup {
        let Some(playback_id) = str_field(video, "muxPlaybackId") else {
            return html! {};
        };
        html! {
            video controls preload="none"
                poster=[str_field(video, "blurUpThumb")]
                width=[video.get("width").and_then(Value::as_u64)]
                height=[video.get("height").and_then(Value::as_u64)] {
                source src={ "https://stream.mux.com/" (playback_id) ".m3u8" }
                    type="application/x-mpegURL";
            }
        }
    }
}
