//! Shared HTML components used across all pages.
//!
//! These are maud functions that return `Markup` fragments for composition
//! into full pages, plus the inline stylesheet and browser scripts.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use pressroom_core::{BridgeMessage, stega};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::overlay::{Region, json_script};

/// Inline CSS for all pages.
pub const PAGE_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
:root{--bg:#fafafa;--fg:#111;--fg2:#555;--fg3:#999;--accent:#ff7751;--accent-hover:#e0603c;--border:rgba(0,0,0,.1);--mono:"SF Mono",SFMono-Regular,ui-monospace,Menlo,monospace}
body{font-family:Inter,-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;line-height:1.6;color:var(--fg);background:var(--bg);min-height:100vh;display:flex;flex-direction:column;align-items:center;padding:1.5rem 1rem}
header{max-width:760px;width:100%;display:flex;flex-wrap:wrap;align-items:center;gap:1rem;padding-bottom:1rem;margin-bottom:2rem;border-bottom:1px solid var(--border)}
header h1{font-size:1.1rem;font-weight:700;flex:1 1 100%}
header nav{display:flex;gap:1rem;flex:1;flex-wrap:wrap;font-size:.9rem}
header button{background:var(--accent);color:#fff;border:none;border-radius:6px;padding:.45rem .9rem;font-size:.85rem;cursor:pointer}
header button:hover{background:var(--accent-hover)}
main{max-width:760px;width:100%;flex:1}
main h1{font-size:2rem;line-height:1.2;letter-spacing:-.02em;margin-bottom:1rem}
main h2,main h3,main h4{margin:1.75rem 0 .75rem;letter-spacing:-.01em}
main h2 a,main h3 a,main h4 a{color:inherit}
main p{margin:.75rem 0}
main ul,main ol{margin:.75rem 0;padding-left:1.5rem}
main li p{margin:.25rem 0}
main pre{background:#1e1e2e;color:#e5e5e5;border-radius:6px;padding:.85rem 1rem;overflow-x:auto;margin:1rem 0;font-size:.85rem}
main code{font-family:var(--mono);font-size:.9em}
main hr{border:none;border-top:1px solid var(--border);margin:2rem 0}
main figure{margin:1.5rem 0}
main figcaption{font-size:.85rem;color:var(--fg3);margin-top:.35rem}
main img,main video{max-width:100%;height:auto;border-radius:6px;display:block}
.quote blockquote{border-left:3px solid var(--accent);padding-left:1rem;color:var(--fg2)}
.gallery>div{display:flex;gap:.75rem;overflow-x:auto}
.gallery figure{margin:0;flex-shrink:0}
.pill{display:inline-block;padding:0 .5rem;border-radius:100px;background:rgba(255,119,81,.12)}
a{color:var(--accent);text-decoration:none}
a:hover{text-decoration:underline}
.published{margin-top:2.5rem;font-size:.85rem;color:var(--fg3)}
.live-error{background:#fff1f0;border:1px solid #ffccc7;border-radius:6px;padding:.75rem 1rem;color:#a8071a}
.live-error pre{display:inline;background:none;color:inherit;padding:0;margin:0;font-weight:700}
.home-templates{margin-top:1rem;padding-left:1.25rem}
.home-templates li{margin:.5rem 0}
.home-templates span{color:var(--fg2)}
.edit-overlays [data-edit-region]{outline:1px dashed rgba(255,119,81,.6);outline-offset:2px;cursor:pointer}
.edit-overlays [data-edit-region]:hover{outline:2px solid var(--accent);background:rgba(255,119,81,.08)}
@media(prefers-color-scheme:dark){
:root{--bg:#0f0f17;--fg:#e5e5e5;--fg2:#a0a0a0;--fg3:#666;--border:rgba(255,255,255,.12)}
.live-error{background:#2a1215;border-color:#58181c;color:#ff7875}
}
"#;

/// Inline CSS for error pages.
pub const ERROR_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;display:flex;justify-content:center;align-items:center;min-height:100vh;background:#fafafa;color:#1a1a2e;padding:1rem}
.error-page{text-align:center;max-width:400px}
.error-page h1{font-size:1.5rem;margin-bottom:.75rem}
.error-page p{color:#666;margin-bottom:1rem;line-height:1.5}
.error-page a{color:#ff7751}
@media(prefers-color-scheme:dark){
body{background:#0f0f17;color:#e0e0e8}
.error-page p{color:#aaa}
}
"#;

/// Content-Security-Policy header value.
///
/// Inline styles and scripts only; the live channel connects back to this
/// origin. No `frame-ancestors`: the CMS preview frame embeds these pages.
pub const CSP_HEADER: &str = "default-src 'self'; style-src 'unsafe-inline'; script-src 'unsafe-inline'; img-src https: data:; media-src https: blob:; connect-src 'self'; form-action 'none'";

/// Draft-mode toggle button behaviour.
pub const TOGGLER_JS: &str = r#"
(function(){
  var button = document.getElementById('draft-mode-toggler');
  if (!button) return;
  button.addEventListener('click', async function(){
    var response;
    try {
      if (button.dataset.draft === 'true') {
        response = await fetch('/draft-mode/disable');
      } else {
        var token = prompt('To enter Draft Mode, you need to insert the SECRET_API_TOKEN:');
        if (!token) return;
        response = await fetch('/draft-mode/enable?token=' + encodeURIComponent(token));
      }
    } catch (e) {
      response = null;
    }
    if (!response || !response.ok) {
      alert('Could not complete the operation!');
      return;
    }
    document.location.reload();
  });
})();
"#;

/// Live-update runtime: swaps the content container on every pushed render.
///
/// A channel the browser gives up on (refused, or dropped without a
/// `channel-error`) is shown with the same inline error block.
pub const LIVE_JS: &str = r#"
(function(){
  var container = document.querySelector('[data-live-props]');
  if (!container || !window.EventSource) return;
  var source = new EventSource('/live?props=' + encodeURIComponent(container.dataset.liveProps));
  var failed = false;
  function clearRegions(){
    document.dispatchEvent(new CustomEvent('pressroom:regions', { detail: [] }));
  }
  source.addEventListener('update', function(event){
    var frame = JSON.parse(event.data);
    container.innerHTML = frame.html;
    document.dispatchEvent(new CustomEvent('pressroom:regions', { detail: frame.regions }));
  });
  source.addEventListener('channel-error', function(event){
    failed = true;
    source.close();
    container.innerHTML = JSON.parse(event.data).html;
    clearRegions();
  });
  source.onerror = function(){
    if (failed || source.readyState !== EventSource.CLOSED) return;
    failed = true;
    var block = document.createElement('div');
    block.className = 'live-error';
    block.setAttribute('role', 'alert');
    var code = document.createElement('pre');
    code.textContent = 'CONNECTION_FAILED';
    block.appendChild(code);
    block.appendChild(document.createTextNode(': the live-update channel could not be opened'));
    container.replaceChildren(block);
    clearRegions();
  };
  window.addEventListener('pagehide', function(){ failed = true; source.close(); });
})();
"#;

/// Click-to-edit overlay and preview-host bridge.
///
/// Message names come from the `pressroom-bridge` manifest; regions from
/// `pressroom-regions`, replaced on every live update. Each region carries
/// the `openItem` envelope to post.
pub const OVERLAY_JS: &str = r#"
(function(){
  function read(id){
    var el = document.getElementById(id);
    return el ? JSON.parse(el.textContent) : null;
  }
  var protocol = read('pressroom-bridge');
  if (!protocol) return;
  var kinds = protocol.kinds;
  var regions = {};
  function load(list){
    regions = {};
    (list || []).forEach(function(region){ regions[region.id] = region; });
  }
  load(read('pressroom-regions'));
  document.addEventListener('pressroom:regions', function(event){ load(event.detail); });

  var host = window.parent !== window ? window.parent : null;
  var hostReady = false;
  function send(message){
    if (!host) return;
    message.source = protocol.source;
    host.postMessage(message, '*');
  }
  function currentPath(){ return location.pathname + location.search; }

  var hover = window.matchMedia('(hover: hover)');
  var enabled = hover.matches;
  function sync(){ document.documentElement.classList.toggle('edit-overlays', enabled); }
  sync();
  hover.addEventListener('change', function(){ enabled = hover.matches; sync(); });
  window.addEventListener('keydown', function(event){
    if (event.key === 'Alt' && !event.repeat) { enabled = !hover.matches; sync(); }
  });
  window.addEventListener('keyup', function(event){
    if (event.key === 'Alt') { enabled = hover.matches; sync(); }
  });
  window.addEventListener('blur', function(){ enabled = hover.matches; sync(); });

  document.addEventListener('click', function(event){
    if (!enabled) return;
    var el = event.target.closest('[data-edit-region]');
    if (!el) return;
    event.preventDefault();
    event.stopPropagation();
    var region = regions[el.dataset.editRegion];
    if (host && hostReady && region) {
      send(region.open);
    } else {
      window.open(el.dataset.editUrl, '_blank', 'noopener');
    }
  }, true);

  window.addEventListener('message', function(event){
    var data = event.data;
    if (!data || data.source !== protocol.source) return;
    if (data.type === kinds.hostReady) {
      hostReady = true;
      send({ type: kinds.pathChanged, path: currentPath() });
    } else if (data.type === kinds.navigateTo && typeof data.path === 'string'
        && data.path.charAt(0) === '/' && data.path.charAt(1) !== '/' && data.path.charAt(1) !== '\\') {
      window.location.assign(data.path);
    }
  });
  window.addEventListener('popstate', function(){
    send({ type: kinds.pathChanged, path: currentPath() });
  });
  send({ type: kinds.ready, path: currentPath() });
})();
"#;

/// A `<head>` tag fragment as returned by the delivery API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoTag {
    pub tag: String,
    #[serde(default)]
    pub attributes: Option<Map<String, Value>>,
    #[serde(default)]
    pub content: Option<String>,
}

impl SeoTag {
    fn attr(&self, name: &str) -> Option<String> {
        self.attributes
            .as_ref()?
            .get(name)?
            .as_str()
            .map(|v| stega::strip(v).into_owned())
    }

    fn text(&self) -> Option<String> {
        self.content
            .as_deref()
            .map(|c| stega::strip(c).into_owned())
    }

    pub fn render(&self) -> Markup {
        match self.tag.as_str() {
            "title" => html! { title { (self.text().unwrap_or_default()) } },
            "meta" => html! {
                meta name=[self.attr("name")]
                    property=[self.attr("property")]
                    content=[self.attr("content")];
            },
            "link" => html! {
                link rel=[self.attr("rel")]
                    href=[self.attr("href")]
                    sizes=[self.attr("sizes")]
                    type=[self.attr("type")];
            },
            other => {
                tracing::debug!(tag = other, "skipping unsupported head tag");
                html! {}
            }
        }
    }
}

/// Parse tag fragments, ignoring a malformed list.
pub fn seo_tags(value: Option<&Value>) -> Vec<SeoTag> {
    value
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// Everything the page shell needs besides the body.
#[derive(Debug, Default)]
pub struct Shell<'a> {
    /// Head tags, site-wide favicons first.
    pub tags: &'a [SeoTag],
    /// `<title>` used when no tag provides one.
    pub fallback_title: &'a str,
    /// Whether the visitor is in draft mode.
    pub draft: bool,
    /// Edit regions of the initial render, when overlays are on.
    pub regions: Option<&'a [Region]>,
    /// Extra script appended to the body.
    pub script: Option<&'static str>,
}

/// Render the full HTML page shell.
pub fn page_shell(shell: Shell<'_>, body: Markup) -> Markup {
    let has_title = shell.tags.iter().any(|t| t.tag == "title");
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                @if !has_title {
                    title { (shell.fallback_title) }
                }
                @for tag in shell.tags {
                    (tag.render())
                }
                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                @if let Some(regions) = shell.regions {
                    (json_script("pressroom-bridge", &BridgeMessage::protocol()))
                    (json_script("pressroom-regions", &regions))
                    script { (PreEscaped(OVERLAY_JS)) }
                }
                (site_header(shell.draft))
                main { (body) }
                script { (PreEscaped(TOGGLER_JS)) }
                @if let Some(script) = shell.script {
                    script { (PreEscaped(script)) }
                }
            }
        }
    }
}

/// Site header with navigation and the draft-mode toggle.
pub fn site_header(draft: bool) -> Markup {
    html! {
        header {
            h1 { "DatoCMS + Rust Starter Kit" }
            nav {
                a href="https://www.datocms.com/docs" { "📚 Full Integration Guide" }
                a href="/basic" { "🔧 Basic Route" }
                a href="/real-time-updates" { "⚡️ Real-time Updates Route" }
            }
            @if draft {
                button id="draft-mode-toggler" type="button" data-draft="true"
                    title="Return to viewing published content" {
                    "Disable Draft Mode"
                }
            } @else {
                button id="draft-mode-toggler" type="button" data-draft="false"
                    title="Preview unpublished changes" {
                    "Enable Draft Mode"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(value: Value) -> Vec<SeoTag> {
        seo_tags(Some(&value))
    }

    #[test]
    fn renders_head_tags() {
        let tags = tags(json!([
            { "tag": "title", "content": "Hello | Site" },
            { "tag": "meta", "attributes": { "name": "description", "content": "A page" } },
            { "tag": "meta", "attributes": { "property": "og:title", "content": "Hello" } },
            { "tag": "link", "attributes": { "rel": "icon", "href": "/favicon.png", "sizes": "32x32", "type": "image/png" } },
            { "tag": "script", "content": "alert(1)" }
        ]));
        let html: String = tags.iter().map(|t| t.render().into_string()).collect();
        assert!(html.contains("<title>Hello | Site</title>"));
        assert!(html.contains("<meta name=\"description\" content=\"A page\">"));
        assert!(html.contains("<meta property=\"og:title\" content=\"Hello\">"));
        assert!(html.contains("<link rel=\"icon\" href=\"/favicon.png\" sizes=\"32x32\" type=\"image/png\">"));
        assert!(!html.contains("alert"));
    }

    #[test]
    fn malformed_tags_are_ignored() {
        assert!(tags(json!({"not": "a list"})).is_empty());
        assert!(seo_tags(None).is_empty());
    }

    #[test]
    fn shell_falls_back_to_default_title() {
        let html = page_shell(
            Shell {
                fallback_title: "Home",
                ..Default::default()
            },
            html! { p { "body" } },
        )
        .into_string();
        assert!(html.contains("<title>Home</title>"));
        assert!(html.contains("Enable Draft Mode"));
        assert!(!html.contains("pressroom-bridge"));
    }

    #[test]
    fn draft_shell_includes_overlay() {
        let tags = tags(json!([{ "tag": "title", "content": "T" }]));
        let html = page_shell(
            Shell {
                tags: &tags,
                fallback_title: "ignored",
                draft: true,
                regions: Some(&[][..]),
                script: None,
            },
            html! {},
        )
        .into_string();
        assert!(!html.contains("ignored"));
        assert!(html.contains("id=\"pressroom-bridge\""));
        assert!(html.contains("\"hostReady\""));
        assert!(html.contains("Disable Draft Mode"));
    }

    #[test]
    fn live_runtime_shows_refused_channel_inline() {
        assert!(LIVE_JS.contains("source.readyState !== EventSource.CLOSED"));
        assert!(LIVE_JS.contains("className = 'live-error'"));
        assert!(LIVE_JS.contains("'CONNECTION_FAILED'"));
        assert!(PAGE_CSS.contains(".live-error pre"));
    }

    #[test]
    fn overlay_runtime_posts_region_envelopes() {
        assert!(OVERLAY_JS.contains("send(region.open)"));
        assert!(!OVERLAY_JS.contains("itemId"));
    }

    #[test]
    fn overlay_runtime_resyncs_with_host() {
        let ready = OVERLAY_JS.find("hostReady = true").unwrap();
        let sync = OVERLAY_JS[ready..].find("kinds.pathChanged").unwrap();
        assert!(sync < OVERLAY_JS[ready..].find("kinds.navigateTo").unwrap());
        assert!(OVERLAY_JS.contains("addEventListener('blur'"));
    }
}
