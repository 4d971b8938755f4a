//! HTML rendering for CMS pages.
//!
//! Pages are built from the page query result and the site-wide favicon
//! tags, then wrapped in a shared shell. Draft renders also collect the
//! edit regions the browser overlay needs.
//!
//! All rendering uses [maud](https://maud.lambda.xyz/) for compile-time HTML
//! generation with automatic XSS protection (all dynamic values are escaped).

pub mod components;
pub mod content;
pub mod overlay;

use maud::Markup;
use serde::Serialize;
use serde_json::Value;

use self::content::RecordLinks;
use self::overlay::{Annotator, Region};
use crate::error::SiteError;

/// Rendered page content with its edit regions.
#[derive(Debug)]
pub struct Fragment {
    pub markup: Markup,
    pub regions: Vec<Region>,
}

/// Wire form of a fragment pushed to the browser on every live update.
#[derive(Debug, Serialize)]
pub struct LiveFrame {
    pub html: String,
    pub regions: Vec<Region>,
}

impl From<Fragment> for LiveFrame {
    fn from(fragment: Fragment) -> Self {
        Self {
            html: fragment.markup.into_string(),
            regions: fragment.regions,
        }
    }
}

/// Render the content area of a page query result.
///
/// Edit regions are only collected when `annotate` is set.
pub fn render_fragment(
    data: &Value,
    links: RecordLinks,
    annotate: bool,
) -> Result<Fragment, SiteError> {
    let mut annotator = Annotator::new(annotate);
    let markup = content::render_data(data, links, &mut annotator)?;
    Ok(Fragment {
        markup,
        regions: annotator.into_regions(),
    })
}
