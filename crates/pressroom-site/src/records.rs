//! CMS records as the management API and plugins hand them to us.
//!
//! Both the web-previews plugin and the SEO analysis plugin need to know
//! which page of this site shows a given record. That mapping lives here.

use serde::Deserialize;
use serde_json::{Map, Value};

/// API key of the only model with a public route.
pub const PAGE_MODEL: &str = "page";

/// Publication status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Never published.
    Draft,
    /// Published, with unpublished changes on top.
    Updated,
    /// Published and unchanged since.
    Published,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordMeta {
    #[serde(default)]
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Deserialize)]
struct Linkage {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Relationship {
    data: Option<Linkage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Relationships {
    item_type: Option<Relationship>,
}

/// A record in JSON:API form.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub meta: RecordMeta,
    #[serde(default)]
    relationships: Relationships,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemTypeAttributes {
    pub api_key: String,
}

/// A model, as sent alongside a record by the web-previews plugin.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemType {
    #[serde(default)]
    pub id: Option<String>,
    pub attributes: ItemTypeAttributes,
}

impl Record {
    pub fn status(&self) -> Option<RecordStatus> {
        self.meta.status
    }

    pub fn item_type_id(&self) -> Option<&str> {
        self.relationships
            .item_type
            .as_ref()
            .and_then(|r| r.data.as_ref())
            .map(|d| d.id.as_str())
    }

    /// A string attribute, resolving localized values to `locale`.
    ///
    /// Localized fields arrive as an object keyed by locale; unlocalized
    /// ones as the bare value.
    pub fn text_attribute(&self, field: &str, locale: &str) -> Option<&str> {
        match self.attributes.get(field)? {
            Value::String(s) => Some(s.as_str()),
            Value::Object(by_locale) => by_locale.get(locale).and_then(Value::as_str),
            _ => None,
        }
        .filter(|s| !s.is_empty())
    }
}

/// The path of the page displaying `record`, if its model has one.
pub fn website_route(record: &Record, model_api_key: &str, locale: &str) -> Option<String> {
    match model_api_key {
        PAGE_MODEL => slug(record, model_api_key, locale).map(|s| format!("/real-time-updates/{s}")),
        _ => None,
    }
}

/// The slug `record` is published under, if its model has one.
pub fn slug(record: &Record, model_api_key: &str, locale: &str) -> Option<String> {
    match model_api_key {
        PAGE_MODEL => record.text_attribute("slug", locale).map(str::to_string),
        _ => None,
    }
}
