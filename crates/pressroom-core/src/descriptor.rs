//! Query descriptors.

use serde_json::{Map, Value, json};

use crate::access::AccessMode;

/// A named GraphQL document known at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDocument {
    /// Operation name, used in logs.
    pub name: &'static str,
    /// The GraphQL source text.
    pub source: &'static str,
}

/// What to fetch and through which view: (document, variables, draft flag).
///
/// The descriptor is immutable once built. The gateway derives the
/// credential and cache tag from it, and the live client subscribes with it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    document: QueryDocument,
    variables: Map<String, Value>,
    mode: AccessMode,
}

impl QueryDescriptor {
    /// Build a descriptor from a document, its variable bindings and the
    /// session's draft flag.
    pub fn new(document: QueryDocument, variables: Map<String, Value>, draft: bool) -> Self {
        Self {
            document,
            variables,
            mode: AccessMode::from_draft(draft),
        }
    }

    /// The GraphQL document.
    pub fn document(&self) -> &QueryDocument {
        &self.document
    }

    /// Variable bindings.
    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// Access mode derived from the draft flag.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Whether this descriptor targets draft content.
    pub fn is_draft(&self) -> bool {
        self.mode.is_draft()
    }

    /// GraphQL request body: `{query, variables}`.
    pub fn request_body(&self) -> Value {
        json!({
            "query": self.document.source,
            "variables": self.variables,
        })
    }

    /// Delivery-API headers for this descriptor, minus `Authorization`.
    ///
    /// Invalid records are always excluded so broken links never reach
    /// rendering. Draft descriptors also include drafts and request
    /// edit-location tokens built from `base_editing_url`.
    pub fn delivery_headers(
        &self,
        base_editing_url: &str,
        environment: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut headers = vec![("X-Exclude-Invalid", "true".to_string())];
        if self.mode.is_draft() {
            headers.push(("X-Include-Drafts", "true".to_string()));
        }
        if self.mode.embeds_edit_tokens() {
            headers.push(("X-Visual-Editing", "vercel-v1".to_string()));
            headers.push(("X-Base-Editing-Url", base_editing_url.to_string()));
        }
        if let Some(env) = environment {
            headers.push(("X-Environment", env.to_string()));
        }
        headers
    }

    /// Stable 64-bit fingerprint of (document, variables, mode).
    ///
    /// `serde_json::Map` keeps keys sorted, so equal bindings always hash
    /// the same regardless of insertion order.
    pub fn fingerprint(&self) -> u64 {
        let variables = Value::Object(self.variables.clone()).to_string();
        let mut buf = Vec::with_capacity(
            self.document.source.len() + variables.len() + self.mode.as_str().len() + 2,
        );
        buf.extend_from_slice(self.document.source.as_bytes());
        buf.push(0);
        buf.extend_from_slice(variables.as_bytes());
        buf.push(0);
        buf.extend_from_slice(self.mode.as_str().as_bytes());
        xxhash_rust::xxh3::xxh3_64(&buf)
    }
}
