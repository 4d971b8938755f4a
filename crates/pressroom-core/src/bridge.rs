//! Message protocol between the edit overlay and an embedding preview host.
//!
//! When the site runs inside the CMS's visual preview frame, the overlay
//! and the host exchange `postMessage` payloads. Every payload is a JSON
//! object tagged with `type` and stamped with [`SOURCE`] so unrelated
//! frames' traffic can be ignored.
//!
//! The host is optional. The overlay announces itself with `ready`; if no
//! `hostReady` reply arrives, it stays in new-tab mode and never sends
//! `openItem`. The `openItem` envelopes are built here, one per edit
//! region, and the browser runtime posts them as-is.

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::stega::EditTarget;

/// Marker placed on every envelope.
pub const SOURCE: &str = "pressroom-content-link";

/// Every message kind the bridge understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BridgeMessage {
    /// Overlay handshake, carrying the current route.
    Ready { path: String },
    /// Ask the host to open a field in its side panel.
    OpenItem {
        item_id: String,
        item_type_id: Option<String>,
        field_path: Option<String>,
        locale: Option<String>,
        edit_url: String,
    },
    /// The preview navigated; the host should follow.
    PathChanged { path: String },
    /// Host acknowledgement of `ready`.
    HostReady,
    /// The host asks the preview to navigate.
    NavigateTo { path: String },
}

impl BridgeMessage {
    /// Build the `openItem` request for an edit target.
    pub fn open_item(target: &EditTarget) -> Self {
        Self::OpenItem {
            item_id: target.item_id.clone(),
            item_type_id: target.item_type_id.clone(),
            field_path: target.field_path.clone(),
            locale: target.locale.clone(),
            edit_url: target.href.clone(),
        }
    }

    /// The wire name of this message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::OpenItem { .. } => "openItem",
            Self::PathChanged { .. } => "pathChanged",
            Self::HostReady => "hostReady",
            Self::NavigateTo { .. } => "navigateTo",
        }
    }

    /// Wrap the message in its envelope: the tagged object plus `source`.
    pub fn to_envelope(&self) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.insert("source".to_string(), Value::String(SOURCE.to_string()));
        }
        Ok(value)
    }

    /// Protocol description handed to the browser runtime.
    ///
    /// The runtime reads message names from here instead of hard-coding
    /// them.
    pub fn protocol() -> Value {
        let sample = [
            Self::Ready {
                path: String::new(),
            },
            Self::OpenItem {
                item_id: String::new(),
                item_type_id: None,
                field_path: None,
                locale: None,
                edit_url: String::new(),
            },
            Self::PathChanged {
                path: String::new(),
            },
            Self::HostReady,
            Self::NavigateTo {
                path: String::new(),
            },
        ];
        let kinds: serde_json::Map<String, Value> = sample
            .iter()
            .map(|m| (m.kind().to_string(), Value::String(m.kind().to_string())))
            .collect();
        json!({ "source": SOURCE, "kinds": kinds })
    }
}
