//! Edit-location tokens.
//!
//! When a draft query asks for visual-editing metadata, the CMS appends an
//! invisible run of zero-width characters to every text value. The run
//! encodes a small JSON object:
//!
//! ```json
//! {"origin": "datocms.com", "href": "https://acme.admin.datocms.com/editor/item_types/12/items/34/edit#fieldPath=title"}
//! ```
//!
//! Each byte of the JSON is written as four base-4 digits (most significant
//! first) using the alphabet `U+200B U+200C U+200D U+FEFF`. The text reads
//! the same to a visitor; the overlay layer decodes the run to find which
//! record and field produced the text.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Zero-width digits, indexed by value.
const ALPHABET: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Shortest run worth decoding: `{}` is two bytes, eight digits.
const MIN_RUN: usize = 8;

fn digit(c: char) -> Option<u8> {
    ALPHABET.iter().position(|d| *d == c).map(|p| p as u8)
}

/// Metadata embedded in a rendered text value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLocationToken {
    /// Who produced the token (e.g. `datocms.com`).
    pub origin: String,
    /// Editing URL of the field that produced the text.
    pub href: String,
}

/// A token resolved down to the record/field it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTarget {
    /// Record ID.
    pub item_id: String,
    /// Model ID, when present in the editing URL.
    pub item_type_id: Option<String>,
    /// Dotted field path inside the record (e.g. `structured_text.en`).
    pub field_path: Option<String>,
    /// Locale of the edited value, when the URL names one.
    pub locale: Option<String>,
    /// The editing URL itself, used for the new-tab fallback.
    pub href: String,
}

impl EditLocationToken {
    /// Resolve the editing URL into record, model, field and locale.
    pub fn target(&self) -> Result<EditTarget> {
        let url = Url::parse(&self.href)?;
        let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();

        let after = |marker: &str| {
            segments
                .iter()
                .position(|s| *s == marker)
                .and_then(|i| segments.get(i + 1))
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        let item_id = after("items").ok_or_else(|| Error::InvalidEditUrl {
            url: self.href.clone(),
            reason: "missing item id",
        })?;

        let mut field_path = None;
        let mut locale = None;
        if let Some(fragment) = url.fragment() {
            for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
                match key.as_ref() {
                    "fieldPath" => field_path = Some(value.into_owned()),
                    "locale" => locale = Some(value.into_owned()),
                    _ => {}
                }
            }
        }

        Ok(EditTarget {
            item_id,
            item_type_id: after("item_types"),
            field_path,
            locale,
            href: self.href.clone(),
        })
    }
}

/// Encode a token as an invisible run.
#[cfg(any(test, feature = "test-util"))]
pub fn encode(token: &EditLocationToken) -> Result<String> {
    let json = serde_json::to_vec(token)?;
    let mut out = String::with_capacity(json.len() * 4 * 3);
    for byte in json {
        for shift in [6u8, 4, 2, 0] {
            out.push(ALPHABET[((byte >> shift) & 0b11) as usize]);
        }
    }
    Ok(out)
}

/// Append an encoded token to a visible string.
#[cfg(any(test, feature = "test-util"))]
pub fn embed(visible: &str, token: &EditLocationToken) -> Result<String> {
    Ok(format!("{visible}{}", encode(token)?))
}

fn decode_run(run: &[u8]) -> Result<EditLocationToken> {
    if run.len() % 4 != 0 {
        return Err(Error::InvalidToken(format!(
            "run of {} digits is not byte aligned",
            run.len()
        )));
    }
    let bytes: Vec<u8> = run
        .chunks_exact(4)
        .map(|d| (d[0] << 6) | (d[1] << 4) | (d[2] << 2) | d[3])
        .collect();
    Ok(serde_json::from_slice(&bytes)?)
}

/// Collect every maximal zero-width run in `text` as digit values.
fn runs(text: &str) -> Vec<Vec<u8>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for c in text.chars() {
        match digit(c) {
            Some(d) => current.push(d),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Decode every token embedded in `text`, skipping runs that don't decode.
pub fn decode_all(text: &str) -> Vec<EditLocationToken> {
    runs(text)
        .into_iter()
        .filter(|run| run.len() >= MIN_RUN)
        .filter_map(|run| match decode_run(&run) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::trace!(error = %e, "ignoring undecodable zero-width run");
                None
            }
        })
        .collect()
}

/// Decode the first token embedded in `text`.
pub fn decode(text: &str) -> Option<EditLocationToken> {
    decode_all(text).into_iter().next()
}

/// Remove every zero-width digit from `text`.
pub fn strip(text: &str) -> Cow<'_, str> {
    if text.chars().any(|c| digit(c).is_some()) {
        Cow::Owned(text.chars().filter(|c| digit(*c).is_none()).collect())
    } else {
        Cow::Borrowed(text)
    }
}

/// Split `text` into its visible part and the first embedded token.
pub fn split(text: &str) -> (Cow<'_, str>, Option<EditLocationToken>) {
    (strip(text), decode(text))
}
