//! Typed items returned by the extraction endpoints.
//!
//! The backend answers every extraction call with a JSON array whose
//! element shape depends on the endpoint. [`decode_items`] turns that array
//! into [`ExtractedItem`]s of exactly one kind, so the rest of the crate
//! never handles untyped JSON.

use crate::error::AugmenterError;
use crate::mode::ExtractionMode;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Where in the document an item was found.
///
/// The backend sends a bare page number for single-page items and a label
/// such as `"Pages 3-4"` for items spanning pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRef {
    Number(u32),
    Label(String),
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRef::Number(n) => write!(f, "Page {n}"),
            PageRef::Label(s) => f.write_str(s),
        }
    }
}

/// An extracted table: its cell grid plus the generated description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableItem {
    /// Rows of cells, in document order. Empty cells may arrive as `null`.
    #[serde(default, deserialize_with = "cells_or_empty")]
    pub preview_data: Vec<Vec<String>>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_index: Option<u32>,
}

/// Read a cell grid, turning `null` cells (and a `null` grid) into empties.
fn cells_or_empty<'de, D>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows: Option<Vec<Vec<Option<String>>>> = Option::deserialize(deserializer)?;
    Ok(rows
        .unwrap_or_default()
        .into_iter()
        .map(|row| row.into_iter().map(Option::unwrap_or_default).collect())
        .collect())
}

impl TableItem {
    /// Widest row, in cells.
    pub fn column_count(&self) -> usize {
        self.preview_data.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// An extracted image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageItem {
    /// Base64 payload, either raw or as a `data:image/...;base64,` URL.
    #[serde(default, alias = "image_base64")]
    pub base64: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_index: Option<u32>,
}

impl ImageItem {
    /// MIME type announced by a `data:` URL payload, if any.
    pub fn declared_mime(&self) -> Option<&str> {
        let rest = self.base64.strip_prefix("data:")?;
        let (meta, _) = rest.split_once(',')?;
        meta.split(';').next().filter(|m| !m.is_empty())
    }

    /// Decode the payload into raw image bytes.
    ///
    /// Returns `Ok(None)` when the backend sent no image data.
    pub fn decode(&self) -> Result<Option<Vec<u8>>, AugmenterError> {
        let raw = match self.base64.split_once(";base64,") {
            Some((_, data)) => data,
            None => self.base64.as_str(),
        };
        let raw: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if raw.is_empty() {
            return Ok(None);
        }
        STANDARD
            .decode(raw.as_bytes())
            .map(Some)
            .map_err(|e| AugmenterError::Internal(format!("invalid base64 image payload: {e}")))
    }
}

/// Sniff an image format from its first bytes.
pub fn image_format(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => Some("png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        _ => None,
    }
}

/// An extracted formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaItem {
    /// LaTeX-like source; pass through [`crate::sanitize::sanitize`] before rendering.
    #[serde(default)]
    pub preview_data: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equation_index: Option<u32>,
}

/// One item of an extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExtractedItem {
    Table(TableItem),
    Image(ImageItem),
    Formula(FormulaItem),
}

impl ExtractedItem {
    /// The extraction mode that produces this kind of item.
    pub fn mode(&self) -> ExtractionMode {
        match self {
            ExtractedItem::Table(_) => ExtractionMode::Tables,
            ExtractedItem::Image(_) => ExtractionMode::Images,
            ExtractedItem::Formula(_) => ExtractionMode::Formulas,
        }
    }

    /// The generated description, sent as context with every question.
    pub fn description(&self) -> &str {
        match self {
            ExtractedItem::Table(t) => &t.description,
            ExtractedItem::Image(i) => &i.description,
            ExtractedItem::Formula(f) => &f.description,
        }
    }

    pub fn page(&self) -> Option<&PageRef> {
        match self {
            ExtractedItem::Table(t) => t.page.as_ref(),
            ExtractedItem::Image(i) => i.page.as_ref(),
            ExtractedItem::Formula(f) => f.page.as_ref(),
        }
    }
}

/// Decode an extraction response body into items of `mode`'s kind.
///
/// `endpoint` is only used for error messages.
pub fn decode_items(
    mode: ExtractionMode,
    body: serde_json::Value,
    endpoint: &str,
) -> Result<Vec<ExtractedItem>, AugmenterError> {
    let decode_failed = |detail: String| AugmenterError::DecodeFailed {
        endpoint: endpoint.to_string(),
        detail,
    };

    let serde_json::Value::Array(elements) = body else {
        return Err(decode_failed(format!(
            "expected a JSON array, got {}",
            json_type_name(&body)
        )));
    };

    elements
        .into_iter()
        .enumerate()
        .map(|(i, element)| {
            let item = match mode {
                ExtractionMode::Tables => serde_json::from_value(element).map(ExtractedItem::Table),
                ExtractionMode::Images => serde_json::from_value(element).map(ExtractedItem::Image),
                ExtractionMode::Formulas => {
                    serde_json::from_value(element).map(ExtractedItem::Formula)
                }
            };
            item.map_err(|e| decode_failed(format!("item {i}: {e}")))
        })
        .collect()
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Body of `POST /ask-question`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// The displayed item's description, whatever its kind.
    pub table_description: String,
}

/// Successful answer from `POST /ask-question`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}
