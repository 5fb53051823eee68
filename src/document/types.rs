//! Node payload types for the document model.
//!
//! All types derive `Serialize + Deserialize` so the same types work for
//! both Rust construction and JSON loading.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Section;

// ============================================================================
// POST
// ============================================================================

/// The document root: an ordered list of sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Post {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section.
    pub fn section(mut self, section: impl Into<Section>) -> Self {
        self.sections.push(section.into());
        self
    }
}

// ============================================================================
// SECTIONS
// ============================================================================

/// A block of marked-up text (`p`, `h1`..`h6`, `blockquote`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupSection {
    pub tag_name: String,
    #[serde(default)]
    pub markers: Vec<Marker>,
}

impl MarkupSection {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            markers: Vec::new(),
        }
    }

    /// Append a marker.
    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Build a section from `(text, markups)` runs. See [`markers_from_runs`].
    pub fn from_runs<S: Into<String>>(
        tag_name: impl Into<String>,
        runs: impl IntoIterator<Item = (S, Vec<Markup>)>,
    ) -> Self {
        Self {
            tag_name: tag_name.into(),
            markers: markers_from_runs(runs),
        }
    }
}

/// A `ul` or `ol` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSection {
    pub tag_name: String,
    #[serde(default)]
    pub items: Vec<ListItem>,
}

impl ListSection {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            items: Vec::new(),
        }
    }

    /// Append a list item.
    pub fn item(mut self, item: ListItem) -> Self {
        self.items.push(item);
        self
    }
}

/// One entry of a [`ListSection`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(default)]
    pub markers: Vec<Marker>,
}

impl ListItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn from_runs<S: Into<String>>(runs: impl IntoIterator<Item = (S, Vec<Markup>)>) -> Self {
        Self {
            markers: markers_from_runs(runs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSection {
    pub src: String,
}

impl ImageSection {
    pub fn new(src: impl Into<String>) -> Self {
        Self { src: src.into() }
    }
}

/// An embedded card: a named block with an opaque JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    #[serde(default = "empty_payload")]
    pub payload: serde_json::Value,
}

fn empty_payload() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Card {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

// ============================================================================
// INLINE CONTENT
// ============================================================================

/// A run of text.
///
/// Markups nest like a stack across a section's markers: a marker first
/// opens `opened_markups` (outermost first), then its text, then closes the
/// `closed_count` innermost markups that are currently open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub value: String,
    #[serde(default)]
    pub opened_markups: Vec<Markup>,
    #[serde(default)]
    pub closed_count: usize,
}

impl Marker {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            opened_markups: Vec::new(),
            closed_count: 0,
        }
    }

    /// Open a markup at the start of this marker.
    pub fn open(mut self, markup: Markup) -> Self {
        self.opened_markups.push(markup);
        self
    }

    /// Close `count` markups after this marker's text.
    pub fn close(mut self, count: usize) -> Self {
        self.closed_count = count;
        self
    }
}

/// An inline formatting span (`strong`, `em`, `a`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Markup {
    pub tag_name: String,
    /// Sorted by key so equal markups compare and serialize identically.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Markup {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Attributes flattened to `[k1, v1, k2, v2, ...]` in key order.
    pub fn sorted_attributes(&self) -> Vec<String> {
        self.attributes
            .iter()
            .flat_map(|(k, v)| [k.clone(), v.clone()])
            .collect()
    }
}

// ============================================================================
// TAG NAMES
// ============================================================================

/// Tags a [`MarkupSection`] may carry.
pub const MARKUP_SECTION_TAGS: &[&str] = &[
    "p",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pull-quote",
    "aside",
];

/// Tags a [`ListSection`] may carry.
pub const LIST_SECTION_TAGS: &[&str] = &["ul", "ol"];

/// Tags a [`Markup`] may carry.
pub const MARKUP_TAGS: &[&str] = &[
    "a", "b", "code", "em", "i", "s", "strong", "sub", "sup", "u",
];

pub fn is_markup_section_tag(tag_name: &str) -> bool {
    MARKUP_SECTION_TAGS.contains(&tag_name)
}

pub fn is_list_section_tag(tag_name: &str) -> bool {
    LIST_SECTION_TAGS.contains(&tag_name)
}

pub fn is_markup_tag(tag_name: &str) -> bool {
    MARKUP_TAGS.contains(&tag_name)
}

/// A plain attribute name: an ASCII letter, then letters, digits, `-`, `_`
/// or `:`.
pub fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

// ============================================================================
// RUN NORMALIZATION
// ============================================================================

fn common_prefix(a: &[Markup], b: &[Markup]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Build markers from `(text, markups)` runs, where each run lists every
/// markup applied to its text, outermost first.
///
/// Adjacent runs with identical markups are merged and empty runs dropped.
/// A marker opens the markups past the prefix it shares with the previous
/// run and closes the markups past the prefix it shares with the next one.
pub fn markers_from_runs<S: Into<String>>(
    runs: impl IntoIterator<Item = (S, Vec<Markup>)>,
) -> Vec<Marker> {
    let mut merged: Vec<(String, Vec<Markup>)> = Vec::new();
    for (text, markups) in runs {
        let text = text.into();
        if text.is_empty() {
            continue;
        }
        if let Some((prev_text, prev_markups)) = merged.last_mut() {
            if *prev_markups == markups {
                prev_text.push_str(&text);
                continue;
            }
        }
        merged.push((text, markups));
    }

    let mut markers = Vec::with_capacity(merged.len());
    for (i, (text, markups)) in merged.iter().enumerate() {
        let opened_from = match i.checked_sub(1) {
            Some(prev) => common_prefix(markups, &merged[prev].1),
            None => 0,
        };
        let kept = match merged.get(i + 1) {
            Some((_, next)) => common_prefix(markups, next),
            None => 0,
        };
        markers.push(Marker {
            value: text.clone(),
            opened_markups: markups[opened_from..].to_vec(),
            closed_count: markups.len() - kept,
        });
    }
    markers
}
