//! # Mobiledoc Serializer
//!
//! Serializes a [`Post`] to the Mobiledoc 0.3.2 JSON format.
//!
//! ```text
//! {
//!   "version": "0.3.2",
//!   "atoms": [],
//!   "cards": [["hr", {}]],
//!   "markups": [["strong"], ["a", ["href", "https://example.com"]]],
//!   "sections": [
//!     [1, "p", [[0, [], 0, "plain "], [0, [0], 1, "bold"]]],
//!     [10, 0]
//!   ]
//! }
//! ```
//!
//! Markup types are deduplicated on tag and sorted attributes; every card
//! section gets its own card type entry.

use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use std::collections::HashMap;

use crate::document::{
    Card, ImageSection, ListItem, ListSection, Marker, Markup, MarkupSection, Post,
};
use crate::error::CompileError;
use crate::ir::{
    Compiler, HandlerTable, Opcode, Opcodes, Visitor, compile, param_pairs, param_str,
    param_usize, visit, visit_array,
};

pub const MOBILEDOC_VERSION: &str = "0.3.2";

// Section and marker type identifiers from the 0.3 format.
pub(crate) const MARKUP_MARKER_TYPE: u64 = 0;
pub(crate) const ATOM_MARKER_TYPE: u64 = 1;
pub(crate) const MARKUP_SECTION_TYPE: u64 = 1;
pub(crate) const IMAGE_SECTION_TYPE: u64 = 2;
pub(crate) const LIST_SECTION_TYPE: u64 = 3;
pub(crate) const CARD_SECTION_TYPE: u64 = 10;

// ============================================================================
// VISITOR
// ============================================================================

/// Emits the Mobiledoc opcode set.
#[derive(Debug, Clone, Copy, Default)]
pub struct MobiledocVisitor;

impl Visitor for MobiledocVisitor {
    fn post(&self, node: &Post, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        opcodes.push(Opcode::new("openPost"));
        visit_array(self, &node.sections, opcodes)
    }

    fn markup_section(
        &self,
        node: &MarkupSection,
        opcodes: &mut Opcodes,
    ) -> Result<(), CompileError> {
        opcodes.push(Opcode::unary("openMarkupSection", node.tag_name.clone()));
        visit_array(self, &node.markers, opcodes)
    }

    fn list_section(&self, node: &ListSection, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        opcodes.push(Opcode::unary("openListSection", node.tag_name.clone()));
        visit_array(self, &node.items, opcodes)
    }

    fn list_item(&self, node: &ListItem, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        opcodes.push(Opcode::new("openListItem"));
        visit_array(self, &node.markers, opcodes)
    }

    fn image_section(
        &self,
        node: &ImageSection,
        opcodes: &mut Opcodes,
    ) -> Result<(), CompileError> {
        opcodes.push(Opcode::unary("openImageSection", node.src.clone()));
        Ok(())
    }

    fn card(&self, node: &Card, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        opcodes.push(Opcode::binary(
            "openCardSection",
            node.name.clone(),
            node.payload.clone(),
        ));
        Ok(())
    }

    fn marker(&self, node: &Marker, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        opcodes.push(Opcode::binary(
            "openMarker",
            node.closed_count,
            node.value.clone(),
        ));
        visit_array(self, &node.opened_markups, opcodes)
    }

    fn markup(&self, node: &Markup, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        opcodes.push(Opcode::binary(
            "openMarkup",
            node.tag_name.clone(),
            node.sorted_attributes(),
        ));
        Ok(())
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct MarkerEntry {
    open: Vec<usize>,
    closed: usize,
    value: String,
}

impl MarkerEntry {
    fn to_json(&self) -> Value {
        json!([MARKUP_MARKER_TYPE, self.open, self.closed, self.value])
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SectionEntry {
    Markup {
        tag_name: String,
        markers: Vec<MarkerEntry>,
    },
    Image {
        src: String,
    },
    List {
        tag_name: String,
        items: Vec<Vec<MarkerEntry>>,
    },
    Card {
        index: usize,
    },
}

impl SectionEntry {
    fn to_json(&self) -> Value {
        let markers_json = |markers: &[MarkerEntry]| -> Vec<Value> {
            markers.iter().map(MarkerEntry::to_json).collect()
        };
        match self {
            SectionEntry::Markup { tag_name, markers } => {
                json!([MARKUP_SECTION_TYPE, tag_name, markers_json(markers)])
            }
            SectionEntry::Image { src } => json!([IMAGE_SECTION_TYPE, src]),
            SectionEntry::List { tag_name, items } => {
                let items: Vec<Vec<Value>> = items.iter().map(|m| markers_json(m)).collect();
                json!([LIST_SECTION_TYPE, tag_name, items])
            }
            SectionEntry::Card { index } => json!([CARD_SECTION_TYPE, index]),
        }
    }
}

/// A serialized Mobiledoc 0.3.2 document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mobiledoc {
    cards: Vec<(String, Value)>,
    markups: Vec<(String, Vec<String>)>,
    sections: Vec<SectionEntry>,
}

impl Mobiledoc {
    /// Card type entries, in first-use order.
    pub fn cards(&self) -> &[(String, Value)] {
        &self.cards
    }

    /// Markup type entries: tag plus flattened sorted attributes.
    pub fn markups(&self) -> &[(String, Vec<String>)] {
        &self.markups
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// The document as a JSON value.
    pub fn to_json(&self) -> Value {
        let cards: Vec<Value> = self
            .cards
            .iter()
            .map(|(name, payload)| json!([name, payload]))
            .collect();
        let markups: Vec<Value> = self
            .markups
            .iter()
            .map(|(tag, attrs)| {
                if attrs.is_empty() {
                    json!([tag])
                } else {
                    json!([tag, attrs])
                }
            })
            .collect();
        let sections: Vec<Value> = self.sections.iter().map(SectionEntry::to_json).collect();
        json!({
            "version": MOBILEDOC_VERSION,
            "atoms": [],
            "cards": cards,
            "markups": markups,
            "sections": sections,
        })
    }
}

impl Serialize for Mobiledoc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// ============================================================================
// TARGET
// ============================================================================

/// Opcode target that accumulates a [`Mobiledoc`].
#[derive(Debug, Default)]
pub struct MobiledocBuilder {
    doc: Mobiledoc,
    markup_index: HashMap<(String, Vec<String>), usize>,
}

impl MobiledocBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish and return the document.
    pub fn finish(self) -> Mobiledoc {
        self.doc
    }

    /// The marker list new markers are appended to.
    fn current_markers(
        &mut self,
        name: &'static str,
    ) -> Result<&mut Vec<MarkerEntry>, CompileError> {
        match self.doc.sections.last_mut() {
            Some(SectionEntry::Markup { markers, .. }) => Ok(markers),
            Some(SectionEntry::List { items, .. }) => {
                items.last_mut().ok_or(CompileError::Misplaced {
                    name,
                    reason: "list section has no open item",
                })
            }
            _ => Err(CompileError::Misplaced {
                name,
                reason: "no open markup section or list item",
            }),
        }
    }

    fn open_post(&mut self) -> Result<(), CompileError> {
        *self = Self::default();
        Ok(())
    }

    fn open_markup_section(&mut self, tag_name: &Value) -> Result<(), CompileError> {
        self.doc.sections.push(SectionEntry::Markup {
            tag_name: param_str(tag_name, 0)?.to_string(),
            markers: Vec::new(),
        });
        Ok(())
    }

    fn open_list_section(&mut self, tag_name: &Value) -> Result<(), CompileError> {
        self.doc.sections.push(SectionEntry::List {
            tag_name: param_str(tag_name, 0)?.to_string(),
            items: Vec::new(),
        });
        Ok(())
    }

    fn open_list_item(&mut self) -> Result<(), CompileError> {
        match self.doc.sections.last_mut() {
            Some(SectionEntry::List { items, .. }) => {
                items.push(Vec::new());
                Ok(())
            }
            _ => Err(CompileError::Misplaced {
                name: "openListItem",
                reason: "no open list section",
            }),
        }
    }

    fn open_image_section(&mut self, src: &Value) -> Result<(), CompileError> {
        self.doc.sections.push(SectionEntry::Image {
            src: param_str(src, 0)?.to_string(),
        });
        Ok(())
    }

    fn open_card_section(&mut self, name: &Value, payload: &Value) -> Result<(), CompileError> {
        let index = self.doc.cards.len();
        self.doc
            .cards
            .push((param_str(name, 0)?.to_string(), payload.clone()));
        self.doc.sections.push(SectionEntry::Card { index });
        Ok(())
    }

    fn open_marker(&mut self, closed: &Value, value: &Value) -> Result<(), CompileError> {
        let closed = param_usize(closed, 0)?;
        let value = param_str(value, 1)?.to_string();
        self.current_markers("openMarker")?.push(MarkerEntry {
            open: Vec::new(),
            closed,
            value,
        });
        Ok(())
    }

    fn open_markup(&mut self, tag_name: &Value, attributes: &Value) -> Result<(), CompileError> {
        let tag_name = param_str(tag_name, 0)?.to_string();
        let attrs: Vec<String> = param_pairs(attributes, 1)?
            .into_iter()
            .flat_map(|(k, v)| [k, v])
            .collect();

        let key = (tag_name, attrs);
        let index = match self.markup_index.get(&key).copied() {
            Some(index) => index,
            None => {
                let index = self.doc.markups.len();
                self.doc.markups.push(key.clone());
                self.markup_index.insert(key, index);
                index
            }
        };

        let marker = self
            .current_markers("openMarkup")?
            .last_mut()
            .ok_or(CompileError::Misplaced {
                name: "openMarkup",
                reason: "no open marker",
            })?;
        marker.open.push(index);
        Ok(())
    }
}

impl Compiler for MobiledocBuilder {
    fn handlers() -> HandlerTable<Self> {
        HandlerTable::new()
            .nullary("openPost", Self::open_post)
            .unary("openMarkupSection", Self::open_markup_section)
            .unary("openListSection", Self::open_list_section)
            .nullary("openListItem", Self::open_list_item)
            .unary("openImageSection", Self::open_image_section)
            .binary("openCardSection", Self::open_card_section)
            .binary("openMarker", Self::open_marker)
            .binary("openMarkup", Self::open_markup)
    }
}

/// Serialize a post to Mobiledoc.
pub fn render(post: &Post) -> Result<Mobiledoc, CompileError> {
    let mut opcodes = Opcodes::new();
    visit(&MobiledocVisitor, post, &mut opcodes)?;

    let mut builder = MobiledocBuilder::new();
    compile(&mut builder, &MobiledocBuilder::handlers(), &opcodes)?;
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::markers_from_runs;
    use pretty_assertions::assert_eq;

    fn opcodes_for(post: &Post) -> Vec<Value> {
        let mut opcodes = Opcodes::new();
        visit(&MobiledocVisitor, post, &mut opcodes).unwrap();
        opcodes
            .iter()
            .map(|op| serde_json::to_value(op).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_post() {
        let doc = render(&Post::new()).unwrap();
        assert_eq!(
            doc.to_json(),
            json!({
                "version": "0.3.2",
                "atoms": [],
                "cards": [],
                "markups": [],
                "sections": []
            })
        );
    }

    #[test]
    fn test_visitor_opcodes() {
        let bold = Markup::new("strong");
        let post = Post::new()
            .section(MarkupSection::new("p").marker(Marker::new("hi").open(bold).close(1)))
            .section(ImageSection::new("a.png"));
        assert_eq!(
            opcodes_for(&post),
            vec![
                json!(["openPost"]),
                json!(["openMarkupSection", "p"]),
                json!(["openMarker", 1, "hi"]),
                json!(["openMarkup", "strong", []]),
                json!(["openImageSection", "a.png"]),
            ]
        );
    }

    #[test]
    fn test_markup_section_with_markups() {
        let link = Markup::new("a").attribute("href", "https://example.com");
        let bold = Markup::new("strong");
        let section = MarkupSection {
            tag_name: "p".into(),
            markers: markers_from_runs([
                ("plain ", vec![]),
                ("bold", vec![bold.clone()]),
                (" and ", vec![]),
                ("link", vec![link]),
                (" again", vec![bold]),
            ]),
        };
        let doc = render(&Post::new().section(section)).unwrap();
        assert_eq!(
            doc.to_json(),
            json!({
                "version": "0.3.2",
                "atoms": [],
                "cards": [],
                "markups": [["strong"], ["a", ["href", "https://example.com"]]],
                "sections": [
                    [1, "p", [
                        [0, [], 0, "plain "],
                        [0, [0], 1, "bold"],
                        [0, [], 0, " and "],
                        [0, [1], 1, "link"],
                        [0, [0], 1, " again"]
                    ]]
                ]
            })
        );
    }

    #[test]
    fn test_list_and_card_sections() {
        let post = Post::new()
            .section(
                ListSection::new("ul")
                    .item(ListItem::new().marker(Marker::new("one")))
                    .item(ListItem::new().marker(Marker::new("two"))),
            )
            .section(Card::new("hr", json!({})))
            .section(Card::new("hr", json!({})));
        let doc = render(&post).unwrap();
        assert_eq!(
            doc.to_json()["sections"],
            json!([
                [3, "ul", [[[0, [], 0, "one"]], [[0, [], 0, "two"]]]],
                [10, 0],
                [10, 1]
            ])
        );
        assert_eq!(doc.cards().len(), 2);
    }

    #[test]
    fn test_marker_without_section_is_misplaced() {
        let opcodes: Opcodes = [Opcode::new("openPost"), Opcode::binary("openMarker", 0, "x")]
            .into_iter()
            .collect();
        let mut builder = MobiledocBuilder::new();
        let err = compile(&mut builder, &MobiledocBuilder::handlers(), &opcodes).unwrap_err();
        assert!(matches!(
            err,
            CompileError::Misplaced {
                name: "openMarker",
                ..
            }
        ));
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let post = Post::new().section(ImageSection::new("cat.png"));
        let doc = render(&post).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), doc.to_json());
    }
}
