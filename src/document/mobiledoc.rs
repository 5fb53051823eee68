//! Load Mobiledoc 0.3.x JSON into the document model.

use serde_json::Value;

use super::types::{
    Card, ImageSection, ListItem, ListSection, Marker, Markup, MarkupSection, Post,
    is_attribute_name, is_list_section_tag, is_markup_section_tag, is_markup_tag,
};
use super::Section;
use crate::error::CompileError;
use crate::renderers::mobiledoc::{
    ATOM_MARKER_TYPE, CARD_SECTION_TYPE, IMAGE_SECTION_TYPE, LIST_SECTION_TYPE,
    MARKUP_MARKER_TYPE, MARKUP_SECTION_TYPE,
};

fn invalid(msg: impl Into<String>) -> CompileError {
    CompileError::InvalidMobiledoc(msg.into())
}

fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>, CompileError> {
    value
        .as_array()
        .ok_or_else(|| invalid(format!("{} must be an array, got {}", what, value)))
}

fn as_str<'a>(value: &'a Value, what: &str) -> Result<&'a str, CompileError> {
    value
        .as_str()
        .ok_or_else(|| invalid(format!("{} must be a string, got {}", what, value)))
}

fn as_index(value: &Value, what: &str) -> Result<usize, CompileError> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(format!("{} must be a non-negative integer, got {}", what, value)))
}

/// Lookup tables shared by every section of one document.
struct Tables {
    markups: Vec<Markup>,
    cards: Vec<Card>,
}

impl Tables {
    fn parse(doc: &Value) -> Result<Self, CompileError> {
        let markups = match doc.get("markups") {
            Some(v) => as_array(v, "markups")?
                .iter()
                .enumerate()
                .map(|(i, m)| parse_markup_type(m, i))
                .collect::<Result<Vec<_>, CompileError>>()?,
            None => Vec::new(),
        };
        let cards = match doc.get("cards") {
            Some(v) => as_array(v, "cards")?
                .iter()
                .enumerate()
                .map(|(i, c)| parse_card_type(c, i))
                .collect::<Result<Vec<_>, CompileError>>()?,
            None => Vec::new(),
        };
        Ok(Self { markups, cards })
    }

    fn markup(&self, index: usize) -> Result<Markup, CompileError> {
        self.markups
            .get(index)
            .cloned()
            .ok_or_else(|| invalid(format!("markup index {} out of range", index)))
    }

    fn card(&self, index: usize) -> Result<Card, CompileError> {
        self.cards
            .get(index)
            .cloned()
            .ok_or_else(|| invalid(format!("card index {} out of range", index)))
    }
}

fn parse_markup_type(value: &Value, i: usize) -> Result<Markup, CompileError> {
    let what = format!("markups[{}]", i);
    let entry = as_array(value, &what)?;
    let tag_name = entry
        .first()
        .ok_or_else(|| invalid(format!("{} is empty", what)))?;
    let tag_name = as_str(tag_name, &what)?.to_lowercase();
    if !is_markup_tag(&tag_name) {
        return Err(invalid(format!("{}: unknown markup tag {:?}", what, tag_name)));
    }
    let mut markup = Markup::new(tag_name);
    if let Some(attrs) = entry.get(1) {
        let attrs = as_array(attrs, &what)?;
        if attrs.len() % 2 != 0 {
            return Err(invalid(format!("{} attributes must come in pairs", what)));
        }
        for pair in attrs.chunks(2) {
            let key = as_str(&pair[0], &what)?;
            if !is_attribute_name(key) {
                return Err(invalid(format!("{}: invalid attribute name {:?}", what, key)));
            }
            markup = markup.attribute(key, as_str(&pair[1], &what)?);
        }
    }
    Ok(markup)
}

fn parse_card_type(value: &Value, i: usize) -> Result<Card, CompileError> {
    let what = format!("cards[{}]", i);
    let entry = as_array(value, &what)?;
    let name = entry
        .first()
        .ok_or_else(|| invalid(format!("{} is empty", what)))?;
    let payload = entry
        .get(1)
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    Ok(Card::new(as_str(name, &what)?, payload))
}

fn parse_markers(value: &Value, tables: &Tables, what: &str) -> Result<Vec<Marker>, CompileError> {
    as_array(value, what)?
        .iter()
        .map(|m| -> Result<Marker, CompileError> {
            let entry = as_array(m, what)?;
            let [kind, open, closed, text] = entry.as_slice() else {
                return Err(invalid(format!("{} marker must have 4 entries", what)));
            };
            match kind.as_u64() {
                Some(MARKUP_MARKER_TYPE) => {}
                Some(ATOM_MARKER_TYPE) => {
                    return Err(invalid(format!("{}: atoms are not supported", what)));
                }
                _ => return Err(invalid(format!("{}: unknown marker type {}", what, kind))),
            }
            let opened_markups = as_array(open, what)?
                .iter()
                .map(|idx| tables.markup(as_index(idx, what)?))
                .collect::<Result<Vec<_>, CompileError>>()?;
            Ok(Marker {
                value: as_str(text, what)?.to_string(),
                opened_markups,
                closed_count: as_index(closed, what)?,
            })
        })
        .collect()
}

fn parse_section(value: &Value, tables: &Tables, i: usize) -> Result<Section, CompileError> {
    let what = format!("sections[{}]", i);
    let entry = as_array(value, &what)?;
    let kind = entry
        .first()
        .and_then(Value::as_u64)
        .ok_or_else(|| invalid(format!("{} has no section type", what)))?;
    let field = |n: usize| {
        entry
            .get(n)
            .ok_or_else(|| invalid(format!("{} is missing entry {}", what, n)))
    };
    let tag = |n: usize, allowed: fn(&str) -> bool| -> Result<String, CompileError> {
        let tag_name = as_str(field(n)?, &what)?.to_lowercase();
        if allowed(&tag_name) {
            Ok(tag_name)
        } else {
            Err(invalid(format!("{}: unknown section tag {:?}", what, tag_name)))
        }
    };

    let section = match kind {
        MARKUP_SECTION_TYPE => Section::MarkupSection(MarkupSection {
            tag_name: tag(1, is_markup_section_tag)?,
            markers: parse_markers(field(2)?, tables, &what)?,
        }),
        IMAGE_SECTION_TYPE => Section::ImageSection(ImageSection::new(as_str(field(1)?, &what)?)),
        LIST_SECTION_TYPE => Section::ListSection(ListSection {
            tag_name: tag(1, is_list_section_tag)?,
            items: as_array(field(2)?, &what)?
                .iter()
                .map(|item| -> Result<ListItem, CompileError> {
                    Ok(ListItem {
                        markers: parse_markers(item, tables, &what)?,
                    })
                })
                .collect::<Result<Vec<_>, CompileError>>()?,
        }),
        CARD_SECTION_TYPE => Section::Card(tables.card(as_index(field(1)?, &what)?)?),
        other => return Err(invalid(format!("{}: unknown section type {}", what, other))),
    };
    Ok(section)
}

impl Post {
    /// Read a Mobiledoc 0.3.x document.
    pub fn from_mobiledoc(doc: &Value) -> Result<Self, CompileError> {
        let version = doc
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing version"))?;
        if !version.starts_with("0.3") {
            return Err(invalid(format!("unsupported version {}", version)));
        }

        let tables = Tables::parse(doc)?;
        let sections = match doc.get("sections") {
            Some(v) => as_array(v, "sections")?
                .iter()
                .enumerate()
                .map(|(i, s)| parse_section(s, &tables, i))
                .collect::<Result<Vec<_>, CompileError>>()?,
            None => Vec::new(),
        };
        Ok(Post { sections })
    }

    /// Read a Mobiledoc 0.3.x document from a JSON string.
    pub fn from_mobiledoc_str(json: &str) -> Result<Self, CompileError> {
        let doc: Value = serde_json::from_str(json)?;
        Self::from_mobiledoc(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderers::mobiledoc;
    use serde_json::json;

    #[test]
    fn test_parse_sections() {
        let doc = json!({
            "version": "0.3.2",
            "atoms": [],
            "cards": [["hr", {}]],
            "markups": [["b"], ["a", ["href", "https://example.com"]]],
            "sections": [
                [1, "P", [[0, [0], 1, "bold"], [0, [], 0, " plain"]]],
                [2, "cat.png"],
                [3, "ul", [[[0, [1], 1, "link"]]]],
                [10, 0]
            ]
        });
        let post = Post::from_mobiledoc(&doc).unwrap();
        assert_eq!(post.sections.len(), 4);

        let Section::MarkupSection(p) = &post.sections[0] else {
            panic!("expected markup section");
        };
        assert_eq!(p.tag_name, "p");
        assert_eq!(p.markers[0], Marker::new("bold").open(Markup::new("b")).close(1));

        let Section::ListSection(list) = &post.sections[2] else {
            panic!("expected list section");
        };
        assert_eq!(
            list.items[0].markers[0].opened_markups[0].attributes["href"],
            "https://example.com"
        );
        assert!(matches!(&post.sections[3], Section::Card(c) if c.name == "hr"));
    }

    #[test]
    fn test_serializer_output_reads_back() {
        let post = Post::new()
            .section(MarkupSection::from_runs(
                "p",
                [
                    ("x ", vec![]),
                    ("y", vec![Markup::new("em")]),
                ],
            ))
            .section(Card::new("code", json!({"code": "fn main() {}"})));
        let doc = mobiledoc::render(&post).unwrap();
        assert_eq!(Post::from_mobiledoc(&doc.to_json()).unwrap(), post);
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let err = Post::from_mobiledoc(&json!({"version": "0.2.0", "sections": []})).unwrap_err();
        assert!(matches!(err, CompileError::InvalidMobiledoc(_)));
    }

    #[test]
    fn test_rejects_atoms() {
        let doc = json!({
            "version": "0.3.2",
            "atoms": [["mention", "@bob", {}]],
            "sections": [[1, "p", [[1, [], 0, 0]]]]
        });
        let err = Post::from_mobiledoc(&doc).unwrap_err();
        assert!(err.to_string().contains("atoms are not supported"));
    }

    #[test]
    fn test_rejects_out_of_range_markup() {
        let doc = json!({
            "version": "0.3.2",
            "markups": [],
            "sections": [[1, "p", [[0, [3], 1, "x"]]]]
        });
        let err = Post::from_mobiledoc(&doc).unwrap_err();
        assert!(err.to_string().contains("markup index 3 out of range"));
    }

    #[test]
    fn test_rejects_unknown_section_tag() {
        let doc = json!({
            "version": "0.3.2",
            "sections": [[1, "p><script>alert(1)</script", [[0, [], 0, "x"]]]]
        });
        let err = Post::from_mobiledoc(&doc).unwrap_err();
        assert!(err.to_string().contains("unknown section tag"));

        let doc = json!({"version": "0.3.2", "sections": [[3, "p", []]]});
        assert!(matches!(
            Post::from_mobiledoc(&doc).unwrap_err(),
            CompileError::InvalidMobiledoc(_)
        ));
    }

    #[test]
    fn test_rejects_unknown_markup_tag() {
        let doc = json!({
            "version": "0.3.2",
            "markups": [["script"]],
            "sections": []
        });
        let err = Post::from_mobiledoc(&doc).unwrap_err();
        assert!(err.to_string().contains("unknown markup tag"));
    }

    #[test]
    fn test_rejects_injected_attribute_name() {
        let doc = json!({
            "version": "0.3.2",
            "markups": [["a", ["onmouseover=alert(1) x", "y"]]],
            "sections": [[1, "p", [[0, [0], 1, "hi"]]]]
        });
        let err = Post::from_mobiledoc(&doc).unwrap_err();
        assert!(matches!(err, CompileError::InvalidMobiledoc(_)));
        assert!(err.to_string().contains("invalid attribute name"));
    }

    #[test]
    fn test_rejects_unknown_section_type() {
        let doc = json!({"version": "0.3.2", "sections": [[7, "x"]]});
        let err = Post::from_mobiledoc(&doc).unwrap_err();
        assert!(err.to_string().contains("unknown section type 7"));
    }
}
