//! Markdown import: parse Markdown into a [`Post`].
//!
//! Block mapping:
//!
//! | Markdown | Node |
//! |----------|------|
//! | paragraph | `p` markup section |
//! | heading | `h1`..`h6` markup section |
//! | list | `ul` / `ol` list section (nested lists are flattened) |
//! | image | image section, after the block containing it |
//! | code block | `code` card with `{code, language}` |
//! | thematic break | `hr` card |
//!
//! Inline `**strong**`, `*em*`, `~~s~~`, `` `code` `` and links become markups.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde_json::json;

use super::Section;
use super::types::{Card, ImageSection, ListItem, ListSection, Markup, MarkupSection, Post};

impl Post {
    /// Parse Markdown into a post.
    pub fn from_markdown(input: &str) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let mut state = ParserState::default();
        for event in Parser::new_ext(input, options) {
            match event {
                Event::Start(tag) => state.handle_start_tag(tag),
                Event::End(tag_end) => state.handle_end_tag(tag_end),
                Event::Text(text) => state.handle_text(&text),
                Event::Code(code) => state.handle_inline_code(&code),
                Event::SoftBreak => state.push_run(" "),
                Event::HardBreak => state.push_run("\n"),
                Event::Rule => state.push_block(Card::new("hr", json!({})).into()),
                _ => {}
            }
        }
        state.finish()
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

/// Internal state for tracking open blocks and inline formatting.
#[derive(Default)]
struct ParserState {
    sections: Vec<Section>,
    /// Tag of the open markup section, if any.
    block_tag: Option<&'static str>,
    /// The outermost open list; nested lists feed into it.
    list: Option<ListSection>,
    list_depth: usize,
    /// Active inline markups, outermost first.
    markups: Vec<Markup>,
    runs: Vec<(String, Vec<Markup>)>,
    /// Blocks found inside another block, emitted once it closes.
    pending: Vec<Section>,
    /// Open code block: (language, text).
    code: Option<(String, String)>,
    in_image: bool,
}

impl ParserState {
    fn handle_start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => {
                if self.list_depth == 0 {
                    self.block_tag = Some("p");
                } else if !self.runs.is_empty() {
                    // Paragraphs of a loose list item share one item
                    self.runs.push((" ".to_string(), Vec::new()));
                }
            }
            Tag::Heading { level, .. } => {
                if self.list_depth == 0 {
                    self.block_tag = Some(heading_tag(level));
                }
            }
            Tag::List(start) => {
                self.list_depth += 1;
                if self.list_depth == 1 {
                    let tag_name = if start.is_some() { "ol" } else { "ul" };
                    self.list = Some(ListSection::new(tag_name));
                } else {
                    // Parent item text ends where the nested list begins
                    self.flush_item();
                }
            }
            Tag::Item => self.flush_item(),
            Tag::Strong => self.markups.push(Markup::new("strong")),
            Tag::Emphasis => self.markups.push(Markup::new("em")),
            Tag::Strikethrough => self.markups.push(Markup::new("s")),
            Tag::Link { dest_url, .. } => {
                self.markups
                    .push(Markup::new("a").attribute("href", dest_url.to_string()));
            }
            Tag::Image { dest_url, .. } => {
                self.in_image = true;
                self.push_block(ImageSection::new(dest_url.to_string()).into());
            }
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some((language, String::new()));
            }
            _ => {}
        }
    }

    fn handle_end_tag(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Paragraph | TagEnd::Heading(_) => {
                if self.list_depth == 0 {
                    self.flush_section();
                }
            }
            TagEnd::Item => self.flush_item(),
            TagEnd::List(_) => {
                self.list_depth = self.list_depth.saturating_sub(1);
                if self.list_depth == 0 {
                    self.flush_item();
                    if let Some(list) = self.list.take() {
                        self.sections.push(list.into());
                    }
                    self.sections.append(&mut self.pending);
                }
            }
            TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough | TagEnd::Link => {
                self.markups.pop();
            }
            TagEnd::Image => self.in_image = false,
            TagEnd::CodeBlock => {
                if let Some((language, code)) = self.code.take() {
                    let card = Card::new("code", json!({ "code": code, "language": language }));
                    self.push_block(card.into());
                }
            }
            _ => {}
        }
    }

    fn handle_text(&mut self, text: &str) {
        if self.in_image {
            return;
        }
        if let Some((_, code)) = self.code.as_mut() {
            code.push_str(text);
            return;
        }
        self.push_run(text);
    }

    fn handle_inline_code(&mut self, code: &str) {
        let mut markups = self.markups.clone();
        markups.push(Markup::new("code"));
        self.runs.push((code.to_string(), markups));
    }

    fn push_run(&mut self, text: &str) {
        self.runs.push((text.to_string(), self.markups.clone()));
    }

    /// Emit a block now, or after the enclosing block if one is open.
    fn push_block(&mut self, section: Section) {
        if self.block_tag.is_some() || self.list_depth > 0 {
            self.pending.push(section);
        } else {
            self.sections.push(section);
        }
    }

    fn flush_section(&mut self) {
        if let Some(tag_name) = self.block_tag.take() {
            let section = MarkupSection::from_runs(tag_name, self.runs.drain(..));
            if !section.markers.is_empty() {
                self.sections.push(section.into());
            }
        }
        self.runs.clear();
        self.sections.append(&mut self.pending);
    }

    fn flush_item(&mut self) {
        if self.runs.is_empty() {
            return;
        }
        let item = ListItem::from_runs(self.runs.drain(..));
        if let Some(list) = self.list.as_mut() {
            list.items.push(item);
        }
    }

    fn finish(mut self) -> Post {
        self.flush_section();
        if let Some(list) = self.list.take() {
            self.sections.push(list.into());
        }
        self.sections.append(&mut self.pending);
        Post {
            sections: self.sections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Marker;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_heading_and_paragraph() {
        let post = Post::from_markdown("# Title\n\nHello **world**");
        assert_eq!(
            post,
            Post::new()
                .section(MarkupSection::new("h1").marker(Marker::new("Title")))
                .section(
                    MarkupSection::new("p")
                        .marker(Marker::new("Hello "))
                        .marker(Marker::new("world").open(Markup::new("strong")).close(1))
                )
        );
    }

    #[test]
    fn test_nested_inline_markups() {
        let post = Post::from_markdown("**bold *both***");
        let Section::MarkupSection(p) = &post.sections[0] else {
            panic!("expected markup section");
        };
        assert_eq!(
            p.markers,
            vec![
                Marker::new("bold ").open(Markup::new("strong")),
                Marker::new("both").open(Markup::new("em")).close(2),
            ]
        );
    }

    #[test]
    fn test_link_markup() {
        let post = Post::from_markdown("[site](https://example.com)");
        let Section::MarkupSection(p) = &post.sections[0] else {
            panic!("expected markup section");
        };
        assert_eq!(
            p.markers[0].opened_markups[0],
            Markup::new("a").attribute("href", "https://example.com")
        );
    }

    #[test]
    fn test_unordered_and_ordered_lists() {
        let post = Post::from_markdown("- one\n- two\n\n1. first\n");
        assert_eq!(post.sections.len(), 2);
        let Section::ListSection(ul) = &post.sections[0] else {
            panic!("expected list section");
        };
        assert_eq!(ul.tag_name, "ul");
        assert_eq!(ul.items.len(), 2);
        assert_eq!(ul.items[1].markers[0].value, "two");
        assert!(matches!(&post.sections[1], Section::ListSection(ol) if ol.tag_name == "ol"));
    }

    #[test]
    fn test_nested_list_is_flattened() {
        let post = Post::from_markdown("- outer\n  - inner\n- last\n");
        assert_eq!(post.sections.len(), 1);
        let Section::ListSection(list) = &post.sections[0] else {
            panic!("expected list section");
        };
        let values: Vec<&str> = list
            .items
            .iter()
            .map(|item| item.markers[0].value.as_str())
            .collect();
        assert_eq!(values, vec!["outer", "inner", "last"]);
    }

    #[test]
    fn test_heading_in_list_keeps_block_order() {
        let post = Post::from_markdown("- # head\n\n---\n\nafter\n");
        let kinds: Vec<&str> = post
            .sections
            .iter()
            .map(|section| match section {
                Section::ListSection(_) => "list",
                Section::Card(_) => "card",
                Section::MarkupSection(_) => "p",
                Section::ImageSection(_) => "image",
            })
            .collect();
        assert_eq!(kinds, vec!["list", "card", "p"]);

        let Section::ListSection(list) = &post.sections[0] else {
            panic!("expected list section");
        };
        assert_eq!(list.items[0].markers, vec![Marker::new("head")]);
    }

    #[test]
    fn test_loose_list_item_paragraphs_are_separated() {
        let post = Post::from_markdown("- first para\n\n  second para\n");
        let Section::ListSection(list) = &post.sections[0] else {
            panic!("expected list section");
        };
        assert_eq!(list.items.len(), 1);
        assert_eq!(
            list.items[0].markers,
            vec![Marker::new("first para second para")]
        );
    }

    #[test]
    fn test_image_follows_paragraph() {
        let post = Post::from_markdown("Look: ![cat](cat.png)");
        assert_eq!(post.sections.len(), 2);
        assert!(matches!(
            &post.sections[0],
            Section::MarkupSection(p) if p.markers[0].value == "Look: "
        ));
        assert_eq!(post.sections[1], Section::ImageSection(ImageSection::new("cat.png")));
    }

    #[test]
    fn test_code_block_card() {
        let post = Post::from_markdown("```rust\nfn main() {}\n```\n");
        assert_eq!(
            post.sections,
            vec![Section::Card(Card::new(
                "code",
                json!({"code": "fn main() {}\n", "language": "rust"})
            ))]
        );
    }

    #[test]
    fn test_rule_card() {
        let post = Post::from_markdown("above\n\n---\n\nbelow");
        assert_eq!(post.sections.len(), 3);
        assert!(matches!(&post.sections[1], Section::Card(c) if c.name == "hr"));
    }

    #[test]
    fn test_inline_code() {
        let post = Post::from_markdown("run `cargo`");
        let Section::MarkupSection(p) = &post.sections[0] else {
            panic!("expected markup section");
        };
        assert_eq!(
            p.markers[1],
            Marker::new("cargo").open(Markup::new("code")).close(1)
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Post::from_markdown(""), Post::new());
    }
}
