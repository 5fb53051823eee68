//! # HTML Renderer
//!
//! Renders document nodes to an HTML string.
//!
//! Sections become block elements, list items become `<li>`, markups wrap
//! the marker text they span. Cards have no HTML form of their own and
//! render as an empty placeholder carrying the card name:
//!
//! ```text
//! <p>plain <strong>bold</strong></p><div data-card="hr"></div>
//! ```

use serde_json::Value;

use crate::document::{
    Card, ImageSection, ListItem, ListSection, Marker, Markup, MarkupSection, Post,
    is_attribute_name, is_list_section_tag, is_markup_section_tag, is_markup_tag,
};
use crate::error::CompileError;
use crate::ir::{
    Compiler, HandlerTable, Opcode, Opcodes, Visitable, Visitor, compile, param_pairs,
    param_str, param_usize, visit, visit_array,
};

// ============================================================================
// VISITOR
// ============================================================================

/// Emits the HTML opcode set.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlVisitor;

impl HtmlVisitor {
    fn element<N: Visitable>(
        &self,
        tag_name: &str,
        children: &[N],
        opcodes: &mut Opcodes,
    ) -> Result<(), CompileError> {
        opcodes.push(Opcode::unary("openElement", tag_name.to_string()));
        visit_array(self, children, opcodes)?;
        opcodes.push(Opcode::unary("closeElement", tag_name.to_string()));
        Ok(())
    }
}

impl Visitor for HtmlVisitor {
    fn post(&self, node: &Post, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        visit_array(self, &node.sections, opcodes)
    }

    fn markup_section(
        &self,
        node: &MarkupSection,
        opcodes: &mut Opcodes,
    ) -> Result<(), CompileError> {
        self.element(&node.tag_name, &node.markers, opcodes)
    }

    fn list_section(&self, node: &ListSection, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        self.element(&node.tag_name, &node.items, opcodes)
    }

    fn list_item(&self, node: &ListItem, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        self.element("li", &node.markers, opcodes)
    }

    fn image_section(
        &self,
        node: &ImageSection,
        opcodes: &mut Opcodes,
    ) -> Result<(), CompileError> {
        opcodes.push(Opcode::unary("image", node.src.clone()));
        Ok(())
    }

    fn card(&self, node: &Card, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        opcodes.push(Opcode::binary(
            "card",
            node.name.clone(),
            node.payload.clone(),
        ));
        Ok(())
    }

    fn marker(&self, node: &Marker, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        visit_array(self, &node.opened_markups, opcodes)?;
        opcodes.push(Opcode::unary("text", node.value.clone()));
        if node.closed_count > 0 {
            opcodes.push(Opcode::unary("closeMarkups", node.closed_count));
        }
        Ok(())
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
// TARGET
// ============================================================================

/// Escape text for use in element content or a quoted attribute value.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Element tags are written raw, so only known block tags get through.
fn element_tag(param: &Value) -> Result<&str, CompileError> {
    let tag_name = param_str(param, 0)?;
    if tag_name == "li" || is_markup_section_tag(tag_name) || is_list_section_tag(tag_name) {
        Ok(tag_name)
    } else {
        Err(CompileError::InvalidParam {
            index: 0,
            expected: "a known section tag",
            found: tag_name.to_string(),
        })
    }
}

/// Opcode target that writes HTML into a string buffer.
#[derive(Debug, Default)]
pub struct HtmlRenderer {
    html: String,
    open_markups: Vec<String>,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The HTML written so far.
    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn finish(self) -> String {
        self.html
    }

    fn open_element(&mut self, tag_name: &Value) -> Result<(), CompileError> {
        let tag_name = element_tag(tag_name)?;
        self.html.push('<');
        self.html.push_str(tag_name);
        self.html.push('>');
        Ok(())
    }

    fn close_element(&mut self, tag_name: &Value) -> Result<(), CompileError> {
        let tag_name = element_tag(tag_name)?;
        if !self.open_markups.is_empty() {
            return Err(CompileError::Misplaced {
                name: "closeElement",
                reason: "markups are still open",
            });
        }
        self.html.push_str("</");
        self.html.push_str(tag_name);
        self.html.push('>');
        Ok(())
    }

    fn open_markup(&mut self, tag_name: &Value, attributes: &Value) -> Result<(), CompileError> {
        let tag_name = param_str(tag_name, 0)?;
        if !is_markup_tag(tag_name) {
            return Err(CompileError::InvalidParam {
                index: 0,
                expected: "a known markup tag",
                found: tag_name.to_string(),
            });
        }
        let attributes = param_pairs(attributes, 1)?;
        if let Some((key, _)) = attributes.iter().find(|(key, _)| !is_attribute_name(key)) {
            return Err(CompileError::InvalidParam {
                index: 1,
                expected: "plain attribute names",
                found: key.clone(),
            });
        }
        self.html.push('<');
        self.html.push_str(tag_name);
        for (key, value) in attributes {
            self.html.push(' ');
            self.html.push_str(&key);
            self.html.push_str("=\"");
            self.html.push_str(&escape_html(&value));
            self.html.push('"');
        }
        self.html.push('>');
        self.open_markups.push(tag_name.to_string());
        Ok(())
    }

    fn text(&mut self, value: &Value) -> Result<(), CompileError> {
        self.html.push_str(&escape_html(param_str(value, 0)?));
        Ok(())
    }

    fn close_markups(&mut self, count: &Value) -> Result<(), CompileError> {
        let n = param_usize(count, 0)?;
        if n > self.open_markups.len() {
            return Err(CompileError::InvalidParam {
                index: 0,
                expected: "a count no larger than the open markups",
                found: n.to_string(),
            });
        }
        for _ in 0..n {
            if let Some(tag_name) = self.open_markups.pop() {
                self.html.push_str("</");
                self.html.push_str(&tag_name);
                self.html.push('>');
            }
        }
        Ok(())
    }

    fn image(&mut self, src: &Value) -> Result<(), CompileError> {
        let src = param_str(src, 0)?;
        self.html.push_str("<img src=\"");
        self.html.push_str(&escape_html(src));
        self.html.push_str("\">");
        Ok(())
    }

    fn card(&mut self, name: &Value, _payload: &Value) -> Result<(), CompileError> {
        let name = param_str(name, 0)?;
        self.html.push_str("<div data-card=\"");
        self.html.push_str(&escape_html(name));
        self.html.push_str("\"></div>");
        Ok(())
    }
}

impl Compiler for HtmlRenderer {
    fn handlers() -> HandlerTable<Self> {
        HandlerTable::new()
            .unary("openElement", Self::open_element)
            .unary("closeElement", Self::close_element)
            .binary("openMarkup", Self::open_markup)
            .unary("text", Self::text)
            .unary("closeMarkups", Self::close_markups)
            .unary("image", Self::image)
            .binary("card", Self::card)
    }
}

/// Render any node to HTML.
pub fn render<N: Visitable + ?Sized>(node: &N) -> Result<String, CompileError> {
    let mut opcodes = Opcodes::new();
    visit(&HtmlVisitor, node, &mut opcodes)?;

    let mut renderer = HtmlRenderer::new();
    compile(&mut renderer, &HtmlRenderer::handlers(), &opcodes)?;
    Ok(renderer.finish())
}
