//! # Visitation
//!
//! Drives a [`Visitor`] over document nodes, appending opcodes to a shared
//! [`Opcodes`] accumulator.
//!
//! A visitor is the per-backend dispatch table: one method per node tag.
//! Every method defaults to "no entry", so a visitor that forgets a tag
//! fails with [`CompileError::UnknownNodeType`] the first time that tag is
//! reached. Composite handlers recurse into their children with
//! [`visit_array`], in the order the children should execute.

use tracing::{debug, trace};

use super::ops::Opcodes;
use crate::document::{
    Card, ImageSection, ListItem, ListSection, Marker, Markup, MarkupSection, NodeType, Post,
};
use crate::error::CompileError;

fn no_entry(node_type: NodeType) -> Result<(), CompileError> {
    Err(CompileError::UnknownNodeType(node_type))
}

/// The dispatch table: one opcode-emitting handler per node tag.
///
/// Handlers borrow `&self`, so a visitor is immutable for the length of a
/// traversal. They may only append to `opcodes`.
#[allow(unused_variables)]
pub trait Visitor {
    fn post(&self, node: &Post, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        no_entry(NodeType::Post)
    }

    fn markup_section(
        &self,
        node: &MarkupSection,
        opcodes: &mut Opcodes,
    ) -> Result<(), CompileError> {
        no_entry(NodeType::MarkupSection)
    }

    fn list_section(&self, node: &ListSection, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        no_entry(NodeType::ListSection)
    }

    fn list_item(&self, node: &ListItem, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        no_entry(NodeType::ListItem)
    }

    fn image_section(
        &self,
        node: &ImageSection,
        opcodes: &mut Opcodes,
    ) -> Result<(), CompileError> {
        no_entry(NodeType::ImageSection)
    }

    fn card(&self, node: &Card, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        no_entry(NodeType::Card)
    }

    fn marker(&self, node: &Marker, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        no_entry(NodeType::Marker)
    }

    fn markup(&self, node: &Markup, opcodes: &mut Opcodes) -> Result<(), CompileError> {
        no_entry(NodeType::Markup)
    }
}

/// A node the visitor can dispatch on.
pub trait Visitable {
    /// The node's variant tag.
    fn node_type(&self) -> NodeType;

    /// Invoke the visitor handler for this node's tag.
    fn accept<V: Visitor + ?Sized>(
        &self,
        visitor: &V,
        opcodes: &mut Opcodes,
    ) -> Result<(), CompileError>;
}

macro_rules! impl_visitable {
    ($($ty:ty => $tag:ident, $method:ident;)+) => {
        $(
            impl Visitable for $ty {
                fn node_type(&self) -> NodeType {
                    NodeType::$tag
                }

                fn accept<V: Visitor + ?Sized>(
                    &self,
                    visitor: &V,
                    opcodes: &mut Opcodes,
                ) -> Result<(), CompileError> {
                    visitor.$method(self, opcodes)
                }
            }
        )+
    };
}

impl_visitable! {
    Post => Post, post;
    MarkupSection => MarkupSection, markup_section;
    ListSection => ListSection, list_section;
    ListItem => ListItem, list_item;
    ImageSection => ImageSection, image_section;
    Card => Card, card;
    Marker => Marker, marker;
    Markup => Markup, markup;
}

/// Visit a single node: look up the handler for its tag and run it.
pub fn visit<V, N>(visitor: &V, node: &N, opcodes: &mut Opcodes) -> Result<(), CompileError>
where
    V: Visitor + ?Sized,
    N: Visitable + ?Sized,
{
    let node_type = node.node_type();
    trace!(%node_type, "visit");
    node.accept(visitor, opcodes).inspect_err(|e| {
        debug!(%node_type, error = %e, "visit failed");
    })
}

/// Visit each node in order, sharing one opcode sequence.
///
/// An empty collection is a no-op. Stops at the first failure.
pub fn visit_array<'n, V, N, I>(
    visitor: &V,
    nodes: I,
    opcodes: &mut Opcodes,
) -> Result<(), CompileError>
where
    V: Visitor + ?Sized,
    N: Visitable + 'n,
    I: IntoIterator<Item = &'n N>,
{
    for node in nodes {
        visit(visitor, node, opcodes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Node, Section};
    use crate::ir::Opcode;

    /// Emits one opcode per section and recurses from the post only.
    struct SectionsOnly;

    impl Visitor for SectionsOnly {
        fn post(&self, node: &Post, opcodes: &mut Opcodes) -> Result<(), CompileError> {
            visit_array(self, &node.sections, opcodes)
        }

        fn markup_section(
            &self,
            node: &MarkupSection,
            opcodes: &mut Opcodes,
        ) -> Result<(), CompileError> {
            opcodes.push(Opcode::unary("section", node.tag_name.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_visit_dispatches_by_tag() {
        let mut opcodes = Opcodes::new();
        visit(&SectionsOnly, &MarkupSection::new("h2"), &mut opcodes).unwrap();
        assert_eq!(opcodes.as_slice(), &[Opcode::unary("section", "h2")]);
    }

    #[test]
    fn test_visit_unknown_tag_fails() {
        let mut opcodes = Opcodes::new();
        let err = visit(&SectionsOnly, &Card::new("hr", serde_json::json!({})), &mut opcodes)
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownNodeType(NodeType::Card)));
        assert_eq!(err.to_string(), "Cannot visit unknown type card-section");
        assert!(opcodes.is_empty());
    }

    #[test]
    fn test_visit_through_node_enum() {
        let node = Node::from(MarkupSection::new("p"));
        let mut opcodes = Opcodes::new();
        visit(&SectionsOnly, &node, &mut opcodes).unwrap();
        assert_eq!(opcodes.len(), 1);
    }

    #[test]
    fn test_visit_array_empty_is_noop() {
        let mut opcodes = Opcodes::new();
        opcodes.push(Opcode::new("before"));
        let none: Vec<Section> = Vec::new();
        visit_array(&SectionsOnly, &none, &mut opcodes).unwrap();
        assert_eq!(opcodes.as_slice(), &[Opcode::new("before")]);
    }

    #[test]
    fn test_visit_array_absent_is_noop() {
        let mut opcodes = Opcodes::new();
        let absent: Option<&Vec<Section>> = None;
        visit_array(&SectionsOnly, absent.into_iter().flatten(), &mut opcodes).unwrap();
        assert!(opcodes.is_empty());
    }

    #[test]
    fn test_visit_array_stops_at_first_failure() {
        let nodes: Vec<Section> = vec![
            MarkupSection::new("p").into(),
            ImageSection::new("a.png").into(),
            MarkupSection::new("h1").into(),
        ];
        let mut opcodes = Opcodes::new();
        let err = visit_array(&SectionsOnly, &nodes, &mut opcodes).unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnknownNodeType(NodeType::ImageSection)
        ));
        assert_eq!(opcodes.as_slice(), &[Opcode::unary("section", "p")]);
    }

    #[test]
    fn test_default_visitor_rejects_every_tag() {
        struct Empty;
        impl Visitor for Empty {}

        let nodes: Vec<Node> = vec![
            Post::new().into(),
            MarkupSection::new("p").into(),
            ListSection::new("ul").into(),
            ListItem::new().into(),
            ImageSection::new("a.png").into(),
            Card::new("hr", serde_json::json!({})).into(),
            Marker::new("x").into(),
            Markup::new("em").into(),
        ];
        for node in &nodes {
            let mut opcodes = Opcodes::new();
            let err = visit(&Empty, node, &mut opcodes).unwrap_err();
            match err {
                CompileError::UnknownNodeType(tag) => assert_eq!(tag, node.node_type()),
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
