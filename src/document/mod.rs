//! # Document Model
//!
//! A closed, typed tree of rich-text nodes. Every node carries exactly one
//! [`NodeType`] tag; the eight tags are the only shapes the visitor ever
//! dispatches on.
//!
//! ```
//! use mobiledoc_compiler::document::*;
//! use mobiledoc_compiler::ir::Visitable;
//!
//! // Rust construction
//! let post = Post::new()
//!     .section(MarkupSection::new("h1").marker(Marker::new("Title")))
//!     .section(ImageSection::new("https://example.com/cat.png"));
//!
//! // JSON loading
//! let node = Node::from_json(r#"{"type": "markup-section", "tag_name": "p"}"#).unwrap();
//! assert_eq!(node.node_type(), NodeType::MarkupSection);
//! # let _ = post;
//! ```

pub mod types;

mod markdown;
mod mobiledoc;

pub use types::*;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CompileError;
use crate::ir::{Opcodes, Visitable, Visitor};

/// The variant tag of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Post,
    MarkupSection,
    ListSection,
    ListItem,
    ImageSection,
    #[serde(rename = "card-section")]
    Card,
    Marker,
    Markup,
}

impl NodeType {
    /// Every tag, in declaration order.
    pub const ALL: [NodeType; 8] = [
        NodeType::Post,
        NodeType::MarkupSection,
        NodeType::ListSection,
        NodeType::ListItem,
        NodeType::ImageSection,
        NodeType::Card,
        NodeType::Marker,
        NodeType::Markup,
    ];

    /// The wire name of this tag.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Post => "post",
            NodeType::MarkupSection => "markup-section",
            NodeType::ListSection => "list-section",
            NodeType::ListItem => "list-item",
            NodeType::ImageSection => "image-section",
            NodeType::Card => "card-section",
            NodeType::Marker => "marker",
            NodeType::Markup => "markup",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Define a tagged node enum and its dispatch from a single list.
///
/// Each generated enum serializes with a `"type"` tag, forwards
/// [`Visitable`] to the wrapped payload, and gets `From` impls for every
/// payload type.
macro_rules! define_nodes {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident($inner:ty)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type", rename_all = "kebab-case")]
        pub enum $name {
            $($(#[$vmeta])* $variant($inner),)+
        }

        impl Visitable for $name {
            fn node_type(&self) -> NodeType {
                match self { $($name::$variant(n) => n.node_type(),)+ }
            }

            fn accept<V: Visitor + ?Sized>(
                &self,
                visitor: &V,
                opcodes: &mut Opcodes,
            ) -> Result<(), CompileError> {
                match self { $($name::$variant(n) => n.accept(visitor, opcodes),)+ }
            }
        }

        $(
            impl From<$inner> for $name {
                fn from(node: $inner) -> Self {
                    $name::$variant(node)
                }
            }
        )+
    };
}

define_nodes! {
    /// Any document node.
    Node {
        Post(Post),
        MarkupSection(MarkupSection),
        ListSection(ListSection),
        ListItem(ListItem),
        ImageSection(ImageSection),
        #[serde(rename = "card-section")]
        Card(Card),
        Marker(Marker),
        Markup(Markup),
    }
}

define_nodes! {
    /// A top-level child of a [`Post`].
    Section {
        MarkupSection(MarkupSection),
        ListSection(ListSection),
        ImageSection(ImageSection),
        #[serde(rename = "card-section")]
        Card(Card),
    }
}

impl Node {
    /// Parse a node tree from JSON. Any variant may be the root.
    pub fn from_json(json: &str) -> Result<Self, CompileError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<Section> for Node {
    fn from(section: Section) -> Self {
        match section {
            Section::MarkupSection(s) => Node::MarkupSection(s),
            Section::ListSection(s) => Node::ListSection(s),
            Section::ImageSection(s) => Node::ImageSection(s),
            Section::Card(s) => Node::Card(s),
        }
    }
}
