//! # Mobiledoc Compiler
//!
//! Compiles rich-text documents into other forms through a two-stage
//! pipeline: a visitor walks the document tree and emits opcodes, then a
//! handler table replays the opcodes against a target.
//!
//! ## Quick Start
//!
//! ```
//! use mobiledoc_compiler::document::{Marker, Markup, MarkupSection, Post};
//! use mobiledoc_compiler::renderers::{html, mobiledoc};
//!
//! let post = Post::new().section(
//!     MarkupSection::new("p")
//!         .marker(Marker::new("Hello "))
//!         .marker(Marker::new("world").open(Markup::new("strong")).close(1)),
//! );
//!
//! assert_eq!(html::render(&post)?, "<p>Hello <strong>world</strong></p>");
//!
//! let doc = mobiledoc::render(&post)?;
//! assert_eq!(doc.to_json()["markups"], serde_json::json!([["strong"]]));
//!
//! # Ok::<(), mobiledoc_compiler::CompileError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`document`] | Document model, plus Markdown and Mobiledoc import |
//! | [`ir`] | Opcodes, the visitor, and the handler-table executor |
//! | [`renderers`] | Mobiledoc and HTML backends |
//! | [`error`] | Error types |

pub mod document;
pub mod error;
pub mod ir;
pub mod renderers;

// Re-exports for convenience
pub use document::{Node, NodeType, Post};
pub use error::CompileError;
pub use ir::{Compiler, HandlerTable, Opcode, Opcodes, Visitor, compile, visit};
