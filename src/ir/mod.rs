//! # Opcode Pipeline
//!
//! The core of the crate: a document tree is walked into a flat opcode
//! stream, and the stream is then replayed against a target.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌───────────────┐     ┌──────────┐
//! │  Document   │ ──► │   Visitor   │ ──► │    Opcodes    │ ──► │  Target  │
//! │   (tree)    │     │ (per node)  │     │ (Vec<Opcode>) │     │ (by name)│
//! └─────────────┘     └─────────────┘     └───────────────┘     └──────────┘
//! ```
//!
//! The visitor decides what each node produces; the handler table decides
//! what each opcode does. Neither knows about the other beyond opcode names,
//! so several backends can share one traversal.
//!
//! ## Example
//!
//! ```
//! use mobiledoc_compiler::document::{MarkupSection, Post};
//! use mobiledoc_compiler::error::CompileError;
//! use mobiledoc_compiler::ir::{visit, visit_array, Opcode, Opcodes, Visitor};
//!
//! struct Outline;
//!
//! impl Visitor for Outline {
//!     fn post(&self, node: &Post, opcodes: &mut Opcodes) -> Result<(), CompileError> {
//!         visit_array(self, &node.sections, opcodes)
//!     }
//!
//!     fn markup_section(
//!         &self,
//!         node: &MarkupSection,
//!         opcodes: &mut Opcodes,
//!     ) -> Result<(), CompileError> {
//!         opcodes.push(Opcode::unary("section", node.tag_name.clone()));
//!         Ok(())
//!     }
//! }
//!
//! let post = Post::new()
//!     .section(MarkupSection::new("h1"))
//!     .section(MarkupSection::new("p"));
//!
//! let mut opcodes = Opcodes::new();
//! visit(&Outline, &post, &mut opcodes).unwrap();
//! assert_eq!(opcodes.len(), 2);
//! ```

mod codegen;
mod ops;
mod visit;

pub use codegen::*;
pub use ops::*;
pub use visit::*;
