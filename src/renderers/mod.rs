//! # Renderers
//!
//! Each backend pairs a [`Visitor`](crate::ir::Visitor) that emits its own
//! opcode set with a target that executes those opcodes.
//!
//! | Backend | Visitor | Target | Output |
//! |---------|---------|--------|--------|
//! | [`mobiledoc`] | `MobiledocVisitor` | `MobiledocBuilder` | Mobiledoc 0.3.2 JSON |
//! | [`html`] | `HtmlVisitor` | `HtmlRenderer` | HTML string |

pub mod html;
pub mod mobiledoc;
