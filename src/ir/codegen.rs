//! # Opcode Execution
//!
//! Replays an [`Opcodes`] sequence against a target. Opcode names are
//! resolved through a [`HandlerTable`] built up front, one entry per name,
//! each entry declaring the arity its handler accepts.
//!
//! ```
//! use mobiledoc_compiler::ir::{compile, HandlerTable, Opcode, Opcodes, param_str};
//!
//! #[derive(Default)]
//! struct Buf(String);
//!
//! let table = HandlerTable::<Buf>::new()
//!     .unary("open", |b, tag| {
//!         b.0.push_str(&format!("<{}>", param_str(tag, 0)?));
//!         Ok(())
//!     })
//!     .unary("text", |b, s| {
//!         b.0.push_str(param_str(s, 0)?);
//!         Ok(())
//!     })
//!     .nullary("close", |b| {
//!         b.0.push_str("</div>");
//!         Ok(())
//!     });
//!
//! let opcodes: Opcodes = [
//!     Opcode::unary("open", "div"),
//!     Opcode::unary("text", "hello"),
//!     Opcode::new("close"),
//! ]
//! .into_iter()
//! .collect();
//!
//! let mut buf = Buf::default();
//! compile(&mut buf, &table, &opcodes).unwrap();
//! assert_eq!(buf.0, "<div>hello</div>");
//! ```

use std::collections::HashMap;

use tracing::{debug, trace};

use super::ops::{Opcode, Opcodes, Param, Params};
use crate::error::CompileError;

/// What every handler returns.
pub type HandlerResult = Result<(), CompileError>;

/// A registered handler, keyed by the arity it accepts.
enum Handler<T> {
    Nullary(fn(&mut T) -> HandlerResult),
    Unary(fn(&mut T, &Param) -> HandlerResult),
    Binary(fn(&mut T, &Param, &Param) -> HandlerResult),
    Variadic(fn(&mut T, &[Param]) -> HandlerResult),
}

impl<T> Clone for Handler<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handler<T> {}

impl<T> Handler<T> {
    fn call(self, target: &mut T, opcode: &Opcode) -> HandlerResult {
        match (self, opcode.params()) {
            (Handler::Nullary(f), Params::None) => f(target),
            (Handler::Unary(f), Params::One(a)) => f(target, a),
            (Handler::Binary(f), Params::Two([a, b])) => f(target, a, b),
            (Handler::Variadic(f), params) => f(target, params.as_slice()),
            (handler, params) => Err(CompileError::ArityMismatch {
                name: opcode.name().to_string(),
                expected: handler.arity().unwrap_or_default(),
                found: params.len(),
            }),
        }
    }

    /// Fixed arity, or `None` for variadic handlers.
    fn arity(self) -> Option<usize> {
        match self {
            Handler::Nullary(_) => Some(0),
            Handler::Unary(_) => Some(1),
            Handler::Binary(_) => Some(2),
            Handler::Variadic(_) => None,
        }
    }
}

/// Opcode name → handler mapping for targets of type `T`.
///
/// Registering a name twice keeps the last handler.
pub struct HandlerTable<T> {
    handlers: HashMap<&'static str, Handler<T>>,
}

impl<T> Default for HandlerTable<T> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<T> HandlerTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler taking no params.
    pub fn nullary(mut self, name: &'static str, f: fn(&mut T) -> HandlerResult) -> Self {
        self.handlers.insert(name, Handler::Nullary(f));
        self
    }

    /// Register a handler taking exactly one param.
    pub fn unary(mut self, name: &'static str, f: fn(&mut T, &Param) -> HandlerResult) -> Self {
        self.handlers.insert(name, Handler::Unary(f));
        self
    }

    /// Register a handler taking exactly two params.
    pub fn binary(
        mut self,
        name: &'static str,
        f: fn(&mut T, &Param, &Param) -> HandlerResult,
    ) -> Self {
        self.handlers.insert(name, Handler::Binary(f));
        self
    }

    /// Register a handler taking any number of params.
    pub fn variadic(
        mut self,
        name: &'static str,
        f: fn(&mut T, &[Param]) -> HandlerResult,
    ) -> Self {
        self.handlers.insert(name, Handler::Variadic(f));
        self
    }

    /// True if a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Fixed arity registered under `name`. `Some(None)` means variadic.
    pub fn arity(&self, name: &str) -> Option<Option<usize>> {
        self.handlers.get(name).map(|h| h.arity())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// A target that carries its own handler table.
pub trait Compiler: Sized {
    fn handlers() -> HandlerTable<Self>;
}

/// Execute `opcodes` against `target`, in order, each exactly once.
///
/// Stops at the first opcode with no handler, the wrong arity, or a failing
/// handler. Effects of opcodes already executed are kept.
pub fn compile<T>(
    target: &mut T,
    table: &HandlerTable<T>,
    opcodes: &Opcodes,
) -> Result<(), CompileError> {
    for (index, opcode) in opcodes.iter().enumerate() {
        let Some(&handler) = table.handlers.get(opcode.name()) else {
            debug!(name = opcode.name(), index, "no handler for opcode");
            return Err(CompileError::UnknownOpcode {
                name: opcode.name().to_string(),
                index,
            });
        };
        trace!(%opcode, index, "compile");
        handler.call(target, opcode).inspect_err(|e| {
            debug!(name = opcode.name(), index, error = %e, "opcode failed");
        })?;
    }
    Ok(())
}

// ============================================================================
// PARAM ACCESSORS
// ============================================================================

fn invalid(index: usize, expected: &'static str, found: &Param) -> CompileError {
    CompileError::InvalidParam {
        index,
        expected,
        found: found.to_string(),
    }
}

/// Read a string param.
pub fn param_str(param: &Param, index: usize) -> Result<&str, CompileError> {
    param
        .as_str()
        .ok_or_else(|| invalid(index, "a string", param))
}

/// Read a non-negative integer param.
pub fn param_usize(param: &Param, index: usize) -> Result<usize, CompileError> {
    param
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(index, "a non-negative integer", param))
}

/// Read a flat `[k1, v1, k2, v2, ...]` string array as pairs.
pub fn param_pairs(param: &Param, index: usize) -> Result<Vec<(String, String)>, CompileError> {
    let items = param
        .as_array()
        .filter(|items| items.len() % 2 == 0)
        .ok_or_else(|| invalid(index, "an even-length array of strings", param))?;
    items
        .chunks(2)
        .map(|pair| match (pair[0].as_str(), pair[1].as_str()) {
            (Some(k), Some(v)) => Ok((k.to_string(), v.to_string())),
            _ => Err(invalid(index, "an even-length array of strings", param)),
        })
        .collect()
}
