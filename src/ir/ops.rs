//! # Opcodes
//!
//! The atomic instruction unit produced by visitation and consumed by
//! execution. An opcode is a handler name plus positional params.
//!
//! ## Wire form
//!
//! Opcodes serialize as JSON arrays, name first:
//!
//! ```text
//! ["openPost"]
//! ["openMarkupSection", "p"]
//! ["openMarker", 0, "hello"]
//! ```

use std::borrow::Cow;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// A single positional parameter.
pub type Param = serde_json::Value;

/// Positional params, stored inline for the common 0/1/2 cases.
///
/// `Many` only ever holds three or more params; build through
/// `From<Vec<Param>>` to keep that normalized.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    #[default]
    None,
    One(Param),
    Two([Param; 2]),
    Many(Vec<Param>),
}

impl Params {
    /// Number of params.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// True when there are no params.
    pub fn is_empty(&self) -> bool {
        matches!(self, Params::None)
    }

    /// View the params as an ordered slice.
    pub fn as_slice(&self) -> &[Param] {
        match self {
            Params::None => &[],
            Params::One(a) => std::slice::from_ref(a),
            Params::Two(pair) => pair,
            Params::Many(all) => all,
        }
    }
}

impl From<Vec<Param>> for Params {
    fn from(mut params: Vec<Param>) -> Self {
        match params.len() {
            0 => Params::None,
            1 => Params::One(params.remove(0)),
            2 => {
                let b = params.remove(1);
                let a = params.remove(0);
                Params::Two([a, b])
            }
            _ => Params::Many(params),
        }
    }
}

/// One instruction: a handler name and its positional params.
#[derive(Debug, Clone, PartialEq)]
pub struct Opcode {
    name: Cow<'static, str>,
    params: Params,
}

impl Opcode {
    /// Opcode with no params.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            params: Params::None,
        }
    }

    /// Opcode with one param.
    pub fn unary(name: impl Into<Cow<'static, str>>, a: impl Into<Param>) -> Self {
        Self {
            name: name.into(),
            params: Params::One(a.into()),
        }
    }

    /// Opcode with two params.
    pub fn binary(
        name: impl Into<Cow<'static, str>>,
        a: impl Into<Param>,
        b: impl Into<Param>,
    ) -> Self {
        Self {
            name: name.into(),
            params: Params::Two([a.into(), b.into()]),
        }
    }

    /// Opcode with any number of params.
    pub fn variadic(name: impl Into<Cow<'static, str>>, params: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            params: params.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.as_slice().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}

impl Serialize for Opcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let params = self.params.as_slice();
        let mut seq = serializer.serialize_seq(Some(params.len() + 1))?;
        seq.serialize_element(self.name())?;
        for param in params {
            seq.serialize_element(param)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Opcode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut values: Vec<Param> = Vec::deserialize(deserializer)?;
        if values.is_empty() {
            return Err(de::Error::custom("opcode must have a name"));
        }
        let name = match values.remove(0) {
            Param::String(s) => s,
            other => {
                return Err(de::Error::custom(format!(
                    "opcode name must be a string, got {}",
                    other
                )));
            }
        };
        Ok(Opcode::variadic(name, values))
    }
}

/// The ordered opcode accumulator.
///
/// Append-only while visiting; iterated once, in order, while compiling.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Opcodes {
    ops: Vec<Opcode>,
}

impl Opcodes {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Append one opcode.
    pub fn push(&mut self, op: Opcode) {
        self.ops.push(op);
    }

    /// Number of opcodes.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterate in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, Opcode> {
        self.ops.iter()
    }

    pub fn as_slice(&self) -> &[Opcode] {
        &self.ops
    }
}

impl FromIterator<Opcode> for Opcodes {
    fn from_iter<T: IntoIterator<Item = Opcode>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Opcodes {
    type Item = Opcode;
    type IntoIter = std::vec::IntoIter<Opcode>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a Opcodes {
    type Item = &'a Opcode;
    type IntoIter = std::slice::Iter<'a, Opcode>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_opcodes_new() {
        let opcodes = Opcodes::new();
        assert!(opcodes.is_empty());
    }

    #[test]
    fn test_opcodes_push_preserves_order() {
        let mut opcodes = Opcodes::new();
        opcodes.push(Opcode::new("openPost"));
        opcodes.push(Opcode::unary("openMarkupSection", "p"));
        opcodes.push(Opcode::binary("openMarker", 0, "hi"));
        assert_eq!(opcodes.len(), 3);
        let names: Vec<&str> = opcodes.iter().map(|op| op.name()).collect();
        assert_eq!(names, ["openPost", "openMarkupSection", "openMarker"]);
    }

    #[test]
    fn test_params_arity() {
        assert_eq!(Opcode::new("a").params().len(), 0);
        assert_eq!(Opcode::unary("a", 1).params().len(), 1);
        assert_eq!(Opcode::binary("a", 1, 2).params().len(), 2);
        assert_eq!(Opcode::variadic("a", vec![json!(1), json!(2), json!(3)]).params().len(), 3);
    }

    #[test]
    fn test_params_normalized_from_vec() {
        assert_eq!(Params::from(vec![]), Params::None);
        assert_eq!(Params::from(vec![json!("x")]), Params::One(json!("x")));
        assert_eq!(
            Params::from(vec![json!(1), json!(2)]),
            Params::Two([json!(1), json!(2)])
        );
        assert!(matches!(
            Params::from(vec![json!(1), json!(2), json!(3)]),
            Params::Many(_)
        ));
    }

    #[test]
    fn test_params_slice_order() {
        let op = Opcode::variadic("a", vec![json!("x"), json!("y"), json!("z"), json!("w")]);
        assert_eq!(
            op.params().as_slice(),
            &[json!("x"), json!("y"), json!("z"), json!("w")]
        );
    }

    #[test]
    fn test_opcode_serializes_as_array() {
        let op = Opcode::binary("openMarker", 1, "bold");
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value, json!(["openMarker", 1, "bold"]));
    }

    #[test]
    fn test_opcode_deserialize() {
        let op: Opcode = serde_json::from_str(r#"["openImageSection", "a.png"]"#).unwrap();
        assert_eq!(op, Opcode::unary("openImageSection", "a.png"));
    }

    #[test]
    fn test_opcode_deserialize_rejects_missing_name() {
        assert!(serde_json::from_str::<Opcode>("[]").is_err());
        assert!(serde_json::from_str::<Opcode>("[1, 2]").is_err());
    }

    #[test]
    fn test_opcode_display() {
        let op = Opcode::binary("openCardSection", "hr", json!({}));
        assert_eq!(op.to_string(), r#"openCardSection("hr", {})"#);
    }
}
