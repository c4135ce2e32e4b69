//! IR tree nodes.

use super::path::{Segment, TemplatePath};
use compact_str::CompactString;
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

/// Leaf value of the IR.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(CompactString),
}

impl Scalar {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.to_string()),
        }
    }
}

/// Immutable, path-addressable data tree.
///
/// Built once per render by [`super::IrBuilder`] and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum IrNode {
    Scalar(Scalar),
    Object(IndexMap<CompactString, IrNode>),
    Array(Vec<IrNode>),
}

impl IrNode {
    /// Short type name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(Scalar::Null) => "null",
            Self::Scalar(Scalar::Bool(_)) => "boolean",
            Self::Scalar(Scalar::Number(_)) => "number",
            Self::Scalar(Scalar::String(_)) => "string",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }

    pub fn as_array(&self) -> Option<&[IrNode]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Step one segment down.
    pub fn child(&self, segment: &Segment) -> Option<&IrNode> {
        match (self, segment) {
            (Self::Object(map), Segment::Key(key)) => map.get(key),
            (Self::Object(map), Segment::Index(_)) => map.get(&segment.as_key()),
            (Self::Array(items), Segment::Index(index)) => items.get(*index),
            _ => None,
        }
    }

    /// Follow `path` from this node.
    pub fn get(&self, path: &TemplatePath) -> Option<&IrNode> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Convert back into a JSON-like value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Scalar(scalar) => scalar.to_value(),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, node)| (key.to_string(), node.to_value()))
                    .collect::<Map<_, _>>(),
            ),
            Self::Array(items) => Value::Array(items.iter().map(IrNode::to_value).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IrNode {
        let mut inner = IndexMap::new();
        inner.insert(CompactString::from("full"), IrNode::Scalar(Scalar::String("a".into())));
        let mut root = IndexMap::new();
        root.insert(
            CompactString::from("items"),
            IrNode::Array(vec![IrNode::Object(inner)]),
        );
        IrNode::Object(root)
    }

    #[test]
    fn test_get_nested() {
        let ir = sample();
        let path = TemplatePath::parse("items.0.full").unwrap();
        assert_eq!(
            ir.get(&path),
            Some(&IrNode::Scalar(Scalar::String("a".into())))
        );
        assert!(ir.get(&TemplatePath::parse("items.1").unwrap()).is_none());
        assert!(ir.get(&TemplatePath::parse("items.full").unwrap()).is_none());
    }

    #[test]
    fn test_to_value_keeps_key_order() {
        let ir = sample();
        assert_eq!(ir.kind(), "object");
        assert_eq!(
            serde_json::to_string(&ir.to_value()).unwrap(),
            r#"{"items":[{"full":"a"}]}"#
        );
    }
}
