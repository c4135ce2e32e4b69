//! Dataset → IR conversion.

use super::error::IrError;
use super::node::{IrNode, Scalar};
use super::path::{Segment, TemplatePath};
use compact_str::CompactString;
use indexmap::IndexMap;
use serde_json::{Number, Value};

/// Default nesting limit for IR construction.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Builds owned IR trees from JSON-like values.
///
/// The input is deep-copied, so later changes to the source value never show
/// through the IR. Nesting is bounded by an explicit depth counter.
#[derive(Debug, Clone, Copy)]
pub struct IrBuilder {
    max_depth: usize,
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl IrBuilder {
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn build(&self, value: &Value) -> Result<IrNode, IrError> {
        let mut path = TemplatePath::root();
        self.node(value, 0, &mut path)
    }

    fn node(&self, value: &Value, depth: usize, path: &mut TemplatePath) -> Result<IrNode, IrError> {
        if depth > self.max_depth {
            return Err(IrError::DepthExceeded {
                path: path.to_string(),
                limit: self.max_depth,
            });
        }

        Ok(match value {
            Value::Null => IrNode::Scalar(Scalar::Null),
            Value::Bool(b) => IrNode::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => IrNode::Scalar(Scalar::Number(Self::number(n, path)?)),
            Value::String(s) => IrNode::Scalar(Scalar::String(CompactString::from(s.as_str()))),
            Value::Array(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    path.push(Segment::Index(index));
                    let node = self.node(item, depth + 1, path);
                    path.pop();
                    nodes.push(node?);
                }
                IrNode::Array(nodes)
            }
            Value::Object(map) => {
                let mut nodes = IndexMap::with_capacity(map.len());
                for (key, item) in map {
                    path.push(Segment::Key(key.as_str().into()));
                    let node = self.node(item, depth + 1, path);
                    path.pop();
                    nodes.insert(CompactString::from(key.as_str()), node?);
                }
                IrNode::Object(nodes)
            }
        })
    }

    fn number(n: &Number, path: &TemplatePath) -> Result<Number, IrError> {
        match n.as_f64() {
            Some(f) if !f.is_finite() => Err(IrError::InvalidValue {
                path: path.to_string(),
                reason: format!("non-finite number `{f}`"),
            }),
            _ => Ok(n.clone()),
        }
    }
}
