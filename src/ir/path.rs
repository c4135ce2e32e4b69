//! Template paths: addresses into data trees.
//!
//! A `TemplatePath` is a sequence of property-name or array-index segments.
//! The textual form is dotted: `commands.0.id.full`. Digit-only segments are
//! parsed as indices; object lookups fall back to the decimal key so that
//! `{versions.2}` still finds a `"2"` property.

use compact_str::{CompactString, ToCompactString};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// Error raised while parsing a dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty segment in path `{0}`")]
    EmptySegment(String),

    #[error("invalid character `{ch}` in path `{path}`")]
    InvalidChar { path: String, ch: char },
}

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(CompactString),
    Index(usize),
}

impl Segment {
    /// Key form of this segment, used when an index meets an object.
    pub fn as_key(&self) -> CompactString {
        match self {
            Self::Key(key) => key.clone(),
            Self::Index(index) => index.to_compact_string(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Address of a node, relative to some cursor (or to the tree root).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TemplatePath {
    segments: SmallVec<[Segment; 4]>,
}

impl TemplatePath {
    /// The empty path, addressing the root itself.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Parse a dotted path. The empty string is the root path.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = SmallVec::new();
        for part in text.split('.') {
            if part.is_empty() {
                return Err(PathError::EmptySegment(text.to_owned()));
            }
            if let Some(ch) = part.chars().find(|&c| matches!(c, '{' | '}' | '[' | ']') || c.is_whitespace()) {
                return Err(PathError::InvalidChar {
                    path: text.to_owned(),
                    ch,
                });
            }
            segments.push(Self::parse_segment(part));
        }
        Ok(Self { segments })
    }

    fn parse_segment(part: &str) -> Segment {
        if part.bytes().all(|b| b.is_ascii_digit()) {
            // Out-of-range digit runs stay keys rather than failing.
            if let Ok(index) = part.parse() {
                return Segment::Index(index);
            }
        }
        Segment::Key(part.into())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// First segment as a key, if it is one.
    pub fn head_key(&self) -> Option<&str> {
        match self.segments.first()? {
            Segment::Key(key) => Some(key),
            Segment::Index(_) => None,
        }
    }

    /// `self` followed by every segment of `other`.
    pub fn join(&self, other: &TemplatePath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// The rest of `self` after `prefix`, or `None` if `prefix` does not lead it.
    pub fn strip_prefix(&self, prefix: &TemplatePath) -> Option<Self> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| Self::from_segments(rest.iter().cloned()))
    }

    pub fn child_key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.into()));
        Self { segments }
    }

    pub fn child_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.segments.pop()
    }

    /// Follow this path through a JSON-like value.
    pub fn lookup<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments.iter().try_fold(value, |node, segment| match (node, segment) {
            (Value::Object(map), segment) => map.get(segment.as_key().as_str()),
            (Value::Array(items), Segment::Index(index)) => items.get(*index),
            _ => None,
        })
    }

    /// Place `value` at this path, creating intermediate objects.
    ///
    /// Returns the displaced value when a non-object blocks the way, leaving
    /// `root` untouched in that case.
    pub fn insert(&self, root: &mut Value, value: Value) -> Result<(), Value> {
        let Some((last, parents)) = self.segments.split_last() else {
            *root = value;
            return Ok(());
        };

        let mut node = root;
        for segment in parents {
            let Value::Object(map) = node else {
                return Err(value);
            };
            node = map
                .entry(segment.as_key().to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        match node {
            Value::Object(map) => {
                map.insert(last.as_key().to_string(), value);
                Ok(())
            }
            _ => Err(value),
        }
    }
}

impl fmt::Display for TemplatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_mixed_segments() {
        let path = TemplatePath::parse("commands.0.id").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("commands".into()),
                Segment::Index(0),
                Segment::Key("id".into()),
            ]
        );
        assert_eq!(path.to_string(), "commands.0.id");
    }

    #[test]
    fn test_parse_empty_is_root() {
        assert!(TemplatePath::parse("").unwrap().is_root());
        assert!(TemplatePath::parse("  ").unwrap().is_root());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            TemplatePath::parse("a..b"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            TemplatePath::parse("a.b[]"),
            Err(PathError::InvalidChar { ch: '[', .. })
        ));
    }

    #[test]
    fn test_lookup_index_on_object_uses_key() {
        let value = json!({"versions": {"2": "two"}, "list": ["a", "b"]});
        let path = TemplatePath::parse("versions.2").unwrap();
        assert_eq!(path.lookup(&value), Some(&json!("two")));
        let path = TemplatePath::parse("list.1").unwrap();
        assert_eq!(path.lookup(&value), Some(&json!("b")));
        let path = TemplatePath::parse("list.9").unwrap();
        assert_eq!(path.lookup(&value), None);
    }

    #[test]
    fn test_insert_creates_parents() {
        let mut root = json!({});
        TemplatePath::parse("tools.available")
            .unwrap()
            .insert(&mut root, json!(["git"]))
            .unwrap();
        assert_eq!(root, json!({"tools": {"available": ["git"]}}));
    }

    #[test]
    fn test_insert_blocked_by_scalar() {
        let mut root = json!({"tools": 3});
        let result = TemplatePath::parse("tools.available")
            .unwrap()
            .insert(&mut root, json!([]));
        assert!(result.is_err());
        assert_eq!(root, json!({"tools": 3}));
    }
}
