//! Parsed templates.

use super::error::TemplateError;
use super::placeholder::{self, Part, Placeholder};
use crate::format::DataFormat;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// A template value with every string pre-scanned for placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Copied to the output unchanged.
    Value(Value),
    /// A string containing at least one placeholder.
    Text(Vec<Part>),
    Array(Vec<TemplateNode>),
    /// Keys are literal.
    Object(Vec<(String, TemplateNode)>),
}

impl TemplateNode {
    fn compile(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::text(text),
            Value::Array(items) => Self::Array(items.iter().map(Self::compile).collect()),
            Value::Object(map) => Self::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::compile(value)))
                    .collect(),
            ),
            scalar => Self::Value(scalar.clone()),
        }
    }

    fn text(text: &str) -> Self {
        let parts = placeholder::scan(text);
        if parts.iter().any(|part| matches!(part, Part::Placeholder(_))) {
            Self::Text(parts)
        } else {
            Self::Value(Value::String(text.to_owned()))
        }
    }

    fn collect_placeholders<'a>(&'a self, out: &mut Vec<&'a Placeholder>) {
        match self {
            Self::Value(_) => {}
            Self::Text(parts) => out.extend(parts.iter().filter_map(|part| match part {
                Part::Placeholder(p) => Some(p),
                Part::Literal(_) => None,
            })),
            Self::Array(items) => items.iter().for_each(|item| item.collect_placeholders(out)),
            Self::Object(entries) => entries.iter().for_each(|(_, node)| node.collect_placeholders(out)),
        }
    }
}

/// A compiled container or item template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    root: TemplateNode,
}

impl Template {
    /// Compile a structured template (JSON, YAML or TOML data).
    pub fn from_value(value: &Value) -> Self {
        Self {
            root: TemplateNode::compile(value),
        }
    }

    /// Compile free text as one template string.
    pub fn from_text(text: &str) -> Self {
        Self {
            root: TemplateNode::text(text),
        }
    }

    /// Load a template file.
    ///
    /// `.json`, `.yaml`/`.yml` and `.toml` files are parsed as data; any other
    /// file is a single text template.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let content = fs::read_to_string(path).map_err(|err| TemplateError::Io(path.to_path_buf(), err))?;
        match DataFormat::from_path(path) {
            Some(format) => {
                let value = format.parse(&content).map_err(|source| TemplateError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(Self::from_value(&value))
            }
            None => Ok(Self::from_text(&content)),
        }
    }

    pub fn root(&self) -> &TemplateNode {
        &self.root
    }

    /// Every placeholder, in document order.
    pub fn placeholders(&self) -> Vec<&Placeholder> {
        let mut out = Vec::new();
        self.root.collect_placeholders(&mut out);
        out
    }

    pub fn uses_items(&self) -> bool {
        self.placeholders().iter().any(|p| p.is_items())
    }
}
