//! Data formats: parsing JSON/YAML/TOML into `serde_json::Value`, and
//! serializing the rendered document.
//!
//! | Format     | Read                  | Write                                  |
//! |------------|-----------------------|----------------------------------------|
//! | `json`     | schema, templates, fm | pretty JSON                            |
//! | `yaml`     | schema, templates, fm | YAML                                   |
//! | `toml`     | schema, templates, fm | TOML (top level must be a table)       |
//! | `markdown` |                       | YAML frontmatter + `body` field        |

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot write TOML: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("invalid value at `{path}`: {reason}")]
    InvalidValue { path: String, reason: &'static str },

    #[error("{format} output requires a top-level object, found {found}")]
    NotATable { format: OutputFormat, found: &'static str },
}

// ============================================================================
// Input
// ============================================================================

/// Structured input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
    Toml,
}

impl DataFormat {
    /// Detect from the file extension (`.json`, `.yaml`/`.yml`, `.toml`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    pub fn parse(self, text: &str) -> Result<Value, FormatError> {
        match self {
            Self::Json => Ok(serde_json::from_str(text)?),
            Self::Yaml => from_yaml(serde_yaml::from_str(text)?, ""),
            Self::Toml => from_toml_table(toml::from_str(text)?, ""),
        }
    }
}

fn child(path: &str, key: &str) -> String {
    if path.is_empty() { key.to_owned() } else { format!("{path}.{key}") }
}

fn finite(value: f64, path: &str) -> Result<Value, FormatError> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| FormatError::InvalidValue {
            path: path.to_owned(),
            reason: "non-finite number",
        })
}

/// Convert YAML to JSON, rejecting non-string keys and non-finite floats.
pub fn from_yaml(value: serde_yaml::Value, path: &str) -> Result<Value, FormatError> {
    use serde_yaml::Value as Yaml;
    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                finite(n.as_f64().unwrap_or(f64::NAN), path)?
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| from_yaml(item, &child(path, &i.to_string())))
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                let Yaml::String(key) = key else {
                    return Err(FormatError::InvalidValue {
                        path: path.to_owned(),
                        reason: "mapping keys must be strings",
                    });
                };
                let value = from_yaml(value, &child(path, &key))?;
                map.insert(key, value);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => from_yaml(tagged.value, path)?,
    })
}

/// Convert TOML to JSON; datetimes become strings.
pub fn from_toml(value: toml::Value, path: &str) -> Result<Value, FormatError> {
    use toml::Value as Toml;
    Ok(match value {
        Toml::String(s) => Value::String(s),
        Toml::Integer(i) => Value::from(i),
        Toml::Float(f) => finite(f, path)?,
        Toml::Boolean(b) => Value::Bool(b),
        Toml::Datetime(dt) => Value::String(dt.to_string()),
        Toml::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| from_toml(item, &child(path, &i.to_string())))
                .collect::<Result<_, _>>()?,
        ),
        Toml::Table(table) => from_toml_table(table, path)?,
    })
}

fn from_toml_table(table: toml::Table, path: &str) -> Result<Value, FormatError> {
    let mut map = Map::with_capacity(table.len());
    for (key, value) in table {
        let value = from_toml(value, &child(path, &key))?;
        map.insert(key, value);
    }
    Ok(Value::Object(map))
}

// ============================================================================
// Output
// ============================================================================

/// Output format for the rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Yaml,
    Toml,
    Markdown,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Parse a format name (`x-template-format` values).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "markdown" | "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Markdown => "markdown",
        }
    }

    pub fn serialize(self, value: &Value) -> Result<String, FormatError> {
        match self {
            Self::Json => {
                let mut out = serde_json::to_string_pretty(value)?;
                out.push('\n');
                Ok(out)
            }
            Self::Yaml => Ok(serde_yaml::to_string(value)?),
            Self::Toml => {
                self.require_table(value)?;
                Ok(toml::to_string_pretty(value)?)
            }
            Self::Markdown => {
                let mut map = self.require_table(value)?.clone();
                let body = match map.get("body") {
                    Some(Value::String(_)) => map.shift_remove("body"),
                    _ => None,
                };

                let mut out = String::from("---\n");
                if !map.is_empty() {
                    out.push_str(&serde_yaml::to_string(&map)?);
                }
                out.push_str("---\n");
                if let Some(Value::String(body)) = body {
                    out.push('\n');
                    out.push_str(&body);
                    if !body.ends_with('\n') {
                        out.push('\n');
                    }
                }
                Ok(out)
            }
        }
    }

    fn require_table(self, value: &Value) -> Result<&Map<String, Value>, FormatError> {
        value.as_object().ok_or(FormatError::NotATable {
            format: self,
            found: crate::directive::json_kind(value),
        })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_yaml_conversion_keeps_order() {
        let value = DataFormat::Yaml.parse("b: 1\na: [x, 2.5]\nc: ~\n").unwrap();
        assert_eq!(value, json!({"b": 1, "a": ["x", 2.5], "c": null}));
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn test_yaml_rejects_non_string_keys_and_nan() {
        assert!(matches!(
            DataFormat::Yaml.parse("1: one\n"),
            Err(FormatError::InvalidValue { .. })
        ));
        match DataFormat::Yaml.parse("outer:\n  x: .nan\n") {
            Err(FormatError::InvalidValue { path, .. }) => assert_eq!(path, "outer.x"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_toml_datetime_becomes_string() {
        let value = DataFormat::Toml.parse("date = 2024-01-02\n[meta]\nn = 1\n").unwrap();
        assert_eq!(value, json!({"date": "2024-01-02", "meta": {"n": 1}}));
    }

    #[test]
    fn test_detect_from_path() {
        assert_eq!(DataFormat::from_path(Path::new("s.YML")), Some(DataFormat::Yaml));
        assert_eq!(DataFormat::from_path(Path::new("t.txt")), None);
        assert_eq!(OutputFormat::from_path(Path::new("out.md")), Some(OutputFormat::Markdown));
        assert_eq!(OutputFormat::from_name(" YAML "), Some(OutputFormat::Yaml));
    }

    #[test]
    fn test_toml_output_requires_table() {
        assert!(matches!(
            OutputFormat::Toml.serialize(&json!([1, 2])),
            Err(FormatError::NotATable { found: "array", .. })
        ));
        let out = OutputFormat::Toml.serialize(&json!({"title": "x", "n": 2})).unwrap();
        assert!(out.contains("title = \"x\""));
    }

    #[test]
    fn test_markdown_output() {
        let out = OutputFormat::Markdown
            .serialize(&json!({"title": "Tools", "body": "# Tools"}))
            .unwrap();
        assert_eq!(out, "---\ntitle: Tools\n---\n\n# Tools\n");

        let out = OutputFormat::Markdown.serialize(&json!({})).unwrap();
        assert_eq!(out, "---\n---\n");
    }

    #[test]
    fn test_json_output_is_pretty() {
        let out = OutputFormat::Json.serialize(&json!({"a": [1]})).unwrap();
        assert_eq!(out, "{\n  \"a\": [\n    1\n  ]\n}\n");
    }
}
