//! Schema decoding.
//!
//! A schema is a JSON Schema document annotated with `x-` keywords. Walking
//! it in document order yields the directive declarations and the template
//! settings:
//!
//! | Keyword                          | Result                               |
//! |----------------------------------|--------------------------------------|
//! | `x-frontmatter-part: true`       | `frontmatter-part` at the property   |
//! | `x-flatten-arrays: "field"`      | `flatten-arrays` of `field`          |
//! | `x-jmespath-filter` / `x-filter` | `filter` with the expression         |
//! | `x-derived-from: "a[].b"`        | `derived-from` with the source       |
//! | `x-derived-unique: true`         | `derived-unique`                     |
//! | `x-template` (root)              | container template path              |
//! | `x-template-items` (root)        | item template path                   |
//! | `x-template-format` (root)       | default output format                |
//!
//! `properties.a.properties.b` targets `a.b`; `items` keeps its parent's path.

use crate::directive::{Directive, DirectiveDeclaration, json_kind};
use crate::format::{DataFormat, FormatError, OutputFormat};
use crate::ir::{PathError, TemplatePath};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("IO error when reading schema `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse schema `{path}`")]
    Parse {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("schema `{0}` has an unsupported extension (expected .json, .yaml, .yml or .toml)")]
    UnknownFormat(PathBuf),

    #[error("schema must be an object, found {0}")]
    NotAnObject(&'static str),

    #[error("`{keyword}` at `{path}` must be {expected}")]
    InvalidKeyword {
        keyword: &'static str,
        path: TemplatePath,
        expected: &'static str,
    },

    #[error("`{keyword}` at `{path}` holds an invalid path")]
    InvalidPath {
        keyword: &'static str,
        path: TemplatePath,
        #[source]
        source: PathError,
    },
}

/// Everything a schema declares.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    declarations: Vec<DirectiveDeclaration>,
    template: Option<PathBuf>,
    item_template: Option<PathBuf>,
    format: Option<OutputFormat>,
}

impl Schema {
    /// Load a `.json`, `.yaml`/`.yml` or `.toml` schema file.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let format = DataFormat::from_path(path).ok_or_else(|| SchemaError::UnknownFormat(path.to_path_buf()))?;
        let content = fs::read_to_string(path).map_err(|err| SchemaError::Io(path.to_path_buf(), err))?;
        let value = format.parse(&content).map_err(|source| SchemaError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let Value::Object(root) = value else {
            return Err(SchemaError::NotAnObject(json_kind(value)));
        };
        let mut schema = Self::default();
        schema.walk(root, &TemplatePath::root(), true)?;
        Ok(schema)
    }

    /// Directive declarations in document order.
    pub fn declarations(&self) -> &[DirectiveDeclaration] {
        &self.declarations
    }

    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    pub fn item_template(&self) -> Option<&Path> {
        self.item_template.as_deref()
    }

    pub fn format(&self) -> Option<OutputFormat> {
        self.format
    }

    fn walk(&mut self, node: &Map<String, Value>, path: &TemplatePath, is_root: bool) -> Result<(), SchemaError> {
        for (key, value) in node {
            match key.as_str() {
                "properties" => {
                    if let Value::Object(properties) = value {
                        for (name, child) in properties {
                            if let Value::Object(child) = child {
                                self.walk(child, &path.child_key(name), false)?;
                            }
                        }
                    }
                }
                "items" => match value {
                    Value::Object(items) => self.walk(items, path, false)?,
                    Value::Array(tuple) => {
                        for items in tuple.iter().filter_map(Value::as_object) {
                            self.walk(items, path, false)?;
                        }
                    }
                    _ => {}
                },
                _ => self.keyword(key, value, node, path, is_root)?,
            }
        }
        Ok(())
    }

    fn keyword(
        &mut self,
        key: &str,
        value: &Value,
        node: &Map<String, Value>,
        path: &TemplatePath,
        is_root: bool,
    ) -> Result<(), SchemaError> {
        let invalid = |keyword: &'static str, expected: &'static str| SchemaError::InvalidKeyword {
            keyword,
            path: path.clone(),
            expected,
        };

        let directive = match key {
            "x-frontmatter-part" => match value {
                Value::Bool(true) => Directive::FrontmatterPart {
                    schema_type: declared_type(node),
                },
                Value::Bool(false) => return Ok(()),
                _ => return Err(invalid("x-frontmatter-part", "a boolean")),
            },
            "x-flatten-arrays" => match value {
                Value::Bool(true) => Directive::FlattenArrays {
                    field: TemplatePath::root(),
                },
                Value::Bool(false) => return Ok(()),
                Value::String(field) => Directive::FlattenArrays {
                    field: TemplatePath::parse(field).map_err(|source| SchemaError::InvalidPath {
                        keyword: "x-flatten-arrays",
                        path: path.clone(),
                        source,
                    })?,
                },
                _ => return Err(invalid("x-flatten-arrays", "a field name or a boolean")),
            },
            "x-jmespath-filter" | "x-filter" => match value {
                Value::String(expression) => Directive::Filter {
                    expression: expression.clone(),
                },
                _ if key == "x-filter" => return Err(invalid("x-filter", "a string")),
                _ => return Err(invalid("x-jmespath-filter", "a string")),
            },
            "x-derived-from" => match value {
                Value::String(source) => Directive::DerivedFrom { source: source.clone() },
                _ => return Err(invalid("x-derived-from", "a string")),
            },
            "x-derived-unique" => match value {
                Value::Bool(true) => Directive::DerivedUnique,
                Value::Bool(false) => return Ok(()),
                _ => return Err(invalid("x-derived-unique", "a boolean")),
            },
            "x-template" | "x-template-items" | "x-template-format" => {
                return self.root_keyword(key, value, path, is_root);
            }
            _ => return Ok(()),
        };

        self.declarations.push(DirectiveDeclaration::new(directive, path.clone()));
        Ok(())
    }

    fn root_keyword(&mut self, key: &str, value: &Value, path: &TemplatePath, is_root: bool) -> Result<(), SchemaError> {
        let keyword: &'static str = match key {
            "x-template" => "x-template",
            "x-template-items" => "x-template-items",
            _ => "x-template-format",
        };
        if !is_root {
            return Err(SchemaError::InvalidKeyword {
                keyword,
                path: path.clone(),
                expected: "declared on the schema root",
            });
        }
        let Value::String(text) = value else {
            return Err(SchemaError::InvalidKeyword {
                keyword,
                path: path.clone(),
                expected: "a string",
            });
        };

        match keyword {
            "x-template" => self.template = Some(PathBuf::from(text)),
            "x-template-items" => self.item_template = Some(PathBuf::from(text)),
            _ => {
                self.format = Some(OutputFormat::from_name(text).ok_or_else(|| SchemaError::InvalidKeyword {
                    keyword,
                    path: path.clone(),
                    expected: "one of json, yaml, toml, markdown",
                })?);
            }
        }
        Ok(())
    }
}

/// The `type` a property declares; `["array", "null"]` counts as array.
fn declared_type(node: &Map<String, Value>) -> Option<compact_str::CompactString> {
    match node.get("type")? {
        Value::String(ty) => Some(ty.as_str().into()),
        Value::Array(types) => {
            let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
            if names.contains(&"array") {
                Some("array".into())
            } else {
                Some(names.join("|").into())
            }
        }
        _ => None,
    }
}
