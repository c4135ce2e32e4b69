//! The dataset flowing through directive stages.

use super::error::StageError;
use crate::ir::TemplatePath;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Ordered element list plus derived fields.
///
/// Stages never mutate a dataset in place: each `with_*` call returns a new
/// value and leaves the receiver untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    elements: Vec<Value>,
    derived: IndexMap<TemplatePath, Value>,
    root: Option<TemplatePath>,
}

impl Dataset {
    /// One element per source document, in document order.
    pub fn from_documents(documents: Vec<Value>) -> Self {
        Self {
            elements: documents,
            ..Self::default()
        }
    }

    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Path of the selected hierarchy root, if a root was selected.
    pub fn root(&self) -> Option<&TemplatePath> {
        self.root.as_ref()
    }

    pub fn derived(&self, path: &TemplatePath) -> Option<&Value> {
        self.derived.get(path)
    }

    pub fn with_elements(&self, elements: Vec<Value>) -> Self {
        Self {
            elements,
            derived: self.derived.clone(),
            root: self.root.clone(),
        }
    }

    pub fn with_root(&self, root: TemplatePath) -> Self {
        Self {
            root: Some(root),
            ..self.clone()
        }
    }

    /// Set (or replace) a derived field.
    pub fn with_derived(&self, path: TemplatePath, value: Value) -> Self {
        let mut next = self.clone();
        next.derived.insert(path, value);
        next
    }

    /// Build the document templates resolve against.
    ///
    /// With a hierarchy root, the elements become an array at the root path.
    /// Without one, element objects are merged in document order (later keys
    /// win). Derived fields are placed at their paths last.
    pub fn assemble(&self) -> Result<Value, StageError> {
        let mut out = match &self.root {
            Some(_) => Value::Object(Map::new()),
            None => Value::Object(
                self.elements
                    .iter()
                    .filter_map(Value::as_object)
                    .flat_map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())))
                    .collect(),
            ),
        };

        if let Some(root) = &self.root {
            root.insert(&mut out, Value::Array(self.elements.clone()))
                .map_err(|_| StageError::PathConflict {
                    path: root.to_string(),
                })?;
        }

        for (path, value) in &self.derived {
            if self.root.as_ref() == Some(path) {
                return Err(StageError::HierarchyRootNotArray {
                    path: path.to_string(),
                    found: "a derived field".into(),
                });
            }
            path.insert(&mut out, value.clone())
                .map_err(|_| StageError::PathConflict {
                    path: path.to_string(),
                })?;
        }

        Ok(out)
    }
}
