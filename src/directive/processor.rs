//! Directive stage execution.
//!
//! Each stage is a pure function from a dataset to a new dataset. The
//! processor applies the stages in resolver order and stops at the first
//! failure, so callers either get a fully processed dataset or an error.
//!
//! Per-element stages (flatten, filter) spread their elements over the rayon
//! pool. Derive and dedup need the complete element set and run after them.

use super::dataset::Dataset;
use super::error::{DependencyCycleError, PipelineError, StageError, json_kind};
use super::kind::{Directive, DirectiveDeclaration, DirectiveKind};
use super::query::Query;
use super::resolver;
use crate::ir::TemplatePath;
use rayon::prelude::*;
use serde_json::Value;
use std::collections::BTreeSet;

/// An ordered, validated set of directive declarations.
#[derive(Debug, Clone)]
pub struct DirectiveProcessor {
    declarations: Vec<DirectiveDeclaration>,
    order: Vec<DirectiveKind>,
    root: Option<usize>,
}

impl DirectiveProcessor {
    /// Validate the declarations and fix the stage order.
    ///
    /// `declarations` must be in schema document order; that order decides
    /// between equally shallow hierarchy roots.
    pub fn new(declarations: Vec<DirectiveDeclaration>) -> Result<Self, DependencyCycleError> {
        let present: BTreeSet<DirectiveKind> = declarations.iter().map(DirectiveDeclaration::kind).collect();
        let order = resolver::resolve(&present)?;
        let root = select_hierarchy_root(&declarations);
        Ok(Self {
            declarations,
            order,
            root,
        })
    }

    pub fn order(&self) -> &[DirectiveKind] {
        &self.order
    }

    pub fn declarations(&self) -> &[DirectiveDeclaration] {
        &self.declarations
    }

    /// The active hierarchy root declaration.
    pub fn hierarchy_root(&self) -> Option<&DirectiveDeclaration> {
        self.root.map(|index| &self.declarations[index])
    }

    /// Root declarations that lost to the active one and are ignored.
    pub fn inert_roots(&self) -> impl Iterator<Item = &DirectiveDeclaration> {
        self.declarations
            .iter()
            .enumerate()
            .filter(move |(index, decl)| {
                decl.kind() == DirectiveKind::FrontmatterPart && Some(*index) != self.root
            })
            .map(|(_, decl)| decl)
    }

    /// Run every stage over `dataset`.
    pub fn run(&self, dataset: &Dataset) -> Result<Dataset, PipelineError> {
        let mut current = dataset.clone();
        for &kind in &self.order {
            for (index, decl) in self.declarations.iter().enumerate() {
                if decl.kind() != kind {
                    continue;
                }
                if kind == DirectiveKind::FrontmatterPart && Some(index) != self.root {
                    continue;
                }
                current = apply_stage(&current, decl).map_err(|source| PipelineError::Stage {
                    stage: kind,
                    target: decl.target.to_string(),
                    source,
                })?;
            }
        }
        Ok(current)
    }
}

/// Shallowest root wins; among equals the first declared.
fn select_hierarchy_root(declarations: &[DirectiveDeclaration]) -> Option<usize> {
    declarations
        .iter()
        .enumerate()
        .filter(|(_, decl)| decl.kind() == DirectiveKind::FrontmatterPart)
        .min_by_key(|(index, decl)| (decl.depth(), *index))
        .map(|(index, _)| index)
}

/// Apply one declaration.
pub fn apply_stage(dataset: &Dataset, decl: &DirectiveDeclaration) -> Result<Dataset, StageError> {
    match &decl.directive {
        Directive::FrontmatterPart { schema_type } => select_root(dataset, &decl.target, schema_type.as_deref()),
        Directive::FlattenArrays { field } => {
            let field = element_path(dataset, &decl.target)?.join(field);
            flatten(dataset, &field)
        }
        Directive::Filter { expression } => filter(dataset, &decl.target, expression),
        Directive::DerivedFrom { source } => derive(dataset, &decl.target, source),
        Directive::DerivedUnique => dedup(dataset, &decl.target),
    }
}

// ============================================================================
// Select hierarchy root
// ============================================================================

fn select_root(dataset: &Dataset, target: &TemplatePath, schema_type: Option<&str>) -> Result<Dataset, StageError> {
    if let Some(declared) = schema_type
        && declared != "array"
    {
        return Err(StageError::HierarchyRootNotArray {
            path: target.to_string(),
            found: format!("schema type `{declared}`"),
        });
    }
    if let Some(existing) = dataset.derived(target)
        && !existing.is_array()
    {
        return Err(StageError::HierarchyRootNotArray {
            path: target.to_string(),
            found: json_kind(existing).to_owned(),
        });
    }
    Ok(dataset.with_root(target.clone()))
}

/// `target` relative to each element.
///
/// Under a hierarchy root the target must lie inside it; the root itself maps
/// to the root path (the element list). Without a root the elements are the
/// documents, so the target is used as is.
fn element_path(dataset: &Dataset, target: &TemplatePath) -> Result<TemplatePath, StageError> {
    let Some(root) = dataset.root() else {
        return Ok(target.clone());
    };
    target.strip_prefix(root).ok_or_else(|| StageError::OutsideRoot {
        path: target.to_string(),
        root: format!("`{root}`"),
    })
}

// ============================================================================
// Flatten
// ============================================================================

fn flatten(dataset: &Dataset, field: &TemplatePath) -> Result<Dataset, StageError> {
    if field.is_root() {
        let elements = dataset
            .elements()
            .iter()
            .flat_map(|element| match element {
                Value::Array(items) => items.clone(),
                other => vec![other.clone()],
            })
            .collect();
        return Ok(dataset.with_elements(elements));
    }

    let elements = dataset
        .elements()
        .par_iter()
        .map(|element| flatten_field(element, field))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(dataset.with_elements(elements))
}

fn flatten_field(element: &Value, field: &TemplatePath) -> Result<Value, StageError> {
    let Some(value) = field.lookup(element) else {
        return Ok(element.clone());
    };
    let flattened = flatten_once(value, field)?;
    let mut next = element.clone();
    field
        .insert(&mut next, flattened)
        .map_err(|_| StageError::PathConflict {
            path: field.to_string(),
        })?;
    Ok(next)
}

/// Splice nested arrays one level; wrap scalars as `[x]`.
pub fn flatten_once(value: &Value, path: &TemplatePath) -> Result<Value, StageError> {
    match value {
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .flat_map(|item| match item {
                    Value::Array(inner) => inner.clone(),
                    other => vec![other.clone()],
                })
                .collect(),
        )),
        Value::Object(_) => Err(StageError::WrongType {
            path: path.to_string(),
            expected: "array or scalar",
            found: "object",
        }),
        scalar => Ok(Value::Array(vec![scalar.clone()])),
    }
}

// ============================================================================
// Filter
// ============================================================================

/// Filters act on the element list, so `target` must be the hierarchy root
/// (or the schema root when none is selected).
fn filter(dataset: &Dataset, target: &TemplatePath, expression: &str) -> Result<Dataset, StageError> {
    let in_scope = match dataset.root() {
        Some(root) => target == root,
        None => target.is_root(),
    };
    if !in_scope {
        return Err(StageError::OutsideRoot {
            path: target.to_string(),
            root: dataset.root().map_or_else(|| "none selected".to_owned(), |root| format!("`{root}`")),
        });
    }
    let query = Query::parse(expression)?;
    let elements = dataset
        .elements()
        .par_iter()
        .filter(|element| query.matches(element))
        .cloned()
        .collect();
    Ok(dataset.with_elements(elements))
}

// ============================================================================
// Derive
// ============================================================================

/// Parsed `x-derived-from` source: `array.path[].field.path[]`.
#[derive(Debug, Clone, PartialEq)]
struct DeriveSource {
    /// `None` (or the root path) means the dataset elements.
    array: Option<TemplatePath>,
    field: TemplatePath,
    /// Trailing `[]`: splice array values one level.
    splice: bool,
}

impl DeriveSource {
    fn parse(source: &str) -> Result<Self, StageError> {
        let invalid = |reason: &str| StageError::InvalidSource {
            source_expr: source.to_owned(),
            reason: reason.to_owned(),
        };
        let text = source.trim();
        if text.is_empty() {
            return Err(invalid("empty source"));
        }

        let (array, rest) = match text.split_once("[]") {
            Some((array, rest)) => (Some(array), rest),
            None => (None, text),
        };
        let rest = rest.strip_prefix('.').unwrap_or(rest);
        let (rest, splice) = match rest.strip_suffix("[]") {
            Some(stripped) => (stripped, true),
            None => (rest, false),
        };
        if rest.contains("[]") {
            return Err(invalid("at most one projection and one trailing `[]`"));
        }

        let parse = |text: &str| TemplatePath::parse(text).map_err(|err| invalid(&err.to_string()));
        Ok(Self {
            array: array.map(parse).transpose()?,
            field: parse(rest)?,
            splice,
        })
    }
}

fn derive(dataset: &Dataset, target: &TemplatePath, source: &str) -> Result<Dataset, StageError> {
    let source = DeriveSource::parse(source)?;

    let assembled;
    let items: &[Value] = match &source.array {
        None => dataset.elements(),
        Some(path) if path.is_root() || dataset.root() == Some(path) => dataset.elements(),
        Some(path) => {
            assembled = dataset.assemble()?;
            match path.lookup(&assembled) {
                None => &[],
                Some(Value::Array(items)) => items.as_slice(),
                Some(other) => {
                    return Err(StageError::WrongType {
                        path: path.to_string(),
                        expected: "array",
                        found: json_kind(other),
                    });
                }
            }
        }
    };

    let mut values = Vec::new();
    for item in items {
        match source.field.lookup(item) {
            Some(Value::Array(inner)) if source.splice => values.extend(inner.iter().cloned()),
            Some(value) => values.push(value.clone()),
            None => {}
        }
    }
    Ok(dataset.with_derived(target.clone(), Value::Array(values)))
}

// ============================================================================
// Dedup
// ============================================================================

fn dedup(dataset: &Dataset, target: &TemplatePath) -> Result<Dataset, StageError> {
    let Some(Value::Array(items)) = dataset.derived(target) else {
        return Err(StageError::NotDerived {
            path: target.to_string(),
        });
    };
    Ok(dataset.with_derived(target.clone(), Value::Array(unique(items))))
}

/// Remove deep-equal duplicates, keeping first occurrences in order.
pub fn unique(items: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}
