//! Scope-aware variable resolution over the IR.
//!
//! A context is a stack of frames. Each frame has a cursor into the IR and,
//! inside an array expansion, the binding for the current element:
//!
//! ```text
//! frames[0]  cursor = <root>                    binding = None
//! frames[1]  cursor = commands.1                binding = @items[1 of 3]
//! ```
//!
//! `{name}` is tried as `cursor + name` from the innermost frame outwards.
//! Child contexts copy the frame stack, so a context never points back into
//! its parent.

use super::error::{ContextError, ItemsError, ResolutionError};
use super::fallback::FallbackPolicy;
use super::placeholder::ITEMS;
use crate::ir::{IrNode, Segment, TemplatePath};
use compact_str::CompactString;
use serde_json::Value;

/// Iteration metadata exposed as `@index`, `@count`, `@first`, `@last`,
/// `@odd` and `@even`. `@odd` and `@even` refer to the zero-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationMeta {
    pub index: usize,
    pub count: usize,
    pub first: bool,
    pub last: bool,
    pub odd: bool,
    pub even: bool,
}

impl IterationMeta {
    pub const fn new(index: usize, count: usize) -> Self {
        Self {
            index,
            count,
            first: index == 0,
            last: index + 1 == count,
            odd: index % 2 == 1,
            even: index % 2 == 0,
        }
    }

    fn lookup(&self, token: &str) -> Option<Value> {
        Some(match token {
            "@index" => Value::from(self.index),
            "@count" => Value::from(self.count),
            "@first" => Value::Bool(self.first),
            "@last" => Value::Bool(self.last),
            "@odd" => Value::Bool(self.odd),
            "@even" => Value::Bool(self.even),
            _ => return None,
        })
    }
}

/// The element an expansion frame is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayBinding {
    /// Placeholder (or path) that started the expansion.
    pub marker: CompactString,
    pub array_path: TemplatePath,
    pub index: usize,
    pub total: usize,
    pub meta: IterationMeta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFrame {
    pub cursor: TemplatePath,
    pub binding: Option<ArrayBinding>,
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    pub value: Value,
    /// Absolute IR path the value came from (empty for iteration metadata).
    pub source_path: TemplatePath,
    /// Absolute paths tried, in search order.
    pub scope_chain: Vec<TemplatePath>,
}

/// Value chosen by the fallback policy.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackValue {
    Value(Value),
    /// Keep the placeholder text unchanged.
    Preserve,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(ResolvedValue),
    Fallback(FallbackValue),
}

/// Read-only view of the IR used by one render.
#[derive(Debug, Clone)]
pub struct TemplateContext<'ir> {
    ir: &'ir IrNode,
    root: Option<TemplatePath>,
    frames: Vec<ScopeFrame>,
    policy: FallbackPolicy,
}

impl<'ir> TemplateContext<'ir> {
    /// Top-level context with its cursor at the IR root.
    ///
    /// `root` is the hierarchy root path; `{@items}` resolves to it.
    pub fn new(ir: &'ir IrNode, root: Option<TemplatePath>, policy: FallbackPolicy) -> Self {
        Self {
            ir,
            root,
            frames: vec![ScopeFrame {
                cursor: TemplatePath::root(),
                binding: None,
            }],
            policy,
        }
    }

    pub fn cursor(&self) -> &TemplatePath {
        // `new` always pushes the root frame
        &self.frames[self.frames.len() - 1].cursor
    }

    /// Innermost array binding, if inside an expansion.
    pub fn binding(&self) -> Option<&ArrayBinding> {
        self.frames.iter().rev().find_map(|frame| frame.binding.as_ref())
    }

    /// Whether an `{@items}` expansion encloses this context.
    pub fn in_items(&self) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.binding.as_ref().is_some_and(|b| b.marker == ITEMS))
    }

    /// Resolve a placeholder path.
    pub fn resolve(&self, path: &TemplatePath) -> Result<Resolution, ResolutionError> {
        if let Some(head) = path.head_key()
            && head.starts_with('@')
        {
            return self.resolve_reserved(head, path);
        }

        let mut searched: Vec<TemplatePath> = Vec::with_capacity(self.frames.len());
        for frame in self.frames.iter().rev() {
            let full = frame.cursor.join(path);
            if searched.contains(&full) {
                continue;
            }
            if let Some(node) = self.ir.get(&full) {
                searched.push(full.clone());
                return Ok(Resolution::Found(ResolvedValue {
                    value: node.to_value(),
                    source_path: full,
                    scope_chain: searched,
                }));
            }
            searched.push(full);
        }
        self.fallback(path, searched)
    }

    fn resolve_reserved(&self, head: &str, path: &TemplatePath) -> Result<Resolution, ResolutionError> {
        let rest = TemplatePath::from_segments(path.segments()[1..].iter().cloned());

        if head == ITEMS {
            let Some(root) = &self.root else {
                return Err(ResolutionError::no_root(path));
            };
            let full = root.join(&rest);
            return match self.ir.get(&full) {
                Some(node) => Ok(Resolution::Found(ResolvedValue {
                    value: node.to_value(),
                    source_path: full.clone(),
                    scope_chain: vec![full],
                })),
                None => self.fallback(path, vec![full]),
            };
        }

        let meta = self
            .binding()
            .filter(|_| rest.is_root())
            .and_then(|binding| binding.meta.lookup(head));
        match meta {
            Some(value) => Ok(Resolution::Found(ResolvedValue {
                value,
                source_path: TemplatePath::root(),
                scope_chain: Vec::new(),
            })),
            None => self.fallback(path, Vec::new()),
        }
    }

    fn fallback(&self, path: &TemplatePath, searched: Vec<TemplatePath>) -> Result<Resolution, ResolutionError> {
        let value = match &self.policy {
            FallbackPolicy::Empty => Value::String(String::new()),
            FallbackPolicy::Preserve => return Ok(Resolution::Fallback(FallbackValue::Preserve)),
            FallbackPolicy::Null => Value::Null,
            FallbackPolicy::Error => return Err(ResolutionError::not_found(path, searched)),
            FallbackPolicy::Custom(handler) => handler(path, &searched),
        };
        Ok(Resolution::Fallback(FallbackValue::Value(value)))
    }

    /// One child context per element of the array at `path`.
    ///
    /// `path` is searched like a placeholder: relative to the innermost cursor
    /// first, then outwards.
    pub fn enter_array(
        &self,
        path: &TemplatePath,
    ) -> Result<impl ExactSizeIterator<Item = TemplateContext<'ir>> + '_, ContextError> {
        let mut searched = Vec::new();
        for frame in self.frames.iter().rev() {
            let full = frame.cursor.join(path);
            if let Some(node) = self.ir.get(&full) {
                return self.bind_array(path.to_string().into(), full, node);
            }
            if !searched.contains(&full) {
                searched.push(full);
            }
        }
        Err(ContextError::ArrayNotFound {
            path: path.clone(),
            searched,
        })
    }

    /// Child contexts over the hierarchy root array.
    pub fn enter_items(&self) -> Result<impl ExactSizeIterator<Item = TemplateContext<'ir>> + '_, ItemsError> {
        let items = TemplatePath::from_segments([Segment::Key(ITEMS.into())]);
        let Some(root) = &self.root else {
            return Err(ItemsError::Resolution(ResolutionError::no_root(&items)));
        };
        let Some(node) = self.ir.get(root) else {
            return Err(ItemsError::Context(ContextError::ArrayNotFound {
                path: root.clone(),
                searched: vec![root.clone()],
            }));
        };
        self.bind_array(ITEMS.into(), root.clone(), node)
            .map_err(ItemsError::Context)
    }

    fn bind_array(
        &self,
        marker: CompactString,
        array_path: TemplatePath,
        node: &'ir IrNode,
    ) -> Result<impl ExactSizeIterator<Item = TemplateContext<'ir>> + '_, ContextError> {
        let Some(items) = node.as_array() else {
            return Err(ContextError::TypeMismatch {
                path: array_path,
                found: node.kind(),
            });
        };
        let total = items.len();
        Ok((0..total).map(move |index| {
            self.push_frame(ScopeFrame {
                cursor: array_path.child_index(index),
                binding: Some(ArrayBinding {
                    marker: marker.clone(),
                    array_path: array_path.clone(),
                    index,
                    total,
                    meta: IterationMeta::new(index, total),
                }),
            })
        }))
    }

    /// Child context with its cursor moved to `cursor.name`.
    ///
    /// A missing property is only an error under the `Error` policy; otherwise
    /// lookups from the child fall back to enclosing scopes.
    pub fn enter_property(&self, name: &str) -> Result<TemplateContext<'ir>, ContextError> {
        let cursor = self.cursor().child_key(name);
        if self.policy.is_strict() && self.ir.get(&cursor).is_none() {
            return Err(ContextError::PropertyNotFound { path: cursor });
        }
        Ok(self.push_frame(ScopeFrame { cursor, binding: None }))
    }

    fn push_frame(&self, frame: ScopeFrame) -> TemplateContext<'ir> {
        let mut frames = self.frames.clone();
        frames.push(frame);
        TemplateContext {
            ir: self.ir,
            root: self.root.clone(),
            frames,
            policy: self.policy.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrBuilder;
    use serde_json::json;

    fn path(text: &str) -> TemplatePath {
        TemplatePath::parse(text).unwrap()
    }

    fn ir(value: Value) -> IrNode {
        IrBuilder::default().build(&value).unwrap()
    }

    fn found(resolution: Resolution) -> Value {
        match resolution {
            Resolution::Found(resolved) => resolved.value,
            other => panic!("expected a value, got {other:?}"),
        }
    }

    #[test]
    fn test_child_scope_falls_back_to_parent() {
        let tree = ir(json!({
            "site": "docs",
            "commands": [{"name": "build"}, {"name": "plan", "site": "override"}],
        }));
        let ctx = TemplateContext::new(&tree, Some(path("commands")), FallbackPolicy::Error);
        let children: Vec<_> = ctx.enter_items().unwrap().collect();
        assert_eq!(children.len(), 2);

        assert_eq!(found(children[0].resolve(&path("name")).unwrap()), json!("build"));
        assert_eq!(found(children[0].resolve(&path("site")).unwrap()), json!("docs"));
        assert_eq!(found(children[1].resolve(&path("site")).unwrap()), json!("override"));

        let Resolution::Found(resolved) = children[0].resolve(&path("site")).unwrap() else {
            panic!("expected a value");
        };
        assert_eq!(resolved.source_path, path("site"));
        assert_eq!(resolved.scope_chain, vec![path("commands.0.site"), path("site")]);
    }

    #[test]
    fn test_iteration_metadata() {
        let tree = ir(json!({"xs": [1, 2, 3]}));
        let ctx = TemplateContext::new(&tree, None, FallbackPolicy::Null);
        let children: Vec<_> = ctx.enter_array(&path("xs")).unwrap().collect();

        let meta = |i: usize, token: &str| found(children[i].resolve(&path(token)).unwrap());
        assert_eq!(meta(0, "@index"), json!(0));
        assert_eq!(meta(2, "@count"), json!(3));
        assert_eq!(meta(0, "@first"), json!(true));
        assert_eq!(meta(2, "@last"), json!(true));
        assert_eq!(meta(1, "@odd"), json!(true));
        assert_eq!(meta(1, "@even"), json!(false));

        // outside iteration the identifiers are unbound
        assert_eq!(
            ctx.resolve(&path("@index")).unwrap(),
            Resolution::Fallback(FallbackValue::Value(Value::Null))
        );
    }

    #[test]
    fn test_items_without_root() {
        let tree = ir(json!({"a": 1}));
        for policy in [FallbackPolicy::Empty, FallbackPolicy::Preserve, FallbackPolicy::Error] {
            let ctx = TemplateContext::new(&tree, None, policy);
            let err = ctx.resolve(&path("@items")).unwrap_err();
            assert!(err.to_string().contains("no array root declared"));
            assert!(matches!(ctx.enter_items(), Err(ItemsError::Resolution(_))));
        }
    }

    #[test]
    fn test_items_resolves_root_array_only() {
        let tree = ir(json!({"docs": [{"t": "a"}], "other": [9]}));
        let ctx = TemplateContext::new(&tree, Some(path("docs")), FallbackPolicy::Empty);
        assert_eq!(found(ctx.resolve(&path("@items")).unwrap()), json!([{"t": "a"}]));
        assert_eq!(found(ctx.resolve(&path("@items.0.t")).unwrap()), json!("a"));
    }

    #[test]
    fn test_fallback_policies() {
        let tree = ir(json!({}));
        let missing = path("nope");
        let resolve = |policy| TemplateContext::new(&tree, None, policy).resolve(&missing);

        assert_eq!(
            resolve(FallbackPolicy::Empty).unwrap(),
            Resolution::Fallback(FallbackValue::Value(json!("")))
        );
        assert_eq!(
            resolve(FallbackPolicy::Preserve).unwrap(),
            Resolution::Fallback(FallbackValue::Preserve)
        );
        assert_eq!(
            resolve(FallbackPolicy::Null).unwrap(),
            Resolution::Fallback(FallbackValue::Value(Value::Null))
        );
        let custom = FallbackPolicy::custom(|path, chain| json!(format!("{path}:{}", chain.len())));
        assert_eq!(
            resolve(custom).unwrap(),
            Resolution::Fallback(FallbackValue::Value(json!("nope:1")))
        );
        match resolve(FallbackPolicy::Error).unwrap_err() {
            ResolutionError::VariableNotFound { searched, .. } => assert_eq!(searched, vec![missing.clone()]),
        }
    }

    #[test]
    fn test_enter_array_errors() {
        let tree = ir(json!({"obj": {"a": 1}}));
        let ctx = TemplateContext::new(&tree, None, FallbackPolicy::Empty);
        assert!(matches!(
            ctx.enter_array(&path("missing")),
            Err(ContextError::ArrayNotFound { .. })
        ));
        assert!(matches!(
            ctx.enter_array(&path("obj")),
            Err(ContextError::TypeMismatch { found: "object", .. })
        ));
    }

    #[test]
    fn test_enter_property() {
        let tree = ir(json!({"meta": {"title": "inner"}, "title": "outer", "x": 1}));
        let lenient = TemplateContext::new(&tree, None, FallbackPolicy::Empty);
        let meta = lenient.enter_property("meta").unwrap();
        assert_eq!(meta.cursor(), &path("meta"));
        assert_eq!(found(meta.resolve(&path("title")).unwrap()), json!("inner"));
        assert_eq!(found(meta.resolve(&path("x")).unwrap()), json!(1));

        assert!(lenient.enter_property("absent").is_ok());
        let strict = TemplateContext::new(&tree, None, FallbackPolicy::Error);
        assert!(matches!(
            strict.enter_property("absent"),
            Err(ContextError::PropertyNotFound { .. })
        ));
    }
}
