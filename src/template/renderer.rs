//! Template rendering.
//!
//! Each call to [`Renderer::render`] runs one pass through a small state
//! machine:
//!
//! ```text
//! NotStarted ──► Scanning ──► Resolving ──► Substituting ──┐
//!                   ▲                                       │
//!                   └───────────────────────────────────────┘
//!                   │
//!                   ├──► Done
//!                   └──► Failed   (strict miss, bad array, nested {@items})
//! ```
//!
//! A failed pass returns no output at all.

use super::context::{FallbackValue, Resolution, TemplateContext};
use super::document::{Template, TemplateNode};
use super::error::{RenderError, RenderFailure, RenderState};
use super::placeholder::{Part, Placeholder};
use serde_json::{Map, Value};

/// Renders container templates, expanding `{@items}` with an optional item
/// template.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer<'t> {
    items: Option<&'t Template>,
}

impl<'t> Renderer<'t> {
    pub const fn new() -> Self {
        Self { items: None }
    }

    /// Template rendered once per hierarchy root element.
    pub const fn with_items(mut self, template: &'t Template) -> Self {
        self.items = Some(template);
        self
    }

    pub fn render(&self, template: &Template, ctx: &TemplateContext<'_>) -> Result<Value, RenderError> {
        RenderPass::new(self.items).run(template, ctx)
    }
}

/// What replaces one placeholder.
enum Substitution {
    Value(Value),
    Keep,
}

struct RenderPass<'t> {
    items: Option<&'t Template>,
    state: RenderState,
}

impl<'t> RenderPass<'t> {
    const fn new(items: Option<&'t Template>) -> Self {
        Self {
            items,
            state: RenderState::NotStarted,
        }
    }

    fn run(mut self, template: &Template, ctx: &TemplateContext<'_>) -> Result<Value, RenderError> {
        self.state = RenderState::Scanning;
        match self.node(template.root(), ctx) {
            Ok(value) => {
                self.state = RenderState::Done;
                Ok(value)
            }
            Err(source) => {
                let state = self.state;
                self.state = RenderState::Failed;
                Err(RenderError { state, source })
            }
        }
    }

    fn node(&mut self, node: &TemplateNode, ctx: &TemplateContext<'_>) -> Result<Value, RenderFailure> {
        match node {
            TemplateNode::Value(value) => Ok(value.clone()),
            TemplateNode::Text(parts) => self.text(parts, ctx),
            TemplateNode::Array(nodes) => {
                let mut out = Vec::with_capacity(nodes.len());
                for node in nodes {
                    match (self.items, items_marker(node)) {
                        (Some(item), true) => out.extend(self.expand_items(item, ctx)?),
                        _ => out.push(self.node(node, ctx)?),
                    }
                }
                Ok(Value::Array(out))
            }
            TemplateNode::Object(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, node) in entries {
                    map.insert(key.clone(), self.node(node, ctx)?);
                }
                Ok(Value::Object(map))
            }
        }
    }

    fn text(&mut self, parts: &[Part], ctx: &TemplateContext<'_>) -> Result<Value, RenderFailure> {
        // a lone placeholder keeps the resolved value's type
        if let [Part::Placeholder(placeholder)] = parts {
            let value = match self.placeholder(placeholder, ctx)? {
                Substitution::Value(value) => value,
                Substitution::Keep => Value::String(placeholder.raw().to_owned()),
            };
            self.state = RenderState::Scanning;
            return Ok(value);
        }

        let mut out = String::new();
        for part in parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Placeholder(placeholder) => match self.placeholder(placeholder, ctx)? {
                    Substitution::Value(value) => out.push_str(&interpolate(&value)),
                    Substitution::Keep => out.push_str(placeholder.raw()),
                },
            }
            self.state = RenderState::Scanning;
        }
        Ok(Value::String(out))
    }

    fn placeholder(&mut self, placeholder: &Placeholder, ctx: &TemplateContext<'_>) -> Result<Substitution, RenderFailure> {
        if placeholder.is_items() {
            return match self.items {
                Some(item) => Ok(Substitution::Value(Value::Array(self.expand_items(item, ctx)?))),
                None => Ok(Substitution::Keep),
            };
        }

        self.state = RenderState::Resolving;
        let substitution = match ctx.resolve(placeholder.path())? {
            Resolution::Found(resolved) => Substitution::Value(resolved.value),
            Resolution::Fallback(FallbackValue::Value(value)) => Substitution::Value(value),
            Resolution::Fallback(FallbackValue::Preserve) => Substitution::Keep,
        };
        self.state = RenderState::Substituting;
        Ok(substitution)
    }

    fn expand_items(&mut self, item: &Template, ctx: &TemplateContext<'_>) -> Result<Vec<Value>, RenderFailure> {
        self.state = RenderState::Resolving;
        if ctx.in_items() {
            return Err(RenderFailure::NestedItems);
        }
        let scopes = ctx.enter_items()?;
        let mut out = Vec::with_capacity(scopes.len());
        for child in scopes {
            self.state = RenderState::Scanning;
            out.push(self.node(item.root(), &child)?);
        }
        self.state = RenderState::Substituting;
        Ok(out)
    }
}

fn items_marker(node: &TemplateNode) -> bool {
    matches!(node, TemplateNode::Text(parts) if matches!(parts.as_slice(), [Part::Placeholder(p)] if p.is_items()))
}

/// Text form of a value inside mixed text.
fn interpolate(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrBuilder, IrNode, TemplatePath};
    use crate::template::error::ResolutionError;
    use crate::template::fallback::FallbackPolicy;
    use proptest::prelude::*;
    use serde_json::json;

    fn ir(value: Value) -> IrNode {
        IrBuilder::default().build(&value).unwrap()
    }

    fn root(text: &str) -> Option<TemplatePath> {
        Some(TemplatePath::parse(text).unwrap())
    }

    #[test]
    fn test_item_expansion() {
        let tree = ir(json!({"items": [{"id": {"full": "a"}}, {"id": {"full": "b"}}]}));
        let ctx = TemplateContext::new(&tree, root("items"), FallbackPolicy::Empty);
        let item = Template::from_value(&json!({"id": "{id.full}"}));

        let out = Renderer::new()
            .with_items(&item)
            .render(&Template::from_text("{@items}"), &ctx)
            .unwrap();
        assert_eq!(out, json!([{"id": "a"}, {"id": "b"}]));
    }

    #[test]
    fn test_items_splice_in_array_position() {
        let tree = ir(json!({"cmds": [{"n": "git"}, {"n": "npm"}], "title": "Tools"}));
        let ctx = TemplateContext::new(&tree, root("cmds"), FallbackPolicy::Empty);
        let item = Template::from_text("{n} ({@index}/{@count})");
        let container = Template::from_value(&json!({
            "title": "{title}",
            "list": ["first", "{@items}", "last"],
            "nested": "{@items}",
        }));

        let out = Renderer::new().with_items(&item).render(&container, &ctx).unwrap();
        assert_eq!(
            out,
            json!({
                "title": "Tools",
                "list": ["first", "git (0/2)", "npm (1/2)", "last"],
                "nested": ["git (0/2)", "npm (1/2)"],
            })
        );
    }

    #[test]
    fn test_items_without_item_template_stays_literal() {
        let tree = ir(json!({"items": [1, 2]}));
        let ctx = TemplateContext::new(&tree, root("items"), FallbackPolicy::Error);
        let container = Template::from_value(&json!({"list": ["{@items}"], "text": "all: {@items}"}));
        let out = Renderer::new().render(&container, &ctx).unwrap();
        assert_eq!(out, json!({"list": ["{@items}"], "text": "all: {@items}"}));
    }

    #[test]
    fn test_missing_root_with_item_template() {
        let tree = ir(json!({"items": [1]}));
        let ctx = TemplateContext::new(&tree, None, FallbackPolicy::Empty);
        let item = Template::from_text("{@index}");
        let err = Renderer::new()
            .with_items(&item)
            .render(&Template::from_text("{@items}"), &ctx)
            .unwrap_err();
        assert!(matches!(
            err.source,
            RenderFailure::Resolution(ResolutionError::VariableNotFound { .. })
        ));
        assert!(err.to_string().contains("no array root declared"));
    }

    #[test]
    fn test_exact_placeholder_keeps_type() {
        let tree = ir(json!({"count": 3, "tags": ["a"], "flag": true, "none": null}));
        let ctx = TemplateContext::new(&tree, None, FallbackPolicy::Empty);
        let out = Renderer::new()
            .render(
                &Template::from_value(&json!({
                    "count": "{count}",
                    "tags": "{tags}",
                    "flag": "{flag}",
                    "none": "{none}",
                    "mixed": "n={count} tags={tags} none=[{none}]",
                })),
                &ctx,
            )
            .unwrap();
        assert_eq!(
            out,
            json!({
                "count": 3,
                "tags": ["a"],
                "flag": true,
                "none": null,
                "mixed": "n=3 tags=[\"a\"] none=[]",
            })
        );
    }

    #[test]
    fn test_empty_and_preserve_policies() {
        let tree = ir(json!({"name": "x"}));
        let template = Template::from_text("{name}: {missing.field}");

        let render = |policy| {
            let ctx = TemplateContext::new(&tree, None, policy);
            Renderer::new().render(&template, &ctx).unwrap()
        };
        assert_eq!(render(FallbackPolicy::Empty), json!("x: "));
        assert_eq!(render(FallbackPolicy::Preserve), json!("x: {missing.field}"));
        assert_eq!(render(FallbackPolicy::Null), json!("x: "));
    }

    #[test]
    fn test_strict_miss_fails_whole_render() {
        let tree = ir(json!({"items": [{"a": 1}, {"b": 2}]}));
        let ctx = TemplateContext::new(&tree, root("items"), FallbackPolicy::Error);
        let item = Template::from_value(&json!({"a": "{a}"}));
        let err = Renderer::new()
            .with_items(&item)
            .render(&Template::from_value(&json!({"all": "{@items}"})), &ctx)
            .unwrap_err();
        assert_eq!(err.state, RenderState::Resolving);
        match err.source {
            RenderFailure::Resolution(ResolutionError::VariableNotFound { searched, .. }) => {
                assert_eq!(
                    searched,
                    vec![TemplatePath::parse("items.1.a").unwrap(), TemplatePath::parse("a").unwrap()]
                );
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_nested_items_rejected() {
        let tree = ir(json!({"items": [1]}));
        let ctx = TemplateContext::new(&tree, root("items"), FallbackPolicy::Empty);
        let item = Template::from_text("{@items}");
        let err = Renderer::new().with_items(&item).render(&item, &ctx).unwrap_err();
        assert_eq!(err.source, RenderFailure::NestedItems);
    }

    #[test]
    fn test_root_not_array() {
        let tree = ir(json!({"items": {"a": 1}}));
        let ctx = TemplateContext::new(&tree, root("items"), FallbackPolicy::Empty);
        let item = Template::from_text("x");
        let err = Renderer::new()
            .with_items(&item)
            .render(&Template::from_text("{@items}"), &ctx)
            .unwrap_err();
        assert!(matches!(err.source, RenderFailure::Context(_)));
    }

    #[test]
    fn test_render_is_idempotent() {
        let tree = ir(json!({"items": [{"t": "a"}, {"t": "b"}], "site": "s"}));
        let ctx = TemplateContext::new(&tree, root("items"), FallbackPolicy::Preserve);
        let item = Template::from_value(&json!({"t": "{t}", "site": "{site}", "odd": "{@odd}"}));
        let container = Template::from_value(&json!({"site": "{site}", "pages": ["{@items}"], "x": "{gone}"}));
        let renderer = Renderer::new().with_items(&item);

        let first = renderer.render(&container, &ctx).unwrap();
        let second = renderer.render(&container, &ctx).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    proptest! {
        #[test]
        fn prop_items_yield_one_result_per_element(names in prop::collection::vec("[a-z]{1,8}", 1..30)) {
            let elements: Vec<Value> = names.iter().map(|n| json!({"name": n})).collect();
            let tree = ir(json!({"docs": elements}));
            let ctx = TemplateContext::new(&tree, root("docs"), FallbackPolicy::Error);
            let item = Template::from_text("{name}");

            let out = Renderer::new()
                .with_items(&item)
                .render(&Template::from_text("{@items}"), &ctx)
                .unwrap();
            let expected: Vec<Value> = names.iter().map(|n| json!(n)).collect();
            prop_assert_eq!(out, Value::Array(expected));
        }
    }
}
