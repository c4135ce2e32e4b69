//! Placeholder scanning.
//!
//! Grammar: `{segment(.segment)*}` where a segment is an identifier, an
//! integer index, or a reserved `@` token. Braces that do not match the
//! grammar (JSON snippets, `{ spaced }` text) are ordinary text.

use crate::ir::TemplatePath;
use regex::Regex;
use std::sync::LazyLock;

static RE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{((?:@?[A-Za-z_][\w-]*|\d+)(?:\.(?:@?[A-Za-z_][\w-]*|\d+))*)\}").unwrap()
});

pub const ITEMS: &str = "@items";

/// One `{...}` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    raw: String,
    path: TemplatePath,
}

impl Placeholder {
    /// Original text, braces included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn path(&self) -> &TemplatePath {
        &self.path
    }

    /// Exactly `{@items}`.
    pub fn is_items(&self) -> bool {
        self.path.len() == 1 && self.path.head_key() == Some(ITEMS)
    }
}

/// A piece of template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Literal(String),
    Placeholder(Placeholder),
}

/// Split `text` into literal runs and placeholders.
pub fn scan(text: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut last = 0;

    for caps in RE_PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(path) = TemplatePath::parse(inner.as_str()) else {
            continue;
        };
        if whole.start() > last {
            parts.push(Part::Literal(text[last..whole.start()].to_owned()));
        }
        parts.push(Part::Placeholder(Placeholder {
            raw: whole.as_str().to_owned(),
            path,
        }));
        last = whole.end();
    }

    if last < text.len() {
        parts.push(Part::Literal(text[last..].to_owned()));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders(text: &str) -> Vec<String> {
        scan(text)
            .into_iter()
            .filter_map(|part| match part {
                Part::Placeholder(p) => Some(p.path().to_string()),
                Part::Literal(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_scan_mixed_text() {
        let parts = scan("Hello {user.name}, item {@index}!");
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], Part::Literal("Hello ".into()));
        assert_eq!(parts[4], Part::Literal("!".into()));
        assert_eq!(placeholders("Hello {user.name}, item {@index}!"), ["user.name", "@index"]);
    }

    #[test]
    fn test_scan_indices_and_reserved() {
        assert_eq!(placeholders("{@items.0.title}"), ["@items.0.title"]);
        assert_eq!(placeholders("{list.2}"), ["list.2"]);
        assert_eq!(placeholders("{kebab-key}"), ["kebab-key"]);
    }

    #[test]
    fn test_non_placeholders_stay_literal() {
        for text in ["{}", "{ spaced }", r#"{"a": 1}"#, "{a..b}", "{.a}", "plain"] {
            assert_eq!(scan(text), vec![Part::Literal(text.into())], "{text}");
        }
    }

    #[test]
    fn test_items_marker() {
        let Part::Placeholder(p) = &scan("{@items}")[0] else {
            panic!("expected placeholder");
        };
        assert!(p.is_items());
        assert_eq!(p.raw(), "{@items}");

        let Part::Placeholder(p) = &scan("{@items.0}")[0] else {
            panic!("expected placeholder");
        };
        assert!(!p.is_items());
    }

    #[test]
    fn test_empty_text() {
        assert!(scan("").is_empty());
    }
}
