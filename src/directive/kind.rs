//! Directive kinds and declarations.

use crate::ir::TemplatePath;
use compact_str::CompactString;
use std::fmt;

/// The closed set of known directive kinds.
///
/// Priorities and dependency edges are fixed here; a schema only decides
/// which kinds are present and with which parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectiveKind {
    /// Select the hierarchy root (`x-frontmatter-part`).
    FrontmatterPart,
    /// One-level flatten of an element field (`x-flatten-arrays`).
    FlattenArrays,
    /// Drop elements not matching a query (`x-jmespath-filter`).
    Filter,
    /// Collect values across elements into a new field (`x-derived-from`).
    DerivedFrom,
    /// Deduplicate a derived field (`x-derived-unique`).
    DerivedUnique,
}

impl DirectiveKind {
    pub const ALL: [Self; 5] = [
        Self::FrontmatterPart,
        Self::FlattenArrays,
        Self::Filter,
        Self::DerivedFrom,
        Self::DerivedUnique,
    ];

    /// Tie-breaker among kinds whose dependencies are all satisfied.
    pub const fn stage_priority(self) -> u8 {
        match self {
            Self::FrontmatterPart => 0,
            Self::FlattenArrays => 1,
            Self::Filter => 2,
            Self::DerivedFrom => 3,
            Self::DerivedUnique => 4,
        }
    }

    /// Kinds that must run before this one when present.
    pub const fn static_dependencies(self) -> &'static [DirectiveKind] {
        match self {
            Self::FrontmatterPart => &[],
            Self::FlattenArrays => &[Self::FrontmatterPart],
            Self::Filter => &[Self::FrontmatterPart, Self::FlattenArrays],
            Self::DerivedFrom => &[Self::FrontmatterPart, Self::FlattenArrays, Self::Filter],
            Self::DerivedUnique => &[Self::DerivedFrom],
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::FrontmatterPart => "frontmatter-part",
            Self::FlattenArrays => "flatten-arrays",
            Self::Filter => "filter",
            Self::DerivedFrom => "derived-from",
            Self::DerivedUnique => "derived-unique",
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A directive together with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    FrontmatterPart {
        /// `type` declared by the schema for the root property, if any.
        schema_type: Option<CompactString>,
    },
    FlattenArrays {
        /// Sub-path below the declaring property (`true` gives the root path).
        ///
        /// The flattened field is the target made relative to the hierarchy
        /// root, then this path; an empty result flattens the element list.
        field: TemplatePath,
    },
    Filter {
        expression: String,
    },
    DerivedFrom {
        source: String,
    },
    DerivedUnique,
}

impl Directive {
    pub const fn kind(&self) -> DirectiveKind {
        match self {
            Self::FrontmatterPart { .. } => DirectiveKind::FrontmatterPart,
            Self::FlattenArrays { .. } => DirectiveKind::FlattenArrays,
            Self::Filter { .. } => DirectiveKind::Filter,
            Self::DerivedFrom { .. } => DirectiveKind::DerivedFrom,
            Self::DerivedUnique => DirectiveKind::DerivedUnique,
        }
    }
}

/// A directive attached to a property of the output document.
///
/// Declarations keep schema document order; a declaration's depth is the
/// length of its target path.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveDeclaration {
    pub directive: Directive,
    pub target: TemplatePath,
}

impl DirectiveDeclaration {
    pub fn new(directive: Directive, target: TemplatePath) -> Self {
        Self { directive, target }
    }

    pub const fn kind(&self) -> DirectiveKind {
        self.directive.kind()
    }

    pub fn depth(&self) -> usize {
        self.target.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_have_lower_priority() {
        for kind in DirectiveKind::ALL {
            for dep in kind.static_dependencies() {
                assert!(dep.stage_priority() < kind.stage_priority(), "{dep} -> {kind}");
            }
        }
    }

    #[test]
    fn test_declaration_depth() {
        let decl = DirectiveDeclaration::new(
            Directive::DerivedUnique,
            TemplatePath::parse("tools.commands").unwrap(),
        );
        assert_eq!(decl.depth(), 2);
        assert_eq!(decl.kind(), DirectiveKind::DerivedUnique);
    }
}
