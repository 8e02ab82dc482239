//! Syntax nodes supplied by the host analysis runtime.
//!
//! Only the node kinds the cache inspects are modeled, each with only the
//! fields it reads.

use serde::Serialize;

/// Location of a node in the consuming source file (1-based).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// `import { imported as local } from "..."`
    Named {
        imported: String,
        local: String,
        span: Span,
    },
    /// `import local from "..."`
    Default { local: String, span: Span },
    /// `import * as local from "..."`
    Namespace { local: String, span: Span },
}

/// A named specifier, as reported back to rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedImport {
    pub imported: String,
    pub local: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDeclaration {
    /// `None` when the source is not a string literal.
    pub source: Option<String>,
    pub specifiers: Vec<ImportSpecifier>,
    pub span: Span,
}

impl ImportDeclaration {
    pub fn new(source: impl Into<String>, specifiers: Vec<ImportSpecifier>) -> Self {
        Self {
            source: Some(source.into()),
            specifiers,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The alias bound by a default or namespace specifier.
    pub fn local_alias(&self) -> Option<&str> {
        self.specifiers.iter().find_map(|spec| match spec {
            ImportSpecifier::Default { local, .. } | ImportSpecifier::Namespace { local, .. } => {
                Some(local.as_str())
            }
            ImportSpecifier::Named { .. } => None,
        })
    }

    pub fn named_imports(&self) -> Vec<NamedImport> {
        self.specifiers
            .iter()
            .filter_map(|spec| match spec {
                ImportSpecifier::Named {
                    imported,
                    local,
                    span,
                } => Some(NamedImport {
                    imported: imported.clone(),
                    local: local.clone(),
                    span: *span,
                }),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    /// Any other literal (`null`, booleans, regexes).
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberObject {
    Identifier(String),
    /// Calls, nested member accesses, `this`, ...
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    Identifier(String),
    Literal(Literal),
    /// Computed expressions that are not literals.
    Other,
}

/// `object.property` or `object[property]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    pub object: MemberObject,
    pub property: MemberProperty,
    pub computed: bool,
    pub span: Span,
}

impl MemberExpression {
    /// `alias.name`
    pub fn dot(alias: &str, name: &str) -> Self {
        Self {
            object: MemberObject::Identifier(alias.to_string()),
            property: MemberProperty::Identifier(name.to_string()),
            computed: false,
            span: Span::default(),
        }
    }

    /// `alias["name"]`
    pub fn index(alias: &str, name: &str) -> Self {
        Self {
            object: MemberObject::Identifier(alias.to_string()),
            property: MemberProperty::Literal(Literal::String(name.to_string())),
            computed: true,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn object_name(&self) -> Option<&str> {
        match &self.object {
            MemberObject::Identifier(name) => Some(name),
            MemberObject::Other => None,
        }
    }

    /// The accessed name for `a.b`, `a["b"]` and `a[0]`; `None` otherwise.
    pub fn property_name(&self) -> Option<String> {
        let name = match (&self.property, self.computed) {
            (MemberProperty::Identifier(name), false) => name.clone(),
            (MemberProperty::Literal(Literal::String(s)), true) => s.clone(),
            (MemberProperty::Literal(Literal::Number(n)), true) => format_number(*n)?,
            _ => return None,
        };
        (!name.is_empty()).then_some(name)
    }
}

/// Renders a numeric key the way it would be written as a property name.
fn format_number(n: f64) -> Option<String> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Some(format!("{}", n as i64))
    } else {
        Some(format!("{}", n))
    }
}

/// Nodes delivered by the host traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum HostNode {
    ImportDeclaration(ImportDeclaration),
    MemberExpression(MemberExpression),
}

impl From<ImportDeclaration> for HostNode {
    fn from(node: ImportDeclaration) -> Self {
        Self::ImportDeclaration(node)
    }
}

impl From<MemberExpression> for HostNode {
    fn from(node: MemberExpression) -> Self {
        Self::MemberExpression(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_namespace_bind_alias() {
        let default = ImportDeclaration::new(
            "./a.css",
            vec![ImportSpecifier::Default {
                local: "styles".into(),
                span: Span::default(),
            }],
        );
        assert_eq!(default.local_alias(), Some("styles"));

        let namespace = ImportDeclaration::new(
            "./a.css",
            vec![ImportSpecifier::Namespace {
                local: "ns".into(),
                span: Span::default(),
            }],
        );
        assert_eq!(namespace.local_alias(), Some("ns"));
    }

    #[test]
    fn test_named_imports_only() {
        let decl = ImportDeclaration::new(
            "./a.css",
            vec![
                ImportSpecifier::Named {
                    imported: "title".into(),
                    local: "t".into(),
                    span: Span::new(1, 10),
                },
                ImportSpecifier::Default {
                    local: "styles".into(),
                    span: Span::default(),
                },
            ],
        );
        let named = decl.named_imports();
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].imported, "title");
        assert_eq!(named[0].span, Span::new(1, 10));
    }

    #[test]
    fn test_property_names() {
        assert_eq!(MemberExpression::dot("s", "title").property_name().as_deref(), Some("title"));
        assert_eq!(MemberExpression::index("s", "a-b").property_name().as_deref(), Some("a-b"));

        let numeric = MemberExpression {
            object: MemberObject::Identifier("s".into()),
            property: MemberProperty::Literal(Literal::Number(0.0)),
            computed: true,
            span: Span::default(),
        };
        assert_eq!(numeric.property_name().as_deref(), Some("0"));

        let dynamic = MemberExpression {
            property: MemberProperty::Other,
            ..numeric.clone()
        };
        assert_eq!(dynamic.property_name(), None);

        let empty = MemberExpression::index("s", "");
        assert_eq!(empty.property_name(), None);

        // `s[title]` is a computed identifier: a variable, not a class name.
        let computed_ident = MemberExpression {
            property: MemberProperty::Identifier("title".into()),
            computed: true,
            ..numeric
        };
        assert_eq!(computed_ident.property_name(), None);
    }
}
