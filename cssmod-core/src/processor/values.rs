//! `@value` substitution.
//!
//! Definitions are resolved in document order, so a value may reference
//! any value defined before it. Imported values have no literal here and
//! their usages stay as written.

use super::{Completion, Stage, StageContext};
use crate::error::CssModResult;
use crate::stylesheet::{Node, Stylesheet};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// `a, b as c from "file"` / `(a, b) from 'file'`
pub(crate) fn match_imports() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"^(.+?|\([\s\S]+?\))\s+from\s+("[^"]*"|'[^']*'|[0-9A-Za-z_-]+)$"#)
            .expect("Hardcoded regex pattern is valid")
    })
}

/// `name: value` / `name value`
pub(crate) fn match_value_definition() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?:\s+|^)([0-9A-Za-z_-]+):?\s+(.+?)\s*$")
            .expect("Hardcoded regex pattern is valid")
    })
}

/// `theirName [as myName]`
fn match_import() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^([0-9A-Za-z_-]+)(?:\s+as\s+([0-9A-Za-z_-]+))?")
            .expect("Hardcoded regex pattern is valid")
    })
}

/// Any token that could name a value.
pub(crate) fn match_value_name() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"[$]?[0-9A-Za-z_-]+").expect("Hardcoded regex pattern is valid")
    })
}

fn match_parenthesized() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^\(\s*([\s\S]+)\s*\)$").expect("Hardcoded regex pattern is valid")
    })
}

fn match_list_separator() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\s*,\s*").expect("Hardcoded regex pattern is valid")
    })
}

/// A parsed `@value` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ValueRule {
    /// `(their, mine)` pairs plus the quoted source.
    Import {
        bindings: Vec<(String, String)>,
        source: String,
    },
    Definition {
        name: String,
        value: String,
    },
}

impl ValueRule {
    /// Names this statement makes available in the file.
    pub(crate) fn defined_names(&self) -> Vec<&str> {
        match self {
            Self::Import { bindings, .. } => {
                bindings.iter().map(|(_, mine)| mine.as_str()).collect()
            }
            Self::Definition { name, .. } => vec![name.as_str()],
        }
    }
}

pub(crate) fn parse_value_rule(params: &str) -> Option<ValueRule> {
    if let Some(caps) = match_imports().captures(params) {
        let list = match_parenthesized().replace(&caps[1], "$1");
        let bindings = match_list_separator()
            .split(&list)
            .filter_map(|alias| {
                let tokens = match_import().captures(alias)?;
                let theirs = tokens[1].to_string();
                let mine = tokens
                    .get(2)
                    .map_or_else(|| theirs.clone(), |m| m.as_str().to_string());
                Some((theirs, mine))
            })
            .collect();
        return Some(ValueRule::Import {
            bindings,
            source: caps[2].to_string(),
        });
    }

    match_value_definition()
        .captures(params)
        .map(|caps| ValueRule::Definition {
            name: caps[1].to_string(),
            value: caps[2].to_string(),
        })
}

pub(crate) fn is_value_rule(node: &Node) -> bool {
    matches!(node, Node::AtRule(at) if at.name.eq_ignore_ascii_case("value"))
}

/// Replaces every whole value-name token found in `values`.
fn replace_value_symbols(text: &str, values: &HashMap<String, String>) -> String {
    match_value_name()
        .replace_all(text, |caps: &Captures| {
            values
                .get(&caps[0])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

pub struct Values;

impl Stage for Values {
    fn name(&self) -> &str {
        "values"
    }

    fn run(&self, sheet: &mut Stylesheet, _ctx: &mut StageContext<'_>) -> CssModResult<Completion> {
        let mut values: HashMap<String, String> = HashMap::new();
        let mut found = false;

        sheet.walk(|node| {
            let Node::AtRule(at) = node else { return };
            if !is_value_rule(node) {
                return;
            }
            found = true;
            match parse_value_rule(&at.params) {
                Some(ValueRule::Definition { name, value }) => {
                    let resolved = replace_value_symbols(&value, &values);
                    values.insert(name, resolved);
                }
                Some(ValueRule::Import { bindings, .. }) => {
                    for (_, mine) in bindings {
                        values.remove(&mine);
                    }
                }
                None => {}
            }
        });

        if !found {
            return Ok(Completion::Done);
        }

        sheet.retain(|node| !is_value_rule(node));
        if values.is_empty() {
            return Ok(Completion::Done);
        }

        sheet.walk_mut(|node| match node {
            Node::Decl(decl) => decl.value = replace_value_symbols(&decl.value, &values),
            Node::Rule(rule) => rule.selector = replace_value_symbols(&rule.selector, &values),
            Node::AtRule(at) => at.params = replace_value_symbols(&at.params, &values),
        });

        Ok(Completion::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Scope;
    use crate::stylesheet::parse_stylesheet;
    use std::path::Path;

    fn run(css: &str) -> Stylesheet {
        let path = Path::new("/values.css");
        let mut sheet = parse_stylesheet(css, path).unwrap();
        let mut ctx = StageContext::new(path, Scope::Local);
        Values.run(&mut sheet, &mut ctx).unwrap();
        sheet
    }

    fn decl_values(sheet: &Stylesheet) -> Vec<String> {
        let mut out = Vec::new();
        sheet.walk(|node| {
            if let Node::Decl(d) = node {
                out.push(d.value.clone());
            }
        });
        out
    }

    #[test]
    fn test_parse_definitions() {
        assert_eq!(
            parse_value_rule("primary: #BF4040"),
            Some(ValueRule::Definition {
                name: "primary".into(),
                value: "#BF4040".into()
            })
        );
        assert_eq!(
            parse_value_rule("small (max-width: 599px)"),
            Some(ValueRule::Definition {
                name: "small".into(),
                value: "(max-width: 599px)".into()
            })
        );
    }

    #[test]
    fn test_parse_imports() {
        assert_eq!(
            parse_value_rule("primary, secondary as alt from \"./colors.css\""),
            Some(ValueRule::Import {
                bindings: vec![
                    ("primary".into(), "primary".into()),
                    ("secondary".into(), "alt".into()),
                ],
                source: "\"./colors.css\"".into(),
            })
        );
        let parens = parse_value_rule("(a, b) from './x.css'").unwrap();
        assert_eq!(parens.defined_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_substitutes_and_removes_definitions() {
        let sheet = run("@value red: #f00; .title { color: red; border: 1px solid red; }");
        assert_eq!(decl_values(&sheet), vec!["#f00", "1px solid #f00"]);
        assert!(!sheet.nodes.iter().any(is_value_rule));
    }

    #[test]
    fn test_values_reference_earlier_values() {
        let sheet = run("@value base: 4px; @value double: base base; .a { margin: double; }");
        assert_eq!(decl_values(&sheet), vec!["4px 4px"]);
    }

    #[test]
    fn test_imported_values_left_alone() {
        let sheet = run("@value brand from \"./theme.css\"; .a { color: brand; }");
        assert_eq!(decl_values(&sheet), vec!["brand"]);
    }

    #[test]
    fn test_whole_tokens_only() {
        let sheet = run("@value red: #f00; .a { color: dark-red; background: red; }");
        assert_eq!(decl_values(&sheet), vec!["dark-red", "#f00"]);
    }

    #[test]
    fn test_media_params_substituted() {
        let sheet = run("@value small: (max-width: 599px); @media small { .a { color: blue; } }");
        let mut params = Vec::new();
        sheet.walk_at_rules("media", |at| params.push(at.params.clone()));
        assert_eq!(params, vec!["(max-width: 599px)"]);
    }
}
