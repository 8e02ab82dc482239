//! Lint rules that consume the resolution cache.
//!
//! The host walks a consuming file and feeds its import declarations and
//! member accesses, in source order, to [`lint_nodes`]. Each node is resolved
//! once through the cache and the processed form is dispatched to every
//! enabled rule.

pub mod no_undef_class;
pub mod no_unused_class;

pub use no_undef_class::NoUndefClass;
pub use no_unused_class::{join_class_names, NoUnusedClass};

use crate::cache::{ProcessedImport, ProcessedMemberAccess, ResolutionCache};
use crate::error::CssModResult;
use crate::host::{HostNode, Span};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Off,
    Warn,
    Error,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" | "0" => Ok(Self::Off),
            "warn" | "warning" | "1" => Ok(Self::Warn),
            "error" | "2" => Ok(Self::Error),
            other => Err(format!("unknown severity \"{}\"", other)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule: String,
    pub message_id: String,
    pub severity: Severity,
    pub span: Span,
    pub data: BTreeMap<String, String>,
    /// The message template with `data` substituted.
    pub message: String,
}

/// Substitutes `{key}` placeholders from `data`. Unknown keys stay as written.
fn render_message(template: &str, data: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match data.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Collects diagnostics for one rule.
pub struct Reporter<'a> {
    rule: &'static str,
    severity: Severity,
    messages: &'static [(&'static str, &'static str)],
    out: &'a mut Vec<Diagnostic>,
}

impl Reporter<'_> {
    pub fn report(&mut self, message_id: &str, span: Span, data: &[(&str, &str)]) {
        let data: BTreeMap<String, String> = data
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let template = self
            .messages
            .iter()
            .find(|(id, _)| *id == message_id)
            .map_or(message_id, |(_, text)| *text);
        let message = render_message(template, &data);
        self.out.push(Diagnostic {
            rule: self.rule.to_string(),
            message_id: message_id.to_string(),
            severity: self.severity,
            span,
            data,
            message,
        });
    }
}

/// Hooks a rule implements. All have empty defaults.
///
/// Rules never resolve nodes themselves: the driver hands them the cache's
/// processed form, so every rule sees the same results.
pub trait RuleListener: Send {
    fn name(&self) -> &'static str;

    /// `(message_id, template)` pairs; templates use `{key}` placeholders.
    fn messages(&self) -> &'static [(&'static str, &'static str)];

    fn on_program(&mut self, _cache: &mut ResolutionCache) {}

    fn on_import(&mut self, _import: &ProcessedImport, _reporter: &mut Reporter<'_>) {}

    fn on_member(&mut self, _access: &ProcessedMemberAccess, _reporter: &mut Reporter<'_>) {}

    fn on_program_exit(&mut self, _reporter: &mut Reporter<'_>) {}
}

/// A configured rule.
pub struct RuleEntry {
    pub severity: Severity,
    pub rule: Box<dyn RuleListener>,
}

impl RuleEntry {
    pub fn new(severity: Severity, rule: impl RuleListener + 'static) -> Self {
        Self {
            severity,
            rule: Box::new(rule),
        }
    }

    fn is_active(&self) -> bool {
        self.severity != Severity::Off
    }

    fn reporter<'a>(&self, out: &'a mut Vec<Diagnostic>) -> Reporter<'a> {
        Reporter {
            rule: self.rule.name(),
            severity: self.severity,
            messages: self.rule.messages(),
            out,
        }
    }
}

impl fmt::Debug for RuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEntry")
            .field("severity", &self.severity)
            .field("rule", &self.rule.name())
            .finish()
    }
}

/// Builds a rule by its published name.
pub fn rule_by_name(name: &str) -> Option<Box<dyn RuleListener>> {
    match name {
        no_undef_class::RULE_NAME => Some(Box::new(NoUndefClass)),
        no_unused_class::RULE_NAME => Some(Box::new(NoUnusedClass::default())),
        _ => None,
    }
}

/// `no-undef-class` as error, `no-unused-class` as warning.
pub fn recommended() -> Vec<RuleEntry> {
    vec![
        RuleEntry::new(Severity::Error, NoUndefClass),
        RuleEntry::new(Severity::Warn, NoUnusedClass::default()),
    ]
}

/// Runs `rules` over one consuming file's node stream.
///
/// Extraction failures of an imported stylesheet abort the file and are
/// returned to the host.
pub fn lint_nodes(
    cache: &mut ResolutionCache,
    rules: &mut [RuleEntry],
    nodes: &[HostNode],
) -> CssModResult<Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();
    for entry in rules.iter_mut().filter(|e| e.is_active()) {
        entry.rule.on_program(cache);
    }

    for node in nodes {
        match node {
            HostNode::ImportDeclaration(decl) => {
                let Some(import) = cache.process_import_declaration(decl)? else {
                    continue;
                };
                for entry in rules.iter_mut().filter(|e| e.is_active()) {
                    let mut reporter = entry.reporter(&mut diagnostics);
                    entry.rule.on_import(&import, &mut reporter);
                }
            }
            HostNode::MemberExpression(expr) => {
                let Some(access) = cache.process_member_access(expr) else {
                    continue;
                };
                for entry in rules.iter_mut().filter(|e| e.is_active()) {
                    let mut reporter = entry.reporter(&mut diagnostics);
                    entry.rule.on_member(&access, &mut reporter);
                }
            }
        }
    }

    for entry in rules.iter_mut().filter(|e| e.is_active()) {
        let mut reporter = entry.reporter(&mut diagnostics);
        entry.rule.on_program_exit(&mut reporter);
    }

    debug!(diagnostics = diagnostics.len(), "Linted file");
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_message() {
        let data: BTreeMap<String, String> = [
            ("className".to_string(), "title".to_string()),
            ("baseFilename".to_string(), "./a.css".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            render_message("{className} does not exist in {baseFilename}", &data),
            "title does not exist in ./a.css"
        );
        assert_eq!(render_message("keep {unknown} and {", &data), "keep {unknown} and {");
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("error".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("warning".parse::<Severity>(), Ok(Severity::Warn));
        assert_eq!("0".parse::<Severity>(), Ok(Severity::Off));
        assert!("loud".parse::<Severity>().is_err());
    }

    #[test]
    fn test_recommended_preset() {
        let preset = recommended();
        let summary: Vec<(&str, Severity)> =
            preset.iter().map(|e| (e.rule.name(), e.severity)).collect();
        assert_eq!(
            summary,
            vec![("no-undef-class", Severity::Error), ("no-unused-class", Severity::Warn)]
        );
    }

    #[test]
    fn test_rule_by_name() {
        assert_eq!(rule_by_name("no-undef-class").map(|r| r.name()), Some("no-undef-class"));
        assert_eq!(rule_by_name("no-unused-class").map(|r| r.name()), Some("no-unused-class"));
        assert!(rule_by_name("no-such-rule").is_none());
    }
}
