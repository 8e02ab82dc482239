//! Detects which `@value` names are referenced before substitution removes
//! the evidence.
//!
//! A name counts as used when it appears in a declaration value, a selector,
//! or the params of any at-rule other than the one defining it.

use super::values::{is_value_rule, match_value_name, parse_value_rule};
use super::{Completion, Message, NameSet, Stage, StageContext};
use crate::error::CssModResult;
use crate::stylesheet::{Node, Stylesheet};
use std::collections::HashMap;

pub struct UsedValues;

/// Collects matches of known names, skipping those defined by `own_rule`.
fn find_used_values(
    text: &str,
    own_rule: Option<usize>,
    definitions: &HashMap<String, usize>,
    used: &mut NameSet,
) {
    for m in match_value_name().find_iter(text) {
        match definitions.get(m.as_str()) {
            Some(defined_at) if Some(*defined_at) != own_rule => used.insert(m.as_str()),
            _ => {}
        }
    }
}

impl Stage for UsedValues {
    fn name(&self) -> &str {
        "used-values"
    }

    fn run(&self, sheet: &mut Stylesheet, ctx: &mut StageContext<'_>) -> CssModResult<Completion> {
        // Name → ordinal of the at-rule that defines it (pre-order).
        let mut definitions: HashMap<String, usize> = HashMap::new();
        let mut ordinal = 0usize;
        sheet.walk(|node| {
            if let Node::AtRule(at) = node {
                if is_value_rule(node) {
                    if let Some(rule) = parse_value_rule(&at.params) {
                        for name in rule.defined_names() {
                            definitions.insert(name.to_string(), ordinal);
                        }
                    }
                }
                ordinal += 1;
            }
        });

        if definitions.is_empty() {
            return Ok(Completion::Done);
        }

        let mut used = NameSet::default();
        let mut ordinal = 0usize;
        sheet.walk(|node| match node {
            Node::Decl(decl) => find_used_values(&decl.value, None, &definitions, &mut used),
            Node::Rule(rule) => find_used_values(&rule.selector, None, &definitions, &mut used),
            Node::AtRule(at) => {
                find_used_values(&at.params, Some(ordinal), &definitions, &mut used);
                ordinal += 1;
            }
        });

        if !used.is_empty() {
            ctx.messages
                .push(Message::UsedValues(used.iter().map(str::to_string).collect()));
        }
        Ok(Completion::Done)
    }
}
