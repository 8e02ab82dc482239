//! Detects `@keyframes` referenced from `animation-name` or `animation`.
//!
//! The shorthand is not parsed: any whitespace-separated token that equals a
//! declared keyframes name counts as a reference.

use super::{Completion, Message, NameSet, Stage, StageContext};
use crate::error::CssModResult;
use crate::stylesheet::Stylesheet;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn match_comma() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\s*,\s*").expect("Hardcoded regex pattern is valid")
    })
}

pub struct UsedKeyframes;

impl Stage for UsedKeyframes {
    fn name(&self) -> &str {
        "used-keyframes"
    }

    fn run(&self, sheet: &mut Stylesheet, ctx: &mut StageContext<'_>) -> CssModResult<Completion> {
        let mut keyframes: HashSet<String> = HashSet::new();
        sheet.walk_at_rules("keyframes", |at| {
            if !at.params.is_empty() {
                keyframes.insert(at.params.clone());
            }
        });

        if keyframes.is_empty() {
            return Ok(Completion::Done);
        }

        let mut used = NameSet::default();
        sheet.walk_decls("animation-name", |decl| {
            for name in match_comma().split(&decl.value) {
                if keyframes.contains(name) {
                    used.insert(name);
                }
            }
        });
        sheet.walk_decls("animation", |decl| {
            for group in match_comma().split(&decl.value) {
                for token in group.split_whitespace() {
                    if keyframes.contains(token) {
                        used.insert(token);
                    }
                }
            }
        });

        if !used.is_empty() {
            ctx.messages
                .push(Message::UsedKeyframes(used.iter().map(str::to_string).collect()));
        }
        Ok(Completion::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Scope;
    use crate::stylesheet::parse_stylesheet;
    use std::path::Path;

    fn used(css: &str) -> Vec<String> {
        let path = Path::new("/kf.css");
        let mut sheet = parse_stylesheet(css, path).unwrap();
        let mut ctx = StageContext::new(path, Scope::Local);
        UsedKeyframes.run(&mut sheet, &mut ctx).unwrap();
        match ctx.messages.as_slice() {
            [Message::UsedKeyframes(names)] => names.clone(),
            [] => Vec::new(),
            other => panic!("unexpected messages {:?}", other),
        }
    }

    #[test]
    fn test_no_keyframes() {
        assert!(used(".a { animation: spin 1s; }").is_empty());
    }

    #[test]
    fn test_declared_but_unused() {
        assert!(used("@keyframes spin {} .a { color: red; }").is_empty());
    }

    #[test]
    fn test_animation_shorthand() {
        assert_eq!(
            used("@keyframes spin {} .box { animation: spin 2s linear; }"),
            vec!["spin"]
        );
    }

    #[test]
    fn test_animation_name_list() {
        let css = "@keyframes a {} @keyframes b {} @keyframes c {} .x { animation-name: b , a; }";
        assert_eq!(used(css), vec!["b", "a"]);
    }

    #[test]
    fn test_shorthand_groups() {
        let css = "@keyframes fade {} @keyframes grow {} .x { animation: fade 1s, 2s ease grow; }";
        assert_eq!(used(css), vec!["fade", "grow"]);
    }

    #[test]
    fn test_partial_token_does_not_match() {
        assert!(used("@keyframes spin {} .x { animation: spinner 1s; }").is_empty());
    }
}
