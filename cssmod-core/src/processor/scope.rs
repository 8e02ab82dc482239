//! Local/global scoping of selectors, keyframes and animation names.
//!
//! Names are never mangled: a local class keeps its name, the stage only
//! records it in [`StageContext::locals`] and strips `:local`/`:global`
//! markers from the tree.

use super::{Completion, NameSet, Stage, StageContext};
use crate::error::{CssModError, CssModResult};
use crate::settings;
use crate::stylesheet::{Decl, Node, Stylesheet};
use cssparser::{ParseError, ParseErrorKind, Parser, ParserInput, Token};
use std::path::Path;

/// Keywords of the `animation` shorthand that never name a keyframe.
const ANIMATION_KEYWORDS: &[&str] = &[
    "normal",
    "reverse",
    "alternate",
    "alternate-reverse",
    "forwards",
    "backwards",
    "both",
    "infinite",
    "paused",
    "running",
    "ease",
    "ease-in",
    "ease-out",
    "ease-in-out",
    "linear",
    "step-end",
    "step-start",
];

/// Keywords valid for every property, plus `none` for `animation-name`.
const GLOBAL_KEYWORDS: &[&str] = &["none", "initial", "inherit", "unset", "revert", "revert-layer"];

const PURE_HINT: &str = "pure selectors must contain at least one local class or id";
const COMPOSES_SELECTOR: &str =
    "composition is only allowed when selector is single :local class name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Local,
    Global,
}

pub struct Scoping;

impl Stage for Scoping {
    fn name(&self) -> &str {
        "scope"
    }

    fn run(&self, sheet: &mut Stylesheet, ctx: &mut StageContext<'_>) -> CssModResult<Completion> {
        let mut state = ScopeState {
            path: ctx.path,
            mode: match ctx.default_scope {
                settings::Scope::Global => Mode::Global,
                settings::Scope::Local | settings::Scope::Pure => Mode::Local,
            },
            pure: ctx.default_scope == settings::Scope::Pure,
            locals: &mut ctx.locals,
        };
        scope_nodes(&mut sheet.nodes, &mut state, false)?;
        Ok(Completion::Done)
    }
}

struct ScopeState<'a> {
    path: &'a Path,
    mode: Mode,
    pure: bool,
    locals: &'a mut NameSet,
}

fn is_keyframes(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with("keyframes")
}

fn is_icss_block(selector: &str) -> bool {
    selector.starts_with(":import") || selector == ":export"
}

pub(crate) fn is_composes(decl: &Decl) -> bool {
    decl.prop.eq_ignore_ascii_case("composes") || decl.prop.eq_ignore_ascii_case("compose-with")
}

fn scope_nodes(
    nodes: &mut [Node],
    state: &mut ScopeState<'_>,
    in_keyframes: bool,
) -> CssModResult<()> {
    for node in nodes.iter_mut() {
        match node {
            Node::Rule(rule) => {
                if in_keyframes || is_icss_block(&rule.selector) {
                    scope_nodes(&mut rule.nodes, state, in_keyframes)?;
                    continue;
                }

                let scoped = scope_selector(&rule.selector, state.mode)
                    .map_err(|message| CssModError::scope(state.path, message))?;

                if state.pure {
                    if let Some(part) = scoped.parts.iter().find(|p| !p.has_local) {
                        return Err(CssModError::scope(
                            state.path,
                            format!("Selector \"{}\" is not pure ({})", part.text, PURE_HINT),
                        ));
                    }
                }

                let composes = rule
                    .nodes
                    .iter()
                    .any(|n| matches!(n, Node::Decl(d) if is_composes(d)));
                if composes && !scoped.parts.iter().all(SelectorPart::is_single_local_class) {
                    return Err(CssModError::composition(
                        state.path,
                        format!("{} not in \"{}\"", COMPOSES_SELECTOR, rule.selector),
                    ));
                }

                for part in &scoped.parts {
                    for name in &part.locals {
                        state.locals.insert(name);
                    }
                }
                rule.selector = scoped.text;

                let decl_mode = scoped.final_mode;
                for child in rule.nodes.iter_mut() {
                    if let Node::Decl(decl) = child {
                        if decl_mode == Mode::Local {
                            localize_animation(decl, state.locals);
                        }
                    }
                }
                scope_nodes(&mut rule.nodes, state, false)?;
            }
            Node::AtRule(at) if is_keyframes(&at.name) => {
                let (name, mode) = unwrap_scope_marker(at.params.trim(), state.mode);
                if mode == Mode::Local && !name.is_empty() {
                    state.locals.insert(&name);
                }
                at.params = name;
                if let Some(children) = at.nodes.as_mut() {
                    scope_nodes(children, state, true)?;
                }
            }
            Node::AtRule(at) => {
                if let Some(children) = at.nodes.as_mut() {
                    scope_nodes(children, state, in_keyframes)?;
                }
            }
            Node::Decl(_) => {}
        }
    }
    Ok(())
}

/// `:global(x)` → (`x`, Global), `:local(x)` → (`x`, Local), else the default.
fn unwrap_scope_marker(params: &str, default: Mode) -> (String, Mode) {
    for (marker, mode) in [(":global(", Mode::Global), (":local(", Mode::Local)] {
        if let Some(inner) = params.strip_prefix(marker).and_then(|r| r.strip_suffix(')')) {
            return (inner.trim().to_string(), mode);
        }
    }
    (params.to_string(), default)
}

/// Records keyframe names referenced by `animation`/`animation-name` as local.
fn localize_animation(decl: &Decl, locals: &mut NameSet) {
    let shorthand = decl.prop.eq_ignore_ascii_case("animation");
    if !shorthand && !decl.prop.eq_ignore_ascii_case("animation-name") {
        return;
    }

    for name in value_identifiers(&decl.value) {
        let lower = name.to_ascii_lowercase();
        let keyword = GLOBAL_KEYWORDS.contains(&lower.as_str())
            || (shorthand && ANIMATION_KEYWORDS.contains(&lower.as_str()));
        if !keyword {
            locals.insert(&name);
        }
    }
}

/// Identifiers of a value at the top level; function arguments, strings,
/// numbers and custom properties are skipped.
fn value_identifiers(value: &str) -> Vec<String> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut names = Vec::new();
    while let Ok(token) = parser.next() {
        if let Token::Ident(name) = token {
            if !name.starts_with("--") {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// One comma-separated part of a scoped selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SelectorPart {
    text: String,
    /// Local class and id names, unescaped, in order.
    locals: Vec<String>,
    /// Local class names only.
    local_classes: Vec<String>,
    has_local: bool,
    /// Simple selectors and combinators, scope markers excluded.
    components: usize,
}

impl SelectorPart {
    fn is_single_local_class(&self) -> bool {
        self.local_classes.len() == 1 && self.components == 1
    }

    fn record(&mut self, name: String, mode: Mode, class: bool) {
        if mode != Mode::Local {
            return;
        }
        self.has_local = true;
        self.locals.push(name.clone());
        if class {
            self.local_classes.push(name);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ScopedSelector {
    text: String,
    parts: Vec<SelectorPart>,
    /// Mode in effect at the end of the last part; governs declarations.
    final_mode: Mode,
}

type SelectorError<'i> = ParseError<'i, String>;

fn scope_selector(selector: &str, default: Mode) -> Result<ScopedSelector, String> {
    let mut input = ParserInput::new(selector);
    let mut parser = Parser::new(&mut input);
    let scoped = parser
        .parse_comma_separated(|input| {
            let mut part = SelectorPart::default();
            let mut out = String::new();
            scope_compound(input, default, &mut out, &mut part).map(|mode| {
                part.text = out.trim().to_string();
                (part, mode)
            })
        })
        .map_err(|e| {
            let message = match e.kind {
                ParseErrorKind::Custom(message) => message,
                ParseErrorKind::Basic(_) => "Invalid selector".to_string(),
            };
            format!("{} in \"{}\"", message, selector)
        })?;

    let final_mode = scoped.last().map_or(default, |(_, mode)| *mode);
    let parts: Vec<SelectorPart> = scoped.into_iter().map(|(part, _)| part).collect();
    let text = parts
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Ok(ScopedSelector {
        text,
        parts,
        final_mode,
    })
}

/// The class of every part when each is a single local class selector.
pub(crate) fn single_classes(selector: &str) -> Option<Vec<String>> {
    let scoped = scope_selector(selector, Mode::Local).ok()?;
    scoped
        .parts
        .into_iter()
        .map(|part| {
            if part.is_single_local_class() {
                part.local_classes.into_iter().next()
            } else {
                None
            }
        })
        .collect()
}

fn scope_marker(name: &str) -> Option<Mode> {
    if name.eq_ignore_ascii_case("local") {
        Some(Mode::Local)
    } else if name.eq_ignore_ascii_case("global") {
        Some(Mode::Global)
    } else {
        None
    }
}

fn next_ident(input: &mut Parser<'_, '_>) -> Result<String, ()> {
    match input.next_including_whitespace() {
        Ok(Token::Ident(name)) => Ok(name.to_string()),
        _ => Err(()),
    }
}

/// Scopes the selector tokens of `input`, appending the result to `out`.
/// Returns the mode in effect after the last token.
fn scope_compound<'i>(
    input: &mut Parser<'i, '_>,
    mut mode: Mode,
    out: &mut String,
    part: &mut SelectorPart,
) -> Result<Mode, SelectorError<'i>> {
    loop {
        let start = input.position();
        let token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(mode),
        };

        match token {
            Token::WhiteSpace(_) => out.push_str(input.slice_from(start)),
            Token::Delim('.') => {
                part.components += 1;
                let class = input.try_parse(next_ident);
                out.push_str(input.slice_from(start));
                if let Ok(name) = class {
                    part.record(name, mode, true);
                }
            }
            Token::IDHash(name) => {
                part.components += 1;
                out.push_str(input.slice_from(start));
                part.record(name.to_string(), mode, false);
            }
            Token::Colon => {
                let state = input.state();
                let marker = match input.next_including_whitespace() {
                    Ok(Token::Ident(name)) => scope_marker(name).map(|m| (m, false)),
                    Ok(Token::Function(name)) => scope_marker(name).map(|m| (m, true)),
                    _ => None,
                };
                match marker {
                    Some((inner, true)) => {
                        input.parse_nested_block(|nested| {
                            scope_compound(nested, inner, out, part)
                        })?;
                        if !input.slice_from(start).ends_with(')') {
                            let name = if inner == Mode::Local { "local" } else { "global" };
                            return Err(input.new_custom_error(format!(
                                "Missing closing parenthesis after :{}",
                                name
                            )));
                        }
                    }
                    Some((new_mode, false)) => {
                        mode = new_mode;
                        if out.is_empty() || out.ends_with(char::is_whitespace) {
                            input.skip_whitespace();
                        }
                    }
                    None => {
                        input.reset(&state);
                        part.components += 1;
                        out.push(':');
                    }
                }
            }
            Token::Function(_) | Token::ParenthesisBlock => {
                part.components += 1;
                out.push_str(input.slice_from(start));
                input.parse_nested_block(|nested| scope_compound(nested, mode, out, part))?;
                if !input.slice_from(start).ends_with(')') {
                    return Err(input.new_custom_error("Missing closing parenthesis".to_string()));
                }
                out.push(')');
            }
            Token::SquareBracketBlock => {
                part.components += 1;
                input.parse_nested_block(|nested| {
                    while nested.next_including_whitespace_and_comments().is_ok() {}
                    Ok::<_, SelectorError<'i>>(())
                })?;
                out.push_str(input.slice_from(start));
            }
            _ => {
                part.components += 1;
                out.push_str(input.slice_from(start));
            }
        }
    }
}
