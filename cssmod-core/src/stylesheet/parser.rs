//! Stylesheet parser on top of `cssparser`.
//!
//! Rules, at-rules and declarations come from `cssparser`'s rule-body parser
//! and are mapped onto the postcss-shaped tree with their preludes kept as raw
//! source text (comments replaced by a space). The tokenizer recovers from
//! malformed input silently, so a structural pass runs first and rejects
//! unclosed blocks, strings and comments.

use std::path::Path;

use cssparser::{
    AtRuleParser, BasicParseErrorKind, CowRcStr, DeclarationParser, ParseError, ParseErrorKind,
    Parser, ParserInput, ParserState, QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
    SourceLocation, Token,
};

use super::{AtRule, Decl, Node, Rule, Stylesheet};
use crate::error::{CssModError, CssModResult};

type SyntaxError<'i> = ParseError<'i, String>;

/// Parse stylesheet source into a [`Stylesheet`].
///
/// `path` is only used for error reporting.
pub fn parse_stylesheet(source: &str, path: &Path) -> CssModResult<Stylesheet> {
    {
        let mut input = ParserInput::new(source);
        let mut parser = Parser::new(&mut input);
        check_structure(&mut parser, source).map_err(|e| located(path, e))?;
    }

    let mut input = ParserInput::new(source);
    let mut parser = Parser::new(&mut input);
    let nodes = parse_body(&mut parser).map_err(|e| located(path, e))?;
    Ok(Stylesheet::new(nodes))
}

fn located(path: &Path, err: SyntaxError<'_>) -> CssModError {
    let message = match err.kind {
        ParseErrorKind::Custom(message) => message,
        ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => "Unexpected end of input".into(),
        ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(token)) => {
            format!("Unexpected token {:?}", token)
        }
        ParseErrorKind::Basic(_) => "Invalid syntax".into(),
    };
    CssModError::parse_at(
        path,
        message,
        err.location.line as usize + 1,
        err.location.column as usize,
    )
}

fn error_at<'i>(location: SourceLocation, message: &str) -> SyntaxError<'i> {
    ParseError {
        kind: ParseErrorKind::Custom(message.to_string()),
        location,
    }
}

/// `"..."` or `'...'` with an unescaped closing quote.
fn is_terminated_string(raw: &str) -> bool {
    let Some(quote) = raw.chars().next() else {
        return false;
    };
    if raw.len() < 2 || !raw.ends_with(quote) {
        return false;
    }
    let body = &raw[..raw.len() - quote.len_utf8()];
    let escapes = body.chars().rev().take_while(|&c| c == '\\').count();
    escapes % 2 == 0
}

/// Walks every token, descending into blocks, and rejects what the
/// tokenizer would otherwise recover from.
fn check_structure<'i>(input: &mut Parser<'i, '_>, source: &'i str) -> Result<(), SyntaxError<'i>> {
    loop {
        let location = input.current_source_location();
        let start = input.position();
        let token = match input.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(()),
        };

        let (closer, unclosed) = match token {
            Token::Comment(_) => {
                let raw = input.slice_from(start);
                if raw.len() < 4 || !raw.ends_with("*/") {
                    return Err(error_at(location, "Unclosed comment"));
                }
                continue;
            }
            Token::QuotedString(_) if !is_terminated_string(input.slice_from(start)) => {
                return Err(error_at(location, "Unclosed string"));
            }
            Token::BadString(_) => return Err(error_at(location, "Unclosed string")),
            Token::CloseCurlyBracket => return Err(error_at(location, "Unexpected }")),
            Token::CurlyBracketBlock => ('}', "Unclosed block"),
            Token::SquareBracketBlock => (']', "Unclosed bracket"),
            Token::ParenthesisBlock | Token::Function(_) => (')', "Missing closing parenthesis"),
            _ => continue,
        };

        input.parse_nested_block(|nested| {
            check_structure(nested, source)?;
            let end = nested.position().byte_index();
            if source[end..].starts_with(closer) {
                Ok(())
            } else {
                Err(error_at(location, unclosed))
            }
        })?;
    }
}

/// Source text of the remaining tokens with comments replaced by a space.
///
/// A `{}` block fails the parse unless `allow_blocks` is set, which lets a
/// `name: value {...}` prelude fall back from declaration to nested rule.
fn raw_text<'i>(input: &mut Parser<'i, '_>, allow_blocks: bool) -> Result<String, SyntaxError<'i>> {
    let mut out = String::new();
    loop {
        let start = input.position();
        let token = match input.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(out),
        };

        let closer = match token {
            Token::Comment(_) => {
                out.push(' ');
                continue;
            }
            Token::CurlyBracketBlock if !allow_blocks => {
                return Err(input.new_custom_error("Unexpected {".to_string()));
            }
            Token::CurlyBracketBlock => '}',
            Token::SquareBracketBlock => ']',
            Token::ParenthesisBlock | Token::Function(_) => ')',
            _ => {
                out.push_str(input.slice_from(start));
                continue;
            }
        };

        out.push_str(input.slice_from(start));
        let inner = input.parse_nested_block(|nested| raw_text(nested, true))?;
        out.push_str(&inner);
        out.push(closer);
    }
}

fn declaration(prop: &str, raw: &str) -> Decl {
    const IMPORTANT: &str = "!important";

    let mut value = raw.trim().to_string();
    let mut important = false;
    if value.to_ascii_lowercase().ends_with(IMPORTANT) {
        value.truncate(value.len() - IMPORTANT.len());
        value = value.trim_end().to_string();
        important = true;
    }

    Decl {
        prop: prop.to_string(),
        value,
        important,
    }
}

/// Builds nodes for every item of a rule body (or the whole sheet).
struct NodeParser;

impl<'i> DeclarationParser<'i> for NodeParser {
    type Declaration = Node;
    type Error = String;

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Node, SyntaxError<'i>> {
        let raw = raw_text(input, false)?;
        Ok(Node::Decl(declaration(&name, &raw)))
    }
}

impl<'i> QualifiedRuleParser<'i> for NodeParser {
    type Prelude = String;
    type QualifiedRule = Node;
    type Error = String;

    fn parse_prelude<'t>(&mut self, input: &mut Parser<'i, 't>) -> Result<String, SyntaxError<'i>> {
        Ok(raw_text(input, false)?.trim().to_string())
    }

    fn parse_block<'t>(
        &mut self,
        selector: String,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Node, SyntaxError<'i>> {
        Ok(Node::Rule(Rule {
            selector,
            nodes: parse_body(input)?,
        }))
    }
}

impl<'i> AtRuleParser<'i> for NodeParser {
    /// Name and raw params.
    type Prelude = (String, String);
    type AtRule = Node;
    type Error = String;

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, SyntaxError<'i>> {
        let params = raw_text(input, false)?;
        Ok((name.to_string(), params.trim().to_string()))
    }

    fn rule_without_block(
        &mut self,
        (name, params): Self::Prelude,
        _start: &ParserState,
    ) -> Result<Node, ()> {
        Ok(Node::AtRule(AtRule {
            name,
            params,
            nodes: None,
        }))
    }

    fn parse_block<'t>(
        &mut self,
        (name, params): Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Node, SyntaxError<'i>> {
        Ok(Node::AtRule(AtRule {
            name,
            params,
            nodes: Some(parse_body(input)?),
        }))
    }
}

impl<'i> RuleBodyItemParser<'i, Node, String> for NodeParser {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        true
    }
}

fn parse_body<'i>(input: &mut Parser<'i, '_>) -> Result<Vec<Node>, SyntaxError<'i>> {
    let mut parser = NodeParser;
    let mut nodes = Vec::new();
    for item in RuleBodyParser::new(input, &mut parser) {
        match item {
            Ok(node) => nodes.push(node),
            Err((err, _)) if matches!(err.kind, ParseErrorKind::Custom(_)) => return Err(err),
            Err((err, slice)) => {
                let word = slice.split_whitespace().next().unwrap_or(slice);
                let word = word.split(':').next().unwrap_or(word);
                return Err(error_at(err.location, &format!("Unknown word {}", word)));
            }
        }
    }
    Ok(nodes)
}
