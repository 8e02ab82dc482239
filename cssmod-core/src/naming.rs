//! Class name normalization per the configured camelCase mode.
//!
//! Export keys are reported in normalized form; composed class sequences
//! always keep the raw stylesheet identifiers.

use crate::settings::CamelCaseMode;
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn separator_run_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"[_.\- ]+([\p{Alphabetic}\p{N}_]|$)")
            .expect("Hardcoded regex pattern is valid")
    })
}

fn digit_run_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\d+([\p{Alphabetic}\p{N}_]|$)").expect("Hardcoded regex pattern is valid")
    })
}

fn leading_separators_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[_.\- ]+").expect("Hardcoded regex pattern is valid")
    })
}

fn dash_run_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"-+([0-9A-Za-z_])").expect("Hardcoded regex pattern is valid")
    })
}

/// Returns the name(s) under which `raw` is reported.
///
/// Two-name modes return the raw name first.
pub fn normalize(raw: &str, mode: CamelCaseMode) -> Vec<String> {
    match mode {
        CamelCaseMode::Off | CamelCaseMode::AsIs => vec![raw.to_string()],
        CamelCaseMode::CamelCase => vec![raw.to_string(), camel_case(raw)],
        CamelCaseMode::CamelCaseOnly | CamelCaseMode::Only => vec![camel_case(raw)],
        CamelCaseMode::Dashes => vec![raw.to_string(), dashes_to_camel(raw)],
        CamelCaseMode::DashesOnly => vec![dashes_to_camel(raw)],
    }
}

/// Converts only `-` runs: `foo--bar_baz` becomes `fooBar_baz`.
pub fn dashes_to_camel(name: &str) -> String {
    dash_run_regex()
        .replace_all(name, |caps: &Captures| caps[1].to_uppercase())
        .into_owned()
}

/// Unicode-aware camelCase treating `_`, `-`, `.` and spaces as separators.
///
/// Existing case boundaries are kept: `fooBar` stays `fooBar`,
/// `XMLHttp` becomes `xmlHttp`.
pub fn camel_case(name: &str) -> String {
    let input = name.trim();
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (None, _) => return String::new(),
        (Some(_), None) => return input.to_lowercase(),
        _ => {}
    }

    let split = if input != input.to_lowercase() {
        preserve_case_boundaries(input)
    } else {
        input.to_string()
    };
    let trimmed = leading_separators_regex().replace(&split, "");
    let lowered = trimmed.to_lowercase();

    let joined = separator_run_regex()
        .replace_all(&lowered, |caps: &Captures| caps[1].to_uppercase());
    digit_run_regex()
        .replace_all(&joined, |caps: &Captures| caps[0].to_uppercase())
        .into_owned()
}

fn is_lower(c: char) -> bool {
    c.is_lowercase() && c.to_uppercase().ne(std::iter::once(c))
}

fn is_upper(c: char) -> bool {
    c.is_uppercase() && c.to_lowercase().ne(std::iter::once(c))
}

/// Inserts `-` at lower→upper transitions and before the last capital of an
/// acronym that is followed by a lowercase letter.
fn preserve_case_boundaries(input: &str) -> String {
    let mut out: Vec<char> = Vec::with_capacity(input.len() + 4);
    let mut last_lower = false;
    let mut last_upper = false;
    let mut last_last_upper = false;

    for c in input.chars() {
        if last_lower && c.is_uppercase() {
            out.push('-');
            out.push(c);
            last_lower = false;
            last_last_upper = last_upper;
            last_upper = true;
        } else if last_upper && last_last_upper && c.is_lowercase() {
            let prev = out.pop();
            out.push('-');
            out.extend(prev);
            out.push(c);
            last_last_upper = last_upper;
            last_upper = false;
            last_lower = true;
        } else {
            out.push(c);
            last_lower = is_lower(c);
            last_last_upper = last_upper;
            last_upper = is_upper(c);
        }
    }

    out.into_iter().collect()
}
