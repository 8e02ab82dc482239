//! Builds the export relation: every local name maps to itself followed by
//! the classes it composes.
//!
//! Local composition is resolved across the whole file (forward references
//! allowed) and transitively; imported and global targets are appended under
//! their raw names. Sequences never repeat a name, so cycles terminate.

use super::scope::{is_composes, single_classes};
use super::{Completion, Stage, StageContext};
use crate::error::{CssModError, CssModResult};
use crate::stylesheet::{Node, Stylesheet};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

/// `a b from "file"` / `a from 'file'` / `a from global`
fn match_from() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"^([0-9A-Za-z_\s,-]+?)\s+from\s+(?:"([^"]+)"|'([^']+)'|(global))$"#)
            .expect("Hardcoded regex pattern is valid")
    })
}

/// `global(a)`
fn match_global() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^global\(([^)]+)\)$").expect("Hardcoded regex pattern is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// Class of this file, expanded transitively.
    Local(String),
    /// Imported or global class, kept as written.
    Raw(String),
}

fn split_names(list: &str) -> impl Iterator<Item = &str> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
}

fn parse_composes(value: &str) -> Vec<Target> {
    let value = value.trim();
    if let Some(caps) = match_from().captures(value) {
        return split_names(caps.get(1).map_or("", |m| m.as_str()))
            .map(|name| Target::Raw(name.to_string()))
            .collect();
    }

    split_names(value)
        .map(|token| match match_global().captures(token) {
            Some(caps) => Target::Raw(caps[1].trim().to_string()),
            None => Target::Local(token.to_string()),
        })
        .collect()
}

/// Class → composed targets, in declaration order.
#[derive(Debug, Default)]
struct CompositionGraph {
    edges: HashMap<String, Vec<Target>>,
}

impl CompositionGraph {
    fn add(&mut self, class: &str, targets: &[Target]) {
        self.edges
            .entry(class.to_string())
            .or_default()
            .extend(targets.iter().cloned());
    }

    fn local_targets(&self) -> impl Iterator<Item = &str> {
        self.edges.values().flatten().filter_map(|t| match t {
            Target::Local(name) => Some(name.as_str()),
            Target::Raw(_) => None,
        })
    }

    /// Depth-first, first occurrence wins.
    fn expand(&self, root: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.visit(root, &mut out, &mut seen);
        out
    }

    fn visit(&self, class: &str, out: &mut Vec<String>, seen: &mut HashSet<String>) {
        if !seen.insert(class.to_string()) {
            return;
        }
        out.push(class.to_string());
        for target in self.edges.get(class).into_iter().flatten() {
            match target {
                Target::Local(name) => self.visit(name, out, seen),
                Target::Raw(name) => {
                    if seen.insert(name.clone()) {
                        out.push(name.clone());
                    }
                }
            }
        }
    }
}

/// Records and removes every `composes` declaration.
fn collect_compositions(
    nodes: &mut Vec<Node>,
    graph: &mut CompositionGraph,
    path: &Path,
) -> CssModResult<()> {
    for node in nodes.iter_mut() {
        if let Node::Rule(rule) = node {
            let targets: Vec<Target> = rule
                .nodes
                .iter()
                .filter_map(|n| match n {
                    Node::Decl(d) if is_composes(d) => Some(parse_composes(&d.value)),
                    _ => None,
                })
                .flatten()
                .collect();

            if !targets.is_empty() {
                let classes = single_classes(&rule.selector).ok_or_else(|| {
                    CssModError::composition(
                        path,
                        format!(
                            "composition target selector \"{}\" is not a class",
                            rule.selector
                        ),
                    )
                })?;
                for class in &classes {
                    graph.add(class, &targets);
                }
                rule.nodes
                    .retain(|n| !matches!(n, Node::Decl(d) if is_composes(d)));
            }
        }
        if let Some(children) = node.children_mut() {
            collect_compositions(children, graph, path)?;
        }
    }
    Ok(())
}

/// Removes top-level `:export` blocks, returning their declarations in order.
fn take_icss_exports(nodes: &mut Vec<Node>) -> Vec<(String, Vec<String>)> {
    let mut exports = Vec::new();
    nodes.retain(|node| match node {
        Node::Rule(rule) if rule.selector == ":export" => {
            for child in &rule.nodes {
                if let Node::Decl(decl) = child {
                    let classes = decl.value.split_whitespace().map(str::to_string).collect();
                    exports.push((decl.prop.clone(), classes));
                }
            }
            false
        }
        _ => true,
    });
    exports
}

pub struct Composes;

impl Stage for Composes {
    fn name(&self) -> &str {
        "composes"
    }

    fn run(&self, sheet: &mut Stylesheet, ctx: &mut StageContext<'_>) -> CssModResult<Completion> {
        let icss = take_icss_exports(&mut sheet.nodes);
        let mut graph = CompositionGraph::default();
        collect_compositions(&mut sheet.nodes, &mut graph, ctx.path)?;

        if let Some(missing) = graph.local_targets().find(|name| !ctx.locals.contains(name)) {
            return Err(CssModError::composition(
                ctx.path,
                format!("referenced class name \"{}\" in composes not found", missing),
            ));
        }

        // Hand-written `:export` entries precede generated ones.
        for (name, classes) in icss {
            ctx.exports.insert_first(name, classes);
        }
        for name in ctx.locals.iter() {
            ctx.exports.insert_first(name, graph.expand(name));
        }
        Ok(Completion::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::scope::Scoping;
    use crate::settings::Scope;
    use crate::stylesheet::parse_stylesheet;

    fn exports(css: &str) -> CssModResult<Vec<(String, Vec<String>)>> {
        let path = Path::new("/composes.css");
        let mut sheet = parse_stylesheet(css, path)?;
        let mut ctx = StageContext::new(path, Scope::Local);
        Scoping.run(&mut sheet, &mut ctx)?;
        Composes.run(&mut sheet, &mut ctx)?;
        Ok(ctx
            .exports
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect())
    }

    fn entry(key: &str, classes: &[&str]) -> (String, Vec<String>) {
        (key.to_string(), classes.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_plain_classes() {
        assert_eq!(
            exports(".a {} .b {}").unwrap(),
            vec![entry("a", &["a"]), entry("b", &["b"])]
        );
    }

    #[test]
    fn test_local_composition() {
        assert_eq!(
            exports(".a { composes: b; } .b { color: red; }").unwrap(),
            vec![entry("a", &["a", "b"]), entry("b", &["b"])]
        );
    }

    #[test]
    fn test_transitive_and_deduplicated() {
        let css = ".a { composes: b c; } .b { composes: c; } .c { color: red; }";
        assert_eq!(exports(css).unwrap()[0], entry("a", &["a", "b", "c"]));
    }

    #[test]
    fn test_cycle_terminates() {
        let css = ".a { composes: b; } .b { composes: a; }";
        assert_eq!(
            exports(css).unwrap(),
            vec![entry("a", &["a", "b"]), entry("b", &["b", "a"])]
        );
    }

    #[test]
    fn test_imported_and_global_targets_are_raw() {
        let css = concat!(
            ".a { composes: x y from \"./other.css\"; ",
            "composes: z from global; composes: global(w); }"
        );
        assert_eq!(
            exports(css).unwrap(),
            vec![entry("a", &["a", "x", "y", "z", "w"])]
        );
    }

    #[test]
    fn test_comma_separated_targets() {
        let css = ".a { composes: b, c; } .b {} .c {}";
        assert_eq!(exports(css).unwrap()[0], entry("a", &["a", "b", "c"]));
    }

    #[test]
    fn test_unknown_local_target() {
        let err = exports(".a { composes: missing; }").unwrap_err();
        assert!(matches!(err, CssModError::Composition { .. }));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_composes_removed_from_tree() {
        let path = Path::new("/composes.css");
        let mut sheet = parse_stylesheet(".a { composes: b; color: red; } .b {}", path).unwrap();
        let mut ctx = StageContext::new(path, Scope::Local);
        Scoping.run(&mut sheet, &mut ctx).unwrap();
        Composes.run(&mut sheet, &mut ctx).unwrap();
        let mut props = Vec::new();
        sheet.walk_decls("composes", |d| props.push(d.prop.clone()));
        assert!(props.is_empty());
    }

    #[test]
    fn test_multiple_selectors_share_targets() {
        let css = ".a, .b { composes: c; } .c {}";
        assert_eq!(
            exports(css).unwrap(),
            vec![entry("a", &["a", "c"]), entry("b", &["b", "c"]), entry("c", &["c"])]
        );
    }

    #[test]
    fn test_escaped_class_composes() {
        let css = ".sm\\:flex { composes: base; } .base {}";
        assert_eq!(
            exports(css).unwrap(),
            vec![entry("sm:flex", &["sm:flex", "base"]), entry("base", &["base"])]
        );
    }

    #[test]
    fn test_explicit_export_block() {
        let css = ":export { primaryColor: red; a: x  y; } .a {}";
        assert_eq!(
            exports(css).unwrap(),
            vec![
                entry("primaryColor", &["red"]),
                entry("a", &["x", "y"]),
            ]
        );
    }

    #[test]
    fn test_export_block_removed_from_tree() {
        let path = Path::new("/composes.css");
        let mut sheet = parse_stylesheet(":export { k: v; } .a {}", path).unwrap();
        let mut ctx = StageContext::new(path, Scope::Local);
        Scoping.run(&mut sheet, &mut ctx).unwrap();
        Composes.run(&mut sheet, &mut ctx).unwrap();
        let mut selectors = Vec::new();
        sheet.walk_rules(|r| selectors.push(r.selector.clone()));
        assert_eq!(selectors, vec![".a"]);
    }
}
