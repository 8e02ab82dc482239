//! Stylesheet syntax tree.
//!
//! A small, postcss-shaped tree: rules carry a raw selector, at-rules a name
//! plus raw params, declarations a property plus raw value. Comments are not
//! kept. The processor stages rewrite these strings in place; nothing here
//! knows about CSS Modules.

mod parser;

pub use parser::parse_stylesheet;

/// A parsed stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Rule(Rule),
    AtRule(AtRule),
    Decl(Decl),
}

/// `selector { ... }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selector: String,
    pub nodes: Vec<Node>,
}

/// `@name params;` or `@name params { ... }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    /// `None` for statement at-rules (`@value x: 1;`), `Some` for block at-rules.
    pub nodes: Option<Vec<Node>>,
}

/// `prop: value [!important]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub prop: String,
    pub value: String,
    pub important: bool,
}

impl Node {
    /// Child nodes of a container node.
    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Rule(rule) => Some(&rule.nodes),
            Node::AtRule(at) => at.nodes.as_deref(),
            Node::Decl(_) => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Rule(rule) => Some(&mut rule.nodes),
            Node::AtRule(at) => at.nodes.as_mut(),
            Node::Decl(_) => None,
        }
    }
}

impl Stylesheet {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Pre-order walk over every node.
    pub fn walk<F: FnMut(&Node)>(&self, mut f: F) {
        walk_nodes(&self.nodes, &mut f);
    }

    /// Pre-order mutable walk over every node.
    pub fn walk_mut<F: FnMut(&mut Node)>(&mut self, mut f: F) {
        walk_nodes_mut(&mut self.nodes, &mut f);
    }

    pub fn walk_rules<F: FnMut(&Rule)>(&self, mut f: F) {
        self.walk(|node| {
            if let Node::Rule(rule) = node {
                f(rule);
            }
        });
    }

    /// Visit every declaration whose property equals `prop` (ASCII case-insensitive).
    pub fn walk_decls<F: FnMut(&Decl)>(&self, prop: &str, mut f: F) {
        self.walk(|node| {
            if let Node::Decl(decl) = node {
                if decl.prop.eq_ignore_ascii_case(prop) {
                    f(decl);
                }
            }
        });
    }

    /// Visit every at-rule named `name` (ASCII case-insensitive).
    pub fn walk_at_rules<F: FnMut(&AtRule)>(&self, name: &str, mut f: F) {
        self.walk(|node| {
            if let Node::AtRule(at) = node {
                if at.name.eq_ignore_ascii_case(name) {
                    f(at);
                }
            }
        });
    }

    /// Remove every node (at any depth) for which `keep` returns false.
    pub fn retain<F: FnMut(&Node) -> bool>(&mut self, mut keep: F) {
        retain_nodes(&mut self.nodes, &mut keep);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn walk_nodes<F: FnMut(&Node)>(nodes: &[Node], f: &mut F) {
    for node in nodes {
        f(node);
        if let Some(children) = node.children() {
            walk_nodes(children, f);
        }
    }
}

fn walk_nodes_mut<F: FnMut(&mut Node)>(nodes: &mut [Node], f: &mut F) {
    for node in nodes.iter_mut() {
        f(node);
        if let Some(children) = node.children_mut() {
            walk_nodes_mut(children, f);
        }
    }
}

fn retain_nodes<F: FnMut(&Node) -> bool>(nodes: &mut Vec<Node>, keep: &mut F) {
    nodes.retain(|node| keep(node));
    for node in nodes.iter_mut() {
        if let Some(children) = node.children_mut() {
            retain_nodes(children, keep);
        }
    }
}
