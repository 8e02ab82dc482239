//! `no-unused-class`: every class a stylesheet exports must be referenced by
//! the file importing it.
//!
//! Tracking is per resolved stylesheet path. The first import of a path
//! seeds the unused set from the export keys and subtracts what the stylesheet
//! consumes itself; later imports of the same path only subtract their named
//! bindings. Findings are reported on the first import node at program exit.

use super::{Reporter, RuleListener};
use crate::cache::{ProcessedImport, ProcessedMemberAccess, ResolutionCache};
use crate::extract::ExtractionResult;
use crate::host::Span;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

pub const RULE_NAME: &str = "no-unused-class";

const MESSAGES: &[(&str, &str)] = &[
    ("unusedClassName", "Class {classNames} is exported but unused."),
    ("unusedClassNames", "Classes {classNames} are exported but unused."),
];

/// `a`, `a and b`, `a, b, and c`.
pub fn join_class_names(classes: &[&str]) -> String {
    match classes {
        [] => String::new(),
        [one] => one.to_string(),
        [a, b] => format!("{} and {}", a, b),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

#[derive(Debug)]
struct TrackedStylesheet {
    import_span: Span,
    /// Export keys in export order.
    keys: Vec<String>,
    unused: HashSet<String>,
}

impl TrackedStylesheet {
    fn new(import_span: Span, result: &ExtractionResult) -> Self {
        let keys: Vec<String> = result.exported_classes.keys().map(str::to_string).collect();
        let mut unused: HashSet<String> = keys.iter().cloned().collect();
        for used in &result.used_classes {
            unused.remove(used);
        }
        Self {
            import_span,
            keys,
            unused,
        }
    }

    /// Marks `name` and every class its export resolves to as used.
    fn consume(&mut self, name: &str, result: &ExtractionResult) {
        if let Some(classes) = result.exported_classes.get(name) {
            for class in classes {
                self.unused.remove(class);
            }
        }
        self.unused.remove(name);
    }

    fn remaining(&self) -> Vec<&str> {
        self.keys
            .iter()
            .filter(|k| self.unused.contains(*k))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct NoUnusedClass {
    order: Vec<PathBuf>,
    tracked: HashMap<PathBuf, TrackedStylesheet>,
}

impl RuleListener for NoUnusedClass {
    fn name(&self) -> &'static str {
        RULE_NAME
    }

    fn messages(&self) -> &'static [(&'static str, &'static str)] {
        MESSAGES
    }

    fn on_program(&mut self, cache: &mut ResolutionCache) {
        // Long-lived hosts keep the cache across runs; edits must be seen.
        cache.reset();
        self.order.clear();
        self.tracked.clear();
    }

    fn on_import(&mut self, import: &ProcessedImport, _reporter: &mut Reporter<'_>) {
        if !self.tracked.contains_key(&import.resolved_path) {
            self.order.push(import.resolved_path.clone());
            self.tracked.insert(
                import.resolved_path.clone(),
                TrackedStylesheet::new(import.span, &import.result),
            );
        }
        let Some(tracked) = self.tracked.get_mut(&import.resolved_path) else {
            return;
        };
        for binding in &import.explicit_bindings {
            tracked.consume(&binding.imported, &import.result);
        }
    }

    fn on_member(&mut self, access: &ProcessedMemberAccess, _reporter: &mut Reporter<'_>) {
        if let Some(tracked) = self.tracked.get_mut(&access.resolved_path) {
            tracked.consume(&access.class_name, &access.result);
        }
    }

    fn on_program_exit(&mut self, reporter: &mut Reporter<'_>) {
        for path in &self.order {
            let Some(tracked) = self.tracked.get(path) else {
                continue;
            };
            let remaining = tracked.remaining();
            if remaining.is_empty() {
                continue;
            }
            let message_id = if remaining.len() == 1 {
                "unusedClassName"
            } else {
                "unusedClassNames"
            };
            let class_names = join_class_names(&remaining);
            reporter.report(
                message_id,
                tracked.import_span,
                &[("classNames", class_names.as_str())],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostNode, ImportDeclaration, ImportSpecifier, MemberExpression};
    use crate::rules::{lint_nodes, RuleEntry, Severity};
    use crate::settings::Settings;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn create_temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("cssmod_unused_test").join(format!(
            "{}_{}_{}",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn import(source: &str, named: &[&str]) -> HostNode {
        let mut specifiers = vec![ImportSpecifier::Default {
            local: "styles".into(),
            span: Span::default(),
        }];
        for name in named {
            specifiers.push(ImportSpecifier::Named {
                imported: name.to_string(),
                local: name.to_string(),
                span: Span::default(),
            });
        }
        ImportDeclaration::new(source, specifiers)
            .at(Span::new(1, 1))
            .into()
    }

    fn messages(dir: &Path, nodes: &[HostNode]) -> Vec<String> {
        let mut cache = ResolutionCache::new(Settings::new(&dir.join("App.js")));
        let mut rules = vec![RuleEntry::new(Severity::Warn, NoUnusedClass::default())];
        lint_nodes(&mut cache, &mut rules, nodes)
            .unwrap()
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    #[test]
    fn test_join_class_names() {
        assert_eq!(join_class_names(&["class"]), "class");
        assert_eq!(join_class_names(&["class1", "class2"]), "class1 and class2");
        assert_eq!(
            join_class_names(&["class1", "class2", "class3"]),
            "class1, class2, and class3"
        );
    }

    #[test]
    fn test_all_used_is_clean() {
        let dir = create_temp_dir("clean");
        fs::write(dir.join("a.css"), ".title {} .body {}").unwrap();
        let nodes = vec![
            import("./a.css", &["body"]),
            MemberExpression::dot("styles", "title").into(),
        ];
        assert!(messages(&dir, &nodes).is_empty());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_single_and_multiple_unused() {
        let dir = create_temp_dir("unused");
        fs::write(dir.join("one.css"), ".used {} .lonely {}").unwrap();
        fs::write(dir.join("many.css"), ".a {} .b {} .c {}").unwrap();
        let nodes = vec![
            import("./one.css", &["used"]),
            import("./many.css", &[]),
        ];
        assert_eq!(
            messages(&dir, &nodes),
            vec![
                "Class lonely is exported but unused.".to_string(),
                "Classes a, b, and c are exported but unused.".to_string(),
            ]
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_composed_classes_count_as_used() {
        let dir = create_temp_dir("composes");
        fs::write(dir.join("a.css"), ".base {} .button { composes: base; }").unwrap();
        let nodes = vec![
            import("./a.css", &[]),
            MemberExpression::dot("styles", "button").into(),
        ];
        assert!(messages(&dir, &nodes).is_empty());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_self_consumed_names_are_not_reported() {
        let dir = create_temp_dir("self");
        fs::write(
            dir.join("a.css"),
            "@keyframes spin {} .box { animation: spin 1s; }",
        )
        .unwrap();
        let nodes = vec![
            import("./a.css", &[]),
            MemberExpression::dot("styles", "box").into(),
        ];
        assert!(messages(&dir, &nodes).is_empty());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_repeated_import_reports_once() {
        let dir = create_temp_dir("repeat");
        fs::write(dir.join("a.css"), ".x {} .y {} .z {}").unwrap();
        let nodes = vec![import("./a.css", &["x"]), import("./a.css", &["y"])];
        assert_eq!(
            messages(&dir, &nodes),
            vec!["Class z is exported but unused.".to_string()]
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_program_start_sees_edits() {
        let dir = create_temp_dir("edits");
        let file = dir.join("a.css");
        fs::write(&file, ".x {}").unwrap();

        let mut cache = ResolutionCache::new(Settings::new(&dir.join("App.js")));
        let mut rules = vec![RuleEntry::new(Severity::Warn, NoUnusedClass::default())];
        let nodes = vec![import("./a.css", &["x"])];
        assert!(lint_nodes(&mut cache, &mut rules, &nodes).unwrap().is_empty());

        fs::write(&file, ".x {} .y {}").unwrap();
        let second = lint_nodes(&mut cache, &mut rules, &nodes).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].data.get("classNames").map(String::as_str), Some("y"));
        assert_eq!(second[0].span, Span::new(1, 1));
        assert_eq!(cache.stats().misses, 2);

        fs::remove_dir_all(&dir).ok();
    }
}
