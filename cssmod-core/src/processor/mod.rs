//! Stylesheet processor: a fixed, ordered pipeline of transform stages.
//!
//! Built-in stage order (each depends on the tree shape the previous leaves):
//!
//! 1. [`used_values::UsedValues`]: record `@value` names referenced elsewhere
//! 2. [`values::Values`]: substitute `@value` definitions, drop the statements
//! 3. [`scope::Scoping`]: classify selectors local/global, collect local names
//! 4. [`composes::Composes`]: build the export relation from `composes`
//! 5. [`used_keyframes::UsedKeyframes`]: record referenced `@keyframes`
//!
//! Stages may complete synchronously or hand back a [`Pending`] completion.
//! The processor first tries to drive everything directly; the first deferred
//! completion switches it (for the rest of its lifetime) to a blocking
//! strategy that waits on each pending result.

pub mod composes;
pub mod scope;
pub mod used_keyframes;
pub mod used_values;
pub mod values;

use crate::error::{CssModError, CssModResult};
use crate::exports::ExportMap;
use crate::settings;
use crate::stylesheet::{parse_stylesheet, Stylesheet};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use tracing::{debug, warn};

/// Side-channel output of a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `@value` names referenced outside their own definition.
    UsedValues(Vec<String>),
    /// `@keyframes` names referenced by `animation`/`animation-name`.
    UsedKeyframes(Vec<String>),
    /// Output of an appended, non-built-in stage.
    Custom {
        plugin: String,
        kind: String,
        payload: serde_json::Value,
    },
}

/// Names in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct NameSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl NameSet {
    pub fn insert(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.order.push(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// State shared by the stages of one run.
#[derive(Debug)]
pub struct StageContext<'a> {
    pub path: &'a Path,
    pub default_scope: settings::Scope,
    pub messages: Vec<Message>,
    /// Filled by the scoping stage.
    pub locals: NameSet,
    /// Filled by the composition stage: local name → raw class sequence.
    pub exports: ExportMap,
}

impl<'a> StageContext<'a> {
    pub fn new(path: &'a Path, default_scope: settings::Scope) -> Self {
        Self {
            path,
            default_scope,
            messages: Vec::new(),
            locals: NameSet::default(),
            exports: ExportMap::new(),
        }
    }
}

/// How a stage finished.
#[derive(Debug)]
pub enum Completion {
    Done,
    /// The stage's remaining messages arrive through a [`Resolver`].
    Deferred(Pending),
}

pub type Settled = Result<Vec<Message>, String>;
type Slot = Arc<(Mutex<Option<Settled>>, Condvar)>;

/// Receiving half of a deferred stage completion.
#[derive(Debug)]
pub struct Pending {
    slot: Slot,
}

/// Settling half of a deferred stage completion. Dropping it unsettled
/// rejects the completion.
#[derive(Debug)]
pub struct Resolver {
    slot: Slot,
    settled: bool,
}

/// Creates a linked [`Pending`]/[`Resolver`] pair.
pub fn deferred() -> (Pending, Resolver) {
    let slot: Slot = Arc::new((Mutex::new(None), Condvar::new()));
    (
        Pending {
            slot: Arc::clone(&slot),
        },
        Resolver {
            slot,
            settled: false,
        },
    )
}

impl Pending {
    /// Takes the outcome if already settled.
    pub fn try_take(&self) -> Option<Settled> {
        let (lock, _) = &*self.slot;
        lock.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Blocks until the paired [`Resolver`] settles.
    pub fn wait(self) -> Settled {
        let (lock, cvar) = &*self.slot;
        let mut guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = guard.take() {
                return outcome;
            }
            guard = cvar.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Resolver {
    pub fn resolve(mut self, messages: Vec<Message>) {
        self.settle(Ok(messages));
    }

    pub fn reject(mut self, reason: impl Into<String>) {
        self.settle(Err(reason.into()));
    }

    fn settle(&mut self, outcome: Settled) {
        let (lock, cvar) = &*self.slot;
        let mut guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(outcome);
        self.settled = true;
        cvar.notify_all();
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(Err("completion dropped without settling".to_string()));
        }
    }
}

/// One transform pass over the tree.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, sheet: &mut Stylesheet, ctx: &mut StageContext<'_>) -> CssModResult<Completion>;
}

/// How deferred completions are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Every stage must finish synchronously.
    Direct,
    /// Deferred completions are waited on.
    Blocking,
}

/// Everything the pipeline produced for one stylesheet.
#[derive(Debug)]
pub struct ProcessOutput {
    pub stylesheet: Stylesheet,
    pub messages: Vec<Message>,
    pub exports: ExportMap,
}

pub struct Processor {
    stages: Vec<Box<dyn Stage>>,
    default_scope: settings::Scope,
    blocking: AtomicBool,
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("stages", &self.stage_names())
            .field("default_scope", &self.default_scope)
            .field("strategy", &self.strategy())
            .finish()
    }
}

impl Processor {
    /// Processor with the five built-in stages.
    pub fn new(default_scope: settings::Scope) -> Self {
        Self {
            stages: vec![
                Box::new(used_values::UsedValues),
                Box::new(values::Values),
                Box::new(scope::Scoping),
                Box::new(composes::Composes),
                Box::new(used_keyframes::UsedKeyframes),
            ],
            default_scope,
            blocking: AtomicBool::new(false),
        }
    }

    /// Appends a stage after the built-in ones.
    pub fn with_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn default_scope(&self) -> settings::Scope {
        self.default_scope
    }

    pub fn set_default_scope(&mut self, scope: settings::Scope) {
        self.default_scope = scope;
    }

    pub fn strategy(&self) -> Strategy {
        if self.blocking.load(Ordering::Acquire) {
            Strategy::Blocking
        } else {
            Strategy::Direct
        }
    }

    /// Parses and transforms `source`. `path` is used for error reporting.
    pub fn process(&self, source: &str, path: &Path) -> CssModResult<ProcessOutput> {
        let sheet = parse_stylesheet(source, path)?;

        if self.strategy() == Strategy::Direct {
            if let Some(output) = self.run(sheet.clone(), path, Strategy::Direct)? {
                return Ok(output);
            }
            if !self.blocking.swap(true, Ordering::AcqRel) {
                warn!(
                    path = %path.display(),
                    "Stage completed asynchronously, switching to blocking completion"
                );
            }
        }

        self.run(sheet, path, Strategy::Blocking)?.ok_or_else(|| {
            CssModError::pipeline("processor", "blocking run did not complete")
        })
    }

    /// Runs every stage. `Ok(None)` means a stage deferred under `Direct`.
    fn run(
        &self,
        mut sheet: Stylesheet,
        path: &Path,
        strategy: Strategy,
    ) -> CssModResult<Option<ProcessOutput>> {
        let mut ctx = StageContext::new(path, self.default_scope);

        for stage in &self.stages {
            debug!(stage = stage.name(), path = %path.display(), "Running stage");
            match stage.run(&mut sheet, &mut ctx)? {
                Completion::Done => {}
                Completion::Deferred(_) if strategy == Strategy::Direct => return Ok(None),
                Completion::Deferred(pending) => {
                    let messages = pending
                        .wait()
                        .map_err(|reason| CssModError::pipeline(stage.name(), reason))?;
                    ctx.messages.extend(messages);
                }
            }
        }

        Ok(Some(ProcessOutput {
            stylesheet: sheet,
            messages: ctx.messages,
            exports: ctx.exports,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn process(css: &str) -> ProcessOutput {
        Processor::new(settings::Scope::Local)
            .process(css, Path::new("/test.css"))
            .unwrap()
    }

    /// Defers its message to a background thread.
    struct ThreadedStage {
        runs: Arc<AtomicUsize>,
    }

    impl Stage for ThreadedStage {
        fn name(&self) -> &str {
            "threaded"
        }

        fn run(&self, _: &mut Stylesheet, _: &mut StageContext<'_>) -> CssModResult<Completion> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let (pending, resolver) = deferred();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(5));
                resolver.resolve(vec![Message::Custom {
                    plugin: "threaded".into(),
                    kind: "done".into(),
                    payload: serde_json::json!(1),
                }]);
            });
            Ok(Completion::Deferred(pending))
        }
    }

    struct RejectingStage;

    impl Stage for RejectingStage {
        fn name(&self) -> &str {
            "rejecting"
        }

        fn run(&self, _: &mut Stylesheet, _: &mut StageContext<'_>) -> CssModResult<Completion> {
            let (pending, resolver) = deferred();
            resolver.reject("boom");
            Ok(Completion::Deferred(pending))
        }
    }

    #[test]
    fn test_builtin_stage_order() {
        let p = Processor::new(settings::Scope::Local);
        assert_eq!(
            p.stage_names(),
            vec!["used-values", "values", "scope", "composes", "used-keyframes"]
        );
        assert_eq!(p.strategy(), Strategy::Direct);
    }

    #[test]
    fn test_sync_pipeline_stays_direct() {
        let p = Processor::new(settings::Scope::Local);
        let out = p.process(".a { color: red; }", Path::new("/a.css")).unwrap();
        assert_eq!(out.exports.get("a"), Some(&["a".to_string()][..]));
        assert_eq!(p.strategy(), Strategy::Direct);
    }

    #[test]
    fn test_deferred_stage_switches_to_blocking_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let p = Processor::new(settings::Scope::Local).with_stage(Box::new(ThreadedStage {
            runs: Arc::clone(&runs),
        }));

        let out = p.process(".a {}", Path::new("/a.css")).unwrap();
        assert_eq!(p.strategy(), Strategy::Blocking);
        // Direct attempt plus the blocking re-run.
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(out
            .messages
            .iter()
            .any(|m| matches!(m, Message::Custom { plugin, .. } if plugin == "threaded")));
        assert!(out.exports.contains_key("a"));

        // Later calls go straight to the blocking strategy.
        p.process(".b {}", Path::new("/b.css")).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_rejected_completion_is_pipeline_error() {
        let p = Processor::new(settings::Scope::Local).with_stage(Box::new(RejectingStage));
        let err = p.process(".a {}", Path::new("/a.css")).unwrap_err();
        assert!(matches!(err, CssModError::Pipeline { ref stage, .. } if stage == "rejecting"));
    }

    #[test]
    fn test_dropped_resolver_rejects() {
        let (pending, resolver) = deferred();
        drop(resolver);
        assert!(pending.wait().is_err());
    }

    #[test]
    fn test_try_take_before_and_after_settle() {
        let (pending, resolver) = deferred();
        assert!(pending.try_take().is_none());
        resolver.resolve(vec![]);
        assert_eq!(pending.try_take(), Some(Ok(vec![])));
    }

    #[test]
    fn test_parse_error_propagates() {
        let p = Processor::new(settings::Scope::Local);
        let err = p.process(".a { color: red;", Path::new("/bad.css")).unwrap_err();
        assert!(matches!(err, CssModError::Parse { .. }));
    }

    #[test]
    fn test_messages_from_builtin_stages() {
        let out = process(
            "@value red: #f00; @keyframes spin {} .a { color: red; animation: spin 1s; }",
        );
        assert!(out
            .messages
            .contains(&Message::UsedValues(vec!["red".to_string()])));
        assert!(out
            .messages
            .contains(&Message::UsedKeyframes(vec!["spin".to_string()])));
    }
}
