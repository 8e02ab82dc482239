//! cssmod-core: CSS Modules class extraction and resolution cache
//!
//! This library tells lint rules which classes a CSS Modules stylesheet
//! exports, which names it consumes itself, and caches that per resolved path
//! for the length of an analysis session.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cssmod_core::prelude::*;
//!
//! let settings = Settings::new(Path::new("/project/src/App.js"));
//! let mut cache = ResolutionCache::new(settings);
//! let result = cache.process_import(Path::new("/project/src/app.css"), Some("styles"))?;
//!
//! for (name, classes) in result.exported_classes.iter() {
//!     println!("{} -> {:?}", name, classes);
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`settings`]: Per-file settings, import path resolution, include/exclude
//! - [`config`]: Companion `cssmodules.toml` discovery
//! - [`stylesheet`]: Syntax tree and parser
//! - [`processor`]: The fixed five-stage CSS Modules pipeline
//! - [`naming`]: camelCase export-name normalization
//! - [`extract`]: One stylesheet in, exported and used classes out
//! - [`cache`]: Resolution cache with SHA-256 fingerprints
//! - [`host`]: Host syntax nodes (imports, member accesses)
//! - [`rules`]: `no-undef-class` and `no-unused-class`
//! - [`scan`]: Parallel stylesheet discovery
//! - [`report`]: Plain text and JSON output
//! - [`error`]: Typed error handling

pub mod cache;
pub mod config;
pub mod error;
pub mod exports;
pub mod extract;
pub mod host;
pub mod logging;
pub mod naming;
pub mod prelude;
pub mod processor;
pub mod report;
pub mod rules;
pub mod scan;
pub mod settings;
pub mod stylesheet;

// ============================================================================
// Explicit Re-exports
// ============================================================================

// Error types
pub use error::{CssModError, CssModResult, IoResultExt};

// Settings and configuration
pub use config::{find_config, load_config, CssModConfig, CONFIG_FILE_NAME};
pub use settings::{
    normalize_lexically, path_to_normalized_string, CamelCaseMode, Matcher, Scope, Settings,
    SETTINGS_NAMESPACE,
};

// Stylesheet tree
pub use stylesheet::{parse_stylesheet, AtRule, Decl, Node, Rule, Stylesheet};

// Processor
pub use processor::{
    deferred, Completion, Message, NameSet, Pending, ProcessOutput, Processor, Resolver, Stage,
    StageContext, Strategy,
};

// Extraction
pub use exports::ExportMap;
pub use extract::{ExtractionResult, Extractor};
pub use naming::{camel_case, dashes_to_camel, normalize};

// Cache
pub use cache::{
    file_hash, CacheStats, EntryState, ProcessedImport, ProcessedMemberAccess,
    ResolutionCache,
};

// Host nodes
pub use host::{
    HostNode, ImportDeclaration, ImportSpecifier, Literal, MemberExpression, MemberObject,
    MemberProperty, NamedImport, Span,
};

// Rules
pub use rules::{
    join_class_names, lint_nodes, recommended, rule_by_name, Diagnostic, NoUndefClass,
    NoUnusedClass, Reporter, RuleEntry, RuleListener, Severity,
};

// Logging
pub use logging::{init_structured_logging, log_error, log_info, log_warn};

// Reporting
pub use report::{print_json, print_plain, render_plain, StylesheetReport};

// File scanning
pub use scan::gather_stylesheets;
