//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use cssmod_core::prelude::*;
//! ```
//!
//! Covers what a host integration needs: settings, the cache, host nodes
//! and the rules.

// Errors
pub use crate::error::{CssModError, CssModResult};

// Settings
pub use crate::settings::{CamelCaseMode, Scope, Settings};

// Extraction and caching
pub use crate::cache::{ProcessedImport, ProcessedMemberAccess, ResolutionCache};
pub use crate::extract::{ExtractionResult, Extractor};

// Host nodes
pub use crate::host::{HostNode, ImportDeclaration, ImportSpecifier, MemberExpression, Span};

// Rules
pub use crate::rules::{lint_nodes, recommended, Diagnostic, RuleEntry, Severity};

// Scanning
pub use crate::scan::gather_stylesheets;
