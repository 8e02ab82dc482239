//! Resolution cache: extraction results per resolved stylesheet path.
//!
//! One cache lives for one analysis session and is handed by reference to
//! every consumer rule. Each distinct path is extracted at most once until
//! [`ResolutionCache::reset`]. Import aliases of the file being analyzed
//! point back at the cached results so member accesses never reparse.
//!
//! Every entry records a SHA-256 fingerprint of the source it was computed
//! from. [`ResolutionCache::stale_paths`] reports drift; invalidation stays
//! the host's decision.

use crate::error::{CssModError, CssModResult, IoResultExt};
use crate::extract::{ExtractionResult, Extractor};
use crate::host::{ImportDeclaration, MemberExpression, NamedImport, Span};
use crate::settings::Settings;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Lifecycle of one path in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Uncomputed,
    Computing,
    Cached,
}

/// Lookup counters. `misses` equals the number of extractions run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: Arc<ExtractionResult>,
    fingerprint: String,
}

/// Local alias → stylesheet it was imported from.
#[derive(Debug, Clone)]
struct AliasBinding {
    resolved_path: PathBuf,
    /// Import source as written (`./button.css`).
    base_filename: String,
    result: Arc<ExtractionResult>,
}

/// Outcome of a recognized stylesheet import.
#[derive(Debug, Clone)]
pub struct ProcessedImport {
    pub resolved_path: PathBuf,
    pub base_filename: String,
    pub local_alias: Option<String>,
    pub explicit_bindings: Vec<NamedImport>,
    pub result: Arc<ExtractionResult>,
    pub span: Span,
}

/// Outcome of a member access on a tracked alias.
#[derive(Debug, Clone)]
pub struct ProcessedMemberAccess {
    pub resolved_path: PathBuf,
    pub base_filename: String,
    pub class_name: String,
    pub result: Arc<ExtractionResult>,
    pub span: Span,
}

/// Compute SHA-256 hash from bytes (in-memory, no I/O).
#[inline]
fn hash_bytes(bytes: &[u8]) -> String {
    let mut sha = Sha256::new();
    sha.update(bytes);
    format!("{:x}", sha.finalize())
}

/// Compute SHA-256 file hash for change detection.
pub fn file_hash(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read {} for hashing", path.display()))?;
    Ok(hash_bytes(&bytes))
}

#[derive(Debug)]
pub struct ResolutionCache {
    settings: Settings,
    extractor: Extractor,
    entries: HashMap<PathBuf, CacheEntry>,
    computing: Option<PathBuf>,
    aliases: HashMap<String, AliasBinding>,
    stats: CacheStats,
}

impl ResolutionCache {
    pub fn new(settings: Settings) -> Self {
        let extractor = Extractor::new(&settings);
        Self::with_extractor(settings, extractor)
    }

    /// Uses a custom extractor, e.g. one whose processor has extra stages.
    pub fn with_extractor(settings: Settings, extractor: Extractor) -> Self {
        Self {
            settings,
            extractor,
            entries: HashMap::new(),
            computing: None,
            aliases: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Switches to the settings of the next consuming file.
    ///
    /// Cached results survive unless the new settings change how stylesheets
    /// are extracted (camelCase mode or default scope).
    pub fn set_settings(&mut self, settings: Settings) {
        let affects_results = settings.camel_case != self.settings.camel_case
            || settings.default_scope != self.settings.default_scope;
        if affects_results {
            debug!("Extraction settings changed, dropping cached stylesheets");
            self.entries.clear();
        }
        self.extractor.configure(&settings);
        self.settings = settings;
    }

    /// Clears every cached stylesheet and alias binding.
    pub fn reset(&mut self) {
        debug!(entries = self.entries.len(), aliases = self.aliases.len(), "Resetting cache");
        self.entries.clear();
        self.aliases.clear();
        self.computing = None;
    }

    pub fn entry_state(&self, path: &Path) -> EntryState {
        if self.entries.contains_key(path) {
            EntryState::Cached
        } else if self.computing.as_deref() == Some(path) {
            EntryState::Computing
        } else {
            EntryState::Uncomputed
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA-256 of the source the cached result was computed from.
    pub fn fingerprint(&self, path: &Path) -> Option<&str> {
        self.entries.get(path).map(|e| e.fingerprint.as_str())
    }

    /// Cached paths whose file content changed or disappeared, sorted.
    pub fn stale_paths(&self) -> Vec<PathBuf> {
        let mut stale: Vec<PathBuf> = self
            .entries
            .iter()
            .filter(|(path, entry)| match file_hash(path) {
                Ok(hash) => hash != entry.fingerprint,
                Err(_) => true,
            })
            .map(|(path, _)| path.clone())
            .collect();
        stale.sort();
        stale
    }

    /// Returns the extraction result for `resolved_path`, computing it on
    /// first access, and binds `alias` to it when given.
    ///
    /// A failed extraction leaves no entry behind. Entries are keyed by
    /// absolute path, so a relative `resolved_path` is rejected.
    pub fn process_import(
        &mut self,
        resolved_path: &Path,
        alias: Option<&str>,
    ) -> CssModResult<Arc<ExtractionResult>> {
        if !resolved_path.is_absolute() {
            return Err(CssModError::invalid_argument(format!(
                "Import path must be resolved to an absolute path: {}",
                resolved_path.display()
            )));
        }
        let result = self.lookup_or_compute(resolved_path)?;
        if let Some(alias) = alias {
            self.bind_alias(
                alias,
                resolved_path,
                &resolved_path.display().to_string(),
                &result,
            );
        }
        Ok(result)
    }

    pub fn resolve_alias(&self, alias: &str) -> Option<Arc<ExtractionResult>> {
        self.aliases.get(alias).map(|b| Arc::clone(&b.result))
    }

    /// Resolves a host import node.
    ///
    /// `Ok(None)` when the source is not a string, fails include/exclude, or
    /// does not exist on disk.
    pub fn process_import_declaration(
        &mut self,
        node: &ImportDeclaration,
    ) -> CssModResult<Option<ProcessedImport>> {
        let Some(source) = node.source.as_deref() else {
            return Ok(None);
        };

        let resolved_path = self.settings.resolve_import_path(source);
        if !self.settings.should_process(&resolved_path) || !resolved_path.is_file() {
            return Ok(None);
        }

        let result = self.lookup_or_compute(&resolved_path)?;
        let local_alias = node.local_alias().map(str::to_string);
        if let Some(alias) = &local_alias {
            self.bind_alias(alias, &resolved_path, source, &result);
        }

        Ok(Some(ProcessedImport {
            resolved_path,
            base_filename: source.to_string(),
            local_alias,
            explicit_bindings: node.named_imports(),
            result,
            span: node.span,
        }))
    }

    /// Resolves `alias.name` / `alias["name"]` against a tracked alias.
    pub fn process_member_access(&self, node: &MemberExpression) -> Option<ProcessedMemberAccess> {
        let binding = self.aliases.get(node.object_name()?)?;
        let class_name = node.property_name()?;
        Some(ProcessedMemberAccess {
            resolved_path: binding.resolved_path.clone(),
            base_filename: binding.base_filename.clone(),
            class_name,
            result: Arc::clone(&binding.result),
            span: node.span,
        })
    }

    fn bind_alias(
        &mut self,
        alias: &str,
        path: &Path,
        source: &str,
        result: &Arc<ExtractionResult>,
    ) {
        self.aliases.insert(
            alias.to_string(),
            AliasBinding {
                resolved_path: path.to_path_buf(),
                base_filename: source.to_string(),
                result: Arc::clone(result),
            },
        );
    }

    fn lookup_or_compute(&mut self, path: &Path) -> CssModResult<Arc<ExtractionResult>> {
        if let Some(entry) = self.entries.get(path) {
            self.stats.hits += 1;
            debug!(path = %path.display(), "Cache hit");
            return Ok(Arc::clone(&entry.result));
        }

        // Read once: the same bytes are fingerprinted and extracted.
        let source = fs::read_to_string(path).with_path(path)?;
        let fingerprint = hash_bytes(source.as_bytes());

        self.stats.misses += 1;
        self.computing = Some(path.to_path_buf());
        debug!(path = %path.display(), "Cache miss, extracting");
        let outcome = self.extractor.extract_source(&source, path);
        self.computing = None;

        let result = Arc::new(outcome?);
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                result: Arc::clone(&result),
                fingerprint,
            },
        );
        Ok(result)
    }
}
