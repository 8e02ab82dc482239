//! Extraction engine: one stylesheet in, exported and used classes out.

use crate::error::{CssModResult, IoResultExt};
use crate::exports::ExportMap;
use crate::naming::normalize;
use crate::processor::{Message, Processor};
use crate::settings::{CamelCaseMode, Settings};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Everything an importer needs to know about one stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    /// Normalized export name → raw class sequence (composing class first).
    pub exported_classes: ExportMap,
    /// Names the stylesheet consumes itself (`@value`, keyframes).
    pub used_classes: BTreeSet<String>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.exported_classes.is_empty() && self.used_classes.is_empty()
    }
}

#[derive(Debug)]
pub struct Extractor {
    processor: Processor,
    camel_case: CamelCaseMode,
}

impl Extractor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            processor: Processor::new(settings.default_scope),
            camel_case: settings.camel_case,
        }
    }

    /// Uses a custom processor, e.g. one with extra stages.
    pub fn with_processor(processor: Processor, camel_case: CamelCaseMode) -> Self {
        Self {
            processor,
            camel_case,
        }
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    pub fn camel_case(&self) -> CamelCaseMode {
        self.camel_case
    }

    /// Adopts the extraction-relevant parts of `settings`.
    pub fn configure(&mut self, settings: &Settings) {
        self.camel_case = settings.camel_case;
        self.processor.set_default_scope(settings.default_scope);
    }

    /// Reads and extracts `path`. The caller has already checked existence.
    pub fn extract(&self, path: &Path) -> CssModResult<ExtractionResult> {
        let source = fs::read_to_string(path).with_path(path)?;
        self.extract_source(&source, path)
    }

    /// Extracts already-loaded source. `path` is used for error reporting.
    pub fn extract_source(&self, source: &str, path: &Path) -> CssModResult<ExtractionResult> {
        let output = self.processor.process(source, path)?;

        let mut result = ExtractionResult::default();
        for (key, classes) in output.exports.iter() {
            for name in normalize(key, self.camel_case) {
                result.exported_classes.insert_first(name, classes.to_vec());
            }
        }

        for message in output.messages {
            match message {
                Message::UsedValues(names) | Message::UsedKeyframes(names) => {
                    result.used_classes.extend(names);
                }
                Message::Custom { .. } => {}
            }
        }

        debug!(
            path = %path.display(),
            exported = result.exported_classes.len(),
            used = result.used_classes.len(),
            "Extracted stylesheet"
        );
        Ok(result)
    }
}
