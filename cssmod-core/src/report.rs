//! Output formatting - plaintext and JSON.

use crate::extract::ExtractionResult;
use serde::Serialize;
use serde_json::json;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// One extracted stylesheet, ready for printing.
#[derive(Debug, Clone, Serialize)]
pub struct StylesheetReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub result: ExtractionResult,
}

impl StylesheetReport {
    pub fn new(path: &Path, result: ExtractionResult) -> Self {
        Self {
            path: path.to_path_buf(),
            result,
        }
    }
}

/// Renders reports as plain text.
pub fn render_plain(reports: &[StylesheetReport]) -> String {
    if reports.is_empty() {
        return "No stylesheets found.\n".to_string();
    }

    let mut out = String::new();
    for report in reports {
        let exported = &report.result.exported_classes;
        let _ = writeln!(out, "{} ({} exported):", report.path.display(), exported.len());
        for (key, classes) in exported.iter() {
            if classes.len() == 1 && classes[0] == key {
                let _ = writeln!(out, "  {}", key);
            } else {
                let _ = writeln!(out, "  {} -> {}", key, classes.join(" "));
            }
        }
        if !report.result.used_classes.is_empty() {
            let used: Vec<&str> = report.result.used_classes.iter().map(String::as_str).collect();
            let _ = writeln!(out, "  used: {}", used.join(", "));
        }
    }
    out
}

/// Prints reports in plain text format.
pub fn print_plain(reports: &[StylesheetReport]) {
    print!("{}", render_plain(reports));
}

/// Prints reports in JSON format.
///
/// Falls back to the debug representation if serialization fails.
pub fn print_json(reports: &[StylesheetReport]) {
    match serde_json::to_string_pretty(&json!({ "stylesheets": reports })) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("[WARN] JSON serialization failed: {}", e);
            println!("{{\"stylesheets\": \"{:?}\"}}", reports);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StylesheetReport {
        let mut result = ExtractionResult::default();
        result.exported_classes.insert_first("base", vec!["base".into()]);
        result
            .exported_classes
            .insert_first("button", vec!["button".into(), "base".into()]);
        result.used_classes.insert("spin".into());
        StylesheetReport::new(Path::new("/s/button.css"), result)
    }

    #[test]
    fn test_render_plain() {
        let text = render_plain(&[sample()]);
        assert_eq!(
            text,
            "/s/button.css (2 exported):\n  base\n  button -> button base\n  used: spin\n"
        );
        assert_eq!(render_plain(&[]), "No stylesheets found.\n");
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["path"], "/s/button.css");
        assert_eq!(value["exported_classes"]["button"], json!(["button", "base"]));
        assert_eq!(value["used_classes"], json!(["spin"]));
    }
}
