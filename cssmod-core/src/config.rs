//! Companion configuration loading from `cssmodules.toml`.
//!
//! The file is searched from the configured directory upward; the first one
//! found wins. Values use the same shapes as the host option bag:
//!
//! ```toml
//! camel-case = "dashes"
//! default-scope = "local"
//! base-dir = "src"
//! include = ["**/*.module.css"]
//! exclude = ["**/vendor/**"]
//! ```

use crate::error::{CssModError, CssModResult};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// File name searched for in the config directory and its ancestors.
pub const CONFIG_FILE_NAME: &str = "cssmodules.toml";

/// Contents of `cssmodules.toml`.
///
/// Values are validated by the settings resolver, which falls back to
/// defaults field by field.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CssModConfig {
    /// `true`/`false` or one of the camelCase mode names.
    pub camel_case: Option<serde_json::Value>,
    /// `local`, `global` or `pure`.
    pub default_scope: Option<String>,
    /// Base directory for non-relative imports, relative to the config file.
    pub base_dir: Option<String>,
    /// Glob list of stylesheets to process.
    pub include: Option<serde_json::Value>,
    /// Glob list of stylesheets to skip.
    pub exclude: Option<serde_json::Value>,
}

/// Walks from `start` up to the filesystem root looking for [`CONFIG_FILE_NAME`].
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Loads the nearest `cssmodules.toml` at or above `start`, if any.
///
/// Returns the file's path together with its contents so relative values
/// (like `base-dir`) can be anchored to it.
pub fn load_config(start: &Path) -> CssModResult<Option<(PathBuf, CssModConfig)>> {
    let Some(path) = find_config(start) else {
        return Ok(None);
    };

    let content = fs::read_to_string(&path)
        .map_err(|e| CssModError::config(&path, format!("Failed to read: {}", e)))?;
    let cfg = toml::from_str(&content)
        .map_err(|e| CssModError::config(&path, format!("Invalid TOML: {}", e)))?;
    Ok(Some((path, cfg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("cssmod_config_test")
            .join(format!("{}_{}", name, std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_no_config_file() {
        let dir = create_temp_dir("none");
        // Ancestors of a temp dir should not carry a cssmodules.toml.
        assert!(load_config(&dir).unwrap().is_none());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_found_in_ancestor() {
        let dir = create_temp_dir("ancestor");
        let nested = dir.join("src/components");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            dir.join(CONFIG_FILE_NAME),
            "camel-case = \"dashes\"\ndefault-scope = \"global\"\ninclude = [\"**/*.scss\"]\n",
        )
        .unwrap();

        let (path, cfg) = load_config(&nested).unwrap().unwrap();
        assert_eq!(path, dir.join(CONFIG_FILE_NAME));
        assert_eq!(cfg.camel_case, Some(serde_json::json!("dashes")));
        assert_eq!(cfg.default_scope.as_deref(), Some("global"));
        assert_eq!(cfg.include, Some(serde_json::json!(["**/*.scss"])));
        assert!(cfg.exclude.is_none());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_boolean_camel_case() {
        let dir = create_temp_dir("bool");
        fs::write(dir.join(CONFIG_FILE_NAME), "camel-case = true\n").unwrap();
        let (_, cfg) = load_config(&dir).unwrap().unwrap();
        assert_eq!(cfg.camel_case, Some(serde_json::json!(true)));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_malformed_config_is_error() {
        let dir = create_temp_dir("malformed");
        fs::write(dir.join(CONFIG_FILE_NAME), "camel-case = [unterminated").unwrap();
        let err = load_config(&dir).unwrap_err();
        assert!(matches!(err, CssModError::Config { .. }));
        assert_eq!(err.path(), Some(&dir.join(CONFIG_FILE_NAME)));
        fs::remove_dir_all(&dir).ok();
    }
}
