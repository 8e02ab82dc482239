//! Settings resolution for one consuming file.
//!
//! Merges, in increasing priority: built-in defaults, the companion
//! `cssmodules.toml`, and the host option bag. Bad values never fail the
//! analysis; each field falls back to its default on its own.

use crate::config::{load_config, CssModConfig};
use regex::Regex;
use serde_json::Value;
use std::{
    fmt,
    path::{Component, Path, PathBuf},
    str::FromStr,
    sync::OnceLock,
};
use tracing::{debug, warn};

/// Key under which the host stores this plugin's options.
pub const SETTINGS_NAMESPACE: &str = "css-modules";

/// How exported names are reported to importers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CamelCaseMode {
    /// Raw name only.
    #[default]
    Off,
    /// Raw name only, named explicitly.
    AsIs,
    /// Raw name plus its camelCased form.
    CamelCase,
    /// camelCased form only.
    CamelCaseOnly,
    /// Raw name plus dashes converted to camelCase.
    Dashes,
    /// Dashes converted to camelCase only.
    DashesOnly,
    /// Same output as `CamelCaseOnly`.
    Only,
}

impl CamelCaseMode {
    /// Interprets an option value: `true`/`false` or a mode name.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(true) => Some(Self::CamelCase),
            Value::Bool(false) | Value::Null => Some(Self::Off),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::AsIs => "asIs",
            Self::CamelCase => "camelCase",
            Self::CamelCaseOnly => "camelCaseOnly",
            Self::Dashes => "dashes",
            Self::DashesOnly => "dashesOnly",
            Self::Only => "only",
        }
    }
}

impl FromStr for CamelCaseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" | "false" => Ok(Self::Off),
            "asIs" | "as-is" => Ok(Self::AsIs),
            "camelCase" | "camel-case" | "true" => Ok(Self::CamelCase),
            "camelCaseOnly" | "camel-case-only" => Ok(Self::CamelCaseOnly),
            "dashes" => Ok(Self::Dashes),
            "dashesOnly" | "dashes-only" => Ok(Self::DashesOnly),
            "only" => Ok(Self::Only),
            other => Err(format!("unknown camelCase mode '{}'", other)),
        }
    }
}

impl fmt::Display for CamelCaseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default scope applied to selectors without `:local`/`:global`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Local,
    Global,
    /// Local, and every selector must contain a local class or id.
    Pure,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Global => "global",
            Self::Pure => "pure",
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "global" => Ok(Self::Global),
            "pure" => Ok(Self::Pure),
            other => Err(format!("unknown scope '{}'", other)),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path predicate used for `include`/`exclude`.
#[derive(Debug, Clone)]
pub enum Matcher {
    Glob(glob::Pattern),
    Regex(Regex),
    /// Matches when any member matches.
    Any(Vec<Matcher>),
}

fn default_include_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\.css$").expect("Hardcoded regex pattern is valid")
    })
}

fn default_exclude_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"/node_modules/").expect("Hardcoded regex pattern is valid")
    })
}

impl Matcher {
    /// Paths ending in `.css`.
    pub fn default_include() -> Self {
        Self::Regex(default_include_regex().clone())
    }

    /// Paths with a `node_modules` segment.
    pub fn default_exclude() -> Self {
        Self::Regex(default_exclude_regex().clone())
    }

    /// Builds a matcher from an option value.
    ///
    /// Accepts a glob string, `{ "regex": "..." }`, or an array of those.
    /// Returns `None` if any part is malformed.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(pattern) => glob::Pattern::new(pattern).ok().map(Self::Glob),
            Value::Object(map) => {
                let pattern = map.get("regex")?.as_str()?;
                Regex::new(pattern).ok().map(Self::Regex)
            }
            Value::Array(items) => items
                .iter()
                .map(Self::from_value)
                .collect::<Option<Vec<_>>>()
                .map(Self::Any),
            _ => None,
        }
    }

    pub fn is_match(&self, path: &Path) -> bool {
        let text = path_to_normalized_string(path);
        self.is_match_str(&text)
    }

    fn is_match_str(&self, text: &str) -> bool {
        match self {
            Self::Glob(pattern) => pattern.matches(text),
            Self::Regex(regex) => regex.is_match(text),
            Self::Any(items) => items.iter().any(|m| m.is_match_str(text)),
        }
    }
}

/// Convert a path to a string with forward slashes.
#[inline]
pub fn path_to_normalized_string(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Lexically resolves `.` and `..` components without touching the disk.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn absolutize(path: &Path, anchor: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&anchor.join(path))
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
}

/// Immutable per-file settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory of the consuming file.
    pub context_directory: PathBuf,
    /// Where the companion config search starts.
    pub config_search_directory: PathBuf,
    /// Anchor for non-relative imports. `None` means the context directory.
    pub base_directory: Option<PathBuf>,
    pub camel_case: CamelCaseMode,
    pub default_scope: Scope,
    pub include: Matcher,
    pub exclude: Matcher,
}

impl Settings {
    /// Defaults for a consuming file, without reading any config.
    pub fn new(file_path: &Path) -> Self {
        let absolute = absolutize(file_path, &current_dir());
        let context_directory = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        Self {
            config_search_directory: context_directory.clone(),
            context_directory,
            base_directory: None,
            camel_case: CamelCaseMode::default(),
            default_scope: Scope::default(),
            include: Matcher::default_include(),
            exclude: Matcher::default_exclude(),
        }
    }

    /// Resolves settings from a host settings object that holds this plugin's
    /// option bag under [`SETTINGS_NAMESPACE`].
    pub fn from_host_settings(file_path: &Path, host_settings: &Value) -> Self {
        let empty = Value::Null;
        let options = host_settings.get(SETTINGS_NAMESPACE).unwrap_or(&empty);
        Self::from_options(file_path, options)
    }

    /// Resolves settings from an option bag plus the companion config file.
    pub fn from_options(file_path: &Path, options: &Value) -> Self {
        let mut settings = Self::new(file_path);
        let cwd = current_dir();

        if let Some(dir) = option_str(options, &["configDir", "postcssConfigDir"]) {
            settings.config_search_directory = absolutize(Path::new(dir), &cwd);
        }

        let file_cfg = match load_config(&settings.config_search_directory) {
            Ok(Some((path, cfg))) => {
                debug!(path = %path.display(), "Loaded companion config");
                Some((path, cfg))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Ignoring companion config, using defaults");
                None
            }
        };

        if let Some((path, cfg)) = &file_cfg {
            settings.apply_file_config(path, cfg);
        }
        settings.apply_options(options, &cwd);
        settings
    }

    fn apply_file_config(&mut self, path: &Path, cfg: &CssModConfig) {
        let anchor = path.parent().unwrap_or(Path::new("/"));

        if let Some(value) = &cfg.camel_case {
            self.camel_case = parse_or_default("camel-case", value, CamelCaseMode::from_value);
        }
        if let Some(scope) = &cfg.default_scope {
            self.default_scope = parse_or_default(
                "default-scope",
                &Value::String(scope.clone()),
                |v| v.as_str()?.parse().ok(),
            );
        }
        if let Some(dir) = &cfg.base_dir {
            self.base_directory = Some(absolutize(Path::new(dir), anchor));
        }
        if let Some(value) = &cfg.include {
            self.include = matcher_or_default("include", value, Matcher::default_include);
        }
        if let Some(value) = &cfg.exclude {
            self.exclude = matcher_or_default("exclude", value, Matcher::default_exclude);
        }
    }

    fn apply_options(&mut self, options: &Value, cwd: &Path) {
        if let Some(value) = options.get("camelCase") {
            self.camel_case = parse_or_default("camelCase", value, CamelCaseMode::from_value);
        }
        if let Some(value) = options.get("defaultScope") {
            self.default_scope =
                parse_or_default("defaultScope", value, |v| v.as_str()?.parse().ok());
        }
        if let Some(dir) = option_str(options, &["baseDir"]) {
            self.base_directory = if dir.is_empty() {
                None
            } else {
                Some(absolutize(Path::new(dir), cwd))
            };
        }
        if let Some(value) = options.get("include") {
            self.include = matcher_or_default("include", value, Matcher::default_include);
        }
        if let Some(value) = options.get("exclude") {
            self.exclude = matcher_or_default("exclude", value, Matcher::default_exclude);
        }
    }

    /// Resolves an import source string to an absolute path.
    ///
    /// Sources starting with `.` resolve against the consuming file's
    /// directory, everything else against the base directory.
    pub fn resolve_import_path(&self, raw: &str) -> PathBuf {
        let raw_path = Path::new(raw);
        if raw_path.is_absolute() {
            return normalize_lexically(raw_path);
        }
        let anchor = if raw.starts_with('.') {
            &self.context_directory
        } else {
            self.base_directory.as_ref().unwrap_or(&self.context_directory)
        };
        normalize_lexically(&anchor.join(raw_path))
    }

    /// `true` when `path` passes include and is not excluded.
    pub fn should_process(&self, path: &Path) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

fn option_str<'a>(options: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| options.get(*key)?.as_str())
}

fn parse_or_default<T: Default>(
    key: &str,
    value: &Value,
    parse: impl Fn(&Value) -> Option<T>,
) -> T {
    parse(value).unwrap_or_else(|| {
        warn!(key, value = %value, "Invalid setting, using default");
        T::default()
    })
}

fn matcher_or_default(key: &str, value: &Value, default: fn() -> Matcher) -> Matcher {
    Matcher::from_value(value).unwrap_or_else(|| {
        warn!(key, value = %value, "Invalid matcher, using default");
        default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let s = Settings::new(Path::new("/project/src/App.js"));
        assert_eq!(s.context_directory, PathBuf::from("/project/src"));
        assert_eq!(s.config_search_directory, PathBuf::from("/project/src"));
        assert_eq!(s.camel_case, CamelCaseMode::Off);
        assert_eq!(s.default_scope, Scope::Local);
        assert!(s.base_directory.is_none());
    }

    #[test]
    fn test_default_matchers() {
        let s = Settings::new(Path::new("/project/src/App.js"));
        assert!(s.should_process(Path::new("/project/src/app.css")));
        assert!(!s.should_process(Path::new("/project/src/app.scss")));
        assert!(!s.should_process(Path::new("/project/node_modules/lib/x.css")));
    }

    #[test]
    fn test_resolve_relative_and_base() {
        let mut s = Settings::new(Path::new("/project/src/App.js"));
        assert_eq!(
            s.resolve_import_path("./a.css"),
            PathBuf::from("/project/src/a.css")
        );
        assert_eq!(
            s.resolve_import_path("../styles/b.css"),
            PathBuf::from("/project/styles/b.css")
        );
        // No base directory: falls back to the context directory.
        assert_eq!(
            s.resolve_import_path("styles/c.css"),
            PathBuf::from("/project/src/styles/c.css")
        );

        s.base_directory = Some(PathBuf::from("/project"));
        assert_eq!(
            s.resolve_import_path("styles/c.css"),
            PathBuf::from("/project/styles/c.css")
        );
        assert_eq!(
            s.resolve_import_path("./a.css"),
            PathBuf::from("/project/src/a.css")
        );
    }

    #[test]
    fn test_camel_case_values() {
        assert_eq!(CamelCaseMode::from_value(&json!(true)), Some(CamelCaseMode::CamelCase));
        assert_eq!(CamelCaseMode::from_value(&json!(false)), Some(CamelCaseMode::Off));
        assert_eq!(
            CamelCaseMode::from_value(&json!("dashesOnly")),
            Some(CamelCaseMode::DashesOnly)
        );
        assert_eq!(CamelCaseMode::from_value(&json!("bogus")), None);
        assert_eq!(CamelCaseMode::from_value(&json!(3)), None);
    }

    #[test]
    fn test_option_bag_overrides() {
        let opts = json!({
            "camelCase": "dashes",
            "defaultScope": "global",
            "baseDir": "/project",
            "include": "**/*.module.css",
            "exclude": [{ "regex": "legacy" }]
        });
        let s = Settings::from_options(Path::new("/nonexistent-cssmod/src/App.js"), &opts);
        assert_eq!(s.camel_case, CamelCaseMode::Dashes);
        assert_eq!(s.default_scope, Scope::Global);
        assert_eq!(s.base_directory, Some(PathBuf::from("/project")));
        assert!(s.should_process(Path::new("/project/a.module.css")));
        assert!(!s.should_process(Path::new("/project/a.css")));
        assert!(!s.should_process(Path::new("/project/legacy/a.module.css")));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let opts = json!({
            "camelCase": 42,
            "defaultScope": "sideways",
            "include": { "regex": "(" },
        });
        let s = Settings::from_options(Path::new("/nonexistent-cssmod/App.js"), &opts);
        assert_eq!(s.camel_case, CamelCaseMode::Off);
        assert_eq!(s.default_scope, Scope::Local);
        assert!(s.should_process(Path::new("/x/a.css")));
    }

    #[test]
    fn test_host_settings_namespace() {
        let host = json!({ "css-modules": { "camelCase": true } });
        let s = Settings::from_host_settings(Path::new("/nonexistent-cssmod/App.js"), &host);
        assert_eq!(s.camel_case, CamelCaseMode::CamelCase);

        let other = json!({ "something-else": { "camelCase": true } });
        let s = Settings::from_host_settings(Path::new("/nonexistent-cssmod/App.js"), &other);
        assert_eq!(s.camel_case, CamelCaseMode::Off);
    }

    #[test]
    fn test_companion_file_then_options() {
        let dir = std::env::temp_dir()
            .join("cssmod_settings_test")
            .join(format!("companion_{}", std::process::id()));
        std::fs::create_dir_all(dir.join("src")).unwrap();
        std::fs::write(
            dir.join("cssmodules.toml"),
            "camel-case = \"only\"\ndefault-scope = \"pure\"\nbase-dir = \"styles\"\n",
        )
        .unwrap();

        let file = dir.join("src/App.js");
        let s = Settings::from_options(&file, &Value::Null);
        assert_eq!(s.camel_case, CamelCaseMode::Only);
        assert_eq!(s.default_scope, Scope::Pure);
        assert_eq!(s.base_directory, Some(dir.join("styles")));

        let s = Settings::from_options(&file, &json!({ "defaultScope": "local" }));
        assert_eq!(s.camel_case, CamelCaseMode::Only);
        assert_eq!(s.default_scope, Scope::Local);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/./../c.css")),
            PathBuf::from("/a/c.css")
        );
    }
}
