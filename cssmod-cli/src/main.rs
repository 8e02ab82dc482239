//! cssmod CLI - show what CSS Modules stylesheets export and use.
//!
//! Directories are scanned for stylesheets (skipping `node_modules`, `.git`
//! and build output), every file is extracted in parallel, and the export
//! map plus self-used names are printed as text or JSON.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::path::PathBuf;

use cssmod_core::{
    gather_stylesheets, init_structured_logging, log_error, log_info, log_warn, print_json,
    print_plain, CamelCaseMode, CssModError, Extractor, Scope, Settings, StylesheetReport,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect the classes CSS Modules stylesheets export")]
pub struct Cli {
    /// Stylesheets or directories to scan
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Output results in JSON format
    #[arg(long)]
    json: bool,

    /// Export name normalization: off, asIs, camelCase, camelCaseOnly, dashes, dashesOnly, only
    #[arg(long, value_name = "MODE")]
    camel_case: Option<CamelCaseMode>,

    /// Scope of unmarked selectors: local, global, pure
    #[arg(long, value_name = "SCOPE")]
    default_scope: Option<Scope>,

    /// Directory where the cssmodules.toml search starts
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,
}

/// Settings for the current directory: companion config first, flags on top.
fn build_settings(cli: &Cli) -> Result<Settings> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let mut options = serde_json::Map::new();
    if let Some(dir) = &cli.config_dir {
        options.insert(
            "configDir".into(),
            serde_json::Value::String(dir.display().to_string()),
        );
    }

    // The virtual consumer anchors relative config lookups at the cwd.
    let options = serde_json::Value::Object(options);
    let mut settings = Settings::from_options(&cwd.join("cssmod"), &options);
    if let Some(mode) = cli.camel_case {
        settings.camel_case = mode;
    }
    if let Some(scope) = cli.default_scope {
        settings.default_scope = scope;
    }
    Ok(settings)
}

/// Collects stylesheets from every input path, sorted and deduplicated.
fn collect_files(paths: &[PathBuf], settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(anyhow!("Path does not exist: {}", path.display()));
        }
        files.extend(gather_stylesheets(path, settings)?);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Extracts every file, one engine per worker thread.
fn extract_all(
    files: &[PathBuf],
    settings: &Settings,
) -> (Vec<StylesheetReport>, Vec<(PathBuf, CssModError)>) {
    let outcomes: Vec<(PathBuf, Result<_, CssModError>)> = files
        .par_iter()
        .map_init(
            || Extractor::new(settings),
            |extractor, path| (path.clone(), extractor.extract(path)),
        )
        .collect();

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(result) => reports.push(StylesheetReport::new(&path, result)),
            Err(e) => failures.push((path, e)),
        }
    }
    (reports, failures)
}

fn run(cli: &Cli) -> Result<bool> {
    let settings = build_settings(cli)?;
    let files = collect_files(&cli.paths, &settings)?;
    if files.is_empty() {
        log_warn("No stylesheets matched the include/exclude settings");
    }
    log_info(&format!("Extracting {} stylesheet(s)", files.len()));

    let (reports, failures) = extract_all(&files, &settings);

    if cli.json {
        print_json(&reports);
    } else {
        print_plain(&reports);
    }

    for (path, err) in &failures {
        log_error(&format!("{}: {}", path.display(), err));
        eprintln!("ERROR: {}", err);
    }
    Ok(failures.is_empty())
}

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("[PANIC] cssmod internal error: {}", info);
        eprintln!("[PANIC] The process will exit with code 2.");
    }));

    // JSON to stderr, respects RUST_LOG
    init_structured_logging();

    let cli = Cli::parse();
    let ok = run(&cli)?;
    std::process::exit(if ok { 0 } else { 1 });
}
