//! Library API for apigraph.
//!
//! These functions run the full pipeline (front end, collector, model
//! builder) and hand back an [`ExtractionResult`] instead of printing and
//! returning exit codes the way the CLI commands do.
//!
//! # Example
//!
//! ```no_run
//! use apigraph::{Config, extract};
//! use std::path::Path;
//!
//! let result = extract(Path::new("dist/index.d.ts"), &Config::default())?;
//! println!("{} top-level items", result.package.members.len());
//! for diagnostic in &result.diagnostics {
//!     println!("{}: {}", diagnostic.kind.message_id(), diagnostic.message);
//! }
//! # Ok::<(), apigraph::ApigraphError>(())
//! ```

use crate::collector::{Collector, InternalError};
use crate::config::{Config, ConfigError};
use crate::front_end::{FrontEnd, FrontEndError, TypeScriptLoader};
use crate::model::{ExtractionResult, ModelBuilder};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

/// Errors that can stop an extraction. Diagnostics are not errors; they are
/// returned inside the [`ExtractionResult`].
#[derive(Debug, Error)]
pub enum ApigraphError {
    /// The entry file could not be found.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    FrontEnd(#[from] FrontEndError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Extract the API surface reachable from the entry declaration file.
///
/// The package name comes from `config.package_name`, falling back to the
/// entry file's stem.
#[instrument(skip(config), fields(entry = %entry.display()))]
pub fn extract(entry: &Path, config: &Config) -> Result<ExtractionResult, ApigraphError> {
    if !entry.is_file() {
        return Err(ApigraphError::PathNotFound(entry.to_path_buf()));
    }

    let package_name = config
        .package_name
        .clone()
        .unwrap_or_else(|| package_name_from_entry(entry));
    let program = TypeScriptLoader::new(package_name).load(entry)?;
    extract_program(&program, config)
}

/// Extract from a single in-memory declaration module.
///
/// ```
/// use apigraph::{Config, extract_source};
///
/// let result = extract_source(
///     "index.d.ts",
///     "/** @public */\nexport declare function greet(name: string): string;\n",
///     &Config::default(),
/// )?;
/// assert_eq!(result.package.members[0].name, "greet");
/// assert!(result.diagnostics.is_empty());
/// # Ok::<(), apigraph::ApigraphError>(())
/// ```
pub fn extract_source(
    name: &str,
    source: &str,
    config: &Config,
) -> Result<ExtractionResult, ApigraphError> {
    let package_name = config
        .package_name
        .clone()
        .unwrap_or_else(|| package_name_from_entry(Path::new(name)));
    let program = TypeScriptLoader::new(package_name).load_source(name, source)?;
    extract_program(&program, config)
}

/// Run the collector and model builder over an already loaded program.
pub fn extract_program(
    front_end: &dyn FrontEnd,
    config: &Config,
) -> Result<ExtractionResult, ApigraphError> {
    let mut collector = Collector::new(front_end, config);
    collector.analyze()?;
    let package = ModelBuilder::new(&mut collector).build()?;
    let diagnostics = collector.diagnostics().to_vec();

    info!(
        package = %package.name,
        items = package.members.len(),
        diagnostics = diagnostics.len(),
        "extraction finished"
    );
    Ok(ExtractionResult {
        package,
        diagnostics,
    })
}

/// `lib/index.d.ts` becomes `index`.
fn package_name_from_entry(entry: &Path) -> String {
    let file_name = entry
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = [".d.ts", ".d.mts", ".d.cts", ".tsx", ".ts"]
        .iter()
        .find_map(|suffix| file_name.strip_suffix(suffix))
        .unwrap_or(&file_name);
    if stem.is_empty() {
        "package".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiagnosticKind, Severity};

    #[test]
    fn test_package_name_from_entry() {
        assert_eq!(package_name_from_entry(Path::new("lib/widgets.d.ts")), "widgets");
        assert_eq!(package_name_from_entry(Path::new("src/main.ts")), "main");
        assert_eq!(package_name_from_entry(Path::new("")), "package");
    }

    #[test]
    fn test_missing_entry_is_path_not_found() {
        let err = extract(Path::new("/definitely/not/here.d.ts"), &Config::default())
            .unwrap_err();
        assert!(matches!(err, ApigraphError::PathNotFound(_)));
    }

    #[test]
    fn test_configured_package_name_wins() {
        let config = Config {
            package_name: Some("widgets".to_string()),
            ..Config::default()
        };
        let result = extract_source(
            "index.d.ts",
            "/** @public */\nexport declare class Button {}\n",
            &config,
        )
        .unwrap();
        assert_eq!(result.package.name, "widgets");
        assert_eq!(result.package.members[0].canonical_reference, "widgets!Button:class");
    }

    #[test]
    fn test_severity_override_marks_errors() {
        let mut config = Config::default();
        config
            .diagnostics
            .insert(DiagnosticKind::MissingReleaseTag, Some(Severity::Error));

        let result =
            extract_source("index.d.ts", "export declare const VERSION: string;\n", &config)
                .unwrap();
        assert!(result.has_errors(), "missing release tag should be an error");
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::MissingReleaseTag);
    }
}
