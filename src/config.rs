use crate::model::{DiagnosticKind, Severity};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = ".apigraph.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Unknown diagnostic id \"{0}\"")]
    UnknownDiagnostic(String),
    #[error("Invalid severity \"{value}\" for {id} (expected error, warning, info or none)")]
    InvalidSeverity { id: String, value: String },
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Overrides the package name reported by the front end.
    pub package_name: Option<String>,
    /// Report missing release tags on entities that are not consumable.
    pub include_forgotten_exports: bool,
    /// Names the name assigner must never hand out, on top of global names.
    pub reserved_names: Vec<String>,
    /// Per-diagnostic severity overrides; `None` suppresses the diagnostic.
    pub diagnostics: HashMap<DiagnosticKind, Option<Severity>>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    package_name: Option<String>,
    include_forgotten_exports: Option<bool>,
    reserved_names: Option<Vec<String>>,
    diagnostics: Option<HashMap<String, String>>,
}

impl Config {
    /// Load `.apigraph.toml` from `project_path`, or defaults when absent.
    pub fn load(project_path: &Path) -> Result<Self, ConfigError> {
        let config_path = project_path.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(config_path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;

        let mut diagnostics = HashMap::new();
        for (id, value) in raw.diagnostics.unwrap_or_default() {
            let kind = DiagnosticKind::from_message_id(&id)
                .ok_or_else(|| ConfigError::UnknownDiagnostic(id.clone()))?;
            let severity = if value.eq_ignore_ascii_case("none") {
                None
            } else {
                let parsed = value
                    .parse::<Severity>()
                    .map_err(|_| ConfigError::InvalidSeverity {
                        id: id.clone(),
                        value: value.clone(),
                    })?;
                Some(parsed)
            };
            diagnostics.insert(kind, severity);
        }

        Ok(Self {
            package_name: raw.package_name,
            include_forgotten_exports: raw.include_forgotten_exports.unwrap_or(false),
            reserved_names: raw.reserved_names.unwrap_or_default(),
            diagnostics,
        })
    }

    /// Effective severity of a diagnostic kind; `None` means suppressed.
    pub fn severity_for(&self, kind: DiagnosticKind) -> Option<Severity> {
        match self.diagnostics.get(&kind) {
            Some(configured) => *configured,
            None => Some(Severity::Warning),
        }
    }
}

/// Starter contents written by `apigraph init`.
pub fn default_config_toml() -> String {
    let mut out = String::new();
    out.push_str("# apigraph configuration\n");
    out.push_str("# package_name = \"my-package\"\n");
    out.push_str("include_forgotten_exports = false\n");
    out.push_str("reserved_names = []\n\n");
    out.push_str("[diagnostics]\n");
    for kind in DiagnosticKind::ALL {
        out.push_str(&format!("\"{}\" = \"warning\"\n", kind.message_id()));
    }
    out
}
