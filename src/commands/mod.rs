mod extract;
mod init;

pub use extract::cmd_extract;
pub use init::cmd_init;

use crate::config::{CONFIG_FILE_NAME, Config};
use crate::style;
use std::path::{Path, PathBuf};

/// Resolved entry point and configuration shared by the commands.
pub struct CommandContext {
    pub entry: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// Resolve the entry file and load its configuration: the explicit
    /// `config_path` if given, otherwise `.apigraph.toml` beside the entry.
    /// Returns Err(exit_code) if setup fails.
    pub fn new(entry: &Path, config_path: Option<&Path>) -> Result<Self, i32> {
        let entry = match entry.canonicalize() {
            Ok(p) if p.is_file() => p,
            _ => {
                style::error(&format!("Could not resolve entry file: {}", style::path(entry)));
                return Err(1);
            }
        };

        let loaded = match config_path {
            Some(path) => Config::load_from(path),
            None => {
                let dir = entry.parent().unwrap_or_else(|| Path::new("."));
                Config::load(dir)
            }
        };
        let config = match loaded {
            Ok(config) => config,
            Err(e) => {
                style::error(&format!("Failed to load config: {}", e));
                style::hint(&format!(
                    "run `apigraph init` to generate a valid {}",
                    CONFIG_FILE_NAME
                ));
                return Err(1);
            }
        };

        Ok(Self { entry, config })
    }
}
