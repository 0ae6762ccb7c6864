use crate::model::Severity;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "apigraph")]
#[command(about = "Extract the public API surface of a TypeScript declaration package")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Extract the API model and diagnostics from an entry declaration file
    Extract(ExtractArgs),

    /// Generate a starter .apigraph.toml configuration file
    Init(InitArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ExtractArgs {
    /// Entry point of the package (a .d.ts or .ts file)
    pub entry: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "markdown")]
    pub format: OutputFormat,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Configuration file (defaults to .apigraph.toml next to the entry)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Minimum severity of diagnostics shown in the markdown report
    #[arg(long, default_value = "info")]
    pub min_severity: Severity,
}

#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Directory to create the configuration in
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_defaults() {
        let cli = Cli::try_parse_from(["apigraph", "extract", "index.d.ts"]).unwrap();
        let Command::Extract(args) = cli.command else {
            panic!("expected extract command");
        };
        assert_eq!(args.entry, PathBuf::from("index.d.ts"));
        assert_eq!(args.format, OutputFormat::Markdown);
        assert_eq!(args.min_severity, Severity::Info);
        assert!(args.output.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_extract_flags() {
        let cli = Cli::try_parse_from([
            "apigraph",
            "extract",
            "lib/index.d.ts",
            "--format",
            "json",
            "-o",
            "api.json",
            "--config",
            "cfg.toml",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Extract(args) = cli.command else {
            panic!("expected extract command");
        };
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.output, Some(PathBuf::from("api.json")));
        assert_eq!(args.config, Some(PathBuf::from("cfg.toml")));
    }

    #[test]
    fn test_init_default_path() {
        let cli = Cli::try_parse_from(["apigraph", "init"]).unwrap();
        let Command::Init(args) = cli.command else {
            panic!("expected init command");
        };
        assert_eq!(args.path, PathBuf::from("."));
    }
}
