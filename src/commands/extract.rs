use crate::api;
use crate::cli::{ExtractArgs, OutputFormat};
use crate::fs::{FileSystem, default_fs};
use crate::model::{ExtractionResult, Severity};
use crate::output::{JsonOutput, MarkdownOutput, OutputFormatter};
use crate::style;
use std::io::{self, Write};

use super::CommandContext;

pub fn cmd_extract(args: ExtractArgs) -> i32 {
    cmd_extract_with_fs(args, default_fs())
}

pub fn cmd_extract_with_fs(args: ExtractArgs, fs: &dyn FileSystem) -> i32 {
    let ctx = match CommandContext::new(&args.entry, args.config.as_deref()) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    let result = match api::extract(&ctx.entry, &ctx.config) {
        Ok(result) => result,
        Err(e) => {
            style::error(&format!("Extraction failed: {}", e));
            return 1;
        }
    };

    let mut buffer = Vec::new();
    let format_result = match args.format {
        OutputFormat::Markdown => MarkdownOutput::new(args.min_severity).format(&result, &mut buffer),
        OutputFormat::Json => JsonOutput::new().format(&result, &mut buffer),
    };
    if let Err(e) = format_result {
        style::error(&format!("Failed to format output: {}", e));
        return 1;
    }
    let rendered = String::from_utf8_lossy(&buffer);

    let write_result = match &args.output {
        Some(path) => fs.write(path, &rendered),
        None => io::stdout().write_all(rendered.as_bytes()),
    };
    if let Err(e) = write_result {
        style::error(&format!("Failed to write output: {}", e));
        return 1;
    }

    if let Some(path) = &args.output {
        style::success(&format!("Wrote API model to {}", style::path(path)));
        print_summary(&result);
    }

    // Exit code 1 only for error-severity diagnostics, so warnings stay
    // informational in CI.
    if result.has_errors() { 1 } else { 0 }
}

fn print_summary(result: &ExtractionResult) {
    style::section("Summary");
    println!("{}", style::metric("items", result.package.walk().len()));
    println!("{}", style::metric("errors", result.count(Severity::Error)));
    println!("{}", style::metric("warnings", result.count(Severity::Warning)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE_NAME;
    use crate::fs::mock::MockFs;
    use std::path::{Path, PathBuf};

    fn extract_args(entry: &Path, format: OutputFormat) -> ExtractArgs {
        ExtractArgs {
            entry: entry.to_path_buf(),
            format,
            output: Some(PathBuf::from("out/api")),
            config: None,
            min_severity: Severity::Info,
        }
    }

    fn write_entry(dir: &Path, source: &str) -> PathBuf {
        let entry = dir.join("index.d.ts");
        std::fs::write(&entry, source).unwrap();
        entry
    }

    #[test]
    fn test_json_written_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_entry(
            dir.path(),
            "/** @public */\nexport declare function greet(name: string): string;\n",
        );
        let fs = MockFs::new();

        let code = cmd_extract_with_fs(extract_args(&entry, OutputFormat::Json), &fs);
        assert_eq!(code, 0);

        let written = fs.get("out/api").expect("output should be written");
        let json: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(json["package"]["name"], "index");
        assert_eq!(json["package"]["members"][0]["name"], "greet");
    }

    #[test]
    fn test_error_diagnostics_set_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_entry(dir.path(), "export declare const VERSION: string;\n");
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[diagnostics]\n\"ae-missing-release-tag\" = \"error\"\n",
        )
        .unwrap();
        let fs = MockFs::new();

        let code = cmd_extract_with_fs(extract_args(&entry, OutputFormat::Markdown), &fs);
        assert_eq!(code, 1);
        let report = fs.get("out/api").unwrap();
        assert!(report.contains("ae-missing-release-tag"), "report: {}", report);
    }

    #[test]
    fn test_parse_failure_exits_nonzero() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write_entry(dir.path(), "export declare class {{{\n");
        let fs = MockFs::new();

        let code = cmd_extract_with_fs(extract_args(&entry, OutputFormat::Json), &fs);
        assert_eq!(code, 1);
        assert!(fs.get("out/api").is_none());
    }
}
