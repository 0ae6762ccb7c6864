use crate::model::{ApiPackage, ExtractionResult, Location};
use crate::output::OutputFormatter;
use serde::Serialize;
use std::io::Write;

pub struct JsonOutput;

impl JsonOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonResult<'a> {
    package: &'a ApiPackage,
    diagnostics: Vec<JsonDiagnostic<'a>>,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    id: &'static str,
    severity: String,
    message: &'a str,
    location: Option<&'a Location>,
}

impl OutputFormatter for JsonOutput {
    fn format<W: Write>(&self, result: &ExtractionResult, writer: &mut W) -> std::io::Result<()> {
        let json_result = JsonResult {
            package: &result.package,
            diagnostics: result
                .diagnostics
                .iter()
                .map(|d| JsonDiagnostic {
                    id: d.kind.message_id(),
                    severity: d.severity.to_string(),
                    message: &d.message,
                    location: d.location.as_ref(),
                })
                .collect(),
        };

        let json = serde_json::to_string_pretty(&json_result).map_err(std::io::Error::other)?;

        writeln!(writer, "{}", json)
    }
}
