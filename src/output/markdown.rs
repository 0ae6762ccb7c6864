use crate::collector::ReleaseTag;
use crate::model::{ApiItem, ExtractionResult, Severity};
use crate::output::OutputFormatter;
use std::io::Write;

/// API report: one section per release tag, each item rendered as its
/// signature, followed by the diagnostics.
pub struct MarkdownOutput {
    pub min_severity: Severity,
}

impl MarkdownOutput {
    pub fn new(min_severity: Severity) -> Self {
        Self { min_severity }
    }

    fn write_item<W: Write>(&self, writer: &mut W, item: &ApiItem, depth: usize) -> std::io::Result<()> {
        let indent = "  ".repeat(depth);
        let signature = item.excerpt.text();
        let signature = signature.trim();
        if signature.is_empty() {
            writeln!(writer, "{}- `{}` ({})", indent, item.name, item.kind)?;
        } else {
            let first_line = signature.lines().next().unwrap_or(signature);
            writeln!(writer, "{}- `{}`", indent, first_line)?;
        }
        if item.docs.is_deprecated() {
            writeln!(writer, "{}  *(deprecated)*", indent)?;
        }
        if let Some(summary) = item.docs.summary() {
            writeln!(writer, "{}  {}", indent, summary)?;
        }
        for member in &item.members {
            self.write_item(writer, member, depth + 1)?;
        }
        Ok(())
    }
}

impl Default for MarkdownOutput {
    fn default() -> Self {
        Self::new(Severity::Info)
    }
}

const SECTIONS: [(ReleaseTag, &str); 4] = [
    (ReleaseTag::Public, "Public"),
    (ReleaseTag::Beta, "Beta"),
    (ReleaseTag::Alpha, "Alpha"),
    (ReleaseTag::Internal, "Internal"),
];

impl OutputFormatter for MarkdownOutput {
    fn format<W: Write>(&self, result: &ExtractionResult, writer: &mut W) -> std::io::Result<()> {
        let package = &result.package;
        writeln!(writer, "# API Report: {}\n", package.name)?;

        if package.members.is_empty() {
            writeln!(writer, "No exported API items.\n")?;
        }

        for (tag, title) in SECTIONS {
            let items: Vec<_> = package
                .members
                .iter()
                .filter(|item| item.release.release_tag == tag)
                .collect();
            if items.is_empty() {
                continue;
            }
            writeln!(writer, "## {}\n", title)?;
            for item in items {
                self.write_item(writer, item, 0)?;
            }
            writeln!(writer)?;
        }

        let diagnostics: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.severity >= self.min_severity)
            .collect();

        if diagnostics.is_empty() {
            writeln!(writer, "## No Diagnostics\n")?;
            return Ok(());
        }

        writeln!(writer, "## Diagnostics\n")?;
        for diagnostic in diagnostics {
            let marker = match diagnostic.severity {
                Severity::Error => "🔴",
                Severity::Warning => "🟡",
                Severity::Info => "🔵",
            };
            write!(
                writer,
                "- {} `{}` {}",
                marker,
                diagnostic.kind.message_id(),
                diagnostic.message
            )?;
            if let Some(location) = &diagnostic.location {
                match (&location.module, location.line) {
                    (Some(module), Some(line)) => write!(writer, " ({}:{})", module, line)?,
                    (Some(module), None) => write!(writer, " ({})", module)?,
                    _ => {}
                }
            }
            writeln!(writer)?;
        }
        writeln!(writer)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excerpt::Excerpt;
    use crate::front_end::DeclarationKind;
    use crate::model::{
        ApiModifiers, ApiPackage, Diagnostic, DocInfo, Location, ReleaseInfo,
    };

    fn item(name: &str, tag: ReleaseTag) -> ApiItem {
        ApiItem {
            kind: DeclarationKind::Class,
            name: name.to_string(),
            canonical_reference: format!("pkg!{}:class", name),
            overload_index: None,
            release: ReleaseInfo {
                release_tag: tag,
                ..ReleaseInfo::default()
            },
            docs: DocInfo::default(),
            modifiers: ApiModifiers::default(),
            excerpt: Excerpt::default(),
            members: Vec::new(),
        }
    }

    fn render(result: &ExtractionResult, min_severity: Severity) -> String {
        let mut buffer = Vec::new();
        MarkdownOutput::new(min_severity)
            .format(result, &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_items_grouped_by_release_tag() {
        let result = ExtractionResult {
            package: ApiPackage {
                name: "pkg".to_string(),
                canonical_reference: "pkg!".to_string(),
                members: vec![item("Stable", ReleaseTag::Public), item("Preview", ReleaseTag::Beta)],
            },
            diagnostics: Vec::new(),
        };

        let report = render(&result, Severity::Info);
        let public = report.find("## Public").unwrap();
        let beta = report.find("## Beta").unwrap();
        assert!(public < beta);
        assert!(report.contains("`Stable` (class)"));
        assert!(!report.contains("## Alpha"));
        assert!(report.contains("## No Diagnostics"));
    }

    #[test]
    fn test_diagnostics_respect_min_severity() {
        let location = Location {
            symbol: "Widget".to_string(),
            module: Some("index".to_string()),
            line: Some(4),
        };
        let result = ExtractionResult {
            package: ApiPackage {
                name: "pkg".to_string(),
                canonical_reference: "pkg!".to_string(),
                members: Vec::new(),
            },
            diagnostics: vec![Diagnostic::missing_release_tag("Widget", location)],
        };

        let report = render(&result, Severity::Info);
        assert!(report.contains("ae-missing-release-tag"));
        assert!(report.contains("(index:4)"));

        let report = render(&result, Severity::Error);
        assert!(report.contains("## No Diagnostics"));
    }
}
