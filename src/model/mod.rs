mod api_item;
mod builder;
mod diagnostic;

pub use api_item::{ApiItem, ApiModifiers, ApiPackage, DocInfo, ReleaseInfo};
pub use builder::ModelBuilder;
pub use diagnostic::{Diagnostic, DiagnosticKind, Location, Severity};

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub package: ApiPackage,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExtractionResult {
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity == severity)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }
}
