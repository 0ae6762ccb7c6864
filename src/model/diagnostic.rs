use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A property has a setter but no getter.
    MissingGetter,
    /// Documentation was written on the setter half of an accessor pair.
    SetterWithDocs,
    ExtraReleaseTag,
    PreapprovedUnsupportedType,
    PreapprovedBadReleaseTag,
    MissingReleaseTag,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub symbol: String,
    pub module: Option<String>,
    pub line: Option<usize>,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 6] = [
        DiagnosticKind::MissingGetter,
        DiagnosticKind::SetterWithDocs,
        DiagnosticKind::ExtraReleaseTag,
        DiagnosticKind::PreapprovedUnsupportedType,
        DiagnosticKind::PreapprovedBadReleaseTag,
        DiagnosticKind::MissingReleaseTag,
    ];

    /// Stable identifier used in configuration files and reports.
    pub fn message_id(self) -> &'static str {
        match self {
            DiagnosticKind::MissingGetter => "ae-missing-getter",
            DiagnosticKind::SetterWithDocs => "ae-setter-with-docs",
            DiagnosticKind::ExtraReleaseTag => "ae-extra-release-tag",
            DiagnosticKind::PreapprovedUnsupportedType => "ae-preapproved-unsupported-type",
            DiagnosticKind::PreapprovedBadReleaseTag => "ae-preapproved-bad-release-tag",
            DiagnosticKind::MissingReleaseTag => "ae-missing-release-tag",
        }
    }

    pub fn from_message_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.message_id() == id)
    }
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, message: String, location: Location) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message,
            location: Some(location),
        }
    }

    pub fn missing_getter(property: &str, location: Location) -> Self {
        Self::new(
            DiagnosticKind::MissingGetter,
            format!("The property \"{}\" has a setter but no getter.", property),
            location,
        )
    }

    pub fn setter_with_docs(property: &str, location: Location) -> Self {
        Self::new(
            DiagnosticKind::SetterWithDocs,
            format!(
                "The doc comment for the property \"{}\" must appear on the getter, not the setter.",
                property
            ),
            location,
        )
    }

    pub fn extra_release_tag(location: Location) -> Self {
        Self::new(
            DiagnosticKind::ExtraReleaseTag,
            "The doc comment should not contain more than one release tag".to_string(),
            location,
        )
    }

    pub fn preapproved_unsupported_type(name: &str, location: Location) -> Self {
        Self::new(
            DiagnosticKind::PreapprovedUnsupportedType,
            format!(
                "The @preapproved tag cannot be applied to \"{}\" because it is not a supported declaration type",
                name
            ),
            location,
        )
    }

    pub fn preapproved_bad_release_tag(name: &str, location: Location) -> Self {
        Self::new(
            DiagnosticKind::PreapprovedBadReleaseTag,
            format!(
                "The @preapproved tag cannot be applied to \"{}\" without an @internal release tag",
                name
            ),
            location,
        )
    }

    pub fn missing_release_tag(entity: &str, location: Location) -> Self {
        Self::new(
            DiagnosticKind::MissingReleaseTag,
            format!(
                "\"{}\" is part of the package's API, but it is missing a release tag (@alpha, @beta, @public, or @internal)",
                entity
            ),
            location,
        )
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}
