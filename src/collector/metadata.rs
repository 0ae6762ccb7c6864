use crate::front_end::{DeclarationId, DocComment};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Release classification, ordered from least to most public.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum ReleaseTag {
    #[default]
    None,
    Internal,
    Alpha,
    Beta,
    Public,
}

impl ReleaseTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseTag::None => "none",
            ReleaseTag::Internal => "internal",
            ReleaseTag::Alpha => "alpha",
            ReleaseTag::Beta => "beta",
            ReleaseTag::Public => "public",
        }
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseTag::None => write!(f, "(none)"),
            other => write!(f, "@{}", other.as_str()),
        }
    }
}

/// Per-declaration state built before release tags are resolved.
#[derive(Debug, Clone, Default)]
pub struct DeclarationMetadata {
    pub doc_comment: Option<DocComment>,
    /// Folded into another declaration's API item (a setter into its getter).
    pub is_ancillary: bool,
    pub ancillary_declarations: Vec<DeclarationId>,
}

/// Resolved metadata for one API item. Ancillary declarations share the
/// instance of their primary declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiItemMetadata {
    pub declared_release_tag: ReleaseTag,
    pub effective_release_tag: ReleaseTag,
    pub release_tag_same_as_parent: bool,
    pub is_override: bool,
    pub is_sealed: bool,
    pub is_virtual: bool,
    pub is_event_property: bool,
    pub is_preapproved: bool,
    pub doc_comment: Option<DocComment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolMetadata {
    pub max_effective_release_tag: ReleaseTag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_tags_are_ordered() {
        assert!(ReleaseTag::None < ReleaseTag::Internal);
        assert!(ReleaseTag::Internal < ReleaseTag::Alpha);
        assert!(ReleaseTag::Alpha < ReleaseTag::Beta);
        assert!(ReleaseTag::Beta < ReleaseTag::Public);
        assert_eq!(ReleaseTag::Beta.to_string(), "@beta");
    }
}
