use crate::collector::ReleaseTag;
use crate::excerpt::Excerpt;
use crate::front_end::{DeclarationKind, DocComment};
use serde::Serialize;

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPackage {
    pub name: String,
    pub canonical_reference: String,
    pub members: Vec<ApiItem>,
}

impl ApiPackage {
    pub fn find(&self, name: &str) -> Option<&ApiItem> {
        self.members.iter().find(|item| item.name == name)
    }

    /// Every item in the package, depth first.
    pub fn walk(&self) -> Vec<&ApiItem> {
        let mut items = Vec::new();
        for member in &self.members {
            member.collect(&mut items);
        }
        items
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiItem {
    pub kind: DeclarationKind,
    pub name: String,
    pub canonical_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overload_index: Option<usize>,
    #[serde(flatten)]
    pub release: ReleaseInfo,
    #[serde(flatten)]
    pub docs: DocInfo,
    #[serde(flatten)]
    pub modifiers: ApiModifiers,
    pub excerpt: Excerpt,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ApiItem>,
}

impl ApiItem {
    pub fn member(&self, name: &str) -> Option<&ApiItem> {
        self.members.iter().find(|item| item.name == name)
    }

    fn collect<'s>(&'s self, out: &mut Vec<&'s ApiItem>) {
        out.push(self);
        for member in &self.members {
            member.collect(out);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    pub release_tag: ReleaseTag,
    #[serde(skip_serializing_if = "is_false")]
    pub release_tag_same_as_parent: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_preapproved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_comment: Option<DocComment>,
}

impl DocInfo {
    pub fn summary(&self) -> Option<&str> {
        self.doc_comment
            .as_ref()
            .map(|doc| doc.summary.as_str())
            .filter(|summary| !summary.is_empty())
    }

    pub fn is_deprecated(&self) -> bool {
        self.doc_comment
            .as_ref()
            .is_some_and(|doc| doc.deprecated.is_some())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiModifiers {
    #[serde(skip_serializing_if = "is_false")]
    pub is_static: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_protected: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_readonly: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_abstract: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_optional: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_override: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_sealed: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_virtual: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_event_property: bool,
}
