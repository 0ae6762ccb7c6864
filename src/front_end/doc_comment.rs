//! A small TSDoc-style tag parser.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModifierTag {
    Public,
    Beta,
    Alpha,
    Internal,
    Override,
    Sealed,
    Virtual,
    EventProperty,
    Preapproved,
    Readonly,
}

impl ModifierTag {
    fn from_tag_name(name: &str) -> Option<Self> {
        let tag = match name {
            "public" => ModifierTag::Public,
            "beta" => ModifierTag::Beta,
            "alpha" => ModifierTag::Alpha,
            "internal" => ModifierTag::Internal,
            "override" => ModifierTag::Override,
            "sealed" => ModifierTag::Sealed,
            "virtual" => ModifierTag::Virtual,
            "eventProperty" => ModifierTag::EventProperty,
            "preapproved" => ModifierTag::Preapproved,
            "readonly" => ModifierTag::Readonly,
            _ => return None,
        };
        Some(tag)
    }
}

/// A block tag other than the modifiers, e.g. `@example`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocBlock {
    pub tag: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocComment {
    pub summary: String,
    pub remarks: Option<String>,
    pub deprecated: Option<String>,
    pub params: Vec<DocBlock>,
    pub returns: Option<String>,
    /// In order of appearance, duplicates preserved.
    pub modifiers: Vec<ModifierTag>,
    pub custom_blocks: Vec<DocBlock>,
}

impl DocComment {
    pub fn has(&self, tag: ModifierTag) -> bool {
        self.modifiers.contains(&tag)
    }
}

enum Section {
    Summary,
    Remarks,
    Deprecated,
    Param(usize),
    Returns,
    Custom(usize),
}

/// Parse the text of a `/** ... */` comment. Returns `None` for anything that
/// is not a doc comment.
pub fn parse_doc_comment(text: &str) -> Option<DocComment> {
    let body = text.trim().strip_prefix("/**")?.strip_suffix("*/")?;

    let mut doc = DocComment::default();
    let mut section = Section::Summary;

    for raw_line in body.lines() {
        let line = raw_line.trim();
        let line = line.strip_prefix('*').map(str::trim_start).unwrap_or(line);

        let mut rest = line;
        let mut content = String::new();
        while !rest.is_empty() {
            let Some(at) = find_tag(rest) else {
                content.push_str(rest);
                break;
            };
            content.push_str(&rest[..at]);
            let after = &rest[at + 1..];
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..end];
            rest = after[end..].trim_start();

            if let Some(modifier) = ModifierTag::from_tag_name(name) {
                doc.modifiers.push(modifier);
                continue;
            }

            flush(&mut doc, &section, &content);
            content.clear();
            section = match name {
                "remarks" => Section::Remarks,
                "deprecated" => {
                    doc.deprecated.get_or_insert_with(String::new);
                    Section::Deprecated
                }
                "returns" => Section::Returns,
                "param" => {
                    let (param, text) = split_param(rest);
                    doc.params.push(DocBlock {
                        tag: param.to_string(),
                        text: String::new(),
                    });
                    rest = text;
                    Section::Param(doc.params.len() - 1)
                }
                _ => {
                    doc.custom_blocks.push(DocBlock {
                        tag: format!("@{}", name),
                        text: String::new(),
                    });
                    Section::Custom(doc.custom_blocks.len() - 1)
                }
            };
        }
        flush(&mut doc, &section, &content);
    }

    doc.summary = doc.summary.trim().to_string();
    Some(doc)
}

/// Position of the next `@tag` that starts a word. Inline `{@link}` tags and
/// email addresses stay in the text.
fn find_tag(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len()).find(|&i| {
        bytes[i] == b'@'
            && (i == 0 || bytes[i - 1].is_ascii_whitespace())
            && bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic())
    })
}

fn split_param(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| c.is_whitespace() || c == '-')
        .unwrap_or(text.len());
    let name = &text[..end];
    let remainder = text[end..].trim_start();
    let remainder = remainder.strip_prefix('-').unwrap_or(remainder).trim_start();
    (name, remainder)
}

fn flush(doc: &mut DocComment, section: &Section, content: &str) {
    let content = content.trim();
    if content.is_empty() {
        return;
    }
    let target = match section {
        Section::Summary => &mut doc.summary,
        Section::Remarks => doc.remarks.get_or_insert_with(String::new),
        Section::Deprecated => doc.deprecated.get_or_insert_with(String::new),
        Section::Returns => doc.returns.get_or_insert_with(String::new),
        Section::Param(i) => &mut doc.params[*i].text,
        Section::Custom(i) => &mut doc.custom_blocks[*i].text,
    };
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(content);
}
