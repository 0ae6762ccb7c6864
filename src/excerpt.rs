//! Signature excerpts: a declaration's text as a flat token list in which
//! identifiers that resolve to known entities become reference tokens.

use crate::front_end::{DeclarationId, Entity, FrontEnd, SyntaxRole, TokenKind};
use serde::Serialize;
use std::collections::HashSet;

/// Maps an entity to the key other items use to cross-reference it.
pub trait ReferenceResolver {
    fn canonical_reference(&self, entity: Entity) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExcerptTokenKind {
    Content,
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcerptToken {
    pub kind: ExcerptTokenKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_reference: Option<String>,
}

impl ExcerptToken {
    fn content(text: &str) -> Self {
        Self {
            kind: ExcerptTokenKind::Content,
            text: text.to_string(),
            canonical_reference: None,
        }
    }
}

/// Half-open `[start, end)` token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedRange {
    pub name: String,
    #[serde(flatten)]
    pub range: TokenRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Excerpt {
    pub tokens: Vec<ExcerptToken>,
    pub ranges: Vec<NamedRange>,
}

impl Excerpt {
    pub fn range(&self, name: &str) -> Option<TokenRange> {
        self.ranges
            .iter()
            .find(|named| named.name == name)
            .map(|named| named.range)
    }

    pub fn text(&self) -> String {
        self.text_of(TokenRange {
            start: 0,
            end: self.tokens.len(),
        })
    }

    pub fn text_of(&self, range: TokenRange) -> String {
        self.tokens[range.start..range.end]
            .iter()
            .map(|token| token.text.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A sub-expression to record as a named range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcerptCapture {
    pub name: String,
    pub role: SyntaxRole,
}

impl ExcerptCapture {
    pub fn new(name: impl Into<String>, role: SyntaxRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

pub struct ExcerptBuilder<'a> {
    front_end: &'a dyn FrontEnd,
    resolver: &'a dyn ReferenceResolver,
}

impl<'a> ExcerptBuilder<'a> {
    pub fn new(front_end: &'a dyn FrontEnd, resolver: &'a dyn ReferenceResolver) -> Self {
        Self {
            front_end,
            resolver,
        }
    }

    pub fn build_excerpt(&self, declaration: DeclarationId, captures: &[ExcerptCapture]) -> Excerpt {
        let mut excerpt = Excerpt::default();
        self.append_declaration(&mut excerpt, declaration, captures);
        excerpt
    }

    /// Concatenate the declarations of one merged API item (primary first,
    /// then its ancillary declarations) separated by a blank line.
    pub fn build_item_excerpt(&self, parts: &[(DeclarationId, &[ExcerptCapture])]) -> Excerpt {
        let mut excerpt = Excerpt::default();
        for (position, (declaration, captures)) in parts.iter().enumerate() {
            if position > 0 {
                append_blank_line(&mut excerpt);
            }
            self.append_declaration(&mut excerpt, *declaration, captures);
        }
        excerpt
    }

    fn append_declaration(
        &self,
        excerpt: &mut Excerpt,
        declaration: DeclarationId,
        captures: &[ExcerptCapture],
    ) {
        let info = self.front_end.declaration(declaration);
        let source = &info.tokens;

        let spans: Vec<(&str, usize, usize)> = captures
            .iter()
            .filter_map(|capture| {
                let span = info.spans.iter().find(|span| span.role == capture.role)?;
                let end = span.tokens.end.min(source.len());
                let start = span.tokens.start.min(end);
                Some((capture.name.as_str(), start, end))
            })
            .collect();
        // Captured spans must start and end on token boundaries.
        let boundaries: HashSet<usize> = spans
            .iter()
            .flat_map(|&(_, start, end)| [start, end])
            .collect();

        // Excerpt index of the token that starts at each source index.
        let mut positions = Vec::with_capacity(source.len() + 1);
        let mut can_merge = false;

        for (index, token) in source.iter().enumerate() {
            let reference = match token.kind {
                TokenKind::Identifier => self
                    .front_end
                    .resolve_identifier(declaration, index)
                    .and_then(|entity| self.resolver.canonical_reference(entity)),
                TokenKind::Text => None,
            };

            if let Some(canonical_reference) = reference {
                positions.push(excerpt.tokens.len());
                excerpt.tokens.push(ExcerptToken {
                    kind: ExcerptTokenKind::Reference,
                    text: token.text.clone(),
                    canonical_reference: Some(canonical_reference),
                });
                can_merge = false;
                continue;
            }

            if can_merge && !boundaries.contains(&index) {
                if let Some(last) = excerpt.tokens.last_mut() {
                    last.text.push_str(&token.text);
                    positions.push(excerpt.tokens.len() - 1);
                    continue;
                }
            }
            positions.push(excerpt.tokens.len());
            excerpt.tokens.push(ExcerptToken::content(&token.text));
            can_merge = true;
        }
        positions.push(excerpt.tokens.len());

        for (name, start, end) in spans {
            excerpt.ranges.push(NamedRange {
                name: name.to_string(),
                range: TokenRange {
                    start: positions[start],
                    end: positions[end],
                },
            });
        }
    }
}

fn append_blank_line(excerpt: &mut Excerpt) {
    let ends_with_newline = excerpt
        .tokens
        .last()
        .is_some_and(|token| token.text.ends_with('\n'));
    let newlines = if ends_with_newline { "\n" } else { "\n\n" };
    excerpt.tokens.push(ExcerptToken::content(newlines));
}
