//! The front-end contract consumed by the collector.
//!
//! A front end turns declaration files into symbols, declarations and
//! per-module export tables. The engine never parses source text itself; it
//! only reads the immutable arena exposed through [`FrontEnd`].

mod doc_comment;
mod program;
mod typescript;

pub use doc_comment::{DocBlock, DocComment, ModifierTag, parse_doc_comment};
pub use program::{DeclarationSpec, Program, ProgramBuilder};
pub use typescript::TypeScriptLoader;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontEndError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Cannot resolve import \"{specifier}\" from {from}")]
    UnresolvedImport { specifier: String, from: PathBuf },
    #[error("Module \"{module}\" exports \"{name}\" more than once")]
    DuplicateExport { module: String, name: String },
}

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(ModuleId);
arena_id!(SymbolId);
arena_id!(DeclarationId);
arena_id!(NamespaceImportId);

/// A uniquely identified thing that may appear in the output model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    Symbol(SymbolId),
    NamespaceImport(NamespaceImportId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Plain,
    /// `extends` / `implements`
    Inheritance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityReference {
    pub target: Entity,
    pub kind: ReferenceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationKind {
    Class,
    Interface,
    Enum,
    EnumMember,
    Namespace,
    Function,
    Method,
    Constructor,
    Property,
    GetAccessor,
    SetAccessor,
    Variable,
    TypeAlias,
    CallSignature,
    ConstructSignature,
    IndexSignature,
}

impl DeclarationKind {
    /// Kinds that own nested member declarations.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            DeclarationKind::Class
                | DeclarationKind::Interface
                | DeclarationKind::Enum
                | DeclarationKind::Namespace
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeclarationKind::Class => "class",
            DeclarationKind::Interface => "interface",
            DeclarationKind::Enum => "enum",
            DeclarationKind::EnumMember => "member",
            DeclarationKind::Namespace => "namespace",
            DeclarationKind::Function => "function",
            DeclarationKind::Method => "method",
            DeclarationKind::Constructor => "constructor",
            DeclarationKind::Property => "member",
            DeclarationKind::GetAccessor => "member",
            DeclarationKind::SetAccessor => "member",
            DeclarationKind::Variable => "var",
            DeclarationKind::TypeAlias => "type",
            DeclarationKind::CallSignature => "call",
            DeclarationKind::ConstructSignature => "new",
            DeclarationKind::IndexSignature => "index",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub private: bool,
    pub protected: bool,
    pub is_static: bool,
    pub readonly: bool,
    pub is_abstract: bool,
    pub optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Text,
}

/// One lexical token of a declaration's signature text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceToken {
    pub text: String,
    pub kind: TokenKind,
}

impl SourceToken {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: TokenKind::Text,
        }
    }

    pub fn identifier(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: TokenKind::Identifier,
        }
    }
}

/// The syntactic role of a sub-expression inside a declaration's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxRole {
    Extends,
    /// One entry of an interface's `extends` list.
    ExtendsType(usize),
    Implements(usize),
    ReturnType,
    ParameterType(usize),
    TypeParameterConstraint(usize),
    TypeParameterDefault(usize),
    /// Property, variable, or type alias right-hand side.
    Type,
}

/// A sub-expression of the signature, as a half-open range of source tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxSpan {
    pub role: SyntaxRole,
    pub tokens: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub path: Option<PathBuf>,
    pub exports: Vec<(String, Entity)>,
}

#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub name: String,
    pub parent: Option<SymbolId>,
    pub declarations: Vec<DeclarationId>,
    /// Set for symbols imported from another package.
    pub external_package: Option<String>,
}

impl SymbolInfo {
    pub fn is_external(&self) -> bool {
        self.external_package.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct DeclarationInfo {
    pub symbol: SymbolId,
    pub module: Option<ModuleId>,
    pub parent: Option<DeclarationId>,
    pub children: Vec<DeclarationId>,
    pub kind: DeclarationKind,
    pub modifiers: Modifiers,
    pub parameters: Vec<Parameter>,
    pub type_parameters: Vec<String>,
    pub references: Vec<EntityReference>,
    pub doc_comment: Option<DocComment>,
    pub tokens: Vec<SourceToken>,
    /// Entity each identifier token resolves to, keyed by token index.
    pub resolutions: Vec<(usize, Entity)>,
    pub spans: Vec<SyntaxSpan>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct NamespaceImportInfo {
    pub name: String,
    pub module: ModuleId,
}

/// Read-only view of a parsed program.
pub trait FrontEnd {
    fn package_name(&self) -> &str;

    fn entry_module(&self) -> ModuleId;

    fn module(&self, id: ModuleId) -> &ModuleInfo;

    /// Exported name to entity, in declaration order.
    fn export_table(&self, module: ModuleId) -> &[(String, Entity)] {
        &self.module(module).exports
    }

    fn symbol(&self, id: SymbolId) -> &SymbolInfo;

    fn declaration(&self, id: DeclarationId) -> &DeclarationInfo;

    fn namespace_import(&self, id: NamespaceImportId) -> &NamespaceImportInfo;

    fn entity_references(&self, declaration: DeclarationId) -> &[EntityReference] {
        &self.declaration(declaration).references
    }

    fn parse_doc_comment(&self, declaration: DeclarationId) -> Option<&DocComment> {
        self.declaration(declaration).doc_comment.as_ref()
    }

    fn declaration_kind(&self, declaration: DeclarationId) -> DeclarationKind {
        self.declaration(declaration).kind
    }

    fn modifier_flags(&self, declaration: DeclarationId) -> Modifiers {
        self.declaration(declaration).modifiers
    }

    fn is_optional_parameter(&self, declaration: DeclarationId, index: usize) -> bool {
        self.declaration(declaration)
            .parameters
            .get(index)
            .is_some_and(|p| p.optional)
    }

    fn resolve_identifier(&self, declaration: DeclarationId, token: usize) -> Option<Entity> {
        self.declaration(declaration)
            .resolutions
            .iter()
            .find(|(index, _)| *index == token)
            .map(|(_, entity)| *entity)
    }

    fn global_name_reserved(&self, name: &str) -> bool;

    fn entity_local_name(&self, entity: Entity) -> &str {
        match entity {
            Entity::Symbol(id) => &self.symbol(id).name,
            Entity::NamespaceImport(id) => &self.namespace_import(id).name,
        }
    }

    /// The outermost containing symbol (the symbol itself when it is a root).
    fn root_symbol(&self, mut id: SymbolId) -> SymbolId {
        while let Some(parent) = self.symbol(id).parent {
            id = parent;
        }
        id
    }
}
