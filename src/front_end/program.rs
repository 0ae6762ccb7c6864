use super::{
    DeclarationId, DeclarationInfo, DeclarationKind, DocComment, Entity, EntityReference,
    FrontEnd, FrontEndError, ModuleId, ModuleInfo, Modifiers, NamespaceImportId,
    NamespaceImportInfo, Parameter, ReferenceKind, SourceToken, SymbolId, SymbolInfo, SyntaxSpan,
    parse_doc_comment,
};
use std::collections::HashSet;
use std::path::PathBuf;

/// Arena-backed program produced by a loader or assembled with [`ProgramBuilder`].
#[derive(Debug, Clone)]
pub struct Program {
    package_name: String,
    entry: ModuleId,
    modules: Vec<ModuleInfo>,
    symbols: Vec<SymbolInfo>,
    declarations: Vec<DeclarationInfo>,
    namespace_imports: Vec<NamespaceImportInfo>,
    global_names: HashSet<String>,
}

impl Program {
    pub fn symbol_ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.symbols.len()).map(|i| SymbolId(i as u32))
    }

    /// Find a root-level symbol by name.
    pub fn find_symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbol_ids().find(|&id| {
            let symbol = &self.symbols[id.index()];
            symbol.parent.is_none() && symbol.name == name
        })
    }

    /// Find a member symbol by name under `parent`.
    pub fn find_member(&self, parent: SymbolId, name: &str) -> Option<SymbolId> {
        self.symbol_ids().find(|&id| {
            let symbol = &self.symbols[id.index()];
            symbol.parent == Some(parent) && symbol.name == name
        })
    }
}

impl FrontEnd for Program {
    fn package_name(&self) -> &str {
        &self.package_name
    }

    fn entry_module(&self) -> ModuleId {
        self.entry
    }

    fn module(&self, id: ModuleId) -> &ModuleInfo {
        &self.modules[id.index()]
    }

    fn symbol(&self, id: SymbolId) -> &SymbolInfo {
        &self.symbols[id.index()]
    }

    fn declaration(&self, id: DeclarationId) -> &DeclarationInfo {
        &self.declarations[id.index()]
    }

    fn namespace_import(&self, id: NamespaceImportId) -> &NamespaceImportInfo {
        &self.namespace_imports[id.index()]
    }

    fn global_name_reserved(&self, name: &str) -> bool {
        self.global_names.contains(name)
    }
}

/// Everything about a declaration except its place in the symbol tree.
#[derive(Debug, Clone)]
pub struct DeclarationSpec {
    pub kind: DeclarationKind,
    pub module: Option<ModuleId>,
    pub modifiers: Modifiers,
    pub doc_comment: Option<DocComment>,
    pub parameters: Vec<Parameter>,
    pub type_parameters: Vec<String>,
    pub line: usize,
}

impl DeclarationSpec {
    pub fn new(kind: DeclarationKind) -> Self {
        Self {
            kind,
            module: None,
            modifiers: Modifiers::default(),
            doc_comment: None,
            parameters: Vec::new(),
            type_parameters: Vec::new(),
            line: 0,
        }
    }

    /// Attach a doc comment given as raw `/** ... */` text.
    pub fn with_doc(mut self, text: &str) -> Self {
        self.doc_comment = parse_doc_comment(text);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_parameter(mut self, name: &str, optional: bool) -> Self {
        self.parameters.push(Parameter {
            name: name.to_string(),
            optional,
        });
        self
    }

    pub fn with_type_parameter(mut self, name: &str) -> Self {
        self.type_parameters.push(name.to_string());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn in_module(mut self, module: ModuleId) -> Self {
        self.module = Some(module);
        self
    }
}

pub struct ProgramBuilder {
    package_name: String,
    entry: Option<ModuleId>,
    modules: Vec<ModuleInfo>,
    symbols: Vec<SymbolInfo>,
    declarations: Vec<DeclarationInfo>,
    namespace_imports: Vec<NamespaceImportInfo>,
    global_names: HashSet<String>,
}

impl ProgramBuilder {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            entry: None,
            modules: Vec::new(),
            symbols: Vec::new(),
            declarations: Vec::new(),
            namespace_imports: Vec::new(),
            global_names: HashSet::new(),
        }
    }

    pub fn add_module(&mut self, name: impl Into<String>, path: Option<PathBuf>) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(ModuleInfo {
            name: name.into(),
            path,
            exports: Vec::new(),
        });
        id
    }

    pub fn set_entry(&mut self, module: ModuleId) {
        self.entry = Some(module);
    }

    pub fn add_symbol(&mut self, name: impl Into<String>, parent: Option<SymbolId>) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolInfo {
            name: name.into(),
            parent,
            declarations: Vec::new(),
            external_package: None,
        });
        id
    }

    /// A symbol imported from another package; it has no declarations here.
    pub fn add_external_symbol(
        &mut self,
        name: impl Into<String>,
        package: impl Into<String>,
    ) -> SymbolId {
        let id = self.add_symbol(name, None);
        self.symbols[id.index()].external_package = Some(package.into());
        id
    }

    pub fn add_declaration(
        &mut self,
        symbol: SymbolId,
        parent: Option<DeclarationId>,
        spec: DeclarationSpec,
    ) -> DeclarationId {
        let id = DeclarationId(self.declarations.len() as u32);
        self.declarations.push(DeclarationInfo {
            symbol,
            module: spec.module,
            parent,
            children: Vec::new(),
            kind: spec.kind,
            modifiers: spec.modifiers,
            parameters: spec.parameters,
            type_parameters: spec.type_parameters,
            references: Vec::new(),
            doc_comment: spec.doc_comment,
            tokens: Vec::new(),
            resolutions: Vec::new(),
            spans: Vec::new(),
            line: spec.line,
        });
        self.symbols[symbol.index()].declarations.push(id);
        if let Some(parent) = parent {
            self.declarations[parent.index()].children.push(id);
        }
        id
    }

    /// Declare a new root symbol with a single declaration.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        spec: DeclarationSpec,
    ) -> (SymbolId, DeclarationId) {
        let symbol = self.add_symbol(name, None);
        let declaration = self.add_declaration(symbol, None, spec);
        (symbol, declaration)
    }

    /// Declare a member of `parent`. Members sharing a name (overloads, accessor
    /// pairs) share one symbol.
    pub fn add_member(
        &mut self,
        parent: DeclarationId,
        name: &str,
        spec: DeclarationSpec,
    ) -> (SymbolId, DeclarationId) {
        let parent_symbol = self.declarations[parent.index()].symbol;
        let existing = (0..self.symbols.len()).map(|i| SymbolId(i as u32)).find(|id| {
            let symbol = &self.symbols[id.index()];
            symbol.parent == Some(parent_symbol) && symbol.name == name
        });
        let symbol = existing.unwrap_or_else(|| self.add_symbol(name, Some(parent_symbol)));
        let declaration = self.add_declaration(symbol, Some(parent), spec);
        (symbol, declaration)
    }

    pub fn add_reference(&mut self, declaration: DeclarationId, target: Entity, kind: ReferenceKind) {
        let references = &mut self.declarations[declaration.index()].references;
        let reference = EntityReference { target, kind };
        if !references.contains(&reference) {
            references.push(reference);
        }
    }

    /// Set the signature tokens. Every resolved identifier also becomes a plain
    /// reference unless it is already referenced.
    pub fn set_signature(
        &mut self,
        declaration: DeclarationId,
        tokens: Vec<SourceToken>,
        resolutions: Vec<(usize, Entity)>,
        spans: Vec<SyntaxSpan>,
    ) {
        for &(_, target) in &resolutions {
            let known = self.declarations[declaration.index()]
                .references
                .iter()
                .any(|r| r.target == target);
            if !known {
                self.add_reference(declaration, target, ReferenceKind::Plain);
            }
        }
        let info = &mut self.declarations[declaration.index()];
        info.tokens = tokens;
        info.resolutions = resolutions;
        info.spans = spans;
    }

    pub fn add_namespace_import(
        &mut self,
        name: impl Into<String>,
        module: ModuleId,
    ) -> NamespaceImportId {
        let id = NamespaceImportId(self.namespace_imports.len() as u32);
        self.namespace_imports.push(NamespaceImportInfo {
            name: name.into(),
            module,
        });
        id
    }

    pub fn export(
        &mut self,
        module: ModuleId,
        name: impl Into<String>,
        entity: Entity,
    ) -> Result<(), FrontEndError> {
        let name = name.into();
        let info = &mut self.modules[module.index()];
        if info.exports.iter().any(|(existing, _)| *existing == name) {
            return Err(FrontEndError::DuplicateExport {
                module: info.name.clone(),
                name,
            });
        }
        info.exports.push((name, entity));
        Ok(())
    }

    pub fn reserve_global(&mut self, name: impl Into<String>) {
        self.global_names.insert(name.into());
    }

    pub fn build(self) -> Program {
        let entry = self.entry.unwrap_or(ModuleId(0));
        Program {
            package_name: self.package_name,
            entry,
            modules: self.modules,
            symbols: self.symbols,
            declarations: self.declarations,
            namespace_imports: self.namespace_imports,
            global_names: self.global_names,
        }
    }
}
