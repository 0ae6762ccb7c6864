//! Tree-sitter loader for TypeScript declaration files.
//!
//! Loading runs in four passes over the parsed files: read the entry and every
//! relative module it imports, declare symbols, resolve export tables (which
//! may chain through other modules), then tokenize signatures and resolve the
//! identifiers inside them.

use super::{
    DeclarationId, DeclarationKind, DeclarationSpec, Entity, FrontEndError, ModuleId, Modifiers,
    NamespaceImportId, Program, ProgramBuilder, ReferenceKind, SourceToken, SymbolId, SyntaxRole,
    SyntaxSpan,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};
use tree_sitter::{Node, Tree};

/// Define a thread-local parser with a given language.
/// Usage: `define_parser!(PARSER_NAME, language_fn)`
macro_rules! define_parser {
    ($name:ident, $language:expr) => {
        thread_local! {
            static $name: std::cell::RefCell<tree_sitter::Parser> = std::cell::RefCell::new({
                let mut parser = tree_sitter::Parser::new();
                parser.set_language(&$language.into()).expect(concat!("Failed to set ", stringify!($name), " language"));
                parser
            });
        }
    };
}

define_parser!(TS_PARSER, tree_sitter_typescript::LANGUAGE_TYPESCRIPT);

/// Export name used for `export default X`.
const DEFAULT_EXPORT: &str = "default";
/// Local name given to an anonymous `export default class`.
const ANONYMOUS_DEFAULT: &str = "_default";

/// Names declared by the standard TypeScript lib files.
const AMBIENT_GLOBALS: &[&str] = &[
    "Array",
    "ArrayBuffer",
    "ArrayLike",
    "Boolean",
    "DataView",
    "Date",
    "Error",
    "Exclude",
    "Extract",
    "Float32Array",
    "Float64Array",
    "Function",
    "InstanceType",
    "Int32Array",
    "Iterable",
    "IterableIterator",
    "Iterator",
    "JSON",
    "Map",
    "Math",
    "NonNullable",
    "Number",
    "Object",
    "Omit",
    "Parameters",
    "Partial",
    "Pick",
    "Promise",
    "PromiseLike",
    "Readonly",
    "ReadonlyArray",
    "ReadonlyMap",
    "ReadonlySet",
    "Record",
    "RegExp",
    "Required",
    "ReturnType",
    "Set",
    "String",
    "Symbol",
    "TypeError",
    "Uint8Array",
    "WeakMap",
    "WeakSet",
    "console",
    "globalThis",
    "undefined",
];

pub struct TypeScriptLoader {
    package_name: String,
}

impl TypeScriptLoader {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
        }
    }

    /// Load `entry` and every module reachable from it through relative
    /// imports or re-exports.
    #[instrument(skip(self), fields(entry = %entry.display()))]
    pub fn load(&self, entry: &Path) -> Result<Program, FrontEndError> {
        let mut builder = self.builder();
        let files = read_modules(&mut builder, entry)?;
        debug!(modules = files.len(), "loaded declaration files");
        build_program(builder, &files)
    }

    /// Load a single in-memory module. Relative imports are rejected.
    pub fn load_source(&self, name: &str, source: &str) -> Result<Program, FrontEndError> {
        let mut builder = self.builder();
        let path = PathBuf::from(name);
        let tree = parse_source(&path, source)?;
        if let Some(specifier) = module_specifiers(tree.root_node(), source)
            .into_iter()
            .find(|specifier| is_relative(specifier))
        {
            return Err(FrontEndError::UnresolvedImport {
                specifier,
                from: path,
            });
        }

        let module = builder.add_module(name, None);
        builder.set_entry(module);
        let files = vec![SourceFile {
            module,
            source: source.to_string(),
            tree,
            imports: HashMap::new(),
        }];
        build_program(builder, &files)
    }

    fn builder(&self) -> ProgramBuilder {
        let mut builder = ProgramBuilder::new(self.package_name.clone());
        for name in AMBIENT_GLOBALS {
            builder.reserve_global(*name);
        }
        builder
    }
}

struct SourceFile {
    module: ModuleId,
    source: String,
    tree: Tree,
    /// Relative specifier to the module it resolved to.
    imports: HashMap<String, ModuleId>,
}

fn build_program(builder: ProgramBuilder, files: &[SourceFile]) -> Result<Program, FrontEndError> {
    let mut loader = Loader::new(builder, files);
    loader.declare_all();
    loader.export_all()?;
    loader.resolve_signatures();
    Ok(loader.builder.build())
}

fn read_modules(
    builder: &mut ProgramBuilder,
    entry: &Path,
) -> Result<Vec<SourceFile>, FrontEndError> {
    let entry = entry.canonicalize()?;
    let root = entry.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut ids: HashMap<PathBuf, ModuleId> = HashMap::new();
    let mut queue = VecDeque::new();
    let entry_id = builder.add_module(module_name(&root, &entry), Some(entry.clone()));
    builder.set_entry(entry_id);
    ids.insert(entry.clone(), entry_id);
    queue.push_back((entry_id, entry));

    let mut files = Vec::new();
    while let Some((module, path)) = queue.pop_front() {
        let source = std::fs::read_to_string(&path)?;
        let tree = parse_source(&path, &source)?;

        let mut imports = HashMap::new();
        for specifier in module_specifiers(tree.root_node(), &source) {
            if !is_relative(&specifier) {
                continue;
            }
            let target = resolve_specifier(&path, &specifier)?;
            let target_id = match ids.get(&target) {
                Some(id) => *id,
                None => {
                    let id = builder.add_module(module_name(&root, &target), Some(target.clone()));
                    ids.insert(target.clone(), id);
                    queue.push_back((id, target));
                    id
                }
            };
            imports.insert(specifier, target_id);
        }

        debug!(path = %path.display(), imports = imports.len(), "parsed module");
        files.push(SourceFile {
            module,
            source,
            tree,
            imports,
        });
    }

    files.sort_by_key(|file| file.module);
    Ok(files)
}

fn parse_source(path: &Path, source: &str) -> Result<Tree, FrontEndError> {
    let tree = TS_PARSER
        .with(|parser| parser.borrow_mut().parse(source, None))
        .ok_or_else(|| FrontEndError::Parse {
            path: path.to_path_buf(),
            message: "parser produced no syntax tree".to_string(),
        })?;

    let error_line = first_error(tree.root_node()).map(|node| node.start_position().row + 1);
    if let Some(line) = error_line {
        return Err(FrontEndError::Parse {
            path: path.to_path_buf(),
            message: format!("syntax error at line {}", line),
        });
    }
    Ok(tree)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    children(node).into_iter().find_map(first_error)
}

/// Module specifiers of top-level imports and re-exports.
fn module_specifiers(root: Node<'_>, source: &str) -> Vec<String> {
    named_children(root)
        .into_iter()
        .filter(|node| matches!(node.kind(), "import_statement" | "export_statement"))
        .filter_map(|node| node.child_by_field_name("source"))
        .map(|node| string_literal(&source[node.start_byte()..node.end_byte()]))
        .collect()
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

fn resolve_specifier(from: &Path, specifier: &str) -> Result<PathBuf, FrontEndError> {
    let directory = from.parent().unwrap_or_else(|| Path::new(""));
    let base = directory.join(specifier.trim_end_matches(".js"));

    let mut candidates = Vec::new();
    for extension in [".d.ts", ".ts", ".tsx"] {
        let mut path = OsString::from(base.as_os_str());
        path.push(extension);
        candidates.push(PathBuf::from(path));
    }
    candidates.push(base.clone());
    candidates.push(base.join("index.d.ts"));
    candidates.push(base.join("index.ts"));

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .map(|candidate| candidate.canonicalize())
        .transpose()?
        .ok_or_else(|| FrontEndError::UnresolvedImport {
            specifier: specifier.to_string(),
            from: from.to_path_buf(),
        })
}

/// `lib/util.d.ts` relative to the entry directory becomes `lib/util`.
fn module_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let name = relative.to_string_lossy().replace('\\', "/");
    for suffix in [".d.ts", ".ts", ".tsx"] {
        if let Some(stem) = name.strip_suffix(suffix) {
            return stem.to_string();
        }
    }
    name
}

fn string_literal(text: &str) -> String {
    text.trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .to_string()
}

fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn last_named(node: Node<'_>) -> Option<Node<'_>> {
    named_children(node).last().copied()
}

fn has_keyword(node: Node<'_>, keyword: &str) -> bool {
    children(node)
        .iter()
        .any(|child| !child.is_named() && child.kind() == keyword)
}

#[derive(Debug, Clone)]
enum ImportBinding {
    Named { module: ModuleId, name: String },
    Namespace(ModuleId),
    External { package: String, name: String },
}

#[derive(Debug, Clone)]
enum ExportDirective {
    Entity { name: String, entity: Entity },
    Local { name: String, local: String },
    From { name: String, module: ModuleId, imported: String },
    Namespace { name: String, module: ModuleId },
    Star(ModuleId),
}

/// Lexical position of a declaration.
#[derive(Debug, Clone)]
struct Scope {
    module: ModuleId,
    parent: Option<(SymbolId, DeclarationId)>,
    /// Enclosing namespaces, outermost first.
    namespaces: Vec<SymbolId>,
    type_parameters: Vec<String>,
}

impl Scope {
    fn root(module: ModuleId) -> Self {
        Self {
            module,
            parent: None,
            namespaces: Vec::new(),
            type_parameters: Vec::new(),
        }
    }
}

/// A declaration whose signature is tokenized once every name is known.
struct Pending<'t> {
    declaration: DeclarationId,
    kind: DeclarationKind,
    node: Node<'t>,
    outer: Node<'t>,
    start: usize,
    end: usize,
    scope: Scope,
}

struct Loader<'t> {
    builder: ProgramBuilder,
    files: &'t [SourceFile],
    locals: Vec<HashMap<String, SymbolId>>,
    members: HashMap<(SymbolId, String), SymbolId>,
    bindings: Vec<HashMap<String, ImportBinding>>,
    directives: Vec<Vec<ExportDirective>>,
    exports: HashMap<ModuleId, Vec<(String, Entity)>>,
    resolving: HashSet<ModuleId>,
    namespace_imports: HashMap<(ModuleId, String), NamespaceImportId>,
    namespace_targets: HashMap<NamespaceImportId, ModuleId>,
    externals: HashMap<(String, String), SymbolId>,
    pending: Vec<Pending<'t>>,
}

impl<'t> Loader<'t> {
    fn new(builder: ProgramBuilder, files: &'t [SourceFile]) -> Self {
        Self {
            builder,
            files,
            locals: vec![HashMap::new(); files.len()],
            members: HashMap::new(),
            bindings: vec![HashMap::new(); files.len()],
            directives: vec![Vec::new(); files.len()],
            exports: HashMap::new(),
            resolving: HashSet::new(),
            namespace_imports: HashMap::new(),
            namespace_targets: HashMap::new(),
            externals: HashMap::new(),
            pending: Vec::new(),
        }
    }

    fn source(&self, module: ModuleId) -> &'t str {
        let files: &'t [SourceFile] = self.files;
        &files[module.index()].source
    }

    fn text(&self, module: ModuleId, node: Node<'_>) -> &'t str {
        &self.source(module)[node.start_byte()..node.end_byte()]
    }

    fn import_target(&self, module: ModuleId, specifier: &str) -> Option<ModuleId> {
        self.files[module.index()].imports.get(specifier).copied()
    }

    // Declaration pass

    fn declare_all(&mut self) {
        let files: &'t [SourceFile] = self.files;
        for file in files {
            let scope = Scope::root(file.module);
            for statement in named_children(file.tree.root_node()) {
                self.visit_statement(&scope, statement);
            }
        }
    }

    fn visit_statement(&mut self, scope: &Scope, node: Node<'t>) {
        match node.kind() {
            "import_statement" if scope.parent.is_none() => self.record_import(scope.module, node),
            "export_statement" => self.visit_export(scope, node),
            _ => {
                self.declare(scope, node, node);
            }
        }
    }

    fn record_import(&mut self, module: ModuleId, node: Node<'t>) {
        let Some(source) = node.child_by_field_name("source") else {
            return;
        };
        let specifier = string_literal(self.text(module, source));
        let target = self.import_target(module, &specifier);
        let Some(clause) = named_children(node)
            .into_iter()
            .find(|child| child.kind() == "import_clause")
        else {
            return;
        };

        let binding = |name: &str| match target {
            Some(module) => ImportBinding::Named {
                module,
                name: name.to_string(),
            },
            None => ImportBinding::External {
                package: specifier.clone(),
                name: name.to_string(),
            },
        };

        for part in named_children(clause) {
            match part.kind() {
                "identifier" => {
                    let local = self.text(module, part).to_string();
                    self.bindings[module.index()].insert(local, binding(DEFAULT_EXPORT));
                }
                "namespace_import" => {
                    let (Some(identifier), Some(target)) = (last_named(part), target) else {
                        continue;
                    };
                    let local = self.text(module, identifier).to_string();
                    self.bindings[module.index()].insert(local, ImportBinding::Namespace(target));
                }
                "named_imports" => {
                    for specifier in named_children(part) {
                        if specifier.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name) = specifier.child_by_field_name("name") else {
                            continue;
                        };
                        let imported = self.text(module, name);
                        let local = specifier
                            .child_by_field_name("alias")
                            .map_or(imported, |alias| self.text(module, alias));
                        self.bindings[module.index()].insert(local.to_string(), binding(imported));
                    }
                }
                _ => {}
            }
        }
    }

    fn visit_export(&mut self, scope: &Scope, node: Node<'t>) {
        let module = scope.module;
        let top_level = scope.parent.is_none();
        let is_default = has_keyword(node, "default");

        if let Some(declaration) = node.child_by_field_name("declaration") {
            let declared = self.declare(scope, declaration, node);
            if top_level {
                for (name, symbol) in declared {
                    let name = if is_default {
                        DEFAULT_EXPORT.to_string()
                    } else {
                        name
                    };
                    self.directives[module.index()].push(ExportDirective::Entity {
                        name,
                        entity: Entity::Symbol(symbol),
                    });
                }
            }
            return;
        }
        if !top_level {
            return;
        }

        if is_default {
            let Some(value) = node.child_by_field_name("value") else {
                return;
            };
            match value.kind() {
                "identifier" => {
                    let local = self.text(module, value).to_string();
                    self.directives[module.index()].push(ExportDirective::Local {
                        name: DEFAULT_EXPORT.to_string(),
                        local,
                    });
                }
                "class" => {
                    for (_, symbol) in self.declare(scope, value, node) {
                        self.directives[module.index()].push(ExportDirective::Entity {
                            name: DEFAULT_EXPORT.to_string(),
                            entity: Entity::Symbol(symbol),
                        });
                    }
                }
                other => debug!(kind = other, "skipping default export expression"),
            }
            return;
        }

        let specifier = node
            .child_by_field_name("source")
            .map(|source| string_literal(self.text(module, source)));
        let target = specifier
            .as_deref()
            .and_then(|specifier| self.import_target(module, specifier));
        let mut listed = false;

        for child in named_children(node) {
            match child.kind() {
                "export_clause" => {
                    listed = true;
                    for export in named_children(child) {
                        if export.kind() != "export_specifier" {
                            continue;
                        }
                        let Some(local) = export.child_by_field_name("name") else {
                            continue;
                        };
                        let local = string_literal(self.text(module, local));
                        let name = export
                            .child_by_field_name("alias")
                            .map_or_else(|| local.clone(), |alias| {
                                string_literal(self.text(module, alias))
                            });
                        let directive = match (&specifier, target) {
                            (None, _) => ExportDirective::Local { name, local },
                            (Some(_), Some(target)) => ExportDirective::From {
                                name,
                                module: target,
                                imported: local,
                            },
                            (Some(package), None) => {
                                let symbol = self.external_symbol(package, &local);
                                ExportDirective::Entity {
                                    name,
                                    entity: Entity::Symbol(symbol),
                                }
                            }
                        };
                        self.directives[module.index()].push(directive);
                    }
                }
                "namespace_export" => {
                    listed = true;
                    let (Some(identifier), Some(target)) = (last_named(child), target) else {
                        continue;
                    };
                    let name = string_literal(self.text(module, identifier));
                    self.directives[module.index()]
                        .push(ExportDirective::Namespace { name, module: target });
                }
                _ => {}
            }
        }

        if !listed && has_keyword(node, "*") {
            if let Some(target) = target {
                self.directives[module.index()].push(ExportDirective::Star(target));
            }
        }
    }

    /// Declare whatever `node` declares. Returns the declared names.
    fn declare(&mut self, scope: &Scope, node: Node<'t>, outer: Node<'t>) -> Vec<(String, SymbolId)> {
        match node.kind() {
            "ambient_declaration" | "expression_statement" => {
                let mut declared = Vec::new();
                for child in named_children(node) {
                    declared.extend(self.declare(scope, child, outer));
                }
                declared
            }
            "class_declaration" | "abstract_class_declaration" | "class" => {
                self.declare_container(scope, node, outer, DeclarationKind::Class)
            }
            "interface_declaration" => {
                self.declare_container(scope, node, outer, DeclarationKind::Interface)
            }
            "enum_declaration" => self.declare_container(scope, node, outer, DeclarationKind::Enum),
            "internal_module" | "module" => {
                // `declare module "name"` augments another package.
                let ambient_module = node
                    .child_by_field_name("name")
                    .is_some_and(|name| name.kind() == "string");
                if ambient_module {
                    return Vec::new();
                }
                self.declare_container(scope, node, outer, DeclarationKind::Namespace)
            }
            "function_signature" | "function_declaration" => {
                self.declare_simple(scope, node, outer, DeclarationKind::Function)
            }
            "type_alias_declaration" => {
                self.declare_simple(scope, node, outer, DeclarationKind::TypeAlias)
            }
            "lexical_declaration" | "variable_declaration" => {
                let declarators: Vec<_> = named_children(node)
                    .into_iter()
                    .filter(|child| child.kind() == "variable_declarator")
                    .collect();
                let single = declarators.len() == 1;
                let is_const = self.text(scope.module, node).starts_with("const");
                let mut declared = Vec::new();
                for declarator in declarators {
                    let Some(name) = declarator.child_by_field_name("name") else {
                        continue;
                    };
                    let name = self.text(scope.module, name).to_string();
                    let (start, end) = if single {
                        (outer.start_byte(), outer.end_byte())
                    } else {
                        (declarator.start_byte(), declarator.end_byte())
                    };
                    let mut spec = self.declaration_spec(scope.module, declarator, outer, DeclarationKind::Variable);
                    spec.modifiers.readonly = is_const;
                    let (symbol, _) = self.add_declaration(scope, &name, spec, declarator, outer, start, end);
                    declared.push((name, symbol));
                }
                declared
            }
            _ => Vec::new(),
        }
    }

    fn declare_simple(
        &mut self,
        scope: &Scope,
        node: Node<'t>,
        outer: Node<'t>,
        kind: DeclarationKind,
    ) -> Vec<(String, SymbolId)> {
        let name = match node.child_by_field_name("name") {
            Some(name) => self.text(scope.module, name).to_string(),
            None => ANONYMOUS_DEFAULT.to_string(),
        };
        let spec = self.declaration_spec(scope.module, node, outer, kind);
        let (symbol, _) = self.add_declaration(
            scope,
            &name,
            spec,
            node,
            outer,
            outer.start_byte(),
            outer.end_byte(),
        );
        vec![(name, symbol)]
    }

    fn declare_container(
        &mut self,
        scope: &Scope,
        node: Node<'t>,
        outer: Node<'t>,
        kind: DeclarationKind,
    ) -> Vec<(String, SymbolId)> {
        let module = scope.module;
        let name = match node.child_by_field_name("name") {
            Some(name) => self.text(module, name).to_string(),
            None => ANONYMOUS_DEFAULT.to_string(),
        };
        let body = node.child_by_field_name("body");
        let end = body.map_or(outer.end_byte(), |body| body.start_byte());

        let spec = self.declaration_spec(module, node, outer, kind);
        let (symbol, declaration) =
            self.add_declaration(scope, &name, spec, node, outer, outer.start_byte(), end);

        if let Some(body) = body {
            let mut inner = Scope {
                module,
                parent: Some((symbol, declaration)),
                namespaces: scope.namespaces.clone(),
                type_parameters: scope.type_parameters.clone(),
            };
            inner
                .type_parameters
                .extend(type_parameter_names(node, self.source(module)));

            match kind {
                DeclarationKind::Namespace => {
                    inner.namespaces.push(symbol);
                    for statement in named_children(body) {
                        self.visit_statement(&inner, statement);
                    }
                }
                DeclarationKind::Enum => {
                    for member in named_children(body) {
                        self.declare_enum_member(&inner, member);
                    }
                }
                _ => {
                    for member in named_children(body) {
                        self.declare_member(&inner, member);
                    }
                }
            }
        }

        vec![(name, symbol)]
    }

    fn declare_member(&mut self, scope: &Scope, member: Node<'t>) {
        let module = scope.module;
        let member_name = |loader: &Self| {
            member
                .child_by_field_name("name")
                .map(|name| string_literal(loader.text(module, name)))
        };

        let (kind, name) = match member.kind() {
            "method_signature" | "method_definition" | "abstract_method_signature" => {
                let Some(name) = member_name(self) else {
                    return;
                };
                let kind = if name == "constructor" {
                    DeclarationKind::Constructor
                } else if has_keyword(member, "get") {
                    DeclarationKind::GetAccessor
                } else if has_keyword(member, "set") {
                    DeclarationKind::SetAccessor
                } else {
                    DeclarationKind::Method
                };
                (kind, name)
            }
            "public_field_definition" | "property_signature" => {
                let Some(name) = member_name(self) else {
                    return;
                };
                (DeclarationKind::Property, name)
            }
            "call_signature" => (DeclarationKind::CallSignature, "__call".to_string()),
            "construct_signature" => (DeclarationKind::ConstructSignature, "__new".to_string()),
            "index_signature" => (DeclarationKind::IndexSignature, "__index".to_string()),
            _ => return,
        };

        let end = match member.next_sibling() {
            Some(next) if next.kind() == ";" => next.end_byte(),
            _ => member.end_byte(),
        };
        let spec = self.declaration_spec(module, member, member, kind);
        self.add_declaration(scope, &name, spec, member, member, member.start_byte(), end);
    }

    fn declare_enum_member(&mut self, scope: &Scope, member: Node<'t>) {
        let name_node = match member.kind() {
            "property_identifier" | "string" => Some(member),
            "enum_assignment" => member.child_by_field_name("name"),
            _ => None,
        };
        let Some(name_node) = name_node else {
            return;
        };
        let name = string_literal(self.text(scope.module, name_node));
        let spec = self.declaration_spec(scope.module, member, member, DeclarationKind::EnumMember);
        self.add_declaration(
            scope,
            &name,
            spec,
            member,
            member,
            member.start_byte(),
            member.end_byte(),
        );
    }

    fn declaration_spec(
        &self,
        module: ModuleId,
        node: Node<'t>,
        outer: Node<'t>,
        kind: DeclarationKind,
    ) -> DeclarationSpec {
        let source = self.source(module);
        let mut spec = DeclarationSpec::new(kind)
            .in_module(module)
            .with_line(outer.start_position().row + 1)
            .with_modifiers(modifiers_of(node, source));
        if let Some(doc) = doc_comment_before(outer, source) {
            spec = spec.with_doc(doc);
        }
        for (name, optional) in parameters_of(node, source) {
            spec = spec.with_parameter(&name, optional);
        }
        for name in type_parameter_names(node, source) {
            spec = spec.with_type_parameter(&name);
        }
        spec
    }

    #[allow(clippy::too_many_arguments)]
    fn add_declaration(
        &mut self,
        scope: &Scope,
        name: &str,
        spec: DeclarationSpec,
        node: Node<'t>,
        outer: Node<'t>,
        start: usize,
        end: usize,
    ) -> (SymbolId, DeclarationId) {
        let kind = spec.kind;
        let mut own_scope = scope.clone();
        own_scope
            .type_parameters
            .extend(spec.type_parameters.iter().cloned());

        let (symbol, declaration) = match scope.parent {
            Some((parent_symbol, parent_declaration)) => {
                let (symbol, declaration) = self.builder.add_member(parent_declaration, name, spec);
                self.members.insert((parent_symbol, name.to_string()), symbol);
                (symbol, declaration)
            }
            None => match self.locals[scope.module.index()].get(name) {
                // Merged declarations (overloads, interface merging) share a symbol.
                Some(&symbol) => (symbol, self.builder.add_declaration(symbol, None, spec)),
                None => {
                    let (symbol, declaration) = self.builder.declare(name, spec);
                    self.locals[scope.module.index()].insert(name.to_string(), symbol);
                    (symbol, declaration)
                }
            },
        };
        debug!(name, kind = %kind, "declared");

        self.pending.push(Pending {
            declaration,
            kind,
            node,
            outer,
            start,
            end,
            scope: own_scope,
        });
        (symbol, declaration)
    }

    // Export pass

    fn export_all(&mut self) -> Result<(), FrontEndError> {
        let files: &'t [SourceFile] = self.files;
        for file in files {
            for (name, entity) in self.module_exports(file.module) {
                self.builder.export(file.module, name, entity)?;
            }
        }
        Ok(())
    }

    /// Resolved export table of `module`. Export cycles resolve to an empty
    /// table at the point of re-entry.
    fn module_exports(&mut self, module: ModuleId) -> Vec<(String, Entity)> {
        if let Some(done) = self.exports.get(&module) {
            return done.clone();
        }
        if !self.resolving.insert(module) {
            return Vec::new();
        }

        let directives = self.directives[module.index()].clone();
        let mut table: Vec<(String, Entity)> = Vec::new();
        let mut stars = Vec::new();

        for directive in directives {
            match directive {
                ExportDirective::Entity { name, entity } => table.push((name, entity)),
                ExportDirective::Local { name, local } => match self.resolve_local(module, &local) {
                    Some(entity) => table.push((name, entity)),
                    None => warn!(name = %local, "export of an undeclared name"),
                },
                ExportDirective::From {
                    name,
                    module: target,
                    imported,
                } => match self.resolve_export(target, &imported) {
                    Some(entity) => table.push((name, entity)),
                    None => warn!(name = %imported, "re-export of a name the module does not export"),
                },
                ExportDirective::Namespace {
                    name,
                    module: target,
                } => {
                    let id = self.namespace_import(module, &name, target);
                    table.push((name, Entity::NamespaceImport(id)));
                }
                ExportDirective::Star(target) => stars.push(target),
            }
        }

        for target in stars {
            for (name, entity) in self.module_exports(target) {
                if name != DEFAULT_EXPORT && !table.iter().any(|(existing, _)| *existing == name) {
                    table.push((name, entity));
                }
            }
        }

        self.resolving.remove(&module);
        self.exports.insert(module, table.clone());
        table
    }

    fn resolve_export(&mut self, module: ModuleId, name: &str) -> Option<Entity> {
        self.module_exports(module)
            .into_iter()
            .find(|(exported, _)| exported == name)
            .map(|(_, entity)| entity)
    }

    /// Resolve a module-level name: local declarations first, then imports.
    fn resolve_local(&mut self, module: ModuleId, name: &str) -> Option<Entity> {
        if let Some(&symbol) = self.locals[module.index()].get(name) {
            return Some(Entity::Symbol(symbol));
        }
        let binding = self.bindings[module.index()].get(name).cloned()?;
        match binding {
            ImportBinding::Named {
                module: target,
                name: imported,
            } => self.resolve_export(target, &imported),
            ImportBinding::Namespace(target) => Some(Entity::NamespaceImport(
                self.namespace_import(module, name, target),
            )),
            ImportBinding::External {
                package,
                name: imported,
            } => Some(Entity::Symbol(self.external_symbol(&package, &imported))),
        }
    }

    fn namespace_import(&mut self, module: ModuleId, local: &str, target: ModuleId) -> NamespaceImportId {
        if let Some(&id) = self.namespace_imports.get(&(module, local.to_string())) {
            return id;
        }
        let id = self.builder.add_namespace_import(local, target);
        self.namespace_imports.insert((module, local.to_string()), id);
        self.namespace_targets.insert(id, target);
        id
    }

    fn external_symbol(&mut self, package: &str, name: &str) -> SymbolId {
        let key = (package.to_string(), name.to_string());
        if let Some(&symbol) = self.externals.get(&key) {
            return symbol;
        }
        let symbol = self.builder.add_external_symbol(name, package);
        self.externals.insert(key, symbol);
        symbol
    }

    // Signature pass

    fn resolve_signatures(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for item in &pending {
            self.resolve_signature(item);
        }
    }

    fn resolve_signature(&mut self, item: &Pending<'t>) {
        let source = self.source(item.scope.module);

        for base in heritage_nodes(item.node) {
            if let Some(entity) = self.type_entity(&item.scope, base) {
                self.builder
                    .add_reference(item.declaration, entity, ReferenceKind::Inheritance);
            }
        }

        let mut leaves = Vec::new();
        collect_leaves(item.outer, item.start, item.end, &mut leaves);

        let mut tokens = Vec::new();
        let mut starts = Vec::new();
        let mut resolutions = Vec::new();
        let mut cursor = item.start;
        for leaf in leaves {
            let leaf_start = leaf.start_byte().max(cursor);
            let leaf_end = leaf.end_byte().min(item.end);
            if leaf_start > cursor {
                starts.push(cursor);
                tokens.push(SourceToken::text(&source[cursor..leaf_start]));
            }
            let text = &source[leaf_start..leaf_end];
            starts.push(leaf_start);
            if is_identifier(leaf) {
                if let Some(entity) = self.leaf_entity(item, leaf) {
                    resolutions.push((tokens.len(), entity));
                }
                tokens.push(SourceToken::identifier(text));
            } else {
                tokens.push(SourceToken::text(text));
            }
            cursor = leaf_end;
        }

        let spans = syntax_spans(item.node, item.kind)
            .into_iter()
            .filter(|&(_, start, end)| start >= item.start && end <= item.end)
            .map(|(role, start, end)| SyntaxSpan {
                role,
                tokens: token_index(&starts, start)..token_index(&starts, end),
            })
            .collect();

        self.builder
            .set_signature(item.declaration, tokens, resolutions, spans);
    }

    /// The entity an identifier leaf of a signature refers to, if any.
    fn leaf_entity(&mut self, item: &Pending<'t>, leaf: Node<'t>) -> Option<Entity> {
        let parent = leaf.parent()?;
        let qualified = matches!(
            parent.kind(),
            "nested_type_identifier" | "nested_identifier" | "member_expression"
        );
        if qualified && last_named(parent) == Some(leaf) {
            return self.type_entity(&item.scope, parent);
        }

        let resolvable = match leaf.kind() {
            "type_identifier" => {
                parent.kind() != "type_parameter"
                    && item.node.child_by_field_name("name") != Some(leaf)
            }
            "identifier" => qualified || matches!(parent.kind(), "extends_clause" | "type_query"),
            _ => false,
        };
        if !resolvable {
            return None;
        }
        self.type_entity(&item.scope, leaf)
    }

    fn type_entity(&mut self, scope: &Scope, node: Node<'t>) -> Option<Entity> {
        match node.kind() {
            "type_identifier" | "identifier" => {
                let name = self.text(scope.module, node);
                if scope.type_parameters.iter().any(|parameter| parameter == name) {
                    return None;
                }
                self.resolve_name(scope, name)
            }
            "generic_type" => self.type_entity(scope, node.child_by_field_name("name")?),
            "nested_type_identifier" | "nested_identifier" | "member_expression" => {
                let parts = named_children(node);
                let (first, last) = (*parts.first()?, *parts.last()?);
                if first == last {
                    return None;
                }
                let qualifier = self.type_entity(scope, first)?;
                let member = self.text(scope.module, last);
                self.member_entity(qualifier, member)
            }
            _ => None,
        }
    }

    fn resolve_name(&mut self, scope: &Scope, name: &str) -> Option<Entity> {
        for namespace in scope.namespaces.iter().rev() {
            if let Some(&member) = self.members.get(&(*namespace, name.to_string())) {
                return Some(Entity::Symbol(member));
            }
        }
        self.resolve_local(scope.module, name)
    }

    fn member_entity(&mut self, qualifier: Entity, name: &str) -> Option<Entity> {
        match qualifier {
            Entity::NamespaceImport(id) => {
                let target = *self.namespace_targets.get(&id)?;
                self.resolve_export(target, name)
            }
            Entity::Symbol(symbol) => self
                .members
                .get(&(symbol, name.to_string()))
                .map(|member| Entity::Symbol(*member)),
        }
    }
}

fn collect_leaves<'t>(node: Node<'t>, start: usize, end: usize, out: &mut Vec<Node<'t>>) {
    if node.end_byte() <= start || node.start_byte() >= end {
        return;
    }
    if node.child_count() == 0 {
        if node.start_byte() < node.end_byte() {
            out.push(node);
        }
        return;
    }
    for child in children(node) {
        collect_leaves(child, start, end, out);
    }
}

fn is_identifier(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "identifier" | "type_identifier" | "property_identifier" | "shorthand_property_identifier"
    )
}

fn token_index(starts: &[usize], byte: usize) -> usize {
    starts
        .iter()
        .position(|&start| start >= byte)
        .unwrap_or(starts.len())
}

/// Base types named in `extends` / `implements` clauses.
fn heritage_nodes(node: Node<'_>) -> Vec<Node<'_>> {
    let mut bases = Vec::new();
    for child in named_children(node) {
        match child.kind() {
            "class_heritage" => {
                for clause in named_children(child) {
                    match clause.kind() {
                        "extends_clause" => bases.extend(
                            named_children(clause)
                                .into_iter()
                                .filter(|base| base.kind() != "type_arguments"),
                        ),
                        "implements_clause" => bases.extend(named_children(clause)),
                        _ => {}
                    }
                }
            }
            "extends_type_clause" => bases.extend(named_children(child)),
            _ => {}
        }
    }
    bases
}

/// Byte ranges of the sub-expressions a signature exposes by role.
fn syntax_spans(node: Node<'_>, kind: DeclarationKind) -> Vec<(SyntaxRole, usize, usize)> {
    fn span(role: SyntaxRole, node: Node<'_>) -> (SyntaxRole, usize, usize) {
        (role, node.start_byte(), node.end_byte())
    }

    let mut spans = Vec::new();

    if let Some(parameters) = node.child_by_field_name("type_parameters") {
        let parameters = named_children(parameters)
            .into_iter()
            .filter(|parameter| parameter.kind() == "type_parameter");
        for (index, parameter) in parameters.enumerate() {
            if let Some(constraint) = parameter.child_by_field_name("constraint").and_then(last_named) {
                spans.push(span(SyntaxRole::TypeParameterConstraint(index), constraint));
            }
            if let Some(default) = parameter.child_by_field_name("value").and_then(last_named) {
                spans.push(span(SyntaxRole::TypeParameterDefault(index), default));
            }
        }
    }

    match kind {
        DeclarationKind::Class => {
            for heritage in named_children(node)
                .into_iter()
                .filter(|child| child.kind() == "class_heritage")
            {
                for clause in named_children(heritage) {
                    let parts = named_children(clause);
                    match clause.kind() {
                        "extends_clause" => {
                            if let (Some(first), Some(last)) = (parts.first(), parts.last()) {
                                spans.push((SyntaxRole::Extends, first.start_byte(), last.end_byte()));
                            }
                        }
                        "implements_clause" => {
                            for (index, base) in parts.into_iter().enumerate() {
                                spans.push(span(SyntaxRole::Implements(index), base));
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        DeclarationKind::Interface => {
            for clause in named_children(node)
                .into_iter()
                .filter(|child| child.kind() == "extends_type_clause")
            {
                for (index, base) in named_children(clause).into_iter().enumerate() {
                    spans.push(span(SyntaxRole::ExtendsType(index), base));
                }
            }
        }
        DeclarationKind::Function
        | DeclarationKind::Method
        | DeclarationKind::Constructor
        | DeclarationKind::CallSignature
        | DeclarationKind::ConstructSignature
        | DeclarationKind::GetAccessor
        | DeclarationKind::SetAccessor => {
            if let Some(parameters) = node.child_by_field_name("parameters") {
                for (index, parameter) in formal_parameters(parameters).into_iter().enumerate() {
                    if let Some(annotation) = parameter.child_by_field_name("type") {
                        spans.push(span(SyntaxRole::ParameterType(index), annotated_type(annotation)));
                    }
                }
            }
            let return_type = node
                .child_by_field_name("return_type")
                .or_else(|| node.child_by_field_name("type"));
            if let Some(annotation) = return_type {
                spans.push(span(SyntaxRole::ReturnType, annotated_type(annotation)));
            }
        }
        DeclarationKind::Property | DeclarationKind::Variable | DeclarationKind::IndexSignature => {
            if let Some(annotation) = node.child_by_field_name("type") {
                spans.push(span(SyntaxRole::Type, annotated_type(annotation)));
            }
        }
        DeclarationKind::TypeAlias => {
            if let Some(value) = node.child_by_field_name("value") {
                spans.push(span(SyntaxRole::Type, value));
            }
        }
        DeclarationKind::Enum | DeclarationKind::EnumMember | DeclarationKind::Namespace => {}
    }

    spans
}

/// `: T` annotations wrap the type node itself.
fn annotated_type(node: Node<'_>) -> Node<'_> {
    if node.kind().ends_with("annotation") {
        last_named(node).unwrap_or(node)
    } else {
        node
    }
}

fn formal_parameters(node: Node<'_>) -> Vec<Node<'_>> {
    named_children(node)
        .into_iter()
        .filter(|parameter| matches!(parameter.kind(), "required_parameter" | "optional_parameter"))
        .collect()
}

fn parameters_of(node: Node<'_>, source: &str) -> Vec<(String, bool)> {
    let Some(parameters) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    formal_parameters(parameters)
        .into_iter()
        .map(|parameter| {
            let name = parameter
                .child_by_field_name("pattern")
                .map(|pattern| source[pattern.start_byte()..pattern.end_byte()].trim_start_matches("..."))
                .unwrap_or_default()
                .to_string();
            (name, parameter.kind() == "optional_parameter")
        })
        .collect()
}

fn type_parameter_names(node: Node<'_>, source: &str) -> Vec<String> {
    let Some(parameters) = node.child_by_field_name("type_parameters") else {
        return Vec::new();
    };
    named_children(parameters)
        .into_iter()
        .filter_map(|parameter| parameter.child_by_field_name("name"))
        .map(|name| source[name.start_byte()..name.end_byte()].to_string())
        .collect()
}

fn modifiers_of(node: Node<'_>, source: &str) -> Modifiers {
    let mut modifiers = Modifiers::default();
    for child in children(node) {
        match child.kind() {
            "accessibility_modifier" => match &source[child.start_byte()..child.end_byte()] {
                "private" => modifiers.private = true,
                "protected" => modifiers.protected = true,
                _ => {}
            },
            "static" => modifiers.is_static = true,
            "readonly" => modifiers.readonly = true,
            "abstract" => modifiers.is_abstract = true,
            "?" => modifiers.optional = true,
            _ => {}
        }
    }
    modifiers
}

/// The `/** ... */` comment directly before a declaration.
fn doc_comment_before<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    let previous = node.prev_sibling()?;
    if previous.kind() != "comment" {
        return None;
    }
    let text = &source[previous.start_byte()..previous.end_byte()];
    text.starts_with("/**").then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::{FrontEnd, ModifierTag};

    fn load(source: &str) -> Program {
        TypeScriptLoader::new("pkg")
            .load_source("index", source)
            .expect("source should load")
    }

    fn primary(program: &Program, name: &str) -> DeclarationId {
        let symbol = program.find_symbol(name).expect("symbol should exist");
        program.symbol(symbol).declarations[0]
    }

    #[test]
    fn test_heritage_becomes_inheritance_references() {
        let program = load(
            "declare class A {}\n\
             interface I {}\n\
             export declare class B extends A implements I {}\n",
        );

        let a = Entity::Symbol(program.find_symbol("A").unwrap());
        let i = Entity::Symbol(program.find_symbol("I").unwrap());
        let references = program.entity_references(primary(&program, "B"));
        assert!(references
            .iter()
            .any(|r| r.target == a && r.kind == ReferenceKind::Inheritance));
        assert!(references
            .iter()
            .any(|r| r.target == i && r.kind == ReferenceKind::Inheritance));

        let exports = program.export_table(program.entry_module());
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].0, "B");
    }

    #[test]
    fn test_members_doc_comments_and_modifiers() {
        let program = load(
            "/** A widget. @beta */\n\
             export declare class Widget {\n\
             \x20   /** The size. */\n\
             \x20   get size(): number;\n\
             \x20   set size(value: number);\n\
             \x20   static create(name?: string): Widget;\n\
             }\n",
        );

        let widget = program.find_symbol("Widget").unwrap();
        let doc = program.parse_doc_comment(primary(&program, "Widget")).unwrap();
        assert!(doc.has(ModifierTag::Beta));

        let size = program.find_member(widget, "size").unwrap();
        let kinds: Vec<_> = program
            .symbol(size)
            .declarations
            .iter()
            .map(|&d| program.declaration_kind(d))
            .collect();
        assert_eq!(kinds, vec![DeclarationKind::GetAccessor, DeclarationKind::SetAccessor]);
        assert!(program.parse_doc_comment(program.symbol(size).declarations[0]).is_some());

        let create = program.find_member(widget, "create").unwrap();
        let create = program.symbol(create).declarations[0];
        assert!(program.modifier_flags(create).is_static);
        assert!(program.is_optional_parameter(create, 0));
        assert_eq!(
            program.entity_references(create)[0].target,
            Entity::Symbol(widget)
        );
    }

    #[test]
    fn test_export_clause_aliases_and_default() {
        let program = load(
            "declare class X {}\n\
             export { X as P, X as Q };\n\
             export default X;\n",
        );
        let x = Entity::Symbol(program.find_symbol("X").unwrap());
        let names: Vec<_> = program
            .export_table(program.entry_module())
            .iter()
            .map(|(name, entity)| {
                assert_eq!(*entity, x);
                name.as_str()
            })
            .collect();
        assert_eq!(names, vec!["P", "Q", "default"]);
    }

    #[test]
    fn test_signature_tokens_and_spans() {
        let source = "export declare function run(options: Options): void;\n\
                      export interface Options {}\n";
        let program = load(source);
        let run = primary(&program, "run");
        let info = program.declaration(run);

        let text: String = info.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(text, "export declare function run(options: Options): void;");

        let options_token = info
            .tokens
            .iter()
            .position(|t| t.text == "Options")
            .unwrap();
        assert_eq!(
            program.resolve_identifier(run, options_token),
            Some(Entity::Symbol(program.find_symbol("Options").unwrap()))
        );

        let return_span = info
            .spans
            .iter()
            .find(|span| span.role == SyntaxRole::ReturnType)
            .unwrap();
        let return_text: String = info.tokens[return_span.tokens.clone()]
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(return_text, "void");
    }

    #[test]
    fn test_type_parameters_are_not_references() {
        let program = load("export declare function first<T>(items: T[]): T;\n");
        let first = primary(&program, "first");
        assert!(program.entity_references(first).is_empty());
        assert_eq!(program.declaration(first).type_parameters, vec!["T".to_string()]);
    }

    #[test]
    fn test_relative_import_requires_a_file() {
        let result = TypeScriptLoader::new("pkg")
            .load_source("index", "export { A } from \"./a\";\n");
        assert!(matches!(result, Err(FrontEndError::UnresolvedImport { .. })));
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let result = TypeScriptLoader::new("pkg").load_source("index", "export class {{{\n");
        assert!(matches!(result, Err(FrontEndError::Parse { .. })));
    }

    #[test]
    fn test_globals_are_reserved() {
        let program = load("export declare const value: number;\n");
        assert!(program.global_name_reserved("Promise"));
        assert!(!program.global_name_reserved("value"));
    }
}
