//! Release-tag propagation and ancillary declaration pairing.
//!
//! Metadata is resolved symbol-first: a symbol's parent is resolved before
//! the symbol, and all declarations of one symbol are resolved together.

use super::Collector;
use super::entity::DEFAULT_EXPORT_NAME;
use super::error::InternalError;
use super::metadata::{ApiItemMetadata, DeclarationMetadata, ReleaseTag, SymbolMetadata};
use crate::front_end::{DeclarationId, DeclarationKind, Entity, ModifierTag, SymbolId};
use crate::model::Diagnostic;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::trace;

/// Checked in this order; the first match becomes the declared tag.
const RELEASE_TAG_PRECEDENCE: [(ModifierTag, ReleaseTag); 4] = [
    (ModifierTag::Public, ReleaseTag::Public),
    (ModifierTag::Beta, ReleaseTag::Beta),
    (ModifierTag::Alpha, ReleaseTag::Alpha),
    (ModifierTag::Internal, ReleaseTag::Internal),
];

impl Collector<'_> {
    pub fn fetch_symbol_metadata(
        &mut self,
        symbol: SymbolId,
    ) -> Result<SymbolMetadata, InternalError> {
        self.resolve_symbol(symbol)
    }

    pub fn fetch_declaration_metadata(
        &mut self,
        declaration: DeclarationId,
    ) -> Result<&DeclarationMetadata, InternalError> {
        if !self.declaration_metadata.contains_key(&declaration) {
            let symbol = self.front_end.declaration(declaration).symbol;
            self.resolve_symbol(symbol)?;
        }
        self.declaration_metadata
            .get(&declaration)
            .ok_or_else(|| InternalError::MissingMetadata {
                declaration: self.describe_declaration(declaration),
            })
    }

    /// Ancillary declarations return the same shared instance as the
    /// declaration they are folded into.
    pub fn fetch_api_item_metadata(
        &mut self,
        declaration: DeclarationId,
    ) -> Result<Rc<ApiItemMetadata>, InternalError> {
        if !self.api_item_metadata.contains(declaration) {
            let symbol = self.front_end.declaration(declaration).symbol;
            self.resolve_symbol(symbol)?;
        }
        self.api_item_metadata
            .get(declaration)
            .cloned()
            .ok_or_else(|| InternalError::MissingMetadata {
                declaration: self.describe_declaration(declaration),
            })
    }

    /// Declarations of `symbol` that are not folded into another one.
    pub fn non_ancillary_declarations(
        &mut self,
        symbol: SymbolId,
    ) -> Result<Vec<DeclarationId>, InternalError> {
        self.resolve_symbol(symbol)?;
        Ok(self
            .front_end
            .symbol(symbol)
            .declarations
            .iter()
            .copied()
            .filter(|d| {
                self.declaration_metadata
                    .get(d)
                    .is_some_and(|metadata| !metadata.is_ancillary)
            })
            .collect())
    }

    /// 1-based position among sibling declarations of the same kind.
    pub fn overload_index(&mut self, declaration: DeclarationId) -> usize {
        if let Some(&index) = self.overload_indices.get(&declaration) {
            return index;
        }
        let front_end = self.front_end;
        let kind = front_end.declaration_kind(declaration);
        let symbol = front_end.declaration(declaration).symbol;
        let mut next = 1;
        for &other in &front_end.symbol(symbol).declarations {
            if front_end.declaration_kind(other) == kind {
                self.overload_indices.insert(other, next);
                next += 1;
            }
        }
        self.overload_indices.get(&declaration).copied().unwrap_or(1)
    }

    /// Resolve `root` and every symbol nested inside it.
    pub(super) fn resolve_symbol_tree(&mut self, root: SymbolId) -> Result<(), InternalError> {
        let mut seen = HashSet::new();
        for declaration in self.declarations_recursive(root) {
            let symbol = self.front_end.declaration(declaration).symbol;
            if seen.insert(symbol) {
                self.resolve_symbol(symbol)?;
            }
        }
        Ok(())
    }

    fn resolve_symbol(&mut self, symbol: SymbolId) -> Result<SymbolMetadata, InternalError> {
        if let Some(metadata) = self.symbol_metadata.get(symbol) {
            return Ok(*metadata);
        }
        let front_end = self.front_end;
        let info = front_end.symbol(symbol);

        if let Some(parent) = info.parent {
            self.resolve_symbol(parent)?;
        }

        self.calculate_declaration_metadata(symbol)?;
        let mut computed = Vec::new();
        for &declaration in &info.declarations {
            if let Some(item) = self.calculate_api_item_metadata(declaration)? {
                computed.push((declaration, item));
            }
        }

        // Only a symbol with no tag on any declaration is healed to Public.
        let mut max_effective_release_tag = computed
            .iter()
            .map(|(_, (metadata, _))| metadata.effective_release_tag)
            .max()
            .unwrap_or(ReleaseTag::None);
        if max_effective_release_tag == ReleaseTag::None && !info.is_external() {
            if let Some(&(first, _)) = computed.first() {
                self.report_missing_release_tag(symbol, first);
                for (_, (metadata, _)) in &mut computed {
                    metadata.effective_release_tag = ReleaseTag::Public;
                }
                max_effective_release_tag = ReleaseTag::Public;
            }
        }

        for (declaration, (metadata, ancillary_declarations)) in computed {
            let shared = Rc::new(metadata);
            self.freeze_api_item_metadata(declaration, Rc::clone(&shared))?;
            for ancillary in ancillary_declarations {
                self.freeze_api_item_metadata(ancillary, Rc::clone(&shared))?;
            }
        }

        trace!(symbol = %info.name, tag = %max_effective_release_tag, "resolved symbol");
        let metadata = SymbolMetadata {
            max_effective_release_tag,
        };
        self.symbol_metadata
            .freeze(symbol, metadata)
            .map_err(|_| InternalError::MetadataAlreadyFrozen {
                declaration: info.name.clone(),
            })?;
        Ok(metadata)
    }

    fn calculate_declaration_metadata(&mut self, symbol: SymbolId) -> Result<(), InternalError> {
        let front_end = self.front_end;
        let declarations = &front_end.symbol(symbol).declarations;

        for &declaration in declarations {
            if self.declaration_metadata.contains_key(&declaration) {
                return Err(InternalError::MetadataAlreadyFrozen {
                    declaration: self.describe_declaration(declaration),
                });
            }
            let metadata = DeclarationMetadata {
                doc_comment: front_end.parse_doc_comment(declaration).cloned(),
                ..Default::default()
            };
            self.declaration_metadata.insert(declaration, metadata);
        }

        // A setter is folded into the first getter of the same property.
        let first_getter = declarations
            .iter()
            .copied()
            .find(|&d| front_end.declaration_kind(d) == DeclarationKind::GetAccessor);
        for &setter in declarations {
            if front_end.declaration_kind(setter) != DeclarationKind::SetAccessor {
                continue;
            }
            if let Some(getter) = first_getter {
                self.add_ancillary_declaration(getter, setter)?;
            } else {
                let name = front_end.symbol(symbol).name.clone();
                let location = self.location(setter);
                self.report(Diagnostic::missing_getter(&name, location));
            }
        }
        Ok(())
    }

    fn add_ancillary_declaration(
        &mut self,
        main: DeclarationId,
        ancillary: DeclarationId,
    ) -> Result<(), InternalError> {
        let invalid = |collector: &Self, reason: &'static str| InternalError::InvalidAncillaryLink {
            main: collector.describe_declaration(main),
            ancillary: collector.describe_declaration(ancillary),
            reason,
        };

        let main_metadata = self
            .declaration_metadata
            .get(&main)
            .ok_or_else(|| invalid(self, "the main declaration has no metadata"))?;
        if main_metadata.ancillary_declarations.contains(&ancillary) {
            return Ok(());
        }
        if self.front_end.declaration(main).symbol != self.front_end.declaration(ancillary).symbol {
            return Err(invalid(self, "the declarations belong to different symbols"));
        }
        if main_metadata.is_ancillary {
            return Err(invalid(self, "the main declaration is itself ancillary"));
        }
        let ancillary_metadata = self
            .declaration_metadata
            .get(&ancillary)
            .ok_or_else(|| invalid(self, "the ancillary declaration has no metadata"))?;
        if ancillary_metadata.is_ancillary {
            return Err(invalid(self, "it is already ancillary to another declaration"));
        }
        if self.api_item_metadata.contains(main) || self.api_item_metadata.contains(ancillary) {
            return Err(invalid(self, "the API item metadata has already been computed"));
        }

        if let Some(metadata) = self.declaration_metadata.get_mut(&ancillary) {
            metadata.is_ancillary = true;
        }
        if let Some(metadata) = self.declaration_metadata.get_mut(&main) {
            metadata.ancillary_declarations.push(ancillary);
        }
        Ok(())
    }

    /// Metadata for a primary declaration, plus the ancillary declarations
    /// that will share it. `None` for ancillary declarations. Nothing is
    /// frozen here.
    fn calculate_api_item_metadata(
        &mut self,
        declaration: DeclarationId,
    ) -> Result<Option<(ApiItemMetadata, Vec<DeclarationId>)>, InternalError> {
        let front_end = self.front_end;
        let info = front_end.declaration(declaration);
        let symbol = front_end.symbol(info.symbol);

        let Some(declaration_metadata) = self.declaration_metadata.get(&declaration) else {
            return Err(InternalError::MissingMetadata {
                declaration: self.describe_declaration(declaration),
            });
        };

        if declaration_metadata.is_ancillary {
            // The primary declaration shares its metadata when it is processed.
            if info.kind == DeclarationKind::SetAccessor && declaration_metadata.doc_comment.is_some()
            {
                let location = self.location(declaration);
                self.report(Diagnostic::setter_with_docs(&symbol.name, location));
            }
            return Ok(None);
        }

        let doc_comment = declaration_metadata.doc_comment.clone();
        let ancillary_declarations = declaration_metadata.ancillary_declarations.clone();
        let mut metadata = ApiItemMetadata::default();

        if let Some(doc) = &doc_comment {
            let mut declared = ReleaseTag::None;
            let mut extra_release_tags = false;
            for (modifier, tag) in RELEASE_TAG_PRECEDENCE {
                if doc.has(modifier) {
                    if declared == ReleaseTag::None {
                        declared = tag;
                    } else {
                        extra_release_tags = true;
                    }
                }
            }

            if extra_release_tags && !symbol.is_external() {
                let location = self.location(declaration);
                self.report(Diagnostic::extra_release_tag(location));
            }

            metadata.declared_release_tag = declared;
            metadata.is_event_property = doc.has(ModifierTag::EventProperty);
            metadata.is_override = doc.has(ModifierTag::Override);
            metadata.is_sealed = doc.has(ModifierTag::Sealed);
            metadata.is_virtual = doc.has(ModifierTag::Virtual);

            if doc.has(ModifierTag::Preapproved) {
                let location = self.location(declaration);
                if !info.kind.is_container() {
                    self.report(Diagnostic::preapproved_unsupported_type(&symbol.name, location));
                } else if declared != ReleaseTag::Internal {
                    self.report(Diagnostic::preapproved_bad_release_tag(&symbol.name, location));
                } else {
                    metadata.is_preapproved = true;
                }
            }
        }

        match info.parent {
            Some(parent) => {
                let parent_tag = self.fetch_api_item_metadata(parent)?.effective_release_tag;
                metadata.effective_release_tag = if metadata.declared_release_tag == ReleaseTag::None
                {
                    parent_tag
                } else {
                    metadata.declared_release_tag
                };
                metadata.release_tag_same_as_parent = parent_tag == metadata.effective_release_tag;
            }
            None => metadata.effective_release_tag = metadata.declared_release_tag,
        }

        metadata.doc_comment = doc_comment;
        Ok(Some((metadata, ancillary_declarations)))
    }

    fn freeze_api_item_metadata(
        &mut self,
        declaration: DeclarationId,
        metadata: Rc<ApiItemMetadata>,
    ) -> Result<(), InternalError> {
        if self.api_item_metadata.freeze(declaration, metadata).is_err() {
            return Err(InternalError::MetadataAlreadyFrozen {
                declaration: self.describe_declaration(declaration),
            });
        }
        Ok(())
    }

    fn report_missing_release_tag(&mut self, symbol: SymbolId, declaration: DeclarationId) {
        let front_end = self.front_end;
        let root = front_end.root_symbol(symbol);
        let Some(entity) = self.entity_for(Entity::Symbol(root)) else {
            return;
        };
        if !(entity.is_consumable() || self.config.include_forgotten_exports) {
            return;
        }
        // The doc comment of a default export is not reachable from the
        // declaration file.
        let root_name = &front_end.symbol(root).name;
        if root_name == "_default" || root_name == DEFAULT_EXPORT_NAME {
            return;
        }
        if !self.missing_tag_reported.insert(root) {
            return;
        }
        let location = self.location(declaration);
        self.report(Diagnostic::missing_release_tag(root_name, location));
    }
}

#[cfg(test)]
mod tests {
    use crate::collector::{ApiItemMetadata, Collector, InternalError, ReleaseTag};
    use crate::config::Config;
    use crate::front_end::{
        DeclarationId, DeclarationKind, DeclarationSpec, Entity, ModuleId, Program, ProgramBuilder,
        ReferenceKind, SymbolId,
    };
    use crate::model::DiagnosticKind;
    use std::rc::Rc;

    fn exported_class(
        builder: &mut ProgramBuilder,
        module: ModuleId,
        name: &str,
        doc: &str,
    ) -> (SymbolId, DeclarationId) {
        let (symbol, declaration) =
            builder.declare(name, DeclarationSpec::new(DeclarationKind::Class).with_doc(doc));
        builder.export(module, name, Entity::Symbol(symbol)).unwrap();
        (symbol, declaration)
    }

    /// Interface `W` declared twice, with a `size` getter in each half and
    /// the setter in the second. Returns the `size` symbol and its
    /// declarations in order.
    fn merged_accessor_program(builder: &mut ProgramBuilder) -> (SymbolId, [DeclarationId; 3]) {
        let index = builder.add_module("index", None);
        let interface = || DeclarationSpec::new(DeclarationKind::Interface).with_doc("/** @public */");
        let (w, first) = builder.declare("W", interface());
        let second = builder.add_declaration(w, None, interface());
        builder.export(index, "W", Entity::Symbol(w)).unwrap();
        let (size, first_getter) =
            builder.add_member(first, "size", DeclarationSpec::new(DeclarationKind::GetAccessor));
        let (_, second_getter) =
            builder.add_member(second, "size", DeclarationSpec::new(DeclarationKind::GetAccessor));
        let (_, setter) =
            builder.add_member(second, "size", DeclarationSpec::new(DeclarationKind::SetAccessor));
        (size, [first_getter, second_getter, setter])
    }

    fn analyzed(program: &Program, config: &Config) -> Vec<DiagnosticKind> {
        let mut collector = Collector::new(program, config);
        collector.analyze().unwrap();
        collector.diagnostics().iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_nested_member_inherits_parent_release_tag() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (_, class) = exported_class(&mut builder, index, "Widget", "/** @public */");
        let (_, method) =
            builder.add_member(class, "render", DeclarationSpec::new(DeclarationKind::Method));
        let (_, beta) = builder.add_member(
            class,
            "preview",
            DeclarationSpec::new(DeclarationKind::Method).with_doc("/** @beta */"),
        );
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        let metadata = collector.fetch_api_item_metadata(method).unwrap();
        assert_eq!(metadata.declared_release_tag, ReleaseTag::None);
        assert_eq!(metadata.effective_release_tag, ReleaseTag::Public);
        assert!(metadata.release_tag_same_as_parent);

        let metadata = collector.fetch_api_item_metadata(beta).unwrap();
        assert_eq!(metadata.effective_release_tag, ReleaseTag::Beta);
        assert!(!metadata.release_tag_same_as_parent);
        assert!(collector.diagnostics().is_empty());
    }

    #[test]
    fn test_setter_is_folded_into_getter() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (_, class) = exported_class(&mut builder, index, "Widget", "/** @beta */");
        let (size, getter) = builder.add_member(
            class,
            "size",
            DeclarationSpec::new(DeclarationKind::GetAccessor).with_doc("/** The size. */"),
        );
        let (_, setter) =
            builder.add_member(class, "size", DeclarationSpec::new(DeclarationKind::SetAccessor));
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        assert_eq!(collector.non_ancillary_declarations(size).unwrap(), vec![getter]);
        let getter_metadata = collector.fetch_api_item_metadata(getter).unwrap();
        let setter_metadata = collector.fetch_api_item_metadata(setter).unwrap();
        assert!(Rc::ptr_eq(&getter_metadata, &setter_metadata));
        assert_eq!(getter_metadata.effective_release_tag, ReleaseTag::Beta);

        let declaration = collector.fetch_declaration_metadata(getter).unwrap();
        assert_eq!(declaration.ancillary_declarations, vec![setter]);
        assert!(collector.fetch_declaration_metadata(setter).unwrap().is_ancillary);
    }

    #[test]
    fn test_setter_without_getter_and_documented_setter() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (_, class) = exported_class(&mut builder, index, "Widget", "/** @public */");
        builder.add_member(class, "writeOnly", DeclarationSpec::new(DeclarationKind::SetAccessor));
        builder.add_member(class, "size", DeclarationSpec::new(DeclarationKind::GetAccessor));
        builder.add_member(
            class,
            "size",
            DeclarationSpec::new(DeclarationKind::SetAccessor).with_doc("/** Sets the size. */"),
        );
        let program = builder.build();

        let kinds = analyzed(&program, &Config::default());
        assert_eq!(
            kinds,
            vec![DiagnosticKind::MissingGetter, DiagnosticKind::SetterWithDocs]
        );
    }

    #[test]
    fn test_multiple_release_tags_keep_the_most_public() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (_, class) = exported_class(&mut builder, index, "Widget", "/** @beta */");
        let (_, method) = builder.add_member(
            class,
            "render",
            DeclarationSpec::new(DeclarationKind::Method).with_doc("/** @internal @public */"),
        );
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        let metadata = collector.fetch_api_item_metadata(method).unwrap();
        assert_eq!(metadata.declared_release_tag, ReleaseTag::Public);
        assert_eq!(metadata.effective_release_tag, ReleaseTag::Public);
        let kinds: Vec<_> = collector.diagnostics().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::ExtraReleaseTag]);
    }

    #[test]
    fn test_missing_release_tag_is_healed_to_public() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (symbol, declaration) = exported_class(&mut builder, index, "Widget", "/** A widget. */");
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        let metadata = collector.fetch_api_item_metadata(declaration).unwrap();
        assert_eq!(metadata.declared_release_tag, ReleaseTag::None);
        assert_eq!(metadata.effective_release_tag, ReleaseTag::Public);
        assert_eq!(
            collector.fetch_symbol_metadata(symbol).unwrap().max_effective_release_tag,
            ReleaseTag::Public
        );
        assert_eq!(collector.diagnostics().len(), 1);
        assert_eq!(collector.diagnostics()[0].kind, DiagnosticKind::MissingReleaseTag);
        assert!(collector.diagnostics()[0].message.contains("\"Widget\""));
    }

    #[test]
    fn test_forgotten_export_release_tag_depends_on_config() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (options, _) =
            builder.declare("Options", DeclarationSpec::new(DeclarationKind::Interface));
        let (_, run) = exported_class(&mut builder, index, "Runner", "/** @public */");
        builder.add_reference(
            run,
            Entity::Symbol(options),
            ReferenceKind::Plain,
        );
        let program = builder.build();

        assert!(analyzed(&program, &Config::default()).is_empty());

        let config = Config {
            include_forgotten_exports: true,
            ..Config::default()
        };
        assert_eq!(analyzed(&program, &config), vec![DiagnosticKind::MissingReleaseTag]);
    }

    #[test]
    fn test_preapproved_rules() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (_, ok) = exported_class(&mut builder, index, "Ok", "/** @internal @preapproved */");
        exported_class(&mut builder, index, "NotInternal", "/** @beta @preapproved */");
        let (f, _) = builder.declare(
            "run",
            DeclarationSpec::new(DeclarationKind::Function)
                .with_doc("/** @internal @preapproved */"),
        );
        builder.export(index, "run", Entity::Symbol(f)).unwrap();
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        assert!(collector.fetch_api_item_metadata(ok).unwrap().is_preapproved);
        let mut kinds: Vec<_> = collector.diagnostics().iter().map(|d| d.kind).collect();
        kinds.sort_by_key(|k| k.message_id());
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::PreapprovedBadReleaseTag,
                DiagnosticKind::PreapprovedUnsupportedType
            ]
        );
    }

    #[test]
    fn test_modifiers_are_resolved() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (_, class) = exported_class(&mut builder, index, "Base", "/** @public @sealed */");
        let (_, method) = builder.add_member(
            class,
            "render",
            DeclarationSpec::new(DeclarationKind::Method).with_doc("/** @virtual @override */"),
        );
        let (_, event) = builder.add_member(
            class,
            "changed",
            DeclarationSpec::new(DeclarationKind::Property).with_doc("/** @eventProperty */"),
        );
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        assert!(collector.fetch_api_item_metadata(class).unwrap().is_sealed);
        let metadata = collector.fetch_api_item_metadata(method).unwrap();
        assert!(metadata.is_virtual && metadata.is_override && !metadata.is_sealed);
        assert!(collector.fetch_api_item_metadata(event).unwrap().is_event_property);
    }

    #[test]
    fn test_metadata_is_computed_on_demand() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (_, class) = exported_class(&mut builder, index, "Widget", "/** @alpha */");
        let (_, method) =
            builder.add_member(class, "render", DeclarationSpec::new(DeclarationKind::Method));
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        // Fetching the child first resolves the parent symbol first.
        let metadata = collector.fetch_api_item_metadata(method).unwrap();
        assert_eq!(metadata.effective_release_tag, ReleaseTag::Alpha);
        assert_eq!(
            collector.fetch_api_item_metadata(class).unwrap().effective_release_tag,
            ReleaseTag::Alpha
        );
    }

    #[test]
    fn test_overload_index_counts_same_kind_only() {
        let mut builder = ProgramBuilder::new("pkg");
        let module = builder.add_module("index", None);
        let (parse, first) =
            builder.declare("parse", DeclarationSpec::new(DeclarationKind::Function));
        let namespace = builder.add_declaration(parse, None, DeclarationSpec::new(DeclarationKind::Namespace));
        let second = builder.add_declaration(parse, None, DeclarationSpec::new(DeclarationKind::Function));
        builder.export(module, "parse", Entity::Symbol(parse)).unwrap();
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        assert_eq!(collector.overload_index(second), 2);
        assert_eq!(collector.overload_index(first), 1);
        assert_eq!(collector.overload_index(namespace), 1);
    }

    #[test]
    fn test_analyze_twice_is_an_internal_error() {
        let mut builder = ProgramBuilder::new("pkg");
        builder.add_module("index", None);
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();
        assert_eq!(collector.analyze(), Err(InternalError::AlreadyAnalyzed));
    }

    #[test]
    fn test_setter_joins_only_the_first_of_two_getters() {
        let mut builder = ProgramBuilder::new("pkg");
        let (size, [first_getter, second_getter, setter]) =
            merged_accessor_program(&mut builder);
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        assert_eq!(
            collector.non_ancillary_declarations(size).unwrap(),
            vec![first_getter, second_getter]
        );
        let first = collector.fetch_api_item_metadata(first_getter).unwrap();
        let second = collector.fetch_api_item_metadata(second_getter).unwrap();
        let shared = collector.fetch_api_item_metadata(setter).unwrap();
        assert!(Rc::ptr_eq(&first, &shared));
        assert!(!Rc::ptr_eq(&second, &shared));
        assert!(collector
            .fetch_declaration_metadata(second_getter)
            .unwrap()
            .ancillary_declarations
            .is_empty());
        assert!(collector.diagnostics().is_empty());
    }

    #[test]
    fn test_relinking_an_ancillary_setter_is_an_internal_error() {
        let mut builder = ProgramBuilder::new("pkg");
        let (_, [_, second_getter, setter]) = merged_accessor_program(&mut builder);
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        let err = collector
            .add_ancillary_declaration(second_getter, setter)
            .unwrap_err();
        assert!(
            matches!(
                err,
                InternalError::InvalidAncillaryLink {
                    reason: "it is already ancillary to another declaration",
                    ..
                }
            ),
            "unexpected error: {:?}",
            err
        );
        assert!(err.to_string().contains("\"W.size\""), "message: {}", err);
    }

    #[test]
    fn test_recomputing_frozen_metadata_is_an_internal_error() {
        let mut builder = ProgramBuilder::new("pkg");
        let (size, [first_getter, _, _]) = merged_accessor_program(&mut builder);
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        let err = collector.calculate_declaration_metadata(size).unwrap_err();
        assert!(matches!(err, InternalError::MetadataAlreadyFrozen { .. }));
        assert!(err.to_string().contains("\"W.size\""), "message: {}", err);

        let err = collector
            .freeze_api_item_metadata(first_getter, Rc::new(ApiItemMetadata::default()))
            .unwrap_err();
        assert!(matches!(err, InternalError::MetadataAlreadyFrozen { .. }));
        assert!(err.to_string().contains("\"W.size\""), "message: {}", err);
    }

    #[test]
    fn test_untagged_overload_follows_tagged_sibling() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (run, internal) = builder.declare(
            "run",
            DeclarationSpec::new(DeclarationKind::Function).with_doc("/** @internal */"),
        );
        let untagged =
            builder.add_declaration(run, None, DeclarationSpec::new(DeclarationKind::Function));
        builder.export(index, "run", Entity::Symbol(run)).unwrap();
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        assert_eq!(
            collector.fetch_symbol_metadata(run).unwrap().max_effective_release_tag,
            ReleaseTag::Internal
        );
        assert_eq!(
            collector.fetch_api_item_metadata(internal).unwrap().effective_release_tag,
            ReleaseTag::Internal
        );
        assert_eq!(
            collector.fetch_api_item_metadata(untagged).unwrap().effective_release_tag,
            ReleaseTag::None
        );
        assert!(collector.diagnostics().is_empty(), "{:?}", collector.diagnostics());
    }

    #[test]
    fn test_external_symbols_keep_no_release_tag() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let external = builder.add_external_symbol("EventEmitter", "events");
        let external_decl = builder.add_declaration(
            external,
            None,
            DeclarationSpec::new(DeclarationKind::Class),
        );
        let (_, emitter) = exported_class(&mut builder, index, "Emitter", "/** @public */");
        builder.add_reference(emitter, Entity::Symbol(external), ReferenceKind::Inheritance);
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        assert_eq!(
            collector.fetch_symbol_metadata(external).unwrap().max_effective_release_tag,
            ReleaseTag::None
        );
        assert_eq!(
            collector.fetch_api_item_metadata(external_decl).unwrap().effective_release_tag,
            ReleaseTag::None
        );
        assert!(collector.diagnostics().is_empty());
    }
}
