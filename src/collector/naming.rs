//! Unique, deterministic emit names for collector entities.

use super::Collector;
use super::entity::{CollectorEntity, DEFAULT_EXPORT_NAME};
use super::error::InternalError;
use crate::front_end::FrontEnd;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Sort key that compares case-insensitively first, then case-sensitively,
/// and sorts `_foo` next to `foo` while keeping the two distinct.
pub fn sort_key(identifier: &str) -> String {
    match identifier.strip_prefix('_') {
        Some(rest) => format!("{}*{}!_", rest.to_lowercase(), rest),
        None => format!("{}*{}", identifier.to_lowercase(), identifier),
    }
}

/// The single export name when there is exactly one (other than `default`),
/// otherwise the local name. Qualified names keep only the outermost part.
fn ideal_name(front_end: &dyn FrontEnd, entity: &CollectorEntity) -> String {
    let name = match entity.single_export_name() {
        Some(export) if export != DEFAULT_EXPORT_NAME => export,
        _ => front_end.entity_local_name(entity.entity()),
    };
    name.split('.').next().unwrap_or(name).to_string()
}

impl Collector<'_> {
    #[instrument(level = "debug", skip(self))]
    pub(super) fn assign_names(&mut self) -> Result<(), InternalError> {
        let front_end = self.front_end;

        let mut used_names: HashSet<String> = HashSet::new();
        for entity in &self.entities {
            for export_name in entity.export_names() {
                if !used_names.insert(export_name.clone()) {
                    return Err(InternalError::DuplicateExportName {
                        name: export_name.clone(),
                    });
                }
            }
        }

        let ideal_names: Vec<String> = self
            .entities
            .iter()
            .map(|entity| ideal_name(front_end, entity))
            .collect();

        // Entities sharing an ideal name compete for it; the canonical order
        // decides which one keeps it unsuffixed.
        let mut order: Vec<usize> = (0..self.entities.len()).collect();
        order.sort_by_cached_key(|&index| {
            (
                sort_key(&ideal_names[index]),
                self.entities[index].discovery_index(),
            )
        });

        for index in order {
            let ideal = &ideal_names[index];
            let entity = &self.entities[index];

            let name = if entity.export_names().contains(ideal)
                && !self.is_reserved_name(ideal)
                && ideal != DEFAULT_EXPORT_NAME
            {
                ideal.clone()
            } else {
                let mut suffix = 1;
                let mut candidate = ideal.clone();
                while candidate == DEFAULT_EXPORT_NAME
                    || used_names.contains(&candidate)
                    || self.is_reserved_name(&candidate)
                {
                    suffix += 1;
                    candidate = format!("{}_{}", ideal, suffix);
                }
                used_names.insert(candidate.clone());
                candidate
            };

            let local_name = front_end.entity_local_name(entity.entity());
            debug!(local_name, name = %name, "assigned emit name");
            self.entities[index].set_name_for_emit(name, local_name)?;
        }
        Ok(())
    }

    fn is_reserved_name(&self, name: &str) -> bool {
        self.front_end.global_name_reserved(name)
            || self.config.reserved_names.iter().any(|reserved| reserved == name)
    }

    /// Order entities by emit name for output.
    pub(super) fn sort_entities(&mut self) {
        let mut sorted: Vec<usize> = (0..self.entities.len()).collect();
        sorted.sort_by_cached_key(|&index| {
            let entity = &self.entities[index];
            (
                sort_key(entity.name_for_emit().unwrap_or_default()),
                entity.discovery_index(),
            )
        });
        self.sorted = sorted;
    }
}

#[cfg(test)]
mod tests {
    use super::sort_key;
    use crate::collector::{Collector, InternalError};
    use crate::config::Config;
    use crate::front_end::{
        DeclarationId, DeclarationInfo, DeclarationKind, DeclarationSpec, Entity, FrontEnd,
        ModuleId, ModuleInfo, NamespaceImportId, NamespaceImportInfo, Program, ProgramBuilder,
        ReferenceKind, SymbolId, SymbolInfo,
    };

    /// A front end whose entry export table is supplied directly, so it can
    /// contain entries `ProgramBuilder` refuses.
    struct FixedExports {
        program: Program,
        exports: Vec<(String, Entity)>,
    }

    impl FrontEnd for FixedExports {
        fn package_name(&self) -> &str {
            self.program.package_name()
        }

        fn entry_module(&self) -> ModuleId {
            self.program.entry_module()
        }

        fn module(&self, id: ModuleId) -> &ModuleInfo {
            self.program.module(id)
        }

        fn export_table(&self, _module: ModuleId) -> &[(String, Entity)] {
            &self.exports
        }

        fn symbol(&self, id: SymbolId) -> &SymbolInfo {
            self.program.symbol(id)
        }

        fn declaration(&self, id: DeclarationId) -> &DeclarationInfo {
            self.program.declaration(id)
        }

        fn namespace_import(&self, id: NamespaceImportId) -> &NamespaceImportInfo {
            self.program.namespace_import(id)
        }

        fn global_name_reserved(&self, name: &str) -> bool {
            self.program.global_name_reserved(name)
        }
    }

    fn spec() -> DeclarationSpec {
        DeclarationSpec::new(DeclarationKind::Class).with_doc("/** @public */")
    }

    fn emit_names(collector: &Collector<'_>) -> Vec<String> {
        collector
            .entities()
            .map(|e| e.name_for_emit().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_sort_key_ignores_leading_underscore() {
        let mut names = vec!["beta", "_alpha", "Alpha", "alpha", "Gamma"];
        names.sort_by_key(|n| sort_key(n));
        assert_eq!(names, vec!["Alpha", "alpha", "_alpha", "beta", "Gamma"]);
        assert_ne!(sort_key("_alpha"), sort_key("alpha"));
    }

    #[test]
    fn test_aliased_exports_use_local_name() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (x, _) = builder.declare("X", spec());
        builder.export(index, "P", Entity::Symbol(x)).unwrap();
        builder.export(index, "Q", Entity::Symbol(x)).unwrap();
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        assert_eq!(collector.entities().count(), 1);
        let entity = collector.entity_for(Entity::Symbol(x)).unwrap();
        let exports: Vec<_> = entity.export_names().iter().cloned().collect();
        assert_eq!(exports, vec!["P".to_string(), "Q".to_string()]);
        assert_eq!(entity.name_for_emit(), Some("X"));
    }

    #[test]
    fn test_single_export_name_is_preferred_over_local_name() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (widget, _) = builder.declare("WidgetImpl", spec());
        builder.export(index, "Widget", Entity::Symbol(widget)).unwrap();
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();
        assert_eq!(emit_names(&collector), vec!["Widget"]);
    }

    #[test]
    fn test_forgotten_export_cannot_take_an_exported_name() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let lib = builder.add_module("lib", None);
        // Two unrelated classes that are both called `Options` locally.
        let (exported, exported_decl) = builder.declare("Options", spec());
        let (hidden, _) = builder.declare("Options", spec());
        let (other, _) = builder.declare("Options", spec());
        builder.add_reference(exported_decl, Entity::Symbol(hidden), ReferenceKind::Inheritance);
        builder.add_reference(exported_decl, Entity::Symbol(other), ReferenceKind::Plain);
        builder.export(lib, "Options", Entity::Symbol(hidden)).unwrap();
        builder.export(index, "Options", Entity::Symbol(exported)).unwrap();
        builder.set_entry(index);
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        let name = |symbol| {
            collector
                .entity_for(Entity::Symbol(symbol))
                .and_then(|e| e.name_for_emit())
                .map(str::to_string)
        };
        assert_eq!(name(exported).as_deref(), Some("Options"));
        assert_eq!(name(hidden).as_deref(), Some("Options_2"));
        assert_eq!(name(other).as_deref(), Some("Options_3"));
    }

    #[test]
    fn test_reserved_and_default_names_are_avoided() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        builder.reserve_global("Promise");
        let (promise, _) = builder.declare("Promise", spec());
        let (config_symbol, _) = builder.declare("Settings", spec());
        let (anonymous, _) = builder.declare("default", spec());
        builder.export(index, "Promise", Entity::Symbol(promise)).unwrap();
        builder.export(index, "Settings", Entity::Symbol(config_symbol)).unwrap();
        builder.export(index, "default", Entity::Symbol(anonymous)).unwrap();
        let program = builder.build();

        let config = Config {
            reserved_names: vec!["Settings".to_string()],
            ..Config::default()
        };
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();

        let name = |symbol| {
            collector
                .entity_for(Entity::Symbol(symbol))
                .and_then(|e| e.name_for_emit())
                .unwrap()
                .to_string()
        };
        assert_eq!(name(promise), "Promise_2");
        assert_eq!(name(config_symbol), "Settings_2");
        assert_eq!(name(anonymous), "default_2");
    }

    #[test]
    fn test_qualified_local_name_keeps_outer_component() {
        let mut builder = ProgramBuilder::new("pkg");
        let index = builder.add_module("index", None);
        let (symbol, _) = builder.declare("Outer.Inner", spec());
        builder.export(index, "A", Entity::Symbol(symbol)).unwrap();
        builder.export(index, "B", Entity::Symbol(symbol)).unwrap();
        let program = builder.build();

        let config = Config::default();
        let mut collector = Collector::new(&program, &config);
        collector.analyze().unwrap();
        assert_eq!(emit_names(&collector), vec!["Outer"]);
    }

    #[test]
    fn test_names_are_unique_and_deterministic() {
        let build = || {
            let mut builder = ProgramBuilder::new("pkg");
            let index = builder.add_module("index", None);
            let (root, root_decl) = builder.declare("Item", spec());
            for _ in 0..4 {
                let (hidden, _) = builder.declare("Item", spec());
                builder.add_reference(root_decl, Entity::Symbol(hidden), ReferenceKind::Plain);
            }
            builder.export(index, "Item", Entity::Symbol(root)).unwrap();
            builder.build()
        };

        let config = Config::default();
        let first_program = build();
        let mut first = Collector::new(&first_program, &config);
        first.analyze().unwrap();
        let second_program = build();
        let mut second = Collector::new(&second_program, &config);
        second.analyze().unwrap();

        let names = emit_names(&first);
        assert_eq!(names, emit_names(&second));
        assert_eq!(names, vec!["Item", "Item_2", "Item_3", "Item_4", "Item_5"]);
    }

    #[test]
    fn test_same_export_name_for_two_entities_is_an_internal_error() {
        let mut builder = ProgramBuilder::new("pkg");
        builder.add_module("index", None);
        let (first, _) = builder.declare("Widget", spec());
        let (second, _) = builder.declare("Gadget", spec());
        let front_end = FixedExports {
            program: builder.build(),
            exports: vec![
                ("Widget".to_string(), Entity::Symbol(first)),
                ("Widget".to_string(), Entity::Symbol(second)),
            ],
        };

        let config = Config::default();
        let mut collector = Collector::new(&front_end, &config);
        let err = collector.analyze().unwrap_err();
        assert_eq!(
            err,
            InternalError::DuplicateExportName {
                name: "Widget".to_string()
            }
        );
        assert!(err.to_string().contains("\"Widget\""), "message: {}", err);
    }
}
