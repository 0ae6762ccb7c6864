//! The entity-graph and metadata engine.
//!
//! [`Collector::analyze`] runs the passes in order: entity graph construction
//! from the entry module's exports, emit-name assignment, then metadata
//! propagation for every declaration reachable from the graph. Per-declaration
//! metadata is computed once and frozen.

mod entity;
mod error;
mod frozen;
mod graph;
mod metadata;
mod naming;
mod propagate;

pub use entity::{CollectorEntity, DEFAULT_EXPORT_NAME};
pub use error::InternalError;
pub use graph::EdgeKind;
pub use metadata::{ApiItemMetadata, DeclarationMetadata, ReleaseTag, SymbolMetadata};
pub use naming::sort_key;

use crate::config::Config;
use crate::excerpt::ReferenceResolver;
use crate::front_end::{DeclarationId, Entity, FrontEnd, SymbolId};
use crate::model::{Diagnostic, Location};
use frozen::FrozenMap;
use petgraph::graph::DiGraph;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{info, instrument, warn};

pub struct Collector<'a> {
    front_end: &'a dyn FrontEnd,
    config: &'a Config,
    analyzed: bool,
    entities: Vec<CollectorEntity>,
    entity_indices: HashMap<Entity, usize>,
    graph: DiGraph<Entity, EdgeKind>,
    sorted: Vec<usize>,
    declaration_metadata: HashMap<DeclarationId, DeclarationMetadata>,
    api_item_metadata: FrozenMap<DeclarationId, Rc<ApiItemMetadata>>,
    symbol_metadata: FrozenMap<SymbolId, SymbolMetadata>,
    overload_indices: HashMap<DeclarationId, usize>,
    missing_tag_reported: HashSet<SymbolId>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Collector<'a> {
    pub fn new(front_end: &'a dyn FrontEnd, config: &'a Config) -> Self {
        Self {
            front_end,
            config,
            analyzed: false,
            entities: Vec::new(),
            entity_indices: HashMap::new(),
            graph: DiGraph::new(),
            sorted: Vec::new(),
            declaration_metadata: HashMap::new(),
            api_item_metadata: FrozenMap::new(),
            symbol_metadata: FrozenMap::new(),
            overload_indices: HashMap::new(),
            missing_tag_reported: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Build the entity graph, assign names, and resolve metadata for every
    /// declaration in the graph. May only be called once.
    #[instrument(skip_all, fields(package = self.front_end.package_name()))]
    pub fn analyze(&mut self) -> Result<(), InternalError> {
        if self.analyzed {
            return Err(InternalError::AlreadyAnalyzed);
        }
        self.analyzed = true;

        self.build_entity_graph()?;
        self.assign_names()?;
        self.sort_entities();

        let roots: Vec<SymbolId> = self
            .entities
            .iter()
            .filter_map(|entity| match entity.entity() {
                Entity::Symbol(symbol) => Some(symbol),
                Entity::NamespaceImport(_) => None,
            })
            .collect();
        for root in roots {
            self.resolve_symbol_tree(root)?;
        }

        info!(
            entities = self.entities.len(),
            diagnostics = self.diagnostics.len(),
            "analysis complete"
        );
        Ok(())
    }

    pub fn front_end(&self) -> &'a dyn FrontEnd {
        self.front_end
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// All entities, ordered by emit name.
    pub fn entities(&self) -> impl Iterator<Item = &CollectorEntity> + '_ {
        self.sorted.iter().map(|&index| &self.entities[index])
    }

    pub fn entity_for(&self, entity: Entity) -> Option<&CollectorEntity> {
        self.entity_indices
            .get(&entity)
            .map(|&index| &self.entities[index])
    }

    /// Namespace imports that re-export `entity`. An entity reachable through
    /// several aliases lists all of them.
    pub fn namespace_parents<'s>(
        &'s self,
        entity: &'s CollectorEntity,
    ) -> impl Iterator<Item = &'s CollectorEntity> + 's {
        entity
            .namespace_parent_indices()
            .iter()
            .map(|&index| &self.entities[index])
    }

    pub fn reference_graph(&self) -> &DiGraph<Entity, EdgeKind> {
        &self.graph
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Record a diagnostic, applying the configured severity. Suppressed
    /// diagnostics are dropped.
    fn report(&mut self, mut diagnostic: Diagnostic) {
        let Some(severity) = self.config.severity_for(diagnostic.kind) else {
            return;
        };
        diagnostic.severity = severity;
        warn!(
            id = diagnostic.kind.message_id(),
            "{}", diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }

    fn location(&self, declaration: DeclarationId) -> Location {
        let info = self.front_end.declaration(declaration);
        Location {
            symbol: self.qualified_name(info.symbol),
            module: info.module.map(|id| self.front_end.module(id).name.clone()),
            line: (info.line > 0).then_some(info.line),
        }
    }

    /// `Outer.Inner.member` style name of a symbol.
    pub fn qualified_name(&self, symbol: SymbolId) -> String {
        let mut parts = vec![self.front_end.symbol(symbol).name.as_str()];
        let mut current = symbol;
        while let Some(parent) = self.front_end.symbol(current).parent {
            parts.push(self.front_end.symbol(parent).name.as_str());
            current = parent;
        }
        parts.reverse();
        parts.join(".")
    }

    fn describe_declaration(&self, declaration: DeclarationId) -> String {
        let info = self.front_end.declaration(declaration);
        format!(
            "{} \"{}\" (declaration #{}, line {})",
            info.kind,
            self.qualified_name(info.symbol),
            declaration.index(),
            info.line
        )
    }

    fn describe_entity(&self, entity: Entity) -> String {
        match entity {
            Entity::Symbol(symbol) => format!("symbol \"{}\"", self.qualified_name(symbol)),
            Entity::NamespaceImport(id) => format!(
                "namespace import \"{}\"",
                self.front_end.namespace_import(id).name
            ),
        }
    }
}

impl ReferenceResolver for Collector<'_> {
    /// `package!Name` for root entities, `package!Name.member` for members.
    fn canonical_reference(&self, entity: Entity) -> Option<String> {
        let front_end = self.front_end;
        match entity {
            Entity::Symbol(symbol) => {
                let info = front_end.symbol(symbol);
                if let Some(package) = &info.external_package {
                    return Some(format!("{}!{}", package, info.name));
                }
                let root = front_end.root_symbol(symbol);
                let name = self.entity_for(Entity::Symbol(root))?.name_for_emit()?;
                let mut members = Vec::new();
                let mut current = symbol;
                while current != root {
                    members.push(front_end.symbol(current).name.as_str());
                    current = front_end.symbol(current).parent?;
                }
                members.reverse();
                let mut reference = format!("{}!{}", front_end.package_name(), name);
                for member in members {
                    reference.push('.');
                    reference.push_str(member);
                }
                Some(reference)
            }
            Entity::NamespaceImport(_) => {
                let name = self.entity_for(entity)?.name_for_emit()?;
                Some(format!("{}!{}", front_end.package_name(), name))
            }
        }
    }
}
