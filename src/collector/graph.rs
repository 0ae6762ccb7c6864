//! Entity graph construction: the transitive closure of everything the entry
//! module exposes, directly or through inheritance.

use super::Collector;
use super::entity::CollectorEntity;
use super::error::InternalError;
use crate::front_end::{DeclarationId, Entity, ReferenceKind, SymbolId};
use petgraph::visit::EdgeRef;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, instrument, trace};

/// Label of an edge in the reference graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Reference(ReferenceKind),
    /// Namespace import to one of the entities it re-exports.
    NamespaceMember,
}

impl Collector<'_> {
    #[instrument(level = "debug", skip(self))]
    pub(super) fn build_entity_graph(&mut self) -> Result<(), InternalError> {
        let front_end = self.front_end;
        let entry = front_end.entry_module();

        for (export_name, entity) in front_end.export_table(entry) {
            let entity = self.canonical_entity(*entity);
            let index = self.get_or_create_entity(entity);
            self.entities[index].add_export_name(export_name);
        }

        let exported: Vec<Entity> = self.entities.iter().map(CollectorEntity::entity).collect();
        let mut visited = HashSet::new();
        for entity in exported {
            self.expand_entity(entity, &mut visited)?;
        }

        self.propagate_consumability();
        debug!(entities = self.entities.len(), "entity graph built");
        Ok(())
    }

    /// Nested members never get their own node; references to them land on
    /// the root symbol that contains them.
    fn canonical_entity(&self, entity: Entity) -> Entity {
        match entity {
            Entity::Symbol(id) => Entity::Symbol(self.front_end.root_symbol(id)),
            other => other,
        }
    }

    fn get_or_create_entity(&mut self, entity: Entity) -> usize {
        if let Some(&index) = self.entity_indices.get(&entity) {
            return index;
        }
        let index = self.entities.len();
        let node = self.graph.add_node(entity);
        debug_assert_eq!(node.index(), index);
        self.entities.push(CollectorEntity::new(entity, node, index));
        self.entity_indices.insert(entity, index);
        trace!(
            name = self.front_end.entity_local_name(entity),
            "created collector entity"
        );
        index
    }

    pub(super) fn require_entity(&self, entity: Entity) -> Result<usize, InternalError> {
        self.entity_indices
            .get(&entity)
            .copied()
            .ok_or_else(|| InternalError::MissingCollectorEntity {
                entity: self.describe_entity(entity),
            })
    }

    fn add_edge(&mut self, from: usize, to: usize, kind: EdgeKind) {
        let (from, to) = (self.entities[from].node(), self.entities[to].node());
        let exists = self
            .graph
            .edges_connecting(from, to)
            .any(|edge| *edge.weight() == kind);
        if !exists {
            self.graph.add_edge(from, to, kind);
        }
    }

    fn expand_entity(
        &mut self,
        entity: Entity,
        visited: &mut HashSet<Entity>,
    ) -> Result<(), InternalError> {
        if !visited.insert(entity) {
            return Ok(());
        }
        let front_end = self.front_end;

        match entity {
            Entity::Symbol(symbol) => {
                let source = self.require_entity(entity)?;
                for declaration in self.declarations_recursive(symbol) {
                    for reference in front_end.entity_references(declaration) {
                        let target = self.canonical_entity(reference.target);
                        let index = self.get_or_create_entity(target);
                        self.add_edge(source, index, EdgeKind::Reference(reference.kind));
                        self.expand_entity(target, visited)?;
                    }
                }
            }
            Entity::NamespaceImport(namespace) => {
                let source = self.require_entity(entity)?;
                let module = front_end.namespace_import(namespace).module;
                for (_, member) in front_end.export_table(module) {
                    let member = self.canonical_entity(*member);
                    let index = self.get_or_create_entity(member);
                    self.entities[index].add_namespace_parent(source);
                    self.add_edge(source, index, EdgeKind::NamespaceMember);
                    self.expand_entity(member, visited)?;
                }
            }
        }
        Ok(())
    }

    /// Every declaration of `symbol` and, recursively, of its members.
    pub fn declarations_recursive(&self, symbol: SymbolId) -> Vec<DeclarationId> {
        let mut result = Vec::new();
        let mut stack: Vec<DeclarationId> = self
            .front_end
            .symbol(symbol)
            .declarations
            .iter()
            .rev()
            .copied()
            .collect();
        while let Some(declaration) = stack.pop() {
            result.push(declaration);
            let children = &self.front_end.declaration(declaration).children;
            stack.extend(children.iter().rev().copied());
        }
        result
    }

    /// Marks consumable entities. Exported entities are consumable; the flag
    /// flows along inheritance and namespace-member edges, never along plain
    /// references. Running this after the traversal makes the result
    /// independent of the order entities were discovered in.
    fn propagate_consumability(&mut self) {
        let mut queue: VecDeque<usize> = VecDeque::new();
        for entity in &mut self.entities {
            if entity.is_exported() {
                entity.mark_consumable(false);
                queue.push_back(entity.discovery_index());
            }
        }

        while let Some(index) = queue.pop_front() {
            let node = self.entities[index].node();
            let edges: Vec<(usize, EdgeKind)> = self
                .graph
                .edges(node)
                .map(|edge| (edge.target().index(), *edge.weight()))
                .collect();

            for (target, kind) in edges {
                let via_inheritance = match kind {
                    EdgeKind::Reference(ReferenceKind::Inheritance) => true,
                    EdgeKind::NamespaceMember => false,
                    EdgeKind::Reference(ReferenceKind::Plain) => continue,
                };
                let entity = &mut self.entities[target];
                let newly_consumable = !entity.is_consumable();
                entity.mark_consumable(via_inheritance);
                if newly_consumable {
                    queue.push_back(target);
                }
            }
        }
    }
}
