use super::error::InternalError;
use crate::front_end::Entity;
use petgraph::graph::NodeIndex;
use std::collections::BTreeSet;

/// The sentinel export name used for `export default`.
pub const DEFAULT_EXPORT_NAME: &str = "default";

/// One node of the output graph, wrapping exactly one [`Entity`].
#[derive(Debug, Clone)]
pub struct CollectorEntity {
    entity: Entity,
    export_names: BTreeSet<String>,
    consumable_via_inheritance: bool,
    consumable: bool,
    namespace_parents: Vec<usize>,
    name_for_emit: Option<String>,
    node: NodeIndex,
    discovery_index: usize,
}

impl CollectorEntity {
    pub(super) fn new(entity: Entity, node: NodeIndex, discovery_index: usize) -> Self {
        Self {
            entity,
            export_names: BTreeSet::new(),
            consumable_via_inheritance: false,
            consumable: false,
            namespace_parents: Vec::new(),
            name_for_emit: None,
            node,
            discovery_index,
        }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Names under which the entry module exports this entity. Empty for a
    /// forgotten export.
    pub fn export_names(&self) -> &BTreeSet<String> {
        &self.export_names
    }

    pub fn is_exported(&self) -> bool {
        !self.export_names.is_empty()
    }

    pub fn single_export_name(&self) -> Option<&str> {
        if self.export_names.len() == 1 {
            self.export_names.iter().next().map(String::as_str)
        } else {
            None
        }
    }

    /// Not exported, but reached through `extends`/`implements` from a
    /// consumable entity.
    pub fn consumable_via_inheritance(&self) -> bool {
        self.consumable_via_inheritance
    }

    /// Exported, reachable by inheritance, or proxied by a consumable
    /// namespace import.
    pub fn is_consumable(&self) -> bool {
        self.consumable
    }

    /// `None` until names have been assigned.
    pub fn name_for_emit(&self) -> Option<&str> {
        self.name_for_emit.as_deref()
    }

    pub fn node(&self) -> NodeIndex {
        self.node
    }

    pub(super) fn discovery_index(&self) -> usize {
        self.discovery_index
    }

    pub(super) fn namespace_parent_indices(&self) -> &[usize] {
        &self.namespace_parents
    }

    pub(super) fn add_export_name(&mut self, name: &str) {
        self.export_names.insert(name.to_string());
    }

    pub(super) fn add_namespace_parent(&mut self, parent: usize) {
        if !self.namespace_parents.contains(&parent) {
            self.namespace_parents.push(parent);
        }
    }

    pub(super) fn mark_consumable(&mut self, via_inheritance: bool) {
        self.consumable = true;
        if via_inheritance && !self.is_exported() {
            self.consumable_via_inheritance = true;
        }
    }

    pub(super) fn set_name_for_emit(
        &mut self,
        name: String,
        local_name: &str,
    ) -> Result<(), InternalError> {
        if self.name_for_emit.is_some() {
            return Err(InternalError::NameAlreadyAssigned {
                entity: local_name.to_string(),
            });
        }
        self.name_for_emit = Some(name);
        Ok(())
    }
}
