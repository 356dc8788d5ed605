//! Entity persistence against a prefab baseline.
//!
//! [`EntityPersister`] turns an [`EntityState`] into an [`EntityRecord`] and
//! back. Components that the entity shares with its prefab are written as
//! deltas, so an entity that was never touched after instantiation persists
//! as little more than its id and prefab name.
//!
//! Restoring degrades gracefully: component types the registry does not know
//! are skipped with a warning, so a save written by a build with more
//! component types still loads. Only construction failures are fatal.

use std::any::TypeId;

use strata_persist::registry::MetadataRegistry;

use crate::entity::{EntityRecord, EntityState, Prefab};
use crate::StoreError;

/// Persists and restores entities through a [`MetadataRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct EntityPersister<'r> {
    registry: &'r MetadataRegistry,
}

impl<'r> EntityPersister<'r> {
    pub fn new(registry: &'r MetadataRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r MetadataRegistry {
        self.registry
    }

    /// A new entity holding deep copies of every registered prefab component.
    ///
    /// # Errors
    ///
    /// [`StoreError::Persist`] if a component cannot be cloned.
    pub fn instantiate(&self, id: u64, prefab: &Prefab) -> Result<EntityState, StoreError> {
        self.instantiate_without(id, prefab, &[])
    }

    fn instantiate_without(
        &self,
        id: u64,
        prefab: &Prefab,
        removed: &[TypeId],
    ) -> Result<EntityState, StoreError> {
        let mut entity = EntityState::from_prefab(id, prefab);
        for base in prefab.components.iter() {
            let Some(meta) = self.registry.for_component(base) else {
                tracing::warn!(
                    prefab = %prefab.name(),
                    "prefab component type not registered -- not copied"
                );
                continue;
            };
            if removed.contains(&meta.type_id()) {
                continue;
            }
            entity.components.insert_boxed(meta.clone_component(base)?);
        }
        Ok(entity)
    }

    /// Record of `entity`, relative to `prefab` when one is given.
    ///
    /// Components whose type also appears in the prefab are written as a
    /// delta against the prefab's instance and left out entirely when
    /// nothing differs. A delta that cannot carry every change (a cleared
    /// optional field, a declined value) is replaced by the full record and
    /// the type is listed in `replaced_components`. Prefab component types
    /// the entity no longer has are listed in `removed_components`.
    pub fn persist(&self, entity: &EntityState, prefab: Option<&Prefab>) -> EntityRecord {
        let mut record = EntityRecord::new(entity.id, prefab.map(|p| p.name().to_owned()));

        for component in entity.components.iter() {
            let Some(meta) = self.registry.for_component(component) else {
                tracing::warn!(
                    entity = entity.id,
                    "component type not registered -- not persisted"
                );
                continue;
            };

            let Some(base) = prefab.and_then(|p| p.components.get_by_type_id(meta.type_id()))
            else {
                record.components.push(meta.serialize(component));
                continue;
            };
            match meta.diff(base, component) {
                None => {}
                Some(delta) if delta.is_complete() => record.components.push(delta.record),
                Some(delta) => {
                    tracing::debug!(
                        entity = entity.id,
                        component = %meta.name(),
                        unwritten = delta.unwritten,
                        "delta cannot carry every change -- writing component in full"
                    );
                    record.components.push(meta.serialize(component));
                    record.replaced_components.push(meta.name().to_owned());
                }
            }
        }

        if let Some(prefab) = prefab {
            for base in prefab.components.iter() {
                let Some(meta) = self.registry.for_component(base) else {
                    continue;
                };
                if !entity.components.contains_type(meta.type_id()) {
                    record.removed_components.push(meta.name().to_owned());
                }
            }
        }

        tracing::debug!(
            entity = entity.id,
            components = record.components.len(),
            removed = record.removed_components.len(),
            "entity persisted"
        );
        record
    }

    /// Rebuild an entity from `record`.
    ///
    /// Starts from copies of the prefab's components, minus the removed and
    /// replaced ones, then merges each component record onto the matching
    /// instance or deserializes a fresh one.
    ///
    /// # Errors
    ///
    /// - [`StoreError::PrefabMismatch`] if `prefab` is not the one the
    ///   record was written against.
    /// - [`StoreError::Persist`] if a component cannot be constructed or
    ///   cloned.
    pub fn restore(
        &self,
        record: &EntityRecord,
        prefab: Option<&Prefab>,
    ) -> Result<EntityState, StoreError> {
        let supplied = prefab.map(|p| p.name());
        if record.prefab.as_deref() != supplied {
            return Err(StoreError::PrefabMismatch {
                entity: record.id,
                expected: record.prefab.clone(),
                supplied: supplied.map(str::to_owned),
            });
        }

        let mut entity = match prefab {
            Some(prefab) => {
                let removed = self.removed_types(record);
                self.instantiate_without(record.id, prefab, &removed)?
            }
            None => EntityState::new(record.id),
        };

        for component_record in &record.components {
            let Some(meta) = self.registry.get_by_name(&component_record.type_name) else {
                tracing::warn!(
                    entity = record.id,
                    component = %component_record.type_name,
                    "unknown component type -- skipped"
                );
                continue;
            };

            match entity.components.get_mut_by_type_id(meta.type_id()) {
                Some(existing) => {
                    let report = meta.deserialize_onto(existing, component_record);
                    if report.failed > 0 {
                        tracing::warn!(
                            entity = record.id,
                            component = %meta.name(),
                            failed = report.failed,
                            "some fields could not be restored"
                        );
                    }
                }
                None => {
                    let component = meta.deserialize(component_record)?;
                    entity.components.insert_boxed(component);
                }
            }
        }

        Ok(entity)
    }

    /// Prefab component types not to copy: removed or written in full.
    fn removed_types(&self, record: &EntityRecord) -> Vec<TypeId> {
        record
            .removed_components
            .iter()
            .chain(&record.replaced_components)
            .filter_map(|name| match self.registry.get_by_name(name) {
                Some(meta) => Some(meta.type_id()),
                None => {
                    tracing::debug!(
                        entity = record.id,
                        component = %name,
                        "excluded component type not registered -- ignored"
                    );
                    None
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
