//! Live entity state, prefabs and the entity record container.
//!
//! An [`EntityState`] owns its components as `Box<dyn Component>`, at most
//! one per concrete type. A [`Prefab`] is a named template whose components
//! act as the baseline when an entity is persisted as a delta. An
//! [`EntityRecord`] is the stored form of one entity.

use std::any::TypeId;

use serde::{Deserialize, Serialize};
use strata_persist::component::Component;
use strata_persist::field::fold_name;
use strata_persist::record::ComponentRecord;

fn type_of(component: &dyn Component) -> TypeId {
    component.as_any().type_id()
}

// ---------------------------------------------------------------------------
// ComponentSet
// ---------------------------------------------------------------------------

/// Components keyed by concrete type, in insertion order.
#[derive(Default)]
pub struct ComponentSet {
    components: Vec<Box<dyn Component>>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, type_id: TypeId) -> Option<usize> {
        self.components
            .iter()
            .position(|c| type_of(&**c) == type_id)
    }

    /// Insert a boxed component, returning the one it replaced.
    pub fn insert_boxed(&mut self, component: Box<dyn Component>) -> Option<Box<dyn Component>> {
        match self.position(type_of(&*component)) {
            Some(i) => Some(std::mem::replace(&mut self.components[i], component)),
            None => {
                self.components.push(component);
                None
            }
        }
    }

    pub fn insert<T: Component>(&mut self, component: T) -> Option<Box<dyn Component>> {
        self.insert_boxed(Box::new(component))
    }

    pub fn remove_by_type_id(&mut self, type_id: TypeId) -> Option<Box<dyn Component>> {
        self.position(type_id).map(|i| self.components.remove(i))
    }

    pub fn get_by_type_id(&self, type_id: TypeId) -> Option<&dyn Component> {
        self.position(type_id).map(|i| &*self.components[i])
    }

    pub fn get_mut_by_type_id(&mut self, type_id: TypeId) -> Option<&mut dyn Component> {
        match self.position(type_id) {
            Some(i) => Some(&mut *self.components[i]),
            None => None,
        }
    }

    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.position(type_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Component> {
        self.components.iter().map(|c| &**c)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

// ---------------------------------------------------------------------------
// EntityState
// ---------------------------------------------------------------------------

/// An entity's live components.
pub struct EntityState {
    pub id: u64,
    /// Name of the prefab this entity was instantiated from.
    pub prefab: Option<String>,
    pub components: ComponentSet,
}

impl EntityState {
    /// An entity with no prefab and no components.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            prefab: None,
            components: ComponentSet::new(),
        }
    }

    /// An empty entity that records `prefab` as its origin.
    ///
    /// Components are not copied; [`EntityPersister::instantiate`] does that.
    ///
    /// [`EntityPersister::instantiate`]: crate::persister::EntityPersister::instantiate
    pub fn from_prefab(id: u64, prefab: &Prefab) -> Self {
        Self {
            id,
            prefab: Some(prefab.name().to_owned()),
            components: ComponentSet::new(),
        }
    }

    pub fn with_component<T: Component>(mut self, component: T) -> Self {
        self.components.insert(component);
        self
    }

    pub fn insert<T: Component>(&mut self, component: T) -> Option<Box<dyn Component>> {
        self.components.insert(component)
    }

    pub fn remove<T: Component>(&mut self) -> Option<Box<T>> {
        self.components
            .remove_by_type_id(TypeId::of::<T>())
            .and_then(|c| c.downcast::<T>())
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        self.components
            .get_by_type_id(TypeId::of::<T>())
            .and_then(|c| c.downcast_ref::<T>())
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .get_mut_by_type_id(TypeId::of::<T>())
            .and_then(|c| c.downcast_mut::<T>())
    }

    pub fn has<T: Component>(&self) -> bool {
        self.components.contains_type(TypeId::of::<T>())
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

// ---------------------------------------------------------------------------
// Prefab
// ---------------------------------------------------------------------------

/// A named component template.
pub struct Prefab {
    name: String,
    pub components: ComponentSet,
}

impl Prefab {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            components: ComponentSet::new(),
        }
    }

    pub fn with_component<T: Component>(mut self, component: T) -> Self {
        self.components.insert(component);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// EntityRecord
// ---------------------------------------------------------------------------

/// Stored form of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: u64,
    /// Prefab the component records are relative to.
    pub prefab: Option<String>,
    /// Full records, or deltas against the prefab's instance of that type.
    pub components: Vec<ComponentRecord>,
    /// Prefab component types this entity no longer has.
    pub removed_components: Vec<String>,
    /// Prefab component types written in full because a delta could not
    /// carry every change; restored without the prefab's values.
    pub replaced_components: Vec<String>,
}

impl EntityRecord {
    pub fn new(id: u64, prefab: Option<String>) -> Self {
        Self {
            id,
            prefab,
            components: Vec::new(),
            removed_components: Vec::new(),
            replaced_components: Vec::new(),
        }
    }

    /// Component record by type name, ignoring case.
    pub fn component(&self, type_name: &str) -> Option<&ComponentRecord> {
        let key = fold_name(type_name);
        self.components
            .iter()
            .find(|c| fold_name(&c.type_name) == key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
