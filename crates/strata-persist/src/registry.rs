//! Registry of component metadata.
//!
//! Every component type that takes part in persistence is registered once in
//! a [`MetadataRegistry`], keyed both by Rust `TypeId` (for live instances)
//! and by case-insensitive type name (for records read back from storage).

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::component::Component;
use crate::field::fold_name;
use crate::metadata::ComponentMetadata;
use crate::record::ComponentRecord;
use crate::PersistError;

/// Maps component types to their [`ComponentMetadata`].
///
/// Registering the same Rust type twice returns the existing entry; the
/// second metadata is discarded.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    /// TypeId -> index for dedup and instance lookup.
    by_type: HashMap<TypeId, usize>,
    /// Case-folded name -> index.
    by_name: HashMap<String, usize>,
    entries: Vec<Arc<ComponentMetadata>>,
}

impl MetadataRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type.
    ///
    /// # Errors
    ///
    /// [`PersistError::DuplicateComponent`] if a different Rust type already
    /// uses the same name (ignoring case).
    pub fn register(
        &mut self,
        metadata: ComponentMetadata,
    ) -> Result<Arc<ComponentMetadata>, PersistError> {
        if let Some(&existing) = self.by_type.get(&metadata.type_id()) {
            tracing::debug!(
                component = %metadata.name(),
                existing = %self.entries[existing].name(),
                "component type already registered -- keeping existing metadata"
            );
            return Ok(Arc::clone(&self.entries[existing]));
        }

        let key = fold_name(metadata.name());
        if self.by_name.contains_key(&key) {
            return Err(PersistError::DuplicateComponent {
                name: metadata.name().to_owned(),
            });
        }

        let index = self.entries.len();
        self.by_type.insert(metadata.type_id(), index);
        self.by_name.insert(key, index);
        let metadata = Arc::new(metadata);
        self.entries.push(Arc::clone(&metadata));
        Ok(metadata)
    }

    pub fn get<T: Component>(&self) -> Option<&Arc<ComponentMetadata>> {
        self.get_by_type_id(TypeId::of::<T>())
    }

    pub fn get_by_type_id(&self, type_id: TypeId) -> Option<&Arc<ComponentMetadata>> {
        self.by_type.get(&type_id).map(|&i| &self.entries[i])
    }

    /// Case-insensitive lookup by registered name.
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<ComponentMetadata>> {
        self.by_name.get(&fold_name(name)).map(|&i| &self.entries[i])
    }

    /// Metadata for the concrete type of `component`.
    pub fn for_component(&self, component: &dyn Component) -> Option<&Arc<ComponentMetadata>> {
        self.get_by_type_id(component.as_any().type_id())
    }

    /// Full record of `component` through its registered metadata.
    pub fn serialize(&self, component: &dyn Component) -> Result<ComponentRecord, PersistError> {
        self.for_component(component)
            .map(|meta| meta.serialize(component))
            .ok_or_else(|| self.unknown(&format!("{:?}", component.as_any().type_id())))
    }

    /// New instance from `record`, dispatched on its type tag.
    pub fn deserialize(&self, record: &ComponentRecord) -> Result<Box<dyn Component>, PersistError> {
        self.get_by_name(&record.type_name)
            .ok_or_else(|| self.unknown(&record.type_name))?
            .deserialize(record)
    }

    pub(crate) fn unknown(&self, name: &str) -> PersistError {
        PersistError::UnknownComponent {
            name: name.to_owned(),
            registered: self.registered_names().join(", "),
        }
    }

    /// Registered type names, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.iter().map(|m| m.name()).collect();
        names.sort();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ComponentMetadata>> {
        self.entries.iter()
    }

    /// Total number of registered component types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any component types have been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Pos {
        x: f32,
        y: f32,
    }
    impl Component for Pos {}

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Vel {
        dx: f32,
    }
    impl Component for Vel {}

    fn pos_meta(name: &str) -> ComponentMetadata {
        ComponentMetadata::builder::<Pos>(name)
            .field("x", |p| &p.x, |p, v| p.x = v)
            .field("y", |p| &p.y, |p, v| p.y = v)
            .build()
            .unwrap()
    }

    fn vel_meta(name: &str) -> ComponentMetadata {
        ComponentMetadata::builder::<Vel>(name)
            .field("dx", |v| &v.dx, |v, x| v.dx = x)
            .build()
            .unwrap()
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = MetadataRegistry::new();
        let meta = reg.register(pos_meta("Position")).unwrap();
        assert!(Arc::ptr_eq(reg.get::<Pos>().unwrap(), &meta));
        assert!(Arc::ptr_eq(reg.get_by_name("position").unwrap(), &meta));
        assert!(Arc::ptr_eq(reg.for_component(&Pos::default()).unwrap(), &meta));
        assert!(reg.get::<Vel>().is_none());
    }

    #[test]
    fn same_type_keeps_first_registration() {
        let mut reg = MetadataRegistry::new();
        let first = reg.register(pos_meta("Position")).unwrap();
        let second = reg.register(pos_meta("PositionAgain")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reg.len(), 1);
        assert!(reg.get_by_name("PositionAgain").is_none());
    }

    #[test]
    fn colliding_name_for_other_type_is_rejected() {
        let mut reg = MetadataRegistry::new();
        reg.register(pos_meta("Motion")).unwrap();
        let err = reg.register(vel_meta("MOTION")).unwrap_err();
        assert!(matches!(err, PersistError::DuplicateComponent { .. }));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn dispatching_roundtrip() {
        let mut reg = MetadataRegistry::new();
        reg.register(pos_meta("Position")).unwrap();
        reg.register(vel_meta("Velocity")).unwrap();
        assert_eq!(reg.registered_names(), vec!["Position", "Velocity"]);

        let record = reg.serialize(&Vel { dx: 4.0 }).unwrap();
        assert_eq!(record.type_name, "Velocity");
        let back = reg.deserialize(&record).unwrap();
        assert_eq!(back.downcast_ref::<Vel>(), Some(&Vel { dx: 4.0 }));
    }

    #[test]
    fn unknown_type_errors() {
        #[derive(Default)]
        struct Stray;
        impl Component for Stray {}

        let mut reg = MetadataRegistry::new();
        reg.register(pos_meta("Position")).unwrap();
        assert!(matches!(
            reg.serialize(&Stray),
            Err(PersistError::UnknownComponent { .. })
        ));
        match reg.deserialize(&ComponentRecord::new("Ghost")) {
            Err(PersistError::UnknownComponent { name, registered }) => {
                assert_eq!(name, "Ghost");
                assert_eq!(registered, "Position");
            }
            other => panic!("expected UnknownComponent, got {:?}", other.map(|_| ())),
        }
    }
}
