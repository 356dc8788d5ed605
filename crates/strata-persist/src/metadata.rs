//! Per-component-type schema and serialization operations.
//!
//! A [`ComponentMetadata`] is the single authority for converting between
//! instances of one component type and [`ComponentRecord`]s. It is built
//! once through a [`MetadataBuilder`] and is immutable afterwards, so a
//! shared reference can serve concurrent calls on different instances.
//!
//! # Failure asymmetry
//!
//! | operation            | construction failure | field failure        |
//! |----------------------|----------------------|----------------------|
//! | `clone_component`    | error                | error (first cause)  |
//! | `deserialize`        | error                | logged, skipped      |
//! | `serialize`          | --                   | logged, skipped      |
//! | `serialize_delta`    | --                   | logged, skipped      |
//! | `deserialize_onto`   | --                   | logged, skipped      |
//!
//! Clone promises a fully independent copy, so a partial result is useless.
//! The record operations are best-effort so that partial round-trips survive
//! schema drift.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{SerdeCodec, ValueCodec};
use crate::component::Component;
use crate::field::{fold_name, FieldDescriptor};
use crate::record::ComponentRecord;
use crate::value::Value;
use crate::PersistError;

type Constructor = Box<dyn Fn() -> Box<dyn Component> + Send + Sync>;

// ---------------------------------------------------------------------------
// MergeReport
// ---------------------------------------------------------------------------

/// Summary of one [`ComponentMetadata::deserialize_onto`] call.
///
/// Unknown and declined fields are expected under schema evolution and are
/// not failures. `failed` counts fields whose decoded value could not be
/// written to the component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Fields written onto the component.
    pub applied: usize,
    /// Record entries with no matching field in the schema.
    pub unknown: usize,
    /// Entries the field's codec could not decode.
    pub declined: usize,
    /// Decoded values the setter rejected.
    pub failed: usize,
}

impl MergeReport {
    /// Number of record entries visited.
    pub fn visited(&self) -> usize {
        self.applied + self.unknown + self.declined + self.failed
    }
}

/// Result of [`ComponentMetadata::diff`].
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    /// The changed fields that could be encoded.
    pub record: ComponentRecord,
    /// Changed fields left out: cleared optionals and declined values.
    pub unwritten: usize,
}

impl Delta {
    /// Whether applying `record` onto the base reproduces every change.
    pub fn is_complete(&self) -> bool {
        self.unwritten == 0
    }
}

// ---------------------------------------------------------------------------
// ComponentMetadata
// ---------------------------------------------------------------------------

/// Schema and serialization operations for one component type.
pub struct ComponentMetadata {
    name: String,
    type_id: TypeId,
    rust_type: &'static str,
    constructor: Option<Constructor>,
    /// Registry order; defines record field order.
    fields: Vec<FieldDescriptor>,
    /// Case-folded field name -> index into `fields`.
    index: HashMap<String, usize>,
}

impl ComponentMetadata {
    /// Start a schema for `C`, constructed through `C::default()`.
    pub fn builder<C: Component + Default>(name: &str) -> MetadataBuilder<C> {
        MetadataBuilder::new(name).constructor(C::default)
    }

    /// Registered type name; tags every record this metadata writes.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn rust_type_name(&self) -> &'static str {
        self.rust_type
    }

    /// Field descriptors in registry order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Case-insensitive field lookup.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index.get(&fold_name(name)).map(|&i| &self.fields[i])
    }

    /// Whether `component` is an instance of this metadata's type.
    pub fn handles(&self, component: &dyn Component) -> bool {
        component.as_any().type_id() == self.type_id
    }

    /// A new default instance.
    ///
    /// # Errors
    ///
    /// [`PersistError::Construction`] if no constructor was registered.
    pub fn new_instance(&self) -> Result<Box<dyn Component>, PersistError> {
        match &self.constructor {
            Some(construct) => Ok(construct()),
            None => Err(PersistError::Construction {
                component: self.name.clone(),
                reason: format!("no constructor registered for {}", self.rust_type),
            }),
        }
    }

    /// Deep copy of `component` through each field's codec.
    ///
    /// The copy is independent of the source as far as every codec's `copy`
    /// produces independent values.
    ///
    /// # Errors
    ///
    /// [`PersistError::Clone`] wrapping the first construction, access or
    /// type failure. No partial result is returned.
    pub fn clone_component(
        &self,
        component: &dyn Component,
    ) -> Result<Box<dyn Component>, PersistError> {
        self.copy_fields(component)
            .map_err(|source| PersistError::Clone {
                component: self.name.clone(),
                source: Box::new(source),
            })
    }

    fn copy_fields(&self, component: &dyn Component) -> Result<Box<dyn Component>, PersistError> {
        let mut result = self.new_instance()?;
        for field in &self.fields {
            match field.get(component)? {
                Some(raw) => {
                    let copy = field
                        .codec()
                        .copy(raw)
                        .map_err(|_| field.type_mismatch())?;
                    field.set(&mut *result, copy)?;
                }
                None => field.clear(&mut *result)?,
            }
        }
        Ok(result)
    }

    /// Full record of `component`.
    ///
    /// Absent values and values the codec declines are left out. A field
    /// that cannot be read is logged and skipped; the remaining fields are
    /// still written.
    pub fn serialize(&self, component: &dyn Component) -> ComponentRecord {
        let mut record = ComponentRecord::new(&self.name);
        for field in &self.fields {
            let raw = match field.get(component) {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    tracing::trace!(
                        component = %self.name,
                        field = %field.name(),
                        "field absent -- not written"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        component = %self.name,
                        error = %e,
                        "skipping unreadable field during serialize"
                    );
                    continue;
                }
            };
            if let Some(value) = self.encode_field(field, raw) {
                record.push(field.name(), value);
            }
        }
        record
    }

    /// Record of only the fields whose values differ between `base` and
    /// `delta` (value equality), holding `delta`'s values.
    ///
    /// Returns `None` only when no field differs. A field that is present in
    /// `base` but absent in `delta` cannot be expressed (absent values are
    /// never encoded) and is left out, as is a changed value the codec
    /// declines; the record is still returned, possibly empty. Use
    /// [`diff`](Self::diff) to learn whether every change was written.
    pub fn serialize_delta(
        &self,
        base: &dyn Component,
        delta: &dyn Component,
    ) -> Option<ComponentRecord> {
        self.diff(base, delta).map(|d| d.record)
    }

    /// Like [`serialize_delta`](Self::serialize_delta), also counting the
    /// changed fields the record could not carry.
    pub fn diff(&self, base: &dyn Component, delta: &dyn Component) -> Option<Delta> {
        let mut record = ComponentRecord::new(&self.name);
        let mut changed = 0;
        let mut unwritten = 0;
        for field in &self.fields {
            let (original, candidate) = match (field.get(base), field.get(delta)) {
                (Ok(original), Ok(candidate)) => (original, candidate),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!(
                        component = %self.name,
                        error = %e,
                        "skipping unreadable field during delta serialize"
                    );
                    continue;
                }
            };

            let differs = match (original, candidate) {
                (None, None) => false,
                (Some(a), Some(b)) => !field.codec().values_equal(a, b),
                _ => true,
            };
            if !differs {
                continue;
            }
            changed += 1;

            let Some(candidate) = candidate else {
                tracing::debug!(
                    component = %self.name,
                    field = %field.name(),
                    "field cleared in delta -- absence cannot be written"
                );
                unwritten += 1;
                continue;
            };
            match self.encode_field(field, candidate) {
                Some(value) => record.push(field.name(), value),
                None => unwritten += 1,
            }
        }

        if changed == 0 {
            None
        } else {
            Some(Delta { record, unwritten })
        }
    }

    fn encode_field(&self, field: &FieldDescriptor, raw: &dyn Any) -> Option<Value> {
        match field.codec().encode(raw) {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                tracing::debug!(
                    component = %self.name,
                    field = %field.name(),
                    value_type = field.value_type_name(),
                    "codec declined value -- not written"
                );
                None
            }
            Err(_) => {
                tracing::warn!(
                    component = %self.name,
                    error = %field.type_mismatch(),
                    "getter and codec disagree on value type"
                );
                None
            }
        }
    }

    /// New instance populated from `record`.
    ///
    /// # Errors
    ///
    /// [`PersistError::Construction`] if the type cannot be instantiated.
    /// Field-level problems follow [`deserialize_onto`](Self::deserialize_onto).
    pub fn deserialize(&self, record: &ComponentRecord) -> Result<Box<dyn Component>, PersistError> {
        let mut component = self.new_instance()?;
        self.deserialize_onto(&mut *component, record);
        Ok(component)
    }

    /// Merge `record` onto an existing instance.
    ///
    /// Fields missing from the record keep their current values. Entries
    /// with unknown names, and values the codec declines, are skipped. A
    /// value that cannot be written is logged and the merge carries on.
    /// Applying the same record again leaves the component unchanged.
    pub fn deserialize_onto(
        &self,
        component: &mut dyn Component,
        record: &ComponentRecord,
    ) -> MergeReport {
        if fold_name(&record.type_name) != fold_name(&self.name) {
            tracing::debug!(
                component = %self.name,
                record_type = %record.type_name,
                "record type tag differs from component type"
            );
        }

        let mut report = MergeReport::default();
        for entry in &record.fields {
            let Some(field) = self.field(&entry.name) else {
                tracing::debug!(
                    component = %self.name,
                    field = %entry.name,
                    "unknown field in record -- skipped"
                );
                report.unknown += 1;
                continue;
            };

            let Some(value) = field.codec().decode(&entry.value) else {
                tracing::debug!(
                    component = %self.name,
                    field = %field.name(),
                    encoded_kind = entry.value.kind(),
                    "codec declined encoded value -- skipped"
                );
                report.declined += 1;
                continue;
            };

            match field.set(component, value) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    tracing::warn!(
                        component = %self.name,
                        error = %e,
                        "failed to write field during deserialize"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}

impl fmt::Debug for ComponentMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentMetadata")
            .field("name", &self.name)
            .field("type", &self.rust_type)
            .field("constructible", &self.constructor.is_some())
            .field("fields", &self.fields)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// MetadataBuilder
// ---------------------------------------------------------------------------

/// Builds the [`ComponentMetadata`] for component type `C`.
///
/// Fields keep the order in which they are added. Field names must be unique
/// ignoring case; [`build`](Self::build) rejects collisions.
pub struct MetadataBuilder<C> {
    name: String,
    constructor: Option<Constructor>,
    fields: Vec<FieldDescriptor>,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Component> MetadataBuilder<C> {
    /// A builder with no constructor. [`ComponentMetadata::clone_component`]
    /// and [`ComponentMetadata::deserialize`] will fail until one is set.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            constructor: None,
            fields: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn constructor(mut self, construct: fn() -> C) -> Self {
        self.constructor = Some(Box::new(move || Box::new(construct()) as Box<dyn Component>));
        self
    }

    /// Add a required field using [`SerdeCodec`].
    pub fn field<V>(self, name: &str, get: fn(&C) -> &V, set: fn(&mut C, V)) -> Self
    where
        V: Serialize + DeserializeOwned + Clone + PartialEq + 'static,
    {
        self.field_with(name, get, set, SerdeCodec::<V>::new())
    }

    /// Add a required field with an explicit codec.
    pub fn field_with<V, K>(
        self,
        name: &str,
        get: fn(&C) -> &V,
        set: fn(&mut C, V),
        codec: K,
    ) -> Self
    where
        V: PartialEq + 'static,
        K: ValueCodec<V> + 'static,
    {
        self.add_field(FieldDescriptor::required(name, get, set, codec))
    }

    /// Add an `Option<V>` field using [`SerdeCodec`].
    pub fn optional_field<V>(
        self,
        name: &str,
        get: fn(&C) -> Option<&V>,
        set: fn(&mut C, Option<V>),
    ) -> Self
    where
        V: Serialize + DeserializeOwned + Clone + PartialEq + 'static,
    {
        self.optional_field_with(name, get, set, SerdeCodec::<V>::new())
    }

    /// Add an `Option<V>` field with an explicit codec.
    pub fn optional_field_with<V, K>(
        self,
        name: &str,
        get: fn(&C) -> Option<&V>,
        set: fn(&mut C, Option<V>),
        codec: K,
    ) -> Self
    where
        V: PartialEq + 'static,
        K: ValueCodec<V> + 'static,
    {
        self.add_field(FieldDescriptor::optional(name, get, set, codec))
    }

    pub fn add_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Finish the schema.
    ///
    /// # Errors
    ///
    /// [`PersistError::DuplicateField`] if two fields share a case-folded
    /// name; [`PersistError::Access`] if a descriptor was built for a
    /// different component type.
    pub fn build(self) -> Result<ComponentMetadata, PersistError> {
        let rust_type = type_name::<C>();
        let mut index = HashMap::with_capacity(self.fields.len());
        for (i, field) in self.fields.iter().enumerate() {
            if field.component_type_name() != rust_type {
                return Err(field.access_error());
            }
            if let Some(&existing) = index.get(field.key()) {
                let existing: &FieldDescriptor = &self.fields[existing];
                return Err(PersistError::DuplicateField {
                    component: self.name,
                    field: field.name().to_owned(),
                    existing: existing.name().to_owned(),
                });
            }
            index.insert(field.key().to_owned(), i);
        }

        Ok(ComponentMetadata {
            name: self.name,
            type_id: TypeId::of::<C>(),
            rust_type,
            constructor: self.constructor,
            fields: self.fields,
            index,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
