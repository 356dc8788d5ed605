//! Field descriptors: one named field of a component type.
//!
//! A [`FieldDescriptor`] binds a field name to a getter/setter pair on the
//! concrete component type and to the [`FieldCodec`] for the field's value
//! type. Descriptors are built once, when a component type is registered,
//! and are immutable afterwards.
//!
//! Fields come in two shapes:
//!
//! - **required** -- always holds a value (`get` yields `Some`).
//! - **optional** -- backed by an `Option<V>`; an absent value is never
//!   encoded and can be restored with [`FieldDescriptor::clear`].

use std::any::{type_name, Any};
use std::fmt;

use crate::codec::{self, FieldCodec, ValueCodec};
use crate::component::Component;
use crate::PersistError;

/// Case-folded lookup key for a field or component name.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

// ---------------------------------------------------------------------------
// Typed accessors
// ---------------------------------------------------------------------------

enum AccessFault {
    WrongComponent,
    WrongValue,
}

trait FieldAccess: Send + Sync {
    fn get<'c>(&self, component: &'c dyn Component) -> Result<Option<&'c dyn Any>, AccessFault>;
    fn set(&self, component: &mut dyn Component, value: Box<dyn Any>) -> Result<(), AccessFault>;
    fn clear(&self, component: &mut dyn Component) -> Result<(), AccessFault>;
    fn is_optional(&self) -> bool;
}

enum Accessor<C, V> {
    Required {
        get: fn(&C) -> &V,
        set: fn(&mut C, V),
    },
    Optional {
        get: fn(&C) -> Option<&V>,
        set: fn(&mut C, Option<V>),
    },
}

impl<C: Component, V: 'static> FieldAccess for Accessor<C, V> {
    fn get<'c>(&self, component: &'c dyn Component) -> Result<Option<&'c dyn Any>, AccessFault> {
        let target = component
            .as_any()
            .downcast_ref::<C>()
            .ok_or(AccessFault::WrongComponent)?;
        Ok(match self {
            Accessor::Required { get, .. } => Some(get(target) as &dyn Any),
            Accessor::Optional { get, .. } => get(target).map(|v| v as &dyn Any),
        })
    }

    fn set(&self, component: &mut dyn Component, value: Box<dyn Any>) -> Result<(), AccessFault> {
        let target = component
            .as_any_mut()
            .downcast_mut::<C>()
            .ok_or(AccessFault::WrongComponent)?;
        let value = value
            .downcast::<V>()
            .map_err(|_| AccessFault::WrongValue)?;
        match self {
            Accessor::Required { set, .. } => set(target, *value),
            Accessor::Optional { set, .. } => set(target, Some(*value)),
        }
        Ok(())
    }

    fn clear(&self, component: &mut dyn Component) -> Result<(), AccessFault> {
        let target = component
            .as_any_mut()
            .downcast_mut::<C>()
            .ok_or(AccessFault::WrongComponent)?;
        if let Accessor::Optional { set, .. } = self {
            set(target, None);
        }
        Ok(())
    }

    fn is_optional(&self) -> bool {
        matches!(self, Accessor::Optional { .. })
    }
}

// ---------------------------------------------------------------------------
// FieldDescriptor
// ---------------------------------------------------------------------------

/// Describes one named field of a component type.
pub struct FieldDescriptor {
    name: String,
    key: String,
    component_type: &'static str,
    access: Box<dyn FieldAccess>,
    codec: Box<dyn FieldCodec>,
}

impl FieldDescriptor {
    /// Descriptor for a field that always holds a value.
    pub fn required<C, V, K>(name: &str, get: fn(&C) -> &V, set: fn(&mut C, V), codec: K) -> Self
    where
        C: Component,
        V: PartialEq + 'static,
        K: ValueCodec<V> + 'static,
    {
        Self::from_parts::<C>(
            name,
            Box::new(Accessor::Required { get, set }),
            codec::erase::<V, K>(codec),
        )
    }

    /// Descriptor for an `Option<V>` field. `None` reads as absent.
    pub fn optional<C, V, K>(
        name: &str,
        get: fn(&C) -> Option<&V>,
        set: fn(&mut C, Option<V>),
        codec: K,
    ) -> Self
    where
        C: Component,
        V: PartialEq + 'static,
        K: ValueCodec<V> + 'static,
    {
        Self::from_parts::<C>(
            name,
            Box::new(Accessor::Optional { get, set }),
            codec::erase::<V, K>(codec),
        )
    }

    fn from_parts<C: Component>(
        name: &str,
        access: Box<dyn FieldAccess>,
        codec: Box<dyn FieldCodec>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            key: fold_name(name),
            component_type: type_name::<C>(),
            access,
            codec,
        }
    }

    /// Name as registered; used verbatim when writing records.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-folded name used for lookups.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_optional(&self) -> bool {
        self.access.is_optional()
    }

    /// Rust type name of the component this field belongs to.
    pub fn component_type_name(&self) -> &'static str {
        self.component_type
    }

    pub fn value_type_name(&self) -> &'static str {
        self.codec.value_type_name()
    }

    /// The codec bound to this field.
    pub fn codec(&self) -> &dyn FieldCodec {
        self.codec.as_ref()
    }

    /// Read the field. `Ok(None)` means the value is absent.
    ///
    /// # Errors
    ///
    /// [`PersistError::Access`] if `component` is not of this field's
    /// component type.
    pub fn get<'c>(&self, component: &'c dyn Component) -> Result<Option<&'c dyn Any>, PersistError> {
        self.access
            .get(component)
            .map_err(|_| self.access_error())
    }

    /// Write the field.
    ///
    /// # Errors
    ///
    /// [`PersistError::Access`] if `component` is not of this field's
    /// component type, [`PersistError::TypeMismatch`] if `value` is not of
    /// the field's value type.
    pub fn set(&self, component: &mut dyn Component, value: Box<dyn Any>) -> Result<(), PersistError> {
        self.access
            .set(component, value)
            .map_err(|fault| self.fault_error(fault))
    }

    /// Mark an optional field absent. No effect on required fields.
    pub fn clear(&self, component: &mut dyn Component) -> Result<(), PersistError> {
        self.access
            .clear(component)
            .map_err(|fault| self.fault_error(fault))
    }

    pub(crate) fn access_error(&self) -> PersistError {
        PersistError::Access {
            field: self.name.clone(),
            expected: self.component_type,
        }
    }

    pub(crate) fn type_mismatch(&self) -> PersistError {
        PersistError::TypeMismatch {
            field: self.name.clone(),
            expected: self.codec.value_type_name(),
        }
    }

    fn fault_error(&self, fault: AccessFault) -> PersistError {
        match fault {
            AccessFault::WrongComponent => self.access_error(),
            AccessFault::WrongValue => self.type_mismatch(),
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("component", &self.component_type)
            .field("value", &self.codec.value_type_name())
            .field("optional", &self.is_optional())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SerdeCodec;
    use crate::value::Value;

    #[derive(Debug, Default, PartialEq)]
    struct Label {
        text: String,
        tint: Option<u32>,
    }
    impl Component for Label {}

    struct Unrelated;
    impl Component for Unrelated {}

    fn text_field() -> FieldDescriptor {
        FieldDescriptor::required(
            "Text",
            |l: &Label| &l.text,
            |l: &mut Label, v| l.text = v,
            SerdeCodec::<String>::new(),
        )
    }

    fn tint_field() -> FieldDescriptor {
        FieldDescriptor::optional(
            "tint",
            |l: &Label| l.tint.as_ref(),
            |l: &mut Label, v| l.tint = v,
            SerdeCodec::<u32>::new(),
        )
    }

    #[test]
    fn name_and_key() {
        let field = text_field();
        assert_eq!(field.name(), "Text");
        assert_eq!(field.key(), "text");
        assert!(!field.is_optional());
        assert!(field.component_type_name().ends_with("Label"));
        assert_eq!(field.value_type_name(), type_name::<String>());
    }

    #[test]
    fn get_and_set_required() {
        let field = text_field();
        let mut label = Label::default();
        field.set(&mut label, Box::new("hello".to_owned())).unwrap();
        let value = field.get(&label).unwrap().unwrap();
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("hello"));
    }

    #[test]
    fn optional_absent_then_present_then_cleared() {
        let field = tint_field();
        let mut label = Label::default();
        assert!(field.get(&label).unwrap().is_none());

        field.set(&mut label, Box::new(7u32)).unwrap();
        assert_eq!(label.tint, Some(7));

        field.clear(&mut label).unwrap();
        assert_eq!(label.tint, None);
    }

    #[test]
    fn wrong_component_is_access_error() {
        let field = text_field();
        let mut other = Unrelated;
        assert!(matches!(
            field.get(&other),
            Err(PersistError::Access { ref field, .. }) if field == "Text"
        ));
        assert!(matches!(
            field.set(&mut other, Box::new(String::new())),
            Err(PersistError::Access { .. })
        ));
    }

    #[test]
    fn wrong_value_is_type_mismatch() {
        let field = text_field();
        let mut label = Label::default();
        let err = field.set(&mut label, Box::new(3u8)).unwrap_err();
        assert!(matches!(err, PersistError::TypeMismatch { .. }));
        assert_eq!(label.text, "");
    }

    #[test]
    fn codec_is_bound() {
        let field = text_field();
        let label = Label {
            text: "t".to_owned(),
            tint: None,
        };
        let raw = field.get(&label).unwrap().unwrap();
        assert_eq!(
            field.codec().encode(raw),
            Ok(Some(Value::String("t".to_owned())))
        );
    }
}
