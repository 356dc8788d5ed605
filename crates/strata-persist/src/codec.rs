//! Value codecs: per-type encode / decode / copy strategies.
//!
//! A field's codec is chosen once, when its
//! [`FieldDescriptor`](crate::field::FieldDescriptor) is built, and never
//! re-resolved per call. Codecs come in two layers:
//!
//! - [`ValueCodec<V>`] -- the typed capability a codec author implements.
//! - [`FieldCodec`] -- the object-safe form stored in a descriptor. It works
//!   on `&dyn Any` and is produced from any `ValueCodec<V>` by [`erase`].
//!
//! Returning `None` from `encode` or `decode` means "not representable" and
//! is never an error: the field is simply left out of the record (or left
//! untouched on the component).

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::value::{self, Value};

/// Typed codec for values of type `V`.
///
/// Contract: for every `v` the codec can encode, `decode(encode(v))` is
/// value-equal to `v`, and `copy(v)` shares no mutable state with `v`.
pub trait ValueCodec<V>: Send + Sync {
    fn encode(&self, value: &V) -> Option<Value>;
    fn decode(&self, encoded: &Value) -> Option<V>;
    fn copy(&self, value: &V) -> V;
}

// ---------------------------------------------------------------------------
// SerdeCodec
// ---------------------------------------------------------------------------

/// Default codec for any serde type, bridged through [`Value`].
///
/// Copies with [`Clone`]. Declines values whose top-level encoding would be
/// null (unit values, non-finite floats) since a record never holds a null
/// field.
pub struct SerdeCodec<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V> SerdeCodec<V> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<V> Default for SerdeCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for SerdeCodec<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for SerdeCodec<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerdeCodec<{}>", type_name::<V>())
    }
}

impl<V> ValueCodec<V> for SerdeCodec<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    fn encode(&self, value: &V) -> Option<Value> {
        match value::to_value(value) {
            Ok(Value::Null) => None,
            Ok(encoded) => Some(encoded),
            Err(e) => {
                tracing::debug!(
                    value_type = type_name::<V>(),
                    error = %e,
                    "value has no transport representation"
                );
                None
            }
        }
    }

    fn decode(&self, encoded: &Value) -> Option<V> {
        match value::from_value(encoded) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(
                    value_type = type_name::<V>(),
                    encoded_kind = encoded.kind(),
                    error = %e,
                    "encoded value does not decode into field type"
                );
                None
            }
        }
    }

    fn copy(&self, value: &V) -> V {
        value.clone()
    }
}

// ---------------------------------------------------------------------------
// FieldCodec (erased)
// ---------------------------------------------------------------------------

/// A `dyn Any` argument was not of the codec's value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrongValueType {
    pub expected: &'static str,
}

/// Object-safe codec operating on type-erased values.
pub trait FieldCodec: Send + Sync {
    /// `std::any::type_name` of the value type this codec handles.
    fn value_type_name(&self) -> &'static str;

    fn encode(&self, value: &dyn Any) -> Result<Option<Value>, WrongValueType>;

    fn decode(&self, encoded: &Value) -> Option<Box<dyn Any>>;

    fn copy(&self, value: &dyn Any) -> Result<Box<dyn Any>, WrongValueType>;

    /// Value equality. Values of the wrong type are never equal.
    fn values_equal(&self, a: &dyn Any, b: &dyn Any) -> bool;
}

struct Erased<V, C> {
    codec: C,
    _marker: PhantomData<fn() -> V>,
}

impl<V, C> Erased<V, C> {
    fn downcast<'a>(&self, value: &'a dyn Any) -> Result<&'a V, WrongValueType>
    where
        V: 'static,
    {
        value.downcast_ref::<V>().ok_or(WrongValueType {
            expected: type_name::<V>(),
        })
    }
}

impl<V, C> FieldCodec for Erased<V, C>
where
    V: PartialEq + 'static,
    C: ValueCodec<V>,
{
    fn value_type_name(&self) -> &'static str {
        type_name::<V>()
    }

    fn encode(&self, value: &dyn Any) -> Result<Option<Value>, WrongValueType> {
        Ok(self.codec.encode(self.downcast(value)?))
    }

    fn decode(&self, encoded: &Value) -> Option<Box<dyn Any>> {
        self.codec
            .decode(encoded)
            .map(|v| Box::new(v) as Box<dyn Any>)
    }

    fn copy(&self, value: &dyn Any) -> Result<Box<dyn Any>, WrongValueType> {
        Ok(Box::new(self.codec.copy(self.downcast(value)?)))
    }

    fn values_equal(&self, a: &dyn Any, b: &dyn Any) -> bool {
        match (a.downcast_ref::<V>(), b.downcast_ref::<V>()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Wrap a typed codec into its object-safe form.
pub fn erase<V, C>(codec: C) -> Box<dyn FieldCodec>
where
    V: PartialEq + 'static,
    C: ValueCodec<V> + 'static,
{
    Box::new(Erased {
        codec,
        _marker: PhantomData::<fn() -> V>,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
