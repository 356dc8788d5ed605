//! Strata Persist -- schema-driven component serialization.
//!
//! This crate converts live components into transport-neutral
//! [`ComponentRecord`](record::ComponentRecord)s and back, one
//! [`ComponentMetadata`](metadata::ComponentMetadata) per component type.
//! Each metadata instance holds an ordered table of
//! [`FieldDescriptor`](field::FieldDescriptor)s built once at registration;
//! every field carries its own [`ValueCodec`](codec::ValueCodec).
//!
//! Supported operations: clone, full serialize, delta serialize (only the
//! fields that differ from a baseline), deserialize, and merge-deserialize
//! onto an existing instance.
//!
//! # Quick Start
//!
//! ```
//! use strata_persist::prelude::*;
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Position { x: f64, y: f64, name: String }
//! impl Component for Position {}
//!
//! let meta = ComponentMetadata::builder::<Position>("Position")
//!     .field("x", |p| &p.x, |p, v| p.x = v)
//!     .field("y", |p| &p.y, |p, v| p.y = v)
//!     .field("name", |p| &p.name, |p, v| p.name = v)
//!     .build()
//!     .unwrap();
//!
//! let base = Position { x: 1.0, y: 2.0, name: "A".into() };
//! let moved = Position { y: 5.0, ..base.clone() };
//!
//! let delta = meta.serialize_delta(&base, &moved).unwrap();
//! assert_eq!(delta.field_names().collect::<Vec<_>>(), vec!["y"]);
//!
//! let mut target = base.clone();
//! meta.deserialize_onto(&mut target, &delta);
//! assert_eq!(target, moved);
//! ```
//!
//! # Failure policy
//!
//! `clone_component` and `deserialize` fail as a whole when the instance
//! cannot be constructed (and `clone_component` also on any field access
//! failure). `serialize`, `serialize_delta` and `deserialize_onto` never
//! fail: a field that cannot be read, encoded, decoded or written is logged
//! and skipped, and the call still covers every other field.

#![deny(unsafe_code)]

pub mod codec;
pub mod component;
pub mod field;
pub mod format;
pub mod metadata;
pub mod record;
pub mod registry;
pub mod value;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by schema construction and the fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The component type has no usable constructor.
    #[error("cannot construct component '{component}': {reason}")]
    Construction { component: String, reason: String },

    /// A field accessor was invoked on an instance of the wrong type.
    #[error("cannot access field '{field}': instance is not a {expected}")]
    Access {
        field: String,
        expected: &'static str,
    },

    /// A value handed to a field setter or codec has the wrong runtime type.
    #[error("value for field '{field}' is not a {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    /// Cloning a component failed; carries the first fatal cause.
    #[error("failed to clone component '{component}': {source}")]
    Clone {
        component: String,
        #[source]
        source: Box<PersistError>,
    },

    /// Two fields of one component type share a case-folded name.
    #[error("field '{field}' collides with existing field '{existing}' in component '{component}'")]
    DuplicateField {
        component: String,
        field: String,
        existing: String,
    },

    /// A different component type is already registered under this name.
    #[error("component name '{name}' is already registered for a different type")]
    DuplicateComponent { name: String },

    /// A component type was referenced that has not been registered.
    #[error("component type '{name}' not registered. Registered components: [{registered}]")]
    UnknownComponent { name: String, registered: String },

    /// Record encoding failed.
    #[error("failed to encode record: {0}")]
    Encode(String),

    /// Record decoding failed.
    #[error("failed to decode record: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::codec::{FieldCodec, SerdeCodec, ValueCodec};
    pub use crate::component::{AsAny, Component};
    pub use crate::field::FieldDescriptor;
    pub use crate::format::Format;
    pub use crate::metadata::{ComponentMetadata, Delta, MergeReport, MetadataBuilder};
    pub use crate::record::{ComponentRecord, NameValue};
    pub use crate::registry::MetadataRegistry;
    pub use crate::value::Value;
    pub use crate::PersistError;
}
