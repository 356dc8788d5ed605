//! Strata Store -- entity persistence on top of `strata-persist`.
//!
//! Entities are saved as [`EntityRecord`](entity::EntityRecord)s: one
//! [`ComponentRecord`](strata_persist::record::ComponentRecord) per
//! component, written as a delta against the entity's prefab where one
//! exists. A [`WorldSave`](save::WorldSave) bundles entity records with a
//! BLAKE3 digest for integrity checking.
//!
//! # Modules
//!
//! - [`entity`]: live entity state, prefabs and the record container.
//! - [`persister`]: [`EntityPersister`](persister::EntityPersister), which
//!   turns entities into records and back through a
//!   [`MetadataRegistry`](strata_persist::registry::MetadataRegistry).
//! - [`save`]: the hashed [`WorldSave`](save::WorldSave) container.

#![deny(unsafe_code)]

pub mod entity;
pub mod persister;
pub mod save;

/// Current [`WorldSave`](save::WorldSave) layout version.
pub const SAVE_FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by entity persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A component-level operation failed.
    #[error(transparent)]
    Persist(#[from] strata_persist::PersistError),

    /// The record names a prefab other than the one supplied.
    #[error("entity {entity} expects prefab {expected:?} but {supplied:?} was supplied")]
    PrefabMismatch {
        entity: u64,
        expected: Option<String>,
        supplied: Option<String>,
    },

    /// The stored digest does not match the saved entities.
    #[error("save hash mismatch: recorded {recorded} but recomputed {computed}. The save may be corrupted or tampered with.")]
    HashMismatch { recorded: String, computed: String },

    /// The save was written with a layout this build does not read.
    #[error("unsupported save format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Encoding the save failed.
    #[error("failed to encode save: {0}")]
    Encode(String),

    /// Decoding the save failed.
    #[error("failed to decode save: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::{EntityRecord, EntityState, Prefab};
    pub use crate::persister::EntityPersister;
    pub use crate::save::WorldSave;
    pub use crate::{StoreError, SAVE_FORMAT_VERSION};
}
