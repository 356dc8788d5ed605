//! Hashed world save container.
//!
//! A [`WorldSave`] bundles entity records with the layout version and a
//! BLAKE3 digest of the entities' binary encoding. Loading checks both, so
//! a truncated, corrupted or hand-edited save is reported instead of being
//! restored half-way.

use serde::{Deserialize, Serialize};
use strata_persist::format::{self, Format};

use crate::entity::EntityRecord;
use crate::{StoreError, SAVE_FORMAT_VERSION};

/// A versioned, integrity-checked list of entity records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSave {
    pub version: u32,
    pub entities: Vec<EntityRecord>,
    /// BLAKE3 hex digest of `entities` in binary form.
    pub hash: String,
}

impl WorldSave {
    /// Wrap `entities` at the current version and compute the digest.
    pub fn new(entities: Vec<EntityRecord>) -> Result<Self, StoreError> {
        let hash = compute_hash(&entities)?;
        Ok(Self {
            version: SAVE_FORMAT_VERSION,
            entities,
            hash,
        })
    }

    /// Check the layout version, then the digest.
    pub fn verify(&self) -> Result<(), StoreError> {
        if self.version != SAVE_FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: self.version,
                expected: SAVE_FORMAT_VERSION,
            });
        }
        let computed = compute_hash(&self.entities)?;
        if computed != self.hash {
            return Err(StoreError::HashMismatch {
                recorded: self.hash.clone(),
                computed,
            });
        }
        Ok(())
    }

    pub fn entity(&self, id: u64) -> Option<&EntityRecord> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(format::encode(self, Format::Binary)?)
    }

    /// Decode a binary save and verify it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        let save: WorldSave = format::decode(bytes, Format::Binary)?;
        save.verify()?;
        tracing::debug!(entities = save.len(), "world save loaded");
        Ok(save)
    }

    /// Pretty-printed JSON form.
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Encode(e.to_string()))
    }

    /// Parse a JSON save and verify it.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let save: WorldSave =
            serde_json::from_str(json).map_err(|e| StoreError::Decode(e.to_string()))?;
        save.verify()?;
        Ok(save)
    }
}

fn compute_hash(entities: &[EntityRecord]) -> Result<String, StoreError> {
    let bytes = format::encode(&entities, Format::Binary)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use strata_persist::record::ComponentRecord;

    fn sample() -> WorldSave {
        let mut first = EntityRecord::new(1, Some("goblin".to_owned()));
        first
            .components
            .push(ComponentRecord::new("Health").with_field("current", 4u32));
        first.removed_components.push("Tag".to_owned());

        let mut second = EntityRecord::new(2, None);
        second
            .components
            .push(ComponentRecord::new("Position").with_field("x", 1.5));

        WorldSave::new(vec![first, second]).unwrap()
    }

    #[test]
    fn hash_is_deterministic_hex() {
        let a = sample();
        let b = sample();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash.len(), 64);
        assert!(a.hash.chars().all(|c| c.is_ascii_hexdigit()));
        a.verify().unwrap();
    }

    #[test]
    fn binary_roundtrip_verifies() {
        let save = sample();
        let loaded = WorldSave::from_bytes(&save.to_bytes().unwrap()).unwrap();
        assert_eq!(loaded, save);
        assert_eq!(loaded.entity(2).map(|e| e.components.len()), Some(1));
    }

    #[test]
    fn json_roundtrip_verifies() {
        let save = sample();
        let json = save.to_json().unwrap();
        assert!(json.contains("\"goblin\""));
        assert_eq!(WorldSave::from_json(&json).unwrap(), save);
    }

    #[test]
    fn tampered_entities_fail_hash_check() {
        let mut save = sample();
        save.entities[0].removed_components.clear();
        assert!(matches!(save.verify(), Err(StoreError::HashMismatch { .. })));

        let bytes = save.to_bytes().unwrap();
        assert!(matches!(
            WorldSave::from_bytes(&bytes),
            Err(StoreError::HashMismatch { .. })
        ));
    }

    #[test]
    fn future_version_is_rejected() {
        let mut save = sample();
        save.version = SAVE_FORMAT_VERSION + 1;
        assert!(matches!(
            save.verify(),
            Err(StoreError::UnsupportedVersion { found, expected })
                if found == SAVE_FORMAT_VERSION + 1 && expected == SAVE_FORMAT_VERSION
        ));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            WorldSave::from_bytes(&[0xff, 0x01]),
            Err(StoreError::Persist(_))
        ));
    }

    #[test]
    fn empty_save_is_valid() {
        let save = WorldSave::new(Vec::new()).unwrap();
        assert!(save.is_empty());
        save.verify().unwrap();
    }
}
