//! Store snapshotting.
//!
//! The verified store can be written to disk after each apply so a restart
//! resumes from the last finalized head instead of a fresh bootstrap. A
//! snapshot is only trusted after its invariants re-validate; anything else
//! is discarded and the caller bootstraps from scratch.

use lantern_core::consensus::store::{LightClientStore, StoreError};
use lantern_core::types::beacon::Root;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Snapshot I/O failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Snapshot violates store invariants: {0}")]
    Invalid(#[from] StoreError),
}

/// A store together with the chain identity it was verified against.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub genesis_validators_root: Root,
    pub store: LightClientStore,
}

/// Write a snapshot of the store.
pub fn save(path: &Path, genesis_validators_root: &Root, store: &LightClientStore) -> Result<(), PersistError> {
    let snapshot = StoreSnapshot {
        genesis_validators_root: *genesis_validators_root,
        store: store.clone(),
    };
    let json = serde_json::to_vec(&snapshot)?;
    std::fs::write(path, json).map_err(|source| PersistError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Read a snapshot back and re-validate its invariants before returning it.
pub fn load(path: &Path) -> Result<StoreSnapshot, PersistError> {
    let bytes = std::fs::read(path).map_err(|source| PersistError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
    snapshot.store.validate_invariants()?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_core::types::beacon::*;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lantern-persist-{}-{}", std::process::id(), name))
    }

    fn minimal_store() -> LightClientStore {
        let mut header = LightClientHeader::default();
        header.beacon.slot = 5_000_000;
        LightClientStore {
            finalized_header: header.clone(),
            current_sync_committee: SyncCommittee::zeroed(),
            next_sync_committee: None,
            best_valid_update: None,
            optimistic_header: header,
            previous_max_active_participants: 0,
            current_max_active_participants: 0,
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let path = scratch_path("roundtrip");
        let store = minimal_store();

        save(&path, &[0xaa; 32], &store).unwrap();
        let snapshot = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(snapshot.genesis_validators_root, [0xaa; 32]);
        assert_eq!(
            snapshot.store.finalized_header.beacon.slot,
            store.finalized_header.beacon.slot
        );
    }

    #[test]
    fn test_corrupt_snapshot_is_rejected() {
        let path = scratch_path("corrupt");
        let mut store = minimal_store();
        // Finalized running ahead of optimistic can never happen in a store
        // the state machine produced.
        store.finalized_header.beacon.slot = store.optimistic_header.beacon.slot + 1;

        save(&path, &[0xaa; 32], &store).unwrap();
        let result = load(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(PersistError::Invalid(_))));
    }

    #[test]
    fn test_missing_snapshot_is_io_error() {
        let result = load(&scratch_path("does-not-exist"));
        assert!(matches!(result, Err(PersistError::Io { .. })));
    }
}
