//! The light client store: everything the client has verified about the
//! chain, and the rules for mutating it.
//!
//! The store is created once from a bootstrap and afterwards mutated only by
//! the state machine in [`crate::consensus::light_client`]. It is an owned
//! value — nothing outside the state machine reaches its internals.

use crate::consensus::verify::is_valid_light_client_header;
use crate::consensus::fork::ForkSchedule;
use crate::ssz::{
    hash_tree_root_beacon_header, hash_tree_root_sync_committee, subtree_index,
    verify_merkle_branch,
};
use crate::types::beacon::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors while initializing a store from bootstrap data.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Bootstrap header is not a valid light client header")]
    InvalidHeader,

    #[error("Bootstrap header root {got} does not match the trusted block root {expected}")]
    TrustedRootMismatch { expected: String, got: String },

    #[error("Bootstrap sync committee is malformed: {reason}")]
    InvalidCommittee { reason: &'static str },

    #[error("Invalid merkle branch for the bootstrap sync committee")]
    InvalidCommitteeBranch,
}

/// Fatal store errors. A store that trips one of these is considered
/// corrupt; the caller must discard it and re-bootstrap.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Applied update finalizes period {update_period} but the store is in period {store_period} with no known next committee")]
    FinalizedPeriodMismatch { update_period: u64, store_period: u64 },

    #[error("Store invariant violated: finalized slot {finalized_slot} is ahead of optimistic slot {optimistic_slot}")]
    FinalizedAheadOfOptimistic { finalized_slot: u64, optimistic_slot: u64 },

    #[error("Store invariant violated: optimistic period {optimistic_period} is outside the window of finalized period {finalized_period}")]
    OptimisticPeriodOutOfWindow { optimistic_period: u64, finalized_period: u64 },

    #[error("Store invariant violated: participation counter {count} exceeds the committee size")]
    ParticipantsOutOfRange { count: u64 },

    #[error("Store invariant violated: {which} sync committee is malformed")]
    MalformedCommittee { which: &'static str },
}

/// The verified state of the light client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LightClientStore {
    /// The latest header the client has authenticated as finalized.
    pub finalized_header: LightClientHeader,
    /// The sync committee signing during the finalized header's period.
    pub current_sync_committee: SyncCommittee,
    /// The following period's committee, once a rotation proof has been seen.
    pub next_sync_committee: Option<SyncCommittee>,
    /// Best accepted update not yet applied; force-applied on timeout.
    pub best_valid_update: Option<LightClientUpdate>,
    /// Most recent attested header past the optimistic safety threshold.
    pub optimistic_header: LightClientHeader,
    /// Peak participation of the previous sync committee period.
    pub previous_max_active_participants: u64,
    /// Peak participation of the current sync committee period.
    pub current_max_active_participants: u64,
}

impl LightClientStore {
    /// Initialize a store from a bootstrap whose header root matches the
    /// trusted block root.
    ///
    /// The trusted root is the one moment of social trust in the client's
    /// lifetime; everything after this is cryptographic.
    pub fn initialize(
        trusted_block_root: &Root,
        bootstrap: &LightClientBootstrap,
        forks: &ForkSchedule,
    ) -> Result<Self, BootstrapError> {
        if !is_valid_light_client_header(&bootstrap.header, forks) {
            return Err(BootstrapError::InvalidHeader);
        }

        let header_root = hash_tree_root_beacon_header(&bootstrap.header.beacon);
        if header_root != *trusted_block_root {
            return Err(BootstrapError::TrustedRootMismatch {
                expected: hex::encode(trusted_block_root),
                got: hex::encode(header_root),
            });
        }

        bootstrap
            .current_sync_committee
            .validate()
            .map_err(|reason| BootstrapError::InvalidCommittee { reason })?;

        if !verify_merkle_branch(
            &hash_tree_root_sync_committee(&bootstrap.current_sync_committee),
            &bootstrap.current_sync_committee_branch,
            CURRENT_SYNC_COMMITTEE_BRANCH_DEPTH,
            subtree_index(CURRENT_SYNC_COMMITTEE_INDEX),
            &bootstrap.header.beacon.state_root,
        ) {
            return Err(BootstrapError::InvalidCommitteeBranch);
        }

        Ok(Self {
            finalized_header: bootstrap.header.clone(),
            current_sync_committee: bootstrap.current_sync_committee.clone(),
            next_sync_committee: None,
            best_valid_update: None,
            optimistic_header: bootstrap.header.clone(),
            previous_max_active_participants: 0,
            current_max_active_participants: 0,
        })
    }

    /// The sync committee period of the finalized header.
    pub fn finalized_period(&self) -> u64 {
        sync_committee_period_at_slot(self.finalized_header.beacon.slot)
    }

    pub fn is_next_sync_committee_known(&self) -> bool {
        self.next_sync_committee.is_some()
    }

    /// Participation an update must exceed before it may advance the
    /// optimistic header: half the recent peak.
    pub fn safety_threshold(&self) -> u64 {
        self.previous_max_active_participants
            .max(self.current_max_active_participants)
            / 2
    }

    /// Apply an accepted update: learn or rotate sync committees across
    /// period boundaries and advance the finalized and optimistic headers.
    ///
    /// The caller has already validated the update and decided it should be
    /// applied (supermajority path or force-update path).
    pub fn apply_update(&mut self, update: &LightClientUpdate) -> Result<(), StoreError> {
        let store_period = self.finalized_period();
        let update_finalized_period =
            sync_committee_period_at_slot(update.finalized_header.beacon.slot);

        if !self.is_next_sync_committee_known() {
            if update_finalized_period != store_period {
                return Err(StoreError::FinalizedPeriodMismatch {
                    update_period: update_finalized_period,
                    store_period,
                });
            }
            self.next_sync_committee = committee_of(update);
        } else if update_finalized_period == store_period + 1 {
            self.current_sync_committee = self
                .next_sync_committee
                .take()
                .expect("checked is_next_sync_committee_known above");
            self.next_sync_committee = committee_of(update);
            self.previous_max_active_participants = self.current_max_active_participants;
            self.current_max_active_participants = 0;
        }

        if update.finalized_header.beacon.slot > self.finalized_header.beacon.slot {
            self.finalized_header = update.finalized_header.clone();
            if self.finalized_header.beacon.slot > self.optimistic_header.beacon.slot {
                self.optimistic_header = self.finalized_header.clone();
            }
        }

        Ok(())
    }

    /// Check the structural invariants a store must satisfy. Run before
    /// trusting a store loaded from a persisted snapshot.
    pub fn validate_invariants(&self) -> Result<(), StoreError> {
        let finalized_slot = self.finalized_header.beacon.slot;
        let optimistic_slot = self.optimistic_header.beacon.slot;
        if finalized_slot > optimistic_slot {
            return Err(StoreError::FinalizedAheadOfOptimistic {
                finalized_slot,
                optimistic_slot,
            });
        }

        let finalized_period = self.finalized_period();
        let optimistic_period = sync_committee_period_at_slot(optimistic_slot);
        if optimistic_period > finalized_period + 1 {
            return Err(StoreError::OptimisticPeriodOutOfWindow {
                optimistic_period,
                finalized_period,
            });
        }

        for count in [
            self.previous_max_active_participants,
            self.current_max_active_participants,
        ] {
            if count > SYNC_COMMITTEE_SIZE as u64 {
                return Err(StoreError::ParticipantsOutOfRange { count });
            }
        }

        if self.current_sync_committee.validate().is_err() {
            return Err(StoreError::MalformedCommittee { which: "current" });
        }
        if let Some(next) = self.next_sync_committee.as_ref() {
            if next.validate().is_err() {
                return Err(StoreError::MalformedCommittee { which: "next" });
            }
        }

        Ok(())
    }
}

/// The next sync committee an update carries, if any — the wire zero value
/// maps back to "absent".
fn committee_of(update: &LightClientUpdate) -> Option<SyncCommittee> {
    if update.next_sync_committee.is_zeroed() {
        None
    } else {
        Some(update.next_sync_committee.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    #[test]
    fn test_bootstrap_initializes_store() {
        let fixture = Fixture::new();
        let bootstrap = fixture.bootstrap();
        let trusted_root = hash_tree_root_beacon_header(&bootstrap.header.beacon);

        let store =
            LightClientStore::initialize(&trusted_root, &bootstrap, &fixture.forks).unwrap();

        assert_eq!(store.finalized_header, bootstrap.header);
        assert_eq!(store.optimistic_header, bootstrap.header);
        assert!(store.next_sync_committee.is_none());
        assert!(store.best_valid_update.is_none());
        assert_eq!(store.previous_max_active_participants, 0);
        assert_eq!(store.current_max_active_participants, 0);
        store.validate_invariants().unwrap();
    }

    #[test]
    fn test_bootstrap_rejects_wrong_trusted_root() {
        let fixture = Fixture::new();
        let bootstrap = fixture.bootstrap();

        let result = LightClientStore::initialize(&[0xee; 32], &bootstrap, &fixture.forks);
        assert!(matches!(result, Err(BootstrapError::TrustedRootMismatch { .. })));
    }

    #[test]
    fn test_bootstrap_rejects_tampered_committee_branch() {
        let fixture = Fixture::new();
        let mut bootstrap = fixture.bootstrap();
        let trusted_root = hash_tree_root_beacon_header(&bootstrap.header.beacon);
        bootstrap.current_sync_committee_branch[1][0] ^= 0x01;

        let result = LightClientStore::initialize(&trusted_root, &bootstrap, &fixture.forks);
        assert!(matches!(result, Err(BootstrapError::InvalidCommitteeBranch)));
    }

    #[test]
    fn test_apply_learns_next_committee_in_same_period() {
        let fixture = Fixture::new();
        let mut store = fixture.bootstrap_store();

        let mut update = make_unsigned_update(BASE_SLOT + 64, BASE_SLOT + 32);
        update.next_sync_committee = marker_committee(7);
        store.apply_update(&update).unwrap();

        assert_eq!(store.next_sync_committee, Some(marker_committee(7)));
        assert_eq!(store.finalized_header.beacon.slot, BASE_SLOT + 32);
    }

    #[test]
    fn test_apply_rejects_period_skip_before_first_rotation() {
        let fixture = Fixture::new();
        let mut store = fixture.bootstrap_store();

        let update = make_unsigned_update(
            BASE_SLOT + SLOTS_PER_SYNC_COMMITTEE_PERIOD + 64,
            BASE_SLOT + SLOTS_PER_SYNC_COMMITTEE_PERIOD + 32,
        );

        let result = store.apply_update(&update);
        assert!(matches!(result, Err(StoreError::FinalizedPeriodMismatch { .. })));
    }

    #[test]
    fn test_apply_rotates_committees_across_periods() {
        let fixture = Fixture::new();
        let mut store = fixture.bootstrap_store();
        store.next_sync_committee = Some(marker_committee(1));
        store.current_max_active_participants = 417;

        let next_period_slot = BASE_SLOT + SLOTS_PER_SYNC_COMMITTEE_PERIOD;
        let mut update = make_unsigned_update(next_period_slot + 64, next_period_slot + 32);
        update.next_sync_committee = marker_committee(2);
        store.apply_update(&update).unwrap();

        // The former next committee became current, the update's committee
        // became next, and the participation window slid.
        assert_eq!(store.current_sync_committee, marker_committee(1));
        assert_eq!(store.next_sync_committee, Some(marker_committee(2)));
        assert_eq!(store.previous_max_active_participants, 417);
        assert_eq!(store.current_max_active_participants, 0);
        assert_eq!(store.finalized_header.beacon.slot, next_period_slot + 32);
    }

    #[test]
    fn test_finalized_overtaking_optimistic_pulls_it_along() {
        let fixture = Fixture::new();
        let mut store = fixture.bootstrap_store();

        let update = make_unsigned_update(BASE_SLOT + 96, BASE_SLOT + 64);
        store.apply_update(&update).unwrap();

        assert_eq!(store.finalized_header.beacon.slot, BASE_SLOT + 64);
        assert_eq!(store.optimistic_header.beacon.slot, BASE_SLOT + 64);
        store.validate_invariants().unwrap();
    }

    #[test]
    fn test_invariant_validation_catches_corruption() {
        let fixture = Fixture::new();
        let mut store = fixture.bootstrap_store();
        store.finalized_header.beacon.slot = store.optimistic_header.beacon.slot + 1;
        assert!(matches!(
            store.validate_invariants(),
            Err(StoreError::FinalizedAheadOfOptimistic { .. })
        ));

        let mut store = fixture.bootstrap_store();
        store.current_max_active_participants = 513;
        assert!(matches!(
            store.validate_invariants(),
            Err(StoreError::ParticipantsOutOfRange { count: 513 })
        ));

        let mut store = fixture.bootstrap_store();
        store.current_sync_committee.pubkeys.pop();
        assert!(matches!(
            store.validate_invariants(),
            Err(StoreError::MalformedCommittee { which: "current" })
        ));
    }
}
