//! The light client state machine.
//!
//! [`LightClient`] exclusively owns a [`LightClientStore`] and exposes
//! method-style entry points for the three inbound update kinds plus the
//! time-based force update. The pipeline for a single update is strictly
//! validate → compare → apply; nothing else ever mutates the store.

use crate::consensus::compare::is_better_update;
use crate::consensus::fork::ForkSchedule;
use crate::consensus::store::{BootstrapError, LightClientStore, StoreError};
use crate::consensus::verify::{
    is_finality_update, is_sync_committee_update, validate_light_client_update, VerifyError,
};
use crate::types::beacon::*;
use thiserror::Error;

/// Why an update did not make it into the store, and whether the store can
/// still be trusted afterwards.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The update failed validation. The store is untouched; processing
    /// continues with the next candidate.
    #[error("update rejected: {0}")]
    Rejected(#[from] VerifyError),

    /// The store itself is inconsistent. Fatal: discard it and re-bootstrap.
    #[error("store corrupted: {0}")]
    Store(#[from] StoreError),
}

impl ProcessError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProcessError::Store(_))
    }
}

/// What processing an accepted update did to the store.
#[derive(Clone, Copy, Debug)]
pub struct UpdateOutcome {
    /// The update became the new best pending candidate.
    pub best_update_replaced: bool,
    /// The optimistic header advanced to the update's attested header.
    pub optimistic_advanced: bool,
    /// The update was applied to the finalized state.
    pub applied: bool,
    /// Finalized slot after processing.
    pub finalized_slot: u64,
    /// Optimistic slot after processing.
    pub optimistic_slot: u64,
}

/// The state machine driving a [`LightClientStore`].
pub struct LightClient {
    store: LightClientStore,
    genesis_validators_root: Root,
    forks: ForkSchedule,
}

impl LightClient {
    /// Initialize from a bootstrap whose header hashes to the trusted block
    /// root.
    pub fn bootstrap(
        trusted_block_root: &Root,
        bootstrap: &LightClientBootstrap,
        genesis_validators_root: Root,
        forks: ForkSchedule,
    ) -> Result<Self, BootstrapError> {
        let store = LightClientStore::initialize(trusted_block_root, bootstrap, &forks)?;
        Ok(Self { store, genesis_validators_root, forks })
    }

    /// Resume from a previously persisted store. The store's invariants are
    /// re-checked before it is trusted.
    pub fn from_store(
        store: LightClientStore,
        genesis_validators_root: Root,
        forks: ForkSchedule,
    ) -> Result<Self, StoreError> {
        store.validate_invariants()?;
        Ok(Self { store, genesis_validators_root, forks })
    }

    pub fn store(&self) -> &LightClientStore {
        &self.store
    }

    pub fn genesis_validators_root(&self) -> &Root {
        &self.genesis_validators_root
    }

    pub fn forks(&self) -> &ForkSchedule {
        &self.forks
    }

    /// The latest header the client has authenticated as finalized.
    pub fn finalized_head(&self) -> &LightClientHeader {
        &self.store.finalized_header
    }

    /// The newest attested header past the optimistic safety threshold.
    pub fn optimistic_head(&self) -> &LightClientHeader {
        &self.store.optimistic_header
    }

    pub fn current_sync_committee(&self) -> &SyncCommittee {
        &self.store.current_sync_committee
    }

    /// The sync committee period of the finalized head.
    pub fn finalized_period(&self) -> u64 {
        self.store.finalized_period()
    }

    /// Process a full light client update.
    ///
    /// 1. Validate the update against the store (rejection is side-effect
    ///    free).
    /// 2. Keep it as the best pending candidate if the comparator says so.
    /// 3. Track peak participation for the safety threshold.
    /// 4. Advance the optimistic header past the safety threshold.
    /// 5. With a supermajority and progress (or a first committee proof with
    ///    finality), apply it to the finalized state.
    pub fn process_update(
        &mut self,
        update: &LightClientUpdate,
        current_slot: u64,
    ) -> Result<UpdateOutcome, ProcessError> {
        validate_light_client_update(
            &self.store,
            update,
            current_slot,
            &self.genesis_validators_root,
            &self.forks,
        )?;

        let participants = update.sync_aggregate.num_participants() as u64;

        // Track the best update in case the timeout forces us to apply it
        let best_update_replaced = match self.store.best_valid_update.as_ref() {
            None => true,
            Some(best) => is_better_update(update, best),
        };
        if best_update_replaced {
            self.store.best_valid_update = Some(update.clone());
        }

        self.store.current_max_active_participants = self
            .store
            .current_max_active_participants
            .max(participants);

        let mut optimistic_advanced = false;
        if participants > self.store.safety_threshold()
            && update.attested_header.beacon.slot > self.store.optimistic_header.beacon.slot
        {
            self.store.optimistic_header = update.attested_header.clone();
            optimistic_advanced = true;
        }

        // A committee proof finalized within the attested period lets the
        // store learn its first next committee even without slot progress.
        let update_has_finalized_next_committee = !self.store.is_next_sync_committee_known()
            && is_sync_committee_update(update)
            && is_finality_update(update)
            && sync_committee_period_at_slot(update.finalized_header.beacon.slot)
                == sync_committee_period_at_slot(update.attested_header.beacon.slot);

        let mut applied = false;
        if update.sync_aggregate.has_supermajority()
            && (update.finalized_header.beacon.slot > self.store.finalized_header.beacon.slot
                || update_has_finalized_next_committee)
        {
            self.store.apply_update(update)?;
            self.store.best_valid_update = None;
            applied = true;
        }

        Ok(UpdateOutcome {
            best_update_replaced,
            optimistic_advanced,
            applied,
            finalized_slot: self.store.finalized_header.beacon.slot,
            optimistic_slot: self.store.optimistic_header.beacon.slot,
        })
    }

    /// Process a finality update by normalizing it into a full update.
    pub fn process_finality_update(
        &mut self,
        update: LightClientFinalityUpdate,
        current_slot: u64,
    ) -> Result<UpdateOutcome, ProcessError> {
        self.process_update(&update.into_update(), current_slot)
    }

    /// Process an optimistic update by normalizing it into a full update.
    pub fn process_optimistic_update(
        &mut self,
        update: LightClientOptimisticUpdate,
        current_slot: u64,
    ) -> Result<UpdateOutcome, ProcessError> {
        self.process_update(&update.into_update(), current_slot)
    }

    /// Force-apply the best pending update once the store has gone a full
    /// timeout without finality progress.
    ///
    /// Because the apply logic waits for the finalized header to indicate
    /// sync committee finality, the attested header stands in for the
    /// finalized one here, guaranteeing progression into later sync
    /// committee periods during extended non-finality.
    ///
    /// Returns the new finalized slot if the fallback fired.
    pub fn force_update(&mut self, current_slot: u64) -> Result<Option<u64>, StoreError> {
        if current_slot <= self.store.finalized_header.beacon.slot + UPDATE_TIMEOUT {
            return Ok(None);
        }
        let Some(mut best) = self.store.best_valid_update.take() else {
            return Ok(None);
        };

        if best.finalized_header.beacon.slot <= self.store.finalized_header.beacon.slot {
            best.finalized_header = best.attested_header.clone();
        }
        self.store.apply_update(&best)?;

        Ok(Some(self.store.finalized_header.beacon.slot))
    }
}
