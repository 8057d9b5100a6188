//! Light client update validation.
//!
//! This is the complete verification pipeline for a candidate update:
//! structural checks (participation, slot ordering, period bounds,
//! relevance), merkle authentication of the finalized header and the next
//! sync committee against the attested state root, and the sync committee
//! BLS signature over the attested header — the core trust operation.
//!
//! Validation is pure: it never touches the store. A rejected update leaves
//! no trace.

use crate::consensus::bls::{fast_aggregate_verify, BlsError};
use crate::consensus::fork::{compute_domain, compute_signing_root, ForkSchedule};
use crate::consensus::store::LightClientStore;
use crate::ssz::{
    hash_tree_root_beacon_header, hash_tree_root_execution_header, hash_tree_root_sync_committee,
    subtree_index, verify_merkle_branch,
};
use crate::types::beacon::*;
use crate::types::execution::ExecutionPayloadHeader;
use thiserror::Error;

/// Reasons an update is rejected. Each variant is specific enough to tell
/// exactly which rule failed — never a generic "invalid" error.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Insufficient sync committee participation: {participants}/512 (need at least {required})")]
    InsufficientParticipants { participants: usize, required: usize },

    #[error("Attested header is not a valid light client header")]
    InvalidAttestedHeader,

    #[error("Finalized header is not a valid light client header")]
    InvalidFinalizedHeader,

    #[error("Slot ordering violated: need current {current_slot} >= signature {signature_slot} > attested {attested_slot} >= finalized {finalized_slot}")]
    InvalidSlotOrder {
        current_slot: u64,
        signature_slot: u64,
        attested_slot: u64,
        finalized_slot: u64,
    },

    #[error("Signature period {signature_period} out of range for store period {store_period} (next committee known: {next_committee_known})")]
    SignaturePeriodOutOfRange {
        signature_period: u64,
        store_period: u64,
        next_committee_known: bool,
    },

    #[error("Update is not relevant: attested slot {attested_slot} does not advance finalized slot {store_finalized_slot} and carries no new sync committee")]
    NotRelevant {
        attested_slot: u64,
        store_finalized_slot: u64,
    },

    #[error("Finality branch is zero but the finalized header is not")]
    UnexpectedFinalizedHeader,

    #[error("Invalid merkle branch for the finalized header")]
    InvalidFinalityBranch,

    #[error("Next sync committee branch is zero but the committee is not")]
    UnexpectedNextSyncCommittee,

    #[error("Next sync committee does not match the one already known for this period")]
    NextSyncCommitteeMismatch,

    #[error("Invalid merkle branch for the next sync committee")]
    InvalidNextSyncCommitteeBranch,

    #[error("Signature period is in the next committee's range but no next committee is known")]
    NextSyncCommitteeUnknown,

    #[error("Sync committee signature verification failed: {0}")]
    Signature(#[from] BlsError),
}

/// Check a light client header's internal consistency.
///
/// Before Capella there is no execution payload in the header, so both the
/// execution fields and the branch must be zero. From Capella on, the
/// execution payload header must be proven against the beacon body root.
pub fn is_valid_light_client_header(header: &LightClientHeader, forks: &ForkSchedule) -> bool {
    let epoch = epoch_at_slot(header.beacon.slot);

    if epoch < forks.capella_fork_epoch() {
        return header.execution == ExecutionPayloadHeader::default()
            && header.execution_branch == ExecutionBranch::default();
    }

    verify_merkle_branch(
        &hash_tree_root_execution_header(&header.execution),
        &header.execution_branch,
        EXECUTION_BRANCH_DEPTH,
        subtree_index(EXECUTION_PAYLOAD_INDEX),
        &header.beacon.body_root,
    )
}

/// True if the update carries a next sync committee proof.
pub fn is_sync_committee_update(update: &LightClientUpdate) -> bool {
    update.next_sync_committee_branch != NextSyncCommitteeBranch::default()
}

/// True if the update carries a finality proof.
pub fn is_finality_update(update: &LightClientUpdate) -> bool {
    update.finality_branch != FinalityBranch::default()
}

/// Validate a candidate update against the current store.
///
/// Enforces, in order: the participation floor, attested header validity,
/// slot monotonicity, signature period bounds, relevance, the finality
/// proof, the next sync committee proof, and finally the aggregate
/// signature. The first failing rule rejects the update.
pub fn validate_light_client_update(
    store: &LightClientStore,
    update: &LightClientUpdate,
    current_slot: u64,
    genesis_validators_root: &Root,
    forks: &ForkSchedule,
) -> Result<(), VerifyError> {
    // Verify sync committee has sufficient participants
    let sync_aggregate = &update.sync_aggregate;
    let participants = sync_aggregate.num_participants();
    if participants < MIN_SYNC_COMMITTEE_PARTICIPANTS {
        return Err(VerifyError::InsufficientParticipants {
            participants,
            required: MIN_SYNC_COMMITTEE_PARTICIPANTS,
        });
    }

    if !is_valid_light_client_header(&update.attested_header, forks) {
        return Err(VerifyError::InvalidAttestedHeader);
    }

    // Verify update does not skip a sync committee period
    let attested_slot = update.attested_header.beacon.slot;
    let finalized_slot = update.finalized_header.beacon.slot;
    if !(current_slot >= update.signature_slot
        && update.signature_slot > attested_slot
        && attested_slot >= finalized_slot)
    {
        return Err(VerifyError::InvalidSlotOrder {
            current_slot,
            signature_slot: update.signature_slot,
            attested_slot,
            finalized_slot,
        });
    }

    let store_period = store.finalized_period();
    let signature_period = sync_committee_period_at_slot(update.signature_slot);
    let next_committee_known = store.is_next_sync_committee_known();
    let period_in_range = if next_committee_known {
        signature_period == store_period || signature_period == store_period + 1
    } else {
        signature_period == store_period
    };
    if !period_in_range {
        return Err(VerifyError::SignaturePeriodOutOfRange {
            signature_period,
            store_period,
            next_committee_known,
        });
    }

    // Verify update is relevant: it must advance the finalized header, or
    // teach us the next sync committee for the current period.
    let attested_period = sync_committee_period_at_slot(attested_slot);
    let update_has_next_committee = !next_committee_known
        && is_sync_committee_update(update)
        && attested_period == store_period;
    if attested_slot <= store.finalized_header.beacon.slot && !update_has_next_committee {
        return Err(VerifyError::NotRelevant {
            attested_slot,
            store_finalized_slot: store.finalized_header.beacon.slot,
        });
    }

    // Verify that the finality branch, if present, confirms the finalized
    // header against the finalized checkpoint root saved in the attested
    // state. The genesis checkpoint root is represented as a zero hash.
    if !is_finality_update(update) {
        if !update.finalized_header.is_zeroed() {
            return Err(VerifyError::UnexpectedFinalizedHeader);
        }
    } else {
        let finalized_root = if finalized_slot == GENESIS_SLOT {
            if !update.finalized_header.is_zeroed() {
                return Err(VerifyError::UnexpectedFinalizedHeader);
            }
            [0u8; 32]
        } else {
            if !is_valid_light_client_header(&update.finalized_header, forks) {
                return Err(VerifyError::InvalidFinalizedHeader);
            }
            hash_tree_root_beacon_header(&update.finalized_header.beacon)
        };
        if !verify_merkle_branch(
            &finalized_root,
            &update.finality_branch,
            FINALITY_BRANCH_DEPTH,
            subtree_index(FINALIZED_ROOT_INDEX),
            &update.attested_header.beacon.state_root,
        ) {
            return Err(VerifyError::InvalidFinalityBranch);
        }
    }

    // Verify that the next sync committee, if present, is the one saved in
    // the attested state.
    if !is_sync_committee_update(update) {
        if !update.next_sync_committee.is_zeroed() {
            return Err(VerifyError::UnexpectedNextSyncCommittee);
        }
    } else {
        if attested_period == store_period {
            if let Some(known) = store.next_sync_committee.as_ref() {
                if update.next_sync_committee != *known {
                    return Err(VerifyError::NextSyncCommitteeMismatch);
                }
            }
        }
        if !verify_merkle_branch(
            &hash_tree_root_sync_committee(&update.next_sync_committee),
            &update.next_sync_committee_branch,
            NEXT_SYNC_COMMITTEE_BRANCH_DEPTH,
            subtree_index(NEXT_SYNC_COMMITTEE_INDEX),
            &update.attested_header.beacon.state_root,
        ) {
            return Err(VerifyError::InvalidNextSyncCommitteeBranch);
        }
    }

    // Verify the sync committee aggregate signature, using the committee
    // active in the signature's period.
    let sync_committee = if signature_period == store_period {
        &store.current_sync_committee
    } else {
        store
            .next_sync_committee
            .as_ref()
            .ok_or(VerifyError::NextSyncCommitteeUnknown)?
    };

    let participant_pubkeys: Vec<&BlsPublicKey> = sync_aggregate
        .sync_committee_bits
        .participant_indices()
        .into_iter()
        .map(|i| &sync_committee.pubkeys[i])
        .collect();

    let fork_version_slot = update.signature_slot.max(1) - 1;
    let fork_version = forks.fork_version_at_epoch(epoch_at_slot(fork_version_slot));
    let domain = compute_domain(&DOMAIN_SYNC_COMMITTEE, &fork_version, genesis_validators_root);
    let signing_root = compute_signing_root(
        &hash_tree_root_beacon_header(&update.attested_header.beacon),
        &domain,
    );

    fast_aggregate_verify(
        &participant_pubkeys,
        &signing_root,
        &sync_aggregate.sync_committee_signature,
    )?;

    Ok(())
}
