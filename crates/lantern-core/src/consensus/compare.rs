//! Total order over accepted updates.
//!
//! When finality stalls, the store keeps the single best update seen so far
//! and force-applies it after a timeout. "Best" is decided by a tiered
//! comparison; the first tier producing an inequality wins.

use crate::consensus::verify::{is_finality_update, is_sync_committee_update};
use crate::types::beacon::{sync_committee_period_at_slot, LightClientUpdate, SYNC_COMMITTEE_SIZE};

/// Return true if `new_update` is strictly better than `old_update`.
///
/// Tiers, in order: supermajority participation; raw participation while
/// neither has a supermajority; a sync committee proof relevant to the
/// signature period; any finality; finality within the attested period;
/// participation beyond the supermajority; older attested slot; older
/// signature slot. Equal on every tier means not better.
pub fn is_better_update(new_update: &LightClientUpdate, old_update: &LightClientUpdate) -> bool {
    // Compare supermajority (> 2/3) sync committee participation
    let new_participants = new_update.sync_aggregate.num_participants();
    let old_participants = old_update.sync_aggregate.num_participants();
    let new_has_supermajority = new_participants * 3 >= SYNC_COMMITTEE_SIZE * 2;
    let old_has_supermajority = old_participants * 3 >= SYNC_COMMITTEE_SIZE * 2;
    if new_has_supermajority != old_has_supermajority {
        return new_has_supermajority;
    }
    if !new_has_supermajority && new_participants != old_participants {
        return new_participants > old_participants;
    }

    // Compare presence of a sync committee proof relevant to the period the
    // update was signed in
    let new_has_relevant_committee = is_sync_committee_update(new_update)
        && sync_committee_period_at_slot(new_update.attested_header.beacon.slot)
            == sync_committee_period_at_slot(new_update.signature_slot);
    let old_has_relevant_committee = is_sync_committee_update(old_update)
        && sync_committee_period_at_slot(old_update.attested_header.beacon.slot)
            == sync_committee_period_at_slot(old_update.signature_slot);
    if new_has_relevant_committee != old_has_relevant_committee {
        return new_has_relevant_committee;
    }

    // Compare indication of any finality
    let new_has_finality = is_finality_update(new_update);
    let old_has_finality = is_finality_update(old_update);
    if new_has_finality != old_has_finality {
        return new_has_finality;
    }

    // Compare sync committee finality: the finalized header lives in the
    // same period as the attested one
    if new_has_finality {
        let new_has_committee_finality =
            sync_committee_period_at_slot(new_update.finalized_header.beacon.slot)
                == sync_committee_period_at_slot(new_update.attested_header.beacon.slot);
        let old_has_committee_finality =
            sync_committee_period_at_slot(old_update.finalized_header.beacon.slot)
                == sync_committee_period_at_slot(old_update.attested_header.beacon.slot);
        if new_has_committee_finality != old_has_committee_finality {
            return new_has_committee_finality;
        }
    }

    // Tiebreaker 1: participation beyond the supermajority
    if new_participants != old_participants {
        return new_participants > old_participants;
    }

    // Tiebreaker 2: prefer older data (fewer changes to the best update)
    if new_update.attested_header.beacon.slot != old_update.attested_header.beacon.slot {
        return new_update.attested_header.beacon.slot < old_update.attested_header.beacon.slot;
    }
    new_update.signature_slot < old_update.signature_slot
}
