//! Fork schedule and signing domain computation.
//!
//! Sync committee signatures are domain-separated by the fork active at the
//! epoch the signature was produced in, so the light client has to know the
//! chain's fork schedule to recompute the exact 32-byte message that was
//! signed.

use crate::ssz::{hash_tree_root_fork_data, hash_tree_root_signing_data};
use crate::types::beacon::Root;

/// A fork version (4 bytes) and the epoch it activates at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fork {
    pub version: [u8; 4],
    pub epoch: u64,
}

/// The fork schedule of the chain being followed: a step function from epoch
/// to fork version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForkSchedule {
    pub genesis: Fork,
    pub altair: Fork,
    pub bellatrix: Fork,
    pub capella: Fork,
}

impl ForkSchedule {
    /// The Ethereum mainnet schedule.
    pub const fn mainnet() -> Self {
        Self {
            genesis: Fork { version: [0x00, 0x00, 0x00, 0x00], epoch: 0 },
            altair: Fork { version: [0x01, 0x00, 0x00, 0x00], epoch: 74_240 },
            bellatrix: Fork { version: [0x02, 0x00, 0x00, 0x00], epoch: 144_896 },
            capella: Fork { version: [0x03, 0x00, 0x00, 0x00], epoch: 194_048 },
        }
    }

    /// Return the version of the most recent fork activated at or before
    /// `epoch`.
    pub fn fork_version_at_epoch(&self, epoch: u64) -> [u8; 4] {
        if epoch >= self.capella.epoch {
            self.capella.version
        } else if epoch >= self.bellatrix.epoch {
            self.bellatrix.version
        } else if epoch >= self.altair.epoch {
            self.altair.version
        } else {
            self.genesis.version
        }
    }

    pub fn capella_fork_epoch(&self) -> u64 {
        self.capella.epoch
    }
}

impl Default for ForkSchedule {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Compute the fork data root for a fork version and genesis validators
/// root. Used in signature domains to avoid cross-chain replay.
pub fn compute_fork_data_root(current_version: &[u8; 4], genesis_validators_root: &Root) -> Root {
    hash_tree_root_fork_data(current_version, genesis_validators_root)
}

/// Compute a signing domain: the 4-byte domain type followed by the first 28
/// bytes of the fork data root.
pub fn compute_domain(
    domain_type: &[u8; 4],
    fork_version: &[u8; 4],
    genesis_validators_root: &Root,
) -> Root {
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);
    let mut domain = [0u8; 32];
    domain[..4].copy_from_slice(domain_type);
    domain[4..].copy_from_slice(&fork_data_root[..28]);
    domain
}

/// Compute the signing root: the 32-byte value the committee actually signs.
pub fn compute_signing_root(object_root: &Root, domain: &Root) -> Root {
    hash_tree_root_signing_data(object_root, domain)
}
