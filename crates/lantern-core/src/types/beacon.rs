use crate::types::execution::ExecutionPayloadHeader;
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of validators in the Ethereum beacon chain sync committee.
pub const SYNC_COMMITTEE_SIZE: usize = 512;

/// Number of bytes in the sync committee participation bitvector.
pub const SYNC_COMMITTEE_BITS_LEN: usize = SYNC_COMMITTEE_SIZE / 8;

/// Number of bytes in a BLS12-381 public key (compressed).
pub const BLS_PUBKEY_LEN: usize = 48;

/// Number of bytes in a BLS12-381 signature (compressed).
pub const BLS_SIGNATURE_LEN: usize = 96;

/// Slots per epoch.
pub const SLOTS_PER_EPOCH: u64 = 32;

/// Epochs per sync committee period.
pub const EPOCHS_PER_SYNC_COMMITTEE_PERIOD: u64 = 256;

/// Slots per sync committee period (256 epochs * 32 slots/epoch = 8192).
pub const SLOTS_PER_SYNC_COMMITTEE_PERIOD: u64 =
    SLOTS_PER_EPOCH * EPOCHS_PER_SYNC_COMMITTEE_PERIOD;

/// Seconds per slot on mainnet.
pub const SECONDS_PER_SLOT: u64 = 12;

/// Mainnet genesis time (2020-12-01 12:00:23 UTC).
pub const MIN_GENESIS_TIME: u64 = 1_606_824_000;

/// The genesis slot. A finalized header at this slot is represented by the
/// zero header and a zero finalized root.
pub const GENESIS_SLOT: u64 = 0;

/// Minimum number of participating sync committee members for an update to
/// be considered at all. Applying an update still requires a supermajority.
pub const MIN_SYNC_COMMITTEE_PARTICIPANTS: usize = 1;

/// Slots without finality progress after which the best pending update is
/// force-applied to guarantee sync committee progression.
pub const UPDATE_TIMEOUT: u64 = 8192;

/// Maximum number of updates a beacon node serves per request.
pub const MAX_REQUEST_LIGHT_CLIENT_UPDATES: u64 = 128;

/// Domain type for sync committee signatures.
pub const DOMAIN_SYNC_COMMITTEE: [u8; 4] = [0x07, 0x00, 0x00, 0x00];

// Generalized indices into the beacon state / beacon block body SSZ trees.
// The branch depths are floor(log2(index)).
pub const EXECUTION_PAYLOAD_INDEX: u64 = 25;
pub const CURRENT_SYNC_COMMITTEE_INDEX: u64 = 54;
pub const NEXT_SYNC_COMMITTEE_INDEX: u64 = 55;
pub const FINALIZED_ROOT_INDEX: u64 = 105;

pub const EXECUTION_BRANCH_DEPTH: usize = 4;
pub const CURRENT_SYNC_COMMITTEE_BRANCH_DEPTH: usize = 5;
pub const NEXT_SYNC_COMMITTEE_BRANCH_DEPTH: usize = 5;
pub const FINALITY_BRANCH_DEPTH: usize = 6;

/// A 32-byte merkle root or block root.
pub type Root = [u8; 32];

pub type ExecutionBranch = [Root; EXECUTION_BRANCH_DEPTH];
pub type CurrentSyncCommitteeBranch = [Root; CURRENT_SYNC_COMMITTEE_BRANCH_DEPTH];
pub type NextSyncCommitteeBranch = [Root; NEXT_SYNC_COMMITTEE_BRANCH_DEPTH];
pub type FinalityBranch = [Root; FINALITY_BRANCH_DEPTH];

/// Return the epoch number at `slot`.
pub fn epoch_at_slot(slot: u64) -> u64 {
    slot / SLOTS_PER_EPOCH
}

/// Return the sync committee period containing `epoch`.
pub fn sync_committee_period(epoch: u64) -> u64 {
    epoch / EPOCHS_PER_SYNC_COMMITTEE_PERIOD
}

/// Return the sync committee period containing `slot`.
pub fn sync_committee_period_at_slot(slot: u64) -> u64 {
    sync_committee_period(epoch_at_slot(slot))
}

/// A BLS12-381 public key (48 bytes, compressed G1 point).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlsPublicKey(pub [u8; BLS_PUBKEY_LEN]);

impl Serialize for BlsPublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for BlsPublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl BlsPublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, &'static str> {
        if bytes.len() != BLS_PUBKEY_LEN {
            return Err("Invalid BLS public key length");
        }
        let mut arr = [0u8; BLS_PUBKEY_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    pub fn zeroed() -> Self {
        Self([0u8; BLS_PUBKEY_LEN])
    }
}

/// A BLS12-381 signature (96 bytes, compressed G2 point).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlsSignature(pub [u8; BLS_SIGNATURE_LEN]);

impl Serialize for BlsSignature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for BlsSignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl BlsSignature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, &'static str> {
        if bytes.len() != BLS_SIGNATURE_LEN {
            return Err("Invalid BLS signature length");
        }
        let mut arr = [0u8; BLS_SIGNATURE_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

/// A beacon chain block header.
/// This is the minimal header — enough to follow the chain without storing
/// full blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlockHeader {
    /// Slot number of this block.
    pub slot: u64,
    /// Index of the validator who proposed this block.
    pub proposer_index: u64,
    /// Root hash of the parent beacon block.
    pub parent_root: Root,
    /// Root hash of the beacon state after processing this block.
    pub state_root: Root,
    /// Root hash of the block body.
    pub body_root: Root,
}

/// The sync committee — 512 validators that sign off on the chain head.
/// Rotates every ~27 hours (256 epochs).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCommittee {
    /// 512 BLS public keys of committee members.
    pub pubkeys: Vec<BlsPublicKey>,
    /// Aggregated public key of the full committee.
    pub aggregate_pubkey: BlsPublicKey,
}

impl SyncCommittee {
    /// Validate the sync committee has the correct number of members.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.pubkeys.len() != SYNC_COMMITTEE_SIZE {
            return Err("Sync committee must have exactly 512 members");
        }
        Ok(())
    }

    /// The all-zero committee — the wire representation of "absent".
    pub fn zeroed() -> Self {
        Self {
            pubkeys: vec![BlsPublicKey::zeroed(); SYNC_COMMITTEE_SIZE],
            aggregate_pubkey: BlsPublicKey::zeroed(),
        }
    }

    pub fn is_zeroed(&self) -> bool {
        self.pubkeys.iter().all(|pk| pk.0 == [0u8; BLS_PUBKEY_LEN])
            && self.aggregate_pubkey.0 == [0u8; BLS_PUBKEY_LEN]
    }
}

/// The 512-bit sync committee participation bitvector.
/// Bit i (SSZ bit order: little-endian within each byte) corresponds to the
/// committee member at index i.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncCommitteeBits(pub [u8; SYNC_COMMITTEE_BITS_LEN]);

impl SyncCommitteeBits {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, &'static str> {
        if bytes.len() != SYNC_COMMITTEE_BITS_LEN {
            return Err("Sync committee bits must be exactly 64 bytes");
        }
        let mut arr = [0u8; SYNC_COMMITTEE_BITS_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    pub fn zeroed() -> Self {
        Self([0u8; SYNC_COMMITTEE_BITS_LEN])
    }

    /// Count how many sync committee members participated (set bits).
    pub fn num_participants(&self) -> usize {
        self.0.view_bits::<Lsb0>().count_ones()
    }

    /// Check if a specific committee member (by index) participated.
    pub fn has_participant(&self, index: usize) -> bool {
        index < SYNC_COMMITTEE_SIZE && self.0.view_bits::<Lsb0>()[index]
    }

    /// Get the indices of all participating committee members.
    pub fn participant_indices(&self) -> Vec<usize> {
        self.0.view_bits::<Lsb0>().iter_ones().collect()
    }
}

impl Serialize for SyncCommitteeBits {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for SyncCommitteeBits {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// The aggregate BLS signature from the sync committee over an attested
/// header, plus the bitvector saying who signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAggregate {
    /// Which of the 512 committee members signed.
    pub sync_committee_bits: SyncCommitteeBits,
    /// The aggregated BLS signature of all participating members.
    pub sync_committee_signature: BlsSignature,
}

impl SyncAggregate {
    pub fn num_participants(&self) -> usize {
        self.sync_committee_bits.num_participants()
    }

    /// True if more than 2/3 of the committee signed.
    pub fn has_supermajority(&self) -> bool {
        self.num_participants() * 3 >= SYNC_COMMITTEE_SIZE * 2
    }
}

/// A beacon block header together with the execution payload header it
/// commits to. Before Capella the execution fields are zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightClientHeader {
    /// The beacon block header.
    pub beacon: BeaconBlockHeader,
    /// Execution payload header corresponding to `beacon.body_root`
    /// (from Capella onward; zeroed before).
    pub execution: ExecutionPayloadHeader,
    /// Merkle branch proving `execution` against `beacon.body_root`.
    pub execution_branch: ExecutionBranch,
}

impl LightClientHeader {
    pub fn is_zeroed(&self) -> bool {
        *self == Self::default()
    }
}

/// The initial data needed to start following the chain: a trusted header
/// and the sync committee active at that header.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LightClientBootstrap {
    /// The header matching the trusted block root.
    pub header: LightClientHeader,
    /// The sync committee active at the header.
    pub current_sync_committee: SyncCommittee,
    /// Merkle branch proving `current_sync_committee` against
    /// `header.beacon.state_root`.
    pub current_sync_committee_branch: CurrentSyncCommitteeBranch,
}

/// A light client update. Every field must be cryptographically verified
/// before it touches the store.
///
/// Absent fields use the wire zero-value convention: a zero committee with a
/// zero branch, or a zero finalized header with a zero finality branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightClientUpdate {
    /// The header the sync committee attested to.
    pub attested_header: LightClientHeader,
    /// Next sync committee corresponding to `attested_header.beacon.state_root`.
    pub next_sync_committee: SyncCommittee,
    /// Merkle branch proving `next_sync_committee`.
    pub next_sync_committee_branch: NextSyncCommitteeBranch,
    /// Finalized header corresponding to `attested_header.beacon.state_root`.
    pub finalized_header: LightClientHeader,
    /// Merkle branch proving `finalized_header`.
    pub finality_branch: FinalityBranch,
    /// The aggregate signature over the attested header.
    pub sync_aggregate: SyncAggregate,
    /// The slot at which the signature was produced (untrusted).
    pub signature_slot: u64,
}

/// A finality update — a projection of [`LightClientUpdate`] without the
/// next sync committee fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LightClientFinalityUpdate {
    pub attested_header: LightClientHeader,
    pub finalized_header: LightClientHeader,
    pub finality_branch: FinalityBranch,
    pub sync_aggregate: SyncAggregate,
    pub signature_slot: u64,
}

impl LightClientFinalityUpdate {
    /// Normalize into a full update by zero-filling the absent
    /// next-sync-committee fields.
    pub fn into_update(self) -> LightClientUpdate {
        LightClientUpdate {
            attested_header: self.attested_header,
            next_sync_committee: SyncCommittee::zeroed(),
            next_sync_committee_branch: Default::default(),
            finalized_header: self.finalized_header,
            finality_branch: self.finality_branch,
            sync_aggregate: self.sync_aggregate,
            signature_slot: self.signature_slot,
        }
    }
}

/// An optimistic update — a projection of [`LightClientUpdate`] carrying only
/// the attested header and its signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LightClientOptimisticUpdate {
    pub attested_header: LightClientHeader,
    pub sync_aggregate: SyncAggregate,
    pub signature_slot: u64,
}

impl LightClientOptimisticUpdate {
    /// Normalize into a full update by zero-filling both the finality and the
    /// next-sync-committee fields.
    pub fn into_update(self) -> LightClientUpdate {
        LightClientUpdate {
            attested_header: self.attested_header,
            next_sync_committee: SyncCommittee::zeroed(),
            next_sync_committee_branch: Default::default(),
            finalized_header: LightClientHeader::default(),
            finality_branch: Default::default(),
            sync_aggregate: self.sync_aggregate,
            signature_slot: self.signature_slot,
        }
    }
}
