//! Beacon API JSON format adapter.
//!
//! The beacon node REST API speaks a different dialect than lantern-core's
//! typed values:
//! - integers are quoted strings ("12345")
//! - byte fields are 0x-prefixed hex strings
//! - headers nest as { beacon: {...}, execution: {...} }
//! - everything is wrapped in { data: {...} }
//!
//! This module defines serde types matching the wire format and strict
//! conversions into core types. Malformed input fails here, with a typed
//! [`DecodeError`] — never inside the state machine.

use lantern_core::types::beacon::*;
use lantern_core::types::execution::{ExecutionPayloadHeader, MAX_EXTRA_DATA_BYTES, U256};
use serde::Deserialize;
use thiserror::Error;

/// Errors turning wire JSON into core values.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid encoding in {field}: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },

    #[error("Invalid length for {field}: expected {expected}, got {got}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },
}

// ---------------------------------------------------------------------------
// Hex and integer conversion helpers
// ---------------------------------------------------------------------------

pub fn hex_to_bytes(s: &str, field: &'static str) -> Result<Vec<u8>, DecodeError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| DecodeError::InvalidEncoding {
        field,
        reason: e.to_string(),
    })
}

pub fn hex_to_bytes32(s: &str, field: &'static str) -> Result<[u8; 32], DecodeError> {
    let bytes = hex_to_bytes(s, field)?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| DecodeError::InvalidLength {
            field,
            expected: 32,
            got: bytes.len(),
        })
}

pub fn hex_to_bytes20(s: &str, field: &'static str) -> Result<[u8; 20], DecodeError> {
    let bytes = hex_to_bytes(s, field)?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| DecodeError::InvalidLength {
            field,
            expected: 20,
            got: bytes.len(),
        })
}

fn parse_u64(s: &str, field: &'static str) -> Result<u64, DecodeError> {
    s.parse::<u64>().map_err(|e| DecodeError::InvalidEncoding {
        field,
        reason: e.to_string(),
    })
}

fn parse_u256(s: &str, field: &'static str) -> Result<U256, DecodeError> {
    U256::from_str_radix(s, 10).map_err(|e| DecodeError::InvalidEncoding {
        field,
        reason: e.to_string(),
    })
}

/// Convert a list of hex strings into a fixed-depth merkle branch.
fn parse_branch<const DEPTH: usize>(
    nodes: &[String],
    field: &'static str,
) -> Result<[[u8; 32]; DEPTH], DecodeError> {
    if nodes.len() != DEPTH {
        return Err(DecodeError::InvalidLength {
            field,
            expected: DEPTH,
            got: nodes.len(),
        });
    }
    let mut branch = [[0u8; 32]; DEPTH];
    for (slot, node) in branch.iter_mut().zip(nodes) {
        *slot = hex_to_bytes32(node, field)?;
    }
    Ok(branch)
}

// ---------------------------------------------------------------------------
// Shared sub-structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ApiBeaconBlockHeader {
    pub slot: String,
    pub proposer_index: String,
    pub parent_root: String,
    pub state_root: String,
    pub body_root: String,
}

impl ApiBeaconBlockHeader {
    pub fn to_core(&self) -> Result<BeaconBlockHeader, DecodeError> {
        Ok(BeaconBlockHeader {
            slot: parse_u64(&self.slot, "beacon.slot")?,
            proposer_index: parse_u64(&self.proposer_index, "beacon.proposer_index")?,
            parent_root: hex_to_bytes32(&self.parent_root, "beacon.parent_root")?,
            state_root: hex_to_bytes32(&self.state_root, "beacon.state_root")?,
            body_root: hex_to_bytes32(&self.body_root, "beacon.body_root")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiExecutionPayloadHeader {
    pub parent_hash: String,
    pub fee_recipient: String,
    pub state_root: String,
    pub receipts_root: String,
    pub logs_bloom: String,
    pub prev_randao: String,
    pub block_number: String,
    pub gas_limit: String,
    pub gas_used: String,
    pub timestamp: String,
    pub extra_data: String,
    pub base_fee_per_gas: String,
    pub block_hash: String,
    pub transactions_root: String,
    pub withdrawals_root: String,
}

impl ApiExecutionPayloadHeader {
    pub fn to_core(&self) -> Result<ExecutionPayloadHeader, DecodeError> {
        let logs_bloom_bytes = hex_to_bytes(&self.logs_bloom, "execution.logs_bloom")?;
        let logs_bloom: [u8; 256] =
            logs_bloom_bytes
                .try_into()
                .map_err(|bytes: Vec<u8>| DecodeError::InvalidLength {
                    field: "execution.logs_bloom",
                    expected: 256,
                    got: bytes.len(),
                })?;

        let extra_data = hex_to_bytes(&self.extra_data, "execution.extra_data")?;
        if extra_data.len() > MAX_EXTRA_DATA_BYTES {
            return Err(DecodeError::InvalidLength {
                field: "execution.extra_data",
                expected: MAX_EXTRA_DATA_BYTES,
                got: extra_data.len(),
            });
        }

        Ok(ExecutionPayloadHeader {
            parent_hash: hex_to_bytes32(&self.parent_hash, "execution.parent_hash")?,
            fee_recipient: hex_to_bytes20(&self.fee_recipient, "execution.fee_recipient")?,
            state_root: hex_to_bytes32(&self.state_root, "execution.state_root")?,
            receipts_root: hex_to_bytes32(&self.receipts_root, "execution.receipts_root")?,
            logs_bloom,
            prev_randao: hex_to_bytes32(&self.prev_randao, "execution.prev_randao")?,
            block_number: parse_u64(&self.block_number, "execution.block_number")?,
            gas_limit: parse_u64(&self.gas_limit, "execution.gas_limit")?,
            gas_used: parse_u64(&self.gas_used, "execution.gas_used")?,
            timestamp: parse_u64(&self.timestamp, "execution.timestamp")?,
            extra_data,
            base_fee_per_gas: parse_u256(&self.base_fee_per_gas, "execution.base_fee_per_gas")?,
            block_hash: hex_to_bytes32(&self.block_hash, "execution.block_hash")?,
            transactions_root: hex_to_bytes32(&self.transactions_root, "execution.transactions_root")?,
            withdrawals_root: hex_to_bytes32(&self.withdrawals_root, "execution.withdrawals_root")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiLightClientHeader {
    pub beacon: ApiBeaconBlockHeader,
    /// Absent before Capella; the core representation zero-fills it.
    pub execution: Option<ApiExecutionPayloadHeader>,
    pub execution_branch: Option<Vec<String>>,
}

impl ApiLightClientHeader {
    pub fn to_core(&self) -> Result<LightClientHeader, DecodeError> {
        let execution = match &self.execution {
            Some(execution) => execution.to_core()?,
            None => ExecutionPayloadHeader::default(),
        };
        let execution_branch = match &self.execution_branch {
            Some(branch) => parse_branch::<EXECUTION_BRANCH_DEPTH>(branch, "execution_branch")?,
            None => ExecutionBranch::default(),
        };
        Ok(LightClientHeader {
            beacon: self.beacon.to_core()?,
            execution,
            execution_branch,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiSyncCommittee {
    pub pubkeys: Vec<String>,
    pub aggregate_pubkey: String,
}

impl ApiSyncCommittee {
    pub fn to_core(&self) -> Result<SyncCommittee, DecodeError> {
        if self.pubkeys.len() != SYNC_COMMITTEE_SIZE {
            return Err(DecodeError::InvalidLength {
                field: "sync_committee.pubkeys",
                expected: SYNC_COMMITTEE_SIZE,
                got: self.pubkeys.len(),
            });
        }
        let pubkeys = self
            .pubkeys
            .iter()
            .map(|pk| {
                let bytes = hex_to_bytes(pk, "sync_committee.pubkeys")?;
                BlsPublicKey::from_bytes(&bytes).map_err(|_| DecodeError::InvalidLength {
                    field: "sync_committee.pubkeys",
                    expected: BLS_PUBKEY_LEN,
                    got: bytes.len(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let aggregate_bytes = hex_to_bytes(&self.aggregate_pubkey, "sync_committee.aggregate_pubkey")?;
        let aggregate_pubkey =
            BlsPublicKey::from_bytes(&aggregate_bytes).map_err(|_| DecodeError::InvalidLength {
                field: "sync_committee.aggregate_pubkey",
                expected: BLS_PUBKEY_LEN,
                got: aggregate_bytes.len(),
            })?;

        Ok(SyncCommittee { pubkeys, aggregate_pubkey })
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiSyncAggregate {
    pub sync_committee_bits: String,
    pub sync_committee_signature: String,
}

impl ApiSyncAggregate {
    pub fn to_core(&self) -> Result<SyncAggregate, DecodeError> {
        let bits_bytes = hex_to_bytes(&self.sync_committee_bits, "sync_aggregate.sync_committee_bits")?;
        let sync_committee_bits =
            SyncCommitteeBits::from_bytes(&bits_bytes).map_err(|_| DecodeError::InvalidLength {
                field: "sync_aggregate.sync_committee_bits",
                expected: SYNC_COMMITTEE_BITS_LEN,
                got: bits_bytes.len(),
            })?;

        let sig_bytes =
            hex_to_bytes(&self.sync_committee_signature, "sync_aggregate.sync_committee_signature")?;
        let sync_committee_signature =
            BlsSignature::from_bytes(&sig_bytes).map_err(|_| DecodeError::InvalidLength {
                field: "sync_aggregate.sync_committee_signature",
                expected: BLS_SIGNATURE_LEN,
                got: sig_bytes.len(),
            })?;

        Ok(SyncAggregate { sync_committee_bits, sync_committee_signature })
    }
}

// ---------------------------------------------------------------------------
// Endpoint envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ApiGenesisResponse {
    pub data: ApiGenesisData,
}

#[derive(Debug, Deserialize)]
pub struct ApiGenesisData {
    pub genesis_validators_root: String,
}

impl ApiGenesisResponse {
    pub fn to_core(&self) -> Result<Root, DecodeError> {
        hex_to_bytes32(&self.data.genesis_validators_root, "genesis_validators_root")
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiFinalizedRootResponse {
    pub data: ApiFinalizedRootData,
}

#[derive(Debug, Deserialize)]
pub struct ApiFinalizedRootData {
    pub root: String,
}

impl ApiFinalizedRootResponse {
    pub fn to_core(&self) -> Result<Root, DecodeError> {
        hex_to_bytes32(&self.data.root, "finalized_root")
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiBootstrapResponse {
    pub data: ApiBootstrapData,
}

#[derive(Debug, Deserialize)]
pub struct ApiBootstrapData {
    pub header: ApiLightClientHeader,
    pub current_sync_committee: ApiSyncCommittee,
    pub current_sync_committee_branch: Vec<String>,
}

impl ApiBootstrapData {
    pub fn to_core(&self) -> Result<LightClientBootstrap, DecodeError> {
        Ok(LightClientBootstrap {
            header: self.header.to_core()?,
            current_sync_committee: self.current_sync_committee.to_core()?,
            current_sync_committee_branch: parse_branch::<CURRENT_SYNC_COMMITTEE_BRANCH_DEPTH>(
                &self.current_sync_committee_branch,
                "current_sync_committee_branch",
            )?,
        })
    }
}

/// One element of the updates-by-range response.
#[derive(Debug, Deserialize)]
pub struct ApiUpdateEnvelope {
    pub data: ApiLightClientUpdate,
}

#[derive(Debug, Deserialize)]
pub struct ApiLightClientUpdate {
    pub attested_header: ApiLightClientHeader,
    pub next_sync_committee: ApiSyncCommittee,
    pub next_sync_committee_branch: Vec<String>,
    pub finalized_header: ApiLightClientHeader,
    pub finality_branch: Vec<String>,
    pub sync_aggregate: ApiSyncAggregate,
    pub signature_slot: String,
}

impl ApiLightClientUpdate {
    pub fn to_core(&self) -> Result<LightClientUpdate, DecodeError> {
        Ok(LightClientUpdate {
            attested_header: self.attested_header.to_core()?,
            next_sync_committee: self.next_sync_committee.to_core()?,
            next_sync_committee_branch: parse_branch::<NEXT_SYNC_COMMITTEE_BRANCH_DEPTH>(
                &self.next_sync_committee_branch,
                "next_sync_committee_branch",
            )?,
            finalized_header: self.finalized_header.to_core()?,
            finality_branch: parse_branch::<FINALITY_BRANCH_DEPTH>(
                &self.finality_branch,
                "finality_branch",
            )?,
            sync_aggregate: self.sync_aggregate.to_core()?,
            signature_slot: parse_u64(&self.signature_slot, "signature_slot")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiFinalityUpdateResponse {
    pub data: ApiFinalityUpdateData,
}

#[derive(Debug, Deserialize)]
pub struct ApiFinalityUpdateData {
    pub attested_header: ApiLightClientHeader,
    pub finalized_header: ApiLightClientHeader,
    pub finality_branch: Vec<String>,
    pub sync_aggregate: ApiSyncAggregate,
    pub signature_slot: String,
}

impl ApiFinalityUpdateData {
    pub fn to_core(&self) -> Result<LightClientFinalityUpdate, DecodeError> {
        Ok(LightClientFinalityUpdate {
            attested_header: self.attested_header.to_core()?,
            finalized_header: self.finalized_header.to_core()?,
            finality_branch: parse_branch::<FINALITY_BRANCH_DEPTH>(
                &self.finality_branch,
                "finality_branch",
            )?,
            sync_aggregate: self.sync_aggregate.to_core()?,
            signature_slot: parse_u64(&self.signature_slot, "signature_slot")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiOptimisticUpdateResponse {
    pub data: ApiOptimisticUpdateData,
}

#[derive(Debug, Deserialize)]
pub struct ApiOptimisticUpdateData {
    pub attested_header: ApiLightClientHeader,
    pub sync_aggregate: ApiSyncAggregate,
    pub signature_slot: String,
}

impl ApiOptimisticUpdateData {
    pub fn to_core(&self) -> Result<LightClientOptimisticUpdate, DecodeError> {
        Ok(LightClientOptimisticUpdate {
            attested_header: self.attested_header.to_core()?,
            sync_aggregate: self.sync_aggregate.to_core()?,
            signature_slot: parse_u64(&self.signature_slot, "signature_slot")?,
        })
    }
}
