use serde::{Deserialize, Serialize};

pub use alloy_primitives::U256;

/// Number of bytes in the logs bloom filter.
pub const BYTES_PER_LOGS_BLOOM: usize = 256;

/// Maximum length of the extra data field.
pub const MAX_EXTRA_DATA_BYTES: usize = 32;

/// The execution payload header embedded in a light client header from
/// Capella onward. The light client never executes anything — this exists so
/// downstream code can read an authenticated execution state root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPayloadHeader {
    /// Hash of the parent execution block.
    pub parent_hash: [u8; 32],
    /// Address of the fee recipient (coinbase).
    pub fee_recipient: [u8; 20],
    /// Root of the execution layer state trie.
    pub state_root: [u8; 32],
    /// Root of the receipts trie.
    pub receipts_root: [u8; 32],
    /// Bloom filter over the block's logs.
    #[serde(with = "bloom_serde")]
    pub logs_bloom: [u8; BYTES_PER_LOGS_BLOOM],
    /// RANDAO mix of the previous block.
    pub prev_randao: [u8; 32],
    /// Block number in the execution layer.
    pub block_number: u64,
    /// Gas limit.
    pub gas_limit: u64,
    /// Gas used.
    pub gas_used: u64,
    /// Block timestamp.
    pub timestamp: u64,
    /// Arbitrary proposer data, at most 32 bytes.
    pub extra_data: Vec<u8>,
    /// Base fee per gas (EIP-1559), a full 256-bit quantity.
    pub base_fee_per_gas: U256,
    /// Hash of the execution block.
    pub block_hash: [u8; 32],
    /// Root of the transactions list.
    pub transactions_root: [u8; 32],
    /// Root of the withdrawals list.
    pub withdrawals_root: [u8; 32],
}

impl Default for ExecutionPayloadHeader {
    fn default() -> Self {
        Self {
            parent_hash: [0u8; 32],
            fee_recipient: [0u8; 20],
            state_root: [0u8; 32],
            receipts_root: [0u8; 32],
            logs_bloom: [0u8; BYTES_PER_LOGS_BLOOM],
            prev_randao: [0u8; 32],
            block_number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Vec::new(),
            base_fee_per_gas: U256::ZERO,
            block_hash: [0u8; 32],
            transactions_root: [0u8; 32],
            withdrawals_root: [0u8; 32],
        }
    }
}

mod bloom_serde {
    use super::BYTES_PER_LOGS_BLOOM;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bloom: &[u8; BYTES_PER_LOGS_BLOOM], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bloom)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; BYTES_PER_LOGS_BLOOM], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        if bytes.len() != BYTES_PER_LOGS_BLOOM {
            return Err(serde::de::Error::custom("logs bloom must be 256 bytes"));
        }
        let mut arr = [0u8; BYTES_PER_LOGS_BLOOM];
        arr.copy_from_slice(&bytes);
        Ok(arr)
    }
}
