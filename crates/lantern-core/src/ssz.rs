//! SSZ merkleization and merkle branch verification.
//!
//! Every object the protocol authenticates — beacon headers, sync
//! committees, execution payload headers, signing data — is reduced to a
//! 32-byte hash tree root here, exactly as the consensus spec defines it:
//! containers are merkleized field-by-field in declaration order, chunks are
//! padded to the next power of two with zero chunks, and list roots mix in
//! their length.

use crate::types::beacon::{BeaconBlockHeader, BlsPublicKey, Root, SyncCommittee};
use crate::types::execution::{ExecutionPayloadHeader, MAX_EXTRA_DATA_BYTES};
use sha2::{Digest, Sha256};

/// SHA256 hash of arbitrary data.
pub fn sha256(data: &[u8]) -> Root {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// SHA256 hash of two 32-byte values concatenated.
pub fn sha256_pair(a: &Root, b: &Root) -> Root {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(a);
    data[32..].copy_from_slice(b);
    sha256(&data)
}

/// Encode a u64 as a 32-byte SSZ chunk (little-endian, zero-padded).
pub fn uint64_chunk(value: u64) -> Root {
    let mut chunk = [0u8; 32];
    chunk[..8].copy_from_slice(&value.to_le_bytes());
    chunk
}

/// Merkleize a sequence of 32-byte chunks, padding with zero chunks to the
/// next power of two. An empty sequence merkleizes to the zero chunk.
pub fn merkleize(chunks: &[Root]) -> Root {
    let width = chunks.len().max(1).next_power_of_two();
    let mut layer: Vec<Root> = Vec::with_capacity(width);
    layer.extend_from_slice(chunks);
    layer.resize(width, [0u8; 32]);

    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| sha256_pair(&pair[0], &pair[1]))
            .collect();
    }
    layer[0]
}

/// Mix a list's length into its merkle root.
pub fn mix_in_length(root: &Root, length: u64) -> Root {
    sha256_pair(root, &uint64_chunk(length))
}

/// Hash tree root of a beacon block header: five leaves padded to eight.
pub fn hash_tree_root_beacon_header(header: &BeaconBlockHeader) -> Root {
    merkleize(&[
        uint64_chunk(header.slot),
        uint64_chunk(header.proposer_index),
        header.parent_root,
        header.state_root,
        header.body_root,
    ])
}

/// Hash tree root of a single 48-byte BLS public key: two chunks.
fn hash_tree_root_pubkey(pubkey: &BlsPublicKey) -> Root {
    let mut first = [0u8; 32];
    first.copy_from_slice(&pubkey.0[..32]);
    let mut second = [0u8; 32];
    second[..16].copy_from_slice(&pubkey.0[32..]);
    sha256_pair(&first, &second)
}

/// Hash tree root of a sync committee: a 512-key vector plus the aggregate.
pub fn hash_tree_root_sync_committee(committee: &SyncCommittee) -> Root {
    let pubkey_roots: Vec<Root> = committee.pubkeys.iter().map(hash_tree_root_pubkey).collect();
    merkleize(&[
        merkleize(&pubkey_roots),
        hash_tree_root_pubkey(&committee.aggregate_pubkey),
    ])
}

/// Hash tree root of an execution payload header: fifteen leaves padded to
/// sixteen. The variable-length extra data is a byte list of at most one
/// chunk with its length mixed in.
pub fn hash_tree_root_execution_header(execution: &ExecutionPayloadHeader) -> Root {
    let mut fee_recipient = [0u8; 32];
    fee_recipient[..20].copy_from_slice(&execution.fee_recipient);

    let bloom_chunks: Vec<Root> = execution
        .logs_bloom
        .chunks(32)
        .map(|chunk| {
            let mut leaf = [0u8; 32];
            leaf.copy_from_slice(chunk);
            leaf
        })
        .collect();

    let extra_len = execution.extra_data.len().min(MAX_EXTRA_DATA_BYTES);
    let mut extra_chunk = [0u8; 32];
    extra_chunk[..extra_len].copy_from_slice(&execution.extra_data[..extra_len]);
    let extra_data_root = mix_in_length(&extra_chunk, extra_len as u64);

    merkleize(&[
        execution.parent_hash,
        fee_recipient,
        execution.state_root,
        execution.receipts_root,
        merkleize(&bloom_chunks),
        execution.prev_randao,
        uint64_chunk(execution.block_number),
        uint64_chunk(execution.gas_limit),
        uint64_chunk(execution.gas_used),
        uint64_chunk(execution.timestamp),
        extra_data_root,
        execution.base_fee_per_gas.to_le_bytes::<32>(),
        execution.block_hash,
        execution.transactions_root,
        execution.withdrawals_root,
    ])
}

/// Hash tree root of ForkData { current_version, genesis_validators_root }.
pub fn hash_tree_root_fork_data(current_version: &[u8; 4], genesis_validators_root: &Root) -> Root {
    let mut version_chunk = [0u8; 32];
    version_chunk[..4].copy_from_slice(current_version);
    sha256_pair(&version_chunk, genesis_validators_root)
}

/// Hash tree root of SigningData { object_root, domain }.
pub fn hash_tree_root_signing_data(object_root: &Root, domain: &Root) -> Root {
    sha256_pair(object_root, domain)
}

/// Convert a generalized index into the leaf index within its subtree:
/// `g mod 2^floor(log2(g))`.
pub fn subtree_index(generalized_index: u64) -> u64 {
    generalized_index % (1u64 << generalized_index.ilog2())
}

/// Verify a merkle branch against an expected root.
///
/// `index` is the leaf index within the subtree (not a generalized index).
/// At level i the i-th bit of the index decides whether the sibling sits on
/// the left or the right.
pub fn verify_merkle_branch(
    leaf: &Root,
    branch: &[Root],
    depth: usize,
    index: u64,
    root: &Root,
) -> bool {
    if branch.len() != depth {
        return false;
    }

    let mut current = *leaf;
    for (i, node) in branch.iter().enumerate() {
        if (index >> i) & 1 == 1 {
            current = sha256_pair(node, &current);
        } else {
            current = sha256_pair(&current, node);
        }
    }

    current == *root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::beacon::{
        CURRENT_SYNC_COMMITTEE_INDEX, EXECUTION_PAYLOAD_INDEX, FINALIZED_ROOT_INDEX,
        NEXT_SYNC_COMMITTEE_INDEX,
    };
    use hex_literal::hex;

    #[test]
    fn test_sha256_pair_of_zero_chunks() {
        // The well-known level-1 zero hash of the SSZ merkle tree.
        let expected = hex!("f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b");
        assert_eq!(sha256_pair(&[0u8; 32], &[0u8; 32]), expected);
    }

    #[test]
    fn test_uint64_chunk_little_endian() {
        let chunk = uint64_chunk(42);
        assert_eq!(chunk[0], 42);
        assert_eq!(chunk[1..32], [0u8; 31]);
    }

    #[test]
    fn test_merkleize_single_chunk_is_identity() {
        let chunk = sha256(b"leaf");
        assert_eq!(merkleize(&[chunk]), chunk);
        assert_eq!(merkleize(&[]), [0u8; 32]);
    }

    #[test]
    fn test_merkleize_pads_with_zero_chunks() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        let c = sha256(b"c");

        assert_eq!(merkleize(&[a, b]), sha256_pair(&a, &b));

        let expected = sha256_pair(&sha256_pair(&a, &b), &sha256_pair(&c, &[0u8; 32]));
        assert_eq!(merkleize(&[a, b, c]), expected);
    }

    #[test]
    fn test_beacon_header_root_is_field_sensitive() {
        let mut header = BeaconBlockHeader {
            slot: 100,
            proposer_index: 7,
            parent_root: [1u8; 32],
            state_root: [2u8; 32],
            body_root: [3u8; 32],
        };
        let root = hash_tree_root_beacon_header(&header);
        assert_eq!(root, hash_tree_root_beacon_header(&header.clone()));

        header.state_root[31] ^= 1;
        assert_ne!(root, hash_tree_root_beacon_header(&header));
    }

    #[test]
    fn test_sync_committee_root_changes_with_any_member() {
        let mut committee = SyncCommittee::zeroed();
        let root = hash_tree_root_sync_committee(&committee);

        committee.pubkeys[511] = BlsPublicKey([9u8; 48]);
        assert_ne!(root, hash_tree_root_sync_committee(&committee));
    }

    #[test]
    fn test_execution_header_root_covers_extra_data_length() {
        let mut execution = ExecutionPayloadHeader::default();
        let root = hash_tree_root_execution_header(&execution);

        // A zero byte appended changes only the mixed-in length.
        execution.extra_data = vec![0u8];
        assert_ne!(root, hash_tree_root_execution_header(&execution));
    }

    #[test]
    fn test_subtree_index() {
        assert_eq!(subtree_index(EXECUTION_PAYLOAD_INDEX), 9);
        assert_eq!(subtree_index(CURRENT_SYNC_COMMITTEE_INDEX), 22);
        assert_eq!(subtree_index(NEXT_SYNC_COMMITTEE_INDEX), 23);
        assert_eq!(subtree_index(FINALIZED_ROOT_INDEX), 41);
    }

    #[test]
    fn test_verify_merkle_branch_roundtrip() {
        let leaf = sha256(b"leaf");
        let siblings = [sha256(b"s0"), sha256(b"s1"), sha256(b"s2")];

        // index 5 = 0b101: sibling left, right, left
        let mut node = sha256_pair(&siblings[0], &leaf);
        node = sha256_pair(&node, &siblings[1]);
        let root = sha256_pair(&siblings[2], &node);

        assert!(verify_merkle_branch(&leaf, &siblings, 3, 5, &root));
        assert!(!verify_merkle_branch(&leaf, &siblings, 3, 4, &root));
        assert!(!verify_merkle_branch(&leaf, &siblings[..2], 3, 5, &root));

        let mut bad_leaf = leaf;
        bad_leaf[0] ^= 1;
        assert!(!verify_merkle_branch(&bad_leaf, &siblings, 3, 5, &root));
    }
}
