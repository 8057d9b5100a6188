//! Shared test fixtures: deterministic BLS committees, a consistent mini
//! beacon-state merkle tree around the light client generalized indices,
//! and builders for fully signed updates.

use crate::consensus::fork::{compute_domain, compute_signing_root, ForkSchedule};
use crate::consensus::light_client::LightClient;
use crate::consensus::store::LightClientStore;
use crate::ssz::{hash_tree_root_beacon_header, hash_tree_root_sync_committee, sha256_pair};
use crate::types::beacon::*;
use blst::min_pk::{AggregatePublicKey, AggregateSignature, PublicKey, SecretKey, Signature};
use hex_literal::hex;

/// Ethereum BLS signature domain separation tag.
const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Mainnet genesis validators root.
pub const GENESIS_VALIDATORS_ROOT: Root =
    hex!("4b363db94e286120d76eb905340fdd4e54bfe9f06bf33ff6cf5ad27f511bfe95");

/// A slot in the Bellatrix era, 880 slots into sync committee period 610.
/// Pre-Capella, so test headers carry no execution payload.
pub const BASE_SLOT: u64 = 4_998_000;

/// A sync committee with its secret keys, for producing real aggregate
/// signatures in tests.
pub struct TestCommittee {
    pub committee: SyncCommittee,
    secret_keys: Vec<SecretKey>,
}

impl TestCommittee {
    /// Deterministically generate a full 512-member committee.
    pub fn generate(seed: u8) -> Self {
        let mut secret_keys = Vec::with_capacity(SYNC_COMMITTEE_SIZE);
        let mut pubkeys = Vec::with_capacity(SYNC_COMMITTEE_SIZE);
        for i in 0..SYNC_COMMITTEE_SIZE {
            let mut ikm = [0u8; 32];
            ikm[0] = seed;
            ikm[1..9].copy_from_slice(&(i as u64).to_le_bytes());
            let sk = SecretKey::key_gen(&ikm, &[]).unwrap();
            pubkeys.push(BlsPublicKey(sk.sk_to_pk().to_bytes()));
            secret_keys.push(sk);
        }

        let pks: Vec<PublicKey> = secret_keys.iter().map(|sk| sk.sk_to_pk()).collect();
        let pk_refs: Vec<&PublicKey> = pks.iter().collect();
        let aggregate = AggregatePublicKey::aggregate(&pk_refs, false).unwrap();
        let aggregate_pubkey = BlsPublicKey(aggregate.to_public_key().to_bytes());

        Self {
            committee: SyncCommittee { pubkeys, aggregate_pubkey },
            secret_keys,
        }
    }

    /// Aggregate signature of the participating members over `message`.
    pub fn sign(&self, bits: &SyncCommitteeBits, message: &Root) -> BlsSignature {
        let sigs: Vec<Signature> = bits
            .participant_indices()
            .into_iter()
            .map(|i| self.secret_keys[i].sign(message, DST, &[]))
            .collect();
        let refs: Vec<&Signature> = sigs.iter().collect();
        let aggregate = AggregateSignature::aggregate(&refs, false).unwrap();
        BlsSignature(aggregate.to_signature().to_bytes())
    }
}

/// A participation bitvector with the first `n` bits set.
pub fn bits_with(n: usize) -> SyncCommitteeBits {
    let mut bytes = [0u8; SYNC_COMMITTEE_BITS_LEN];
    for i in 0..n {
        bytes[i / 8] |= 1 << (i % 8);
    }
    SyncCommitteeBits(bytes)
}

/// A pre-Capella light client header at `slot` with fixed filler roots.
pub fn make_header(slot: u64) -> LightClientHeader {
    LightClientHeader {
        beacon: BeaconBlockHeader {
            slot,
            proposer_index: 1,
            parent_root: [1u8; 32],
            state_root: [2u8; 32],
            body_root: [3u8; 32],
        },
        ..Default::default()
    }
}

/// A non-zero committee that is cheap to build and compare. Not a valid
/// point on the curve — for tests of store plumbing only.
pub fn marker_committee(byte: u8) -> SyncCommittee {
    SyncCommittee {
        pubkeys: vec![BlsPublicKey([byte; BLS_PUBKEY_LEN]); SYNC_COMMITTEE_SIZE],
        aggregate_pubkey: BlsPublicKey([byte; BLS_PUBKEY_LEN]),
    }
}

/// An update skeleton with headers and a finality-marker branch but no
/// committee and no signature. For comparator and applier tests that never
/// touch crypto.
pub fn make_unsigned_update(attested_slot: u64, finalized_slot: u64) -> LightClientUpdate {
    LightClientUpdate {
        attested_header: make_header(attested_slot),
        next_sync_committee: SyncCommittee::zeroed(),
        next_sync_committee_branch: Default::default(),
        finalized_header: make_header(finalized_slot),
        finality_branch: [[0x22u8; 32]; FINALITY_BRANCH_DEPTH],
        sync_aggregate: SyncAggregate {
            sync_committee_bits: SyncCommitteeBits::zeroed(),
            sync_committee_signature: BlsSignature([0u8; BLS_SIGNATURE_LEN]),
        },
        signature_slot: attested_slot + 1,
    }
}

/// Branches for the three protocol proofs, all rooted in one state root.
pub struct StateProofs {
    pub state_root: Root,
    pub finality_branch: FinalityBranch,
    pub next_committee_branch: NextSyncCommitteeBranch,
    pub current_committee_branch: CurrentSyncCommitteeBranch,
}

/// Build a miniature beacon-state merkle tree containing the three leaves
/// the light client proves: the finalized root at generalized index 105 and
/// the current/next sync committees at 54/55. All other nodes are fixed
/// filler values.
pub fn state_proofs(
    finalized_root: Root,
    current_committee_root: Root,
    next_committee_root: Root,
) -> StateProofs {
    // Node numbering is by generalized index: node g has children 2g, 2g+1.
    let n104 = [0xa4u8; 32];
    let n105 = finalized_root;
    let n52 = sha256_pair(&n104, &n105);
    let n53 = [0x53u8; 32];
    let n26 = sha256_pair(&n52, &n53);
    let n54 = current_committee_root;
    let n55 = next_committee_root;
    let n27 = sha256_pair(&n54, &n55);
    let n13 = sha256_pair(&n26, &n27);
    let n12 = [0x12u8; 32];
    let n6 = sha256_pair(&n12, &n13);
    let n7 = [0x07u8; 32];
    let n3 = sha256_pair(&n6, &n7);
    let n2 = [0x02u8; 32];
    let state_root = sha256_pair(&n2, &n3);

    StateProofs {
        state_root,
        finality_branch: [n104, n53, n27, n12, n7, n2],
        next_committee_branch: [n54, n26, n12, n7, n2],
        current_committee_branch: [n55, n26, n12, n7, n2],
    }
}

/// A complete test world: two committees with keys, a fork schedule, and
/// builders for bootstraps and signed updates.
pub struct Fixture {
    pub genesis_validators_root: Root,
    pub forks: ForkSchedule,
    pub current_committee: TestCommittee,
    pub next_committee: TestCommittee,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            genesis_validators_root: GENESIS_VALIDATORS_ROOT,
            forks: ForkSchedule::mainnet(),
            current_committee: TestCommittee::generate(1),
            next_committee: TestCommittee::generate(2),
        }
    }

    /// Bootstrap data at BASE_SLOT carrying the current committee with a
    /// valid inclusion proof.
    pub fn bootstrap(&self) -> LightClientBootstrap {
        let proofs = state_proofs(
            [0xf1u8; 32],
            hash_tree_root_sync_committee(&self.current_committee.committee),
            hash_tree_root_sync_committee(&self.next_committee.committee),
        );

        let mut header = make_header(BASE_SLOT);
        header.beacon.state_root = proofs.state_root;

        LightClientBootstrap {
            header,
            current_sync_committee: self.current_committee.committee.clone(),
            current_sync_committee_branch: proofs.current_committee_branch,
        }
    }

    pub fn bootstrap_store(&self) -> LightClientStore {
        let bootstrap = self.bootstrap();
        let trusted_root = hash_tree_root_beacon_header(&bootstrap.header.beacon);
        LightClientStore::initialize(&trusted_root, &bootstrap, &self.forks).unwrap()
    }

    pub fn client(&self) -> LightClient {
        let bootstrap = self.bootstrap();
        let trusted_root = hash_tree_root_beacon_header(&bootstrap.header.beacon);
        LightClient::bootstrap(
            &trusted_root,
            &bootstrap,
            self.genesis_validators_root,
            self.forks,
        )
        .unwrap()
    }

    /// An update with a finality proof only, signed by the current
    /// committee.
    pub fn finality_update(
        &self,
        participants: usize,
        attested_slot: u64,
        finalized_slot: u64,
    ) -> LightClientUpdate {
        self.build_update(
            participants,
            attested_slot,
            Some(finalized_slot),
            None,
            &self.current_committee,
        )
    }

    /// An update with both a finality proof and the fixture's next committee
    /// with its inclusion proof, signed by the current committee.
    pub fn committee_update(
        &self,
        participants: usize,
        attested_slot: u64,
        finalized_slot: u64,
    ) -> LightClientUpdate {
        let next = self.next_committee.committee.clone();
        self.build_update(
            participants,
            attested_slot,
            Some(finalized_slot),
            Some(next),
            &self.current_committee,
        )
    }

    /// A cross-period update signed by the fixture's next committee,
    /// carrying `new_committee` as the following one.
    pub fn rotation_update(
        &self,
        participants: usize,
        attested_slot: u64,
        finalized_slot: u64,
        new_committee: &SyncCommittee,
    ) -> LightClientUpdate {
        self.build_update(
            participants,
            attested_slot,
            Some(finalized_slot),
            Some(new_committee.clone()),
            &self.next_committee,
        )
    }

    /// An update with neither finality nor a committee proof, signed by the
    /// current committee.
    pub fn optimistic_update(&self, participants: usize, attested_slot: u64) -> LightClientUpdate {
        self.build_update(participants, attested_slot, None, None, &self.current_committee)
    }

    fn build_update(
        &self,
        participants: usize,
        attested_slot: u64,
        finalized_slot: Option<u64>,
        next_committee: Option<SyncCommittee>,
        signer: &TestCommittee,
    ) -> LightClientUpdate {
        let finalized_header = match finalized_slot {
            Some(slot) => make_header(slot),
            None => LightClientHeader::default(),
        };
        let finalized_leaf = match finalized_slot {
            Some(_) => hash_tree_root_beacon_header(&finalized_header.beacon),
            None => [0xf1u8; 32],
        };
        let next_leaf = match next_committee.as_ref() {
            Some(committee) => hash_tree_root_sync_committee(committee),
            None => hash_tree_root_sync_committee(&self.next_committee.committee),
        };

        let proofs = state_proofs(
            finalized_leaf,
            hash_tree_root_sync_committee(&self.current_committee.committee),
            next_leaf,
        );

        let mut attested_header = make_header(attested_slot);
        attested_header.beacon.state_root = proofs.state_root;

        let signature_slot = attested_slot + 1;
        let fork_version = self
            .forks
            .fork_version_at_epoch(epoch_at_slot(signature_slot - 1));
        let domain = compute_domain(
            &DOMAIN_SYNC_COMMITTEE,
            &fork_version,
            &self.genesis_validators_root,
        );
        let signing_root = compute_signing_root(
            &hash_tree_root_beacon_header(&attested_header.beacon),
            &domain,
        );

        let bits = bits_with(participants);
        let signature = signer.sign(&bits, &signing_root);

        LightClientUpdate {
            attested_header,
            next_sync_committee: next_committee.clone().unwrap_or_else(SyncCommittee::zeroed),
            next_sync_committee_branch: match next_committee {
                Some(_) => proofs.next_committee_branch,
                None => Default::default(),
            },
            finalized_header,
            finality_branch: match finalized_slot {
                Some(_) => proofs.finality_branch,
                None => Default::default(),
            },
            sync_aggregate: SyncAggregate {
                sync_committee_bits: bits,
                sync_committee_signature: signature,
            },
            signature_slot,
        }
    }
}
