//! BLS12-381 aggregate signature verification for sync committee
//! attestations. One aggregate verification replaces up to 512 individual
//! ones.

use crate::types::beacon::{BlsPublicKey, BlsSignature};
use blst::min_pk::{AggregatePublicKey, PublicKey, Signature};
use blst::BLST_ERROR;
use thiserror::Error;

/// Domain separation tag for Ethereum consensus BLS signatures.
const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Errors from aggregate signature verification.
#[derive(Debug, Error)]
pub enum BlsError {
    #[error("No participating public keys: an empty aggregate cannot be verified")]
    EmptyParticipantSet,

    #[error("Invalid BLS public key at index {index}: {reason}")]
    InvalidPublicKey { index: usize, reason: String },

    #[error("Malformed BLS signature: {reason}")]
    MalformedSignature { reason: String },

    #[error("BLS aggregation error: {reason}")]
    AggregationFailed { reason: String },

    #[error("Invalid BLS signature: the aggregate does not verify against the participating keys")]
    SignatureRejected,
}

/// Verify an aggregate signature over `message` against the given set of
/// participating public keys.
///
/// An empty participant set is always rejected — an aggregate of nothing
/// proves nothing.
pub fn fast_aggregate_verify(
    pubkeys: &[&BlsPublicKey],
    message: &[u8; 32],
    signature: &BlsSignature,
) -> Result<(), BlsError> {
    if pubkeys.is_empty() {
        return Err(BlsError::EmptyParticipantSet);
    }

    let sig = Signature::from_bytes(&signature.0).map_err(|e| BlsError::MalformedSignature {
        reason: format!("{:?}", e),
    })?;

    let pks: Vec<PublicKey> = pubkeys
        .iter()
        .enumerate()
        .map(|(index, pk)| {
            PublicKey::from_bytes(&pk.0).map_err(|e| BlsError::InvalidPublicKey {
                index,
                reason: format!("{:?}", e),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let pk_refs: Vec<&PublicKey> = pks.iter().collect();
    let agg_pk = AggregatePublicKey::aggregate(&pk_refs, false).map_err(|e| {
        BlsError::AggregationFailed {
            reason: format!("{:?}", e),
        }
    })?;

    let result = sig.verify(false, message, DST, &[], &agg_pk.to_public_key(), false);
    if result != BLST_ERROR::BLST_SUCCESS {
        return Err(BlsError::SignatureRejected);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blst::min_pk::{AggregateSignature, SecretKey};

    fn keypair(seed: u8) -> (SecretKey, BlsPublicKey) {
        let mut ikm = [seed; 32];
        ikm[31] = seed.wrapping_add(1);
        let sk = SecretKey::key_gen(&ikm, &[]).unwrap();
        let pk = BlsPublicKey(sk.sk_to_pk().to_bytes());
        (sk, pk)
    }

    fn aggregate(sigs: &[Signature]) -> BlsSignature {
        let refs: Vec<&Signature> = sigs.iter().collect();
        let agg = AggregateSignature::aggregate(&refs, false).unwrap();
        BlsSignature(agg.to_signature().to_bytes())
    }

    #[test]
    fn test_aggregate_verify_roundtrip() {
        let message = [0x42u8; 32];
        let pairs: Vec<_> = (1..=4).map(keypair).collect();

        let sigs: Vec<Signature> =
            pairs.iter().map(|(sk, _)| sk.sign(&message, DST, &[])).collect();
        let signature = aggregate(&sigs);

        let pubkeys: Vec<&BlsPublicKey> = pairs.iter().map(|(_, pk)| pk).collect();
        assert!(fast_aggregate_verify(&pubkeys, &message, &signature).is_ok());
    }

    #[test]
    fn test_flipped_signature_bit_rejected() {
        let message = [0x42u8; 32];
        let (sk, pk) = keypair(7);
        let mut signature = BlsSignature(sk.sign(&message, DST, &[]).to_bytes());

        assert!(fast_aggregate_verify(&[&pk], &message, &signature).is_ok());

        signature.0[95] ^= 0x01;
        assert!(fast_aggregate_verify(&[&pk], &message, &signature).is_err());
    }

    #[test]
    fn test_wrong_message_rejected() {
        let (sk, pk) = keypair(9);
        let signature = BlsSignature(sk.sign(&[0x42u8; 32], DST, &[]).to_bytes());

        let result = fast_aggregate_verify(&[&pk], &[0x43u8; 32], &signature);
        assert!(matches!(result, Err(BlsError::SignatureRejected)));
    }

    #[test]
    fn test_empty_participant_set_rejected() {
        let (sk, _) = keypair(3);
        let signature = BlsSignature(sk.sign(&[0u8; 32], DST, &[]).to_bytes());

        let result = fast_aggregate_verify(&[], &[0u8; 32], &signature);
        assert!(matches!(result, Err(BlsError::EmptyParticipantSet)));
    }

    #[test]
    fn test_missing_participant_rejected() {
        let message = [0x42u8; 32];
        let pairs: Vec<_> = (1..=3).map(keypair).collect();
        let sigs: Vec<Signature> =
            pairs.iter().map(|(sk, _)| sk.sign(&message, DST, &[])).collect();
        let signature = aggregate(&sigs);

        // Verify against only two of the three signers.
        let pubkeys: Vec<&BlsPublicKey> = pairs[..2].iter().map(|(_, pk)| pk).collect();
        assert!(matches!(
            fast_aggregate_verify(&pubkeys, &message, &signature),
            Err(BlsError::SignatureRejected)
        ));
    }
}
