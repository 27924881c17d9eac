use khu_core::types::{BlockHash, Commitment, Nullifier, ProTxHash, TxId};
use sha2::{Digest, Sha256};

/// BLAKE3 of arbitrary bytes, used for transaction and block body hashing.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// SHA256 of arbitrary bytes. The producer-score and quorum-seed formulas
/// are stated in terms of SHA256, not BLAKE3, so both are carried.
pub fn sha256_hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// `SHA256(a || b)`, the two-part concatenation used by the producer-score
/// and quorum-member-score formulas.
pub fn sha256_concat(a: &[u8], b: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

pub fn txid_from_body(body_bytes: &[u8]) -> TxId {
    TxId::from_bytes(blake3_hash(body_bytes))
}

pub fn block_hash_from_header(header_bytes: &[u8]) -> BlockHash {
    BlockHash::from_bytes(blake3_hash(header_bytes))
}

/// Derive a masternode's proTxHash from its collateral outpoint and operator
/// public key, so registration is deterministic and collateral-bound.
pub fn pro_tx_hash_from_registration(collateral_bytes: &[u8; 36], operator_pubkey: &[u8]) -> ProTxHash {
    ProTxHash::from_bytes(sha256_concat(collateral_bytes, operator_pubkey))
}

/// Derive a note commitment from its opening (value || rcm || memo hash).
pub fn commitment_from_opening(value: i64, rcm: &[u8; 32], memo: &[u8]) -> Commitment {
    let mut hasher = Sha256::new();
    hasher.update(value.to_le_bytes());
    hasher.update(rcm);
    hasher.update(memo);
    Commitment::from_bytes(hasher.finalize().into())
}

/// Derive the nullifier that spends a note, from its commitment and the
/// spend authority's secret scalar.
pub fn nullifier_from_commitment(commitment: &Commitment, nsk: &[u8; 32]) -> Nullifier {
    Nullifier::from_bytes(sha256_concat(commitment.as_bytes(), nsk))
}
