use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use khu_core::constants::{ConsensusParams, QUORUM_SEED_DOMAIN};
use khu_core::error::KhuError;
use khu_core::types::{BlockHash, Height, ProTxHash, PublicKeyBytes, SignatureBytes};
use khu_crypto::hash::sha256_concat;
use khu_state::MasternodeRecord;
use tracing::info;

/// `SHA256(lastFinalizedBlockHash || cycle || "HU_QUORUM")`.
pub fn quorum_seed(last_finalized: &BlockHash, cycle: u32) -> [u8; 32] {
    let mut input = Vec::with_capacity(32 + 4);
    input.extend_from_slice(last_finalized.as_bytes());
    input.extend_from_slice(&cycle.to_le_bytes());
    sha256_concat(&input, QUORUM_SEED_DOMAIN)
}

/// `SHA256(seed || proTxHash)`; the top `quorum_size` members by this score
/// form the active quorum for the cycle.
pub fn select_quorum(
    masternodes: &[MasternodeRecord],
    seed: &[u8; 32],
    quorum_size: u32,
) -> Vec<ProTxHash> {
    let mut scored: Vec<_> = masternodes
        .iter()
        .filter(|m| m.is_active())
        .map(|m| (m.pro_tx_hash, sha256_concat(seed, m.pro_tx_hash.as_bytes())))
        .collect();
    scored.sort_by(|a, b| a.1.cmp(&b.1));
    scored.into_iter().take(quorum_size as usize).map(|(p, _)| p).collect()
}

/// A chain's independently-locked finality store. This lock is deliberately
/// separate from whatever protects the UTXO/KHU overlay state, mirroring a
/// dedicated finality subsystem that advances on quorum signatures alone and
/// must never be blocked on unrelated state-engine work.
pub struct FinalityStore {
    inner: Mutex<FinalityState>,
}

struct FinalityState {
    finalized_height: Height,
    finalized_hash: BlockHash,
    pending_sigs: HashMap<BlockHash, HashSet<ProTxHash>>,
}

impl FinalityStore {
    pub fn new(genesis_hash: BlockHash) -> Self {
        Self {
            inner: Mutex::new(FinalityState {
                finalized_height: 0,
                finalized_hash: genesis_hash,
                pending_sigs: HashMap::new(),
            }),
        }
    }

    pub fn finalized_height(&self) -> Height {
        self.inner.lock().unwrap().finalized_height
    }

    pub fn finalized_hash(&self) -> BlockHash {
        self.inner.lock().unwrap().finalized_hash
    }

    /// Reject any reorg whose fork point is at or below the finalized
    /// height — the core monotonic-finality guarantee.
    pub fn would_violate_finality(&self, reorg_height: Height) -> bool {
        reorg_height <= self.inner.lock().unwrap().finalized_height
    }

    pub fn check_reorg(&self, reorg_height: Height) -> Result<(), KhuError> {
        if self.would_violate_finality(reorg_height) {
            let finalized_height = self.inner.lock().unwrap().finalized_height;
            return Err(KhuError::ReorgBlocked { height: reorg_height, finalized_height });
        }
        Ok(())
    }

    /// Record one quorum member's signature over `block_hash`, rejecting it
    /// outright unless it is a valid ECDSA signature by `signer_pubkey` over
    /// the block hash. Once `quorum_threshold` distinct members in `quorum`
    /// have signed, the block (and everything beneath it) is finalized.
    pub fn record_signature(
        &self,
        block_hash: BlockHash,
        block_height: Height,
        signer: ProTxHash,
        signature: &SignatureBytes,
        signer_pubkey: &PublicKeyBytes,
        quorum: &[ProTxHash],
        params: &ConsensusParams,
    ) -> Result<bool, KhuError> {
        if !quorum.contains(&signer) {
            return Ok(false);
        }
        khu_crypto::ecdsa::verify(signer_pubkey, block_hash.as_bytes(), signature)
            .map_err(|_| KhuError::InvalidSignature)?;
        let mut state = self.inner.lock().unwrap();
        let signers = state.pending_sigs.entry(block_hash).or_default();
        signers.insert(signer);
        let count = signers.len() as u32;
        if count >= params.quorum_threshold && block_height > state.finalized_height {
            state.finalized_height = block_height;
            state.finalized_hash = block_hash;
            state.pending_sigs.retain(|h, _| h != &block_hash);
            info!(height = block_height, hash = %block_hash, signatures = count, "block finalized by quorum");
            return Ok(true);
        }
        Ok(false)
    }
}

/// A single quorum member's signature contribution, gossiped between nodes
/// until the threshold is met.
#[derive(Clone, Debug)]
pub struct FinalitySignature {
    pub block_hash: BlockHash,
    pub signer: ProTxHash,
    pub signature: SignatureBytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorg_below_finalized_height_is_blocked() {
        let store = FinalityStore::new(BlockHash::NULL);
        let params = ConsensusParams::regtest();
        let quorum = vec![ProTxHash::from_bytes([1u8; 32])];
        let block_hash = BlockHash::from_bytes([2u8; 32]);
        let kp = khu_crypto::KeyPair::generate();
        let sig = kp.sign(block_hash.as_bytes());
        store
            .record_signature(block_hash, 5, quorum[0], &sig, &kp.public_key, &quorum, &params)
            .unwrap();
        assert!(store.check_reorg(3).is_err());
        assert!(store.check_reorg(6).is_ok());
    }

    #[test]
    fn forged_signature_is_rejected() {
        let store = FinalityStore::new(BlockHash::NULL);
        let params = ConsensusParams::regtest();
        let quorum = vec![ProTxHash::from_bytes([1u8; 32])];
        let block_hash = BlockHash::from_bytes([2u8; 32]);
        let signer_kp = khu_crypto::KeyPair::generate();
        let imposter_kp = khu_crypto::KeyPair::generate();
        let sig = imposter_kp.sign(block_hash.as_bytes());
        let result =
            store.record_signature(block_hash, 5, quorum[0], &sig, &signer_kp.public_key, &quorum, &params);
        assert!(result.is_err());
    }
}
