use khu_core::constants::ConsensusParams;
use khu_core::error::KhuError;
use khu_core::transaction::Block;
use khu_core::types::{BlockHash, Height, ProTxHash, PublicKeyBytes, Timestamp};
use khu_crypto::hash::sha256_concat;
use khu_state::{MasternodeRecord, MasternodeStatus};

/// `SHA256(prevHash || height || proTxHash)`. Lower score wins rank 0.
pub fn producer_score(prev_hash: &BlockHash, height: Height, pro_tx_hash: &ProTxHash) -> [u8; 32] {
    let mut input = Vec::with_capacity(32 + 4 + 32);
    input.extend_from_slice(prev_hash.as_bytes());
    input.extend_from_slice(&height.to_le_bytes());
    sha256_concat(&input, pro_tx_hash.as_bytes())
}

fn active_masternodes(masternodes: &[MasternodeRecord]) -> Vec<&MasternodeRecord> {
    masternodes.iter().filter(|m| m.status == MasternodeStatus::Enabled).collect()
}

/// Read-only diagnostic: every active masternode's score at this height,
/// sorted by rank (rank 0 first). Useful for RPC introspection, never
/// consulted by the producer-selection path itself.
pub fn calculate_block_producer_scores(
    masternodes: &[MasternodeRecord],
    prev_hash: &BlockHash,
    height: Height,
) -> Vec<(ProTxHash, [u8; 32])> {
    let mut scored: Vec<_> = active_masternodes(masternodes)
        .into_iter()
        .map(|m| (m.pro_tx_hash, producer_score(prev_hash, height, &m.pro_tx_hash)))
        .collect();
    scored.sort_by(|a, b| a.1.cmp(&b.1));
    scored
}

/// The fallback rank that should be producing at `elapsed` seconds past the
/// previous block: rank 0 while within `leader_timeout`, then rank
/// `1 + floor((elapsed - leader_timeout) / fallback_recovery)` beyond it, so
/// the elected producer steps down the score-sorted list the longer the
/// current rank-0 leader fails to produce.
pub fn fallback_rank(elapsed_seconds: i64, leader_timeout_seconds: i64, fallback_recovery_seconds: i64) -> u32 {
    if elapsed_seconds <= leader_timeout_seconds {
        return 0;
    }
    let overdue = elapsed_seconds - leader_timeout_seconds;
    1 + (overdue / fallback_recovery_seconds.max(1)) as u32
}

/// Select the elected producer for `height`. During the DMM bootstrap
/// window (`height < dmm_bootstrap_height`) rank is always 0 — the single
/// masternode registered at genesis height 1 produces every block until the
/// registry has enough members for rank-based rotation to be meaningful.
/// Past bootstrap, the rank consulted escalates via [`fallback_rank`] the
/// longer `now` trails `prev_time` beyond `leader_timeout_seconds`.
pub fn select_producer(
    masternodes: &[MasternodeRecord],
    prev_hash: &BlockHash,
    height: Height,
    prev_time: Timestamp,
    now: Timestamp,
    params: &ConsensusParams,
) -> Result<ProTxHash, KhuError> {
    let active = active_masternodes(masternodes);
    if active.is_empty() {
        return Err(KhuError::Consensus("no active masternodes to select a producer from"));
    }
    if height < params.dmm_bootstrap_height {
        return Ok(active[0].pro_tx_hash);
    }
    let scores = calculate_block_producer_scores(masternodes, prev_hash, height);
    let rank = fallback_rank(now - prev_time, params.leader_timeout_seconds, params.fallback_recovery_seconds);
    let idx = (rank as usize).min(scores.len() - 1);
    scores
        .get(idx)
        .map(|(pro_tx_hash, _)| *pro_tx_hash)
        .ok_or(KhuError::Consensus("producer score list unexpectedly empty"))
}

/// During bootstrap the block timestamp must be monotonic even if produced
/// faster than the normal block interval: `max(prevTime + 1, now)`.
pub fn bootstrap_block_time(prev_time: Timestamp, now: Timestamp) -> Timestamp {
    (prev_time + 1).max(now)
}

/// Verify a produced block's header signature against the claimed
/// producer's operator public key. There is no peer-to-peer layer in this
/// tree to receive blocks from someone else, so this is consulted as a
/// self-check right after signing, the same boundary a receiving node would
/// enforce before accepting a block into its chain.
pub fn verify_block_producer_signature(
    block: &Block,
    operator_pubkey: &PublicKeyBytes,
) -> Result<(), KhuError> {
    let digest = khu_crypto::hash::sha256_hash(&block.header_bytes());
    khu_crypto::ecdsa::verify(operator_pubkey, &digest, &block.producer_signature)
        .map_err(|_| KhuError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use khu_core::types::{OutPoint, PublicKeyBytes, Script, ServiceAddr, TxId};

    fn sample_node(id: u8) -> MasternodeRecord {
        MasternodeRecord {
            pro_tx_hash: ProTxHash::from_bytes([id; 32]),
            collateral: OutPoint::new(TxId::from_bytes([id; 32]), 0),
            collateral_amount: 0,
            operator_pubkey: PublicKeyBytes(vec![id; 33]),
            payout_script: Script::new(vec![]),
            service_addr: ServiceAddr(format!("10.0.0.{id}:9999")),
            registered_height: 1,
            status: MasternodeStatus::Enabled,
            is_genesis: id == 1,
            pose_ban_height: None,
            confirmed_hash: None,
        }
    }

    #[test]
    fn bootstrap_always_picks_first_node() {
        let nodes = vec![sample_node(1), sample_node(2)];
        let prev = BlockHash::from_bytes([9u8; 32]);
        let params = ConsensusParams::regtest();
        let picked = select_producer(&nodes, &prev, 0, 1_000, 1_001, &params).unwrap();
        assert_eq!(picked, nodes[0].pro_tx_hash);
    }

    #[test]
    fn post_bootstrap_selects_lowest_score_within_leader_timeout() {
        let nodes = vec![sample_node(1), sample_node(2), sample_node(3)];
        let prev = BlockHash::from_bytes([9u8; 32]);
        let params = ConsensusParams::regtest();
        let height = params.dmm_bootstrap_height + 1;
        let scores = calculate_block_producer_scores(&nodes, &prev, height);
        let picked = select_producer(&nodes, &prev, height, 1_000, 1_001, &params).unwrap();
        assert_eq!(picked, scores[0].0);
    }

    #[test]
    fn fallback_rank_escalates_past_leader_timeout() {
        assert_eq!(fallback_rank(4, 5, 2), 0);
        assert_eq!(fallback_rank(5, 5, 2), 0);
        assert_eq!(fallback_rank(6, 5, 2), 1);
        assert_eq!(fallback_rank(8, 5, 2), 2);
    }

    #[test]
    fn post_bootstrap_falls_back_past_leader_timeout() {
        let nodes = vec![sample_node(1), sample_node(2), sample_node(3)];
        let prev = BlockHash::from_bytes([9u8; 32]);
        let params = ConsensusParams::regtest();
        let height = params.dmm_bootstrap_height + 1;
        let scores = calculate_block_producer_scores(&nodes, &prev, height);
        let now = 1_000 + params.leader_timeout_seconds + params.fallback_recovery_seconds + 1;
        let picked = select_producer(&nodes, &prev, height, 1_000, now, &params).unwrap();
        assert_eq!(picked, scores[1].0);
    }

    #[test]
    fn block_signature_round_trips_through_verify() {
        use khu_core::types::SignatureBytes;
        let kp = khu_crypto::KeyPair::generate();
        let mut block = Block {
            prev_hash: BlockHash::from_bytes([1u8; 32]),
            merkle_root: BlockHash::NULL,
            height: 1,
            time: 1_000,
            producer: ProTxHash::from_bytes([1u8; 32]),
            producer_signature: SignatureBytes(Vec::new()),
            vtx: Vec::new(),
            final_sapling_root: BlockHash::NULL,
            finality_sig: None,
        };
        let digest = khu_crypto::hash::sha256_hash(&block.header_bytes());
        block.producer_signature = kp.sign(&digest);
        assert!(verify_block_producer_signature(&block, &kp.public_key).is_ok());

        block.height = 2;
        assert!(verify_block_producer_signature(&block, &kp.public_key).is_err());
    }
}
