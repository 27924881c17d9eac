//! khu-genesis
//!
//! Builds the KHU genesis state from scratch, writing directly into a
//! `StateDb` without going through the normal state engine (genesis has no
//! previous block and no producer to validate against — it is the founding
//! document the rest of the chain is anchored to).
//!
//! Genesis establishes:
//!   1. An empty KHU monetary overlay (`C = U = Z = 0`, `Cr = Ur = 0`, `T = 0`,
//!      `R_annual = R_initial` for the running network tier).
//!   2. The bootstrap masternode set, each marked `is_genesis` so DMM producer
//!      selection and quorum formation have a known-good registry on block 1.
//!   3. The genesis block itself (height 0, null prev_hash, no producer).

pub mod params;

pub use params::{GenesisMasternode, GenesisParams};

use khu_core::constants::{ConsensusParams, GENESIS_TIMESTAMP};
use khu_core::error::KhuError;
use khu_core::transaction::Block;
use khu_core::types::{BlockHash, ProTxHash, SignatureBytes};
use khu_crypto::hash::{block_hash_from_header, pro_tx_hash_from_registration};
use khu_state::db::StateDb;
use khu_state::khu::KhuOverlayState;
use khu_state::masternode::{MasternodeRecord, MasternodeStatus};
use tracing::info;

/// Apply the genesis state to an empty `StateDb`. This is the one and only
/// place in the protocol where the KHU overlay and masternode registry are
/// seeded outside the normal state-engine transition path.
///
/// # Panics
/// Panics if the DB already has a chain tip (genesis may only be applied once).
pub fn apply_genesis(
    db: &StateDb,
    params: &GenesisParams,
    consensus: &ConsensusParams,
) -> Result<Vec<ProTxHash>, KhuError> {
    assert!(
        db.get_block_hash_at_height(0)?.is_none(),
        "genesis may only be applied to an empty database"
    );
    info!(tier = ?consensus.tier, "applying KHU genesis state");

    // ── KHU overlay: empty at genesis ────────────────────────────────────────
    let khu = KhuOverlayState::genesis(consensus.r_initial);
    khu.check_invariants()?;
    db.put_khu_state(&khu)?;

    // ── Bootstrap masternodes ─────────────────────────────────────────────────
    let mut pro_tx_hashes = Vec::with_capacity(params.masternodes.len());
    for gm in &params.masternodes {
        let pro_tx_hash =
            pro_tx_hash_from_registration(&gm.collateral.to_bytes(), &gm.operator_pubkey.0);
        let record = MasternodeRecord {
            pro_tx_hash,
            collateral: gm.collateral,
            collateral_amount: gm.collateral_amount,
            operator_pubkey: gm.operator_pubkey.clone(),
            payout_script: gm.payout_script.clone(),
            service_addr: gm.service_addr.clone(),
            registered_height: 0,
            status: MasternodeStatus::Enabled,
            is_genesis: true,
            pose_ban_height: None,
            confirmed_hash: None,
        };
        db.put_masternode(&record)?;
        pro_tx_hashes.push(pro_tx_hash);
    }
    info!(count = pro_tx_hashes.len(), "genesis: bootstrap masternodes registered");

    // ── Genesis block ──────────────────────────────────────────────────────────
    let block = Block {
        prev_hash: BlockHash::NULL,
        merkle_root: BlockHash::NULL,
        height: 0,
        time: GENESIS_TIMESTAMP,
        producer: ProTxHash::NULL,
        producer_signature: SignatureBytes(Vec::new()),
        vtx: Vec::new(),
        final_sapling_root: BlockHash::NULL,
        finality_sig: None,
    };
    let hash = block_hash_from_header(&block.header_bytes());
    db.put_block(&hash, &block)?;

    db.flush()?;
    info!(%hash, "genesis block committed to disk");

    Ok(pro_tx_hashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use khu_core::types::{OutPoint, PublicKeyBytes, Script, ServiceAddr, TxId};

    fn test_params() -> GenesisParams {
        GenesisParams {
            masternodes: vec![GenesisMasternode {
                collateral: OutPoint::new(TxId::from_bytes([7u8; 32]), 0),
                collateral_amount: 1_000,
                operator_pubkey: PublicKeyBytes(vec![2u8; 33]),
                payout_script: Script::new(vec![0u8; 25]),
                service_addr: ServiceAddr("127.0.0.1:9999".to_string()),
            }],
        }
    }

    #[test]
    fn genesis_overlay_starts_empty_and_valid() {
        let dir = std::env::temp_dir().join("khu_genesis_test_overlay");
        let _ = std::fs::remove_dir_all(&dir);
        let db = StateDb::open(&dir).unwrap();
        let params = test_params();
        let consensus = ConsensusParams::regtest();

        apply_genesis(&db, &params, &consensus).expect("genesis must succeed");

        let khu = db.get_khu_state().unwrap().unwrap();
        assert_eq!(khu.colored, 0);
        assert_eq!(khu.uncolored, 0);
        assert_eq!(khu.locked, 0);
        assert_eq!(khu.r_annual, consensus.r_initial);
        khu.check_invariants().unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn genesis_masternodes_are_enabled_and_marked_genesis() {
        let dir = std::env::temp_dir().join("khu_genesis_test_mn");
        let _ = std::fs::remove_dir_all(&dir);
        let db = StateDb::open(&dir).unwrap();
        let params = test_params();
        let consensus = ConsensusParams::regtest();

        let pro_tx_hashes = apply_genesis(&db, &params, &consensus).expect("genesis must succeed");
        assert_eq!(pro_tx_hashes.len(), 1);

        let record = db.get_masternode(&pro_tx_hashes[0]).unwrap().unwrap();
        assert!(record.is_genesis);
        assert!(record.is_active());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn genesis_block_is_written_at_height_zero() {
        let dir = std::env::temp_dir().join("khu_genesis_test_block");
        let _ = std::fs::remove_dir_all(&dir);
        let db = StateDb::open(&dir).unwrap();
        let params = test_params();
        let consensus = ConsensusParams::regtest();

        apply_genesis(&db, &params, &consensus).expect("genesis must succeed");
        let hash = db.get_block_hash_at_height(0).unwrap().expect("genesis block present");
        let block = db.get_block(&hash).unwrap().expect("genesis block present");
        assert_eq!(block.height, 0);
        assert_eq!(block.prev_hash, BlockHash::NULL);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
