use khu_core::types::{Amount, Commitment, Height, Nullifier};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum NoteStatus {
    Locked,
    Unlocked,
}

/// The chain-side record tracking one staking note from lock to unlock.
/// The shielded payload (owner viewing key material) lives only in the
/// 512-byte memo carried on the lock transaction; this record is the
/// public-state bookkeeping the engine mutates each block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteRecord {
    pub commitment: Commitment,
    pub amount: Amount,
    pub lock_height: Height,
    pub mature_height: Height,
    pub accrued_bonus: Amount,
    pub status: NoteStatus,
    pub nullifier: Option<Nullifier>,
}

impl NoteRecord {
    pub fn new(commitment: Commitment, amount: Amount, lock_height: Height, maturity_blocks: Height) -> Self {
        Self {
            commitment,
            amount,
            lock_height,
            mature_height: lock_height + maturity_blocks,
            accrued_bonus: 0,
            status: NoteStatus::Locked,
            nullifier: None,
        }
    }

    pub fn is_mature(&self, height: Height) -> bool {
        height >= self.mature_height
    }
}
