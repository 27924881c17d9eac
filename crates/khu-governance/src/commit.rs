use std::collections::HashMap;

use khu_core::error::KhuError;
use khu_core::types::{BasisPoints, Commitment, ProTxHash};
use khu_crypto::hash::sha256_concat;
use serde::{Deserialize, Serialize};

/// `SHA256(rate_bps_le || salt)`, the commitment a masternode publishes
/// during the commit window before revealing its proposed next-cycle rate.
pub fn compute_commitment(rate_bps: BasisPoints, salt: &[u8; 32]) -> Commitment {
    Commitment::from_bytes(sha256_concat(&rate_bps.to_le_bytes(), salt))
}

/// Tracks one DOMC cycle's commit/reveal votes. A fresh ledger is created at
/// each cycle boundary; [`crate::commit::DomcLedger::finalize`] folds the
/// revealed votes into the single `r_next` value the overlay consumes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DomcLedger {
    commits: HashMap<ProTxHash, Commitment>,
    reveals: HashMap<ProTxHash, BasisPoints>,
}

impl DomcLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_commit(&mut self, proposer: ProTxHash, commitment: Commitment) -> Result<(), KhuError> {
        if self.commits.contains_key(&proposer) {
            return Err(KhuError::DuplicateCommit);
        }
        self.commits.insert(proposer, commitment);
        Ok(())
    }

    pub fn record_reveal(
        &mut self,
        proposer: ProTxHash,
        rate_bps: BasisPoints,
        salt: [u8; 32],
    ) -> Result<(), KhuError> {
        let expected = self
            .commits
            .get(&proposer)
            .ok_or(KhuError::NotRevealPhase)?;
        if compute_commitment(rate_bps, &salt) != *expected {
            return Err(KhuError::RevealMismatch);
        }
        self.reveals.insert(proposer, rate_bps);
        Ok(())
    }

    pub fn reveal_count(&self) -> usize {
        self.reveals.len()
    }

    /// Median of revealed rates becomes the proposed next rate. With zero
    /// reveals the current rate carries forward unchanged, matching the
    /// original v1 commit-reveal rule. For an even number of reveals the
    /// lower of the two middle values is taken.
    pub fn finalize(&self, current_rate: BasisPoints) -> BasisPoints {
        if self.reveals.is_empty() {
            return current_rate;
        }
        let mut rates: Vec<BasisPoints> = self.reveals.values().copied().collect();
        rates.sort_unstable();
        let mid = if rates.len() % 2 == 0 { rates.len() / 2 - 1 } else { rates.len() / 2 };
        rates[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_reveals_leaves_rate_unchanged() {
        let ledger = DomcLedger::new();
        assert_eq!(ledger.finalize(4_000), 4_000);
    }

    #[test]
    fn reveal_mismatch_rejected() {
        let mut ledger = DomcLedger::new();
        let proposer = ProTxHash::from_bytes([1u8; 32]);
        ledger.record_commit(proposer, compute_commitment(3_000, &[0u8; 32])).unwrap();
        assert!(ledger.record_reveal(proposer, 3_500, [0u8; 32]).is_err());
        assert!(ledger.record_reveal(proposer, 3_000, [0u8; 32]).is_ok());
    }

    #[test]
    fn median_of_revealed_rates() {
        let mut ledger = DomcLedger::new();
        for (i, rate) in [1_000u32, 2_000, 3_000].into_iter().enumerate() {
            let proposer = ProTxHash::from_bytes([i as u8 + 1; 32]);
            let salt = [i as u8; 32];
            ledger.record_commit(proposer, compute_commitment(rate, &salt)).unwrap();
            ledger.record_reveal(proposer, rate, salt).unwrap();
        }
        assert_eq!(ledger.finalize(0), 2_000);
    }

    #[test]
    fn median_of_even_reveal_count_takes_lower_middle() {
        let mut ledger = DomcLedger::new();
        for (i, rate) in [1_000u32, 2_000, 3_000, 4_000].into_iter().enumerate() {
            let proposer = ProTxHash::from_bytes([i as u8 + 1; 32]);
            let salt = [i as u8; 32];
            ledger.record_commit(proposer, compute_commitment(rate, &salt)).unwrap();
            ledger.record_reveal(proposer, rate, salt).unwrap();
        }
        assert_eq!(ledger.finalize(0), 2_000);
    }
}
