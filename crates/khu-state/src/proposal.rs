use khu_core::types::{Amount, BlockHash, Height, ProTxHash, Script, VoteChoice};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProposalStatus {
    Submitted,
    Voting,
    Passed,
    Rejected,
    Paid,
}

/// A DAO treasury spending proposal, tracked from submission through its
/// vote window to payout. Votes are keyed by the voting masternode so a
/// second vote from the same member overwrites rather than double-counts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: BlockHash,
    pub cycle_start: Height,
    pub payout_script: Script,
    pub amount: Amount,
    pub fee_paid: Amount,
    pub submitted_height: Height,
    pub votes: BTreeMap<ProTxHash, VoteChoice>,
    pub status: ProposalStatus,
}

impl ProposalRecord {
    pub fn yes_votes(&self) -> u32 {
        self.votes.values().filter(|v| **v == VoteChoice::Yes).count() as u32
    }

    pub fn no_votes(&self) -> u32 {
        self.votes.values().filter(|v| **v == VoteChoice::No).count() as u32
    }

    pub fn abstain_votes(&self) -> u32 {
        self.votes.values().filter(|v| **v == VoteChoice::Abstain).count() as u32
    }
}
