use khu_core::constants::ConsensusParams;
use khu_core::types::{BlockHash, Height, ProTxHash};
use khu_state::db::StateDb;
use khu_state::proposal::{ProposalRecord, ProposalStatus};

/// Query helpers for DAO treasury proposals.
pub struct ProposalQuery<'a> {
    db: &'a StateDb,
    params: &'a ConsensusParams,
}

impl<'a> ProposalQuery<'a> {
    pub fn new(db: &'a StateDb, params: &'a ConsensusParams) -> Self {
        Self { db, params }
    }

    /// Fetch a single proposal by its ID.
    pub fn get(&self, id: &BlockHash) -> Option<ProposalRecord> {
        self.db.get_proposal(id).ok().flatten()
    }

    pub fn has_voted(&self, id: &BlockHash, voter: &ProTxHash) -> bool {
        self.get(id).map(|p| p.votes.contains_key(voter)).unwrap_or(false)
    }

    /// Human-readable summary of a proposal's state.
    pub fn describe(&self, id: &BlockHash, height: Height) -> String {
        let Some(p) = self.get(id) else {
            return format!("proposal {id}: unknown");
        };
        let voting_start = self.params.dao_voting_start(p.cycle_start);
        let voting_end = self.params.dao_voting_end(p.cycle_start);
        let payout_height = self.params.dao_payout_height(p.cycle_start);

        let status_str = match p.status {
            ProposalStatus::Submitted if height < voting_start => {
                format!("submitted — study period until height {voting_start}")
            }
            ProposalStatus::Submitted | ProposalStatus::Voting if height <= voting_end => format!(
                "voting open until height {voting_end} — {} yes / {} no",
                p.yes_votes(),
                p.no_votes()
            ),
            ProposalStatus::Submitted | ProposalStatus::Voting => format!(
                "voting closed at height {voting_end} — awaiting payout at {payout_height}"
            ),
            ProposalStatus::Passed => {
                format!("passed — payout scheduled at height {payout_height}")
            }
            ProposalStatus::Paid => "paid out".to_string(),
            ProposalStatus::Rejected => {
                format!("rejected — {} yes / {} no", p.yes_votes(), p.no_votes())
            }
        };

        format!(
            "proposal {} | {} KHU | submitted at height {} | {}",
            id, p.amount, p.submitted_height, status_str
        )
    }
}
