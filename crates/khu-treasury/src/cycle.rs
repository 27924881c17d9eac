use khu_core::constants::ConsensusParams;
use khu_core::types::Height;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DaoPhase {
    Submit,
    Study,
    Vote,
    Payout,
}

/// Classify `height` within the DAO proposal cycle starting at `cycle_start`.
pub fn phase_at(params: &ConsensusParams, cycle_start: Height, height: Height) -> DaoPhase {
    let voting_start = params.dao_voting_start(cycle_start);
    let voting_end = params.dao_voting_end(cycle_start);
    let payout = params.dao_payout_height(cycle_start);
    if height < cycle_start + params.dao_submit_window {
        DaoPhase::Submit
    } else if height < voting_start {
        DaoPhase::Study
    } else if height <= voting_end {
        DaoPhase::Vote
    } else {
        let _ = payout;
        DaoPhase::Payout
    }
}

pub fn describe_cycle(params: &ConsensusParams, cycle_start: Height, height: Height) -> String {
    let phase = phase_at(params, cycle_start, height);
    let payout = params.dao_payout_height(cycle_start);
    format!("dao cycle {cycle_start}-{payout} at height {height}: {phase:?}")
}
