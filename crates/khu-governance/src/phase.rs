use khu_core::constants::ConsensusParams;
use khu_core::types::Height;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomcPhase {
    Commit,
    Reveal,
    Settled,
}

/// Classify `height` within the DOMC cycle starting at `cycle_start`.
pub fn phase_at(params: &ConsensusParams, cycle_start: Height, height: Height) -> DomcPhase {
    if height < params.domc_commit_phase_start(cycle_start) {
        DomcPhase::Settled
    } else if height < params.domc_reveal_deadline(cycle_start) {
        DomcPhase::Commit
    } else if height < params.domc_reveal_instant(cycle_start) {
        DomcPhase::Reveal
    } else {
        DomcPhase::Settled
    }
}

/// Human-readable status string, used by RPC introspection.
pub fn describe_cycle(params: &ConsensusParams, cycle_start: Height, height: Height) -> String {
    let phase = phase_at(params, cycle_start, height);
    let cycle_end = params.domc_cycle_end(cycle_start);
    format!(
        "cycle {cycle_start}-{cycle_end} at height {height}: {phase:?}"
    )
}
