//! Service layer for the DAO treasury proposal cycle. The propose/vote/payout
//! state transitions themselves live in khu-state's `StateEngine`; this crate
//! provides the read-side query helper and cycle-phase classification used by
//! masternodes and RPC alike.

pub mod cycle;
pub mod query;

pub use cycle::{describe_cycle, phase_at, DaoPhase};
pub use query::ProposalQuery;
