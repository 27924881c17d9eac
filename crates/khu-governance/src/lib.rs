//! Service layer for DOMC — the commit-reveal mechanism that proposes each
//! cycle's next annual yield rate. The overlay's own state transitions live
//! in khu-state's `StateEngine`; this crate provides the commit/reveal
//! ledger and cycle-phase query helpers used by masternodes and RPC alike.

pub mod commit;
pub mod phase;

pub use commit::{compute_commitment, DomcLedger};
pub use phase::{describe_cycle, phase_at, DomcPhase};
