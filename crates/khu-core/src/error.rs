use thiserror::Error;

use crate::types::Height;

/// Composed error type returned at every consensus/state/RPC boundary.
/// Downstream crates define their own narrower errors and convert into this
/// one at the crate seam, following the same per-crate-enum-composes-upward
/// shape throughout the workspace.
#[derive(Debug, Error)]
pub enum KhuError {
    // ── Validation (attacker-controlled input, never panics) ────────────────
    #[error("validation failed: {reason}")]
    Validation { reason: String, banscore: u32 },

    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: i64, have: i64 },

    #[error("unknown outpoint: {0}")]
    UnknownOutpoint(String),

    #[error("outpoint already spent: {0}")]
    AlreadySpent(String),

    #[error("nullifier already seen: {0}")]
    DuplicateNullifier(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid script: {0}")]
    InvalidScript(String),

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("lock amount below minimum ({min} required)")]
    LockAmountTooSmall { min: i64 },

    #[error("note memo malformed: {0}")]
    MalformedNoteMemo(String),

    // ── Consensus (producer selection, block structure, finality) ───────────
    #[error("consensus rule violated: {0}")]
    Consensus(&'static str),

    #[error("block producer mismatch: expected rank {expected}, signer claims rank {got}")]
    ProducerMismatch { expected: u32, got: u32 },

    #[error("masternode not found: {0}")]
    UnknownMasternode(String),

    #[error("masternode collateral below minimum")]
    InsufficientCollateral,

    #[error("quorum signature threshold not met: need {need}, got {got}")]
    QuorumThresholdNotMet { need: u32, got: u32 },

    #[error("signer {0} is not a member of the active quorum")]
    NotQuorumMember(String),

    #[error("reorg blocked: height {height} is at or below finalized height {finalized_height}")]
    ReorgBlocked { height: Height, finalized_height: Height },

    // ── KHU monetary invariants ──────────────────────────────────────────────
    #[error("khu invariant violated: {0}")]
    InvariantViolation(&'static str),

    #[error("staking note not mature: unlocks at height {unlock_height}")]
    NoteNotMature { unlock_height: Height },

    #[error("staking note already unlocked")]
    NoteAlreadyUnlocked,

    // ── DOMC / DAO governance ────────────────────────────────────────────────
    #[error("not in commit phase at this height")]
    NotCommitPhase,

    #[error("not in reveal phase at this height")]
    NotRevealPhase,

    #[error("reveal does not match committed hash")]
    RevealMismatch,

    #[error("duplicate commit for this cycle")]
    DuplicateCommit,

    #[error("dao proposal amount out of bounds: {amount} not in [{min}, {max}]")]
    ProposalAmountOutOfBounds { amount: i64, min: i64, max: i64 },

    #[error("dao proposal not found: {0}")]
    UnknownProposal(String),

    #[error("voting window closed for this proposal")]
    VotingWindowClosed,

    #[error("duplicate vote from this masternode")]
    DuplicateVote,

    // ── Crypto / storage / resource ──────────────────────────────────────────
    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("genesis state mismatch: {0}")]
    GenesisMismatch(String),

    #[error("{0}")]
    Other(String),
}

pub type KhuResult<T> = Result<T, KhuError>;
