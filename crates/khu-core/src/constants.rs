//! ─── KHU Protocol Constants & Network Parameters ───────────────────────────
//!
//! Scalar constants that never vary by deployment tier, plus the
//! [`ConsensusParams`] bundle of every tunable named in the component design
//! (masternode timing, DOMC/DAO cycle geometry, yield decay). Three built-in
//! tiers (`mainnet`, `testnet`, `regtest`) are carried as configuration data,
//! not consensus logic.

use crate::types::{BasisPoints, Height};

// ── Fixed protocol constants ─────────────────────────────────────────────────

/// Denominator in the daily treasury-accumulation formula:
/// `T += (U * R_annual) / (10000 * T_DIVISOR * 365)`.
pub const TREASURY_T_DIVISOR: u128 = 8;

/// Minimum amount (base-coin units) that may be locked into a staking note.
pub const MIN_LOCK_AMOUNT: i64 = 1;

/// Basis-point denominator (10000 = 100%).
pub const BASIS_POINT_SCALE: u128 = 10_000;

/// Days per year used throughout the yield/treasury formulas. The protocol
/// intentionally uses the calendar approximation, not a leap-year count.
pub const DAYS_PER_YEAR: u128 = 365;

/// Byte length of the canonical ZKHU staking-note memo (§6).
pub const NOTE_MEMO_LEN: usize = 512;

/// Magic prefix of the ZKHU note memo.
pub const NOTE_MEMO_MAGIC: &[u8; 4] = b"ZKHU";

/// Current note memo schema version.
pub const NOTE_MEMO_VERSION: u8 = 1;

/// Quorum seed domain-separation tag (§4.D).
pub const QUORUM_SEED_DOMAIN: &[u8] = b"HU_QUORUM";

/// Unix timestamp of the genesis block, all network tiers.
pub const GENESIS_TIMESTAMP: crate::types::Timestamp = 1_735_689_600;

// ── Network tier ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkTier {
    Mainnet,
    Testnet,
    Regtest,
}

/// Every tunable parameter named in §4 (producer selection, finality, KHU
/// engine, DOMC, DAO) and §10 (ambient configuration), bundled per network
/// tier so consensus logic never hardcodes a deployment-specific constant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsensusParams {
    pub tier: NetworkTier,

    /// Blocks a staking note must age before it is eligible for yield/unlock.
    pub maturity_blocks: Height,

    /// DOMC cycle geometry, all in blocks, offsets from cycle start.
    pub domc_cycle_blocks: Height,
    pub domc_commit_offset: Height,
    pub domc_reveal_offset: Height,
    pub domc_phase_duration: Height,

    /// DAO cycle geometry, all in blocks, offsets from cycle start.
    pub dao_cycle_blocks: Height,
    pub dao_submit_window: Height,
    pub dao_study_window: Height,
    pub dao_vote_window: Height,

    /// Yield-rate decay schedule (basis points).
    pub r_initial: BasisPoints,
    pub r_floor: BasisPoints,
    pub r_decay_per_year: BasisPoints,

    /// Daily/annual timing.
    pub blocks_per_day: Height,
    pub blocks_per_year: Height,
    pub block_time_seconds: u32,

    /// Finality quorum.
    pub quorum_size: u32,
    pub quorum_threshold: u32,
    pub quorum_rotation_blocks: Height,

    /// DMM leader timing.
    pub leader_timeout_seconds: i64,
    pub fallback_recovery_seconds: i64,
    pub dmm_bootstrap_height: Height,

    /// Blocks a `MasternodeRegister` transaction must age before its record
    /// is promoted from `PreEnabled` to `Enabled`.
    pub mn_confirmation_depth: Height,

    /// Reorg protection.
    pub max_reorg_depth: Height,

    /// DAO proposal bounds (base-coin units).
    pub dao_min_proposal_amount: i64,
    pub dao_max_proposal_amount: i64,
    pub dao_proposal_fee: i64,

    /// Height at which the KHU overlay activates (the `V6_activation` datum
    /// the decay and daily-yield formulas are offset from).
    pub khu_activation_height: Height,
}

impl ConsensusParams {
    /// Mainnet tier: 60s blocks, 1440 blocks/day, 90-day DOMC cycles,
    /// 30-day DAO cycles, 12/8 quorum.
    pub fn mainnet() -> Self {
        Self {
            tier: NetworkTier::Mainnet,
            maturity_blocks: 4320,
            domc_cycle_blocks: 129_600,
            domc_commit_offset: 119_520,
            domc_reveal_offset: 123_840,
            domc_phase_duration: 4_320,
            dao_cycle_blocks: 43_200,
            dao_submit_window: 10_080,
            dao_study_window: 20_160,
            dao_vote_window: 10_080,
            r_initial: 4_000,
            r_floor: 700,
            r_decay_per_year: 100,
            blocks_per_day: 1_440,
            blocks_per_year: 525_600,
            block_time_seconds: 60,
            quorum_size: 12,
            quorum_threshold: 8,
            quorum_rotation_blocks: 12,
            leader_timeout_seconds: 45,
            fallback_recovery_seconds: 15,
            dmm_bootstrap_height: 10,
            mn_confirmation_depth: 100,
            max_reorg_depth: 12,
            dao_min_proposal_amount: 100,
            dao_max_proposal_amount: 1_000_000,
            dao_proposal_fee: 50,
            khu_activation_height: 0,
        }
    }

    /// Testnet tier: shorter cycles for fast iteration, 3/2 quorum.
    pub fn testnet() -> Self {
        Self {
            tier: NetworkTier::Testnet,
            maturity_blocks: 60,
            domc_cycle_blocks: 4_320,
            domc_commit_offset: 3_600,
            domc_reveal_offset: 3_960,
            domc_phase_duration: 360,
            dao_cycle_blocks: 1_440,
            dao_submit_window: 480,
            dao_study_window: 480,
            dao_vote_window: 480,
            r_initial: 4_000,
            r_floor: 700,
            r_decay_per_year: 100,
            blocks_per_day: 1_440,
            blocks_per_year: 525_600,
            block_time_seconds: 60,
            quorum_size: 3,
            quorum_threshold: 2,
            quorum_rotation_blocks: 3,
            leader_timeout_seconds: 30,
            fallback_recovery_seconds: 15,
            dmm_bootstrap_height: 5,
            mn_confirmation_depth: 20,
            max_reorg_depth: 6,
            dao_min_proposal_amount: 100,
            dao_max_proposal_amount: 1_000_000,
            dao_proposal_fee: 50,
            khu_activation_height: 0,
        }
    }

    /// Regtest tier: tiny cycles sized for deterministic integration tests
    /// (matches the S1-S6 seed scenarios in the component design, §8).
    pub fn regtest() -> Self {
        Self {
            tier: NetworkTier::Regtest,
            maturity_blocks: 10,
            domc_cycle_blocks: 90,
            domc_commit_offset: 75,
            domc_reveal_offset: 82,
            domc_phase_duration: 7,
            dao_cycle_blocks: 30,
            dao_submit_window: 10,
            dao_study_window: 10,
            dao_vote_window: 10,
            r_initial: 4_000,
            r_floor: 700,
            r_decay_per_year: 100,
            blocks_per_day: 10,
            blocks_per_year: 3_650,
            block_time_seconds: 1,
            quorum_size: 1,
            quorum_threshold: 1,
            quorum_rotation_blocks: 1,
            leader_timeout_seconds: 5,
            fallback_recovery_seconds: 2,
            dmm_bootstrap_height: 1,
            mn_confirmation_depth: 2,
            max_reorg_depth: 100,
            dao_min_proposal_amount: 100,
            dao_max_proposal_amount: 1_000_000,
            dao_proposal_fee: 50,
            khu_activation_height: 0,
        }
    }

    pub fn domc_commit_phase_start(&self, cycle_start: Height) -> Height {
        cycle_start + self.domc_commit_offset
    }

    pub fn domc_reveal_deadline(&self, cycle_start: Height) -> Height {
        cycle_start + self.domc_reveal_offset
    }

    pub fn domc_reveal_instant(&self, cycle_start: Height) -> Height {
        cycle_start + self.domc_reveal_offset + self.domc_phase_duration
    }

    pub fn domc_cycle_end(&self, cycle_start: Height) -> Height {
        cycle_start + self.domc_cycle_blocks
    }

    pub fn dao_voting_start(&self, cycle_start: Height) -> Height {
        cycle_start + self.dao_submit_window + self.dao_study_window
    }

    pub fn dao_voting_end(&self, cycle_start: Height) -> Height {
        self.dao_voting_start(cycle_start) + self.dao_vote_window
    }

    pub fn dao_payout_height(&self, cycle_start: Height) -> Height {
        cycle_start + self.dao_cycle_blocks
    }
}
