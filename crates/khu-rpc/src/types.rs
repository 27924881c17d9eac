use serde::{Deserialize, Serialize};

/// JSON-serializable block summary returned by `khu_getBlockByHeight` /
/// `khu_getBlockByHash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcBlock {
    pub hash: String,
    pub prev_hash: String,
    pub height: u32,
    pub time: i64,
    pub producer: String,
    pub tx_count: usize,
    pub finalized: bool,
}

/// JSON view of the KHU monetary overlay, returned by `khu_getOverlayState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcKhuState {
    pub colored: i64,
    pub uncolored: i64,
    pub locked: i64,
    pub reserved: i64,
    pub unreserved: i64,
    pub treasury: i64,
    pub r_annual_bps: u32,
    pub r_next_bps: u32,
    pub domc_cycle_start: u32,
    pub dao_cycle_start: u32,
}

/// JSON-serializable masternode registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcMasternode {
    pub pro_tx_hash: String,
    pub collateral: String,
    pub collateral_amount: i64,
    pub service_addr: String,
    pub registered_height: u32,
    pub status: String,
    pub is_genesis: bool,
}

/// JSON-serializable staking note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcNote {
    pub commitment: String,
    pub amount: i64,
    pub lock_height: u32,
    pub mature_height: u32,
    pub accrued_bonus: i64,
    pub status: String,
}

/// JSON-serializable DAO proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcProposal {
    pub id: String,
    pub cycle_start: u32,
    pub amount: i64,
    pub fee_paid: i64,
    pub submitted_height: u32,
    pub yes_votes: u32,
    pub no_votes: u32,
    pub abstain_votes: u32,
    pub status: String,
}

/// Aggregate chain statistics returned by `khu_getChainStats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcChainStats {
    pub tip_height: u32,
    pub finalized_height: u32,
    pub total_masternodes: u64,
    pub total_proposals: u64,
    pub total_notes: u64,
}

/// Node / protocol version information returned by `khu_getVersion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcVersionInfo {
    pub node_version: String,
    pub protocol_version: String,
}

/// Network-tier protocol constants returned by `khu_getGenesisInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcGenesisInfo {
    pub network: String,
    pub maturity_blocks: u32,
    pub domc_cycle_blocks: u32,
    pub dao_cycle_blocks: u32,
    pub r_initial_bps: u32,
    pub r_floor_bps: u32,
    pub quorum_size: u32,
    pub quorum_threshold: u32,
    pub khu_activation_height: u32,
}
