//! khu-rpc
//!
//! JSON-RPC 2.0 server for KHU nodes.
//!
//! Namespace: "khu"
//! Methods:
//!   khu_sendTransaction     — submit a signed transaction (hex-encoded bincode)
//!   khu_getBlockByHeight    — block by height
//!   khu_getBlockByHash      — block by hash hex
//!   khu_getChainStats       — tip/finalized height, entity counts
//!   khu_getOverlayState     — current KHU monetary overlay state
//!   khu_getMasternode       — masternode registry entry by proTxHash
//!   khu_listMasternodes     — full masternode registry
//!   khu_getNote             — staking note by commitment
//!   khu_getProposal         — DAO proposal by ID
//!   khu_listProposals       — all DAO proposals
//!   khu_getDomcCycleStatus  — DOMC commit/reveal phase at a height
//!   khu_getDaoCycleStatus   — DAO proposal cycle phase at a height
//!   khu_getVersion          — node/protocol version
//!   khu_getGenesisInfo      — network-tier protocol constants

pub mod api;
pub mod server;
pub mod types;

pub use server::RpcServer;
pub use server::RpcServerState;
pub use types::{
    RpcBlock, RpcChainStats, RpcGenesisInfo, RpcKhuState, RpcMasternode, RpcNote, RpcProposal,
    RpcVersionInfo,
};
