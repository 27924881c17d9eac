use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::{
    RpcBlock, RpcChainStats, RpcGenesisInfo, RpcKhuState, RpcMasternode, RpcNote, RpcProposal,
    RpcVersionInfo,
};

/// KHU JSON-RPC 2.0 API definition.
///
/// All method names are prefixed with "khu_" via `namespace = "khu"`.
#[rpc(server, namespace = "khu")]
pub trait KhuApi {
    /// Submit a signed transaction. `tx_hex` is hex-encoded bincode(Transaction).
    /// Returns the txid hex on success.
    #[method(name = "sendTransaction")]
    async fn send_transaction(&self, tx_hex: String) -> RpcResult<String>;

    /// Get a block by its height.
    #[method(name = "getBlockByHeight")]
    async fn get_block_by_height(&self, height: u32) -> RpcResult<Option<RpcBlock>>;

    /// Get a block by its hash hex.
    #[method(name = "getBlockByHash")]
    async fn get_block_by_hash(&self, hash_hex: String) -> RpcResult<Option<RpcBlock>>;

    /// Return aggregate chain statistics: tip height, finalized height,
    /// masternode/proposal/note counts.
    #[method(name = "getChainStats")]
    async fn get_chain_stats(&self) -> RpcResult<RpcChainStats>;

    /// Return the current KHU monetary overlay state.
    #[method(name = "getOverlayState")]
    async fn get_overlay_state(&self) -> RpcResult<RpcKhuState>;

    /// Return a single masternode by its proTxHash hex.
    #[method(name = "getMasternode")]
    async fn get_masternode(&self, pro_tx_hash_hex: String) -> RpcResult<Option<RpcMasternode>>;

    /// Return every registered masternode.
    #[method(name = "listMasternodes")]
    async fn list_masternodes(&self) -> RpcResult<Vec<RpcMasternode>>;

    /// Return a single staking note by its commitment hex.
    #[method(name = "getNote")]
    async fn get_note(&self, commitment_hex: String) -> RpcResult<Option<RpcNote>>;

    /// Return a single DAO proposal by its ID hex.
    #[method(name = "getProposal")]
    async fn get_proposal(&self, proposal_id_hex: String) -> RpcResult<Option<RpcProposal>>;

    /// Return every DAO proposal.
    #[method(name = "listProposals")]
    async fn list_proposals(&self) -> RpcResult<Vec<RpcProposal>>;

    /// Describe the DOMC commit/reveal cycle phase at `height`.
    #[method(name = "getDomcCycleStatus")]
    async fn get_domc_cycle_status(&self, height: u32) -> RpcResult<String>;

    /// Describe the DAO proposal cycle phase at `height`.
    #[method(name = "getDaoCycleStatus")]
    async fn get_dao_cycle_status(&self, height: u32) -> RpcResult<String>;

    /// Return node and protocol version information.
    #[method(name = "getVersion")]
    async fn get_version(&self) -> RpcResult<RpcVersionInfo>;

    /// Return genesis/protocol constants for the running network tier.
    #[method(name = "getGenesisInfo")]
    async fn get_genesis_info(&self) -> RpcResult<RpcGenesisInfo>;
}
