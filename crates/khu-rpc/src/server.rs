use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use tracing::{info, warn};

use khu_consensus::FinalityStore;
use khu_core::constants::ConsensusParams;
use khu_core::transaction::{Block, Transaction};
use khu_core::types::{BlockHash, Commitment, ProTxHash};
use khu_state::db::StateDb;
use khu_state::masternode::MasternodeStatus;
use khu_state::note::NoteStatus;
use khu_state::proposal::ProposalStatus;

use crate::api::KhuApiServer;
use crate::types::{
    RpcBlock, RpcChainStats, RpcGenesisInfo, RpcKhuState, RpcMasternode, RpcNote, RpcProposal,
    RpcVersionInfo,
};

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

/// Shared state passed to the RPC server.
pub struct RpcServerState {
    pub db: Arc<StateDb>,
    pub params: ConsensusParams,
    pub finality: Arc<FinalityStore>,
    /// Optional sender to forward incoming transactions to the node's
    /// block-production pipeline.
    pub tx_sender: Option<tokio::sync::mpsc::Sender<Transaction>>,
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr`. Returns a handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let server = Server::builder().build(addr).await?;
        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "RPC server started");
        Ok(handle)
    }
}

fn block_to_rpc(hash: BlockHash, block: &Block) -> RpcBlock {
    RpcBlock {
        hash: hash.to_hex(),
        prev_hash: block.prev_hash.to_hex(),
        height: block.height,
        time: block.time,
        producer: block.producer.to_hex(),
        tx_count: block.vtx.len(),
        finalized: block.finality_sig.is_some(),
    }
}

fn masternode_status_str(status: MasternodeStatus) -> String {
    match status {
        MasternodeStatus::Enabled => "Enabled".to_string(),
        MasternodeStatus::PreEnabled => "PreEnabled".to_string(),
        MasternodeStatus::PoSeBanned => "PoSeBanned".to_string(),
    }
}

fn note_status_str(status: NoteStatus) -> String {
    match status {
        NoteStatus::Locked => "Locked".to_string(),
        NoteStatus::Unlocked => "Unlocked".to_string(),
    }
}

fn proposal_status_str(status: ProposalStatus) -> String {
    match status {
        ProposalStatus::Submitted => "Submitted".to_string(),
        ProposalStatus::Voting => "Voting".to_string(),
        ProposalStatus::Passed => "Passed".to_string(),
        ProposalStatus::Rejected => "Rejected".to_string(),
        ProposalStatus::Paid => "Paid".to_string(),
    }
}

#[async_trait]
impl KhuApiServer for RpcServer {
    async fn send_transaction(&self, tx_hex: String) -> RpcResult<String> {
        let tx_bytes =
            hex::decode(&tx_hex).map_err(|e| rpc_err(-32602, format!("invalid hex: {e}")))?;
        let tx: Transaction = bincode::deserialize(&tx_bytes)
            .map_err(|e| rpc_err(-32602, format!("invalid transaction encoding: {e}")))?;
        let txid = tx.txid.to_hex();

        if let Some(sender) = &self.state.tx_sender {
            sender
                .send(tx)
                .await
                .map_err(|_| rpc_err(-32603, "transaction queue full"))?;
        } else {
            warn!("RPC: sendTransaction called but no node pipeline configured");
            return Err(rpc_err(-32603, "node tx pipeline not connected").into());
        }
        Ok(txid)
    }

    async fn get_block_by_height(&self, height: u32) -> RpcResult<Option<RpcBlock>> {
        let Some(hash) = self
            .state
            .db
            .get_block_hash_at_height(height)
            .map_err(|e| rpc_err(-32603, e.to_string()))?
        else {
            return Ok(None);
        };
        let block = self
            .state
            .db
            .get_block(&hash)
            .map_err(|e| rpc_err(-32603, e.to_string()))?;
        Ok(block.map(|b| block_to_rpc(hash, &b)))
    }

    async fn get_block_by_hash(&self, hash_hex: String) -> RpcResult<Option<RpcBlock>> {
        let hash = BlockHash::from_hex(&hash_hex)
            .map_err(|e| rpc_err(-32602, format!("invalid block hash: {e}")))?;
        let block = self
            .state
            .db
            .get_block(&hash)
            .map_err(|e| rpc_err(-32603, e.to_string()))?;
        Ok(block.map(|b| block_to_rpc(hash, &b)))
    }

    async fn get_chain_stats(&self) -> RpcResult<RpcChainStats> {
        let tip_height = self
            .state
            .db
            .chain_tip_height()
            .map_err(|e| rpc_err(-32603, e.to_string()))?;
        let total_masternodes = self
            .state
            .db
            .iter_masternodes()
            .map_err(|e| rpc_err(-32603, e.to_string()))?
            .len() as u64;
        let total_proposals = self
            .state
            .db
            .iter_proposals()
            .map_err(|e| rpc_err(-32603, e.to_string()))?
            .len() as u64;
        let total_notes = self
            .state
            .db
            .iter_notes()
            .map_err(|e| rpc_err(-32603, e.to_string()))?
            .len() as u64;

        Ok(RpcChainStats {
            tip_height,
            finalized_height: self.state.finality.finalized_height(),
            total_masternodes,
            total_proposals,
            total_notes,
        })
    }

    async fn get_overlay_state(&self) -> RpcResult<RpcKhuState> {
        let khu = self
            .state
            .db
            .get_khu_state()
            .map_err(|e| rpc_err(-32603, e.to_string()))?
            .unwrap_or_else(|| khu_state::khu::KhuOverlayState::genesis(self.state.params.r_initial));

        Ok(RpcKhuState {
            colored: khu.colored,
            uncolored: khu.uncolored,
            locked: khu.locked,
            reserved: khu.reserved,
            unreserved: khu.unreserved,
            treasury: khu.treasury,
            r_annual_bps: khu.r_annual,
            r_next_bps: khu.r_next,
            domc_cycle_start: khu.domc_cycle_start,
            dao_cycle_start: khu.dao_cycle_start,
        })
    }

    async fn get_masternode(&self, pro_tx_hash_hex: String) -> RpcResult<Option<RpcMasternode>> {
        let pro_tx_hash = ProTxHash::from_hex(&pro_tx_hash_hex)
            .map_err(|e| rpc_err(-32602, format!("invalid proTxHash: {e}")))?;
        let record = self
            .state
            .db
            .get_masternode(&pro_tx_hash)
            .map_err(|e| rpc_err(-32603, e.to_string()))?;
        Ok(record.map(|m| RpcMasternode {
            pro_tx_hash: m.pro_tx_hash.to_hex(),
            collateral: m.collateral.to_string(),
            collateral_amount: m.collateral_amount,
            service_addr: m.service_addr.0,
            registered_height: m.registered_height,
            status: masternode_status_str(m.status),
            is_genesis: m.is_genesis,
        }))
    }

    async fn list_masternodes(&self) -> RpcResult<Vec<RpcMasternode>> {
        let records = self
            .state
            .db
            .iter_masternodes()
            .map_err(|e| rpc_err(-32603, e.to_string()))?;
        Ok(records
            .into_iter()
            .map(|m| RpcMasternode {
                pro_tx_hash: m.pro_tx_hash.to_hex(),
                collateral: m.collateral.to_string(),
                collateral_amount: m.collateral_amount,
                service_addr: m.service_addr.0,
                registered_height: m.registered_height,
                status: masternode_status_str(m.status),
                is_genesis: m.is_genesis,
            })
            .collect())
    }

    async fn get_note(&self, commitment_hex: String) -> RpcResult<Option<RpcNote>> {
        let commitment = Commitment::from_hex(&commitment_hex)
            .map_err(|e| rpc_err(-32602, format!("invalid commitment: {e}")))?;
        let note = self
            .state
            .db
            .get_note(&commitment)
            .map_err(|e| rpc_err(-32603, e.to_string()))?;
        Ok(note.map(|n| RpcNote {
            commitment: n.commitment.to_hex(),
            amount: n.amount,
            lock_height: n.lock_height,
            mature_height: n.mature_height,
            accrued_bonus: n.accrued_bonus,
            status: note_status_str(n.status),
        }))
    }

    async fn get_proposal(&self, proposal_id_hex: String) -> RpcResult<Option<RpcProposal>> {
        let id = BlockHash::from_hex(&proposal_id_hex)
            .map_err(|e| rpc_err(-32602, format!("invalid proposal id: {e}")))?;
        let proposal = self
            .state
            .db
            .get_proposal(&id)
            .map_err(|e| rpc_err(-32603, e.to_string()))?;
        Ok(proposal.map(|p| RpcProposal {
            id: p.id.to_hex(),
            cycle_start: p.cycle_start,
            amount: p.amount,
            fee_paid: p.fee_paid,
            submitted_height: p.submitted_height,
            yes_votes: p.yes_votes(),
            no_votes: p.no_votes(),
            abstain_votes: p.abstain_votes(),
            status: proposal_status_str(p.status),
        }))
    }

    async fn list_proposals(&self) -> RpcResult<Vec<RpcProposal>> {
        let proposals = self
            .state
            .db
            .iter_proposals()
            .map_err(|e| rpc_err(-32603, e.to_string()))?;
        Ok(proposals
            .into_iter()
            .map(|p| RpcProposal {
                id: p.id.to_hex(),
                cycle_start: p.cycle_start,
                amount: p.amount,
                fee_paid: p.fee_paid,
                submitted_height: p.submitted_height,
                yes_votes: p.yes_votes(),
                no_votes: p.no_votes(),
                abstain_votes: p.abstain_votes(),
                status: proposal_status_str(p.status),
            })
            .collect())
    }

    async fn get_domc_cycle_status(&self, height: u32) -> RpcResult<String> {
        let khu = self
            .state
            .db
            .get_khu_state()
            .map_err(|e| rpc_err(-32603, e.to_string()))?
            .unwrap_or_else(|| khu_state::khu::KhuOverlayState::genesis(self.state.params.r_initial));
        Ok(khu_governance::describe_cycle(&self.state.params, khu.domc_cycle_start, height))
    }

    async fn get_dao_cycle_status(&self, height: u32) -> RpcResult<String> {
        let khu = self
            .state
            .db
            .get_khu_state()
            .map_err(|e| rpc_err(-32603, e.to_string()))?
            .unwrap_or_else(|| khu_state::khu::KhuOverlayState::genesis(self.state.params.r_initial));
        Ok(khu_treasury::describe_cycle(&self.state.params, khu.dao_cycle_start, height))
    }

    async fn get_version(&self) -> RpcResult<RpcVersionInfo> {
        Ok(RpcVersionInfo {
            node_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: "1".to_string(),
        })
    }

    async fn get_genesis_info(&self) -> RpcResult<RpcGenesisInfo> {
        let p = &self.state.params;
        Ok(RpcGenesisInfo {
            network: format!("{:?}", p.tier),
            maturity_blocks: p.maturity_blocks,
            domc_cycle_blocks: p.domc_cycle_blocks,
            dao_cycle_blocks: p.dao_cycle_blocks,
            r_initial_bps: p.r_initial,
            r_floor_bps: p.r_floor,
            quorum_size: p.quorum_size,
            quorum_threshold: p.quorum_threshold,
            khu_activation_height: p.khu_activation_height,
        })
    }
}
