use std::collections::HashMap;

use khu_core::types::{BlockHash, Commitment, Height, Nullifier, OutPoint, ProTxHash, TxOut};
use khu_governance::DomcLedger;
use serde::{Deserialize, Serialize};

use crate::khu::KhuOverlayState;
use crate::masternode::MasternodeRecord;
use crate::note::NoteRecord;
use crate::proposal::ProposalRecord;

/// Everything [`crate::engine::StateEngine::disconnect_block`] needs to
/// exactly reverse one block's transition: the overlay snapshot taken
/// before steps 1-5 ran, and the prior value of every record steps 6-7
/// touched (`None` meaning the record did not exist before this block).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockUndo {
    pub prev_khu: KhuOverlayState,
    pub spent: Vec<(OutPoint, TxOut)>,
    pub created: Vec<OutPoint>,
    pub notes_before: HashMap<Commitment, Option<NoteRecord>>,
    pub masternodes_before: HashMap<ProTxHash, Option<MasternodeRecord>>,
    pub proposals_before: HashMap<BlockHash, Option<ProposalRecord>>,
    pub nullifiers: Vec<Nullifier>,
    pub domc_cycle_start: Height,
    pub domc_ledger_before: Option<DomcLedger>,
}
