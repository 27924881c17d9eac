use khu_core::types::{Amount, BlockHash, Height, OutPoint, ProTxHash, PublicKeyBytes, Script, ServiceAddr};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum MasternodeStatus {
    Enabled,
    PreEnabled,
    PoSeBanned,
}

/// A registered masternode: the collateral outpoint backing it, its operator
/// signing key, payout destination, and advertised service address. Genesis
/// records (`is_genesis`) bypass the usual confirmation-depth requirement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MasternodeRecord {
    pub pro_tx_hash: ProTxHash,
    pub collateral: OutPoint,
    pub collateral_amount: Amount,
    pub operator_pubkey: PublicKeyBytes,
    pub payout_script: Script,
    pub service_addr: ServiceAddr,
    pub registered_height: Height,
    pub status: MasternodeStatus,
    pub is_genesis: bool,
    pub pose_ban_height: Option<Height>,
    /// Hash of the block at which this record crossed the confirmation-depth
    /// requirement and was promoted out of `PreEnabled`. Genesis records
    /// bypass confirmation entirely and never set this.
    pub confirmed_hash: Option<BlockHash>,
}

impl MasternodeRecord {
    pub fn is_active(&self) -> bool {
        matches!(self.status, MasternodeStatus::Enabled)
    }

    /// Whether the registering transaction has aged past `confirmation_depth`
    /// blocks, the point at which a `PreEnabled` record becomes promotable.
    pub fn collateral_matured(&self, current_height: Height, confirmation_depth: Height) -> bool {
        self.is_genesis || current_height >= self.registered_height + confirmation_depth
    }
}
