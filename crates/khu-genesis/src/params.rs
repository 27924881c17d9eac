use khu_core::types::{Amount, OutPoint, PublicKeyBytes, Script, ServiceAddr};
use serde::{Deserialize, Serialize};

/// One bootstrap masternode seeded directly at genesis, bypassing the usual
/// collateral-confirmation-depth requirement (`is_genesis = true`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisMasternode {
    pub collateral: OutPoint,
    pub collateral_amount: Amount,
    pub operator_pubkey: PublicKeyBytes,
    pub payout_script: Script,
    pub service_addr: ServiceAddr,
}

/// Parameters for building a fresh genesis state. In production these are
/// supplied via a key ceremony; in tests, generated ad hoc.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisParams {
    pub masternodes: Vec<GenesisMasternode>,
}
