use serde::{Deserialize, Serialize};

use crate::types::{
    Amount, BlockHash, Commitment, Height, Nullifier, OutPoint, ProTxHash, PublicKeyBytes, Script,
    SignatureBytes, ServiceAddr, Timestamp, TxId, VoteChoice,
};

/// A transaction input: the outpoint being spent plus the unlocking script
/// (signature + pubkey, or the HTLC preimage/timelock branch data).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Script,
    /// nSequence-style relative-locktime hint; 0xffffffff disables it.
    pub sequence: u32,
}

/// A transaction output: amount plus the locking script that gates spending.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxOut {
    pub value: Amount,
    pub script_pubkey: Script,
}

/// A colored UTXO carries the same `(value, script)` shape as [`TxOut`] but is
/// tagged by the KHU overlay as circulating (`color = Circulating`) or frozen
/// inside a staking note (`color = Locked`). A negative `value` on a locked
/// output marks it already unlocked/spent at the overlay level without
/// removing the entry from the note index (a tombstone, not a UTXO).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum NoteColor {
    Circulating,
    Locked,
}

/// Per-transaction payload specific to the operation it performs. A plain
/// value transfer carries `Normal`; every KHU-overlay or governance action is
/// a distinct variant with its own typed fields, validated independently of
/// the base UTXO move it rides alongside.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Ordinary value transfer; no KHU overlay mutation.
    Normal,

    /// Convert circulating coin into colored (`C`) supply 1:1, minting the
    /// corresponding uncolored counter `U`.
    KhuMint { amount: Amount },

    /// Convert colored supply back to plain circulating coin 1:1.
    KhuRedeem { amount: Amount },

    /// Lock `amount` into a staking note; moves `U -> Z`. `commitment` is the
    /// shielded note commitment, `note_memo` the 512-byte encoded payload
    /// described in the note-memo format.
    KhuLock {
        amount: Amount,
        commitment: Commitment,
        note_memo: Vec<u8>,
    },

    /// Reveal `nullifier` to spend a matured note; moves `Z -> U` plus any
    /// accrued yield bonus in the same atomic double-flux.
    KhuUnlock {
        nullifier: Nullifier,
        commitment: Commitment,
        bonus: Amount,
    },

    /// DOMC commitment to a proposed next-cycle annual rate.
    DomcCommit {
        proposer: ProTxHash,
        commitment: Commitment,
    },

    /// DOMC reveal of a previously committed rate and salt.
    DomcReveal {
        proposer: ProTxHash,
        rate_bps: u32,
        salt: [u8; 32],
    },

    /// Submit a DAO treasury spending proposal.
    DaoPropose {
        proposal_id: BlockHash,
        payout_script: Script,
        amount: Amount,
        fee: Amount,
    },

    /// Masternode-signed vote on a DAO proposal.
    DaoVote {
        proposal_id: BlockHash,
        voter: ProTxHash,
        choice: VoteChoice,
        signature: SignatureBytes,
    },

    /// Register or update a masternode's collateral/operator/payout binding.
    MasternodeRegister {
        pro_tx_hash: ProTxHash,
        collateral: OutPoint,
        operator_pubkey: PublicKeyBytes,
        payout_script: Script,
        service_addr: ServiceAddr,
    },
}

/// A fully-formed transaction. `txid` is BLAKE3 of the canonical bincode
/// serialization of every field except `txid` itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: TxId,
    pub vin: Vec<TxIn>,
    pub vout: Vec<TxOut>,
    pub lock_time: u32,
    pub kind: TransactionKind,
}

#[derive(Serialize)]
pub struct TransactionBody<'a> {
    pub vin: &'a Vec<TxIn>,
    pub vout: &'a Vec<TxOut>,
    pub lock_time: u32,
    pub kind: &'a TransactionKind,
}

impl Transaction {
    pub fn body(&self) -> TransactionBody<'_> {
        TransactionBody {
            vin: &self.vin,
            vout: &self.vout,
            lock_time: self.lock_time,
            kind: &self.kind,
        }
    }

    /// Canonical bytes hashed to produce `txid` and covered by input signatures.
    pub fn body_bytes(&self) -> Vec<u8> {
        bincode::serialize(&self.body()).expect("transaction body serialization is infallible")
    }
}

/// A block header plus its transaction list. `producer_signature` is the
/// elected masternode's ECDSA signature over the header; `finality_sig`
/// carries the quorum threshold signature once the block has been finalized
/// (absent on freshly-produced blocks).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub prev_hash: BlockHash,
    pub merkle_root: BlockHash,
    pub height: Height,
    pub time: Timestamp,
    pub producer: ProTxHash,
    pub producer_signature: SignatureBytes,
    pub vtx: Vec<Transaction>,
    pub final_sapling_root: BlockHash,
    pub finality_sig: Option<SignatureBytes>,
}

#[derive(Serialize)]
pub struct BlockHeaderBody<'a> {
    pub prev_hash: &'a BlockHash,
    pub merkle_root: &'a BlockHash,
    pub height: Height,
    pub time: Timestamp,
    pub producer: &'a ProTxHash,
    pub final_sapling_root: &'a BlockHash,
}

impl Block {
    pub fn header_body(&self) -> BlockHeaderBody<'_> {
        BlockHeaderBody {
            prev_hash: &self.prev_hash,
            merkle_root: &self.merkle_root,
            height: self.height,
            time: self.time,
            producer: &self.producer,
            final_sapling_root: &self.final_sapling_root,
        }
    }

    /// Canonical bytes the producer signs and the quorum signs over for finality.
    pub fn header_bytes(&self) -> Vec<u8> {
        bincode::serialize(&self.header_body()).expect("block header serialization is infallible")
    }
}
