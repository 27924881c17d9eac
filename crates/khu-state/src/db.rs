use khu_core::error::KhuError;
use khu_core::transaction::Block;
use khu_core::types::{BlockHash, Commitment, Height, Nullifier, OutPoint, ProTxHash, PublicKeyBytes, TxOut};
use khu_governance::DomcLedger;
use std::path::Path;

use crate::khu::KhuOverlayState;
use crate::masternode::{MasternodeRecord, MasternodeStatus};
use crate::note::NoteRecord;
use crate::proposal::ProposalRecord;
use crate::undo::BlockUndo;

/// Persistent chain/overlay database backed by sled.
///
/// Named trees:
///   utxos        — OutPoint (36 bytes) → bincode(TxOut)        (unspent only)
///   blocks       — BlockHash bytes     → bincode(Block)
///   height_index — height be bytes     → BlockHash bytes
///   notes        — Commitment bytes    → bincode(NoteRecord)
///   nullifiers   — Nullifier bytes     → []                    (membership set)
///   masternodes  — ProTxHash bytes     → bincode(MasternodeRecord)
///   proposals    — BlockHash bytes     → bincode(ProposalRecord)
///   khu_state    — singleton "current" → bincode(KhuOverlayState)
///   domc_ledgers — height be bytes     → bincode(DomcLedger), keyed by cycle start
///   undo         — height be bytes     → bincode(BlockUndo)
///   meta         — utf8 key bytes      → raw bytes
pub struct StateDb {
    db: sled::Db,
    utxos: sled::Tree,
    blocks: sled::Tree,
    height_index: sled::Tree,
    notes: sled::Tree,
    nullifiers: sled::Tree,
    masternodes: sled::Tree,
    proposals: sled::Tree,
    khu_state: sled::Tree,
    domc_ledgers: sled::Tree,
    undo: sled::Tree,
    meta: sled::Tree,
}

fn storage_err(e: impl std::fmt::Display) -> KhuError {
    KhuError::Storage(e.to_string())
}

fn ser_err(e: impl std::fmt::Display) -> KhuError {
    KhuError::Serialization(e.to_string())
}

impl StateDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KhuError> {
        let db = sled::open(path).map_err(storage_err)?;
        Ok(Self {
            utxos: db.open_tree("utxos").map_err(storage_err)?,
            blocks: db.open_tree("blocks").map_err(storage_err)?,
            height_index: db.open_tree("height_index").map_err(storage_err)?,
            notes: db.open_tree("notes").map_err(storage_err)?,
            nullifiers: db.open_tree("nullifiers").map_err(storage_err)?,
            masternodes: db.open_tree("masternodes").map_err(storage_err)?,
            proposals: db.open_tree("proposals").map_err(storage_err)?,
            khu_state: db.open_tree("khu_state").map_err(storage_err)?,
            domc_ledgers: db.open_tree("domc_ledgers").map_err(storage_err)?,
            undo: db.open_tree("undo").map_err(storage_err)?,
            meta: db.open_tree("meta").map_err(storage_err)?,
            db,
        })
    }

    // ── UTXOs ────────────────────────────────────────────────────────────────

    pub fn get_utxo(&self, outpoint: &OutPoint) -> Result<Option<TxOut>, KhuError> {
        match self.utxos.get(outpoint.to_bytes()).map_err(storage_err)? {
            Some(b) => Ok(Some(bincode::deserialize(&b).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_utxo(&self, outpoint: &OutPoint, out: &TxOut) -> Result<(), KhuError> {
        let bytes = bincode::serialize(out).map_err(ser_err)?;
        self.utxos.insert(outpoint.to_bytes(), bytes).map_err(storage_err)?;
        Ok(())
    }

    pub fn remove_utxo(&self, outpoint: &OutPoint) -> Result<(), KhuError> {
        self.utxos.remove(outpoint.to_bytes()).map_err(storage_err)?;
        Ok(())
    }

    pub fn utxo_exists(&self, outpoint: &OutPoint) -> bool {
        self.utxos.contains_key(outpoint.to_bytes()).unwrap_or(false)
    }

    // ── Blocks ───────────────────────────────────────────────────────────────

    pub fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>, KhuError> {
        match self.blocks.get(hash.as_bytes()).map_err(storage_err)? {
            Some(b) => Ok(Some(bincode::deserialize(&b).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_block(&self, hash: &BlockHash, block: &Block) -> Result<(), KhuError> {
        let bytes = bincode::serialize(block).map_err(ser_err)?;
        self.blocks.insert(hash.as_bytes(), bytes).map_err(storage_err)?;
        self.height_index
            .insert(block.height.to_be_bytes(), hash.as_bytes())
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn get_block_hash_at_height(&self, height: u32) -> Result<Option<BlockHash>, KhuError> {
        match self.height_index.get(height.to_be_bytes()).map_err(storage_err)? {
            Some(b) => {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(&b);
                Ok(Some(BlockHash::from_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    /// Remove a block and its height-index entry, the reverse of [`Self::put_block`].
    pub fn remove_block(&self, height: Height, hash: &BlockHash) -> Result<(), KhuError> {
        self.blocks.remove(hash.as_bytes()).map_err(storage_err)?;
        self.height_index.remove(height.to_be_bytes()).map_err(storage_err)?;
        Ok(())
    }

    pub fn chain_tip_height(&self) -> Result<u32, KhuError> {
        match self.height_index.last().map_err(storage_err)? {
            Some((key, _)) => {
                let mut arr = [0u8; 4];
                arr.copy_from_slice(&key);
                Ok(u32::from_be_bytes(arr))
            }
            None => Ok(0),
        }
    }

    // ── Staking notes ────────────────────────────────────────────────────────

    pub fn get_note(&self, commitment: &Commitment) -> Result<Option<NoteRecord>, KhuError> {
        match self.notes.get(commitment.as_bytes()).map_err(storage_err)? {
            Some(b) => Ok(Some(bincode::deserialize(&b).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_note(&self, commitment: &Commitment, note: &NoteRecord) -> Result<(), KhuError> {
        let bytes = bincode::serialize(note).map_err(ser_err)?;
        self.notes.insert(commitment.as_bytes(), bytes).map_err(storage_err)?;
        Ok(())
    }

    pub fn iter_notes(&self) -> Result<Vec<(Commitment, NoteRecord)>, KhuError> {
        let mut out = Vec::new();
        for item in self.notes.iter() {
            let (k, v) = item.map_err(storage_err)?;
            let mut arr = [0u8; 32];
            arr.copy_from_slice(&k);
            out.push((Commitment::from_bytes(arr), bincode::deserialize(&v).map_err(ser_err)?));
        }
        Ok(out)
    }

    pub fn remove_note(&self, commitment: &Commitment) -> Result<(), KhuError> {
        self.notes.remove(commitment.as_bytes()).map_err(storage_err)?;
        Ok(())
    }

    // ── Nullifiers ───────────────────────────────────────────────────────────

    pub fn nullifier_seen(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains_key(nullifier.as_bytes()).unwrap_or(false)
    }

    pub fn mark_nullifier(&self, nullifier: &Nullifier) -> Result<(), KhuError> {
        self.nullifiers.insert(nullifier.as_bytes(), b"".as_ref()).map_err(storage_err)?;
        Ok(())
    }

    pub fn remove_nullifier(&self, nullifier: &Nullifier) -> Result<(), KhuError> {
        self.nullifiers.remove(nullifier.as_bytes()).map_err(storage_err)?;
        Ok(())
    }

    // ── Masternode registry ──────────────────────────────────────────────────

    pub fn get_masternode(&self, pro_tx_hash: &ProTxHash) -> Result<Option<MasternodeRecord>, KhuError> {
        match self.masternodes.get(pro_tx_hash.as_bytes()).map_err(storage_err)? {
            Some(b) => Ok(Some(bincode::deserialize(&b).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_masternode(&self, record: &MasternodeRecord) -> Result<(), KhuError> {
        let bytes = bincode::serialize(record).map_err(ser_err)?;
        self.masternodes
            .insert(record.pro_tx_hash.as_bytes(), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn remove_masternode(&self, pro_tx_hash: &ProTxHash) -> Result<(), KhuError> {
        self.masternodes.remove(pro_tx_hash.as_bytes()).map_err(storage_err)?;
        Ok(())
    }

    pub fn iter_masternodes(&self) -> Result<Vec<MasternodeRecord>, KhuError> {
        let mut out = Vec::new();
        for item in self.masternodes.iter() {
            let (_, v) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&v).map_err(ser_err)?);
        }
        Ok(out)
    }

    /// Every masternode at `status == Enabled` — the registry view producer
    /// selection and quorum formation actually consult.
    pub fn get_valid(&self) -> Result<Vec<MasternodeRecord>, KhuError> {
        Ok(self.iter_masternodes()?.into_iter().filter(|m| m.status == MasternodeStatus::Enabled).collect())
    }

    /// Every masternode that has crossed `confirmed_hash.is_some()` — i.e.
    /// was promoted out of `PreEnabled` at least once (includes PoSe-banned
    /// records, which were confirmed before being banned).
    pub fn size_confirmed(&self) -> Result<u32, KhuError> {
        Ok(self.iter_masternodes()?.iter().filter(|m| m.is_genesis || m.confirmed_hash.is_some()).count() as u32)
    }

    pub fn size_valid(&self) -> Result<u32, KhuError> {
        Ok(self.get_valid()?.len() as u32)
    }

    pub fn get_by_operator_key(&self, operator_pubkey: &PublicKeyBytes) -> Result<Option<MasternodeRecord>, KhuError> {
        Ok(self.iter_masternodes()?.into_iter().find(|m| &m.operator_pubkey == operator_pubkey))
    }

    /// Masternode records as they stood at `height`: registrations not yet
    /// made at that height are excluded. Used for historical RPC queries;
    /// current block processing always reads the live registry instead.
    pub fn list_at(&self, height: Height) -> Result<Vec<MasternodeRecord>, KhuError> {
        Ok(self.iter_masternodes()?.into_iter().filter(|m| m.registered_height <= height).collect())
    }

    // ── DAO proposals ────────────────────────────────────────────────────────

    pub fn get_proposal(&self, id: &BlockHash) -> Result<Option<ProposalRecord>, KhuError> {
        match self.proposals.get(id.as_bytes()).map_err(storage_err)? {
            Some(b) => Ok(Some(bincode::deserialize(&b).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_proposal(&self, record: &ProposalRecord) -> Result<(), KhuError> {
        let bytes = bincode::serialize(record).map_err(ser_err)?;
        self.proposals.insert(record.id.as_bytes(), bytes).map_err(storage_err)?;
        Ok(())
    }

    pub fn remove_proposal(&self, id: &BlockHash) -> Result<(), KhuError> {
        self.proposals.remove(id.as_bytes()).map_err(storage_err)?;
        Ok(())
    }

    pub fn iter_proposals(&self) -> Result<Vec<ProposalRecord>, KhuError> {
        let mut out = Vec::new();
        for item in self.proposals.iter() {
            let (_, v) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&v).map_err(ser_err)?);
        }
        Ok(out)
    }

    // ── KHU overlay singleton ────────────────────────────────────────────────

    pub fn get_khu_state(&self) -> Result<Option<KhuOverlayState>, KhuError> {
        match self.khu_state.get("current").map_err(storage_err)? {
            Some(b) => Ok(Some(bincode::deserialize(&b).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_khu_state(&self, state: &KhuOverlayState) -> Result<(), KhuError> {
        let bytes = bincode::serialize(state).map_err(ser_err)?;
        self.khu_state.insert("current", bytes).map_err(storage_err)?;
        Ok(())
    }

    // ── DOMC commit/reveal ledger ────────────────────────────────────────────

    /// Keyed by the cycle's starting height, so each DOMC cycle gets its own
    /// ledger and a stale one can never leak into the next cycle's tally.
    pub fn get_domc_ledger(&self, cycle_start: Height) -> Result<DomcLedger, KhuError> {
        match self.domc_ledgers.get(cycle_start.to_be_bytes()).map_err(storage_err)? {
            Some(b) => Ok(bincode::deserialize(&b).map_err(ser_err)?),
            None => Ok(DomcLedger::new()),
        }
    }

    pub fn put_domc_ledger(&self, cycle_start: Height, ledger: &DomcLedger) -> Result<(), KhuError> {
        let bytes = bincode::serialize(ledger).map_err(ser_err)?;
        self.domc_ledgers.insert(cycle_start.to_be_bytes(), bytes).map_err(storage_err)?;
        Ok(())
    }

    // ── Block undo log ───────────────────────────────────────────────────────

    pub fn get_block_undo(&self, height: Height) -> Result<Option<BlockUndo>, KhuError> {
        match self.undo.get(height.to_be_bytes()).map_err(storage_err)? {
            Some(b) => Ok(Some(bincode::deserialize(&b).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_block_undo(&self, height: Height, undo: &BlockUndo) -> Result<(), KhuError> {
        let bytes = bincode::serialize(undo).map_err(ser_err)?;
        self.undo.insert(height.to_be_bytes(), bytes).map_err(storage_err)?;
        Ok(())
    }

    pub fn remove_block_undo(&self, height: Height) -> Result<(), KhuError> {
        self.undo.remove(height.to_be_bytes()).map_err(storage_err)?;
        Ok(())
    }

    // ── Meta ─────────────────────────────────────────────────────────────────

    pub fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), KhuError> {
        self.meta.insert(key.as_bytes(), value).map_err(storage_err)?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, KhuError> {
        self.meta
            .get(key.as_bytes())
            .map(|v| v.map(|iv| iv.to_vec()))
            .map_err(storage_err)
    }

    pub fn flush(&self) -> Result<(), KhuError> {
        self.db.flush().map_err(storage_err)?;
        Ok(())
    }
}
