use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use khu_core::constants::{ConsensusParams, NOTE_MEMO_LEN, NOTE_MEMO_MAGIC, NOTE_MEMO_VERSION};
use khu_core::error::KhuError;
use khu_core::transaction::{Block, Transaction, TransactionKind};
use khu_core::types::{BlockHash, Commitment, Height, Nullifier, OutPoint, ProTxHash, TxOut};
use khu_governance::DomcLedger;
use tracing::{debug, info};

use crate::db::StateDb;
use crate::khu::KhuOverlayState;
use crate::masternode::{MasternodeRecord, MasternodeStatus};
use crate::note::{NoteRecord, NoteStatus};
use crate::proposal::{ProposalRecord, ProposalStatus};
use crate::undo::BlockUndo;

/// All state changes staged while walking a block's transaction list,
/// committed atomically once every transaction has validated successfully.
#[derive(Default)]
struct StagedMutations {
    spent: Vec<OutPoint>,
    created: Vec<(OutPoint, TxOut)>,
    notes: Vec<(Commitment, NoteRecord)>,
    masternodes: Vec<MasternodeRecord>,
    proposals: Vec<ProposalRecord>,
    nullifiers: Vec<Nullifier>,
}

/// The KHU state transition engine. Applies one block at a time, in the
/// canonical ten-step order: decay, governance-cycle boundary, DOMC reveal
/// instant, treasury accumulation, daily yield, masternode confirmation,
/// transactions, DAO payouts, invariant check, persist.
pub struct StateEngine {
    pub db: Arc<StateDb>,
    pub params: ConsensusParams,
}

impl StateEngine {
    pub fn new(db: Arc<StateDb>, params: ConsensusParams) -> Self {
        Self { db, params }
    }

    pub fn apply_block(&self, block: &Block) -> Result<(), KhuError> {
        let prev_khu = self
            .db
            .get_khu_state()?
            .unwrap_or_else(|| KhuOverlayState::genesis(self.params.r_initial));
        let mut khu = prev_khu.clone();
        let height = block.height;
        let block_hash = khu_crypto::hash::block_hash_from_header(&block.header_bytes());

        self.step_decay(&mut khu, height);
        self.step_domc_boundary(&mut khu, height)?;

        let domc_cycle_start = khu.domc_cycle_start;
        let mut domc_ledger = self.db.get_domc_ledger(domc_cycle_start)?;
        let domc_ledger_before = domc_ledger.clone();

        self.step_domc_reveal_instant(&mut khu, height, &domc_ledger);
        self.step_treasury_accumulation(&mut khu, height);

        let mut staged = StagedMutations::default();
        self.step_daily_yield(&mut khu, &mut staged, height)?;
        self.step_masternode_confirmations(&mut staged, height, block_hash)?;

        for tx in &block.vtx {
            self.apply_transaction(tx, height, &mut khu, &mut staged, &mut domc_ledger)?;
        }

        self.step_dao_payouts(&mut khu, &mut staged, height)?;

        khu.check_invariants()?;
        debug!(height, colored = khu.colored, uncolored = khu.uncolored, locked = khu.locked,
               treasury = khu.treasury, r_annual = khu.r_annual, "khu invariants hold");

        self.commit(block, &khu, staged, prev_khu, domc_cycle_start, domc_ledger, domc_ledger_before)
    }

    // ── Step 1: decay ────────────────────────────────────────────────────────

    fn step_decay(&self, khu: &mut KhuOverlayState, height: Height) {
        if height < self.params.khu_activation_height {
            return;
        }
        let elapsed = height - self.params.khu_activation_height;
        if elapsed > 0 && elapsed % self.params.blocks_per_year == 0 && khu.last_decay_height != height {
            let years_elapsed = elapsed / self.params.blocks_per_year;
            debug!(height, years_elapsed, prev_ceiling = khu.r_max_dynamic, "step 1: annual rate ceiling decay");
            khu.decay_rate(self.params.r_initial, self.params.r_floor, self.params.r_decay_per_year, years_elapsed);
            khu.last_decay_height = height;
        }
    }

    // ── Step 2: governance cycle boundary ────────────────────────────────────

    fn step_domc_boundary(&self, khu: &mut KhuOverlayState, height: Height) -> Result<(), KhuError> {
        if height == self.params.domc_cycle_end(khu.domc_cycle_start) {
            debug!(height, new_rate = khu.r_next, "step 2: domc cycle boundary, rate rolls over");
            khu.r_annual = khu.r_next.min(khu.r_max_dynamic);
            khu.domc_cycle_start = height;
        }
        Ok(())
    }

    // ── Step 3: DOMC reveal instant ───────────────────────────────────────────

    fn step_domc_reveal_instant(&self, khu: &mut KhuOverlayState, height: Height, ledger: &DomcLedger) {
        if height == self.params.domc_reveal_instant(khu.domc_cycle_start) {
            let next_rate = ledger.finalize(khu.r_annual);
            debug!(height, next_rate, reveals = ledger.reveal_count(), "step 3: domc reveal instant reached");
            khu.r_next = next_rate;
        }
    }

    // ── Step 4: treasury accumulation ─────────────────────────────────────────

    fn step_treasury_accumulation(&self, khu: &mut KhuOverlayState, height: Height) {
        if height > khu.last_treasury_height && height % self.params.blocks_per_day == 0 {
            let delta = khu.accrue_treasury();
            debug!(height, delta, treasury = khu.treasury, "step 4: treasury accumulation");
            khu.last_treasury_height = height;
        }
    }

    // ── Step 5: daily yield ────────────────────────────────────────────────────

    fn step_daily_yield(
        &self,
        khu: &mut KhuOverlayState,
        staged: &mut StagedMutations,
        height: Height,
    ) -> Result<(), KhuError> {
        if height <= khu.last_yield_height || height % self.params.blocks_per_day != 0 {
            return Ok(());
        }
        let notes = self.db.iter_notes()?;
        let mut matured_locked: i64 = 0;
        let mut matured: Vec<(Commitment, NoteRecord)> = Vec::new();
        for (commitment, note) in notes {
            if note.status == NoteStatus::Locked && note.is_mature(height) {
                matured_locked += note.amount;
                matured.push((commitment, note));
            }
        }
        if matured_locked == 0 {
            khu.last_yield_height = height;
            return Ok(());
        }
        let total_bonus = khu.accrue_daily_yield(matured_locked);
        debug!(height, total_bonus, note_count = matured.len(), "step 5: daily yield accrual");
        for (commitment, mut note) in matured {
            let share = (note.amount as i128 * total_bonus as i128 / matured_locked as i128) as i64;
            note.accrued_bonus += share;
            staged.notes.push((commitment, note));
        }
        khu.last_yield_height = height;
        Ok(())
    }

    // ── Step 5b: masternode confirmation ─────────────────────────────────────

    /// Promote every `PreEnabled` masternode whose collateral has aged past
    /// `mn_confirmation_depth` blocks into `Enabled`, stamping the block that
    /// confirmed it. Without this step a freshly-registered masternode would
    /// sit in `PreEnabled` forever, invisible to producer selection and
    /// quorum formation.
    fn step_masternode_confirmations(
        &self,
        staged: &mut StagedMutations,
        height: Height,
        block_hash: BlockHash,
    ) -> Result<(), KhuError> {
        for node in self.db.iter_masternodes()? {
            if node.status == MasternodeStatus::PreEnabled
                && node.collateral_matured(height, self.params.mn_confirmation_depth)
            {
                let mut confirmed = node;
                confirmed.status = MasternodeStatus::Enabled;
                confirmed.confirmed_hash = Some(block_hash);
                debug!(pro_tx_hash = %confirmed.pro_tx_hash, height, "masternode confirmed and enabled");
                staged.masternodes.push(confirmed);
            }
        }
        Ok(())
    }

    // ── Step 6: transactions ───────────────────────────────────────────────────

    fn apply_transaction(
        &self,
        tx: &Transaction,
        height: Height,
        khu: &mut KhuOverlayState,
        staged: &mut StagedMutations,
        domc_ledger: &mut DomcLedger,
    ) -> Result<(), KhuError> {
        for input in &tx.vin {
            if !self.db.utxo_exists(&input.prevout) && !staged.created.iter().any(|(op, _)| op == &input.prevout) {
                return Err(KhuError::UnknownOutpoint(input.prevout.to_string()));
            }
            staged.spent.push(input.prevout);
        }
        for (i, out) in tx.vout.iter().enumerate() {
            staged.created.push((OutPoint::new(tx.txid, i as u32), out.clone()));
        }

        match &tx.kind {
            TransactionKind::Normal => {}
            TransactionKind::KhuMint { amount } => {
                khu.mint(*amount);
            }
            TransactionKind::KhuRedeem { amount } => {
                if khu.uncolored < *amount {
                    return Err(KhuError::InsufficientBalance { need: *amount, have: khu.uncolored });
                }
                khu.redeem(*amount);
            }
            TransactionKind::KhuLock { amount, commitment, note_memo } => {
                if *amount < khu_core::constants::MIN_LOCK_AMOUNT {
                    return Err(KhuError::LockAmountTooSmall { min: khu_core::constants::MIN_LOCK_AMOUNT });
                }
                validate_note_memo(note_memo)?;
                khu.lock(*amount);
                let note = NoteRecord::new(*commitment, *amount, height, self.params.maturity_blocks);
                staged.notes.push((*commitment, note));
            }
            TransactionKind::KhuUnlock { nullifier, commitment, bonus } => {
                if self.db.nullifier_seen(nullifier) {
                    return Err(KhuError::DuplicateNullifier(nullifier.to_hex()));
                }
                let mut note = self
                    .db
                    .get_note(commitment)?
                    .ok_or_else(|| KhuError::UnknownOutpoint(commitment.to_hex()))?;
                if note.status == NoteStatus::Unlocked {
                    return Err(KhuError::NoteAlreadyUnlocked);
                }
                if !note.is_mature(height) {
                    return Err(KhuError::NoteNotMature { unlock_height: note.mature_height });
                }
                if *bonus != note.accrued_bonus {
                    return Err(KhuError::Validation {
                        reason: format!("claimed bonus {bonus} does not match accrued {}", note.accrued_bonus),
                        banscore: 20,
                    });
                }
                khu.unlock(note.amount, *bonus);
                note.status = NoteStatus::Unlocked;
                note.nullifier = Some(*nullifier);
                staged.notes.push((*commitment, note));
                staged.nullifiers.push(*nullifier);
            }
            TransactionKind::DomcCommit { proposer, commitment } => {
                let commit_start = self.params.domc_commit_phase_start(khu.domc_cycle_start);
                let commit_end = self.params.domc_reveal_deadline(khu.domc_cycle_start);
                if height < commit_start || height >= commit_end {
                    return Err(KhuError::NotCommitPhase);
                }
                domc_ledger.record_commit(*proposer, *commitment)?;
            }
            TransactionKind::DomcReveal { proposer, rate_bps, salt } => {
                let reveal_start = self.params.domc_reveal_deadline(khu.domc_cycle_start);
                let reveal_end = self.params.domc_reveal_instant(khu.domc_cycle_start);
                if height < reveal_start || height >= reveal_end {
                    return Err(KhuError::NotRevealPhase);
                }
                domc_ledger.record_reveal(*proposer, *rate_bps, *salt)?;
            }
            TransactionKind::DaoPropose { proposal_id, payout_script, amount, fee } => {
                if *amount < self.params.dao_min_proposal_amount || *amount > self.params.dao_max_proposal_amount {
                    return Err(KhuError::ProposalAmountOutOfBounds {
                        amount: *amount,
                        min: self.params.dao_min_proposal_amount,
                        max: self.params.dao_max_proposal_amount,
                    });
                }
                if *fee != self.params.dao_proposal_fee {
                    return Err(KhuError::Validation {
                        reason: format!("proposal fee {fee} does not match required {}", self.params.dao_proposal_fee),
                        banscore: 10,
                    });
                }
                khu.treasury -= fee;
                staged.proposals.push(ProposalRecord {
                    id: *proposal_id,
                    cycle_start: khu.dao_cycle_start,
                    payout_script: payout_script.clone(),
                    amount: *amount,
                    fee_paid: *fee,
                    submitted_height: height,
                    votes: Default::default(),
                    status: ProposalStatus::Submitted,
                });
            }
            TransactionKind::DaoVote { proposal_id, voter, choice, signature } => {
                let voter_record = self
                    .db
                    .get_masternode(voter)?
                    .ok_or_else(|| KhuError::UnknownMasternode(voter.to_string()))?;
                let mut vote_msg = Vec::with_capacity(33);
                vote_msg.extend_from_slice(proposal_id.as_bytes());
                vote_msg.push(choice.as_byte());
                let digest = khu_crypto::hash::sha256_hash(&vote_msg);
                khu_crypto::ecdsa::verify(&voter_record.operator_pubkey, &digest, signature)
                    .map_err(|_| KhuError::InvalidSignature)?;

                let mut proposal = self
                    .db
                    .get_proposal(proposal_id)?
                    .ok_or_else(|| KhuError::UnknownProposal(proposal_id.to_hex()))?;
                let voting_start = self.params.dao_voting_start(proposal.cycle_start);
                let voting_end = self.params.dao_voting_end(proposal.cycle_start);
                if height < voting_start || height > voting_end {
                    return Err(KhuError::VotingWindowClosed);
                }
                proposal.votes.insert(*voter, *choice);
                proposal.status = ProposalStatus::Voting;
                staged.proposals.push(proposal);
            }
            TransactionKind::MasternodeRegister { pro_tx_hash, collateral, operator_pubkey, payout_script, service_addr } => {
                staged.masternodes.push(MasternodeRecord {
                    pro_tx_hash: *pro_tx_hash,
                    collateral: *collateral,
                    collateral_amount: 0,
                    operator_pubkey: operator_pubkey.clone(),
                    payout_script: payout_script.clone(),
                    service_addr: service_addr.clone(),
                    registered_height: height,
                    status: MasternodeStatus::PreEnabled,
                    is_genesis: false,
                    pose_ban_height: None,
                    confirmed_hash: None,
                });
            }
        }
        Ok(())
    }

    // ── Step 7: DAO payouts ────────────────────────────────────────────────────

    fn step_dao_payouts(
        &self,
        khu: &mut KhuOverlayState,
        staged: &mut StagedMutations,
        height: Height,
    ) -> Result<(), KhuError> {
        if height != self.params.dao_payout_height(khu.dao_cycle_start) {
            return Ok(());
        }
        let total_masternodes = self.db.size_valid()?;
        let majority = total_masternodes / 2 + 1;
        let mut proposals = self.db.iter_proposals()?;
        for (_, updated) in staged
            .proposals
            .iter()
            .map(|p| (p.id, p.clone()))
            .collect::<BTreeMap<_, _>>()
        {
            if let Some(slot) = proposals.iter_mut().find(|p| p.id == updated.id) {
                *slot = updated;
            } else {
                proposals.push(updated);
            }
        }
        for proposal in proposals.iter_mut().filter(|p| p.cycle_start == khu.dao_cycle_start) {
            let passed = proposal.yes_votes() >= majority && khu.treasury >= proposal.amount;
            if passed {
                khu.treasury -= proposal.amount;
                proposal.status = ProposalStatus::Paid;
                debug!(proposal = %proposal.id, amount = proposal.amount, "step 7: dao proposal paid");
            } else {
                proposal.status = ProposalStatus::Rejected;
            }
            staged.proposals.push(proposal.clone());
        }
        khu.dao_cycle_start = height;
        Ok(())
    }

    // ── Step 9: persist ─────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn commit(
        &self,
        block: &Block,
        khu: &KhuOverlayState,
        staged: StagedMutations,
        prev_khu: KhuOverlayState,
        domc_cycle_start: Height,
        domc_ledger: DomcLedger,
        domc_ledger_before: DomcLedger,
    ) -> Result<(), KhuError> {
        let block_hash = khu_crypto::hash::block_hash_from_header(&block.header_bytes());

        let mut spent_before = Vec::with_capacity(staged.spent.len());
        for outpoint in &staged.spent {
            if let Some(out) = self.db.get_utxo(outpoint)? {
                spent_before.push((*outpoint, out));
            }
            self.db.remove_utxo(outpoint)?;
        }
        for (outpoint, out) in &staged.created {
            self.db.put_utxo(outpoint, out)?;
        }

        let mut notes_before: HashMap<Commitment, Option<NoteRecord>> = HashMap::new();
        for (commitment, _) in &staged.notes {
            notes_before
                .entry(*commitment)
                .or_insert_with(|| self.db.get_note(commitment).ok().flatten());
        }
        for (commitment, note) in &staged.notes {
            self.db.put_note(commitment, note)?;
        }

        for nullifier in &staged.nullifiers {
            self.db.mark_nullifier(nullifier)?;
        }

        let mut masternodes_before: HashMap<ProTxHash, Option<MasternodeRecord>> = HashMap::new();
        for masternode in &staged.masternodes {
            masternodes_before
                .entry(masternode.pro_tx_hash)
                .or_insert_with(|| self.db.get_masternode(&masternode.pro_tx_hash).ok().flatten());
        }
        for masternode in &staged.masternodes {
            self.db.put_masternode(masternode)?;
        }

        let mut proposals_before: HashMap<BlockHash, Option<ProposalRecord>> = HashMap::new();
        for proposal in &staged.proposals {
            proposals_before
                .entry(proposal.id)
                .or_insert_with(|| self.db.get_proposal(&proposal.id).ok().flatten());
        }
        for proposal in &staged.proposals {
            self.db.put_proposal(proposal)?;
        }

        self.db.put_khu_state(khu)?;
        self.db.put_domc_ledger(domc_cycle_start, &domc_ledger)?;
        self.db.put_block(&block_hash, block)?;

        let undo = BlockUndo {
            prev_khu,
            spent: spent_before,
            created: staged.created.into_iter().map(|(op, _)| op).collect(),
            notes_before,
            masternodes_before,
            proposals_before,
            nullifiers: staged.nullifiers,
            domc_cycle_start,
            domc_ledger_before: Some(domc_ledger_before),
        };
        self.db.put_block_undo(block.height, &undo)?;

        self.db.flush()
    }

    /// Unwind the current chain tip, reversing its `apply_block` transition
    /// exactly via the `BlockUndo` record captured when it was committed.
    /// Refuses to unwind at or below `finalized_height`, and refuses a
    /// `reorg_depth` past `max_reorg_depth` — the same two guards a receiving
    /// node's reorg handling would enforce before rewinding its own tip.
    pub fn disconnect_block(
        &self,
        height: Height,
        reorg_depth: Height,
        finalized_height: Height,
    ) -> Result<(), KhuError> {
        if height <= finalized_height {
            return Err(KhuError::ReorgBlocked { height, finalized_height });
        }
        if reorg_depth > self.params.max_reorg_depth {
            return Err(KhuError::Consensus("reorg depth exceeds max_reorg_depth"));
        }
        let tip_height = self.db.chain_tip_height()?;
        if height != tip_height {
            return Err(KhuError::Consensus("disconnect_block can only unwind the current chain tip"));
        }
        let hash = self
            .db
            .get_block_hash_at_height(height)?
            .ok_or(KhuError::Consensus("block missing at tip height"))?;
        let undo = self
            .db
            .get_block_undo(height)?
            .ok_or(KhuError::Consensus("no undo record for this block"))?;

        for (outpoint, out) in &undo.spent {
            self.db.put_utxo(outpoint, out)?;
        }
        for outpoint in &undo.created {
            self.db.remove_utxo(outpoint)?;
        }
        for nullifier in &undo.nullifiers {
            self.db.remove_nullifier(nullifier)?;
        }
        for (commitment, before) in &undo.notes_before {
            match before {
                Some(note) => self.db.put_note(commitment, note)?,
                None => self.db.remove_note(commitment)?,
            }
        }
        for (pro_tx_hash, before) in &undo.masternodes_before {
            match before {
                Some(record) => self.db.put_masternode(record)?,
                None => self.db.remove_masternode(pro_tx_hash)?,
            }
        }
        for (id, before) in &undo.proposals_before {
            match before {
                Some(proposal) => self.db.put_proposal(proposal)?,
                None => self.db.remove_proposal(id)?,
            }
        }
        if let Some(ledger_before) = &undo.domc_ledger_before {
            self.db.put_domc_ledger(undo.domc_cycle_start, ledger_before)?;
        }

        self.db.put_khu_state(&undo.prev_khu)?;
        self.db.remove_block(height, &hash)?;
        self.db.remove_block_undo(height)?;
        info!(height, hash = %hash, "block disconnected");
        self.db.flush()
    }
}

/// Validate the canonical ZKHU note memo shape before its commitment is
/// accepted: magic prefix, supported version, and fixed length.
fn validate_note_memo(memo: &[u8]) -> Result<(), KhuError> {
    if memo.len() != NOTE_MEMO_LEN {
        return Err(KhuError::MalformedNoteMemo(format!(
            "expected {NOTE_MEMO_LEN} bytes, got {}",
            memo.len()
        )));
    }
    if &memo[..4] != NOTE_MEMO_MAGIC {
        return Err(KhuError::MalformedNoteMemo("bad magic".into()));
    }
    if memo[4] != NOTE_MEMO_VERSION {
        return Err(KhuError::MalformedNoteMemo(format!("unsupported version {}", memo[4])));
    }
    Ok(())
}
