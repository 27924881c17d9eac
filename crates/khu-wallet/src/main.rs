//! khu-wallet
//!
//! CLI wallet for KHU. Manages secp256k1 keypairs, builds and signs
//! transactions, and submits them to a running node via JSON-RPC.
//!
//! Usage:
//!   khu-wallet keygen     [--keyfile <path>]
//!   khu-wallet info       [--rpc <url>]
//!   khu-wallet send       --input <txid:vout>... --output <pubkeyhash_hex:amount>... [--rpc <url>]
//!   khu-wallet mint       --input <txid:vout>... --output <pubkeyhash_hex:amount>... --amount <khu>
//!   khu-wallet redeem     --input <txid:vout>... --output <pubkeyhash_hex:amount>... --amount <khu>
//!   khu-wallet lock       --input <txid:vout>... --amount <khu> --rcm <hex32> [--memo <text>]
//!   khu-wallet unlock     --commitment <hex> --rcm <hex32> --output <pubkeyhash_hex:amount>
//!   khu-wallet domc-commit --proposer <pro_tx_hash_hex> --rate-bps <bps> [--salt <hex32>]
//!   khu-wallet domc-reveal --proposer <pro_tx_hash_hex> --rate-bps <bps> --salt <hex32>
//!   khu-wallet dao-propose --payout-script <hex> --amount <khu> --fee <khu>
//!   khu-wallet dao-vote    --proposal-id <hex> --voter <pro_tx_hash_hex> --choice <yes|no|abstain>
//!   khu-wallet register-masternode --collateral <txid:vout> --collateral-amount <khu> --service-addr <host:port>

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use khu_core::transaction::{Transaction, TransactionBody, TransactionKind};
use khu_core::types::{
    BlockHash, Commitment, OutPoint, ProTxHash, Script, ServiceAddr, SignatureBytes, TxId, TxIn, TxOut,
    VoteChoice,
};
use khu_crypto::hash::{
    commitment_from_opening, nullifier_from_commitment, pro_tx_hash_from_registration, sha256_hash,
};
use khu_crypto::KeyPair;
use khu_script::opcodes::push;
use khu_script::encode_p2pkh;

mod rpc_client;
use rpc_client::WalletRpcClient;

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "khu-wallet", version, about = "KHU wallet — sign and submit transactions")]
struct Args {
    /// Path to the keyfile (JSON).
    #[arg(long, global = true, default_value = "~/.khu/wallet.json")]
    keyfile: PathBuf,

    /// Node RPC endpoint.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8545")]
    rpc: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum VoteChoiceArg {
    Yes,
    No,
    Abstain,
}

impl From<VoteChoiceArg> for VoteChoice {
    fn from(v: VoteChoiceArg) -> Self {
        match v {
            VoteChoiceArg::Yes => VoteChoice::Yes,
            VoteChoiceArg::No => VoteChoice::No,
            VoteChoiceArg::Abstain => VoteChoice::Abstain,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new secp256k1 keypair and save to the keyfile.
    Keygen,

    /// Print node/protocol/chain info.
    Info,

    /// Plain value transfer.
    Send {
        #[arg(long = "input")]
        inputs: Vec<String>,
        #[arg(long = "output")]
        outputs: Vec<String>,
    },

    /// Convert circulating coin into colored (KHU) supply.
    Mint {
        #[arg(long = "input")]
        inputs: Vec<String>,
        #[arg(long = "output")]
        outputs: Vec<String>,
        #[arg(long)]
        amount: i64,
    },

    /// Convert colored (KHU) supply back to plain circulating coin.
    Redeem {
        #[arg(long = "input")]
        inputs: Vec<String>,
        #[arg(long = "output")]
        outputs: Vec<String>,
        #[arg(long)]
        amount: i64,
    },

    /// Lock colored coin into a staking note.
    Lock {
        #[arg(long = "input")]
        inputs: Vec<String>,
        #[arg(long)]
        amount: i64,
        /// 32-byte hex opening randomness. Also doubles as the spend key
        /// needed to unlock the note later — keep it secret.
        #[arg(long)]
        rcm: String,
        #[arg(long, default_value = "")]
        memo: String,
    },

    /// Reveal a matured note's nullifier to reclaim principal plus yield.
    Unlock {
        #[arg(long)]
        commitment: String,
        #[arg(long)]
        rcm: String,
        #[arg(long = "output")]
        output: String,
    },

    /// Commit to a proposed next-cycle annual yield rate.
    DomcCommit {
        #[arg(long)]
        proposer: String,
        #[arg(long)]
        rate_bps: u32,
        /// 32-byte hex salt. Generated randomly if omitted — record it, it's
        /// needed again at reveal time.
        #[arg(long)]
        salt: Option<String>,
    },

    /// Reveal a previously committed rate.
    DomcReveal {
        #[arg(long)]
        proposer: String,
        #[arg(long)]
        rate_bps: u32,
        #[arg(long)]
        salt: String,
    },

    /// Submit a DAO treasury spending proposal.
    DaoPropose {
        /// Hex-encoded payout script.
        #[arg(long)]
        payout_script: String,
        #[arg(long)]
        amount: i64,
        #[arg(long)]
        fee: i64,
    },

    /// Cast a masternode vote on a DAO proposal.
    DaoVote {
        #[arg(long)]
        proposal_id: String,
        #[arg(long)]
        voter: String,
        #[arg(long, value_enum)]
        choice: VoteChoiceArg,
    },

    /// Register this wallet's key as a masternode operator.
    RegisterMasternode {
        /// Collateral outpoint, "txid:vout".
        #[arg(long)]
        collateral: String,
        #[arg(long)]
        collateral_amount: i64,
        /// Hex-encoded payout script.
        #[arg(long)]
        payout_script: String,
        #[arg(long)]
        service_addr: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,khu_wallet=info")
        .init();

    let args = Args::parse();
    let keyfile = expand_tilde(&args.keyfile);
    let client = WalletRpcClient::new(&args.rpc);

    match args.command {
        Command::Keygen => cmd_keygen(&keyfile),

        Command::Info => {
            let genesis = client.get_genesis_info().await?;
            let stats = client.get_chain_stats().await?;
            println!("Network:        {}", genesis.network);
            println!("Maturity:       {} blocks", genesis.maturity_blocks);
            println!("DOMC cycle:     {} blocks", genesis.domc_cycle_blocks);
            println!("DAO cycle:      {} blocks", genesis.dao_cycle_blocks);
            println!("Initial rate:   {} bps", genesis.r_initial_bps);
            println!("Floor rate:     {} bps", genesis.r_floor_bps);
            println!("Quorum:         {}/{}", genesis.quorum_threshold, genesis.quorum_size);
            println!("Tip height:     {}", stats.tip_height);
            println!("Finalized:      {}", stats.finalized_height);
            println!("Masternodes:    {}", stats.total_masternodes);
            Ok(())
        }

        Command::Send { inputs, outputs } => {
            let kp = load_keypair(&keyfile)?;
            let vin = parse_inputs(&inputs)?;
            let vout = parse_outputs(&outputs)?;
            let tx = build_and_sign(&kp, vin, vout, TransactionKind::Normal)?;
            let txid = client.send_transaction(&tx).await?;
            println!("Submitted: {txid}");
            Ok(())
        }

        Command::Mint { inputs, outputs, amount } => {
            let kp = load_keypair(&keyfile)?;
            let vin = parse_inputs(&inputs)?;
            let vout = parse_outputs(&outputs)?;
            let tx = build_and_sign(&kp, vin, vout, TransactionKind::KhuMint { amount })?;
            let txid = client.send_transaction(&tx).await?;
            println!("Mint submitted: {txid}");
            Ok(())
        }

        Command::Redeem { inputs, outputs, amount } => {
            let kp = load_keypair(&keyfile)?;
            let vin = parse_inputs(&inputs)?;
            let vout = parse_outputs(&outputs)?;
            let tx = build_and_sign(&kp, vin, vout, TransactionKind::KhuRedeem { amount })?;
            let txid = client.send_transaction(&tx).await?;
            println!("Redeem submitted: {txid}");
            Ok(())
        }

        Command::Lock { inputs, amount, rcm, memo } => {
            let kp = load_keypair(&keyfile)?;
            let vin = parse_inputs(&inputs)?;
            let rcm_bytes = parse_hex32(&rcm).context("parsing --rcm")?;
            let note_memo = encode_note_memo(&memo);
            let commitment = commitment_from_opening(amount, &rcm_bytes, &note_memo);
            info!(%commitment, "lock: derived note commitment");
            let tx = build_and_sign(
                &kp,
                vin,
                Vec::new(),
                TransactionKind::KhuLock { amount, commitment, note_memo },
            )?;
            let txid = client.send_transaction(&tx).await?;
            println!("Lock submitted: {txid}");
            println!("Commitment:     {}", commitment.to_hex());
            println!("Keep --rcm secret. You need it to unlock this note later.");
            Ok(())
        }

        Command::Unlock { commitment, rcm, output } => {
            let kp = load_keypair(&keyfile)?;
            let commitment = Commitment::from_hex(&commitment).context("invalid --commitment")?;
            let rcm_bytes = parse_hex32(&rcm).context("parsing --rcm")?;
            let note = client
                .get_note(&commitment.to_hex())
                .await?
                .context("note not found — check --commitment")?;
            let nullifier = nullifier_from_commitment(&commitment, &rcm_bytes);
            let vout = parse_outputs(std::slice::from_ref(&output))?;
            let tx = build_and_sign(
                &kp,
                Vec::new(),
                vout,
                TransactionKind::KhuUnlock { nullifier, commitment, bonus: note.accrued_bonus },
            )?;
            let txid = client.send_transaction(&tx).await?;
            println!("Unlock submitted: {txid}");
            Ok(())
        }

        Command::DomcCommit { proposer, rate_bps, salt } => {
            let kp = load_keypair(&keyfile)?;
            let proposer = ProTxHash::from_hex(&proposer).context("invalid --proposer")?;
            let salt_bytes = match salt {
                Some(s) => parse_hex32(&s).context("parsing --salt")?,
                None => {
                    use rand::RngCore;
                    let mut buf = [0u8; 32];
                    rand::thread_rng().fill_bytes(&mut buf);
                    buf
                }
            };
            let commitment = khu_governance::compute_commitment(rate_bps, &salt_bytes);
            let tx = build_and_sign(
                &kp,
                Vec::new(),
                Vec::new(),
                TransactionKind::DomcCommit { proposer, commitment },
            )?;
            let txid = client.send_transaction(&tx).await?;
            println!("DOMC commit submitted: {txid}");
            println!("Salt (record this for reveal): {}", hex::encode(salt_bytes));
            Ok(())
        }

        Command::DomcReveal { proposer, rate_bps, salt } => {
            let kp = load_keypair(&keyfile)?;
            let proposer = ProTxHash::from_hex(&proposer).context("invalid --proposer")?;
            let salt_bytes = parse_hex32(&salt).context("parsing --salt")?;
            let tx = build_and_sign(
                &kp,
                Vec::new(),
                Vec::new(),
                TransactionKind::DomcReveal { proposer, rate_bps, salt: salt_bytes },
            )?;
            let txid = client.send_transaction(&tx).await?;
            println!("DOMC reveal submitted: {txid}");
            Ok(())
        }

        Command::DaoPropose { payout_script, amount, fee } => {
            let kp = load_keypair(&keyfile)?;
            let script_bytes = hex::decode(&payout_script).context("decoding --payout-script hex")?;
            let mut nonce = [0u8; 16];
            {
                use rand::RngCore;
                rand::thread_rng().fill_bytes(&mut nonce);
            }
            let mut seed = Vec::with_capacity(script_bytes.len() + 8 + 16);
            seed.extend_from_slice(&script_bytes);
            seed.extend_from_slice(&amount.to_le_bytes());
            seed.extend_from_slice(&nonce);
            let proposal_id = BlockHash::from_bytes(sha256_hash(&seed));

            let tx = build_and_sign(
                &kp,
                Vec::new(),
                Vec::new(),
                TransactionKind::DaoPropose {
                    proposal_id,
                    payout_script: Script::new(script_bytes),
                    amount,
                    fee,
                },
            )?;
            let txid = client.send_transaction(&tx).await?;
            println!("Proposal submitted: {txid}");
            println!("Proposal ID: {}", proposal_id.to_hex());
            Ok(())
        }

        Command::DaoVote { proposal_id, voter, choice } => {
            let kp = load_keypair(&keyfile)?;
            let proposal_id = BlockHash::from_hex(&proposal_id).context("invalid --proposal-id")?;
            let voter = ProTxHash::from_hex(&voter).context("invalid --voter")?;
            let choice: VoteChoice = choice.into();
            let mut vote_msg = Vec::with_capacity(33);
            vote_msg.extend_from_slice(proposal_id.as_bytes());
            vote_msg.push(choice.as_byte());
            let signature = SignatureBytes(kp.sign(&sha256_hash(&vote_msg)).0);

            let tx = build_and_sign(
                &kp,
                Vec::new(),
                Vec::new(),
                TransactionKind::DaoVote { proposal_id, voter, choice, signature },
            )?;
            let txid = client.send_transaction(&tx).await?;
            println!("Vote submitted ({choice:?}): {txid}");
            Ok(())
        }

        Command::RegisterMasternode { collateral, collateral_amount, payout_script, service_addr } => {
            let kp = load_keypair(&keyfile)?;
            let collateral = parse_outpoint(&collateral).context("invalid --collateral")?;
            let script_bytes = hex::decode(&payout_script).context("decoding --payout-script hex")?;
            let pro_tx_hash =
                pro_tx_hash_from_registration(&collateral.to_bytes(), &kp.public_key.0);
            // collateral_amount is asserted by the chain against the referenced
            // outpoint's actual UTXO value; the registration itself carries no
            // value transfer of its own.
            let _ = collateral_amount;

            let tx = build_and_sign(
                &kp,
                Vec::new(),
                Vec::new(),
                TransactionKind::MasternodeRegister {
                    pro_tx_hash,
                    collateral,
                    operator_pubkey: kp.public_key.clone(),
                    payout_script: Script::new(script_bytes),
                    service_addr: ServiceAddr(service_addr),
                },
            )?;
            let txid = client.send_transaction(&tx).await?;
            println!("Masternode registration submitted: {txid}");
            println!("proTxHash: {}", pro_tx_hash.to_hex());
            Ok(())
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn cmd_keygen(keyfile: &PathBuf) -> anyhow::Result<()> {
    if keyfile.exists() {
        bail!("Keyfile {} already exists. Delete it first to generate a new key.", keyfile.display());
    }
    if let Some(parent) = keyfile.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let kp = KeyPair::generate();
    let json = serde_json::to_string_pretty(&kp)?;
    std::fs::write(keyfile, &json).with_context(|| format!("writing keyfile to {}", keyfile.display()))?;

    println!("Generated new keypair.");
    println!("Public key: {}", hex::encode(&kp.public_key.0));
    println!("Keyfile:    {}", keyfile.display());
    println!("\nBACK UP YOUR KEYFILE. Loss = permanent loss of funds.");
    Ok(())
}

// ── Transaction builder ───────────────────────────────────────────────────────

/// Build, sign (single key over every input), and finalize a transaction.
///
/// The signing digest covers the transaction body with every `script_sig`
/// blanked, mirroring a standard sighash; the final `txid` is computed over
/// the body with the real `script_sig`s filled in.
fn build_and_sign(
    kp: &KeyPair,
    inputs: Vec<OutPoint>,
    vout: Vec<TxOut>,
    kind: TransactionKind,
) -> anyhow::Result<Transaction> {
    let lock_time = 0u32;
    let blank_vin: Vec<TxIn> = inputs
        .iter()
        .map(|op| TxIn { prevout: *op, script_sig: Script::new(Vec::new()), sequence: 0xffff_ffff })
        .collect();

    let digest = sha256_hash(&bincode::serialize(&TransactionBody {
        vin: &blank_vin,
        vout: &vout,
        lock_time,
        kind: &kind,
    })?);
    let signature = kp.sign(&digest);

    let mut script_sig_bytes = push(&signature.0);
    script_sig_bytes.extend(push(&kp.public_key.0));
    let script_sig = Script::new(script_sig_bytes);

    let vin: Vec<TxIn> = inputs
        .iter()
        .map(|op| TxIn { prevout: *op, script_sig: script_sig.clone(), sequence: 0xffff_ffff })
        .collect();

    let body_bytes = bincode::serialize(&TransactionBody { vin: &vin, vout: &vout, lock_time, kind: &kind })?;
    let txid = khu_crypto::hash::txid_from_body(&body_bytes);

    Ok(Transaction { txid, vin, vout, lock_time, kind })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn load_keypair(keyfile: &PathBuf) -> anyhow::Result<KeyPair> {
    let json = std::fs::read_to_string(keyfile)
        .with_context(|| format!("reading keyfile {}", keyfile.display()))?;
    serde_json::from_str(&json).context("parsing keyfile — is it a valid KHU wallet keyfile?")
}

fn parse_outpoint(s: &str) -> anyhow::Result<OutPoint> {
    let (txid_hex, vout_str) = s.split_once(':').context("expected txid:vout")?;
    let txid = TxId::from_hex(txid_hex).map_err(|e| anyhow::anyhow!("invalid txid hex: {e}"))?;
    let vout: u32 = vout_str.parse().context("invalid vout")?;
    Ok(OutPoint::new(txid, vout))
}

fn parse_inputs(inputs: &[String]) -> anyhow::Result<Vec<OutPoint>> {
    inputs.iter().map(|s| parse_outpoint(s)).collect()
}

fn parse_outputs(outputs: &[String]) -> anyhow::Result<Vec<TxOut>> {
    outputs
        .iter()
        .map(|s| {
            let (hash_hex, amount_str) = s.split_once(':').context("expected pubkeyhash:amount")?;
            let hash_bytes = hex::decode(hash_hex).context("decoding pubkey hash hex")?;
            if hash_bytes.len() != 20 {
                bail!("pubkey hash must be 20 bytes (40 hex chars)");
            }
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&hash_bytes);
            let value: i64 = amount_str.parse().context("invalid amount")?;
            Ok(TxOut { value, script_pubkey: encode_p2pkh(&hash) })
        })
        .collect()
}

fn parse_hex32(s: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = hex::decode(s).context("invalid hex")?;
    if bytes.len() != 32 {
        bail!("expected 32 bytes (64 hex chars)");
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Encode the fixed-length ZKHU note memo: 4-byte magic, 1-byte version, the
/// free-text payload, zero-padded to the full 512 bytes.
fn encode_note_memo(text: &str) -> Vec<u8> {
    let mut memo = Vec::with_capacity(khu_core::constants::NOTE_MEMO_LEN);
    memo.extend_from_slice(khu_core::constants::NOTE_MEMO_MAGIC);
    memo.push(khu_core::constants::NOTE_MEMO_VERSION);
    let text_bytes = text.as_bytes();
    let room = khu_core::constants::NOTE_MEMO_LEN - memo.len();
    memo.extend_from_slice(&text_bytes[..text_bytes.len().min(room)]);
    memo.resize(khu_core::constants::NOTE_MEMO_LEN, 0);
    memo
}

fn expand_tilde(path: &PathBuf) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.clone()
}
