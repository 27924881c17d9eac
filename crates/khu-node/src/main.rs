//! khu-node — the KHU full-node binary.
//!
//! Startup sequence:
//!   1. Open (or initialise) the state database
//!   2. Apply genesis if the DB is fresh
//!   3. Start the JSON-RPC 2.0 server
//!   4. Run the producer loop: on each block interval, if this node is the
//!      elected masternode for the next height, drain pending transactions
//!      from the RPC queue into a block, sign it, and apply it

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use khu_consensus::{select_producer, verify_block_producer_signature, FinalityStore};
use khu_core::constants::ConsensusParams;
use khu_core::transaction::{Block, Transaction};
use khu_core::types::{BlockHash, ProTxHash};
use khu_crypto::hash::block_hash_from_header;
use khu_crypto::KeyPair;
use khu_genesis::{apply_genesis, GenesisMasternode, GenesisParams};
use khu_rpc::server::RpcServerState;
use khu_rpc::RpcServer;
use khu_state::db::StateDb;
use khu_state::engine::StateEngine;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum NetworkArg {
    Mainnet,
    Testnet,
    Regtest,
}

impl NetworkArg {
    fn params(self) -> ConsensusParams {
        match self {
            NetworkArg::Mainnet => ConsensusParams::mainnet(),
            NetworkArg::Testnet => ConsensusParams::testnet(),
            NetworkArg::Regtest => ConsensusParams::regtest(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "khu-node", version, about = "KHU full node")]
struct Args {
    /// Directory for the persistent state database.
    #[arg(long, default_value = "~/.khu/data")]
    data_dir: PathBuf,

    /// JSON-RPC listen address.
    #[arg(long, default_value = "127.0.0.1:8545")]
    rpc_addr: SocketAddr,

    /// Network tier.
    #[arg(long, value_enum, default_value_t = NetworkArg::Regtest)]
    network: NetworkArg,

    /// Path to genesis params JSON (only required on first run).
    #[arg(long)]
    genesis_params: Option<PathBuf>,

    /// proTxHash (hex) of the masternode this node produces blocks as.
    /// If absent the node serves RPC only and never produces blocks.
    #[arg(long)]
    pro_tx_hash: Option<String>,

    /// Path to the operator secret key (32 raw bytes), required alongside
    /// `--pro-tx-hash` to produce blocks.
    #[arg(long)]
    operator_key: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,khu=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let params = args.network.params();
    info!(tier = ?params.tier, "KHU node starting");

    // ── State database ────────────────────────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db = Arc::new(StateDb::open(&data_dir).context("opening state database")?);

    // ── Genesis if fresh ──────────────────────────────────────────────────────
    if db.get_block_hash_at_height(0)?.is_none() {
        info!("fresh database — applying genesis");
        let genesis_params = load_or_generate_genesis_params(args.genesis_params.as_deref())?;
        apply_genesis(&db, &genesis_params, &params).context("applying genesis")?;
    } else {
        info!("existing database found — skipping genesis");
    }
    let genesis_hash = db
        .get_block_hash_at_height(0)?
        .context("genesis block missing after genesis step")?;

    // ── State engine & finality ───────────────────────────────────────────────
    let engine = Arc::new(StateEngine::new(Arc::clone(&db), params.clone()));
    let finality = Arc::new(FinalityStore::new(genesis_hash));

    // ── Inbound transaction queue ──────────────────────────────────────────────
    let (tx_sender, mut tx_receiver) = tokio::sync::mpsc::channel::<Transaction>(512);

    // ── RPC server ─────────────────────────────────────────────────────────────
    let rpc_state = Arc::new(RpcServerState {
        db: Arc::clone(&db),
        params: params.clone(),
        finality: Arc::clone(&finality),
        tx_sender: Some(tx_sender),
    });
    let _rpc_handle = RpcServer::new(rpc_state)
        .start(args.rpc_addr)
        .await
        .context("starting RPC server")?;

    // ── Producer identity (optional) ──────────────────────────────────────────
    let producer_identity = match (&args.pro_tx_hash, &args.operator_key) {
        (Some(hex_hash), Some(key_path)) => {
            let pro_tx_hash = ProTxHash::from_hex(hex_hash).context("invalid --pro-tx-hash")?;
            let secret_bytes =
                std::fs::read(key_path).with_context(|| format!("reading {}", key_path.display()))?;
            let record = db
                .get_masternode(&pro_tx_hash)?
                .with_context(|| format!("masternode {pro_tx_hash} is not registered"))?;
            let signer = khu_crypto::KhuSigner::from_secret_key_bytes(
                secret_bytes,
                record.operator_pubkey.0.clone(),
            );
            info!(%pro_tx_hash, "producing blocks as registered masternode");
            Some((pro_tx_hash, signer))
        }
        (None, None) => {
            info!("no --pro-tx-hash/--operator-key supplied — running RPC-only, not producing blocks");
            None
        }
        _ => {
            warn!("--pro-tx-hash and --operator-key must be supplied together — running RPC-only");
            None
        }
    };

    info!("node ready");
    let mut tick = tokio::time::interval(Duration::from_secs(params.block_time_seconds as u64));
    loop {
        tick.tick().await;

        // Drain any queued transactions without blocking the tick.
        let mut pending = Vec::new();
        while let Ok(tx) = tx_receiver.try_recv() {
            pending.push(tx);
        }

        let Some((pro_tx_hash, signer)) = &producer_identity else {
            continue;
        };

        if let Err(e) = try_produce_block(&db, &engine, &finality, &params, *pro_tx_hash, signer, pending) {
            warn!(error = %e, "block production attempt failed");
        }
    }
}

fn try_produce_block(
    db: &StateDb,
    engine: &StateEngine,
    finality: &FinalityStore,
    params: &ConsensusParams,
    pro_tx_hash: ProTxHash,
    signer: &khu_crypto::KhuSigner,
    pending: Vec<Transaction>,
) -> anyhow::Result<()> {
    let tip_height = db.chain_tip_height()?;
    let next_height = tip_height + 1;
    let prev_hash = db
        .get_block_hash_at_height(tip_height)?
        .context("chain tip block missing")?;
    let prev_block = db.get_block(&prev_hash)?.context("chain tip block body missing")?;

    let masternodes = db.iter_masternodes()?;
    let now = chrono::Utc::now().timestamp();
    let elected = select_producer(&masternodes, &prev_hash, next_height, prev_block.time, now, params)
        .map_err(|e| anyhow::anyhow!("selecting producer: {e}"))?;
    if elected != pro_tx_hash {
        return Ok(());
    }
    let record = db
        .get_masternode(&pro_tx_hash)?
        .with_context(|| format!("masternode {pro_tx_hash} is not registered"))?;

    let mut block = Block {
        prev_hash,
        merkle_root: merkle_root(&pending),
        height: next_height,
        time: now,
        producer: pro_tx_hash,
        producer_signature: khu_core::types::SignatureBytes(Vec::new()),
        vtx: pending,
        final_sapling_root: BlockHash::NULL,
        finality_sig: None,
    };
    let header_digest = khu_crypto::hash::sha256_hash(&block.header_bytes());
    block.producer_signature = signer
        .sign(&header_digest)
        .map_err(|e| anyhow::anyhow!("signing block header: {e}"))?;
    verify_block_producer_signature(&block, &record.operator_pubkey)
        .map_err(|e| anyhow::anyhow!("self-check of block signature failed: {e}"))?;

    finality
        .check_reorg(next_height)
        .map_err(|e| anyhow::anyhow!("reorg check: {e}"))?;
    engine
        .apply_block(&block)
        .map_err(|e| anyhow::anyhow!("applying block: {e}"))?;
    info!(height = next_height, producer = %pro_tx_hash, "block produced and applied");
    Ok(())
}

/// BLAKE3 of the concatenated txids. Not a Merkle tree — transaction
/// inclusion proofs are out of scope — but still binds the full tx set into
/// the signed header.
fn merkle_root(vtx: &[Transaction]) -> BlockHash {
    if vtx.is_empty() {
        return BlockHash::NULL;
    }
    let mut buf = Vec::with_capacity(vtx.len() * 32);
    for tx in vtx {
        buf.extend_from_slice(tx.txid.as_bytes());
    }
    block_hash_from_header(&buf)
}

/// Load genesis parameters from a JSON file, or generate a single ephemeral
/// bootstrap masternode if no path is given.
///
/// # Warning
/// Ephemeral keys are **not reproducible**. A node started without
/// `--genesis-params` will produce a genesis that cannot be shared with
/// other nodes. Only use this for local development and testing.
fn load_or_generate_genesis_params(path: Option<&Path>) -> anyhow::Result<GenesisParams> {
    if let Some(p) = path {
        let json = std::fs::read_to_string(p)
            .with_context(|| format!("reading genesis params from {}", p.display()))?;
        return serde_json::from_str(&json).context("parsing genesis params JSON");
    }
    warn!("No --genesis-params provided. Generating an ephemeral bootstrap masternode — DO NOT USE IN PRODUCTION.");
    let operator = KeyPair::generate();
    Ok(GenesisParams {
        masternodes: vec![GenesisMasternode {
            collateral: khu_core::types::OutPoint::new(khu_core::types::TxId::NULL, 0),
            collateral_amount: 0,
            operator_pubkey: operator.public_key.clone(),
            payout_script: khu_core::types::Script::new(Vec::new()),
            service_addr: khu_core::types::ServiceAddr(String::new()),
        }],
    })
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
