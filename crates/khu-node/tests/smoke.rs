//! End-to-end smoke test for khu-node.
//!
//! Spawns a real node process with a fresh genesis seeded by a single
//! bootstrap masternode, submits a KhuMint transaction via JSON-RPC, and
//! asserts the overlay state reflects it once the node has produced a block.
//!
//! Run with:
//!   cargo test -p khu-node --test smoke

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use khu_core::transaction::{Transaction, TransactionBody, TransactionKind};
use khu_core::types::{OutPoint, Script, ServiceAddr, TxId, TxOut};
use khu_crypto::hash::{sha256_hash, txid_from_body};
use khu_crypto::KeyPair;
use khu_genesis::{GenesisMasternode, GenesisParams};
use khu_script::encode_p2pkh;

struct NodeGuard {
    child: Child,
    data_dir: PathBuf,
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

async fn rpc_call(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let body = serde_json::json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 1});
    let resp = client
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap_or_else(|e| panic!("RPC call {method} failed: {e}"));
    let json: serde_json::Value = resp.json().await.expect("parse RPC JSON");
    if let Some(err) = json.get("error") {
        panic!("RPC error from {method}: {err}");
    }
    json["result"].clone()
}

async fn wait_for_rpc(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    let body = serde_json::json!({"jsonrpc": "2.0", "method": "khu_getGenesisInfo", "params": [], "id": 1});
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(resp) = client.post(url).json(&body).send().await {
            if resp.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    false
}

fn build_mint_tx(kp: &KeyPair, amount: i64, dest_hash: &[u8; 20]) -> Transaction {
    let vout = vec![TxOut { value: amount, script_pubkey: encode_p2pkh(dest_hash) }];
    let kind = TransactionKind::KhuMint { amount };
    let body_bytes = bincode::serialize(&TransactionBody { vin: &Vec::new(), vout: &vout, lock_time: 0, kind: &kind })
        .unwrap();
    let digest = sha256_hash(&body_bytes);
    let _ = kp.sign(&digest); // mint carries no circulating input to authorize; signature unused on-chain here
    let txid = txid_from_body(&body_bytes);
    Transaction { txid, vin: Vec::new(), vout, lock_time: 0, kind }
}

#[tokio::test]
async fn smoke_genesis_and_mint() {
    let data_dir = std::env::temp_dir().join(format!("khu_smoke_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&data_dir);
    std::fs::create_dir_all(&data_dir).unwrap();

    let operator = KeyPair::generate();
    let collateral = OutPoint::new(TxId::from_bytes([9u8; 32]), 0);
    let params = GenesisParams {
        masternodes: vec![GenesisMasternode {
            collateral,
            collateral_amount: 1_000,
            operator_pubkey: operator.public_key.clone(),
            payout_script: Script::new(vec![0u8; 25]),
            service_addr: ServiceAddr("127.0.0.1:0".to_string()),
        }],
    };
    let params_path = data_dir.join("genesis-params.json");
    std::fs::write(&params_path, serde_json::to_string(&params).unwrap()).unwrap();

    let pro_tx_hash = khu_crypto::hash::pro_tx_hash_from_registration(
        &collateral.to_bytes(),
        &operator.public_key.0,
    );
    let key_path = data_dir.join("operator.key");
    std::fs::write(&key_path, operator.secret_key_bytes()).unwrap();

    let rpc_port = free_port();
    let rpc_url = format!("http://127.0.0.1:{}", rpc_port);

    let node_bin = env!("CARGO_BIN_EXE_khu-node");
    let child = Command::new(node_bin)
        .args([
            "--data-dir", data_dir.join("state").to_str().unwrap(),
            "--rpc-addr", &format!("127.0.0.1:{}", rpc_port),
            "--network", "regtest",
            "--genesis-params", params_path.to_str().unwrap(),
            "--pro-tx-hash", &pro_tx_hash.to_hex(),
            "--operator-key", key_path.to_str().unwrap(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn khu-node");
    let _guard = NodeGuard { child, data_dir };

    let http = reqwest::Client::new();
    assert!(
        wait_for_rpc(&http, &rpc_url, Duration::from_secs(20)).await,
        "khu-node did not become ready within 20 seconds"
    );

    let genesis_info = rpc_call(&http, &rpc_url, "khu_getGenesisInfo", serde_json::json!([])).await;
    assert_eq!(genesis_info["network"], "regtest");

    let overlay_before =
        rpc_call(&http, &rpc_url, "khu_getOverlayState", serde_json::json!([])).await;
    assert_eq!(overlay_before["colored"], 0);

    let dest = KeyPair::generate();
    let dest_hash = khu_script::hash160(&dest.public_key.0);
    let tx = build_mint_tx(&operator, 5_000, &dest_hash);
    let tx_hex = hex::encode(bincode::serialize(&tx).unwrap());
    let _txid = rpc_call(&http, &rpc_url, "khu_sendTransaction", serde_json::json!([tx_hex])).await;

    // regtest block_time_seconds is short; give the producer loop a couple of ticks.
    tokio::time::sleep(Duration::from_secs(6)).await;

    let overlay_after =
        rpc_call(&http, &rpc_url, "khu_getOverlayState", serde_json::json!([])).await;
    assert_eq!(overlay_after["colored"], 5_000);
    assert_eq!(overlay_after["uncolored"], 5_000);

    let stats = rpc_call(&http, &rpc_url, "khu_getChainStats", serde_json::json!([])).await;
    assert!(stats["tip_height"].as_u64().unwrap() >= 1);
}
