use anyhow::{bail, Context};

use khu_core::transaction::Transaction;
use khu_rpc::{RpcChainStats, RpcGenesisInfo, RpcMasternode, RpcNote, RpcProposal};

/// Simple JSON-RPC 2.0 client used by the wallet to talk to a running node.
///
/// Uses raw HTTP POST with serde_json rather than the full jsonrpsee client
/// to keep the wallet binary lean and dependency-minimal.
pub struct WalletRpcClient {
    url: String,
    client: reqwest::Client,
}

impl WalletRpcClient {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Call a JSON-RPC method and return the `result` field.
    async fn call(&self, method: &str, params: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("connecting to node at {}", self.url))?;

        let json: serde_json::Value = resp.json().await.context("parsing RPC response")?;

        if let Some(err) = json.get("error") {
            bail!("RPC error: {}", err);
        }

        Ok(json["result"].clone())
    }

    /// Submit a signed transaction. Returns the txid hex.
    pub async fn send_transaction(&self, tx: &Transaction) -> anyhow::Result<String> {
        let bytes = bincode::serialize(tx).context("serializing transaction")?;
        let tx_hex = hex::encode(&bytes);

        let result = self.call("khu_sendTransaction", serde_json::json!([tx_hex])).await?;
        result
            .as_str()
            .map(|s| s.to_string())
            .context("expected txid string from sendTransaction")
    }

    pub async fn get_genesis_info(&self) -> anyhow::Result<RpcGenesisInfo> {
        let result = self.call("khu_getGenesisInfo", serde_json::json!([])).await?;
        serde_json::from_value(result).context("parsing genesis info")
    }

    pub async fn get_chain_stats(&self) -> anyhow::Result<RpcChainStats> {
        let result = self.call("khu_getChainStats", serde_json::json!([])).await?;
        serde_json::from_value(result).context("parsing chain stats")
    }

    pub async fn get_masternode(&self, pro_tx_hash_hex: &str) -> anyhow::Result<Option<RpcMasternode>> {
        let result = self
            .call("khu_getMasternode", serde_json::json!([pro_tx_hash_hex]))
            .await?;
        serde_json::from_value(result).context("parsing masternode response")
    }

    pub async fn get_note(&self, commitment_hex: &str) -> anyhow::Result<Option<RpcNote>> {
        let result = self.call("khu_getNote", serde_json::json!([commitment_hex])).await?;
        serde_json::from_value(result).context("parsing note response")
    }

    pub async fn get_proposal(&self, proposal_id_hex: &str) -> anyhow::Result<Option<RpcProposal>> {
        let result = self
            .call("khu_getProposal", serde_json::json!([proposal_id_hex]))
            .await?;
        serde_json::from_value(result).context("parsing proposal response")
    }

    pub async fn get_domc_cycle_status(&self, height: u32) -> anyhow::Result<String> {
        let result = self
            .call("khu_getDomcCycleStatus", serde_json::json!([height]))
            .await?;
        result.as_str().map(|s| s.to_string()).context("expected string cycle status")
    }

    pub async fn get_dao_cycle_status(&self, height: u32) -> anyhow::Result<String> {
        let result = self
            .call("khu_getDaoCycleStatus", serde_json::json!([height]))
            .await?;
        result.as_str().map(|s| s.to_string()).context("expected string cycle status")
    }
}
