/// chain.so v2 API.
///
/// Responses are wrapped in `{ status, data }`; `status != "success"` means
/// the transaction is unknown. Outputs carry the script as one raw string.
use serde::Deserialize;
use serde_json::Value;

use super::{decode, op_return_payload, timestamp_from_secs, ProviderKind, Transaction, TransactionProvider};
use crate::error::{Result, VerifyError};

#[derive(Debug, Deserialize)]
struct ChainsoResponse {
    #[serde(default)]
    status: String,
    data: Option<ChainsoTx>,
}

#[derive(Debug, Deserialize)]
struct ChainsoTx {
    txid: Option<String>,
    #[serde(default)]
    confirmations: u64,
    time: Option<i64>,
    blockhash: Option<String>,
    #[serde(default)]
    outputs: Vec<ChainsoOutput>,
}

#[derive(Debug, Deserialize)]
struct ChainsoOutput {
    script: Option<String>,
}

pub struct ChainsoProvider {
    base_url: String,
}

impl ChainsoProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl TransactionProvider for ChainsoProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Chainso
    }

    fn transaction_url(&self, tx_id: &str) -> String {
        format!("{}/tx/BTC/{}", self.base_url, tx_id)
    }

    fn normalize(&self, tx_id: &str, body: &Value) -> Result<Transaction> {
        // A failed lookup answers `{ status: "fail", data: { txid: "..." } }`,
        // so check the status before trusting the payload shape.
        if body.get("status").and_then(Value::as_str) != Some("success") {
            return Err(VerifyError::TxNotFound(tx_id.to_string()));
        }
        let response: ChainsoResponse = decode(tx_id, body)?;
        let tx = response
            .data
            .ok_or_else(|| VerifyError::TxNotFound(tx_id.to_string()))?;

        let op_return = tx
            .outputs
            .iter()
            .filter_map(|out| out.script.as_deref())
            .find_map(op_return_payload);

        Ok(Transaction {
            transaction_id: tx.txid.unwrap_or_else(|| tx_id.to_string()),
            confirmations: tx.confirmations,
            timestamp: timestamp_from_secs(tx.time),
            block_hash: tx.blockhash,
            op_return,
        })
    }
}
