/// BlockCypher main-net API.
///
/// Null-data outputs already expose the decoded payload as `data_hex`.
/// Block time is an RFC 3339 string under `confirmed`.
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{decode, ProviderKind, Transaction, TransactionProvider};
use crate::error::{Result, VerifyError};

#[derive(Debug, Deserialize)]
struct BlockcypherTx {
    hash: Option<String>,
    /// Present instead of the transaction when the lookup failed.
    error: Option<Value>,
    #[serde(default)]
    confirmations: u64,
    confirmed: Option<String>,
    block_hash: Option<String>,
    #[serde(default)]
    outputs: Vec<BlockcypherOutput>,
}

#[derive(Debug, Deserialize)]
struct BlockcypherOutput {
    data_hex: Option<String>,
}

pub struct BlockcypherProvider {
    base_url: String,
}

impl BlockcypherProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl TransactionProvider for BlockcypherProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Blockcypher
    }

    fn transaction_url(&self, tx_id: &str) -> String {
        format!("{}/txs/{}", self.base_url, tx_id)
    }

    fn normalize(&self, tx_id: &str, body: &Value) -> Result<Transaction> {
        let tx: BlockcypherTx = decode(tx_id, body)?;
        let hash = match (tx.error, tx.hash) {
            (None, Some(hash)) => hash,
            _ => return Err(VerifyError::TxNotFound(tx_id.to_string())),
        };

        let op_return = tx
            .outputs
            .iter()
            .find_map(|out| out.data_hex.as_deref())
            .map(str::to_ascii_lowercase);

        let timestamp = tx
            .confirmed
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        Ok(Transaction {
            transaction_id: hash,
            confirmations: tx.confirmations,
            timestamp,
            block_hash: tx.block_hash,
            op_return,
        })
    }
}
