/// Woleet transaction endpoint (bitcoind `getrawtransaction` verbose shape).
///
/// The OP_RETURN payload is the token after the `OP_RETURN` mnemonic in
/// `vout[].scriptPubKey.asm`.
use serde::Deserialize;
use serde_json::Value;

use super::{decode, op_return_payload, timestamp_from_secs, ProviderKind, Transaction, TransactionProvider};
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct WoleetTx {
    txid: String,
    #[serde(default)]
    confirmations: u64,
    blocktime: Option<i64>,
    blockhash: Option<String>,
    #[serde(default)]
    vout: Vec<Vout>,
}

#[derive(Debug, Deserialize)]
struct Vout {
    #[serde(rename = "scriptPubKey")]
    script_pub_key: Option<ScriptPubKey>,
}

#[derive(Debug, Deserialize)]
struct ScriptPubKey {
    asm: Option<String>,
}

pub struct WoleetProvider {
    api_url: String,
}

impl WoleetProvider {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

impl TransactionProvider for WoleetProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Woleet
    }

    fn transaction_url(&self, tx_id: &str) -> String {
        format!("{}/bitcoin/transaction/{}", self.api_url, tx_id)
    }

    fn normalize(&self, tx_id: &str, body: &Value) -> Result<Transaction> {
        let tx: WoleetTx = decode(tx_id, body)?;

        let op_return = tx
            .vout
            .iter()
            .filter_map(|out| out.script_pub_key.as_ref()?.asm.as_deref())
            .find_map(op_return_payload);

        Ok(Transaction {
            transaction_id: tx.txid,
            confirmations: tx.confirmations,
            timestamp: timestamp_from_secs(tx.blocktime),
            block_hash: tx.blockhash,
            op_return,
        })
    }
}
