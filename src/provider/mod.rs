/// Blockchain data providers.
///
/// Each provider exposes Bitcoin transactions through its own JSON schema.
/// A `TransactionProvider` knows where to fetch a transaction and how to
/// normalize the response into a `Transaction`; `TransactionClient` does the
/// fetching and dispatches on the configured provider.
///
/// Supported providers:
/// - `woleet`: bitcoind-style `vout[].scriptPubKey.asm` (default)
/// - `chainso`: raw `outputs[].script` strings
/// - `blockcypher`: decoded `outputs[].data_hex`
pub mod blockcypher;
pub mod chainso;
pub mod woleet;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, VerifyError};
use crate::http::{JsonClient, RequestOptions};

/// A transaction normalized across providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: String,
    pub confirmations: u64,
    /// Block time; `None` when unconfirmed or unparseable.
    pub timestamp: Option<DateTime<Utc>>,
    pub block_hash: Option<String>,
    /// Payload of the OP_RETURN output; `None` when the transaction has none.
    pub op_return: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Woleet,
    Chainso,
    Blockcypher,
}

impl ProviderKind {
    /// Resolve a provider name, falling back to the default when unknown.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "woleet" | "woleet.io" => Self::Woleet,
            "chainso" | "chain.so" => Self::Chainso,
            "blockcypher" | "blockcypher.com" => Self::Blockcypher,
            other => {
                warn!(provider = %other, "Unknown transaction provider, using default");
                Self::default()
            }
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Woleet => "woleet",
            Self::Chainso => "chainso",
            Self::Blockcypher => "blockcypher",
        })
    }
}

/// One provider's URL scheme and response schema.
pub trait TransactionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Endpoint returning the transaction as JSON.
    fn transaction_url(&self, tx_id: &str) -> String;

    /// Normalize a provider response. Provider-level "not found" markers
    /// must surface as `TxNotFound`.
    fn normalize(&self, tx_id: &str, body: &Value) -> Result<Transaction>;
}

/// Fetches transactions through the selected provider.
pub struct TransactionClient {
    http: Arc<dyn JsonClient>,
    default_provider: ProviderKind,
    woleet: woleet::WoleetProvider,
    chainso: chainso::ChainsoProvider,
    blockcypher: blockcypher::BlockcypherProvider,
}

impl TransactionClient {
    pub fn new(http: Arc<dyn JsonClient>, config: &Config) -> Self {
        Self {
            http,
            default_provider: config.provider,
            woleet: woleet::WoleetProvider::new(&config.api_url),
            chainso: chainso::ChainsoProvider::new(&config.chainso_url),
            blockcypher: blockcypher::BlockcypherProvider::new(&config.blockcypher_url),
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.default_provider
    }

    /// Change the default provider used by `get`.
    pub fn set_provider(&mut self, kind: ProviderKind) {
        info!(provider = %kind, "Default transaction provider changed");
        self.default_provider = kind;
    }

    fn resolve(&self, kind: ProviderKind) -> &dyn TransactionProvider {
        match kind {
            ProviderKind::Woleet => &self.woleet,
            ProviderKind::Chainso => &self.chainso,
            ProviderKind::Blockcypher => &self.blockcypher,
        }
    }

    /// Fetch a transaction from the default provider.
    pub async fn get(&self, tx_id: &str) -> Result<Transaction> {
        self.get_with(tx_id, self.default_provider).await
    }

    /// Fetch a transaction from a specific provider.
    pub async fn get_with(&self, tx_id: &str, kind: ProviderKind) -> Result<Transaction> {
        let provider = self.resolve(kind);
        let url = provider.transaction_url(tx_id);
        info!(provider = %provider.kind(), tx_id = %tx_id, "Fetching transaction");

        let body = self
            .http
            .request(&url, RequestOptions::get())
            .await?
            .ok_or_else(|| VerifyError::TxNotFound(tx_id.to_string()))?;

        provider.normalize(tx_id, &body)
    }
}

/// Decode a provider response. A body that does not have the provider's
/// transaction shape is treated as an unknown transaction.
pub(crate) fn decode<T: DeserializeOwned>(tx_id: &str, body: &Value) -> Result<T> {
    T::deserialize(body).map_err(|e| {
        debug!(tx_id = %tx_id, error = %e, "Unexpected transaction response");
        VerifyError::TxNotFound(tx_id.to_string())
    })
}

/// Block time from Unix seconds; out-of-range values become `None`.
pub(crate) fn timestamp_from_secs(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Token following an `OP_RETURN` mnemonic in a space-separated script.
pub(crate) fn op_return_payload(script: &str) -> Option<String> {
    let mut tokens = script.split_whitespace();
    if tokens.next()? != "OP_RETURN" {
        return None;
    }
    tokens.next().map(str::to_ascii_lowercase)
}
