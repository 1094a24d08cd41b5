/// Runtime configuration.
///
/// Built once at the composition root (CLI or embedding application) and
/// handed to the API client, the transaction client and the hasher. Nothing
/// below the root reads the environment.
use tracing::warn;

use crate::crypto::hash::HashAlgorithm;
use crate::provider::ProviderKind;

pub const DEFAULT_API_URL: &str = "https://api.woleet.io/v1";
pub const DEFAULT_CHAINSO_URL: &str = "https://chain.so/api/v2";
pub const DEFAULT_BLOCKCYPHER_URL: &str = "https://api.blockcypher.com/v1/btc/main";

/// Configuration for content hashing.
#[derive(Debug, Clone)]
pub struct HasherConfig {
    /// Digest algorithm applied to content.
    pub algorithm: HashAlgorithm,
    /// Bytes read per step of a streaming strategy.
    pub chunk_size: usize,
    /// Largest content the single-shot strategy accepts (it buffers everything).
    pub native_max_size: u64,
    /// Largest content hashed on the calling task when no worker is available.
    pub sync_max_size: u64,
    pub native_enabled: bool,
    pub worker_enabled: bool,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            chunk_size: 1024 * 1024,                // 1 MiB
            native_max_size: 512 * 1024 * 1024,     // 512 MiB
            sync_max_size: 500_000_000,
            native_enabled: true,
            worker_enabled: true,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the anchor API (anchor lookup, receipts, woleet provider).
    pub api_url: String,
    /// Optional bearer token sent to the anchor API.
    pub api_token: Option<String>,
    /// Default transaction provider.
    pub provider: ProviderKind,
    pub chainso_url: String,
    pub blockcypher_url: String,
    pub hasher: HasherConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            provider: ProviderKind::default(),
            chainso_url: DEFAULT_CHAINSO_URL.to_string(),
            blockcypher_url: DEFAULT_BLOCKCYPHER_URL.to_string(),
            hasher: HasherConfig::default(),
        }
    }
}

impl Config {
    /// Defaults overlaid with `ANCHOR_API_URL`, `ANCHOR_API_TOKEN` and `ANCHOR_TX_PROVIDER`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("ANCHOR_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(token) = lookup("ANCHOR_API_TOKEN").filter(|t| !t.is_empty()) {
            config.api_token = Some(token);
        }
        if let Some(name) = lookup("ANCHOR_TX_PROVIDER") {
            config.provider = ProviderKind::from_name(&name);
        }
        if let Some(size) = lookup("ANCHOR_HASH_CHUNK_SIZE") {
            match size.parse::<usize>() {
                Ok(n) if n > 0 => config.hasher.chunk_size = n,
                _ => warn!(value = %size, "Ignoring invalid ANCHOR_HASH_CHUNK_SIZE"),
            }
        }
        config
    }
}
