use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

use anchor_verify::config::Config;
use anchor_verify::crypto::hash::is_sha256_hex;
use anchor_verify::error::{Result, VerifyError};
use anchor_verify::hasher::{ContentSource, EventKind, HashOutcome, Hasher, HasherEvent};
use anchor_verify::http::ReqwestClient;
use anchor_verify::provider::{ProviderKind, TransactionClient};
use anchor_verify::receipt;
use anchor_verify::verify::{ContentOrHash, Verifier};

#[derive(Parser)]
#[command(name = "anchor-verify")]
#[command(about = "Verify blockchain-anchored proofs of existence")]
#[command(version)]
struct Cli {
    /// Anchor API base URL (overrides ANCHOR_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Transaction provider: woleet, chainso or blockcypher (overrides ANCHOR_TX_PROVIDER)
    #[arg(long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash files in order, reporting progress on stderr
    Hash {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Validate a receipt's Merkle proof offline
    Validate { receipt: PathBuf },
    /// Fetch and normalize a Bitcoin transaction
    Tx { tx_id: String },
    /// Verify a file or SHA-256 digest, against one receipt or every known anchor
    Verify {
        /// File path or hex digest
        target: String,
        /// Receipt to verify against; without it all anchors of the target are looked up
        #[arg(long)]
        receipt: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(url) = &cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(name) = &cli.provider {
        config.provider = ProviderKind::from_name(name);
    }

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = e.code(), "{e}");
            eprintln!("{}: {e}", e.code());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Hash { files } => {
            let hasher = Hasher::new(config.hasher.clone());
            hasher.on(EventKind::Progress, |event| {
                if let HasherEvent::Progress { progress, file } = event {
                    eprintln!("{file}: {:>3.0}%", progress * 100.0);
                }
            });
            hasher.on(EventKind::Error, |event| {
                if let HasherEvent::Error { error, file, .. } = event {
                    eprintln!("{file}: {error}");
                }
            });

            let sources = files.iter().map(ContentSource::file).collect();
            let outcomes = hasher.start(sources).await?;
            let report: Vec<HashReport> = outcomes.into_iter().map(HashReport::from).collect();
            print_json(&report)
        }
        Commands::Validate { receipt: path } => {
            let text = tokio::fs::read_to_string(&path).await?;
            let parsed = receipt::Receipt::from_json(&text)?;
            parsed.validate()?;
            print_json(&serde_json::json!({
                "code": "verified",
                "version": parsed.version(),
                "targetHash": parsed.target_hash(),
                "merkleRoot": parsed.merkle_root(),
            }))
        }
        Commands::Tx { tx_id } => {
            let client = TransactionClient::new(Arc::new(ReqwestClient::new()), config);
            print_json(&client.get(&tx_id).await?)
        }
        Commands::Verify { target, receipt } => {
            let verifier = Verifier::new(Arc::new(ReqwestClient::new()), config);
            let input = if is_sha256_hex(&target) {
                ContentOrHash::Hash(target)
            } else {
                ContentOrHash::Content(ContentSource::file(&target))
            };
            match receipt {
                Some(path) => {
                    let text = tokio::fs::read_to_string(&path).await?;
                    let value: serde_json::Value = serde_json::from_str(&text)
                        .map_err(|e| VerifyError::InvalidReceiptFormat(format!("not JSON: {e}")))?;
                    print_json(&verifier.verify_receipt(Some(input), &value).await?)
                }
                None => print_json(&verifier.verify_anchors(input).await?),
            }
        }
    }
}

#[derive(Serialize)]
struct HashReport {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<HashOutcome> for HashReport {
    fn from(outcome: HashOutcome) -> Self {
        let (file, digest, status, error) = match outcome {
            HashOutcome::Completed { file, digest } => (file, Some(digest), "completed", None),
            HashOutcome::Cancelled { file } => (file, None, "cancelled", None),
            HashOutcome::Skipped { file } => (file, None, "skipped", None),
            HashOutcome::Failed { file, error } => {
                (file, None, "failed", Some(error.code().to_string()))
            }
        };
        Self {
            file,
            digest,
            status,
            error,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| VerifyError::Serialization(e.to_string()))?;
    println!("{text}");
    Ok(())
}
