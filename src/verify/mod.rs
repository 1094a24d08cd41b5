/// Verification orchestrator.
///
/// Two entry points:
///
/// ```text
/// verify_receipt:  hash? ─▶ validate ─▶ target/signature ─▶ transaction ─▶ OP_RETURN ─▶ identity?
/// verify_anchors:  hash ─▶ anchor ids ─▶ receipts (sequential) ─▶ verify each ─▶ sort by time
/// ```
///
/// A single receipt verification fails on the first error. Anchor
/// verification records per-receipt failures in each status and only fails
/// as a whole when the lookup itself does.
pub mod status;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

pub use status::{IdentityVerificationStatus, VerificationStatus, VERIFIED};

use crate::api::{AnchorApi, AnchorType};
use crate::config::Config;
use crate::crypto::hash::{hex_eq, is_sha256_hex, sha256_hex};
use crate::crypto::identity::validate_identity;
use crate::crypto::sign::validate_signature;
use crate::error::{Result, VerifyError};
use crate::hasher::{ContentSource, Hasher};
use crate::http::JsonClient;
use crate::provider::TransactionClient;
use crate::receipt::{self, Receipt, ReceiptSignature};

/// What to verify: raw content to be hashed, or a digest computed elsewhere.
#[derive(Debug, Clone)]
pub enum ContentOrHash {
    Content(ContentSource),
    Hash(String),
}

impl From<ContentSource> for ContentOrHash {
    fn from(source: ContentSource) -> Self {
        Self::Content(source)
    }
}

pub struct Verifier {
    http: Arc<dyn JsonClient>,
    transactions: TransactionClient,
    api: AnchorApi,
    hasher: Option<Hasher>,
}

impl Verifier {
    pub fn new(http: Arc<dyn JsonClient>, config: &Config) -> Self {
        Self {
            transactions: TransactionClient::new(http.clone(), config),
            api: AnchorApi::new(http.clone(), config),
            hasher: Some(Hasher::new(config.hasher.clone())),
            http,
        }
    }

    /// Replace the hasher; `None` restricts inputs to precomputed digests.
    pub fn with_hasher(mut self, hasher: Option<Hasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn hasher(&self) -> Option<&Hasher> {
        self.hasher.as_ref()
    }

    pub fn transactions_mut(&mut self) -> &mut TransactionClient {
        &mut self.transactions
    }

    pub fn api_mut(&mut self) -> &mut AnchorApi {
        &mut self.api
    }

    /// Digest of the input, lowercased.
    pub async fn resolve_hash(&self, input: ContentOrHash) -> Result<String> {
        match input {
            ContentOrHash::Hash(hash) => {
                if !is_sha256_hex(&hash) {
                    return Err(VerifyError::InvalidParameter(format!(
                        "{hash} is not a SHA-256 digest"
                    )));
                }
                Ok(hash.to_ascii_lowercase())
            }
            ContentOrHash::Content(source) => {
                let hasher = self.hasher.as_ref().ok_or(VerifyError::MissingHashDependency)?;
                hasher.hash(source).await
            }
        }
    }

    /// Verify one receipt, optionally against content or its digest.
    pub async fn verify_receipt(
        &self,
        input: Option<ContentOrHash>,
        receipt: &Value,
    ) -> Result<VerificationStatus> {
        let hash = match input {
            Some(input) => Some(self.resolve_hash(input).await?),
            None => None,
        };
        self.check(hash.as_deref(), receipt).await
    }

    /// Find every anchor of the input and verify each receipt.
    ///
    /// Receipts are fetched one at a time. Anchors still waiting for their
    /// transaction are dropped; any other fetch error fails the call. The
    /// result is sorted by transaction time, undated statuses last.
    pub async fn verify_anchors(&self, input: ContentOrHash) -> Result<Vec<VerificationStatus>> {
        let hash = self.resolve_hash(input).await?;
        let ids = self.api.anchor_ids(&hash, AnchorType::Both).await?;
        info!(hash = %hash, anchors = ids.len(), "Anchor lookup complete");
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut receipts = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.api.receipt(id).await {
                Ok(receipt) => receipts.push(receipt),
                Err(VerifyError::AnchorNotYetProcessed(_)) => {
                    debug!(anchor_id = %id, "Anchor not processed yet, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        if receipts.is_empty() {
            return Err(VerifyError::FileMatchedButAnchorNotYetProcessed);
        }

        let mut statuses = Vec::with_capacity(receipts.len());
        for raw in receipts {
            match self.check(Some(&hash), &raw).await {
                Ok(status) => statuses.push(status),
                Err(e) => {
                    warn!(hash = %hash, error = %e, "Receipt failed verification");
                    statuses.push(VerificationStatus::failed(raw, e.code()));
                }
            }
        }

        statuses.sort_by(status::by_timestamp);
        info!(
            hash = %hash,
            receipts = statuses.len(),
            verified = statuses.iter().filter(|s| s.is_verified()).count(),
            "Anchor verification complete"
        );
        Ok(statuses)
    }

    async fn check(&self, hash: Option<&str>, raw: &Value) -> Result<VerificationStatus> {
        let receipt = receipt::validate(raw)?;

        match receipt.signature() {
            Some(signature) => check_signed_hashes(&receipt, signature, hash)?,
            None => {
                if let Some(hash) = hash {
                    if !hex_eq(hash, receipt.target_hash()) {
                        return Err(VerifyError::TargetHashMismatch);
                    }
                }
            }
        }

        let tx_id = receipt.transaction_id()?;
        let tx = self.transactions.get(tx_id).await?;
        match tx.op_return.as_deref() {
            Some(payload) if hex_eq(payload, receipt.merkle_root()) => {}
            _ => return Err(VerifyError::OpReturnMismatchesMerkleRoot),
        }

        let mut status = VerificationStatus::verified(raw.clone(), &tx);
        if let Some(signature) = receipt.signature() {
            let check = validate_signature(&signature.signed_hash, &signature.pub_key, &signature.signature);
            if !check.valid {
                return Err(VerifyError::InvalidReceiptSignature(
                    check.reason.unwrap_or_default(),
                ));
            }
            if let Some(identity_url) = &signature.identity_url {
                let check = validate_identity(
                    self.http.as_ref(),
                    identity_url,
                    &signature.pub_key,
                    signature.signed_identity.as_deref(),
                    signature.signed_issuer_domain.as_deref(),
                )
                .await;
                status.identity_verification_status = Some(check.into());
            }
        }

        info!(tx_id = %tx_id, confirmations = tx.confirmations, "Receipt verified");
        Ok(status)
    }
}

/// A signed receipt anchors the signature: its target is the SHA-256 of the
/// signature string, and the content digest is the signed hash. The
/// signature itself is checked once the anchor is confirmed on chain.
fn check_signed_hashes(receipt: &Receipt, signature: &ReceiptSignature, hash: Option<&str>) -> Result<()> {
    if !hex_eq(receipt.target_hash(), &sha256_hex(&signature.signature)) {
        return Err(VerifyError::TargetHashMismatch);
    }
    if let Some(hash) = hash {
        if !hex_eq(hash, &signature.signed_hash) {
            return Err(VerifyError::TargetHashMismatch);
        }
    }
    Ok(())
}
