/// Anchoring receipts (Chainpoint v1 and v2) and their validation.
///
/// A receipt links a target digest to a Merkle root through an inclusion
/// proof; the root is committed on-chain in an OP_RETURN output of the
/// referenced transaction.
///
/// Validation is two-phase:
/// 1. `Receipt::parse` recognizes the version and gates on structure:
///    required fields, proof element shape, then proof element hex length.
///    Nothing cryptographic runs on a structurally invalid receipt.
/// 2. `Receipt::validate` folds the Merkle proof and compares it to the root.
pub mod signature;
pub mod v1;
pub mod v2;

#[cfg(test)]
pub(crate) mod fixtures;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

pub use signature::ReceiptSignature;
pub use v1::ReceiptV1;
pub use v2::ReceiptV2;

use crate::crypto::hash::{is_hex_of_len, HashAlgorithm};
use crate::error::{Result, VerifyError};
use crate::merkle::MerkleProof;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Receipt {
    V1(ReceiptV1),
    V2(ReceiptV2),
}

impl Receipt {
    /// Recognize the receipt version and check its structure.
    pub fn parse(value: &Value) -> Result<Self> {
        let obj = object(value, "receipt")?;
        if obj.contains_key("header") {
            ReceiptV1::parse(value).map(Self::V1)
        } else if obj.contains_key("type") {
            ReceiptV2::parse(value).map(Self::V2)
        } else {
            Err(VerifyError::InvalidReceiptFormat(
                "neither a v1 header nor a v2 type".into(),
            ))
        }
    }

    /// Parse from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| VerifyError::InvalidReceiptFormat(format!("not JSON: {e}")))?;
        Self::parse(&value)
    }

    /// Check that the embedded Merkle proof resolves to the declared root.
    pub fn validate(&self) -> Result<()> {
        self.proof().verify(self.merkle_root())
    }

    pub fn version(&self) -> u8 {
        match self {
            Self::V1(_) => 1,
            Self::V2(_) => 2,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Self::V1(_) => ReceiptV1::ALGORITHM,
            Self::V2(r) => r.algorithm,
        }
    }

    pub fn target_hash(&self) -> &str {
        match self {
            Self::V1(r) => &r.target.target_hash,
            Self::V2(r) => &r.target_hash,
        }
    }

    pub fn merkle_root(&self) -> &str {
        match self {
            Self::V1(r) => &r.header.merkle_root,
            Self::V2(r) => &r.merkle_root,
        }
    }

    /// Id of the Bitcoin transaction carrying the root.
    pub fn transaction_id(&self) -> Result<&str> {
        match self {
            Self::V1(r) => Ok(&r.header.tx_id),
            Self::V2(r) => r.bitcoin_anchor().ok_or_else(|| {
                VerifyError::InvalidReceiptFormat(format!("no {} anchor", v2::BTC_OP_RETURN))
            }),
        }
    }

    pub fn signature(&self) -> Option<&ReceiptSignature> {
        match self {
            Self::V1(r) => r.signature.as_ref(),
            Self::V2(r) => r.signature.as_ref(),
        }
    }

    /// Issuance time declared by the receipt itself (v1 only).
    pub fn declared_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::V1(r) => DateTime::from_timestamp(r.header.timestamp, 0),
            Self::V2(_) => None,
        }
    }

    pub fn proof(&self) -> MerkleProof {
        match self {
            Self::V1(r) => r.proof(),
            Self::V2(r) => r.proof(),
        }
    }
}

/// Parse and validate in one step.
pub fn validate(value: &Value) -> Result<Receipt> {
    let receipt = Receipt::parse(value)?;
    receipt.validate()?;
    Ok(receipt)
}

pub(crate) fn object<'a>(value: &'a Value, ctx: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| VerifyError::InvalidReceiptFormat(format!("{ctx} must be an object")))
}

pub(crate) fn string<'a>(obj: &'a Map<String, Value>, key: &str, ctx: &str) -> Result<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| VerifyError::InvalidReceiptFormat(format!("{ctx}.{key} must be a string")))
}

/// A digest field, case-folded to lowercase.
pub(crate) fn hex_field(
    obj: &Map<String, Value>,
    key: &str,
    algorithm: HashAlgorithm,
    ctx: &str,
) -> Result<String> {
    let value = string(obj, key, ctx)?;
    if !is_hex_of_len(value, algorithm.hex_len()) {
        return Err(VerifyError::InvalidReceiptFormat(format!(
            "{ctx}.{key} is not a {} digest",
            algorithm.name()
        )));
    }
    Ok(value.to_ascii_lowercase())
}
