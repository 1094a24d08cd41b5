/// Chainpoint v1 receipts.
///
/// ```text
/// { header: { chainpoint_version, hash_type: "SHA-256", merkle_root, tx_id, timestamp },
///   target: { target_hash, target_proof: [{ left, right, parent }] },
///   signature?, extra? }
/// ```
///
/// Parents are SHA-256 over the UTF-8 concatenation of the two hex strings.
use serde::Serialize;
use serde_json::Value;

use super::signature::ReceiptSignature;
use super::{hex_field, object, string};
use crate::crypto::hash::{is_hex_of_len, HashAlgorithm};
use crate::error::{Result, VerifyError};
use crate::merkle::{MerkleProof, NodeEncoding, ProofStep};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderV1 {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chainpoint_version: Option<String>,
    pub hash_type: String,
    pub merkle_root: String,
    pub tx_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchV1 {
    pub left: String,
    pub right: String,
    pub parent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetV1 {
    pub target_hash: String,
    pub target_proof: Vec<BranchV1>,
    #[serde(rename = "target_URI", skip_serializing_if = "Option::is_none")]
    pub target_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptV1 {
    pub header: HeaderV1,
    pub target: TargetV1,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<ReceiptSignature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl ReceiptV1 {
    pub const ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

    pub(crate) fn parse(value: &Value) -> Result<Self> {
        let root = object(value, "receipt")?;
        let header = object(
            root.get("header").unwrap_or(&Value::Null),
            "header",
        )?;
        let target = object(
            root.get("target").unwrap_or(&Value::Null),
            "target",
        )?;

        let hash_type = string(header, "hash_type", "header")?;
        if hash_type != "SHA-256" {
            return Err(VerifyError::InvalidReceiptFormat(format!(
                "header.hash_type must be SHA-256, got {hash_type}"
            )));
        }
        let merkle_root = hex_field(header, "merkle_root", Self::ALGORITHM, "header")?;
        let tx_id = string(header, "tx_id", "header")?.to_string();
        let timestamp = header
            .get("timestamp")
            .and_then(Value::as_i64)
            .ok_or_else(|| VerifyError::InvalidReceiptFormat("header.timestamp must be an integer".into()))?;
        let chainpoint_version = header
            .get("chainpoint_version")
            .and_then(Value::as_str)
            .map(str::to_string);

        let target_hash = hex_field(target, "target_hash", Self::ALGORITHM, "target")?;
        let target_uri = target
            .get("target_URI")
            .and_then(Value::as_str)
            .map(str::to_string);
        let raw_proof = target
            .get("target_proof")
            .and_then(Value::as_array)
            .ok_or_else(|| VerifyError::InvalidReceiptFormat("target.target_proof must be an array".into()))?;

        // Shape of every element first, then hex content.
        let mut shaped = Vec::with_capacity(raw_proof.len());
        for (i, element) in raw_proof.iter().enumerate() {
            let branch = element.as_object().ok_or(VerifyError::InvalidTargetProof(i))?;
            let side = |key: &str| {
                branch
                    .get(key)
                    .and_then(Value::as_str)
                    .ok_or(VerifyError::InvalidTargetProof(i))
            };
            shaped.push((side("left")?, side("right")?, side("parent")?));
        }

        let len = Self::ALGORITHM.hex_len();
        let mut target_proof = Vec::with_capacity(shaped.len());
        for (i, (left, right, parent)) in shaped.into_iter().enumerate() {
            if ![left, right, parent].iter().all(|h| is_hex_of_len(h, len)) {
                return Err(VerifyError::NonSha256TargetProofElement(i));
            }
            target_proof.push(BranchV1 {
                left: left.to_ascii_lowercase(),
                right: right.to_ascii_lowercase(),
                parent: parent.to_ascii_lowercase(),
            });
        }

        let signature = match root.get("signature") {
            None | Some(Value::Null) => None,
            Some(sig) => Some(ReceiptSignature::parse(sig)?),
        };

        Ok(Self {
            header: HeaderV1 {
                chainpoint_version,
                hash_type: hash_type.to_string(),
                merkle_root,
                tx_id,
                timestamp,
            },
            target: TargetV1 {
                target_hash,
                target_proof,
                target_uri,
            },
            signature,
            extra: root.get("extra").cloned(),
        })
    }

    pub fn proof(&self) -> MerkleProof {
        let mut proof = MerkleProof::new(
            self.target.target_hash.clone(),
            Self::ALGORITHM,
            NodeEncoding::HexText,
        );
        for branch in &self.target.target_proof {
            proof.push(ProofStep::Full {
                left: branch.left.clone(),
                right: branch.right.clone(),
                parent: branch.parent.clone(),
            });
        }
        proof
    }
}
