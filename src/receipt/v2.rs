/// Chainpoint v2 receipts.
///
/// ```text
/// { "@context", type: "ChainpointSHA256v2", targetHash, merkleRoot,
///   proof: [{ left } | { right }], anchors: [{ type, sourceId }], signature? }
/// ```
///
/// The hash algorithm is encoded in `type`; parents hash the decoded bytes
/// of the two children.
use serde::Serialize;
use serde_json::Value;

use super::signature::ReceiptSignature;
use super::{hex_field, object, string};
use crate::crypto::hash::{is_hex_of_len, HashAlgorithm};
use crate::error::{Result, VerifyError};
use crate::merkle::{MerkleProof, NodeEncoding, Position, ProofStep};

/// Anchor type carrying a Bitcoin OP_RETURN commitment.
pub const BTC_OP_RETURN: &str = "BTCOpReturn";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HalfBranch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorRef {
    #[serde(rename = "type")]
    pub anchor_type: String,
    #[serde(rename = "sourceId")]
    pub source_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptV2 {
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(rename = "type")]
    pub receipt_type: String,
    #[serde(skip)]
    pub algorithm: HashAlgorithm,
    pub target_hash: String,
    pub merkle_root: String,
    pub proof: Vec<HalfBranch>,
    pub anchors: Vec<AnchorRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<ReceiptSignature>,
}

/// Map a v2 `type` string to its hash algorithm.
pub fn algorithm_for_type(receipt_type: &str) -> Result<HashAlgorithm> {
    let family = receipt_type
        .strip_prefix("Chainpoint")
        .and_then(|t| t.strip_suffix("v2"))
        .ok_or_else(|| VerifyError::InvalidType(receipt_type.to_string()))?;

    match family {
        "SHA224" => Ok(HashAlgorithm::Sha224),
        "SHA256" => Ok(HashAlgorithm::Sha256),
        "SHA384" => Ok(HashAlgorithm::Sha384),
        "SHA512" => Ok(HashAlgorithm::Sha512),
        "SHA3-224" | "SHA3-256" | "SHA3-384" | "SHA3-512" => {
            Err(VerifyError::UnsupportedAlgorithm(family.to_string()))
        }
        _ => Err(VerifyError::InvalidType(receipt_type.to_string())),
    }
}

impl ReceiptV2 {
    pub(crate) fn parse(value: &Value) -> Result<Self> {
        let root = object(value, "receipt")?;

        let receipt_type = string(root, "type", "receipt")?;
        if !root.get("targetHash").is_some_and(Value::is_string)
            || !root.get("merkleRoot").is_some_and(Value::is_string)
        {
            return Err(VerifyError::InvalidReceiptFormat(
                "targetHash and merkleRoot must be strings".into(),
            ));
        }
        let raw_proof = root
            .get("proof")
            .and_then(Value::as_array)
            .ok_or_else(|| VerifyError::InvalidReceiptFormat("proof must be an array".into()))?;
        let raw_anchors = root
            .get("anchors")
            .and_then(Value::as_array)
            .ok_or_else(|| VerifyError::InvalidReceiptFormat("anchors must be an array".into()))?;

        let algorithm = algorithm_for_type(receipt_type)?;
        let target_hash = hex_field(root, "targetHash", algorithm, "receipt")?;
        let merkle_root = hex_field(root, "merkleRoot", algorithm, "receipt")?;

        let mut anchors = Vec::with_capacity(raw_anchors.len());
        for anchor in raw_anchors {
            let anchor = object(anchor, "anchor")?;
            anchors.push(AnchorRef {
                anchor_type: string(anchor, "type", "anchor")?.to_string(),
                source_id: string(anchor, "sourceId", "anchor")?.to_string(),
            });
        }

        let mut sides = Vec::with_capacity(raw_proof.len());
        for (i, element) in raw_proof.iter().enumerate() {
            let branch = element.as_object().ok_or(VerifyError::InvalidTargetProof(i))?;
            let left = branch.get("left").map(|v| v.as_str().ok_or(VerifyError::InvalidTargetProof(i)));
            let right = branch.get("right").map(|v| v.as_str().ok_or(VerifyError::InvalidTargetProof(i)));
            match (left, right) {
                (Some(l), None) => sides.push((Position::Left, l?)),
                (None, Some(r)) => sides.push((Position::Right, r?)),
                _ => return Err(VerifyError::InvalidTargetProof(i)),
            }
        }

        let mut proof = Vec::with_capacity(sides.len());
        for (i, (position, sibling)) in sides.into_iter().enumerate() {
            if !is_hex_of_len(sibling, algorithm.hex_len()) {
                return Err(VerifyError::NonSha256TargetProofElement(i));
            }
            let sibling = Some(sibling.to_ascii_lowercase());
            proof.push(match position {
                Position::Left => HalfBranch { left: sibling, right: None },
                Position::Right => HalfBranch { left: None, right: sibling },
            });
        }

        let signature = match root.get("signature") {
            None | Some(Value::Null) => None,
            Some(sig) => Some(ReceiptSignature::parse(sig)?),
        };

        Ok(Self {
            context: root.get("@context").cloned(),
            receipt_type: receipt_type.to_string(),
            algorithm,
            target_hash,
            merkle_root,
            proof,
            anchors,
            signature,
        })
    }

    /// Transaction id of the first Bitcoin OP_RETURN anchor.
    pub fn bitcoin_anchor(&self) -> Option<&str> {
        self.anchors
            .iter()
            .find(|a| a.anchor_type == BTC_OP_RETURN)
            .map(|a| a.source_id.as_str())
    }

    pub fn proof(&self) -> MerkleProof {
        let mut proof = MerkleProof::new(self.target_hash.clone(), self.algorithm, NodeEncoding::Bytes);
        for branch in &self.proof {
            let step = match (&branch.left, &branch.right) {
                (Some(sibling), _) => ProofStep::Half {
                    position: Position::Left,
                    sibling: sibling.clone(),
                },
                (None, Some(sibling)) => ProofStep::Half {
                    position: Position::Right,
                    sibling: sibling.clone(),
                },
                // Unreachable after parse; an empty step contributes nothing.
                (None, None) => continue,
            };
            proof.push(step);
        }
        proof
    }
}
