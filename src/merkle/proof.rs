/// Merkle inclusion proof folding.
///
/// A proof starts from a target digest and applies one step per branch. Two
/// step shapes exist:
/// - `Full`: both children and the declared parent are given (Chainpoint v1).
///   The running accumulator must be one of the children.
/// - `Half`: only the sibling is given, the accumulator fills the other side
///   (Chainpoint v2).
///
/// All digests are lowercase hex; callers fold case before building a proof.
use serde::{Deserialize, Serialize};

use crate::crypto::hash::{hex_eq, HashAlgorithm};
use crate::error::{Result, VerifyError};

/// Position of a sibling relative to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    Left,
    Right,
}

/// How two child digests are combined before hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEncoding {
    /// Hash the UTF-8 concatenation of the two hex strings.
    HexText,
    /// Hash the concatenation of the hex-decoded bytes.
    Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofStep {
    Full {
        left: String,
        right: String,
        parent: String,
    },
    Half {
        position: Position,
        sibling: String,
    },
}

/// A Merkle inclusion proof for a single target digest.
#[derive(Debug, Clone)]
pub struct MerkleProof {
    target: String,
    algorithm: HashAlgorithm,
    encoding: NodeEncoding,
    steps: Vec<ProofStep>,
}

impl MerkleProof {
    pub fn new(target: impl Into<String>, algorithm: HashAlgorithm, encoding: NodeEncoding) -> Self {
        Self {
            target: target.into(),
            algorithm,
            encoding,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: ProofStep) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Combine two children into their parent digest.
    pub fn node_hash(&self, index: usize, left: &str, right: &str) -> Result<String> {
        match self.encoding {
            NodeEncoding::HexText => {
                let mut joined = String::with_capacity(left.len() + right.len());
                joined.push_str(left);
                joined.push_str(right);
                Ok(self.algorithm.digest_hex(joined.as_bytes()))
            }
            NodeEncoding::Bytes => {
                let l = hex::decode(left).map_err(|_| VerifyError::NonSha256TargetProofElement(index))?;
                let r = hex::decode(right).map_err(|_| VerifyError::NonSha256TargetProofElement(index))?;
                let mut digester = self.algorithm.digester();
                digester.update(&l).update(&r);
                Ok(digester.finalize_hex())
            }
        }
    }

    /// Fold every step starting from the target and return the final accumulator.
    ///
    /// Recomputed parents are returned alongside so declared parents can be
    /// checked once the fold is known to reach a root.
    fn fold(&self) -> Result<(String, Vec<String>)> {
        let mut acc = self.target.clone();
        let mut recomputed = Vec::with_capacity(self.steps.len());

        for (i, step) in self.steps.iter().enumerate() {
            acc = match step {
                ProofStep::Full { left, right, .. } => {
                    if !hex_eq(left, &acc) && !hex_eq(right, &acc) {
                        return Err(VerifyError::MerkleRootMismatch);
                    }
                    self.node_hash(i, left, right)?
                }
                ProofStep::Half {
                    position: Position::Left,
                    sibling,
                } => self.node_hash(i, sibling, &acc)?,
                ProofStep::Half {
                    position: Position::Right,
                    sibling,
                } => self.node_hash(i, &acc, sibling)?,
            };
            recomputed.push(acc.clone());
        }

        Ok((acc, recomputed))
    }

    /// Root this proof resolves to, ignoring declared parents.
    pub fn resolve(&self) -> Result<String> {
        self.fold().map(|(root, _)| root)
    }

    /// Verify the proof against a declared root.
    ///
    /// An empty proof is valid iff the target is the root. Reaching the
    /// root is checked before declared parents, so a tampered child reports
    /// `MerkleRootMismatch` while a forged parent on an otherwise valid path
    /// reports `InvalidParentInProofElement`.
    pub fn verify(&self, root: &str) -> Result<()> {
        let (resolved, recomputed) = self.fold()?;
        if !hex_eq(&resolved, root) {
            return Err(VerifyError::MerkleRootMismatch);
        }

        for (i, (step, computed)) in self.steps.iter().zip(&recomputed).enumerate() {
            if let ProofStep::Full { parent, .. } = step {
                if !hex_eq(parent, computed) {
                    return Err(VerifyError::InvalidParentInProofElement(i));
                }
            }
        }

        Ok(())
    }
}
