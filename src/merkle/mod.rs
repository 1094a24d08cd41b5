/// Merkle inclusion proofs as carried by anchoring receipts.
pub mod proof;

pub use proof::{MerkleProof, NodeEncoding, Position, ProofStep};
