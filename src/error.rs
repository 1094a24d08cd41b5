use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Receipt does not match any known format: {0}")]
    InvalidReceiptFormat(String),

    #[error("Malformed target proof element at index {0}")]
    InvalidTargetProof(usize),

    #[error("Target proof element at index {0} is not a valid hash")]
    NonSha256TargetProofElement(usize),

    #[error("Declared parent of proof element {0} does not match its children")]
    InvalidParentInProofElement(usize),

    #[error("Merkle proof does not resolve to the declared root")]
    MerkleRootMismatch,

    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Unknown receipt type: {0}")]
    InvalidType(String),

    #[error("Transaction not found: {0}")]
    TxNotFound(String),

    #[error("Content hash does not match receipt target hash")]
    TargetHashMismatch,

    #[error("OP_RETURN payload does not match receipt Merkle root")]
    OpReturnMismatchesMerkleRoot,

    #[error("Matching anchors exist but none has been processed yet")]
    FileMatchedButAnchorNotYetProcessed,

    #[error("Anchor {0} is not processed yet")]
    AnchorNotYetProcessed(String),

    #[error("Anchor not found: {0}")]
    AnchorNotFound(String),

    #[error("Malformed receipt signature: {0}")]
    InvalidReceiptSignatureFormat(String),

    #[error("Receipt signature verification failed: {0}")]
    InvalidReceiptSignature(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Hasher is busy with another job")]
    NotReady,

    #[error("Raw content supplied but no hasher is configured")]
    MissingHashDependency,

    #[error("Content of {size} bytes is too big to be hashed without a worker")]
    FileTooBigToBeHashedWithoutWorker { size: u64 },

    #[error("Hashing of {0} was cancelled or skipped")]
    HashingAborted(String),

    #[error("Server response violates protocol: {0}")]
    BadServerResponse(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VerifyError {
    /// Stable snake_case kind reported in verification statuses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidReceiptFormat(_) => "invalid_receipt_format",
            Self::InvalidTargetProof(_) => "invalid_target_proof",
            Self::NonSha256TargetProofElement(_) => "non_sha256_target_proof_element",
            Self::InvalidParentInProofElement(_) => "invalid_parent_in_proof_element",
            Self::MerkleRootMismatch => "merkle_root_mismatch",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::InvalidType(_) => "invalid_type",
            Self::TxNotFound(_) => "tx_not_found",
            Self::TargetHashMismatch => "target_hash_mismatch",
            Self::OpReturnMismatchesMerkleRoot => "op_return_mismatches_merkle_root",
            Self::FileMatchedButAnchorNotYetProcessed => {
                "file_matched_but_anchor_not_yet_processed"
            }
            Self::AnchorNotYetProcessed(_) => "anchor_not_yet_processed",
            Self::AnchorNotFound(_) => "anchor_not_found",
            Self::InvalidReceiptSignatureFormat(_) => "invalid_receipt_signature_format",
            Self::InvalidReceiptSignature(_) => "invalid_receipt_signature",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::NotReady => "not_ready",
            Self::MissingHashDependency => "missing_hash_dependency",
            Self::FileTooBigToBeHashedWithoutWorker { .. } => {
                "file_too_big_to_be_hashed_without_worker"
            }
            Self::HashingAborted(_) => "hashing_aborted",
            Self::BadServerResponse(_) => "bad_server_response",
            Self::Http { .. } => "http_error",
            Self::Network(_) => "network_error",
            Self::Serialization(_) => "serialization_error",
            Self::Io(_) => "io_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;
