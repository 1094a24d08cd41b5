/// SHA-2 hashing utilities.
///
/// Every digest in this crate is handled as a lowercase hex string, which is
/// how receipts, anchor APIs and transaction providers exchange them.
/// `HashAlgorithm` is the single table mapping an algorithm tag to its digest
/// function and expected hex length.
use serde::{Deserialize, Serialize};
use sha2::digest::DynDigest;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Length of a hex-encoded digest for this algorithm.
    pub fn hex_len(self) -> usize {
        match self {
            Self::Sha224 => 56,
            Self::Sha256 => 64,
            Self::Sha384 => 96,
            Self::Sha512 => 128,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Look up an algorithm by its collaborator name (`sha224|sha256|sha384|sha512`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('-', "").as_str() {
            "sha224" => Some(Self::Sha224),
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Single-shot digest, hex encoded.
    pub fn digest_hex(self, data: &[u8]) -> String {
        match self {
            Self::Sha224 => hex::encode(Sha224::digest(data)),
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Sha384 => hex::encode(Sha384::digest(data)),
            Self::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }

    /// Fresh incremental hashing state.
    pub fn digester(self) -> Digester {
        let inner: Box<dyn DynDigest + Send> = match self {
            Self::Sha224 => Box::new(Sha224::new()),
            Self::Sha256 => Box::new(Sha256::new()),
            Self::Sha384 => Box::new(Sha384::new()),
            Self::Sha512 => Box::new(Sha512::new()),
        };
        Digester {
            algorithm: self,
            inner,
        }
    }
}

/// Incremental hash state: `update(bytes)` any number of times, then `finalize_hex`.
pub struct Digester {
    algorithm: HashAlgorithm,
    inner: Box<dyn DynDigest + Send>,
}

impl Digester {
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn finalize_hex(self) -> String {
        hex::encode(self.inner.finalize())
    }
}

/// SHA-256 of a string's UTF-8 bytes, hex encoded.
pub fn sha256_hex(data: &str) -> String {
    HashAlgorithm::Sha256.digest_hex(data.as_bytes())
}

/// True iff `value` is exactly `len` hex digits (either case).
pub fn is_hex_of_len(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// True iff `value` looks like a SHA-256 digest (`^[0-9a-fA-F]{64}$`).
pub fn is_sha256_hex(value: &str) -> bool {
    is_hex_of_len(value, 64)
}

/// Same predicate for untyped JSON input: non-strings are never digests.
pub fn is_sha256_value(value: &serde_json::Value) -> bool {
    value.as_str().is_some_and(is_sha256_hex)
}

/// Case-insensitive hex comparison.
pub fn hex_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
