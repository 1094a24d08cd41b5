/// Verification results.
use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::crypto::sign::SignatureCheck;
use crate::provider::Transaction;

/// Code of a successful verification.
pub const VERIFIED: &str = "verified";

/// Outcome of the identity challenge attached to a signed receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityVerificationStatus {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<SignatureCheck> for IdentityVerificationStatus {
    fn from(check: SignatureCheck) -> Self {
        if check.valid {
            return Self {
                code: VERIFIED.to_string(),
                reason: None,
            };
        }
        let reason = check.reason.unwrap_or_default();
        // Challenge failures are reported as `<error code>: <message>`.
        let code = match reason.split_once(": ") {
            Some((code, _)) if is_error_code(code) => code,
            _ => "invalid_signature",
        };
        Self {
            code: code.to_string(),
            reason: Some(reason),
        }
    }
}

fn is_error_code(s: &str) -> bool {
    s.contains('_') && s.bytes().all(|b| b.is_ascii_lowercase() || b == b'_')
}

/// Verification status of one receipt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatus {
    /// The receipt as received.
    pub receipt: Value,
    /// `verified`, or the kind of the first failure.
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    /// Block time of the anchoring transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_verification_status: Option<IdentityVerificationStatus>,
}

impl VerificationStatus {
    pub(crate) fn verified(receipt: Value, tx: &Transaction) -> Self {
        Self {
            receipt,
            code: VERIFIED.to_string(),
            confirmations: Some(tx.confirmations),
            timestamp: tx.timestamp,
            identity_verification_status: None,
        }
    }

    pub(crate) fn failed(receipt: Value, code: &str) -> Self {
        Self {
            receipt,
            code: code.to_string(),
            confirmations: None,
            timestamp: None,
            identity_verification_status: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.code == VERIFIED
    }
}

/// Ascending by timestamp; statuses without one go last.
pub(crate) fn by_timestamp(a: &VerificationStatus, b: &VerificationStatus) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
