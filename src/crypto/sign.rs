/// Bitcoin signed-message verification.
///
/// Signatures are the base64 compact recoverable form produced by wallets'
/// "sign message" feature; the signer is identified by a Bitcoin address.
/// Verification never fails hard: every problem is reported as a reason.
use std::str::FromStr;

use bitcoin::address::NetworkUnchecked;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::sign_message::{signed_msg_hash, MessageSignature};
use bitcoin::Address;
use serde::Serialize;

/// Outcome of a signature or identity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SignatureCheck {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Check that `signature` over `message` was produced by the key behind `address`.
pub fn validate_signature(message: &str, address: &str, signature: &str) -> SignatureCheck {
    let address = match Address::<NetworkUnchecked>::from_str(address) {
        Ok(a) => a.assume_checked(),
        Err(e) => return SignatureCheck::invalid(format!("invalid address: {e}")),
    };
    let signature = match MessageSignature::from_base64(signature) {
        Ok(s) => s,
        Err(e) => return SignatureCheck::invalid(format!("invalid signature encoding: {e}")),
    };

    let secp = Secp256k1::verification_only();
    match signature.is_signed_by_address(&secp, &address, signed_msg_hash(message)) {
        Ok(true) => SignatureCheck::valid(),
        Ok(false) => SignatureCheck::invalid("signature does not match address"),
        Err(e) => SignatureCheck::invalid(e.to_string()),
    }
}
