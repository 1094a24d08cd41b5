/// Optional signature block attached to a receipt.
///
/// The signer signs `signedHash` with a Bitcoin key; the anchored target
/// hash is then the SHA-256 of the signature string itself.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::hash::is_sha256_hex;
use crate::error::{Result, VerifyError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSignature {
    pub signed_hash: String,
    pub pub_key: String,
    pub signature: String,
    #[serde(rename = "identityURL", skip_serializing_if = "Option::is_none")]
    pub identity_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_issuer_domain: Option<String>,
}

impl ReceiptSignature {
    pub(crate) fn parse(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| VerifyError::InvalidReceiptSignatureFormat("not an object".into()))?;

        let signed_hash = required(obj, "signedHash")?;
        if !is_sha256_hex(signed_hash) {
            return Err(VerifyError::InvalidReceiptSignatureFormat(
                "signedHash is not a SHA-256 digest".into(),
            ));
        }

        Ok(Self {
            signed_hash: signed_hash.to_ascii_lowercase(),
            pub_key: required(obj, "pubKey")?.to_string(),
            signature: required(obj, "signature")?.to_string(),
            identity_url: optional(obj, "identityURL")?,
            signed_identity: optional(obj, "signedIdentity")?,
            signed_issuer_domain: optional(obj, "signedIssuerDomain")?,
        })
    }
}

fn required<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| VerifyError::InvalidReceiptSignatureFormat(format!("missing {key}")))
}

fn optional(obj: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(VerifyError::InvalidReceiptSignatureFormat(format!(
            "{key} must be a string"
        ))),
    }
}
