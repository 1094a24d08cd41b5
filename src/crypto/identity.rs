/// Identity challenge-response.
///
/// Proves that the holder of `pubKey` is vouched for by an identity server:
/// the verifier sends a random `leftData` nonce, the server answers with
/// `{ rightData, signature }`, where `signature` signs `leftData ++ rightData`
/// with the key behind `pubKey`.
///
/// Protocol violations by the server are reported as `bad_server_response`
/// in the result, never as errors. Failure reasons start with the error code.
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::sign::{validate_signature, SignatureCheck};
use crate::error::{Result, VerifyError};
use crate::http::{JsonClient, RequestOptions};

pub const BAD_SERVER_RESPONSE: &str = "bad_server_response";
pub const HTTP_ERROR: &str = "http_error";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChallengeResponse {
    right_data: Option<String>,
    signature: Option<String>,
}

/// Run the challenge against `identity_url` for `pub_key`.
pub async fn validate_identity(
    http: &dyn JsonClient,
    identity_url: &str,
    pub_key: &str,
    signed_identity: Option<&str>,
    signed_issuer_domain: Option<&str>,
) -> SignatureCheck {
    match challenge(http, identity_url, pub_key, signed_identity, signed_issuer_domain).await {
        Ok(check) => check,
        Err(e) => {
            warn!(identity_url = %identity_url, error = %e, "Identity challenge failed");
            SignatureCheck::invalid(format!("{}: {e}", e.code()))
        }
    }
}

async fn challenge(
    http: &dyn JsonClient,
    identity_url: &str,
    pub_key: &str,
    signed_identity: Option<&str>,
    signed_issuer_domain: Option<&str>,
) -> Result<SignatureCheck> {
    let left_data = Uuid::new_v4().simple().to_string();

    let mut params = vec![("pubKey", pub_key), ("leftData", left_data.as_str())];
    if let Some(identity) = signed_identity {
        params.push(("signedIdentity", identity));
    }
    if let Some(domain) = signed_issuer_domain {
        params.push(("signedIssuerDomain", domain));
    }
    let url = Url::parse_with_params(identity_url, &params)
        .map_err(|e| VerifyError::InvalidParameter(format!("invalid identity URL: {e}")))?;

    debug!(identity_url = %identity_url, "Sending identity challenge");
    let body = http
        .request(url.as_str(), RequestOptions::get())
        .await?
        .ok_or_else(|| VerifyError::Http {
            status: 404,
            url: identity_url.to_string(),
        })?;

    // Non-object bodies and wrongly typed fields are missing data too.
    let response = ChallengeResponse::deserialize(&body).unwrap_or_default();
    let (Some(right_data), Some(signature)) = (response.right_data, response.signature) else {
        return Err(VerifyError::BadServerResponse(
            "missing rightData or signature".into(),
        ));
    };

    // A URL-shaped rightData must belong to the server that was asked.
    if looks_like_url(&right_data) && !right_data.starts_with(identity_url) {
        return Err(VerifyError::BadServerResponse(format!(
            "rightData {right_data} is outside {identity_url}"
        )));
    }

    let check = validate_signature(&format!("{left_data}{right_data}"), pub_key, &signature);
    if !check.valid {
        debug!(reason = ?check.reason, "Identity signature rejected");
    }
    Ok(check)
}

fn looks_like_url(data: &str) -> bool {
    data.starts_with("http://") || data.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sign::test_keys::TestSigner;
    use crate::http::mock::MockClient;
    use serde_json::json;
    use std::sync::Arc;

    const IDENTITY_URL: &str = "https://identity.test/identity";

    fn left_data(url: &str) -> String {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "leftData")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    fn honest_server(signer: Arc<TestSigner>, right_data: &'static str) -> MockClient {
        MockClient::new().route(IDENTITY_URL, move |url| {
            let left = left_data(url);
            Ok(Some(json!({
                "rightData": right_data,
                "signature": signer.sign(&format!("{left}{right_data}")),
                "identity": { "commonName": "Jane Doe" }
            })))
        })
    }

    #[tokio::test]
    async fn test_identity_verified() {
        let signer = Arc::new(TestSigner::new(0x31));
        let server = honest_server(signer.clone(), "random-server-nonce");
        let check = validate_identity(&server, IDENTITY_URL, &signer.address, None, None).await;
        assert_eq!(check, SignatureCheck::valid());

        let calls = server.calls();
        assert!(calls[0].contains("pubKey="));
        assert!(calls[0].contains("leftData="));
    }

    #[tokio::test]
    async fn test_identity_forwards_signed_fields() {
        let signer = Arc::new(TestSigner::new(0x31));
        let server = honest_server(signer.clone(), "nonce");
        validate_identity(&server, IDENTITY_URL, &signer.address, Some("CN=Jane"), Some("example.com")).await;
        let calls = server.calls();
        assert!(calls[0].contains("signedIdentity=CN%3DJane"));
        assert!(calls[0].contains("signedIssuerDomain=example.com"));
    }

    #[tokio::test]
    async fn test_identity_foreign_url_rejected() {
        let signer = Arc::new(TestSigner::new(0x31));
        let server = honest_server(signer.clone(), "https://evil.test/identity");
        let check = validate_identity(&server, IDENTITY_URL, &signer.address, None, None).await;
        assert!(check.reason.unwrap().starts_with(BAD_SERVER_RESPONSE));
    }

    #[tokio::test]
    async fn test_identity_wrong_key() {
        let signer = Arc::new(TestSigner::new(0x31));
        let impostor = TestSigner::new(0x32);
        let server = honest_server(signer, "nonce");
        let check = validate_identity(&server, IDENTITY_URL, &impostor.address, None, None).await;
        assert!(!check.valid);
    }

    #[tokio::test]
    async fn test_identity_malformed_response() {
        let server = MockClient::new().json(IDENTITY_URL, json!({ "unexpected": true }));
        let check = validate_identity(&server, IDENTITY_URL, "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", None, None).await;
        assert!(check.reason.unwrap().starts_with(BAD_SERVER_RESPONSE));

        let server = MockClient::new().status(IDENTITY_URL, 500);
        let check = validate_identity(&server, IDENTITY_URL, "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", None, None).await;
        assert!(check.reason.unwrap().starts_with(HTTP_ERROR));
    }

    #[test]
    fn test_reason_codes_match_error_kinds() {
        assert_eq!(VerifyError::BadServerResponse(String::new()).code(), BAD_SERVER_RESPONSE);
        let http = VerifyError::Http {
            status: 500,
            url: IDENTITY_URL.into(),
        };
        assert_eq!(http.code(), HTTP_ERROR);
    }
}
