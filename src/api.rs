/// Anchor API client.
///
/// Two calls against the anchoring service:
/// - `anchor_ids`: every anchor id recorded for a digest, paginated
///   (`{ content: [ids], last: bool }` per page)
/// - `receipt`: the receipt of one anchor. The service answers 202 while the
///   anchor is still waiting for its transaction.
use std::collections::HashSet;
use std::sync::Arc;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, VerifyError};
use crate::http::{JsonClient, RequestOptions};

/// Anchor ids fetched per page.
pub const PAGE_SIZE: usize = 1000;

/// Which anchors to look up for a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AnchorType {
    /// Anchors of the content digest itself.
    Data = 1,
    /// Signature anchors whose signed hash is the digest.
    Signature = 2,
    #[default]
    Both = 3,
}

#[derive(Debug, Deserialize)]
struct AnchorIdsPage {
    #[serde(default)]
    content: Vec<String>,
    #[serde(default = "last_page")]
    last: bool,
}

fn last_page() -> bool {
    true
}

pub struct AnchorApi {
    http: Arc<dyn JsonClient>,
    base_url: String,
    token: Option<String>,
}

impl AnchorApi {
    pub fn new(http: Arc<dyn JsonClient>, config: &Config) -> Self {
        Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, url: &str) {
        info!(api_url = %url, "Anchor API base URL changed");
        self.base_url = url.trim_end_matches('/').to_string();
    }

    fn options(&self) -> RequestOptions {
        RequestOptions::get().with_token(self.token.as_deref())
    }

    /// All anchor ids for `hash`. `Both` lists data anchors first, then
    /// signature anchors, without duplicates.
    pub async fn anchor_ids(&self, hash: &str, anchor_type: AnchorType) -> Result<Vec<String>> {
        match anchor_type {
            AnchorType::Data => self.paginate("hash", hash).await,
            AnchorType::Signature => self.paginate("signedHash", hash).await,
            AnchorType::Both => {
                let mut ids = self.paginate("hash", hash).await?;
                ids.extend(self.paginate("signedHash", hash).await?);
                let mut seen = HashSet::new();
                ids.retain(|id| seen.insert(id.clone()));
                Ok(ids)
            }
        }
    }

    async fn paginate(&self, key: &str, hash: &str) -> Result<Vec<String>> {
        let endpoint = format!("{}/anchorIds", self.base_url);
        let mut ids = Vec::new();
        let mut page = 0usize;

        loop {
            let page_param = page.to_string();
            let size_param = PAGE_SIZE.to_string();
            let url = Url::parse_with_params(
                &endpoint,
                &[
                    (key, hash),
                    ("page", page_param.as_str()),
                    ("size", size_param.as_str()),
                ],
            )
            .map_err(|e| VerifyError::InvalidParameter(format!("invalid API URL: {e}")))?;

            let Some(body) = self.http.request(url.as_str(), self.options()).await? else {
                break;
            };
            let batch: AnchorIdsPage = serde_json::from_value(body).map_err(|e| {
                VerifyError::Serialization(format!("Invalid anchorIds page: {e}"))
            })?;

            debug!(key, page, count = batch.content.len(), "Anchor ids page");
            let done = batch.last || batch.content.is_empty();
            ids.extend(batch.content);
            if done {
                break;
            }
            page += 1;
        }

        Ok(ids)
    }

    /// Receipt of one anchor.
    pub async fn receipt(&self, anchor_id: &str) -> Result<Value> {
        let url = format!("{}/receipt/{}", self.base_url, anchor_id);
        match self.http.request(&url, self.options()).await {
            Ok(Some(body)) => Ok(body),
            Ok(None) => Err(VerifyError::AnchorNotFound(anchor_id.to_string())),
            Err(VerifyError::Http { status: 202, .. }) => {
                Err(VerifyError::AnchorNotYetProcessed(anchor_id.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::MockClient;
    use serde_json::json;

    fn api(mock: MockClient) -> (AnchorApi, Arc<MockClient>) {
        let mock = Arc::new(mock);
        let config = Config {
            api_url: "https://api.test/v1/".into(),
            ..Config::default()
        };
        (AnchorApi::new(mock.clone(), &config), mock)
    }

    #[tokio::test]
    async fn test_anchor_ids_follows_pages() {
        let (api, mock) = api(MockClient::new().route(
            "https://api.test/v1/anchorIds?hash=abc",
            |url| {
                if url.contains("page=0") {
                    Ok(Some(json!({ "content": ["a1", "a2"], "last": false })))
                } else {
                    Ok(Some(json!({ "content": ["a3"], "last": true })))
                }
            },
        ));

        let ids = api.anchor_ids("abc", AnchorType::Data).await.unwrap();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
        assert_eq!(mock.calls().len(), 2);
        assert!(mock.calls()[1].contains("page=1"));
        assert!(mock.calls()[0].contains("size=1000"));
    }

    #[tokio::test]
    async fn test_both_is_deduplicated_union() {
        let (api, _) = api(
            MockClient::new()
                .json(
                    "https://api.test/v1/anchorIds?hash=",
                    json!({ "content": ["d1", "shared"], "last": true }),
                )
                .json(
                    "https://api.test/v1/anchorIds?signedHash=",
                    json!({ "content": ["shared", "s1"], "last": true }),
                ),
        );

        let ids = api.anchor_ids("abc", AnchorType::Both).await.unwrap();
        assert_eq!(ids, vec!["d1", "shared", "s1"]);

        let signature_only = api.anchor_ids("abc", AnchorType::Signature).await.unwrap();
        assert_eq!(signature_only, vec!["shared", "s1"]);
    }

    #[tokio::test]
    async fn test_missing_lookup_is_empty() {
        let (api, _) = api(MockClient::new());
        assert!(api.anchor_ids("abc", AnchorType::Both).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_receipt_status_mapping() {
        let (api, _) = api(
            MockClient::new()
                .json("https://api.test/v1/receipt/ok", json!({ "type": "x" }))
                .status("https://api.test/v1/receipt/pending", 202)
                .status("https://api.test/v1/receipt/boom", 500),
        );

        assert_eq!(api.receipt("ok").await.unwrap()["type"], "x");
        assert_eq!(
            api.receipt("pending").await.unwrap_err().code(),
            "anchor_not_yet_processed"
        );
        assert_eq!(api.receipt("missing").await.unwrap_err().code(), "anchor_not_found");
        assert_eq!(api.receipt("boom").await.unwrap_err().code(), "http_error");
    }

    #[tokio::test]
    async fn test_set_base_url() {
        let (mut api, mock) = api(MockClient::new());
        api.set_base_url("https://other.test/api/");
        assert_eq!(api.base_url(), "https://other.test/api");
        let _ = api.receipt("id").await;
        assert_eq!(mock.calls(), vec!["https://other.test/api/receipt/id"]);
    }
}
