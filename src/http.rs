/// JSON-over-HTTP collaborator shared by the anchor API, transaction
/// providers and identity challenges.
///
/// Contract: 200 yields the parsed body, 404 yields `None`, anything else
/// (202 included) is an `Http` error carrying the status.
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, VerifyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub bearer_token: Option<String>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: Option<&str>) -> Self {
        self.bearer_token = token.map(str::to_string);
        self
    }
}

#[async_trait]
pub trait JsonClient: Send + Sync {
    async fn request(&self, url: &str, options: RequestOptions) -> Result<Option<Value>>;
}

/// `JsonClient` backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JsonClient for ReqwestClient {
    async fn request(&self, url: &str, options: RequestOptions) -> Result<Option<Value>> {
        let mut req = match options.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if let Some(body) = &options.body {
            req = req.json(body);
        }
        if let Some(token) = &options.bearer_token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| VerifyError::Network(e.to_string()))?;

        let status = resp.status();
        debug!(url = %url, status = status.as_u16(), "HTTP response");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status != StatusCode::OK {
            return Err(VerifyError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| VerifyError::Serialization(format!("Invalid JSON from {url}: {e}")))?;

        Ok(Some(body))
    }
}
