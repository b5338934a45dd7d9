//! HTTP client for an AliceNet node's local-state API

use async_trait::async_trait;
use reqwest::StatusCode;
use rpc_core::{model::*, ChainApi, RpcError};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RpcClient {
    base: Url,
    http: reqwest::Client,
}

impl RpcClient {
    /// `base` may be a full URL or a bare `host[:port]`, which is reached over https.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, RpcError> {
        let base = parse_base(base)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Network(format!("Client setup failed: {}", e)))?;

        Ok(Self { base, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    async fn call<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp, RpcError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self
            .base
            .join(&format!("v1/{}", method))
            .map_err(|e| RpcError::Network(format!("Invalid endpoint {}: {}", method, e)))?;

        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| RpcError::Network(format!("{} failed: {}", method, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RpcError::Network(format!("{} body read failed: {}", method, e)))?;

        if status != StatusCode::OK {
            return Err(RpcError::Api { status: status.as_u16(), message: body });
        }

        serde_json::from_str(&body).map_err(|e| RpcError::Decode(format!("{}: {}", method, e)))
    }
}

fn parse_base(base: &str) -> Result<Url, RpcError> {
    let raw = if base.contains("://") {
        base.to_string()
    } else {
        format!("https://{}", base)
    };

    let mut url = Url::parse(&raw).map_err(|e| RpcError::Network(format!("Invalid API URL {}: {}", base, e)))?;
    // Url::join replaces the last path segment unless the path ends in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

#[async_trait]
impl ChainApi for RpcClient {
    async fn height(&self) -> Result<u32, RpcError> {
        let response: BlockNumberResponse = self.call("get-block-number", &BlockNumberRequest {}).await?;
        Ok(response.block_height)
    }

    async fn block_header(&self, height: u32) -> Result<BlockHeader, RpcError> {
        let response: BlockHeaderResponse = self.call("get-block-header", &BlockHeaderRequest { height }).await?;
        Ok(response.block_header)
    }

    async fn transaction(&self, hash: &str) -> Result<MinedTransaction, RpcError> {
        let request = MinedTransactionRequest { tx_hash: hash.to_string() };
        self.call("get-mined-transaction", &request).await
    }
}
