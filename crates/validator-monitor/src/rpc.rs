//! Client for the node's RPC surface.
//!
//! Every request is a plain `GET`; the node wraps payloads in a JSON-RPC
//! style envelope (`{"jsonrpc": "2.0", "result": ...}`) even over REST.
//! Failures are returned to the caller untouched; deciding whether a failure
//! aborts the cycle is the caller's job.

use crate::{
    error::RpcError,
    types::{
        Block,
        BlockResult,
        ConsensusStateResult,
        ConsensusStateSnapshot,
        StatusResult,
        UnconfirmedTxsResult,
    },
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{
    Deserialize,
    de::DeserializeOwned,
};
use std::sync::Arc;
use tracing::{
    debug,
    trace,
};
use url::Url;

/// Typed access to the resources the monitor reads from the node.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Fetch the block at `height`, or the latest block when `None`.
    async fn block(&self, height: Option<u64>) -> Result<Block, RpcError>;

    async fn consensus_state(&self) -> Result<ConsensusStateSnapshot, RpcError>;

    /// Number of transactions sitting in the node's mempool.
    async fn unconfirmed_tx_count(&self) -> Result<u64, RpcError>;

    /// Whether the node reports itself as catching up.
    async fn catching_up(&self) -> Result<bool, RpcError>;
}

pub type SharedNodeRpc = Arc<dyn NodeRpc>;

#[derive(Debug, Deserialize)]
struct JsonRpcEnvelope<T> {
    result: Option<T>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

/// [`NodeRpc`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpNodeRpc {
    client: Client,
    base_url: Url,
}

impl HttpNodeRpc {
    pub fn new(rpc_url: &str) -> Result<Self, RpcError> {
        let base_url = Url::parse(rpc_url)?;
        let client = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|source| {
                RpcError::Transport {
                    endpoint: rpc_url.to_string(),
                    source,
                }
            })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path_and_query: &str) -> Result<Url, RpcError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path_and_query}"))?)
    }

    /// Fetch `endpoint`, decode its `result` as `R` and convert it to the
    /// domain value. Conversion failures carry the raw body.
    async fn get<R, T>(
        &self,
        endpoint: &str,
        convert: impl FnOnce(R) -> Result<T, RpcError>,
    ) -> Result<T, RpcError>
    where
        R: DeserializeOwned,
    {
        let url = self.url_for(endpoint)?;
        trace!(%url, "fetching from node RPC");

        let transport = |source| {
            RpcError::Transport {
                endpoint: endpoint.to_string(),
                source,
            }
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            debug!(endpoint, %status, "node RPC returned non-success status");
            return Err(RpcError::Status {
                endpoint: endpoint.to_string(),
                status,
                body,
            });
        }

        let envelope: JsonRpcEnvelope<R> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(source) => {
                return Err(RpcError::Decode {
                    endpoint: endpoint.to_string(),
                    source,
                    body,
                });
            }
        };

        if let Some(error) = envelope.error {
            let message = match error.data {
                Some(data) if !data.is_empty() => format!("{} ({data})", error.message),
                _ => error.message,
            };
            return Err(RpcError::JsonRpc {
                endpoint: endpoint.to_string(),
                code: error.code,
                message,
                body,
            });
        }

        let Some(result) = envelope.result else {
            return Err(RpcError::InvalidField {
                endpoint: endpoint.to_string(),
                field: "result",
                value: String::new(),
                body,
            });
        };

        convert(result).map_err(|err| err.with_body(&body))
    }
}

#[async_trait]
impl NodeRpc for HttpNodeRpc {
    async fn block(&self, height: Option<u64>) -> Result<Block, RpcError> {
        let endpoint = match height {
            Some(height) => format!("/block?height={height}"),
            None => "/block".to_string(),
        };
        self.get(&endpoint, |result: BlockResult| result.into_block(&endpoint))
            .await
    }

    async fn consensus_state(&self) -> Result<ConsensusStateSnapshot, RpcError> {
        let endpoint = "/dump_consensus_state";
        self.get(endpoint, |result: ConsensusStateResult| {
            result.into_snapshot(endpoint)
        })
        .await
    }

    async fn unconfirmed_tx_count(&self) -> Result<u64, RpcError> {
        let endpoint = "/num_unconfirmed_txs";
        self.get(endpoint, |result: UnconfirmedTxsResult| {
            result.total.parse(endpoint, "total")
        })
        .await
    }

    async fn catching_up(&self) -> Result<bool, RpcError> {
        self.get("/status", |result: StatusResult| {
            Ok(result.sync_info.catching_up)
        })
        .await
    }
}
