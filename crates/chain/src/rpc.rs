//! Node RPC surface.
//!
//! Wire contract with the node shim (JSON-RPC 2.0 over HTTP POST):
//! - `get_account {name}` -> `{name, posting_authority}` or null
//! - `broadcast {account, op, signature}` -> null
//!
//! Rejections come back as JSON-RPC error objects; the codes below map
//! the two rejections the handlers care about onto typed variants.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Node rejection code for a vote/reply addressed to a missing post.
pub const CODE_MISSING_POST: i64 = -32001;
/// Node rejection code for an identical repeated vote.
pub const CODE_DUPLICATE_VOTE: i64 = -32002;

#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub name: String,
    /// Address form of the account's posting public key. Login compares
    /// the signer recovered from a challenge signature against this.
    pub posting_authority: String,
}

/// A signed operation ready to broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct SignedOperation {
    pub account: String,
    pub op: Value,
    /// Hex-encoded 65-byte recoverable signature over the op digest.
    pub signature: String,
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("node unreachable: {0}")]
    Transport(String),

    #[error("post does not exist")]
    PostNotFound,

    #[error("already voted in a similar way")]
    AlreadyVoted,

    #[error("node rejected operation ({code}): {message}")]
    Rejected { code: i64, message: String },
}

/// Low-level node access. Kept as a trait so the gateway can be exercised
/// against an in-memory node in tests.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn get_account(&self, name: &str) -> Result<Option<AccountInfo>, RpcError>;
    async fn broadcast(&self, op: &SignedOperation) -> Result<(), RpcError>;
}

/// JSON-RPC client for a real node.
#[derive(Clone)]
pub struct HttpChainRpc {
    http: reqwest::Client,
    node_url: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl HttpChainRpc {
    pub fn new(node_url: impl Into<String>) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            node_url: node_url.into(),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: RpcResponse = self
            .http
            .post(&self.node_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if let Some(err) = response.error {
            return Err(match err.code {
                CODE_MISSING_POST => RpcError::PostNotFound,
                CODE_DUPLICATE_VOTE => RpcError::AlreadyVoted,
                code => RpcError::Rejected {
                    code,
                    message: err.message,
                },
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ChainRpc for HttpChainRpc {
    async fn get_account(&self, name: &str) -> Result<Option<AccountInfo>, RpcError> {
        let result = self.call("get_account", json!({ "name": name })).await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result).map(Some).map_err(|e| RpcError::Rejected {
            code: 0,
            message: format!("malformed account record: {e}"),
        })
    }

    async fn broadcast(&self, op: &SignedOperation) -> Result<(), RpcError> {
        self.call("broadcast", serde_json::to_value(op).unwrap_or(Value::Null))
            .await?;
        Ok(())
    }
}
