//! NEAR JSON-RPC provider over HTTP

use super::finality::Finality;
use super::views::{AccessKeyView, BlockView, ExecutionOutcome, NodeStatus};
use super::LedgerRpc;
use crate::config::NetworkConfig;
use crate::error::{RelayerError, RelayerResult};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// JSON-RPC error object. NEAR nodes put the structured reason in `cause`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cause: Option<RpcErrorCause>,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorCause {
    pub name: String,
    #[serde(default)]
    pub info: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// Ledger RPC client for a single NEAR endpoint
pub struct NearRpcClient {
    /// Endpoint URL
    url: String,
    /// Network name, for logging
    network_id: String,
    /// Shared HTTP client; its timeout bounds every call
    http: reqwest::Client,
    timeout: Duration,
}

impl NearRpcClient {
    /// Create a new provider from network configuration
    pub fn new(config: &NetworkConfig) -> RelayerResult<Self> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayerError::Config(format!("failed to build HTTP client: {}", e)))?;

        debug!(
            "Created RPC provider for {} at {} (timeout {:?})",
            config.network_id, config.rpc_url, timeout
        );

        Ok(Self {
            url: config.rpc_url.clone(),
            network_id: config.network_id.clone(),
            http,
            timeout,
        })
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    /// Issue one JSON-RPC call and decode its result
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> RelayerResult<T> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": uuid::Uuid::new_v4().to_string(),
            "method": method,
            "params": &params,
        });

        let started = std::time::Instant::now();
        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(method, &self.timeout, e))?;

        let status = response.status();
        let body: RpcResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(method, &self.timeout, e)
            } else {
                RelayerError::rpc(method, format!("HTTP {} with undecodable body: {}", status, e))
            }
        })?;

        crate::metrics::record_rpc_request(method, body.error.is_none(), started.elapsed());

        if let Some(error) = body.error {
            return Err(classify_error(method, &params, error));
        }

        let result = body
            .result
            .ok_or_else(|| RelayerError::rpc(method, "response has neither result nor error"))?;

        serde_json::from_value(result)
            .map_err(|e| RelayerError::rpc(method, format!("unexpected result shape: {}", e)))
    }
}

fn transport_error(method: &str, timeout: &Duration, e: reqwest::Error) -> RelayerError {
    if e.is_timeout() {
        warn!("RPC {} timed out after {:?}", method, timeout);
        RelayerError::Timeout {
            operation: method.to_string(),
        }
    } else {
        RelayerError::rpc(method, e.to_string())
    }
}

/// Map a JSON-RPC error body onto the relayer error taxonomy
pub fn classify_error(method: &str, params: &Value, error: RpcErrorBody) -> RelayerError {
    let cause = error.cause.as_ref().map(|c| c.name.as_str());

    match cause {
        Some("UNKNOWN_ACCESS_KEY") | Some("UNKNOWN_ACCOUNT") => RelayerError::NotFound {
            account_id: params["account_id"].as_str().unwrap_or_default().to_string(),
            public_key: params["public_key"].as_str().unwrap_or_default().to_string(),
        },
        Some("TIMEOUT_ERROR") => RelayerError::Timeout {
            operation: method.to_string(),
        },
        _ => {
            let detail = error
                .data
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default();
            RelayerError::rpc(
                method,
                format!(
                    "{} ({}): {} {}",
                    cause.or(error.name.as_deref()).unwrap_or("UNKNOWN"),
                    error.code,
                    error.message,
                    detail
                )
                .trim_end()
                .to_string(),
            )
        }
    }
}

/// Older nodes answer a missing access key with a successful response whose
/// result carries an `error` string instead of the view.
fn access_key_from_result(
    account_id: &str,
    public_key: &str,
    result: Value,
) -> RelayerResult<AccessKeyView> {
    if let Some(message) = result.get("error").and_then(Value::as_str) {
        if message.contains("does not exist") {
            return Err(RelayerError::NotFound {
                account_id: account_id.to_string(),
                public_key: public_key.to_string(),
            });
        }
        return Err(RelayerError::rpc("query", message.to_string()));
    }

    serde_json::from_value(result)
        .map_err(|e| RelayerError::rpc("query", format!("unexpected access key view: {}", e)))
}

#[async_trait]
impl LedgerRpc for NearRpcClient {
    async fn view_access_key(
        &self,
        account_id: &str,
        public_key: &str,
        finality: Finality,
    ) -> RelayerResult<AccessKeyView> {
        let result: Value = self
            .call(
                "query",
                json!({
                    "request_type": "view_access_key",
                    "finality": finality,
                    "account_id": account_id,
                    "public_key": public_key,
                }),
            )
            .await?;

        access_key_from_result(account_id, public_key, result)
    }

    async fn block(&self, finality: Finality) -> RelayerResult<BlockView> {
        self.call("block", json!({ "finality": finality })).await
    }

    async fn broadcast_tx_commit(&self, signed_tx_base64: &str) -> RelayerResult<ExecutionOutcome> {
        let raw: Value = self
            .call("broadcast_tx_commit", json!([signed_tx_base64]))
            .await?;
        ExecutionOutcome::from_rpc("broadcast_tx_commit", raw)
    }

    async fn status(&self) -> RelayerResult<NodeStatus> {
        self.call("status", json!([])).await
    }
}
