//! Typed views of ledger RPC responses
//!
//! Execution statuses are decoded exactly once, here, into the closed
//! [`ExecutionStatus`] enum. Nothing downstream probes JSON fields.

use crate::error::{RelayerError, RelayerResult};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::Value;

/// Access key as returned by `query` / `view_access_key`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessKeyView {
    pub nonce: u64,
    #[serde(default)]
    pub block_height: u64,
    #[serde(default)]
    pub block_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockHeaderView {
    pub height: u64,
    pub hash: String,
}

/// Block as returned by `block`; only the header is kept
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockView {
    pub header: BlockHeaderView,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncInfo {
    pub latest_block_height: u64,
    pub syncing: bool,
}

/// Node status as returned by `status`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeStatus {
    pub chain_id: String,
    pub sync_info: SyncInfo,
}

/// Status of a transaction or receipt
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionStatus {
    /// Execution finished and returned these bytes
    SuccessValue(Vec<u8>),
    /// Execution finished by handing off to another receipt
    SuccessReceiptId(String),
    /// Anything else. Carries the node's raw status for diagnosis.
    Failure(Value),
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, ExecutionStatus::Failure(_))
    }
}

/// Outcome of one receipt in the execution tree
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptOutcome {
    pub id: String,
    pub executor_id: String,
    pub status: ExecutionStatus,
}

/// Final outcome of a committed transaction
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// Hash of the transaction that produced this outcome
    pub transaction_hash: String,
    /// Status of the whole receipt chain; `SuccessValue` holds the last return value
    pub status: ExecutionStatus,
    pub receipts: Vec<ReceiptOutcome>,
    /// Response as the node sent it
    pub raw: Value,
}

/// Wire form of a status. The node sends unit variants as plain strings
/// and the rest as single-key objects, which is serde's external tagging.
#[derive(Debug, Deserialize)]
enum RawStatus {
    NotStarted,
    Started,
    Unknown,
    Failure(IgnoredAny),
    SuccessValue(String),
    SuccessReceiptId(String),
}

#[derive(Debug, Deserialize)]
struct RawOutcome {
    #[serde(default)]
    executor_id: String,
    status: Value,
}

#[derive(Debug, Deserialize)]
struct RawOutcomeWithId {
    id: String,
    outcome: RawOutcome,
}

#[derive(Debug, Deserialize)]
struct RawFinalOutcome {
    status: Value,
    transaction_outcome: RawOutcomeWithId,
    #[serde(default)]
    receipts_outcome: Vec<RawOutcomeWithId>,
}

fn decode_status(method: &str, raw: Value) -> RelayerResult<ExecutionStatus> {
    let status: RawStatus = serde_json::from_value(raw.clone()).map_err(|e| {
        RelayerError::rpc(method, format!("unrecognised execution status {}: {}", raw, e))
    })?;

    Ok(match status {
        RawStatus::SuccessValue(encoded) => {
            let bytes = BASE64.decode(encoded.as_bytes()).map_err(|e| {
                RelayerError::rpc(method, format!("SuccessValue is not base64: {}", e))
            })?;
            ExecutionStatus::SuccessValue(bytes)
        }
        RawStatus::SuccessReceiptId(id) => ExecutionStatus::SuccessReceiptId(id),
        RawStatus::Failure(_) | RawStatus::NotStarted | RawStatus::Started | RawStatus::Unknown => {
            ExecutionStatus::Failure(raw)
        }
    })
}

impl ExecutionOutcome {
    /// Decode a `broadcast_tx_commit` result
    pub fn from_rpc(method: &str, raw: Value) -> RelayerResult<Self> {
        let parsed: RawFinalOutcome = serde_json::from_value(raw.clone())
            .map_err(|e| RelayerError::rpc(method, format!("malformed execution outcome: {}", e)))?;

        let receipts = parsed
            .receipts_outcome
            .into_iter()
            .map(|r| {
                Ok(ReceiptOutcome {
                    status: decode_status(method, r.outcome.status)?,
                    executor_id: r.outcome.executor_id,
                    id: r.id,
                })
            })
            .collect::<RelayerResult<Vec<_>>>()?;

        Ok(Self {
            transaction_hash: parsed.transaction_outcome.id,
            status: decode_status(method, parsed.status)?,
            receipts,
            raw,
        })
    }
}
