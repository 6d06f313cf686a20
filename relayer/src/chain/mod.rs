//! Chain module - the ledger RPC boundary
//!
//! This module provides:
//! - The `LedgerRpc` trait every ledger interaction goes through
//! - A NEAR JSON-RPC implementation over HTTP
//! - Typed views of access keys, blocks and execution outcomes
//! - Finality qualifiers for view queries

pub mod finality;
pub mod provider;
pub mod views;

pub use finality::Finality;
pub use provider::NearRpcClient;
pub use views::{
    AccessKeyView, BlockView, ExecutionOutcome, ExecutionStatus, NodeStatus, ReceiptOutcome,
};

use crate::error::RelayerResult;

use async_trait::async_trait;

/// Ledger operations the relayer depends on.
///
/// Every call is a single round trip bounded by the transport timeout.
/// Nothing is retried at this layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Read an access key. Fails with `NotFound` when the key is absent.
    async fn view_access_key(
        &self,
        account_id: &str,
        public_key: &str,
        finality: Finality,
    ) -> RelayerResult<AccessKeyView>;

    /// Read the latest block at the given finality
    async fn block(&self, finality: Finality) -> RelayerResult<BlockView>;

    /// Submit a borsh-encoded signed transaction and wait for it to commit
    async fn broadcast_tx_commit(&self, signed_tx_base64: &str) -> RelayerResult<ExecutionOutcome>;

    /// Node status, used for readiness and health checks
    async fn status(&self) -> RelayerResult<NodeStatus>;
}
