//! Builds the subscriber-side transaction input the proxy contract needs
//! to request a signature for the bet.

use super::nonce::next_nonce;
use crate::chain::{Finality, LedgerRpc};
use crate::error::RelayerResult;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Subscriber whose access key authorizes the bet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberRef {
    pub account_id: String,
    pub public_key: String,
}

/// Everything the signing service needs to produce the subscriber's transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub subscriber_public_key: String,
    /// Decimal string, the contract takes it as JSON text
    pub nonce: String,
    pub block_hash: String,
}

/// Bet details, forwarded to the proxy contract untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetInput {
    pub match_id: String,
    pub team: String,
    /// Smallest currency unit, decimal string
    pub amount: String,
}

/// Output of the build step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBet {
    pub transaction_input: TransactionInput,
    pub bet_input: BetInput,
    /// Numeric form of `transaction_input.nonce`
    pub nonce: u64,
}

/// Reads nonce and block reference for a subscriber
pub struct TransactionBuilder<'a> {
    rpc: &'a dyn LedgerRpc,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(rpc: &'a dyn LedgerRpc) -> Self {
        Self { rpc }
    }

    /// Fetch the subscriber's next nonce and a final block hash.
    ///
    /// Two round trips, in order: access key (optimistic), then block (final).
    pub async fn build(
        &self,
        subscriber: &SubscriberRef,
        bet_input: BetInput,
    ) -> RelayerResult<PreparedBet> {
        let access_key = self
            .rpc
            .view_access_key(
                &subscriber.account_id,
                &subscriber.public_key,
                Finality::Optimistic,
            )
            .await?;

        let block = self.rpc.block(Finality::Final).await?;
        let nonce = next_nonce(access_key.nonce)?;

        debug!(
            "Built input for {}: on-chain nonce {}, next {}, block {} (#{})",
            subscriber.account_id, access_key.nonce, nonce, block.header.hash, block.header.height
        );

        Ok(PreparedBet {
            transaction_input: TransactionInput {
                subscriber_public_key: subscriber.public_key.clone(),
                nonce: nonce.to_string(),
                block_hash: block.header.hash,
            },
            bet_input,
            nonce,
        })
    }
}
