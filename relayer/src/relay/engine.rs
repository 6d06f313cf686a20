//! Relay engine: places one subscriber bet through the proxy contract
//!
//! Pipeline per request, each step terminal on failure:
//!
//! ```text
//! BUILDING -> CALLING_PROXY -> VALIDATING_PROXY_RECEIPTS -> EXTRACTING_PAYLOAD
//!          -> BROADCASTING -> VALIDATING_FINAL_RECEIPTS -> DONE
//! ```
//!
//! The proxy call commits before the signed bet is broadcast. A failure in
//! the second leg therefore leaves the proxy call on-chain, and such
//! failures are flagged by `RelayFailure::is_uncertain`. Reconciling them
//! belongs to the integrating system.

use super::payload::{self, Expected, SignedPayload};
use super::receipts;
use super::state::{RelayFailure, RelayState};
use crate::amount::format_usdc_amount;
use crate::chain::{ExecutionOutcome, LedgerRpc};
use crate::config::RelayerConfig;
use crate::error::{RelayerError, RelayerResult};
use crate::tx::{
    BetInput, CallBudget, PreparedBet, Session, SubscriberLocks, SubscriberRef, TransactionBuilder,
};

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Inbound relay request from the application layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRequest {
    pub subscriber_account_id: String,
    pub subscriber_public_key: String,
    pub match_id: String,
    pub team: String,
    /// Smallest currency unit, decimal string; forwarded unchecked
    pub amount: String,
}

/// Successful relay
#[derive(Debug, Clone, PartialEq)]
pub struct RelayResult {
    pub relay_id: Uuid,
    /// Hash of the relayer's proxy call
    pub proxy_transaction_hash: String,
    /// Outcome of the broadcast bet transaction, as the node returned it
    pub outcome: ExecutionOutcome,
}

impl RelayRequest {
    fn validate(&self) -> RelayerResult<()> {
        let fields = [
            ("subscriber_account_id", &self.subscriber_account_id),
            ("subscriber_public_key", &self.subscriber_public_key),
            ("match_id", &self.match_id),
            ("team", &self.team),
            ("amount", &self.amount),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(RelayerError::InvalidRequest(format!("{} is empty", name)));
            }
        }
        Ok(())
    }

    fn subscriber(&self) -> SubscriberRef {
        SubscriberRef {
            account_id: self.subscriber_account_id.clone(),
            public_key: self.subscriber_public_key.clone(),
        }
    }

    fn bet(&self) -> BetInput {
        BetInput {
            match_id: self.match_id.clone(),
            team: self.team.clone(),
            amount: self.amount.clone(),
        }
    }
}

/// Relay engine
pub struct RelayEngine {
    session: Arc<Session>,
    proxy_contract_id: String,
    proxy_method: String,
    budget: CallBudget,
    subscriber_locks: SubscriberLocks,
}

/// Tags an error with the state it happened in
trait InState<T> {
    fn in_state(self, state: RelayState) -> Result<T, RelayFailure>;
}

impl<T> InState<T> for RelayerResult<T> {
    fn in_state(self, state: RelayState) -> Result<T, RelayFailure> {
        self.map_err(|error| RelayFailure::new(state, error))
    }
}

impl RelayEngine {
    /// Create a new relay engine over an open session
    pub fn new(session: Arc<Session>, config: &RelayerConfig) -> RelayerResult<Self> {
        let budget = CallBudget::from_config(config)?;

        info!(
            "Relay engine ready: {} calls {}.{} with {} TGas, deposit {} yocto",
            session.account_id(),
            config.proxy_contract_id,
            config.proxy_method,
            budget.tgas(),
            budget.deposit
        );

        Ok(Self {
            session,
            proxy_contract_id: config.proxy_contract_id.clone(),
            proxy_method: config.proxy_method.clone(),
            budget,
            subscriber_locks: SubscriberLocks::new(),
        })
    }

    pub fn rpc(&self) -> &dyn LedgerRpc {
        self.session.rpc()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Place one bet on behalf of a subscriber
    pub async fn relay_bet(&self, request: RelayRequest) -> Result<RelayResult, RelayFailure> {
        let relay_id = Uuid::new_v4();
        let started = Instant::now();
        crate::metrics::record_relay_started();

        info!(
            "[{}] Relaying bet for {}: match {}, team {}, {} USDC",
            relay_id,
            request.subscriber_account_id,
            request.match_id,
            request.team,
            format_usdc_amount(&request.amount, 2)
        );

        let result = self.run(relay_id, &request).await;

        match &result {
            Ok(done) => {
                info!(
                    "[{}] Bet placed: tx {} ({:.2}s)",
                    relay_id,
                    done.outcome.transaction_hash,
                    started.elapsed().as_secs_f64()
                );
                crate::metrics::record_relay_succeeded(started.elapsed());
            }
            Err(failure) if failure.is_uncertain() => {
                error!(
                    "[{}] Outcome UNCERTAIN for {}: {} - bet must be reconciled",
                    relay_id, request.subscriber_account_id, failure
                );
                crate::metrics::record_relay_failed(failure);
            }
            Err(failure) if failure.error.should_alert() => {
                error!("[{}] {}", relay_id, failure);
                crate::metrics::record_relay_failed(failure);
            }
            Err(failure) => {
                warn!("[{}] {}", relay_id, failure);
                crate::metrics::record_relay_failed(failure);
            }
        }

        result
    }

    async fn run(
        &self,
        relay_id: Uuid,
        request: &RelayRequest,
    ) -> Result<RelayResult, RelayFailure> {
        request.validate().in_state(RelayState::Building)?;
        let subscriber = request.subscriber();

        // Held from nonce read through final broadcast
        let _guard = self.subscriber_locks.acquire(&subscriber).await;

        debug!("[{}] {}", relay_id, RelayState::Building);
        let prepared = TransactionBuilder::new(self.session.rpc())
            .build(&subscriber, request.bet())
            .await
            .in_state(RelayState::Building)?;

        debug!(
            "[{}] {}: nonce {}, block {}",
            relay_id,
            RelayState::CallingProxy,
            prepared.transaction_input.nonce,
            prepared.transaction_input.block_hash
        );
        let proxy_outcome = self
            .call_proxy(&subscriber, &prepared)
            .await
            .in_state(RelayState::CallingProxy)?;

        debug!(
            "[{}] {}: proxy tx {}, {} receipts",
            relay_id,
            RelayState::ValidatingProxyReceipts,
            proxy_outcome.transaction_hash,
            proxy_outcome.receipts.len()
        );
        receipts::validate(&proxy_outcome)
            .map_err(RelayerError::ProxyExecution)
            .in_state(RelayState::ValidatingProxyReceipts)?;

        let signed: SignedPayload = payload::extract(
            &proxy_outcome,
            Expected {
                signer_id: &subscriber.account_id,
                nonce: prepared.nonce,
            },
        )
        .in_state(RelayState::ExtractingPayload)?;

        debug!(
            "[{}] {}: {} bytes, tx {} to {}",
            relay_id,
            RelayState::Broadcasting,
            signed.bytes.len(),
            signed.transaction_hash,
            signed.receiver_id
        );
        let final_outcome = self
            .session
            .broadcast(&signed.bytes)
            .await
            .in_state(RelayState::Broadcasting)?;

        receipts::validate(&final_outcome)
            .map_err(RelayerError::BroadcastExecution)
            .in_state(RelayState::ValidatingFinalReceipts)?;

        debug!("[{}] {}", relay_id, RelayState::Done);
        Ok(RelayResult {
            relay_id,
            proxy_transaction_hash: proxy_outcome.transaction_hash,
            outcome: final_outcome,
        })
    }

    async fn call_proxy(
        &self,
        subscriber: &SubscriberRef,
        prepared: &PreparedBet,
    ) -> RelayerResult<ExecutionOutcome> {
        let args = json!({
            "account_id": subscriber.account_id,
            "transaction_input": prepared.transaction_input,
            "bet_input": prepared.bet_input,
        });
        let args = serde_json::to_vec(&args)
            .map_err(|e| RelayerError::Internal(format!("proxy args encoding failed: {}", e)))?;

        self.session
            .function_call(
                &self.proxy_contract_id,
                &self.proxy_method,
                args,
                self.budget.gas,
                self.budget.deposit,
            )
            .await
    }

    /// Release bookkeeping for subscribers with no relay in flight
    pub fn cleanup(&self) {
        self.subscriber_locks.prune();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockLedgerRpc;
    use crate::test_support::*;
    use crate::tx::primitives::{Action, SignedTransaction};

    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    fn engine(rpc: MockLedgerRpc) -> RelayEngine {
        let session = Session::open(
            RELAYER_ID,
            &relayer_key().to_secret_string(),
            "testnet",
            Arc::new(rpc),
        )
        .unwrap();
        RelayEngine::new(Arc::new(session), &relayer_config()).unwrap()
    }

    /// Access keys: subscriber at `subscriber_nonce`, relayer at 100
    fn expect_access_keys(rpc: &mut MockLedgerRpc, subscriber_nonce: u64) {
        rpc.expect_view_access_key()
            .returning(move |account_id, _, _| {
                if account_id.to_string() == RELAYER_ID {
                    Ok(access_key(100))
                } else {
                    Ok(access_key(subscriber_nonce))
                }
            });
    }

    /// Routes broadcasts: relayer-signed proxy calls get `proxy`, anything
    /// else gets `bet`. Every submitted payload is recorded.
    fn expect_broadcasts(
        rpc: &mut MockLedgerRpc,
        proxy: ExecutionOutcome,
        bet: ExecutionOutcome,
        times: usize,
    ) -> Arc<Mutex<Vec<String>>> {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let recorder = sent.clone();
        rpc.expect_broadcast_tx_commit()
            .times(times)
            .returning(move |tx| {
                let tx = tx.to_string();
                recorder.lock().unwrap().push(tx.clone());
                let signed = SignedTransaction::from_bytes(&BASE64.decode(&tx).unwrap()).unwrap();
                if signed.transaction.signer_id == RELAYER_ID {
                    Ok(proxy.clone())
                } else {
                    Ok(bet.clone())
                }
            });
        sent
    }

    fn proxy_args(sent_base64: &str) -> Value {
        let signed = SignedTransaction::from_bytes(&BASE64.decode(sent_base64).unwrap()).unwrap();
        match &signed.transaction.actions[0] {
            Action::FunctionCall(call) => serde_json::from_slice(&call.args).unwrap(),
            other => panic!("expected function call, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_end_to_end_alice_scenario() {
        let h1 = block_hash_string(7);
        let bet_bytes = signed_bet_bytes("alice.test", 42);
        let final_outcome = success_outcome(
            "BetTx",
            vec![receipt("B1", serde_json::json!({ "SuccessValue": "" }))],
        );

        let mut rpc = MockLedgerRpc::new();
        expect_access_keys(&mut rpc, 41);
        let block_hash = h1.clone();
        rpc.expect_block()
            .returning(move |_| Ok(block_with_hash(&block_hash)));
        let sent = expect_broadcasts(
            &mut rpc,
            proxy_outcome_returning(&bet_bytes),
            final_outcome.clone(),
            2,
        );

        let result = engine(rpc).relay_bet(alice_request()).await.unwrap();

        // Broadcast outcome is returned verbatim
        assert_eq!(result.outcome, final_outcome);
        assert_eq!(result.proxy_transaction_hash, "ProxyTx");

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);

        // First leg: relayer calls the proxy with the built input
        let args = proxy_args(&sent[0]);
        assert_eq!(args["account_id"], "alice.test");
        assert_eq!(args["transaction_input"]["nonce"], "42");
        assert_eq!(args["transaction_input"]["block_hash"], h1.as_str());
        assert_eq!(
            args["transaction_input"]["subscriber_public_key"],
            subscriber().public_key.as_str()
        );
        assert_eq!(args["bet_input"]["match_id"], "match-7");
        assert_eq!(args["bet_input"]["team"], "home");
        assert_eq!(args["bet_input"]["amount"], "2500000");

        let proxy_call = SignedTransaction::from_bytes(&BASE64.decode(&sent[0]).unwrap()).unwrap();
        assert_eq!(proxy_call.transaction.receiver_id, PROXY_ID);
        assert_eq!(proxy_call.transaction.nonce, 101);
        match &proxy_call.transaction.actions[0] {
            Action::FunctionCall(call) => {
                assert_eq!(call.method_name, "proxy_bet");
                assert_eq!(call.gas, 300_000_000_000_000);
                assert_eq!(call.deposit, 1);
            }
            other => panic!("unexpected action {:?}", other),
        }

        // Second leg: exactly the bytes the proxy returned
        assert_eq!(BASE64.decode(&sent[1]).unwrap(), bet_bytes);
    }

    #[tokio::test]
    async fn test_failed_proxy_receipt_skips_broadcast() {
        let mut rpc = MockLedgerRpc::new();
        expect_access_keys(&mut rpc, 41);
        rpc.expect_block().returning(|_| Ok(block([7u8; 32])));

        let bet_bytes = signed_bet_bytes("alice.test", 42);
        let mut proxy = proxy_outcome_returning(&bet_bytes);
        proxy.receipts.push(
            crate::chain::ReceiptOutcome {
                id: "MpcReceipt".to_string(),
                executor_id: "v1.signer-prod.testnet".to_string(),
                status: crate::chain::ExecutionStatus::Failure(
                    serde_json::json!({ "ActionError": {} }),
                ),
            },
        );
        // Only the proxy call goes out
        let sent = expect_broadcasts(&mut rpc, proxy, success_outcome("BetTx", vec![]), 1);

        let failure = engine(rpc).relay_bet(alice_request()).await.unwrap_err();

        assert_eq!(failure.state, RelayState::ValidatingProxyReceipts);
        match &failure.error {
            RelayerError::ProxyExecution(receipt) => assert_eq!(receipt.receipt_id, "MpcReceipt"),
            other => panic!("expected ProxyExecution, got {:?}", other),
        }
        assert!(!failure.is_uncertain());
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_return_value_skips_broadcast() {
        let mut rpc = MockLedgerRpc::new();
        expect_access_keys(&mut rpc, 41);
        rpc.expect_block().returning(|_| Ok(block([7u8; 32])));
        let proxy = outcome_with_value(serde_json::json!("signature pending"));
        let sent = expect_broadcasts(&mut rpc, proxy, success_outcome("BetTx", vec![]), 1);

        let failure = engine(rpc).relay_bet(alice_request()).await.unwrap_err();

        assert_eq!(failure.state, RelayState::ExtractingPayload);
        assert!(matches!(failure.error, RelayerError::MalformedPayload(_)));
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_broadcast_receipt_is_uncertain() {
        let mut rpc = MockLedgerRpc::new();
        expect_access_keys(&mut rpc, 41);
        rpc.expect_block().returning(|_| Ok(block([7u8; 32])));
        let bet_bytes = signed_bet_bytes("alice.test", 42);
        let final_outcome = success_outcome("BetTx", vec![failed_receipt("BetReceipt")]);
        expect_broadcasts(&mut rpc, proxy_outcome_returning(&bet_bytes), final_outcome, 2);

        let failure = engine(rpc).relay_bet(alice_request()).await.unwrap_err();

        assert_eq!(failure.state, RelayState::ValidatingFinalReceipts);
        assert!(matches!(failure.error, RelayerError::BroadcastExecution(_)));
        assert!(failure.is_uncertain());
    }

    #[tokio::test]
    async fn test_missing_subscriber_key_submits_nothing() {
        let mut rpc = MockLedgerRpc::new();
        rpc.expect_view_access_key().returning(|account_id, public_key, _| {
            Err(RelayerError::NotFound {
                account_id: account_id.to_string(),
                public_key: public_key.to_string(),
            })
        });
        rpc.expect_block().times(0);
        rpc.expect_broadcast_tx_commit().times(0);

        let failure = engine(rpc).relay_bet(alice_request()).await.unwrap_err();
        assert_eq!(failure.state, RelayState::Building);
        assert!(matches!(failure.error, RelayerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_block_rpc_error_fails_building_and_is_retryable() {
        let mut rpc = MockLedgerRpc::new();
        expect_access_keys(&mut rpc, 41);
        rpc.expect_block()
            .times(1)
            .returning(|_| Err(RelayerError::rpc("block", "502 Bad Gateway")));
        rpc.expect_broadcast_tx_commit().times(0);

        let failure = engine(rpc).relay_bet(alice_request()).await.unwrap_err();

        assert_eq!(failure.state, RelayState::Building);
        assert_eq!(failure.error.kind(), "rpc");
        assert!(failure.error.is_retryable());
        assert!(!failure.is_uncertain());
    }

    #[tokio::test]
    async fn test_proxy_call_timeout_is_uncertain_and_skips_bet() {
        let mut rpc = MockLedgerRpc::new();
        expect_access_keys(&mut rpc, 41);
        rpc.expect_block().returning(|_| Ok(block([7u8; 32])));

        let sent = Arc::new(Mutex::new(Vec::new()));
        let recorder = sent.clone();
        rpc.expect_broadcast_tx_commit().times(1).returning(move |tx| {
            recorder.lock().unwrap().push(tx.to_string());
            Err(RelayerError::Timeout {
                operation: "broadcast_tx_commit".to_string(),
            })
        });

        let failure = engine(rpc).relay_bet(alice_request()).await.unwrap_err();

        assert_eq!(failure.state, RelayState::CallingProxy);
        assert_eq!(failure.error.kind(), "timeout");
        assert!(failure.is_uncertain());

        // Only the relayer's proxy call went out
        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let only = SignedTransaction::from_bytes(&BASE64.decode(&sent[0]).unwrap()).unwrap();
        assert_eq!(only.transaction.signer_id, RELAYER_ID);
    }

    #[tokio::test]
    async fn test_empty_fields_are_rejected_before_any_rpc() {
        let mut rpc = MockLedgerRpc::new();
        rpc.expect_view_access_key().times(0);
        rpc.expect_broadcast_tx_commit().times(0);

        let mut request = alice_request();
        request.team = "  ".to_string();
        let failure = engine(rpc).relay_bet(request).await.unwrap_err();
        assert!(matches!(failure.error, RelayerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_sequential_relays_use_consecutive_nonces() {
        // The subscriber nonce advances once each bet lands on-chain
        let on_chain = Arc::new(AtomicU64::new(41));
        let mut rpc = MockLedgerRpc::new();
        let reader = on_chain.clone();
        rpc.expect_view_access_key()
            .returning(move |account_id, _, _| {
                if account_id.to_string() == RELAYER_ID {
                    Ok(access_key(100))
                } else {
                    Ok(access_key(reader.load(Ordering::SeqCst)))
                }
            });
        rpc.expect_block().returning(|_| Ok(block([7u8; 32])));

        let sent = Arc::new(Mutex::new(Vec::new()));
        let recorder = sent.clone();
        let writer = on_chain.clone();
        rpc.expect_broadcast_tx_commit().times(4).returning(move |tx| {
            let tx = tx.to_string();
            recorder.lock().unwrap().push(tx.clone());
            let signed = SignedTransaction::from_bytes(&BASE64.decode(&tx).unwrap()).unwrap();
            if signed.transaction.signer_id == RELAYER_ID {
                let args = proxy_args(&tx);
                let nonce: u64 = args["transaction_input"]["nonce"]
                    .as_str()
                    .unwrap()
                    .parse()
                    .unwrap();
                Ok(proxy_outcome_returning(&signed_bet_bytes("alice.test", nonce)))
            } else {
                writer.store(signed.transaction.nonce, Ordering::SeqCst);
                Ok(success_outcome("BetTx", vec![]))
            }
        });

        let engine = engine(rpc);
        engine.relay_bet(alice_request()).await.unwrap();
        engine.relay_bet(alice_request()).await.unwrap();

        let sent = sent.lock().unwrap();
        let nonces: Vec<Value> = [&sent[0], &sent[2]]
            .iter()
            .map(|tx| proxy_args(tx)["transaction_input"]["nonce"].clone())
            .collect();
        assert_eq!(nonces, vec![Value::from("42"), Value::from("43")]);
    }

    #[tokio::test]
    async fn test_cleanup_forgets_idle_subscribers() {
        let mut rpc = MockLedgerRpc::new();
        rpc.expect_view_access_key().returning(|account_id, public_key, _| {
            Err(RelayerError::NotFound {
                account_id: account_id.to_string(),
                public_key: public_key.to_string(),
            })
        });

        let engine = engine(rpc);
        let _ = engine.relay_bet(alice_request()).await;
        assert_eq!(engine.subscriber_locks.len(), 1);
        engine.cleanup();
        assert!(engine.subscriber_locks.is_empty());
    }
}
