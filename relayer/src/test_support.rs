//! Shared fixtures for unit tests

use crate::chain::{AccessKeyView, BlockView, ExecutionOutcome};
use crate::chain::views::BlockHeaderView;
use crate::config::RelayerConfig;
use crate::relay::RelayRequest;
use crate::tx::gas::DEFAULT_PROXY_GAS;
use crate::tx::primitives::{Action, FunctionCallAction, Transaction};
use crate::tx::{BetInput, KeyPair, SubscriberRef};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

pub const RELAYER_ID: &str = "relay.betvex.testnet";
pub const PROXY_ID: &str = "proxy-bet-1.testnet";
pub const BETS_CONTRACT_ID: &str = "bets.betvex.testnet";

pub fn relayer_key() -> KeyPair {
    KeyPair::from_seed(&[11u8; 32])
}

pub fn subscriber_key() -> KeyPair {
    KeyPair::from_seed(&[22u8; 32])
}

pub fn relayer_config() -> RelayerConfig {
    RelayerConfig {
        account_id: RELAYER_ID.to_string(),
        proxy_contract_id: PROXY_ID.to_string(),
        proxy_method: "proxy_bet".to_string(),
        gas: DEFAULT_PROXY_GAS,
        attached_deposit: "1".to_string(),
    }
}

pub fn subscriber() -> SubscriberRef {
    SubscriberRef {
        account_id: "alice.test".to_string(),
        public_key: subscriber_key().public_key().to_string(),
    }
}

pub fn bet() -> BetInput {
    BetInput {
        match_id: "match-7".to_string(),
        team: "home".to_string(),
        amount: "2500000".to_string(),
    }
}

pub fn alice_request() -> RelayRequest {
    let subscriber = subscriber();
    let bet = bet();
    RelayRequest {
        subscriber_account_id: subscriber.account_id,
        subscriber_public_key: subscriber.public_key,
        match_id: bet.match_id,
        team: bet.team,
        amount: bet.amount,
    }
}

pub fn access_key(nonce: u64) -> AccessKeyView {
    AccessKeyView {
        nonce,
        block_height: 1_000,
        block_hash: block_hash_string(1),
    }
}

pub fn block_hash_string(fill: u8) -> String {
    bs58::encode([fill; 32]).into_string()
}

pub fn block_with_hash(hash: &str) -> BlockView {
    BlockView {
        header: BlockHeaderView {
            height: 1_001,
            hash: hash.to_string(),
        },
    }
}

pub fn block(hash: [u8; 32]) -> BlockView {
    block_with_hash(&bs58::encode(hash).into_string())
}

/// Raw receipt entry as the node reports it
pub fn receipt(id: &str, status: Value) -> Value {
    json!({
        "id": id,
        "outcome": { "executor_id": PROXY_ID, "status": status }
    })
}

pub fn failed_receipt(id: &str) -> Value {
    receipt(
        id,
        json!({ "Failure": { "ActionError": { "index": 0, "kind": { "FunctionCallError": { "ExecutionError": "Smart contract panicked" } } } } }),
    )
}

fn raw_outcome(tx_hash: &str, status: Value, receipts: Vec<Value>) -> Value {
    json!({
        "status": status,
        "transaction": { "hash": tx_hash },
        "transaction_outcome": {
            "id": tx_hash,
            "outcome": { "executor_id": RELAYER_ID, "status": { "SuccessReceiptId": "R0" } }
        },
        "receipts_outcome": receipts,
    })
}

/// Committed outcome with an empty return value
pub fn success_outcome(tx_hash: &str, receipts: Vec<Value>) -> ExecutionOutcome {
    ExecutionOutcome::from_rpc(
        "broadcast_tx_commit",
        raw_outcome(tx_hash, json!({ "SuccessValue": "" }), receipts),
    )
    .unwrap()
}

pub fn outcome_with_receipts(receipts: Vec<Value>) -> ExecutionOutcome {
    success_outcome("TxHash", receipts)
}

/// Proxy outcome whose final return value is `value` serialized as JSON
pub fn outcome_with_value(value: Value) -> ExecutionOutcome {
    let encoded = BASE64.encode(value.to_string());
    ExecutionOutcome::from_rpc(
        "broadcast_tx_commit",
        raw_outcome(
            "ProxyTx",
            json!({ "SuccessValue": encoded }),
            vec![
                receipt("ProxyReceipt", json!({ "SuccessReceiptId": "MpcReceipt" })),
                receipt("MpcReceipt", json!({ "SuccessValue": "" })),
            ],
        ),
    )
    .unwrap()
}

/// Proxy outcome returning the given signed transaction bytes
pub fn proxy_outcome_returning(bytes: &[u8]) -> ExecutionOutcome {
    outcome_with_value(json!(bytes))
}

/// A bet transaction signed by the subscriber key, as the MPC service
/// would produce it
pub fn signed_bet_bytes(signer_id: &str, nonce: u64) -> Vec<u8> {
    let key = subscriber_key();
    Transaction {
        signer_id: signer_id.to_string(),
        public_key: key.public_key(),
        nonce,
        receiver_id: BETS_CONTRACT_ID.to_string(),
        block_hash: [7u8; 32],
        actions: vec![Action::FunctionCall(FunctionCallAction {
            method_name: "place_bet".to_string(),
            args: br#"{"match_id":"match-7","team":"home","amount":"2500000"}"#.to_vec(),
            gas: 30_000_000_000_000,
            deposit: 0,
        })],
    }
    .sign(&key)
    .unwrap()
    .to_bytes()
    .unwrap()
}
