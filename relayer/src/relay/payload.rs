//! Extraction of the MPC-signed subscriber transaction from the proxy outcome
//!
//! The proxy contract returns the signed transaction as a JSON array of
//! bytes. The bytes are kept exactly as returned; decoding them only checks
//! that they are a complete signed transaction for the expected signer and
//! nonce.

use crate::chain::{ExecutionOutcome, ExecutionStatus};
use crate::error::{RelayerError, RelayerResult};
use crate::tx::SignedTransaction;

/// Signed subscriber transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    /// Exact bytes returned by the proxy call
    pub bytes: Vec<u8>,
    /// Base58 hash the ledger will assign
    pub transaction_hash: String,
    pub signer_id: String,
    pub receiver_id: String,
    pub nonce: u64,
}

/// What the payload must match
#[derive(Debug, Clone, Copy)]
pub struct Expected<'a> {
    pub signer_id: &'a str,
    pub nonce: u64,
}

fn malformed(message: impl Into<String>) -> RelayerError {
    RelayerError::MalformedPayload(message.into())
}

/// Read the proxy call's final return value as a signed transaction
pub fn extract(outcome: &ExecutionOutcome, expected: Expected<'_>) -> RelayerResult<SignedPayload> {
    let value = match &outcome.status {
        ExecutionStatus::SuccessValue(value) => value,
        other => {
            return Err(malformed(format!(
                "proxy call produced no return value (status {:?})",
                other
            )))
        }
    };

    let bytes: Vec<u8> = serde_json::from_slice(value)
        .map_err(|e| malformed(format!("return value is not a JSON byte array: {}", e)))?;
    if bytes.is_empty() {
        return Err(malformed("return value is an empty byte array"));
    }

    let signed = SignedTransaction::from_bytes(&bytes)
        .map_err(|e| malformed(format!("bytes are not a signed transaction: {}", e)))?;
    let transaction = &signed.transaction;

    if transaction.signer_id != expected.signer_id {
        return Err(malformed(format!(
            "signed for {} instead of {}",
            transaction.signer_id, expected.signer_id
        )));
    }
    if transaction.nonce != expected.nonce {
        return Err(malformed(format!(
            "signed with nonce {} instead of {}",
            transaction.nonce, expected.nonce
        )));
    }

    Ok(SignedPayload {
        transaction_hash: signed.hash_string()?,
        signer_id: transaction.signer_id.clone(),
        receiver_id: transaction.receiver_id.clone(),
        nonce: transaction.nonce,
        bytes,
    })
}
