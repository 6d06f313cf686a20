//! Receipt validation
//!
//! A call that fans out through several contracts can report a successful
//! top-level status while a receipt deeper in the chain failed. Every
//! receipt is checked. Only the status tag matters; business results live
//! in return values and are the caller's concern.

use crate::chain::{ExecutionOutcome, ExecutionStatus};
use crate::error::ReceiptFailure;

/// Fail on the first receipt that did not succeed. No receipts is success.
pub fn validate(outcome: &ExecutionOutcome) -> Result<(), ReceiptFailure> {
    match outcome
        .receipts
        .iter()
        .find(|receipt| !receipt.status.is_success())
    {
        None => Ok(()),
        Some(receipt) => Err(ReceiptFailure {
            receipt_id: receipt.id.clone(),
            status: match &receipt.status {
                ExecutionStatus::Failure(raw) => raw.to_string(),
                other => format!("{:?}", other),
            },
        }),
    }
}
