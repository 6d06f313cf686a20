//! Relay states and the terminal failure type

use crate::error::RelayerError;

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Where a relay is in its pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayState {
    Building,
    CallingProxy,
    ValidatingProxyReceipts,
    ExtractingPayload,
    Broadcasting,
    ValidatingFinalReceipts,
    Done,
}

impl RelayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayState::Building => "BUILDING",
            RelayState::CallingProxy => "CALLING_PROXY",
            RelayState::ValidatingProxyReceipts => "VALIDATING_PROXY_RECEIPTS",
            RelayState::ExtractingPayload => "EXTRACTING_PAYLOAD",
            RelayState::Broadcasting => "BROADCASTING",
            RelayState::ValidatingFinalReceipts => "VALIDATING_FINAL_RECEIPTS",
            RelayState::Done => "DONE",
        }
    }

    /// Whether the subscriber's signed transaction may have reached the ledger
    pub fn bet_may_be_submitted(&self) -> bool {
        *self >= RelayState::Broadcasting
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absorbing failure state: the step that failed and why
#[derive(Debug, Error)]
#[error("relay failed in {state}: {error}")]
pub struct RelayFailure {
    pub state: RelayState,
    #[source]
    pub error: RelayerError,
}

impl RelayFailure {
    pub fn new(state: RelayState, error: RelayerError) -> Self {
        Self { state, error }
    }

    /// The outcome of the bet is not known and must not be reported as failed.
    ///
    /// True when the signed bet may have been broadcast, or when the proxy
    /// call itself timed out and may still commit.
    pub fn is_uncertain(&self) -> bool {
        self.state.bet_may_be_submitted()
            || (self.state == RelayState::CallingProxy
                && matches!(self.error, RelayerError::Timeout { .. }))
    }
}
