//! BetVex Relayer - places subscriber bets through a NEAR proxy contract
//!
//! The relayer calls the proxy contract on behalf of a subscriber. The proxy
//! has the subscriber's bet transaction signed by the MPC service and returns
//! it; the relayer then broadcasts that signed transaction and checks every
//! receipt along the way.

pub mod amount;
pub mod api;
pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod relay;
pub mod tx;

#[cfg(test)]
mod test_support;

pub use error::{RelayerError, RelayerResult};
pub use relay::{RelayEngine, RelayFailure, RelayRequest, RelayResult, RelayState};
