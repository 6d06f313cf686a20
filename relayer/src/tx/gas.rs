//! Gas allowance and deposit attached to proxy calls

use crate::config::RelayerConfig;
use crate::error::{RelayerError, RelayerResult};

/// One teragas
pub const TGAS: u64 = 1_000_000_000_000;

/// Maximum prepaid gas for a single function call
pub const MAX_PREPAID_GAS: u64 = 300 * TGAS;

/// Default allowance for the proxy call. The MPC signing hop is expensive,
/// so the proxy gets everything a single call may carry.
pub const DEFAULT_PROXY_GAS: u64 = MAX_PREPAID_GAS;

/// Gas and deposit attached to every proxy call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallBudget {
    /// Prepaid gas
    pub gas: u64,
    /// Attached deposit in yoctoNEAR
    pub deposit: u128,
}

impl CallBudget {
    /// Build and validate the budget from relayer configuration
    pub fn from_config(config: &RelayerConfig) -> RelayerResult<Self> {
        let deposit = config.attached_deposit.trim().parse::<u128>().map_err(|e| {
            RelayerError::Config(format!(
                "relayer.attached_deposit {:?} is not a yoctoNEAR amount: {}",
                config.attached_deposit, e
            ))
        })?;

        Self::new(config.gas, deposit)
    }

    pub fn new(gas: u64, deposit: u128) -> RelayerResult<Self> {
        if gas == 0 || gas > MAX_PREPAID_GAS {
            return Err(RelayerError::Config(format!(
                "gas allowance {} outside 1..={}",
                gas, MAX_PREPAID_GAS
            )));
        }
        // Access-controlled contract methods require a non-zero deposit
        if deposit == 0 {
            return Err(RelayerError::Config(
                "attached deposit must be at least 1 yoctoNEAR".to_string(),
            ));
        }

        Ok(Self { gas, deposit })
    }

    /// Gas expressed in TGas, for logging
    pub fn tgas(&self) -> u64 {
        self.gas / TGAS
    }
}
