//! Relay module - the two-hop bet submission pipeline
//!
//! This module provides:
//! - The relay engine driving one bet from input building to final receipts
//! - Receipt validation for both hops
//! - Extraction of the MPC-signed transaction from the proxy return value
//! - Relay states and the terminal failure type

pub mod engine;
pub mod payload;
pub mod receipts;
pub mod state;

pub use engine::{RelayEngine, RelayRequest, RelayResult};
pub use payload::SignedPayload;
pub use state::{RelayFailure, RelayState};
