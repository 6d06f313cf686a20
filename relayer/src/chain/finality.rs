//! Finality qualifiers for ledger view queries
//!
//! The relayer queries at two of NEAR's block heights:
//! - `optimistic`: latest block, may still be reorganised away
//! - `final`: irreversible
//!
//! Access-key nonces are read optimistically so a nonce consumed in the
//! latest block is already visible. Block hashes used as replay anchors are
//! read at `final` so they can never be orphaned.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Finality {
    Optimistic,
    Final,
}

impl Finality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Finality::Optimistic => "optimistic",
            Finality::Final => "final",
        }
    }
}

impl fmt::Display for Finality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
