//! Transaction side of the relayer: keys, wire format, nonce discipline,
//! the subscriber input builder and the relayer's signing session

pub mod builder;
pub mod gas;
pub mod keys;
pub mod nonce;
pub mod primitives;
pub mod session;

pub use builder::{BetInput, PreparedBet, SubscriberRef, TransactionBuilder, TransactionInput};
pub use gas::CallBudget;
pub use keys::{KeyError, KeyPair, PublicKey, Signature};
pub use nonce::{SubscriberGuard, SubscriberLocks};
pub use primitives::{SignedTransaction, Transaction};
pub use session::Session;
