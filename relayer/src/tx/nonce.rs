//! Nonce handling for subscriber access keys
//!
//! Nonces are never cached: the next value is always the on-chain value
//! plus one, read immediately before use. What must be tracked locally is
//! who is currently between that read and the final broadcast. Two relays
//! for the same (account, key) inside that window would compute the same
//! nonce and one of them would be rejected at broadcast.
//!
//! `SubscriberLocks` serializes that window per subscriber key. Relays for
//! different keys do not contend.

use super::builder::SubscriberRef;
use crate::error::{RelayerError, RelayerResult};

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Next usable nonce after the one currently stored on-chain
pub fn next_nonce(current: u64) -> RelayerResult<u64> {
    current
        .checked_add(1)
        .ok_or_else(|| RelayerError::Internal("access key nonce overflow".to_string()))
}

/// Held for the duration of one relay; releases the subscriber on drop
#[derive(Debug)]
pub struct SubscriberGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Per-subscriber-key mutual exclusion
#[derive(Default)]
pub struct SubscriberLocks {
    locks: DashMap<(String, String), Arc<Mutex<()>>>,
}

impl SubscriberLocks {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Wait until no other relay holds this subscriber key
    pub async fn acquire(&self, subscriber: &SubscriberRef) -> SubscriberGuard {
        let key = (subscriber.account_id.clone(), subscriber.public_key.clone());
        // Clone the Arc out so the map shard is not held across the await
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        if lock.try_lock().is_err() {
            debug!(
                "Waiting for in-flight relay on {} / {}",
                subscriber.account_id, subscriber.public_key
            );
        }

        SubscriberGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Drop entries nobody is holding or waiting on
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of tracked subscriber keys
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
