//! Relayer session: credentials plus an authenticated handle on the ledger
//!
//! The session owns the relayer key for its whole lifetime. It caches
//! nothing else: nonces and block hashes are read fresh for every
//! transaction it signs.

use super::keys::{KeyPair, PublicKey};
use super::primitives::{decode_block_hash, Action, FunctionCallAction, Transaction};
use crate::chain::{ExecutionOutcome, Finality, LedgerRpc};
use crate::error::{RelayerError, RelayerResult};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Relayer account and its signing key. Never serialized or logged.
pub struct RelayerIdentity {
    account_id: String,
    key: KeyPair,
}

impl fmt::Debug for RelayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayerIdentity")
            .field("account_id", &self.account_id)
            .field("public_key", &self.key.public_key())
            .finish()
    }
}

/// Authenticated session for the relayer account on one network
pub struct Session {
    identity: RelayerIdentity,
    /// Network name, for logging
    network_id: String,
    rpc: Arc<dyn LedgerRpc>,
    /// All relayer transactions share one access-key nonce, so only one may
    /// be between nonce read and commit at any time.
    signing_lock: Mutex<()>,
}

impl Session {
    /// Open a session from raw key material.
    ///
    /// Fails with a config error when the key is absent or malformed.
    pub fn open(
        account_id: &str,
        private_key: &str,
        network_id: &str,
        rpc: Arc<dyn LedgerRpc>,
    ) -> RelayerResult<Self> {
        if account_id.trim().is_empty() {
            return Err(RelayerError::Config("relayer account id is empty".to_string()));
        }
        if private_key.trim().is_empty() {
            return Err(RelayerError::Config("relayer private key is empty".to_string()));
        }

        let key: KeyPair = private_key
            .parse()
            .map_err(|e| RelayerError::Config(format!("invalid relayer private key: {}", e)))?;

        info!(
            "Session opened for {} on {} with key {}",
            account_id,
            network_id,
            key.public_key()
        );

        Ok(Self {
            identity: RelayerIdentity {
                account_id: account_id.to_string(),
                key,
            },
            network_id: network_id.to_string(),
            rpc,
            signing_lock: Mutex::new(()),
        })
    }

    pub fn account_id(&self) -> &str {
        &self.identity.account_id
    }

    pub fn public_key(&self) -> PublicKey {
        self.identity.key.public_key()
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    /// Ledger handle shared with the rest of the pipeline
    pub fn rpc(&self) -> &dyn LedgerRpc {
        self.rpc.as_ref()
    }

    /// Call a contract method as the relayer and wait for the committed outcome.
    ///
    /// The outcome is returned whatever its status; judging receipts is the
    /// caller's job.
    pub async fn function_call(
        &self,
        contract_id: &str,
        method_name: &str,
        args: Vec<u8>,
        gas: u64,
        deposit: u128,
    ) -> RelayerResult<ExecutionOutcome> {
        let _guard = self.signing_lock.lock().await;

        let public_key = self.public_key();
        let access_key = self
            .rpc
            .view_access_key(
                &self.identity.account_id,
                &public_key.to_string(),
                Finality::Optimistic,
            )
            .await?;
        let block = self.rpc.block(Finality::Final).await?;

        let nonce = access_key.nonce.checked_add(1).ok_or_else(|| {
            RelayerError::Internal("relayer access key nonce overflow".to_string())
        })?;

        let transaction = Transaction {
            signer_id: self.identity.account_id.clone(),
            public_key,
            nonce,
            receiver_id: contract_id.to_string(),
            block_hash: decode_block_hash(&block.header.hash)?,
            actions: vec![Action::FunctionCall(FunctionCallAction {
                method_name: method_name.to_string(),
                args,
                gas,
                deposit,
            })],
        };

        let signed = transaction.sign(&self.identity.key)?;
        debug!(
            "Signed {}.{} as {} (nonce {}, tx {})",
            contract_id,
            method_name,
            self.identity.account_id,
            nonce,
            signed.hash_string()?
        );

        self.broadcast(&signed.to_bytes()?).await
    }

    /// Submit already-signed transaction bytes and wait for commit
    pub async fn broadcast(&self, signed_tx: &[u8]) -> RelayerResult<ExecutionOutcome> {
        let encoded = BASE64.encode(signed_tx);
        self.rpc.broadcast_tx_commit(&encoded).await
    }
}
