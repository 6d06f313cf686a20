//! Borsh wire format of NEAR transactions
//!
//! Only the action variants the relayer produces or expects back from the
//! signing service are modelled. Variant order matters: borsh encodes the
//! index as the discriminant, and the ledger assigns `FunctionCall = 2`.

use super::keys::{KeyPair, PublicKey, Signature};
use crate::error::{RelayerError, RelayerResult};

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};

/// 32-byte hash (block hash, transaction hash)
pub type CryptoHash = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: u64,
    pub deposit: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Action {
    CreateAccount,
    DeployContract { code: Vec<u8> },
    FunctionCall(FunctionCallAction),
    Transfer { deposit: u128 },
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub signer_id: String,
    pub public_key: PublicKey,
    pub nonce: u64,
    pub receiver_id: String,
    pub block_hash: CryptoHash,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
}

impl Transaction {
    /// SHA-256 of the borsh encoding; this is what gets signed
    pub fn hash(&self) -> RelayerResult<CryptoHash> {
        let bytes = borsh::to_vec(self)
            .map_err(|e| RelayerError::Internal(format!("transaction encoding failed: {}", e)))?;
        Ok(Sha256::digest(&bytes).into())
    }

    pub fn sign(self, key: &KeyPair) -> RelayerResult<SignedTransaction> {
        let hash = self.hash()?;
        Ok(SignedTransaction {
            signature: key.sign(&hash),
            transaction: self,
        })
    }
}

impl SignedTransaction {
    pub fn to_bytes(&self) -> RelayerResult<Vec<u8>> {
        borsh::to_vec(self)
            .map_err(|e| RelayerError::Internal(format!("transaction encoding failed: {}", e)))
    }

    /// Decode a complete signed transaction; trailing bytes are an error
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, std::io::Error> {
        borsh::from_slice(bytes)
    }

    /// Base58 transaction hash, as the ledger reports it
    pub fn hash_string(&self) -> RelayerResult<String> {
        Ok(bs58::encode(self.transaction.hash()?).into_string())
    }
}

/// Decode a base58 block hash into raw bytes
pub fn decode_block_hash(hash: &str) -> RelayerResult<CryptoHash> {
    let bytes = bs58::decode(hash).into_vec().map_err(|e| {
        RelayerError::rpc("block", format!("block hash {:?} is not base58: {}", hash, e))
    })?;
    bytes.as_slice().try_into().map_err(|_| {
        RelayerError::rpc(
            "block",
            format!("block hash {:?} has {} bytes, expected 32", hash, bytes.len()),
        )
    })
}
