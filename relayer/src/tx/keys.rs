//! Key parsing and signing for NEAR accounts
//!
//! Keys travel as `<curve>:<base58>` strings. Secret keys for ed25519 are
//! either the 64-byte `seed || public` form that NEAR tooling writes, or a
//! bare 32-byte seed.
//!
//! Secret bytes never appear in `Debug` output or error messages.

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signer, SigningKey, SECRET_KEY_LENGTH};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const ED25519_PREFIX: &str = "ed25519";
const SECP256K1_PREFIX: &str = "secp256k1";

/// Errors that can occur during key parsing
#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    #[error("unknown key type {0:?}")]
    UnknownKeyType(String),

    #[error("key is not valid base58")]
    InvalidEncoding,

    #[error("{key_type} key has wrong length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        key_type: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("secret key does not match its embedded public key")]
    KeypairMismatch,
}

/// A public key as it appears on-chain
#[derive(Clone, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum PublicKey {
    Ed25519([u8; 32]),
    Secp256k1([u8; 64]),
}

/// A signature as it appears in a signed transaction
#[derive(Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Signature {
    Ed25519([u8; 64]),
    Secp256k1([u8; 65]),
}

/// An ed25519 signing key pair
pub struct KeyPair {
    signing_key: SigningKey,
}

fn split_key(s: &str) -> Result<(&str, Vec<u8>), KeyError> {
    let (key_type, data) = match s.split_once(':') {
        Some((key_type, data)) => (key_type, data),
        None => (ED25519_PREFIX, s),
    };
    let bytes = bs58::decode(data)
        .into_vec()
        .map_err(|_| KeyError::InvalidEncoding)?;
    Ok((key_type, bytes))
}

fn to_array<const N: usize>(key_type: &'static str, bytes: &[u8]) -> Result<[u8; N], KeyError> {
    bytes.try_into().map_err(|_| KeyError::InvalidLength {
        key_type,
        expected: N,
        actual: bytes.len(),
    })
}

impl PublicKey {
    pub fn key_type(&self) -> &'static str {
        match self {
            PublicKey::Ed25519(_) => ED25519_PREFIX,
            PublicKey::Secp256k1(_) => SECP256K1_PREFIX,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PublicKey::Ed25519(bytes) => bytes,
            PublicKey::Secp256k1(bytes) => bytes,
        }
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_type, bytes) = split_key(s)?;
        match key_type {
            ED25519_PREFIX => Ok(PublicKey::Ed25519(to_array(ED25519_PREFIX, &bytes)?)),
            SECP256K1_PREFIX => Ok(PublicKey::Secp256k1(to_array(SECP256K1_PREFIX, &bytes)?)),
            other => Err(KeyError::UnknownKeyType(other.to_string())),
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.key_type(),
            bs58::encode(self.as_bytes()).into_string()
        )
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Ed25519(bytes) => {
                write!(f, "ed25519:{}", bs58::encode(bytes).into_string())
            }
            Signature::Secp256k1(bytes) => {
                write!(f, "secp256k1:{}", bs58::encode(bytes).into_string())
            }
        }
    }
}

impl KeyPair {
    /// Deterministic key pair from a 32-byte seed
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::Ed25519(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::Ed25519(self.signing_key.sign(message).to_bytes())
    }

    /// Export in the `ed25519:<base58(seed || public)>` form
    #[cfg(test)]
    pub fn to_secret_string(&self) -> String {
        let mut bytes = self.signing_key.to_bytes().to_vec();
        bytes.extend_from_slice(&self.signing_key.verifying_key().to_bytes());
        format!("{}:{}", ED25519_PREFIX, bs58::encode(bytes).into_string())
    }
}

impl FromStr for KeyPair {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_type, bytes) = split_key(s.trim())?;
        if key_type != ED25519_PREFIX {
            return Err(KeyError::UnknownKeyType(key_type.to_string()));
        }

        match bytes.len() {
            SECRET_KEY_LENGTH => {
                let seed: [u8; SECRET_KEY_LENGTH] = to_array(ED25519_PREFIX, &bytes)?;
                Ok(Self::from_seed(&seed))
            }
            64 => {
                let seed: [u8; SECRET_KEY_LENGTH] =
                    to_array(ED25519_PREFIX, &bytes[..SECRET_KEY_LENGTH])?;
                let pair = Self::from_seed(&seed);
                if pair.signing_key.verifying_key().as_bytes()[..] != bytes[SECRET_KEY_LENGTH..] {
                    return Err(KeyError::KeypairMismatch);
                }
                Ok(pair)
            }
            actual => Err(KeyError::InvalidLength {
                key_type: ED25519_PREFIX,
                expected: 64,
                actual,
            }),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .field("secret", &"<redacted>")
            .finish()
    }
}
