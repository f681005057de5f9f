//! Cryptographic primitives for CopperChain

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
/// This prevents repeated, unnecessary context creation.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Public key material as stored in transaction inputs: the two curve
/// coordinates X and Y concatenated, 32 bytes each, no format prefix.
pub const PUBLIC_KEY_XY_SIZE: usize = 64;

/// Compact ECDSA signature: the r and s scalars concatenated, 32 bytes each.
pub const SIGNATURE_SIZE: usize = COMPACT_SIGNATURE_SIZE;

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Result<Self, ChainError> {
        let secret_key = SecretKey::new(&mut OsRng);
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);

        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Creates a KeyPair from an existing SecretKey.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::CryptoError(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::CryptoError(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    /// Returns the public key as X||Y coordinate bytes. The uncompressed
    /// SEC1 form is 0x04||X||Y; the constant prefix is stripped so the
    /// stored material is exactly the two fixed-width coordinates.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_XY_SIZE] {
        let uncompressed = self.public_key.serialize_uncompressed();
        let mut xy = [0u8; PUBLIC_KEY_XY_SIZE];
        xy.copy_from_slice(&uncompressed[1..]);
        xy
    }

    /// Signs a message (which is first hashed using SHA-256) and returns the compact signature bytes.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_SIZE], ChainError> {
        let digest = Sha256::digest(message);

        let message = Message::from_digest_slice(&digest)
            .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;

        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);

        let compact_sig_bytes: [u8; SIGNATURE_SIZE] = signature.serialize_compact();
        Ok(compact_sig_bytes)
    }
}

/// Reassembles a secp256k1 public key from its X||Y coordinate bytes.
fn public_key_from_xy(xy: &[u8]) -> Result<PublicKey, ChainError> {
    if xy.len() != PUBLIC_KEY_XY_SIZE {
        return Err(ChainError::CryptoError(format!(
            "Public key material must be exactly {} bytes (X||Y), got {}",
            PUBLIC_KEY_XY_SIZE,
            xy.len()
        )));
    }

    let mut uncompressed = [0u8; PUBLIC_KEY_XY_SIZE + 1];
    uncompressed[0] = 0x04;
    uncompressed[1..].copy_from_slice(xy);

    PublicKey::from_slice(&uncompressed)
        .map_err(|e| ChainError::CryptoError(format!("Invalid public key: {}", e)))
}

/// Verifies an ECDSA signature given the X||Y public key bytes, message, and
/// compact r||s signature bytes.
pub fn verify_signature(
    public_key_xy: &[u8],
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<(), ChainError> {
    if signature_bytes.len() != SIGNATURE_SIZE {
        return Err(ChainError::CryptoError(format!(
            "Signature must be exactly {} bytes (compact r||s), got {}",
            SIGNATURE_SIZE,
            signature_bytes.len()
        )));
    }

    let public_key = public_key_from_xy(public_key_xy)?;

    let digest = Sha256::digest(message);

    let message = Message::from_digest_slice(&digest)
        .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;

    let signature = Signature::from_compact(signature_bytes)
        .map_err(|e| ChainError::CryptoError(format!("Invalid signature: {}", e)))?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| ChainError::CryptoError("Signature verification failed".to_string()))
}
