//! Wallets and the base58-check address scheme
//!
//! An address encodes `version || pub_key_hash || checksum` in base58, where
//! the public key hash is RIPEMD-160 over SHA-256 of the X||Y key material
//! and the checksum is the first four bytes of a double SHA-256.

use crate::crypto::KeyPair;
use crate::error::ChainError;
use crate::hashing::{checksum, CHECKSUM_LEN};
use log::{debug, info};
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Version byte prepended to every address payload.
pub const ADDRESS_VERSION: u8 = 0x00;

/// Length of a public key hash in bytes (RIPEMD-160 output).
pub const PUB_KEY_HASH_LEN: usize = 20;

/// Hashes public key material into the 20-byte lock used by outputs:
/// SHA-256 first, then RIPEMD-160 over the digest.
pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let sha = Sha256::digest(pub_key);
    Ripemd160::digest(sha).to_vec()
}

/// Encodes a public key hash as a checksum-protected base58 address.
pub fn encode_address(pub_key_hash: &[u8]) -> String {
    let mut payload = Vec::with_capacity(1 + pub_key_hash.len() + CHECKSUM_LEN);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(pub_key_hash);
    let check = checksum(&payload);
    payload.extend_from_slice(&check);
    bs58::encode(payload).into_string()
}

/// Decodes an address back to its public key hash, enforcing the checksum.
pub fn decode_address(address: &str) -> Result<Vec<u8>, ChainError> {
    let payload = bs58::decode(address)
        .into_vec()
        .map_err(|_| ChainError::InvalidAddress(address.to_string()))?;

    if payload.len() < CHECKSUM_LEN + 1 {
        return Err(ChainError::InvalidAddress(address.to_string()));
    }

    let (body, stored_check) = payload.split_at(payload.len() - CHECKSUM_LEN);
    if checksum(body) != stored_check {
        return Err(ChainError::InvalidAddress(address.to_string()));
    }

    Ok(body[1..].to_vec())
}

/// Returns true iff the address decodes and its checksum matches.
pub fn validate_address(address: &str) -> bool {
    decode_address(address).is_ok()
}

/// A wallet is one secp256k1 key pair; the public key hash and address are
/// deterministic functions of the public key.
#[derive(Debug, Clone)]
pub struct Wallet {
    pub keypair: KeyPair,
}

impl Wallet {
    pub fn new() -> Result<Self, ChainError> {
        Ok(Wallet {
            keypair: KeyPair::generate()?,
        })
    }

    pub fn pub_key_hash(&self) -> Vec<u8> {
        hash_pub_key(&self.keypair.public_key_bytes())
    }

    pub fn address(&self) -> String {
        encode_address(&self.pub_key_hash())
    }
}

/// On-disk form of a wallet: the secret key is sufficient to rebuild the pair.
#[derive(Debug, Serialize, Deserialize)]
struct StoredWallet {
    secret_key_hex: String,
}

/// File-backed keystore mapping addresses to key pairs. Passed explicitly to
/// whatever needs signing keys; nothing in the crate reads it as ambient state.
pub struct WalletStore {
    path: PathBuf,
    wallets: HashMap<String, Wallet>,
}

impl WalletStore {
    /// Loads the keystore at `path`, or starts an empty one if the file
    /// does not exist yet.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ChainError> {
        let path = path.as_ref().to_path_buf();
        let mut wallets = HashMap::new();

        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let stored: HashMap<String, StoredWallet> = serde_json::from_str(&content)
                .map_err(|e| ChainError::WalletError(format!("Corrupt wallet file: {}", e)))?;

            for (address, entry) in stored {
                let secret = hex::decode(&entry.secret_key_hex).map_err(|e| {
                    ChainError::WalletError(format!("Bad secret key for {}: {}", address, e))
                })?;
                let keypair = KeyPair::from_secret_bytes(&secret)?;
                wallets.insert(address, Wallet { keypair });
            }
            debug!("Loaded {} wallet(s) from {}", wallets.len(), path.display());
        }

        Ok(WalletStore { path, wallets })
    }

    /// Creates a fresh wallet, persists the keystore, and returns the address.
    pub fn create_wallet(&mut self) -> Result<String, ChainError> {
        let wallet = Wallet::new()?;
        let address = wallet.address();
        self.wallets.insert(address.clone(), wallet);
        self.save()?;
        info!("Created wallet {}", address);
        Ok(address)
    }

    /// Looks up the wallet for an address.
    pub fn get(&self, address: &str) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    /// All addresses currently in the keystore, sorted for stable output.
    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.wallets.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn save(&self) -> Result<(), ChainError> {
        let stored: HashMap<&String, StoredWallet> = self
            .wallets
            .iter()
            .map(|(address, wallet)| {
                (
                    address,
                    StoredWallet {
                        secret_key_hex: hex::encode(wallet.keypair.secret_key.secret_bytes()),
                    },
                )
            })
            .collect();

        let content = serde_json::to_string_pretty(&stored)
            .map_err(|e| ChainError::WalletError(format!("Failed to serialize wallets: {}", e)))?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
