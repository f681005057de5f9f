//! Error types for CopperChain

use std::fmt;

#[derive(Debug, Clone)]
pub enum ChainError {
    InvalidAddress(String),
    UnknownWallet(String),
    InsufficientFunds { available: u64, requested: u64 },
    UnresolvedReference(String),
    InvalidTransaction(String),
    InvalidProofOfWork,
    MiningInterrupted,
    ChainNotFound(String),
    ChainAlreadyExists(String),
    DatabaseError(String),
    CryptoError(String),
    WalletError(String),
    IoError(String),
    BincodeError(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::InvalidAddress(addr) => write!(f, "Invalid address: {}", addr),
            ChainError::UnknownWallet(addr) => write!(f, "No wallet found for address: {}", addr),
            ChainError::InsufficientFunds {
                available,
                requested,
            } => write!(
                f,
                "Insufficient funds: requested {}, available {}",
                requested, available
            ),
            ChainError::UnresolvedReference(msg) => {
                write!(f, "Unresolved transaction reference: {}", msg)
            }
            ChainError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {}", msg),
            ChainError::InvalidProofOfWork => write!(f, "Invalid proof of work"),
            ChainError::MiningInterrupted => write!(f, "Mining was interrupted"),
            ChainError::ChainNotFound(path) => {
                write!(f, "No blockchain found at {}; create one first", path)
            }
            ChainError::ChainAlreadyExists(path) => {
                write!(f, "A blockchain already exists at {}", path)
            }
            ChainError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ChainError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            ChainError::WalletError(msg) => write!(f, "Wallet error: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
            ChainError::BincodeError(msg) => write!(f, "Bincode error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::BincodeError(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainError {
    fn from(err: rusqlite::Error) -> Self {
        ChainError::DatabaseError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
