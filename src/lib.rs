//! CopperChain - an educational proof-of-work blockchain with a UTXO ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Blockchain
//! - [`block`] - Block structure, transaction root, serialization
//! - [`chain`] - Chain store: genesis, validated append, backward iteration
//! - [`transaction`] - Transaction types and the sign/verify protocol
//! - [`utxo`] - Unspent-output scans and spendable selection
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work search and verification
//!
//! ## Cryptography & Identity
//! - [`crypto`] - secp256k1 key pairs and signatures
//! - [`wallet`] - Addresses and the file-backed keystore
//! - [`hashing`] - Digests and canonical byte encoding
//!
//! ## State Management
//! - [`persistence`] - Database layer (SQLite)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Blockchain
// ============================================================================
pub mod block;
pub mod chain;
pub mod transaction;
pub mod utxo;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography & Identity
// ============================================================================
pub mod crypto;
pub mod hashing;
pub mod wallet;

// ============================================================================
// State Management
// ============================================================================
pub mod persistence;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
