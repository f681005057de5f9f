//! Block records and their hash-chained construction

use crate::error::ChainError;
use crate::hashing::sha256;
use crate::miner::{CancelToken, ProofOfWork};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

pub const BLOCK_VERSION: u64 = 0;

/// One mined block. Immutable once mined: `Block::mine` is the only
/// constructor and nothing mutates a block afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub version: u64,
    /// Hash of the predecessor; empty only for the genesis block.
    pub prev_hash: Vec<u8>,
    /// Digest over the concatenated transaction ids. Deliberately a flat
    /// digest rather than a Merkle tree.
    pub tx_root: Vec<u8>,
    pub timestamp: u64,
    pub difficulty: u64,
    pub nonce: u64,
    /// The proof-of-work digest over the header fields at the found nonce.
    pub hash: Vec<u8>,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Builds a block on `prev_hash` and runs the proof-of-work search over
    /// its header fields. Pass an empty `prev_hash` for the genesis block.
    pub fn mine(
        transactions: Vec<Transaction>,
        prev_hash: Vec<u8>,
        difficulty: u64,
        cancel: &CancelToken,
    ) -> Result<Block, ChainError> {
        let mut block = Block {
            version: BLOCK_VERSION,
            prev_hash,
            tx_root: Vec::new(),
            timestamp: chrono::Utc::now().timestamp() as u64,
            difficulty,
            nonce: 0,
            hash: Vec::new(),
            transactions,
        };
        block.tx_root = block.compute_tx_root();

        let (hash, nonce) = ProofOfWork::new(&block).run(cancel)?;
        block.hash = hash;
        block.nonce = nonce;
        Ok(block)
    }

    /// Digest over the concatenation of the contained transaction ids.
    pub fn compute_tx_root(&self) -> Vec<u8> {
        let mut joined = Vec::new();
        for tx in &self.transactions {
            joined.extend_from_slice(&tx.id);
        }
        sha256(&joined).to_vec()
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ChainError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn deserialize(data: &[u8]) -> Result<Block, ChainError> {
        Ok(bincode::deserialize(data)?)
    }
}
