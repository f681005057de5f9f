//! Proof-of-work: the cancellable nonce search and block validation

use crate::block::Block;
use crate::error::ChainError;
use crate::hashing::{sha256, u64_be};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How many nonces to try between cancellation checks.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Shared flag for aborting a long-running mining search. The search has no
/// upper bound on iterations, so shutdown paths must be able to stop it
/// without touching chain state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Big-endian bytes of the target threshold 2^(256 - difficulty).
/// A digest wins when it compares below this as a big-endian integer,
/// which for equal-length byte strings is plain lexicographic order.
pub fn target_for(difficulty: u64) -> [u8; 32] {
    let difficulty = difficulty.clamp(1, 255) as usize;
    let bit = 256 - difficulty;
    let mut target = [0u8; 32];
    target[31 - bit / 8] = 1 << (bit % 8);
    target
}

pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: [u8; 32],
}

impl<'a> ProofOfWork<'a> {
    pub fn new(block: &'a Block) -> Self {
        ProofOfWork {
            block,
            target: target_for(block.difficulty),
        }
    }

    /// Serializes the header fields in their fixed order at the given nonce.
    fn prepare_data(&self, nonce: u64) -> Vec<u8> {
        let block = self.block;
        let mut data = Vec::with_capacity(
            8 * 4 + block.prev_hash.len() + block.tx_root.len(),
        );
        data.extend_from_slice(&u64_be(block.version));
        data.extend_from_slice(&block.prev_hash);
        data.extend_from_slice(&block.tx_root);
        data.extend_from_slice(&u64_be(block.timestamp));
        data.extend_from_slice(&u64_be(block.difficulty));
        data.extend_from_slice(&u64_be(nonce));
        data
    }

    /// Searches nonces from zero until the digest falls below the target.
    /// Unbounded by design; returns MiningInterrupted once the token fires.
    pub fn run(&self, cancel: &CancelToken) -> Result<(Vec<u8>, u64), ChainError> {
        debug!(
            "Mining block over {} transaction(s) at difficulty {}",
            self.block.transactions.len(),
            self.block.difficulty
        );

        let mut nonce: u64 = 0;
        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(ChainError::MiningInterrupted);
            }

            let digest = sha256(&self.prepare_data(nonce));
            if digest[..] < self.target[..] {
                info!("Found nonce {} -> {}", nonce, hex::encode(digest));
                return Ok((digest.to_vec(), nonce));
            }
            nonce = nonce.wrapping_add(1);
        }
    }

    /// Re-mining-free validation: the stored hash must match the digest
    /// recomputed at the stored nonce, and the digest must beat the target.
    pub fn validate(&self) -> bool {
        let digest = sha256(&self.prepare_data(self.block.nonce));
        digest[..] == self.block.hash[..] && digest[..] < self.target[..]
    }
}
