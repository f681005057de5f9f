//! The persisted block chain: genesis creation, validated append, and the
//! backward iterator

use crate::block::Block;
use crate::crypto::KeyPair;
use crate::error::ChainError;
use crate::miner::CancelToken;
use crate::persistence::Database;
use crate::transaction::Transaction;
use crate::wallet::validate_address;
use log::info;
use std::collections::HashMap;

pub struct Blockchain {
    db: Database,
    tail: Vec<u8>,
    difficulty: u64,
}

impl Blockchain {
    /// Creates a new chain at `path`: mines a genesis block holding one
    /// coinbase to the founding address and records it as the tail.
    pub fn create(
        path: &str,
        founding_address: &str,
        note: &str,
        difficulty: u64,
        cancel: &CancelToken,
    ) -> Result<Self, ChainError> {
        if !validate_address(founding_address) {
            return Err(ChainError::InvalidAddress(founding_address.to_string()));
        }

        let db = Database::open(path)?;
        if db.tail()?.is_some() {
            return Err(ChainError::ChainAlreadyExists(path.to_string()));
        }

        let coinbase = Transaction::new_coinbase(founding_address, note)?;
        let genesis = Block::mine(vec![coinbase], Vec::new(), difficulty, cancel)?;
        db.put_block(&genesis.hash, &genesis.serialize()?)?;
        info!(
            "Created chain at {} with genesis {}",
            path,
            hex::encode(&genesis.hash)
        );

        Ok(Blockchain {
            db,
            tail: genesis.hash,
            difficulty,
        })
    }

    /// Opens an existing chain; the difficulty is taken from the tail block.
    pub fn open(path: &str) -> Result<Self, ChainError> {
        let db = Database::open(path)?;
        let tail = db
            .tail()?
            .ok_or_else(|| ChainError::ChainNotFound(path.to_string()))?;

        let data = db.get_block(&tail)?.ok_or_else(|| {
            ChainError::DatabaseError(format!("Tail block {} missing", hex::encode(&tail)))
        })?;
        let tail_block = Block::deserialize(&data)?;

        Ok(Blockchain {
            db,
            tail,
            difficulty: tail_block.difficulty,
        })
    }

    /// Hash of the most recently appended block.
    pub fn tip(&self) -> &[u8] {
        &self.tail
    }

    pub fn difficulty(&self) -> u64 {
        self.difficulty
    }

    /// Verifies every supplied transaction, then mines and persists a block
    /// holding them. On any invalid transaction the chain is left untouched
    /// and the offender is named in the error.
    pub fn append_block(
        &mut self,
        transactions: Vec<Transaction>,
        cancel: &CancelToken,
    ) -> Result<Block, ChainError> {
        for tx in &transactions {
            if !self.verify_transaction(tx)? {
                return Err(ChainError::InvalidTransaction(format!(
                    "Signature verification failed for {}",
                    hex::encode(&tx.id)
                )));
            }
        }

        let block = Block::mine(transactions, self.tail.clone(), self.difficulty, cancel)?;
        self.db.put_block(&block.hash, &block.serialize()?)?;
        self.tail = block.hash.clone();
        info!(
            "Appended block {} ({} transaction(s))",
            hex::encode(&block.hash),
            block.transactions.len()
        );
        Ok(block)
    }

    /// Backward iterator from the tail; the genesis block is yielded last.
    pub fn iter(&self) -> ChainIterator<'_> {
        ChainIterator {
            db: &self.db,
            cursor: self.tail.clone(),
        }
    }

    /// Full-scan lookup of a transaction by id.
    pub fn find_transaction(&self, txid: &[u8]) -> Result<Option<Transaction>, ChainError> {
        for block in self.iter() {
            let block = block?;
            for tx in block.transactions {
                if tx.id == txid {
                    return Ok(Some(tx));
                }
            }
        }
        Ok(None)
    }

    /// Resolves every transaction referenced by `tx`'s inputs. A reference
    /// absent from the chain is fatal for signing and verification alike.
    fn resolve_inputs(
        &self,
        tx: &Transaction,
    ) -> Result<HashMap<Vec<u8>, Transaction>, ChainError> {
        let mut prev_txs = HashMap::new();
        for input in &tx.inputs {
            let prev = self
                .find_transaction(&input.txid)?
                .ok_or_else(|| ChainError::UnresolvedReference(hex::encode(&input.txid)))?;
            prev_txs.insert(prev.id.clone(), prev);
        }
        Ok(prev_txs)
    }

    pub fn sign_transaction(
        &self,
        tx: &mut Transaction,
        keypair: &KeyPair,
    ) -> Result<(), ChainError> {
        if tx.is_coinbase() {
            return Ok(());
        }
        let prev_txs = self.resolve_inputs(tx)?;
        tx.sign(keypair, &prev_txs)
    }

    pub fn verify_transaction(&self, tx: &Transaction) -> Result<bool, ChainError> {
        if tx.is_coinbase() {
            return Ok(true);
        }
        let prev_txs = self.resolve_inputs(tx)?;
        tx.verify(&prev_txs)
    }
}

/// Lazy backward walk over the persisted chain. Each advance looks up the
/// cursor hash and moves the cursor to that block's predecessor; the walk
/// ends after the block with an empty prev_hash.
pub struct ChainIterator<'a> {
    db: &'a Database,
    cursor: Vec<u8>,
}

impl Iterator for ChainIterator<'_> {
    type Item = Result<Block, ChainError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_empty() {
            return None;
        }

        let data = match self.db.get_block(&self.cursor) {
            Ok(Some(data)) => data,
            Ok(None) => {
                let missing = hex::encode(&self.cursor);
                self.cursor.clear();
                return Some(Err(ChainError::DatabaseError(format!(
                    "Block {} referenced but not stored",
                    missing
                ))));
            }
            Err(e) => {
                self.cursor.clear();
                return Some(Err(e));
            }
        };

        match Block::deserialize(&data) {
            Ok(block) => {
                self.cursor = block.prev_hash.clone();
                Some(Ok(block))
            }
            Err(e) => {
                self.cursor.clear();
                Some(Err(e))
            }
        }
    }
}
