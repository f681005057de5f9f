//! UTXO queries: full-chain scans computing unspent outputs per owner
//!
//! The UTXO set is never materialized; every query walks the chain from the
//! tip back to genesis. Within each transaction, outputs are considered
//! before inputs, so a spend recorded in a newer block always shadows the
//! older output it consumes. Both queries use the same traversal direction
//! so greedy selection spends newest outputs first. Complexity is
//! O(transactions x outputs) per query, which is fine at this scale.

use crate::chain::Blockchain;
use crate::error::ChainError;
use crate::transaction::{owns_input, TxOutput};
use std::collections::HashMap;

impl Blockchain {
    /// All outputs locked to `pub_key_hash` that no later input has claimed.
    pub fn list_unspent(&self, pub_key_hash: &[u8]) -> Result<Vec<TxOutput>, ChainError> {
        let mut unspent = Vec::new();
        // txid (hex) -> output indices already claimed by this owner's inputs
        let mut spent: HashMap<String, Vec<i64>> = HashMap::new();

        for block in self.iter() {
            let block = block?;
            for tx in &block.transactions {
                let txid = hex::encode(&tx.id);

                for (index, output) in tx.outputs.iter().enumerate() {
                    let claimed = spent
                        .get(&txid)
                        .is_some_and(|indices| indices.contains(&(index as i64)));
                    if !claimed && output.is_locked_with(pub_key_hash) {
                        unspent.push(output.clone());
                    }
                }

                // Coinbase inputs reference nothing and never mark spends.
                if !tx.is_coinbase() {
                    for input in &tx.inputs {
                        if owns_input(input, pub_key_hash) {
                            spent
                                .entry(hex::encode(&input.txid))
                                .or_default()
                                .push(input.vout);
                        }
                    }
                }
            }
        }

        Ok(unspent)
    }

    /// Scans for outputs until their total covers `amount`, returning the
    /// selected (txid -> output indices) mapping and the accumulated value.
    /// May come back short; the caller must check sufficiency.
    pub fn select_spendable(
        &self,
        pub_key_hash: &[u8],
        amount: u64,
    ) -> Result<(HashMap<String, Vec<i64>>, u64), ChainError> {
        let mut selected: HashMap<String, Vec<i64>> = HashMap::new();
        let mut accumulated: u64 = 0;
        let mut spent: HashMap<String, Vec<i64>> = HashMap::new();

        'scan: for block in self.iter() {
            let block = block?;
            for tx in &block.transactions {
                let txid = hex::encode(&tx.id);

                for (index, output) in tx.outputs.iter().enumerate() {
                    let claimed = spent
                        .get(&txid)
                        .is_some_and(|indices| indices.contains(&(index as i64)));
                    if claimed || !output.is_locked_with(pub_key_hash) {
                        continue;
                    }

                    accumulated += output.value;
                    selected.entry(txid.clone()).or_default().push(index as i64);
                    if accumulated >= amount {
                        break 'scan;
                    }
                }

                if !tx.is_coinbase() {
                    for input in &tx.inputs {
                        if owns_input(input, pub_key_hash) {
                            spent
                                .entry(hex::encode(&input.txid))
                                .or_default()
                                .push(input.vout);
                        }
                    }
                }
            }
        }

        Ok((selected, accumulated))
    }

    /// Spendable balance: the sum of all unspent outputs locked to the hash.
    pub fn balance(&self, pub_key_hash: &[u8]) -> Result<u64, ChainError> {
        Ok(self
            .list_unspent(pub_key_hash)?
            .iter()
            .map(|output| output.value)
            .sum())
    }
}
