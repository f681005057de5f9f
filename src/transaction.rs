//! Transactions: coinbase rewards, peer-to-peer transfers, and the
//! per-input sign/verify protocol
//!
//! A transaction's identity hash is computed at construction time, before
//! signing, and signing never changes it. Each input is signed against its
//! own scoped payload: a copy of the transaction with all signatures and
//! public keys cleared, the current input's public key field temporarily
//! holding the public key hash of the output it references. The payload
//! hash is chained through the copy's id field; verification replays the
//! identical sequence, so both sides always agree.

use crate::chain::Blockchain;
use crate::crypto::{verify_signature, KeyPair};
use crate::error::ChainError;
use crate::hashing::sha256;
use crate::wallet::{decode_address, hash_pub_key, WalletStore};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed mining reward credited by every coinbase transaction.
pub const SUBSIDY: u64 = 50;

/// Sentinel output index used by the coinbase input.
pub const COINBASE_VOUT: i64 = -1;

/// Reference to a prior output, plus the material proving the right to spend it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxInput {
    /// Id of the transaction holding the referenced output; empty for coinbase.
    pub txid: Vec<u8>,
    /// Index of the referenced output, or COINBASE_VOUT.
    pub vout: i64,
    /// Compact r||s signature; empty until signed, always empty for coinbase.
    pub signature: Vec<u8>,
    /// X||Y public key of the spender; arbitrary memo bytes for coinbase.
    pub pub_key: Vec<u8>,
}

/// An amount locked to a public key hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub pub_key_hash: Vec<u8>,
}

impl TxOutput {
    /// Creates an output locked to the public key hash behind `address`.
    pub fn new(value: u64, address: &str) -> Result<Self, ChainError> {
        Ok(TxOutput {
            value,
            pub_key_hash: decode_address(address)?,
        })
    }

    pub fn is_locked_with(&self, pub_key_hash: &[u8]) -> bool {
        self.pub_key_hash == pub_key_hash
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Vec<u8>,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Creates the reward transaction for a mined block. The sentinel input
    /// carries no signature obligation; its public key field holds the note.
    pub fn new_coinbase(to: &str, note: &str) -> Result<Self, ChainError> {
        let input = TxInput {
            txid: Vec::new(),
            vout: COINBASE_VOUT,
            signature: Vec::new(),
            pub_key: note.as_bytes().to_vec(),
        };
        let output = TxOutput::new(SUBSIDY, to)?;

        let mut tx = Transaction {
            id: Vec::new(),
            inputs: vec![input],
            outputs: vec![output],
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// Builds and signs a transfer of `amount` from one address to another,
    /// spending outputs selected from the chain and returning change to the
    /// sender when the selection overshoots.
    pub fn new_transfer(
        from: &str,
        to: &str,
        amount: u64,
        store: &WalletStore,
        chain: &Blockchain,
    ) -> Result<Self, ChainError> {
        decode_address(from)?;
        decode_address(to)?;
        if amount == 0 {
            return Err(ChainError::InvalidTransaction(
                "Transfer amount must be positive".to_string(),
            ));
        }

        let wallet = store
            .get(from)
            .ok_or_else(|| ChainError::UnknownWallet(from.to_string()))?;
        let pub_key_hash = wallet.pub_key_hash();

        let (selected, accumulated) = chain.select_spendable(&pub_key_hash, amount)?;
        if accumulated < amount {
            return Err(ChainError::InsufficientFunds {
                available: accumulated,
                requested: amount,
            });
        }

        let mut inputs = Vec::new();
        for (txid_hex, indices) in selected {
            let txid = hex::decode(&txid_hex)
                .map_err(|e| ChainError::UnresolvedReference(format!("{}: {}", txid_hex, e)))?;
            for vout in indices {
                inputs.push(TxInput {
                    txid: txid.clone(),
                    vout,
                    signature: Vec::new(),
                    pub_key: wallet.keypair.public_key_bytes().to_vec(),
                });
            }
        }

        let mut outputs = vec![TxOutput::new(amount, to)?];
        if accumulated > amount {
            outputs.push(TxOutput::new(accumulated - amount, from)?);
        }

        let mut tx = Transaction {
            id: Vec::new(),
            inputs,
            outputs,
        };
        tx.id = tx.hash()?;

        chain.sign_transaction(&mut tx, &wallet.keypair)?;
        debug!(
            "Built transfer {} ({} -> {}, amount {})",
            hex::encode(&tx.id),
            from,
            to,
            amount
        );
        Ok(tx)
    }

    /// A coinbase has exactly one input with an empty txid and the sentinel index.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].txid.is_empty() && self.inputs[0].vout == COINBASE_VOUT
    }

    /// SHA-256 over the bincode serialization of the record as it currently stands.
    fn hash(&self) -> Result<Vec<u8>, ChainError> {
        let encoded = bincode::serialize(self)?;
        Ok(sha256(&encoded).to_vec())
    }

    /// Copy with every input's signature and public key cleared; the scoped
    /// signing payloads are derived from this.
    fn trimmed_copy(&self) -> Transaction {
        let inputs = self
            .inputs
            .iter()
            .map(|input| TxInput {
                txid: input.txid.clone(),
                vout: input.vout,
                signature: Vec::new(),
                pub_key: Vec::new(),
            })
            .collect();

        Transaction {
            id: self.id.clone(),
            inputs,
            outputs: self.outputs.clone(),
        }
    }

    /// Signs every input against its scoped payload. `prev_txs` must hold,
    /// keyed by id, each transaction referenced by an input.
    pub fn sign(
        &mut self,
        keypair: &KeyPair,
        prev_txs: &HashMap<Vec<u8>, Transaction>,
    ) -> Result<(), ChainError> {
        if self.is_coinbase() {
            return Ok(());
        }

        let mut scope = self.trimmed_copy();
        for i in 0..scope.inputs.len() {
            let referenced_lock = referenced_output_lock(&scope.inputs[i], prev_txs)?;
            scope.inputs[i].pub_key = referenced_lock;
            scope.id = scope.hash()?;
            scope.inputs[i].pub_key = Vec::new();

            let signature = keypair.sign(&scope.id)?;
            self.inputs[i].signature = signature.to_vec();
        }
        Ok(())
    }

    /// Verifies every input's signature against the recomputed scoped payload.
    /// Any single bad input invalidates the whole transaction; a missing
    /// referenced transaction is an error, not a false.
    pub fn verify(&self, prev_txs: &HashMap<Vec<u8>, Transaction>) -> Result<bool, ChainError> {
        if self.is_coinbase() {
            return Ok(true);
        }

        let mut scope = self.trimmed_copy();
        for i in 0..self.inputs.len() {
            let input = &self.inputs[i];
            let referenced_lock = referenced_output_lock(input, prev_txs)?;
            scope.inputs[i].pub_key = referenced_lock;
            scope.id = scope.hash()?;
            scope.inputs[i].pub_key = Vec::new();

            if input.signature.is_empty() {
                return Ok(false);
            }
            if verify_signature(&input.pub_key, &scope.id, &input.signature).is_err() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Looks up the public key hash locking the output an input references.
fn referenced_output_lock(
    input: &TxInput,
    prev_txs: &HashMap<Vec<u8>, Transaction>,
) -> Result<Vec<u8>, ChainError> {
    let prev_tx = prev_txs
        .get(&input.txid)
        .ok_or_else(|| ChainError::UnresolvedReference(hex::encode(&input.txid)))?;

    if input.vout < 0 || input.vout as usize >= prev_tx.outputs.len() {
        return Err(ChainError::UnresolvedReference(format!(
            "output {} of transaction {}",
            input.vout,
            hex::encode(&input.txid)
        )));
    }

    Ok(prev_tx.outputs[input.vout as usize].pub_key_hash.clone())
}

/// Convenience used by tests and display code.
pub fn owns_input(input: &TxInput, pub_key_hash: &[u8]) -> bool {
    hash_pub_key(&input.pub_key) == pub_key_hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    fn coinbase_to(wallet: &Wallet) -> Transaction {
        Transaction::new_coinbase(&wallet.address(), "test reward").unwrap()
    }

    /// Hand-builds a signed transfer spending `prev`'s first output.
    fn signed_transfer(
        sender: &Wallet,
        recipient: &Wallet,
        prev: &Transaction,
        amount: u64,
    ) -> (Transaction, HashMap<Vec<u8>, Transaction>) {
        let mut tx = Transaction {
            id: Vec::new(),
            inputs: vec![TxInput {
                txid: prev.id.clone(),
                vout: 0,
                signature: Vec::new(),
                pub_key: sender.keypair.public_key_bytes().to_vec(),
            }],
            outputs: vec![
                TxOutput::new(amount, &recipient.address()).unwrap(),
                TxOutput::new(SUBSIDY - amount, &sender.address()).unwrap(),
            ],
        };
        tx.id = tx.hash().unwrap();

        let mut prev_txs = HashMap::new();
        prev_txs.insert(prev.id.clone(), prev.clone());
        tx.sign(&sender.keypair, &prev_txs).unwrap();
        (tx, prev_txs)
    }

    #[test]
    fn test_coinbase_shape() {
        let wallet = Wallet::new().unwrap();
        let tx = coinbase_to(&wallet);

        assert!(tx.is_coinbase());
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.inputs[0].vout, COINBASE_VOUT);
        assert!(tx.inputs[0].txid.is_empty());
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].value, SUBSIDY);
        assert!(tx.outputs[0].is_locked_with(&wallet.pub_key_hash()));
        assert_eq!(tx.id.len(), 32);
    }

    #[test]
    fn test_coinbase_always_verifies() {
        let wallet = Wallet::new().unwrap();
        let tx = coinbase_to(&wallet);
        // No prior transactions needed; signature content is irrelevant.
        assert!(tx.verify(&HashMap::new()).unwrap());
    }

    #[test]
    fn test_sign_then_verify() {
        let sender = Wallet::new().unwrap();
        let recipient = Wallet::new().unwrap();
        let prev = coinbase_to(&sender);

        let (tx, prev_txs) = signed_transfer(&sender, &recipient, &prev, 30);
        assert!(tx.verify(&prev_txs).unwrap());
    }

    #[test]
    fn test_signing_does_not_change_identity_hash() {
        let sender = Wallet::new().unwrap();
        let recipient = Wallet::new().unwrap();
        let prev = coinbase_to(&sender);

        let mut tx = Transaction {
            id: Vec::new(),
            inputs: vec![TxInput {
                txid: prev.id.clone(),
                vout: 0,
                signature: Vec::new(),
                pub_key: sender.keypair.public_key_bytes().to_vec(),
            }],
            outputs: vec![TxOutput::new(SUBSIDY, &recipient.address()).unwrap()],
        };
        tx.id = tx.hash().unwrap();
        let id_before = tx.id.clone();

        let mut prev_txs = HashMap::new();
        prev_txs.insert(prev.id.clone(), prev.clone());
        tx.sign(&sender.keypair, &prev_txs).unwrap();

        assert_eq!(tx.id, id_before);
    }

    #[test]
    fn test_flipped_signature_bit_fails() {
        let sender = Wallet::new().unwrap();
        let recipient = Wallet::new().unwrap();
        let prev = coinbase_to(&sender);

        let (mut tx, prev_txs) = signed_transfer(&sender, &recipient, &prev, 10);
        tx.inputs[0].signature[17] ^= 0x01;
        assert!(!tx.verify(&prev_txs).unwrap());
    }

    #[test]
    fn test_substituted_public_key_fails() {
        let sender = Wallet::new().unwrap();
        let recipient = Wallet::new().unwrap();
        let intruder = Wallet::new().unwrap();
        let prev = coinbase_to(&sender);

        let (mut tx, prev_txs) = signed_transfer(&sender, &recipient, &prev, 10);
        tx.inputs[0].pub_key = intruder.keypair.public_key_bytes().to_vec();
        assert!(!tx.verify(&prev_txs).unwrap());
    }

    #[test]
    fn test_unsigned_transfer_fails() {
        let sender = Wallet::new().unwrap();
        let recipient = Wallet::new().unwrap();
        let prev = coinbase_to(&sender);

        let (mut tx, prev_txs) = signed_transfer(&sender, &recipient, &prev, 10);
        tx.inputs[0].signature.clear();
        assert!(!tx.verify(&prev_txs).unwrap());
    }

    #[test]
    fn test_missing_reference_is_an_error() {
        let sender = Wallet::new().unwrap();
        let recipient = Wallet::new().unwrap();
        let prev = coinbase_to(&sender);

        let (tx, _) = signed_transfer(&sender, &recipient, &prev, 10);
        let result = tx.verify(&HashMap::new());
        assert!(matches!(result, Err(ChainError::UnresolvedReference(_))));
    }

    #[test]
    fn test_out_of_range_output_index() {
        let sender = Wallet::new().unwrap();
        let recipient = Wallet::new().unwrap();
        let prev = coinbase_to(&sender);

        let (mut tx, prev_txs) = signed_transfer(&sender, &recipient, &prev, 10);
        tx.inputs[0].vout = 7;
        let result = tx.verify(&prev_txs);
        assert!(matches!(result, Err(ChainError::UnresolvedReference(_))));
    }

    #[test]
    fn test_owns_input() {
        let sender = Wallet::new().unwrap();
        let other = Wallet::new().unwrap();
        let input = TxInput {
            txid: vec![1],
            vout: 0,
            signature: Vec::new(),
            pub_key: sender.keypair.public_key_bytes().to_vec(),
        };
        assert!(owns_input(&input, &sender.pub_key_hash()));
        assert!(!owns_input(&input, &other.pub_key_hash()));
    }
}
