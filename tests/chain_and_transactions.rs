//! Integration tests covering chain construction, UTXO queries, and the
//! end-to-end transfer scenario

use copperchain::chain::Blockchain;
use copperchain::error::ChainError;
use copperchain::miner::{CancelToken, ProofOfWork};
use copperchain::transaction::{Transaction, SUBSIDY};
use copperchain::wallet::WalletStore;
use tempfile::TempDir;

/// Low difficulty keeps mining near-instant in tests.
const DIFFICULTY: u64 = 8;

struct TestEnv {
    _dir: TempDir,
    db_path: String,
    store: WalletStore,
}

impl TestEnv {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("chain.db").to_str().unwrap().to_string();
        let wallet_path = dir.path().join("wallets.json");
        let store = WalletStore::load_or_create(wallet_path).unwrap();
        TestEnv {
            _dir: dir,
            db_path,
            store,
        }
    }
}

#[test]
fn test_genesis_chain() {
    let mut env = TestEnv::new();
    let founder = env.store.create_wallet().unwrap();
    let cancel = CancelToken::new();

    let chain = Blockchain::create(&env.db_path, &founder, "testing genesis", DIFFICULTY, &cancel)
        .unwrap();

    // The founder holds exactly the genesis reward.
    let founder_hash = env.store.get(&founder).unwrap().pub_key_hash();
    assert_eq!(chain.balance(&founder_hash).unwrap(), SUBSIDY);

    // One block, and it is the genesis block.
    let blocks: Vec<_> = chain.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].is_genesis());
    assert!(blocks[0].prev_hash.is_empty());
    assert_eq!(blocks[0].hash, chain.tip());
}

#[test]
fn test_create_twice_fails() {
    let mut env = TestEnv::new();
    let founder = env.store.create_wallet().unwrap();
    let cancel = CancelToken::new();

    Blockchain::create(&env.db_path, &founder, "first", DIFFICULTY, &cancel).unwrap();
    let result = Blockchain::create(&env.db_path, &founder, "second", DIFFICULTY, &cancel);
    assert!(matches!(result, Err(ChainError::ChainAlreadyExists(_))));
}

#[test]
fn test_create_with_invalid_address_fails() {
    let env = TestEnv::new();
    let cancel = CancelToken::new();
    let result = Blockchain::create(&env.db_path, "not-an-address", "x", DIFFICULTY, &cancel);
    assert!(matches!(result, Err(ChainError::InvalidAddress(_))));
}

#[test]
fn test_end_to_end_transfer() {
    let mut env = TestEnv::new();
    let founder = env.store.create_wallet().unwrap();
    let recipient = env.store.create_wallet().unwrap();
    let miner = env.store.create_wallet().unwrap();
    let cancel = CancelToken::new();

    let mut chain =
        Blockchain::create(&env.db_path, &founder, "e2e", DIFFICULTY, &cancel).unwrap();

    let amount = 20;
    let transfer =
        Transaction::new_transfer(&founder, &recipient, amount, &env.store, &chain).unwrap();
    let coinbase = Transaction::new_coinbase(&miner, "mined by test").unwrap();
    chain
        .append_block(vec![coinbase, transfer], &cancel)
        .unwrap();

    let founder_hash = env.store.get(&founder).unwrap().pub_key_hash();
    let recipient_hash = env.store.get(&recipient).unwrap().pub_key_hash();
    let miner_hash = env.store.get(&miner).unwrap().pub_key_hash();

    assert_eq!(chain.balance(&founder_hash).unwrap(), SUBSIDY - amount);
    assert_eq!(chain.balance(&recipient_hash).unwrap(), amount);
    assert_eq!(chain.balance(&miner_hash).unwrap(), SUBSIDY);

    // Chain shape: tip block links to genesis, both pass proof-of-work.
    let blocks: Vec<_> = chain.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].prev_hash, blocks[1].hash);
    assert!(blocks[1].is_genesis());
    for block in &blocks {
        assert!(ProofOfWork::new(block).validate());
    }
}

#[test]
fn test_insufficient_funds() {
    let mut env = TestEnv::new();
    let founder = env.store.create_wallet().unwrap();
    let recipient = env.store.create_wallet().unwrap();
    let cancel = CancelToken::new();

    let chain =
        Blockchain::create(&env.db_path, &founder, "funds", DIFFICULTY, &cancel).unwrap();

    let result =
        Transaction::new_transfer(&founder, &recipient, SUBSIDY + 1, &env.store, &chain);
    match result {
        Err(ChainError::InsufficientFunds {
            available,
            requested,
        }) => {
            assert_eq!(available, SUBSIDY);
            assert_eq!(requested, SUBSIDY + 1);
        }
        other => panic!("Expected InsufficientFunds, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_unknown_wallet() {
    let mut env = TestEnv::new();
    let founder = env.store.create_wallet().unwrap();
    let cancel = CancelToken::new();

    let chain =
        Blockchain::create(&env.db_path, &founder, "unknown", DIFFICULTY, &cancel).unwrap();

    // A perfectly valid address with no key pair in the store.
    let outsider = copperchain::wallet::Wallet::new().unwrap();
    let result =
        Transaction::new_transfer(&outsider.address(), &founder, 1, &env.store, &chain);
    assert!(matches!(result, Err(ChainError::UnknownWallet(_))));
}

#[test]
fn test_tampered_transaction_rejected() {
    let mut env = TestEnv::new();
    let founder = env.store.create_wallet().unwrap();
    let recipient = env.store.create_wallet().unwrap();
    let cancel = CancelToken::new();

    let mut chain =
        Blockchain::create(&env.db_path, &founder, "tamper", DIFFICULTY, &cancel).unwrap();
    let tip_before = chain.tip().to_vec();

    let mut transfer =
        Transaction::new_transfer(&founder, &recipient, 10, &env.store, &chain).unwrap();
    transfer.inputs[0].signature[3] ^= 0x01;

    let result = chain.append_block(vec![transfer], &cancel);
    assert!(matches!(result, Err(ChainError::InvalidTransaction(_))));

    // The chain is untouched: same tip, founder still holds the full reward.
    assert_eq!(chain.tip(), tip_before.as_slice());
    let founder_hash = env.store.get(&founder).unwrap().pub_key_hash();
    assert_eq!(chain.balance(&founder_hash).unwrap(), SUBSIDY);
}

#[test]
fn test_select_spendable_comes_back_short() {
    let mut env = TestEnv::new();
    let founder = env.store.create_wallet().unwrap();
    let cancel = CancelToken::new();

    let chain =
        Blockchain::create(&env.db_path, &founder, "short", DIFFICULTY, &cancel).unwrap();
    let founder_hash = env.store.get(&founder).unwrap().pub_key_hash();

    let (selected, accumulated) = chain.select_spendable(&founder_hash, 10_000).unwrap();
    assert_eq!(accumulated, SUBSIDY);
    assert_eq!(selected.len(), 1);
}

#[test]
fn test_reopen_persisted_chain() {
    let mut env = TestEnv::new();
    let founder = env.store.create_wallet().unwrap();
    let recipient = env.store.create_wallet().unwrap();
    let miner = env.store.create_wallet().unwrap();
    let cancel = CancelToken::new();

    let tip;
    {
        let mut chain =
            Blockchain::create(&env.db_path, &founder, "reopen", DIFFICULTY, &cancel).unwrap();
        let transfer =
            Transaction::new_transfer(&founder, &recipient, 5, &env.store, &chain).unwrap();
        let coinbase = Transaction::new_coinbase(&miner, "").unwrap();
        chain.append_block(vec![coinbase, transfer], &cancel).unwrap();
        tip = chain.tip().to_vec();
    }

    let reopened = Blockchain::open(&env.db_path).unwrap();
    assert_eq!(reopened.tip(), tip.as_slice());
    assert_eq!(reopened.difficulty(), DIFFICULTY);

    let recipient_hash = env.store.get(&recipient).unwrap().pub_key_hash();
    assert_eq!(reopened.balance(&recipient_hash).unwrap(), 5);

    // Blocks round-trip identically through persistence.
    let blocks: Vec<_> = reopened.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(blocks.len(), 2);
    for block in &blocks {
        let restored =
            copperchain::block::Block::deserialize(&block.serialize().unwrap()).unwrap();
        assert_eq!(&restored, block);
    }
}

#[test]
fn test_open_missing_chain_fails() {
    let env = TestEnv::new();
    let result = Blockchain::open(&env.db_path);
    assert!(matches!(result, Err(ChainError::ChainNotFound(_))));
}

#[test]
fn test_spend_change_output() {
    // Spend twice in a row so the second transfer consumes the change
    // output created by the first.
    let mut env = TestEnv::new();
    let founder = env.store.create_wallet().unwrap();
    let recipient = env.store.create_wallet().unwrap();
    let miner = env.store.create_wallet().unwrap();
    let cancel = CancelToken::new();

    let mut chain =
        Blockchain::create(&env.db_path, &founder, "change", DIFFICULTY, &cancel).unwrap();

    for amount in [10, 15] {
        let transfer =
            Transaction::new_transfer(&founder, &recipient, amount, &env.store, &chain).unwrap();
        let coinbase = Transaction::new_coinbase(&miner, "").unwrap();
        chain.append_block(vec![coinbase, transfer], &cancel).unwrap();
    }

    let founder_hash = env.store.get(&founder).unwrap().pub_key_hash();
    let recipient_hash = env.store.get(&recipient).unwrap().pub_key_hash();
    let miner_hash = env.store.get(&miner).unwrap().pub_key_hash();

    assert_eq!(chain.balance(&founder_hash).unwrap(), SUBSIDY - 25);
    assert_eq!(chain.balance(&recipient_hash).unwrap(), 25);
    assert_eq!(chain.balance(&miner_hash).unwrap(), 2 * SUBSIDY);
}
