use log::LevelFilter;
use tempfile::TempDir;
use tinycoin::error::{ChainError, StoreError, TransactionError};
use tinycoin::pow::ProofOfWork;
use tinycoin::primitives::SUBSIDY;
use tinycoin::wallet::Wallet;
use tinycoin::{Block, Blockchain, Transaction, UtxoSet};

fn init_logger() {
    let _ = env_logger::builder()
        .filter_module("tinycoin", LevelFilter::Debug)
        .format_timestamp_millis()
        .is_test(true)
        .try_init();
}

fn balance(chain: &Blockchain, wallet: &Wallet) -> u64 {
    UtxoSet::new(chain)
        .find_utxo(&wallet.pub_key_hash())
        .unwrap()
        .iter()
        .map(|output| output.value)
        .sum()
}

/// Chain funded by a genesis coinbase paying `owner`, utxo index built
fn funded_chain(dir: &TempDir, owner: &Wallet) -> Blockchain {
    let chain = Blockchain::create_at(dir.path().join("chain"), &owner.address()).unwrap();
    UtxoSet::new(&chain).reindex().unwrap();
    chain
}

#[test]
fn genesis_pays_the_subsidy() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let owner = Wallet::new();
    let chain = funded_chain(&dir, &owner);

    assert_eq!(balance(&chain, &owner), SUBSIDY);
    assert_eq!(chain.get_best_height().unwrap(), 0);
    assert_eq!(chain.get_block_hashes().unwrap(), vec![chain.tip.clone()]);
}

#[test]
fn creating_twice_fails() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let owner = Wallet::new();
    let _chain = funded_chain(&dir, &owner);

    assert!(matches!(
        Blockchain::create_at(dir.path().join("chain"), &owner.address()),
        Err(ChainError::Store(StoreError::ChainExists))
    ));
}

#[test]
fn opening_a_missing_chain_fails() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        Blockchain::open_at(dir.path().join("nothing")),
        Err(ChainError::Store(StoreError::NoChain))
    ));
}

#[test]
fn transfer_with_local_mine() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let mut chain = funded_chain(&dir, &alice);

    let tx = {
        let utxo = UtxoSet::new(&chain);
        Transaction::new(&alice, &bob.address(), 5, &utxo).unwrap()
    };
    let block = chain.mine_block(vec![tx]).unwrap();
    UtxoSet::new(&chain).update(&block).unwrap();

    assert_eq!(balance(&chain, &alice), 15);
    assert_eq!(balance(&chain, &bob), 5);
    assert_eq!(chain.get_best_height().unwrap(), 1);

    for block in chain.iter() {
        assert!(ProofOfWork::new(&block).validate());
    }
}

#[test]
fn insufficient_funds_are_rejected() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let chain = funded_chain(&dir, &alice);

    let utxo = UtxoSet::new(&chain);
    assert!(matches!(
        Transaction::new(&alice, &bob.address(), SUBSIDY + 1, &utxo),
        Err(ChainError::Transaction(
            TransactionError::InsufficientFunds { .. }
        ))
    ));
}

#[test]
fn mined_transactions_are_found_and_spent_entries_drop_out() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let mut chain = funded_chain(&dir, &alice);
    let genesis_coinbase = chain.iter().last().unwrap().transactions[0].clone();

    let tx = {
        let utxo = UtxoSet::new(&chain);
        Transaction::new(&alice, &bob.address(), SUBSIDY, &utxo).unwrap()
    };
    let block = chain.mine_block(vec![tx.clone()]).unwrap();
    UtxoSet::new(&chain).update(&block).unwrap();

    // the transfer is discoverable by id, the genesis coinbase entry is
    // fully spent and gone from the index
    assert_eq!(chain.find_transaction(&tx.id).unwrap(), tx);
    assert!(matches!(
        chain.find_transaction(&[0u8; 32]),
        Err(TransactionError::NotFound)
    ));
    let utxo = UtxoSet::new(&chain);
    let (accumulated, spendable) = utxo
        .find_spendable_outputs(&alice.pub_key_hash(), 1)
        .unwrap();
    assert_eq!(accumulated, 0);
    assert!(spendable.is_empty());
    assert!(!utxo
        .find_spendable_outputs(&bob.pub_key_hash(), 1)
        .unwrap()
        .1
        .contains_key(&hex::encode(&genesis_coinbase.id)));
}

#[test]
fn incremental_update_agrees_with_reindex() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let carol = Wallet::new();
    let mut chain = funded_chain(&dir, &alice);

    for (recipient, amount) in [(&bob, 5u64), (&carol, 3)] {
        let tx = {
            let utxo = UtxoSet::new(&chain);
            Transaction::new(&alice, &recipient.address(), amount, &utxo).unwrap()
        };
        let block = chain.mine_block(vec![tx]).unwrap();
        UtxoSet::new(&chain).update(&block).unwrap();
    }

    let incremental = (
        balance(&chain, &alice),
        balance(&chain, &bob),
        balance(&chain, &carol),
        UtxoSet::new(&chain).count_transactions().unwrap(),
    );

    UtxoSet::new(&chain).reindex().unwrap();
    let rebuilt = (
        balance(&chain, &alice),
        balance(&chain, &bob),
        balance(&chain, &carol),
        UtxoSet::new(&chain).count_transactions().unwrap(),
    );

    assert_eq!(incremental, rebuilt);
    assert_eq!(incremental.0, 12);
    assert_eq!(incremental.1, 5);
    assert_eq!(incremental.2, 3);
}

#[test]
fn add_block_is_idempotent_and_head_advances_only_on_height() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let owner = Wallet::new();
    let mut chain = funded_chain(&dir, &owner);
    let genesis_hash = chain.tip.clone();

    let miner = Wallet::new();
    let coinbase = |data: &[u8]| Transaction::coinbase(&miner.address(), data).unwrap();

    let first = Block::new(vec![coinbase(b"first")], genesis_hash.clone(), 1);
    chain.add_block(&first).unwrap();
    assert_eq!(chain.tip, first.hash);

    // a competitor at the same height does not move the head
    let competitor = Block::new(vec![coinbase(b"competitor")], genesis_hash, 1);
    chain.add_block(&competitor).unwrap();
    assert_eq!(chain.tip, first.hash);
    assert_eq!(chain.get_block(&competitor.hash).unwrap(), competitor);

    // replaying a stored block is a no-op
    chain.add_block(&first).unwrap();
    assert_eq!(chain.tip, first.hash);
    assert_eq!(chain.get_best_height().unwrap(), 1);

    let second = Block::new(vec![coinbase(b"second")], first.hash.clone(), 2);
    chain.add_block(&second).unwrap();
    assert_eq!(chain.tip, second.hash);
    assert_eq!(chain.get_best_height().unwrap(), 2);
}

#[test]
fn block_hashes_walk_newest_first() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let owner = Wallet::new();
    let miner = Wallet::new();
    let mut chain = funded_chain(&dir, &owner);

    let coinbase = Transaction::coinbase(&miner.address(), b"").unwrap();
    let block = chain.mine_block(vec![coinbase]).unwrap();
    UtxoSet::new(&chain).update(&block).unwrap();

    let hashes = chain.get_block_hashes().unwrap();
    assert_eq!(hashes.len(), 2);
    assert_eq!(hashes[0], block.hash);
    assert_eq!(hashes[0], chain.tip);
    assert_eq!(hashes[1], block.prev_hash);
}

#[test]
fn reopened_chain_keeps_its_head() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let owner = Wallet::new();
    let miner = Wallet::new();
    let tip = {
        let mut chain = funded_chain(&dir, &owner);
        let coinbase = Transaction::coinbase(&miner.address(), b"").unwrap();
        chain.mine_block(vec![coinbase]).unwrap().hash
    };

    let chain = Blockchain::open_at(dir.path().join("chain")).unwrap();
    assert_eq!(chain.tip, tip);
    assert_eq!(chain.get_best_height().unwrap(), 1);
}

#[test]
#[should_panic(expected = "invalid transaction")]
fn mining_a_tampered_transaction_panics() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let mut chain = funded_chain(&dir, &alice);

    let mut tx = {
        let utxo = UtxoSet::new(&chain);
        Transaction::new(&alice, &bob.address(), 5, &utxo).unwrap()
    };
    tx.outputs[0].value = SUBSIDY;
    chain.mine_block(vec![tx]).unwrap();
}

#[test]
fn network_miner_block_shape_is_accepted() {
    init_logger();
    let dir = TempDir::new().unwrap();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let miner = Wallet::new();
    let mut chain = funded_chain(&dir, &alice);

    let tx = {
        let utxo = UtxoSet::new(&chain);
        Transaction::new(&alice, &bob.address(), 7, &utxo).unwrap()
    };
    let coinbase = Transaction::coinbase(&miner.address(), b"").unwrap();
    let block = chain.mine_block(vec![coinbase, tx]).unwrap();
    UtxoSet::new(&chain).reindex().unwrap();

    assert!(block.transactions[0].is_coinbase());
    assert_eq!(balance(&chain, &miner), SUBSIDY);
    assert_eq!(balance(&chain, &alice), 13);
    assert_eq!(balance(&chain, &bob), 7);
}
