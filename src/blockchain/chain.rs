use std::collections::HashMap;
use std::path::PathBuf;

use log::info;

use crate::db::{Batch, Database, DiskDatabase, Key};
use crate::error::{ChainError, StoreError, TransactionError};
use crate::primitives::{Block, Transaction, TxOutputs};

use super::ChainIterator;

/// Data carried by the genesis coinbase
pub const GENESIS_DATA: &str = "First transaction from Genesis";

/// Store location for a node id
pub fn db_path(node_id: &str) -> PathBuf {
    PathBuf::from(format!("./tmp/blocks_{}", node_id))
}

pub struct Blockchain {
    /// Hash of the best block
    pub tip: Vec<u8>,
    db: DiskDatabase,
}

impl Blockchain {
    /// Start a new chain for `node_id`: a genesis block whose coinbase pays
    /// `address`. Fails if a store already exists.
    pub fn create(address: &str, node_id: &str) -> Result<Blockchain, ChainError> {
        Self::create_at(db_path(node_id), address)
    }

    pub fn create_at(path: impl Into<PathBuf>, address: &str) -> Result<Blockchain, ChainError> {
        let path = path.into();
        if DiskDatabase::exists(&path) {
            return Err(StoreError::ChainExists.into());
        }
        let db = DiskDatabase::open(&path).map_err(ChainError::Store)?;

        let coinbase = Transaction::coinbase(address, GENESIS_DATA.as_bytes())?;
        let genesis = Block::genesis(coinbase);
        info!("genesis created: {}", hex::encode(&genesis.hash));

        let mut batch = Batch::new();
        batch.insert(Key::Block(genesis.hash.clone()), &genesis);
        batch.insert_raw(Key::Head, genesis.hash.clone());
        db.write_batch(batch).map_err(ChainError::Store)?;

        Ok(Blockchain {
            tip: genesis.hash,
            db,
        })
    }

    /// Open the existing chain for `node_id`. Fails if no store exists.
    pub fn open(node_id: &str) -> Result<Blockchain, ChainError> {
        Self::open_at(db_path(node_id))
    }

    pub fn open_at(path: impl Into<PathBuf>) -> Result<Blockchain, ChainError> {
        let path = path.into();
        if !DiskDatabase::exists(&path) {
            return Err(StoreError::NoChain.into());
        }
        let db = DiskDatabase::open(&path)?;
        let tip = db
            .get_raw(Key::Head)?
            .ok_or(StoreError::Corrupt("missing head pointer"))?;
        Ok(Blockchain { tip, db })
    }

    pub fn db(&self) -> &DiskDatabase {
        &self.db
    }

    /// Gossip-side insertion. Trusts the sender's block, advances the head
    /// only on strictly greater height, and is idempotent on the block hash.
    pub fn add_block(&mut self, block: &Block) -> Result<(), StoreError> {
        if self.db.has(Key::Block(block.hash.clone()))? {
            return Ok(());
        }

        let best = self.best_block()?;
        let advances = block.height > best.height;

        let mut batch = Batch::new();
        batch.insert(Key::Block(block.hash.clone()), block);
        if advances {
            batch.insert_raw(Key::Head, block.hash.clone());
        }
        self.db.write_batch(batch)?;

        if advances {
            self.tip = block.hash.clone();
        }
        Ok(())
    }

    pub fn get_block(&self, hash: &[u8]) -> Result<Block, StoreError> {
        self.db
            .get(Key::Block(hash.to_vec()))?
            .ok_or(StoreError::BlockNotFound)
    }

    fn best_block(&self) -> Result<Block, StoreError> {
        let head = self
            .db
            .get_raw(Key::Head)?
            .ok_or(StoreError::Corrupt("missing head pointer"))?;
        self.get_block(&head)
    }

    pub fn get_best_height(&self) -> Result<u64, StoreError> {
        Ok(self.best_block()?.height)
    }

    /// Hashes of every block, newest first
    pub fn get_block_hashes(&self) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self.iter().map(|block| block.hash).collect())
    }

    /// Mine a block holding `transactions` on top of the current best block
    /// and unconditionally advance the head to it.
    ///
    /// Panics when handed a transaction that does not verify, or a candidate
    /// set carrying more than one coinbase or a coinbase anywhere but the
    /// front; callers screen their candidates first.
    pub fn mine_block(&mut self, transactions: Vec<Transaction>) -> Result<Block, ChainError> {
        assert!(!transactions.is_empty(), "a block carries at least one transaction");
        for tx in &transactions {
            match self.verify_transaction(tx) {
                Ok(true) => {}
                _ => panic!("invalid transaction handed to the miner"),
            }
        }
        let coinbases = transactions.iter().filter(|tx| tx.is_coinbase()).count();
        assert!(coinbases <= 1, "at most one coinbase per block");
        assert!(
            coinbases == 0 || transactions[0].is_coinbase(),
            "the coinbase must lead the block"
        );

        let best = self.best_block().map_err(ChainError::Store)?;
        let block = Block::new(transactions, best.hash, best.height + 1);

        let mut batch = Batch::new();
        batch.insert(Key::Block(block.hash.clone()), &block);
        batch.insert_raw(Key::Head, block.hash.clone());
        self.db.write_batch(batch).map_err(ChainError::Store)?;
        self.tip = block.hash.clone();

        info!(
            "mined block {} at height {}",
            hex::encode(&block.hash),
            block.height
        );
        Ok(block)
    }

    /// Full-chain scan for every unspent output, keyed by hex transaction
    /// id. Walks newest first, so an output is unspent iff no input seen
    /// earlier in the walk references it. Original output indices are kept.
    pub fn find_utxo(&self) -> Result<HashMap<String, TxOutputs>, StoreError> {
        let mut utxo: HashMap<String, TxOutputs> = HashMap::new();
        let mut spent: HashMap<String, Vec<i64>> = HashMap::new();

        for block in self.iter() {
            for tx in &block.transactions {
                let txid = hex::encode(&tx.id);

                for (index, output) in tx.outputs.iter().enumerate() {
                    let index = index as i64;
                    if spent
                        .get(&txid)
                        .map_or(false, |outs| outs.contains(&index))
                    {
                        continue;
                    }
                    utxo.entry(txid.clone())
                        .or_default()
                        .outputs
                        .push((index, output.clone()));
                }

                if !tx.is_coinbase() {
                    for input in &tx.inputs {
                        spent
                            .entry(hex::encode(&input.id))
                            .or_default()
                            .push(input.out);
                    }
                }
            }
        }
        Ok(utxo)
    }

    /// Linear scan for a transaction by id
    pub fn find_transaction(&self, id: &[u8]) -> Result<Transaction, TransactionError> {
        for block in self.iter() {
            for tx in &block.transactions {
                if tx.id == id {
                    return Ok(tx.clone());
                }
            }
        }
        Err(TransactionError::NotFound)
    }

    fn referenced_transactions(
        &self,
        tx: &Transaction,
    ) -> Result<HashMap<String, Transaction>, TransactionError> {
        let mut prev_txs = HashMap::new();
        for input in &tx.inputs {
            let prev_tx = self.find_transaction(&input.id)?;
            prev_txs.insert(hex::encode(&prev_tx.id), prev_tx);
        }
        Ok(prev_txs)
    }

    pub fn sign_transaction(
        &self,
        tx: &mut Transaction,
        secret_key: &[u8],
    ) -> Result<(), TransactionError> {
        let prev_txs = self.referenced_transactions(tx)?;
        tx.sign(secret_key, &prev_txs)
    }

    pub fn verify_transaction(&self, tx: &Transaction) -> Result<bool, TransactionError> {
        if tx.is_coinbase() {
            return Ok(true);
        }
        let prev_txs = self.referenced_transactions(tx)?;
        tx.verify(&prev_txs)
    }

    pub fn iter(&self) -> ChainIterator {
        ChainIterator::new(self.tip.clone(), &self.db)
    }

    /// Force buffered writes to disk; used by the shutdown path
    pub fn flush(&self) {
        self.db.flush();
    }
}
