use std::collections::HashMap;

use crate::primitives::Transaction;

/// Received-but-not-yet-mined transactions, keyed by hex id. The pool is
/// process local and last-writer-wins on a duplicate id.
#[derive(Default)]
pub struct MemPool {
    transactions: HashMap<String, Transaction>,
}

impl MemPool {
    pub fn new() -> MemPool {
        MemPool {
            transactions: HashMap::new(),
        }
    }

    /// Add a transaction and return its hex id
    pub fn insert(&mut self, tx: Transaction) -> String {
        let id = hex::encode(&tx.id);
        self.transactions.insert(id.clone(), tx);
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.transactions.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Transaction> {
        self.transactions.get(id).cloned()
    }

    pub fn remove(&mut self, id: &str) {
        self.transactions.remove(id);
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Snapshot of every pooled transaction, used by the miner
    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.values().cloned().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wallet::Wallet;

    fn tx() -> Transaction {
        let wallet = Wallet::new();
        Transaction::coinbase(&wallet.address(), b"").unwrap()
    }

    #[test]
    fn insert_get_remove() {
        let mut pool = MemPool::new();
        assert!(pool.is_empty());

        let tx = tx();
        let id = pool.insert(tx.clone());
        assert!(pool.contains(&id));
        assert_eq!(pool.get(&id).unwrap(), tx);
        assert_eq!(pool.len(), 1);

        pool.remove(&id);
        assert!(!pool.contains(&id));
        assert!(pool.is_empty());
    }

    #[test]
    fn duplicate_id_keeps_the_last_writer() {
        let mut pool = MemPool::new();
        let tx = tx();
        let id_first = pool.insert(tx.clone());
        let id_second = pool.insert(tx);
        assert_eq!(id_first, id_second);
        assert_eq!(pool.len(), 1);
    }
}
