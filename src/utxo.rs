use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::blockchain::Blockchain;
use crate::db::{Batch, Database, Key, UTXO_PREFIX};
use crate::error::StoreError;
use crate::primitives::{Block, TxOutput, TxOutputs};

/// Keys removed per delete batch while clearing the index, bounding the
/// size of any single store transaction
const COLLECT_SIZE: usize = 100_000;

/// The unspent-output index over the chain's store. Borrows the chain
/// read-only; `reindex` and `update` hold the write path.
pub struct UtxoSet<'a> {
    pub chain: &'a Blockchain,
}

impl<'a> UtxoSet<'a> {
    pub fn new(chain: &'a Blockchain) -> UtxoSet<'a> {
        UtxoSet { chain }
    }

    /// Collect outputs locked to `pub_key_hash` until `amount` is covered,
    /// returning the accumulated value and the chosen (hex tx id → output
    /// indices) map. Selection follows store iteration order.
    pub fn find_spendable_outputs(
        &self,
        pub_key_hash: &[u8],
        amount: u64,
    ) -> Result<(u64, HashMap<String, Vec<i64>>), StoreError> {
        let mut unspent: HashMap<String, Vec<i64>> = HashMap::new();
        let mut accumulated = 0;

        for (txid, outs) in self.chain.db().iter_prefix::<TxOutputs>(UTXO_PREFIX) {
            for (index, output) in &outs.outputs {
                if output.is_locked_with_key(pub_key_hash) && accumulated < amount {
                    accumulated += output.value;
                    unspent
                        .entry(hex::encode(&txid))
                        .or_default()
                        .push(*index);
                }
            }
        }

        Ok((accumulated, unspent))
    }

    /// Every unspent output locked to `pub_key_hash`
    pub fn find_utxo(&self, pub_key_hash: &[u8]) -> Result<Vec<TxOutput>, StoreError> {
        let mut outputs = vec![];
        for (_, outs) in self.chain.db().iter_prefix::<TxOutputs>(UTXO_PREFIX) {
            outputs.extend(
                outs.outputs
                    .into_iter()
                    .filter(|(_, output)| output.is_locked_with_key(pub_key_hash))
                    .map(|(_, output)| output),
            );
        }
        Ok(outputs)
    }

    /// Number of transactions with at least one unspent output
    pub fn count_transactions(&self) -> Result<usize, StoreError> {
        Ok(self.chain.db().iter_prefix_keys(UTXO_PREFIX).count())
    }

    /// Drop the whole index and rebuild it from a full chain scan
    pub fn reindex(&self) -> Result<(), StoreError> {
        self.delete_index()?;

        let utxo = self.chain.find_utxo()?;
        let mut batch = Batch::new();
        for (txid, outs) in utxo {
            let id = hex::decode(&txid).expect("find_utxo keys are hex tx ids");
            batch.insert(Key::Utxo(id), &outs);
        }
        self.chain.db().write_batch(batch)
    }

    fn delete_index(&self) -> Result<(), StoreError> {
        let keys: Vec<Vec<u8>> = self.chain.db().iter_prefix_keys(UTXO_PREFIX).collect();
        for chunk in keys.chunks(COLLECT_SIZE) {
            let mut batch = Batch::new();
            for key in chunk {
                batch.remove(Key::Utxo(key.clone()));
            }
            self.chain.db().write_batch(batch)?;
        }
        Ok(())
    }

    /// Fold one mined block into the index as a single atomic write: spent
    /// outputs drop out of their entries (positions preserved), and every
    /// transaction contributes a fresh entry for its outputs.
    pub fn update(&self, block: &Block) -> Result<(), StoreError> {
        let db = self.chain.db();
        // entries read or created while applying this block; later inputs in
        // the same block must see earlier spends
        let mut touched: HashMap<Vec<u8>, TxOutputs> = HashMap::new();

        for tx in &block.transactions {
            if !tx.is_coinbase() {
                for input in &tx.inputs {
                    let entry = match touched.entry(input.id.clone()) {
                        Entry::Occupied(entry) => entry.into_mut(),
                        Entry::Vacant(entry) => {
                            let outs: TxOutputs = db
                                .get(Key::Utxo(input.id.clone()))?
                                .ok_or(StoreError::Corrupt("spent output missing from index"))?;
                            entry.insert(outs)
                        }
                    };
                    entry.outputs.retain(|(index, _)| *index != input.out);
                }
            }

            let fresh = TxOutputs {
                outputs: tx
                    .outputs
                    .iter()
                    .enumerate()
                    .map(|(index, output)| (index as i64, output.clone()))
                    .collect(),
            };
            touched.insert(tx.id.clone(), fresh);
        }

        let mut batch = Batch::new();
        for (txid, outs) in touched {
            if outs.outputs.is_empty() {
                batch.remove(Key::Utxo(txid));
            } else {
                batch.insert(Key::Utxo(txid), &outs);
            }
        }
        db.write_batch(batch)
    }
}
