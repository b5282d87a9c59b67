use serde::{Deserialize, Serialize};

use crate::codec::Encodable;
use crate::merkle::MerkleTree;
use crate::pow::ProofOfWork;
use crate::primitives::Transaction;
use crate::util;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Seconds since epoch at assembly time
    pub timestamp: u64,
    /// SHA-256 over prev_hash || merkle root || nonce || difficulty
    pub hash: Vec<u8>,
    /// First transaction is always the coinbase
    pub transactions: Vec<Transaction>,
    /// Empty for the genesis block
    pub prev_hash: Vec<u8>,
    pub nonce: u64,
    pub height: u64,
}

impl Block {
    /// Assemble a block and mine it
    pub fn new(transactions: Vec<Transaction>, prev_hash: Vec<u8>, height: u64) -> Block {
        let mut block = Block {
            timestamp: util::now(),
            hash: vec![],
            transactions,
            prev_hash,
            nonce: 0,
            height,
        };

        let (nonce, hash) = ProofOfWork::new(&block).run();
        block.nonce = nonce;
        block.hash = hash;
        block
    }

    pub fn genesis(coinbase: Transaction) -> Block {
        Block::new(vec![coinbase], vec![], 0)
    }

    /// Merkle root over the serialized transactions
    pub fn hash_transactions(&self) -> Vec<u8> {
        let leaves: Vec<Vec<u8>> = self.transactions.iter().map(|tx| tx.encode()).collect();
        MerkleTree::new(&leaves).root_hash().to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::Decodable;
    use crate::crypto::sha256;
    use crate::wallet::Wallet;

    fn coinbase() -> Transaction {
        let wallet = Wallet::new();
        Transaction::coinbase(&wallet.address(), b"test block").unwrap()
    }

    #[test]
    fn mined_block_validates() {
        let block = Block::genesis(coinbase());
        assert_eq!(block.height, 0);
        assert!(block.prev_hash.is_empty());
        assert!(ProofOfWork::new(&block).validate());
    }

    #[test]
    fn encoding_round_trip() {
        let block = Block::genesis(coinbase());
        assert_eq!(Block::decode(&block.encode()).unwrap(), block);
    }

    #[test]
    fn merkle_root_of_single_coinbase_is_its_hash() {
        let block = Block::genesis(coinbase());
        assert_eq!(
            block.hash_transactions(),
            sha256(&block.transactions[0].encode())
        );
    }
}
