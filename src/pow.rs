use log::debug;
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use crate::primitives::Block;

/// Fixed mining difficulty: the number of leading zero bits a block hash
/// must carry. 12 keeps mining near-instant; raise for a real deployment.
pub const DIFFICULTY: u64 = 12;

const MAX_NONCE: u64 = i64::MAX as u64;

pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: BigUint,
}

impl<'a> ProofOfWork<'a> {
    pub fn new(block: &'a Block) -> ProofOfWork<'a> {
        let target = BigUint::from(1u8) << (256 - DIFFICULTY as usize);
        ProofOfWork { block, target }
    }

    /// prev_hash || merkle root || nonce BE8 || difficulty BE8
    fn prepare_data(&self, merkle_root: &[u8], nonce: u64) -> Vec<u8> {
        let mut data = self.block.prev_hash.clone();
        data.extend_from_slice(merkle_root);
        data.extend_from_slice(&nonce.to_be_bytes());
        data.extend_from_slice(&DIFFICULTY.to_be_bytes());
        data
    }

    /// Search nonces from zero until the hash, read as a 256-bit big-endian
    /// integer, falls below the target.
    pub fn run(&self) -> (u64, Vec<u8>) {
        let merkle_root = self.block.hash_transactions();

        for nonce in 0..MAX_NONCE {
            let hash = Sha256::digest(self.prepare_data(&merkle_root, nonce));
            if BigUint::from_bytes_be(&hash) < self.target {
                debug!("mined nonce {} hash {}", nonce, hex::encode(&hash));
                return (nonce, hash.to_vec());
            }
        }

        unreachable!("nonce space exhausted")
    }

    /// Re-hash with the stored nonce and check it against the target
    pub fn validate(&self) -> bool {
        let merkle_root = self.block.hash_transactions();
        let hash = Sha256::digest(self.prepare_data(&merkle_root, self.block.nonce));
        BigUint::from_bytes_be(&hash) < self.target
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::primitives::Transaction;
    use crate::wallet::Wallet;

    fn block() -> Block {
        let wallet = Wallet::new();
        let coinbase = Transaction::coinbase(&wallet.address(), b"pow test").unwrap();
        Block::new(vec![coinbase], vec![0xab; 32], 1)
    }

    #[test]
    fn hash_is_below_target() {
        let block = block();
        let target = BigUint::from(1u8) << (256 - DIFFICULTY as usize);
        assert!(BigUint::from_bytes_be(&block.hash) < target);
    }

    #[test]
    fn stored_hash_matches_preimage() {
        let block = block();
        let pow = ProofOfWork::new(&block);
        let data = pow.prepare_data(&block.hash_transactions(), block.nonce);
        assert_eq!(block.hash, Sha256::digest(data).to_vec());
        assert!(pow.validate());
    }

    #[test]
    fn preimage_commits_to_every_field() {
        let block = block();
        let pow = ProofOfWork::new(&block);
        let root = block.hash_transactions();
        let data = pow.prepare_data(&root, block.nonce);
        assert_ne!(data, pow.prepare_data(&root, block.nonce + 1));

        let mut other = block.clone();
        other.prev_hash = vec![0xcd; 32];
        let other_pow = ProofOfWork::new(&other);
        assert_ne!(data, other_pow.prepare_data(&root, block.nonce));
    }
}
