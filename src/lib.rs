//! Minimal UTXO proof-of-work blockchain node written in Rust

/// Chain storage, block creation and transaction verification
pub mod blockchain;
/// Command line interface
pub mod cli;
/// Canonical binary encoding for persisted and wire structures
pub mod codec;
/// Hashing, Base58 and ECDSA over P-256
pub mod crypto;
/// Store blockchain state
pub mod db;
/// Custom errors
pub mod error;
/// Manages a pool of transactions yet to be included in a block
pub mod mempool;
/// Binary Merkle tree over transaction serializations
pub mod merkle;
/// Send messages to and receive messages from other nodes
pub mod net;
/// Nonce search and validation
pub mod pow;
/// Blocks and transactions
pub mod primitives;
/// Utilities
pub mod util;
/// Unspent transaction output index
pub mod utxo;
/// Key generation, addresses and the local wallet file
pub mod wallet;

pub use blockchain::Blockchain;
pub use mempool::MemPool;
pub use primitives::{Block, Transaction, TxInput, TxOutput, TxOutputs};
pub use utxo::UtxoSet;
pub use wallet::{Wallet, Wallets};
