mod block;
mod tx;

pub use block::Block;
pub use tx::{Transaction, TxInput, TxOutput, TxOutputs, SUBSIDY};
