mod chain;
mod iter;

pub use chain::{db_path, Blockchain, GENESIS_DATA};
pub use iter::ChainIterator;
