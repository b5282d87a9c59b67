mod batch;
mod disk;
mod key;

pub use batch::{Batch, Operation};
pub use disk::{DiskDatabase, Iter};
pub use key::{Key, HEAD_KEY, UTXO_PREFIX};

use crate::codec::{Decodable, Encodable};
use crate::error::StoreError;

pub trait Database {
    fn insert<V: Encodable>(&self, key: Key, value: &V) -> Result<(), StoreError>;
    fn remove(&self, key: Key) -> Result<(), StoreError>;
    fn get<V: Decodable>(&self, key: Key) -> Result<Option<V>, StoreError>;
    fn has(&self, key: Key) -> Result<bool, StoreError>;
    fn write_batch(&self, batch: Batch) -> Result<(), StoreError>;
}
