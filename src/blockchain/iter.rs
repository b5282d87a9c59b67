use crate::db::{Database, DiskDatabase, Key};
use crate::primitives::Block;

/// Walks the chain newest first by following parent hashes until the empty
/// genesis parent.
pub struct ChainIterator<'a> {
    current_hash: Vec<u8>,
    db: &'a DiskDatabase,
}

impl<'a> ChainIterator<'a> {
    pub(crate) fn new(tip: Vec<u8>, db: &'a DiskDatabase) -> ChainIterator<'a> {
        ChainIterator {
            current_hash: tip,
            db,
        }
    }
}

impl Iterator for ChainIterator<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        if self.current_hash.is_empty() {
            return None;
        }
        let block: Block = self.db.get(Key::Block(self.current_hash.clone())).ok()??;
        self.current_hash = block.prev_hash.clone();
        Some(block)
    }
}
