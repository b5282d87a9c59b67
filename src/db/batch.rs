use super::Key;
use crate::codec::Encodable;

/// Operations applied to the store in one atomic write
#[derive(Default)]
pub struct Batch {
    pub operations: Vec<Operation>,
}

pub enum Operation {
    Insert(Key, Vec<u8>),
    Remove(Key),
}

impl Batch {
    pub fn new() -> Self {
        Self { operations: vec![] }
    }

    pub fn insert<V: Encodable>(&mut self, key: Key, value: &V) {
        self.operations.push(Operation::Insert(key, value.encode()));
    }

    pub fn insert_raw(&mut self, key: Key, value: Vec<u8>) {
        self.operations.push(Operation::Insert(key, value));
    }

    pub fn remove(&mut self, key: Key) {
        self.operations.push(Operation::Remove(key));
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
