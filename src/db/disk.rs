use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use log::{info, warn};
use rocksdb::{
    DBIteratorWithThreadMode, DBRecoveryMode, Direction, IteratorMode, Options, WriteBatch, DB,
};

use super::{batch::Operation, Batch, Database, Key};
use crate::codec::Decodable;
use crate::error::StoreError;

pub struct DiskDatabase {
    db: DB,
}

/// Typed iteration over one key namespace; yields keys with the namespace
/// prefix stripped.
pub struct Iter<'a, V: Decodable> {
    iter: DBIteratorWithThreadMode<'a, DB>,
    prefix: Vec<u8>,
    v: PhantomData<V>,
}

impl<'a, V: Decodable> Iterator for Iter<'a, V> {
    type Item = (Vec<u8>, V);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.iter.next()?.ok()?;
        if !key.starts_with(&self.prefix) {
            return None;
        }
        let value = V::decode(&value).ok()?;
        Some((key[self.prefix.len()..].to_vec(), value))
    }
}

impl DiskDatabase {
    /// Whether a store has ever been created at `path`
    pub fn exists(path: &Path) -> bool {
        path.join("CURRENT").exists()
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        fs::create_dir_all(path)?;

        let mut options = Options::default();
        options.create_if_missing(true);

        match DB::open(&options, path) {
            Ok(db) => Ok(Self { db }),
            Err(err) if err.to_string().contains("LOCK") => Self::retry(path, options, err),
            Err(err) => Err(err.into()),
        }
    }

    /// A stale lock file survives an unclean exit. Remove it and reopen,
    /// discarding any unreadable tail of the write-ahead log.
    fn retry(
        path: &Path,
        mut options: Options,
        original: rocksdb::Error,
    ) -> Result<Self, StoreError> {
        warn!("store at {} is locked, removing the lock file", path.display());
        if fs::remove_file(path.join("LOCK")).is_err() {
            return Err(original.into());
        }
        options.set_wal_recovery_mode(DBRecoveryMode::SkipAnyCorruptedRecord);
        let db = DB::open(&options, path)?;
        info!("store unlocked, log tail truncated");
        Ok(Self { db })
    }

    pub fn iter_prefix<'a, V: Decodable>(&'a self, prefix: &[u8]) -> Iter<'a, V> {
        Iter {
            iter: self
                .db
                .iterator(IteratorMode::From(prefix, Direction::Forward)),
            prefix: prefix.to_vec(),
            v: PhantomData,
        }
    }

    /// Keys under `prefix`, with the prefix stripped
    pub fn iter_prefix_keys<'a>(&'a self, prefix: &'a [u8]) -> impl Iterator<Item = Vec<u8>> + 'a {
        self.db
            .iterator(IteratorMode::From(prefix, Direction::Forward))
            .filter_map(|item| item.ok())
            .take_while(move |(key, _)| key.starts_with(prefix))
            .map(move |(key, _)| key[prefix.len()..].to_vec())
    }

    pub fn get_raw(&self, key: Key) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key.encode())?)
    }

    /// Force buffered writes to disk; used by the shutdown path
    pub fn flush(&self) {
        let _ = self.db.flush();
    }
}

impl Database for DiskDatabase {
    fn insert<V: crate::codec::Encodable>(&self, key: Key, value: &V) -> Result<(), StoreError> {
        Ok(self.db.put(key.encode(), value.encode())?)
    }

    fn remove(&self, key: Key) -> Result<(), StoreError> {
        Ok(self.db.delete(key.encode())?)
    }

    fn get<V: Decodable>(&self, key: Key) -> Result<Option<V>, StoreError> {
        Ok(match self.db.get_pinned(key.encode())? {
            Some(raw) => Some(V::decode(&raw)?),
            None => None,
        })
    }

    fn has(&self, key: Key) -> Result<bool, StoreError> {
        Ok(self.db.get_pinned(key.encode())?.is_some())
    }

    fn write_batch(&self, batch: Batch) -> Result<(), StoreError> {
        let mut write_batch = WriteBatch::default();
        for operation in batch.operations {
            match operation {
                Operation::Insert(key, value) => write_batch.put(key.encode(), value),
                Operation::Remove(key) => write_batch.delete(key.encode()),
            }
        }
        Ok(self.db.write(write_batch)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::UTXO_PREFIX;
    use tempfile::TempDir;

    #[test]
    fn point_operations() {
        let dir = TempDir::new().unwrap();
        let db = DiskDatabase::open(dir.path()).unwrap();

        let key = || Key::Block(vec![1; 32]);
        assert!(!db.has(key()).unwrap());

        db.insert(key(), &vec![7u8, 8, 9]).unwrap();
        assert!(db.has(key()).unwrap());
        assert_eq!(db.get::<Vec<u8>>(key()).unwrap().unwrap(), vec![7, 8, 9]);

        db.remove(key()).unwrap();
        assert!(!db.has(key()).unwrap());
    }

    #[test]
    fn batch_is_applied_whole() {
        let dir = TempDir::new().unwrap();
        let db = DiskDatabase::open(dir.path()).unwrap();
        db.insert(Key::Utxo(vec![9]), &1u64).unwrap();

        let mut batch = Batch::new();
        batch.insert(Key::Utxo(vec![1]), &10u64);
        batch.insert(Key::Utxo(vec![2]), &20u64);
        batch.remove(Key::Utxo(vec![9]));
        db.write_batch(batch).unwrap();

        assert_eq!(db.get::<u64>(Key::Utxo(vec![1])).unwrap().unwrap(), 10);
        assert_eq!(db.get::<u64>(Key::Utxo(vec![2])).unwrap().unwrap(), 20);
        assert!(!db.has(Key::Utxo(vec![9])).unwrap());
    }

    #[test]
    fn prefix_iteration_stays_in_namespace() {
        let dir = TempDir::new().unwrap();
        let db = DiskDatabase::open(dir.path()).unwrap();

        db.insert(Key::Utxo(vec![1]), &1u64).unwrap();
        db.insert(Key::Utxo(vec![2]), &2u64).unwrap();
        // neighbours outside the namespace
        db.insert(Key::Block(vec![0xff; 32]), &3u64).unwrap();
        let mut batch = Batch::new();
        batch.insert_raw(Key::Head, vec![0xaa; 32]);
        db.write_batch(batch).unwrap();

        let entries: Vec<(Vec<u8>, u64)> = db.iter_prefix(UTXO_PREFIX).collect();
        assert_eq!(entries, vec![(vec![1], 1), (vec![2], 2)]);

        let keys: Vec<Vec<u8>> = db.iter_prefix_keys(UTXO_PREFIX).collect();
        assert_eq!(keys, vec![vec![1], vec![2]]);
    }

    #[test]
    fn reopen_sees_previous_writes() {
        let dir = TempDir::new().unwrap();
        {
            let db = DiskDatabase::open(dir.path()).unwrap();
            db.insert(Key::Block(vec![5; 32]), &b"block".to_vec()).unwrap();
        }
        assert!(DiskDatabase::exists(dir.path()));
        let db = DiskDatabase::open(dir.path()).unwrap();
        assert_eq!(
            db.get::<Vec<u8>>(Key::Block(vec![5; 32])).unwrap().unwrap(),
            b"block".to_vec()
        );
    }

    #[test]
    fn stale_lock_is_recovered() {
        let dir = TempDir::new().unwrap();
        {
            let db = DiskDatabase::open(dir.path()).unwrap();
            db.insert(Key::Block(vec![5; 32]), &1u64).unwrap();
        }
        // a crashed process leaves LOCK behind; rocksdb releases flock on
        // drop but the file stays, which a fresh open tolerates
        assert!(dir.path().join("LOCK").exists());
        assert!(DiskDatabase::open(dir.path()).is_ok());
    }
}
