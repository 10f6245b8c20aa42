//! Ordered key-value storage for the index.
//!
//! Two backends share one contract: point reads, atomic batches and ordered scans
//! over a key prefix or an inclusive key range.
//!
//! Every commit holds the store's commit lock exclusively, and every [`ReadView`]
//! holds it shared. A query that performs several reads through one view therefore
//! never observes a block half applied, even when the backend is RocksDB and the
//! reads are separate calls.

use crate::Result;
use parking_lot::{RwLock, RwLockReadGuard};
use rocksdb::{DB, Options, WriteBatch};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;

/// Key/value pair returned by scans.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

#[derive(Debug, Clone)]
enum BatchOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Ordered list of writes applied all-or-nothing by [`Database::write`].
#[derive(Debug, Clone, Default)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put(key.into(), value.into()));
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete(key.into()));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

enum Backend {
    RocksDb(DB),
    InMemory(RwLock<BTreeMap<Vec<u8>, Vec<u8>>>),
}

/// Storage backing the index.
pub struct Database {
    backend: Backend,
    commit_lock: RwLock<()>,
}

impl Database {
    /// Opens or creates a RocksDB store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);

        // Index writes are small and frequent; reads are prefix scans.
        db_opts.set_write_buffer_size(64 * 1024 * 1024);
        db_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        db_opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&db_opts, path)?;

        Ok(Self::with_backend(Backend::RocksDb(db)))
    }

    /// Opens an existing RocksDB store without taking the writer lock.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let db = DB::open_for_read_only(&Options::default(), path, false)?;
        Ok(Self::with_backend(Backend::RocksDb(db)))
    }

    /// Creates an empty in-memory store.
    pub fn in_memory() -> Self {
        Self::with_backend(Backend::InMemory(RwLock::new(BTreeMap::new())))
    }

    fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            commit_lock: RwLock::new(()),
        }
    }

    /// Returns a consistent read view of the committed data.
    pub fn view(&self) -> ReadView<'_> {
        ReadView {
            db: self,
            _guard: self.commit_lock.read(),
        }
    }

    /// Applies `batch` atomically.
    pub fn write(&self, batch: Batch) -> Result<()> {
        let _guard = self.commit_lock.write();

        match &self.backend {
            Backend::RocksDb(db) => {
                let mut write_batch = WriteBatch::default();
                for op in batch.ops {
                    match op {
                        BatchOp::Put(key, value) => write_batch.put(key, value),
                        BatchOp::Delete(key) => write_batch.delete(key),
                    }
                }
                db.write(write_batch)?;
            }
            Backend::InMemory(map) => {
                let mut map = map.write();
                for op in batch.ops {
                    match op {
                        BatchOp::Put(key, value) => {
                            map.insert(key, value);
                        }
                        BatchOp::Delete(key) => {
                            map.remove(&key);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Read access to the store, consistent with respect to batch commits.
pub struct ReadView<'a> {
    db: &'a Database,
    _guard: RwLockReadGuard<'a, ()>,
}

impl ReadView<'_> {
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match &self.db.backend {
            Backend::RocksDb(db) => Ok(db.get(key)?),
            Backend::InMemory(map) => Ok(map.read().get(key).cloned()),
        }
    }

    /// Returns every entry whose key starts with `prefix`, in `direction` order.
    pub fn scan_prefix(&self, prefix: &[u8], direction: Direction) -> Result<Vec<KeyValue>> {
        match &self.db.backend {
            Backend::RocksDb(db) => {
                let mut iter = db.raw_iterator();
                let mut entries = Vec::new();

                match direction {
                    Direction::Forward => iter.seek(prefix),
                    Direction::Reverse => match prefix_successor(prefix) {
                        Some(successor) => {
                            iter.seek_for_prev(&successor);
                            if iter.valid() && iter.key() == Some(successor.as_slice()) {
                                iter.prev();
                            }
                        }
                        None => iter.seek_to_last(),
                    },
                }

                while iter.valid() {
                    let (Some(key), Some(value)) = (iter.key(), iter.value()) else {
                        break;
                    };
                    if !key.starts_with(prefix) {
                        break;
                    }
                    entries.push((key.to_vec(), value.to_vec()));
                    match direction {
                        Direction::Forward => iter.next(),
                        Direction::Reverse => iter.prev(),
                    }
                }
                iter.status()?;

                Ok(entries)
            }
            Backend::InMemory(map) => {
                let map = map.read();
                let upper = match prefix_successor(prefix) {
                    Some(successor) => Bound::Excluded(successor),
                    None => Bound::Unbounded,
                };
                let range = map.range::<Vec<u8>, _>((Bound::Included(prefix.to_vec()), upper));
                let entries = match direction {
                    Direction::Forward => range.map(|(k, v)| (k.clone(), v.clone())).collect(),
                    Direction::Reverse => {
                        range.rev().map(|(k, v)| (k.clone(), v.clone())).collect()
                    }
                };
                Ok(entries)
            }
        }
    }

    /// Returns every entry with `start <= key <= end`, in `direction` order.
    pub fn scan_range(
        &self,
        start: &[u8],
        end: &[u8],
        direction: Direction,
    ) -> Result<Vec<KeyValue>> {
        if start > end {
            return Ok(Vec::new());
        }

        match &self.db.backend {
            Backend::RocksDb(db) => {
                let mut iter = db.raw_iterator();
                let mut entries = Vec::new();

                match direction {
                    Direction::Forward => iter.seek(start),
                    Direction::Reverse => iter.seek_for_prev(end),
                }

                while iter.valid() {
                    let (Some(key), Some(value)) = (iter.key(), iter.value()) else {
                        break;
                    };
                    let in_range = match direction {
                        Direction::Forward => key <= end,
                        Direction::Reverse => key >= start,
                    };
                    if !in_range {
                        break;
                    }
                    entries.push((key.to_vec(), value.to_vec()));
                    match direction {
                        Direction::Forward => iter.next(),
                        Direction::Reverse => iter.prev(),
                    }
                }
                iter.status()?;

                Ok(entries)
            }
            Backend::InMemory(map) => {
                let map = map.read();
                let range = map.range::<[u8], _>((Bound::Included(start), Bound::Included(end)));
                let entries = match direction {
                    Direction::Forward => range.map(|(k, v)| (k.clone(), v.clone())).collect(),
                    Direction::Reverse => {
                        range.rev().map(|(k, v)| (k.clone(), v.clone())).collect()
                    }
                };
                Ok(entries)
            }
        }
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// Returns `None` when no such key exists (empty or all-`0xff` prefix).
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut successor = prefix.to_vec();
    while let Some(last) = successor.pop() {
        if last < u8::MAX {
            successor.push(last + 1);
            return Some(successor);
        }
    }
    None
}
