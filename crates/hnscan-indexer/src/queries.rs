//! Read-only queries over the index.

use crate::address;
use crate::chain_state::ChainState;
use crate::chart;
use crate::codec::{self, Record};
use crate::db::Database;
use crate::indexer::{self, Published};
use crate::layout;
use crate::names;
use crate::types::{
    AddressBalance, AddressHistory, FundingRecord, IndexedTip, Metric, NameHistoryEntry,
    SeriesPoint, SpentRecord,
};
use crate::{Error, Result};
use hnscan_primitives::{Address, BlockHash, ChainEntry, Height, NameHash, Network};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// Query interface for the index.
///
/// Every method reads through a single view of the store, so its result reflects
/// whole blocks only.
#[derive(Clone)]
pub struct IndexQuery {
    db: Arc<Database>,
    published: Option<Arc<RwLock<Published>>>,
}

impl IndexQuery {
    pub(crate) fn new(db: Arc<Database>, published: Option<Arc<RwLock<Published>>>) -> Self {
        Self { db, published }
    }

    /// Opens an existing RocksDB index for reading.
    ///
    /// The handle is a point-in-time view: blocks a running writer commits after the
    /// open are not seen until the index is opened again. Use [`crate::Indexer::query`]
    /// to follow a live writer.
    pub fn open(path: &Path, network: Network) -> Result<Self> {
        let db = Database::open_read_only(path)?;
        if !indexer::verify_markers(&db.view(), network)? {
            return Err(Error::NotFound(format!("index at {}", path.display())));
        }
        Ok(Self::new(Arc::new(db), None))
    }

    fn published(&self) -> Result<Published> {
        match &self.published {
            Some(published) => Ok(*published.read()),
            None => indexer::load_published(&self.db.view()),
        }
    }

    pub fn chain_state(&self) -> Result<ChainState> {
        Ok(self.published()?.state)
    }

    pub fn tip(&self) -> Result<Option<IndexedTip>> {
        Ok(self.published()?.tip)
    }

    /// Height of the indexed tip, `None` for an empty index.
    pub fn height(&self) -> Result<Option<Height>> {
        Ok(self.tip()?.map(|tip| tip.height))
    }

    pub fn entry_by_height(&self, height: Height) -> Result<Option<ChainEntry>> {
        self.db
            .view()
            .get(&layout::header(height))?
            .map(|bytes| ChainEntry::decode(&bytes))
            .transpose()
    }

    pub fn height_by_hash(&self, hash: &BlockHash) -> Result<Option<Height>> {
        self.db
            .view()
            .get(&layout::height_by_hash(hash))?
            .map(|bytes| codec::decode_u32("height", &bytes))
            .transpose()
    }

    pub fn balance(&self, address: &Address) -> Result<AddressBalance> {
        address::balance(&self.db.view(), address)
    }

    pub fn funding(&self, address: &Address) -> Result<Vec<FundingRecord>> {
        address::funding(&self.db.view(), address)
    }

    /// Spends of the given funding records.
    pub fn spent(&self, funding: &[FundingRecord]) -> Result<Vec<SpentRecord>> {
        address::spent(&self.db.view(), funding)
    }

    pub fn unspent(&self, address: &Address) -> Result<Vec<FundingRecord>> {
        address::unspent(&self.db.view(), address)
    }

    /// One page of the address history, most recent first.
    pub fn history(
        &self,
        address: &Address,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<AddressHistory>> {
        address::history(&self.db.view(), address, limit, offset)
    }

    pub fn name_history(&self, name_hash: &NameHash) -> Result<Vec<NameHistoryEntry>> {
        names::history(&self.db.view(), name_hash)
    }

    /// Daily values of `metric` for days starting within `[start, end]`.
    pub fn series(&self, metric: Metric, start: u64, end: u64) -> Result<Vec<SeriesPoint>> {
        chart::series(&self.db.view(), metric, start, end)
    }

    pub fn difficulty_series(&self, start: u64, end: u64) -> Result<Vec<SeriesPoint>> {
        self.series(Metric::Difficulty, start, end)
    }

    /// Cumulative transaction count per day.
    pub fn transaction_series(&self, start: u64, end: u64) -> Result<Vec<SeriesPoint>> {
        self.series(Metric::Transactions, start, end)
    }

    pub fn supply_series(&self, start: u64, end: u64) -> Result<Vec<SeriesPoint>> {
        self.series(Metric::Supply, start, end)
    }

    pub fn burned_series(&self, start: u64, end: u64) -> Result<Vec<SeriesPoint>> {
        self.series(Metric::Burned, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::{Indexer, IndexerConfig};

    #[test]
    fn test_read_only_query_sees_committed_blocks() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = IndexerConfig::new(temp_dir.path(), Network::Regtest);
        let chain = TestChain::build(5);

        let state = {
            let mut indexer = Indexer::open(&config).unwrap();
            for (entry, block, view) in chain.iter() {
                indexer.connect(entry, block, view).unwrap();
            }
            indexer.chain_state()
        };

        let query = IndexQuery::open(temp_dir.path(), Network::Regtest).unwrap();
        assert_eq!(query.chain_state().unwrap(), state);
        assert_eq!(query.height().unwrap(), Some(4));

        let (entry, _, _) = &chain.blocks[3];
        assert_eq!(query.entry_by_height(3).unwrap(), Some(*entry));
        assert_eq!(query.height_by_hash(&entry.hash).unwrap(), Some(3));

        assert!(matches!(
            IndexQuery::open(temp_dir.path(), Network::Main),
            Err(Error::NetworkMismatch { .. })
        ));
    }

    #[test]
    fn test_read_only_query_is_a_snapshot() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = IndexerConfig::new(temp_dir.path(), Network::Regtest);
        let chain = TestChain::build(5);

        let mut indexer = Indexer::open(&config).unwrap();
        for (entry, block, view) in chain.iter().take(3) {
            indexer.connect(entry, block, view).unwrap();
        }

        let snapshot = IndexQuery::open(temp_dir.path(), Network::Regtest).unwrap();
        for (entry, block, view) in chain.iter().skip(3) {
            indexer.connect(entry, block, view).unwrap();
        }

        assert_eq!(snapshot.height().unwrap(), Some(2));
        assert_eq!(indexer.query().height().unwrap(), Some(4));

        let reopened = IndexQuery::open(temp_dir.path(), Network::Regtest).unwrap();
        assert_eq!(reopened.height().unwrap(), Some(4));
    }

    #[test]
    fn test_open_missing_index_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(IndexQuery::open(&temp_dir.path().join("missing"), Network::Regtest).is_err());
    }
}
