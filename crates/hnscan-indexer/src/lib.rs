//! Block explorer index for the Handshake ledger.
//!
//! This crate maintains a RocksDB-backed secondary index fed by ledger events,
//! enabling efficient queries for:
//! - Chain aggregates (transactions, coins, circulating and burned supply)
//! - Address balances, history and unspent outputs
//! - Name auction history
//! - Daily chart series (difficulty, transactions, supply, burned value)

mod address;
mod chain_state;
mod chart;
mod codec;
mod db;
mod error;
mod indexer;
mod layout;
mod names;
mod queries;
mod types;

#[cfg(test)]
mod test_utils;

pub use chain_state::{ChainState, OutputClass};
pub use chart::{BucketedPoint, ChartAggregator, ChartDataPoint, DAY_SECS, aggregate, day_of};
pub use codec::Record;
pub use db::{Batch, Database, Direction, ReadView};
pub use error::{Error, Result};
pub use indexer::{BackendType, Indexer, IndexerConfig};
pub use queries::IndexQuery;
pub use types::{
    AddressBalance, AddressHistory, FundingRecord, IndexedTip, Metric, NameAction,
    NameHistoryEntry, SeriesPoint, SpentRecord,
};
