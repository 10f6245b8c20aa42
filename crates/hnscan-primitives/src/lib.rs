//! Primitives shared by the hnscan index and its callers.
//!
//! The index never validates what it is given: blocks, transactions and coin views
//! arrive from a trusted ledger node through [`ChainSource`] and [`LedgerEvent`].
//! This crate only models the parts of that data the index reads.

mod address;
mod block;
mod chain;
mod covenant;
mod hash;
mod network;
mod transaction;

pub use address::{Address, AddressParseError, NULL_DATA_VERSION};
pub use block::{Block, ChainEntry};
pub use chain::{ChainError, ChainSource, CoinView, LedgerEvent};
pub use covenant::{Covenant, CovenantType};
pub use hash::{BlockHash, Hash256, HashParseError, NameHash, Txid, name_hash};
pub use network::{Network, UnknownNetwork};
pub use transaction::{Input, OutPoint, Output, Transaction};

/// Smallest unit of value on the ledger.
pub type Amount = u64;

/// Block height.
pub type Height = u32;
