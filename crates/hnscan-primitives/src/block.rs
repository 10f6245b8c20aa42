use crate::{BlockHash, Height, Transaction};
use serde::Serialize;

/// Header fields of a block on the main chain, as tracked by the ledger node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainEntry {
    pub hash: BlockHash,
    pub prev_block: BlockHash,
    pub height: Height,
    /// Block timestamp in seconds since the Unix epoch.
    pub time: u64,
    /// Compact proof-of-work target.
    pub bits: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub hash: BlockHash,
    /// Transactions in block order; the first one is the coinbase.
    pub txs: Vec<Transaction>,
}

