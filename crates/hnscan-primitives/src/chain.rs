use crate::{Block, BlockHash, ChainEntry, Height, OutPoint, Output};
use std::collections::HashMap;

/// Previous outputs spent by a block, resolved by the ledger node.
///
/// The view of a connected block includes outputs created earlier in the same block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoinView {
    coins: HashMap<OutPoint, Output>,
}

impl CoinView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, outpoint: OutPoint, output: Output) {
        self.coins.insert(outpoint, output);
    }

    /// Returns the output spent by `outpoint`, if the view resolves it.
    pub fn output(&self, outpoint: &OutPoint) -> Option<&Output> {
        self.coins.get(outpoint)
    }
}

impl FromIterator<(OutPoint, Output)> for CoinView {
    fn from_iter<I: IntoIterator<Item = (OutPoint, Output)>>(iter: I) -> Self {
        Self {
            coins: iter.into_iter().collect(),
        }
    }
}

/// Notification emitted by the ledger node for every change of its main chain.
///
/// Notifications are delivered strictly in order; a reorganisation arrives as a run
/// of `BlockDisconnected` followed by a run of `BlockConnected`.
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    BlockConnected {
        entry: ChainEntry,
        block: Block,
        view: CoinView,
    },
    BlockDisconnected {
        entry: ChainEntry,
        block: Block,
        view: CoinView,
    },
    /// The node rewound or jumped its tip without replaying blocks.
    Reset { tip: ChainEntry },
}

/// Failure of the ledger node to serve a request.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockHash),

    #[error("Previous outputs of block {0} are not available")]
    ViewUnavailable(BlockHash),

    #[error("Ledger node unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the ledger node, used to catch up on blocks connected while the
/// index was not listening.
pub trait ChainSource {
    /// Height of the node's current tip.
    fn tip_height(&self) -> Result<Height, ChainError>;

    /// Main-chain entry at `height`, or `None` above the tip.
    fn entry_by_height(&self, height: Height) -> Result<Option<ChainEntry>, ChainError>;

    /// Full block by hash.
    fn block(&self, hash: &BlockHash) -> Result<Block, ChainError>;

    /// Resolves every previous output spent by `block`.
    fn block_view(&self, block: &Block) -> Result<CoinView, ChainError>;
}
