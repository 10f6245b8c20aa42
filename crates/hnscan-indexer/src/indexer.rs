//! Index maintenance driven by ledger events.

use crate::address;
use crate::chain_state::ChainState;
use crate::chart::{self, ChartAggregator, ChartDataPoint};
use crate::codec::{self, Record};
use crate::db::{Batch, Database, ReadView};
use crate::layout;
use crate::names;
use crate::queries::IndexQuery;
use crate::types::IndexedTip;
use crate::{Error, Result};
use futures::{Stream, StreamExt};
use hnscan_primitives::{Block, ChainEntry, ChainSource, CoinView, Height, LedgerEvent, Network};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// How often to log progress while catching up.
const PROGRESS_LOG_INTERVAL: u32 = 1000;

/// Storage backend of the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendType {
    #[default]
    RocksDb,
    /// Volatile store, for tests and tooling.
    InMemory,
}

/// Index configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Directory of the RocksDB store.
    pub path: PathBuf,
    pub network: Network,
    pub backend: BackendType,
}

impl IndexerConfig {
    pub fn new(path: impl Into<PathBuf>, network: Network) -> Self {
        Self {
            path: path.into(),
            network,
            backend: BackendType::RocksDb,
        }
    }

    pub fn in_memory(network: Network) -> Self {
        Self {
            path: PathBuf::new(),
            network,
            backend: BackendType::InMemory,
        }
    }
}

/// Chain state and tip as of the last committed block.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Published {
    pub state: ChainState,
    pub tip: Option<IndexedTip>,
}

/// Checks the version and network markers of a store.
///
/// Returns `false` when the store carries no markers yet.
pub(crate) fn verify_markers(view: &ReadView<'_>, network: Network) -> Result<bool> {
    let version = view.get(&layout::version())?;
    let magic = view.get(&layout::network())?;

    if let Some(bytes) = version {
        let found = codec::decode_u32("version", &bytes)?;
        if found != layout::VERSION {
            return Err(Error::VersionMismatch {
                expected: layout::VERSION,
                found,
            });
        }
    }

    if let Some(bytes) = &magic {
        let found = codec::decode_u32("network magic", bytes)?;
        if found != network.magic() {
            return Err(Error::NetworkMismatch {
                expected: network,
                found,
            });
        }
    }

    Ok(magic.is_some())
}

/// Loads the published chain state and tip from the store.
pub(crate) fn load_published(view: &ReadView<'_>) -> Result<Published> {
    let state = view
        .get(&layout::chain_state())?
        .map(|bytes| ChainState::decode(&bytes))
        .transpose()?
        .unwrap_or_default();
    let tip = view
        .get(&layout::tip())?
        .map(|bytes| IndexedTip::decode(&bytes))
        .transpose()?;
    Ok(Published { state, tip })
}

/// The single writer of the index.
///
/// Events are applied through `&mut self`, so one event is always fully committed
/// before the next one starts. Each event is one atomic batch; the in-memory chain
/// state and chart buffer are replaced only after the batch is written.
pub struct Indexer {
    db: Arc<Database>,
    network: Network,
    published: Arc<RwLock<Published>>,
    chart: ChartAggregator,
}

impl Indexer {
    /// Opens the index, creating it when the store is empty.
    pub fn open(config: &IndexerConfig) -> Result<Self> {
        let db = match config.backend {
            BackendType::RocksDb => {
                std::fs::create_dir_all(&config.path)?;
                Database::open(&config.path)?
            }
            BackendType::InMemory => Database::in_memory(),
        };

        let indexer = Self::with_database(Arc::new(db), config.network)?;

        match indexer.tip() {
            Some(tip) => tracing::info!(
                "Opened {} index at {}, tip {tip}",
                config.network,
                config.path.display()
            ),
            None => tracing::info!(
                "Opened empty {} index at {}",
                config.network,
                config.path.display()
            ),
        }

        Ok(indexer)
    }

    fn with_database(db: Arc<Database>, network: Network) -> Result<Self> {
        let initialised = verify_markers(&db.view(), network)?;
        if !initialised {
            let mut batch = Batch::default();
            batch.put(layout::version(), layout::VERSION.to_le_bytes().to_vec());
            batch.put(layout::network(), network.magic().to_le_bytes().to_vec());
            db.write(batch)?;
        }

        let (published, chart) = {
            let view = db.view();
            let published = load_published(&view)?;
            let chart = chart::load(&view, published.tip.map(|tip| tip.height))?;
            (published, chart)
        };

        Ok(Self {
            db,
            network,
            published: Arc::new(RwLock::new(published)),
            chart,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn chain_state(&self) -> ChainState {
        self.published.read().state
    }

    pub fn tip(&self) -> Option<IndexedTip> {
        self.published.read().tip
    }

    /// Read access sharing this indexer's store and published state.
    pub fn query(&self) -> IndexQuery {
        IndexQuery::new(self.db.clone(), Some(self.published.clone()))
    }

    /// Applies one ledger event.
    pub fn handle(&mut self, event: &LedgerEvent) -> Result<()> {
        match event {
            LedgerEvent::BlockConnected { entry, block, view } => self.connect(entry, block, view),
            LedgerEvent::BlockDisconnected { entry, block, view } => {
                self.disconnect(entry, block, view)
            }
            LedgerEvent::Reset { tip } => self.reset(tip),
        }
    }

    /// Indexes a block extending the indexed tip.
    pub fn connect(&mut self, entry: &ChainEntry, block: &Block, view: &CoinView) -> Result<()> {
        let published = *self.published.read();

        let extends_tip = match published.tip {
            None => entry.height == 0,
            Some(tip) => entry.height == tip.height + 1 && entry.prev_block == tip.hash,
        };
        if !extends_tip {
            return Err(Error::NonContiguous {
                height: entry.height,
                tip: published.tip.map(|tip| tip.height),
            });
        }

        let state = published.state.connect(entry, block, view)?;

        let mut chart = self.chart.clone();
        let (bucketed, flushed) =
            chart.observe(ChartDataPoint::new(entry, block, &state, self.network));

        let tip = IndexedTip {
            height: entry.height,
            hash: entry.hash,
        };

        let mut batch = Batch::default();
        address::index_block(&mut batch, block, entry.height);
        names::index_block(&mut batch, block, entry.height);
        chart::index_point(&mut batch, entry.height, &bucketed, flushed.as_ref());
        batch.put(layout::header(entry.height), entry.encode());
        batch.put(
            layout::height_by_hash(&entry.hash),
            entry.height.to_le_bytes().to_vec(),
        );
        batch.put(layout::chain_state(), state.encode());
        batch.put(layout::tip(), tip.encode());

        self.db.write(batch)?;

        *self.published.write() = Published {
            state,
            tip: Some(tip),
        };
        self.chart = chart;

        tracing::debug!(
            txs = block.txs.len(),
            "Indexed block {tip}, supply {}, burned {}",
            state.value,
            state.burned
        );

        Ok(())
    }

    /// Removes the indexed tip block and everything it wrote.
    pub fn disconnect(&mut self, entry: &ChainEntry, block: &Block, view: &CoinView) -> Result<()> {
        let published = *self.published.read();

        let is_tip = published
            .tip
            .is_some_and(|tip| tip.height == entry.height && tip.hash == entry.hash);
        if !is_tip {
            return Err(Error::NonContiguous {
                height: entry.height,
                tip: published.tip.map(|tip| tip.height),
            });
        }

        let state = published.state.disconnect(entry, block, view)?;

        let mut chart = self.chart.clone();
        let mut batch = Batch::default();
        {
            let read = self.db.view();
            chart::unindex_point(&mut chart, &read, &mut batch, entry.height)?;
        }

        address::unindex_block(&mut batch, block);
        names::unindex_block(&mut batch, block, entry.height);
        batch.delete(layout::header(entry.height));
        batch.delete(layout::height_by_hash(&entry.hash));
        batch.put(layout::chain_state(), state.encode());

        let tip = entry.height.checked_sub(1).map(|height| IndexedTip {
            height,
            hash: entry.prev_block,
        });
        match &tip {
            Some(tip) => batch.put(layout::tip(), tip.encode()),
            None => batch.delete(layout::tip()),
        }

        self.db.write(batch)?;

        *self.published.write() = Published { state, tip };
        self.chart = chart;

        tracing::info!(
            "Disconnected block #{},{}, supply {}",
            entry.height,
            entry.hash,
            state.value
        );

        Ok(())
    }

    /// Moves the tip pointer to `tip` without touching any other record.
    pub fn reset(&mut self, tip: &ChainEntry) -> Result<()> {
        let new_tip = IndexedTip {
            height: tip.height,
            hash: tip.hash,
        };
        let previous = self.tip();

        if previous.is_some_and(|previous| previous.height > tip.height) {
            tracing::warn!(
                "Ledger reset below the indexed tip, records above #{} are kept",
                tip.height
            );
        }

        let mut batch = Batch::default();
        batch.put(layout::tip(), new_tip.encode());
        self.db.write(batch)?;

        self.published.write().tip = Some(new_tip);

        tracing::info!(?previous, "Index tip reset to {new_tip}");

        Ok(())
    }

    /// Processes ledger events until the stream ends.
    ///
    /// Events are handled one at a time; the first failure stops the loop.
    ///
    /// Each event commits its batch synchronously on the polling task, so this future
    /// blocks its executor thread while a block is written. Run it on a dedicated task
    /// or thread.
    pub async fn run<S>(&mut self, events: S) -> Result<()>
    where
        S: Stream<Item = LedgerEvent>,
    {
        let mut events = std::pin::pin!(events);

        while let Some(event) = events.next().await {
            if let Err(err) = self.handle(&event) {
                tracing::error!(?err, "Failed to apply ledger event, index stopped");
                return Err(err);
            }
        }

        tracing::info!("Ledger event stream closed");

        Ok(())
    }

    /// Catches up with the ledger's main chain.
    ///
    /// Indexed blocks the ledger no longer has on its main chain are disconnected
    /// first. Returns the number of blocks connected.
    pub fn sync(&mut self, chain: &impl ChainSource) -> Result<u32> {
        let rewound = self.rewind_stale(chain)?;
        if rewound > 0 {
            tracing::info!("Disconnected {rewound} stale blocks");
        }

        let target = chain.tip_height()?;
        let start = self.tip().map_or(0, |tip| tip.height + 1);
        if start > target {
            return Ok(0);
        }

        let total = target - start + 1;
        let started = Instant::now();
        tracing::info!(start, target, "Catching up with the ledger");

        for height in start..=target {
            let entry = chain
                .entry_by_height(height)?
                .ok_or_else(|| Error::NotFound(format!("ledger entry #{height}")))?;
            let block = chain.block(&entry.hash)?;
            let view = chain.block_view(&block)?;
            self.connect(&entry, &block, &view)?;

            let processed = height - start + 1;
            if processed % PROGRESS_LOG_INTERVAL == 0 || processed == total {
                let elapsed = started.elapsed().as_secs_f64();
                let blocks_per_sec = if elapsed > 0.0 {
                    processed as f64 / elapsed
                } else {
                    0.0
                };
                tracing::info!(
                    processed,
                    total,
                    percent = format!("{:.1}%", processed as f64 / total as f64 * 100.0),
                    blocks_per_sec = format!("{blocks_per_sec:.0}"),
                    "Indexing progress"
                );
            }
        }

        Ok(total)
    }

    fn rewind_stale(&mut self, chain: &impl ChainSource) -> Result<u32> {
        let mut rewound = 0;

        while let Some(tip) = self.tip() {
            let on_main_chain = chain
                .entry_by_height(tip.height)?
                .is_some_and(|entry| entry.hash == tip.hash);
            if on_main_chain {
                break;
            }

            let entry = self.stored_entry(tip.height)?;
            let block = chain.block(&entry.hash)?;
            let view = chain.block_view(&block)?;
            self.disconnect(&entry, &block, &view)?;
            rewound += 1;
        }

        Ok(rewound)
    }

    fn stored_entry(&self, height: Height) -> Result<ChainEntry> {
        let bytes = self
            .db
            .view()
            .get(&layout::header(height))?
            .ok_or_else(|| Error::NotFound(format!("header #{height}")))?;
        ChainEntry::decode(&bytes)
    }
}
