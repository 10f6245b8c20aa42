//! Query commands, each printing one JSON document.

use crate::cli::BlockId;
use crate::error::Result;
use hnscan_indexer::{
    ChainState, Error as IndexError, FundingRecord, IndexQuery, IndexedTip, Metric,
    NameHistoryEntry,
};
use hnscan_primitives::{Address, ChainEntry, NameHash, Network, name_hash};
use serde::Serialize;
use std::io::Write;

fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn date_of(time: u64) -> String {
    i64::try_from(time)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|time| time.date_naive().to_string())
        .unwrap_or_default()
}

#[derive(Serialize)]
struct Info {
    network: Network,
    tip: Option<IndexedTip>,
    chain_state: ChainState,
}

pub fn info(out: &mut impl Write, query: &IndexQuery, network: Network) -> Result<()> {
    let info = Info {
        network,
        tip: query.tip()?,
        chain_state: query.chain_state()?,
    };
    print_json(out, &info)
}

pub fn block(out: &mut impl Write, query: &IndexQuery, block: BlockId) -> Result<()> {
    let height = match block {
        BlockId::Height(height) => Some(height),
        BlockId::Hash(hash) => query.height_by_hash(&hash)?,
    };
    let entry: Option<ChainEntry> = match height {
        Some(height) => query.entry_by_height(height)?,
        None => None,
    };
    let entry = entry.ok_or_else(|| IndexError::NotFound(format!("block {block:?}")))?;
    print_json(out, &entry)
}

pub fn balance(out: &mut impl Write, query: &IndexQuery, address: &Address) -> Result<()> {
    print_json(out, &query.balance(address)?)
}

pub fn history(
    out: &mut impl Write,
    query: &IndexQuery,
    address: &Address,
    limit: usize,
    offset: usize,
) -> Result<()> {
    print_json(out, &query.history(address, limit, offset)?)
}

pub fn unspent(out: &mut impl Write, query: &IndexQuery, address: &Address) -> Result<()> {
    let unspent: Vec<FundingRecord> = query.unspent(address)?;
    print_json(out, &unspent)
}

#[derive(Serialize)]
struct NameReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    name_hash: NameHash,
    history: Vec<NameHistoryEntry>,
}

pub fn name(out: &mut impl Write, query: &IndexQuery, name: &str) -> Result<()> {
    // Names never contain 64 hex characters, so a parsable hash is taken as is.
    let (name, hash) = match name.parse::<NameHash>() {
        Ok(hash) => (None, hash),
        Err(_) => (Some(name), name_hash(name)),
    };
    let report = NameReport {
        name,
        name_hash: hash,
        history: query.name_history(&hash)?,
    };
    print_json(out, &report)
}

#[derive(Serialize)]
struct ChartRow {
    date: String,
    time: u64,
    value: f64,
}

pub fn chart(
    out: &mut impl Write,
    query: &IndexQuery,
    metric: Metric,
    start: u64,
    end: u64,
) -> Result<()> {
    let rows: Vec<ChartRow> = query
        .series(metric, start, end)?
        .into_iter()
        .map(|point| ChartRow {
            date: date_of(point.time),
            time: point.time,
            value: point.value,
        })
        .collect();
    tracing::debug!(?metric, days = rows.len(), "Chart series loaded");
    print_json(out, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hnscan_indexer::{Indexer, IndexerConfig};
    use hnscan_primitives::{
        Block, BlockHash, CoinView, Covenant, CovenantType, Hash256, Input, OutPoint, Output,
        Transaction,
    };

    const T0: u64 = 1_704_067_200;

    fn address() -> Address {
        Address::new(0, vec![0x42; 20])
    }

    /// Index with one block per day, each paying 1000 to `address()` and bidding
    /// on the name "hnscan".
    fn populated_index(dir: &std::path::Path) -> IndexQuery {
        let path = dir.join("regtest").join("index");
        let mut indexer = Indexer::open(&IndexerConfig::new(&path, Network::Regtest)).unwrap();

        let mut prev = BlockHash::zero();
        for height in 0..3u32 {
            let mut coinbase_id = [0xcb; 32];
            coinbase_id[0] = height as u8;
            let coinbase = Transaction {
                txid: Hash256(coinbase_id),
                inputs: vec![Input {
                    prevout: OutPoint::null(),
                }],
                outputs: vec![
                    Output::new(1_000, address()),
                    Output::new(10, address()).with_covenant(Covenant::with_name(
                        CovenantType::Bid,
                        name_hash("hnscan"),
                    )),
                ],
            };
            let block = Block {
                hash: Hash256::repeat_byte(height as u8 + 1),
                txs: vec![coinbase],
            };
            let entry = ChainEntry {
                hash: block.hash,
                prev_block: prev,
                height,
                time: T0 + u64::from(height) * 86_400,
                bits: Network::Regtest.pow_limit_bits(),
            };
            indexer.connect(&entry, &block, &CoinView::new()).unwrap();
            prev = block.hash;
        }
        drop(indexer);

        IndexQuery::open(&path, Network::Regtest).unwrap()
    }

    fn run(command: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> serde_json::Value {
        let mut out = Vec::new();
        command(&mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn test_info_and_balance() {
        let dir = tempfile::tempdir().unwrap();
        let query = populated_index(dir.path());

        let info = run(|out| info(out, &query, Network::Regtest));
        assert_eq!(info["network"], "regtest");
        assert_eq!(info["tip"]["height"], 2);
        assert_eq!(info["chain_state"]["value"], 3_030);

        let balance = run(|out| balance(out, &query, &address()));
        assert_eq!(balance["confirmed"], 3_030);
        assert_eq!(balance["utxo_count"], 6);
    }

    #[test]
    fn test_block_by_height_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let query = populated_index(dir.path());

        let by_height = run(|out| block(out, &query, BlockId::Height(1)));
        let by_hash = run(|out| block(out, &query, BlockId::Hash(Hash256::repeat_byte(2))));
        assert_eq!(by_height, by_hash);
        assert_eq!(by_height["height"], 1);

        let mut out = Vec::new();
        assert!(block(&mut out, &query, BlockId::Height(9)).is_err());
    }

    #[test]
    fn test_name_by_name_or_hash() {
        let dir = tempfile::tempdir().unwrap();
        let query = populated_index(dir.path());

        let by_name = run(|out| name(out, &query, "hnscan"));
        assert_eq!(by_name["name"], "hnscan");
        assert_eq!(by_name["history"].as_array().unwrap().len(), 3);
        assert_eq!(by_name["history"][0]["height"], 2);

        let hash = name_hash("hnscan").to_string();
        let by_hash = run(|out| name(out, &query, &hash));
        assert!(by_hash.get("name").is_none());
        assert_eq!(by_hash["history"], by_name["history"]);
    }

    #[test]
    fn test_chart_rows_carry_dates() {
        let dir = tempfile::tempdir().unwrap();
        let query = populated_index(dir.path());

        let rows = run(|out| chart(out, &query, Metric::Supply, 0, u64::MAX));
        let rows = rows.as_array().unwrap();
        // The last day is still open.
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["date"], "2024-01-01");
        assert_eq!(rows[1]["date"], "2024-01-02");
        assert_eq!(rows[1]["value"], 2_020.0);
    }
}
