use crate::commands;
use crate::error::{Error, Result};
use chrono::NaiveDate;
use clap::Parser;
use hnscan_indexer::{IndexQuery, Metric};
use hnscan_primitives::{Address, BlockHash, Height, Network};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

/// Directory holding the index when `--base-path` is not given.
const DEFAULT_BASE_PATH: &str = "hnscan-data";

#[derive(Debug, Parser)]
#[command(name = "hnscan", version, about = "Handshake block explorer index")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Specify custom base path.
    ///
    /// The index of each network lives in `<base-path>/<network>/index`.
    #[arg(long, short = 'd', value_name = "PATH", global = true)]
    pub base_path: Option<PathBuf>,

    /// Specify the network.
    #[arg(long, value_enum, default_value_t = Network::Main, global = true)]
    pub network: Network,

    /// Log filter, overridden by `RUST_LOG`.
    #[arg(long, value_name = "FILTER", default_value = "info", global = true)]
    pub log: String,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Indexed tip and chain aggregates.
    Info,

    /// Block header by height or hash.
    Block {
        /// Block height or block hash.
        block: BlockId,
    },

    /// Address balance.
    Balance {
        /// Address as `<version>:<hex program>`.
        address: Address,
    },

    /// Address transaction history, most recent first.
    History {
        address: Address,

        #[arg(long, default_value_t = 25)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Unspent outputs of an address.
    Unspent { address: Address },

    /// Auction history of a name.
    Name {
        /// Name, or its hex encoded hash.
        name: String,
    },

    /// Daily chart series.
    Chart {
        #[arg(value_enum)]
        metric: ChartMetric,

        /// First day, as YYYY-MM-DD or a unix timestamp.
        #[arg(long)]
        start: Option<String>,

        /// Last day, as YYYY-MM-DD or a unix timestamp.
        #[arg(long)]
        end: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ChartMetric {
    Difficulty,
    Transactions,
    Supply,
    Burned,
}

impl From<ChartMetric> for Metric {
    fn from(metric: ChartMetric) -> Self {
        match metric {
            ChartMetric::Difficulty => Metric::Difficulty,
            ChartMetric::Transactions => Metric::Transactions,
            ChartMetric::Supply => Metric::Supply,
            ChartMetric::Burned => Metric::Burned,
        }
    }
}

/// Block reference given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
    Height(Height),
    Hash(BlockHash),
}

impl std::str::FromStr for BlockId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Ok(height) = s.parse::<Height>() {
            return Ok(Self::Height(height));
        }
        s.parse::<BlockHash>()
            .map(Self::Hash)
            .map_err(|err| format!("expected a block height or hash: {err}"))
    }
}

/// Parses `YYYY-MM-DD` (midnight UTC) or a unix timestamp.
pub(crate) fn parse_time(value: &str) -> Result<u64> {
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(secs);
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| Error::InvalidDate(value.to_string()))?;
    date.and_hms_opt(0, 0, 0)
        .and_then(|midnight| u64::try_from(midnight.and_utc().timestamp()).ok())
        .ok_or_else(|| Error::InvalidDate(value.to_string()))
}

pub fn init_tracing(filter: &str) {
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();
}

/// Parse and run command line arguments.
pub fn run() -> Result<()> {
    let Cli {
        command,
        base_path,
        network,
        log,
    } = Cli::parse();

    init_tracing(&log);

    let index_path = base_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_PATH))
        .join(network.as_str())
        .join("index");

    tracing::debug!("Opening {network} index at {}", index_path.display());

    let query = IndexQuery::open(&index_path, network)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Info => commands::info(&mut out, &query, network),
        Command::Block { block } => commands::block(&mut out, &query, block),
        Command::Balance { address } => commands::balance(&mut out, &query, &address),
        Command::History {
            address,
            limit,
            offset,
        } => commands::history(&mut out, &query, &address, limit, offset),
        Command::Unspent { address } => commands::unspent(&mut out, &query, &address),
        Command::Name { name } => commands::name(&mut out, &query, &name),
        Command::Chart { metric, start, end } => {
            let start = start.as_deref().map(parse_time).transpose()?.unwrap_or(0);
            let end = end
                .as_deref()
                .map(parse_time)
                .transpose()?
                .unwrap_or(u64::MAX);
            if start > end {
                return Err(Error::InvalidRange { start, end });
            }
            commands::chart(&mut out, &query, metric.into(), start, end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chart_command() {
        let cli = Cli::try_parse_from([
            "hnscan",
            "chart",
            "supply",
            "--start",
            "2024-01-01",
            "--network",
            "regtest",
            "-d",
            "/tmp/hnscan",
        ])
        .unwrap();

        assert_eq!(cli.network, Network::Regtest);
        assert_eq!(cli.base_path, Some(PathBuf::from("/tmp/hnscan")));
        match cli.command {
            Command::Chart { metric, start, end } => {
                assert_eq!(metric, ChartMetric::Supply);
                assert_eq!(start.as_deref(), Some("2024-01-01"));
                assert_eq!(end, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_address_argument() {
        let address = format!("0:{}", "ab".repeat(20));
        let cli = Cli::try_parse_from(["hnscan", "balance", address.as_str()]).unwrap();
        assert!(matches!(cli.command, Command::Balance { .. }));
        assert_eq!(cli.network, Network::Main);

        assert!(Cli::try_parse_from(["hnscan", "balance", "not-an-address"]).is_err());
    }

    #[test]
    fn test_block_id() {
        assert_eq!("42".parse::<BlockId>().unwrap(), BlockId::Height(42));
        let hash = "11".repeat(32);
        assert_eq!(
            hash.parse::<BlockId>().unwrap(),
            BlockId::Hash(BlockHash::repeat_byte(0x11))
        );
        assert!("xyz".parse::<BlockId>().is_err());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("2024-01-01").unwrap(), 1_704_067_200);
        assert_eq!(parse_time("1704067200").unwrap(), 1_704_067_200);
        assert!(matches!(parse_time("01/01/2024"), Err(Error::InvalidDate(_))));
    }
}
