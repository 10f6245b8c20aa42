//! Key layout of the index.
//!
//! Every record family lives under its own one-byte prefix. Integers inside keys
//! are big-endian so that byte order matches numeric order for range scans.

use hnscan_primitives::{BlockHash, Hash256, Height, NameHash, OutPoint, Txid};

/// Current schema version.
pub const VERSION: u32 = 1;

/// Record family prefixes.
pub mod prefix {
    /// Schema version marker.
    pub const VERSION: u8 = b'V';
    /// Network magic marker.
    pub const NETWORK: u8 = b'O';
    /// Indexed tip (height and hash).
    pub const TIP: u8 = b'R';
    /// Chain state slot.
    pub const CHAIN_STATE: u8 = b'C';
    /// Header by height.
    pub const HEADER: u8 = b'H';
    /// Height by block hash.
    pub const HEIGHT: u8 = b'h';
    /// Funding record: address hash || txid || output index.
    pub const FUNDING: u8 = b'A';
    /// Spend pointer: txid || output index.
    pub const SPEND: u8 = b'S';
    /// Name history: name hash || txid.
    pub const NAME: u8 = b'N';
    /// Per-block chart point by height.
    pub const CHART_POINT: u8 = b'P';
    /// Daily chart record by day bucket timestamp.
    pub const CHART_DAY: u8 = b'D';
}

pub fn version() -> [u8; 1] {
    [prefix::VERSION]
}

pub fn network() -> [u8; 1] {
    [prefix::NETWORK]
}

pub fn tip() -> [u8; 1] {
    [prefix::TIP]
}

pub fn chain_state() -> [u8; 1] {
    [prefix::CHAIN_STATE]
}

pub fn header(height: Height) -> [u8; 5] {
    let mut key = [0u8; 5];
    key[0] = prefix::HEADER;
    key[1..].copy_from_slice(&height.to_be_bytes());
    key
}

pub fn height_by_hash(hash: &BlockHash) -> [u8; 33] {
    prefixed_hash(prefix::HEIGHT, hash)
}

/// Prefix of every funding record of one address.
pub fn funding_prefix(address_hash: &Hash256) -> [u8; 33] {
    prefixed_hash(prefix::FUNDING, address_hash)
}

pub fn funding(address_hash: &Hash256, outpoint: &OutPoint) -> [u8; 69] {
    let mut key = [0u8; 69];
    key[..33].copy_from_slice(&funding_prefix(address_hash));
    key[33..65].copy_from_slice(outpoint.txid.as_bytes());
    key[65..].copy_from_slice(&outpoint.index.to_be_bytes());
    key
}

/// Parses the outpoint out of a funding key.
pub fn funding_outpoint(key: &[u8]) -> Option<OutPoint> {
    if key.len() != 69 || key[0] != prefix::FUNDING {
        return None;
    }
    let txid = Txid::from_slice(&key[33..65])?;
    let index = u32::from_be_bytes(key[65..].try_into().ok()?);
    Some(OutPoint::new(txid, index))
}

pub fn spend(outpoint: &OutPoint) -> [u8; 37] {
    let mut key = [0u8; 37];
    key[0] = prefix::SPEND;
    key[1..33].copy_from_slice(outpoint.txid.as_bytes());
    key[33..].copy_from_slice(&outpoint.index.to_be_bytes());
    key
}

/// Prefix of every history record of one name.
pub fn name_prefix(name_hash: &NameHash) -> [u8; 33] {
    prefixed_hash(prefix::NAME, name_hash)
}

pub fn name(name_hash: &NameHash, txid: &Txid) -> [u8; 65] {
    let mut key = [0u8; 65];
    key[..33].copy_from_slice(&name_prefix(name_hash));
    key[33..].copy_from_slice(txid.as_bytes());
    key
}

/// Parses the txid out of a name history key.
pub fn name_txid(key: &[u8]) -> Option<Txid> {
    if key.len() != 65 || key[0] != prefix::NAME {
        return None;
    }
    Txid::from_slice(&key[33..])
}

pub fn chart_point(height: Height) -> [u8; 5] {
    let mut key = [0u8; 5];
    key[0] = prefix::CHART_POINT;
    key[1..].copy_from_slice(&height.to_be_bytes());
    key
}

pub fn chart_day(timestamp: u64) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = prefix::CHART_DAY;
    key[1..].copy_from_slice(&timestamp.to_be_bytes());
    key
}

fn prefixed_hash(prefix: u8, hash: &Hash256) -> [u8; 33] {
    let mut key = [0u8; 33];
    key[0] = prefix;
    key[1..].copy_from_slice(hash.as_bytes());
    key
}
