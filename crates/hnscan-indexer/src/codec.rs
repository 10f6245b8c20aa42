//! Fixed-layout binary codecs for persisted records.
//!
//! All integers are little-endian, hashes are 32 raw bytes and floats are IEEE-754
//! bit patterns. Decoding rejects short and over-long input.

use crate::chain_state::ChainState;
use crate::chart::{BucketedPoint, ChartDataPoint};
use crate::types::{IndexedTip, NameAction, SpendPointer};
use crate::{Error, Result};
use hnscan_primitives::{Amount, ChainEntry, CovenantType, Hash256, Height};

/// A record with a fixed binary layout.
pub trait Record: Sized {
    /// Name used in decode errors.
    const NAME: &'static str;

    fn encode(&self) -> Vec<u8>;

    fn decode(bytes: &[u8]) -> Result<Self>;
}

pub(crate) struct Reader<'a> {
    what: &'static str,
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(what: &'static str, data: &'a [u8]) -> Self {
        Self { what, data }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let Some((head, rest)) = self.data.split_first_chunk::<N>() else {
            return Err(self.error(format!(
                "truncated, needed {N} more bytes, {} left",
                self.data.len()
            )));
        };
        self.data = rest;
        Ok(*head)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        self.take().map(u32::from_le_bytes)
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        self.take().map(u64::from_le_bytes)
    }

    pub(crate) fn f64(&mut self) -> Result<f64> {
        self.take().map(f64::from_le_bytes)
    }

    pub(crate) fn hash(&mut self) -> Result<Hash256> {
        self.take().map(Hash256)
    }

    pub(crate) fn finish(self) -> Result<()> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(self.error(format!("{} trailing bytes", self.data.len())))
        }
    }

    fn error(&self, reason: String) -> Error {
        Error::Decode {
            what: self.what,
            reason,
        }
    }
}

/// Decodes a bare little-endian `u32` value (version, magic, height).
pub(crate) fn decode_u32(what: &'static str, bytes: &[u8]) -> Result<u32> {
    let mut reader = Reader::new(what, bytes);
    let value = reader.u32()?;
    reader.finish()?;
    Ok(value)
}

impl Record for ChainState {
    const NAME: &'static str = "chain state";

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(self.tip.as_bytes());
        out.extend_from_slice(&self.tx_count.to_le_bytes());
        out.extend_from_slice(&self.coin_count.to_le_bytes());
        out.extend_from_slice(&self.value.to_le_bytes());
        out.extend_from_slice(&self.burned.to_le_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(Self::NAME, bytes);
        let state = Self {
            tip: reader.hash()?,
            tx_count: reader.u64()?,
            coin_count: reader.u64()?,
            value: reader.u64()?,
            burned: reader.u64()?,
        };
        reader.finish()?;
        Ok(state)
    }
}

impl Record for IndexedTip {
    const NAME: &'static str = "indexed tip";

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(36);
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(self.hash.as_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(Self::NAME, bytes);
        let tip = Self {
            height: reader.u32()?,
            hash: reader.hash()?,
        };
        reader.finish()?;
        Ok(tip)
    }
}

impl Record for ChainEntry {
    const NAME: &'static str = "header";

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(80);
        out.extend_from_slice(self.hash.as_bytes());
        out.extend_from_slice(self.prev_block.as_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.time.to_le_bytes());
        out.extend_from_slice(&self.bits.to_le_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(Self::NAME, bytes);
        let entry = Self {
            hash: reader.hash()?,
            prev_block: reader.hash()?,
            height: reader.u32()?,
            time: reader.u64()?,
            bits: reader.u32()?,
        };
        reader.finish()?;
        Ok(entry)
    }
}

impl Record for SpendPointer {
    const NAME: &'static str = "spend pointer";

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(36);
        out.extend_from_slice(self.spending_txid.as_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(Self::NAME, bytes);
        let pointer = Self {
            spending_txid: reader.hash()?,
            height: reader.u32()?,
        };
        reader.finish()?;
        Ok(pointer)
    }
}

fn encode_point(out: &mut Vec<u8>, point: &ChartDataPoint) {
    out.extend_from_slice(&point.time.to_le_bytes());
    out.extend_from_slice(&point.difficulty.to_le_bytes());
    out.extend_from_slice(&point.tx_count.to_le_bytes());
    out.extend_from_slice(&point.supply.to_le_bytes());
    out.extend_from_slice(&point.burned.to_le_bytes());
    out.extend_from_slice(&point.cumulative_tx_count.to_le_bytes());
}

fn decode_point(reader: &mut Reader<'_>) -> Result<ChartDataPoint> {
    Ok(ChartDataPoint {
        time: reader.u64()?,
        difficulty: reader.f64()?,
        tx_count: reader.u32()?,
        supply: reader.u64()?,
        burned: reader.u64()?,
        cumulative_tx_count: reader.u64()?,
    })
}

impl Record for ChartDataPoint {
    const NAME: &'static str = "chart point";

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(44);
        encode_point(&mut out, self);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(Self::NAME, bytes);
        let point = decode_point(&mut reader)?;
        reader.finish()?;
        Ok(point)
    }
}

impl Record for BucketedPoint {
    const NAME: &'static str = "buffered chart point";

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(52);
        out.extend_from_slice(&self.day.to_le_bytes());
        encode_point(&mut out, &self.point);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(Self::NAME, bytes);
        let day = reader.u64()?;
        let point = decode_point(&mut reader)?;
        reader.finish()?;
        Ok(Self { day, point })
    }
}

/// Value of a funding record: creation height and output value.
pub(crate) fn encode_funding(height: Height, value: Amount) -> Vec<u8> {
    let mut out = Vec::with_capacity(12);
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&value.to_le_bytes());
    out
}

pub(crate) fn decode_funding(bytes: &[u8]) -> Result<(Height, Amount)> {
    let mut reader = Reader::new("funding record", bytes);
    let height = reader.u32()?;
    let value = reader.u64()?;
    reader.finish()?;
    Ok((height, value))
}

/// Stored part of a name history record; the txid lives in the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NameRecordValue {
    pub height: Height,
    pub position: u32,
    pub action: NameAction,
    pub value: Amount,
}

impl Record for NameRecordValue {
    const NAME: &'static str = "name record";

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(17);
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.position.to_le_bytes());
        out.push(self.action.covenant() as u8);
        out.extend_from_slice(&self.value.to_le_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(Self::NAME, bytes);
        let height = reader.u32()?;
        let position = reader.u32()?;
        let raw_action = reader.u8()?;
        let value = reader.u64()?;
        reader.finish()?;

        let action = CovenantType::try_from(raw_action)
            .ok()
            .and_then(NameAction::from_covenant)
            .ok_or_else(|| Error::Decode {
                what: Self::NAME,
                reason: format!("invalid action {raw_action}"),
            })?;

        Ok(Self {
            height,
            position,
            action,
            value,
        })
    }
}
