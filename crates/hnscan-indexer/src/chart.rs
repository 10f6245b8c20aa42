//! Daily chart aggregation.
//!
//! Every connected block yields one [`ChartDataPoint`]. Points are buffered per UTC day
//! and the buffer is flushed into a single daily record as soon as a point of a later
//! day arrives. The per-block points are persisted too, so the buffer of the current
//! day survives restarts and can be rebuilt when a reorg rewinds across a day boundary.

use crate::chain_state::ChainState;
use crate::codec::Record;
use crate::db::{Batch, Direction, ReadView};
use crate::layout;
use crate::types::{Metric, SeriesPoint};
use crate::{Error, Result};
use hnscan_primitives::{Block, ChainEntry, Height, Network};
use serde::Serialize;

/// Length of a chart bucket in seconds.
pub const DAY_SECS: u64 = 86_400;

/// Day bucket of a timestamp.
pub fn day_of(time: u64) -> u64 {
    time / DAY_SECS
}

fn day_label(day: u64) -> String {
    i64::try_from(day * DAY_SECS)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|time| time.date_naive().to_string())
        .unwrap_or_else(|| format!("day {day}"))
}

/// Chart metrics of one block, or of one day once aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartDataPoint {
    /// Block timestamp, or the start of the day for daily records.
    pub time: u64,
    pub difficulty: f64,
    /// Transactions in the block, or in the whole day for daily records.
    pub tx_count: u32,
    /// Circulating supply after the block.
    pub supply: u64,
    /// Burned value after the block.
    pub burned: u64,
    pub cumulative_tx_count: u64,
}

impl ChartDataPoint {
    /// Builds the point of a connected block from the chain state after it.
    pub fn new(entry: &ChainEntry, block: &Block, state: &ChainState, network: Network) -> Self {
        Self {
            time: entry.time,
            difficulty: network.difficulty(entry.bits),
            tx_count: u32::try_from(block.txs.len()).unwrap_or(u32::MAX),
            supply: state.value,
            burned: state.burned,
            cumulative_tx_count: state.tx_count,
        }
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Difficulty => self.difficulty,
            Metric::Transactions => self.cumulative_tx_count as f64,
            Metric::Supply => self.supply as f64,
            Metric::Burned => self.burned as f64,
        }
    }
}

/// A per-block point together with the day bucket it was assigned to.
///
/// The bucket differs from the point's own day when a block carries a timestamp
/// earlier than the bucket being filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketedPoint {
    pub day: u64,
    pub point: ChartDataPoint,
}

/// Folds the points of one day into its daily record.
///
/// Difficulty is averaged and every other field takes its maximum over the day.
/// Returns `None` for an empty day.
pub fn aggregate(day: u64, points: &[ChartDataPoint]) -> Option<ChartDataPoint> {
    if points.is_empty() {
        return None;
    }

    let difficulty = points.iter().map(|p| p.difficulty).sum::<f64>() / points.len() as f64;
    Some(ChartDataPoint {
        time: day * DAY_SECS,
        difficulty,
        tx_count: points.iter().map(|p| p.tx_count).max().unwrap_or_default(),
        supply: points.iter().map(|p| p.supply).max().unwrap_or_default(),
        burned: points.iter().map(|p| p.burned).max().unwrap_or_default(),
        cumulative_tx_count: points
            .iter()
            .map(|p| p.cumulative_tx_count)
            .max()
            .unwrap_or_default(),
    })
}

/// Buffer of the day currently being filled.
#[derive(Debug, Clone, Default)]
pub struct ChartAggregator {
    day: Option<u64>,
    buffer: Vec<ChartDataPoint>,
}

impl ChartAggregator {
    /// Day currently being filled, `None` before the first point.
    pub fn current_day(&self) -> Option<u64> {
        self.day
    }

    pub fn buffered(&self) -> &[ChartDataPoint] {
        &self.buffer
    }

    /// Buffers the point of a newly connected block.
    ///
    /// Returns the bucket the point was assigned to, and the daily record of the
    /// previous day when this point opens a new one.
    pub fn observe(&mut self, point: ChartDataPoint) -> (BucketedPoint, Option<ChartDataPoint>) {
        let day = day_of(point.time);

        let Some(current) = self.day else {
            self.day = Some(day);
            self.buffer.push(point);
            return (BucketedPoint { day, point }, None);
        };

        if day > current {
            let flushed = aggregate(current, &self.buffer);
            tracing::debug!(
                "Flushed chart record for {} ({} blocks)",
                day_label(current),
                self.buffer.len()
            );
            self.buffer.clear();
            self.buffer.push(point);
            self.day = Some(day);
            return (BucketedPoint { day, point }, flushed);
        }

        if day < current {
            tracing::warn!(
                time = point.time,
                "Block timestamp falls on {}, before the open chart day {}, folding it into the open day",
                day_label(day),
                day_label(current),
            );
        }
        self.buffer.push(point);

        (BucketedPoint { day: current, point }, None)
    }

    /// Drops the most recently observed point.
    ///
    /// Returns `None` when nothing is buffered, otherwise whether the open day was
    /// left without points. An emptied day is followed by [`Self::restore`] of the
    /// previous one.
    pub fn retract(&mut self) -> Option<bool> {
        self.buffer.pop()?;
        if self.buffer.is_empty() {
            self.day = None;
        }
        Some(self.buffer.is_empty())
    }

    /// Replaces the buffer with the points of `day`, oldest first.
    pub fn restore(&mut self, day: u64, points: Vec<ChartDataPoint>) {
        self.day = (!points.is_empty()).then_some(day);
        self.buffer = points;
    }
}

/// Adds the chart records of a connected block to `batch`.
pub(crate) fn index_point(
    batch: &mut Batch,
    height: Height,
    bucketed: &BucketedPoint,
    flushed: Option<&ChartDataPoint>,
) {
    batch.put(layout::chart_point(height), bucketed.encode());
    if let Some(record) = flushed {
        batch.put(layout::chart_day(record.time), record.encode());
    }
}

/// Reverts the chart records of the disconnected block at `height`.
///
/// When the block was the only one of its day, the previous day's daily record is
/// deleted and its points go back into the buffer.
pub(crate) fn unindex_point(
    aggregator: &mut ChartAggregator,
    view: &ReadView<'_>,
    batch: &mut Batch,
    height: Height,
) -> Result<()> {
    batch.delete(layout::chart_point(height));

    let emptied = aggregator
        .retract()
        .ok_or_else(|| Error::NotFound(format!("chart point of block #{height}")))?;

    if emptied && height > 0 {
        if let Some((day, points)) = last_day(view, height - 1)? {
            tracing::debug!(
                "Reopening chart day {} ({} blocks)",
                day_label(day),
                points.len()
            );
            batch.delete(layout::chart_day(day * DAY_SECS));
            aggregator.restore(day, points);
        }
    }

    Ok(())
}

/// Rebuilds the buffer of the open day from the per-block points up to `tip`.
pub(crate) fn load(view: &ReadView<'_>, tip: Option<Height>) -> Result<ChartAggregator> {
    let mut aggregator = ChartAggregator::default();
    if let Some(tip) = tip {
        if let Some((day, points)) = last_day(view, tip)? {
            aggregator.restore(day, points);
        }
    }
    Ok(aggregator)
}

/// Collects the points of the day bucket containing block `top`, oldest first.
fn last_day(view: &ReadView<'_>, top: Height) -> Result<Option<(u64, Vec<ChartDataPoint>)>> {
    let mut day = None;
    let mut points = Vec::new();
    let mut height = Some(top);

    while let Some(h) = height {
        let Some(bytes) = view.get(&layout::chart_point(h))? else {
            break;
        };
        let bucketed = BucketedPoint::decode(&bytes)?;
        match day {
            None => day = Some(bucketed.day),
            Some(d) if d != bucketed.day => break,
            Some(_) => {}
        }
        points.push(bucketed.point);
        height = h.checked_sub(1);
    }

    points.reverse();
    Ok(day.map(|day| (day, points)))
}

/// Daily records with `start <= time <= end`, oldest first.
pub(crate) fn daily_records(
    view: &ReadView<'_>,
    start: u64,
    end: u64,
) -> Result<Vec<ChartDataPoint>> {
    view.scan_range(
        &layout::chart_day(start),
        &layout::chart_day(end),
        Direction::Forward,
    )?
    .into_iter()
    .map(|(_, value)| ChartDataPoint::decode(&value))
    .collect()
}

pub(crate) fn series(
    view: &ReadView<'_>,
    metric: Metric,
    start: u64,
    end: u64,
) -> Result<Vec<SeriesPoint>> {
    Ok(daily_records(view, start, end)?
        .into_iter()
        .map(|record| SeriesPoint {
            time: record.time,
            value: record.metric(metric),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::test_utils::BASE_TIME;

    fn point(time: u64, difficulty: f64, cumulative: u64) -> ChartDataPoint {
        ChartDataPoint {
            time,
            difficulty,
            tx_count: 2,
            supply: cumulative * 10,
            burned: cumulative,
            cumulative_tx_count: cumulative,
        }
    }

    #[test]
    fn test_flushes_when_next_day_starts() {
        let t0 = BASE_TIME;
        let mut aggregator = ChartAggregator::default();

        for (i, time) in [t0, t0 + 1, t0 + 86_399].into_iter().enumerate() {
            let (bucketed, flushed) = aggregator.observe(point(time, (i + 1) as f64, i as u64));
            assert_eq!(bucketed.day, day_of(t0));
            assert!(flushed.is_none());
        }

        let (bucketed, flushed) = aggregator.observe(point(t0 + 86_400, 10.0, 3));
        let flushed = flushed.unwrap();
        assert_eq!(bucketed.day, day_of(t0) + 1);
        assert_eq!(flushed.time, day_of(t0) * DAY_SECS);
        assert_eq!(flushed.difficulty, 2.0);
        assert_eq!(flushed.tx_count, 2);
        assert_eq!(flushed.cumulative_tx_count, 2);
        assert_eq!(flushed.supply, 20);
        assert_eq!(aggregator.buffered().len(), 1);
        assert_eq!(aggregator.current_day(), Some(day_of(t0) + 1));
    }

    #[test]
    fn test_earlier_timestamp_joins_open_day() {
        let mut aggregator = ChartAggregator::default();
        aggregator.observe(point(BASE_TIME + DAY_SECS, 1.0, 1));

        let (bucketed, flushed) = aggregator.observe(point(BASE_TIME, 1.0, 2));
        assert!(flushed.is_none());
        assert_eq!(bucketed.day, day_of(BASE_TIME) + 1);
        assert_eq!(aggregator.buffered().len(), 2);
    }

    #[test]
    fn test_retract_reports_empty_day() {
        let mut aggregator = ChartAggregator::default();
        assert_eq!(aggregator.retract(), None);

        aggregator.observe(point(BASE_TIME, 1.0, 1));
        aggregator.observe(point(BASE_TIME + 60, 1.0, 2));
        assert_eq!(aggregator.retract(), Some(false));
        assert_eq!(aggregator.retract(), Some(true));
        assert_eq!(aggregator.current_day(), None);
    }

    #[test]
    fn test_aggregate_empty_day() {
        assert!(aggregate(1, &[]).is_none());
    }

    #[test]
    fn test_aggregate_takes_max_block_tx_count() {
        let points: Vec<_> = [2, 4, 3]
            .into_iter()
            .enumerate()
            .map(|(i, tx_count)| ChartDataPoint {
                tx_count,
                ..point(BASE_TIME + i as u64, 1.0, i as u64)
            })
            .collect();

        let daily = aggregate(day_of(BASE_TIME), &points).unwrap();
        assert_eq!(daily.tx_count, 4);
        assert_eq!(daily.cumulative_tx_count, 2);
    }

    #[test]
    fn test_unindex_reopens_previous_day() {
        let db = Database::in_memory();
        let mut aggregator = ChartAggregator::default();
        let mut batch = Batch::default();

        let times = [BASE_TIME, BASE_TIME + 600, BASE_TIME + DAY_SECS];
        for (height, time) in times.into_iter().enumerate() {
            let (bucketed, flushed) = aggregator.observe(point(time, 4.0, height as u64));
            index_point(&mut batch, height as Height, &bucketed, flushed.as_ref());
        }
        db.write(batch).unwrap();
        assert_eq!(daily_records(&db.view(), 0, u64::MAX).unwrap().len(), 1);

        let mut batch = Batch::default();
        unindex_point(&mut aggregator, &db.view(), &mut batch, 2).unwrap();
        db.write(batch).unwrap();

        assert!(daily_records(&db.view(), 0, u64::MAX).unwrap().is_empty());
        assert_eq!(aggregator.current_day(), Some(day_of(BASE_TIME)));
        assert_eq!(aggregator.buffered().len(), 2);

        let reloaded = load(&db.view(), Some(1)).unwrap();
        assert_eq!(reloaded.buffered(), aggregator.buffered());
    }

    #[test]
    fn test_series_projects_metric_in_range() {
        let db = Database::in_memory();
        let mut batch = Batch::default();
        for day in 0..5u64 {
            let record = point(day * DAY_SECS, day as f64, day * 100);
            batch.put(layout::chart_day(record.time), record.encode());
        }
        db.write(batch).unwrap();

        let supply = series(&db.view(), Metric::Supply, DAY_SECS, 3 * DAY_SECS).unwrap();
        assert_eq!(
            supply,
            vec![
                SeriesPoint { time: DAY_SECS, value: 1000.0 },
                SeriesPoint { time: 2 * DAY_SECS, value: 2000.0 },
                SeriesPoint { time: 3 * DAY_SECS, value: 3000.0 },
            ]
        );
    }
}
