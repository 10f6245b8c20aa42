//! Name auction history index.

use crate::codec::{NameRecordValue, Record};
use crate::db::{Batch, Direction, ReadView};
use crate::layout;
use crate::types::{NameAction, NameHistoryEntry};
use crate::{Error, Result};
use hnscan_primitives::{Block, Height, NameHash, Transaction};
use std::collections::HashSet;

/// Name records of one transaction: the first output referencing each name.
fn name_records(
    tx: &Transaction,
    height: Height,
    position: u32,
) -> impl Iterator<Item = (NameHash, NameRecordValue)> + '_ {
    let mut seen = HashSet::new();
    tx.outputs.iter().filter_map(move |output| {
        let name_hash = output.covenant.name_hash()?;
        let action = NameAction::from_covenant(output.covenant.kind)?;
        seen.insert(name_hash).then_some((
            name_hash,
            NameRecordValue {
                height,
                position,
                action,
                value: output.value,
            },
        ))
    })
}

pub(crate) fn index_block(batch: &mut Batch, block: &Block, height: Height) {
    for (position, tx) in (0u32..).zip(&block.txs) {
        for (name_hash, record) in name_records(tx, height, position) {
            batch.put(layout::name(&name_hash, &tx.txid), record.encode());
        }
    }
}

pub(crate) fn unindex_block(batch: &mut Batch, block: &Block, height: Height) {
    for (position, tx) in (0u32..).zip(&block.txs) {
        for (name_hash, _) in name_records(tx, height, position) {
            batch.delete(layout::name(&name_hash, &tx.txid));
        }
    }
}

/// Auction history of a name, most recent first.
///
/// Records of one block keep their order within the block.
pub(crate) fn history(view: &ReadView<'_>, name_hash: &NameHash) -> Result<Vec<NameHistoryEntry>> {
    let mut entries = view
        .scan_prefix(&layout::name_prefix(name_hash), Direction::Forward)?
        .into_iter()
        .map(|(key, value)| {
            let txid = layout::name_txid(&key).ok_or_else(|| Error::Decode {
                what: "name key",
                reason: format!("unexpected key length {}", key.len()),
            })?;
            let record = NameRecordValue::decode(&value)?;
            Ok(NameHistoryEntry {
                txid,
                height: record.height,
                position: record.position,
                action: record.action,
                value: record.action.carries_value().then_some(record.value),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    entries.sort_by(|a, b| {
        b.height
            .cmp(&a.height)
            .then_with(|| a.position.cmp(&b.position))
    });

    Ok(entries)
}
