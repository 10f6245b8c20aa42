//! Address index.
//!
//! Two record families are written independently: funding records, one per output
//! paid to an address, and spend pointers, one per consumed output. Balances and
//! histories are reconstructed by joining the two.

use crate::codec::{self, Record};
use crate::db::{Batch, Direction, ReadView};
use crate::layout;
use crate::types::{AddressBalance, AddressHistory, FundingRecord, SpendPointer, SpentRecord};
use crate::{Error, Result};
use hnscan_primitives::{Address, Block, Height, Transaction, Txid};
use std::collections::{HashMap, HashSet};

/// Writes the funding records of every output of `tx` that pays an address.
pub(crate) fn index_outputs(batch: &mut Batch, tx: &Transaction, height: Height) {
    for (outpoint, output) in tx.outpoints() {
        if output.is_unspendable() {
            continue;
        }
        let key = layout::funding(&output.address.key_hash(), &outpoint);
        batch.put(key, codec::encode_funding(height, output.value));
    }
}

/// Writes a spend pointer for every input of `tx`.
pub(crate) fn index_spends(batch: &mut Batch, tx: &Transaction, height: Height) {
    let pointer = SpendPointer {
        spending_txid: tx.txid,
        height,
    };
    for input in &tx.inputs {
        batch.put(layout::spend(&input.prevout), pointer.encode());
    }
}

pub(crate) fn index_block(batch: &mut Batch, block: &Block, height: Height) {
    for tx in &block.txs {
        if !tx.is_coinbase() {
            index_spends(batch, tx, height);
        }
        index_outputs(batch, tx, height);
    }
}

/// Deletes every record [`index_block`] wrote for `block`.
pub(crate) fn unindex_block(batch: &mut Batch, block: &Block) {
    for tx in &block.txs {
        if !tx.is_coinbase() {
            for input in &tx.inputs {
                batch.delete(layout::spend(&input.prevout));
            }
        }
        for (outpoint, output) in tx.outpoints() {
            if !output.is_unspendable() {
                batch.delete(layout::funding(&output.address.key_hash(), &outpoint));
            }
        }
    }
}

/// Every output ever paid to `address`, in key order.
pub(crate) fn funding(view: &ReadView<'_>, address: &Address) -> Result<Vec<FundingRecord>> {
    view.scan_prefix(
        &layout::funding_prefix(&address.key_hash()),
        Direction::Forward,
    )?
    .into_iter()
    .map(|(key, value)| {
        let outpoint = layout::funding_outpoint(&key).ok_or_else(|| Error::Decode {
            what: "funding key",
            reason: format!("unexpected key length {}", key.len()),
        })?;
        let (height, value) = codec::decode_funding(&value)?;
        Ok(FundingRecord {
            outpoint,
            height,
            value,
        })
    })
    .collect()
}

/// The subset of `funding` that has been spent, with the spending transaction.
pub(crate) fn spent(view: &ReadView<'_>, funding: &[FundingRecord]) -> Result<Vec<SpentRecord>> {
    let mut spent = Vec::new();
    for record in funding {
        let Some(bytes) = view.get(&layout::spend(&record.outpoint))? else {
            continue;
        };
        let pointer = SpendPointer::decode(&bytes)?;
        spent.push(SpentRecord {
            outpoint: record.outpoint,
            value: record.value,
            spending_txid: pointer.spending_txid,
            height: pointer.height,
        });
    }
    Ok(spent)
}

fn split_unspent(funding: Vec<FundingRecord>, spent: &[SpentRecord]) -> Vec<FundingRecord> {
    let spent: HashSet<_> = spent.iter().map(|record| record.outpoint).collect();
    funding
        .into_iter()
        .filter(|record| !spent.contains(&record.outpoint))
        .collect()
}

pub(crate) fn unspent(view: &ReadView<'_>, address: &Address) -> Result<Vec<FundingRecord>> {
    let funding = funding(view, address)?;
    let spent = spent(view, &funding)?;
    Ok(split_unspent(funding, &spent))
}

pub(crate) fn balance(view: &ReadView<'_>, address: &Address) -> Result<AddressBalance> {
    let funding = funding(view, address)?;
    let spent = spent(view, &funding)?;

    let total_received = sum(funding.iter().map(|record| record.value))?;
    let total_sent = sum(spent.iter().map(|record| record.value))?;
    let confirmed = total_received
        .checked_sub(total_sent)
        .ok_or_else(|| Error::Accounting(format!("{address} spent more than it received")))?;

    let txids: HashSet<Txid> = funding
        .iter()
        .map(|record| record.outpoint.txid)
        .chain(spent.iter().map(|record| record.spending_txid))
        .collect();

    Ok(AddressBalance {
        confirmed,
        unconfirmed: confirmed,
        total_received,
        total_sent,
        tx_count: txids.len() as u64,
        utxo_count: (funding.len() - spent.len()) as u64,
    })
}

/// Transactions touching `address`, most recent first, one entry per transaction.
pub(crate) fn history(
    view: &ReadView<'_>,
    address: &Address,
    limit: usize,
    offset: usize,
) -> Result<Vec<AddressHistory>> {
    let funding = funding(view, address)?;
    let spent = spent(view, &funding)?;

    let mut by_txid: HashMap<Txid, AddressHistory> = HashMap::new();
    for record in &funding {
        let entry = by_txid
            .entry(record.outpoint.txid)
            .or_insert_with(|| empty_history(record.outpoint.txid, record.height));
        entry.received = entry.received.saturating_add(record.value);
    }
    for record in &spent {
        let entry = by_txid
            .entry(record.spending_txid)
            .or_insert_with(|| empty_history(record.spending_txid, record.height));
        entry.sent = entry.sent.saturating_add(record.value);
    }

    let mut history: Vec<_> = by_txid.into_values().collect();
    history.sort_by(|a, b| b.height.cmp(&a.height).then_with(|| a.txid.cmp(&b.txid)));

    Ok(history.into_iter().skip(offset).take(limit).collect())
}

fn empty_history(txid: Txid, height: Height) -> AddressHistory {
    AddressHistory {
        txid,
        height,
        received: 0,
        sent: 0,
    }
}

fn sum(values: impl Iterator<Item = u64>) -> Result<u64> {
    values.try_fold(0u64, |acc, value| {
        acc.checked_add(value)
            .ok_or_else(|| Error::Accounting("address total overflows".to_string()))
    })
}
