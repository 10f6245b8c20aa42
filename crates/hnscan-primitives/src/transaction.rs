use crate::{Address, Amount, Covenant, Txid};
use serde::Serialize;
use std::fmt;

/// Reference to an output of a previous transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OutPoint {
    pub txid: Txid,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: Txid, index: u32) -> Self {
        Self { txid, index }
    }

    /// The outpoint referenced by coinbase inputs.
    pub fn null() -> Self {
        Self {
            txid: Txid::zero(),
            index: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX && self.txid.is_zero()
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub prevout: OutPoint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub value: Amount,
    pub address: Address,
    pub covenant: Covenant,
}

impl Output {
    pub fn new(value: Amount, address: Address) -> Self {
        Self {
            value,
            address,
            covenant: Covenant::none(),
        }
    }

    pub fn with_covenant(mut self, covenant: Covenant) -> Self {
        self.covenant = covenant;
        self
    }

    /// Returns `true` if the output can never be spent.
    pub fn is_unspendable(&self) -> bool {
        self.address.is_null_data()
    }
}

/// A transaction as delivered by the ledger node.
///
/// The txid is computed by the node; the index only carries it along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub txid: Txid,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
}

impl Transaction {
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    /// Iterates over the outpoints this transaction creates.
    pub fn outpoints(&self) -> impl Iterator<Item = (OutPoint, &Output)> + '_ {
        self.outputs
            .iter()
            .enumerate()
            .map(|(index, output)| (OutPoint::new(self.txid, index as u32), output))
    }
}
