//! Types returned by index queries.

use hnscan_primitives::{Amount, BlockHash, CovenantType, Height, OutPoint, Txid};
use serde::Serialize;

/// Tip of the indexed chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexedTip {
    pub height: Height,
    pub hash: BlockHash,
}

impl std::fmt::Display for IndexedTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{},{}", self.height, self.hash)
    }
}

/// An output paid to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FundingRecord {
    pub outpoint: OutPoint,
    /// Height of the block that created the output.
    pub height: Height,
    pub value: Amount,
}

/// A funding output that has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpentRecord {
    /// The funding output that was spent.
    pub outpoint: OutPoint,
    pub value: Amount,
    pub spending_txid: Txid,
    /// Height of the block containing the spending transaction.
    pub height: Height,
}

/// Where and when an output was spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpendPointer {
    pub spending_txid: Txid,
    pub height: Height,
}

/// Address balance summary.
///
/// Confirmed and unconfirmed balances are identical until mempool data is indexed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AddressBalance {
    pub confirmed: Amount,
    pub unconfirmed: Amount,
    /// Sum of all funding outputs.
    pub total_received: Amount,
    /// Sum of all spent funding outputs.
    pub total_sent: Amount,
    /// Number of distinct transactions touching the address.
    pub tx_count: u64,
    /// Number of unspent outputs.
    pub utxo_count: u64,
}

/// A transaction in an address's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddressHistory {
    pub txid: Txid,
    pub height: Height,
    /// Value this transaction paid to the address.
    pub received: Amount,
    /// Value of the address's outputs this transaction spent.
    pub sent: Amount,
}

impl AddressHistory {
    /// Net change of the address balance, positive when receiving.
    pub fn delta(&self) -> i128 {
        i128::from(self.received) - i128::from(self.sent)
    }
}

/// Auction action recorded for a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NameAction {
    Claim,
    Opened,
    Bid,
    Reveal,
    Redeem,
    Register,
    Update,
    Renew,
    Transfer,
    Finalize,
    Revoke,
}

impl NameAction {
    /// Maps a name covenant to its action; `None` for outputs without a name.
    pub fn from_covenant(kind: CovenantType) -> Option<Self> {
        Some(match kind {
            CovenantType::None => return None,
            CovenantType::Claim => Self::Claim,
            CovenantType::Open => Self::Opened,
            CovenantType::Bid => Self::Bid,
            CovenantType::Reveal => Self::Reveal,
            CovenantType::Redeem => Self::Redeem,
            CovenantType::Register => Self::Register,
            CovenantType::Update => Self::Update,
            CovenantType::Renew => Self::Renew,
            CovenantType::Transfer => Self::Transfer,
            CovenantType::Finalize => Self::Finalize,
            CovenantType::Revoke => Self::Revoke,
        })
    }

    pub fn covenant(self) -> CovenantType {
        match self {
            Self::Claim => CovenantType::Claim,
            Self::Opened => CovenantType::Open,
            Self::Bid => CovenantType::Bid,
            Self::Reveal => CovenantType::Reveal,
            Self::Redeem => CovenantType::Redeem,
            Self::Register => CovenantType::Register,
            Self::Update => CovenantType::Update,
            Self::Renew => CovenantType::Renew,
            Self::Transfer => CovenantType::Transfer,
            Self::Finalize => CovenantType::Finalize,
            Self::Revoke => CovenantType::Revoke,
        }
    }

    /// Whether the output value is meaningful for this action (locked bid, revealed
    /// bid, burned amount or redeemed amount).
    pub fn carries_value(self) -> bool {
        matches!(
            self,
            Self::Bid | Self::Reveal | Self::Register | Self::Redeem
        )
    }
}

/// One entry of a name's auction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NameHistoryEntry {
    pub txid: Txid,
    pub height: Height,
    /// Position of the transaction within its block.
    pub position: u32,
    pub action: NameAction,
    /// Output value, for actions where it is meaningful.
    pub value: Option<Amount>,
}

/// Chart metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Mean difficulty of the day.
    Difficulty,
    /// Cumulative transaction count.
    Transactions,
    /// Circulating supply.
    Supply,
    /// Cumulative burned value.
    Burned,
}

/// One value of a chart series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Day bucket timestamp (start of the UTC day).
    pub time: u64,
    pub value: f64,
}
