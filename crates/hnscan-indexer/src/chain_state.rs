//! Running chain aggregates.
//!
//! [`ChainState`] is a plain value. Connecting or disconnecting a block returns a new
//! state and leaves the old one untouched; the indexer publishes the new value only
//! after the block's batch is committed.

use crate::{Error, Result};
use hnscan_primitives::{Amount, Block, BlockHash, ChainEntry, CoinView, Output};
use serde::Serialize;

/// How an output takes part in the supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputClass {
    /// Regular value, counted in circulation.
    Circulating,
    /// Value of a REGISTER covenant, permanently removed from circulation.
    Burned,
    /// UPDATE..=REVOKE covenants, which move no value.
    Administrative,
    /// Provably unspendable, never tracked.
    Unspendable,
}

impl OutputClass {
    pub fn of(output: &Output) -> Self {
        if output.is_unspendable() {
            Self::Unspendable
        } else if output.covenant.is_register() {
            Self::Burned
        } else if output.covenant.is_administrative() {
            Self::Administrative
        } else {
            Self::Circulating
        }
    }
}

/// Chain aggregates as of `tip`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChainState {
    pub tip: BlockHash,
    pub tx_count: u64,
    /// Number of tracked unspent outputs.
    pub coin_count: u64,
    /// Circulating value.
    pub value: Amount,
    /// Value burned by name registrations.
    pub burned: Amount,
}

impl ChainState {
    /// Applies a connected block.
    ///
    /// Every input of a non-coinbase transaction must resolve in `view`.
    pub fn connect(&self, entry: &ChainEntry, block: &Block, view: &CoinView) -> Result<Self> {
        let mut next = *self;

        for tx in &block.txs {
            if !tx.is_coinbase() {
                for input in &tx.inputs {
                    let coin = view
                        .output(&input.prevout)
                        .ok_or(Error::InconsistentView(input.prevout))?;
                    next.spend(coin)?;
                }
            }

            for output in &tx.outputs {
                next.add(output)?;
            }
        }

        next.tx_count = checked_add(next.tx_count, block.txs.len() as u64, "tx count")?;
        next.tip = entry.hash;

        Ok(next)
    }

    /// Reverts a disconnected block, the exact inverse of [`Self::connect`].
    ///
    /// `entry` is the entry of the disconnected block; the new tip is its parent.
    pub fn disconnect(&self, entry: &ChainEntry, block: &Block, view: &CoinView) -> Result<Self> {
        let mut next = *self;

        for tx in block.txs.iter().rev() {
            for output in tx.outputs.iter().rev() {
                next.unadd(output)?;
            }

            if !tx.is_coinbase() {
                for input in tx.inputs.iter().rev() {
                    let coin = view
                        .output(&input.prevout)
                        .ok_or(Error::InconsistentView(input.prevout))?;
                    next.unspend(coin)?;
                }
            }
        }

        next.tx_count = checked_sub(next.tx_count, block.txs.len() as u64, "tx count")?;
        next.tip = entry.prev_block;

        Ok(next)
    }

    fn add(&mut self, output: &Output) -> Result<()> {
        match OutputClass::of(output) {
            OutputClass::Circulating => {
                self.coin_count = checked_add(self.coin_count, 1, "coin count")?;
                self.value = checked_add(self.value, output.value, "circulating value")?;
            }
            OutputClass::Burned => self.burn(output)?,
            OutputClass::Administrative | OutputClass::Unspendable => {}
        }
        Ok(())
    }

    fn unadd(&mut self, output: &Output) -> Result<()> {
        match OutputClass::of(output) {
            OutputClass::Circulating => {
                self.coin_count = checked_sub(self.coin_count, 1, "coin count")?;
                self.value = checked_sub(self.value, output.value, "circulating value")?;
            }
            OutputClass::Burned => self.unburn(output)?,
            OutputClass::Administrative | OutputClass::Unspendable => {}
        }
        Ok(())
    }

    fn burn(&mut self, output: &Output) -> Result<()> {
        self.coin_count = checked_add(self.coin_count, 1, "coin count")?;
        self.burned = checked_add(self.burned, output.value, "burned value")?;
        Ok(())
    }

    fn unburn(&mut self, output: &Output) -> Result<()> {
        self.coin_count = checked_sub(self.coin_count, 1, "coin count")?;
        self.burned = checked_sub(self.burned, output.value, "burned value")?;
        Ok(())
    }

    // A spent coin leaves the supply the way it entered it: burned value stays
    // burned and administrative coins were never counted.
    fn spend(&mut self, coin: &Output) -> Result<()> {
        match OutputClass::of(coin) {
            OutputClass::Circulating => {
                self.coin_count = checked_sub(self.coin_count, 1, "coin count")?;
                self.value = checked_sub(self.value, coin.value, "circulating value")?;
            }
            OutputClass::Burned => {
                self.coin_count = checked_sub(self.coin_count, 1, "coin count")?;
            }
            OutputClass::Administrative | OutputClass::Unspendable => {}
        }
        Ok(())
    }

    fn unspend(&mut self, coin: &Output) -> Result<()> {
        match OutputClass::of(coin) {
            OutputClass::Circulating => {
                self.coin_count = checked_add(self.coin_count, 1, "coin count")?;
                self.value = checked_add(self.value, coin.value, "circulating value")?;
            }
            OutputClass::Burned => {
                self.coin_count = checked_add(self.coin_count, 1, "coin count")?;
            }
            OutputClass::Administrative | OutputClass::Unspendable => {}
        }
        Ok(())
    }
}

fn checked_add(lhs: u64, rhs: u64, what: &str) -> Result<u64> {
    lhs.checked_add(rhs)
        .ok_or_else(|| Error::Accounting(format!("{what} overflow: {lhs} + {rhs}")))
}

fn checked_sub(lhs: u64, rhs: u64, what: &str) -> Result<u64> {
    lhs.checked_sub(rhs)
        .ok_or_else(|| Error::Accounting(format!("{what} underflow: {lhs} - {rhs}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use hnscan_primitives::{CovenantType, Hash256, OutPoint};

    #[test]
    fn test_connect_coinbase_only() {
        let block = block_with(1, vec![coinbase(1, 2_000)]);
        let state = ChainState::default()
            .connect(&entry_for(&block, 1, Hash256::zero()), &block, &CoinView::new())
            .unwrap();

        assert_eq!(state.tip, block.hash);
        assert_eq!(state.tx_count, 1);
        assert_eq!(state.coin_count, 1);
        assert_eq!(state.value, 2_000);
        assert_eq!(state.burned, 0);
    }

    #[test]
    fn test_register_burns_value() {
        let funding = coinbase(1, 5_000);
        let genesis = block_with(0, vec![funding.clone()]);
        let state = ChainState::default()
            .connect(&entry_for(&genesis, 0, Hash256::zero()), &genesis, &CoinView::new())
            .unwrap();

        let prevout = OutPoint::new(funding.txid, 0);
        let register = tx(
            2,
            vec![prevout],
            vec![output(address(2), 1_000).with_covenant(named(CovenantType::Register, 9))],
        );
        let block = block_with(1, vec![coinbase(3, 0), register]);
        let view = view_of(&[(prevout, funding.outputs[0].clone())]);

        let before = state;
        let after = before
            .connect(&entry_for(&block, 1, genesis.hash), &block, &view)
            .unwrap();

        // The spent coin leaves circulation, the register output is burned.
        assert_eq!(after.value, before.value - 5_000);
        assert_eq!(after.burned, before.burned + 1_000);
    }

    #[test]
    fn test_register_only_block_leaves_circulation_unchanged() {
        let burned_coin = output(address(1), 700).with_covenant(named(CovenantType::Register, 1));
        let prevout = OutPoint::new(Hash256::repeat_byte(0x42), 0);
        let register = tx(
            2,
            vec![prevout],
            vec![output(address(2), 700).with_covenant(named(CovenantType::Register, 1))],
        );
        let block = block_with(5, vec![coinbase(1, 0), register]);

        let before = ChainState {
            coin_count: 1,
            burned: 700,
            ..Default::default()
        };
        let after = before
            .connect(
                &entry_for(&block, 5, Hash256::zero()),
                &block,
                &view_of(&[(prevout, burned_coin)]),
            )
            .unwrap();

        assert_eq!(after.value, before.value);
        assert_eq!(after.burned, before.burned + 700);
    }

    #[test]
    fn test_administrative_and_unspendable_outputs_are_skipped() {
        let block = block_with(
            1,
            vec![
                coinbase(1, 100),
                tx(
                    2,
                    vec![],
                    vec![
                        output(address(2), 50).with_covenant(named(CovenantType::Update, 3)),
                        output(address(3), 60).with_covenant(named(CovenantType::Revoke, 3)),
                        output(null_data(), 70),
                    ],
                ),
            ],
        );
        let state = ChainState::default()
            .connect(&entry_for(&block, 1, Hash256::zero()), &block, &CoinView::new())
            .unwrap();

        assert_eq!(state.value, 100);
        assert_eq!(state.coin_count, 1);
        assert_eq!(state.tx_count, 2);
    }

    #[test]
    fn test_missing_view_entry_is_fatal() {
        let missing = OutPoint::new(Hash256::repeat_byte(9), 1);
        let block = block_with(1, vec![coinbase(1, 0), tx(2, vec![missing], vec![])]);
        let err = ChainState::default()
            .connect(&entry_for(&block, 1, Hash256::zero()), &block, &CoinView::new())
            .unwrap_err();
        assert!(matches!(err, Error::InconsistentView(outpoint) if outpoint == missing));
    }

    #[test]
    fn test_connect_disconnect_roundtrip() {
        let chain = TestChain::build(12);
        let mut states = vec![ChainState::default()];

        for (entry, block, view) in chain.iter() {
            let next = states.last().unwrap().connect(entry, block, view).unwrap();
            states.push(next);
        }

        let mut state = *states.last().unwrap();
        for (entry, block, view) in chain.iter().rev() {
            state = state.disconnect(entry, block, view).unwrap();
            states.pop();
            assert_eq!(state, *states.last().unwrap());
        }

        assert_eq!(state, ChainState::default());
    }

    #[test]
    fn test_disconnect_below_zero_is_an_accounting_error() {
        let block = block_with(1, vec![coinbase(1, 10)]);
        let err = ChainState::default()
            .disconnect(&entry_for(&block, 1, Hash256::zero()), &block, &CoinView::new())
            .unwrap_err();
        assert!(matches!(err, Error::Accounting(_)));
    }
}
