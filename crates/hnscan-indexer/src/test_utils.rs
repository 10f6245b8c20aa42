//! Block builders shared by the unit tests.

use hnscan_primitives::{
    Address, Amount, Block, BlockHash, ChainEntry, CoinView, Covenant, CovenantType, Hash256,
    Height, Input, NULL_DATA_VERSION, Network, OutPoint, Output, Transaction, Txid,
};
use std::collections::HashMap;

/// 2024-01-01T00:00:00Z, the start of a UTC day.
pub const BASE_TIME: u64 = 1_704_067_200;

pub fn address(n: u8) -> Address {
    Address::new(0, vec![n; 20])
}

pub fn null_data() -> Address {
    Address::new(NULL_DATA_VERSION, vec![0u8; 2])
}

pub fn output(address: Address, value: Amount) -> Output {
    Output::new(value, address)
}

/// Name covenant for the name whose hash is `name` repeated.
pub fn named(kind: CovenantType, name: u8) -> Covenant {
    Covenant::with_name(kind, Hash256::repeat_byte(name))
}

fn id(fill: u8, n: u32) -> Hash256 {
    let mut bytes = [fill; 32];
    bytes[..4].copy_from_slice(&n.to_be_bytes());
    Hash256(bytes)
}

pub fn txid(n: u32) -> Txid {
    id(0x77, n)
}

pub fn block_hash(n: u32) -> BlockHash {
    id(0xb1, n)
}

/// Coinbase paying `value` to `address(0)`.
pub fn coinbase(n: u32, value: Amount) -> Transaction {
    coinbase_to(n, address(0), value)
}

pub fn coinbase_to(n: u32, address: Address, value: Amount) -> Transaction {
    Transaction {
        txid: id(0xcb, n),
        inputs: vec![Input {
            prevout: OutPoint::null(),
        }],
        outputs: vec![Output::new(value, address)],
    }
}

pub fn tx(n: u32, prevouts: Vec<OutPoint>, outputs: Vec<Output>) -> Transaction {
    Transaction {
        txid: txid(n),
        inputs: prevouts
            .into_iter()
            .map(|prevout| Input { prevout })
            .collect(),
        outputs,
    }
}

pub fn block_with(n: u32, txs: Vec<Transaction>) -> Block {
    Block {
        hash: block_hash(n),
        txs,
    }
}

pub fn entry_for(block: &Block, height: Height, prev_block: BlockHash) -> ChainEntry {
    ChainEntry {
        hash: block.hash,
        prev_block,
        height,
        time: BASE_TIME + u64::from(height) * 600,
        bits: Network::Regtest.pow_limit_bits(),
    }
}

pub fn view_of(coins: &[(OutPoint, Output)]) -> CoinView {
    coins.iter().cloned().collect()
}

/// A deterministic chain exercising every output class.
///
/// Block `h` carries a coinbase of 1000 paying `address(h % 3 + 1)` and, from height 1
/// on, a transaction spending the previous coinbase and the previous block's second
/// output. That second output rotates through REGISTER, BID, UPDATE and no covenant,
/// so burned and administrative coins are created and spent as well.
pub struct TestChain {
    pub blocks: Vec<(ChainEntry, Block, CoinView)>,
}

impl TestChain {
    pub fn build(len: u32) -> Self {
        Self::build_spaced(len, 600)
    }

    pub fn build_spaced(len: u32, spacing: u64) -> Self {
        let mut created: HashMap<OutPoint, Output> = HashMap::new();
        let mut blocks = Vec::with_capacity(len as usize);
        let mut prev_hash = Hash256::zero();
        let mut prev_coinbase: Option<OutPoint> = None;
        let mut prev_second: Option<OutPoint> = None;

        for height in 0..len {
            let mut txs = vec![coinbase_to(height, address((height % 3 + 1) as u8), 1_000)];

            let prevouts: Vec<OutPoint> = prev_coinbase.into_iter().chain(prev_second).collect();
            if !prevouts.is_empty() {
                let covenant = match height % 4 {
                    0 => named(CovenantType::Register, (height % 2) as u8),
                    1 => named(CovenantType::Bid, (height % 2) as u8),
                    2 => named(CovenantType::Update, (height % 2) as u8),
                    _ => Covenant::none(),
                };
                txs.push(tx(
                    height,
                    prevouts.clone(),
                    vec![
                        output(address((height % 3 + 2) as u8), 600),
                        output(address(1), 300).with_covenant(covenant),
                    ],
                ));
            }

            let view: CoinView = prevouts
                .iter()
                .map(|prevout| (*prevout, created[prevout].clone()))
                .collect();

            let block = block_with(height, txs);
            let mut entry = entry_for(&block, height, prev_hash);
            entry.time = BASE_TIME + u64::from(height) * spacing;

            for tx in &block.txs {
                for (outpoint, output) in tx.outpoints() {
                    created.insert(outpoint, output.clone());
                }
            }

            prev_coinbase = Some(OutPoint::new(block.txs[0].txid, 0));
            prev_second = block.txs.get(1).map(|tx| OutPoint::new(tx.txid, 1));
            prev_hash = block.hash;
            blocks.push((entry, block, view));
        }

        Self { blocks }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&ChainEntry, &Block, &CoinView)> {
        self.blocks.iter().map(|(entry, block, view)| (entry, block, view))
    }
}
