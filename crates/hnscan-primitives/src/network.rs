use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Network the ledger runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Testnet,
    Regtest,
    Simnet,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Main,
        Network::Testnet,
        Network::Regtest,
        Network::Simnet,
    ];

    /// Network magic, persisted by the index to refuse opening data from another network.
    pub fn magic(self) -> u32 {
        match self {
            Network::Main => 0x5b6e_f2d3,
            Network::Testnet => 0x8efa_1fbe,
            Network::Regtest => 0xbcf1_73aa,
            Network::Simnet => 0x473b_d012,
        }
    }

    /// Compact encoding of the proof-of-work limit, i.e. difficulty 1.
    pub fn pow_limit_bits(self) -> u32 {
        match self {
            Network::Main => 0x1c00_ffff,
            Network::Testnet => 0x1d00_ffff,
            Network::Regtest | Network::Simnet => 0x207f_ffff,
        }
    }

    /// Difficulty of a block with the given compact target, relative to the
    /// network's proof-of-work limit.
    pub fn difficulty(self, bits: u32) -> f64 {
        let target = compact_to_f64(bits);
        if target <= 0.0 {
            return 0.0;
        }
        compact_to_f64(self.pow_limit_bits()) / target
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
            Network::Simnet => "simnet",
        }
    }
}

fn compact_to_f64(bits: u32) -> f64 {
    let exponent = (bits >> 24) as i32;
    let mantissa = f64::from(bits & 0x007f_ffff);
    mantissa * 256f64.powi(exponent - 3)
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown network: {0}")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|network| network.as_str() == s)
            .ok_or_else(|| UnknownNetwork(s.to_string()))
    }
}
