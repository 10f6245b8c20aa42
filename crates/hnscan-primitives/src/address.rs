use crate::Hash256;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Witness version reserved for provably unspendable (null-data) outputs.
pub const NULL_DATA_VERSION: u8 = 31;

/// A witness-program address: a version byte and a 2 to 40 byte program.
///
/// The textual form used by the tooling is `<version>:<hex program>`, e.g.
/// `0:6f1d5c4c2a3c2ab1e0fd7e2b4a6cbd8e01c0ffee`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub version: u8,
    pub hash: Vec<u8>,
}

impl Address {
    pub fn new(version: u8, hash: impl Into<Vec<u8>>) -> Self {
        Self {
            version,
            hash: hash.into(),
        }
    }

    /// Returns `true` if outputs paying to this address can never be spent.
    pub fn is_null_data(&self) -> bool {
        self.version == NULL_DATA_VERSION
    }

    /// Fixed-width key for this address.
    ///
    /// Programs have variable length, so index keys use SHA-256 over the version
    /// byte followed by the program.
    pub fn key_hash(&self) -> Hash256 {
        let mut hasher = Sha256::new();
        hasher.update([self.version]);
        hasher.update(&self.hash);
        Hash256(hasher.finalize().into())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.version, hex::encode(&self.hash))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Error returned when an address cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum AddressParseError {
    #[error("expected `<version>:<hex program>`")]
    MissingSeparator,

    #[error("invalid version: {0}")]
    Version(#[from] std::num::ParseIntError),

    #[error("invalid program hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("program length {0} is outside 2..=40 bytes")]
    ProgramLength(usize),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (version, program) = s
            .split_once(':')
            .ok_or(AddressParseError::MissingSeparator)?;
        let version = version.parse::<u8>()?;
        let hash = hex::decode(program)?;
        if !(2..=40).contains(&hash.len()) {
            return Err(AddressParseError::ProgramLength(hash.len()));
        }
        Ok(Self { version, hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_roundtrip() {
        let address = Address::new(0, vec![0x11; 20]);
        let parsed: Address = address.to_string().parse().unwrap();
        assert_eq!(parsed, address);
        assert!(matches!(
            "0".parse::<Address>(),
            Err(AddressParseError::MissingSeparator)
        ));
        assert!(matches!(
            "0:ab".parse::<Address>(),
            Err(AddressParseError::ProgramLength(1))
        ));
    }

    #[test]
    fn test_key_hash_depends_on_version() {
        let v0 = Address::new(0, vec![0x22; 20]);
        let v1 = Address::new(1, vec![0x22; 20]);
        assert_ne!(v0.key_hash(), v1.key_hash());
        assert!(Address::new(NULL_DATA_VERSION, vec![0; 2]).is_null_data());
    }
}
