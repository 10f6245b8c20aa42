use crate::NameHash;
use serde::Serialize;

/// Covenant action attached to an output.
///
/// Discriminants match the on-chain encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CovenantType {
    None = 0,
    Claim = 1,
    Open = 2,
    Bid = 3,
    Reveal = 4,
    Redeem = 5,
    Register = 6,
    Update = 7,
    Renew = 8,
    Transfer = 9,
    Finalize = 10,
    Revoke = 11,
}

impl CovenantType {
    /// Returns `true` for every covenant that refers to a name.
    pub fn is_name(self) -> bool {
        self != Self::None
    }

    /// Returns `true` for the administrative range (`Update..=Revoke`).
    ///
    /// Outputs in this range carry value that is already locked in a name and
    /// never moves through circulation.
    pub fn is_administrative(self) -> bool {
        (Self::Update..=Self::Revoke).contains(&self)
    }
}

impl TryFrom<u8> for CovenantType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::None,
            1 => Self::Claim,
            2 => Self::Open,
            3 => Self::Bid,
            4 => Self::Reveal,
            5 => Self::Redeem,
            6 => Self::Register,
            7 => Self::Update,
            8 => Self::Renew,
            9 => Self::Transfer,
            10 => Self::Finalize,
            11 => Self::Revoke,
            other => return Err(other),
        })
    }
}

/// A typed covenant with its raw items.
///
/// For every name covenant the first item is the 32-byte name hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Covenant {
    pub kind: CovenantType,
    pub items: Vec<Vec<u8>>,
}

impl Default for Covenant {
    fn default() -> Self {
        Self::none()
    }
}

impl Covenant {
    pub fn none() -> Self {
        Self {
            kind: CovenantType::None,
            items: Vec::new(),
        }
    }

    /// Creates a name covenant whose first item is `name_hash`.
    pub fn with_name(kind: CovenantType, name_hash: NameHash) -> Self {
        Self {
            kind,
            items: vec![name_hash.0.to_vec()],
        }
    }

    pub fn is_register(&self) -> bool {
        self.kind == CovenantType::Register
    }

    pub fn is_administrative(&self) -> bool {
        self.kind.is_administrative()
    }

    /// Name hash this covenant refers to, if any.
    ///
    /// Returns `None` for non-name covenants and for name covenants whose first
    /// item is not a 32-byte hash.
    pub fn name_hash(&self) -> Option<NameHash> {
        if !self.kind.is_name() {
            return None;
        }
        self.items
            .first()
            .and_then(|item| NameHash::from_slice(item))
    }
}
