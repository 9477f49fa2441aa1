use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};

/// Type-safe good identifier.
///
/// Sequential (0..N), so per-good records are stored in a `Vec` indexed by it.
#[derive(
    Hash, Eq, PartialEq, Clone, Copy, Debug, Default, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct GoodId(pub u16);

impl GoodId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Static description of a tradeable good.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodDefinition {
    pub id: GoodId,
    pub identifier: String,
    pub base_price: Fixed,
    /// Money goods (gold) are never traded on the price curve.
    pub is_money: bool,
    pub is_available_from_start: bool,
}

impl GoodDefinition {
    pub fn new(id: GoodId, identifier: impl Into<String>, base_price: Fixed) -> Self {
        Self {
            id,
            identifier: identifier.into(),
            base_price,
            is_money: false,
            is_available_from_start: true,
        }
    }
}
