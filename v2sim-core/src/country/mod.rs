pub mod budget;
pub mod economy;
pub mod good_account;
pub mod reporting;
pub mod stockpile;

pub use budget::{BudgetViolation, SpendingCategory};
pub use economy::{CountryEconomy, SalaryBases};
pub use good_account::{GoodAccount, GoodAccountData, GovernmentNeedSource};
pub use reporting::EconomyReporter;

use crate::modifiers::CountryModifiers;
use serde::{Deserialize, Serialize};

/// Type-safe country identifier (index into `WorldState::countries`).
#[derive(
    Hash, Eq, PartialEq, Clone, Copy, Debug, Default, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct CountryId(pub u16);

impl CountryId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub struct Country {
    pub id: CountryId,
    pub tag: String,
    pub modifiers: CountryModifiers,
    pub economy: CountryEconomy,
}
