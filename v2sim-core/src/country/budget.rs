//! Daily budget waterfall.
//!
//! Cash at the start of the tick is handed out to the spending categories in
//! fixed priority order. Each category receives `min(remaining, projected)`;
//! whatever is left afterwards funds the national stockpile.

use crate::fixed::{AtomicFixed, Fixed};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpendingCategory {
    Education,
    Administration,
    /// Pensions plus unemployment subsidies.
    Social,
    Military,
    ImportSubsidies,
}

impl SpendingCategory {
    pub const COUNT: usize = 5;

    /// Funding order, highest priority first.
    pub const PRIORITY: [SpendingCategory; Self::COUNT] = [
        SpendingCategory::Education,
        SpendingCategory::Administration,
        SpendingCategory::Social,
        SpendingCategory::Military,
        SpendingCategory::ImportSubsidies,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            SpendingCategory::Education => "education",
            SpendingCategory::Administration => "administration",
            SpendingCategory::Social => "social",
            SpendingCategory::Military => "military",
            SpendingCategory::ImportSubsidies => "import subsidies",
        }
    }
}

impl std::fmt::Display for SpendingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One amount per [`SpendingCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryAmounts(pub [Fixed; SpendingCategory::COUNT]);

impl CategoryAmounts {
    pub fn total(&self) -> Fixed {
        self.0.iter().copied().sum()
    }
}

impl Index<SpendingCategory> for CategoryAmounts {
    type Output = Fixed;

    fn index(&self, category: SpendingCategory) -> &Fixed {
        &self.0[category.index()]
    }
}

impl IndexMut<SpendingCategory> for CategoryAmounts {
    fn index_mut(&mut self, category: SpendingCategory) -> &mut Fixed {
        &mut self.0[category.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterfallOutcome {
    pub actual: CategoryAmounts,
    pub was_cut: [bool; SpendingCategory::COUNT],
    /// Cash left after every category is funded; never negative.
    pub remaining: Fixed,
}

/// Splits `available` across the categories in [`SpendingCategory::PRIORITY`] order.
pub fn allocate_budget(available: Fixed, projected: &CategoryAmounts) -> WaterfallOutcome {
    let mut actual = CategoryAmounts::default();
    let mut was_cut = [false; SpendingCategory::COUNT];
    let mut remaining = available.max(Fixed::ZERO);

    for category in SpendingCategory::PRIORITY {
        let wanted = projected[category].max(Fixed::ZERO);
        let granted = wanted.min(remaining);
        actual[category] = granted;
        remaining -= granted;
        was_cut[category.index()] = granted < projected[category];
    }

    WaterfallOutcome {
        actual,
        was_cut,
        remaining,
    }
}

/// Per-category budget state for the current tick.
#[derive(Debug, Default)]
pub struct CategoryLedger {
    pub projected: Fixed,
    pub actual_budget: Fixed,
    /// Incremented by every payout made during the parallel phase.
    pub actual_spending: AtomicFixed,
    pub was_cut: bool,
}

/// An accounting check that failed after the parallel phase.
///
/// These are never corrected automatically; they are surfaced so a caller can
/// see that payouts diverged from the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetViolation {
    Overspend {
        category: SpendingCategory,
        spent: Fixed,
        budget: Fixed,
    },
    NegativeCash {
        cash: Fixed,
    },
}
