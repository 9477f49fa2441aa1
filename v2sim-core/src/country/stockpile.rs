//! National stockpile management.
//!
//! Goods flagged for selling offer everything above their cutoff. Every other
//! good below its target competes for the leftover budget through
//! [`water_fill`], weighted by `USABLE_MAX / max_cost` so that goods which are
//! cheap to top up are funded first.

use crate::allocation::{water_fill, FillCandidate};
use crate::fixed::Fixed;
use crate::goods::GoodId;
use crate::market::MarketAccess;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockpileTarget {
    pub good: GoodId,
    pub stockpile: Fixed,
    /// Cutoff for selling goods, buy target otherwise.
    pub target: Fixed,
    pub is_selling: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedPurchase {
    pub good: GoodId,
    pub max_quantity: Fixed,
    pub money_to_spend: Fixed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockpilePlan {
    pub sells: Vec<(GoodId, Fixed)>,
    pub buys: Vec<PlannedPurchase>,
    pub redistribution_passes: usize,
}

impl StockpilePlan {
    pub fn money_committed(&self) -> Fixed {
        self.buys.iter().map(|b| b.money_to_spend).sum()
    }
}

pub fn plan_national_stockpile(
    targets: &[StockpileTarget],
    market: &dyn MarketAccess,
    available_funds: Fixed,
) -> StockpilePlan {
    let mut plan = StockpilePlan::default();
    let mut wanted = Vec::new();
    let mut candidates = Vec::new();

    for target in targets {
        if target.is_selling {
            let quantity_to_sell = target.stockpile - target.target;
            if quantity_to_sell > Fixed::ZERO {
                plan.sells.push((target.good, quantity_to_sell));
            }
            continue;
        }

        let max_quantity_to_buy = target.target - target.stockpile;
        if max_quantity_to_buy <= Fixed::ZERO || available_funds <= Fixed::ZERO {
            continue;
        }

        let max_cost = market.get_max_money_to_allocate_to_buy_quantity(target.good, max_quantity_to_buy);
        if max_cost <= Fixed::ZERO {
            continue;
        }
        wanted.push((target.good, max_quantity_to_buy));
        candidates.push(FillCandidate {
            max_cost,
            weight: Fixed::USABLE_MAX / max_cost,
        });
    }

    let outcome = water_fill(available_funds, &candidates);
    plan.redistribution_passes = outcome.passes;

    for (i, &(good, max_quantity)) in wanted.iter().enumerate() {
        let money_to_spend = outcome.money[i];
        if money_to_spend <= Fixed::ZERO {
            continue;
        }
        // partial shares too small to buy a single epsilon at the next price are dust
        if !outcome.fully_funded[i] && money_to_spend / market.min_next_price(good) < Fixed::EPSILON {
            continue;
        }
        plan.buys.push(PlannedPurchase {
            good,
            max_quantity,
            money_to_spend,
        });
    }

    plan
}
