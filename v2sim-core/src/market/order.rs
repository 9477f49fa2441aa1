//! Orders, settlement results and the capability traits used to deliver them.
//!
//! An order names its issuer with a [`Trader`] value instead of a callback.
//! During settlement the market hands each result to a [`TradeSettlement`],
//! which looks the trader up and forwards the result to the matching
//! [`PurchaseSink`] or [`SaleSink`] implementation.

use crate::country::{CountryEconomy, CountryId};
use crate::fixed::Fixed;
use crate::goods::GoodId;
use crate::province::ProvinceId;
use serde::{Deserialize, Serialize};

/// Stable handle to a pop: its province plus its position in that province.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PopRef {
    pub province: ProvinceId,
    pub index: u32,
}

/// Identity of whoever placed an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Trader {
    /// A country's national stockpile.
    Country(CountryId),
    /// A pop buying needs or artisan inputs, or selling artisan output.
    Pop(PopRef),
    /// The resource gathering operation of a province.
    Rgo(ProvinceId),
}

/// Buy at most `max_quantity`, spending at most `money_to_spend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyUpToOrder {
    pub good: GoodId,
    pub buyer: Trader,
    /// Country the buyer trades from; `None` for buyers outside any country.
    pub country: Option<CountryId>,
    pub max_quantity: Fixed,
    pub money_to_spend: Fixed,
}

impl BuyUpToOrder {
    /// Highest unit price at which the whole quantity is still affordable.
    pub fn affordable_price(&self) -> Fixed {
        self.money_to_spend / self.max_quantity
    }
}

/// Sell `quantity` at whatever price the market settles on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketSellOrder {
    pub good: GoodId,
    pub seller: Trader,
    pub country: Option<CountryId>,
    pub quantity: Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyResult {
    pub good: GoodId,
    pub quantity_bought: Fixed,
    pub money_spent_total: Fixed,
    /// Part of `money_spent_total` not covered by the buyer's own country's supply.
    pub money_spent_on_imports: Fixed,
}

impl BuyResult {
    pub fn no_purchase(good: GoodId) -> Self {
        Self {
            good,
            quantity_bought: Fixed::ZERO,
            money_spent_total: Fixed::ZERO,
            money_spent_on_imports: Fixed::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellResult {
    pub good: GoodId,
    pub quantity_sold: Fixed,
    pub money_gained: Fixed,
}

impl SellResult {
    pub fn no_sales(good: GoodId) -> Self {
        Self {
            good,
            quantity_sold: Fixed::ZERO,
            money_gained: Fixed::ZERO,
        }
    }
}

/// Receives the outcome of a buy order during settlement.
///
/// `reporting_country` is the country the buyer reports its economy to, when
/// that is a different object from the buyer itself.
pub trait PurchaseSink {
    fn after_buy(&mut self, reporting_country: Option<&CountryEconomy>, result: &BuyResult);
}

/// Receives the outcome of a sell order during settlement.
///
/// `scratch` is a reusable buffer for distributing revenue; its contents on
/// entry are unspecified.
pub trait SaleSink {
    fn after_sell(
        &mut self,
        reporting_country: Option<&CountryEconomy>,
        result: &SellResult,
        scratch: &mut Vec<Fixed>,
    );
}

/// Routes settlement results back to the traders that issued the orders.
///
/// Only called from the single-threaded settle phase.
pub trait TradeSettlement {
    fn settle_buy(&mut self, buyer: Trader, result: &BuyResult);
    fn settle_sell(&mut self, seller: Trader, result: &SellResult, scratch: &mut Vec<Fixed>);
}
