//! Per-good price curve and order settlement.
//!
//! ## Price limits
//!
//! Each day the price may move by at most Δ in either direction:
//!
//! ```text
//! exponential:  Δ = price >> 7      bounds [EPSILON << 7, USABLE_MAX]
//! linear:       Δ = 0.01            bounds [base × 0.22, base × 5]
//!
//! max_next_price = min(abs_max, price + Δ)
//! min_next_price = max(abs_min, price − Δ)
//! ```
//!
//! ## Settlement
//!
//! 1. No sellers: nothing trades, price rises if anyone wanted to buy.
//! 2. Buyers can absorb all supply at `max_next_price`: supply is shared in
//!    proportion to purchasing power, re-sharing whenever a buyer saturates.
//! 3. Otherwise the price falls (toward `min_next_price`) and every buyer gets
//!    what it can afford at that price.
//!
//! Sellers then receive their domestic sales plus a fair share of exports.

use crate::config::{CountryDefines, GameRules};
use crate::country::CountryId;
use crate::defines::market as defines;
use crate::fixed::Fixed;
use crate::goods::{GoodDefinition, GoodId};
use crate::history::ValueHistory;
use crate::market::order::{BuyResult, BuyUpToOrder, MarketSellOrder, SellResult, Trader, TradeSettlement};
use rustc_hash::FxHashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy)]
enum RejectedOrder {
    Buy(Trader),
    Sell(Trader),
}

/// Market state for one good.
#[derive(Debug)]
pub struct GoodMarket {
    good: GoodId,
    base_price: Fixed,
    is_money: bool,
    is_available: bool,
    use_exponential_price_changes: bool,
    use_optimal_pricing: bool,
    money_sale_price: Fixed,

    price: Fixed,
    price_inverse: Fixed,
    max_next_price: Fixed,
    min_next_price: Fixed,
    absolute_maximum_price: Fixed,
    absolute_minimum_price: Fixed,

    price_change_yesterday: Fixed,
    quantity_traded_yesterday: Fixed,
    total_demand_yesterday: Fixed,
    total_supply_yesterday: Fixed,
    price_history: ValueHistory<Fixed>,

    buy_up_to_orders: Mutex<Vec<BuyUpToOrder>>,
    market_sell_orders: Mutex<Vec<MarketSellOrder>>,
    rejected_orders: Mutex<Vec<RejectedOrder>>,
}

impl GoodMarket {
    pub fn new(definition: &GoodDefinition, rules: &GameRules, country_defines: &CountryDefines) -> Self {
        let mut market = Self {
            good: definition.id,
            base_price: definition.base_price,
            is_money: definition.is_money,
            is_available: definition.is_available_from_start,
            use_exponential_price_changes: rules.use_exponential_price_changes,
            use_optimal_pricing: rules.use_optimal_pricing,
            money_sale_price: country_defines.gold_to_worker_pay_rate * definition.base_price,
            price: definition.base_price,
            price_inverse: Fixed::ZERO,
            max_next_price: definition.base_price,
            min_next_price: definition.base_price,
            absolute_maximum_price: Fixed::USABLE_MAX,
            absolute_minimum_price: Fixed::EPSILON,
            price_change_yesterday: Fixed::ZERO,
            quantity_traded_yesterday: Fixed::ZERO,
            total_demand_yesterday: Fixed::ZERO,
            total_supply_yesterday: Fixed::ZERO,
            price_history: ValueHistory::new(defines::PRICE_HISTORY_MONTHS, definition.base_price),
            buy_up_to_orders: Mutex::new(Vec::new()),
            market_sell_orders: Mutex::new(Vec::new()),
            rejected_orders: Mutex::new(Vec::new()),
        };
        market.update_absolute_price_limits();
        market.update_next_price_limits();
        market
    }

    fn update_absolute_price_limits(&mut self) {
        if self.use_exponential_price_changes {
            self.absolute_maximum_price = Fixed::USABLE_MAX;
            self.absolute_minimum_price = Fixed::EPSILON.shl(defines::EXPONENTIAL_PRICE_CHANGE_SHIFT);
        } else {
            self.absolute_maximum_price = self
                .base_price
                .mul_int(defines::LINEAR_MAX_PRICE_MULTIPLE)
                .min(Fixed::USABLE_MAX);
            self.absolute_minimum_price = self
                .base_price
                .mul_int(defines::LINEAR_MIN_PRICE_PERCENT)
                .div_int(100)
                .max(Fixed::EPSILON);
        }
    }

    fn update_next_price_limits(&mut self) {
        let max_price_change = if self.use_exponential_price_changes {
            self.price.shr(defines::EXPONENTIAL_PRICE_CHANGE_SHIFT)
        } else {
            Fixed::POINT_ZERO_ONE
        };

        self.max_next_price = self.absolute_maximum_price.min(self.price + max_price_change);
        self.min_next_price = self.absolute_minimum_price.max(self.price - max_price_change);
        self.price_inverse = Fixed::ONE / self.price;
    }

    pub fn good(&self) -> GoodId {
        self.good
    }

    pub fn is_available(&self) -> bool {
        self.is_available
    }

    pub fn is_money(&self) -> bool {
        self.is_money
    }

    pub fn price(&self) -> Fixed {
        self.price
    }

    pub fn price_inverse(&self) -> Fixed {
        self.price_inverse
    }

    pub fn max_next_price(&self) -> Fixed {
        self.max_next_price
    }

    pub fn min_next_price(&self) -> Fixed {
        self.min_next_price
    }

    pub fn absolute_price_limits(&self) -> (Fixed, Fixed) {
        (self.absolute_minimum_price, self.absolute_maximum_price)
    }

    pub fn price_change_yesterday(&self) -> Fixed {
        self.price_change_yesterday
    }

    pub fn quantity_traded_yesterday(&self) -> Fixed {
        self.quantity_traded_yesterday
    }

    pub fn total_demand_yesterday(&self) -> Fixed {
        self.total_demand_yesterday
    }

    pub fn total_supply_yesterday(&self) -> Fixed {
        self.total_supply_yesterday
    }

    pub fn price_history(&self) -> &ValueHistory<Fixed> {
        &self.price_history
    }

    pub fn record_price_history(&mut self) {
        self.price_history.push_back(self.price);
    }

    /// Budget needed to be sure `quantity` can be bought today.
    pub fn get_max_money_to_allocate_to_buy_quantity(&self, quantity: Fixed) -> Fixed {
        quantity * self.max_next_price + Fixed::EPSILON
    }

    pub fn add_buy_up_to_order(&self, order: BuyUpToOrder) {
        if order.max_quantity <= Fixed::ZERO {
            log::error!(
                "Rejected buy order for good {} from {:?} with non-positive quantity {}",
                self.good.0,
                order.buyer,
                order.max_quantity
            );
            lock(&self.rejected_orders).push(RejectedOrder::Buy(order.buyer));
            return;
        }
        lock(&self.buy_up_to_orders).push(order);
    }

    pub fn add_market_sell_order(&self, order: MarketSellOrder) {
        if order.quantity <= Fixed::ZERO {
            log::error!(
                "Rejected sell order for good {} from {:?} with non-positive quantity {}",
                self.good.0,
                order.seller,
                order.quantity
            );
            lock(&self.rejected_orders).push(RejectedOrder::Sell(order.seller));
            return;
        }
        lock(&self.market_sell_orders).push(order);
    }

    pub fn pending_order_counts(&self) -> (usize, usize) {
        (lock(&self.buy_up_to_orders).len(), lock(&self.market_sell_orders).len())
    }

    /// Resolves every queued order and reports results through `settlement`.
    ///
    /// Orders are sorted by issuer first, so the outcome does not depend on the
    /// order in which worker threads enqueued them.
    pub fn execute_orders(&mut self, settlement: &mut dyn TradeSettlement, scratch: &mut Vec<Fixed>) {
        let mut buy_orders = std::mem::take(get_mut(&mut self.buy_up_to_orders));
        let mut sell_orders = std::mem::take(get_mut(&mut self.market_sell_orders));
        let rejected = std::mem::take(get_mut(&mut self.rejected_orders));

        for rejected_order in rejected {
            match rejected_order {
                RejectedOrder::Buy(buyer) => settlement.settle_buy(buyer, &BuyResult::no_purchase(self.good)),
                RejectedOrder::Sell(seller) => {
                    settlement.settle_sell(seller, &SellResult::no_sales(self.good), scratch)
                }
            }
        }

        buy_orders.sort_by_key(|o| (o.buyer, o.country, o.max_quantity, o.money_to_spend));
        sell_orders.sort_by_key(|o| (o.seller, o.country, o.quantity));

        if self.is_money {
            self.execute_money_orders(&buy_orders, &sell_orders, settlement, scratch);
            return;
        }

        if !self.is_available {
            // price remains the same
            self.price_change_yesterday = Fixed::ZERO;
            self.quantity_traded_yesterday = Fixed::ZERO;
            self.total_demand_yesterday = Fixed::ZERO;
            self.total_supply_yesterday = Fixed::ZERO;
            for order in &buy_orders {
                settlement.settle_buy(order.buyer, &BuyResult::no_purchase(self.good));
            }
            for order in &sell_orders {
                settlement.settle_sell(order.seller, &SellResult::no_sales(self.good), scratch);
            }
            return;
        }

        let mut demand_sum = Fixed::ZERO;
        let mut supply_sum = Fixed::ZERO;
        let new_price;

        if sell_orders.is_empty() {
            self.quantity_traded_yesterday = Fixed::ZERO;
            let mut max_affordable_price = self.price;
            for order in &buy_orders {
                max_affordable_price = max_affordable_price.max(order.affordable_price());
                demand_sum += order.max_quantity;
                settlement.settle_buy(order.buyer, &BuyResult::no_purchase(self.good));
            }

            new_price = if self.use_optimal_pricing {
                self.max_next_price.min(max_affordable_price)
            } else if demand_sum > Fixed::ZERO {
                self.max_next_price
            } else {
                self.price
            };
        } else {
            let mut supply_per_country: FxHashMap<CountryId, Fixed> = FxHashMap::default();
            for order in &sell_orders {
                if let Some(country) = order.country {
                    *supply_per_country.entry(country).or_default() += order.quantity;
                }
                supply_sum += order.quantity;
            }

            let count = buy_orders.len();
            let mut quantity_bought = vec![Fixed::ZERO; count];
            let mut purchasing_power = vec![Fixed::ZERO; count];
            let mut min_next_price = self.min_next_price;

            // money of buyers who cannot afford their max quantity at max_next_price
            let mut money_left_to_spend_sum = Fixed::ZERO;
            let mut max_quantity_to_buy_sum = Fixed::ZERO;
            let mut purchasing_power_sum = Fixed::ZERO;
            for (i, order) in buy_orders.iter().enumerate() {
                if self.use_optimal_pricing {
                    // no point selling lower as it would not attract more buyers
                    min_next_price = min_next_price.max(order.affordable_price().min(self.max_next_price));
                }

                demand_sum += order.max_quantity;
                if order.money_to_spend <= Fixed::ZERO {
                    continue;
                }

                let power = order.money_to_spend / self.max_next_price;
                if power >= order.max_quantity {
                    purchasing_power[i] = order.max_quantity;
                    max_quantity_to_buy_sum += order.max_quantity;
                    money_left_to_spend_sum += order.max_quantity * self.max_next_price;
                    purchasing_power_sum += order.max_quantity;
                } else {
                    purchasing_power[i] = power;
                    max_quantity_to_buy_sum += power;
                    money_left_to_spend_sum += order.money_to_spend;
                    purchasing_power_sum += power;
                }
            }

            let mut remaining_supply = supply_sum;
            if max_quantity_to_buy_sum >= supply_sum {
                new_price = self.max_next_price;
                loop {
                    let mut someone_bought_max_quantity = false;
                    for (i, order) in buy_orders.iter().enumerate() {
                        if quantity_bought[i] == order.max_quantity || purchasing_power[i] == Fixed::ZERO {
                            continue;
                        }

                        let share = remaining_supply.mul_div(purchasing_power[i], purchasing_power_sum);
                        if share >= order.max_quantity {
                            someone_bought_max_quantity = true;
                            quantity_bought[i] = order.max_quantity;
                            remaining_supply -= order.max_quantity;
                            purchasing_power_sum -= purchasing_power[i];
                            break;
                        }
                        quantity_bought[i] = share;
                    }
                    if !someone_bought_max_quantity {
                        break;
                    }
                }
            } else {
                let mut price = self.max_next_price;
                if self.use_optimal_pricing {
                    // drop price while supply is left and it stays above min_next_price
                    let mut saturated = vec![false; count];
                    while remaining_supply > Fixed::ZERO {
                        let possible_price = money_left_to_spend_sum / remaining_supply;
                        if possible_price >= price {
                            break;
                        }
                        if possible_price < min_next_price {
                            price = min_next_price;
                            break;
                        }
                        price = possible_price;

                        for (i, order) in buy_orders.iter().enumerate() {
                            if saturated[i] {
                                continue;
                            }
                            if order.money_to_spend >= price * order.max_quantity {
                                saturated[i] = true;
                                remaining_supply -= order.max_quantity;
                                money_left_to_spend_sum -= order.money_to_spend;
                            }
                        }
                    }
                } else if supply_sum > demand_sum {
                    price = min_next_price;
                } else {
                    price = self.price;
                }
                new_price = price.max(Fixed::EPSILON);

                for (i, order) in buy_orders.iter().enumerate() {
                    quantity_bought[i] = if order.money_to_spend <= Fixed::ZERO {
                        Fixed::ZERO
                    } else {
                        order.max_quantity.min(order.money_to_spend / new_price)
                    };
                }

                // A lower price can let buyers afford more than is on offer.
                let bought_sum: Fixed = quantity_bought.iter().copied().sum();
                if bought_sum > supply_sum {
                    for quantity in quantity_bought.iter_mut() {
                        *quantity = quantity.mul_div(supply_sum, bought_sum);
                    }
                }
            }

            let mut bought_per_country: FxHashMap<CountryId, Fixed> = FxHashMap::default();
            for (order, &quantity) in buy_orders.iter().zip(&quantity_bought) {
                if let Some(country) = order.country {
                    *bought_per_country.entry(country).or_default() += quantity;
                }
            }

            self.execute_buy_orders(
                new_price,
                &buy_orders,
                &quantity_bought,
                &bought_per_country,
                &supply_per_country,
                settlement,
            );
            self.execute_sell_orders(
                new_price,
                supply_sum,
                &sell_orders,
                &bought_per_country,
                &supply_per_country,
                settlement,
                scratch,
            );
        }

        self.price_change_yesterday = new_price - self.price;
        self.total_demand_yesterday = demand_sum;
        self.total_supply_yesterday = supply_sum;
        if new_price != self.price {
            self.price = new_price;
            self.update_next_price_limits();
        }
    }

    fn execute_buy_orders(
        &mut self,
        new_price: Fixed,
        buy_orders: &[BuyUpToOrder],
        quantity_bought: &[Fixed],
        bought_per_country: &FxHashMap<CountryId, Fixed>,
        supply_per_country: &FxHashMap<CountryId, Fixed>,
        settlement: &mut dyn TradeSettlement,
    ) {
        self.quantity_traded_yesterday = Fixed::ZERO;
        for (order, &quantity) in buy_orders.iter().zip(quantity_bought) {
            if quantity == Fixed::ZERO {
                settlement.settle_buy(order.buyer, &BuyResult::no_purchase(self.good));
                continue;
            }

            self.quantity_traded_yesterday += quantity;
            let money_spent_total = (quantity * new_price).max(Fixed::EPSILON);

            let money_spent_on_imports = match order.country {
                // trade outside any country is always an import
                None => money_spent_total,
                Some(country) => {
                    let bought_in_country = bought_per_country.get(&country).copied().unwrap_or_default();
                    let supply_in_country = supply_per_country.get(&country).copied().unwrap_or_default();
                    if supply_in_country >= bought_in_country {
                        Fixed::ZERO
                    } else {
                        money_spent_total
                            - money_spent_total.mul_div(supply_in_country, bought_in_country)
                    }
                }
            };

            settlement.settle_buy(
                order.buyer,
                &BuyResult {
                    good: self.good,
                    quantity_bought: quantity,
                    money_spent_total,
                    money_spent_on_imports,
                },
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_sell_orders(
        &self,
        new_price: Fixed,
        supply_sum: Fixed,
        sell_orders: &[MarketSellOrder],
        bought_per_country: &FxHashMap<CountryId, Fixed>,
        supply_per_country: &FxHashMap<CountryId, Fixed>,
        settlement: &mut dyn TradeSettlement,
        scratch: &mut Vec<Fixed>,
    ) {
        let money_for = |quantity_sold: Fixed| {
            if quantity_sold == Fixed::ZERO {
                Fixed::ZERO
            } else {
                (quantity_sold * new_price).max(Fixed::EPSILON)
            }
        };

        if self.quantity_traded_yesterday == supply_sum {
            for order in sell_orders {
                let result = SellResult {
                    good: self.good,
                    quantity_sold: order.quantity,
                    money_gained: money_for(order.quantity),
                };
                settlement.settle_sell(order.seller, &result, scratch);
            }
            return;
        }

        // domestic buyers are served first, the rest is shared out as exports
        let mut total_traded_domestically = Fixed::ZERO;
        for (country, &bought) in bought_per_country {
            let supply = supply_per_country.get(country).copied().unwrap_or_default();
            total_traded_domestically += supply.min(bought);
        }

        let total_traded_as_export = self.quantity_traded_yesterday - total_traded_domestically;
        let total_offered_as_export = supply_sum - total_traded_domestically;
        for order in sell_orders {
            let (sold_domestically, offered_as_export) = match order.country {
                None => (Fixed::ZERO, order.quantity),
                Some(country) => {
                    let bought_domestically = bought_per_country.get(&country).copied().unwrap_or_default();
                    let domestic_supply = supply_per_country.get(&country).copied().unwrap_or_default();
                    let sold = if bought_domestically >= domestic_supply {
                        order.quantity
                    } else {
                        order.quantity.mul_div(bought_domestically, domestic_supply)
                    };
                    (sold, order.quantity - sold)
                }
            };

            let fair_share_of_exports =
                offered_as_export.mul_div(total_traded_as_export, total_offered_as_export);
            let quantity_sold = sold_domestically + fair_share_of_exports;
            let result = SellResult {
                good: self.good,
                quantity_sold,
                money_gained: money_for(quantity_sold),
            };
            settlement.settle_sell(order.seller, &result, scratch);
        }
    }

    /// Money goods are bought by the treasury at a fixed rate, never by traders.
    fn execute_money_orders(
        &mut self,
        buy_orders: &[BuyUpToOrder],
        sell_orders: &[MarketSellOrder],
        settlement: &mut dyn TradeSettlement,
        scratch: &mut Vec<Fixed>,
    ) {
        let mut supply_sum = Fixed::ZERO;
        for order in buy_orders {
            settlement.settle_buy(order.buyer, &BuyResult::no_purchase(self.good));
        }
        for order in sell_orders {
            supply_sum += order.quantity;
            let result = SellResult {
                good: self.good,
                quantity_sold: order.quantity,
                money_gained: order.quantity * self.money_sale_price,
            };
            settlement.settle_sell(order.seller, &result, scratch);
        }
        self.price_change_yesterday = Fixed::ZERO;
        self.quantity_traded_yesterday = supply_sum;
        self.total_supply_yesterday = supply_sum;
        self.total_demand_yesterday = Fixed::ZERO;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn get_mut<T>(mutex: &mut Mutex<T>) -> &mut T {
    mutex.get_mut().unwrap_or_else(PoisonError::into_inner)
}
