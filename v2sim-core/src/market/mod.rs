pub mod good_market;
pub mod order;
pub mod settlement;

pub use good_market::GoodMarket;
pub use order::{
    BuyResult, BuyUpToOrder, MarketSellOrder, PopRef, PurchaseSink, SaleSink, SellResult, Trader,
    TradeSettlement,
};
pub use settlement::WorldSettlement;

use crate::config::{CountryDefines, GameRules};
use crate::fixed::Fixed;
use crate::goods::{GoodDefinition, GoodId};
use tracing::instrument;

/// Read-only price queries plus thread-safe order placement.
///
/// Everything a province worker needs from the market during the parallel
/// phase. Prices do not change until the settle phase.
pub trait MarketAccess: Sync {
    fn is_available(&self, good: GoodId) -> bool;
    fn price(&self, good: GoodId) -> Fixed;
    fn price_inverse(&self, good: GoodId) -> Fixed;
    fn max_next_price(&self, good: GoodId) -> Fixed;
    fn min_next_price(&self, good: GoodId) -> Fixed;

    /// Budget needed to be sure `quantity` of `good` can be bought today.
    fn get_max_money_to_allocate_to_buy_quantity(&self, good: GoodId, quantity: Fixed) -> Fixed {
        quantity * self.max_next_price(good) + Fixed::EPSILON
    }

    fn place_buy_up_to_order(&self, order: BuyUpToOrder);
    fn place_market_sell_order(&self, order: MarketSellOrder);
}

/// One [`GoodMarket`] per good, indexed by [`GoodId`].
#[derive(Debug)]
pub struct Market {
    goods: Vec<GoodMarket>,
}

impl Market {
    pub fn new(definitions: &[GoodDefinition], rules: &GameRules, country_defines: &CountryDefines) -> Self {
        Self {
            goods: definitions
                .iter()
                .map(|definition| GoodMarket::new(definition, rules, country_defines))
                .collect(),
        }
    }

    pub fn good(&self, good: GoodId) -> Option<&GoodMarket> {
        self.goods.get(good.index())
    }

    pub fn goods(&self) -> &[GoodMarket] {
        &self.goods
    }

    /// Settles every good in id order.
    #[instrument(skip_all, name = "execute_orders")]
    pub fn execute_orders(&mut self, settlement: &mut dyn TradeSettlement, scratch: &mut Vec<Fixed>) {
        for good_market in &mut self.goods {
            good_market.execute_orders(settlement, scratch);
        }
    }

    pub fn record_price_history(&mut self) {
        for good_market in &mut self.goods {
            good_market.record_price_history();
        }
    }
}

impl MarketAccess for Market {
    fn is_available(&self, good: GoodId) -> bool {
        self.good(good).is_some_and(GoodMarket::is_available)
    }

    fn price(&self, good: GoodId) -> Fixed {
        self.good(good).map_or(Fixed::ZERO, GoodMarket::price)
    }

    fn price_inverse(&self, good: GoodId) -> Fixed {
        self.good(good).map_or(Fixed::ZERO, GoodMarket::price_inverse)
    }

    fn max_next_price(&self, good: GoodId) -> Fixed {
        self.good(good).map_or(Fixed::ZERO, GoodMarket::max_next_price)
    }

    fn min_next_price(&self, good: GoodId) -> Fixed {
        self.good(good).map_or(Fixed::ZERO, GoodMarket::min_next_price)
    }

    fn get_max_money_to_allocate_to_buy_quantity(&self, good: GoodId, quantity: Fixed) -> Fixed {
        self.good(good)
            .map_or(Fixed::ZERO, |m| m.get_max_money_to_allocate_to_buy_quantity(quantity))
    }

    fn place_buy_up_to_order(&self, order: BuyUpToOrder) {
        match self.good(order.good) {
            Some(good_market) => good_market.add_buy_up_to_order(order),
            None => log::error!("Dropped buy order from {:?} for unknown good {}", order.buyer, order.good.0),
        }
    }

    fn place_market_sell_order(&self, order: MarketSellOrder) {
        match self.good(order.good) {
            Some(good_market) => good_market.add_market_sell_order(order),
            None => log::error!("Dropped sell order from {:?} for unknown good {}", order.seller, order.good.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::country::CountryId;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct RecordingSettlement {
        bought: BTreeMap<Trader, BuyResult>,
        sold: BTreeMap<Trader, SellResult>,
    }

    impl TradeSettlement for RecordingSettlement {
        fn settle_buy(&mut self, buyer: Trader, result: &BuyResult) {
            self.bought.insert(buyer, *result);
        }

        fn settle_sell(&mut self, seller: Trader, result: &SellResult, _scratch: &mut Vec<Fixed>) {
            self.sold.insert(seller, *result);
        }
    }

    fn grain_market(rules: GameRules) -> Market {
        let goods = vec![GoodDefinition::new(GoodId(0), "grain", Fixed::from_int(2))];
        Market::new(&goods, &rules, &CountryDefines::default())
    }

    fn buy(buyer: u16, country: u16, quantity: i64, money: i64) -> BuyUpToOrder {
        BuyUpToOrder {
            good: GoodId(0),
            buyer: Trader::Country(CountryId(buyer)),
            country: Some(CountryId(country)),
            max_quantity: Fixed::from_int(quantity),
            money_to_spend: Fixed::from_int(money),
        }
    }

    fn sell(seller: u16, country: u16, quantity: i64) -> MarketSellOrder {
        MarketSellOrder {
            good: GoodId(0),
            seller: Trader::Country(CountryId(seller)),
            country: Some(CountryId(country)),
            quantity: Fixed::from_int(quantity),
        }
    }

    fn settle(market: &mut Market) -> RecordingSettlement {
        let mut settlement = RecordingSettlement::default();
        market.execute_orders(&mut settlement, &mut Vec::new());
        settlement
    }

    #[test]
    fn test_linear_price_limits() {
        let market = grain_market(GameRules::default());
        let grain = market.good(GoodId(0)).unwrap();
        assert_eq!(grain.max_next_price(), Fixed::from_f64(2.01));
        assert_eq!(grain.min_next_price(), Fixed::from_f64(1.99));
        assert_eq!(grain.absolute_price_limits(), (Fixed::from_f64(0.44), Fixed::from_int(10)));
        assert_eq!(grain.price_inverse(), Fixed::HALF);
    }

    #[test]
    fn test_exponential_price_limits() {
        let rules = GameRules {
            use_exponential_price_changes: true,
            ..GameRules::default()
        };
        let market = grain_market(rules);
        let grain = market.good(GoodId(0)).unwrap();
        let step = Fixed::from_int(2).shr(7);
        assert_eq!(grain.max_next_price(), Fixed::from_int(2) + step);
        assert_eq!(grain.min_next_price(), Fixed::from_int(2) - step);
    }

    #[test]
    fn test_no_sellers_raises_price_to_affordable() {
        let mut market = grain_market(GameRules::default());
        market.place_buy_up_to_order(buy(1, 1, 10, 100));
        let settlement = settle(&mut market);

        let result = settlement.bought[&Trader::Country(CountryId(1))];
        assert_eq!(result.quantity_bought, Fixed::ZERO);
        let grain = market.good(GoodId(0)).unwrap();
        assert_eq!(grain.price(), Fixed::from_f64(2.01));
        assert_eq!(grain.total_demand_yesterday(), Fixed::from_int(10));
    }

    #[test]
    fn test_scarce_supply_sells_at_max_price() {
        let mut market = grain_market(GameRules::default());
        market.place_buy_up_to_order(buy(1, 1, 10, 100));
        market.place_buy_up_to_order(buy(2, 1, 10, 100));
        market.place_market_sell_order(sell(3, 1, 10));
        let settlement = settle(&mut market);

        let max_price = Fixed::from_f64(2.01);
        for buyer in [1, 2] {
            let result = settlement.bought[&Trader::Country(CountryId(buyer))];
            assert_eq!(result.quantity_bought, Fixed::from_int(5));
            assert_eq!(result.money_spent_total, Fixed::from_int(5) * max_price);
            assert_eq!(result.money_spent_on_imports, Fixed::ZERO);
        }
        let sold = settlement.sold[&Trader::Country(CountryId(3))];
        assert_eq!(sold.quantity_sold, Fixed::from_int(10));
        assert_eq!(market.good(GoodId(0)).unwrap().price(), max_price);
    }

    #[test]
    fn test_surplus_supply_lowers_price() {
        let mut market = grain_market(GameRules::default());
        market.place_buy_up_to_order(buy(1, 1, 1, 1));
        market.place_market_sell_order(sell(2, 1, 100));
        let settlement = settle(&mut market);

        let grain = market.good(GoodId(0)).unwrap();
        assert_eq!(grain.price(), Fixed::from_f64(1.99));
        let bought = settlement.bought[&Trader::Country(CountryId(1))];
        assert!(bought.quantity_bought <= Fixed::ONE);
        let sold = settlement.sold[&Trader::Country(CountryId(2))];
        assert_eq!(sold.quantity_sold, bought.quantity_bought);
        assert!(grain.quantity_traded_yesterday() <= grain.total_supply_yesterday());
    }

    #[test]
    fn test_cross_border_purchase_counts_as_import() {
        let mut market = grain_market(GameRules::default());
        market.place_buy_up_to_order(buy(1, 1, 10, 100));
        market.place_market_sell_order(sell(2, 2, 10));
        let settlement = settle(&mut market);

        let result = settlement.bought[&Trader::Country(CountryId(1))];
        assert_eq!(result.money_spent_on_imports, result.money_spent_total);
        assert_eq!(settlement.sold[&Trader::Country(CountryId(2))].quantity_sold, Fixed::from_int(10));
    }

    #[test]
    fn test_non_positive_order_is_rejected_not_dropped() {
        let mut market = grain_market(GameRules::default());
        market.place_buy_up_to_order(buy(1, 1, 0, 100));
        let settlement = settle(&mut market);
        assert_eq!(
            settlement.bought[&Trader::Country(CountryId(1))],
            BuyResult::no_purchase(GoodId(0))
        );
        assert_eq!(market.good(GoodId(0)).unwrap().total_demand_yesterday(), Fixed::ZERO);
    }

    #[test]
    fn test_unknown_good_queries_are_neutral() {
        let market = grain_market(GameRules::default());
        assert!(!market.is_available(GoodId(9)));
        assert_eq!(market.price(GoodId(9)), Fixed::ZERO);
        assert_eq!(market.get_max_money_to_allocate_to_buy_quantity(GoodId(9), Fixed::ONE), Fixed::ZERO);
    }

    #[test]
    fn test_settlement_ignores_enqueue_order() {
        let mut first = grain_market(GameRules::default());
        let mut second = grain_market(GameRules::default());
        let buys = [buy(1, 1, 7, 30), buy(2, 2, 4, 9), buy(3, 1, 12, 11)];
        let sells = [sell(4, 1, 6), sell(5, 2, 5)];
        for order in buys {
            first.place_buy_up_to_order(order);
        }
        for order in buys.iter().rev() {
            second.place_buy_up_to_order(*order);
        }
        for order in sells {
            first.place_market_sell_order(order);
        }
        for order in sells.iter().rev() {
            second.place_market_sell_order(*order);
        }
        let a = settle(&mut first);
        let b = settle(&mut second);
        assert_eq!(a.bought, b.bought);
        assert_eq!(a.sold, b.sold);
    }
}
