use crate::country::{Country, CountryEconomy};
use crate::fixed::Fixed;
use crate::market::{BuyResult, PurchaseSink, SaleSink, SellResult, Trader, TradeSettlement};
use crate::province::Province;

/// Delivers settlement results to countries, pops and RGOs.
///
/// Holds the only mutable borrow of the world's traders during the settle
/// phase. Pops and RGOs report to their province owner's economy.
pub struct WorldSettlement<'a> {
    pub countries: &'a mut [Country],
    pub provinces: &'a mut [Province],
}

impl<'a> WorldSettlement<'a> {
    pub fn new(countries: &'a mut [Country], provinces: &'a mut [Province]) -> Self {
        Self { countries, provinces }
    }
}

fn owner_economy<'c>(countries: &'c [Country], province: &Province) -> Option<&'c CountryEconomy> {
    province
        .owner
        .and_then(|owner| countries.get(owner.index()))
        .map(|country| &country.economy)
}

impl TradeSettlement for WorldSettlement<'_> {
    fn settle_buy(&mut self, buyer: Trader, result: &BuyResult) {
        let Self { countries, provinces } = self;
        match buyer {
            Trader::Country(id) => match countries.get_mut(id.index()) {
                Some(country) => country.economy.after_buy(None, result),
                None => log::error!("Buy result for unknown country {}", id.0),
            },
            Trader::Pop(pop_ref) => {
                let Some(province) = provinces.get_mut(pop_ref.province.index()) else {
                    log::error!("Buy result for pop in unknown province {}", pop_ref.province.0);
                    return;
                };
                let country = owner_economy(countries, province);
                match province.pop_mut(pop_ref.index) {
                    Some(pop) => pop.after_buy(country, result),
                    None => log::error!("Buy result for unknown pop {:?}", pop_ref),
                }
            }
            Trader::Rgo(province) => {
                log::error!("RGO in province {} cannot buy good {}", province.0, result.good.0);
            }
        }
    }

    fn settle_sell(&mut self, seller: Trader, result: &SellResult, scratch: &mut Vec<Fixed>) {
        let Self { countries, provinces } = self;
        match seller {
            Trader::Country(id) => match countries.get_mut(id.index()) {
                Some(country) => country.economy.after_sell(None, result, scratch),
                None => log::error!("Sell result for unknown country {}", id.0),
            },
            Trader::Pop(pop_ref) => {
                let Some(province) = provinces.get_mut(pop_ref.province.index()) else {
                    log::error!("Sell result for pop in unknown province {}", pop_ref.province.0);
                    return;
                };
                let country = owner_economy(countries, province);
                match province.pop_mut(pop_ref.index) {
                    Some(pop) => pop.after_sell(country, result, scratch),
                    None => log::error!("Sell result for unknown pop {:?}", pop_ref),
                }
            }
            Trader::Rgo(id) => {
                let Some(province) = provinces.get_mut(id.index()) else {
                    log::error!("Sell result for RGO in unknown province {}", id.0);
                    return;
                };
                let country = owner_economy(countries, province);
                province.after_sell(country, result, scratch);
            }
        }
    }
}
