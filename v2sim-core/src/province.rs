use crate::country::{CountryEconomy, CountryId, EconomyReporter};
use crate::definitions::Definitions;
use crate::fixed::Fixed;
use crate::market::{MarketAccess, MarketSellOrder, PopRef, SaleSink, SellResult, Trader};
use crate::population::{Pop, PopTickContext};
use crate::production::ResourceGatheringOperation;
use serde::{Deserialize, Serialize};

/// Type-safe province identifier (index into `WorldState::provinces`).
#[derive(
    Hash, Eq, PartialEq, Clone, Copy, Debug, Default, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct ProvinceId(pub u32);

impl ProvinceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct Province {
    pub id: ProvinceId,
    pub identifier: String,
    pub owner: Option<CountryId>,
    /// Colonial pops don't count towards administrative efficiency.
    pub is_colonial: bool,
    pub pops: Vec<Pop>,
    pub rgo: Option<ResourceGatheringOperation>,
}

/// Shared, read-only inputs of the province tick.
#[derive(Clone, Copy)]
pub struct ProvinceTickContext<'a> {
    pub definitions: &'a Definitions,
    pub market: &'a dyn MarketAccess,
    /// Owner's economy, already resolved from `Province::owner`.
    pub country: Option<&'a CountryEconomy>,
    pub base_goods_demand: Fixed,
}

impl Province {
    /// Ticks every pop then the RGO. Runs on a worker thread.
    pub fn province_tick(&mut self, context: &ProvinceTickContext<'_>) {
        let pop_context = PopTickContext {
            definitions: context.definitions,
            market: context.market,
            country: context.country,
            country_id: self.owner,
            base_goods_demand: context.base_goods_demand,
        };
        for (index, pop) in self.pops.iter_mut().enumerate() {
            let pop_ref = PopRef {
                province: self.id,
                index: index as u32,
            };
            pop.pop_tick(pop_ref, &pop_context);
        }

        let Some(rgo) = self.rgo.as_mut() else {
            return;
        };
        let reporter = context.country.map(|c| c as &dyn EconomyReporter);
        if let Some((good, quantity)) = rgo.rgo_tick(&mut self.pops, context.definitions, reporter) {
            context.market.place_market_sell_order(MarketSellOrder {
                good,
                seller: Trader::Rgo(self.id),
                country: self.owner,
                quantity,
            });
        }
    }

    pub fn pop_mut(&mut self, index: u32) -> Option<&mut Pop> {
        self.pops.get_mut(index as usize)
    }
}

/// RGO revenue lands on the province, which owns both the RGO and its workers.
impl SaleSink for Province {
    fn after_sell(&mut self, reporting_country: Option<&CountryEconomy>, result: &SellResult, scratch: &mut Vec<Fixed>) {
        let Some(rgo) = self.rgo.as_mut() else {
            log::error!("Province {} sold RGO output but has no RGO", self.identifier);
            return;
        };
        rgo.pay_employees(&mut self.pops, result.money_gained, reporting_country, scratch);
    }
}
