use crate::country::{Country, CountryId};
use crate::definitions::Definitions;
use crate::market::Market;
use crate::population::{PopTypeCosts, PopulationCensus};
use crate::province::{Province, ProvinceId};
use serde::{Deserialize, Serialize};

/// A calendar date. Months are a flat 30 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Date {
    pub year: i32,
    pub month: u8, // 1-12
    pub day: u8,   // 1-30
}

impl Date {
    pub fn new(year: i32, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    pub fn add_days(&self, days: u32) -> Self {
        let mut d = self.day as u32 + days;
        let mut m = self.month as u32;
        let mut y = self.year;

        while d > 30 {
            d -= 30;
            m += 1;
            if m > 12 {
                m -= 12;
                y += 1;
            }
        }

        Self {
            year: y,
            month: m as u8,
            day: d as u8,
        }
    }

    pub fn is_month_start(&self) -> bool {
        self.day == 1
    }
}

impl Default for Date {
    fn default() -> Self {
        Self::new(1836, 1, 1)
    }
}

impl std::fmt::Display for Date {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.year, self.month, self.day)
    }
}

/// Everything the daily tick reads and writes.
#[derive(Debug)]
pub struct WorldState {
    pub date: Date,
    pub definitions: Definitions,
    pub market: Market,
    /// Indexed by [`CountryId`].
    pub countries: Vec<Country>,
    /// Indexed by [`ProvinceId`].
    pub provinces: Vec<Province>,
    /// Refreshed at the start of each day from current prices.
    pub pop_type_costs: Vec<PopTypeCosts>,
}

impl WorldState {
    pub fn country(&self, id: CountryId) -> Option<&Country> {
        self.countries.get(id.index())
    }

    pub fn country_by_tag(&self, tag: &str) -> Option<&Country> {
        self.countries.iter().find(|c| c.tag == tag)
    }

    pub fn province(&self, id: ProvinceId) -> Option<&Province> {
        self.provinces.get(id.index())
    }

    /// One census per country over the provinces it owns.
    pub fn census_by_country(&self) -> Vec<PopulationCensus> {
        let mut censuses = vec![PopulationCensus::new(self.definitions.pop_types.len()); self.countries.len()];
        for province in &self.provinces {
            let Some(census) = province.owner.and_then(|owner| censuses.get_mut(owner.index())) else {
                continue;
            };
            for pop in &province.pops {
                census.add_pop(pop, &self.definitions, province.is_colonial);
            }
        }
        censuses
    }

    /// Compute a deterministic checksum of the world state.
    ///
    /// Used to compare runs with different worker counts and to detect
    /// divergence between replays. Covers every value the tick writes.
    pub fn checksum(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        self.date.hash(&mut hasher);

        for good_market in self.market.goods() {
            good_market.price().hash(&mut hasher);
            good_market.quantity_traded_yesterday().hash(&mut hasher);
            good_market.total_demand_yesterday().hash(&mut hasher);
            good_market.total_supply_yesterday().hash(&mut hasher);
        }

        for country in &self.countries {
            let economy = &country.economy;
            country.tag.hash(&mut hasher);
            economy.cash_stockpile().hash(&mut hasher);
            economy.gold_income().hash(&mut hasher);
            economy.actual_tariff_income().hash(&mut hasher);
            economy.yesterdays_import_value().hash(&mut hasher);
            for balance in economy.balance_history().iter() {
                balance.hash(&mut hasher);
            }
            for good in &self.definitions.goods {
                if let Some(data) = economy.good_snapshot(good.id) {
                    data.stockpile_amount.hash(&mut hasher);
                    data.pop_demand.hash(&mut hasher);
                    data.factory_demand.hash(&mut hasher);
                    for (pop_type, quantity) in &data.need_consumption_per_pop_type {
                        pop_type.hash(&mut hasher);
                        quantity.hash(&mut hasher);
                    }
                    for (production_type, quantity) in &data.production_per_production_type {
                        production_type.hash(&mut hasher);
                        quantity.hash(&mut hasher);
                    }
                }
            }
        }

        for province in &self.provinces {
            province.id.hash(&mut hasher);
            province.owner.hash(&mut hasher);
            for pop in &province.pops {
                pop.size.hash(&mut hasher);
                pop.employed.hash(&mut hasher);
                pop.unemployed.hash(&mut hasher);
                pop.cash.hash(&mut hasher);
                pop.yesterdays_import_value.hash(&mut hasher);
            }
            if let Some(rgo) = &province.rgo {
                rgo.employee_count().hash(&mut hasher);
                rgo.revenue_yesterday().hash(&mut hasher);
            }
        }

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;
    use crate::testing::{WorldStateBuilder, FARMERS};

    #[test]
    fn test_date_month_rollover() {
        let d = Date::new(1836, 1, 30);
        assert_eq!(d.add_days(1), Date::new(1836, 2, 1));
        assert!(d.add_days(1).is_month_start());
    }

    #[test]
    fn test_date_year_rollover() {
        let d = Date::new(1836, 12, 30);
        assert_eq!(d.add_days(1), Date::new(1837, 1, 1));
    }

    #[test]
    fn test_date_multi_month_add() {
        // 1 + 65 days: two full months then day 6.
        let d = Date::new(1836, 1, 1);
        assert_eq!(d.add_days(65), Date::new(1836, 3, 6));
    }

    #[test]
    fn test_checksum_sensitivity() {
        let state1 = WorldStateBuilder::new().with_country("ENG").build();
        let mut state2 = WorldStateBuilder::new().with_country("ENG").build();
        assert_eq!(state1.checksum(), state2.checksum());

        state2.countries[0].economy.set_cash_stockpile(Fixed::from_int(1));
        assert_ne!(state1.checksum(), state2.checksum());
    }

    #[test]
    fn test_census_by_owner() {
        let state = WorldStateBuilder::new()
            .with_country("ENG")
            .with_country("FRA")
            .with_province(Some("ENG"), &[(FARMERS, 1000)])
            .with_province(Some("ENG"), &[(FARMERS, 500)])
            .with_province(None, &[(FARMERS, 700)])
            .build();

        let censuses = state.census_by_country();
        assert_eq!(censuses[0].population_by_type[FARMERS.index()], 1500);
        assert_eq!(censuses[1].non_colonial_population, 0);
    }
}
