//! Fixtures for unit tests and downstream crates.
//!
//! A small, fully connected economy: farmers work grain fields, artisans turn
//! grain into tools, bureaucrats administer and slaves work without wages.
//! Gold is the only money good.

use crate::config::SimConfig;
use crate::country::{Country, CountryEconomy, CountryId};
use crate::definitions::Definitions;
use crate::fixed::Fixed;
use crate::goods::{GoodDefinition, GoodId};
use crate::market::Market;
use crate::modifiers::CountryModifiers;
use crate::population::{
    IncomeTypes, Pop, PopNeeds, PopTypeCosts, PopTypeDefinition, PopTypeId, StrataDefinition, StrataId,
};
use crate::production::{
    ProductionTypeDefinition, ProductionTypeId, ResourceGatheringOperation, TemplateType,
};
use crate::province::{Province, ProvinceId};
use crate::state::{Date, WorldState};

pub const GRAIN: GoodId = GoodId(0);
pub const TOOLS: GoodId = GoodId(1);
pub const GOLD: GoodId = GoodId(2);

pub const POOR: StrataId = StrataId(0);
pub const MIDDLE: StrataId = StrataId(1);

pub const FARMERS: PopTypeId = PopTypeId(0);
pub const ARTISANS: PopTypeId = PopTypeId(1);
pub const SLAVES: PopTypeId = PopTypeId(2);
pub const BUREAUCRATS: PopTypeId = PopTypeId(3);

pub const GRAIN_FARM: ProductionTypeId = ProductionTypeId(0);
pub const TOOLMAKING: ProductionTypeId = ProductionTypeId(1);
pub const GOLD_MINE: ProductionTypeId = ProductionTypeId(2);

const ALL_INCOMES: IncomeTypes = IncomeTypes {
    administration: true,
    education: true,
    military: true,
};

fn needs(goods: &[(GoodId, i64)], income_types: IncomeTypes) -> PopNeeds {
    PopNeeds {
        goods: goods.iter().map(|&(g, q)| (g, Fixed::from_int(q))).collect(),
        income_types,
    }
}

fn pop_type(id: PopTypeId, identifier: &str, strata: StrataId) -> PopTypeDefinition {
    PopTypeDefinition {
        id,
        identifier: identifier.to_string(),
        strata,
        is_slave: false,
        is_administrator: false,
        life_needs: needs(&[(GRAIN, 20)], IncomeTypes::default()),
        everyday_needs: needs(&[(TOOLS, 4)], ALL_INCOMES),
        luxury_needs: PopNeeds::default(),
        artisan_production: None,
    }
}

pub fn grain_and_tools_definitions() -> Definitions {
    let mut gold = GoodDefinition::new(GOLD, "gold", Fixed::from_int(8));
    gold.is_money = true;
    let goods = vec![
        GoodDefinition::new(GRAIN, "grain", Fixed::from_int(2)),
        GoodDefinition::new(TOOLS, "tools", Fixed::from_int(5)),
        gold,
    ];

    let strata = vec![
        StrataDefinition {
            id: POOR,
            identifier: "poor".into(),
        },
        StrataDefinition {
            id: MIDDLE,
            identifier: "middle".into(),
        },
    ];

    let pop_types = vec![
        pop_type(FARMERS, "farmers", POOR),
        PopTypeDefinition {
            artisan_production: Some(TOOLMAKING),
            ..pop_type(ARTISANS, "artisans", POOR)
        },
        PopTypeDefinition {
            is_slave: true,
            ..pop_type(SLAVES, "slaves", POOR)
        },
        PopTypeDefinition {
            is_administrator: true,
            ..pop_type(BUREAUCRATS, "bureaucrats", MIDDLE)
        },
    ];

    let production_types = vec![
        ProductionTypeDefinition {
            id: GRAIN_FARM,
            identifier: "grain_farm".into(),
            template: TemplateType::Rgo,
            output_good: GRAIN,
            base_output_quantity: Fixed::from_int(10),
            base_workforce_size: 40_000,
            input_goods: vec![],
            jobs: vec![FARMERS, SLAVES],
        },
        ProductionTypeDefinition {
            id: TOOLMAKING,
            identifier: "toolmaking".into(),
            template: TemplateType::Artisan,
            output_good: TOOLS,
            base_output_quantity: Fixed::ONE,
            base_workforce_size: 10_000,
            input_goods: vec![(GRAIN, Fixed::from_int(2))],
            jobs: vec![ARTISANS],
        },
        ProductionTypeDefinition {
            id: GOLD_MINE,
            identifier: "gold_mine".into(),
            template: TemplateType::Rgo,
            output_good: GOLD,
            base_output_quantity: Fixed::from_int(2),
            base_workforce_size: 40_000,
            input_goods: vec![],
            jobs: vec![FARMERS],
        },
    ];

    match Definitions::new(goods, strata, pop_types, production_types) {
        Ok(definitions) => definitions,
        Err(e) => panic!("test definitions are inconsistent: {}", e),
    }
}

/// A pop of `pop_type` with no cash.
pub fn test_pop(definitions: &Definitions, pop_type: PopTypeId, size: u32) -> Pop {
    match definitions.pop_type(pop_type) {
        Some(definition) => Pop::new(definition, size, Fixed::ZERO),
        None => panic!("unknown test pop type {}", pop_type.0),
    }
}

/// Builds a [`WorldState`] over [`grain_and_tools_definitions`].
pub struct WorldStateBuilder {
    date: Date,
    config: SimConfig,
    definitions: Definitions,
    countries: Vec<(String, Fixed, CountryModifiers)>,
    provinces: Vec<ProvinceEntry>,
    pop_cash: Fixed,
}

struct ProvinceEntry {
    owner: Option<String>,
    rgo: ProductionTypeId,
    pops: Vec<(PopTypeId, u32)>,
}

impl WorldStateBuilder {
    pub fn new() -> Self {
        Self {
            date: Date::default(),
            config: SimConfig::default(),
            definitions: grain_and_tools_definitions(),
            countries: Vec::new(),
            provinces: Vec::new(),
            pop_cash: Fixed::from_int(20),
        }
    }

    pub fn date(mut self, year: i32, month: u8, day: u8) -> Self {
        self.date = Date::new(year, month, day);
        self
    }

    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a country with a generous treasury.
    pub fn with_country(self, tag: &str) -> Self {
        self.with_country_cash(tag, Fixed::from_int(1000))
    }

    pub fn with_country_cash(mut self, tag: &str, cash: Fixed) -> Self {
        self.countries
            .push((tag.to_string(), cash, CountryModifiers::default()));
        self
    }

    pub fn with_modifiers(mut self, tag: &str, modifiers: CountryModifiers) -> Self {
        match self.countries.iter_mut().find(|(t, _, _)| t == tag) {
            Some(country) => country.2 = modifiers,
            None => panic!("with_modifiers before with_country({})", tag),
        }
        self
    }

    pub fn pop_cash(mut self, cash: Fixed) -> Self {
        self.pop_cash = cash;
        self
    }

    /// Adds a grain farm province employing up to everyone living there.
    pub fn with_province(self, owner: Option<&str>, pops: &[(PopTypeId, u32)]) -> Self {
        self.with_rgo_province(owner, GRAIN_FARM, pops)
    }

    pub fn with_rgo_province(mut self, owner: Option<&str>, rgo: ProductionTypeId, pops: &[(PopTypeId, u32)]) -> Self {
        self.provinces.push(ProvinceEntry {
            owner: owner.map(str::to_string),
            rgo,
            pops: pops.to_vec(),
        });
        self
    }

    pub fn build(self) -> WorldState {
        let Self {
            date,
            config,
            definitions,
            countries,
            provinces,
            pop_cash,
        } = self;

        let countries: Vec<Country> = countries
            .into_iter()
            .enumerate()
            .map(|(index, (tag, cash, modifiers))| {
                let mut economy = CountryEconomy::new(&definitions, &config);
                economy.set_cash_stockpile(cash);
                Country {
                    id: CountryId(index as u16),
                    tag,
                    modifiers,
                    economy,
                }
            })
            .collect();

        let provinces = provinces
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let owner = entry
                    .owner
                    .as_deref()
                    .and_then(|tag| countries.iter().find(|c| c.tag == tag))
                    .map(|c| c.id);
                let total: u32 = entry.pops.iter().map(|&(_, size)| size).sum();
                let pops = entry
                    .pops
                    .iter()
                    .map(|&(pop_type, size)| {
                        let mut pop = test_pop(&definitions, pop_type, size);
                        pop.cash = pop_cash;
                        pop
                    })
                    .collect();
                Province {
                    id: ProvinceId(index as u32),
                    identifier: format!("province_{}", index),
                    owner,
                    is_colonial: false,
                    pops,
                    rgo: Some(ResourceGatheringOperation::new(entry.rgo, total)),
                }
            })
            .collect();

        let market = Market::new(&definitions.goods, &config.rules, &config.country);
        let pop_type_costs = PopTypeCosts::compute_all(&definitions, &market, &config);
        WorldState {
            date,
            definitions,
            market,
            countries,
            provinces,
            pop_type_costs,
        }
    }
}

impl Default for WorldStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_resolves_owners() {
        let state = WorldStateBuilder::default()
            .with_country("ENG")
            .with_province(Some("ENG"), &[(FARMERS, 1000)])
            .with_province(None, &[(FARMERS, 1000)])
            .build();

        assert_eq!(state.provinces[0].owner, Some(CountryId(0)));
        assert!(state.provinces[1].owner.is_none());
        assert_eq!(state.countries[0].economy.cash_stockpile(), Fixed::from_int(1000));
        assert_eq!(state.pop_type_costs.len(), state.definitions.pop_types.len());
    }
}
