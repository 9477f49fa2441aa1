//! JSON scenario format.
//!
//! Scenario files name everything by identifier; [`Scenario::build_world`]
//! assigns ids in file order and resolves every reference, failing on the
//! first unknown or duplicate identifier.

use crate::config::SimConfig;
use crate::country::{Country, CountryEconomy, CountryId};
use crate::definitions::Definitions;
use crate::error::SimError;
use crate::fixed::Fixed;
use crate::goods::{GoodDefinition, GoodId};
use crate::market::Market;
use crate::modifiers::CountryModifiers;
use crate::population::{
    IncomeTypes, Pop, PopNeeds, PopTypeCosts, PopTypeDefinition, PopTypeId, StrataDefinition, StrataId,
};
use crate::production::{ProductionTypeDefinition, ProductionTypeId, ResourceGatheringOperation, TemplateType};
use crate::province::{Province, ProvinceId};
use crate::state::{Date, WorldState};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub config: SimConfig,
    #[serde(default)]
    pub start_date: Date,
    pub goods: Vec<GoodEntry>,
    pub strata: Vec<String>,
    pub pop_types: Vec<PopTypeEntry>,
    #[serde(default)]
    pub production_types: Vec<ProductionTypeEntry>,
    pub countries: Vec<CountryEntry>,
    pub provinces: Vec<ProvinceEntry>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoodEntry {
    pub identifier: String,
    #[serde(with = "crate::fixed::decimal")]
    pub base_price: Fixed,
    #[serde(default)]
    pub is_money: bool,
    #[serde(default = "default_true")]
    pub is_available_from_start: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoodQuantityEntry {
    pub good: String,
    #[serde(with = "crate::fixed::decimal")]
    pub quantity: Fixed,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NeedsEntry {
    pub goods: Vec<GoodQuantityEntry>,
    pub income_types: IncomeTypes,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopTypeEntry {
    pub identifier: String,
    pub strata: String,
    #[serde(default)]
    pub is_slave: bool,
    #[serde(default)]
    pub is_administrator: bool,
    #[serde(default)]
    pub life_needs: NeedsEntry,
    #[serde(default)]
    pub everyday_needs: NeedsEntry,
    #[serde(default)]
    pub luxury_needs: NeedsEntry,
    #[serde(default)]
    pub artisan_production: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductionTypeEntry {
    pub identifier: String,
    pub template: TemplateType,
    pub output_good: String,
    #[serde(with = "crate::fixed::decimal")]
    pub base_output_quantity: Fixed,
    pub base_workforce_size: u32,
    #[serde(default)]
    pub input_goods: Vec<GoodQuantityEntry>,
    #[serde(default)]
    pub jobs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliderKind {
    Administration,
    Education,
    Military,
    Social,
    Army,
    Navy,
    Construction,
    Tariff,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StockpileEntry {
    pub good: String,
    #[serde(default, with = "crate::fixed::decimal")]
    pub amount: Fixed,
    #[serde(default, with = "crate::fixed::decimal")]
    pub cutoff: Fixed,
    #[serde(default = "default_true")]
    pub is_automated: bool,
    #[serde(default)]
    pub is_selling: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountryEntry {
    pub tag: String,
    #[serde(default, with = "crate::fixed::decimal")]
    pub cash: Fixed,
    #[serde(default)]
    pub modifiers: CountryModifiers,
    /// Slider values applied after the first budget update; out of range values clamp.
    #[serde(default)]
    pub sliders: BTreeMap<SliderKind, f64>,
    /// Tax rate per strata identifier.
    #[serde(default)]
    pub tax_rates: BTreeMap<String, f64>,
    #[serde(default)]
    pub stockpile: Vec<StockpileEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopEntry {
    pub pop_type: String,
    pub size: u32,
    #[serde(default, with = "crate::fixed::decimal")]
    pub cash: Fixed,
    #[serde(default)]
    pub unemployed: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RgoEntry {
    pub production_type: String,
    pub max_employees: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvinceEntry {
    pub identifier: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub is_colonial: bool,
    #[serde(default)]
    pub pops: Vec<PopEntry>,
    #[serde(default)]
    pub rgo: Option<RgoEntry>,
}

fn goods_with_quantities(
    definitions_goods: &BTreeMap<&str, GoodId>,
    entries: &[GoodQuantityEntry],
) -> Result<Vec<(GoodId, Fixed)>, SimError> {
    entries
        .iter()
        .map(|entry| {
            definitions_goods
                .get(entry.good.as_str())
                .map(|&good| (good, entry.quantity))
                .ok_or_else(|| SimError::UnknownIdentifier {
                    kind: "good",
                    identifier: entry.good.clone(),
                })
        })
        .collect()
}

fn resolve<Id: Copy>(kind: &'static str, map: &BTreeMap<&str, Id>, identifier: &str) -> Result<Id, SimError> {
    map.get(identifier)
        .copied()
        .ok_or_else(|| SimError::UnknownIdentifier {
            kind,
            identifier: identifier.to_string(),
        })
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn definitions(&self) -> Result<Definitions, SimError> {
        let good_ids: BTreeMap<&str, GoodId> = self
            .goods
            .iter()
            .enumerate()
            .map(|(i, g)| (g.identifier.as_str(), GoodId(i as u16)))
            .collect();
        let strata_ids: BTreeMap<&str, StrataId> = self
            .strata
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), StrataId(i as u8)))
            .collect();
        let pop_type_ids: BTreeMap<&str, PopTypeId> = self
            .pop_types
            .iter()
            .enumerate()
            .map(|(i, p)| (p.identifier.as_str(), PopTypeId(i as u16)))
            .collect();
        let production_type_ids: BTreeMap<&str, ProductionTypeId> = self
            .production_types
            .iter()
            .enumerate()
            .map(|(i, p)| (p.identifier.as_str(), ProductionTypeId(i as u16)))
            .collect();

        let goods = self
            .goods
            .iter()
            .enumerate()
            .map(|(i, entry)| GoodDefinition {
                id: GoodId(i as u16),
                identifier: entry.identifier.clone(),
                base_price: entry.base_price,
                is_money: entry.is_money,
                is_available_from_start: entry.is_available_from_start,
            })
            .collect();

        let strata = self
            .strata
            .iter()
            .enumerate()
            .map(|(i, identifier)| StrataDefinition {
                id: StrataId(i as u8),
                identifier: identifier.clone(),
            })
            .collect();

        let needs = |entry: &NeedsEntry| -> Result<PopNeeds, SimError> {
            Ok(PopNeeds {
                goods: goods_with_quantities(&good_ids, &entry.goods)?,
                income_types: entry.income_types,
            })
        };
        let pop_types = self
            .pop_types
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                Ok(PopTypeDefinition {
                    id: PopTypeId(i as u16),
                    identifier: entry.identifier.clone(),
                    strata: resolve("strata", &strata_ids, &entry.strata)?,
                    is_slave: entry.is_slave,
                    is_administrator: entry.is_administrator,
                    life_needs: needs(&entry.life_needs)?,
                    everyday_needs: needs(&entry.everyday_needs)?,
                    luxury_needs: needs(&entry.luxury_needs)?,
                    artisan_production: entry
                        .artisan_production
                        .as_deref()
                        .map(|p| resolve("production type", &production_type_ids, p))
                        .transpose()?,
                })
            })
            .collect::<Result<Vec<_>, SimError>>()?;

        let production_types = self
            .production_types
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                Ok(ProductionTypeDefinition {
                    id: ProductionTypeId(i as u16),
                    identifier: entry.identifier.clone(),
                    template: entry.template,
                    output_good: resolve("good", &good_ids, &entry.output_good)?,
                    base_output_quantity: entry.base_output_quantity,
                    base_workforce_size: entry.base_workforce_size,
                    input_goods: goods_with_quantities(&good_ids, &entry.input_goods)?,
                    jobs: entry
                        .jobs
                        .iter()
                        .map(|job| resolve("pop type", &pop_type_ids, job))
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<Vec<_>, SimError>>()?;

        Definitions::new(goods, strata, pop_types, production_types)
    }

    /// Builds the starting world and returns it with the scenario's config.
    pub fn build_world(&self) -> Result<(WorldState, SimConfig), SimError> {
        let definitions = self.definitions()?;
        let config = self.config.clone();

        let mut countries = Vec::with_capacity(self.countries.len());
        for (index, entry) in self.countries.iter().enumerate() {
            if countries.iter().any(|c: &Country| c.tag == entry.tag) {
                return Err(SimError::DuplicateIdentifier {
                    kind: "country",
                    identifier: entry.tag.clone(),
                });
            }
            let mut economy = CountryEconomy::new(&definitions, &config);
            economy.set_cash_stockpile(entry.cash);
            for stockpile in &entry.stockpile {
                let good = definitions.good_by_identifier(&stockpile.good)?;
                economy.set_stockpile_amount(good, stockpile.amount);
                economy.set_stockpile_cutoff(good, stockpile.cutoff);
                economy.set_stockpile_automated(good, stockpile.is_automated);
                economy.set_stockpile_selling(good, stockpile.is_selling);
            }
            countries.push(Country {
                id: CountryId(index as u16),
                tag: entry.tag.clone(),
                modifiers: entry.modifiers.clone(),
                economy,
            });
        }

        let mut provinces = Vec::with_capacity(self.provinces.len());
        for (index, entry) in self.provinces.iter().enumerate() {
            let owner = match entry.owner.as_deref() {
                Some(tag) => Some(
                    countries
                        .iter()
                        .find(|c| c.tag == tag)
                        .map(|c| c.id)
                        .ok_or_else(|| SimError::UnknownIdentifier {
                            kind: "country",
                            identifier: tag.to_string(),
                        })?,
                ),
                None => None,
            };

            let mut pops = Vec::with_capacity(entry.pops.len());
            for pop_entry in &entry.pops {
                let pop_type_id = definitions.pop_type_by_identifier(&pop_entry.pop_type)?;
                let Some(pop_type) = definitions.pop_type(pop_type_id) else {
                    continue;
                };
                if pop_entry.unemployed > pop_entry.size {
                    return Err(SimError::InvalidScenario(format!(
                        "province '{}' has {} unemployed {} out of {}",
                        entry.identifier, pop_entry.unemployed, pop_entry.pop_type, pop_entry.size
                    )));
                }
                let mut pop = Pop::new(pop_type, pop_entry.size, pop_entry.cash);
                pop.unemployed = pop_entry.unemployed;
                pops.push(pop);
            }

            let rgo = match &entry.rgo {
                Some(rgo) => {
                    let production_type = definitions.production_type_by_identifier(&rgo.production_type)?;
                    if definitions
                        .production_type(production_type)
                        .is_some_and(|p| p.template != TemplateType::Rgo)
                    {
                        return Err(SimError::InvalidScenario(format!(
                            "province '{}' uses '{}' as an RGO",
                            entry.identifier, rgo.production_type
                        )));
                    }
                    Some(ResourceGatheringOperation::new(production_type, rgo.max_employees))
                }
                None => None,
            };

            provinces.push(Province {
                id: ProvinceId(index as u32),
                identifier: entry.identifier.clone(),
                owner,
                is_colonial: entry.is_colonial,
                pops,
                rgo,
            });
        }

        let market = Market::new(&definitions.goods, &config.rules, &config.country);
        let pop_type_costs = PopTypeCosts::compute_all(&definitions, &market, &config);
        let mut state = WorldState {
            date: self.start_date,
            definitions,
            market,
            countries,
            provinces,
            pop_type_costs,
        };

        // Slider bounds come from modifiers, so apply slider values after one update.
        let censuses = state.census_by_country();
        for ((country, census), entry) in state.countries.iter_mut().zip(&censuses).zip(&self.countries) {
            country.economy.update_country_budget(
                &country.modifiers,
                census,
                &state.definitions,
                &state.pop_type_costs,
                &config,
            );
            apply_sliders(&mut country.economy, entry, &state.definitions)?;
        }

        log::info!(
            "Scenario loaded: {} goods, {} pop types, {} countries, {} provinces",
            state.definitions.goods.len(),
            state.definitions.pop_types.len(),
            state.countries.len(),
            state.provinces.len()
        );
        Ok((state, config))
    }
}

fn apply_sliders(economy: &mut CountryEconomy, entry: &CountryEntry, definitions: &Definitions) -> Result<(), SimError> {
    for (&kind, &value) in &entry.sliders {
        let value = Fixed::from_f64(value);
        match kind {
            SliderKind::Administration => economy.set_administration_spending_slider_value(value),
            SliderKind::Education => economy.set_education_spending_slider_value(value),
            SliderKind::Military => economy.set_military_spending_slider_value(value),
            SliderKind::Social => economy.set_social_spending_slider_value(value),
            SliderKind::Army => economy.set_army_spending_slider_value(value),
            SliderKind::Navy => economy.set_navy_spending_slider_value(value),
            SliderKind::Construction => economy.set_construction_spending_slider_value(value),
            SliderKind::Tariff => economy.set_tariff_rate_slider_value(value),
        }
    }
    for (strata, &value) in &entry.tax_rates {
        let Some(definition) = definitions.strata.iter().find(|s| &s.identifier == strata) else {
            return Err(SimError::UnknownIdentifier {
                kind: "strata",
                identifier: strata.clone(),
            });
        };
        economy.set_strata_tax_rate_slider_value(definition.id, Fixed::from_f64(value));
    }
    Ok(())
}
