use crate::allocation::{water_fill, FillCandidate};
use crate::country::EconomyReporter;
use crate::definitions::Definitions;
use crate::fixed::Fixed;
use crate::goods::GoodId;
use crate::market::MarketAccess;
use crate::production::ProductionTypeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pop producing goods by hand from its own input stockpile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtisanalProducer {
    pub production_type: ProductionTypeId,
    stockpile: BTreeMap<GoodId, Fixed>,
    /// Quantities still wanted from today's input purchases.
    reserved: BTreeMap<GoodId, Fixed>,
    current_production: Fixed,
    costs_of_production: Fixed,
}

/// Input purchase the artisan wants its pop to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPurchase {
    pub good: GoodId,
    pub max_quantity: Fixed,
    pub money_to_spend: Fixed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtisanTickResult {
    pub output: Option<(GoodId, Fixed)>,
    pub purchases: Vec<InputPurchase>,
}

impl ArtisanTickResult {
    pub fn money_reserved(&self) -> Fixed {
        self.purchases.iter().map(|p| p.money_to_spend).sum()
    }
}

impl ArtisanalProducer {
    pub fn new(production_type: ProductionTypeId) -> Self {
        Self {
            production_type,
            ..Self::default()
        }
    }

    pub fn stockpile(&self, good: GoodId) -> Fixed {
        self.stockpile.get(&good).copied().unwrap_or_default()
    }

    pub fn set_stockpile(&mut self, good: GoodId, quantity: Fixed) {
        self.stockpile.insert(good, quantity.max(Fixed::ZERO));
    }

    pub fn current_production(&self) -> Fixed {
        self.current_production
    }

    pub fn costs_of_production(&self) -> Fixed {
        self.costs_of_production
    }

    /// Produces from stocked inputs and decides which inputs to restock.
    ///
    /// Output is limited by the scarcest input. `cash` is the most the pop can
    /// hand to input purchases today.
    pub fn artisan_tick(
        &mut self,
        workers: u32,
        definitions: &Definitions,
        market: &dyn MarketAccess,
        reporter: Option<&dyn EconomyReporter>,
        cash: Fixed,
    ) -> ArtisanTickResult {
        self.reserved.clear();
        self.current_production = Fixed::ZERO;
        self.costs_of_production = Fixed::ZERO;

        let Some(production_type) = definitions.production_type(self.production_type) else {
            log::error!("Artisan has unknown production type {}", self.production_type.0);
            return ArtisanTickResult::default();
        };

        let desired: Vec<(GoodId, Fixed)> = production_type
            .inputs_for_workforce(workers)
            .filter(|&(_, quantity)| quantity > Fixed::ZERO)
            .collect();

        let mut inputs_bought_fraction = Fixed::ONE;
        for &(good, desired_quantity) in &desired {
            if let Some(reporter) = reporter {
                reporter.report_input_demand(production_type, good, desired_quantity);
            }
            let fraction = (self.stockpile(good) / desired_quantity).min(Fixed::ONE);
            inputs_bought_fraction = inputs_bought_fraction.min(fraction);
        }

        if inputs_bought_fraction > Fixed::ZERO {
            for &(good, desired_quantity) in &desired {
                let consumed = desired_quantity * inputs_bought_fraction;
                let stock = self.stockpile.entry(good).or_default();
                *stock = (*stock - consumed).max(Fixed::ZERO);
                self.costs_of_production += consumed * market.price(good);
                if let Some(reporter) = reporter {
                    reporter.report_input_consumption(production_type, good, consumed);
                }
            }

            self.current_production =
                production_type.output_for_workforce(workers) * inputs_bought_fraction;
            if self.current_production > Fixed::ZERO {
                if let Some(reporter) = reporter {
                    reporter.report_output(production_type, self.current_production);
                }
            }
        }

        let mut wanted = Vec::new();
        let mut candidates = Vec::new();
        for &(good, desired_quantity) in &desired {
            let shortfall = desired_quantity - self.stockpile(good);
            if shortfall <= Fixed::ZERO || !market.is_available(good) {
                continue;
            }
            wanted.push((good, shortfall));
            candidates.push(FillCandidate {
                max_cost: market.get_max_money_to_allocate_to_buy_quantity(good, shortfall),
                weight: market.price_inverse(good),
            });
        }

        let outcome = water_fill(cash, &candidates);
        let mut purchases = Vec::with_capacity(wanted.len());
        for (i, &(good, shortfall)) in wanted.iter().enumerate() {
            let money_to_spend = outcome.money[i];
            if money_to_spend <= Fixed::ZERO
                || (!outcome.fully_funded[i] && money_to_spend / market.min_next_price(good) < Fixed::EPSILON)
            {
                continue;
            }
            self.reserved.insert(good, shortfall);
            purchases.push(InputPurchase {
                good,
                max_quantity: shortfall,
                money_to_spend,
            });
        }

        let output = (self.current_production > Fixed::ZERO)
            .then_some((production_type.output_good, self.current_production));
        ArtisanTickResult { output, purchases }
    }

    /// Stores up to today's reserved quantity of `good`; returns what was taken.
    pub fn add_to_stockpile(&mut self, good: GoodId, quantity: Fixed) -> Fixed {
        let Some(reserved) = self.reserved.get_mut(&good) else {
            return Fixed::ZERO;
        };
        let taken = quantity.min(*reserved);
        *reserved -= taken;
        *self.stockpile.entry(good).or_default() += taken;
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::market::Market;
    use crate::testing::{grain_and_tools_definitions, GRAIN, TOOLS};

    fn artisan(definitions: &Definitions) -> ArtisanalProducer {
        let production_type = definitions.artisan_production_types().next().unwrap();
        ArtisanalProducer::new(production_type.id)
    }

    #[test]
    fn test_no_inputs_no_output_but_buys() {
        let definitions = grain_and_tools_definitions();
        let config = SimConfig::default();
        let market = Market::new(&definitions.goods, &config.rules, &config.country);
        let mut producer = artisan(&definitions);

        let result = producer.artisan_tick(10_000, &definitions, &market, None, Fixed::from_int(100));
        assert_eq!(result.output, None);
        assert_eq!(result.purchases.len(), 1);
        assert_eq!(result.purchases[0].good, GRAIN);
        assert!(result.money_reserved() <= Fixed::from_int(100));
    }

    #[test]
    fn test_full_inputs_produce_full_output() {
        let definitions = grain_and_tools_definitions();
        let config = SimConfig::default();
        let market = Market::new(&definitions.goods, &config.rules, &config.country);
        let mut producer = artisan(&definitions);
        producer.set_stockpile(GRAIN, Fixed::from_int(1000));

        let result = producer.artisan_tick(10_000, &definitions, &market, None, Fixed::ZERO);
        let production_type = definitions.production_type(producer.production_type).unwrap();
        let (good, quantity) = result.output.unwrap();
        assert_eq!(good, TOOLS);
        assert_eq!(quantity, production_type.output_for_workforce(10_000));
        assert!(producer.stockpile(GRAIN) < Fixed::from_int(1000));
        assert!(result.purchases.is_empty());
    }

    #[test]
    fn test_add_to_stockpile_respects_reservation() {
        let definitions = grain_and_tools_definitions();
        let config = SimConfig::default();
        let market = Market::new(&definitions.goods, &config.rules, &config.country);
        let mut producer = artisan(&definitions);
        let result = producer.artisan_tick(10_000, &definitions, &market, None, Fixed::from_int(100));
        let wanted = result.purchases[0].max_quantity;

        let taken = producer.add_to_stockpile(GRAIN, wanted + Fixed::from_int(5));
        assert_eq!(taken, wanted);
        assert_eq!(producer.add_to_stockpile(GRAIN, Fixed::ONE), Fixed::ZERO);
        assert_eq!(producer.add_to_stockpile(TOOLS, Fixed::ONE), Fixed::ZERO);
    }
}
