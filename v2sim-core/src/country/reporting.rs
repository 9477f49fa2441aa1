//! Thread-safe reporting of economic activity into a country's accounts.
//!
//! Pops and producers call these from rayon workers during the parallel
//! province phase. Every call is a commutative accumulation behind the target
//! good's own lock (or an atomic), so totals are identical whatever order the
//! calls arrive in.

use crate::config::ArtisanalInputDemandCategory;
use crate::country::CountryEconomy;
use crate::fixed::Fixed;
use crate::goods::GoodId;
use crate::population::PopTypeId;
use crate::production::{ProductionTypeDefinition, TemplateType};

pub trait EconomyReporter: Sync {
    /// Records taxable income and credits the tax to the treasury.
    fn report_pop_income_tax(&self, pop_type: PopTypeId, gross_income: Fixed, paid_as_tax: Fixed);
    fn report_pop_need_consumption(&self, pop_type: PopTypeId, good: GoodId, quantity: Fixed);
    fn report_pop_need_demand(&self, pop_type: PopTypeId, good: GoodId, quantity: Fixed);
    fn report_input_consumption(
        &self,
        production_type: &ProductionTypeDefinition,
        good: GoodId,
        quantity: Fixed,
    );
    fn report_input_demand(
        &self,
        production_type: &ProductionTypeDefinition,
        good: GoodId,
        quantity: Fixed,
    );
    fn report_output(&self, production_type: &ProductionTypeDefinition, quantity: Fixed);
}

impl EconomyReporter for CountryEconomy {
    fn report_pop_income_tax(&self, pop_type: PopTypeId, gross_income: Fixed, paid_as_tax: Fixed) {
        {
            let mut taxable_income = self.lock_taxable_income();
            match taxable_income.get_mut(pop_type.index()) {
                Some(income) => *income += gross_income,
                None => log::error!("Income reported for unknown pop type {}", pop_type.0),
            }
        }
        self.credit_cash(paid_as_tax);
    }

    fn report_pop_need_consumption(&self, pop_type: PopTypeId, good: GoodId, quantity: Fixed) {
        if let Some(account) = self.reported_good(good) {
            *account
                .lock()
                .need_consumption_per_pop_type
                .entry(pop_type)
                .or_default() += quantity;
        }
    }

    fn report_pop_need_demand(&self, _pop_type: PopTypeId, good: GoodId, quantity: Fixed) {
        if let Some(account) = self.reported_good(good) {
            account.lock().pop_demand += quantity;
        }
    }

    fn report_input_consumption(
        &self,
        production_type: &ProductionTypeDefinition,
        good: GoodId,
        quantity: Fixed,
    ) {
        if let Some(account) = self.reported_good(good) {
            *account
                .lock()
                .input_consumption_per_production_type
                .entry(production_type.id)
                .or_default() += quantity;
        }
    }

    fn report_input_demand(
        &self,
        production_type: &ProductionTypeDefinition,
        good: GoodId,
        quantity: Fixed,
    ) {
        let Some(account) = self.reported_good(good) else {
            return;
        };

        if production_type.template == TemplateType::Artisan {
            match self.artisanal_input_demand_category() {
                ArtisanalInputDemandCategory::FactoryNeeds => {}
                ArtisanalInputDemandCategory::PopNeeds => {
                    account.lock().pop_demand += quantity;
                    return;
                }
                ArtisanalInputDemandCategory::None => return,
            }
        }
        account.lock().factory_demand += quantity;
    }

    fn report_output(&self, production_type: &ProductionTypeDefinition, quantity: Fixed) {
        if let Some(account) = self.reported_good(production_type.output_good) {
            *account
                .lock()
                .production_per_production_type
                .entry(production_type.id)
                .or_default() += quantity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameRules, SimConfig};
    use crate::testing::{grain_and_tools_definitions, GRAIN, TOOLS};
    use rayon::prelude::*;

    fn economy(rule: ArtisanalInputDemandCategory) -> CountryEconomy {
        let config = SimConfig {
            rules: GameRules {
                artisanal_input_demand_category: rule,
                ..GameRules::default()
            },
            ..SimConfig::default()
        };
        CountryEconomy::new(&grain_and_tools_definitions(), &config)
    }

    #[test]
    fn test_income_tax_credits_cash() {
        let country = economy(ArtisanalInputDemandCategory::FactoryNeeds);
        country.report_pop_income_tax(PopTypeId(0), Fixed::from_int(10), Fixed::from_int(2));
        assert_eq!(country.cash_stockpile(), Fixed::from_int(2));
        assert_eq!(country.taxable_income_by_pop_type(PopTypeId(0)), Fixed::from_int(10));
    }

    #[test]
    fn test_taxable_income_grouped_by_strata() {
        use crate::testing::{ARTISANS, BUREAUCRATS, FARMERS, MIDDLE, POOR};

        let country = economy(ArtisanalInputDemandCategory::FactoryNeeds);
        country.report_pop_income_tax(FARMERS, Fixed::from_int(10), Fixed::ONE);
        country.report_pop_income_tax(ARTISANS, Fixed::from_int(4), Fixed::ZERO);
        country.report_pop_income_tax(BUREAUCRATS, Fixed::from_int(7), Fixed::ONE);

        assert_eq!(country.taxable_income_by_strata(POOR), Fixed::from_int(14));
        assert_eq!(country.taxable_income_by_strata(MIDDLE), Fixed::from_int(7));
        assert_eq!(country.cash_stockpile(), Fixed::from_int(2));
    }

    #[test]
    fn test_artisan_input_demand_routing() {
        let definitions = grain_and_tools_definitions();
        let artisan = definitions.artisan_production_types().next().unwrap().clone();
        let quantity = Fixed::from_int(3);

        let country = economy(ArtisanalInputDemandCategory::FactoryNeeds);
        country.report_input_demand(&artisan, GRAIN, quantity);
        assert_eq!(country.good_snapshot(GRAIN).unwrap().factory_demand, quantity);

        let country = economy(ArtisanalInputDemandCategory::PopNeeds);
        country.report_input_demand(&artisan, GRAIN, quantity);
        let snapshot = country.good_snapshot(GRAIN).unwrap();
        assert_eq!(snapshot.pop_demand, quantity);
        assert_eq!(snapshot.factory_demand, Fixed::ZERO);

        let country = economy(ArtisanalInputDemandCategory::None);
        country.report_input_demand(&artisan, GRAIN, quantity);
        let snapshot = country.good_snapshot(GRAIN).unwrap();
        assert_eq!(snapshot.pop_demand, Fixed::ZERO);
        assert_eq!(snapshot.factory_demand, Fixed::ZERO);
    }

    #[test]
    fn test_output_keyed_by_production_type() {
        let definitions = grain_and_tools_definitions();
        let artisan = definitions.artisan_production_types().next().unwrap().clone();
        let country = economy(ArtisanalInputDemandCategory::FactoryNeeds);
        country.report_output(&artisan, Fixed::ONE);
        country.report_output(&artisan, Fixed::ONE);
        let snapshot = country.good_snapshot(TOOLS).unwrap();
        assert_eq!(snapshot.production_per_production_type[&artisan.id], Fixed::from_int(2));
    }

    #[test]
    fn test_concurrent_reports_match_serial_total() {
        let country = economy(ArtisanalInputDemandCategory::FactoryNeeds);
        let amounts: Vec<Fixed> = (1..=1000).map(|i| Fixed::from_raw(i * 37)).collect();
        amounts.par_iter().for_each(|&quantity| {
            country.report_pop_need_consumption(PopTypeId(0), GRAIN, quantity);
            country.report_pop_income_tax(PopTypeId(0), quantity, quantity);
        });

        let expected: Fixed = amounts.iter().copied().sum();
        let snapshot = country.good_snapshot(GRAIN).unwrap();
        assert_eq!(snapshot.need_consumption_per_pop_type[&PopTypeId(0)], expected);
        assert_eq!(country.cash_stockpile(), expected);
    }

    #[test]
    fn test_unknown_good_is_ignored() {
        let country = economy(ArtisanalInputDemandCategory::FactoryNeeds);
        country.report_pop_need_demand(PopTypeId(0), GoodId(99), Fixed::ONE);
        assert!(country.good_snapshot(GoodId(99)).is_none());
    }
}
