//! Pop types, pops and the daily pop tick.
//!
//! A pop collects its government payouts, runs its artisan (if any), and
//! then spends what is left on life, everyday and luxury needs in that order.
//! All purchases go through the market as buy orders; results come back in
//! the settle phase through [`PurchaseSink`] and [`SaleSink`].

use crate::allocation::{water_fill, FillCandidate};
use crate::config::SimConfig;
use crate::country::{CountryEconomy, CountryId, EconomyReporter};
use crate::defines;
use crate::definitions::Definitions;
use crate::fixed::Fixed;
use crate::goods::GoodId;
use crate::market::{
    BuyResult, BuyUpToOrder, MarketAccess, MarketSellOrder, PopRef, PurchaseSink, SaleSink,
    SellResult, Trader,
};
use crate::production::{ArtisanalProducer, ProductionTypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(
    Hash, Eq, PartialEq, Clone, Copy, Debug, Default, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct StrataId(pub u8);

impl StrataId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrataDefinition {
    pub id: StrataId,
    pub identifier: String,
}

#[derive(
    Hash, Eq, PartialEq, Clone, Copy, Debug, Default, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct PopTypeId(pub u16);

impl PopTypeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedCategory {
    Life,
    Everyday,
    Luxury,
}

impl NeedCategory {
    /// Order in which needs are funded.
    pub const ALL: [NeedCategory; 3] = [Self::Life, Self::Everyday, Self::Luxury];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Government incomes priced from a need category's cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeTypes {
    pub administration: bool,
    pub education: bool,
    pub military: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PopNeeds {
    /// Quantity per `SIZE_DENOMINATOR` people per day.
    pub goods: Vec<(GoodId, Fixed)>,
    pub income_types: IncomeTypes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopTypeDefinition {
    pub id: PopTypeId,
    pub identifier: String,
    pub strata: StrataId,
    #[serde(default)]
    pub is_slave: bool,
    /// Counts towards the country's administrative efficiency.
    #[serde(default)]
    pub is_administrator: bool,
    #[serde(default)]
    pub life_needs: PopNeeds,
    #[serde(default)]
    pub everyday_needs: PopNeeds,
    #[serde(default)]
    pub luxury_needs: PopNeeds,
    /// Artisan production type run by pops of this type.
    #[serde(default)]
    pub artisan_production: Option<ProductionTypeId>,
}

impl PopTypeDefinition {
    pub fn needs(&self, category: NeedCategory) -> &PopNeeds {
        match category {
            NeedCategory::Life => &self.life_needs,
            NeedCategory::Everyday => &self.everyday_needs,
            NeedCategory::Luxury => &self.luxury_needs,
        }
    }
}

/// Need costs and salary bases of one pop type at today's prices.
///
/// Each salary base is the summed cost of the need categories flagged with
/// that income type. Shared by every country.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopTypeCosts {
    pub need_costs: [Fixed; 3],
    pub administration_salary_base: Fixed,
    pub education_salary_base: Fixed,
    pub military_salary_base: Fixed,
    pub social_income_variant_base: Fixed,
}

impl PopTypeCosts {
    pub fn compute(pop_type: &PopTypeDefinition, market: &dyn MarketAccess, config: &SimConfig) -> Self {
        let mut costs = Self::default();
        for category in NeedCategory::ALL {
            let needs = pop_type.needs(category);
            let cost: Fixed = needs
                .goods
                .iter()
                .map(|&(good, quantity)| market.price(good) * quantity)
                .sum::<Fixed>()
                * config.pops.base_goods_demand;
            costs.need_costs[category.index()] = cost;

            if needs.income_types.administration {
                costs.administration_salary_base += cost;
            }
            if needs.income_types.education {
                costs.education_salary_base += cost;
            }
            if needs.income_types.military {
                costs.military_salary_base += cost;
            }
        }
        costs.social_income_variant_base = costs.need_costs[NeedCategory::Life.index()].mul_int(2);
        costs
    }

    /// Costs for every pop type, indexed by [`PopTypeId`].
    pub fn compute_all(definitions: &Definitions, market: &dyn MarketAccess, config: &SimConfig) -> Vec<Self> {
        definitions
            .pop_types
            .iter()
            .map(|pop_type| Self::compute(pop_type, market, config))
            .collect()
    }
}

/// Head counts a country's budget projections are based on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationCensus {
    pub population_by_type: Vec<u32>,
    pub unemployed_by_type: Vec<u32>,
    pub administrators: u32,
    pub non_colonial_population: u32,
}

impl PopulationCensus {
    pub fn new(pop_types: usize) -> Self {
        Self {
            population_by_type: vec![0; pop_types],
            unemployed_by_type: vec![0; pop_types],
            administrators: 0,
            non_colonial_population: 0,
        }
    }

    pub fn add_pop(&mut self, pop: &Pop, definitions: &Definitions, is_colonial: bool) {
        let index = pop.pop_type.index();
        match (
            self.population_by_type.get_mut(index),
            self.unemployed_by_type.get_mut(index),
        ) {
            (Some(population), Some(unemployed)) => {
                *population += pop.size;
                *unemployed += pop.unemployed;
            }
            _ => {
                log::error!("Census has no entry for pop type {}", pop.pop_type.0);
                return;
            }
        }

        if is_colonial {
            return;
        }
        self.non_colonial_population += pop.size;
        if definitions.pop_type(pop.pop_type).is_some_and(|t| t.is_administrator) {
            self.administrators += pop.size;
        }
    }
}

/// Net income received today, after income tax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopIncome {
    pub rgo_worker_income: Fixed,
    pub artisanal_income: Fixed,
    pub government_salary_administration: Fixed,
    pub government_salary_education: Fixed,
    pub government_salary_military: Fixed,
    pub pensions: Fixed,
    pub unemployment_subsidies: Fixed,
}

impl PopIncome {
    pub fn total(&self) -> Fixed {
        self.rgo_worker_income
            + self.artisanal_income
            + self.government_salary_administration
            + self.government_salary_education
            + self.government_salary_military
            + self.pensions
            + self.unemployment_subsidies
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopExpenses {
    pub needs: [Fixed; 3],
    pub artisan_inputs: Fixed,
}

impl PopExpenses {
    pub fn total(&self) -> Fixed {
        self.needs.iter().copied().sum::<Fixed>() + self.artisan_inputs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct NeedState {
    /// Quantity still to be bought today, after own produce.
    to_buy: BTreeMap<GoodId, Fixed>,
    desired_quantity: Fixed,
    acquired_quantity: Fixed,
}

/// Shared, read-only inputs of the pop tick.
#[derive(Clone, Copy)]
pub struct PopTickContext<'a> {
    pub definitions: &'a Definitions,
    pub market: &'a dyn MarketAccess,
    /// Country the pop reports its economy to; `None` for unowned provinces.
    pub country: Option<&'a CountryEconomy>,
    pub country_id: Option<CountryId>,
    pub base_goods_demand: Fixed,
}

impl PopTickContext<'_> {
    fn reporter(&self) -> Option<&dyn EconomyReporter> {
        self.country.map(|c| c as &dyn EconomyReporter)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pop {
    pub pop_type: PopTypeId,
    pub strata: StrataId,
    pub size: u32,
    pub employed: u32,
    /// Set when the province's RGO hires; read by tomorrow's subsidies.
    pub unemployed: u32,
    pub cash: Fixed,
    pub income: PopIncome,
    pub expenses: PopExpenses,
    /// Import spend accumulated during settlement, refunded as import subsidies tomorrow.
    pub yesterdays_import_value: Fixed,
    needs: [NeedState; 3],
    pub artisan: Option<ArtisanalProducer>,
}

impl Pop {
    pub fn new(pop_type: &PopTypeDefinition, size: u32, cash: Fixed) -> Self {
        Self {
            pop_type: pop_type.id,
            strata: pop_type.strata,
            size,
            cash,
            artisan: pop_type.artisan_production.map(ArtisanalProducer::new),
            ..Self::default()
        }
    }

    /// Share of today's desired need quantity acquired (1 when nothing was wanted).
    pub fn needs_fulfilled(&self, category: NeedCategory) -> Fixed {
        let state = &self.needs[category.index()];
        if state.desired_quantity == Fixed::ZERO {
            return Fixed::ONE;
        }
        state.acquired_quantity / state.desired_quantity
    }

    pub fn needs_desired_quantity(&self, category: NeedCategory) -> Fixed {
        self.needs[category.index()].desired_quantity
    }

    pub fn hire(&mut self, count: u32) {
        self.employed += count;
        if self.employed > self.size {
            log::error!(
                "Employed count {} exceeds pop size {}",
                self.employed,
                self.size
            );
        }
        self.unemployed = self.size.saturating_sub(self.employed);
    }

    // ========================================================================
    // Income
    // ========================================================================

    /// Applies income tax and returns what the pop keeps.
    fn pay_income_tax(&self, income: Fixed, country: Option<&CountryEconomy>) -> Fixed {
        let Some(country) = country else {
            return income;
        };
        let tax = country.effective_tax_rate(self.strata) * income;
        country.report_pop_income_tax(self.pop_type, income, tax);
        income - tax
    }

    fn receive_income(&mut self, kind: &str, amount: Fixed, country: Option<&CountryEconomy>) -> Fixed {
        if amount <= Fixed::ZERO {
            if amount < Fixed::ZERO {
                log::error!("Adding negative {} of {} to pop", kind, amount);
            }
            return Fixed::ZERO;
        }
        let net = self.pay_income_tax(amount, country);
        self.cash += net;
        net
    }

    pub fn add_rgo_worker_income(&mut self, amount: Fixed, country: Option<&CountryEconomy>) {
        let net = self.receive_income("rgo worker income", amount, country);
        self.income.rgo_worker_income += net;
    }

    pub fn add_government_salary_administration(&mut self, amount: Fixed, country: Option<&CountryEconomy>) {
        let net = self.receive_income("administration salary", amount, country);
        self.income.government_salary_administration += net;
    }

    pub fn add_government_salary_education(&mut self, amount: Fixed, country: Option<&CountryEconomy>) {
        let net = self.receive_income("education salary", amount, country);
        self.income.government_salary_education += net;
    }

    pub fn add_government_salary_military(&mut self, amount: Fixed, country: Option<&CountryEconomy>) {
        let net = self.receive_income("military salary", amount, country);
        self.income.government_salary_military += net;
    }

    pub fn add_pensions(&mut self, amount: Fixed, country: Option<&CountryEconomy>) {
        let net = self.receive_income("pensions", amount, country);
        self.income.pensions += net;
    }

    pub fn add_unemployment_subsidies(&mut self, amount: Fixed, country: Option<&CountryEconomy>) {
        let net = self.receive_income("unemployment subsidies", amount, country);
        self.income.unemployment_subsidies += net;
    }

    /// Refund on imports. Neither income nor a negative expense, so untaxed.
    pub fn add_import_subsidies(&mut self, amount: Fixed) {
        self.cash += amount;
    }

    /// Artisan sales are taxed on profit over today's input costs.
    fn add_artisanal_revenue(&mut self, revenue: Fixed, country: Option<&CountryEconomy>) {
        if revenue <= Fixed::ZERO {
            return;
        }
        let costs = self
            .artisan
            .as_ref()
            .map_or(Fixed::ZERO, ArtisanalProducer::costs_of_production);
        let profit = (revenue - costs).max(Fixed::ZERO);
        let tax = profit - self.pay_income_tax(profit, country);
        let net = revenue - tax;
        self.income.artisanal_income += net;
        self.cash += net;
    }

    fn add_expense(&mut self, amount: Fixed) {
        self.cash -= amount;
        if self.cash < Fixed::ZERO {
            log::error!("Pop cash became negative ({}) after spending {}", self.cash, amount);
        }
    }

    // ========================================================================
    // Daily tick
    // ========================================================================

    /// Collects payouts, produces, and places today's buy and sell orders.
    pub fn pop_tick(&mut self, pop_ref: PopRef, context: &PopTickContext<'_>) {
        self.income = PopIncome::default();
        self.expenses = PopExpenses::default();

        if let Some(country) = context.country {
            country.request_salaries_and_welfare_and_import_subsidies(self);
        }
        // Subsidies above used yesterday's values.
        self.employed = 0;
        self.yesterdays_import_value = Fixed::ZERO;

        let Some(pop_type) = context.definitions.pop_type(self.pop_type) else {
            log::error!("Pop has unknown pop type {}", self.pop_type.0);
            return;
        };
        let market = context.market;

        // Leave room for the tariff charged on top of import spend.
        let max_cost_multiplier = Fixed::ONE
            + context
                .country
                .map_or(Fixed::ZERO, |c| c.effective_tariff_rate().max(Fixed::ZERO));
        let mut cash_left_to_spend = (self.cash / max_cost_multiplier).max(Fixed::ZERO);

        // good -> (max quantity, money to spend)
        let mut buys: BTreeMap<GoodId, (Fixed, Fixed)> = BTreeMap::new();
        let mut goods_to_sell: BTreeMap<GoodId, Fixed> = BTreeMap::new();

        if let Some(artisan) = self.artisan.as_mut() {
            let result = artisan.artisan_tick(
                self.size,
                context.definitions,
                market,
                context.reporter(),
                cash_left_to_spend,
            );
            cash_left_to_spend -= result.money_reserved();
            for purchase in &result.purchases {
                let entry = buys.entry(purchase.good).or_default();
                entry.0 += purchase.max_quantity;
                entry.1 += purchase.money_to_spend;
            }
            if let Some((good, quantity)) = result.output {
                *goods_to_sell.entry(good).or_default() += quantity;
            }
        }

        let size = self.size as i64;
        for category in NeedCategory::ALL {
            let state = &mut self.needs[category.index()];
            state.to_buy.clear();
            state.desired_quantity = Fixed::ZERO;
            state.acquired_quantity = Fixed::ZERO;

            for &(good, base_quantity) in &pop_type.needs(category).goods {
                if !market.is_available(good) {
                    continue;
                }
                let mut quantity = base_quantity
                    .mul_int(size)
                    .div_int(defines::pops::SIZE_DENOMINATOR)
                    * context.base_goods_demand;
                if quantity <= Fixed::ZERO {
                    continue;
                }
                if let Some(reporter) = context.reporter() {
                    reporter.report_pop_need_demand(self.pop_type, good, quantity);
                }
                state.desired_quantity += quantity;

                if let Some(own_produce) = goods_to_sell.get_mut(&good).filter(|q| **q > Fixed::ZERO) {
                    let consumed = quantity.min(*own_produce);
                    *own_produce -= consumed;
                    quantity -= consumed;
                    state.acquired_quantity += consumed;
                    if let Some(reporter) = context.reporter() {
                        reporter.report_pop_need_consumption(self.pop_type, good, consumed);
                    }
                }

                if quantity > Fixed::ZERO {
                    *state.to_buy.entry(good).or_default() += quantity;
                }
            }

            let wanted: Vec<(GoodId, Fixed)> = state.to_buy.iter().map(|(&g, &q)| (g, q)).collect();
            let candidates: Vec<FillCandidate> = wanted
                .iter()
                .map(|&(good, quantity)| FillCandidate {
                    max_cost: market.get_max_money_to_allocate_to_buy_quantity(good, quantity),
                    weight: market.price_inverse(good),
                })
                .collect();
            let outcome = water_fill(cash_left_to_spend, &candidates);

            for (i, &(good, quantity)) in wanted.iter().enumerate() {
                let mut money_to_spend = outcome.money[i];
                if !outcome.fully_funded[i] && money_to_spend / market.min_next_price(good) < Fixed::EPSILON {
                    money_to_spend = Fixed::ZERO;
                }
                cash_left_to_spend -= money_to_spend;
                let entry = buys.entry(good).or_default();
                entry.0 += quantity;
                entry.1 += money_to_spend;
            }
        }

        let trader = Trader::Pop(pop_ref);
        for (good, (max_quantity, money_to_spend)) in buys {
            if max_quantity <= Fixed::ZERO {
                continue;
            }
            market.place_buy_up_to_order(BuyUpToOrder {
                good,
                buyer: trader,
                country: context.country_id,
                max_quantity,
                money_to_spend,
            });
        }
        for (good, quantity) in goods_to_sell {
            if quantity <= Fixed::ZERO {
                continue;
            }
            market.place_market_sell_order(MarketSellOrder {
                good,
                seller: trader,
                country: context.country_id,
                quantity,
            });
        }
    }
}

impl PurchaseSink for Pop {
    fn after_buy(&mut self, reporting_country: Option<&CountryEconomy>, result: &BuyResult) {
        let quantity_bought = result.quantity_bought;
        if quantity_bought <= Fixed::ZERO {
            return;
        }

        let mut money_spent = result.money_spent_total;
        self.yesterdays_import_value += result.money_spent_on_imports;
        if let Some(country) = reporting_country {
            money_spent += country.apply_tariff(result.money_spent_on_imports);
        }
        self.add_expense(money_spent);

        let good = result.good;
        let mut quantity_left = quantity_bought;
        if let Some(artisan) = self.artisan.as_mut() {
            let added = artisan.add_to_stockpile(good, quantity_left);
            if added > Fixed::ZERO {
                quantity_left -= added;
                self.expenses.artisan_inputs += money_spent.mul_div(added, quantity_bought);
            }
        }

        for category in NeedCategory::ALL {
            if quantity_left <= Fixed::ZERO {
                break;
            }
            let state = &mut self.needs[category.index()];
            let Some(&desired) = state.to_buy.get(&good) else {
                continue;
            };
            let consumed = quantity_left.min(desired);
            state.acquired_quantity += consumed;
            quantity_left -= consumed;
            if let Some(country) = reporting_country {
                country.report_pop_need_consumption(self.pop_type, good, consumed);
            }
            self.expenses.needs[category.index()] += money_spent.mul_div(consumed, quantity_bought);
        }
    }
}

impl SaleSink for Pop {
    fn after_sell(&mut self, reporting_country: Option<&CountryEconomy>, result: &SellResult, _scratch: &mut Vec<Fixed>) {
        if result.money_gained <= Fixed::ZERO {
            return;
        }
        if self.artisan.is_none() {
            log::error!("Pop sold good {} but has no artisan", result.good.0);
            return;
        }
        self.add_artisanal_revenue(result.money_gained, reporting_country);
    }
}
