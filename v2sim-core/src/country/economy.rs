use crate::bounded::{unit_slider, ClampedValue};
use crate::config::{ArtisanalInputDemandCategory, SimConfig};
use crate::country::budget::{allocate_budget, BudgetViolation, CategoryAmounts, CategoryLedger, SpendingCategory};
use crate::country::good_account::{GoodAccount, GoodAccountData, GovernmentNeedSource};
use crate::country::stockpile::{plan_national_stockpile, StockpilePlan, StockpileTarget};
use crate::country::CountryId;
use crate::defines;
use crate::definitions::Definitions;
use crate::fixed::{AtomicFixed, Fixed};
use crate::goods::GoodId;
use crate::history::ValueHistory;
use crate::market::{BuyUpToOrder, BuyResult, MarketAccess, MarketSellOrder, PurchaseSink, SaleSink, SellResult, Trader};
use crate::modifiers::CountryModifiers;
use crate::population::{Pop, PopTypeCosts, PopTypeId, PopulationCensus, StrataId};
use crate::production::TemplateType;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::instrument;

/// Per pop type amounts paid per `SIZE_DENOMINATOR` people, already scaled by
/// the country's corruption multiplier and welfare levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SalaryBases {
    pub administration: Fixed,
    pub education: Fixed,
    pub military: Fixed,
    pub pensions: Fixed,
    pub unemployment_subsidies: Fixed,
}

/// `Σ size × base` for each payout, across the whole population.
///
/// Payouts are computed as `size × base × budget / weight`, so they can never
/// add up to more than the budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ProjectionWeights {
    administration: Fixed,
    education: Fixed,
    military: Fixed,
    pensions: Fixed,
    unemployment_subsidies: Fixed,
}

impl ProjectionWeights {
    fn social(&self) -> Fixed {
        self.pensions + self.unemployment_subsidies
    }
}

/// A country's treasury, budget and national stockpile.
#[derive(Debug)]
pub struct CountryEconomy {
    goods: Vec<GoodAccount>,
    cash_stockpile: AtomicFixed,
    cash_stockpile_start_of_tick: Fixed,
    balance_history: ValueHistory<Fixed>,
    gold_income: Fixed,

    taxable_income_by_pop_type: Mutex<Vec<Fixed>>,
    strata_by_pop_type: Vec<StrataId>,
    tax_rate_slider_by_strata: Vec<ClampedValue>,

    army_spending_slider: ClampedValue,
    navy_spending_slider: ClampedValue,
    construction_spending_slider: ClampedValue,
    education_spending_slider: ClampedValue,
    administration_spending_slider: ClampedValue,
    social_spending_slider: ClampedValue,
    military_spending_slider: ClampedValue,
    tariff_rate_slider: ClampedValue,

    tax_efficiency: Fixed,
    administrative_efficiency: Fixed,
    administrator_percentage: Fixed,
    salary_bases: Vec<SalaryBases>,
    weights: ProjectionWeights,

    ledger: [CategoryLedger; SpendingCategory::COUNT],
    actual_pensions_spending: AtomicFixed,
    actual_unemployment_subsidies_spending: AtomicFixed,
    actual_tariff_income: AtomicFixed,
    actual_national_stockpile_spending: Fixed,
    actual_national_stockpile_income: Fixed,
    yesterdays_import_value: Fixed,
    import_value_today: AtomicFixed,
    violations_yesterday: Vec<BudgetViolation>,

    base_country_tax_efficiency: Fixed,
    gold_to_cash_rate: Fixed,
    prevent_negative_administration_efficiency: bool,
    artisanal_input_demand_category: ArtisanalInputDemandCategory,
}

impl CountryEconomy {
    pub fn new(definitions: &Definitions, config: &SimConfig) -> Self {
        let economy_defines = &config.economy;

        // Tax sliders start at 0.5 in [0, 1]; real bounds arrive with the first update.
        let tax_rate_slider_by_strata = definitions
            .strata
            .iter()
            .map(|_| unit_slider(Fixed::HALF))
            .collect();

        Self {
            goods: definitions.goods.iter().map(|_| GoodAccount::default()).collect(),
            cash_stockpile: AtomicFixed::default(),
            cash_stockpile_start_of_tick: Fixed::ZERO,
            balance_history: ValueHistory::new(defines::budget::BALANCE_HISTORY_DAYS, Fixed::ZERO),
            gold_income: Fixed::ZERO,
            taxable_income_by_pop_type: Mutex::new(vec![Fixed::ZERO; definitions.pop_types.len()]),
            strata_by_pop_type: definitions.pop_types.iter().map(|p| p.strata).collect(),
            tax_rate_slider_by_strata,
            army_spending_slider: ClampedValue::new(
                economy_defines.minimum_army_spending_slider_value,
                Fixed::ONE,
                Fixed::ONE,
            ),
            navy_spending_slider: ClampedValue::new(
                economy_defines.minimum_navy_spending_slider_value,
                Fixed::ONE,
                Fixed::ONE,
            ),
            construction_spending_slider: ClampedValue::new(
                economy_defines.minimum_construction_spending_slider_value,
                Fixed::ONE,
                Fixed::ONE,
            ),
            education_spending_slider: unit_slider(Fixed::HALF),
            administration_spending_slider: unit_slider(Fixed::HALF),
            social_spending_slider: unit_slider(Fixed::ONE),
            military_spending_slider: unit_slider(Fixed::HALF),
            tariff_rate_slider: ClampedValue::new(Fixed::ZERO, Fixed::ZERO, Fixed::ZERO),
            tax_efficiency: config.country.base_country_tax_efficiency,
            administrative_efficiency: Fixed::ONE,
            administrator_percentage: Fixed::ZERO,
            salary_bases: vec![SalaryBases::default(); definitions.pop_types.len()],
            weights: ProjectionWeights::default(),
            ledger: Default::default(),
            actual_pensions_spending: AtomicFixed::default(),
            actual_unemployment_subsidies_spending: AtomicFixed::default(),
            actual_tariff_income: AtomicFixed::default(),
            actual_national_stockpile_spending: Fixed::ZERO,
            actual_national_stockpile_income: Fixed::ZERO,
            yesterdays_import_value: Fixed::ZERO,
            import_value_today: AtomicFixed::default(),
            violations_yesterday: Vec::new(),
            base_country_tax_efficiency: config.country.base_country_tax_efficiency,
            gold_to_cash_rate: config.country.gold_to_cash_rate,
            prevent_negative_administration_efficiency: config.rules.prevent_negative_administration_efficiency,
            artisanal_input_demand_category: config.rules.artisanal_input_demand_category,
        }
    }

    // ========================================================================
    // Daily update
    // ========================================================================

    /// Refreshes slider bounds, efficiencies and unscaled projections.
    ///
    /// `census` covers every pop that will request payouts from this country
    /// during the coming tick.
    pub fn update_country_budget(
        &mut self,
        modifiers: &CountryModifiers,
        census: &PopulationCensus,
        definitions: &Definitions,
        pop_type_costs: &[PopTypeCosts],
        config: &SimConfig,
    ) {
        let min_tax = modifiers.min_tax;
        let max_tax = modifiers.max_tax.nonzero_or_one();
        for slider in &mut self.tax_rate_slider_by_strata {
            slider.set_bounds(min_tax, max_tax);
        }

        // Education and administration have no min/max modifiers.
        self.social_spending_slider.set_bounds(
            modifiers.min_social_spending,
            modifiers.max_social_spending.nonzero_or_one(),
        );
        self.military_spending_slider.set_bounds(
            modifiers.min_military_spending,
            modifiers.max_military_spending.nonzero_or_one(),
        );
        self.tariff_rate_slider
            .set_bounds(modifiers.min_tariff, modifiers.max_tariff);

        self.tax_efficiency = self.base_country_tax_efficiency
            + modifiers.tax_efficiency
            + modifiers.tax_eff.div_int(100);

        if census.non_colonial_population == 0 {
            self.administrative_efficiency = Fixed::ONE;
            self.administrator_percentage = Fixed::ZERO;
        } else {
            let non_colonial = Fixed::from_int(census.non_colonial_population as i64);
            let administrators = Fixed::from_int(census.administrators as i64);
            self.administrator_percentage = administrators / non_colonial;

            let desired_administrators = config.pops.desired_administrator_percentage * non_colonial;
            let efficiency = (administrators
                .mul_div(Fixed::ONE + modifiers.administrative_efficiency, desired_administrators)
                * (Fixed::ONE + modifiers.administrative_efficiency_modifier))
                .min(Fixed::ONE);
            self.administrative_efficiency = if self.prevent_negative_administration_efficiency {
                efficiency.max(Fixed::ZERO)
            } else {
                efficiency
            };
        }

        let corruption_cost_multiplier = self.corruption_cost_multiplier();
        for (pop_type, bases) in definitions.pop_types.iter().zip(self.salary_bases.iter_mut()) {
            let Some(costs) = pop_type_costs.get(pop_type.id.index()) else {
                *bases = SalaryBases::default();
                continue;
            };
            if pop_type.is_slave {
                *bases = SalaryBases::default();
                continue;
            }
            let social_income_variant_base = corruption_cost_multiplier * costs.social_income_variant_base;
            *bases = SalaryBases {
                administration: corruption_cost_multiplier * costs.administration_salary_base,
                education: corruption_cost_multiplier * costs.education_salary_base,
                military: corruption_cost_multiplier * costs.military_salary_base,
                pensions: modifiers.pension_level * social_income_variant_base,
                unemployment_subsidies: modifiers.unemployment_benefit * social_income_variant_base,
            };
        }

        let mut weights = ProjectionWeights::default();
        for (index, bases) in self.salary_bases.iter().enumerate() {
            let size = census.population_by_type.get(index).copied().unwrap_or(0) as i64;
            let unemployed = census.unemployed_by_type.get(index).copied().unwrap_or(0) as i64;
            weights.administration += bases.administration.mul_int(size);
            weights.education += bases.education.mul_int(size);
            weights.military += bases.military.mul_int(size);
            weights.pensions += bases.pensions.mul_int(size);
            weights.unemployment_subsidies += bases.unemployment_subsidies.mul_int(unemployed);
        }
        self.weights = weights;
    }

    /// Moves today's import value into yesterday's.
    pub fn roll_over_imports(&mut self) {
        self.yesterdays_import_value = self.import_value_today.take();
    }

    /// Runs the budget waterfall and places national stockpile orders.
    #[instrument(skip_all, name = "country_budget_before_map")]
    pub fn country_budget_tick_before_map(&mut self, country: CountryId, market: &dyn MarketAccess) -> StockpilePlan {
        let cash = self.cash_stockpile.load();
        self.cash_stockpile_start_of_tick = cash;

        let mut projected = CategoryAmounts::default();
        for category in SpendingCategory::PRIORITY {
            projected[category] = self.projected_spending(category);
        }
        let outcome = allocate_budget(cash, &projected);

        for category in SpendingCategory::PRIORITY {
            let ledger = &mut self.ledger[category.index()];
            ledger.projected = projected[category];
            ledger.actual_budget = outcome.actual[category];
            ledger.was_cut = outcome.was_cut[category.index()];
            ledger.actual_spending.store(Fixed::ZERO);
        }

        log::trace!(
            "Country {} budget: cash {} projected {} remaining {}",
            country.0,
            cash,
            projected.total(),
            outcome.remaining
        );

        let plan = self.manage_national_stockpile(country, market, outcome.remaining);

        get_mut(&mut self.taxable_income_by_pop_type).fill(Fixed::ZERO);
        self.actual_pensions_spending.store(Fixed::ZERO);
        self.actual_unemployment_subsidies_spending.store(Fixed::ZERO);
        self.actual_tariff_income.store(Fixed::ZERO);
        self.actual_national_stockpile_spending = Fixed::ZERO;
        self.actual_national_stockpile_income = Fixed::ZERO;
        plan
    }

    /// Clears today's per-good data and enqueues the stockpile orders.
    fn manage_national_stockpile(
        &mut self,
        country: CountryId,
        market: &dyn MarketAccess,
        available_funds: Fixed,
    ) -> StockpilePlan {
        let mut targets = Vec::with_capacity(self.goods.len());
        for (index, account) in self.goods.iter_mut().enumerate() {
            let data = account.get_mut();
            let government_needs = data.total_government_needs();
            data.clear_daily_recorded_data();

            let target = if !data.is_selling && data.is_automated {
                data.stockpile_cutoff.max(government_needs)
            } else {
                data.stockpile_cutoff
            };
            targets.push(StockpileTarget {
                good: GoodId(index as u16),
                stockpile: data.stockpile_amount,
                target,
                is_selling: data.is_selling,
            });
        }

        let plan = plan_national_stockpile(&targets, market, available_funds);
        for &(good, quantity) in &plan.sells {
            market.place_market_sell_order(MarketSellOrder {
                good,
                seller: Trader::Country(country),
                country: Some(country),
                quantity,
            });
        }
        for purchase in &plan.buys {
            market.place_buy_up_to_order(BuyUpToOrder {
                good: purchase.good,
                buyer: Trader::Country(country),
                country: Some(country),
                max_quantity: purchase.max_quantity,
                money_to_spend: purchase.money_to_spend,
            });
        }
        plan
    }

    /// Pays a pop its share of every funded category.
    ///
    /// Called from worker threads; only atomics are written on `self`.
    pub fn request_salaries_and_welfare_and_import_subsidies(&self, pop: &mut Pop) {
        let Some(bases) = self.salary_bases.get(pop.pop_type.index()).copied() else {
            return;
        };
        let size = pop.size as i64;

        let salary = |base: Fixed, category: SpendingCategory, weight: Fixed| -> Fixed {
            let budget = self.ledger[category.index()].actual_budget;
            if budget <= Fixed::ZERO {
                return Fixed::ZERO;
            }
            base.mul_int(size).mul_div(budget, weight)
        };

        let administration = salary(bases.administration, SpendingCategory::Administration, self.weights.administration);
        if administration > Fixed::ZERO {
            self.ledger[SpendingCategory::Administration.index()].actual_spending.add(administration);
            pop.add_government_salary_administration(administration, Some(self));
        }

        let education = salary(bases.education, SpendingCategory::Education, self.weights.education);
        if education > Fixed::ZERO {
            self.ledger[SpendingCategory::Education.index()].actual_spending.add(education);
            pop.add_government_salary_education(education, Some(self));
        }

        let military = salary(bases.military, SpendingCategory::Military, self.weights.military);
        if military > Fixed::ZERO {
            self.ledger[SpendingCategory::Military.index()].actual_spending.add(military);
            pop.add_government_salary_military(military, Some(self));
        }

        let social_budget = self.ledger[SpendingCategory::Social.index()].actual_budget;
        if social_budget > Fixed::ZERO {
            let social_weight = self.weights.social();
            let pensions = bases.pensions.mul_int(size).mul_div(social_budget, social_weight);
            if pensions > Fixed::ZERO {
                self.actual_pensions_spending.add(pensions);
                self.ledger[SpendingCategory::Social.index()].actual_spending.add(pensions);
                pop.add_pensions(pensions, Some(self));
            }

            let unemployment_subsidies = bases
                .unemployment_subsidies
                .mul_int(pop.unemployed as i64)
                .mul_div(social_budget, social_weight);
            if unemployment_subsidies > Fixed::ZERO {
                self.actual_unemployment_subsidies_spending.add(unemployment_subsidies);
                self.ledger[SpendingCategory::Social.index()].actual_spending.add(unemployment_subsidies);
                pop.add_unemployment_subsidies(unemployment_subsidies, Some(self));
            }
        }

        let import_subsidies_budget = self.ledger[SpendingCategory::ImportSubsidies.index()].actual_budget;
        if import_subsidies_budget > Fixed::ZERO {
            let import_subsidies = pop
                .yesterdays_import_value
                .mul_div(import_subsidies_budget, self.yesterdays_import_value);
            if import_subsidies > Fixed::ZERO {
                self.ledger[SpendingCategory::ImportSubsidies.index()].actual_spending.add(import_subsidies);
                pop.add_import_subsidies(import_subsidies);
            }
        }
    }

    /// Records an import and returns the tariff the buyer owes on it.
    pub fn apply_tariff(&self, money_spent_on_imports: Fixed) -> Fixed {
        if money_spent_on_imports <= Fixed::ZERO {
            return Fixed::ZERO;
        }
        self.import_value_today.add(money_spent_on_imports);

        let rate = self.effective_tariff_rate();
        if rate <= Fixed::ZERO {
            return Fixed::ZERO;
        }
        let tariff = rate * money_spent_on_imports;
        self.actual_tariff_income.add(tariff);
        tariff
    }

    /// Debits category spending, checks the books, credits tariffs and gold.
    #[instrument(skip_all, name = "country_budget_after_map")]
    pub fn country_budget_tick_after_map(&mut self, tag: &str, definitions: &Definitions) {
        self.violations_yesterday.clear();

        let mut total_gold_production = Fixed::ZERO;
        for (good, account) in definitions.goods.iter().zip(self.goods.iter_mut()) {
            if !good.is_money {
                continue;
            }
            for (&production_type, &quantity) in &account.get_mut().production_per_production_type {
                let is_rgo = definitions
                    .production_type(production_type)
                    .is_some_and(|p| p.template == TemplateType::Rgo);
                if is_rgo {
                    total_gold_production += quantity;
                }
            }
        }

        for category in SpendingCategory::PRIORITY {
            let ledger = &self.ledger[category.index()];
            let spent = ledger.actual_spending.load();
            if spent > ledger.actual_budget {
                if category == SpendingCategory::Social {
                    log::error!(
                        "Country {} has overspend on pensions and/or unemployment subsidies. Spending {} on pensions \
                         and {} on unemployment subsidies instead of the total allocated {}. This indicates a severe \
                         bug in the economy code.",
                        tag,
                        self.actual_pensions_spending.load(),
                        self.actual_unemployment_subsidies_spending.load(),
                        ledger.actual_budget
                    );
                } else {
                    log::error!(
                        "Country {} has overspend on {}. Spending {} instead of the allocated {}. This indicates a \
                         severe bug in the economy code.",
                        tag,
                        category,
                        spent,
                        ledger.actual_budget
                    );
                }
                self.violations_yesterday.push(BudgetViolation::Overspend {
                    category,
                    spent,
                    budget: ledger.actual_budget,
                });
            }
            self.cash_stockpile.sub(spent);
        }

        let cash = self.cash_stockpile.load();
        if cash < Fixed::ZERO {
            log::error!(
                "Country {} has overspend resulting in a cash stockpile of {}. This indicates a severe bug in the \
                 economy code.",
                tag,
                cash
            );
            self.violations_yesterday.push(BudgetViolation::NegativeCash { cash });
        }

        self.cash_stockpile.add(self.actual_tariff_income.load());

        self.gold_income = self.gold_to_cash_rate * total_gold_production;
        self.cash_stockpile.add(self.gold_income);

        let balance = self.cash_stockpile.load() - self.cash_stockpile_start_of_tick;
        self.balance_history.push_back(balance);
        log::debug!("Country {} balance {} cash {}", tag, balance, self.cash_stockpile.load());
    }

    // ========================================================================
    // Derived values
    // ========================================================================

    pub fn projected_spending(&self, category: SpendingCategory) -> Fixed {
        let denominator = defines::pops::SIZE_DENOMINATOR;
        match category {
            SpendingCategory::Administration => {
                self.administration_spending_slider.get() * self.weights.administration.div_int(denominator)
            }
            SpendingCategory::Education => {
                self.education_spending_slider.get() * self.weights.education.div_int(denominator)
            }
            SpendingCategory::Military => {
                self.military_spending_slider.get() * self.weights.military.div_int(denominator)
            }
            SpendingCategory::Social => {
                self.social_spending_slider.get() * self.weights.social().div_int(denominator)
            }
            SpendingCategory::ImportSubsidies => self.import_subsidy_rate() * self.yesterdays_import_value,
        }
    }

    /// Projected spending with every slider at 1.
    pub fn projected_spending_unscaled(&self, category: SpendingCategory) -> Fixed {
        let denominator = defines::pops::SIZE_DENOMINATOR;
        match category {
            SpendingCategory::Administration => self.weights.administration.div_int(denominator),
            SpendingCategory::Education => self.weights.education.div_int(denominator),
            SpendingCategory::Military => self.weights.military.div_int(denominator),
            SpendingCategory::Social => self.weights.social().div_int(denominator),
            SpendingCategory::ImportSubsidies => self.yesterdays_import_value,
        }
    }

    pub fn effective_tax_rate(&self, strata: StrataId) -> Fixed {
        self.tax_rate_slider_by_strata
            .get(strata.index())
            .map_or(Fixed::ZERO, |slider| self.tax_efficiency * slider.get())
    }

    pub fn effective_tariff_rate(&self) -> Fixed {
        self.administrative_efficiency * self.tariff_rate_slider.get()
    }

    /// Share of yesterday's imports refunded to pops. Non-zero only when the
    /// tariff slider is negative.
    pub fn import_subsidy_rate(&self) -> Fixed {
        (-self.effective_tariff_rate()).max(Fixed::ZERO)
    }

    pub fn has_import_subsidies(&self) -> bool {
        self.effective_tariff_rate() < Fixed::ZERO
    }

    pub fn tariff_efficiency(&self) -> Fixed {
        Fixed::ONE.min(self.administrative_efficiency + self.base_country_tax_efficiency)
    }

    pub fn corruption_cost_multiplier(&self) -> Fixed {
        Fixed::from_int(2) - self.administrative_efficiency
    }

    /// Tariffs collected minus import subsidies paid this tick.
    pub fn net_tariff_balance(&self) -> Fixed {
        self.actual_tariff_income.load() - self.actual_spending(SpendingCategory::ImportSubsidies)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn cash_stockpile(&self) -> Fixed {
        self.cash_stockpile.load()
    }

    pub fn set_cash_stockpile(&mut self, cash: Fixed) {
        self.cash_stockpile.store(cash);
    }

    pub(crate) fn credit_cash(&self, amount: Fixed) {
        self.cash_stockpile.add(amount);
    }

    pub fn cash_stockpile_start_of_tick(&self) -> Fixed {
        self.cash_stockpile_start_of_tick
    }

    pub fn balance_history(&self) -> &ValueHistory<Fixed> {
        &self.balance_history
    }

    pub fn gold_income(&self) -> Fixed {
        self.gold_income
    }

    /// Projection the waterfall was given at the start of this tick.
    pub fn projected_budget(&self, category: SpendingCategory) -> Fixed {
        self.ledger[category.index()].projected
    }

    pub fn actual_budget(&self, category: SpendingCategory) -> Fixed {
        self.ledger[category.index()].actual_budget
    }

    pub fn actual_spending(&self, category: SpendingCategory) -> Fixed {
        self.ledger[category.index()].actual_spending.load()
    }

    pub fn was_budget_cut(&self, category: SpendingCategory) -> bool {
        self.ledger[category.index()].was_cut
    }

    pub fn actual_pensions_spending(&self) -> Fixed {
        self.actual_pensions_spending.load()
    }

    pub fn actual_unemployment_subsidies_spending(&self) -> Fixed {
        self.actual_unemployment_subsidies_spending.load()
    }

    pub fn actual_tariff_income(&self) -> Fixed {
        self.actual_tariff_income.load()
    }

    pub fn actual_national_stockpile_spending(&self) -> Fixed {
        self.actual_national_stockpile_spending
    }

    pub fn actual_national_stockpile_income(&self) -> Fixed {
        self.actual_national_stockpile_income
    }

    pub fn yesterdays_import_value(&self) -> Fixed {
        self.yesterdays_import_value
    }

    pub fn violations_yesterday(&self) -> &[BudgetViolation] {
        &self.violations_yesterday
    }

    pub fn tax_efficiency(&self) -> Fixed {
        self.tax_efficiency
    }

    pub fn administrative_efficiency(&self) -> Fixed {
        self.administrative_efficiency
    }

    pub fn administrator_percentage(&self) -> Fixed {
        self.administrator_percentage
    }

    pub fn salary_bases(&self, pop_type: PopTypeId) -> Option<SalaryBases> {
        self.salary_bases.get(pop_type.index()).copied()
    }

    pub(crate) fn artisanal_input_demand_category(&self) -> ArtisanalInputDemandCategory {
        self.artisanal_input_demand_category
    }

    pub fn good_account(&self, good: GoodId) -> Option<&GoodAccount> {
        self.goods.get(good.index())
    }

    pub fn good_snapshot(&self, good: GoodId) -> Option<GoodAccountData> {
        self.good_account(good).map(GoodAccount::snapshot)
    }

    /// Account for a reported good, logging reports for goods that do not exist.
    pub(crate) fn reported_good(&self, good: GoodId) -> Option<&GoodAccount> {
        let account = self.good_account(good);
        if account.is_none() {
            log::error!("Economy report for unknown good {}", good.0);
        }
        account
    }

    pub(crate) fn lock_taxable_income(&self) -> MutexGuard<'_, Vec<Fixed>> {
        self.taxable_income_by_pop_type
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn taxable_income_by_pop_type(&self, pop_type: PopTypeId) -> Fixed {
        self.lock_taxable_income()
            .get(pop_type.index())
            .copied()
            .unwrap_or_default()
    }

    pub fn taxable_income_by_strata(&self, strata: StrataId) -> Fixed {
        let taxable_income = self.lock_taxable_income();
        taxable_income
            .iter()
            .zip(&self.strata_by_pop_type)
            .filter(|(_, s)| **s == strata)
            .map(|(income, _)| *income)
            .sum()
    }

    /// Adds a need that automated goods raise their buy target to at the next
    /// budget tick. Cleared once that tick has read it.
    pub fn report_government_need(&self, good: GoodId, source: GovernmentNeedSource, quantity: Fixed) {
        if quantity <= Fixed::ZERO {
            return;
        }
        if let Some(account) = self.reported_good(good) {
            *account.lock().need_mut(source) += quantity;
        }
    }

    // ========================================================================
    // Sliders
    // ========================================================================

    pub fn tax_rate_slider(&self, strata: StrataId) -> Option<&ClampedValue> {
        self.tax_rate_slider_by_strata.get(strata.index())
    }

    pub fn army_spending_slider(&self) -> &ClampedValue {
        &self.army_spending_slider
    }

    pub fn navy_spending_slider(&self) -> &ClampedValue {
        &self.navy_spending_slider
    }

    pub fn construction_spending_slider(&self) -> &ClampedValue {
        &self.construction_spending_slider
    }

    pub fn education_spending_slider(&self) -> &ClampedValue {
        &self.education_spending_slider
    }

    pub fn administration_spending_slider(&self) -> &ClampedValue {
        &self.administration_spending_slider
    }

    pub fn social_spending_slider(&self) -> &ClampedValue {
        &self.social_spending_slider
    }

    pub fn military_spending_slider(&self) -> &ClampedValue {
        &self.military_spending_slider
    }

    pub fn tariff_rate_slider(&self) -> &ClampedValue {
        &self.tariff_rate_slider
    }

    pub fn set_strata_tax_rate_slider_value(&mut self, strata: StrataId, value: Fixed) {
        match self.tax_rate_slider_by_strata.get_mut(strata.index()) {
            Some(slider) => slider.set(value),
            None => log::warn!("Ignoring tax rate for unknown strata {}", strata.0),
        }
    }

    pub fn set_army_spending_slider_value(&mut self, value: Fixed) {
        self.army_spending_slider.set(value);
    }

    pub fn set_navy_spending_slider_value(&mut self, value: Fixed) {
        self.navy_spending_slider.set(value);
    }

    pub fn set_construction_spending_slider_value(&mut self, value: Fixed) {
        self.construction_spending_slider.set(value);
    }

    pub fn set_education_spending_slider_value(&mut self, value: Fixed) {
        self.education_spending_slider.set(value);
    }

    pub fn set_administration_spending_slider_value(&mut self, value: Fixed) {
        self.administration_spending_slider.set(value);
    }

    pub fn set_social_spending_slider_value(&mut self, value: Fixed) {
        self.social_spending_slider.set(value);
    }

    pub fn set_military_spending_slider_value(&mut self, value: Fixed) {
        self.military_spending_slider.set(value);
    }

    pub fn set_tariff_rate_slider_value(&mut self, value: Fixed) {
        self.tariff_rate_slider.set(value);
    }

    // ========================================================================
    // National stockpile settings
    // ========================================================================

    pub fn set_stockpile_amount(&mut self, good: GoodId, amount: Fixed) {
        if let Some(account) = self.goods.get_mut(good.index()) {
            account.get_mut().stockpile_amount = amount.max(Fixed::ZERO);
        }
    }

    pub fn set_stockpile_cutoff(&mut self, good: GoodId, cutoff: Fixed) {
        if let Some(account) = self.goods.get_mut(good.index()) {
            account.get_mut().stockpile_cutoff = cutoff.max(Fixed::ZERO);
        }
    }

    pub fn set_stockpile_automated(&mut self, good: GoodId, is_automated: bool) {
        if let Some(account) = self.goods.get_mut(good.index()) {
            account.get_mut().is_automated = is_automated;
        }
    }

    pub fn set_stockpile_selling(&mut self, good: GoodId, is_selling: bool) {
        if let Some(account) = self.goods.get_mut(good.index()) {
            account.get_mut().is_selling = is_selling;
        }
    }
}

impl PurchaseSink for CountryEconomy {
    fn after_buy(&mut self, _reporting_country: Option<&CountryEconomy>, result: &BuyResult) {
        if result.quantity_bought <= Fixed::ZERO {
            return;
        }
        let Some(account) = self.goods.get_mut(result.good.index()) else {
            log::error!("National stockpile bought unknown good {}", result.good.0);
            return;
        };

        let money_spent = result.money_spent_total;
        let data = account.get_mut();
        data.stockpile_amount += result.quantity_bought;
        data.stockpile_change_yesterday += result.quantity_bought;
        data.quantity_traded_yesterday = result.quantity_bought;
        data.money_traded_yesterday = -money_spent;
        self.cash_stockpile.sub(money_spent);
        self.actual_national_stockpile_spending += money_spent;
    }
}

impl SaleSink for CountryEconomy {
    fn after_sell(&mut self, _reporting_country: Option<&CountryEconomy>, result: &SellResult, _scratch: &mut Vec<Fixed>) {
        if result.quantity_sold <= Fixed::ZERO {
            return;
        }
        let Some(account) = self.goods.get_mut(result.good.index()) else {
            log::error!("National stockpile sold unknown good {}", result.good.0);
            return;
        };

        let data = account.get_mut();
        let quantity_sold = if result.quantity_sold > data.stockpile_amount {
            log::error!(
                "National stockpile sold {} of good {} but only held {}",
                result.quantity_sold,
                result.good.0,
                data.stockpile_amount
            );
            data.stockpile_amount
        } else {
            result.quantity_sold
        };
        data.stockpile_amount -= quantity_sold;
        data.stockpile_change_yesterday -= quantity_sold;
        data.quantity_traded_yesterday = -quantity_sold;
        data.money_traded_yesterday = result.money_gained;
        self.cash_stockpile.add(result.money_gained);
        self.actual_national_stockpile_income += result.money_gained;
    }
}

fn get_mut<T>(mutex: &mut Mutex<T>) -> &mut T {
    mutex.get_mut().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameRules, CountryDefines};
    use crate::market::Market;
    use crate::testing::{grain_and_tools_definitions, FARMERS, GRAIN, TOOLS};

    fn setup() -> (Definitions, SimConfig, CountryEconomy) {
        let definitions = grain_and_tools_definitions();
        let config = SimConfig::default();
        let economy = CountryEconomy::new(&definitions, &config);
        (definitions, config, economy)
    }

    fn census(size: u32, unemployed: u32, pop_types: usize) -> PopulationCensus {
        let mut census = PopulationCensus::new(pop_types);
        census.population_by_type[FARMERS.index()] = size;
        census.unemployed_by_type[FARMERS.index()] = unemployed;
        census.non_colonial_population = size;
        census
    }

    #[test]
    fn test_initial_sliders() {
        let (_, _, economy) = setup();
        assert_eq!(economy.education_spending_slider().get(), Fixed::HALF);
        assert_eq!(economy.social_spending_slider().get(), Fixed::ONE);
        assert_eq!(economy.army_spending_slider().min(), Fixed::from_f64(0.1));
        assert_eq!(economy.tariff_rate_slider().get(), Fixed::ZERO);
        assert_eq!(economy.tax_rate_slider(StrataId(0)).unwrap().get(), Fixed::HALF);
    }

    #[test]
    fn test_slider_setters_clamp() {
        let (_, _, mut economy) = setup();
        economy.set_education_spending_slider_value(Fixed::from_int(5));
        assert_eq!(economy.education_spending_slider().get(), Fixed::ONE);
        economy.set_army_spending_slider_value(Fixed::ZERO);
        assert_eq!(economy.army_spending_slider().get(), Fixed::from_f64(0.1));
        economy.set_tariff_rate_slider_value(Fixed::HALF);
        assert_eq!(economy.tariff_rate_slider().get(), Fixed::ZERO);
    }

    #[test]
    fn test_update_budget_applies_modifier_bounds() {
        let (definitions, config, mut economy) = setup();
        let costs = PopTypeCosts::compute_all(&definitions, &Market::new(&definitions.goods, &GameRules::default(), &CountryDefines::default()), &config);
        let modifiers = CountryModifiers {
            min_tax: Fixed::from_f64(0.2),
            max_tax: Fixed::from_f64(0.6),
            min_tariff: Fixed::from_f64(-0.5),
            max_tariff: Fixed::from_f64(0.5),
            ..CountryModifiers::default()
        };
        economy.set_strata_tax_rate_slider_value(StrataId(0), Fixed::ONE);
        economy.update_country_budget(&modifiers, &census(0, 0, definitions.pop_types.len()), &definitions, &costs, &config);

        assert_eq!(economy.tax_rate_slider(StrataId(0)).unwrap().get(), Fixed::from_f64(0.6));
        assert_eq!(economy.administrative_efficiency(), Fixed::ONE);
        assert_eq!(economy.administrator_percentage(), Fixed::ZERO);
        assert_eq!(economy.tariff_efficiency(), Fixed::ONE);
        economy.set_tariff_rate_slider_value(Fixed::from_f64(-0.3));
        assert_eq!(economy.effective_tariff_rate(), Fixed::from_f64(-0.3));
        assert_eq!(economy.import_subsidy_rate(), Fixed::from_f64(0.3));
        assert!(economy.has_import_subsidies());
    }

    #[test]
    fn test_projected_spending_round_trip() {
        let (definitions, config, mut economy) = setup();
        let market = Market::new(&definitions.goods, &GameRules::default(), &CountryDefines::default());
        let costs = PopTypeCosts::compute_all(&definitions, &market, &config);
        let modifiers = CountryModifiers {
            pension_level: Fixed::from_f64(0.1),
            unemployment_benefit: Fixed::from_f64(0.2),
            ..CountryModifiers::default()
        };
        economy.update_country_budget(
            &modifiers,
            &census(400_000, 100_000, definitions.pop_types.len()),
            &definitions,
            &costs,
            &config,
        );

        for category in [
            SpendingCategory::Administration,
            SpendingCategory::Education,
            SpendingCategory::Military,
            SpendingCategory::Social,
        ] {
            let unscaled = economy.projected_spending_unscaled(category);
            assert!(unscaled > Fixed::ZERO, "{category} has no projection");
        }
        economy.set_education_spending_slider_value(Fixed::ONE);
        assert_eq!(
            economy.projected_spending(SpendingCategory::Education),
            economy.projected_spending_unscaled(SpendingCategory::Education)
        );
        economy.set_education_spending_slider_value(Fixed::ZERO);
        assert_eq!(economy.projected_spending(SpendingCategory::Education), Fixed::ZERO);
    }

    #[test]
    fn test_waterfall_uses_projection_recomputed_from_sliders() {
        let (definitions, config, mut economy) = setup();
        let market = Market::new(&definitions.goods, &config.rules, &config.country);
        let costs = PopTypeCosts::compute_all(&definitions, &market, &config);
        let modifiers = CountryModifiers {
            pension_level: Fixed::from_f64(0.1),
            unemployment_benefit: Fixed::from_f64(0.2),
            min_tariff: Fixed::from_int(-1),
            max_tariff: Fixed::ONE,
            ..CountryModifiers::default()
        };
        // Fully staffed, so the tariff slider applies at full strength.
        let mut census = census(400_000, 100_000, definitions.pop_types.len());
        census.administrators = 400_000;
        economy.update_country_budget(&modifiers, &census, &definitions, &costs, &config);
        assert_eq!(economy.administrative_efficiency(), Fixed::ONE);
        economy.set_education_spending_slider_value(Fixed::from_f64(0.3));
        economy.set_administration_spending_slider_value(Fixed::from_f64(0.7));
        economy.set_social_spending_slider_value(Fixed::from_f64(0.4));
        economy.set_military_spending_slider_value(Fixed::from_f64(0.9));
        economy.set_tariff_rate_slider_value(Fixed::from_f64(-0.5));
        economy.apply_tariff(Fixed::from_int(12));
        economy.roll_over_imports();
        economy.set_cash_stockpile(Fixed::from_int(1_000_000));

        economy.country_budget_tick_before_map(CountryId(0), &market);

        for category in SpendingCategory::PRIORITY {
            let projected = economy.projected_budget(category);
            assert_eq!(projected, economy.projected_spending(category), "{category}");
            assert!(projected > Fixed::ZERO, "{category} has no projection");
            assert_eq!(economy.actual_budget(category), projected);
            assert!(!economy.was_budget_cut(category));
        }
        assert_eq!(
            economy.projected_budget(SpendingCategory::Education),
            Fixed::from_f64(0.3) * economy.projected_spending_unscaled(SpendingCategory::Education)
        );
        assert_eq!(
            economy.projected_budget(SpendingCategory::ImportSubsidies),
            Fixed::from_int(6)
        );
    }

    #[test]
    fn test_before_map_without_cash_cuts_everything() {
        let (definitions, config, mut economy) = setup();
        let market = Market::new(&definitions.goods, &config.rules, &config.country);
        let costs = PopTypeCosts::compute_all(&definitions, &market, &config);
        economy.update_country_budget(
            &CountryModifiers::default(),
            &census(200_000, 0, definitions.pop_types.len()),
            &definitions,
            &costs,
            &config,
        );

        economy.country_budget_tick_before_map(CountryId(0), &market);
        assert!(economy.was_budget_cut(SpendingCategory::Education));
        assert_eq!(economy.actual_budget(SpendingCategory::Education), Fixed::ZERO);
        assert!(!economy.was_budget_cut(SpendingCategory::ImportSubsidies));
    }

    #[test]
    fn test_stockpile_purchase_and_sale() {
        let (_, _, mut economy) = setup();
        economy.set_cash_stockpile(Fixed::from_int(100));
        economy.after_buy(
            None,
            &BuyResult {
                good: GRAIN,
                quantity_bought: Fixed::from_int(4),
                money_spent_total: Fixed::from_int(8),
                money_spent_on_imports: Fixed::ZERO,
            },
        );
        let grain = economy.good_snapshot(GRAIN).unwrap();
        assert_eq!(grain.stockpile_amount, Fixed::from_int(4));
        assert_eq!(grain.money_traded_yesterday, Fixed::from_int(-8));
        assert_eq!(economy.cash_stockpile(), Fixed::from_int(92));
        assert_eq!(economy.actual_national_stockpile_spending(), Fixed::from_int(8));

        economy.after_sell(
            None,
            &SellResult {
                good: GRAIN,
                quantity_sold: Fixed::from_int(10),
                money_gained: Fixed::from_int(20),
            },
            &mut Vec::new(),
        );
        let grain = economy.good_snapshot(GRAIN).unwrap();
        assert_eq!(grain.stockpile_amount, Fixed::ZERO);
        assert_eq!(grain.quantity_traded_yesterday, Fixed::from_int(-4));
        assert_eq!(economy.cash_stockpile(), Fixed::from_int(112));
    }

    #[test]
    fn test_automated_target_follows_government_needs() {
        let (definitions, config, mut economy) = setup();
        let market = Market::new(&definitions.goods, &config.rules, &config.country);
        economy.set_cash_stockpile(Fixed::from_int(1000));
        economy.report_government_need(TOOLS, GovernmentNeedSource::Government, Fixed::from_int(1));
        economy.report_government_need(TOOLS, GovernmentNeedSource::Army, Fixed::from_int(2));
        economy.report_government_need(TOOLS, GovernmentNeedSource::OverseasMaintenance, Fixed::HALF);
        economy.report_government_need(GRAIN, GovernmentNeedSource::Navy, Fixed::from_int(4));
        economy.set_stockpile_automated(GRAIN, false);
        economy.set_stockpile_cutoff(GRAIN, Fixed::ONE);

        let plan = economy.country_budget_tick_before_map(CountryId(0), &market);
        let tools = plan.buys.iter().find(|b| b.good == TOOLS).unwrap();
        assert_eq!(tools.max_quantity, Fixed::from_int(3) + Fixed::HALF);
        // Manual goods buy up to the cutoff only.
        let grain = plan.buys.iter().find(|b| b.good == GRAIN).unwrap();
        assert_eq!(grain.max_quantity, Fixed::ONE);
        let snapshot = economy.good_snapshot(TOOLS).unwrap();
        assert_eq!(snapshot.total_government_needs(), Fixed::ZERO);
        assert_eq!(market.good(TOOLS).unwrap().pending_order_counts(), (1, 0));
    }

    #[test]
    fn test_after_map_records_violations_without_correcting() {
        let (definitions, _, mut economy) = setup();
        economy.set_cash_stockpile(Fixed::from_int(5));
        economy.ledger[SpendingCategory::Education.index()]
            .actual_spending
            .add(Fixed::from_int(10));

        economy.country_budget_tick_after_map("TST", &definitions);

        assert_eq!(economy.cash_stockpile(), Fixed::from_int(-5));
        assert_eq!(
            economy.violations_yesterday(),
            &[
                BudgetViolation::Overspend {
                    category: SpendingCategory::Education,
                    spent: Fixed::from_int(10),
                    budget: Fixed::ZERO,
                },
                BudgetViolation::NegativeCash {
                    cash: Fixed::from_int(-5)
                },
            ]
        );
        assert_eq!(economy.balance_history().latest(), Some(Fixed::from_int(-5)));
    }

    #[test]
    fn test_tariff_only_when_positive() {
        let (definitions, config, mut economy) = setup();
        let market = Market::new(&definitions.goods, &config.rules, &config.country);
        let costs = PopTypeCosts::compute_all(&definitions, &market, &config);
        let modifiers = CountryModifiers {
            min_tariff: Fixed::from_int(-1),
            max_tariff: Fixed::ONE,
            ..CountryModifiers::default()
        };
        economy.update_country_budget(&modifiers, &census(0, 0, definitions.pop_types.len()), &definitions, &costs, &config);

        economy.set_tariff_rate_slider_value(Fixed::from_f64(0.25));
        assert_eq!(economy.apply_tariff(Fixed::from_int(8)), Fixed::from_int(2));
        assert_eq!(economy.actual_tariff_income(), Fixed::from_int(2));

        economy.set_tariff_rate_slider_value(Fixed::from_f64(-0.25));
        assert_eq!(economy.apply_tariff(Fixed::from_int(8)), Fixed::ZERO);
        economy.roll_over_imports();
        assert_eq!(economy.yesterdays_import_value(), Fixed::from_int(16));
        assert_eq!(
            economy.projected_spending(SpendingCategory::ImportSubsidies),
            Fixed::from_int(4)
        );
        assert_eq!(economy.net_tariff_balance(), Fixed::from_int(2));
    }
}
