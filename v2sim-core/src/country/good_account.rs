use crate::fixed::Fixed;
use crate::population::PopTypeId;
use crate::production::ProductionTypeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Origin of a need the national stockpile stocks up for.
///
/// Armies, navies and colonies live outside the economy core; their owners
/// report what they will consume before the next tick runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernmentNeedSource {
    Government,
    Army,
    Navy,
    OverseasMaintenance,
}

/// A country's record for one good: stockpile settings plus today's demand
/// and supply breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodAccountData {
    pub stockpile_amount: Fixed,
    pub stockpile_cutoff: Fixed,
    /// Raise the buy target to government needs automatically.
    pub is_automated: bool,
    pub is_selling: bool,

    pub stockpile_change_yesterday: Fixed,
    /// Positive when bought, negative when sold.
    pub quantity_traded_yesterday: Fixed,
    /// Positive when sold, negative when bought.
    pub money_traded_yesterday: Fixed,
    pub exported_amount: Fixed,
    /// Needs reported since the last budget tick, one per [`GovernmentNeedSource`].
    pub government_needs: Fixed,
    pub army_needs: Fixed,
    pub navy_needs: Fixed,
    pub overseas_maintenance: Fixed,
    pub factory_demand: Fixed,
    pub pop_demand: Fixed,
    pub available_amount: Fixed,
    pub need_consumption_per_pop_type: BTreeMap<PopTypeId, Fixed>,
    pub input_consumption_per_production_type: BTreeMap<ProductionTypeId, Fixed>,
    pub production_per_production_type: BTreeMap<ProductionTypeId, Fixed>,
}

impl Default for GoodAccountData {
    fn default() -> Self {
        Self {
            stockpile_amount: Fixed::ZERO,
            stockpile_cutoff: Fixed::ZERO,
            is_automated: true,
            is_selling: false,
            stockpile_change_yesterday: Fixed::ZERO,
            quantity_traded_yesterday: Fixed::ZERO,
            money_traded_yesterday: Fixed::ZERO,
            exported_amount: Fixed::ZERO,
            government_needs: Fixed::ZERO,
            army_needs: Fixed::ZERO,
            navy_needs: Fixed::ZERO,
            overseas_maintenance: Fixed::ZERO,
            factory_demand: Fixed::ZERO,
            pop_demand: Fixed::ZERO,
            available_amount: Fixed::ZERO,
            need_consumption_per_pop_type: BTreeMap::new(),
            input_consumption_per_production_type: BTreeMap::new(),
            production_per_production_type: BTreeMap::new(),
        }
    }
}

impl GoodAccountData {
    pub fn need_mut(&mut self, source: GovernmentNeedSource) -> &mut Fixed {
        match source {
            GovernmentNeedSource::Government => &mut self.government_needs,
            GovernmentNeedSource::Army => &mut self.army_needs,
            GovernmentNeedSource::Navy => &mut self.navy_needs,
            GovernmentNeedSource::OverseasMaintenance => &mut self.overseas_maintenance,
        }
    }

    /// Buy target floor for automated goods.
    pub fn total_government_needs(&self) -> Fixed {
        self.government_needs + self.army_needs + self.navy_needs + self.overseas_maintenance
    }

    /// Zeroes today's recorded values. Stockpile settings are kept.
    pub(crate) fn clear_daily_recorded_data(&mut self) {
        self.stockpile_change_yesterday = Fixed::ZERO;
        self.quantity_traded_yesterday = Fixed::ZERO;
        self.money_traded_yesterday = Fixed::ZERO;
        self.exported_amount = Fixed::ZERO;
        self.government_needs = Fixed::ZERO;
        self.army_needs = Fixed::ZERO;
        self.navy_needs = Fixed::ZERO;
        self.overseas_maintenance = Fixed::ZERO;
        self.factory_demand = Fixed::ZERO;
        self.pop_demand = Fixed::ZERO;
        self.available_amount = Fixed::ZERO;
        self.need_consumption_per_pop_type.clear();
        self.input_consumption_per_production_type.clear();
        self.production_per_production_type.clear();
    }

    pub fn total_production(&self) -> Fixed {
        self.production_per_production_type.values().copied().sum()
    }
}

/// Lock-guarded [`GoodAccountData`], one per (country, good).
#[derive(Debug, Default)]
pub struct GoodAccount {
    data: Mutex<GoodAccountData>,
}

impl GoodAccount {
    pub fn lock(&self) -> MutexGuard<'_, GoodAccountData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_mut(&mut self) -> &mut GoodAccountData {
        self.data.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> GoodAccountData {
        self.lock().clone()
    }
}
