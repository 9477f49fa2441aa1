//! Country modifier totals that feed the budget.
//!
//! Values are the summed effect of every active modifier (events, techs,
//! reforms). A zero maximum means "no modifier" and is read as 1 by the
//! slider code. All values use [`Fixed`] for deterministic simulation.

use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountryModifiers {
    #[serde(with = "crate::fixed::decimal")]
    pub min_tax: Fixed,
    #[serde(with = "crate::fixed::decimal")]
    pub max_tax: Fixed,
    #[serde(with = "crate::fixed::decimal")]
    pub min_social_spending: Fixed,
    #[serde(with = "crate::fixed::decimal")]
    pub max_social_spending: Fixed,
    #[serde(with = "crate::fixed::decimal")]
    pub min_military_spending: Fixed,
    #[serde(with = "crate::fixed::decimal")]
    pub max_military_spending: Fixed,
    /// Tariff bounds have no implicit maximum; both zero pins tariffs at zero.
    #[serde(with = "crate::fixed::decimal")]
    pub min_tariff: Fixed,
    #[serde(with = "crate::fixed::decimal")]
    pub max_tariff: Fixed,

    /// Added to the base tax efficiency.
    #[serde(with = "crate::fixed::decimal")]
    pub tax_efficiency: Fixed,
    /// Percentage form of tax efficiency (10 = +0.1).
    #[serde(with = "crate::fixed::decimal")]
    pub tax_eff: Fixed,

    /// Applied as: (1 + modifier) on administrator count.
    #[serde(with = "crate::fixed::decimal")]
    pub administrative_efficiency: Fixed,
    /// Applied as: (1 + modifier) on the resulting efficiency.
    #[serde(with = "crate::fixed::decimal")]
    pub administrative_efficiency_modifier: Fixed,

    /// Pension paid per unit of social income base.
    #[serde(with = "crate::fixed::decimal")]
    pub pension_level: Fixed,
    /// Unemployment subsidy paid per unit of social income base.
    #[serde(with = "crate::fixed::decimal")]
    pub unemployment_benefit: Fixed,
}
