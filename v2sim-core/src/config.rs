use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};

/// Simulation configuration.
///
/// Every section defaults independently, so a scenario file only needs to
/// mention the values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Compute checksum every N ticks (0 = disabled).
    ///
    /// Recommended values:
    /// - `1`: Every tick (safest)
    /// - `30`: Every month (balanced)
    /// - `365`: Every year (lowest overhead)
    pub checksum_frequency: u32,

    /// Worker threads for the parallel province phase (0 = one per core).
    pub worker_threads: usize,

    pub rules: GameRules,
    pub country: CountryDefines,
    pub economy: EconomyDefines,
    pub pops: PopsDefines,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            // Default to monthly checksums (30 ticks)
            checksum_frequency: 30,
            worker_threads: 0,
            rules: GameRules::default(),
            country: CountryDefines::default(),
            economy: EconomyDefines::default(),
            pops: PopsDefines::default(),
        }
    }
}

/// Where artisans report the demand for their production inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtisanalInputDemandCategory {
    /// Counted alongside factory input demand.
    #[default]
    FactoryNeeds,
    /// Counted alongside pop need demand.
    PopNeeds,
    /// Not reported at all.
    None,
}

/// Behavioural switches that change economy rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Prices move by a fraction of the current price instead of a flat 0.01.
    pub use_exponential_price_changes: bool,
    /// Settle at the lowest price that still clears supply.
    pub use_optimal_pricing: bool,
    pub prevent_negative_administration_efficiency: bool,
    pub artisanal_input_demand_category: ArtisanalInputDemandCategory,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            use_exponential_price_changes: false,
            use_optimal_pricing: true,
            prevent_negative_administration_efficiency: false,
            artisanal_input_demand_category: ArtisanalInputDemandCategory::FactoryNeeds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CountryDefines {
    #[serde(with = "crate::fixed::decimal")]
    pub base_country_tax_efficiency: Fixed,
    /// Cash credited per unit of gold mined by RGOs.
    #[serde(with = "crate::fixed::decimal")]
    pub gold_to_cash_rate: Fixed,
    /// Price multiplier applied when money goods are sold.
    #[serde(with = "crate::fixed::decimal")]
    pub gold_to_worker_pay_rate: Fixed,
}

impl Default for CountryDefines {
    fn default() -> Self {
        Self {
            base_country_tax_efficiency: Fixed::from_f64(0.1),
            gold_to_cash_rate: Fixed::from_f64(0.2),
            gold_to_worker_pay_rate: Fixed::from_f64(0.5),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyDefines {
    #[serde(with = "crate::fixed::decimal")]
    pub minimum_army_spending_slider_value: Fixed,
    #[serde(with = "crate::fixed::decimal")]
    pub minimum_navy_spending_slider_value: Fixed,
    #[serde(with = "crate::fixed::decimal")]
    pub minimum_construction_spending_slider_value: Fixed,
}

impl Default for EconomyDefines {
    fn default() -> Self {
        Self {
            minimum_army_spending_slider_value: Fixed::from_f64(0.1),
            minimum_navy_spending_slider_value: Fixed::from_f64(0.1),
            minimum_construction_spending_slider_value: Fixed::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopsDefines {
    /// Share of non-colonial population that should be administrators.
    #[serde(with = "crate::fixed::decimal")]
    pub desired_administrator_percentage: Fixed,
    /// Multiplier on need quantities when pricing salary bases.
    #[serde(with = "crate::fixed::decimal")]
    pub base_goods_demand: Fixed,
}

impl Default for PopsDefines {
    fn default() -> Self {
        Self {
            desired_administrator_percentage: Fixed::from_f64(0.01),
            base_goods_demand: Fixed::ONE,
        }
    }
}
