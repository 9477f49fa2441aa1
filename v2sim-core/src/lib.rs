//! # Victoria-style Economy Core
//!
//! Deterministic daily economy for a grand-strategy game: country budgets,
//! pop needs and wages, resource gathering, artisans, and a shared market.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ CountryEcon. │────▶│  Provinces   │────▶│    Market    │
//! │ (waterfall)  │     │ (par_iter)   │     │  (settle)    │
//! └──────▲───────┘     └──────┬───────┘     └──────┬───────┘
//!        │    EconomyReporter │                    │
//!        └────────────────────┴────────────────────┘
//!                    PurchaseSink / SaleSink
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Simulation`] | Owns the world and runs [`TickPhase`]s in order |
//! | [`WorldState`] | Countries, provinces, market and definitions |
//! | [`CountryEconomy`] | Treasury, sliders, budget waterfall, national stockpile |
//! | [`EconomyReporter`] | Thread-safe production and consumption reporting |
//! | [`Market`] | Per-good buy-up-to and sell orders, cleared once a day |
//! | [`Fixed`] | Deterministic fixed-point arithmetic |
//!
//! Scenarios are loaded from JSON through [`Scenario`].

pub mod allocation;
pub mod bounded;
pub mod config;
pub mod country;
pub mod defines;
pub mod definitions;
pub mod error;
pub mod fixed;
pub mod goods;
pub mod history;
pub mod market;
pub mod metrics;
pub mod modifiers;
pub mod population;
pub mod production;
pub mod profiling;
pub mod province;
pub mod scenario;
pub mod state;
pub mod testing;
pub mod tick;

#[cfg(test)]
mod tick_tests;

pub use allocation::{water_fill, FillCandidate, FillOutcome};
pub use bounded::ClampedValue;
pub use config::SimConfig;
pub use country::{BudgetViolation, Country, CountryEconomy, CountryId, EconomyReporter, SpendingCategory};
pub use definitions::Definitions;
pub use error::SimError;
pub use fixed::{AtomicFixed, Fixed};
pub use goods::{GoodDefinition, GoodId};
pub use history::ValueHistory;
pub use market::{Market, MarketAccess, Trader};
pub use metrics::SimMetrics;
pub use modifiers::CountryModifiers;
pub use population::{NeedCategory, Pop, PopTypeId, StrataId};
pub use province::{Province, ProvinceId};
pub use scenario::Scenario;
pub use state::{Date, WorldState};
pub use tick::{Simulation, TickPhase};
