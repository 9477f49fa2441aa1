//! Fixed economy constants.
//!
//! Tunable values live in [`crate::config::SimConfig`]; these are structural
//! constants the rest of the economy is written against.

/// Population constants
pub mod pops {
    /// Pop sizes are expressed per this many people when scaling needs and salaries.
    pub const SIZE_DENOMINATOR: i64 = 200_000;
}

/// Country budget constants
pub mod budget {
    /// Days of cash balance kept per country.
    pub const BALANCE_HISTORY_DAYS: usize = 30;
}

/// Market constants
pub mod market {
    /// Months of monthly price samples kept per good.
    pub const PRICE_HISTORY_MONTHS: usize = 36;

    /// Exponential pricing moves the price by at most `price >> SHIFT` per day.
    pub const EXPONENTIAL_PRICE_CHANGE_SHIFT: u32 = 7;

    /// Base price share used as the floor under linear pricing (22%).
    pub const LINEAR_MIN_PRICE_PERCENT: i64 = 22;

    /// Base price multiple used as the ceiling under linear pricing.
    pub const LINEAR_MAX_PRICE_MULTIPLE: i64 = 5;
}
