use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};

/// A slider value clamped to a Fixed-point range.
///
/// Used for the tax, spending and tariff sliders. Bounds are refreshed once per
/// tick from modifiers and the stored value is re-clamped immediately.
///
/// Bounds with `min > max` are legal. In that case the value can only sit on
/// one of the two bounds: requests above `max` land on `min`, everything else
/// lands on `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClampedValue {
    value: Fixed,
    min: Fixed,
    max: Fixed,
}

impl ClampedValue {
    pub fn new(min: Fixed, max: Fixed, value: Fixed) -> Self {
        let mut clamped = Self {
            value: Fixed::ZERO,
            min,
            max,
        };
        clamped.set(value);
        clamped
    }

    pub fn get(&self) -> Fixed {
        self.value
    }

    pub fn min(&self) -> Fixed {
        self.min
    }

    pub fn max(&self) -> Fixed {
        self.max
    }

    pub fn set(&mut self, value: Fixed) {
        self.value = if self.min <= self.max {
            value.max(self.min).min(self.max)
        } else if value > self.max {
            self.min
        } else {
            self.max
        };
    }

    pub fn set_bounds(&mut self, min: Fixed, max: Fixed) {
        self.min = min;
        self.max = max;
        self.set(self.value);
    }
}

/// Slider over the unit range with the given starting value.
pub fn unit_slider(value: Fixed) -> ClampedValue {
    ClampedValue::new(Fixed::ZERO, Fixed::ONE, value)
}
