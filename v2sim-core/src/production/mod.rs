pub mod artisan;
pub mod rgo;

pub use artisan::ArtisanalProducer;
pub use rgo::ResourceGatheringOperation;

use crate::fixed::Fixed;
use crate::goods::GoodId;
use crate::population::PopTypeId;
use serde::{Deserialize, Serialize};

#[derive(
    Hash, Eq, PartialEq, Clone, Copy, Debug, Default, Serialize, Deserialize, PartialOrd, Ord,
)]
pub struct ProductionTypeId(pub u16);

impl ProductionTypeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    /// Run by a single pop from its own stockpile.
    Artisan,
    Factory,
    /// Resource gathering operation, one per province.
    Rgo,
}

/// Static recipe: inputs consumed and output produced per base workforce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionTypeDefinition {
    pub id: ProductionTypeId,
    pub identifier: String,
    pub template: TemplateType,
    pub output_good: GoodId,
    pub base_output_quantity: Fixed,
    pub base_workforce_size: u32,
    pub input_goods: Vec<(GoodId, Fixed)>,
    /// Pop types that can be employed.
    pub jobs: Vec<PopTypeId>,
}

impl ProductionTypeDefinition {
    /// Output per day for `workers` at full input supply.
    pub fn output_for_workforce(&self, workers: u32) -> Fixed {
        if self.base_workforce_size == 0 {
            return Fixed::ZERO;
        }
        self.base_output_quantity
            .mul_int(workers as i64)
            .div_int(self.base_workforce_size as i64)
    }

    /// Input quantities per day for `workers`.
    pub fn inputs_for_workforce(&self, workers: u32) -> impl Iterator<Item = (GoodId, Fixed)> + '_ {
        let workforce = self.base_workforce_size.max(1) as i64;
        self.input_goods
            .iter()
            .map(move |&(good, quantity)| (good, quantity.mul_int(workers as i64).div_int(workforce)))
    }
}
