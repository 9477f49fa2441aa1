//! Static game definitions shared by every country and province.
//!
//! Loaded once per scenario and never mutated during a tick. Each registry is
//! a `Vec` indexed by its id type; identifier lookups go through an
//! `FxHashMap` built at construction.

use crate::error::SimError;
use crate::goods::{GoodDefinition, GoodId};
use crate::population::{PopTypeDefinition, PopTypeId, StrataDefinition, StrataId};
use crate::production::{ProductionTypeDefinition, ProductionTypeId, TemplateType};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct Definitions {
    pub goods: Vec<GoodDefinition>,
    pub strata: Vec<StrataDefinition>,
    pub pop_types: Vec<PopTypeDefinition>,
    pub production_types: Vec<ProductionTypeDefinition>,
    good_by_identifier: FxHashMap<String, GoodId>,
    pop_type_by_identifier: FxHashMap<String, PopTypeId>,
    production_type_by_identifier: FxHashMap<String, ProductionTypeId>,
}

/// Checks that every entry's id matches its position and identifiers are unique.
fn index_registry<T, Id: Copy>(
    kind: &'static str,
    entries: &[T],
    id_of: impl Fn(&T) -> usize,
    identifier_of: impl Fn(&T) -> &str,
    make_id: impl Fn(usize) -> Id,
) -> Result<FxHashMap<String, Id>, SimError> {
    let mut by_identifier = FxHashMap::default();
    for (position, entry) in entries.iter().enumerate() {
        if id_of(entry) != position {
            return Err(SimError::InvalidScenario(format!(
                "{} '{}' has id {} but is at position {}",
                kind,
                identifier_of(entry),
                id_of(entry),
                position
            )));
        }
        if by_identifier
            .insert(identifier_of(entry).to_string(), make_id(position))
            .is_some()
        {
            return Err(SimError::DuplicateIdentifier {
                kind,
                identifier: identifier_of(entry).to_string(),
            });
        }
    }
    Ok(by_identifier)
}

impl Definitions {
    pub fn new(
        goods: Vec<GoodDefinition>,
        strata: Vec<StrataDefinition>,
        pop_types: Vec<PopTypeDefinition>,
        production_types: Vec<ProductionTypeDefinition>,
    ) -> Result<Self, SimError> {
        let good_by_identifier = index_registry(
            "good",
            &goods,
            |g| g.id.index(),
            |g| g.identifier.as_str(),
            |i| GoodId(i as u16),
        )?;
        index_registry(
            "strata",
            &strata,
            |s| s.id.index(),
            |s| s.identifier.as_str(),
            |i| StrataId(i as u8),
        )?;
        let pop_type_by_identifier = index_registry(
            "pop type",
            &pop_types,
            |p| p.id.index(),
            |p| p.identifier.as_str(),
            |i| PopTypeId(i as u16),
        )?;
        let production_type_by_identifier = index_registry(
            "production type",
            &production_types,
            |p| p.id.index(),
            |p| p.identifier.as_str(),
            |i| ProductionTypeId(i as u16),
        )?;

        for pop_type in &pop_types {
            if pop_type.strata.index() >= strata.len() {
                return Err(SimError::InvalidScenario(format!(
                    "pop type '{}' has unknown strata {}",
                    pop_type.identifier, pop_type.strata.0
                )));
            }
        }
        for production_type in &production_types {
            let goods_used = std::iter::once(production_type.output_good)
                .chain(production_type.input_goods.iter().map(|&(good, _)| good));
            for good in goods_used {
                if good.index() >= goods.len() {
                    return Err(SimError::InvalidScenario(format!(
                        "production type '{}' uses unknown good {}",
                        production_type.identifier, good.0
                    )));
                }
            }
        }

        Ok(Self {
            goods,
            strata,
            pop_types,
            production_types,
            good_by_identifier,
            pop_type_by_identifier,
            production_type_by_identifier,
        })
    }

    pub fn good(&self, id: GoodId) -> Option<&GoodDefinition> {
        self.goods.get(id.index())
    }

    pub fn strata(&self, id: StrataId) -> Option<&StrataDefinition> {
        self.strata.get(id.index())
    }

    pub fn pop_type(&self, id: PopTypeId) -> Option<&PopTypeDefinition> {
        self.pop_types.get(id.index())
    }

    pub fn production_type(&self, id: ProductionTypeId) -> Option<&ProductionTypeDefinition> {
        self.production_types.get(id.index())
    }

    pub fn good_by_identifier(&self, identifier: &str) -> Result<GoodId, SimError> {
        lookup("good", &self.good_by_identifier, identifier)
    }

    pub fn pop_type_by_identifier(&self, identifier: &str) -> Result<PopTypeId, SimError> {
        lookup("pop type", &self.pop_type_by_identifier, identifier)
    }

    pub fn production_type_by_identifier(&self, identifier: &str) -> Result<ProductionTypeId, SimError> {
        lookup("production type", &self.production_type_by_identifier, identifier)
    }

    pub fn artisan_production_types(&self) -> impl Iterator<Item = &ProductionTypeDefinition> {
        self.production_types
            .iter()
            .filter(|p| p.template == TemplateType::Artisan)
    }

    pub fn rgo_production_types(&self) -> impl Iterator<Item = &ProductionTypeDefinition> {
        self.production_types
            .iter()
            .filter(|p| p.template == TemplateType::Rgo)
    }
}

fn lookup<Id: Copy>(kind: &'static str, map: &FxHashMap<String, Id>, identifier: &str) -> Result<Id, SimError> {
    map.get(identifier)
        .copied()
        .ok_or_else(|| SimError::UnknownIdentifier {
            kind,
            identifier: identifier.to_string(),
        })
}
