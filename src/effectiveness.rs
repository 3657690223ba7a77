//! Combined damage multipliers for a creature's type combination.
//!
//! Each defending type contributes a [`DamageRelation`]. Relations are folded
//! into a [`MultiplierMap`] in the creature's type order, and within a relation
//! always as double, then half, then immunity. Immunity is absorbing: once an
//! attacker is immune it stays immune for the rest of the fold.

use std::collections::HashMap;
use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{DamageRelation, ElementalType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Multiplier {
    Immune,
    /// `2^n`
    Scaled(i8),
}

impl Multiplier {
    pub const NEUTRAL: Multiplier = Multiplier::Scaled(0);

    pub fn doubled(self) -> Self {
        match self {
            Self::Immune => Self::Immune,
            Self::Scaled(n) => Self::Scaled(n.saturating_add(1)),
        }
    }

    pub fn halved(self) -> Self {
        match self {
            Self::Immune => Self::Immune,
            Self::Scaled(n) => Self::Scaled(n.saturating_sub(1)),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Immune => 0.0,
            Self::Scaled(n) => 2f64.powi(n.into()),
        }
    }
}

impl Display for Multiplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.as_f64())
    }
}

/// Running multiplier per attacking type.
///
/// Invariant: an attacker absent from the map deals [`Multiplier::NEUTRAL`].
/// Iteration follows the order in which attackers were first mentioned.
#[derive(Clone, Debug, Default)]
pub struct MultiplierMap(IndexMap<ElementalType, Multiplier>);

impl MultiplierMap {
    pub fn get(&self, attacker: ElementalType) -> Multiplier {
        self.0
            .get(&attacker)
            .copied()
            .unwrap_or(Multiplier::NEUTRAL)
    }

    fn update(&mut self, attacker: ElementalType, f: impl FnOnce(Multiplier) -> Multiplier) {
        let current = self.0.entry(attacker).or_insert(Multiplier::NEUTRAL);
        *current = f(*current);
    }

    /// Folds one defending type's relation in. The three steps must stay in
    /// this order.
    pub fn apply(&mut self, relation: &DamageRelation) {
        for attacker in &relation.double_damage_from {
            self.update(*attacker, Multiplier::doubled);
        }
        for attacker in &relation.half_damage_from {
            self.update(*attacker, Multiplier::halved);
        }
        for attacker in &relation.no_damage_from {
            self.update(*attacker, |_| Multiplier::Immune);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementalType, Multiplier)> + '_ {
        self.0.iter().map(|(ty, multiplier)| (*ty, *multiplier))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivenessResult {
    pub quadruple_damage_to: Vec<ElementalType>,
    pub double_damage_to: Vec<ElementalType>,
    pub normal_damage_to: Vec<ElementalType>,
    pub half_damage_to: Vec<ElementalType>,
    pub quarter_damage_to: Vec<ElementalType>,
    pub no_damage_to: Vec<ElementalType>,
}

impl EffectivenessResult {
    pub fn is_empty(&self) -> bool {
        self.buckets().all(|(_, bucket)| bucket.is_empty())
    }

    /// The multiplier `attacker` was categorized under, if it was mentioned at all.
    pub fn multiplier_of(&self, attacker: ElementalType) -> Option<Multiplier> {
        self.buckets()
            .find(|(_, bucket)| bucket.contains(&attacker))
            .map(|(multiplier, _)| multiplier)
    }

    fn buckets(&self) -> impl Iterator<Item = (Multiplier, &Vec<ElementalType>)> {
        [
            (Multiplier::Scaled(2), &self.quadruple_damage_to),
            (Multiplier::Scaled(1), &self.double_damage_to),
            (Multiplier::Scaled(0), &self.normal_damage_to),
            (Multiplier::Scaled(-1), &self.half_damage_to),
            (Multiplier::Scaled(-2), &self.quarter_damage_to),
            (Multiplier::Immune, &self.no_damage_to),
        ]
        .into_iter()
    }

    fn bucket_mut(&mut self, multiplier: Multiplier) -> Option<&mut Vec<ElementalType>> {
        match multiplier {
            Multiplier::Scaled(2) => Some(&mut self.quadruple_damage_to),
            Multiplier::Scaled(1) => Some(&mut self.double_damage_to),
            Multiplier::Scaled(0) => Some(&mut self.normal_damage_to),
            Multiplier::Scaled(-1) => Some(&mut self.half_damage_to),
            Multiplier::Scaled(-2) => Some(&mut self.quarter_damage_to),
            Multiplier::Immune => Some(&mut self.no_damage_to),
            Multiplier::Scaled(_) => None,
        }
    }
}

impl TryFrom<MultiplierMap> for EffectivenessResult {
    type Error = EffectivenessError;

    fn try_from(map: MultiplierMap) -> Result<Self, Self::Error> {
        let mut result = EffectivenessResult::default();
        for (attacker, multiplier) in map.iter() {
            let Some(bucket) = result.bucket_mut(multiplier) else {
                return Err(EffectivenessError::UnexpectedMultiplier {
                    attacker,
                    multiplier,
                });
            };
            bucket.push(attacker);
        }

        Ok(result)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EffectivenessError {
    #[error("A creature needs at least one type")]
    NoTypes,
    #[error("No damage relations available for type {0}")]
    MissingRelation(ElementalType),
    #[error("Type {0} is listed more than once")]
    DuplicateType(ElementalType),
    #[error("{attacker} deals {multiplier}, which doesn't fit any damage category")]
    UnexpectedMultiplier {
        attacker: ElementalType,
        multiplier: Multiplier,
    },
}

pub fn calculate(
    types: &[ElementalType],
    relations: &HashMap<ElementalType, DamageRelation>,
) -> Result<EffectivenessResult, EffectivenessError> {
    if types.is_empty() {
        return Err(EffectivenessError::NoTypes);
    }

    let mut multipliers = MultiplierMap::default();
    for (i, ty) in types.iter().enumerate() {
        if types[..i].contains(ty) {
            return Err(EffectivenessError::DuplicateType(*ty));
        }
        let relation = relations
            .get(ty)
            .ok_or(EffectivenessError::MissingRelation(*ty))?;
        multipliers.apply(relation);
    }

    multipliers.try_into()
}
