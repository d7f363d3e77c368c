// Unit consumables: dosing liquids and electrolyzer electrodes.

use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumableType {
    Algicide,
    Cl,
    Electrode,
    FilterDisinfection,
    Flocculant,
    PhMinus,
    PhPlus,
}

/// A consumable, tagged by GraphQL `__typename`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum Consumable {
    LiquidConsumable(LiquidConsumable),
    ElectrolyzerConsumable(ElectrolyzerConsumable),
}

impl Consumable {
    pub fn consumable_type(&self) -> ConsumableType {
        match self {
            Self::LiquidConsumable(c) => c.consumable_type,
            Self::ElectrolyzerConsumable(c) => c.consumable_type,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::LiquidConsumable(c) => &c.name,
            Self::ElectrolyzerConsumable(c) => &c.name,
        }
    }

    /// Any part of the consumable is running low.
    pub fn has_warning(&self) -> bool {
        match self {
            Self::LiquidConsumable(c) => c.canister.has_warning || c.tube.has_warning,
            Self::ElectrolyzerConsumable(c) => c.electrode.has_warning,
        }
    }
}

/// A dosed liquid: canister plus the tube feeding it to the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidConsumable {
    #[serde(rename = "type")]
    pub consumable_type: ConsumableType,
    pub name: String,
    pub canister: Canister,
    pub tube: Tube,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectrolyzerConsumable {
    #[serde(rename = "type")]
    pub consumable_type: ConsumableType,
    pub name: String,
    pub electrode: Electrode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Canister {
    /// Percent remaining.
    pub remaining: i32,
    pub has_warning: bool,
    /// Litres, when known.
    #[serde(default)]
    pub volume: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tube {
    pub remaining: i32,
    pub has_warning: bool,
    pub remaining_days: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Electrode {
    pub remaining: i32,
    /// Grams of chlorine produced over the past week.
    pub week_chlorine_production: f64,
    pub has_warning: bool,
}
