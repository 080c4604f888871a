//! # Item Properties
//!
//! Runtime state attached to a generated item. Each variant carries only the
//! fields that make sense for one kind of item, so a cartridge can never end
//! up with a fire mode.

use serde::{Deserialize, Serialize};

/// Mutable properties of one generated item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ItemProperties {
    /// Stackable items: cartridges, money, loose ammo
    Stack { count: u32 },
    /// Firearms
    Weapon {
        durability: u32,
        max_durability: u32,
        #[serde(default)]
        fire_mode: Option<String>,
        #[serde(default)]
        folded: Option<bool>,
    },
    /// Armor and other wearables that lose durability
    Repairable { durability: u32, max_durability: u32 },
    /// Folding stocks and similar mods
    Foldable { folded: bool },
    /// Medkits
    Medical { hp_resource: u32 },
    /// Food and drink
    FoodDrink { resource: u32 },
    /// Flashlights and laser devices
    Light { active: bool, mode: u32 },
}

impl ItemProperties {
    /// Creates a stack of `count`.
    pub fn stack(count: u32) -> Self {
        ItemProperties::Stack { count }
    }

    /// Stack count, if this is a stack.
    pub fn stack_count(&self) -> Option<u32> {
        match self {
            ItemProperties::Stack { count } => Some(*count),
            _ => None,
        }
    }

    /// `(current, max)` durability for weapons and repairables.
    pub fn durability(&self) -> Option<(u32, u32)> {
        match self {
            ItemProperties::Weapon {
                durability,
                max_durability,
                ..
            }
            | ItemProperties::Repairable {
                durability,
                max_durability,
            } => Some((*durability, *max_durability)),
            _ => None,
        }
    }
}
