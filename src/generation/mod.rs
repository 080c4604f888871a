//! # Generation Module
//!
//! Procedural assembly of bot inventories.
//!
//! The submodules each build one part of a loadout: base equipment, weapons
//! with their mod trees, ammunition and magazines, and loose loot. The
//! [`BotInventoryGenerator`] drives them in order for one spawn request.
//!
//! Everything here is data-driven: a [`BotTemplate`] supplies the per-role
//! pools and chances, a [`GenerationConfig`] the process-wide tuning, and the
//! [`crate::ItemCatalog`] the item definitions. None of these are mutated
//! during a generation pass.

pub mod ammo;
pub mod equipment;
pub mod inventory;
pub mod loot;
pub mod mods;
pub mod weapon;

pub use ammo::*;
pub use equipment::*;
pub use inventory::*;
pub use loot::*;
pub use mods::*;
pub use weapon::*;

use crate::{
    EquipmentSlot, ItemCatalog, PresetBook, QuartermasterError, QuartermasterResult,
    RootTemplates, TemplateId, WeightedTable,
};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Weapon durability ranges of one role class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponDurability {
    pub lowest_max: u32,
    pub highest_max: u32,
    pub min_delta: u32,
    pub max_delta: u32,
    /// Current durability never drops below this share of the maximum
    pub min_limit_percent: u32,
}

/// Armor durability ranges of one role class, relative to the template
/// maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmorDurability {
    pub lowest_max_percent: u32,
    pub highest_max_percent: u32,
    pub min_delta: u32,
    pub max_delta: u32,
    pub min_limit_percent: u32,
}

/// Durability profile for one role class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurabilityProfile {
    pub weapon: WeaponDurability,
    pub armor: ArmorDurability,
}

impl Default for DurabilityProfile {
    fn default() -> Self {
        Self {
            weapon: WeaponDurability {
                lowest_max: 60,
                highest_max: 100,
                min_delta: 0,
                max_delta: 25,
                min_limit_percent: 50,
            },
            armor: ArmorDurability {
                lowest_max_percent: 90,
                highest_max_percent: 100,
                min_delta: 0,
                max_delta: 10,
                min_limit_percent: 50,
            },
        }
    }
}

/// How far a consumable's resource may be drawn down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRoll {
    /// Chance the item spawns with its full resource
    pub chance_max_resource_percent: u32,
    /// Largest reduction, as a share of the maximum
    pub resource_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRandomization {
    pub meds: ResourceRoll,
    pub food: ResourceRoll,
}

impl Default for ResourceRandomization {
    fn default() -> Self {
        Self {
            meds: ResourceRoll {
                chance_max_resource_percent: 70,
                resource_percent: 60,
            },
            food: ResourceRoll {
                chance_max_resource_percent: 60,
                resource_percent: 50,
            },
        }
    }
}

/// Allow/deny lists of the catalog-wide loot pool used by high-value roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicLootLists {
    /// Template or class ids
    #[serde(default)]
    pub whitelist: Vec<TemplateId>,
    #[serde(default)]
    pub blacklist: Vec<TemplateId>,
}

/// Process-wide generation settings.
///
/// Every field has a serde default, so a configuration file only needs to
/// name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Template ids of the five root containers
    pub root_templates: RootTemplates,
    /// Durability profiles by role, with a `default` entry
    pub durability: BTreeMap<String, DurabilityProfile>,
    /// Cartridges a role must not spawn with
    pub cartridge_blacklist: BTreeMap<String, Vec<TemplateId>>,
    pub dynamic_loot: DynamicLootLists,
    /// Per role: template or class id to maximum spawned count
    pub item_spawn_limits: BTreeMap<String, BTreeMap<TemplateId, u32>>,
    pub spawn_limit_retry_budget: u32,
    /// Per role and loot category: rouble ceiling
    pub loot_value_ceiling: BTreeMap<String, BTreeMap<LootCategory, u64>>,
    /// Averaging count for loot draws
    pub loot_n_value: u32,
    pub secure_container_ammo_stack_count: u32,
    /// Currency template to weighted stack sizes
    pub currency_stack_sizes: BTreeMap<TemplateId, WeightedTable<u32>>,
    pub resource_randomization: ResourceRandomization,
    pub force_armored_rig_without_armor: bool,
    pub max_mod_depth: usize,
}

impl GenerationConfig {
    /// Creates the default configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use quartermaster::GenerationConfig;
    ///
    /// let config = GenerationConfig::new();
    /// assert_eq!(config.loot_n_value, 3);
    /// assert!(config.durability.contains_key("default"));
    /// ```
    pub fn new() -> Self {
        let mut durability = BTreeMap::new();
        durability.insert(
            DEFAULT_DURABILITY_PROFILE.to_string(),
            DurabilityProfile::default(),
        );

        Self {
            root_templates: RootTemplates::default(),
            durability,
            cartridge_blacklist: BTreeMap::new(),
            dynamic_loot: DynamicLootLists::default(),
            item_spawn_limits: BTreeMap::new(),
            spawn_limit_retry_budget: 5,
            loot_value_ceiling: BTreeMap::new(),
            loot_n_value: 3,
            secure_container_ammo_stack_count: 20,
            currency_stack_sizes: BTreeMap::new(),
            resource_randomization: ResourceRandomization::default(),
            force_armored_rig_without_armor: false,
            max_mod_depth: 10,
        }
    }

    /// Creates a configuration for tests: fewer secure container stacks and
    /// no resource randomization.
    pub fn for_testing() -> Self {
        let mut config = Self::new();
        config.secure_container_ammo_stack_count = 2;
        config.resource_randomization.meds.chance_max_resource_percent = 100;
        config.resource_randomization.food.chance_max_resource_percent = 100;
        config
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> QuartermasterResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> QuartermasterResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Checks cross-field constraints serde cannot express.
    pub fn validate(&self) -> QuartermasterResult<()> {
        if !self.durability.contains_key(DEFAULT_DURABILITY_PROFILE) {
            return Err(QuartermasterError::Configuration(
                "durability profiles need a `default` entry".to_string(),
            ));
        }
        if self.loot_n_value == 0 {
            return Err(QuartermasterError::Configuration(
                "loot_n_value must be at least 1".to_string(),
            ));
        }
        for (role, profile) in &self.durability {
            if profile.weapon.lowest_max > profile.weapon.highest_max
                || profile.armor.lowest_max_percent > profile.armor.highest_max_percent
                || profile.weapon.min_delta > profile.weapon.max_delta
                || profile.armor.min_delta > profile.armor.max_delta
            {
                return Err(QuartermasterError::Configuration(format!(
                    "durability profile {} has an inverted range",
                    role
                )));
            }
        }
        Ok(())
    }

    /// Durability profile for a role, falling back to `default`.
    pub fn durability_for(&self, role: &str) -> DurabilityProfile {
        self.durability
            .get(role)
            .or_else(|| self.durability.get(DEFAULT_DURABILITY_PROFILE))
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Key of the fallback durability profile.
pub const DEFAULT_DURABILITY_PROFILE: &str = "default";

/// Spawn chances of one role, in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnChances {
    #[serde(default)]
    pub equipment: BTreeMap<EquipmentSlot, u32>,
    /// Keyed by mod slot name
    #[serde(default)]
    pub weapon_mods: BTreeMap<String, u32>,
    #[serde(default)]
    pub equipment_mods: BTreeMap<String, u32>,
}

/// Candidate mods: parent template → slot name → template ids.
pub type ModPool = BTreeMap<TemplateId, BTreeMap<String, Vec<TemplateId>>>;

/// Loot item lists of one role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LootItemLists {
    #[serde(default)]
    pub backpack: WeightedTable,
    #[serde(default)]
    pub pockets: WeightedTable,
    #[serde(default)]
    pub tactical_vest: WeightedTable,
    #[serde(default)]
    pub secured_container: WeightedTable,
    #[serde(default)]
    pub special_loot: WeightedTable,
}

/// Inclusive count range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: u32,
    pub max: u32,
}

impl MinMax {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

/// Item count ranges of one role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationRanges {
    pub special: MinMax,
    pub healing: MinMax,
    pub drugs: MinMax,
    pub stimulants: MinMax,
    pub grenades: MinMax,
    pub backpack_loot: MinMax,
    pub vest_loot: MinMax,
    pub pocket_loot: MinMax,
    pub magazines: MinMax,
}

/// Everything that varies per bot role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotTemplate {
    pub role: String,
    #[serde(default)]
    pub chances: SpawnChances,
    /// Weighted candidates per equipment slot, weapon slots included
    #[serde(default)]
    pub equipment: BTreeMap<EquipmentSlot, WeightedTable>,
    #[serde(default)]
    pub mods: ModPool,
    /// Caliber to weighted cartridge table
    #[serde(default)]
    pub ammo: BTreeMap<String, WeightedTable>,
    #[serde(default)]
    pub items: LootItemLists,
    #[serde(default)]
    pub generation: GenerationRanges,
}

impl BotTemplate {
    /// Parses a role template from JSON.
    pub fn from_json(json: &str) -> QuartermasterResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads either a single template or an array of templates.
    pub fn load_all(path: impl AsRef<Path>) -> QuartermasterResult<Vec<Self>> {
        let json = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        if value.is_array() {
            Ok(serde_json::from_value(value)?)
        } else {
            Ok(vec![serde_json::from_value(value)?])
        }
    }

    /// Spawn chance of an equipment slot; absent entries never spawn.
    pub fn equipment_chance(&self, slot: EquipmentSlot) -> u32 {
        self.chances.equipment.get(&slot).copied().unwrap_or(0)
    }
}

/// One spawn request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub role: String,
    #[serde(default)]
    pub is_high_value: bool,
    #[serde(default)]
    pub level: u32,
}

impl GenerationRequest {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            is_high_value: false,
            level: 1,
        }
    }

    pub fn high_value(mut self) -> Self {
        self.is_high_value = true;
        self
    }
}

/// Read-only inputs shared by every step of one bot's generation.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub catalog: &'a ItemCatalog,
    pub presets: &'a PresetBook,
    pub template: &'a BotTemplate,
    pub config: &'a GenerationConfig,
    pub request: &'a GenerationRequest,
}

impl GenerationContext<'_> {
    pub fn role(&self) -> &str {
        &self.request.role
    }
}

/// Trait for procedural generators.
pub trait Generator<T> {
    /// Generates content for one request.
    fn generate(&self, request: &GenerationRequest, rng: &mut StdRng) -> QuartermasterResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T) -> QuartermasterResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Utility functions for generation.
pub mod utils {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Creates a seeded random number generator, or an entropy-seeded one
    /// when no seed is given.
    pub fn create_rng(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
