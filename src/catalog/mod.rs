//! # Item Template Catalog
//!
//! Read-only access to the item database the generators draw from.
//!
//! The catalog is external data: it is deserialized once (see
//! [`ItemCatalog::from_json`]) and never mutated during generation. Templates
//! form a class hierarchy through their `parent` field; slot filters and
//! blacklists may name either a concrete template or any ancestor class, so
//! every compatibility check goes through [`ItemCatalog::is_of_class`].

pub mod presets;

pub use presets::*;

use crate::{EquipmentSlot, QuartermasterError, QuartermasterResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Identifier of an item template or class node.
pub type TemplateId = String;

/// Broad structural category of a template.
///
/// Generators branch on this instead of on class ids, so the catalog only has
/// to tag each template once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ItemCategory {
    /// Abstract class node, never spawned
    Node,
    Weapon,
    Mod,
    Magazine,
    Ammo,
    AmmoBox,
    Headwear,
    Earpiece,
    FaceCover,
    ArmorVest,
    Eyewear,
    ArmBand,
    TacticalVest,
    Pockets,
    Backpack,
    SecureContainer,
    Melee,
    Grenade,
    Medical,
    Drug,
    Stimulant,
    FoodDrink,
    Money,
    Key,
    Barter,
    Container,
    Stash,
    #[default]
    Other,
}

/// How a weapon is reloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReloadMode {
    /// Detachable magazine in `mod_magazine`
    #[default]
    ExternalMagazine,
    /// Fixed tube or box, loaded round by round
    InternalMagazine,
    /// Rounds go straight into the chamber(s)
    OnlyBarrel,
}

/// Accept/deny filter of a slot or container grid.
///
/// Entries are template or class ids. An empty whitelist accepts anything
/// that is not blacklisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotFilter {
    #[serde(default)]
    pub whitelist: Vec<TemplateId>,
    #[serde(default)]
    pub blacklist: Vec<TemplateId>,
}

/// A typed attachment point on a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub filter: SlotFilter,
    /// Stack capacity, only meaningful for magazine cartridge slots
    #[serde(default)]
    pub max_count: Option<u32>,
}

impl SlotDefinition {
    /// Creates an optional slot with an accept-anything filter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            filter: SlotFilter::default(),
            max_count: None,
        }
    }

    /// Marks the slot as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Restricts the slot to the given template or class ids.
    pub fn accepting<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TemplateId>,
    {
        self.filter.whitelist = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the cartridge capacity.
    pub fn with_max_count(mut self, max_count: u32) -> Self {
        self.max_count = Some(max_count);
        self
    }
}

/// One storage grid of a container template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDefinition {
    pub name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub filter: SlotFilter,
}

impl GridDefinition {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            filter: SlotFilter::default(),
        }
    }
}

/// Footprint growth an attached mod adds to its root item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraSize {
    #[serde(default)]
    pub left: u32,
    #[serde(default)]
    pub right: u32,
    #[serde(default)]
    pub up: u32,
    #[serde(default)]
    pub down: u32,
    /// Forced growth stacks with other mods instead of taking the maximum
    #[serde(default)]
    pub force_add: bool,
}

/// Cartridges bundled inside an ammo box template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmoBoxContents {
    pub ammo: TemplateId,
    pub count: u32,
}

fn one() -> u32 {
    1
}

/// Immutable catalog entry for one item type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTemplate {
    pub id: TemplateId,
    #[serde(default)]
    pub name: String,
    /// Class node this template derives from
    #[serde(default)]
    pub parent: Option<TemplateId>,
    #[serde(default)]
    pub category: ItemCategory,
    #[serde(default = "one")]
    pub width: u32,
    #[serde(default = "one")]
    pub height: u32,
    #[serde(default)]
    pub extra_size: ExtraSize,
    #[serde(default)]
    pub slots: Vec<SlotDefinition>,
    /// Chamber slots of a weapon, e.g. `patron_in_weapon`
    #[serde(default)]
    pub chambers: Vec<SlotDefinition>,
    /// Cartridge slot of a box magazine
    #[serde(default)]
    pub cartridges: Option<SlotDefinition>,
    #[serde(default)]
    pub grids: Vec<GridDefinition>,
    #[serde(default = "one")]
    pub stack_max_size: u32,
    #[serde(default = "one")]
    pub stack_min_random: u32,
    #[serde(default)]
    pub max_durability: Option<u32>,
    #[serde(default)]
    pub caliber: Option<String>,
    #[serde(default)]
    pub default_ammo: Option<TemplateId>,
    #[serde(default)]
    pub default_magazine: Option<TemplateId>,
    #[serde(default)]
    pub reload_mode: ReloadMode,
    #[serde(default)]
    pub fire_modes: Vec<String>,
    #[serde(default)]
    pub foldable: bool,
    /// Rig with built-in protection
    #[serde(default)]
    pub armored: bool,
    /// Medical hp resource or food/drink resource
    #[serde(default)]
    pub max_resource: Option<u32>,
    #[serde(default)]
    pub light: bool,
    /// Equipment slots this item makes unusable
    #[serde(default)]
    pub blocks: Vec<EquipmentSlot>,
    #[serde(default)]
    pub conflicting_items: Vec<TemplateId>,
    #[serde(default)]
    pub ammo_box: Option<AmmoBoxContents>,
    /// Reference price in roubles
    #[serde(default)]
    pub price: u64,
}

impl ItemTemplate {
    /// Creates a 1x1 template with every optional property unset.
    pub fn new(id: impl Into<TemplateId>, category: ItemCategory) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            parent: None,
            category,
            width: 1,
            height: 1,
            extra_size: ExtraSize::default(),
            slots: Vec::new(),
            chambers: Vec::new(),
            cartridges: None,
            grids: Vec::new(),
            stack_max_size: 1,
            stack_min_random: 1,
            max_durability: None,
            caliber: None,
            default_ammo: None,
            default_magazine: None,
            reload_mode: ReloadMode::ExternalMagazine,
            fire_modes: Vec::new(),
            foldable: false,
            armored: false,
            max_resource: None,
            light: false,
            blocks: Vec::new(),
            conflicting_items: Vec::new(),
            ammo_box: None,
            price: 0,
        }
    }

    pub fn is_ammo(&self) -> bool {
        self.category == ItemCategory::Ammo
    }

    pub fn is_ammo_box(&self) -> bool {
        self.category == ItemCategory::AmmoBox
    }

    pub fn is_magazine(&self) -> bool {
        self.category == ItemCategory::Magazine
    }

    pub fn is_weapon(&self) -> bool {
        self.category == ItemCategory::Weapon
    }

    pub fn is_grenade(&self) -> bool {
        self.category == ItemCategory::Grenade
    }

    pub fn is_medical(&self) -> bool {
        self.category == ItemCategory::Medical
    }

    pub fn is_drug(&self) -> bool {
        self.category == ItemCategory::Drug
    }

    pub fn is_stimulant(&self) -> bool {
        self.category == ItemCategory::Stimulant
    }

    pub fn is_money(&self) -> bool {
        self.category == ItemCategory::Money
    }

    pub fn is_node(&self) -> bool {
        self.category == ItemCategory::Node
    }

    /// Cylinder magazines hold one round per `camora` slot instead of a
    /// shared cartridge stack.
    pub fn is_cylinder_magazine(&self) -> bool {
        self.is_magazine() && self.slots.iter().any(|slot| slot.name.starts_with("camora"))
    }

    /// Cartridge capacity of a magazine, camoras included.
    pub fn magazine_capacity(&self) -> u32 {
        if self.is_cylinder_magazine() {
            return self
                .slots
                .iter()
                .filter(|slot| slot.name.starts_with("camora"))
                .count() as u32;
        }
        self.cartridges
            .as_ref()
            .and_then(|slot| slot.max_count)
            .unwrap_or(0)
    }

    /// Finds an attachment slot by name across slots, chambers and the
    /// cartridge slot.
    pub fn find_slot(&self, name: &str) -> Option<&SlotDefinition> {
        self.slots
            .iter()
            .chain(self.chambers.iter())
            .chain(self.cartridges.iter())
            .find(|slot| slot.name == name)
    }

    /// Whether this item blocks the given equipment slot.
    pub fn blocks_slot(&self, slot: EquipmentSlot) -> bool {
        self.blocks.contains(&slot)
    }
}

/// Read-only template lookup with class-hierarchy queries.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    templates: HashMap<TemplateId, ItemTemplate>,
}

impl ItemCatalog {
    /// Builds a catalog from templates. Later duplicates replace earlier ones.
    pub fn new(templates: impl IntoIterator<Item = ItemTemplate>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|template| (template.id.clone(), template))
                .collect(),
        }
    }

    /// Parses a JSON array of templates.
    ///
    /// # Examples
    ///
    /// ```
    /// use quartermaster::ItemCatalog;
    ///
    /// let catalog = ItemCatalog::from_json(
    ///     r#"[{"id": "ammo_545", "category": "Ammo", "stack_max_size": 60}]"#,
    /// ).unwrap();
    /// assert_eq!(catalog.get("ammo_545").unwrap().stack_max_size, 60);
    /// ```
    pub fn from_json(json: &str) -> QuartermasterResult<Self> {
        let templates: Vec<ItemTemplate> = serde_json::from_str(json)?;
        Ok(Self::new(templates))
    }

    /// Reads and parses a catalog file.
    pub fn load(path: impl AsRef<Path>) -> QuartermasterResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Looks up a template.
    pub fn get(&self, id: &str) -> Option<&ItemTemplate> {
        self.templates.get(id)
    }

    /// Looks up a template, treating absence as a data error.
    pub fn require(&self, id: &str) -> QuartermasterResult<&ItemTemplate> {
        self.get(id)
            .ok_or_else(|| QuartermasterError::UnknownTemplate(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// All templates, in no particular order.
    pub fn templates(&self) -> impl Iterator<Item = &ItemTemplate> {
        self.templates.values()
    }

    /// Whether `id` is `class_id` or derives from it.
    ///
    /// The walk is bounded by the catalog size so a malformed cyclic
    /// hierarchy cannot hang generation.
    pub fn is_of_class(&self, id: &str, class_id: &str) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(node) = current {
            if node == class_id {
                return true;
            }
            steps += 1;
            if steps > self.templates.len() {
                return false;
            }
            current = self
                .templates
                .get(node)
                .and_then(|template| template.parent.as_deref());
        }
        false
    }

    /// Whether `id` matches any entry of `ids` by template or class.
    pub fn matches_any(&self, id: &str, ids: &[TemplateId]) -> bool {
        ids.iter().any(|class_id| self.is_of_class(id, class_id))
    }

    /// Whether a filter accepts the template.
    pub fn filter_accepts(&self, filter: &SlotFilter, id: &str) -> bool {
        if self.matches_any(id, &filter.blacklist) {
            return false;
        }
        filter.whitelist.is_empty() || self.matches_any(id, &filter.whitelist)
    }

    /// Whether a slot accepts the template.
    pub fn slot_accepts(&self, slot: &SlotDefinition, id: &str) -> bool {
        self.filter_accepts(&slot.filter, id)
    }

    /// Caliber of a weapon: its own, else the one of its default ammo.
    pub fn weapon_caliber(&self, weapon: &ItemTemplate) -> Option<String> {
        weapon.caliber.clone().or_else(|| {
            weapon
                .default_ammo
                .as_deref()
                .and_then(|ammo| self.get(ammo))
                .and_then(|ammo| ammo.caliber.clone())
        })
    }
}
