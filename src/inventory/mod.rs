//! # Inventory Module
//!
//! The bot inventory under assembly and the flat record it is finally
//! exported as.
//!
//! Items live in an arena ([`BotInventory`]) addressed by [`ItemHandle`]s.
//! Every item except the root containers has exactly one parent handle and
//! one slot id, and the parent→children index is maintained on insertion, so
//! nothing ever rescans the arena to find the contents of a slot.

pub mod properties;
pub mod tree;

pub use properties::*;
pub use tree::*;

use crate::{ContainerGrid, QuartermasterError, QuartermasterResult, TemplateId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Unique identifier of a generated item.
pub type ItemId = Uuid;

/// Creates an item id from the generation RNG, so a seed reproduces ids.
pub fn new_item_id<R: Rng + ?Sized>(rng: &mut R) -> ItemId {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

/// Opaque handle of an item inside one [`BotInventory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemHandle(u32);

impl ItemHandle {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Body slots of the equipment root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EquipmentSlot {
    Headwear,
    Earpiece,
    FaceCover,
    ArmorVest,
    Eyewear,
    ArmBand,
    TacticalVest,
    Pockets,
    Backpack,
    SecuredContainer,
    FirstPrimaryWeapon,
    SecondPrimaryWeapon,
    Holster,
    Scabbard,
}

impl EquipmentSlot {
    /// Slot id used on the equipment root's children.
    pub fn as_str(self) -> &'static str {
        match self {
            EquipmentSlot::Headwear => "Headwear",
            EquipmentSlot::Earpiece => "Earpiece",
            EquipmentSlot::FaceCover => "FaceCover",
            EquipmentSlot::ArmorVest => "ArmorVest",
            EquipmentSlot::Eyewear => "Eyewear",
            EquipmentSlot::ArmBand => "ArmBand",
            EquipmentSlot::TacticalVest => "TacticalVest",
            EquipmentSlot::Pockets => "Pockets",
            EquipmentSlot::Backpack => "Backpack",
            EquipmentSlot::SecuredContainer => "SecuredContainer",
            EquipmentSlot::FirstPrimaryWeapon => "FirstPrimaryWeapon",
            EquipmentSlot::SecondPrimaryWeapon => "SecondPrimaryWeapon",
            EquipmentSlot::Holster => "Holster",
            EquipmentSlot::Scabbard => "Scabbard",
        }
    }

    /// Parses a slot id.
    pub fn from_slot_id(slot_id: &str) -> Option<Self> {
        Self::all().into_iter().find(|slot| slot.as_str() == slot_id)
    }

    /// All equipment slots.
    pub fn all() -> Vec<EquipmentSlot> {
        vec![
            EquipmentSlot::Headwear,
            EquipmentSlot::Earpiece,
            EquipmentSlot::FaceCover,
            EquipmentSlot::ArmorVest,
            EquipmentSlot::Eyewear,
            EquipmentSlot::ArmBand,
            EquipmentSlot::TacticalVest,
            EquipmentSlot::Pockets,
            EquipmentSlot::Backpack,
            EquipmentSlot::SecuredContainer,
            EquipmentSlot::FirstPrimaryWeapon,
            EquipmentSlot::SecondPrimaryWeapon,
            EquipmentSlot::Holster,
            EquipmentSlot::Scabbard,
        ]
    }

    /// Weapon slots, in generation order.
    pub fn weapons() -> [EquipmentSlot; 3] {
        [
            EquipmentSlot::FirstPrimaryWeapon,
            EquipmentSlot::SecondPrimaryWeapon,
            EquipmentSlot::Holster,
        ]
    }

    pub fn is_weapon(self) -> bool {
        Self::weapons().contains(&self)
    }
}

impl std::fmt::Display for EquipmentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orientation of an item inside a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    Horizontal,
    Vertical,
}

/// Grid position of an item inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemLocation {
    pub x: u32,
    pub y: u32,
    pub rotation: Rotation,
}

impl ItemLocation {
    pub fn new(x: u32, y: u32, rotated: bool) -> Self {
        Self {
            x,
            y,
            rotation: if rotated {
                Rotation::Vertical
            } else {
                Rotation::Horizontal
            },
        }
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation == Rotation::Vertical
    }
}

/// One generated item inside the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    pub id: ItemId,
    pub tpl: TemplateId,
    pub parent: Option<ItemHandle>,
    pub slot: Option<String>,
    pub location: Option<ItemLocation>,
    pub properties: Option<ItemProperties>,
}

/// Template ids used for the root containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootTemplates {
    pub equipment: TemplateId,
    pub stash: TemplateId,
    pub sorting_table: TemplateId,
    pub quest_raid_items: TemplateId,
    pub quest_stash_items: TemplateId,
}

impl Default for RootTemplates {
    fn default() -> Self {
        Self {
            equipment: "inventory_equipment".to_string(),
            stash: "inventory_stash".to_string(),
            sorting_table: "inventory_sorting_table".to_string(),
            quest_raid_items: "inventory_quest_raid_items".to_string(),
            quest_stash_items: "inventory_quest_stash_items".to_string(),
        }
    }
}

/// Handles of the parentless root items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootContainers {
    pub equipment: ItemHandle,
    pub stash: ItemHandle,
    pub sorting_table: ItemHandle,
    pub quest_raid_items: ItemHandle,
    pub quest_stash_items: ItemHandle,
}

impl RootContainers {
    pub fn all(&self) -> [ItemHandle; 5] {
        [
            self.equipment,
            self.stash,
            self.sorting_table,
            self.quest_raid_items,
            self.quest_stash_items,
        ]
    }
}

/// Arena of generated items for one bot.
#[derive(Debug, Clone)]
pub struct BotInventory {
    items: Vec<InventoryItem>,
    children: Vec<Vec<ItemHandle>>,
    roots: RootContainers,
    /// Occupancy grids per (container, grid name), built on first use
    pub(crate) grids: HashMap<(ItemHandle, String), ContainerGrid>,
}

impl BotInventory {
    /// Creates an inventory holding only the root containers.
    pub fn new<R: Rng + ?Sized>(templates: &RootTemplates, rng: &mut R) -> Self {
        let mut items = Vec::with_capacity(64);
        let mut children = Vec::with_capacity(64);
        let mut root = |tpl: &TemplateId, rng: &mut R| {
            let handle = ItemHandle(items.len() as u32);
            items.push(InventoryItem {
                id: new_item_id(rng),
                tpl: tpl.clone(),
                parent: None,
                slot: None,
                location: None,
                properties: None,
            });
            children.push(Vec::new());
            handle
        };

        let roots = RootContainers {
            equipment: root(&templates.equipment, rng),
            stash: root(&templates.stash, rng),
            sorting_table: root(&templates.sorting_table, rng),
            quest_raid_items: root(&templates.quest_raid_items, rng),
            quest_stash_items: root(&templates.quest_stash_items, rng),
        };

        Self {
            items,
            children,
            roots,
            grids: HashMap::new(),
        }
    }

    pub fn roots(&self) -> &RootContainers {
        &self.roots
    }

    /// Handle of the equipment root.
    pub fn equipment(&self) -> ItemHandle {
        self.roots.equipment
    }

    pub fn get(&self, handle: ItemHandle) -> Option<&InventoryItem> {
        self.items.get(handle.index())
    }

    pub fn get_mut(&mut self, handle: ItemHandle) -> Option<&mut InventoryItem> {
        self.items.get_mut(handle.index())
    }

    /// Number of items, roots included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Every item with its handle, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemHandle, &InventoryItem)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| (ItemHandle(index as u32), item))
    }

    /// Direct children of an item.
    pub fn children(&self, parent: ItemHandle) -> &[ItemHandle] {
        self.children
            .get(parent.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Children of `parent` attached in `slot`.
    pub fn children_in_slot<'a>(
        &'a self,
        parent: ItemHandle,
        slot: &'a str,
    ) -> impl Iterator<Item = ItemHandle> + 'a {
        self.children(parent).iter().copied().filter(move |&child| {
            self.items[child.index()].slot.as_deref() == Some(slot)
        })
    }

    /// First child of `parent` in `slot`.
    pub fn child_in_slot(&self, parent: ItemHandle, slot: &str) -> Option<ItemHandle> {
        self.children_in_slot(parent, slot).next()
    }

    /// Item equipped in a body slot.
    pub fn equipped(&self, slot: EquipmentSlot) -> Option<ItemHandle> {
        self.child_in_slot(self.roots.equipment, slot.as_str())
    }

    /// Templates directly attached to the equipment root, with their slots.
    pub fn equipped_items(&self) -> impl Iterator<Item = &InventoryItem> {
        self.children(self.roots.equipment)
            .iter()
            .map(move |&child| &self.items[child.index()])
    }

    /// An item and all its descendants, parents before children.
    pub fn subtree(&self, handle: ItemHandle) -> Vec<ItemHandle> {
        let mut ordered = Vec::new();
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            ordered.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        ordered
    }

    fn push(&mut self, item: InventoryItem) -> ItemHandle {
        let handle = ItemHandle(self.items.len() as u32);
        if let Some(parent) = item.parent {
            self.children[parent.index()].push(handle);
        }
        self.items.push(item);
        self.children.push(Vec::new());
        handle
    }

    /// Commits a staged tree under `parent` in `slot`.
    ///
    /// Fresh ids are drawn for every node; `location` applies to the tree
    /// root only. Returns the handle of the committed root.
    pub fn attach_tree<R: Rng + ?Sized>(
        &mut self,
        tree: ItemTree,
        parent: ItemHandle,
        slot: &str,
        location: Option<ItemLocation>,
        rng: &mut R,
    ) -> ItemHandle {
        let mut handles: Vec<ItemHandle> = Vec::with_capacity(tree.len());
        for (index, node) in tree.nodes().iter().enumerate() {
            let (item_parent, item_slot, item_location) = match node.parent {
                Some(node_parent) => (handles[node_parent], node.slot.clone(), None),
                None if index == ItemTree::ROOT => (parent, Some(slot.to_string()), location),
                None => continue,
            };
            let handle = self.push(InventoryItem {
                id: new_item_id(rng),
                tpl: node.tpl.clone(),
                parent: Some(item_parent),
                slot: item_slot,
                location: item_location,
                properties: node.properties.clone(),
            });
            handles.push(handle);
        }
        handles[ItemTree::ROOT]
    }

    /// Checks the arena invariants: every non-root item has a parent and a
    /// slot, and every parent chain ends at the equipment root.
    pub fn validate_integrity(&self) -> QuartermasterResult<()> {
        let roots: HashSet<ItemHandle> = self.roots.all().into_iter().collect();
        for (handle, item) in self.iter() {
            if roots.contains(&handle) {
                if item.parent.is_some() {
                    return Err(QuartermasterError::InvalidInventory(format!(
                        "root item {} has a parent",
                        item.id
                    )));
                }
                continue;
            }

            if item.slot.is_none() {
                return Err(QuartermasterError::InvalidInventory(format!(
                    "item {} ({}) has no slot",
                    item.id, item.tpl
                )));
            }

            let mut current = item.parent;
            let mut steps = 0;
            loop {
                match current {
                    Some(parent) if parent == self.roots.equipment => break,
                    Some(parent) => {
                        let Some(parent_item) = self.get(parent) else {
                            return Err(QuartermasterError::InvalidInventory(format!(
                                "item {} has a dangling parent",
                                item.id
                            )));
                        };
                        current = parent_item.parent;
                    }
                    None => {
                        return Err(QuartermasterError::InvalidInventory(format!(
                            "item {} ({}) is not rooted at the equipment",
                            item.id, item.tpl
                        )));
                    }
                }
                steps += 1;
                if steps > self.items.len() {
                    return Err(QuartermasterError::InvalidInventory(format!(
                        "item {} sits on a parent cycle",
                        item.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Exports the arena as flat records with string-free parent links.
    pub fn to_generated(&self) -> GeneratedInventory {
        let id_of = |handle: ItemHandle| self.items[handle.index()].id;
        GeneratedInventory {
            items: self
                .items
                .iter()
                .map(|item| ItemRecord {
                    id: item.id,
                    tpl: item.tpl.clone(),
                    parent_id: item.parent.map(id_of),
                    slot_id: item.slot.clone(),
                    location: item.location,
                    upd: item.properties.clone(),
                })
                .collect(),
            equipment: id_of(self.roots.equipment),
            stash: id_of(self.roots.stash),
            sorting_table: id_of(self.roots.sorting_table),
            quest_raid_items: id_of(self.roots.quest_raid_items),
            quest_stash_items: id_of(self.roots.quest_stash_items),
        }
    }
}

/// One exported item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub tpl: TemplateId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ItemLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upd: Option<ItemProperties>,
}

/// A finished bot inventory: flat item list plus the root container ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedInventory {
    pub items: Vec<ItemRecord>,
    pub equipment: ItemId,
    pub stash: ItemId,
    pub sorting_table: ItemId,
    pub quest_raid_items: ItemId,
    pub quest_stash_items: ItemId,
}

impl GeneratedInventory {
    /// Ids of the parentless root containers.
    pub fn root_ids(&self) -> [ItemId; 5] {
        [
            self.equipment,
            self.stash,
            self.sorting_table,
            self.quest_raid_items,
            self.quest_stash_items,
        ]
    }

    pub fn find(&self, id: ItemId) -> Option<&ItemRecord> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Records attached directly to `parent`.
    pub fn children_of(&self, parent: ItemId) -> Vec<&ItemRecord> {
        self.items
            .iter()
            .filter(|item| item.parent_id == Some(parent))
            .collect()
    }

    /// Record equipped in a body slot.
    pub fn equipped(&self, slot: EquipmentSlot) -> Option<&ItemRecord> {
        self.items.iter().find(|item| {
            item.parent_id == Some(self.equipment) && item.slot_id.as_deref() == Some(slot.as_str())
        })
    }

    /// Referential integrity of the exported list: unique ids, every
    /// non-root parent resolves inside the list, no cycles.
    pub fn validate_integrity(&self) -> QuartermasterResult<()> {
        let by_id: HashMap<ItemId, &ItemRecord> =
            self.items.iter().map(|item| (item.id, item)).collect();
        if by_id.len() != self.items.len() {
            return Err(QuartermasterError::InvalidInventory(
                "duplicate item ids".to_string(),
            ));
        }

        let roots: HashSet<ItemId> = self.root_ids().into_iter().collect();
        for root in &roots {
            if !by_id.contains_key(root) {
                return Err(QuartermasterError::InvalidInventory(format!(
                    "root {} missing from item list",
                    root
                )));
            }
        }

        for item in &self.items {
            if roots.contains(&item.id) {
                continue;
            }
            let mut current = item.parent_id;
            let mut steps = 0;
            while let Some(parent) = current {
                if roots.contains(&parent) {
                    break;
                }
                let Some(parent_item) = by_id.get(&parent) else {
                    return Err(QuartermasterError::InvalidInventory(format!(
                        "item {} references missing parent {}",
                        item.id, parent
                    )));
                };
                current = parent_item.parent_id;
                steps += 1;
                if steps > self.items.len() {
                    return Err(QuartermasterError::InvalidInventory(format!(
                        "item {} sits on a parent cycle",
                        item.id
                    )));
                }
            }
            if current.is_none() {
                return Err(QuartermasterError::InvalidInventory(format!(
                    "item {} is not attached to any root",
                    item.id
                )));
            }
        }
        Ok(())
    }

    /// Pretty JSON export.
    pub fn to_json(&self) -> QuartermasterResult<String> {
        serde_json::to_string_pretty(self).map_err(QuartermasterError::from)
    }
}
