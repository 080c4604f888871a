//! # Ordered Container Placement
//!
//! Places a staged item into the first equipped container, in caller-given
//! slot order, that has a free spot for it.

use crate::{
    footprint_of, BotInventory, ContainerGrid, EquipmentSlot, GridDefinition, GridSlot,
    ItemCatalog, ItemHandle, ItemLocation, ItemTree,
};
use log::{debug, warn};
use rand::Rng;

/// Result of [`place_in_containers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Committed into a container; the handle is the item's root
    Placed(ItemHandle),
    /// At least one container was equipped but none had room
    NoSpace,
    /// None of the requested slots holds a container with grids
    NoContainer,
}

impl PlacementOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, PlacementOutcome::Placed(_))
    }

    pub fn handle(&self) -> Option<ItemHandle> {
        match self {
            PlacementOutcome::Placed(handle) => Some(*handle),
            _ => None,
        }
    }
}

/// Places `tree` into the first container with room, trying `slots` in order
/// and each container's grids in declaration order.
///
/// Grids whose filter rejects the item's root template are skipped. The
/// occupancy grid of each (container, grid) pair is built from the items
/// already inside it on first use and kept in the inventory for the rest of
/// the pass.
pub fn place_in_containers<R: Rng + ?Sized>(
    inventory: &mut BotInventory,
    catalog: &ItemCatalog,
    slots: &[EquipmentSlot],
    tree: ItemTree,
    rng: &mut R,
) -> PlacementOutcome {
    let (width, height) = tree.footprint(catalog);
    let root_tpl = tree.root().tpl.clone();
    let mut saw_container = false;

    for &slot in slots {
        let Some(container) = inventory.equipped(slot) else {
            continue;
        };
        let Some(container_tpl) = inventory.get(container).map(|item| item.tpl.clone()) else {
            continue;
        };
        let Some(template) = catalog.get(&container_tpl) else {
            warn!("Container {} in {} is not in the catalog", container_tpl, slot);
            continue;
        };
        if template.grids.is_empty() {
            continue;
        }
        saw_container = true;

        for grid_def in &template.grids {
            if !catalog.filter_accepts(&grid_def.filter, &root_tpl) {
                continue;
            }

            let key = (container, grid_def.name.clone());
            if !inventory.grids.contains_key(&key) {
                let grid = occupancy_from_contents(inventory, catalog, container, grid_def);
                inventory.grids.insert(key.clone(), grid);
            }
            let Some(grid) = inventory.grids.get_mut(&key) else {
                continue;
            };

            if let Some(GridSlot { x, y, rotated }) = grid.place(width, height) {
                let location = ItemLocation::new(x, y, rotated);
                let handle =
                    inventory.attach_tree(tree, container, &grid_def.name, Some(location), rng);
                return PlacementOutcome::Placed(handle);
            }
        }
    }

    if saw_container {
        debug!("No room for {} ({}x{}) in {:?}", root_tpl, width, height, slots);
        PlacementOutcome::NoSpace
    } else {
        PlacementOutcome::NoContainer
    }
}

/// Occupancy of one container grid as implied by the items already in it.
fn occupancy_from_contents(
    inventory: &BotInventory,
    catalog: &ItemCatalog,
    container: ItemHandle,
    grid_def: &GridDefinition,
) -> ContainerGrid {
    let mut grid = ContainerGrid::new(grid_def.width, grid_def.height);
    for child in inventory.children_in_slot(container, &grid_def.name) {
        let Some(item) = inventory.get(child) else {
            continue;
        };
        let Some(location) = item.location else {
            continue;
        };
        let attached: Vec<&str> = inventory
            .subtree(child)
            .into_iter()
            .skip(1)
            .filter_map(|handle| inventory.get(handle))
            .map(|descendant| descendant.tpl.as_str())
            .collect();
        let (width, height) = footprint_of(catalog, &item.tpl, attached);
        grid.occupy(
            GridSlot {
                x: location.x,
                y: location.y,
                rotated: location.is_rotated(),
            },
            width,
            height,
        );
    }
    grid
}
