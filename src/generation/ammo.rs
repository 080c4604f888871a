//! # Ammunition and Magazines
//!
//! Resolves the cartridge a weapon spawns with, loads every magazine and
//! chamber of the weapon with it, and hands out the spare ammunition a bot
//! carries: spare magazines, loose rounds and secure-container stacks.

use super::GenerationContext;
use crate::{
    biased_range, place_in_containers, random_int, weighted_pick, BotInventory, EquipmentSlot,
    ItemCatalog, ItemHandle, ItemProperties, ItemTemplate, ItemTree, NodeIndex, ReloadMode,
    TemplateId, WeightedTable,
};
use log::{debug, warn};
use rand::Rng;

/// Containers spare ammunition goes into, in order.
pub const SPARE_AMMO_CONTAINERS: [EquipmentSlot; 2] =
    [EquipmentSlot::TacticalVest, EquipmentSlot::Pockets];

/// Averaging count of the spare magazine draw.
pub const SPARE_MAGAZINE_N_VALUE: u32 = 4;

/// Slot a weapon's detachable magazine goes into.
pub const MAGAZINE_SLOT: &str = "mod_magazine";

/// Picks the cartridge a weapon is loaded with.
///
/// The role's table for the weapon's caliber is narrowed to cartridges the
/// chamber accepts and stripped of blacklisted ones; either step is skipped
/// when it would leave nothing. Without a table the weapon's default ammo is
/// used.
pub fn resolve_ammo<R: Rng + ?Sized>(
    ctx: &GenerationContext<'_>,
    weapon: &ItemTemplate,
    rng: &mut R,
) -> Option<TemplateId> {
    let caliber = ctx.catalog.weapon_caliber(weapon);
    let table = caliber
        .as_deref()
        .and_then(|caliber| ctx.template.ammo.get(caliber))
        .filter(|table| !table.is_empty());
    let Some(table) = table else {
        debug!(
            "No ammo table for {} ({:?}), using default ammo",
            weapon.id, caliber
        );
        return weapon.default_ammo.clone();
    };

    let mut table = table.clone();
    if let Some(chamber) = weapon.chambers.first() {
        let accepted = retain(&table, |tpl| ctx.catalog.slot_accepts(chamber, tpl));
        if !accepted.is_empty() {
            table = accepted;
        }
    }

    if let Some(blacklist) = ctx.config.cartridge_blacklist.get(ctx.role()) {
        let allowed = retain(&table, |tpl| !ctx.catalog.matches_any(tpl, blacklist));
        if allowed.is_empty() {
            warn!(
                "Cartridge blacklist for {} would remove every {:?} round, ignoring it",
                ctx.role(),
                caliber
            );
        } else {
            table = allowed;
        }
    }

    weighted_pick(&table, rng)
        .cloned()
        .or_else(|| weapon.default_ammo.clone())
}

fn retain(table: &WeightedTable, keep: impl Fn(&str) -> bool) -> WeightedTable {
    table
        .iter()
        .filter(|(tpl, _)| keep(tpl))
        .map(|(tpl, weight)| (tpl.clone(), *weight))
        .collect()
}

/// Loads a magazine node with `ammo`, replacing whatever it held.
///
/// Box magazines get one stack filled to the cartridge slot's capacity;
/// cylinders get one round per camora.
pub fn fill_magazine(catalog: &ItemCatalog, tree: &mut ItemTree, magazine: NodeIndex, ammo: &str) {
    let Some(template) = tree.node(magazine).and_then(|node| catalog.get(&node.tpl)) else {
        return;
    };

    if template.is_cylinder_magazine() {
        for camora in template
            .slots
            .iter()
            .filter(|slot| slot.name.starts_with("camora"))
        {
            tree.set_child(magazine, &camora.name, ammo, Some(ItemProperties::stack(1)));
        }
    } else if let Some(cartridges) = &template.cartridges {
        match cartridges.max_count {
            Some(count) if count > 0 => {
                tree.set_child(magazine, &cartridges.name, ammo, Some(ItemProperties::stack(count)));
            }
            _ => debug!("Magazine {} has no cartridge capacity", template.id),
        }
    }
}

/// Puts one round into every chamber of `weapon` that accepts `ammo`.
pub fn fill_chambers(catalog: &ItemCatalog, tree: &mut ItemTree, weapon: NodeIndex, ammo: &str) {
    let Some(template) = tree.node(weapon).and_then(|node| catalog.get(&node.tpl)) else {
        return;
    };
    for chamber in template
        .chambers
        .iter()
        .filter(|chamber| catalog.slot_accepts(chamber, ammo))
    {
        tree.set_child(weapon, &chamber.name, ammo, Some(ItemProperties::stack(1)));
    }
}

/// Loads the weapon's chambers and every magazine in its tree.
pub fn fill_weapon(catalog: &ItemCatalog, tree: &mut ItemTree, ammo: &str) {
    fill_chambers(catalog, tree, ItemTree::ROOT, ammo);
    let magazines = tree.find_all(|node| {
        catalog
            .get(&node.tpl)
            .map_or(false, ItemTemplate::is_magazine)
    });
    for magazine in magazines {
        fill_magazine(catalog, tree, magazine, ammo);
    }
}

/// A standalone magazine loaded with `ammo`.
pub fn loaded_magazine(catalog: &ItemCatalog, magazine: &str, ammo: &str) -> ItemTree {
    let mut tree = ItemTree::new(magazine, None);
    fill_magazine(catalog, &mut tree, ItemTree::ROOT, ammo);
    tree
}

/// Hands out spare ammunition for an equipped weapon.
///
/// Detachable-magazine weapons get spare magazines; internal-magazine and
/// barrel-loaded weapons get loose rounds instead. The secure container
/// always receives its ammo stacks.
pub fn generate_spare_ammo<R: Rng + ?Sized>(
    ctx: &GenerationContext<'_>,
    inventory: &mut BotInventory,
    weapon_handle: ItemHandle,
    weapon: &ItemTemplate,
    ammo: &ItemTemplate,
    rng: &mut R,
) {
    let range = ctx.template.generation.magazines;
    let count = match biased_range(
        range.min as i64,
        range.max as i64,
        ((range.max as f64) * 0.75).round() as i64,
        SPARE_MAGAZINE_N_VALUE,
        rng,
    ) {
        Ok(count) => count.max(0) as u32,
        Err(error) => {
            warn!("Bad magazine range for {}: {}", ctx.role(), error);
            range.min
        }
    };

    let attached_magazine = inventory
        .child_in_slot(weapon_handle, MAGAZINE_SLOT)
        .and_then(|handle| inventory.get(handle))
        .map(|item| item.tpl.clone());

    match weapon.reload_mode {
        ReloadMode::ExternalMagazine => {
            match attached_magazine.or_else(|| weapon.default_magazine.clone()) {
                Some(magazine) => {
                    add_spare_magazines(ctx, inventory, weapon, &magazine, &ammo.id, count, range.min, rng);
                }
                None => warn!("{} has no magazine to copy for spares", weapon.id),
            }
        }
        ReloadMode::InternalMagazine => {
            let capacity = attached_magazine
                .or_else(|| weapon.default_magazine.clone())
                .and_then(|magazine| ctx.catalog.get(&magazine))
                .map_or(0, ItemTemplate::magazine_capacity);
            let total = capacity.saturating_mul(count);
            let stack_size = ammo.stack_max_size.max(1);
            let mut remaining = total;
            while remaining > 0 {
                let stack = remaining.min(stack_size);
                remaining -= stack;
                place_loose_stack(ctx, inventory, &ammo.id, stack, rng);
            }
        }
        ReloadMode::OnlyBarrel => {
            for _ in 0..count {
                let stack = random_stack_size(ammo, rng);
                place_loose_stack(ctx, inventory, &ammo.id, stack, rng);
            }
        }
    }

    add_secure_container_ammo(ctx, inventory, ammo, rng);
}

/// Places `count` loaded spare magazines into vest then pockets.
///
/// While fewer than `minimum` are placed, a placement failure switches once
/// to the weapon's default magazine and retries; it never switches again.
/// Weapons loaded through an internal magazine never switch, and a default
/// that is missing from the catalog or is not a magazine is never used.
#[allow(clippy::too_many_arguments)]
pub fn add_spare_magazines<R: Rng + ?Sized>(
    ctx: &GenerationContext<'_>,
    inventory: &mut BotInventory,
    weapon: &ItemTemplate,
    magazine: &str,
    ammo: &str,
    count: u32,
    minimum: u32,
    rng: &mut R,
) -> u32 {
    let mut magazine = magazine.to_string();
    let mut switched = false;
    let mut placed = 0;

    while placed < count {
        let tree = loaded_magazine(ctx.catalog, &magazine, ammo);
        let outcome = place_in_containers(inventory, ctx.catalog, &SPARE_AMMO_CONTAINERS, tree, rng);
        if outcome.is_placed() {
            placed += 1;
            continue;
        }

        if placed >= minimum {
            debug!("Stopped spare magazines for {} at {}", weapon.id, placed);
            break;
        }

        let fallback = weapon.default_magazine.as_deref().filter(|default| {
            weapon.reload_mode == ReloadMode::ExternalMagazine
                && *default != magazine
                && ctx
                    .catalog
                    .get(default)
                    .map_or(false, ItemTemplate::is_magazine)
        });
        match fallback {
            Some(default) if !switched => {
                debug!("Retrying spare magazines for {} with default {}", weapon.id, default);
                magazine = default.to_string();
                switched = true;
            }
            _ => {
                warn!(
                    "Placed only {} of at least {} magazines for {}",
                    placed, minimum, weapon.id
                );
                break;
            }
        }
    }
    placed
}

fn random_stack_size<R: Rng + ?Sized>(ammo: &ItemTemplate, rng: &mut R) -> u32 {
    random_int(
        ammo.stack_min_random.max(1) as i64,
        ammo.stack_max_size as i64,
        rng,
    ) as u32
}

fn place_loose_stack<R: Rng + ?Sized>(
    ctx: &GenerationContext<'_>,
    inventory: &mut BotInventory,
    ammo: &str,
    count: u32,
    rng: &mut R,
) {
    let tree = ItemTree::new(ammo, Some(ItemProperties::stack(count)));
    if !place_in_containers(inventory, ctx.catalog, &SPARE_AMMO_CONTAINERS, tree, rng).is_placed() {
        debug!("Dropped loose stack of {} x{}", ammo, count);
    }
}

/// Adds the configured number of full ammo stacks to the secure container.
pub fn add_secure_container_ammo<R: Rng + ?Sized>(
    ctx: &GenerationContext<'_>,
    inventory: &mut BotInventory,
    ammo: &ItemTemplate,
    rng: &mut R,
) -> u32 {
    let mut placed = 0;
    for _ in 0..ctx.config.secure_container_ammo_stack_count {
        let tree = ItemTree::new(ammo.id.clone(), Some(ItemProperties::stack(ammo.stack_max_size)));
        let outcome = place_in_containers(
            inventory,
            ctx.catalog,
            &[EquipmentSlot::SecuredContainer],
            tree,
            rng,
        );
        if !outcome.is_placed() {
            debug!("Secure container full after {} stacks of {}", placed, ammo.id);
            break;
        }
        placed += 1;
    }
    placed
}
