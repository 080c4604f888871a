//! # Equipment Generation
//!
//! Fills the non-weapon body slots of a bot and computes the derived runtime
//! properties (durability, fold state, resources) shared with weapons and
//! loot.

use super::{first_unfilled_required_slot, GenerationContext};
use crate::{
    chance_100, random_int, weighted_pick, BotInventory, EquipmentSlot, ItemCatalog,
    ItemCategory, ItemHandle, ItemProperties, ItemTemplate, ItemTree, ModAssembler, NodeIndex,
    ResourceRoll, WeightedTable,
};
use log::{debug, warn};
use rand::Rng;

/// Slots generated last, in this order, after every other pooled slot.
pub const ORDERED_EQUIPMENT_SLOTS: [EquipmentSlot; 6] = [
    EquipmentSlot::Pockets,
    EquipmentSlot::FaceCover,
    EquipmentSlot::Headwear,
    EquipmentSlot::Earpiece,
    EquipmentSlot::ArmorVest,
    EquipmentSlot::TacticalVest,
];

/// Slots whose items never take part in conflict checks.
pub const CONFLICT_EXEMPT_SLOTS: [EquipmentSlot; 5] = [
    EquipmentSlot::Scabbard,
    EquipmentSlot::Backpack,
    EquipmentSlot::SecuredContainer,
    EquipmentSlot::Holster,
    EquipmentSlot::ArmBand,
];

/// Generation order of the non-weapon slots a template has pools for.
pub fn equipment_order(pooled: impl IntoIterator<Item = EquipmentSlot>) -> Vec<EquipmentSlot> {
    let pooled: Vec<EquipmentSlot> = pooled.into_iter().collect();
    let mut order: Vec<EquipmentSlot> = pooled
        .iter()
        .copied()
        .filter(|slot| !slot.is_weapon() && !ORDERED_EQUIPMENT_SLOTS.contains(slot))
        .collect();
    order.extend(
        ORDERED_EQUIPMENT_SLOTS
            .iter()
            .copied()
            .filter(|slot| pooled.contains(slot)),
    );
    order
}

/// Whether either template lists the other (or one of its classes) as
/// conflicting.
pub fn templates_conflict(catalog: &ItemCatalog, a: &ItemTemplate, b: &ItemTemplate) -> bool {
    catalog.matches_any(&b.id, &a.conflicting_items) || catalog.matches_any(&a.id, &b.conflicting_items)
}

/// Whether `candidate` may not go into `slot` given what is already
/// equipped.
///
/// Only the direct children of the equipment root are inspected.
pub fn equipment_conflict(
    catalog: &ItemCatalog,
    inventory: &BotInventory,
    slot: EquipmentSlot,
    candidate: &ItemTemplate,
) -> bool {
    if CONFLICT_EXEMPT_SLOTS.contains(&slot) {
        return false;
    }

    for equipped in inventory.equipped_items() {
        let Some(equipped_slot) = equipped.slot.as_deref().and_then(EquipmentSlot::from_slot_id)
        else {
            continue;
        };
        if CONFLICT_EXEMPT_SLOTS.contains(&equipped_slot) {
            continue;
        }
        let Some(template) = catalog.get(&equipped.tpl) else {
            continue;
        };

        if template.blocks_slot(slot) {
            debug!("{} in {} blocks {}", template.id, equipped_slot, slot);
            return true;
        }
        if candidate.blocks_slot(equipped_slot) {
            debug!("{} would block occupied slot {}", candidate.id, equipped_slot);
            return true;
        }
        if templates_conflict(catalog, candidate, template) {
            debug!("{} conflicts with equipped {}", candidate.id, template.id);
            return true;
        }
    }
    false
}

/// Whether `candidate` conflicts with the mods already attached next to it
/// under `parent`.
///
/// Siblings are compared directly; their own attachments are not inspected.
pub fn mod_conflict(
    catalog: &ItemCatalog,
    tree: &ItemTree,
    parent: NodeIndex,
    candidate: &ItemTemplate,
) -> bool {
    tree.children(parent)
        .iter()
        .filter_map(|&sibling| tree.node(sibling))
        .filter_map(|sibling| catalog.get(&sibling.tpl))
        .any(|sibling| templates_conflict(catalog, candidate, sibling))
}

/// Generates every pooled non-weapon equipment slot.
pub fn generate_equipment<R: Rng + ?Sized>(
    ctx: &GenerationContext<'_>,
    inventory: &mut BotInventory,
    rng: &mut R,
) {
    for slot in equipment_order(ctx.template.equipment.keys().copied()) {
        generate_equipment_slot(ctx, inventory, slot, rng);
    }
}

/// Rolls, picks and equips one non-weapon slot.
///
/// Any failure (failed roll, empty pool, conflict, unfillable required mod)
/// leaves the slot empty.
pub fn generate_equipment_slot<R: Rng + ?Sized>(
    ctx: &GenerationContext<'_>,
    inventory: &mut BotInventory,
    slot: EquipmentSlot,
    rng: &mut R,
) -> Option<ItemHandle> {
    let pool = ctx.template.equipment.get(&slot)?;
    if pool.is_empty() {
        debug!("No {} pool for {}", slot, ctx.role());
        return None;
    }

    let chance = match slot {
        EquipmentSlot::Pockets | EquipmentSlot::SecuredContainer => 100,
        _ => ctx.template.equipment_chance(slot),
    };
    if !chance_100(chance, rng) {
        debug!("{} skipped by spawn chance", slot);
        return None;
    }

    let filtered;
    let pool = if slot == EquipmentSlot::TacticalVest {
        filtered = filter_rig_pool(ctx, inventory, pool);
        &filtered
    } else {
        pool
    };

    let tpl = weighted_pick(pool, rng)?;
    let Some(template) = ctx.catalog.get(tpl) else {
        warn!("Equipment template {} for {} is not in the catalog", tpl, slot);
        return None;
    };
    if equipment_conflict(ctx.catalog, inventory, slot, template) {
        debug!("Dropping {} for {}: conflict", tpl, slot);
        return None;
    }

    let mut tree = ItemTree::new(tpl.clone(), derived_properties(ctx, template, rng));
    let assembler = ModAssembler::new(
        ctx.catalog,
        &ctx.template.mods,
        &ctx.template.chances.equipment_mods,
        ctx.config.max_mod_depth,
    );
    if let Err(error) = assembler.assemble(&mut tree, ItemTree::ROOT, rng) {
        warn!("Dropping {} for {}: {}", tpl, slot, error);
        return None;
    }
    if let Some((node, missing)) = first_unfilled_required_slot(ctx.catalog, &tree) {
        let owner = tree.node(node).map(|node| node.tpl.as_str()).unwrap_or_default();
        warn!("Dropping {} for {}: {} is missing {}", tpl, slot, owner, missing);
        return None;
    }

    let equipment = inventory.equipment();
    Some(inventory.attach_tree(tree, equipment, slot.as_str(), None, rng))
}

/// Armored rigs are removed when the bot wears armor, and kept exclusively
/// when it does not and the configuration asks for it. A filter that would
/// empty the pool is not applied.
fn filter_rig_pool(
    ctx: &GenerationContext<'_>,
    inventory: &BotInventory,
    pool: &WeightedTable,
) -> WeightedTable {
    let has_armor = inventory.equipped(EquipmentSlot::ArmorVest).is_some();
    let keep_armored = if has_armor {
        false
    } else if ctx.config.force_armored_rig_without_armor {
        true
    } else {
        return pool.clone();
    };

    let filtered: WeightedTable = pool
        .iter()
        .filter(|(tpl, _)| {
            ctx.catalog
                .get(tpl)
                .map_or(false, |template| template.armored == keep_armored)
        })
        .map(|(tpl, weight)| (tpl.clone(), *weight))
        .collect();

    if filtered.is_empty() {
        debug!("Rig filter would empty the pool, keeping it unfiltered");
        pool.clone()
    } else {
        filtered
    }
}

/// Runtime properties of a freshly spawned item.
pub fn derived_properties<R: Rng + ?Sized>(
    ctx: &GenerationContext<'_>,
    template: &ItemTemplate,
    rng: &mut R,
) -> Option<ItemProperties> {
    if template.is_weapon() {
        return Some(weapon_properties(ctx, template, rng));
    }
    if let Some(template_max) = template.max_durability {
        return Some(armor_properties(ctx, template_max, rng));
    }
    match template.category {
        ItemCategory::Medical => template.max_resource.map(|max| ItemProperties::Medical {
            hp_resource: roll_resource(max, &ctx.config.resource_randomization.meds, rng),
        }),
        ItemCategory::FoodDrink => template.max_resource.map(|max| ItemProperties::FoodDrink {
            resource: roll_resource(max, &ctx.config.resource_randomization.food, rng),
        }),
        _ => static_properties(template),
    }
}

/// Properties that need no roll: fold state and light state.
pub fn static_properties(template: &ItemTemplate) -> Option<ItemProperties> {
    if template.foldable {
        Some(ItemProperties::Foldable { folded: false })
    } else if template.light {
        Some(ItemProperties::Light {
            active: false,
            mode: 0,
        })
    } else {
        None
    }
}

fn weapon_properties<R: Rng + ?Sized>(
    ctx: &GenerationContext<'_>,
    template: &ItemTemplate,
    rng: &mut R,
) -> ItemProperties {
    let profile = ctx.config.durability_for(ctx.role()).weapon;
    let cap = template.max_durability.unwrap_or(100);
    let lowest = profile.lowest_max.min(cap);
    let highest = profile.highest_max.min(cap);
    let max_durability = random_int(lowest as i64, highest as i64, rng) as u32;
    let delta = random_int(profile.min_delta as i64, profile.max_delta as i64, rng) as u32;

    let fire_mode = if template.fire_modes.iter().any(|mode| mode == "fullauto") {
        Some("fullauto".to_string())
    } else if template.fire_modes.is_empty() {
        None
    } else {
        let index = rng.gen_range(0..template.fire_modes.len());
        Some(template.fire_modes[index].clone())
    };

    ItemProperties::Weapon {
        durability: reduce_durability(max_durability, delta, profile.min_limit_percent),
        max_durability,
        fire_mode,
        folded: template.foldable.then_some(false),
    }
}

fn armor_properties<R: Rng + ?Sized>(
    ctx: &GenerationContext<'_>,
    template_max: u32,
    rng: &mut R,
) -> ItemProperties {
    let profile = ctx.config.durability_for(ctx.role()).armor;
    let percent = random_int(
        profile.lowest_max_percent as i64,
        profile.highest_max_percent as i64,
        rng,
    ) as u64;
    let max_durability = ((template_max as u64 * percent + 50) / 100).max(1) as u32;
    let delta = random_int(profile.min_delta as i64, profile.max_delta as i64, rng) as u32;

    ItemProperties::Repairable {
        durability: reduce_durability(max_durability, delta, profile.min_limit_percent),
        max_durability,
    }
}

/// `max - delta`, floored at `min_limit_percent` of `max`.
pub fn reduce_durability(max: u32, delta: u32, min_limit_percent: u32) -> u32 {
    let floor = (max as u64 * min_limit_percent as u64).div_ceil(100) as u32;
    max.saturating_sub(delta).max(floor).min(max)
}

fn roll_resource<R: Rng + ?Sized>(max: u32, roll: &ResourceRoll, rng: &mut R) -> u32 {
    if roll.resource_percent == 0 || chance_100(roll.chance_max_resource_percent, rng) {
        return max;
    }
    let reduction = random_int(1, roll.resource_percent.min(100) as i64, rng) as u64;
    let removed = (max as u64 * reduction + 50) / 100;
    (max as u64).saturating_sub(removed).max(1) as u32
}
