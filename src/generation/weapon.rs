//! # Weapon Generation
//!
//! Builds a weapon for one equipment slot: pick the template, resolve its
//! ammunition, attach mods, validate the tree, fall back to a preset when
//! the procedural tree is incomplete, load it and equip it. Spare
//! ammunition follows once the weapon is in place.

use super::{derived_properties, fill_weapon, generate_spare_ammo, resolve_ammo, GenerationContext};
use crate::{
    weighted_pick, BotInventory, EquipmentSlot, ItemCatalog, ItemHandle, ItemProperties, ItemTree,
    ModAssembler, NodeIndex, QuartermasterError, QuartermasterResult,
};
use log::{debug, warn};
use rand::Rng;

/// First required slot (on the weapon or any attached mod) that has no
/// child, or a node whose template is unknown.
///
/// Camora slots are loaded with ammunition after validation and are not
/// checked here.
pub fn first_unfilled_required_slot(
    catalog: &ItemCatalog,
    tree: &ItemTree,
) -> Option<(NodeIndex, String)> {
    for (index, node) in tree.nodes().iter().enumerate() {
        let Some(template) = catalog.get(&node.tpl) else {
            return Some((index, String::new()));
        };
        if let Some(slot) = template.slots.iter().find(|slot| {
            slot.required
                && !slot.name.starts_with("camora")
                && tree.child_in_slot(index, &slot.name).is_none()
        }) {
            return Some((index, slot.name.clone()));
        }
    }
    None
}

/// Whether every required slot of the weapon tree is filled.
pub fn is_weapon_valid(catalog: &ItemCatalog, tree: &ItemTree) -> bool {
    match first_unfilled_required_slot(catalog, tree) {
        None => true,
        Some((index, slot)) => {
            let tpl = tree.node(index).map(|node| node.tpl.as_str()).unwrap_or_default();
            debug!("Weapon tree invalid: {} is missing {}", tpl, slot);
            false
        }
    }
}

/// The first preset for `weapon`, with root properties replaced by
/// `root_properties`.
pub fn preset_tree(
    ctx: &GenerationContext<'_>,
    weapon: &str,
    root_properties: Option<ItemProperties>,
) -> QuartermasterResult<ItemTree> {
    let preset = ctx
        .presets
        .first_for(weapon)
        .ok_or_else(|| QuartermasterError::WeaponAssembly {
            template: weapon.to_string(),
            reason: "mod tree is incomplete and no preset exists".to_string(),
        })?;
    let mut tree = ItemTree::from_preset(preset)?;
    tree.root_mut().properties = root_properties;
    Ok(tree)
}

/// Generates and equips the weapon for `slot`.
///
/// Returns `Ok(None)` when the slot has no usable pool. An incomplete mod
/// tree without a preset to fall back to is an error.
pub fn generate_weapon<R: Rng + ?Sized>(
    ctx: &GenerationContext<'_>,
    inventory: &mut BotInventory,
    slot: EquipmentSlot,
    rng: &mut R,
) -> QuartermasterResult<Option<ItemHandle>> {
    let Some(tpl) = ctx
        .template
        .equipment
        .get(&slot)
        .and_then(|pool| weighted_pick(pool, rng))
        .cloned()
    else {
        debug!("No weapon pool for {} on {}", slot, ctx.role());
        return Ok(None);
    };
    let Some(weapon) = ctx.catalog.get(&tpl) else {
        warn!("Weapon {} for {} is not in the catalog", tpl, slot);
        return Ok(None);
    };

    let ammo = resolve_ammo(ctx, weapon, rng);
    let root_properties = derived_properties(ctx, weapon, rng);
    let mut tree = ItemTree::new(tpl.clone(), root_properties.clone());

    let assembled = if ctx.template.mods.contains_key(&tpl) {
        let assembler = ModAssembler::new(
            ctx.catalog,
            &ctx.template.mods,
            &ctx.template.chances.weapon_mods,
            ctx.config.max_mod_depth,
        );
        match assembler.assemble(&mut tree, ItemTree::ROOT, rng) {
            Ok(()) => is_weapon_valid(ctx.catalog, &tree),
            Err(error) => {
                debug!("Mod assembly for {} failed: {}", tpl, error);
                false
            }
        }
    } else {
        debug!("No mod pool for {}", tpl);
        is_weapon_valid(ctx.catalog, &tree)
    };

    if !assembled {
        warn!("Replacing generated {} with its preset", tpl);
        tree = preset_tree(ctx, &tpl, root_properties)?;
    }

    let ammo_template = ammo.as_deref().and_then(|ammo| ctx.catalog.get(ammo));
    match ammo_template {
        Some(ammo) => fill_weapon(ctx.catalog, &mut tree, &ammo.id),
        None => warn!("No usable ammo for {} ({:?})", tpl, ammo),
    }

    let equipment = inventory.equipment();
    let handle = inventory.attach_tree(tree, equipment, slot.as_str(), None, rng);

    if let Some(ammo) = ammo_template {
        generate_spare_ammo(ctx, inventory, handle, weapon, ammo, rng);
    }
    Ok(Some(handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        BotTemplate, GenerationConfig, GenerationRequest, ItemCategory, ItemTemplate, PresetBook,
        PresetItem, RootTemplates, SlotDefinition, WeaponPreset,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog() -> ItemCatalog {
        let mut pistol = ItemTemplate::new("pistol", ItemCategory::Weapon);
        pistol.max_durability = Some(100);
        pistol.default_ammo = Some("ammo_9".to_string());
        pistol.slots = vec![
            SlotDefinition::new("mod_barrel").required(),
            SlotDefinition::new("mod_magazine"),
        ];
        let mut barrel = ItemTemplate::new("barrel", ItemCategory::Mod);
        barrel.slots = vec![SlotDefinition::new("mod_muzzle").required()];
        let mut ammo = ItemTemplate::new("ammo_9", ItemCategory::Ammo);
        ammo.caliber = Some("Caliber9x19".to_string());
        ItemCatalog::new(vec![
            pistol,
            barrel,
            ammo,
            ItemTemplate::new("muzzle", ItemCategory::Mod),
        ])
    }

    fn preset() -> WeaponPreset {
        let item = |id: &str, tpl: &str, parent: Option<&str>, slot: Option<&str>| PresetItem {
            id: id.to_string(),
            tpl: tpl.to_string(),
            parent_id: parent.map(str::to_string),
            slot_id: slot.map(str::to_string),
            upd: None,
        };
        WeaponPreset {
            id: "pistol_default".to_string(),
            name: String::new(),
            weapon: "pistol".to_string(),
            items: vec![
                item("w", "pistol", None, None),
                item("b", "barrel", Some("w"), Some("mod_barrel")),
                item("m", "muzzle", Some("b"), Some("mod_muzzle")),
            ],
        }
    }

    fn template() -> BotTemplate {
        let mut template = BotTemplate::default();
        template.role = "assault".to_string();
        template
            .equipment
            .insert(EquipmentSlot::Holster, [("pistol".to_string(), 1)].into_iter().collect());
        template
    }

    #[test]
    fn test_validation_is_transitive() {
        let catalog = catalog();
        let mut tree = ItemTree::new("pistol", None);
        assert_eq!(
            first_unfilled_required_slot(&catalog, &tree),
            Some((0, "mod_barrel".to_string()))
        );
        let barrel = tree.add_child(ItemTree::ROOT, "mod_barrel", "barrel", None);
        assert_eq!(
            first_unfilled_required_slot(&catalog, &tree),
            Some((barrel, "mod_muzzle".to_string()))
        );
        tree.add_child(barrel, "mod_muzzle", "muzzle", None);
        assert!(is_weapon_valid(&catalog, &tree));
    }

    #[test]
    fn test_preset_fallback() {
        let catalog = catalog();
        let presets = PresetBook::new(vec![preset()]);
        let template = template();
        let config = GenerationConfig::for_testing();
        let request = GenerationRequest::new("assault");
        let ctx = GenerationContext {
            catalog: &catalog,
            presets: &presets,
            template: &template,
            config: &config,
            request: &request,
        };

        let mut rng = StdRng::seed_from_u64(8);
        let mut inventory = BotInventory::new(&RootTemplates::default(), &mut rng);
        let pistol = generate_weapon(&ctx, &mut inventory, EquipmentSlot::Holster, &mut rng)
            .unwrap()
            .unwrap();

        assert_eq!(inventory.equipped(EquipmentSlot::Holster), Some(pistol));
        let barrel = inventory.child_in_slot(pistol, "mod_barrel").unwrap();
        assert!(inventory.child_in_slot(barrel, "mod_muzzle").is_some());
        assert!(matches!(
            inventory.get(pistol).unwrap().properties,
            Some(ItemProperties::Weapon { .. })
        ));
        assert!(inventory.validate_integrity().is_ok());
    }

    #[test]
    fn test_missing_preset_is_an_error() {
        let catalog = catalog();
        let presets = PresetBook::default();
        let template = template();
        let config = GenerationConfig::for_testing();
        let request = GenerationRequest::new("assault");
        let ctx = GenerationContext {
            catalog: &catalog,
            presets: &presets,
            template: &template,
            config: &config,
            request: &request,
        };

        let mut rng = StdRng::seed_from_u64(8);
        let mut inventory = BotInventory::new(&RootTemplates::default(), &mut rng);
        let result = generate_weapon(&ctx, &mut inventory, EquipmentSlot::Holster, &mut rng);
        assert!(matches!(
            result,
            Err(QuartermasterError::WeaponAssembly { ref template, .. }) if template == "pistol"
        ));
        assert!(inventory.equipped(EquipmentSlot::Holster).is_none());
    }

    #[test]
    fn test_empty_pool_is_not_an_error() {
        let catalog = catalog();
        let presets = PresetBook::default();
        let template = BotTemplate::default();
        let config = GenerationConfig::for_testing();
        let request = GenerationRequest::new("assault");
        let ctx = GenerationContext {
            catalog: &catalog,
            presets: &presets,
            template: &template,
            config: &config,
            request: &request,
        };
        let mut rng = StdRng::seed_from_u64(8);
        let mut inventory = BotInventory::new(&RootTemplates::default(), &mut rng);
        assert_eq!(
            generate_weapon(&ctx, &mut inventory, EquipmentSlot::FirstPrimaryWeapon, &mut rng).unwrap(),
            None
        );
    }
}
