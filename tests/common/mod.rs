//! Shared fixture: a small but complete catalog, presets and one role.

#![allow(dead_code)]

use quartermaster::{
    AmmoBoxContents, BotInventoryGenerator, BotTemplate, EquipmentSlot, GenerationConfig,
    GridDefinition, ItemCatalog, ItemCategory, ItemTemplate, MinMax, PresetBook, PresetItem,
    SlotDefinition, WeaponPreset, WeightedTable,
};
use std::collections::BTreeMap;

pub const ROLE: &str = "assault";

fn table(entries: &[(&str, u32)]) -> WeightedTable {
    entries
        .iter()
        .map(|(tpl, weight)| (tpl.to_string(), *weight))
        .collect()
}

fn priced(id: &str, category: ItemCategory, price: u64) -> ItemTemplate {
    let mut template = ItemTemplate::new(id, category);
    template.price = price;
    template
}

pub fn catalog() -> ItemCatalog {
    let mut pockets = ItemTemplate::new("pockets", ItemCategory::Pockets);
    pockets.grids = (1..=4)
        .map(|i| GridDefinition::new(format!("pocket{}", i), 1, 2))
        .collect();

    let mut secure = ItemTemplate::new("secure_alpha", ItemCategory::SecureContainer);
    secure.grids = vec![GridDefinition::new("main", 2, 2)];

    let mut rig = ItemTemplate::new("rig", ItemCategory::TacticalVest);
    rig.grids = vec![
        GridDefinition::new("cell1", 2, 2),
        GridDefinition::new("cell2", 2, 2),
        GridDefinition::new("cell3", 1, 2),
        GridDefinition::new("cell4", 1, 2),
    ];

    let mut pack = ItemTemplate::new("pack", ItemCategory::Backpack);
    pack.width = 4;
    pack.height = 5;
    pack.grids = vec![GridDefinition::new("main", 4, 5)];

    let mut helmet = ItemTemplate::new("helmet", ItemCategory::Headwear);
    helmet.max_durability = Some(40);
    helmet.slots = vec![SlotDefinition::new("mod_equipment").accepting(["visor"])];

    let mut armor = ItemTemplate::new("armor", ItemCategory::ArmorVest);
    armor.max_durability = Some(50);

    let mut ak = ItemTemplate::new("ak", ItemCategory::Weapon);
    ak.width = 4;
    ak.max_durability = Some(100);
    ak.caliber = Some("c545".to_string());
    ak.default_ammo = Some("ammo_545_ps".to_string());
    ak.default_magazine = Some("mag_30".to_string());
    ak.fire_modes = vec!["single".to_string(), "fullauto".to_string()];
    ak.slots = vec![
        SlotDefinition::new("mod_pistol_grip").required(),
        SlotDefinition::new("mod_magazine")
            .required()
            .accepting(["mag_30"]),
        SlotDefinition::new("mod_stock"),
    ];
    ak.chambers =
        vec![SlotDefinition::new("patron_in_weapon").accepting(["ammo_545_ps", "ammo_545_bp"])];

    let mut mag_30 = ItemTemplate::new("mag_30", ItemCategory::Magazine);
    mag_30.height = 2;
    mag_30.cartridges = Some(
        SlotDefinition::new("cartridges")
            .accepting(["ammo_545_ps", "ammo_545_bp"])
            .with_max_count(30),
    );

    let mut pm = ItemTemplate::new("pm", ItemCategory::Weapon);
    pm.width = 2;
    pm.max_durability = Some(100);
    pm.caliber = Some("c9".to_string());
    pm.default_ammo = Some("ammo_9".to_string());
    pm.default_magazine = Some("mag_8".to_string());
    pm.slots = vec![SlotDefinition::new("mod_magazine").required()];
    pm.chambers = vec![SlotDefinition::new("patron_in_weapon")];

    let mut mag_8 = ItemTemplate::new("mag_8", ItemCategory::Magazine);
    mag_8.cartridges = Some(SlotDefinition::new("cartridges").with_max_count(8));

    let ammo = |id: &str, caliber: &str, stack: u32| {
        let mut template = ItemTemplate::new(id, ItemCategory::Ammo);
        template.caliber = Some(caliber.to_string());
        template.stack_max_size = stack;
        template
    };

    let mut bandage = priced("bandage", ItemCategory::Medical, 500);
    bandage.max_resource = Some(100);
    let mut roubles = priced("roubles", ItemCategory::Money, 1);
    roubles.stack_max_size = 500_000;
    let mut ammo_box = priced("ammo_box_545", ItemCategory::AmmoBox, 2_000);
    ammo_box.ammo_box = Some(AmmoBoxContents {
        ammo: "ammo_545_ps".to_string(),
        count: 30,
    });
    let mut bolts = priced("bolts", ItemCategory::Barter, 3_000);
    bolts.width = 2;

    ItemCatalog::new(vec![
        pockets,
        secure,
        rig,
        pack,
        helmet,
        ItemTemplate::new("visor", ItemCategory::Mod),
        armor,
        ak,
        ItemTemplate::new("grip", ItemCategory::Mod),
        ItemTemplate::new("stock", ItemCategory::Mod),
        mag_30,
        pm,
        mag_8,
        ammo("ammo_545_ps", "c545", 60),
        ammo("ammo_545_bp", "c545", 60),
        ammo("ammo_9", "c9", 50),
        bandage,
        priced("painkiller", ItemCategory::Drug, 1_500),
        priced("stim", ItemCategory::Stimulant, 20_000),
        priced("grenade", ItemCategory::Grenade, 8_000),
        bolts,
        priced("lighter", ItemCategory::Barter, 800),
        roubles,
        ammo_box,
    ])
}

fn preset_item(id: &str, tpl: &str, parent: Option<&str>, slot: Option<&str>) -> PresetItem {
    PresetItem {
        id: id.to_string(),
        tpl: tpl.to_string(),
        parent_id: parent.map(str::to_string),
        slot_id: slot.map(str::to_string),
        upd: None,
    }
}

pub fn presets() -> PresetBook {
    PresetBook::new(vec![
        WeaponPreset {
            id: "ak_default".to_string(),
            name: "AK".to_string(),
            weapon: "ak".to_string(),
            items: vec![
                preset_item("w", "ak", None, None),
                preset_item("g", "grip", Some("w"), Some("mod_pistol_grip")),
                preset_item("m", "mag_30", Some("w"), Some("mod_magazine")),
            ],
        },
        WeaponPreset {
            id: "pm_default".to_string(),
            name: "PM".to_string(),
            weapon: "pm".to_string(),
            items: vec![
                preset_item("w", "pm", None, None),
                preset_item("m", "mag_8", Some("w"), Some("mod_magazine")),
            ],
        },
    ])
}

fn slot_pool(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(slot, tpls)| {
            (
                slot.to_string(),
                tpls.iter().map(|tpl| tpl.to_string()).collect(),
            )
        })
        .collect()
}

pub fn template() -> BotTemplate {
    let mut template = BotTemplate {
        role: ROLE.to_string(),
        ..BotTemplate::default()
    };

    let pools = [
        (EquipmentSlot::Pockets, "pockets", 100),
        (EquipmentSlot::SecuredContainer, "secure_alpha", 100),
        (EquipmentSlot::TacticalVest, "rig", 100),
        (EquipmentSlot::Backpack, "pack", 60),
        (EquipmentSlot::Headwear, "helmet", 80),
        (EquipmentSlot::ArmorVest, "armor", 70),
        (EquipmentSlot::FirstPrimaryWeapon, "ak", 90),
        (EquipmentSlot::Holster, "pm", 30),
    ];
    for (slot, tpl, chance) in pools {
        template.equipment.insert(slot, table(&[(tpl, 1)]));
        template.chances.equipment.insert(slot, chance);
    }
    template.chances.weapon_mods.insert("mod_stock".to_string(), 50);
    template.chances.equipment_mods.insert("mod_equipment".to_string(), 50);

    template.mods.insert(
        "ak".to_string(),
        slot_pool(&[
            ("mod_pistol_grip", &["grip"]),
            ("mod_magazine", &["mag_30"]),
            ("mod_stock", &["stock"]),
        ]),
    );
    template
        .mods
        .insert("pm".to_string(), slot_pool(&[("mod_magazine", &["mag_8"])]));
    template
        .mods
        .insert("helmet".to_string(), slot_pool(&[("mod_equipment", &["visor"])]));

    template
        .ammo
        .insert("c545".to_string(), table(&[("ammo_545_ps", 80), ("ammo_545_bp", 20)]));
    template.ammo.insert("c9".to_string(), table(&[("ammo_9", 1)]));

    template.items.backpack = table(&[("bolts", 10), ("lighter", 20), ("roubles", 3), ("ammo_box_545", 2)]);
    template.items.pockets = table(&[("lighter", 10), ("bandage", 5), ("painkiller", 3)]);
    template.items.tactical_vest = table(&[("grenade", 5), ("stim", 1), ("bandage", 5)]);

    template.generation.healing = MinMax::new(1, 2);
    template.generation.drugs = MinMax::new(0, 1);
    template.generation.stimulants = MinMax::new(0, 1);
    template.generation.grenades = MinMax::new(0, 2);
    template.generation.backpack_loot = MinMax::new(2, 6);
    template.generation.vest_loot = MinMax::new(1, 3);
    template.generation.pocket_loot = MinMax::new(1, 3);
    template.generation.magazines = MinMax::new(2, 4);
    template
}

pub fn config() -> GenerationConfig {
    let mut config = GenerationConfig::for_testing();
    config.currency_stack_sizes.insert(
        "roubles".to_string(),
        [(500, 1), (1_000, 1)].into_iter().collect(),
    );
    config.dynamic_loot.whitelist = vec![
        "bolts".to_string(),
        "lighter".to_string(),
        "roubles".to_string(),
    ];
    config
}

pub fn generator() -> BotInventoryGenerator {
    BotInventoryGenerator::new(catalog(), presets(), vec![template()], config())
}
