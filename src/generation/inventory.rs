//! # Bot Inventory Generator
//!
//! Drives one bot's loadout from start to finish: root containers,
//! equipment, weapons, loot, and a final integrity check.

use super::{
    generate_equipment, generate_loot, generate_weapon, BotTemplate, GenerationConfig,
    GenerationContext, GenerationRequest, Generator, LootCache, LootPools,
};
use crate::{
    chance_100, BotInventory, EquipmentSlot, GeneratedInventory, ItemCatalog, PresetBook,
    QuartermasterError, QuartermasterResult,
};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Generates complete bot inventories.
///
/// All inputs are shared read-only through `Arc`, so one generator can serve
/// several threads, each with its own RNG.
#[derive(Debug, Clone)]
pub struct BotInventoryGenerator {
    catalog: Arc<ItemCatalog>,
    presets: Arc<PresetBook>,
    templates: Arc<HashMap<String, BotTemplate>>,
    config: Arc<GenerationConfig>,
    loot_cache: Arc<LootCache>,
}

impl BotInventoryGenerator {
    /// Creates a generator. Role templates are keyed by their `role`.
    pub fn new(
        catalog: ItemCatalog,
        presets: PresetBook,
        templates: impl IntoIterator<Item = BotTemplate>,
        config: GenerationConfig,
    ) -> Self {
        let templates = templates
            .into_iter()
            .map(|template| (template.role.clone(), template))
            .collect();
        Self {
            catalog: Arc::new(catalog),
            presets: Arc::new(presets),
            templates: Arc::new(templates),
            config: Arc::new(config),
            loot_cache: Arc::new(LootCache::new()),
        }
    }

    /// Replaces the loot cache, e.g. to share one between generators.
    pub fn with_loot_cache(mut self, loot_cache: Arc<LootCache>) -> Self {
        self.loot_cache = loot_cache;
        self
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn loot_cache(&self) -> &Arc<LootCache> {
        &self.loot_cache
    }

    /// Template of a role.
    pub fn template(&self, role: &str) -> QuartermasterResult<&BotTemplate> {
        self.templates.get(role).ok_or_else(|| {
            QuartermasterError::Configuration(format!("no bot template for role {}", role))
        })
    }

    /// Generates one bot inventory.
    ///
    /// # Errors
    ///
    /// Fails when the role has no template, when a weapon cannot be
    /// assembled and has no preset, or when the finished inventory breaks
    /// tree integrity.
    pub fn generate_inventory<R: Rng + ?Sized>(
        &self,
        request: &GenerationRequest,
        rng: &mut R,
    ) -> QuartermasterResult<GeneratedInventory> {
        let template = self.template(&request.role)?;
        let ctx = GenerationContext {
            catalog: &self.catalog,
            presets: &self.presets,
            template,
            config: &self.config,
            request,
        };
        debug!(
            "Generating {} (level {}, high value: {})",
            request.role, request.level, request.is_high_value
        );

        let mut inventory = BotInventory::new(&self.config.root_templates, rng);
        generate_equipment(&ctx, &mut inventory, rng);
        self.generate_weapons(&ctx, &mut inventory, rng)?;

        let pools = self
            .loot_cache
            .get_or_build(&request.role, request.is_high_value, || {
                LootPools::build(&self.catalog, template, &self.config, request.is_high_value)
            });
        generate_loot(&ctx, &mut inventory, &pools, rng);

        inventory.validate_integrity()?;
        let generated = inventory.to_generated();
        generated.validate_integrity()?;
        info!(
            "Generated {} bot with {} items",
            request.role,
            generated.items.len()
        );
        Ok(generated)
    }

    /// Primary by chance, secondary only alongside a primary, holster by
    /// chance alongside a primary and always without one.
    fn generate_weapons<R: Rng + ?Sized>(
        &self,
        ctx: &GenerationContext<'_>,
        inventory: &mut BotInventory,
        rng: &mut R,
    ) -> QuartermasterResult<()> {
        let template = ctx.template;

        let has_primary = chance_100(template.equipment_chance(EquipmentSlot::FirstPrimaryWeapon), rng)
            && generate_weapon(ctx, inventory, EquipmentSlot::FirstPrimaryWeapon, rng)?.is_some();

        if has_primary
            && chance_100(template.equipment_chance(EquipmentSlot::SecondPrimaryWeapon), rng)
        {
            generate_weapon(ctx, inventory, EquipmentSlot::SecondPrimaryWeapon, rng)?;
        }

        let holster_chance = if has_primary {
            template.equipment_chance(EquipmentSlot::Holster)
        } else {
            100
        };
        if chance_100(holster_chance, rng) {
            generate_weapon(ctx, inventory, EquipmentSlot::Holster, rng)?;
        }
        Ok(())
    }
}

impl Generator<GeneratedInventory> for BotInventoryGenerator {
    fn generate(
        &self,
        request: &GenerationRequest,
        rng: &mut StdRng,
    ) -> QuartermasterResult<GeneratedInventory> {
        self.generate_inventory(request, rng)
    }

    fn validate(&self, content: &GeneratedInventory) -> QuartermasterResult<()> {
        content.validate_integrity()
    }

    fn generator_type(&self) -> &'static str {
        "BotInventoryGenerator"
    }
}
