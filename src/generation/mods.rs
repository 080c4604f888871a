//! # Mod Attachment
//!
//! Attaches mods to a staged item tree from a role's mod pool.
//!
//! Traversal uses an explicit worklist of `(node, template, depth)` frames
//! rather than recursion. Each frame fills the pooled slots of one template;
//! every mod it attaches becomes a new frame. Frames past the configured
//! depth are dropped with a warning.

use super::{mod_conflict, static_properties, ModPool};
use crate::{
    chance_100, ExhaustablePool, ItemCatalog, ItemProperties, ItemTree, NodeIndex,
    SlotDefinition, TemplateId,
};
use log::{debug, warn};
use rand::Rng;
use std::collections::BTreeMap;

/// Why mod assembly gave up on an item.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ModAssemblyError {
    /// A required slot had no compatible candidate left
    #[error("required slot {slot} on {parent} could not be filled")]
    RequiredSlotUnfilled { parent: TemplateId, slot: String },
}

const NO_CANDIDATES: &[TemplateId] = &[];

/// One pending template whose slots still have to be filled.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    node: NodeIndex,
    tpl: TemplateId,
    depth: usize,
}

/// Fills mod slots of staged trees.
#[derive(Debug, Clone, Copy)]
pub struct ModAssembler<'a> {
    catalog: &'a ItemCatalog,
    pool: &'a ModPool,
    chances: &'a BTreeMap<String, u32>,
    max_depth: usize,
}

impl<'a> ModAssembler<'a> {
    /// `chances` maps slot names to the spawn chance of optional slots.
    pub fn new(
        catalog: &'a ItemCatalog,
        pool: &'a ModPool,
        chances: &'a BTreeMap<String, u32>,
        max_depth: usize,
    ) -> Self {
        Self {
            catalog,
            pool,
            chances,
            max_depth,
        }
    }

    /// Fills the pooled slots below `start`, depth first.
    ///
    /// Slots that already hold a child are left alone. An optional slot with
    /// no viable candidate is skipped; a required one fails the whole item.
    /// Required slots missing from the pool are filled from the catalog.
    pub fn assemble<R: Rng + ?Sized>(
        &self,
        tree: &mut ItemTree,
        start: NodeIndex,
        rng: &mut R,
    ) -> Result<(), ModAssemblyError> {
        let Some(start_tpl) = tree.node(start).map(|node| node.tpl.clone()) else {
            return Ok(());
        };
        let mut worklist = vec![Frame {
            node: start,
            tpl: start_tpl,
            depth: 0,
        }];

        while let Some(frame) = worklist.pop() {
            let pooled = self.pool.get(&frame.tpl);
            let Some(template) = self.catalog.get(&frame.tpl) else {
                if pooled.is_some() {
                    warn!("Mod parent {} is not in the catalog", frame.tpl);
                }
                continue;
            };
            // Required slots the role never pooled still have to be filled.
            let unpooled: Vec<&SlotDefinition> = template
                .slots
                .iter()
                .filter(|slot| {
                    slot.required
                        && !slot.name.starts_with("camora")
                        && pooled.map_or(true, |slots| !slots.contains_key(&slot.name))
                })
                .collect();
            if pooled.is_none() && unpooled.is_empty() {
                continue;
            }
            if frame.depth >= self.max_depth {
                warn!(
                    "Mod tree below {} exceeds depth {}, not descending further",
                    frame.tpl, self.max_depth
                );
                continue;
            }
            let cylinder = template.is_cylinder_magazine();

            let slots = pooled
                .into_iter()
                .flatten()
                .map(|(name, candidates)| (name.as_str(), candidates.as_slice()))
                .chain(unpooled.iter().map(|slot| (slot.name.as_str(), NO_CANDIDATES)));
            for (slot_name, candidates) in slots {
                let Some(slot) = template.find_slot(slot_name) else {
                    debug!("{} has no slot {}, skipping", frame.tpl, slot_name);
                    continue;
                };
                if tree.child_in_slot(frame.node, slot_name).is_some() {
                    continue;
                }
                if !slot.required && !self.rolls_optional(slot_name, rng) {
                    continue;
                }

                if cylinder && slot_name.starts_with("camora") {
                    if let Some(round) = candidates
                        .iter()
                        .find(|candidate| self.catalog.slot_accepts(slot, candidate))
                    {
                        tree.add_child(frame.node, slot_name, round.clone(), Some(ItemProperties::stack(1)));
                    }
                    continue;
                }

                let chosen = self
                    .pick_from_pool(tree, frame.node, slot, candidates, rng)
                    .or_else(|| {
                        if slot.required {
                            self.pick_from_catalog(tree, frame.node, slot)
                        } else {
                            None
                        }
                    });

                match chosen {
                    Some(tpl) => {
                        let properties = self.catalog.get(&tpl).and_then(mod_properties);
                        let child = tree.add_child(frame.node, slot_name, tpl.clone(), properties);
                        worklist.push(Frame {
                            node: child,
                            tpl,
                            depth: frame.depth + 1,
                        });
                    }
                    None if slot.required => {
                        warn!("Required slot {} on {} left empty", slot_name, frame.tpl);
                        return Err(ModAssemblyError::RequiredSlotUnfilled {
                            parent: frame.tpl.clone(),
                            slot: slot_name.to_string(),
                        });
                    }
                    None => debug!("No compatible mod for {} on {}", slot_name, frame.tpl),
                }
            }
        }
        Ok(())
    }

    fn rolls_optional<R: Rng + ?Sized>(&self, slot_name: &str, rng: &mut R) -> bool {
        match self.chances.get(slot_name) {
            Some(&chance) => chance_100(chance, rng),
            None => false,
        }
    }

    fn is_viable(&self, tree: &ItemTree, parent: NodeIndex, slot: &SlotDefinition, tpl: &str) -> bool {
        let Some(template) = self.catalog.get(tpl) else {
            warn!("Mod candidate {} is not in the catalog", tpl);
            return false;
        };
        !template.is_node()
            && self.catalog.slot_accepts(slot, tpl)
            && !mod_conflict(self.catalog, tree, parent, template)
    }

    /// Draws pool candidates without replacement until one fits.
    fn pick_from_pool<R: Rng + ?Sized>(
        &self,
        tree: &ItemTree,
        parent: NodeIndex,
        slot: &SlotDefinition,
        candidates: &[TemplateId],
        rng: &mut R,
    ) -> Option<TemplateId> {
        let mut pool = ExhaustablePool::new(candidates.iter());
        while let Some(candidate) = pool.draw_random(rng) {
            if self.is_viable(tree, parent, slot, candidate) {
                return Some(candidate.clone());
            }
        }
        None
    }

    /// First concrete template in the slot's own whitelist that fits.
    fn pick_from_catalog(
        &self,
        tree: &ItemTree,
        parent: NodeIndex,
        slot: &SlotDefinition,
    ) -> Option<TemplateId> {
        let found = slot
            .filter
            .whitelist
            .iter()
            .find(|tpl| self.catalog.contains(tpl) && self.is_viable(tree, parent, slot, tpl))
            .cloned();
        if let Some(tpl) = &found {
            debug!("Pool for {} exhausted, using catalog fallback {}", slot.name, tpl);
        }
        found
    }
}

/// Properties a mod spawns with.
fn mod_properties(template: &crate::ItemTemplate) -> Option<ItemProperties> {
    if template.is_ammo() {
        Some(ItemProperties::stack(1))
    } else {
        static_properties(template)
    }
}
