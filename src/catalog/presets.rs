//! # Weapon Presets
//!
//! Hand-authored weapon trees used when procedural mod assembly produces an
//! invalid weapon. Presets are read-only data like the rest of the catalog.

use crate::{ItemProperties, QuartermasterResult, TemplateId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One item of a preset tree. Ids are local to the preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetItem {
    pub id: String,
    pub tpl: TemplateId,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub slot_id: Option<String>,
    #[serde(default)]
    pub upd: Option<ItemProperties>,
}

/// A complete weapon tree. The first item is the weapon root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponPreset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub weapon: TemplateId,
    pub items: Vec<PresetItem>,
}

impl WeaponPreset {
    /// The weapon root, if the preset is well formed.
    pub fn root(&self) -> Option<&PresetItem> {
        self.items.first().filter(|item| item.tpl == self.weapon)
    }
}

/// Presets grouped by weapon template, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct PresetBook {
    by_weapon: HashMap<TemplateId, Vec<WeaponPreset>>,
}

impl PresetBook {
    pub fn new(presets: impl IntoIterator<Item = WeaponPreset>) -> Self {
        let mut by_weapon: HashMap<TemplateId, Vec<WeaponPreset>> = HashMap::new();
        for preset in presets {
            by_weapon
                .entry(preset.weapon.clone())
                .or_default()
                .push(preset);
        }
        Self { by_weapon }
    }

    /// Parses a JSON array of presets.
    pub fn from_json(json: &str) -> QuartermasterResult<Self> {
        let presets: Vec<WeaponPreset> = serde_json::from_str(json)?;
        Ok(Self::new(presets))
    }

    pub fn load(path: impl AsRef<Path>) -> QuartermasterResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// First well-formed preset declared for the weapon.
    pub fn first_for(&self, weapon: &str) -> Option<&WeaponPreset> {
        self.by_weapon
            .get(weapon)?
            .iter()
            .find(|preset| preset.root().is_some())
    }

    /// Every preset declared for the weapon.
    pub fn all_for(&self, weapon: &str) -> &[WeaponPreset] {
        self.by_weapon
            .get(weapon)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_weapon.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_weapon.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, tpl: &str, parent: Option<&str>, slot: Option<&str>) -> PresetItem {
        PresetItem {
            id: id.to_string(),
            tpl: tpl.to_string(),
            parent_id: parent.map(str::to_string),
            slot_id: slot.map(str::to_string),
            upd: None,
        }
    }

    #[test]
    fn test_first_well_formed_preset_wins() {
        let broken = WeaponPreset {
            id: "broken".to_string(),
            name: String::new(),
            weapon: "rifle".to_string(),
            items: vec![item("a", "stock", None, None)],
        };
        let good = WeaponPreset {
            id: "good".to_string(),
            name: String::new(),
            weapon: "rifle".to_string(),
            items: vec![
                item("w", "rifle", None, None),
                item("m", "mag", Some("w"), Some("mod_magazine")),
            ],
        };
        let book = PresetBook::new(vec![broken, good]);
        assert_eq!(book.len(), 2);
        assert_eq!(book.all_for("rifle").len(), 2);
        assert_eq!(book.first_for("rifle").map(|p| p.id.as_str()), Some("good"));
        assert!(book.first_for("pistol").is_none());
        assert!(book.all_for("pistol").is_empty());
    }

    #[test]
    fn test_from_json() {
        let book = PresetBook::from_json(
            r#"[{"id": "p1", "weapon": "rifle",
                 "items": [{"id": "w", "tpl": "rifle"},
                           {"id": "g", "tpl": "grip", "parent_id": "w", "slot_id": "mod_pistol_grip"}]}]"#,
        )
        .unwrap();
        let preset = book.first_for("rifle").unwrap();
        assert_eq!(preset.items.len(), 2);
        assert_eq!(preset.items[1].slot_id.as_deref(), Some("mod_pistol_grip"));
    }
}
