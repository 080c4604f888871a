//! # Staged Item Trees
//!
//! A small arena used while an item and its attachments are still being
//! assembled. Weapons, magazines and loot items are built here, inspected and
//! validated, and only then committed to a [`crate::BotInventory`] in one
//! step. A tree that fails validation is simply dropped.

use crate::{ItemCatalog, ItemProperties, QuartermasterError, QuartermasterResult, TemplateId, WeaponPreset};
use log::warn;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Index of a node inside an [`ItemTree`].
pub type NodeIndex = usize;

/// One staged item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub tpl: TemplateId,
    pub parent: Option<NodeIndex>,
    pub slot: Option<String>,
    pub properties: Option<ItemProperties>,
}

/// Staging arena rooted at node [`ItemTree::ROOT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTree {
    nodes: Vec<TreeNode>,
    children: Vec<Vec<NodeIndex>>,
}

impl ItemTree {
    /// Index of the root node.
    pub const ROOT: NodeIndex = 0;

    /// Starts a tree with a single root item.
    pub fn new(tpl: impl Into<TemplateId>, properties: Option<ItemProperties>) -> Self {
        Self {
            nodes: vec![TreeNode {
                tpl: tpl.into(),
                parent: None,
                slot: None,
                properties,
            }],
            children: vec![Vec::new()],
        }
    }

    /// Attaches a child under `parent` in `slot` and returns its index.
    pub fn add_child(
        &mut self,
        parent: NodeIndex,
        slot: impl Into<String>,
        tpl: impl Into<TemplateId>,
        properties: Option<ItemProperties>,
    ) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(TreeNode {
            tpl: tpl.into(),
            parent: Some(parent),
            slot: Some(slot.into()),
            properties,
        });
        self.children.push(Vec::new());
        self.children[parent].push(index);
        index
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[Self::ROOT]
    }

    pub fn root_mut(&mut self) -> &mut TreeNode {
        &mut self.nodes[Self::ROOT]
    }

    pub fn node(&self, index: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    pub fn node_mut(&mut self, index: NodeIndex) -> Option<&mut TreeNode> {
        self.nodes.get_mut(index)
    }

    /// All nodes in insertion order; parents always precede their children.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of a node.
    pub fn children(&self, parent: NodeIndex) -> &[NodeIndex] {
        self.children
            .get(parent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Child attached to `parent` in `slot`, if any.
    pub fn child_in_slot(&self, parent: NodeIndex, slot: &str) -> Option<NodeIndex> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.nodes[child].slot.as_deref() == Some(slot))
    }

    /// Indices of every node whose template satisfies `predicate`.
    pub fn find_all(&self, predicate: impl Fn(&TreeNode) -> bool) -> Vec<NodeIndex> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| predicate(node))
            .map(|(index, _)| index)
            .collect()
    }

    /// Sets the child of `parent` in `slot`, replacing the template and
    /// properties of an existing child instead of adding a second one.
    pub fn set_child(
        &mut self,
        parent: NodeIndex,
        slot: &str,
        tpl: &str,
        properties: Option<ItemProperties>,
    ) -> NodeIndex {
        match self.child_in_slot(parent, slot) {
            Some(existing) => {
                let node = &mut self.nodes[existing];
                node.tpl = tpl.to_string();
                node.properties = properties;
                existing
            }
            None => self.add_child(parent, slot, tpl, properties),
        }
    }

    /// Rebuilds a preset as a staged tree.
    ///
    /// Preset items are matched by their local ids; items that cannot be
    /// reached from the root are dropped with a warning. A preset that
    /// reaches the same id twice (a cycle or a duplicated id) is rejected.
    pub fn from_preset(preset: &WeaponPreset) -> QuartermasterResult<Self> {
        let root = preset.root().ok_or_else(|| QuartermasterError::WeaponAssembly {
            template: preset.weapon.clone(),
            reason: format!("preset {} does not start with its weapon", preset.id),
        })?;

        let mut by_parent: HashMap<&str, Vec<usize>> = HashMap::new();
        for (position, item) in preset.items.iter().enumerate().skip(1) {
            if let Some(parent) = item.parent_id.as_deref() {
                by_parent.entry(parent).or_default().push(position);
            }
        }

        let mut tree = ItemTree::new(root.tpl.clone(), root.upd.clone());
        let mut queue = VecDeque::from([(root.id.as_str(), Self::ROOT)]);
        let mut expanded: HashSet<&str> = HashSet::new();
        let mut attached = 1;
        while let Some((preset_id, node)) = queue.pop_front() {
            if !expanded.insert(preset_id) {
                return Err(QuartermasterError::WeaponAssembly {
                    template: preset.weapon.clone(),
                    reason: format!("preset {} reaches item {} more than once", preset.id, preset_id),
                });
            }
            for &position in by_parent.get(preset_id).into_iter().flatten() {
                let item = &preset.items[position];
                let slot = item.slot_id.clone().unwrap_or_default();
                let child = tree.add_child(node, slot, item.tpl.clone(), item.upd.clone());
                queue.push_back((item.id.as_str(), child));
                attached += 1;
            }
        }

        if attached < preset.items.len() {
            warn!(
                "Preset {} has {} items not reachable from its root",
                preset.id,
                preset.items.len() - attached
            );
        }
        Ok(tree)
    }

    /// Structural fingerprint: one `(slot path, template)` pair per node.
    ///
    /// Two trees with the same fingerprint hold the same templates in the
    /// same slots, regardless of node order.
    pub fn slot_paths(&self) -> BTreeSet<(String, TemplateId)> {
        let mut paths: Vec<String> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let path = match (node.parent, node.slot.as_deref()) {
                (Some(parent), Some(slot)) => format!("{}/{}", paths[parent], slot),
                _ => String::new(),
            };
            paths.push(path);
        }
        paths
            .into_iter()
            .zip(self.nodes.iter())
            .map(|(path, node)| (path, node.tpl.clone()))
            .collect()
    }

    /// Grid footprint of the whole tree: the root size grown by the
    /// `extra_size` of attached mods.
    ///
    /// Per direction, non-forced growth takes the maximum and forced growth
    /// adds on top.
    pub fn footprint(&self, catalog: &ItemCatalog) -> (u32, u32) {
        footprint_of(
            catalog,
            &self.root().tpl,
            self.nodes.iter().skip(1).map(|node| node.tpl.as_str()),
        )
    }
}

/// Grid footprint of `root` with the given templates attached below it.
pub fn footprint_of<'a>(
    catalog: &ItemCatalog,
    root: &str,
    attached: impl IntoIterator<Item = &'a str>,
) -> (u32, u32) {
    let Some(root) = catalog.get(root) else {
        return (1, 1);
    };

    let (mut left, mut right, mut up, mut down) = (0, 0, 0, 0);
    let (mut forced_left, mut forced_right, mut forced_up, mut forced_down) = (0, 0, 0, 0);
    for tpl in attached {
        let Some(template) = catalog.get(tpl) else {
            continue;
        };
        let extra = template.extra_size;
        if extra.force_add {
            forced_left += extra.left;
            forced_right += extra.right;
            forced_up += extra.up;
            forced_down += extra.down;
        } else {
            left = left.max(extra.left);
            right = right.max(extra.right);
            up = up.max(extra.up);
            down = down.max(extra.down);
        }
    }

    (
        root.width + left + right + forced_left + forced_right,
        root.height + up + down + forced_up + forced_down,
    )
}
