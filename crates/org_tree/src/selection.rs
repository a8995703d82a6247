//! Role menu permissions: the selected set and the checkbox toggle that keeps
//! parents and children consistent.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::misc::walk_collect;
use crate::model::{MenuNode, MenuRef, Role};
use crate::tree::{count_nodes, find_node};

/// The menus granted to a role, keyed by menu id.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(from = "Vec<MenuRef>", into = "Vec<MenuRef>")]
pub struct MenuSelection {
    menus: BTreeMap<i64, MenuRef>,
}

impl MenuSelection {
    pub fn new() -> Self {
        MenuSelection::default()
    }

    pub fn from_role(role: &Role) -> Self {
        role.menus.iter().cloned().collect()
    }

    pub fn contains(&self, menu_id: i64) -> bool {
        self.menus.contains_key(&menu_id)
    }

    pub fn get(&self, menu_id: i64) -> Option<&MenuRef> {
        self.menus.get(&menu_id)
    }

    pub fn len(&self) -> usize {
        self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.menus.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MenuRef> {
        self.menus.values()
    }

    /// The `menus` payload submitted with a role create or update.
    pub fn into_menus(self) -> Vec<MenuRef> {
        self.menus.into_values().collect()
    }

    fn insert(&mut self, menu: MenuRef) {
        self.menus.entry(menu.menu_id).or_insert(menu);
    }

    fn remove(&mut self, menu_id: i64) {
        self.menus.remove(&menu_id);
    }
}

impl FromIterator<MenuRef> for MenuSelection {
    fn from_iter<I: IntoIterator<Item = MenuRef>>(iter: I) -> Self {
        let mut selection = MenuSelection::new();
        for menu in iter {
            selection.insert(menu);
        }
        selection
    }
}

impl From<Vec<MenuRef>> for MenuSelection {
    fn from(menus: Vec<MenuRef>) -> Self {
        menus.into_iter().collect()
    }
}

impl From<MenuSelection> for Vec<MenuRef> {
    fn from(selection: MenuSelection) -> Self {
        selection.into_menus()
    }
}

/// Checkbox state of a menu in the permission editor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Checked,
    Unchecked,
    Partial,
}

/// Applies checkbox toggles against a fixed menu tree.
///
/// After every operation a menu with children is selected exactly when all of
/// its children are selected.
#[derive(Debug, Clone)]
pub struct PermissionSelector {
    tree: Vec<MenuNode>,
    node_count: usize,
}

impl PermissionSelector {
    pub fn new(tree: Vec<MenuNode>) -> Self {
        let node_count = count_nodes(&tree);
        PermissionSelector { tree, node_count }
    }

    pub fn tree(&self) -> &[MenuNode] {
        &self.tree
    }

    /// Returns the selection after the user clicks `node`'s checkbox.
    ///
    /// Clicking a selected node clears it and everything below it; clicking an
    /// unselected one selects it and everything below it. Parents are then
    /// re-derived from their children across the whole tree. `node` is expected
    /// to come from this selector's tree; any other node only flips itself and
    /// its own subtree.
    pub fn toggle(&self, selected: &MenuSelection, node: &MenuNode) -> MenuSelection {
        let mut next = selected.clone();
        let subtree = walk_collect(node);
        if selected.contains(node.menu_id) {
            debug!("deselecting menu {} and {} below", node.menu_id, subtree.len() - 1);
            for menu in subtree {
                next.remove(menu.menu_id);
            }
        } else {
            debug!("selecting menu {} and {} below", node.menu_id, subtree.len() - 1);
            for menu in subtree {
                next.insert(menu.to_ref());
            }
        }
        self.settle(&mut next);
        next
    }

    /// Like [`toggle`](Self::toggle), looking the node up by id.
    pub fn toggle_id(&self, selected: &MenuSelection, menu_id: i64) -> MenuSelection {
        match find_node(&self.tree, menu_id) {
            Some(node) => self.toggle(selected, node),
            None => {
                warn!("menu {} is not in the menu tree", menu_id);
                let name = selected
                    .get(menu_id)
                    .map(|menu| menu.menu_name.as_str())
                    .unwrap_or_default();
                self.toggle(selected, &MenuNode::new(menu_id, name, vec![]))
            }
        }
    }

    /// Re-derives every parent from its children without toggling anything.
    pub fn repair(&self, selected: &MenuSelection) -> MenuSelection {
        let mut next = selected.clone();
        self.settle(&mut next);
        next
    }

    /// `Partial` means unselected with at least one selected descendant.
    pub fn check_state(&self, selected: &MenuSelection, node: &MenuNode) -> CheckState {
        if selected.contains(node.menu_id) {
            return CheckState::Checked;
        }
        let below = walk_collect(node);
        if below[1..].iter().any(|menu| selected.contains(menu.menu_id)) {
            CheckState::Partial
        } else {
            CheckState::Unchecked
        }
    }

    fn settle(&self, selected: &mut MenuSelection) {
        // A well-formed tree settles within depth + 1 passes.
        for _ in 0..=self.node_count {
            if !settle_pass(&self.tree, selected) {
                return;
            }
        }
        warn!(
            "menu selection did not settle after {} passes, menu ids may repeat",
            self.node_count + 1
        );
    }
}

fn settle_pass(nodes: &[MenuNode], selected: &mut MenuSelection) -> bool {
    let mut changed = false;
    for node in nodes {
        if node.children.is_empty() {
            continue;
        }
        let present = selected.contains(node.menu_id);
        let complete = node
            .children
            .iter()
            .all(|child| selected.contains(child.menu_id));
        if !present && complete {
            selected.insert(node.to_ref());
            changed = true;
        } else if present && !complete {
            selected.remove(node.menu_id);
            changed = true;
        }
        changed |= settle_pass(&node.children, selected);
    }
    changed
}
