//! Conversions between flat `{id, parent_id}` lists and nested forests.

use std::collections::HashMap;

use log::{debug, warn};

use crate::misc::on_cycle;
use crate::model::FlatEntry;

/// A record that can be arranged in a parent/child hierarchy.
pub trait Hierarchical: Clone {
    fn id(&self) -> i64;

    /// The parent this record points at, or `None` when it is a root marker.
    fn parent_id(&self) -> Option<i64>;

    fn name(&self) -> &str;

    fn children(&self) -> &[Self];

    fn children_mut(&mut self) -> &mut Vec<Self>;

    /// A copy of this record with an empty `children` list.
    fn without_children(&self) -> Self;
}

/// Nests a flat list of records under their parents.
///
/// Records whose parent is missing from `flat`, points at the record itself,
/// or closes a cycle become roots. Nothing is dropped: every input record
/// appears exactly once in the returned forest, and children keep their input
/// order. When any record already carries children the input is treated as a
/// finished tree and returned as is.
pub fn build_tree<T: Hierarchical>(flat: &[T]) -> Vec<T> {
    if flat.iter().any(|node| !node.children().is_empty()) {
        debug!("input already nested, passing {} roots through", flat.len());
        return flat.to_vec();
    }

    let mut index: HashMap<i64, usize> = HashMap::with_capacity(flat.len());
    for (i, node) in flat.iter().enumerate() {
        index.entry(node.id()).or_insert(i);
    }

    let mut parents: Vec<Option<usize>> = flat
        .iter()
        .map(|node| {
            node.parent_id()
                .filter(|&parent| parent != node.id())
                .and_then(|parent| index.get(&parent).copied())
        })
        .collect();

    // Cut the first member of every cycle, in input order.
    for start in 0..flat.len() {
        if on_cycle(&parents, start) {
            warn!(
                "id {} is its own ancestor, treating it as a root",
                flat[start].id()
            );
            parents[start] = None;
        }
    }

    let mut children: Vec<Vec<usize>> = vec![vec![]; flat.len()];
    let mut roots = vec![];
    for (i, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(i),
            None => roots.push(i),
        }
    }

    roots
        .into_iter()
        .map(|root| assemble(flat, &children, root))
        .collect()
}

fn assemble<T: Hierarchical>(flat: &[T], children: &[Vec<usize>], i: usize) -> T {
    let mut node = flat[i].without_children();
    *node.children_mut() = children[i]
        .iter()
        .map(|&child| assemble(flat, children, child))
        .collect();
    node
}

/// Lists a forest in pre-order, tagging each node with its depth.
///
/// Top-level nodes get `start_level`. The node with `exclude_id`, if any, is
/// left out together with its whole subtree, so a node being edited cannot
/// pick itself or one of its descendants as its parent.
pub fn flatten_tree<T: Hierarchical>(
    forest: &[T],
    start_level: usize,
    exclude_id: Option<i64>,
) -> Vec<FlatEntry<T>> {
    let mut result = vec![];
    flatten_into(forest, start_level, exclude_id, &mut result);
    result
}

fn flatten_into<T: Hierarchical>(
    forest: &[T],
    level: usize,
    exclude_id: Option<i64>,
    result: &mut Vec<FlatEntry<T>>,
) {
    for node in forest {
        if exclude_id == Some(node.id()) {
            continue;
        }
        result.push(FlatEntry {
            level,
            node: node.without_children(),
        });
        flatten_into(node.children(), level + 1, exclude_id, result);
    }
}

pub fn find_node<T: Hierarchical>(forest: &[T], id: i64) -> Option<&T> {
    for node in forest {
        if node.id() == id {
            return Some(node);
        }
        if let Some(found) = find_node(node.children(), id) {
            return Some(found);
        }
    }
    None
}

pub fn find_name<T: Hierarchical>(forest: &[T], id: i64) -> Option<&str> {
    find_node(forest, id).map(|node| node.name())
}

pub fn count_nodes<T: Hierarchical>(forest: &[T]) -> usize {
    forest
        .iter()
        .map(|node| 1 + count_nodes(node.children()))
        .sum()
}

/// Ids of every node that has children, in pre-order.
pub fn parent_ids<T: Hierarchical>(forest: &[T]) -> Vec<i64> {
    let mut result = vec![];
    for node in forest {
        if !node.children().is_empty() {
            result.push(node.id());
            result.extend(parent_ids(node.children()));
        }
    }
    result
}

/// Picker label: one ideographic space per level, then the name.
pub fn option_label<T: Hierarchical>(entry: &FlatEntry<T>) -> String {
    format!("{}{}", "\u{3000}".repeat(entry.level), entry.node.name())
}
