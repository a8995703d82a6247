use crate::tree::Hierarchical;

/// Collects `node` and every node below it.
pub(crate) fn walk_collect<T: Hierarchical>(node: &T) -> Vec<&T> {
    let mut result = vec![];
    let mut queue = vec![node];
    while let Some(node) = queue.pop() {
        result.push(node);
        queue.extend(node.children().iter().rev());
    }
    result
}

/// Follows the parent links from `start` and reports whether they lead back to it.
pub(crate) fn on_cycle(parents: &[Option<usize>], start: usize) -> bool {
    let mut current = parents[start];
    for _ in 0..parents.len() {
        match current {
            None => return false,
            Some(index) if index == start => return true,
            Some(index) => current = parents[index],
        }
    }
    false
}
