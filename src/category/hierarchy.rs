//! Depth, parent validation and tree assembly for the category forest.
//!
//! Depth is the number of ancestors: a root is at depth 0, and nothing may sit deeper than
//! [`MAX_DEPTH`]. Walks over stored parent links are bounded by [`WALK_LIMIT`] and track the
//! ids they have seen, so corrupt data (a cycle, a parent that no longer exists) becomes
//! [`ServiceError::Integrity`] instead of a hang.

use crate::error::{EntityKind, ServiceError};
use crate::model::{Category, CategoryNode};
use crate::store::EntityStore;
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Deepest allowed depth; three levels in total
pub const MAX_DEPTH: usize = 2;

/// Upper bound on parent hops before a walk is declared corrupt
pub const WALK_LIMIT: usize = 10;

/// Ids from `id` up to its root, `id` first
fn ancestry(store: &dyn EntityStore, id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
    let start = store
        .find_category(id)?
        .ok_or_else(|| ServiceError::not_found(EntityKind::Category, id))?;

    let mut chain = vec![id];
    let mut cursor = start.parent;
    while let Some(parent_id) = cursor {
        if chain.contains(&parent_id) {
            return Err(ServiceError::integrity(format!(
                "category {id} has a cycle in its ancestry at {parent_id}"
            )));
        }
        if chain.len() > WALK_LIMIT {
            return Err(ServiceError::integrity(format!(
                "ancestry of category {id} exceeds {WALK_LIMIT} levels"
            )));
        }
        let parent = store.find_category(parent_id)?.ok_or_else(|| {
            ServiceError::integrity(format!(
                "category {} points at missing parent {parent_id}",
                chain[chain.len() - 1]
            ))
        })?;
        chain.push(parent_id);
        cursor = parent.parent;
    }
    Ok(chain)
}

/// Number of ancestors of category `id`
///
/// `NotFound` when `id` itself does not exist; `Integrity` when the walk hits a cycle, a
/// dangling parent, or more than [`WALK_LIMIT`] hops.
pub fn compute_depth(store: &dyn EntityStore, id: Uuid) -> Result<usize, ServiceError> {
    Ok(ancestry(store, id)?.len() - 1)
}

/// Levels below category `id` (0 for a leaf)
pub fn subtree_height(store: &dyn EntityStore, id: Uuid) -> Result<usize, ServiceError> {
    let mut seen = HashSet::from([id]);
    let mut level = vec![id];
    let mut height = 0;
    loop {
        let mut next = Vec::new();
        for parent in &level {
            for child in store.child_categories(*parent)? {
                if !seen.insert(child.id) {
                    return Err(ServiceError::integrity(format!(
                        "category {} is reachable twice below {id}",
                        child.id
                    )));
                }
                next.push(child.id);
            }
        }
        if next.is_empty() {
            return Ok(height);
        }
        height += 1;
        if height > WALK_LIMIT {
            return Err(ServiceError::integrity(format!(
                "subtree below category {id} exceeds {WALK_LIMIT} levels"
            )));
        }
        level = next;
    }
}

/// Check that `category` (or a new category, when `None`) may hang under `proposed`
///
/// Rules, first failure wins:
/// 1. a category cannot be its own parent (`InvalidParent`);
/// 2. `None` (root) is always fine;
/// 3. the parent must exist (`InvalidParent`);
/// 4. the parent must not be a descendant of `category` (`InvalidParent`);
/// 5. the parent must sit above [`MAX_DEPTH`] (`MaxDepthExceeded`);
/// 6. when moving an existing category, its deepest descendant must stay within
///    [`MAX_DEPTH`] too (`MaxDepthExceeded`).
///
/// The descendant rule takes precedence over the depth rules: moving a root beneath its own
/// grandchild is `InvalidParent`, not `MaxDepthExceeded`.
pub fn validate_parent_assignment(
    store: &dyn EntityStore,
    category: Option<Uuid>,
    proposed: Option<Uuid>,
) -> Result<(), ServiceError> {
    if proposed.is_some() && proposed == category {
        return Err(ServiceError::InvalidParent(
            "a category cannot be its own parent".to_string(),
        ));
    }
    let Some(parent_id) = proposed else {
        return Ok(());
    };

    if store.find_category(parent_id)?.is_none() {
        return Err(ServiceError::InvalidParent(format!(
            "parent category {parent_id} does not exist"
        )));
    }

    let chain = ancestry(store, parent_id)?;
    if let Some(id) = category {
        if chain.contains(&id) {
            return Err(ServiceError::InvalidParent(
                "a category cannot be moved beneath its own descendant".to_string(),
            ));
        }
    }

    let parent_depth = chain.len() - 1;
    if parent_depth >= MAX_DEPTH {
        return Err(ServiceError::MaxDepthExceeded {
            depth: parent_depth + 1,
        });
    }

    if let Some(id) = category {
        let deepest = parent_depth + 1 + subtree_height(store, id)?;
        if deepest > MAX_DEPTH {
            return Err(ServiceError::MaxDepthExceeded { depth: deepest });
        }
    }

    Ok(())
}

/// Forest of nodes below `root` (all roots when `None`), children in store order
pub fn build_tree(
    store: &dyn EntityStore,
    root: Option<Uuid>,
) -> Result<Vec<CategoryNode>, ServiceError> {
    assemble_tree(&store.list_categories()?, root)
}

/// [`build_tree`] over an already fetched category list
///
/// Visits nodes breadth-first from `root` with an explicit queue, then assembles bottom-up,
/// so depth of recursion never depends on the data. A node reached twice means the stored
/// parent links contain a cycle through `root`; for the whole forest, a row never reached
/// means a cycle or a dangling parent elsewhere. Both are `Integrity` errors.
pub fn assemble_tree(
    categories: &[Category],
    root: Option<Uuid>,
) -> Result<Vec<CategoryNode>, ServiceError> {
    let mut children: HashMap<Option<Uuid>, Vec<usize>> = HashMap::new();
    for (idx, category) in categories.iter().enumerate() {
        children.entry(category.parent).or_default().push(idx);
    }

    let mut order = Vec::with_capacity(categories.len());
    let mut seen = HashSet::new();
    let mut queue: VecDeque<usize> = children.get(&root).cloned().unwrap_or_default().into();
    while let Some(idx) = queue.pop_front() {
        let id = categories[idx].id;
        if !seen.insert(id) {
            return Err(ServiceError::integrity(format!(
                "category {id} is reachable twice while building the tree"
            )));
        }
        order.push(idx);
        if let Some(kids) = children.get(&Some(id)) {
            queue.extend(kids.iter().copied());
        }
    }

    // The whole forest must account for every row; the rest hang off a cycle or a missing parent.
    if root.is_none() && order.len() != categories.len() {
        if let Some(stray) = categories.iter().find(|c| !seen.contains(&c.id)) {
            return Err(ServiceError::integrity(format!(
                "category {} is not reachable from any root",
                stray.id
            )));
        }
    }

    let mut built: HashMap<usize, CategoryNode> = HashMap::with_capacity(order.len());
    for &idx in order.iter().rev() {
        let mut node = CategoryNode::leaf(&categories[idx]);
        if let Some(kids) = children.get(&Some(categories[idx].id)) {
            node.children = kids.iter().filter_map(|k| built.remove(k)).collect();
        }
        built.insert(idx, node);
    }

    Ok(children
        .get(&root)
        .map(|top| top.iter().filter_map(|k| built.remove(k)).collect())
        .unwrap_or_default())
}
