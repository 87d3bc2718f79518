//! The category hierarchy: a forest at most three levels deep.

pub mod hierarchy;
pub mod service;

pub use hierarchy::{
    assemble_tree, build_tree, compute_depth, subtree_height, validate_parent_assignment,
    MAX_DEPTH, WALK_LIMIT,
};
pub use service::CategoryService;
