//! Revision walking: commit traversal, merge-base (lowest common ancestor)
//! computation, and reachable-object enumeration for `fetch`/`push`.
//!
//! This crate provides the core `RevWalk` iterator for traversing commit
//! history in various orders (chronological, topological, author-date,
//! reverse), merge-base computation via bidirectional BFS, and reachable
//! object enumeration used to compute the transfer set for `fetch`/`push`.
//! Commit-graph acceleration, `git log`-style pretty-printing, and graph
//! visualisation are out of scope (§1): this crate answers "what can reach
//! what", not "how should it be displayed".

mod merge_base;
mod objects;
mod walk;

pub use merge_base::{is_ancestor, merge_base, merge_base_one};
pub use objects::list_objects;
pub use walk::{RevWalk, SortOrder, WalkOptions};

use kit_hash::ObjectId;

/// Errors produced by revision walking operations.
#[derive(Debug, thiserror::Error)]
pub enum RevWalkError {
    #[error("invalid revision: {0}")]
    InvalidRevision(String),

    #[error("commit not found: {0}")]
    CommitNotFound(ObjectId),

    #[error("object is not a commit: {0}")]
    NotACommit(ObjectId),

    #[error("no merge base found")]
    NoMergeBase,

    #[error(transparent)]
    Odb(#[from] kit_odb::OdbError),

    #[error(transparent)]
    Ref(#[from] kit_ref::RefError),

    #[error(transparent)]
    Repo(#[from] kit_repository::RepoError),

    #[error(transparent)]
    Object(#[from] kit_object::ObjectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
