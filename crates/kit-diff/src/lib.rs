//! Diff engine: the Myers line-level algorithm feeding the three-way text
//! merger, and a tree-to-tree diff reporting changed blob paths.
//!
//! Line-level hunk formatting, binary detection, pathspec filtering, and
//! rename/copy detection are out of scope (§4.4): this crate exists to
//! support the history engine's merge logic, not human-readable diff output.

pub mod algorithm;
pub mod tree;

pub use tree::{diff_trees, TreeChange};

use kit_hash::ObjectId;

/// Error types for diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("failed to read object {oid}: {source}")]
    ObjectRead {
        oid: ObjectId,
        #[source]
        source: kit_odb::OdbError,
    },

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("expected {expected} object, got {actual} for {oid}")]
    UnexpectedObjectType {
        oid: ObjectId,
        expected: &'static str,
        actual: String,
    },
}
