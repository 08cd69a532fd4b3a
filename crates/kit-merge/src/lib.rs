//! Merge engine: three-way tree merge with typed conflict classification,
//! the shared apply-commit kernel that powers `merge` and `cherry-pick`, and
//! the multi-commit rebase sequencer.
//!
//! The conflict taxonomy (`kit_index::ConflictType`) is shared with the
//! index: a tree merge stages its conflicts directly into index stages
//! 1/2/3, and the types line up exactly so no translation layer is needed.

pub mod apply;
pub mod cherry_pick;
pub mod conflict;
pub mod content;
pub mod merge;
pub mod sequencer;
pub mod tree;

pub use content::DefaultTextMerger;
pub use kit_index::ConflictType;
pub use tree::merge_trees;

use bstr::BString;
use kit_hash::ObjectId;
use kit_object::FileMode;

/// Result of a tree-level merge, or of a history-mutating operation built on
/// one (merge, cherry-pick, rebase step).
#[derive(Debug, Clone)]
pub struct MergeResult {
    /// The resulting tree OID, present iff the merge was clean.
    pub tree: Option<ObjectId>,
    /// Whether the merge was clean (no conflicts).
    pub is_clean: bool,
    /// List of conflicts (empty if clean).
    pub conflicts: Vec<ConflictEntry>,
    /// Commit message to use if the caller goes on to create a commit.
    pub message: Option<String>,
}

impl MergeResult {
    /// Create a clean merge result.
    pub fn clean(tree: ObjectId) -> Self {
        Self {
            tree: Some(tree),
            is_clean: true,
            conflicts: Vec::new(),
            message: None,
        }
    }

    /// Create a conflicted merge result.
    pub fn conflicted(conflicts: Vec<ConflictEntry>) -> Self {
        Self {
            tree: None,
            is_clean: false,
            conflicts,
            message: None,
        }
    }
}

/// A single path's conflict, carrying only the oids the index needs to stage
/// stages 1 (base), 2 (ours), 3 (theirs) — per §9, a tagged variant with four
/// cases, nothing stringly-typed at the call sites.
#[derive(Debug, Clone)]
pub struct ConflictEntry {
    /// Path of the conflicted file.
    pub path: BString,
    /// Type of conflict.
    pub conflict_type: ConflictType,
    /// Base (common ancestor) side, absent for `add_add`.
    pub base: Option<ConflictSide>,
    /// Our side (current branch), absent for `current_delete_target_modify`.
    pub ours: Option<ConflictSide>,
    /// Their side (branch being merged), absent for `current_modify_target_delete`.
    pub theirs: Option<ConflictSide>,
}

/// One side of a conflict.
#[derive(Debug, Clone, Copy)]
pub struct ConflictSide {
    /// Object ID of this side's content. For `content_conflict` and
    /// `add_add`, `ours`/`theirs` point at the original (un-marked) blob;
    /// the marked blob produced by the textual merger is carried separately
    /// on `MergeResult` by the caller that writes it.
    pub oid: ObjectId,
    /// File mode.
    pub mode: FileMode,
}

/// Result of a three-way content merge.
#[derive(Debug, Clone)]
pub enum ContentMergeResult {
    /// Clean merge, no conflicts.
    Clean(Vec<u8>),
    /// Conflict with markers in the content.
    Conflict {
        /// Merged content including conflict markers.
        content: Vec<u8>,
        /// Number of conflict regions.
        conflict_count: usize,
    },
}

impl ContentMergeResult {
    /// Whether the merge was clean.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean(_))
    }

    /// Get the merged content (with or without conflict markers).
    pub fn content(&self) -> &[u8] {
        match self {
            Self::Clean(data) => data,
            Self::Conflict { content, .. } => content,
        }
    }
}

/// Error types for merge operations.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("no merge base found")]
    NoMergeBase,

    #[error("commit {0} is a merge commit; cherry-pick requires a mainline parent")]
    AmbiguousMergeCommit(ObjectId),

    #[error("sequencer already in progress (use --continue, --abort, or --skip)")]
    SequencerInProgress,

    #[error("no cherry-pick or merge in progress")]
    NoOperationInProgress,

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("expected {expected} object, got {actual} for {oid}")]
    UnexpectedObjectType {
        oid: ObjectId,
        expected: &'static str,
        actual: String,
    },

    #[error("invalid sequencer state: {0}")]
    InvalidSequencerState(String),

    #[error(transparent)]
    Odb(#[from] kit_odb::OdbError),

    #[error(transparent)]
    Repo(#[from] kit_repository::RepoError),

    #[error(transparent)]
    Index(#[from] kit_index::IndexError),

    #[error(transparent)]
    RevWalk(#[from] kit_revwalk::RevWalkError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
