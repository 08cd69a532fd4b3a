//! Exit semantics shared by every history-mutating operation.
//!
//! Conflicts are a first-class outcome, not an error: the conflicted paths
//! are already staged into the index by the caller, and the operation has
//! halted cleanly awaiting `--continue` or `--abort`.

use kit_index::ConflictType;

/// Result of a history-mutating operation (commit, merge, cherry-pick,
/// rebase step, reset, fetch, push).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operation completed and advanced refs/the index as expected.
    Ok,
    /// One or more paths could not be merged automatically. The index now
    /// holds conflict entries for each path; refs were not advanced.
    Conflict(Vec<(String, ConflictType)>),
    /// The operation produced no change (e.g. a commit whose tree equals its
    /// parent's tree).
    Empty,
    /// A merge resolved to a fast-forward: the branch tip moved, no merge
    /// commit was created.
    FastForward,
    /// A named ref, oid, or sequencer state did not exist.
    NotFound,
    /// A ref update lost a compare-and-set race against a concurrent writer.
    ConcurrentUpdate,
    /// The repository is not in a state that permits this operation (e.g.
    /// `--continue` with nothing pending, or uncommitted changes blocking a
    /// checkout).
    InvalidState(String),
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok | Outcome::FastForward)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Outcome::Conflict(_))
    }
}
