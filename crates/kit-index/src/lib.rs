//! Index (staging area).
//!
//! Provides reading, writing, and manipulation of the index file that sits
//! between the working tree and the object database, tracking which paths
//! are staged for the next commit and recording in-progress merge conflicts
//! with enough fidelity to resume or abort.
//!
//! Unlike the teacher's binary `DIRC` format, the index here is serialized as
//! JSON (`serde`/`serde_json`) — a deliberate divergence from byte-identical
//! Git compatibility, which this engine does not aim for.

pub mod entry;
mod read;
mod write;

use std::path::Path;

use bstr::BStr;
use serde::{Deserialize, Serialize};

pub use entry::{EntryFlags, IndexEntry, StatData};
pub use error::IndexError;

mod error {
    use std::path::PathBuf;

    #[derive(Debug, thiserror::Error)]
    pub enum IndexError {
        #[error("invalid index entry: {reason}")]
        InvalidEntry { reason: String },

        #[error("malformed index file: {0}")]
        Malformed(#[from] serde_json::Error),

        #[error("lock failed: {path}")]
        LockFailed { path: PathBuf },

        #[error("cannot write a tree: the index has unresolved conflicts")]
        UnresolvedConflicts,

        #[error(transparent)]
        Io(#[from] std::io::Error),

        #[error(transparent)]
        Odb(#[from] kit_odb::OdbError),
    }
}

/// Merge stage for index entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Normal entry (stage 0).
    Normal,
    /// Base version in merge conflict (stage 1).
    Base,
    /// Ours version in merge conflict (stage 2).
    Ours,
    /// Theirs version in merge conflict (stage 3).
    Theirs,
}

impl Stage {
    pub fn as_u8(&self) -> u8 {
        match self {
            Stage::Normal => 0,
            Stage::Base => 1,
            Stage::Ours => 2,
            Stage::Theirs => 3,
        }
    }

    pub fn from_u8(n: u8) -> Result<Self, IndexError> {
        match n {
            0 => Ok(Stage::Normal),
            1 => Ok(Stage::Base),
            2 => Ok(Stage::Ours),
            3 => Ok(Stage::Theirs),
            _ => Err(IndexError::InvalidEntry {
                reason: format!("invalid stage: {n}"),
            }),
        }
    }
}

/// Typed classification of a conflicted path, matching the tags recorded by
/// the three-way tree merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictType {
    /// Both sides modified the path from a common base, content differs.
    Content,
    /// Both sides added the path (base had nothing there), content differs.
    AddAdd,
    /// Our side deleted the path, the other side modified it.
    CurrentDeleteTargetModify,
    /// Our side modified the path, the other side deleted it.
    CurrentModifyTargetDelete,
}

/// The index (staging area).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    /// Index format version.
    version: u32,
    /// Entries sorted by (path, stage).
    entries: Vec<IndexEntry>,
}

impl Index {
    /// Current on-disk format version.
    pub const VERSION: u32 = 1;

    /// Create a new empty index.
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            entries: Vec::new(),
        }
    }

    /// Read the index from a file.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        read::read_index(path.as_ref())
    }

    /// Write the index to a file (atomic, using a lock file).
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        write::write_index(self, path.as_ref())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the index empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get an entry by path and stage.
    pub fn get(&self, path: &BStr, stage: Stage) -> Option<&IndexEntry> {
        self.entries
            .iter()
            .find(|e| e.path[..] == path[..] && e.stage == stage)
    }

    /// Get all entries for a path (all stages).
    pub fn get_all(&self, path: &BStr) -> Vec<&IndexEntry> {
        self.entries
            .iter()
            .filter(|e| e.path[..] == path[..])
            .collect()
    }

    /// Add or update an entry. Maintains sorted order.
    ///
    /// Staging a path at [`Stage::Normal`] resolves any conflict recorded
    /// there: all of that path's stages are cleared first, matching how
    /// `git add` resolves a conflict by staging the chosen content. Staging
    /// a conflict stage (`Base`/`Ours`/`Theirs`) only replaces that single
    /// stage, so [`crate::IndexEntry`]s for the path's other stages survive.
    pub fn add(&mut self, entry: IndexEntry) {
        if entry.stage == Stage::Normal {
            self.entries.retain(|e| e.path != entry.path);
        } else {
            self.entries
                .retain(|e| !(e.path == entry.path && e.stage == entry.stage));
        }

        let pos = self
            .entries
            .binary_search_by(|e| cmp_entries(e, &entry))
            .unwrap_or_else(|pos| pos);
        self.entries.insert(pos, entry);
    }

    /// Remove entries matching a path and stage. Returns true if any were removed.
    pub fn remove(&mut self, path: &BStr, stage: Stage) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.path[..] == path[..] && e.stage == stage));
        self.entries.len() < before
    }

    /// Check if the path has conflicts (stages 1, 2, or 3).
    pub fn has_conflicts(&self, path: &BStr) -> bool {
        self.entries
            .iter()
            .any(|e| e.path[..] == path[..] && e.stage != Stage::Normal)
    }

    /// Get all conflicted paths.
    pub fn conflicts(&self) -> Vec<&BStr> {
        let mut paths: Vec<&BStr> = self
            .entries
            .iter()
            .filter(|e| e.stage != Stage::Normal)
            .map(|e| e.path.as_ref())
            .collect();
        paths.dedup();
        paths
    }

    /// Classify the conflict at `path` from which stages are present.
    ///
    /// Returns `None` if the path has no conflict entries (stages 1-3).
    pub fn conflict_type(&self, path: &BStr) -> Option<ConflictType> {
        let base = self.get(path, Stage::Base).is_some();
        let ours = self.get(path, Stage::Ours).is_some();
        let theirs = self.get(path, Stage::Theirs).is_some();

        match (base, ours, theirs) {
            (false, false, false) => None,
            (false, true, true) => Some(ConflictType::AddAdd),
            (true, false, true) => Some(ConflictType::CurrentDeleteTargetModify),
            (true, true, false) => Some(ConflictType::CurrentModifyTargetDelete),
            _ => Some(ConflictType::Content),
        }
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    /// Get the index version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Create a tree hierarchy from the current (stage-0) index state.
    pub fn write_tree(&self, odb: &kit_odb::ObjectDatabase) -> Result<kit_hash::ObjectId, IndexError> {
        write::write_tree_from_index(self, odb)
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare two index entries for sort order: by path, then by stage.
fn cmp_entries(a: &IndexEntry, b: &IndexEntry) -> std::cmp::Ordering {
    a.path.cmp(&b.path).then(a.stage.as_u8().cmp(&b.stage.as_u8()))
}
