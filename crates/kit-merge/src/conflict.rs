//! Conflict staging in the index.
//!
//! Writing conflict markers to the working tree is the `WorkingTree`
//! adapter's job (`kit_repository::FsWorkingTree::write_conflict_markers`),
//! not this crate's — the history engine never touches the file system
//! directly (§1). This module only knows how to record and clear stage
//! 1/2/3 entries.

use bstr::{BStr, BString};
use kit_hash::ObjectId;
use kit_index::{EntryFlags, Index, IndexEntry, Stage, StatData};
use kit_object::{FileMode, Object};
use kit_odb::ObjectDatabase;

use crate::{ConflictEntry, MergeError};

/// Record conflict stages (1=base, 2=ours, 3=theirs) in the index.
///
/// Removes any existing stage-0 entry for the path and adds the
/// appropriate conflict stage entries.
pub fn record_conflict_in_index(index: &mut Index, conflict: &ConflictEntry) {
    let path: &BStr = conflict.path.as_ref();

    index.remove(path, Stage::Normal);

    if let Some(base) = conflict.base {
        index.add(IndexEntry {
            path: conflict.path.clone(),
            oid: base.oid,
            mode: base.mode,
            stage: Stage::Base,
            stat: StatData::default(),
            flags: EntryFlags::default(),
        });
    }

    if let Some(ours) = conflict.ours {
        index.add(IndexEntry {
            path: conflict.path.clone(),
            oid: ours.oid,
            mode: ours.mode,
            stage: Stage::Ours,
            stat: StatData::default(),
            flags: EntryFlags::default(),
        });
    }

    if let Some(theirs) = conflict.theirs {
        index.add(IndexEntry {
            path: conflict.path.clone(),
            oid: theirs.oid,
            mode: theirs.mode,
            stage: Stage::Theirs,
            stat: StatData::default(),
            flags: EntryFlags::default(),
        });
    }
}

/// Record a clean merge result in the index (stage 0).
///
/// Writes the blob to the ODB, removes any conflict stages, and sets
/// a single stage-0 entry.
pub fn record_clean_merge_in_index(
    index: &mut Index,
    odb: &ObjectDatabase,
    path: &BStr,
    content: &[u8],
    mode: FileMode,
) -> Result<ObjectId, MergeError> {
    let blob = Object::Blob(kit_object::Blob::new(content.to_vec()));
    let oid = odb.write(&blob)?;

    index.remove(path, Stage::Base);
    index.remove(path, Stage::Ours);
    index.remove(path, Stage::Theirs);

    index.add(IndexEntry {
        path: BString::from(path),
        oid,
        mode,
        stage: Stage::Normal,
        stat: StatData::default(),
        flags: EntryFlags::default(),
    });

    Ok(oid)
}

/// Remove all conflict stages for a path from the index and add a resolved
/// stage-0 entry. This is what staging a file after manual resolution does.
pub fn resolve_conflict(index: &mut Index, path: &BStr, oid: ObjectId, mode: FileMode) {
    index.remove(path, Stage::Base);
    index.remove(path, Stage::Ours);
    index.remove(path, Stage::Theirs);

    index.add(IndexEntry {
        path: BString::from(path),
        oid,
        mode,
        stage: Stage::Normal,
        stat: StatData::default(),
        flags: EntryFlags::default(),
    });
}
