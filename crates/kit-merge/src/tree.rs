//! Three-way tree merge (§4.5).
//!
//! Flattens base/ours/theirs to path → (oid, mode) maps of blob entries (the
//! same flattening `kit_repository` uses to rebuild an index from a tree),
//! walks the union of paths once, and classifies each path per the seven-step
//! algorithm. A clean result is rebuilt into a tree via `kit_index::Index`;
//! a conflicted path is returned as a `ConflictEntry` for the caller to stage.

use std::collections::BTreeMap;

use bstr::BString;
use kit_hash::ObjectId;
use kit_index::{EntryFlags, Index, IndexEntry, Stage, StatData};
use kit_object::{FileMode, Object};
use kit_odb::ObjectDatabase;

use crate::conflict::record_clean_merge_in_index;
use crate::content::merge_content;
use crate::{ConflictEntry, ConflictSide, ConflictType, ContentMergeResult, MergeError};

type Entry = (ObjectId, FileMode);

/// Merge three trees, producing a merged tree oid (clean) or a list of
/// per-path conflicts. `base` is `None` for an add/add merge with no common
/// ancestor (e.g. merging unrelated histories) or when `base.get(p)` would be
/// empty for every path; `ours`/`theirs` are `None` only for a root commit's
/// empty tree, which the caller represents by simply passing an empty map —
/// in practice callers always have a real tree oid for `ours`/`theirs`.
pub fn merge_trees(
    odb: &ObjectDatabase,
    base: Option<&ObjectId>,
    ours: &ObjectId,
    theirs: &ObjectId,
) -> Result<(Option<ObjectId>, Vec<ConflictEntry>), MergeError> {
    let base_entries = match base {
        Some(oid) => flatten_tree(odb, oid)?,
        None => BTreeMap::new(),
    };
    let ours_entries = flatten_tree(odb, ours)?;
    let theirs_entries = flatten_tree(odb, theirs)?;

    let mut paths: Vec<&BString> = base_entries
        .keys()
        .chain(ours_entries.keys())
        .chain(theirs_entries.keys())
        .collect();
    paths.sort();
    paths.dedup();

    let mut resolved = Index::new();
    let mut conflicts = Vec::new();

    for path in paths {
        let b = base_entries.get(path).copied();
        let o = ours_entries.get(path).copied();
        let t = theirs_entries.get(path).copied();

        match classify(b, o, t) {
            Resolution::Take(entry) => {
                resolved.add(IndexEntry {
                    path: path.clone(),
                    oid: entry.0,
                    mode: entry.1,
                    stage: Stage::Normal,
                    stat: StatData::default(),
                    flags: EntryFlags::default(),
                });
            }
            Resolution::Skip => {}
            Resolution::Conflict(conflict_type) => {
                if let Some(conflict) =
                    resolve_content_conflict(odb, &mut resolved, path, conflict_type, b, o, t)?
                {
                    conflicts.push(conflict);
                } else if matches!(
                    conflict_type,
                    ConflictType::CurrentDeleteTargetModify | ConflictType::CurrentModifyTargetDelete
                ) {
                    conflicts.push(ConflictEntry {
                        path: path.clone(),
                        conflict_type,
                        base: b.map(to_side),
                        ours: o.map(to_side),
                        theirs: t.map(to_side),
                    });
                }
            }
        }
    }

    if conflicts.is_empty() {
        Ok((Some(resolved.write_tree(odb)?), conflicts))
    } else {
        Ok((None, conflicts))
    }
}

enum Resolution {
    Take(Entry),
    Skip,
    Conflict(ConflictType),
}

/// Classify a single path per the seven-step algorithm of §4.5.
fn classify(base: Option<Entry>, ours: Option<Entry>, theirs: Option<Entry>) -> Resolution {
    // 2. Unchanged: O == T.
    if ours == theirs {
        return match ours {
            Some(entry) => Resolution::Take(entry),
            None => Resolution::Skip,
        };
    }

    // 3. One side unchanged from base.
    if ours == base {
        return match theirs {
            Some(entry) => Resolution::Take(entry),
            None => Resolution::Skip,
        };
    }
    if theirs == base {
        return match ours {
            Some(entry) => Resolution::Take(entry),
            None => Resolution::Skip,
        };
    }

    // 4. Both absent (only reachable if base was Some and both sides deleted
    // differently-valued entries — but ours==theirs already caught the
    // both-absent-and-equal case above, so this is unreachable in practice).
    if ours.is_none() && theirs.is_none() {
        return Resolution::Skip;
    }

    // 5. Both added, differ, no base entry.
    if base.is_none() && ours.is_some() && theirs.is_some() {
        return Resolution::Conflict(ConflictType::AddAdd);
    }

    // 6. One side deleted, the other modified against base.
    if ours.is_none() {
        return Resolution::Conflict(ConflictType::CurrentDeleteTargetModify);
    }
    if theirs.is_none() {
        return Resolution::Conflict(ConflictType::CurrentModifyTargetDelete);
    }

    // 7. Both modified from base, differ.
    Resolution::Conflict(ConflictType::Content)
}

/// Run the textual three-way merger for `content_conflict`/`add_add` paths.
/// Returns `Ok(None)` when the merge turns out clean despite both sides
/// having touched the path (identical-change case already short-circuits in
/// `classify`, so this only fires for genuinely different non-conflicting
/// line ranges).
fn resolve_content_conflict(
    odb: &ObjectDatabase,
    resolved: &mut Index,
    path: &BString,
    conflict_type: ConflictType,
    base: Option<Entry>,
    ours: Option<Entry>,
    theirs: Option<Entry>,
) -> Result<Option<ConflictEntry>, MergeError> {
    if !matches!(conflict_type, ConflictType::Content | ConflictType::AddAdd) {
        return Ok(None);
    }

    let (ours_oid, ours_mode) = ours.expect("content/add_add conflicts always have an ours side");
    let (theirs_oid, _) = theirs.expect("content/add_add conflicts always have a theirs side");

    let base_bytes = match base {
        Some((oid, _)) => read_blob(odb, &oid)?,
        None => Vec::new(),
    };
    let ours_bytes = read_blob(odb, &ours_oid)?;
    let theirs_bytes = read_blob(odb, &theirs_oid)?;

    match merge_content(&base_bytes, &ours_bytes, &theirs_bytes) {
        ContentMergeResult::Clean(bytes) => {
            record_clean_merge_in_index(resolved, odb, path.as_ref(), &bytes, ours_mode)?;
            Ok(None)
        }
        ContentMergeResult::Conflict { .. } => {
            // Stage the original (un-marked) blobs at stage 2/3; the caller
            // regenerates the marked content from these same three blobs
            // when it writes conflict markers to the working tree.
            Ok(Some(ConflictEntry {
                path: path.clone(),
                conflict_type,
                base: base.map(to_side),
                ours: Some(ConflictSide { oid: ours_oid, mode: ours_mode }),
                theirs: Some(to_side((theirs_oid, ours_mode))),
            }))
        }
    }
}

fn to_side(entry: Entry) -> ConflictSide {
    ConflictSide { oid: entry.0, mode: entry.1 }
}

fn read_blob(odb: &ObjectDatabase, oid: &ObjectId) -> Result<Vec<u8>, MergeError> {
    match odb.read(oid)? {
        Some(Object::Blob(b)) => Ok(b.data),
        Some(other) => Err(MergeError::UnexpectedObjectType {
            oid: *oid,
            expected: "blob",
            actual: other.object_type().to_string(),
        }),
        None => Err(MergeError::ObjectNotFound(*oid)),
    }
}

/// Recursively flatten a tree object into path → (oid, mode) for blob
/// entries only, mirroring `kit_repository`'s index-from-tree walk.
fn flatten_tree(odb: &ObjectDatabase, tree_oid: &ObjectId) -> Result<BTreeMap<BString, Entry>, MergeError> {
    let mut out = BTreeMap::new();
    flatten_into(odb, tree_oid, &BString::from(""), &mut out)?;
    Ok(out)
}

fn flatten_into(
    odb: &ObjectDatabase,
    tree_oid: &ObjectId,
    prefix: &BString,
    out: &mut BTreeMap<BString, Entry>,
) -> Result<(), MergeError> {
    let tree = match odb.read(tree_oid)? {
        Some(Object::Tree(t)) => t,
        Some(other) => {
            return Err(MergeError::UnexpectedObjectType {
                oid: *tree_oid,
                expected: "tree",
                actual: other.object_type().to_string(),
            })
        }
        None => return Err(MergeError::ObjectNotFound(*tree_oid)),
    };

    for entry in &tree.entries {
        let mut path = prefix.clone();
        if !path.is_empty() {
            path.push(b'/');
        }
        path.extend_from_slice(&entry.name);

        if entry.mode.is_tree() {
            flatten_into(odb, &entry.oid, &path, out)?;
        } else {
            out.insert(path, (entry.oid, entry.mode));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kit_object::{Blob, Tree, TreeEntry};

    fn odb() -> (tempfile::TempDir, ObjectDatabase) {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path().join("objects")).unwrap();
        (dir, odb)
    }

    fn blob(odb: &ObjectDatabase, data: &[u8]) -> ObjectId {
        odb.write(&Object::Blob(Blob::new(data.to_vec()))).unwrap()
    }

    fn tree(odb: &ObjectDatabase, entries: Vec<(&str, ObjectId)>) -> ObjectId {
        let entries = entries
            .into_iter()
            .map(|(name, oid)| TreeEntry { mode: FileMode::Regular, name: name.into(), oid })
            .collect();
        odb.write(&Object::Tree(Tree { entries })).unwrap()
    }

    #[test]
    fn identical_trees_merge_cleanly() {
        let (_dir, odb) = odb();
        let a = blob(&odb, b"a\n");
        let t = tree(&odb, vec![("file.txt", a)]);
        let (merged, conflicts) = merge_trees(&odb, Some(&t), &t, &t).unwrap();
        assert_eq!(merged, Some(t));
        assert!(conflicts.is_empty());
    }

    #[test]
    fn base_equals_ours_takes_theirs() {
        let (_dir, odb) = odb();
        let a = blob(&odb, b"a\n");
        let b = blob(&odb, b"b\n");
        let base = tree(&odb, vec![("file.txt", a)]);
        let theirs = tree(&odb, vec![("file.txt", b)]);
        let (merged, conflicts) = merge_trees(&odb, Some(&base), &base, &theirs).unwrap();
        assert_eq!(merged, Some(theirs));
        assert!(conflicts.is_empty());
    }

    #[test]
    fn content_conflict_is_reported() {
        let (_dir, odb) = odb();
        let base_blob = blob(&odb, b"1\n");
        let ours_blob = blob(&odb, b"2\n");
        let theirs_blob = blob(&odb, b"3\n");
        let base = tree(&odb, vec![("a.txt", base_blob)]);
        let ours = tree(&odb, vec![("a.txt", ours_blob)]);
        let theirs = tree(&odb, vec![("a.txt", theirs_blob)]);

        let (merged, conflicts) = merge_trees(&odb, Some(&base), &ours, &theirs).unwrap();
        assert!(merged.is_none());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::Content);
        assert_eq!(conflicts[0].path, BString::from("a.txt"));
        assert!(conflicts[0].base.is_some());
    }

    #[test]
    fn delete_modify_conflict_has_no_ours_side() {
        let (_dir, odb) = odb();
        let base_blob = blob(&odb, b"a\n");
        let theirs_blob = blob(&odb, b"b\n");
        let base = tree(&odb, vec![("x.txt", base_blob)]);
        let ours = tree(&odb, vec![]);
        let theirs = tree(&odb, vec![("x.txt", theirs_blob)]);

        let (merged, conflicts) = merge_trees(&odb, Some(&base), &ours, &theirs).unwrap();
        assert!(merged.is_none());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::CurrentDeleteTargetModify);
        assert!(conflicts[0].ours.is_none());
        assert!(conflicts[0].theirs.is_some());
    }

    #[test]
    fn add_add_conflict_has_no_base_side() {
        let (_dir, odb) = odb();
        let ours_blob = blob(&odb, b"ours\n");
        let theirs_blob = blob(&odb, b"theirs\n");
        let base = tree(&odb, vec![]);
        let ours = tree(&odb, vec![("new.txt", ours_blob)]);
        let theirs = tree(&odb, vec![("new.txt", theirs_blob)]);

        let (merged, conflicts) = merge_trees(&odb, Some(&base), &ours, &theirs).unwrap();
        assert!(merged.is_none());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::AddAdd);
        assert!(conflicts[0].base.is_none());
    }

    #[test]
    fn non_overlapping_changes_in_different_files_merge_cleanly() {
        let (_dir, odb) = odb();
        let base_a = blob(&odb, b"a\n");
        let base_b = blob(&odb, b"b\n");
        let ours_a = blob(&odb, b"A\n");
        let theirs_b = blob(&odb, b"B\n");

        let base = tree(&odb, vec![("a.txt", base_a), ("b.txt", base_b)]);
        let ours = tree(&odb, vec![("a.txt", ours_a), ("b.txt", base_b)]);
        let theirs = tree(&odb, vec![("a.txt", base_a), ("b.txt", theirs_b)]);

        let (merged, conflicts) = merge_trees(&odb, Some(&base), &ours, &theirs).unwrap();
        assert!(conflicts.is_empty());
        assert!(merged.is_some());
    }
}
