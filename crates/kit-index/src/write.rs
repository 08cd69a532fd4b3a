//! Index file writing.

use std::io::Write as _;
use std::path::Path;

use kit_hash::ObjectId;
use kit_object::{FileMode, ObjectType, Tree, TreeEntry};
use kit_odb::ObjectDatabase;

use crate::entry::IndexEntry;
use crate::{Index, IndexError, Stage};

/// Write the index to a file atomically using a lock file.
pub fn write_index(index: &Index, path: &Path) -> Result<(), IndexError> {
    let mut lock =
        kit_utils::lockfile::LockFile::acquire(path).map_err(|_| IndexError::LockFailed {
            path: path.to_path_buf(),
        })?;

    let data = serde_json::to_vec_pretty(index)?;
    lock.write_all(&data)?;
    lock.commit().map_err(|_| IndexError::LockFailed {
        path: path.to_path_buf(),
    })?;

    Ok(())
}

/// Create a tree hierarchy from the current index entries.
///
/// Fails with [`IndexError::UnresolvedConflicts`] if any entry sits outside
/// stage 0 (§4.3, §8: "`write_tree` fails iff the index has any conflict
/// entry") — a conflicted index has no single tree to write, and building
/// one from just the stage-0 entries would silently drop the conflicted
/// paths instead of surfacing the conflict.
pub fn write_tree_from_index(index: &Index, odb: &ObjectDatabase) -> Result<ObjectId, IndexError> {
    if index.iter().any(|e| e.stage != Stage::Normal) {
        return Err(IndexError::UnresolvedConflicts);
    }

    // Every remaining entry is stage 0, checked above.
    let entries: Vec<&IndexEntry> = index.iter().collect();

    if entries.is_empty() {
        let tree = Tree::new();
        let tree_bytes = tree.serialize_content();
        return Ok(odb.write_raw(ObjectType::Tree, &tree_bytes)?);
    }

    build_tree(&entries, b"", odb)
}

/// Recursively build tree objects from sorted index entries.
fn build_tree(
    entries: &[&IndexEntry],
    prefix: &[u8],
    odb: &ObjectDatabase,
) -> Result<ObjectId, IndexError> {
    let mut tree_entries: Vec<TreeEntry> = Vec::new();
    let mut i = 0;

    while i < entries.len() {
        let entry = entries[i];
        let path = &entry.path[prefix.len()..];

        if let Some(slash_pos) = path.iter().position(|&b| b == b'/') {
            let dir_name = &path[..slash_pos];
            let subtree_end = entries[i..]
                .iter()
                .position(|e| {
                    let p = &e.path[prefix.len()..];
                    !p.starts_with(dir_name) || (p.len() > slash_pos && p[slash_pos] != b'/')
                })
                .map(|pos| i + pos)
                .unwrap_or(entries.len());

            let subtree_entries = &entries[i..subtree_end];

            let mut new_prefix = prefix.to_vec();
            new_prefix.extend_from_slice(dir_name);
            new_prefix.push(b'/');

            let subtree_oid = build_tree(subtree_entries, &new_prefix, odb)?;

            tree_entries.push(TreeEntry {
                mode: FileMode::Tree,
                name: dir_name.into(),
                oid: subtree_oid,
            });

            i = subtree_end;
        } else {
            tree_entries.push(TreeEntry {
                mode: entry.mode,
                name: path.into(),
                oid: entry.oid,
            });
            i += 1;
        }
    }

    let mut tree = Tree::new();
    tree.entries = tree_entries;
    tree.sort();
    let tree_bytes = tree.serialize_content();
    Ok(odb.write_raw(ObjectType::Tree, &tree_bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryFlags, StatData};

    fn blob_entry(path: &str, stage: Stage) -> IndexEntry {
        IndexEntry {
            path: path.into(),
            oid: ObjectId::from_hex("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap(),
            mode: FileMode::Regular,
            stage,
            stat: StatData::default(),
            flags: EntryFlags::default(),
        }
    }

    #[test]
    fn write_tree_fails_with_unresolved_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();

        let mut index = Index::new();
        index.add(blob_entry("a.txt", Stage::Ours));
        index.add(blob_entry("a.txt", Stage::Theirs));

        let err = write_tree_from_index(&index, &odb).unwrap_err();
        assert!(matches!(err, IndexError::UnresolvedConflicts));
    }

    #[test]
    fn write_tree_succeeds_once_conflicts_are_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let odb = ObjectDatabase::open(dir.path()).unwrap();

        let mut index = Index::new();
        index.add(blob_entry("a.txt", Stage::Ours));
        index.add(blob_entry("a.txt", Stage::Theirs));
        index.add(blob_entry("a.txt", Stage::Normal));

        assert!(write_tree_from_index(&index, &odb).is_ok());
    }
}
