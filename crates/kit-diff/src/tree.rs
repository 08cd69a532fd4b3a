//! Tree-to-tree diff.
//!
//! Walks two tree objects in parallel (sorted by the same entry order trees
//! are stored in), producing the `(path, old_oid?, new_oid?)` triple per
//! changed blob. Recurses into subtrees present on either side; trees
//! themselves are never reported as changes, only the leaves under them.

use bstr::BString;
use kit_hash::ObjectId;
use kit_object::{Object, Tree, TreeEntry};
use kit_odb::ObjectDatabase;

use crate::DiffError;

/// A single changed path between two trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    pub path: BString,
    pub old_oid: Option<ObjectId>,
    pub new_oid: Option<ObjectId>,
}

/// Diff two trees, producing the list of changed blob paths.
///
/// Either tree OID can be `None` to represent an empty tree (e.g. the parent
/// of a root commit).
pub fn diff_trees(
    odb: &ObjectDatabase,
    old_tree: Option<&ObjectId>,
    new_tree: Option<&ObjectId>,
) -> Result<Vec<TreeChange>, DiffError> {
    let old = match old_tree {
        Some(oid) => Some(read_tree(odb, oid)?),
        None => None,
    };
    let new = match new_tree {
        Some(oid) => Some(read_tree(odb, oid)?),
        None => None,
    };

    let old_entries = old.as_ref().map_or(&[][..], |t| &t.entries);
    let new_entries = new.as_ref().map_or(&[][..], |t| &t.entries);

    let mut changes = Vec::new();
    let prefix = BString::from("");
    diff_tree_entries(odb, old_entries, new_entries, &prefix, &mut changes)?;
    Ok(changes)
}

fn read_tree(odb: &ObjectDatabase, oid: &ObjectId) -> Result<Tree, DiffError> {
    let obj = odb
        .read(oid)
        .map_err(|e| DiffError::ObjectRead {
            oid: *oid,
            source: e,
        })?
        .ok_or(DiffError::ObjectNotFound(*oid))?;

    match obj {
        Object::Tree(tree) => Ok(tree),
        other => Err(DiffError::UnexpectedObjectType {
            oid: *oid,
            expected: "tree",
            actual: other.object_type().to_string(),
        }),
    }
}

fn full_path(prefix: &BString, name: &BString) -> BString {
    if prefix.is_empty() {
        name.clone()
    } else {
        let mut p = prefix.clone();
        p.push(b'/');
        p.extend_from_slice(name);
        p
    }
}

fn diff_tree_entries(
    odb: &ObjectDatabase,
    old_entries: &[TreeEntry],
    new_entries: &[TreeEntry],
    prefix: &BString,
    changes: &mut Vec<TreeChange>,
) -> Result<(), DiffError> {
    let mut oi = 0;
    let mut ni = 0;

    while oi < old_entries.len() || ni < new_entries.len() {
        match (old_entries.get(oi), new_entries.get(ni)) {
            (Some(old_entry), Some(new_entry)) => {
                match TreeEntry::cmp_entries(old_entry, new_entry) {
                    std::cmp::Ordering::Less => {
                        collect_deleted(odb, old_entry, prefix, changes)?;
                        oi += 1;
                    }
                    std::cmp::Ordering::Greater => {
                        collect_added(odb, new_entry, prefix, changes)?;
                        ni += 1;
                    }
                    std::cmp::Ordering::Equal => {
                        if old_entry.oid != new_entry.oid || old_entry.mode != new_entry.mode {
                            collect_modified(odb, old_entry, new_entry, prefix, changes)?;
                        }
                        oi += 1;
                        ni += 1;
                    }
                }
            }
            (Some(old_entry), None) => {
                collect_deleted(odb, old_entry, prefix, changes)?;
                oi += 1;
            }
            (None, Some(new_entry)) => {
                collect_added(odb, new_entry, prefix, changes)?;
                ni += 1;
            }
            (None, None) => break,
        }
    }

    Ok(())
}

fn collect_deleted(
    odb: &ObjectDatabase,
    entry: &TreeEntry,
    prefix: &BString,
    changes: &mut Vec<TreeChange>,
) -> Result<(), DiffError> {
    let path = full_path(prefix, &entry.name);
    if entry.mode.is_tree() {
        let tree = read_tree(odb, &entry.oid)?;
        diff_tree_entries(odb, &tree.entries, &[], &path, changes)?;
    } else {
        changes.push(TreeChange {
            path,
            old_oid: Some(entry.oid),
            new_oid: None,
        });
    }
    Ok(())
}

fn collect_added(
    odb: &ObjectDatabase,
    entry: &TreeEntry,
    prefix: &BString,
    changes: &mut Vec<TreeChange>,
) -> Result<(), DiffError> {
    let path = full_path(prefix, &entry.name);
    if entry.mode.is_tree() {
        let tree = read_tree(odb, &entry.oid)?;
        diff_tree_entries(odb, &[], &tree.entries, &path, changes)?;
    } else {
        changes.push(TreeChange {
            path,
            old_oid: None,
            new_oid: Some(entry.oid),
        });
    }
    Ok(())
}

fn collect_modified(
    odb: &ObjectDatabase,
    old_entry: &TreeEntry,
    new_entry: &TreeEntry,
    prefix: &BString,
    changes: &mut Vec<TreeChange>,
) -> Result<(), DiffError> {
    let path = full_path(prefix, &old_entry.name);
    let old_is_tree = old_entry.mode.is_tree();
    let new_is_tree = new_entry.mode.is_tree();

    if old_is_tree && new_is_tree {
        let old_tree = read_tree(odb, &old_entry.oid)?;
        let new_tree = read_tree(odb, &new_entry.oid)?;
        diff_tree_entries(odb, &old_tree.entries, &new_tree.entries, &path, changes)?;
    } else if old_is_tree {
        let old_tree = read_tree(odb, &old_entry.oid)?;
        diff_tree_entries(odb, &old_tree.entries, &[], &path, changes)?;
        changes.push(TreeChange {
            path,
            old_oid: None,
            new_oid: Some(new_entry.oid),
        });
    } else if new_is_tree {
        changes.push(TreeChange {
            path: path.clone(),
            old_oid: Some(old_entry.oid),
            new_oid: None,
        });
        let new_tree = read_tree(odb, &new_entry.oid)?;
        diff_tree_entries(odb, &[], &new_tree.entries, &path, changes)?;
    } else {
        changes.push(TreeChange {
            path,
            old_oid: Some(old_entry.oid),
            new_oid: Some(new_entry.oid),
        });
    }

    Ok(())
}
