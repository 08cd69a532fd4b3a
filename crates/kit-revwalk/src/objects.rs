//! Object listing: enumerate all objects reachable from a set of commits.
//!
//! This is the reachability computation `fetch`/`push` use to decide what to
//! transfer: the set of commits, trees, and blobs reachable from `include`
//! that are not already reachable from `exclude` (§4.7).

use std::collections::HashSet;

use kit_hash::ObjectId;
use kit_object::Object;
use kit_repository::Repository;

use crate::RevWalkError;

/// List all objects reachable from the given commits, excluding objects
/// reachable from the excluded set.
///
/// Returns OIDs of all commits, trees, and blobs reachable from `include`
/// but not from `exclude`, in the order first discovered.
pub fn list_objects(
    repo: &Repository,
    include: &[ObjectId],
    exclude: &[ObjectId],
) -> Result<Vec<ObjectId>, RevWalkError> {
    let mut excluded_objects = HashSet::new();
    for oid in exclude {
        collect_reachable(repo, oid, &mut excluded_objects)?;
    }

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for oid in include {
        collect_reachable_filtered(repo, oid, &mut seen, &excluded_objects, &mut result)?;
    }

    Ok(result)
}

/// Collect all objects reachable from a commit (commits, trees, blobs).
fn collect_reachable(repo: &Repository, start: &ObjectId, seen: &mut HashSet<ObjectId>) -> Result<(), RevWalkError> {
    let mut stack = vec![*start];

    while let Some(oid) = stack.pop() {
        if !seen.insert(oid) {
            continue;
        }

        let obj = match repo.odb().read(&oid)? {
            Some(obj) => obj,
            None => continue,
        };

        match obj {
            Object::Commit(commit) => {
                stack.push(commit.tree);
                for parent in &commit.parents {
                    stack.push(*parent);
                }
            }
            Object::Tree(tree) => {
                for entry in &tree.entries {
                    stack.push(entry.oid);
                }
            }
            Object::Blob(_) => {}
        }
    }

    Ok(())
}

/// Collect reachable objects with exclusion filtering, recording each newly
/// discovered object's OID in `result`.
fn collect_reachable_filtered(
    repo: &Repository,
    start: &ObjectId,
    seen: &mut HashSet<ObjectId>,
    excluded: &HashSet<ObjectId>,
    result: &mut Vec<ObjectId>,
) -> Result<(), RevWalkError> {
    let mut stack = vec![*start];

    while let Some(oid) = stack.pop() {
        if !seen.insert(oid) || excluded.contains(&oid) {
            continue;
        }

        let obj = match repo.odb().read(&oid)? {
            Some(obj) => obj,
            None => continue,
        };

        result.push(oid);

        match obj {
            Object::Commit(commit) => {
                stack.push(commit.tree);
                for parent in &commit.parents {
                    stack.push(*parent);
                }
            }
            Object::Tree(tree) => {
                for entry in &tree.entries {
                    if !excluded.contains(&entry.oid) && !seen.contains(&entry.oid) {
                        stack.push(entry.oid);
                    }
                }
            }
            Object::Blob(_) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kit_object::{Blob, Commit, FileMode, Tree, TreeEntry};
    use kit_utils::date::{GitDate, Signature};

    fn init_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    fn commit_file(repo: &Repository, parents: Vec<ObjectId>, name: &str, content: &[u8]) -> ObjectId {
        let blob_oid = repo.odb().write(&Object::Blob(Blob::new(content.to_vec()))).unwrap();
        let tree_oid = repo
            .odb()
            .write(&Object::Tree(Tree {
                entries: vec![TreeEntry { mode: FileMode::Regular, name: name.into(), oid: blob_oid }],
            }))
            .unwrap();
        let sig = Signature { name: "Ada".into(), email: "ada@example.com".into(), date: GitDate::new(1, 0) };
        repo.odb()
            .write(&Object::Commit(Commit {
                tree: tree_oid,
                parents,
                author: sig.clone(),
                committer: sig,
                encoding: None,
                gpgsig: None,
                extra_headers: Vec::new(),
                message: "c".into(),
            }))
            .unwrap()
    }

    #[test]
    fn lists_all_objects_reachable_from_a_root_commit() {
        let (_dir, repo) = init_repo();
        let c1 = commit_file(&repo, vec![], "a.txt", b"1\n");

        let objects = list_objects(&repo, &[c1], &[]).unwrap();
        // commit + tree + blob
        assert_eq!(objects.len(), 3);
        assert!(objects.contains(&c1));
    }

    #[test]
    fn excludes_objects_reachable_from_the_exclude_set() {
        let (_dir, repo) = init_repo();
        let c1 = commit_file(&repo, vec![], "a.txt", b"1\n");
        let c2 = commit_file(&repo, vec![c1], "b.txt", b"2\n");

        let objects = list_objects(&repo, &[c2], &[c1]).unwrap();
        // only the new commit's own tree and blob, plus itself.
        assert_eq!(objects.len(), 3);
        assert!(objects.contains(&c2));
        assert!(!objects.contains(&c1));
    }

    #[test]
    fn excluding_the_same_commit_yields_nothing_new() {
        let (_dir, repo) = init_repo();
        let c1 = commit_file(&repo, vec![], "a.txt", b"1\n");

        let objects = list_objects(&repo, &[c1], &[c1]).unwrap();
        assert!(objects.is_empty());
    }
}
