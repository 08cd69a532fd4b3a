//! Merge-base (lowest common ancestor) computation via bidirectional BFS
//! (§4.6).
//!
//! Two visited sets and two FIFO frontiers are seeded with `a` and `b`
//! respectively. Each step pops one commit from each non-empty frontier and
//! checks it against the *other* side's visited set; a hit is the LCA.
//! Parent order within a commit is walked in the order it was written, so
//! the first meeting point under this alternation is deterministic for a
//! fixed history — multiple LCAs (criss-cross merges) are not reconciled
//! into a virtual common ancestor; the single meeting point found here is
//! used as the merge base (open question in §9, a recursive merge base is
//! left as a future refinement).

use std::collections::{HashSet, VecDeque};

use kit_hash::ObjectId;
use kit_object::Object;
use kit_repository::Repository;

use crate::RevWalkError;

/// Find the merge base of two commits: `a == b` returns `a`; if one is an
/// ancestor of the other, that ancestor is returned; otherwise the first
/// commit found reachable from both, under bidirectional BFS alternation.
/// `None` only if the two commits share no common ancestor.
pub fn merge_base_one(repo: &Repository, a: &ObjectId, b: &ObjectId) -> Result<Option<ObjectId>, RevWalkError> {
    if a == b {
        return Ok(Some(*a));
    }

    let mut visited1: HashSet<ObjectId> = HashSet::from([*a]);
    let mut visited2: HashSet<ObjectId> = HashSet::from([*b]);
    let mut frontier1: VecDeque<ObjectId> = VecDeque::from([*a]);
    let mut frontier2: VecDeque<ObjectId> = VecDeque::from([*b]);

    loop {
        if frontier1.is_empty() && frontier2.is_empty() {
            return Ok(None);
        }

        if let Some(oid) = frontier1.pop_front() {
            if visited2.contains(&oid) {
                return Ok(Some(oid));
            }
            for parent in read_commit(repo, &oid)?.parents {
                if visited1.insert(parent) {
                    frontier1.push_back(parent);
                }
            }
        }

        if let Some(oid) = frontier2.pop_front() {
            if visited1.contains(&oid) {
                return Ok(Some(oid));
            }
            for parent in read_commit(repo, &oid)?.parents {
                if visited2.insert(parent) {
                    frontier2.push_back(parent);
                }
            }
        }
    }
}

/// Find all merge bases of two commits. The spec's bidirectional BFS
/// surfaces a single meeting point (§4.6); this wraps it as a 0- or
/// 1-element list for callers that expect the plural shape.
pub fn merge_base(repo: &Repository, a: &ObjectId, b: &ObjectId) -> Result<Vec<ObjectId>, RevWalkError> {
    Ok(merge_base_one(repo, a, b)?.into_iter().collect())
}

/// Check if `ancestor` is an ancestor of (or equal to) `descendant` — a
/// single-direction BFS walk from `descendant`'s parents (§4.6).
pub fn is_ancestor(repo: &Repository, ancestor: &ObjectId, descendant: &ObjectId) -> Result<bool, RevWalkError> {
    if ancestor == descendant {
        return Ok(true);
    }

    let mut visited = HashSet::new();
    let mut frontier = VecDeque::new();
    visited.insert(*descendant);
    frontier.push_back(*descendant);

    while let Some(oid) = frontier.pop_front() {
        for parent in read_commit(repo, &oid)?.parents {
            if parent == *ancestor {
                return Ok(true);
            }
            if visited.insert(parent) {
                frontier.push_back(parent);
            }
        }
    }

    Ok(false)
}

fn read_commit(repo: &Repository, oid: &ObjectId) -> Result<kit_object::Commit, RevWalkError> {
    match repo.odb().read(oid)? {
        Some(Object::Commit(c)) => Ok(c),
        Some(_) => Err(RevWalkError::NotACommit(*oid)),
        None => Err(RevWalkError::CommitNotFound(*oid)),
    }
}
