//! Shared apply-commit kernel (§4.6, §9).
//!
//! One function builds the commit that both `merge`'s two-branch driver and
//! `cherry_pick` produce: resolve the three trees, run [`merge_trees`], and
//! either finish a commit or stage the conflict. Each caller is responsible
//! for resolving `base_tree` before calling in — a real merge uses
//! `merge_base(HEAD, other)`, cherry-pick uses the replayed commit's own
//! parent — `apply` itself never computes a merge base.

use bstr::BString;
use kit_hash::ObjectId;
use kit_object::{Commit, Object};
use kit_ref::{RefName, RefTransaction, Reference};
use kit_repository::{Clock, Identity, RepoError, Repository, WorkingTree};
use kit_utils::date::{GitDate, Signature};

use crate::conflict::record_conflict_in_index;
use crate::content::merge_content;
use crate::tree::merge_trees;
use crate::{MergeError, MergeResult};

/// Which in-progress-operation ref an unresolved apply leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InProgress {
    Merge,
    CherryPick,
}

impl InProgress {
    fn ref_name(self) -> &'static str {
        match self {
            Self::Merge => "MERGE_HEAD",
            Self::CherryPick => "CHERRY_PICK_HEAD",
        }
    }
}

/// Inputs to the shared apply kernel.
pub struct ApplyRequest {
    /// Common ancestor tree. `None` only for a root commit's empty parent.
    pub base_tree: Option<ObjectId>,
    pub ours_tree: ObjectId,
    pub theirs_tree: ObjectId,
    /// Parents the resulting commit should record.
    pub parents: Vec<ObjectId>,
    /// Preserved from the replayed/incoming commit, never the current user.
    pub author: Signature,
    pub message: BString,
    /// Which in-progress ref to set on conflict, and which commit it should
    /// point at (the commit being merged or cherry-picked).
    pub in_progress: InProgress,
    pub in_progress_oid: ObjectId,
}

/// Outcome of `apply`.
pub enum ApplyOutcome {
    /// The merged tree matched the first parent's tree; nothing to commit.
    Empty,
    /// A new commit was created and the current branch (or detached HEAD)
    /// advanced to it.
    Committed(ObjectId),
    /// Conflicts were staged into the index and written to the working
    /// tree; the in-progress ref was set and refs were otherwise untouched.
    Conflict(MergeResult),
}

/// Run the three-way tree merge and either finish a commit or halt with
/// staged conflicts, per §4.6's "Commit creation"/"Finisher" and §9's call
/// for a single shared function.
pub fn apply(repo: &mut Repository, request: ApplyRequest) -> Result<ApplyOutcome, MergeError> {
    let (tree, conflicts) = merge_trees(
        repo.odb(),
        request.base_tree.as_ref(),
        &request.ours_tree,
        &request.theirs_tree,
    )?;

    match tree {
        Some(tree_oid) => finish_apply(repo, tree_oid, &request.parents, request.author, request.message),
        None => {
            stage_conflicts(repo, &request, &conflicts)?;
            Ok(ApplyOutcome::Conflict(MergeResult::conflicted(conflicts)))
        }
    }
}

/// Create the commit if the merged tree differs from the first parent's,
/// else report an empty result (§4.6: "if resulting tree == parent's tree,
/// report empty").
fn finish_apply(
    repo: &mut Repository,
    tree_oid: ObjectId,
    parents: &[ObjectId],
    author: Signature,
    message: BString,
) -> Result<ApplyOutcome, MergeError> {
    if parents.len() == 1 {
        if let Some(parent_commit) = repo.read_commit(&parents[0])? {
            if parent_commit.tree == tree_oid {
                clear_in_progress(repo)?;
                return Ok(ApplyOutcome::Empty);
            }
        }
    }

    let (name, email) = repo.identity()?;
    let (epoch, tz) = repo.clock().now();
    let committer = Signature {
        name: BString::from(name),
        email: BString::from(email),
        date: GitDate::new(epoch, tz),
    };

    let commit = Commit {
        tree: tree_oid,
        parents: parents.to_vec(),
        author,
        committer,
        encoding: None,
        gpgsig: None,
        extra_headers: Vec::new(),
        message,
    };
    let commit_oid = repo.odb().write(&Object::Commit(commit))?;

    advance_current_branch(repo, parents.first().copied(), commit_oid)?;
    clear_in_progress(repo)?;

    Ok(ApplyOutcome::Committed(commit_oid))
}

/// Advance the ref HEAD points to (or HEAD itself if detached) with a CAS
/// update, mirroring `Repository`'s own (private) `advance_head`.
fn advance_current_branch(
    repo: &Repository,
    expected_old: Option<ObjectId>,
    new_oid: ObjectId,
) -> Result<(), MergeError> {
    let head_ref = ref_name("HEAD")?;
    let target_ref = match repo.refs().resolve(&head_ref).map_err(RepoError::from)? {
        Some(Reference::Symbolic { target, .. }) => target,
        _ => head_ref,
    };

    let result = match expected_old {
        Some(old) => {
            let mut txn = RefTransaction::new();
            txn.update(target_ref, old, new_oid, "merge");
            repo.refs().commit_transaction(txn)
        }
        None => repo.refs().write_ref(&target_ref, &new_oid),
    };

    result.map_err(|e| MergeError::Repo(RepoError::from(e)))
}

/// Stage every conflict into the index (stages 1/2/3), write the working
/// tree's conflict markers, and set the in-progress ref so the user can
/// `--continue`/`--abort` later.
fn stage_conflicts(
    repo: &mut Repository,
    request: &ApplyRequest,
    conflicts: &[crate::ConflictEntry],
) -> Result<(), MergeError> {
    {
        let index = repo.index_mut()?;
        for conflict in conflicts {
            record_conflict_in_index(index, conflict);
        }
    }
    repo.write_index()?;

    if let Some(wt) = repo.working_tree() {
        let odb = repo.odb();
        for conflict in conflicts {
            if let (Some(base), Some(ours), Some(theirs)) = (conflict.base, conflict.ours, conflict.theirs) {
                let base_bytes = read_blob(odb, &base.oid)?;
                let ours_bytes = read_blob(odb, &ours.oid)?;
                let theirs_bytes = read_blob(odb, &theirs.oid)?;
                let merged = merge_content(&base_bytes, &ours_bytes, &theirs_bytes);
                wt.write_conflict_markers(conflict.path.to_string().as_ref(), merged.content())?;
            } else if let Some(ours) = conflict.ours {
                // add_add with no base: still run the textual merger with
                // an empty base so the conflict gets markers too.
                let ours_bytes = read_blob(odb, &ours.oid)?;
                let theirs_bytes = conflict
                    .theirs
                    .map(|t| read_blob(odb, &t.oid))
                    .transpose()?
                    .unwrap_or_default();
                let merged = merge_content(&[], &ours_bytes, &theirs_bytes);
                wt.write_conflict_markers(conflict.path.to_string().as_ref(), merged.content())?;
            }
        }
    }

    let in_progress_ref = ref_name(request.in_progress.ref_name())?;
    repo.refs()
        .write_ref(&in_progress_ref, &request.in_progress_oid)
        .map_err(RepoError::from)?;

    Ok(())
}

fn read_blob(odb: &kit_odb::ObjectDatabase, oid: &ObjectId) -> Result<Vec<u8>, MergeError> {
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

fn clear_in_progress(repo: &Repository) -> Result<(), MergeError> {
    for name in ["MERGE_HEAD", "CHERRY_PICK_HEAD"] {
        let rn = ref_name(name)?;
        match repo.refs().delete_ref(&rn) {
            Ok(()) => {}
            Err(kit_ref::RefError::NotFound(_)) => {}
            Err(e) => return Err(MergeError::Repo(RepoError::from(e))),
        }
    }
    Ok(())
}

fn ref_name(name: &str) -> Result<RefName, MergeError> {
    RefName::new(name)
        .map_err(RepoError::from)
        .map_err(MergeError::from)
}
