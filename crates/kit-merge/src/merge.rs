//! Two-branch merge driver (§4.6).
//!
//! Resolves the merge base via [`kit_revwalk::merge_base_one`], detects the
//! fast-forward case, and otherwise hands off to the shared [`apply`]
//! kernel with `parents = [HEAD, MERGE_HEAD]`.

use bstr::BString;
use kit_hash::ObjectId;
use kit_repository::{Identity, Repository};
use kit_utils::date::{GitDate, Signature};

use crate::apply::{apply, ApplyOutcome, ApplyRequest, InProgress};
use crate::MergeError;

/// Result of merging `theirs` into the current branch.
pub enum MergeDriverOutcome {
    /// `theirs` was already an ancestor of HEAD; nothing to do.
    AlreadyUpToDate,
    /// HEAD was an ancestor of `theirs`; the branch ref was fast-forwarded
    /// without creating a merge commit.
    FastForward(ObjectId),
    /// A merge commit was created.
    Committed(ObjectId),
    /// The merge produced conflicts; see `ApplyOutcome::Conflict`.
    Conflict(crate::MergeResult),
}

/// Merge `theirs` into HEAD, creating a merge commit on success.
///
/// `theirs` is the tip commit of the branch being merged in; the message is
/// the merge commit's message (the caller composes it, e.g.
/// `"Merge branch 'x'"`).
pub fn merge(repo: &mut Repository, theirs: ObjectId, message: &str) -> Result<MergeDriverOutcome, MergeError> {
    let head = repo.head_oid()?.ok_or(MergeError::NoMergeBase)?;

    if head == theirs {
        return Ok(MergeDriverOutcome::AlreadyUpToDate);
    }

    let base = kit_revwalk::merge_base_one(repo, &head, &theirs)?;

    if base == Some(theirs) {
        return Ok(MergeDriverOutcome::AlreadyUpToDate);
    }

    if base == Some(head) {
        fast_forward(repo, theirs)?;
        return Ok(MergeDriverOutcome::FastForward(theirs));
    }

    let base = base.ok_or(MergeError::NoMergeBase)?;

    let ours_tree = repo
        .read_commit(&head)?
        .ok_or(MergeError::ObjectNotFound(head))?
        .tree;
    let theirs_tree = repo
        .read_commit(&theirs)?
        .ok_or(MergeError::ObjectNotFound(theirs))?
        .tree;
    let base_tree = repo
        .read_commit(&base)?
        .ok_or(MergeError::ObjectNotFound(base))?
        .tree;

    let (name, email) = repo.identity()?;
    let author = Signature {
        name: BString::from(name),
        email: BString::from(email),
        date: GitDate::new(0, 0),
    };

    let request = ApplyRequest {
        base_tree: Some(base_tree),
        ours_tree,
        theirs_tree,
        parents: vec![head, theirs],
        author,
        message: BString::from(message),
        in_progress: InProgress::Merge,
        in_progress_oid: theirs,
    };

    match apply(repo, request)? {
        ApplyOutcome::Empty => Ok(MergeDriverOutcome::AlreadyUpToDate),
        ApplyOutcome::Committed(oid) => Ok(MergeDriverOutcome::Committed(oid)),
        ApplyOutcome::Conflict(result) => Ok(MergeDriverOutcome::Conflict(result)),
    }
}

/// Move the current branch directly to `target` (no merge commit), and
/// sync the working tree and index to match.
fn fast_forward(repo: &mut Repository, target: ObjectId) -> Result<(), MergeError> {
    repo.reset_hard(target)?;
    Ok(())
}
