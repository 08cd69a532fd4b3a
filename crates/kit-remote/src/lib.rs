//! Remote synchronisation: `fetch` and `push` (§4.7).
//!
//! Wire transport and pack negotiation are out of scope (§1); a "remote" here
//! is simply another [`Repository`], and "transfer" is a direct copy of
//! objects from one [`kit_odb::ObjectDatabase`] to another. This keeps
//! `fetch`/`push` testable with two on-disk repositories and no networking
//! dependency.

use kit_hash::ObjectId;
use kit_object::Object;
use kit_ref::{RefName, RefTransaction};
use kit_repository::Repository;

/// Result of a `fetch`.
#[derive(Debug, Clone, Copy)]
pub struct FetchOutcome {
    /// The remote-tracking ref that was updated.
    pub updated_oid: ObjectId,
    /// Number of objects copied into the local object database.
    pub objects_transferred: usize,
}

/// Result of a `push`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote ref did not exist; it was created pointing at the pushed commit.
    Created(ObjectId),
    /// The remote ref was fast-forwarded to the pushed commit.
    FastForwarded { from: ObjectId, to: ObjectId },
    /// The local commit was already present as (or behind) the remote ref.
    UpToDate,
}

/// Errors produced by remote-sync operations.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("ref not found: {0}")]
    RefNotFound(String),

    #[error("push rejected: remote has diverged (non-fast-forward)")]
    NonFastForward,

    #[error(transparent)]
    Ref(#[from] kit_ref::RefError),

    #[error(transparent)]
    Odb(#[from] kit_odb::OdbError),

    #[error(transparent)]
    RevWalk(#[from] kit_revwalk::RevWalkError),
}

/// Fetch `branch` from `remote` into `local`.
///
/// Copies every object reachable from the remote branch's tip that is not
/// already present in the local object database, then unconditionally
/// updates `refs/remote/<remote_name>/<branch>` (§4.7: "update
/// unconditionally" — unlike `push`, a fetch never refuses).
pub fn fetch(
    local: &mut Repository,
    remote: &Repository,
    remote_name: &str,
    branch: &str,
) -> Result<FetchOutcome, RemoteError> {
    let remote_branch_ref = RefName::new(format!("refs/heads/{branch}"))?;
    let remote_oid = remote
        .refs()
        .resolve_to_oid(&remote_branch_ref)?
        .ok_or_else(|| RemoteError::RefNotFound(remote_branch_ref.as_str().to_string()))?;

    log::info!("fetch: {remote_name}/{branch} at {remote_oid}");

    let transferred = transfer_reachable(remote, local, &remote_oid)?;

    let tracking_ref = RefName::new(format!("refs/remote/{remote_name}/{branch}"))?;
    local.refs().write_ref(&tracking_ref, &remote_oid)?;

    log::debug!("fetch: transferred {transferred} object(s), updated {tracking_ref}");

    Ok(FetchOutcome {
        updated_oid: remote_oid,
        objects_transferred: transferred,
    })
}

/// Push `local_ref`'s commit to `branch` on `remote`.
///
/// Refuses (`NonFastForward`) unless the remote branch is absent or the
/// pushed commit descends from the remote's current tip (§4.7). On success,
/// copies the reachability closure into the remote's object database and
/// compare-and-sets the remote branch ref.
pub fn push(
    local: &Repository,
    remote: &mut Repository,
    local_branch: &str,
    remote_name: &str,
) -> Result<PushOutcome, RemoteError> {
    let local_branch_ref = RefName::new(format!("refs/heads/{local_branch}"))?;
    let local_oid = local
        .refs()
        .resolve_to_oid(&local_branch_ref)?
        .ok_or_else(|| RemoteError::RefNotFound(local_branch_ref.as_str().to_string()))?;

    let remote_branch_ref = RefName::new(format!("refs/heads/{local_branch}"))?;
    let remote_oid = remote.refs().resolve_to_oid(&remote_branch_ref)?;

    if let Some(remote_oid) = remote_oid {
        if remote_oid == local_oid {
            return Ok(PushOutcome::UpToDate);
        }
        if !kit_revwalk::is_ancestor(local, &remote_oid, &local_oid)? {
            return Err(RemoteError::NonFastForward);
        }
    }

    log::info!("push: {remote_name}/{local_branch} -> {local_oid}");

    let exclude: Vec<ObjectId> = remote_oid.into_iter().collect();
    let objects = kit_revwalk::list_objects(local, &[local_oid], &exclude)?;
    for oid in &objects {
        copy_object(local, remote, oid)?;
    }

    let mut txn = RefTransaction::new();
    match remote_oid {
        Some(old) => txn.update(remote_branch_ref, old, local_oid, "push"),
        None => txn.create(remote_branch_ref, local_oid, "push"),
    }
    remote.refs().commit_transaction(txn)?;

    log::debug!("push: transferred {} object(s)", objects.len());

    Ok(match remote_oid {
        Some(from) => PushOutcome::FastForwarded { from, to: local_oid },
        None => PushOutcome::Created(local_oid),
    })
}

/// Copy every object reachable from `start` in `src` that is not already
/// present in `dst`, stopping recursion as soon as an already-present object
/// is hit (§4.7: "transfer reachable objects... backwards until the set of
/// objects already present locally is hit").
fn transfer_reachable(src: &Repository, dst: &mut Repository, start: &ObjectId) -> Result<usize, RemoteError> {
    let mut stack = vec![*start];
    let mut seen = std::collections::HashSet::new();
    let mut count = 0;

    while let Some(oid) = stack.pop() {
        if !seen.insert(oid) || dst.odb().contains(&oid) {
            continue;
        }

        let obj = copy_object(src, dst, &oid)?;
        count += 1;

        match obj {
            Object::Commit(commit) => {
                stack.push(commit.tree);
                stack.extend(commit.parents);
            }
            Object::Tree(tree) => {
                stack.extend(tree.entries.iter().map(|e| e.oid));
            }
            Object::Blob(_) => {}
        }
    }

    Ok(count)
}

/// Read one object from `src` and write it into `dst`, returning the parsed
/// object for callers that need to keep walking its references.
fn copy_object(src: &Repository, dst: &mut Repository, oid: &ObjectId) -> Result<Object, RemoteError> {
    let obj = src
        .odb()
        .read(oid)?
        .ok_or_else(|| RemoteError::RefNotFound(oid.to_string()))?;
    dst.odb().write(&obj)?;
    Ok(obj)
}
