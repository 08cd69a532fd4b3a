//! Cherry-pick (§4.6, §9).
//!
//! Replays a single commit's changes onto the current branch: the commit's
//! own parent is the merge base, HEAD is "ours", the commit itself is
//! "theirs". The new commit preserves the original author but is committed
//! by the current identity (§4.6), with `parents = [HEAD]`.
//!
//! A merge commit has more than one parent, so "the commit's parent" is
//! ambiguous; the caller must say which parent number (1-indexed, git's
//! `-m` convention) is the mainline. A root commit (no parents) is not
//! ambiguous at all — it cherry-picks cleanly against an empty base.

use kit_hash::ObjectId;
use kit_object::{Commit, Object};
use kit_repository::Repository;

use crate::apply::{apply, ApplyOutcome, ApplyRequest, InProgress};
use crate::{MergeError, MergeResult};

/// Cherry-pick `commit_oid` onto the current branch.
///
/// `mainline` selects which parent of a merge commit is the diff base
/// (1-indexed); required when `commit_oid` has more than one parent, and
/// rejected (as `AmbiguousMergeCommit`) when absent.
pub fn cherry_pick(
    repo: &mut Repository,
    commit_oid: &ObjectId,
    mainline: Option<usize>,
) -> Result<MergeResult, MergeError> {
    let commit = read_commit(repo, commit_oid)?;
    let base_tree = resolve_base_tree(repo, commit_oid, &commit, mainline)?;

    let head_oid = repo.head_oid()?.ok_or(MergeError::NoMergeBase)?;
    let ours_tree = repo
        .read_commit(&head_oid)?
        .ok_or(MergeError::ObjectNotFound(head_oid))?
        .tree;

    let request = ApplyRequest {
        base_tree,
        ours_tree,
        theirs_tree: commit.tree,
        parents: vec![head_oid],
        author: commit.author.clone(),
        message: commit.message.clone(),
        in_progress: InProgress::CherryPick,
        in_progress_oid: *commit_oid,
    };

    match apply(repo, request)? {
        ApplyOutcome::Empty => Ok(MergeResult {
            tree: Some(ours_tree),
            is_clean: true,
            conflicts: Vec::new(),
            message: Some(commit.message.to_string()),
        }),
        ApplyOutcome::Committed(oid) => {
            let new_tree = repo
                .read_commit(&oid)?
                .ok_or(MergeError::ObjectNotFound(oid))?
                .tree;
            Ok(MergeResult {
                tree: Some(new_tree),
                is_clean: true,
                conflicts: Vec::new(),
                message: Some(commit.message.to_string()),
            })
        }
        ApplyOutcome::Conflict(mut result) => {
            result.message = Some(commit.message.to_string());
            Ok(result)
        }
    }
}

/// The diff base tree for replaying `commit` against `commit_oid`'s parent
/// graph. Root commits (no parents) diff against an empty tree; commits
/// with exactly one parent use it unconditionally; merge commits require
/// `mainline` to disambiguate.
fn resolve_base_tree(
    repo: &Repository,
    commit_oid: &ObjectId,
    commit: &Commit,
    mainline: Option<usize>,
) -> Result<Option<ObjectId>, MergeError> {
    match commit.parents.len() {
        0 => Ok(None),
        1 => {
            let parent = commit.parents[0];
            Ok(Some(repo.read_commit(&parent)?.ok_or(MergeError::ObjectNotFound(parent))?.tree))
        }
        _ => {
            let index = mainline.ok_or(MergeError::AmbiguousMergeCommit(*commit_oid))?;
            let parent = *commit
                .parents
                .get(index.checked_sub(1).ok_or(MergeError::AmbiguousMergeCommit(*commit_oid))?)
                .ok_or(MergeError::AmbiguousMergeCommit(*commit_oid))?;
            Ok(Some(repo.read_commit(&parent)?.ok_or(MergeError::ObjectNotFound(parent))?.tree))
        }
    }
}

fn read_commit(repo: &Repository, commit_oid: &ObjectId) -> Result<Commit, MergeError> {
    match repo.odb().read(commit_oid)? {
        Some(Object::Commit(c)) => Ok(c),
        Some(other) => Err(MergeError::UnexpectedObjectType {
            oid: *commit_oid,
            expected: "commit",
            actual: other.object_type().to_string(),
        }),
        None => Err(MergeError::ObjectNotFound(*commit_oid)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::BString;
    use kit_object::{Blob, FileMode, Tree, TreeEntry};
    use kit_utils::date::{GitDate, Signature};

    fn init_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = Repository::init(dir.path()).unwrap();
        repo.config_mut().add_file(
            kit_config::ConfigFile::parse(
                b"[user]\n\tname = Ada\n\temail = ada@example.com\n",
                None,
                kit_config::ConfigScope::Local,
            )
            .unwrap(),
        );
        (dir, repo)
    }

    fn write_file_commit(repo: &Repository, parents: Vec<ObjectId>, content: &[u8], author: &str) -> ObjectId {
        let blob_oid = repo.odb().write(&Object::Blob(Blob::new(content.to_vec()))).unwrap();
        let tree_oid = repo
            .odb()
            .write(&Object::Tree(Tree {
                entries: vec![TreeEntry { mode: FileMode::Regular, name: "f.txt".into(), oid: blob_oid }],
            }))
            .unwrap();
        let sig = Signature { name: BString::from(author), email: BString::from("a@x.com"), date: GitDate::new(1, 0) };
        repo.odb()
            .write(&Object::Commit(Commit {
                tree: tree_oid,
                parents,
                author: sig.clone(),
                committer: sig,
                encoding: None,
                gpgsig: None,
                extra_headers: Vec::new(),
                message: BString::from("m"),
            }))
            .unwrap()
    }

    fn set_head(repo: &Repository, oid: ObjectId) {
        let head_ref = kit_ref::RefName::new("refs/heads/main").unwrap();
        repo.refs().write_ref(&head_ref, &oid).unwrap();
    }

    #[test]
    fn root_commit_cherry_picks_without_error() {
        let (_dir, mut repo) = init_repo();
        let root = write_file_commit(&repo, vec![], b"hello\n", "Grace");
        set_head(&repo, root);

        let pick = write_file_commit(&repo, vec![], b"world\n", "Grace");
        let result = cherry_pick(&mut repo, &pick, None).unwrap();
        assert!(result.is_clean);
    }

    #[test]
    fn merge_commit_without_mainline_is_rejected() {
        let (_dir, mut repo) = init_repo();
        let c1 = write_file_commit(&repo, vec![], b"a\n", "Grace");
        let c2 = write_file_commit(&repo, vec![], b"b\n", "Grace");
        let merge_commit = write_file_commit(&repo, vec![c1, c2], b"m\n", "Grace");
        set_head(&repo, c1);

        let err = cherry_pick(&mut repo, &merge_commit, None).unwrap_err();
        assert!(matches!(err, MergeError::AmbiguousMergeCommit(oid) if oid == merge_commit));
    }

    #[test]
    fn single_parent_commit_preserves_author() {
        let (_dir, mut repo) = init_repo();
        let c1 = write_file_commit(&repo, vec![], b"a\n", "Grace");
        set_head(&repo, c1);
        let c2 = write_file_commit(&repo, vec![c1], b"b\n", "Linus");

        let result = cherry_pick(&mut repo, &c2, None).unwrap();
        assert!(result.is_clean);
        let new_head = repo.head_oid().unwrap().unwrap();
        let commit = repo.read_commit(&new_head).unwrap().unwrap();
        assert_eq!(commit.author.name, "Linus");
        assert_eq!(commit.committer.name, "Ada");
    }
}
