//! Rebase sequencer (§4.6, §5).
//!
//! A rebase replays `ancestors(HEAD) - ancestors(upstream)`, oldest first,
//! onto `upstream` via the shared apply kernel (each step is a cherry-pick
//! with `mainline = None`, since these commits come from linear history).
//! A conflict halts the sequence; the caller resolves it and calls
//! `continue_operation`, or calls `abort` to restore the pre-rebase state.
//!
//! State is persisted under `<repo_dir>/sequencer/` so a halted rebase
//! survives a process restart, same shape C git uses under `.git/`.

use std::fs;
use std::path::PathBuf;

use kit_hash::ObjectId;
use kit_repository::Repository;

use crate::cherry_pick;
use crate::{MergeError, MergeResult};

/// A single entry in the rebase todo list.
#[derive(Debug, Clone)]
pub struct SequencerEntry {
    pub commit: ObjectId,
}

/// Result of running (or resuming) the sequencer.
#[derive(Debug)]
pub enum SequencerResult {
    /// Every commit in the todo list was replayed.
    Complete,
    /// Replaying `todo[current_index]` produced a conflict; the index and
    /// working tree hold the conflict markers, waiting on the user.
    Paused { current_index: usize, result: MergeResult },
}

/// Builds and drives a rebase's replay sequence.
#[derive(Debug)]
pub struct Sequencer {
    repo_dir: PathBuf,
    original_head: ObjectId,
    upstream: ObjectId,
    todo: Vec<SequencerEntry>,
    current: usize,
}

impl Sequencer {
    /// Start a new rebase of the commits unique to HEAD onto `upstream`.
    /// Fails if a sequencer is already in progress (use `load`/`continue`/
    /// `abort` instead). Moves HEAD onto `upstream` immediately, recording
    /// the old tip as `ORIG_HEAD` (§4.6, §8 scenario 5) — every subsequent
    /// replay then diffs against the new base rather than the old tip.
    pub fn new(repo: &mut Repository, upstream: ObjectId) -> Result<Self, MergeError> {
        let head = repo.head_oid()?.ok_or(MergeError::NoMergeBase)?;

        if sequencer_dir(repo).exists() {
            return Err(MergeError::SequencerInProgress);
        }

        let todo = pick_list(repo, head, upstream)?;

        let orig_head_ref = kit_ref::RefName::new("ORIG_HEAD").map_err(kit_repository::RepoError::from)?;
        repo.refs().write_ref(&orig_head_ref, &head).map_err(kit_repository::RepoError::from)?;
        repo.reset_hard(upstream)?;

        Ok(Self {
            repo_dir: repo.repo_dir().to_path_buf(),
            original_head: head,
            upstream,
            todo,
            current: 0,
        })
    }

    /// Replay entries until the todo list is exhausted or one conflicts.
    pub fn execute(&mut self, repo: &mut Repository) -> Result<SequencerResult, MergeError> {
        self.save()?;

        while self.current < self.todo.len() {
            let commit = self.todo[self.current].commit;
            let result = cherry_pick::cherry_pick(repo, &commit, None)?;

            if !result.is_clean {
                self.save()?;
                return Ok(SequencerResult::Paused { current_index: self.current, result });
            }

            self.current += 1;
        }

        self.cleanup()?;
        Ok(SequencerResult::Complete)
    }

    /// Resume after the user has resolved the conflict at `current()` and
    /// staged the result: finish the paused step into a real commit — author
    /// preserved from the replayed commit via `CHERRY_PICK_HEAD`, message
    /// reused, parents `[HEAD]` — advance HEAD onto it, then continue the
    /// replay (§4.6: `--continue` resumes *after* applying the resolution).
    pub fn continue_operation(&mut self, repo: &mut Repository) -> Result<SequencerResult, MergeError> {
        let paused = self.todo[self.current].commit;
        let message = repo
            .read_commit(&paused)?
            .ok_or(MergeError::ObjectNotFound(paused))?
            .message
            .to_string();

        match repo.commit(&message)? {
            kit_repository::Outcome::Ok | kit_repository::Outcome::Empty => {}
            other => {
                return Err(MergeError::InvalidSequencerState(format!(
                    "could not finish step {}: {other:?}",
                    self.current
                )))
            }
        }

        self.current += 1;
        self.execute(repo)
    }

    /// Abandon the rebase: restore HEAD and the index to `original_head`,
    /// mirroring §4.6's `--abort` (`ORIG_HEAD` restore).
    pub fn abort(&self, repo: &mut Repository) -> Result<(), MergeError> {
        if !sequencer_dir_path(&self.repo_dir).exists() {
            return Err(MergeError::NoOperationInProgress);
        }

        repo.reset_hard(self.original_head)?;
        self.cleanup()?;
        Ok(())
    }

    /// Skip the commit at `current()` without applying it, and continue.
    /// The skipped step's cherry-pick never finished, so `CHERRY_PICK_HEAD`
    /// is left pointing at it and must be cleared by hand.
    pub fn skip(&mut self, repo: &mut Repository) -> Result<SequencerResult, MergeError> {
        clear_cherry_pick_head(repo)?;
        self.current += 1;
        self.execute(repo)
    }

    /// Persist `{head, upstream, todo}` so a halted rebase survives a
    /// restart.
    pub fn save(&self) -> Result<(), MergeError> {
        let dir = sequencer_dir_path(&self.repo_dir);
        fs::create_dir_all(&dir)?;

        fs::write(dir.join("head"), self.original_head.to_hex())?;
        fs::write(dir.join("upstream"), self.upstream.to_hex())?;

        let mut todo_content = String::new();
        for (i, entry) in self.todo.iter().enumerate() {
            let prefix = if i < self.current { "done" } else { "todo" };
            todo_content.push_str(&format!("{} {}\n", prefix, entry.commit.to_hex()));
        }
        fs::write(dir.join("todo"), &todo_content)?;

        Ok(())
    }

    /// Load a previously-saved sequencer, if one is in progress.
    pub fn load(repo: &Repository) -> Result<Option<Self>, MergeError> {
        let dir = sequencer_dir(repo);
        if !dir.exists() {
            return Ok(None);
        }

        let head_hex = fs::read_to_string(dir.join("head"))?;
        let original_head = ObjectId::from_hex(head_hex.trim())
            .map_err(|_| MergeError::InvalidSequencerState("invalid head".into()))?;

        let upstream_hex = fs::read_to_string(dir.join("upstream"))?;
        let upstream = ObjectId::from_hex(upstream_hex.trim())
            .map_err(|_| MergeError::InvalidSequencerState("invalid upstream".into()))?;

        let todo_content = fs::read_to_string(dir.join("todo"))?;
        let mut todo = Vec::new();
        let mut current = 0;

        for line in todo_content.lines() {
            let mut parts = line.splitn(2, ' ');
            let status = parts.next().unwrap_or("");
            let Some(hex) = parts.next() else { continue };

            let commit = ObjectId::from_hex(hex.trim())
                .map_err(|_| MergeError::InvalidSequencerState(format!("invalid commit oid: {hex}")))?;
            todo.push(SequencerEntry { commit });

            if status == "done" {
                current += 1;
            }
        }

        Ok(Some(Self { repo_dir: repo.repo_dir().to_path_buf(), original_head, upstream, todo, current }))
    }

    fn cleanup(&self) -> Result<(), MergeError> {
        let dir = sequencer_dir_path(&self.repo_dir);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.todo.len()
    }

    pub fn original_head(&self) -> ObjectId {
        self.original_head
    }

    pub fn upstream(&self) -> ObjectId {
        self.upstream
    }
}

fn clear_cherry_pick_head(repo: &Repository) -> Result<(), MergeError> {
    let name = kit_ref::RefName::new("CHERRY_PICK_HEAD").map_err(kit_repository::RepoError::from)?;
    match repo.refs().delete_ref(&name) {
        Ok(()) => Ok(()),
        Err(kit_ref::RefError::NotFound(_)) => Ok(()),
        Err(e) => Err(MergeError::Repo(kit_repository::RepoError::from(e))),
    }
}

fn sequencer_dir(repo: &Repository) -> PathBuf {
    sequencer_dir_path(repo.repo_dir())
}

fn sequencer_dir_path(repo_dir: &std::path::Path) -> PathBuf {
    repo_dir.join("sequencer")
}

/// `ancestors(head) - ancestors(upstream)`, oldest first (§4.6).
fn pick_list(repo: &Repository, head: ObjectId, upstream: ObjectId) -> Result<Vec<SequencerEntry>, MergeError> {
    let mut walk = kit_revwalk::RevWalk::new(repo)?;
    walk.set_sort(kit_revwalk::SortOrder::Topological);
    walk.push(head)?;
    walk.hide(upstream)?;

    let mut commits = Vec::new();
    for oid in walk {
        commits.push(oid?);
    }
    commits.reverse(); // walk yields newest-first; replay oldest-first.

    Ok(commits.into_iter().map(|commit| SequencerEntry { commit }).collect())
}
