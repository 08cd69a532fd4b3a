//! Subcommand dispatch.
//!
//! This is the "external collaborator" SPEC_FULL.md §1 names as out of
//! scope for the engine itself: argument parsing here is intentionally
//! minimal (revision arguments accept only `HEAD`, a 40-hex object id, or a
//! bare branch name) so the workspace has a runnable surface and an
//! integration-test target, not a full `git`-compatible CLI.

use anyhow::{anyhow, bail, Context, Result};
use bstr::ByteSlice;
use clap::Subcommand;

use kit_hash::ObjectId;
use kit_ref::RefName;
use kit_repository::Repository;

use crate::Cli;

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new repository.
    Init {
        /// Directory to initialize (defaults to the current directory).
        path: Option<String>,
        /// Create a bare repository.
        #[arg(long)]
        bare: bool,
    },
    /// Record the staged changes as a new commit.
    Commit {
        #[arg(short = 'm', long)]
        message: String,
    },
    /// Merge a commit-ish into the current branch.
    Merge {
        commit: String,
        #[arg(short = 'm', long)]
        message: Option<String>,
    },
    /// Apply the changes introduced by a single commit onto the current branch.
    #[command(name = "cherry-pick")]
    CherryPick {
        commit: String,
        /// Parent number (1-indexed) to diff against, for cherry-picking a merge commit.
        #[arg(short = 'm', long)]
        mainline: Option<usize>,
    },
    /// Reapply commits on top of another base.
    Rebase {
        /// New base to replay onto.
        upstream: Option<String>,
        #[arg(long = "continue")]
        continue_: bool,
        #[arg(long)]
        abort: bool,
        #[arg(long)]
        skip: bool,
    },
    /// Move HEAD (and optionally the index/working tree) to a commit.
    Reset {
        commit: String,
        #[arg(long, conflicts_with = "hard")]
        mixed: bool,
        #[arg(long)]
        hard: bool,
    },
    /// Download objects and refs from a local repository acting as a remote.
    Fetch {
        /// Path to the remote repository.
        remote_path: String,
        /// Name to record this remote's tracking refs under.
        #[arg(long, default_value = "origin")]
        name: String,
        #[arg(long, default_value = "main")]
        branch: String,
    },
    /// Update a local repository acting as a remote with local objects and refs.
    Push {
        /// Path to the remote repository.
        remote_path: String,
        #[arg(long, default_value = "origin")]
        name: String,
        #[arg(long, default_value = "main")]
        branch: String,
    },
}

pub fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Init { path, bare } => cmd_init(path, bare),
        Commands::Commit { message } => cmd_commit(&message),
        Commands::Merge { commit, message } => cmd_merge(&commit, message.as_deref()),
        Commands::CherryPick { commit, mainline } => cmd_cherry_pick(&commit, mainline),
        Commands::Rebase { upstream, continue_, abort, skip } => {
            cmd_rebase(upstream, continue_, abort, skip)
        }
        Commands::Reset { commit, mixed, hard } => cmd_reset(&commit, mixed, hard),
        Commands::Fetch { remote_path, name, branch } => cmd_fetch(&remote_path, &name, &branch),
        Commands::Push { remote_path, name, branch } => cmd_push(&remote_path, &name, &branch),
    }
}

fn cmd_init(path: Option<String>, bare: bool) -> Result<i32> {
    let target = path.unwrap_or_else(|| ".".to_string());
    log::info!("init: {target} (bare={bare})");

    let repo = if bare {
        Repository::init_bare(&target)
    } else {
        Repository::init(&target)
    }
    .with_context(|| format!("failed to initialize repository at {target}"))?;

    println!("Initialized empty repository in {}", repo.repo_dir().display());
    Ok(0)
}

fn cmd_commit(message: &str) -> Result<i32> {
    let mut repo = open_repo()?;
    log::info!("commit: {message:?}");

    match repo.commit(message)? {
        kit_repository::Outcome::Ok => {
            let oid = repo.head_oid()?.ok_or_else(|| anyhow!("no HEAD after commit"))?;
            println!("{oid}");
            Ok(0)
        }
        kit_repository::Outcome::Empty => {
            println!("nothing to commit");
            Ok(1)
        }
        other => {
            bail!("commit failed: {other:?}");
        }
    }
}

fn cmd_merge(commit: &str, message: Option<&str>) -> Result<i32> {
    let mut repo = open_repo()?;
    let theirs = resolve_commitish(&repo, commit)?;
    let message = message.map(String::from).unwrap_or_else(|| format!("Merge commit '{commit}'"));
    log::info!("merge: {theirs} into HEAD");

    match kit_merge::merge::merge(&mut repo, theirs, &message)? {
        kit_merge::merge::MergeDriverOutcome::AlreadyUpToDate => {
            println!("Already up to date.");
            Ok(0)
        }
        kit_merge::merge::MergeDriverOutcome::FastForward(oid) => {
            println!("Fast-forward to {oid}");
            Ok(0)
        }
        kit_merge::merge::MergeDriverOutcome::Committed(oid) => {
            println!("Merge made by the 'recursive' strategy. {oid}");
            Ok(0)
        }
        kit_merge::merge::MergeDriverOutcome::Conflict(result) => {
            print_conflicts(&result);
            Ok(1)
        }
    }
}

fn cmd_cherry_pick(commit: &str, mainline: Option<usize>) -> Result<i32> {
    let mut repo = open_repo()?;
    let oid = resolve_commitish(&repo, commit)?;
    log::info!("cherry-pick: {oid}");

    let result = kit_merge::cherry_pick::cherry_pick(&mut repo, &oid, mainline)?;
    if result.is_clean {
        println!("{}", result.tree.map(|t| t.to_string()).unwrap_or_default());
        Ok(0)
    } else {
        print_conflicts(&result);
        Ok(1)
    }
}

fn cmd_rebase(upstream: Option<String>, continue_: bool, abort: bool, skip: bool) -> Result<i32> {
    let mut repo = open_repo()?;

    if continue_ || abort || skip {
        let mut seq = kit_merge::sequencer::Sequencer::load(&repo)?
            .ok_or_else(|| anyhow!("no rebase in progress"))?;

        if abort {
            seq.abort(&mut repo)?;
            println!("rebase aborted");
            return Ok(0);
        }

        let result = if skip { seq.skip(&mut repo)? } else { seq.continue_operation(&mut repo)? };
        return report_sequencer_result(result);
    }

    let upstream = upstream.ok_or_else(|| anyhow!("rebase requires an upstream (or --continue/--abort/--skip)"))?;
    let upstream_oid = resolve_commitish(&repo, &upstream)?;
    log::info!("rebase: onto {upstream_oid}");

    let mut seq = kit_merge::sequencer::Sequencer::new(&mut repo, upstream_oid)?;
    let result = seq.execute(&mut repo)?;
    report_sequencer_result(result)
}

fn report_sequencer_result(result: kit_merge::sequencer::SequencerResult) -> Result<i32> {
    match result {
        kit_merge::sequencer::SequencerResult::Complete => {
            println!("rebase complete");
            Ok(0)
        }
        kit_merge::sequencer::SequencerResult::Paused { current_index, result } => {
            println!("rebase paused at step {current_index}");
            print_conflicts(&result);
            Ok(1)
        }
    }
}

fn cmd_reset(commit: &str, mixed: bool, hard: bool) -> Result<i32> {
    let mut repo = open_repo()?;
    let target = resolve_commitish(&repo, commit)?;
    log::info!("reset: to {target} (mixed={mixed}, hard={hard})");

    let outcome = if hard {
        repo.reset_hard(target)?
    } else if mixed {
        repo.reset_mixed(target)?
    } else {
        repo.reset_soft(target)?
    };

    if outcome.is_ok() {
        println!("HEAD is now at {target}");
        Ok(0)
    } else {
        bail!("reset failed: {outcome:?}");
    }
}

fn cmd_fetch(remote_path: &str, name: &str, branch: &str) -> Result<i32> {
    let mut repo = open_repo()?;
    let remote = Repository::open(remote_path).with_context(|| format!("cannot open remote at {remote_path}"))?;
    log::info!("fetch: {name} {branch}");

    let outcome = kit_remote::fetch(&mut repo, &remote, name, branch)?;
    println!(
        "fetched {} object(s), {name}/{branch} now at {}",
        outcome.objects_transferred, outcome.updated_oid
    );
    Ok(0)
}

fn cmd_push(remote_path: &str, name: &str, branch: &str) -> Result<i32> {
    let repo = open_repo()?;
    let mut remote = Repository::open(remote_path).with_context(|| format!("cannot open remote at {remote_path}"))?;
    log::info!("push: {name} {branch}");

    match kit_remote::push(&repo, &mut remote, branch, name) {
        Ok(outcome) => {
            println!("pushed: {outcome:?}");
            Ok(0)
        }
        Err(kit_remote::RemoteError::NonFastForward) => {
            println!("! [rejected] {branch} -> {branch} (non-fast-forward)");
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

fn open_repo() -> Result<Repository> {
    Repository::discover(".").context("not a repository (or any of the parent directories)")
}

fn print_conflicts(result: &kit_merge::MergeResult) {
    println!("Automatic merge failed; fix conflicts and then commit the result.");
    for conflict in &result.conflicts {
        println!("  {:?}: {}", conflict.conflict_type, conflict.path.to_str_lossy());
    }
}

fn resolve_commitish(repo: &Repository, rev: &str) -> Result<ObjectId> {
    if rev == "HEAD" {
        return repo.head_oid()?.ok_or_else(|| anyhow!("HEAD: unborn branch has no commit"));
    }

    if let Ok(oid) = ObjectId::from_hex(rev) {
        return Ok(oid);
    }

    let branch_ref = RefName::new(format!("refs/heads/{rev}"))?;
    repo.refs()
        .resolve_to_oid(&branch_ref)?
        .ok_or_else(|| anyhow!("unknown revision: {rev}"))
}
