//! Repository discovery, initialization, and the central struct tying
//! together the object store, reference store, index, and configuration
//! for a single repository rooted at `.R/`.

mod adapters;
mod discover;
mod error;
mod init;
mod outcome;

pub use adapters::{Clock, ConfigIdentity, FsWorkingTree, Identity, MergeText, SystemClock, TextMerger, WorkingTree};
pub use discover::REPO_DIR_NAME;
pub use error::RepoError;
pub use outcome::Outcome;

use std::path::{Path, PathBuf};

use bstr::BString;
use kit_config::ConfigSet;
use kit_hash::{HashAlgorithm, ObjectId};
use kit_index::{Index, IndexEntry, Stage};
use kit_object::{Commit, Object};
use kit_odb::ObjectDatabase;
use kit_ref::{FilesRefStore, RefName, RefStore, Reference};
use kit_utils::date::{GitDate, Signature};

/// Type of repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    /// Repository with a working tree, rooted at `<work_tree>/.R`.
    Normal,
    /// Bare repository (no working tree): the repo dir itself is `.R`-shaped.
    Bare,
}

/// Result of repository discovery before full opening.
#[derive(Debug)]
pub struct DiscoveredRepo {
    pub repo_dir: PathBuf,
    pub work_tree: Option<PathBuf>,
    pub kind: RepositoryKind,
}

/// Options for repository initialization.
pub struct InitOptions {
    pub bare: bool,
    pub default_branch: Option<String>,
    pub template_dir: Option<PathBuf>,
    pub hash_algorithm: HashAlgorithm,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            bare: false,
            default_branch: None,
            template_dir: None,
            hash_algorithm: HashAlgorithm::Sha1,
        }
    }
}

/// The central repository struct tying all subsystems together.
pub struct Repository {
    /// Path to the `.R` directory (or, for a bare repo, the repo dir itself).
    repo_dir: PathBuf,
    /// Path to the working tree (`None` for bare repos).
    work_tree: Option<PathBuf>,
    /// Object database.
    odb: ObjectDatabase,
    /// Reference store.
    refs: FilesRefStore,
    /// Merged configuration.
    config: ConfigSet,
    /// Index (lazy-loaded). `None` means not yet loaded.
    index: Option<Index>,
    /// Path to the index file.
    index_path: PathBuf,
    /// Hash algorithm.
    hash_algo: HashAlgorithm,
    /// Repository kind.
    kind: RepositoryKind,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("repo_dir", &self.repo_dir)
            .field("work_tree", &self.work_tree)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Open an existing repository at the given path.
    ///
    /// `path` may point to either the `.R` directory or the working tree
    /// root.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        let discovered = if discover::is_repo_dir(path) {
            discover::open_repo_dir(path)?
        } else if path.join(REPO_DIR_NAME).is_dir() {
            discover::open_repo_dir_from_work_tree(path)?
        } else {
            return Err(RepoError::NotFound(path.to_path_buf()));
        };
        Self::from_discovered(discovered)
    }

    /// Discover a repository starting from the given directory, walking up.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, RepoError> {
        let discovered = discover::discover_repo_dir(start.as_ref())?;
        Self::from_discovered(discovered)
    }

    /// Initialize a new repository at the given path.
    pub fn init(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let opts = InitOptions::default();
        let discovered = init::init_repository(path.as_ref(), &opts)?;
        Self::from_discovered(discovered)
    }

    /// Initialize a new bare repository at the given path.
    pub fn init_bare(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let opts = InitOptions {
            bare: true,
            ..Default::default()
        };
        let discovered = init::init_repository(path.as_ref(), &opts)?;
        Self::from_discovered(discovered)
    }

    /// Initialize a new repository with custom options.
    pub fn init_opts(path: impl AsRef<Path>, opts: &InitOptions) -> Result<Self, RepoError> {
        let discovered = init::init_repository(path.as_ref(), opts)?;
        Self::from_discovered(discovered)
    }

    /// Build a Repository from a DiscoveredRepo.
    fn from_discovered(discovered: DiscoveredRepo) -> Result<Self, RepoError> {
        let DiscoveredRepo {
            repo_dir,
            work_tree,
            kind,
        } = discovered;

        let objects_dir = repo_dir.join("objects");
        let config = ConfigSet::load(Some(&repo_dir))?;

        let hash_algo = match config.get_string("extensions.objectformat") {
            Ok(Some(ref name)) => HashAlgorithm::from_name(name).unwrap_or(HashAlgorithm::Sha1),
            _ => HashAlgorithm::Sha1,
        };

        let odb = ObjectDatabase::open_with_algo(&objects_dir, hash_algo)?;
        let refs = FilesRefStore::new(&repo_dir);
        let index_path = repo_dir.join("index");

        Ok(Repository {
            repo_dir,
            work_tree,
            odb,
            refs,
            config,
            index: None,
            index_path,
            hash_algo,
            kind,
        })
    }

    // --- Path accessors ---

    /// Path to the `.R` directory (or, for bare repos, the repo dir itself).
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Path to the working tree (`None` for bare repos).
    pub fn work_tree(&self) -> Option<&Path> {
        self.work_tree.as_deref()
    }

    /// Repository kind.
    pub fn kind(&self) -> RepositoryKind {
        self.kind
    }

    /// Is this a bare repository?
    pub fn is_bare(&self) -> bool {
        self.kind == RepositoryKind::Bare
    }

    // --- Subsystem accessors ---

    /// Access the object database.
    pub fn odb(&self) -> &ObjectDatabase {
        &self.odb
    }

    /// Access the reference store.
    pub fn refs(&self) -> &FilesRefStore {
        &self.refs
    }

    /// Access the configuration.
    pub fn config(&self) -> &ConfigSet {
        &self.config
    }

    /// Access the configuration mutably.
    pub fn config_mut(&mut self) -> &mut ConfigSet {
        &mut self.config
    }

    /// Resolve `user.name`/`user.email` through the loaded configuration.
    pub fn identity(&self) -> Result<(String, String), RepoError> {
        ConfigIdentity::new(&self.config).identity()
    }

    /// The default clock used to stamp new commits.
    pub fn clock(&self) -> SystemClock {
        SystemClock
    }

    /// A working-tree adapter rooted at this repository's working tree.
    /// Returns `None` for bare repositories.
    pub fn working_tree(&self) -> Option<FsWorkingTree> {
        self.work_tree.as_ref().map(FsWorkingTree::new)
    }

    /// Access the index (lazy-loaded).
    pub fn index(&mut self) -> Result<&Index, RepoError> {
        if self.index.is_none() {
            self.load_index()?;
        }
        Ok(self.index.as_ref().unwrap())
    }

    /// Access the index mutably (lazy-loaded).
    pub fn index_mut(&mut self) -> Result<&mut Index, RepoError> {
        if self.index.is_none() {
            self.load_index()?;
        }
        Ok(self.index.as_mut().unwrap())
    }

    /// Replace the cached index with the given one.
    pub fn set_index(&mut self, index: Index) {
        self.index = Some(index);
    }

    /// Write the current in-memory index back to disk.
    pub fn write_index(&self) -> Result<(), RepoError> {
        if let Some(ref idx) = self.index {
            idx.write_to(&self.index_path)?;
        }
        Ok(())
    }

    /// Reload the index from disk, replacing any cached copy.
    pub fn reload_index(&mut self) -> Result<&Index, RepoError> {
        self.index = None;
        self.load_index()?;
        Ok(self.index.as_ref().unwrap())
    }

    fn load_index(&mut self) -> Result<(), RepoError> {
        let idx = if self.index_path.exists() {
            Index::read_from(&self.index_path)?
        } else {
            Index::new()
        };
        self.index = Some(idx);
        Ok(())
    }

    /// Hash algorithm in use.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    // --- Convenience methods ---

    /// Resolve HEAD to an OID.
    pub fn head_oid(&self) -> Result<Option<ObjectId>, RepoError> {
        let head_ref = RefName::new("HEAD").map_err(RepoError::from)?;
        Ok(self.refs.resolve_to_oid(&head_ref)?)
    }

    /// Get the current branch name (`None` if detached HEAD).
    pub fn current_branch(&self) -> Result<Option<String>, RepoError> {
        let head_ref = RefName::new("HEAD").map_err(RepoError::from)?;
        match self.refs.resolve(&head_ref)? {
            Some(Reference::Symbolic { target, .. }) => {
                let name = target.as_str();
                let branch = name.strip_prefix("refs/heads/").unwrap_or(name);
                Ok(Some(branch.to_string()))
            }
            Some(Reference::Direct { .. }) => Ok(None),
            None => Ok(None),
        }
    }

    /// Check if this is on an unborn branch (no commits yet).
    pub fn is_unborn(&self) -> Result<bool, RepoError> {
        let head_ref = RefName::new("HEAD").map_err(RepoError::from)?;
        match self.refs.resolve(&head_ref)? {
            Some(Reference::Symbolic { target, .. }) => {
                Ok(self.refs.resolve_to_oid(&target)?.is_none())
            }
            Some(Reference::Direct { .. }) => Ok(false),
            None => Ok(true),
        }
    }

    /// Resolve a special in-progress-operation ref (`MERGE_HEAD`,
    /// `CHERRY_PICK_HEAD`, `ORIG_HEAD`).
    pub fn special_ref_oid(&self, name: &str) -> Result<Option<ObjectId>, RepoError> {
        let ref_name = RefName::new(name).map_err(RepoError::from)?;
        Ok(self.refs.resolve_to_oid(&ref_name)?)
    }

    /// Is there an in-progress merge or cherry-pick (conflict resolution
    /// pending, or sequencer state present)?
    pub fn has_conflicts(&mut self) -> Result<bool, RepoError> {
        if !self.index()?.conflicts().is_empty() {
            return Ok(true);
        }
        Ok(self.special_ref_oid("MERGE_HEAD")?.is_some()
            || self.special_ref_oid("CHERRY_PICK_HEAD")?.is_some())
    }

    // --- Commit creation ---

    /// Create a commit from the current index, per §4.6: requires a
    /// clean-of-conflicts index; parents are `[HEAD]` plus `MERGE_HEAD` if
    /// present; author and committer both come from the resolved identity;
    /// the branch HEAD points to (or HEAD itself, if detached) advances to
    /// the new commit; `MERGE_HEAD`/`CHERRY_PICK_HEAD` are cleared.
    pub fn commit(&mut self, message: &str) -> Result<Outcome, RepoError> {
        if !self.index()?.conflicts().is_empty() {
            return Ok(Outcome::InvalidState(
                "index has unresolved conflicts".into(),
            ));
        }

        self.index()?;
        let tree_oid = self.index.as_ref().unwrap().write_tree(&self.odb)?;
        let head_oid = self.head_oid()?;
        let merge_head = self.special_ref_oid("MERGE_HEAD")?;

        let mut parents: Vec<ObjectId> = Vec::new();
        if let Some(h) = head_oid {
            parents.push(h);
        }
        if let Some(m) = merge_head {
            if Some(m) != head_oid {
                parents.push(m);
            }
        }

        if let Some(h) = head_oid {
            if let Some(parent_commit) = self.read_commit(&h)? {
                if parent_commit.tree == tree_oid && merge_head.is_none() {
                    return Ok(Outcome::Empty);
                }
            }
        }

        let (name, email) = self.identity()?;
        let (epoch, tz) = self.clock().now_tuple();
        let committer = Signature {
            name: BString::from(name),
            email: BString::from(email),
            date: GitDate::new(epoch, tz),
        };

        // A commit continuing a cherry-pick preserves the replayed commit's
        // author; the committer is always whoever runs `commit` (§8 scenario 4).
        let author = match self.special_ref_oid("CHERRY_PICK_HEAD")? {
            Some(cherry_oid) => self
                .read_commit(&cherry_oid)?
                .map(|c| c.author)
                .unwrap_or_else(|| committer.clone()),
            None => committer.clone(),
        };

        let commit = Commit {
            tree: tree_oid,
            parents,
            author,
            committer,
            encoding: None,
            gpgsig: None,
            extra_headers: Vec::new(),
            message: BString::from(message),
        };
        let commit_oid = self.odb.write(&Object::Commit(commit))?;

        self.advance_head(head_oid, commit_oid)?;
        self.clear_special_ref("MERGE_HEAD")?;
        self.clear_special_ref("CHERRY_PICK_HEAD")?;

        Ok(Outcome::Ok)
    }

    /// Move HEAD (soft reset): update only the ref HEAD points to.
    pub fn reset_soft(&mut self, target: ObjectId) -> Result<Outcome, RepoError> {
        let head_oid = self.head_oid()?;
        self.advance_head(head_oid, target)
    }

    /// Move HEAD and reload the index from the target commit's tree.
    pub fn reset_mixed(&mut self, target: ObjectId) -> Result<Outcome, RepoError> {
        let outcome = self.reset_soft(target)?;
        if !outcome.is_ok() {
            return Ok(outcome);
        }
        let commit = self
            .read_commit(&target)?
            .ok_or(RepoError::InvalidHead(target.to_string()))?;
        let index = index_from_tree(&self.odb, &commit.tree)?;
        self.set_index(index);
        self.write_index()?;
        Ok(Outcome::Ok)
    }

    /// Move HEAD, reload the index, and overwrite the working tree.
    pub fn reset_hard(&mut self, target: ObjectId) -> Result<Outcome, RepoError> {
        let outcome = self.reset_mixed(target)?;
        if !outcome.is_ok() {
            return Ok(outcome);
        }
        let commit = self
            .read_commit(&target)?
            .ok_or(RepoError::InvalidHead(target.to_string()))?;
        match self.working_tree() {
            Some(wt) => {
                wt.checkout_tree(&self.odb, &commit.tree)?;
                Ok(Outcome::Ok)
            }
            None => Err(RepoError::BareNoWorkTree),
        }
    }

    /// Read and parse a commit object.
    pub fn read_commit(&self, oid: &ObjectId) -> Result<Option<Commit>, RepoError> {
        match self.odb.read(oid)? {
            Some(Object::Commit(c)) => Ok(Some(c)),
            Some(_) | None => Ok(None),
        }
    }

    fn advance_head(
        &self,
        expected_old: Option<ObjectId>,
        new_oid: ObjectId,
    ) -> Result<Outcome, RepoError> {
        let head_ref = RefName::new("HEAD").map_err(RepoError::from)?;
        let target_ref = match self.refs.resolve(&head_ref)? {
            Some(Reference::Symbolic { target, .. }) => target,
            _ => head_ref,
        };

        let result = match expected_old {
            Some(old) => {
                let mut txn = kit_ref::RefTransaction::new();
                txn.update(target_ref, old, new_oid, "commit");
                self.refs.commit_transaction(txn)
            }
            None => self.refs.write_ref(&target_ref, &new_oid),
        };

        match result {
            Ok(()) => Ok(Outcome::Ok),
            Err(kit_ref::RefError::CasFailed { .. }) => Ok(Outcome::ConcurrentUpdate),
            Err(e) => Err(e.into()),
        }
    }

    fn clear_special_ref(&self, name: &str) -> Result<(), RepoError> {
        let ref_name = RefName::new(name).map_err(RepoError::from)?;
        match self.refs.delete_ref(&ref_name) {
            Ok(()) => Ok(()),
            Err(kit_ref::RefError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SystemClock {
    fn now_tuple(&self) -> (i64, i32) {
        <Self as Clock>::now(self)
    }
}

/// Build an in-memory index whose stage-0 entries mirror a commit tree,
/// used by `reset --mixed`/`--hard` to reload the staging area.
fn index_from_tree(odb: &ObjectDatabase, tree_oid: &ObjectId) -> Result<Index, RepoError> {
    let mut index = Index::new();
    walk_tree_into_index(odb, tree_oid, &mut BString::from(""), &mut index)?;
    Ok(index)
}

fn walk_tree_into_index(
    odb: &ObjectDatabase,
    tree_oid: &ObjectId,
    prefix: &mut BString,
    index: &mut Index,
) -> Result<(), RepoError> {
    let tree = match odb.read(tree_oid)? {
        Some(Object::Tree(t)) => t,
        _ => {
            return Err(RepoError::InvalidHead(format!(
                "{tree_oid} is not a tree"
            )))
        }
    };

    for entry in &tree.entries {
        let mut path = prefix.clone();
        if !path.is_empty() {
            path.push(b'/');
        }
        path.extend_from_slice(&entry.name);

        if entry.mode.is_tree() {
            walk_tree_into_index(odb, &entry.oid, &mut path, index)?;
        } else {
            index.add(IndexEntry {
                path,
                oid: entry.oid,
                mode: entry.mode,
                stage: Stage::Normal,
                stat: Default::default(),
                flags: Default::default(),
            });
        }
    }
    Ok(())
}
