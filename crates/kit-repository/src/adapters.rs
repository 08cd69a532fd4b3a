//! Adapter traits the history engine depends on but does not implement.
//!
//! The engine is exercised against these traits, never against a concrete
//! file system or network call directly: `WorkingTree` materialises trees
//! on disk and hashes file content, `TextMerger` performs the line-level
//! three-way merge of blob content, `Clock` timestamps new commits, and
//! `Identity` supplies the name/email recorded as author and committer.
//! Only `FsWorkingTree`, `SystemClock`, and `ConfigIdentity` ship a concrete
//! implementation here — enough to exercise the engine end to end.

use std::path::{Path, PathBuf};

use kit_config::ConfigSet;
use kit_hash::ObjectId;
use kit_object::{Blob, FileMode, Object, Tree};
use kit_odb::ObjectDatabase;

use crate::error::RepoError;

/// Materialises commit trees onto (and reads file content back from) a
/// working tree. Deliberately out of the engine's own scope (§1): the
/// engine asks the adapter to reflect a tree, never touches the file
/// system itself.
pub trait WorkingTree {
    /// Overwrite tracked paths with the content of `tree_oid`, recursively.
    fn checkout_tree(&self, odb: &ObjectDatabase, tree_oid: &ObjectId) -> Result<(), RepoError>;

    /// Hash a working-tree file's current content as a blob, writing it to
    /// the object store and returning its oid.
    fn hash_file(&self, odb: &ObjectDatabase, path: &Path) -> Result<ObjectId, RepoError>;

    /// Write conflict-marker bytes to a path so the user can resolve by hand.
    fn write_conflict_markers(&self, path: &Path, merged_bytes: &[u8]) -> Result<(), RepoError>;
}

/// Outcome of a textual three-way merge of blob content.
pub enum MergeText {
    Clean(Vec<u8>),
    Conflicted(Vec<u8>),
}

/// Performs the line-level three-way merge invoked for `content_conflict`
/// and `add_add` paths. The mandatory-BASE conflict-marker format (§4.5) is
/// the contract every implementation must honor.
pub trait TextMerger {
    fn merge3(&self, base: &[u8], ours: &[u8], theirs: &[u8]) -> MergeText;
}

/// Wall-clock time for commit timestamps, abstracted so tests can pin a
/// fixed instant instead of racing the system clock.
pub trait Clock {
    /// Seconds since the Unix epoch, and a signed UTC offset in minutes.
    fn now(&self) -> (i64, i32);
}

/// Default clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> (i64, i32) {
        let epoch = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        // No timezone crate in the dependency stack; commits are stamped UTC.
        (epoch, 0)
    }
}

/// Supplies the name/email recorded as author and committer.
pub trait Identity {
    fn identity(&self) -> Result<(String, String), RepoError>;
}

/// Identity resolved from `user.name`/`user.email`, with no
/// environment-variable or system-user fallback — the engine stays hermetic
/// and testable, and a missing identity is a configuration error rather
/// than a silent guess.
pub struct ConfigIdentity<'a> {
    config: &'a ConfigSet,
}

impl<'a> ConfigIdentity<'a> {
    pub fn new(config: &'a ConfigSet) -> Self {
        ConfigIdentity { config }
    }
}

impl<'a> Identity for ConfigIdentity<'a> {
    fn identity(&self) -> Result<(String, String), RepoError> {
        let name = self
            .config
            .get_string("user.name")?
            .ok_or(RepoError::NoIdentity)?;
        let email = self
            .config
            .get_string("user.email")?
            .ok_or(RepoError::NoIdentity)?;
        Ok((name, email))
    }
}

/// A `WorkingTree` backed by ordinary file system paths rooted at a
/// directory, with no linked-worktree or submodule indirection — the
/// engine is always checking out into a single tree of its own.
pub struct FsWorkingTree {
    root: PathBuf,
}

impl FsWorkingTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsWorkingTree { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn checkout_tree_at(
        &self,
        odb: &ObjectDatabase,
        tree_oid: &ObjectId,
        dir: &Path,
    ) -> Result<(), RepoError> {
        std::fs::create_dir_all(dir)?;
        let object = odb
            .read(tree_oid)?
            .ok_or_else(|| RepoError::InvalidRepoDir {
                path: dir.to_path_buf(),
                reason: format!("missing tree object {tree_oid}"),
            })?;
        let tree = match object {
            Object::Tree(t) => t,
            _ => {
                return Err(RepoError::InvalidRepoDir {
                    path: dir.to_path_buf(),
                    reason: format!("{tree_oid} is not a tree"),
                })
            }
        };

        for entry in &tree.entries {
            let name = entry.name.to_string();
            let path = dir.join(&name);
            if entry.mode.is_tree() {
                self.checkout_tree_at(odb, &entry.oid, &path)?;
            } else {
                let object = odb.read(&entry.oid)?.ok_or_else(|| RepoError::InvalidRepoDir {
                    path: path.clone(),
                    reason: format!("missing blob object {}", entry.oid),
                })?;
                let blob = match object {
                    Object::Blob(b) => b,
                    _ => {
                        return Err(RepoError::InvalidRepoDir {
                            path: path.clone(),
                            reason: format!("{} is not a blob", entry.oid),
                        })
                    }
                };
                write_file(&path, &blob.data, entry.mode)?;
            }
        }
        Ok(())
    }
}

impl WorkingTree for FsWorkingTree {
    fn checkout_tree(&self, odb: &ObjectDatabase, tree_oid: &ObjectId) -> Result<(), RepoError> {
        self.checkout_tree_at(odb, tree_oid, &self.root)
    }

    fn hash_file(&self, odb: &ObjectDatabase, path: &Path) -> Result<ObjectId, RepoError> {
        let full = self.root.join(path);
        let data = std::fs::read(&full)?;
        let oid = odb.write(&Object::Blob(Blob::new(data)))?;
        Ok(oid)
    }

    fn write_conflict_markers(&self, path: &Path, merged_bytes: &[u8]) -> Result<(), RepoError> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, merged_bytes)?;
        Ok(())
    }
}

#[cfg(unix)]
fn write_file(path: &Path, data: &[u8], mode: FileMode) -> Result<(), RepoError> {
    use std::os::unix::fs::PermissionsExt;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if mode.is_symlink() {
        let target = String::from_utf8_lossy(data).to_string();
        if path.symlink_metadata().is_ok() {
            std::fs::remove_file(path).ok();
        }
        std::os::unix::fs::symlink(target, path)?;
        return Ok(());
    }
    std::fs::write(path, data)?;
    let perms = if matches!(mode, FileMode::Executable) {
        std::fs::Permissions::from_mode(0o755)
    } else {
        std::fs::Permissions::from_mode(0o644)
    };
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_file(path: &Path, data: &[u8], _mode: FileMode) -> Result<(), RepoError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
