use std::path::Path;

use crate::{DiscoveredRepo, RepoError, RepositoryKind};

/// Name of the repository metadata directory, analogous to `.git`.
pub const REPO_DIR_NAME: &str = ".R";

/// Discover a repository by walking up from `start`.
///
/// Each ancestor directory is checked for a `.R/` subdirectory; failing
/// that, `start` itself is checked for being a bare repository (a
/// directory that directly contains `HEAD`, `objects/`, and `refs/`, with
/// no working tree above it). There is no `GIT_DIR`-style environment
/// override and no `.R`-file redirection — a single repository layout,
/// located relative to an explicit starting path, keeps discovery
/// hermetic and easy to test.
pub fn discover_repo_dir(start: &Path) -> Result<DiscoveredRepo, RepoError> {
    let start = std::fs::canonicalize(start).map_err(|_| RepoError::NotFound(start.to_path_buf()))?;

    let mut current = start.clone();
    loop {
        let repo_dir = current.join(REPO_DIR_NAME);
        if repo_dir.is_dir() && is_repo_dir(&repo_dir) {
            return Ok(DiscoveredRepo {
                repo_dir,
                work_tree: Some(current),
                kind: RepositoryKind::Normal,
            });
        }

        if is_repo_dir(&current) {
            return Ok(DiscoveredRepo {
                repo_dir: current,
                work_tree: None,
                kind: RepositoryKind::Bare,
            });
        }

        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => return Err(RepoError::NotFound(start)),
        }
    }
}

/// Open a known repository directory path directly (either a `.R/`
/// directory, or a bare repository directory).
pub fn open_repo_dir(repo_dir: &Path) -> Result<DiscoveredRepo, RepoError> {
    let repo_dir = std::fs::canonicalize(repo_dir)
        .map_err(|_| RepoError::NotFound(repo_dir.to_path_buf()))?;

    if !is_repo_dir(&repo_dir) {
        return Err(RepoError::InvalidRepoDir {
            path: repo_dir,
            reason: "missing HEAD, objects/, or refs/".to_string(),
        });
    }

    if let Some(parent) = repo_dir.parent() {
        if parent.join(REPO_DIR_NAME) == repo_dir {
            return Ok(DiscoveredRepo {
                work_tree: Some(parent.to_path_buf()),
                repo_dir,
                kind: RepositoryKind::Normal,
            });
        }
    }

    Ok(DiscoveredRepo {
        repo_dir,
        work_tree: None,
        kind: RepositoryKind::Bare,
    })
}

/// Open a repository given its working tree root (i.e. `work_tree/.R` exists).
pub fn open_repo_dir_from_work_tree(work_tree: &Path) -> Result<DiscoveredRepo, RepoError> {
    let repo_dir = work_tree.join(REPO_DIR_NAME);
    if !repo_dir.is_dir() {
        return Err(RepoError::NotFound(work_tree.to_path_buf()));
    }

    let repo_dir = std::fs::canonicalize(&repo_dir).map_err(|_| RepoError::NotFound(repo_dir.clone()))?;
    let work_tree = std::fs::canonicalize(work_tree)
        .map_err(|_| RepoError::NotFound(work_tree.to_path_buf()))?;

    if !is_repo_dir(&repo_dir) {
        return Err(RepoError::InvalidRepoDir {
            path: repo_dir,
            reason: "missing HEAD, objects/, or refs/".to_string(),
        });
    }

    Ok(DiscoveredRepo {
        repo_dir,
        work_tree: Some(work_tree),
        kind: RepositoryKind::Normal,
    })
}

/// Check if a directory looks like a repository directory (has HEAD,
/// objects/, refs/).
pub fn is_repo_dir(path: &Path) -> bool {
    path.join("HEAD").is_file() && path.join("objects").is_dir() && path.join("refs").is_dir()
}
