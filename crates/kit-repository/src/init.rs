use std::fs;
use std::path::Path;

use crate::discover::REPO_DIR_NAME;
use crate::{DiscoveredRepo, InitOptions, RepoError, RepositoryKind};

/// Initialize a new repository.
///
/// Creates the standard `.R/` structure:
/// - HEAD (pointing to the default branch)
/// - config
/// - objects/
/// - refs/heads/
/// - refs/tags/
/// - refs/remote/
/// - description
///
/// A bare repository puts this structure directly at `path` instead of at
/// `path/.R`, with no working tree.
pub fn init_repository(path: &Path, options: &InitOptions) -> Result<DiscoveredRepo, RepoError> {
    let path = if path.is_relative() {
        std::env::current_dir()?.join(path)
    } else {
        path.to_path_buf()
    };

    let (repo_dir, work_tree) = if options.bare {
        (path.clone(), None)
    } else {
        (path.join(REPO_DIR_NAME), Some(path.clone()))
    };

    // Re-running init on an existing repository is a safe no-op: we never
    // overwrite HEAD, config, or any existing object/ref data.
    if repo_dir.join("HEAD").is_file() {
        return Ok(DiscoveredRepo {
            repo_dir,
            work_tree,
            kind: if options.bare {
                RepositoryKind::Bare
            } else {
                RepositoryKind::Normal
            },
        });
    }

    fs::create_dir_all(&repo_dir)?;
    fs::create_dir_all(repo_dir.join("objects"))?;
    fs::create_dir_all(repo_dir.join("refs").join("heads"))?;
    fs::create_dir_all(repo_dir.join("refs").join("tags"))?;
    fs::create_dir_all(repo_dir.join("refs").join("remote"))?;

    let default_branch = options.default_branch.as_deref().unwrap_or("main");

    fs::write(
        repo_dir.join("HEAD"),
        format!("ref: refs/heads/{default_branch}\n"),
    )?;

    let config_content = if options.bare {
        "[core]\n\trepositoryformatversion = 0\n\tbare = true\n"
    } else {
        "[core]\n\trepositoryformatversion = 0\n\tbare = false\n"
    };
    fs::write(repo_dir.join("config"), config_content)?;

    fs::write(
        repo_dir.join("description"),
        "Unnamed repository; edit this file 'description' to name the repository.\n",
    )?;

    if let Some(ref template_dir) = options.template_dir {
        if template_dir.is_dir() {
            copy_template(template_dir, &repo_dir)?;
        }
    }

    Ok(DiscoveredRepo {
        repo_dir,
        work_tree,
        kind: if options.bare {
            RepositoryKind::Bare
        } else {
            RepositoryKind::Normal
        },
    })
}

/// Copy template directory contents into the repo dir.
///
/// Files from the template are only copied if they don't already exist in
/// the target.
fn copy_template(template_dir: &Path, repo_dir: &Path) -> Result<(), RepoError> {
    copy_dir_recursive(template_dir, repo_dir)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), RepoError> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            if !dst_path.exists() {
                fs::create_dir_all(&dst_path)?;
            }
            copy_dir_recursive(&src_path, &dst_path)?;
        } else if file_type.is_file() && !dst_path.exists() {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}
