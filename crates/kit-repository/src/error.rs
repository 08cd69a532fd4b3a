use std::path::PathBuf;

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not a repository (or any of the parent directories): {0}")]
    NotFound(PathBuf),

    #[error("invalid repository directory: {path}: {reason}")]
    InvalidRepoDir { path: PathBuf, reason: String },

    #[error("repository already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("bare repository has no working tree")]
    BareNoWorkTree,

    #[error("unable to read HEAD: {0}")]
    InvalidHead(String),

    #[error("identity is not configured: set user.name and user.email")]
    NoIdentity,

    #[error(transparent)]
    Config(#[from] kit_config::ConfigError),

    #[error(transparent)]
    Odb(#[from] kit_odb::OdbError),

    #[error(transparent)]
    Ref(#[from] kit_ref::RefError),

    #[error(transparent)]
    Index(#[from] kit_index::IndexError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
