use std::path::PathBuf;

/// Conditions that stop a run with a non-zero exit status.
///
/// Everything else (missing fields, odd describe output, absent targets when
/// not configured as fatal) is logged and replaced by a sentinel instead.
#[derive(Debug, thiserror::Error)]
pub enum BuildVersionError {
    #[error("expected {expected} build arguments, received {received}")]
    MissingArguments { expected: usize, received: usize },
    #[error("repository check failed: {0}")]
    RepositoryCheck(String),
    #[error("uncommitted changes present: {0}")]
    UncommittedChanges(String),
    #[error("no initialization target: neither the declaration nor the shared variable was written")]
    NoInitializationTarget,
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn write_error(
    path: impl Into<PathBuf>,
) -> impl FnOnce(std::io::Error) -> BuildVersionError {
    let path = path.into();
    move |source| BuildVersionError::Write { path, source }
}

pub(crate) fn read_error(
    path: impl Into<PathBuf>,
) -> impl FnOnce(std::io::Error) -> BuildVersionError {
    let path = path.into();
    move |source| BuildVersionError::Read { path, source }
}
