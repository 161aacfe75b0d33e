use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a reputation list.
#[derive(Debug, Error)]
pub enum ReputationError {
    #[error("failed to read domain list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error while reading domain list: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
}

impl ReputationError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}
