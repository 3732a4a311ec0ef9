use std::io;

use crate::model::fs::FSError;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("bucket {bucket} is unreachable: {source}")]
    UnreachableBucket {
        bucket: String,
        #[source]
        source: FSError,
    },

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("object has no content length: {0}")]
    MissingContentLength(String),

    #[error("file body already released: {0}")]
    Released(String),

    #[error(transparent)]
    Store(#[from] FSError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        match err {
            FsError::Io(err) => err,
            FsError::NotFound(_) => io::Error::new(io::ErrorKind::NotFound, err),
            FsError::NotImplemented(_) => io::Error::new(io::ErrorKind::Unsupported, err),
            err => io::Error::other(err),
        }
    }
}
