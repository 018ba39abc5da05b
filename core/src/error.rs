use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Source directory missing or a document could not be read.
    #[error("cannot read source {path}: {source}")]
    Input { path: PathBuf, source: io::Error },

    #[error("block file {path}: {source}")]
    BlockIo { path: PathBuf, source: io::Error },

    #[error("index file {path}: {source}")]
    IndexIo { path: PathBuf, source: io::Error },

    /// The file decoded, but its content is not a well-formed table.
    #[error("malformed table in {path}: {message}")]
    Format { path: PathBuf, message: String },

    #[error("cannot write run file {path}: {source}")]
    OutputIo { path: PathBuf, source: io::Error },

    #[error("query document {0} could not be found in the index")]
    QueryNotFound(String),

    #[error("query document {0} has no length in the source collection")]
    LengthMissing(String),

    #[error("source collection contains no documents")]
    EmptyCorpus,
}

impl Error {
    /// Errors that only affect a single query of a batch.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::QueryNotFound(_) | Error::LengthMissing(_))
    }
}
