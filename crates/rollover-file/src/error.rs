use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for file rotation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rotating files.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to create the directory holding the rotated file.
    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// A rotation step would overwrite an existing file.
    #[error("destination {0} already exists")]
    DestinationExists(PathBuf),

    /// The file name cannot be split into stem and extension.
    #[error("invalid file name: {0}")]
    InvalidFileName(PathBuf),

    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] io::Error),

    /// The path names a directory where a file was expected.
    #[error("{0} is a directory, not a file")]
    IsDirectory(PathBuf),

    /// No file exists at the path.
    #[error("no such file {path}: {source}")]
    NoSuchFile {
        /// The missing path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The sink handed to a file adapter is not a [`FileSink`](crate::FileSink).
    #[error("sink is not a file")]
    NotAFile,

    /// The sibling index pattern could not be compiled.
    #[error("sequence pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The cron expression could not be parsed.
    #[error("invalid schedule {expression:?}: {reason}")]
    Schedule {
        /// The rejected expression.
        expression: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The cron expression has no occurrence after the current one.
    #[error("schedule {0:?} has no upcoming occurrence")]
    ScheduleExhausted(String),

    /// The file sink was already closed.
    #[error("file sink {0} is closed")]
    SinkClosed(PathBuf),

    /// The timestamp format contains an invalid specifier.
    #[error("invalid timestamp format {0:?}")]
    TimestampFormat(String),

    /// A step of a transform chain failed; `path` is the path the chain
    /// started from.
    #[error("transformer[{index}]: {source}")]
    Transform {
        /// Position of the failing transformer in the chain.
        index: usize,
        /// The path before the chain started.
        path: PathBuf,
        /// The transformer's error.
        source: Box<Error>,
    },

    /// A single write is larger than the maximum file size.
    #[error("write of {len} bytes exceeds max file size of {max} bytes")]
    WriteTooLarge {
        /// Length of the rejected write.
        len: u64,
        /// Configured maximum file size.
        max: u64,
    },
}
