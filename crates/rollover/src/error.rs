use std::io;

use thiserror::Error;

/// Boxed error produced by [`Trigger`](crate::Trigger) and
/// [`Rotator`](crate::Rotator) implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for rotating writer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`RotatingWriter`](crate::RotatingWriter).
#[derive(Debug, Error)]
pub enum Error {
    /// The writer was already closed.
    #[error("closed writer")]
    Closed,

    /// The trigger could not decide whether to rotate.
    #[error("trigger: {0}")]
    Trigger(#[source] BoxError),

    /// The rotator could not produce a replacement sink.
    #[error("rotate: {0}")]
    Rotate(#[source] BoxError),

    /// The underlying sink failed to accept the bytes.
    #[error("underlying write failed: {0}")]
    Write(#[source] io::Error),

    /// The underlying sink failed to close.
    #[error("underlying close failed: {0}")]
    Close(#[source] io::Error),
}

impl Error {
    /// Returns `true` if this is the closed-writer sentinel.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Write(e) => e,
            other => Self::other(other),
        }
    }
}

/// Returns `true` if an I/O error produced through the [`std::io::Write`]
/// surface of a [`RotatingWriter`](crate::RotatingWriter) carries the
/// closed-writer sentinel.
#[must_use]
pub fn is_closed(error: &io::Error) -> bool {
    error
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<Error>())
        .is_some_and(Error::is_closed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_survives_io_conversion() {
        let error: io::Error = Error::Closed.into();
        assert!(is_closed(&error));
    }

    #[test]
    fn test_write_error_passes_through_verbatim() {
        let error: io::Error =
            Error::Write(io::Error::new(io::ErrorKind::StorageFull, "disk full")).into();

        assert_eq!(error.kind(), io::ErrorKind::StorageFull);
        assert!(!is_closed(&error));
    }

    #[test]
    fn test_closed_is_not_matched_by_message() {
        let error = io::Error::other("closed writer");
        assert!(!is_closed(&error));
    }
}
