use std::fmt;

use crate::error::BoxError;
use crate::sink::Sink;

/// Outcome of a successful rotation.
pub enum Rotation {
    /// Keep writing to the current sink.
    Unchanged,

    /// Replace the current sink with this one.
    Replaced(Box<dyn Sink>),
}

impl fmt::Debug for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => f.write_str("Unchanged"),
            Self::Replaced(_) => f.write_str("Replaced(..)"),
        }
    }
}

/// Produces the sink that replaces the current one.
///
/// The rotator borrows the current sink mutably so it can sync or close it
/// as part of the rotation; the writer keeps ownership and swaps in the
/// replacement only once the rotator succeeds.
pub trait Rotator: Send {
    /// Rotates `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if no replacement could be produced. The writer then
    /// keeps `sink`, in whatever state the rotator left it.
    fn rotate(&mut self, sink: &mut dyn Sink) -> Result<Rotation, BoxError>;
}

impl<R: Rotator + ?Sized> Rotator for Box<R> {
    fn rotate(&mut self, sink: &mut dyn Sink) -> Result<Rotation, BoxError> {
        (**self).rotate(sink)
    }
}
