//! The byte destination owned by a rotating writer.

use std::any::Any;
use std::io::{self, Write};

/// Exposes a value as [`Any`] so trait objects can be downcast.
///
/// Implemented for every `'static` type; never implement it by hand.
pub trait AsAny: Any {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// Returns `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A writable byte destination that a rotating writer can swap out.
///
/// Sinks that hold an OS resource override [`Sink::close`]; the default
/// treats the sink as not closable and succeeds without doing anything.
pub trait Sink: Write + Send + AsAny {
    /// Releases the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying resource fails to close.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl dyn Sink {
    /// Returns `true` if the sink is a `T`.
    #[must_use]
    pub fn is<T: Sink>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Returns the sink as a `T` if it is one.
    #[must_use]
    pub fn downcast_ref<T: Sink>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Returns the sink mutably as a `T` if it is one.
    pub fn downcast_mut<T: Sink>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

impl Sink for Vec<u8> {}

impl Sink for io::Sink {}

impl Sink for io::Stdout {
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Sink for io::Stderr {
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}
