use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::rotator::{Rotation, Rotator};
use crate::sink::Sink;
use crate::trigger::Trigger;

/// Wraps a [`Sink`], consulting a [`Trigger`] before every write and
/// swapping the sink through a [`Rotator`] when it fires.
///
/// The trigger check, the rotation and the write itself run under one lock,
/// so at most one rotation is ever in flight and no write reaches a sink
/// that a concurrent rotation already released. The closed flag lives
/// outside that lock: writes on a closed writer are rejected without
/// contending with rotation.
pub struct RotatingWriter<T, R> {
    inner: Mutex<Inner<T, R>>,
    closed: AtomicBool,
}

struct Inner<T, R> {
    sink: Box<dyn Sink>,
    trigger: T,
    rotator: R,
}

impl<T, R> RotatingWriter<T, R>
where
    T: Trigger,
    R: Rotator,
{
    /// Creates an open writer around `sink`.
    pub fn new(sink: impl Sink, trigger: T, rotator: R) -> Self {
        Self::from_boxed(Box::new(sink), trigger, rotator)
    }

    /// Creates an open writer around an already boxed sink.
    pub fn from_boxed(sink: Box<dyn Sink>, trigger: T, rotator: R) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sink,
                trigger,
                rotator,
            }),
            closed: AtomicBool::new(false),
        }
    }

    /// Writes `buf` to the current sink, rotating it first if the trigger
    /// fires. Returns the count reported by the sink that received the bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::Closed`] if the writer was closed.
    /// - [`Error::Trigger`] / [`Error::Rotate`] if the trigger or rotator
    ///   failed; nothing is written and the sink is not replaced.
    /// - [`Error::Write`] if the sink rejected the bytes.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let mut guard = self.inner.lock();

        // Close may have won the race for the lock.
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let Inner {
            sink,
            trigger,
            rotator,
        } = &mut *guard;

        if trigger.trigger(&**sink, buf).map_err(Error::Trigger)? {
            match rotator.rotate(&mut **sink).map_err(Error::Rotate)? {
                Rotation::Unchanged => trace!("rotator kept the current sink"),
                Rotation::Replaced(next) => {
                    *sink = next;
                    debug!("rotated sink");
                }
            }
        }

        sink.write(buf).map_err(Error::Write)
    }

    /// Flushes the current sink.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the writer was closed, or [`Error::Write`]
    /// if the sink failed to flush.
    pub fn flush(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        self.inner.lock().sink.flush().map_err(Error::Write)
    }

    /// Closes the writer and then the current sink.
    ///
    /// The writer stays closed even if closing the sink fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the writer was already closed, or
    /// [`Error::Close`] if the sink failed to close.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::Closed);
        }

        debug!("closing rotating writer");
        self.inner.lock().sink.close().map_err(Error::Close)
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl<T, R> fmt::Debug for RotatingWriter<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingWriter")
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T, R> io::Write for &RotatingWriter<T, R>
where
    T: Trigger,
    R: Rotator,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingWriter::write(*self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingWriter::flush(*self).map_err(Into::into)
    }
}

impl<T, R> io::Write for RotatingWriter<T, R>
where
    T: Trigger,
    R: Rotator,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut &*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::BoxError;

    struct Fixed(bool);

    impl Trigger for Fixed {
        fn trigger(&mut self, _: &dyn Sink, _: &[u8]) -> std::result::Result<bool, BoxError> {
            Ok(self.0)
        }
    }

    struct Fresh;

    impl Rotator for Fresh {
        fn rotate(&mut self, _: &mut dyn Sink) -> std::result::Result<Rotation, BoxError> {
            Ok(Rotation::Replaced(Box::new(Vec::<u8>::new())))
        }
    }

    #[test]
    fn test_write_without_rotation_keeps_sink() {
        let writer = RotatingWriter::new(Vec::<u8>::new(), Fixed(false), Fresh);

        assert_eq!(writer.write(b"hello").unwrap(), 5);
        assert_eq!(writer.write(b" world").unwrap(), 6);

        let guard = writer.inner.lock();
        let buffer = guard.sink.downcast_ref::<Vec<u8>>().unwrap();
        assert_eq!(buffer.as_slice(), b"hello world");
    }

    #[test]
    fn test_write_with_rotation_swaps_sink() {
        let writer = RotatingWriter::new(b"old".to_vec(), Fixed(true), Fresh);

        assert_eq!(writer.write(b"new").unwrap(), 3);

        let guard = writer.inner.lock();
        let buffer = guard.sink.downcast_ref::<Vec<u8>>().unwrap();
        assert_eq!(buffer.as_slice(), b"new");
    }

    #[test]
    fn test_close_sets_flag_even_when_sink_close_fails() {
        struct Unclosable;

        impl io::Write for Unclosable {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        impl Sink for Unclosable {
            fn close(&mut self) -> io::Result<()> {
                Err(io::Error::other("stuck"))
            }
        }

        let writer = RotatingWriter::new(Unclosable, Fixed(false), Fresh);

        assert!(matches!(writer.close(), Err(Error::Close(_))));
        assert!(writer.is_closed());
        assert!(writer.close().unwrap_err().is_closed());
    }

    #[test]
    fn test_flush_after_close_fails() {
        let writer = RotatingWriter::new(Vec::<u8>::new(), Fixed(false), Fresh);
        writer.close().unwrap();

        assert!(writer.flush().unwrap_err().is_closed());
    }
}
