use crate::error::BoxError;
use crate::sink::Sink;

/// Decides, before every write, whether the sink should be rotated first.
///
/// Called once per write while the writer's rotation guard is held, so
/// implementations should be cheap.
pub trait Trigger: Send {
    /// Returns `true` if `sink` must be rotated before `buf` is written to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the decision cannot be made. The write is then
    /// aborted without touching any sink.
    fn trigger(&mut self, sink: &dyn Sink, buf: &[u8]) -> Result<bool, BoxError>;
}

impl<T: Trigger + ?Sized> Trigger for Box<T> {
    fn trigger(&mut self, sink: &dyn Sink, buf: &[u8]) -> Result<bool, BoxError> {
        (**self).trigger(sink, buf)
    }
}
