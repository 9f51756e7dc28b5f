//! Bridges between the sink-level contracts of `proven-rollover` and the
//! path-level contracts of this crate.

use std::path;

use proven_rollover::{BoxError, Rotation, Rotator, Sink, Trigger};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::rotator::FileRotator;
use crate::sink::{FileSink, OpenFlags};
use crate::trigger::FileTrigger;

/// Runs a [`FileTrigger`] against the path of the writer's [`FileSink`].
#[derive(Debug)]
pub struct TriggerAdapter<T> {
    trigger: T,
}

impl<T: FileTrigger> TriggerAdapter<T> {
    /// Wraps `trigger`.
    pub const fn new(trigger: T) -> Self {
        Self { trigger }
    }
}

impl<T: FileTrigger> Trigger for TriggerAdapter<T> {
    fn trigger(&mut self, sink: &dyn Sink, buf: &[u8]) -> std::result::Result<bool, BoxError> {
        let file = sink.downcast_ref::<FileSink>().ok_or(Error::NotAFile)?;
        Ok(self.trigger.trigger(file.path(), buf)?)
    }
}

/// Releases the writer's [`FileSink`], runs a [`FileRotator`] on its path
/// and opens the path it returns.
///
/// The steps run strictly in order: the current file is stat'ed for its
/// permissions, synced, closed, and only then handed to the rotator. The
/// new file is opened with `flags` (plus create) and the old permissions.
///
/// Once the current file is closed there is no way back. If the rotator or
/// the reopen fails, the writer keeps a closed [`FileSink`] and every later
/// write fails with [`Error::SinkClosed`] until the writer is rebuilt.
#[derive(Debug)]
pub struct RotatorAdapter<R> {
    rotator: R,
    flags: OpenFlags,
}

impl<R: FileRotator> RotatorAdapter<R> {
    /// Wraps `rotator`, reopening files with `flags`.
    pub const fn new(rotator: R, flags: OpenFlags) -> Self {
        Self { rotator, flags }
    }

    fn rotate_file(&mut self, sink: &mut FileSink) -> Result<FileSink> {
        let handle = sink
            .file()
            .ok_or_else(|| Error::SinkClosed(sink.path().to_path_buf()))?;
        let permissions = handle
            .metadata()
            .map_err(|e| Error::Io("error reading current file metadata", e))?
            .permissions();
        handle
            .sync_all()
            .map_err(|e| Error::Io("error syncing current file", e))?;
        Sink::close(sink).map_err(|e| Error::Io("error closing current file", e))?;
        debug!(path = %sink.path().display(), "closed current file");

        let current = path::absolute(sink.path())
            .map_err(|e| Error::Io("error resolving current path", e))?;
        let next = self.rotator.rotate(&current)?;
        let next = path::absolute(&next).map_err(|e| Error::Io("error resolving next path", e))?;

        let opened = FileSink::open_with_permissions(next, self.flags, &permissions)?;
        info!(
            from = %current.display(),
            to = %opened.path().display(),
            "rotated file"
        );
        Ok(opened)
    }
}

impl<R: FileRotator> Rotator for RotatorAdapter<R> {
    fn rotate(&mut self, sink: &mut dyn Sink) -> std::result::Result<Rotation, BoxError> {
        let file = sink.downcast_mut::<FileSink>().ok_or(Error::NotAFile)?;
        let next = self.rotate_file(file)?;
        Ok(Rotation::Replaced(Box::new(next)))
    }
}
