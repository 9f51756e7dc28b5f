use std::fs::{File, OpenOptions, Permissions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use proven_rollover::Sink;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Access mode for (re)opened files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    /// Open for writing only.
    #[default]
    WriteOnly,

    /// Open for reading and writing.
    ReadWrite,
}

/// How files are opened by a [`FileSink`] and after every rotation.
///
/// The create flag is always added. `append` and `truncate` are mutually
/// exclusive; opening with both fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenFlags {
    /// Access mode.
    pub access: Access,

    /// Append to existing content.
    pub append: bool,

    /// Truncate existing content.
    pub truncate: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::append()
    }
}

impl OpenFlags {
    /// Write-only, appending to existing content.
    #[must_use]
    pub const fn append() -> Self {
        Self {
            access: Access::WriteOnly,
            append: true,
            truncate: false,
        }
    }

    /// Write-only, discarding existing content.
    #[must_use]
    pub const fn truncate() -> Self {
        Self {
            access: Access::WriteOnly,
            append: false,
            truncate: true,
        }
    }

    /// Returns these flags with the given access mode.
    #[must_use]
    pub const fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Builds the [`OpenOptions`] for these flags, with `create` set.
    #[must_use]
    pub fn options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options
            .read(self.access == Access::ReadWrite)
            .write(true)
            .append(self.append)
            .truncate(self.truncate)
            .create(true);
        options
    }
}

/// A regular file used as the sink of a rotating writer.
///
/// Closing drops the handle but keeps the path, so rotation code can still
/// find the file. Writing to a closed sink fails with
/// [`Error::SinkClosed`].
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
}

impl FileSink {
    /// Opens (creating if needed) the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl Into<PathBuf>, flags: OpenFlags) -> Result<Self> {
        let path = path.into();
        let file = flags
            .options()
            .open(&path)
            .map_err(|e| Error::Io("error opening file", e))?;

        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Opens the file at `path`, creating it with `permissions` if it does
    /// not exist yet.
    pub(crate) fn open_with_permissions(
        path: PathBuf,
        flags: OpenFlags,
        permissions: &Permissions,
    ) -> Result<Self> {
        let mut options = flags.options();
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(permissions.mode());
        }
        #[cfg(not(unix))]
        let _ = permissions;

        let file = options
            .open(&path)
            .map_err(|e| Error::Io("error opening file", e))?;

        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Wraps an already open file.
    pub fn from_file(path: impl Into<PathBuf>, file: File) -> Self {
        Self {
            path: path.into(),
            file: Some(file),
        }
    }

    /// Path the sink was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The open handle, or `None` once closed.
    #[must_use]
    pub const fn file(&self) -> Option<&File> {
        self.file.as_ref()
    }

    /// Returns `true` once the handle has been released.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    fn closed_error(&self) -> io::Error {
        io::Error::other(Error::SinkClosed(self.path.clone()))
    }

    fn handle(&mut self) -> io::Result<&mut File> {
        match self.file {
            Some(ref mut file) => Ok(file),
            None => Err(self.closed_error()),
        }
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.handle()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.handle()?.flush()
    }
}

impl Sink for FileSink {
    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) => file.flush(),
            None => Err(self.closed_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::tempdir;

    #[test]
    fn test_open_appends_by_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, b"existing\n").unwrap();

        let mut sink = FileSink::open(&path, OpenFlags::default()).unwrap();
        sink.write_all(b"appended\n").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"existing\nappended\n");
    }

    #[test]
    fn test_open_truncate_discards_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, b"existing\n").unwrap();

        let mut sink = FileSink::open(&path, OpenFlags::truncate()).unwrap();
        sink.write_all(b"fresh\n").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"fresh\n");
    }

    #[test]
    fn test_open_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new.log");

        let sink = FileSink::open(&path, OpenFlags::append()).unwrap();

        assert!(path.exists());
        assert_eq!(sink.path(), path);
    }

    #[test]
    fn test_closed_sink_rejects_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = FileSink::open(&path, OpenFlags::default()).unwrap();

        Sink::close(&mut sink).unwrap();

        assert!(sink.is_closed());
        let err = sink.write(b"late").unwrap_err();
        let inner = err.get_ref().and_then(|e| e.downcast_ref::<Error>());
        assert!(matches!(inner, Some(Error::SinkClosed(p)) if *p == path));
        assert!(Sink::close(&mut sink).is_err());
    }

    #[test]
    fn test_from_file_wraps_open_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let file = OpenFlags::truncate().options().open(&path).unwrap();

        let mut sink = FileSink::from_file(&path, file);
        sink.write_all(b"wrapped").unwrap();

        assert!(sink.file().is_some());
        assert_eq!(fs::read(&path).unwrap(), b"wrapped");
    }

    #[test]
    fn test_flags_deserialize_with_defaults() {
        let flags: OpenFlags = toml::from_str(r#"access = "read-write""#).unwrap();

        assert_eq!(flags.access, Access::ReadWrite);
        assert!(flags.append);
        assert!(!flags.truncate);
    }
}
