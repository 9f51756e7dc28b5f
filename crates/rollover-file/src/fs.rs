//! Filesystem primitives shared by triggers, namers and transformers.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::Path;

use filetime::FileTime;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Stats `path`, requiring it to be an existing regular file.
pub(crate) fn file_metadata(path: &Path) -> Result<Metadata> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Err(Error::IsDirectory(path.to_path_buf())),
        Ok(metadata) => Ok(metadata),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NoSuchFile {
            path: path.to_path_buf(),
            source: e,
        }),
        Err(e) => Err(Error::Io("error reading file metadata", e)),
    }
}

/// Sets both access and modification time of `path` to the mtime in
/// `metadata`.
pub(crate) fn preserve_mtime(path: &Path, metadata: &Metadata) -> Result<()> {
    let mtime = FileTime::from_last_modification_time(metadata);
    filetime::set_file_times(path, mtime, mtime)
        .map_err(|e| Error::Io("error setting file times", e))
}

/// Removes a partially written file, logging instead of failing.
pub(crate) fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove partial file");
        }
    }
}

/// Fails with [`Error::DestinationExists`] if something is already at `dst`.
pub(crate) fn ensure_vacant(dst: &Path) -> Result<()> {
    match fs::symlink_metadata(dst) {
        Ok(_) => Err(Error::DestinationExists(dst.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io("error reading destination metadata", e)),
    }
}

/// Moves `src` to `dst`, which must not exist yet.
///
/// An inode rename is tried first unless `force` is set; if it fails (for
/// example across filesystems) the content is copied through [`rewrite`].
pub(crate) fn move_file(src: &Path, dst: &Path, force: bool) -> Result<()> {
    file_metadata(src)?;
    ensure_vacant(dst)?;

    if !force {
        match fs::rename(src, dst) {
            Ok(()) => return Ok(()),
            Err(e) => debug!(
                src = %src.display(),
                dst = %dst.display(),
                error = %e,
                "inode rename failed, copying instead"
            ),
        }
    }

    rewrite(src, dst, |reader, mut writer| {
        io::copy(reader, &mut writer)?;
        Ok(writer)
    })
}

/// Replaces `src` with a new file `dst`, whose content `fill` derives from
/// `src`.
///
/// `dst` is created exclusively: an existing file there is never
/// overwritten and the call fails with [`Error::DestinationExists`]. Once
/// filled, `dst` is synced and closed, and gets the permissions and
/// modification time of `src`, before `src` is removed. On any later
/// failure the new `dst` is discarded and `src` is left intact.
pub(crate) fn rewrite<F>(src: &Path, dst: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut File, File) -> io::Result<File>,
{
    let metadata = file_metadata(src)?;
    let mut reader = File::open(src).map_err(|e| Error::Io("error opening source file", e))?;
    let writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => Error::DestinationExists(dst.to_path_buf()),
            _ => Error::Io("error opening destination file", e),
        })?;

    if let Err(e) = write_durably(&mut reader, writer, dst, &metadata, fill) {
        discard(dst);
        return Err(e);
    }

    if let Err(e) = fs::remove_file(src) {
        discard(dst);
        return Err(Error::Io("error removing source file", e));
    }

    Ok(())
}

fn write_durably<F>(
    reader: &mut File,
    writer: File,
    dst: &Path,
    metadata: &Metadata,
    fill: F,
) -> Result<()>
where
    F: FnOnce(&mut File, File) -> io::Result<File>,
{
    let writer =
        fill(reader, writer).map_err(|e| Error::Io("error writing destination file", e))?;
    writer
        .sync_all()
        .map_err(|e| Error::Io("error syncing destination file", e))?;
    drop(writer);

    fs::set_permissions(dst, metadata.permissions())
        .map_err(|e| Error::Io("error setting file permissions", e))?;
    preserve_mtime(dst, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn test_file_metadata_rejects_directory() {
        let dir = tempdir().unwrap();
        assert_matches!(file_metadata(dir.path()), Err(Error::IsDirectory(_)));
    }

    #[test]
    fn test_file_metadata_missing_file() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.log");
        assert_matches!(file_metadata(&missing), Err(Error::NoSuchFile { .. }));
    }

    #[test]
    fn test_forced_move_copies_content_and_mtime() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("app.log");
        let dst = dir.path().join("app_moved.log");
        fs::write(&src, b"line one\nline two\n").unwrap();
        let mtime = FileTime::from_unix_time(1_609_459_200, 0);
        filetime::set_file_mtime(&src, mtime).unwrap();

        move_file(&src, &dst, true).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"line one\nline two\n");
        let moved = fs::metadata(&dst).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&moved), mtime);
    }

    #[test]
    fn test_failed_move_keeps_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("app.log");
        fs::write(&src, b"keep me").unwrap();
        let dst = dir.path().join("missing-dir").join("app.log");

        assert!(move_file(&src, &dst, false).is_err());

        assert_eq!(fs::read(&src).unwrap(), b"keep me");
        assert!(!dst.exists());
    }

    #[test]
    fn test_move_never_overwrites_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("app.log");
        let dst = dir.path().join("app.log.1");
        fs::write(&src, b"new segment").unwrap();
        fs::write(&dst, b"old segment").unwrap();

        for force in [false, true] {
            assert_matches!(
                move_file(&src, &dst, force),
                Err(Error::DestinationExists(path)) if path == dst
            );
            assert_eq!(fs::read(&src).unwrap(), b"new segment");
            assert_eq!(fs::read(&dst).unwrap(), b"old segment");
        }
    }

    #[test]
    fn test_rewrite_onto_existing_file_keeps_both() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("app.log");
        let dst = dir.path().join("app.log.gz");
        fs::write(&src, b"second").unwrap();
        fs::write(&dst, b"first").unwrap();

        let result = rewrite(&src, &dst, |reader, mut writer| {
            io::copy(reader, &mut writer)?;
            Ok(writer)
        });

        assert_matches!(result, Err(Error::DestinationExists(path)) if path == dst);
        assert_eq!(fs::read(&src).unwrap(), b"second");
        assert_eq!(fs::read(&dst).unwrap(), b"first");
    }

    #[test]
    fn test_rewrite_failing_mid_write_discards_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("app.log");
        let dst = dir.path().join("app.log.gz");
        fs::write(&src, b"precious").unwrap();

        let result = rewrite(&src, &dst, |_, mut writer| {
            writer.write_all(b"half")?;
            writer.flush()?;
            Err(io::Error::other("disk full"))
        });

        assert_matches!(result, Err(Error::Io("error writing destination file", _)));
        assert!(!dst.exists());
        assert_eq!(fs::read(&src).unwrap(), b"precious");
    }
}
