use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::debug;

use crate::error::Result;
use crate::fs::{move_file, rewrite};
use crate::namer::{Namer, TimestampSequenceNamer};

/// Default gzip compression level.
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// One step of a rotation pipeline: turns the file at `path` into another
/// file and returns where it now lives.
pub trait Transformer: Send {
    /// Transforms the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file could not be transformed. The file at
    /// `path` must then still be intact.
    fn transform(&self, path: &Path) -> Result<PathBuf>;
}

impl<T: Transformer + ?Sized> Transformer for Box<T> {
    fn transform(&self, path: &Path) -> Result<PathBuf> {
        (**self).transform(path)
    }
}

/// Moves the file to the path chosen by a [`Namer`].
#[derive(Clone, Debug, Default)]
pub struct RenameTransformer<N = TimestampSequenceNamer> {
    namer: N,
    force_move: bool,
}

impl<N: Namer> RenameTransformer<N> {
    /// Creates a transformer renaming files with `namer`.
    pub const fn new(namer: N) -> Self {
        Self {
            namer,
            force_move: false,
        }
    }

    /// Always copy then remove instead of trying an inode rename first.
    #[must_use]
    pub const fn force_move(mut self, force: bool) -> Self {
        self.force_move = force;
        self
    }
}

impl<N: Namer> Transformer for RenameTransformer<N> {
    fn transform(&self, path: &Path) -> Result<PathBuf> {
        let target = self.namer.name(path)?;
        move_file(path, &target, self.force_move)?;

        debug!(from = %path.display(), to = %target.display(), "renamed rotated file");
        Ok(target)
    }
}

/// Compresses the file to `<path>.gz` and removes the original.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GzipTransformer {
    level: u32,
}

impl Default for GzipTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_GZIP_LEVEL)
    }
}

impl GzipTransformer {
    /// Creates a transformer compressing at `level`, clamped to 0..=9.
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }

    /// The compression level in use.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }
}

impl Transformer for GzipTransformer {
    fn transform(&self, path: &Path) -> Result<PathBuf> {
        let mut target = path.as_os_str().to_owned();
        target.push(".gz");
        let target = PathBuf::from(target);

        let level = Compression::new(self.level);
        rewrite(path, &target, |reader, writer| {
            let mut encoder = GzEncoder::new(writer, level);
            io::copy(reader, &mut encoder)?;
            encoder.finish()
        })?;

        debug!(from = %path.display(), to = %target.display(), "compressed rotated file");
        Ok(target)
    }
}
