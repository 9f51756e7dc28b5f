use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::transformer::Transformer;

/// Decides where the writer continues after the file at `path` has been
/// released.
pub trait FileRotator: Send {
    /// Returns the path of the file to open next.
    ///
    /// # Errors
    ///
    /// Returns an error if the rotation could not be carried out.
    fn rotate(&mut self, path: &Path) -> Result<PathBuf>;
}

impl<R: FileRotator + ?Sized> FileRotator for Box<R> {
    fn rotate(&mut self, path: &Path) -> Result<PathBuf> {
        (**self).rotate(path)
    }
}

/// Continues writing at the same path.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityRotator;

impl FileRotator for IdentityRotator {
    fn rotate(&mut self, path: &Path) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }
}

/// Runs a chain of [`Transformer`]s over the released file, then asks an
/// inner rotator where to continue.
///
/// Each transformer receives the path the previous one returned. The inner
/// rotator receives the original path, since after the chain the original
/// path is free to be reopened. When a step fails, later steps and the inner
/// rotator are skipped and the error names the original path.
pub struct TransformRotator<R = IdentityRotator> {
    transformers: Vec<Box<dyn Transformer>>,
    rotator: R,
}

impl TransformRotator {
    /// Creates a rotator that reopens the original path after the chain.
    #[must_use]
    pub fn new(transformers: Vec<Box<dyn Transformer>>) -> Self {
        Self::with_rotator(transformers, IdentityRotator)
    }
}

impl<R: FileRotator> TransformRotator<R> {
    /// Creates a rotator that asks `rotator` for the path to reopen.
    #[must_use]
    pub fn with_rotator(transformers: Vec<Box<dyn Transformer>>, rotator: R) -> Self {
        Self {
            transformers,
            rotator,
        }
    }

    /// Appends a step to the chain.
    #[must_use]
    pub fn then(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformers.push(Box::new(transformer));
        self
    }

    /// Number of steps in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    /// Returns `true` if the chain has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl<R> fmt::Debug for TransformRotator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRotator")
            .field("transformers", &self.transformers.len())
            .finish_non_exhaustive()
    }
}

impl<R: FileRotator> FileRotator for TransformRotator<R> {
    fn rotate(&mut self, path: &Path) -> Result<PathBuf> {
        let mut current = path.to_path_buf();
        for (index, transformer) in self.transformers.iter().enumerate() {
            current = transformer
                .transform(&current)
                .map_err(|source| Error::Transform {
                    index,
                    path: path.to_path_buf(),
                    source: Box::new(source),
                })?;
            debug!(index, path = %current.display(), "applied transformer");
        }

        self.rotator.rotate(path)
    }
}
