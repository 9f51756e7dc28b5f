use std::fs;
use std::path::PathBuf;

use proven_rollover::RotatingWriter;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapter::{RotatorAdapter, TriggerAdapter};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::namer::{DEFAULT_TIMESTAMP_FORMAT, TimestampCollisionNamer, TimestampSequenceNamer};
use crate::rotator::TransformRotator;
use crate::sink::{FileSink, OpenFlags};
use crate::transformer::{DEFAULT_GZIP_LEVEL, GzipTransformer, RenameTransformer, Transformer};
use crate::trigger::{FileTrigger, ScheduleTrigger, SizeTrigger, parse_cron};

/// A rotating writer over a file, as built by [`RotationConfig::build`].
pub type FileRotatingWriter =
    RotatingWriter<TriggerAdapter<Box<dyn FileTrigger>>, RotatorAdapter<TransformRotator>>;

/// Declarative description of one rotating file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RotationConfig {
    /// Path of the live file.
    pub path: PathBuf,

    /// How the live file is opened, initially and after every rotation.
    #[serde(default)]
    pub open: OpenFlags,

    /// When to rotate.
    pub trigger: TriggerConfig,

    /// What to do with a released file, in order.
    #[serde(default)]
    pub transforms: Vec<TransformConfig>,
}

/// When to rotate.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum TriggerConfig {
    /// Rotate before the file would reach `max_bytes`.
    Size {
        /// Maximum file size in bytes.
        max_bytes: u64,
    },

    /// Rotate whenever a cron boundary has passed.
    Schedule {
        /// Five-field cron expression.
        cron: String,
    },
}

/// One step applied to a released file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum TransformConfig {
    /// Move the file to a timestamped name.
    Rename {
        /// chrono `strftime` format for the modification time.
        #[serde(default = "default_timestamp_format")]
        timestamp_format: String,

        /// How the first file of a timestamp is named.
        #[serde(default)]
        naming: Naming,

        /// Always copy then remove instead of renaming the inode.
        #[serde(default)]
        force_move: bool,
    },

    /// Compress the file to `<path>.gz`.
    Gzip {
        /// Compression level, 0 to 9.
        #[serde(default = "default_gzip_level")]
        level: u32,
    },
}

/// Naming policy of a rename step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Naming {
    /// [`TimestampSequenceNamer`].
    #[default]
    Sequence,

    /// [`TimestampCollisionNamer`].
    Collision,
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

const fn default_gzip_level() -> u32 {
    DEFAULT_GZIP_LEVEL
}

impl RotationConfig {
    /// Describes a file at `path` rotated by `trigger`, reopened in the
    /// same place with no transforms.
    pub fn new(path: impl Into<PathBuf>, trigger: TriggerConfig) -> Self {
        Self {
            path: path.into(),
            open: OpenFlags::default(),
            trigger,
            transforms: Vec::new(),
        }
    }

    /// Sets how the file is opened.
    #[must_use]
    pub const fn with_open_flags(mut self, open: OpenFlags) -> Self {
        self.open = open;
        self
    }

    /// Appends a transform step.
    #[must_use]
    pub fn with_transform(mut self, transform: TransformConfig) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Builds the writer using the system clock.
    ///
    /// # Errors
    ///
    /// See [`build_with_clock`](Self::build_with_clock).
    pub fn build(&self) -> Result<FileRotatingWriter> {
        self.build_with_clock(SystemClock)
    }

    /// Builds the writer, reading time for schedule triggers from `clock`.
    ///
    /// The parent directory is created if needed and the live file is
    /// opened (or created) right away.
    ///
    /// # Errors
    ///
    /// Returns an error if the cron expression or a timestamp format is
    /// invalid, or if the directory or file cannot be created.
    pub fn build_with_clock(&self, clock: impl Clock + 'static) -> Result<FileRotatingWriter> {
        let trigger = self.trigger.build(clock)?;
        let transformers = self
            .transforms
            .iter()
            .map(TransformConfig::build)
            .collect::<Result<Vec<_>>>()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let sink = FileSink::open(&self.path, self.open)?;

        info!(
            path = %self.path.display(),
            transforms = transformers.len(),
            "opened rotating file"
        );
        Ok(RotatingWriter::new(
            sink,
            TriggerAdapter::new(trigger),
            RotatorAdapter::new(TransformRotator::new(transformers), self.open),
        ))
    }
}

impl TriggerConfig {
    /// Size trigger for files of at most `max_bytes`.
    #[must_use]
    pub const fn size(max_bytes: u64) -> Self {
        Self::Size { max_bytes }
    }

    /// Schedule trigger for a cron expression.
    pub fn schedule(cron: impl Into<String>) -> Self {
        Self::Schedule { cron: cron.into() }
    }

    fn build(&self, clock: impl Clock + 'static) -> Result<Box<dyn FileTrigger>> {
        let trigger: Box<dyn FileTrigger> = match self {
            Self::Size { max_bytes } => Box::new(SizeTrigger::new(*max_bytes)),
            Self::Schedule { cron } => {
                parse_cron(cron)?;
                Box::new(ScheduleTrigger::with_clock(cron.clone(), clock))
            }
        };
        Ok(trigger)
    }
}

impl TransformConfig {
    /// Rename step with the default timestamp format and sequence naming.
    #[must_use]
    pub fn rename() -> Self {
        Self::Rename {
            timestamp_format: default_timestamp_format(),
            naming: Naming::default(),
            force_move: false,
        }
    }

    /// Gzip step at the default level.
    #[must_use]
    pub const fn gzip() -> Self {
        Self::Gzip {
            level: DEFAULT_GZIP_LEVEL,
        }
    }

    fn build(&self) -> Result<Box<dyn Transformer>> {
        let transformer: Box<dyn Transformer> = match self {
            Self::Rename {
                timestamp_format,
                naming: Naming::Sequence,
                force_move,
            } => Box::new(
                RenameTransformer::new(TimestampSequenceNamer::with_format(
                    timestamp_format.as_str(),
                )?)
                .force_move(*force_move),
            ),
            Self::Rename {
                timestamp_format,
                naming: Naming::Collision,
                force_move,
            } => Box::new(
                RenameTransformer::new(TimestampCollisionNamer::with_format(
                    timestamp_format.as_str(),
                )?)
                .force_move(*force_move),
            ),
            Self::Gzip { level } => Box::new(GzipTransformer::new(*level)),
        };
        Ok(transformer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn test_build_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("logs").join("app.log");

        let writer = RotationConfig::new(&path, TriggerConfig::size(1024))
            .build()
            .unwrap();
        writer.write(b"hello\n").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"hello\n");
    }

    #[test]
    fn test_build_rejects_invalid_cron() {
        let dir = tempdir().unwrap();
        let config = RotationConfig::new(
            dir.path().join("app.log"),
            TriggerConfig::schedule("every tuesday"),
        );

        assert_matches!(config.build(), Err(Error::Schedule { .. }));
        assert!(!dir.path().join("app.log").exists());
    }

    #[test]
    fn test_build_rejects_invalid_timestamp_format() {
        let dir = tempdir().unwrap();
        let config = RotationConfig::new(dir.path().join("app.log"), TriggerConfig::size(10))
            .with_transform(TransformConfig::Rename {
                timestamp_format: "%Q".to_string(),
                naming: Naming::Sequence,
                force_move: false,
            });

        assert_matches!(config.build(), Err(Error::TimestampFormat(_)));
    }

    #[test]
    fn test_build_reports_uncreatable_directory() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let config = RotationConfig::new(blocker.join("app.log"), TriggerConfig::size(10));

        assert_matches!(
            config.build(),
            Err(Error::CreateDirectory { path, .. }) if path == blocker
        );
    }
}
