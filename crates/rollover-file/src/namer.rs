//! Naming policies for rotated files.
//!
//! Both policies stamp the file with its modification time, formatted in
//! local time, and keep a dense zero-based index per stamp:
//! `application.log` becomes `application_2021-01-02.0.log`,
//! `application_2021-01-02.1.log`, and so on. They differ in how the first
//! file of a stamp is named. See [`TimestampSequenceNamer`] and
//! [`TimestampCollisionNamer`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::fs::{ensure_vacant, file_metadata};

/// Default timestamp format: the modification date.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d";

/// Computes the path a file is moved to when rotated.
pub trait Namer: Send {
    /// Returns the new path for the existing file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not an existing regular file or its
    /// directory cannot be listed.
    fn name(&self, path: &Path) -> Result<PathBuf>;
}

impl<N: Namer + ?Sized> Namer for Box<N> {
    fn name(&self, path: &Path) -> Result<PathBuf> {
        (**self).name(path)
    }
}

/// Names rotated files `<base>_<timestamp>.<index><ext>`, where `index` is
/// one past the highest index already present in the directory (0 when
/// there is none).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimestampSequenceNamer {
    format: String,
}

impl Default for TimestampSequenceNamer {
    fn default() -> Self {
        Self {
            format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl TimestampSequenceNamer {
    /// Creates a namer using [`DEFAULT_TIMESTAMP_FORMAT`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a namer with a chrono `strftime` timestamp format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimestampFormat`] if the format is invalid.
    pub fn with_format(format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        validate_format(&format)?;
        Ok(Self { format })
    }
}

impl Namer for TimestampSequenceNamer {
    fn name(&self, path: &Path) -> Result<PathBuf> {
        let stamped = Stamped::of(path, &self.format)?;
        let next = stamped.max_index()?.map_or(0, |max| max + 1);
        Ok(stamped.indexed(next))
    }
}

/// Names rotated files `<base>_<timestamp><ext>` while the stamp is free,
/// falling back to indices on collision.
///
/// - No file carries the stamp: `<base>_<timestamp><ext>`.
/// - Only indexed files carry it: `<base>_<timestamp>.<max+1><ext>`.
/// - An un-indexed file carries it: that file is first renamed to index
///   `max+1` (0 when there are no indices) and the new name gets the index
///   after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimestampCollisionNamer {
    format: String,
}

impl Default for TimestampCollisionNamer {
    fn default() -> Self {
        Self {
            format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl TimestampCollisionNamer {
    /// Creates a namer using [`DEFAULT_TIMESTAMP_FORMAT`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a namer with a chrono `strftime` timestamp format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimestampFormat`] if the format is invalid.
    pub fn with_format(format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        validate_format(&format)?;
        Ok(Self { format })
    }
}

impl Namer for TimestampCollisionNamer {
    fn name(&self, path: &Path) -> Result<PathBuf> {
        let stamped = Stamped::of(path, &self.format)?;
        let plain = stamped.plain();
        let max = stamped.max_index()?;

        let collides = plain
            .try_exists()
            .map_err(|e| Error::Io("error checking for existing file", e))?;
        if !collides {
            return Ok(max.map_or(plain, |max| stamped.indexed(max + 1)));
        }

        let demoted = stamped.indexed(max.map_or(0, |max| max + 1));
        debug!(from = %plain.display(), to = %demoted.display(), "demoting un-indexed file");
        ensure_vacant(&demoted)?;
        fs::rename(&plain, &demoted).map_err(|e| Error::Io("error demoting existing file", e))?;

        Ok(stamped.indexed(max.map_or(1, |max| max + 2)))
    }
}

fn validate_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::TimestampFormat(format.to_string()));
    }
    Ok(())
}

/// A file name split around its timestamp: `<dir>/<stem><ext>` where
/// `stem` is `<base>_<timestamp>`.
struct Stamped<'a> {
    dir: &'a Path,
    stem: String,
    ext: &'a str,
}

impl<'a> Stamped<'a> {
    fn of(path: &'a Path, format: &str) -> Result<Self> {
        let modified = file_metadata(path)?
            .modified()
            .map_err(|e| Error::Io("error reading modification time", e))?;

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidFileName(path.to_path_buf()))?;
        let (base, ext) = split_extension(name);
        let dir = path.parent().unwrap_or_else(|| Path::new(""));

        Ok(Self {
            dir,
            stem: format!("{base}_{}", format_timestamp(modified, format)),
            ext,
        })
    }

    fn plain(&self) -> PathBuf {
        self.dir.join(format!("{}{}", self.stem, self.ext))
    }

    fn indexed(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{}.{index}{}", self.stem, self.ext))
    }

    /// Highest index among `<stem>.<index><ext>` siblings.
    fn max_index(&self) -> Result<Option<u64>> {
        let pattern = Regex::new(&format!(
            r"^{}\.(\d+){}$",
            regex::escape(&self.stem),
            regex::escape(self.ext)
        ))?;

        let listing = if self.dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.dir
        };
        let entries =
            fs::read_dir(listing).map_err(|e| Error::Io("error listing directory", e))?;

        let mut max = None;
        for entry in entries {
            let entry = entry.map_err(|e| Error::Io("error listing directory", e))?;
            let file_name = entry.file_name();
            let Some(index) = file_name
                .to_str()
                .and_then(|name| pattern.captures(name))
                .and_then(|captures| captures.get(1))
                .and_then(|index| index.as_str().parse::<u64>().ok())
            else {
                continue;
            };
            max = max.max(Some(index));
        }

        Ok(max)
    }
}

/// Splits `name` at its first `.`, ignoring a leading one.
fn split_extension(name: &str) -> (&str, &str) {
    let skip = usize::from(name.starts_with('.'));
    match name[skip..].find('.') {
        Some(at) => name.split_at(skip + at),
        None => (name, ""),
    }
}

fn format_timestamp(modified: SystemTime, format: &str) -> String {
    DateTime::<Local>::from(modified).format(format).to_string()
}
