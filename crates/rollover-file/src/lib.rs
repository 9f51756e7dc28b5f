//! File rotation for `proven-rollover`.
//!
//! This crate provides everything needed to rotate a regular file behind a
//! [`RotatingWriter`](proven_rollover::RotatingWriter):
//! - [`FileSink`], the file the writer owns
//! - Size and cron based triggers
//! - Rotation pipelines that rename and compress released files
//! - Timestamp naming policies for rotated files
//! - A serde [`RotationConfig`] that assembles all of the above
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

mod adapter;
mod clock;
mod config;
mod error;
mod fs;
mod namer;
mod rotator;
mod sink;
mod transformer;
mod trigger;

pub use adapter::{RotatorAdapter, TriggerAdapter};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{FileRotatingWriter, Naming, RotationConfig, TransformConfig, TriggerConfig};
pub use error::{Error, Result};
pub use namer::{DEFAULT_TIMESTAMP_FORMAT, Namer, TimestampCollisionNamer, TimestampSequenceNamer};
pub use rotator::{FileRotator, IdentityRotator, TransformRotator};
pub use sink::{Access, FileSink, OpenFlags};
pub use transformer::{DEFAULT_GZIP_LEVEL, GzipTransformer, RenameTransformer, Transformer};
pub use trigger::{FileTrigger, ScheduleTrigger, SizeTrigger};
