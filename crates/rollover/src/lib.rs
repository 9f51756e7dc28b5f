//! A writer decorator that rotates its underlying sink.
//!
//! [`RotatingWriter`] owns a [`Sink`] and, before every write, asks a
//! [`Trigger`] whether the sink should be rotated. When it should, a
//! [`Rotator`] produces the replacement and the bytes land in the new sink.
//! Concrete file-based triggers and rotators live in `proven-rollover-file`.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod rotator;
mod sink;
mod trigger;
mod writer;

pub use error::{BoxError, Error, Result, is_closed};
pub use rotator::{Rotation, Rotator};
pub use sink::{AsAny, Sink};
pub use trigger::Trigger;
pub use writer::RotatingWriter;
