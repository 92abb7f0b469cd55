//! tidelog rotation - file-backed log streams with rotation, retention, and read-back
//!
//! A stream lives in one directory as `{base}.log` plus rotated siblings
//! `{base}.{YYYYmmdd-HHMMSS}.{NNN}.log[.gz]`. [`LogRotator`] owns the files,
//! [`LogManager`] adds a recent-entry cache and filtered queries on top, and
//! [`LogTail`] follows the current file from outside.

mod clock;
mod codec;
mod manager;
mod naming;
mod policy;
mod reader;
mod retention;
mod rotator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{CompressionCodec, GzipCodec};
pub use manager::LogManager;
pub use naming::{RotatedFile, RotatedFileNamer, STAMP_FORMAT};
pub use policy::{next_rotation_after, RotationPolicy};
pub use reader::LogTail;
pub use retention::{RetentionEnforcer, RetentionReport};
pub use rotator::{LogRotator, ReadOptions, RotatedFileInfo, RotatorBuilder, RotatorStatus};
