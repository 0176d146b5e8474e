//! nornet-api: Shared data types
//!
//! Contains the asset-record schema consumed from the asset database, the
//! per-operation result envelope, and job-log entries shared by the
//! inventory builder, the dispatcher, and the CLI.

pub mod events;
pub mod records;
pub mod results;

pub use events::{DEFAULT_GROUPING, JobLogEntry, Severity};
pub use records::{DeviceRecord, DeviceTypeRecord, PlatformRecord, SlugRef};
pub use results::TaskResult;
