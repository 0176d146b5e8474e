//! nornet-core: Driver dispatch and run orchestration
//!
//! Maps device platforms to drivers, runs operations against hosts with a
//! uniform failure contract, and reports progress through the run logger.

pub mod config;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod logger;
pub mod registry;
pub mod runner;
pub mod state;

pub use config::{InventorySettings, RunnerOptions, RunnerSettings, Settings};
pub use dispatcher::Dispatcher;
pub use driver::{Driver, DriverError, Operation, TaskContext};
pub use error::{CoreError, ErrorKind};
pub use logger::{JobSink, JsonLinesSink, MemorySink, RunLogger};
pub use registry::{DriverMapping, DriverRegistry};
pub use runner::{ConnectionFactory, RunSummary, Runner};
pub use state::DispatchState;
