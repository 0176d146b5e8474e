//! Resolves a host's driver and runs one operation against it

use std::fmt;
use std::sync::Arc;

use nornet_api::TaskResult;
use nornet_exec::DeviceConnection;
use nornet_inventory::Host;
use tracing::{debug, instrument};

use crate::driver::{DriverError, Operation, TaskContext};
use crate::error::CoreError;
use crate::logger::RunLogger;
use crate::registry::{DriverMapping, DriverRegistry};
use crate::state::DispatchState;

/// Dispatcher shared by every worker of a run
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<DriverRegistry>,
    mapping: Arc<DriverMapping>,
}

impl Dispatcher {
    /// Create a dispatcher over a registry and mapping
    pub fn new(registry: Arc<DriverRegistry>, mapping: Arc<DriverMapping>) -> Self {
        Self { registry, mapping }
    }

    /// Create a dispatcher after checking the mapping against the registry
    ///
    /// # Errors
    /// Returns `CoreError::DriverUnresolvable` if the mapping names an
    /// unregistered driver
    pub fn validated(
        registry: Arc<DriverRegistry>,
        mapping: Arc<DriverMapping>,
    ) -> Result<Self, CoreError> {
        mapping.validate(&registry)?;
        Ok(Self::new(registry, mapping))
    }

    /// Driver registry
    #[must_use]
    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Platform mapping
    #[must_use]
    pub fn mapping(&self) -> &DriverMapping {
        &self.mapping
    }

    /// Run an operation against a host
    ///
    /// # Errors
    /// Returns a driver-resolution error when no driver or capability
    /// matches, and `CoreError::SubtaskFailed` when the operation fails on
    /// the device. Every failure is logged against `subject`.
    pub async fn dispatch(
        &self,
        host: &Host,
        connection: &dyn DeviceConnection,
        operation: &str,
        logger: &RunLogger,
        subject: &(dyn fmt::Display + Sync),
    ) -> Result<TaskResult, CoreError> {
        self.dispatch_with_mapping(host, connection, operation, logger, subject, &self.mapping)
            .await
    }

    /// Run an operation using a caller-supplied mapping
    ///
    /// # Errors
    /// Same as [`Dispatcher::dispatch`]
    #[instrument(
        skip_all,
        fields(host = %host.name(), platform = %host.platform(), operation = %operation)
    )]
    pub async fn dispatch_with_mapping(
        &self,
        host: &Host,
        connection: &dyn DeviceConnection,
        operation: &str,
        logger: &RunLogger,
        subject: &(dyn fmt::Display + Sync),
        mapping: &DriverMapping,
    ) -> Result<TaskResult, CoreError> {
        let grouping = Some(host.name());
        let mut state = Tracker::new(host.name());

        logger.debug(
            &format!(
                "Executing dispatcher for {} ({})",
                host.name(),
                host.platform()
            ),
            grouping,
        );

        let Some(driver_id) = mapping.resolve(host.platform()) else {
            let err = CoreError::DriverNotFound {
                operation: operation.to_string(),
                platform: host.platform().to_string(),
            };
            logger.failure(subject, &err.to_string(), grouping);
            state.advance(DispatchState::Failed)?;
            return Err(err);
        };
        logger.debug(&format!("Found driver {driver_id}"), grouping);

        let Some(driver) = self.registry.get(driver_id) else {
            let err = CoreError::DriverUnresolvable(driver_id.to_string());
            logger.failure(subject, &err.to_string(), grouping);
            state.advance(DispatchState::Failed)?;
            return Err(err);
        };
        state.advance(DispatchState::ResolvingMethod)?;

        let Ok(op) = operation.parse::<Operation>() else {
            let err = CoreError::MethodNotFound {
                method: operation.to_string(),
                driver: driver_id.to_string(),
            };
            logger.failure(subject, &err.to_string(), grouping);
            state.advance(DispatchState::Failed)?;
            return Err(err);
        };
        state.advance(DispatchState::Executing)?;

        let ctx = TaskContext {
            host,
            connection,
            logger,
            subject,
        };

        match driver.execute(op, &ctx).await {
            Ok(result) => {
                state.advance(DispatchState::Succeeded)?;
                Ok(result)
            }
            Err(DriverError::NotImplemented { method, driver }) => {
                let err = CoreError::NotImplemented {
                    method: method.to_string(),
                    driver: driver.to_string(),
                };
                logger.failure(subject, &err.to_string(), grouping);
                state.advance(DispatchState::Failed)?;
                Err(err)
            }
            Err(e) => {
                let summary = e.summary();
                logger.failure(subject, &format!("Subtask failed: {summary}"), grouping);
                for line in e.detail().lines() {
                    logger.debug(line, grouping);
                }
                state.advance(DispatchState::Failed)?;
                Err(CoreError::SubtaskFailed(summary))
            }
        }
    }
}

/// Validated state progression of one dispatch call
struct Tracker<'a> {
    host: &'a str,
    state: DispatchState,
}

impl<'a> Tracker<'a> {
    fn new(host: &'a str) -> Self {
        Self {
            host,
            state: DispatchState::ResolvingDriver,
        }
    }

    fn advance(&mut self, next: DispatchState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(host = %self.host, from = %self.state, to = %next, "dispatch state transition");
        self.state = next;
        Ok(())
    }
}
