//! Runs one operation across an inventory with bounded concurrency

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use nornet_api::TaskResult;
use nornet_exec::{DeviceConnection, TransportError};
use nornet_inventory::{Host, Inventory};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

use crate::config::DEFAULT_NUM_WORKERS;
use crate::dispatcher::Dispatcher;
use crate::error::CoreError;
use crate::logger::RunLogger;

/// Opens device connections for workers
///
/// Each worker owns the connection it gets for the duration of its host's
/// operation.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Open a connection to a host
    async fn connect(&self, host: &Host) -> Result<Box<dyn DeviceConnection>, TransportError>;
}

/// Per-host outcome of a run, in inventory order
#[derive(Debug, Default)]
pub struct RunSummary {
    results: IndexMap<String, Result<TaskResult, CoreError>>,
}

impl RunSummary {
    /// All outcomes in inventory order
    #[must_use]
    pub fn results(&self) -> &IndexMap<String, Result<TaskResult, CoreError>> {
        &self.results
    }

    /// Outcome for one host
    #[must_use]
    pub fn get(&self, host: &str) -> Option<&Result<TaskResult, CoreError>> {
        self.results.get(host)
    }

    /// Successful results
    pub fn succeeded(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.values().filter_map(|r| r.as_ref().ok())
    }

    /// Failed hosts with their errors
    pub fn failed(&self) -> impl Iterator<Item = (&str, &CoreError)> {
        self.results
            .iter()
            .filter_map(|(host, r)| r.as_ref().err().map(|e| (host.as_str(), e)))
    }

    /// Number of hosts that failed
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// Whether every host succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// Number of hosts processed
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no host was processed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Worker pool running dispatches
#[derive(Debug, Clone)]
pub struct Runner {
    dispatcher: Arc<Dispatcher>,
    num_workers: usize,
}

impl Runner {
    /// Create a runner with the default worker count
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            num_workers: DEFAULT_NUM_WORKERS,
        }
    }

    /// Set the number of hosts processed at once
    #[must_use]
    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }

    /// Worker count
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Run an operation against every host
    ///
    /// A failing host never stops the others; its error is recorded in the
    /// summary.
    #[instrument(skip_all, fields(operation = %operation, hosts = inventory.len()))]
    pub async fn run(
        &self,
        inventory: &Inventory,
        operation: &str,
        factory: Arc<dyn ConnectionFactory>,
        logger: &RunLogger,
    ) -> RunSummary {
        info!(workers = self.num_workers, "starting run");

        let semaphore = Arc::new(Semaphore::new(self.num_workers));
        let mut tasks = JoinSet::new();

        for (index, host) in inventory.hosts().values().enumerate() {
            let host = Arc::clone(host);
            let dispatcher = Arc::clone(&self.dispatcher);
            let factory = Arc::clone(&factory);
            let semaphore = Arc::clone(&semaphore);
            let logger = logger.clone();
            let operation = operation.to_string();

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        run_host(&dispatcher, &host, factory.as_ref(), &operation, &logger).await
                    }
                    Err(e) => Err(CoreError::Worker(e.to_string())),
                };
                (index, result)
            });
        }

        // Hosts whose worker panicked keep this placeholder
        let mut outcomes: Vec<Result<TaskResult, CoreError>> = (0..inventory.len())
            .map(|_| Err(CoreError::Worker("worker ended without a result".to_string())))
            .collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => outcomes[index] = result,
                Err(e) => error!(error = %e, "worker failed"),
            }
        }

        let results: IndexMap<_, _> = inventory.hosts().keys().cloned().zip(outcomes).collect();

        let summary = RunSummary { results };
        info!(
            succeeded = summary.len() - summary.failure_count(),
            failed = summary.failure_count(),
            "run finished"
        );
        summary
    }
}

async fn run_host(
    dispatcher: &Dispatcher,
    host: &Host,
    factory: &dyn ConnectionFactory,
    operation: &str,
    logger: &RunLogger,
) -> Result<TaskResult, CoreError> {
    let subject = host.data().record.as_ref();

    let connection = match factory.connect(host).await {
        Ok(connection) => connection,
        Err(e) => {
            logger.failure(
                subject,
                &format!("Failed to connect: `{e}`"),
                Some(host.name()),
            );
            return Err(CoreError::Transport(e));
        }
    };

    let result = dispatcher
        .dispatch(host, connection.as_ref(), operation, logger, subject)
        .await;

    if result.is_ok() {
        logger.success(subject, &format!("{operation} completed"), Some(host.name()));
    }
    result
}
