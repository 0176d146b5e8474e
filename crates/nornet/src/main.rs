//! nornet
//!
//! Builds a device inventory from asset records and runs one operation
//! across it with platform-specific drivers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use eyre::WrapErr;
use nornet_core::{
    Dispatcher, DriverRegistry, JsonLinesSink, Operation, RunLogger, RunSummary, Runner, Settings,
};
use nornet_credentials::ProviderRegistry;
use nornet_inventory::{Inventory, InventoryBuilder, JsonFileSource};
use serde_json::{Map, Value, json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod factory;

use factory::DefaultConnectionFactory;

/// Network automation runner
#[derive(Parser)]
#[command(name = "nornet")]
#[command(about = "Run operations against an inventory of network devices", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON export of device records (overrides the configured path)
    #[arg(short, long, global = true)]
    assets: Option<PathBuf>,

    /// Only include devices at these sites
    #[arg(long, global = true)]
    site: Vec<String>,

    /// Only include devices with these roles
    #[arg(long, global = true)]
    role: Vec<String>,

    /// Only include devices on these platforms
    #[arg(long, global = true)]
    platform: Vec<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the hosts and groups the inventory resolves to
    Inventory,
    /// Run an operation against every host
    ///
    /// The built-in SSH connection serves command and HTTP drivers only.
    /// Getter-based platforms (the generic driver) need a getter-capable
    /// connection and fail with "not supported" otherwise.
    Run {
        /// Operation to run (`get_config`, `get_facts`, ...)
        operation: String,

        /// Seconds allowed for SSH connect, login and each command
        #[arg(long)]
        timeout: Option<u64>,

        /// Hosts processed at once (overrides the configured value)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Forward debug messages to the job log
        #[arg(long)]
        debug: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let loaded = config::load_settings(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&loaded.settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &loaded.source {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => warn!("no configuration file found, using defaults"),
    }

    let mut settings = loaded.settings;
    apply_overrides(&mut settings, &cli);

    let inventory = load_inventory(&settings).await?;

    match cli.command {
        Commands::Inventory => {
            print_inventory(&inventory, cli.format)?;
            Ok(())
        }
        Commands::Run {
            operation,
            workers,
            timeout,
            debug,
        } => {
            if operation.parse::<Operation>().is_err() {
                warn!(%operation, "operation is not built in, drivers will reject it");
            }
            if let Some(workers) = workers {
                settings.runner.options.num_workers = workers;
            }
            settings.debug |= debug;

            let mut factory = DefaultConnectionFactory::new();
            if let Some(secs) = timeout {
                factory = factory.with_timeout(Duration::from_secs(secs));
            }

            let summary = run(&settings, &inventory, &operation, factory).await?;
            print_summary(&summary, cli.format)?;

            if summary.is_success() {
                Ok(())
            } else {
                eyre::bail!(
                    "{} of {} hosts failed",
                    summary.failure_count(),
                    summary.len()
                )
            }
        }
    }
}

/// Merge command-line selections into the loaded settings
fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(assets) = &cli.assets {
        settings.inventory.assets = Some(assets.clone());
    }
    let filter = &mut settings.inventory.filter;
    filter.site.extend(cli.site.iter().cloned());
    filter.role.extend(cli.role.iter().cloned());
    filter.platform.extend(cli.platform.iter().cloned());
}

async fn load_inventory(settings: &Settings) -> Result<Inventory> {
    let assets = settings
        .inventory
        .assets
        .clone()
        .ok_or_else(|| eyre::eyre!("no asset file configured, set inventory.assets or pass --assets"))?;

    let registry = ProviderRegistry::with_builtin();
    let mut builder = InventoryBuilder::from_registry(
        &registry,
        &settings.credentials,
        settings.credentials_params.as_ref(),
    )?
    .with_source(Arc::new(JsonFileSource::new(assets)))
    .with_filter(settings.inventory.filter.clone())
    .with_connection_options(settings.connection_options());

    if let Some(fqdn) = settings.fqdn_suffix()? {
        builder = builder.with_fqdn(fqdn);
    }

    let inventory = builder.load().await.wrap_err("failed to build inventory")?;
    Ok(inventory)
}

async fn run(
    settings: &Settings,
    inventory: &Inventory,
    operation: &str,
    factory: DefaultConnectionFactory,
) -> Result<RunSummary> {
    let mut logger = RunLogger::new(format!("nornet {operation}")).with_debug(settings.debug);
    if let Some(path) = &settings.job_log {
        let sink = JsonLinesSink::open(path)
            .wrap_err_with(|| format!("failed to open job log {}", path.display()))?;
        logger = logger.with_sink(Arc::new(sink));
    }

    let registry = Arc::new(DriverRegistry::builtin()?);
    let mapping = Arc::new(settings.driver_mapping());
    let dispatcher = Arc::new(Dispatcher::validated(registry, mapping)?);

    let runner = Runner::new(dispatcher).with_num_workers(settings.runner.options.num_workers);
    Ok(runner.run(inventory, operation, Arc::new(factory), &logger).await)
}

fn print_inventory(inventory: &Inventory, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let hosts: Map<String, Value> = inventory
                .hosts()
                .values()
                .map(|host| {
                    let entry = json!({
                        "hostname": host.hostname(),
                        "port": host.port(),
                        "platform": host.platform(),
                        "groups": host.group_names(),
                        "transports": host.connection_options().transports().collect::<Vec<_>>(),
                    });
                    (host.name().to_string(), entry)
                })
                .collect();
            let groups: Map<String, Value> = inventory
                .groups()
                .values()
                .map(|group| {
                    let parents: Vec<&str> = group.parents().iter().map(|p| p.name()).collect();
                    (group.name().to_string(), json!(parents))
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({"hosts": hosts, "groups": groups}))?
            );
        }
        OutputFormat::Table => {
            println!("{:<24} {:<32} {:<20} GROUPS", "NAME", "ADDRESS", "PLATFORM");
            for host in inventory.hosts().values() {
                println!(
                    "{:<24} {:<32} {:<20} {}",
                    host.name(),
                    format!("{}:{}", host.hostname(), host.port()),
                    host.platform(),
                    host.group_names().join(",")
                );
            }
            println!();
            println!("{} hosts, {} groups", inventory.len(), inventory.groups().len());
        }
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let results: Map<String, Value> = summary
                .results()
                .iter()
                .map(|(host, outcome)| {
                    let value = match outcome {
                        Ok(result) => serde_json::to_value(result)?,
                        Err(e) => json!({
                            "host": host,
                            "error": e.to_string(),
                            "kind": format!("{:?}", e.kind()),
                        }),
                    };
                    Ok((host.clone(), value))
                })
                .collect::<Result<_, serde_json::Error>>()?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Table => {
            for (host, outcome) in summary.results() {
                match outcome {
                    Ok(result) => {
                        let keys: Vec<&str> = result.result.keys().map(String::as_str).collect();
                        println!("✓ {host}: {}", keys.join(", "));
                    }
                    Err(e) => println!("✗ {host}: {e}"),
                }
            }
            println!();
            println!(
                "{} succeeded, {} failed",
                summary.len() - summary.failure_count(),
                summary.failure_count()
            );
        }
    }
    Ok(())
}
