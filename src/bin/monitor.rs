use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use network_logger::{
    HostId, HostRegistry,
    alerts::{self, Notifier, NullNotifier},
    config::{Config, RunConfig, RunFlags, load_config},
    logging,
    monitor::{Console, ResultRouter, SchedulerHandle, StdoutConsole},
    probe,
    storage::{self, MemoryRecorder, Recorder},
    util,
};
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Periodically ping hosts, log latencies and alert on outages")]
struct Args {
    /// Config file
    #[arg(short, long, env = util::CONFIG_PATH, default_value_os_t = util::get_default_config_path())]
    config: PathBuf,

    /// Run a single round of monitoring and exit
    #[arg(long)]
    once: bool,

    /// Only print results, no database writes and no alerts
    #[arg(long)]
    console: bool,

    /// Print every check and every failure
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Manage the monitored hosts
    #[command(subcommand)]
    Hosts(HostsCommand),
}

#[derive(Debug, Clone, Subcommand)]
enum HostsCommand {
    /// Show every host with its alert recipient
    List,

    /// Start monitoring a host
    Add {
        host: String,

        /// Alert recipient, defaults to `default_recipient` from the config
        #[arg(long)]
        recipient: Option<String>,
    },

    /// Stop monitoring a host
    Remove { host: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    let args = Args::parse();

    let loaded = load_config(&args.config)?;
    let missing_config = loaded.is_none();
    let mut config = loaded.unwrap_or_default();
    config.apply_env_overrides(util::get_env);

    logging::init(args.verbose, &config.error_log)?;
    trace!("started with args: {args:?}");
    if missing_config {
        warn!(
            "config file {} not found, using defaults",
            args.config.display()
        );
    }

    match &args.command {
        Some(Command::Hosts(command)) => run_hosts(&config, command),
        None => run_monitor(&config, &args).await,
    }
}

fn run_hosts(config: &Config, command: &HostsCommand) -> Result<()> {
    let mut registry = HostRegistry::open(&config.hosts_file, config.default_recipient.clone())?;

    match command {
        HostsCommand::List => {
            if registry.is_empty() {
                println!("No hosts configured.");
            }
            for host in registry.list() {
                println!("{} -> {}", host.id, host.destination);
            }
        }
        HostsCommand::Add { host, recipient } => {
            let id = HostId::parse(host.as_str())?;
            let host = registry.add(id, recipient.clone())?;
            println!("Added host {} (alerts to {}).", host.id, host.destination);
        }
        HostsCommand::Remove { host } => {
            let id = HostId::parse(host.as_str())?;
            let host = registry.remove(&id)?;
            println!("Removed host {}.", host.id);
        }
    }

    Ok(())
}

async fn run_monitor(config: &Config, args: &Args) -> Result<()> {
    let run_config = RunConfig::new(
        config,
        RunFlags {
            once: args.once,
            console: args.console,
            verbose: args.verbose,
        },
    );

    let registry = HostRegistry::open(&config.hosts_file, config.default_recipient.clone())
        .with_context(|| format!("could not load {}", config.hosts_file.display()))?;

    let prober = probe::from_config(&config.probe).context("invalid probe setup")?;

    let (recorder, notifier): (Arc<dyn Recorder>, Arc<dyn Notifier>) = if run_config.console_only
    {
        debug!("console only, skipping storage and alert setup");
        (Arc::new(MemoryRecorder::new()), Arc::new(NullNotifier))
    } else {
        let recorder = storage::from_config(&config.storage).context("invalid storage setup")?;
        let notifier = alerts::from_config(&config.alert).context("invalid alert setup")?;
        prepare_recorder(recorder.as_ref()).await;
        (recorder, notifier)
    };

    let console: Arc<dyn Console> = Arc::new(StdoutConsole);
    let router = ResultRouter::new(
        &run_config,
        Arc::clone(&recorder),
        notifier,
        Arc::clone(&console),
    );

    let handle = SchedulerHandle::spawn(run_config.clone(), registry, prober, router);

    tokio::select! {
        status = handle.stopped() => {
            debug!("scheduler finished after {} sweeps", status.sweeps_completed);
        }
        _ = shutdown_signal() => {
            if run_config.verbose {
                console.line("\nStopping...");
            }
            handle.shutdown().await;
            handle.stopped().await;
        }
    }

    if let Err(e) = recorder.close().await {
        warn!("failed to close storage: {e}");
    }

    Ok(())
}

/// Create the schema and check the backend once
///
/// Neither is fatal: the monitor keeps probing and every failed write is
/// reported on its own.
async fn prepare_recorder(recorder: &dyn Recorder) {
    if let Err(e) = recorder.prepare().await {
        error!("Database error: could not prepare storage: {e}");
        return;
    }

    match recorder.health_check().await {
        Ok(status) if status.healthy => info!("storage ready: {}", status.message),
        Ok(status) => warn!("storage unhealthy: {}", status.message),
        Err(e) => warn!("storage health check failed: {e}"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
