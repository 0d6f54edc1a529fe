//! svcwatchd: the svcwatch daemon.
//!
//! Loads `svcwatch.toml`, registers every service with the health monitor,
//! and keeps checking until interrupted:
//! - Health monitor (one schedule per service)
//! - Notification sinks (one per service kind)
//! - REST API + Prometheus metrics (optional)
//!
//! # Usage
//!
//! ```text
//! svcwatchd run --config /etc/svcwatch/svcwatch.toml --listen 127.0.0.1:9494
//! svcwatchd check --config svcwatch.toml --format json
//! ```

mod notify;
mod report;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use svcwatch_core::SvcwatchConfig;
use svcwatch_health::{
    BroadcastChannel, HealthMonitor, HttpTransport, ServiceConfig, ServiceKind, ServiceStatus,
};

use crate::report::OutputFormat;

#[derive(Parser)]
#[command(name = "svcwatchd", about = "svcwatch daemon: multi-service health monitor", version)]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor every configured service until interrupted.
    Run {
        /// Path to svcwatch.toml.
        #[arg(short, long, default_value = "svcwatch.toml")]
        config: PathBuf,

        /// Serve the status API on this address (overrides [api].listen).
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Check every configured service once and print the results.
    Check {
        /// Path to svcwatch.toml.
        #[arg(short, long, default_value = "svcwatch.toml")]
        config: PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run { config, listen } => run(&config, listen).await,
        Command::Check { config, format } => check(&config, format).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,svcwatchd=debug,svcwatch_health=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: &Path) -> anyhow::Result<SvcwatchConfig> {
    SvcwatchConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn register_services(monitor: &HealthMonitor, config: &SvcwatchConfig) -> anyhow::Result<()> {
    for spec in &config.services {
        let service = ServiceConfig::try_from(spec)?;
        monitor
            .add_service(service)
            .with_context(|| format!("registering service {}", spec.name))?;
    }
    Ok(())
}

async fn run(config_path: &Path, listen: Option<SocketAddr>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    info!(
        path = %config_path.display(),
        services = config.services.len(),
        "svcwatch daemon starting"
    );

    // ── Notification channels ──────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let generic = BroadcastChannel::default();
    let auth_tolerant = BroadcastChannel::default();
    let sinks = [
        notify::spawn_notifier("generic", generic.subscribe(), shutdown_rx.clone()),
        notify::spawn_notifier("auth-tolerant", auth_tolerant.subscribe(), shutdown_rx),
    ];

    // ── Health monitor ─────────────────────────────────────────

    let transport = HttpTransport::with_options(config.probe.accept_invalid_certs)?;
    let monitor = Arc::new(
        HealthMonitor::builder()
            .transport(Arc::new(transport))
            .probe_timeout(config.probe.timeout()?)
            .channel(ServiceKind::Generic, Arc::new(generic))
            .channel(ServiceKind::AuthTolerant, Arc::new(auth_tolerant))
            .build()?,
    );
    register_services(&monitor, &config)?;
    monitor.start_all();
    info!("health monitor started");

    // ── API server ─────────────────────────────────────────────

    match listen.or(config.api.as_ref().map(|api| api.listen)) {
        Some(addr) => {
            let router = svcwatch_api::build_router(monitor.clone());
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            info!(%addr, "API server starting");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        None => shutdown_signal().await,
    }

    // ── Shutdown ───────────────────────────────────────────────

    monitor.dispose();
    let _ = shutdown_tx.send(true);
    for sink in sinks {
        let _ = sink.await;
    }

    info!("svcwatch daemon stopped");
    Ok(())
}

async fn check(config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let transport = HttpTransport::with_options(config.probe.accept_invalid_certs)?;
    let monitor = Arc::new(
        HealthMonitor::builder()
            .transport(Arc::new(transport))
            .probe_timeout(config.probe.timeout()?)
            .build()?,
    );
    register_services(&monitor, &config)?;

    let mut checks = JoinSet::new();
    for spec in &config.services {
        let monitor = monitor.clone();
        let name = spec.name.clone();
        checks.spawn(async move { monitor.check_service(&name).await });
    }

    let mut statuses: Vec<ServiceStatus> = Vec::with_capacity(config.services.len());
    while let Some(result) = checks.join_next().await {
        match result {
            Ok(Some(status)) => statuses.push(status),
            Ok(None) => {}
            Err(e) => error!(error = %e, "check task failed"),
        }
    }
    // Report in config order.
    statuses.sort_by_key(|s| {
        config
            .services
            .iter()
            .position(|spec| spec.name == s.service_name)
    });
    monitor.dispose();

    print!("{}", report::render(&statuses, format)?);

    let down = statuses.iter().filter(|s| !s.is_available).count();
    if down > 0 {
        anyhow::bail!("{down} of {} services unavailable", config.services.len());
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
