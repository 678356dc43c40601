//! simpleperf CLI
//!
//! Measures TCP throughput between a server that receives and one or more
//! clients that send.

mod config;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use simpleperf_core::{
    ConfigError, ConnectionOrchestrator, ConsoleSink, ReportFormat, ServerListener,
    SessionConfig, parse_data_size, parse_positive, parse_seconds,
};
use simpleperf_transport::TransportConfig;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use config::Config;

/// simpleperf - simple network throughput measurement
#[derive(Parser, Debug)]
#[command(name = "simpleperf")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["server", "client"])))]
struct Cli {
    /// Run in server mode
    #[arg(short, long)]
    server: bool,

    /// Run in client mode
    #[arg(short, long)]
    client: bool,

    /// Server bind address
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// Server port
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Summary format: B, KB or MB
    #[arg(short, long)]
    format: Option<ReportFormat>,

    /// Server address to connect to
    #[arg(short = 'I', long = "serverip")]
    server_ip: Option<String>,

    /// Sending duration in seconds
    #[arg(short, long, value_parser = parse_seconds)]
    time: Option<Duration>,

    /// Amount of data to send, e.g. 10MB
    #[arg(short, long, value_parser = parse_data_size)]
    num: Option<u64>,

    /// Print statistics every N seconds
    #[arg(short, long, value_parser = parse_seconds)]
    interval: Option<Duration>,

    /// Number of parallel connections
    #[arg(short = 'P', long, visible_alias = "connections", value_parser = parse_connections)]
    parallel: Option<u32>,

    /// Seconds to wait for the server's acknowledgement
    #[arg(long, value_parser = parse_seconds)]
    handshake_timeout: Option<Duration>,

    /// Seconds to wait for each connection to be established
    #[arg(long, value_parser = parse_seconds)]
    connect_timeout: Option<Duration>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_connections(value: &str) -> Result<u32, ConfigError> {
    let n = parse_positive(value)?;
    u32::try_from(n).map_err(|_| ConfigError::NotPositive(value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::resolve(cli.config.as_deref())?;
    config.validate()?;

    // Initialize logging
    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if cli.server {
        run_server(&cli, &config).await
    } else {
        run_client(&cli, &config).await
    }
}

/// Accept clients until Ctrl+C
async fn run_server(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let addr = server_addr(cli, config)?;
    let format = cli.format.unwrap_or(config.report.format);

    let server = ServerListener::bind(addr, format, Arc::new(ConsoleSink))
        .await
        .with_context(|| format!("Unable to start server on {addr}"))?;

    server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Unable to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}

/// Run all client sessions and wait for them to finish
async fn run_client(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let template = client_template(cli, config);
    let connections = cli.parallel.unwrap_or(config.client.connections);

    let orchestrator = ConnectionOrchestrator::new(Arc::new(ConsoleSink))
        .with_transport_config(transport_config(cli, config));
    let reports = orchestrator.run(&template, connections).await?;

    let completed = reports.iter().filter(|r| r.is_completed()).count();
    tracing::info!("{}/{} sessions completed", completed, reports.len());
    if completed == 0 {
        anyhow::bail!("No session completed");
    }

    Ok(())
}

fn server_addr(cli: &Cli, config: &Config) -> anyhow::Result<SocketAddr> {
    let ip = match cli.bind {
        Some(ip) => ip,
        None => config
            .server
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", config.server.bind))?,
    };
    Ok(SocketAddr::new(ip, cli.port.unwrap_or(config.server.port)))
}

/// Build the per-connection template; flags win over the config file
fn client_template(cli: &Cli, config: &Config) -> SessionConfig {
    let server_ip = cli
        .server_ip
        .clone()
        .unwrap_or_else(|| config.client.server_ip.clone());
    let port = cli.port.unwrap_or(config.server.port);

    let mut template = SessionConfig::sender(server_ip, port)
        .with_format(cli.format.unwrap_or(config.report.format));

    if let Some(bytes) = cli.num {
        template = template.with_byte_limit(bytes);
    }
    if let Some(limit) = cli.time {
        template = template.with_time_limit(limit);
    }

    let interval = cli
        .interval
        .or_else(|| config.report.interval_secs.map(Duration::from_secs));
    if let Some(interval) = interval {
        template = template.with_report_interval(interval);
    }

    let handshake_timeout = cli
        .handshake_timeout
        .or_else(|| config.client.handshake_timeout_secs.map(Duration::from_secs));
    if let Some(timeout) = handshake_timeout {
        template = template.with_handshake_timeout(timeout);
    }

    template
}

fn transport_config(cli: &Cli, config: &Config) -> TransportConfig {
    let connect_timeout = cli
        .connect_timeout
        .or_else(|| config.client.connect_timeout_secs.map(Duration::from_secs));
    match connect_timeout {
        Some(timeout) => TransportConfig::default().with_connect_timeout(timeout),
        None => TransportConfig::default(),
    }
}
