//! Knob GW - Rust implementation
//!
//! Gateway from a rotary dial controller to Home Assistant lights, media
//! players, climate devices and covers.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use knob_gw::cli;
use knob_gw::config::AppConfig;
use knob_gw::devices::DeviceRegistry;
use knob_gw::gateway::Gateway;
use knob_gw::hass::HassClient;
use knob_gw::input::{spawn_line_reader, ControllerEvent};
use knob_gw::paths::AppPaths;
use knob_gw::sink::ConsoleSink;

/// Knob Gateway - drive Home Assistant devices from a dial controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: ./config.yaml, then the user config dir)
    #[arg(short, long, env = "KNOB_GW_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also write daily-rolling log files to the default logs directory
    #[arg(long)]
    log_file: bool,

    /// Write log files to this directory instead (implies --log-file)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Emit console logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Home Assistant long-lived access token
    #[arg(long, env = "HASS_TOKEN", hide_env_values = true)]
    hass_token: Option<String>,

    /// Print the configured devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,

    /// Read controller events from an interactive prompt instead of stdin
    #[arg(long)]
    repl: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let paths = AppPaths::detect();

    let log_dir = args
        .log_dir
        .clone()
        .or_else(|| args.log_file.then(|| paths.logs_dir.clone()));
    let _log_guard = init_logging(&args.log_level, log_dir.as_deref(), args.log_json)?;

    let config_path = args.config.clone().unwrap_or_else(|| paths.config.clone());
    info!("Starting Knob GW v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", config_path.display());

    let config = AppConfig::load(&config_path.to_string_lossy()).await?;
    let devices = Arc::new(DeviceRegistry::from_config(&config.devices));

    if args.list_devices {
        list_devices(&devices);
        return Ok(());
    }

    if args.check_config {
        println!(
            "{} {} ({} devices)",
            "✅ Configuration OK:".green().bold(),
            config_path.display(),
            devices.len()
        );
        return Ok(());
    }

    let hass = Arc::new(
        HassClient::from_config(&config.hass, args.hass_token.clone())
            .context("Failed to build Home Assistant client")?,
    );
    info!("Home Assistant endpoint: {}", hass.base_url());

    let sink = Arc::new(ConsoleSink::new("dial"));
    let gateway = Gateway::new(devices.clone(), hass, sink, config.timing);
    info!(
        "Gateway initialized ({} devices, debounce {}ms, cooldown {}ms)",
        devices.len(),
        config.timing.debounce_ms,
        config.timing.cooldown_ms
    );

    gateway.sync_all().await;

    let (event_tx, event_rx) = mpsc::channel::<ControllerEvent>(256);
    let source = if args.repl {
        let devices = devices.clone();
        tokio::spawn(async move {
            if let Err(e) = cli::run_repl(devices, event_tx).await {
                warn!("REPL stopped: {:#}", e);
            }
        })
    } else {
        info!("Reading controller events from stdin");
        spawn_line_reader(tokio::io::BufReader::new(tokio::io::stdin()), event_tx)
    };

    Arc::new(gateway).run(event_rx, shutdown_signal()).await;

    source.abort();
    info!("Knob GW shutdown complete");
    Ok(())
}

fn init_logging(level: &str, log_dir: Option<&Path>, json: bool) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            AppPaths::ensure_logs_dir(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "knob-gw.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn list_devices(devices: &DeviceRegistry) {
    println!("\n{}", "=== Configured Devices ===".bold().cyan());

    if devices.is_empty() {
        println!("  {}", "(none)".yellow());
        return;
    }

    for device in devices.iter() {
        let range = match device.temp_range {
            Some(r) => format!(" [{:.1}-{:.1}°C]", r.min, r.max),
            None => String::new(),
        };
        println!(
            "  {} {} → {}{}",
            format!("{:<20}", device.id).bright_white(),
            format!("{:<12}", device.class.to_string()).yellow(),
            device.entity.green(),
            range
        );
        if device.name != device.id {
            println!("  {:<20} {}", "", device.name.dimmed());
        }
    }

    println!("\n  Total: {}", devices.len().to_string().green());
}
