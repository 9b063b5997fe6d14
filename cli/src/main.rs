//! Uptime Watch: CLI server
//!
//! Headless uptime watcher suitable for deployment as a systemd service,
//! Docker container, or standalone process.
//!
//! ```sh
//! # Run with default config (~/.config/uptime-watch/config.toml)
//! uptime-watch
//!
//! # Custom config path
//! uptime-watch --config /etc/uptime-watch/config.toml
//!
//! # Probe every minute
//! uptime-watch --interval 60
//!
//! # Validate config without starting
//! uptime-watch --check
//!
//! # Write the effective config (defaults plus overrides) and exit
//! uptime-watch --config ./watch.toml --interval 60 --write-config
//!
//! # Probe everything once and exit
//! uptime-watch --once
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use uptime_watch::config::AppConfig;
use uptime_watch::server::{init_tracing, run_once, ServerHandle, ServerOptions};

/// Uptime Watch: website availability monitor with Telegram alerts.
#[derive(Parser, Debug)]
#[command(
    name = "uptime-watch",
    version,
    about = "Website uptime watcher with Telegram alerts",
    long_about = "Uptime Watch: polls registered websites on a fixed interval \
                  and notifies their owners over Telegram when one goes down.\n\n\
                  Default config: ~/.config/uptime-watch/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "UPTIME_WATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the poll interval in seconds.
    #[arg(short, long)]
    interval: Option<u64>,

    /// Validate the configuration file and exit without starting.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Run a single polling tick, deliver its alerts and exit.
    #[arg(long)]
    once: bool,

    /// Write the effective configuration to the config path and exit.
    #[arg(long, conflicts_with_all = ["check", "once"])]
    write_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .unwrap_or_else(uptime_watch::default_config_path);

    let loaded = AppConfig::load(&config_path);
    let mut config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => AppConfig::default(),
    };

    // The log level override has to land before tracing is initialised.
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);

    match loaded {
        Ok(_) => info!("Configuration loaded from {}", config_path.display()),
        Err(e) => {
            // Never overwrite a file that failed to parse with defaults.
            if cli.check || cli.write_config {
                error!("❌ Invalid configuration in {}: {}", config_path.display(), e);
                return Err(e.into());
            }
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(ref level) = cli.log_level {
        info!("CLI override: log_level = {}", level);
    }
    if let Some(secs) = cli.interval {
        info!("CLI override: interval_secs = {}", secs);
        config.monitor.interval_secs = secs;
    }

    // ── Config writing mode ────────────────────────────────────
    if cli.write_config {
        config.validate()?;
        config.save(&config_path)?;
        info!("📝 Configuration written to {}", config_path.display());
        return Ok(());
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        config.validate()?;
        println!("✅ Configuration is valid");
        println!("   Config file   : {}", config_path.display());
        println!("   Interval      : {}s", config.monitor.interval_secs);
        println!("   Probe timeout : {}s", config.monitor.probe_timeout_secs);
        println!("   Overlap ticks : {}", config.monitor.allow_overlap);
        if config.database.in_memory {
            println!("   Database      : in-memory");
        } else {
            println!("   Database      : {}", config.database.path);
        }
        println!(
            "   Telegram      : {}",
            if config.bot_token().is_some() {
                "enabled"
            } else {
                "disabled (no bot token)"
            }
        );
        println!("   Log level     : {}", config.logging.level);
        return Ok(());
    }

    let opts = ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    };

    // ── Single tick ────────────────────────────────────────────
    if cli.once {
        let report = run_once(opts).await?;
        info!(
            probed = report.probed,
            reachable = report.reachable,
            unreachable = report.unreachable,
            transitions = report.transitions,
            notifications = report.notifications,
            failures = report.failures,
            "Single tick finished"
        );
        return Ok(());
    }

    // ── Start watcher ──────────────────────────────────────────
    let handle = ServerHandle::start(opts).await?;

    // Install OS signal handlers (SIGTERM, SIGINT)
    handle.install_signal_handler();

    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    // Wait for shutdown signal, then clean up
    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
