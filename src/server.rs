//! Reusable watcher runtime.
//!
//! [`ServerHandle`] owns the whole process context: repository provider,
//! prober, notifier, event bus, scheduler and shutdown coordinator. The
//! CLI binary is a thin wrapper around it.

use std::sync::{Arc, OnceLock};

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::commands::CommandHandler;
use crate::application::monitoring::{
    NotifyPolicy, PollScheduler, SchedulerConfig, TickReport, TransitionEngine,
};
use crate::config::AppConfig;
use crate::domain::{IdentityId, Notifier, RepositoryProvider};
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{
    init_database, HttpProber, InMemoryRepositoryProvider, LogNotifier,
    SeaOrmRepositoryProvider, TelegramClient, TelegramNotifier, UpdatePoller,
};
use crate::notifications::{create_event_bus, NotificationDispatcher, SharedEventBus};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the watcher.
pub struct ServerOptions {
    /// Application configuration.
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── Assembly ───────────────────────────────────────────────────────

/// Everything wired together but nothing spawned yet
struct Components {
    repos: Arc<dyn RepositoryProvider>,
    db: Option<DatabaseConnection>,
    event_bus: SharedEventBus,
    scheduler: PollScheduler,
    dispatcher: Arc<NotificationDispatcher>,
    telegram: Option<Arc<TelegramClient>>,
}

async fn assemble(
    config: &AppConfig,
    auto_migrate: bool,
) -> Result<Components, Box<dyn std::error::Error>> {
    config.validate()?;

    // ── Registry ───────────────────────────────────────────
    let (repos, db): (Arc<dyn RepositoryProvider>, Option<DatabaseConnection>) =
        if config.database.in_memory {
            warn!("Using in-memory registry; nothing survives a restart");
            (Arc::new(InMemoryRepositoryProvider::new()), None)
        } else {
            let db = init_database(&config.database.connection()).await?;
            if auto_migrate {
                info!("Running database migrations...");
                Migrator::up(&db, None).await?;
                info!("Migrations completed");
            }
            (Arc::new(SeaOrmRepositoryProvider::new(db.clone())), Some(db))
        };

    // ── Event bus & transition engine ──────────────────────
    let event_bus = create_event_bus();
    let engine = Arc::new(TransitionEngine::new(
        repos.clone(),
        event_bus.clone(),
        NotifyPolicy {
            on_recovery: config.notifications.notify_on_recovery,
        },
    ));

    // ── Prober & scheduler ─────────────────────────────────
    let prober = Arc::new(HttpProber::new(config.monitor.probe_method)?);
    let scheduler = PollScheduler::new(
        repos.clone(),
        prober,
        engine,
        event_bus.clone(),
        SchedulerConfig {
            interval: config.monitor.interval(),
            probe_timeout: config.monitor.probe_timeout(),
            allow_overlap: config.monitor.allow_overlap,
        },
    );

    // ── Notifier ───────────────────────────────────────────
    let telegram = match config.bot_token() {
        Some(token) => Some(Arc::new(TelegramClient::new(
            &config.telegram.api_base_url,
            token,
        )?)),
        None => None,
    };
    let notifier: Arc<dyn Notifier> = match &telegram {
        Some(client) => Arc::new(TelegramNotifier::new(client.clone())),
        None => {
            warn!("No bot token configured; notifications go to the log only");
            Arc::new(LogNotifier)
        }
    };
    let dispatcher = Arc::new(NotificationDispatcher::new(
        notifier,
        config.notifications.admin_chat_id.map(IdentityId),
    ));

    Ok(Components {
        repos,
        db,
        event_bus,
        scheduler,
        dispatcher,
        telegram,
    })
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running watcher.
///
/// # Examples
///
/// ```rust,no_run
/// use uptime_watch::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// Shared event bus carrying status changes and alerts.
    pub event_bus: SharedEventBus,
    /// Repository provider for data access.
    pub repos: Arc<dyn RepositoryProvider>,
    /// The poll scheduler driving the probes.
    pub scheduler: PollScheduler,
    /// The configuration the watcher was started with.
    pub config: AppConfig,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl ServerHandle {
    /// Start the watcher with the given options.
    ///
    /// This will:
    /// 1. Install the Prometheus exporter (if enabled)
    /// 2. Open the registry and run migrations
    /// 3. Start the notification dispatcher
    /// 4. Start the poll scheduler
    /// 5. Start the Telegram update poller (if a bot token is set)
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let config = opts.config;
        info!("Starting uptime watcher...");

        install_metrics_exporter(&config);

        let components = assemble(&config, opts.auto_migrate).await?;
        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let signal = shutdown.signal();
        let mut tasks = Vec::new();

        tasks.push((
            "dispatcher",
            components
                .dispatcher
                .clone()
                .start(&components.event_bus, signal.clone()),
        ));
        tasks.push(("scheduler", components.scheduler.start(signal.clone())));

        if let Some(client) = components.telegram {
            let handler = Arc::new(CommandHandler::new(
                components.repos.clone(),
                config.monitor.interval(),
            ));
            let poller = UpdatePoller::new(
                client,
                handler,
                std::time::Duration::from_secs(config.telegram.poll_timeout_secs),
            );
            tasks.push(("telegram", poller.start(signal.clone())));
        } else {
            info!("Telegram polling disabled");
        }

        info!("🚀 Uptime watcher started.");

        Ok(Self {
            event_bus: components.event_bus,
            repos: components.repos,
            scheduler: components.scheduler,
            config,
            db: components.db,
            shutdown,
            tasks,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the background tasks to stop after shutdown has been
    /// triggered, bounded by `server.shutdown_timeout`.
    pub async fn wait(self) {
        info!("⏳ Waiting for background tasks to complete...");

        let tasks = self.tasks;
        self.shutdown
            .drain(async move {
                for (name, task) in tasks {
                    match task.await {
                        Ok(()) => info!(task = name, "Task stopped"),
                        Err(e) => error!(task = name, error = %e, "Task panicked"),
                    }
                }
            })
            .await;

        if let Some(db) = self.db {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("✅ Database connection closed");
            }
        }

        info!("👋 Uptime watcher shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down uptime watcher...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|(_, task)| !task.is_finished())
    }
}

/// Run a single tick and deliver its alerts, then return.
///
/// Alerts come straight from the tick rather than the event bus, so none
/// are lost however many endpoints go down at once.
pub async fn run_once(opts: ServerOptions) -> Result<TickReport, Box<dyn std::error::Error>> {
    let components = assemble(&opts.config, opts.auto_migrate).await?;

    let (report, alerts) = components.scheduler.run_tick_collecting_alerts().await;

    let mut delivered = 0;
    for notification in alerts {
        delivered += usize::from(components.dispatcher.deliver(notification).await);
    }
    info!(
        notifications = report.notifications,
        delivered,
        "Tick alerts delivered"
    );

    if let Some(db) = components.db {
        if let Err(e) = db.close().await {
            warn!("Error closing database connection: {}", e);
        }
    }
    Ok(report)
}

// ── Helpers ────────────────────────────────────────────────────────

/// Install the Prometheus scrape listener once per process.
fn install_metrics_exporter(config: &AppConfig) {
    static INSTALLED: OnceLock<()> = OnceLock::new();

    if !config.metrics.enabled || INSTALLED.get().is_some() {
        return;
    }

    let addr: std::net::SocketAddr = match config.metrics.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(listen = %config.metrics.listen, error = %e, "Invalid metrics listen address");
            return;
        }
    };

    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => {
            let _ = INSTALLED.set(());
            info!("📊 Prometheus exporter listening on http://{}/metrics", addr);
        }
        Err(e) => error!(error = %e, "Failed to install Prometheus exporter"),
    }
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServerHandle::start`]).
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::domain::EndpointStatus;

    fn in_memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.database.in_memory = true;
        config.telegram.bot_token = None;
        config.server.shutdown_timeout = 5;
        config
    }

    #[tokio::test]
    async fn run_once_on_empty_registry_reports_nothing() {
        let report = run_once(ServerOptions {
            config: in_memory_config(),
            auto_migrate: true,
        })
        .await
        .unwrap();

        assert_eq!(report, TickReport::default());
    }

    #[tokio::test]
    async fn invalid_config_is_refused() {
        let mut config = in_memory_config();
        config.monitor.interval_secs = 0;

        let result = ServerHandle::start(ServerOptions {
            config,
            auto_migrate: true,
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn sqlite_backed_watcher_probes_and_shuts_down() {
        let site = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&site)
            .await;

        let dir = std::env::temp_dir().join(format!("uptime-watch-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut config = in_memory_config();
        config.database.in_memory = false;
        config.database.path = dir.join("watch.db").to_string_lossy().into_owned();

        let handle = ServerHandle::start(ServerOptions {
            config,
            auto_migrate: true,
        })
        .await
        .unwrap();
        assert!(handle.is_running());

        let endpoint = handle
            .repos
            .endpoints()
            .add(IdentityId(1), &site.uri())
            .await
            .unwrap();

        // The loop's own first tick may race this one; either way the
        // endpoint ends up online.
        let report = handle.scheduler.run_tick().await;
        assert_eq!(report.reachable, 1);

        let listed = handle.repos.endpoints().list_all().await.unwrap();
        assert_eq!(listed[0].id, endpoint.id);
        assert_eq!(listed[0].status, EndpointStatus::Online);

        tokio::time::timeout(Duration::from_secs(10), handle.shutdown())
            .await
            .expect("shutdown completes");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn run_once_delivers_every_alert_of_a_mass_outage() {
        const DOWN: usize = 600;

        let site = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&site)
            .await;
        let bot = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botT/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "message_id": 1 }
            })))
            .expect(DOWN as u64)
            .mount(&bot)
            .await;

        let dir = std::env::temp_dir().join(format!("uptime-watch-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut config = in_memory_config();
        config.database.in_memory = false;
        config.database.path = dir.join("watch.db").to_string_lossy().into_owned();
        config.telegram.bot_token = Some("T".into());
        config.telegram.api_base_url = bot.uri();

        let db = init_database(&config.database.connection()).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let repos = SeaOrmRepositoryProvider::new(db.clone());
        for i in 0..DOWN {
            let url = format!("{}/site{}", site.uri(), i);
            repos.endpoints().add(IdentityId(7), &url).await.unwrap();
        }
        db.close().await.unwrap();

        let report = run_once(ServerOptions {
            config,
            auto_migrate: true,
        })
        .await
        .unwrap();

        assert_eq!(report.unreachable, DOWN);
        assert_eq!(report.notifications, DOWN);
        bot.verify().await;

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
