use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::Context,
    clap::Parser,
    secrecy::Secret,
    streamwatch_monitor::{
        ChannelSource, Dispatcher, MonitorService, Notifier, PollScheduler, SchedulerConfig,
        StatusRegistry, SubscriberSet, TrackedChannels, dispatch::DEFAULT_DELIVERY_CONCURRENCY,
    },
    streamwatch_telegram::TelegramConfig,
    streamwatch_vkvideo::{
        VkVideoClient, VkVideoConfig,
        config::{DEFAULT_API_BASE_URL, DEFAULT_CHANNEL_API_BASE_URL},
    },
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "streamwatch",
    version,
    about = "Telegram notifications when VK Video streamers go live"
)]
struct Cli {
    /// VK Video Live application client id.
    #[arg(long, env = "VK_CLIENT_ID")]
    vk_client_id: String,

    /// VK Video Live application client secret.
    #[arg(long, env = "VK_CLIENT_SECRET", hide_env_values = true)]
    vk_client_secret: String,

    /// Telegram bot token from @BotFather.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    bot_token: String,

    /// JSON file with the tracked channels: `{"urls": ["channel", ...]}`.
    #[arg(
        long,
        env = "STREAMWATCH_CHANNELS_FILE",
        default_value = "piv_lobby_streamers.json"
    )]
    channels_file: PathBuf,

    /// Seconds between poll cycles.
    #[arg(long, env = "STREAMWATCH_POLL_INTERVAL_SECS", default_value_t = 60)]
    poll_interval_secs: u64,

    /// Seconds to wait before the first poll cycle.
    #[arg(long, env = "STREAMWATCH_INITIAL_DELAY_SECS", default_value_t = 5)]
    initial_delay_secs: u64,

    /// Per-channel fetch timeout in seconds.
    #[arg(long, env = "STREAMWATCH_FETCH_TIMEOUT_SECS", default_value_t = 15)]
    fetch_timeout_secs: u64,

    /// Base URL of the VK Video Live OAuth server.
    #[arg(long, env = "STREAMWATCH_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Base URL of the VK Video Live channel endpoint.
    #[arg(
        long,
        env = "STREAMWATCH_CHANNEL_API_BASE_URL",
        default_value = DEFAULT_CHANNEL_API_BASE_URL
    )]
    channel_api_base_url: String,

    /// Base URL for channel links in messages.
    #[arg(
        long,
        env = "STREAMWATCH_WATCH_BASE_URL",
        default_value = "https://live.vkvideo.ru"
    )]
    watch_base_url: String,

    /// Attempts at reaching Telegram on startup before giving up.
    #[arg(long, env = "STREAMWATCH_CONNECT_ATTEMPTS", default_value_t = 5)]
    connect_attempts: u32,

    /// Messages in flight at once when announcing a status change.
    #[arg(
        long,
        env = "STREAMWATCH_DELIVERY_CONCURRENCY",
        default_value_t = DEFAULT_DELIVERY_CONCURRENCY
    )]
    delivery_concurrency: usize,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090).
    #[cfg(feature = "metrics")]
    #[arg(long, env = "STREAMWATCH_METRICS_LISTEN")]
    metrics_listen: Option<std::net::SocketAddr>,
}

impl Cli {
    fn vkvideo_config(&self) -> VkVideoConfig {
        let mut config = VkVideoConfig::new(
            self.vk_client_id.clone(),
            Secret::new(self.vk_client_secret.clone()),
        );
        config.api_base_url = self.api_base_url.clone();
        config.channel_api_base_url = self.channel_api_base_url.clone();
        config.request_timeout = Duration::from_secs(self.fetch_timeout_secs);
        config
    }

    fn telegram_config(&self) -> TelegramConfig {
        TelegramConfig::new(Secret::new(self.bot_token.clone()))
            .with_connect_attempts(self.connect_attempts)
    }

    fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            initial_delay: Duration::from_secs(self.initial_delay_secs),
        }
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[cfg(feature = "metrics")]
fn init_metrics(cli: &Cli) -> anyhow::Result<()> {
    streamwatch_metrics::init_metrics(streamwatch_metrics::MetricsRecorderConfig {
        enabled: cli.metrics_listen.is_some(),
        listen: cli.metrics_listen,
        global_labels: vec![("service".into(), "streamwatch".into())],
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "streamwatch starting");

    #[cfg(feature = "metrics")]
    init_metrics(&cli).context("failed to start metrics exporter")?;

    let tracked = TrackedChannels::load(&cli.channels_file);
    if tracked.is_empty() {
        warn!(
            path = %cli.channels_file.display(),
            "no channels to track; polling will stay idle"
        );
    } else {
        info!(channels = tracked.len(), "tracking channels");
    }

    let vkvideo = VkVideoClient::new(&cli.vkvideo_config())
        .context("failed to build VK Video client")?;
    let registry = Arc::new(StatusRegistry::new(
        Arc::new(vkvideo) as Arc<dyn ChannelSource>,
        Duration::from_secs(cli.fetch_timeout_secs),
    ));

    let telegram = streamwatch_telegram::connect(&cli.telegram_config())
        .await
        .context("failed to connect to Telegram")?;

    let subscribers = Arc::new(SubscriberSet::new());
    let dispatcher = Dispatcher::new(
        Arc::new(telegram.outbound()) as Arc<dyn Notifier>,
        Arc::clone(&subscribers),
        cli.watch_base_url.clone(),
    )
    .with_concurrency(cli.delivery_concurrency);
    let service = Arc::new(MonitorService::new(
        tracked,
        registry,
        subscribers,
        dispatcher,
    ));

    let cancel = CancellationToken::new();
    let scheduler =
        PollScheduler::new(Arc::clone(&service), cli.scheduler_config()).spawn(cancel.clone());
    let poller = telegram.spawn(service, cancel.clone());

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("shutdown requested");
        },
        () = cancel.cancelled() => {},
    }
    cancel.cancel();

    for (name, handle) in [("scheduler", scheduler), ("telegram", poller)] {
        if let Err(e) = handle.await {
            warn!(task = name, error = %e, "task ended abnormally");
        }
    }

    info!("streamwatch stopped");
    Ok(())
}
