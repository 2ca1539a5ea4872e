mod http;
mod poll;

use livemerge_core::config::Config;
use livemerge_core::dashboard::DashboardOptions;
use livemerge_core::poller::ChannelPoller;
use livemerge_core::store::Store;
use livemerge_core::youtube::YouTubeClient;
use livemerge_core::{platform, Dashboard};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// The dashboard shared by the HTTP API and the poll loop.
pub type SharedDashboard = Arc<Mutex<Dashboard>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("daemon.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,livemerge_daemon=debug,livemerge_core=debug")
            }),
        )
        .init();

    eprintln!("livemerge: logging to {}", log_path.display());
    info!("Log file: {:?}", log_path);

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    let store = Store::on_disk(config.store.dir.clone());
    info!("Store directory: {:?}", config.store.dir);

    let options = DashboardOptions::from_config(&config);
    let url_options = options.url_options.clone();
    let dashboard: SharedDashboard = Arc::new(Mutex::new(Dashboard::open(&store, options)));

    let client = YouTubeClient::from_config(&config.youtube)?;
    let poller = Arc::new(ChannelPoller::new(client, url_options));

    let interval = config
        .polling
        .auto_polling
        .then(|| Duration::from_secs(config.polling.poll_interval_secs.max(1)));
    let (poll_handle, poll_task) = poll::start(dashboard.clone(), poller, interval);

    if config.http.enabled {
        let _http_handle = http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            http::HttpState {
                dashboard: dashboard.clone(),
                poll: poll_handle.clone(),
                auto_polling: config.polling.auto_polling,
            },
        );
    } else {
        info!("HTTP API disabled");
    }

    info!("Daemon initialised");
    poll_task.await?;
    drop(poll_handle);

    Ok(())
}
