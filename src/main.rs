use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use transport_viewer::adapters::inbound::spawn_jsonl_feed;
use transport_viewer::adapters::outbound::{init_combined_logger, ActivityLog, FanoutLogger, FilesystemDataSource, SceneSurface};
use transport_viewer::application::{Command, Dashboard, DashboardRuntime, RuntimeSettings};
use transport_viewer::domains::logger::DynLogger;
use transport_viewer::domains::movement::AnimationScheduler;
use transport_viewer::domains::view::ViewController;
use transport_viewer::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Config path: first argument, then TRANSPORT_VIEWER_CONFIG, then ./config.toml if present
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TRANSPORT_VIEWER_CONFIG").ok())
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load_layered(Some(&config_path))?;
    info!("Configuration loaded from {}", config_path);

    let mount = config.view.options.mount.clone();
    let activity = Arc::new(ActivityLog::new(config.logging.max_entries));
    let logger: DynLogger = Arc::new(
        FanoutLogger::new(vec![init_combined_logger(
            &mount,
            config.logging.file.as_deref(),
            &config.logging.level,
        )])
        .with(activity.clone()),
    );

    let source = Arc::new(FilesystemDataSource::new(config.feed.data_dir.as_ref().map(PathBuf::from)));
    info!("Reading facility data from {}", source.base().display());

    let view = ViewController::new(SceneSurface::new(), config.view.options.clone());
    let scheduler = AnimationScheduler::new(config.animation.default_step(), config.animation.watchdog_slack());
    let dashboard = Dashboard::new(view, scheduler, logger.clone()).with_resolve_retries(config.animation.resolve_retries);

    let runtime = DashboardRuntime::new(dashboard, source, RuntimeSettings::from_config(&config), logger.clone());

    let (feed_tx, feed_rx) = mpsc::channel(config.feed.channel_capacity.max(1));
    let feed_task = match &config.feed.events_file {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            info!("Replaying events from {}", path);
            spawn_jsonl_feed(file, feed_tx, logger.clone())
        }
        None => spawn_jsonl_feed(tokio::io::stdin(), feed_tx, logger.clone()),
    };

    let commands = runtime.command_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = commands.send(Command::Shutdown).await;
        }
    });

    let dashboard = runtime.run(feed_rx).await?;
    match feed_task.await {
        Ok(forwarded) => info!("Feed forwarded {} events", forwarded),
        Err(e) => warn!("Feed task failed: {}", e),
    }

    info!(
        "{} entities, {} activity log entries",
        dashboard.entities().len(),
        activity.len()
    );
    println!("{}", dashboard.surface().to_json()?);

    Ok(())
}
