pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::dashboard::TerminalRenderer;
use crate::cli::scheduler::{IntervalScheduler, spawn_connectivity_monitor, spawn_stdin_commands};
use crate::core::config::AppConfig;
use crate::core::history::PriceHistoryStore;
use crate::core::schedule::Trigger;
use crate::core::tracker::Tracker;
use crate::providers::coingecko::CoinGeckoProvider;
use crate::providers::version::UpdateChecker;
use crate::store::{KeyValueStore, PRICES_COLLECTION, SETTINGS_COLLECTION};
use anyhow::{Result, bail};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const WELCOME_MESSAGE: &str = "Welcome to the Cryptocurrency Price Tracker!";
pub const UPDATE_MESSAGE: &str = "New update available! Please restart coinwatch.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Live dashboard until interrupted
    Watch,
    /// One update cycle
    Once,
    /// Stored history, optionally of one asset
    History(Option<String>),
    /// Asset with the highest latest price
    Compare,
}

struct App {
    config: AppConfig,
    store: KeyValueStore,
    tracker: Tracker,
}

fn build_app(config_path: Option<&str>, interactive: bool) -> Result<App> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    config.validate()?;
    debug!("Loaded config: {config:#?}");

    let store = match config.default_data_path() {
        Ok(path) => KeyValueStore::open(&path),
        Err(e) => {
            warn!("No data directory ({e}), prices will not be kept");
            KeyValueStore::in_memory()
        }
    };
    let history = PriceHistoryStore::new(store.collection(PRICES_COLLECTION));
    let provider = Arc::new(CoinGeckoProvider::new(&config.providers.coingecko)?);
    let renderer = TerminalRenderer::new(config.assets.clone()).with_clear_screen(interactive);
    let tracker = Tracker::new(
        config.assets.clone(),
        provider,
        history,
        Box::new(renderer),
    );

    Ok(App {
        config,
        store,
        tracker,
    })
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("coinwatch starting...");
    let interactive = command == AppCommand::Watch;
    let app = build_app(config_path, interactive)?;

    match command {
        AppCommand::Watch => watch(&app).await,
        AppCommand::Once => {
            let report = app.tracker.run_cycle(Trigger::Initial).await;
            if report.failures() == report.outcomes.len() {
                bail!("Could not fetch any price");
            }
            Ok(())
        }
        AppCommand::History(asset) => {
            let report = cli::history::history_report(
                app.tracker.history(),
                app.tracker.assets(),
                asset.as_deref(),
            )
            .await?;
            println!("{report}");
            Ok(())
        }
        AppCommand::Compare => {
            println!("{}", cli::history::compare_report(&app.tracker).await);
            Ok(())
        }
    }
}

async fn watch(app: &App) -> Result<()> {
    let tracker = &app.tracker;
    tracker.notify(WELCOME_MESSAGE);

    if let Some(url) = &app.config.version_url {
        let checker = UpdateChecker::new(url, app.store.collection(SETTINGS_COLLECTION))?;
        match checker.check().await {
            Ok(Some(version)) => {
                info!(%version, "New version published");
                tracker.notify(UPDATE_MESSAGE);
            }
            Ok(None) => {}
            Err(e) => warn!("Error checking for updates: {e:#}"),
        }
    }

    tracker.initialize_charts(app.config.history_days).await;

    let period = Duration::from_secs(app.config.refresh_interval_secs);
    let mut scheduler = IntervalScheduler::new(period).with_commands(spawn_stdin_commands());
    match spawn_connectivity_monitor(&app.config.providers.coingecko.base_url, period) {
        Ok(connectivity) => scheduler = scheduler.with_connectivity(connectivity),
        Err(e) => warn!("Connectivity monitoring disabled: {e:#}"),
    }

    tokio::select! {
        cycles = tracker.run(&mut scheduler) => info!(cycles, "Dashboard stopped"),
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }
    Ok(())
}
