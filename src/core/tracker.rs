//! Runs fetch, persist, compute and render cycles over the tracked assets.

use crate::core::advice::{Signal, advise};
use crate::core::error::TrackerError;
use crate::core::history::PriceHistoryStore;
use crate::core::price::{Asset, PriceProvider, PriceSample};
use crate::core::render::{self, Renderer, format_price};
use crate::core::schedule::{Event, Scheduler, Trigger};
use crate::core::stats::{Statistics, percentage_change};
use chrono::Local;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

pub const OFFLINE_MESSAGE: &str = "You are offline. Some features may not be available.";
pub const ONLINE_MESSAGE: &str = "You are back online.";

/// Per-asset progress through one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetState {
    Idle,
    Fetching,
    Succeeded,
    Persisted,
    Rendered,
    Failed,
    Reported,
}

impl AssetState {
    fn advance(&mut self, asset: &Asset, next: AssetState) {
        debug!(asset = %asset, from = ?self, to = ?next, "Asset state transition");
        *self = next;
    }
}

/// Everything computed for an asset in a successful cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSnapshot {
    pub price: f64,
    pub signal: Signal,
    pub statistics: Statistics,
    /// Percentage change from the previous stored sample.
    pub change: Option<f64>,
    pub history_len: usize,
}

#[derive(Debug, Clone)]
pub struct AssetOutcome {
    pub asset: Asset,
    pub result: Result<AssetSnapshot, TrackerError>,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub trigger: Trigger,
    /// Set when another cycle was already running and this one did nothing.
    pub skipped: bool,
    pub outcomes: Vec<AssetOutcome>,
}

impl CycleReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

/// Clears the in-flight flag when the cycle ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Tracker {
    assets: Vec<Asset>,
    provider: Arc<dyn PriceProvider>,
    history: PriceHistoryStore,
    renderer: Mutex<Box<dyn Renderer>>,
    in_flight: AtomicBool,
}

impl Tracker {
    pub fn new(
        assets: Vec<Asset>,
        provider: Arc<dyn PriceProvider>,
        history: PriceHistoryStore,
        renderer: Box<dyn Renderer>,
    ) -> Self {
        Self {
            assets,
            provider,
            history,
            renderer: Mutex::new(renderer),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn history(&self) -> &PriceHistoryStore {
        &self.history
    }

    fn render(&self, f: impl FnOnce(&mut dyn Renderer)) {
        let mut renderer = self
            .renderer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(renderer.as_mut());
    }

    pub fn notify(&self, message: &str) {
        self.render(|r| {
            r.notify(message);
            r.present();
        });
    }

    /// Drives cycles until the scheduler runs out of events.
    ///
    /// Returns the number of cycles that ran.
    pub async fn run(&self, scheduler: &mut dyn Scheduler) -> usize {
        let mut cycles = 0;
        while let Some(event) = scheduler.next_event().await {
            if let Some(report) = self.handle(event).await
                && !report.skipped
            {
                cycles += 1;
            }
        }
        info!(cycles, "Scheduler finished");
        cycles
    }

    pub async fn handle(&self, event: Event) -> Option<CycleReport> {
        match event {
            Event::Offline => {
                warn!("Price source unreachable");
                self.render(|r| {
                    r.set_text(render::ERROR, OFFLINE_MESSAGE);
                    r.show(render::ERROR);
                    r.present();
                });
                None
            }
            Event::Refresh(Trigger::Reconnected) => {
                self.render(|r| {
                    r.hide(render::ERROR);
                    r.notify(ONLINE_MESSAGE);
                });
                Some(self.run_cycle(Trigger::Reconnected).await)
            }
            Event::Refresh(trigger) => Some(self.run_cycle(trigger).await),
        }
    }

    /// Updates every asset once, in order.
    ///
    /// A failing asset is reported and skipped; the others still update.
    /// If a cycle is already running this returns immediately with a
    /// skipped report.
    #[instrument(name = "UpdateCycle", skip_all, fields(trigger = %trigger))]
    pub async fn run_cycle(&self, trigger: Trigger) -> CycleReport {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Cycle already in flight, skipping");
            return CycleReport {
                trigger,
                skipped: true,
                outcomes: Vec::new(),
            };
        }
        let _guard = InFlight(&self.in_flight);

        self.render(|r| r.show(render::LOADER));

        let mut outcomes = Vec::with_capacity(self.assets.len());
        for asset in &self.assets {
            outcomes.push(self.process_asset(asset).await);
        }

        let report = CycleReport {
            trigger,
            skipped: false,
            outcomes,
        };
        let failures = report.failures();
        self.render(|r| {
            if failures == 0 {
                r.hide(render::ERROR);
            }
            r.hide(render::LOADER);
            r.present();
        });
        info!(
            assets = report.outcomes.len(),
            failures, "Update cycle finished"
        );
        report
    }

    async fn process_asset(&self, asset: &Asset) -> AssetOutcome {
        let mut state = AssetState::Idle;
        let result = self.update_asset(asset, &mut state).await;

        if let Err(e) = &result {
            state.advance(asset, AssetState::Failed);
            warn!(asset = %asset, error = %e, "Price update failed");
            let message = format!("Error fetching {} price: {}", asset, e);
            self.render(|r| {
                r.set_text(render::ERROR, &message);
                r.show(render::ERROR);
            });
            state.advance(asset, AssetState::Reported);
        }

        AssetOutcome {
            asset: asset.clone(),
            result,
        }
    }

    async fn update_asset(
        &self,
        asset: &Asset,
        state: &mut AssetState,
    ) -> Result<AssetSnapshot, TrackerError> {
        state.advance(asset, AssetState::Fetching);
        let sample = self.provider.fetch_price(asset).await?;
        state.advance(asset, AssetState::Succeeded);

        let history = self.history.append(asset, sample.price).await?;
        state.advance(asset, AssetState::Persisted);

        let snapshot = self.display(asset, &sample, &history)?;
        state.advance(asset, AssetState::Rendered);
        Ok(snapshot)
    }

    fn display(
        &self,
        asset: &Asset,
        sample: &PriceSample,
        history: &[f64],
    ) -> Result<AssetSnapshot, TrackerError> {
        let signal = advise(history);
        let statistics = Statistics::from_history(history)?;
        let change = history
            .len()
            .checked_sub(2)
            .and_then(|i| percentage_change(history[i], sample.price));
        let observed_at = sample.observed_at.with_timezone(&Local);
        let updated_at = observed_at.format("%b %-d, %Y at %I:%M %p").to_string();
        let logged_at = observed_at.format("%I:%M:%S %p").to_string();

        self.render(|r| {
            r.set_text(
                &asset.element_id("price"),
                &format!("Current Price: {}", format_price(sample.price)),
            );
            r.set_text(
                &asset.element_id("advice"),
                &format!("Advice: {}", signal.description()),
            );
            r.notify(&format!(
                "New advice for {}: {}",
                asset,
                signal.description()
            ));
            r.extend_chart(&asset.chart_id(), sample.price);
            r.log_price(&logged_at, &asset.display_name(), &format_price(sample.price));
            r.set_text(
                &asset.element_id("avg-price"),
                &format!("Avg: {}", format_price(statistics.average)),
            );
            r.set_text(
                &asset.element_id("volatility"),
                &format!("Volatility: {:.2}", statistics.volatility),
            );
            if let Some(change) = change {
                r.set_text(&asset.element_id("change"), &format!("{change:+.2}%"));
            }
            r.set_text(render::LAST_UPDATED, &format!("Last Updated: {updated_at}"));
        });

        Ok(AssetSnapshot {
            price: sample.price,
            signal,
            statistics,
            change,
            history_len: history.len(),
        })
    }

    /// Seeds every chart with recent market history.
    ///
    /// Histories are fetched concurrently and drawn in asset order. A
    /// failed fetch leaves that chart empty. Stored histories are not
    /// touched.
    pub async fn initialize_charts(&self, days: u32) {
        let fetches = self.assets.iter().map(|asset| async move {
            match self.provider.fetch_history(asset, days).await {
                Ok(prices) => prices,
                Err(e) => {
                    warn!(asset = %asset, error = %e, "Could not fetch chart history");
                    Vec::new()
                }
            }
        });
        let series = join_all(fetches).await;

        self.render(|r| {
            for (asset, prices) in self.assets.iter().zip(series) {
                let chart_id = asset.chart_id();
                for price in prices {
                    r.extend_chart(&chart_id, price);
                }
            }
            r.present();
        });
    }

    /// The asset whose latest stored price is the highest.
    ///
    /// Ties go to the asset listed first.
    pub async fn compare_latest(&self) -> Option<(Asset, f64)> {
        let mut highest: Option<(Asset, f64)> = None;
        for asset in &self.assets {
            let Some(latest) = self.history.get_history(asset).await.last().copied() else {
                continue;
            };
            if highest.as_ref().is_none_or(|(_, best)| latest > *best) {
                highest = Some((asset.clone(), latest));
            }
        }
        highest
    }
}
