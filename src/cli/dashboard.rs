//! Terminal rendition of the dashboard.

use super::ui;
use crate::core::Renderer;
use crate::core::price::Asset;
use crate::core::render::{ERROR, LAST_UPDATED, LOADER};
use comfy_table::Cell;
use indicatif::ProgressBar;
use std::collections::{HashMap, HashSet, VecDeque};

/// Points kept per chart.
pub const MAX_CHART_POINTS: usize = 60;
/// Points drawn in the trend column.
const SPARKLINE_WIDTH: usize = 30;
/// Rows kept in the session price log.
pub const MAX_PRICE_LOG_ROWS: usize = 10;

/// One fetched price, as shown in the session log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLogRow {
    pub time: String,
    pub asset: String,
    pub price: String,
}

/// Keeps the dashboard state in memory and prints a frame on `present`.
pub struct TerminalRenderer {
    assets: Vec<Asset>,
    texts: HashMap<String, String>,
    charts: HashMap<String, VecDeque<f64>>,
    visible: HashSet<String>,
    notifications: Vec<String>,
    price_log: VecDeque<PriceLogRow>,
    spinner: Option<ProgressBar>,
    clear_screen: bool,
}

impl TerminalRenderer {
    pub fn new(assets: Vec<Asset>) -> Self {
        Self {
            assets,
            texts: HashMap::new(),
            charts: HashMap::new(),
            visible: HashSet::new(),
            notifications: Vec::new(),
            price_log: VecDeque::new(),
            spinner: None,
            clear_screen: false,
        }
    }

    /// Redraw in place instead of scrolling.
    pub fn with_clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    /// Text of an element without its label, e.g. `$43,210.50` for
    /// `Current Price: $43,210.50`.
    fn value_of(&self, element_id: &str) -> Option<&str> {
        self.texts
            .get(element_id)
            .map(|text| text.split_once(": ").map_or(text.as_str(), |(_, v)| v))
    }

    fn text_cell(&self, element_id: &str, make: fn(&str) -> Cell) -> Cell {
        self.value_of(element_id).map_or_else(ui::na_cell, make)
    }

    /// Builds the current frame without printing it.
    pub fn render_frame(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Asset"),
            ui::header_cell("Price (USD)"),
            ui::header_cell("Change"),
            ui::header_cell("Average"),
            ui::header_cell("Volatility"),
            ui::header_cell("Advice"),
            ui::header_cell("Trend"),
        ]);

        for asset in &self.assets {
            let trend = self
                .charts
                .get(&asset.chart_id())
                .map(|points| {
                    let points: Vec<f64> = points.iter().copied().collect();
                    let start = points.len().saturating_sub(SPARKLINE_WIDTH);
                    ui::sparkline(&points[start..])
                })
                .unwrap_or_default();

            table.add_row(vec![
                Cell::new(format!("{} ({})", asset.display_name(), asset.symbol)),
                self.text_cell(&asset.element_id("price"), ui::value_cell),
                self.text_cell(&asset.element_id("change"), ui::change_cell),
                self.text_cell(&asset.element_id("avg-price"), ui::value_cell),
                self.text_cell(&asset.element_id("volatility"), ui::value_cell),
                self.text_cell(&asset.element_id("advice"), ui::advice_cell),
                Cell::new(trend),
            ]);
        }

        let mut output = format!(
            "{}\n\n{}",
            ui::style_text("Cryptocurrency Price Tracker", ui::StyleType::Title),
            table
        );

        if !self.price_log.is_empty() {
            let mut log = ui::new_styled_table();
            log.set_header(vec![
                ui::header_cell("Time"),
                ui::header_cell("Asset"),
                ui::header_cell("Price (USD)"),
            ]);
            for row in &self.price_log {
                log.add_row(vec![
                    Cell::new(&row.time),
                    Cell::new(&row.asset),
                    ui::value_cell(&row.price),
                ]);
            }
            output.push_str(&format!(
                "\n\n{}\n{}",
                ui::style_text("Price log", ui::StyleType::Subtle),
                log
            ));
        }

        if self.visible.contains(ERROR)
            && let Some(error) = self.texts.get(ERROR)
        {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text(error, ui::StyleType::Error)
            ));
        }

        for message in &self.notifications {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(message, ui::StyleType::Notice)
            ));
        }

        if let Some(updated) = self.texts.get(LAST_UPDATED) {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text(updated, ui::StyleType::Subtle)
            ));
        }
        output.push_str(&format!(
            "\n{}",
            ui::style_text("Enter: refresh, q: quit", ui::StyleType::Subtle)
        ));
        output
    }

    pub fn chart(&self, chart_id: &str) -> Option<&VecDeque<f64>> {
        self.charts.get(chart_id)
    }

    /// Logged prices, oldest first.
    pub fn price_log(&self) -> &VecDeque<PriceLogRow> {
        &self.price_log
    }
}

impl Renderer for TerminalRenderer {
    fn set_text(&mut self, element_id: &str, text: &str) {
        self.texts.insert(element_id.to_string(), text.to_string());
    }

    fn extend_chart(&mut self, chart_id: &str, point: f64) {
        let chart = self.charts.entry(chart_id.to_string()).or_default();
        chart.push_back(point);
        while chart.len() > MAX_CHART_POINTS {
            chart.pop_front();
        }
    }

    fn show(&mut self, element_id: &str) {
        if element_id == LOADER && self.spinner.is_none() {
            self.spinner = Some(ui::new_spinner("Fetching prices..."));
        }
        self.visible.insert(element_id.to_string());
    }

    fn hide(&mut self, element_id: &str) {
        if element_id == LOADER
            && let Some(spinner) = self.spinner.take()
        {
            spinner.finish_and_clear();
        }
        self.visible.remove(element_id);
    }

    fn notify(&mut self, message: &str) {
        self.notifications.push(message.to_string());
    }

    fn log_price(&mut self, time: &str, asset: &str, price: &str) {
        self.price_log.push_back(PriceLogRow {
            time: time.to_string(),
            asset: asset.to_string(),
            price: price.to_string(),
        });
        while self.price_log.len() > MAX_PRICE_LOG_ROWS {
            self.price_log.pop_front();
        }
    }

    fn present(&mut self) {
        if self.clear_screen {
            let _ = console::Term::stdout().clear_screen();
        }
        println!("{}", self.render_frame());
        // Notifications are shown in one frame only
        self.notifications.clear();
    }
}
