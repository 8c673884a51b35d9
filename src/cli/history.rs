use super::ui;
use crate::core::advice::advise;
use crate::core::history::PriceHistoryStore;
use crate::core::price::Asset;
use crate::core::render::format_price;
use crate::core::stats::{Statistics, percentage_change};
use crate::core::tracker::Tracker;
use anyhow::{Result, bail};
use comfy_table::Cell;

/// Renders the stored history of each asset (or only `filter`) with its
/// statistics and current advice.
pub async fn history_report(
    store: &PriceHistoryStore,
    assets: &[Asset],
    filter: Option<&str>,
) -> Result<String> {
    let selected: Vec<&Asset> = match filter {
        Some(wanted) => {
            let wanted = wanted.to_lowercase();
            let found: Vec<&Asset> = assets
                .iter()
                .filter(|a| a.id == wanted || a.symbol.to_lowercase() == wanted)
                .collect();
            if found.is_empty() {
                bail!("Unknown asset: {}", wanted);
            }
            found
        }
        None => assets.iter().collect(),
    };

    let mut sections = Vec::with_capacity(selected.len());
    for asset in selected {
        let prices = store.get_history(asset).await;
        let title = ui::style_text(
            &format!("{} ({})", asset.display_name(), asset.symbol),
            ui::StyleType::Title,
        );

        let Ok(stats) = Statistics::from_history(&prices) else {
            sections.push(format!("{title}\n\nNo prices stored yet."));
            continue;
        };

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("#"),
            ui::header_cell("Price (USD)"),
            ui::header_cell("Change"),
        ]);
        for (i, price) in prices.iter().enumerate() {
            let change = i
                .checked_sub(1)
                .and_then(|prev| percentage_change(prices[prev], *price))
                .map_or_else(ui::na_cell, |c| ui::change_cell(&format!("{c:+.2}%")));
            table.add_row(vec![
                Cell::new(i + 1),
                ui::value_cell(&format_price(*price)),
                change,
            ]);
        }

        sections.push(format!(
            "{title}\n\n{table}\n\nAverage: {}  Volatility: {:.2}  Advice: {}",
            format_price(stats.average),
            stats.volatility,
            advise(&prices).description()
        ));
    }

    Ok(sections.join("\n\n"))
}

/// Names the asset with the highest latest stored price.
pub async fn compare_report(tracker: &Tracker) -> String {
    match tracker.compare_latest().await {
        Some((asset, price)) => format!(
            "Highest price: {} at {}",
            asset.display_name(),
            format_price(price)
        ),
        None => "No prices stored yet.".to_string(),
    }
}
