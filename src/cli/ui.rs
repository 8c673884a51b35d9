use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Error,
    Notice,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Error => style(text).red(),
        StyleType::Notice => style(text).cyan(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right-aligned cell for a numeric value.
pub fn value_cell(text: &str) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Creates a cell for displaying percentage change with color coding.
pub fn change_cell(text: &str) -> Cell {
    let color = if text.starts_with('-') {
        Color::Red
    } else {
        Color::Green
    };
    Cell::new(text).fg(color).set_alignment(CellAlignment::Right)
}

/// Colors advice by its signal: green to buy, red to sell.
pub fn advice_cell(text: &str) -> Cell {
    let cell = Cell::new(text);
    if text.starts_with("Buy") {
        cell.fg(Color::Green).add_attribute(Attribute::Bold)
    } else if text.starts_with("Sell") {
        cell.fg(Color::Red).add_attribute(Attribute::Bold)
    } else {
        cell
    }
}

/// Creates a cell for "N/A" values.
pub fn na_cell() -> Cell {
    Cell::new("N/A")
        .fg(Color::DarkGrey)
        .set_alignment(CellAlignment::Right)
}

/// Creates a ticking spinner with a message.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Renders points as a one-line sparkline scaled between their min and max.
pub fn sparkline(points: &[f64]) -> String {
    let min = points.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = points.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    points
        .iter()
        .map(|p| {
            if span > 0.0 {
                let level = ((p - min) / span * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
                SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
            } else {
                SPARK_LEVELS[SPARK_LEVELS.len() / 2]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparkline() {
        assert_eq!(sparkline(&[]), "");
        assert_eq!(sparkline(&[1.0, 8.0]), "▁█");
        assert_eq!(sparkline(&[5.0, 5.0, 5.0]), "▅▅▅");
        assert_eq!(sparkline(&[0.0, 0.5, 1.0]).chars().count(), 3);
    }
}
