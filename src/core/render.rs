//! The display surface the tracker writes to.

/// Element showing the busy indicator while a cycle runs.
pub const LOADER: &str = "loader";
/// Element showing the most recent error.
pub const ERROR: &str = "error";
pub const LAST_UPDATED: &str = "last-updated";

pub trait Renderer: Send {
    fn set_text(&mut self, element_id: &str, text: &str);

    /// Draws the chart on first use, then appends `point` to it.
    fn extend_chart(&mut self, chart_id: &str, point: f64);

    fn show(&mut self, element_id: &str);

    fn hide(&mut self, element_id: &str);

    /// Shows a transient message to the user.
    fn notify(&mut self, message: &str);

    /// Adds a row to the session price log.
    fn log_price(&mut self, time: &str, asset: &str, price: &str);

    /// Flushes pending changes to the screen.
    fn present(&mut self) {}
}

/// Formats a USD amount with thousands separators, e.g. `$43,210.50`.
pub fn format_price(price: f64) -> String {
    let sign = if price < 0.0 { "-" } else { "" };
    let cents = (price.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}${grouped}.{fraction:02}")
}
