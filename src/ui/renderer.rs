// Renderer module - formatting utilities shared by the layout widgets

use {
    chrono::{DateTime, Local, Utc},
    ratatui::style::Color,
};

/// Format a price for display
pub fn format_price(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Format a price difference as an absolute percentage
pub fn format_diff_pct(pct: f64) -> String {
    format!("{:.1}%", pct.abs())
}

/// Wall-clock time of an event in the local timezone
pub fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// Red when the competitor undercuts us, yellow otherwise
pub fn alert_color(diff_pct: f64) -> Color {
    if diff_pct > 0.0 {
        Color::Red
    } else {
        Color::Yellow
    }
}

pub fn alert_badge(diff_pct: f64) -> &'static str {
    if diff_pct > 0.0 {
        "🚨"
    } else {
        "⚠️"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatting() {
        assert_eq!(format_price(400.0), "$400.00");
        assert_eq!(format_price(839.989), "$839.99");
        assert_eq!(format_diff_pct(-4.99), "5.0%");
        assert_eq!(format_diff_pct(49.9994), "50.0%");
    }

    #[test]
    fn test_alert_styling() {
        assert_eq!(alert_color(12.0), Color::Red);
        assert_eq!(alert_color(-3.0), Color::Yellow);
        assert_eq!(alert_color(0.0), Color::Yellow);
        assert_eq!(alert_badge(12.0), "🚨");
    }
}
