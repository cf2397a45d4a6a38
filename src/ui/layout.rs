use {
    super::renderer::{alert_badge, alert_color, format_diff_pct, format_price, format_time},
    crate::{config::Settings, evaluator::StatsSnapshot, event::PriceEvent},
    ratatui::{
        layout::{Constraint, Direction, Layout as RatLayout, Rect},
        style::{Color, Modifier, Style},
        text::{Line, Span},
        widgets::{Block, Borders, Clear, Paragraph, Row, Table, TableState, Wrap},
        Frame,
    },
};

/// Maximum rows drawn per table
pub const MAX_ROWS: usize = 50;

/// Everything one frame needs, captured from the queues just before drawing
pub struct DashboardView<'a> {
    pub settings: &'a Settings,
    /// Pending inbound events, oldest first
    pub events: &'a [PriceEvent],
    /// Alerts, oldest first
    pub alerts: &'a [PriceEvent],
    pub stats: StatsSnapshot,
    /// Index into the newest-first alert list
    pub selected_alert: usize,
    pub show_settings: bool,
}

impl DashboardView<'_> {
    /// Highlighted row, kept within the rows actually drawn
    pub fn selected_row(&self) -> usize {
        visible_selection(self.selected_alert, self.alerts.len())
    }

    /// Alert under the cursor (the list is drawn newest first)
    pub fn selected(&self) -> Option<&PriceEvent> {
        self.alerts.iter().rev().nth(self.selected_row())
    }
}

/// Clamp a cursor to the alert rows the table draws
pub fn visible_selection(selected: usize, alert_count: usize) -> usize {
    selected.min(alert_count.min(MAX_ROWS).saturating_sub(1))
}

/// Render the main UI layout
pub fn render_layout(f: &mut Frame, area: Rect, view: &DashboardView) -> Result<(), Box<dyn std::error::Error>> {
    let chunks = RatLayout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),  // Header
            Constraint::Min(6),     // Events | Alerts
            Constraint::Length(10), // Alert details
            Constraint::Length(3),  // Footer/Status
        ])
        .split(area);

    let columns = RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    render_header(f, chunks[0], view.settings);
    render_events(f, columns[0], view.events);
    render_alerts(f, columns[1], view);
    render_details(f, chunks[2], view.selected());
    render_footer(f, chunks[3], view);

    if view.show_settings {
        render_settings(f, area, view.settings)?;
    }

    Ok(())
}

fn render_header(f: &mut Frame, area: Rect, settings: &Settings) {
    let header = Block::default()
        .borders(Borders::ALL)
        .title("Live Price Monitor");

    let text = vec![
        Line::from(vec![
            Span::styled(
                settings.application.name.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" - "),
            Span::raw(settings.application.description.clone()),
        ]),
        Line::from(vec![Span::raw(
            "↑/↓ select alert | 's' settings | 'q' or Esc to quit",
        )]),
    ];

    f.render_widget(Paragraph::new(text).block(header), area);
}

fn render_events(f: &mut Frame, area: Rect, events: &[PriceEvent]) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("All Price Events ({})", events.len()));

    if events.is_empty() {
        let empty = Paragraph::new("No price events detected yet")
            .style(Style::default().fg(Color::Blue))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["Time", "Product", "Category", "Ours", "Competitor"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = events
        .iter()
        .rev() // Show newest first
        .take(MAX_ROWS)
        .map(|event| {
            let color = if event.competitor_price < event.our_price {
                Color::LightRed
            } else {
                Color::Gray
            };
            Row::new(vec![
                format_time(&event.timestamp),
                event.product_name.clone(),
                event.category.clone(),
                format_price(event.our_price),
                format_price(event.competitor_price),
            ])
            .style(Style::default().fg(color))
        })
        .collect();

    let widths = [
        Constraint::Length(9),  // Time
        Constraint::Min(12),    // Product
        Constraint::Length(12), // Category
        Constraint::Length(10), // Ours
        Constraint::Length(11), // Competitor
    ];

    let table = Table::new(rows, widths).header(header).block(block);
    f.render_widget(table, area);
}

fn render_alerts(f: &mut Frame, area: Rect, view: &DashboardView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Critical Alerts ({})", view.alerts.len()));

    if view.alerts.is_empty() {
        let empty = Paragraph::new("No alerts detected")
            .style(Style::default().fg(Color::Green))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let header = Row::new(vec!["", "Time", "Product", "Ours", "Competitor", "Diff"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = view
        .alerts
        .iter()
        .rev()
        .take(MAX_ROWS)
        .map(|alert| {
            let diff = alert.price_diff_pct();
            Row::new(vec![
                alert_badge(diff).to_string(),
                format_time(&alert.timestamp),
                alert.product_name.clone(),
                format_price(alert.our_price),
                format_price(alert.competitor_price),
                format_diff_pct(diff),
            ])
            .style(Style::default().fg(alert_color(diff)))
        })
        .collect();

    let widths = [
        Constraint::Length(2),  // Badge
        Constraint::Length(9),  // Time
        Constraint::Min(12),    // Product
        Constraint::Length(10), // Ours
        Constraint::Length(11), // Competitor
        Constraint::Length(7),  // Diff
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    state.select(Some(view.selected_row()));
    f.render_stateful_widget(table, area, &mut state);
}

fn render_details(f: &mut Frame, area: Rect, alert: Option<&PriceEvent>) {
    let block = Block::default().borders(Borders::ALL).title("Alert Details");

    let text = match alert {
        Some(alert) => {
            let diff = alert.price_diff_pct();
            let mut lines = vec![
                Line::from(vec![
                    Span::styled(
                        format!("{} Alert!", alert.product_name),
                        Style::default()
                            .fg(alert_color(diff))
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!(
                        "  Price Difference: {} | Category: {} | Our Price: {} | Competitor Price: {}",
                        format_diff_pct(diff),
                        alert.category,
                        format_price(alert.our_price),
                        format_price(alert.competitor_price),
                    )),
                ]),
                Line::from(""),
            ];
            lines.extend(
                alert
                    .alert_details
                    .as_deref()
                    .unwrap_or("")
                    .lines()
                    .map(|l| Line::from(l.to_string())),
            );
            lines
        }
        None => vec![Line::from("Select an alert to view its details")],
    };

    f.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_footer(f: &mut Frame, area: Rect, view: &DashboardView) {
    let stats = view.stats;
    let text = vec![Line::from(vec![
        Span::styled("Pending: ", Style::default().fg(Color::Cyan)),
        Span::raw(view.events.len().to_string()),
        Span::raw(" | "),
        Span::styled("Evaluated: ", Style::default().fg(Color::Cyan)),
        Span::raw(stats.processed.to_string()),
        Span::raw(" | "),
        Span::styled("Alerts: ", Style::default().fg(Color::Red)),
        Span::raw(stats.alerted.to_string()),
        Span::raw(" | "),
        Span::styled("Ignored: ", Style::default().fg(Color::Green)),
        Span::raw(stats.ignored.to_string()),
        Span::raw(" | "),
        Span::styled("Failed: ", Style::default().fg(Color::Magenta)),
        Span::raw(stats.failed.to_string()),
    ])];

    let footer = Block::default().borders(Borders::ALL).title("Status");
    f.render_widget(Paragraph::new(text).block(footer), area);
}

fn render_settings(f: &mut Frame, area: Rect, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let popup = centered(area, 80, 80);
    let json = serde_json::to_string_pretty(settings)?;

    let block = Block::default()
        .borders(Borders::ALL)
        .title("System Settings ('s' to close)");

    f.render_widget(Clear, popup);
    f.render_widget(Paragraph::new(json).block(block).wrap(Wrap { trim: false }), popup);
    Ok(())
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = RatLayout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    RatLayout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
