use {
    super::layout::{render_layout, visible_selection, DashboardView},
    crate::{config::Settings, evaluator::EvaluatorStats, event::PriceEvent, queue::EventQueue},
    crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    ratatui::{
        backend::{Backend, CrosstermBackend},
        Terminal,
    },
    std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
    },
};

/// Read-only handles the dashboard draws from
#[derive(Clone)]
pub struct Dashboard {
    pub inbound: EventQueue<PriceEvent>,
    pub outbound: EventQueue<PriceEvent>,
    pub stats: EvaluatorStats,
    pub settings: Settings,
    /// Set from outside (e.g. on SIGINT) to end the loop at the next poll
    pub stop: Arc<AtomicBool>,
}

/// Keyboard-driven view state
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UiState {
    pub selected_alert: usize,
    pub show_settings: bool,
}

impl UiState {
    /// Apply one key press; returns `false` once the user asked to quit
    pub fn handle_key(&mut self, code: KeyCode, alert_count: usize) -> bool {
        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Esc => {
                if !self.show_settings {
                    return false;
                }
                self.show_settings = false;
            }
            KeyCode::Char('s') => self.show_settings = !self.show_settings,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_alert = self.selected_alert.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_alert = visible_selection(self.selected_alert + 1, alert_count);
            }
            _ => {}
        }
        true
    }

    /// Keep the cursor on a drawn row as the alert list changes
    fn clamp(&mut self, alert_count: usize) {
        self.selected_alert = visible_selection(self.selected_alert, alert_count);
    }
}

/// Run the TUI event loop
///
/// Blocking: crossterm's poll parks the thread, so call this from
/// `tokio::task::spawn_blocking`. The loop never mutates either queue.
pub fn run_ui(dashboard: Dashboard) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let stdout = std::io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    crossterm::terminal::enable_raw_mode()?;

    // Alternate screen isolates stdout only; stderr logs still land on this
    // tty, so the runtime lowers the default log level while the UI is up
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;

    let result = event_loop(&mut terminal, &dashboard);

    // Restore the terminal whatever the loop returned
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    crossterm::terminal::disable_raw_mode()?;

    result
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    dashboard: &Dashboard,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    terminal.clear()?;

    let refresh_interval = dashboard.settings.refresh_interval();
    let mut ui = UiState::default();

    while !dashboard.stop.load(Ordering::Relaxed) {
        let events = dashboard.inbound.snapshot();
        let alerts = dashboard.outbound.snapshot();
        ui.clamp(alerts.len());

        let view = DashboardView {
            settings: &dashboard.settings,
            events: &events,
            alerts: &alerts,
            stats: dashboard.stats.snapshot(),
            selected_alert: ui.selected_alert,
            show_settings: ui.show_settings,
        };

        terminal.draw(|f| {
            let area = f.size();
            if let Err(e) = render_layout(f, area, &view) {
                log::error!("Layout render error: {}", e);
            }
        })?;

        // Check for keyboard input, redrawing at least once per interval
        if crossterm::event::poll(refresh_interval)? {
            if let crossterm::event::Event::Key(KeyEvent { code, kind, modifiers, .. }) =
                crossterm::event::read()?
            {
                // Raw mode swallows SIGINT, so Ctrl+C arrives as a key
                if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
                    break;
                }
                if kind == KeyEventKind::Press && !ui.handle_key(code, alerts.len()) {
                    break;
                }
            }
        }
    }

    Ok(())
}
