//! TUI Application - Main entry point and run loop

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};
use tokio::sync::mpsc;

use super::events::help_hints;
use super::runtime::{AppMessage, Executor};
use super::screen::{RenderContext, ScreenSpec};
use super::session::{Session, Work};
use super::status::StatusKind;
use super::theme::{icons, ConsoleTheme};
use crate::api::RbacApi;
use crate::cache::QueryCache;

/// Redraw at least this often so spinners and late data show up
const TICK_RATE: Duration = Duration::from_millis(250);

/// TUI Application
pub struct TuiApp {
    session: Session,
    executor: Executor,
    rx: mpsc::UnboundedReceiver<AppMessage>,
    theme: ConsoleTheme,
}

impl TuiApp {
    pub fn new(api: Arc<dyn RbacApi>, start: ScreenSpec, page_size: usize) -> Self {
        let cache = QueryCache::shared();
        let (executor, rx) = Executor::new(api, Arc::clone(&cache));
        Self {
            session: Session::new(cache, page_size, start),
            executor,
            rx,
            theme: ConsoleTheme::new(),
        }
    }

    /// Run the TUI application
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut terminal = self.setup_terminal()?;
        let result = self.main_loop(&mut terminal).await;
        self.restore_terminal(&mut terminal)?;
        result
    }

    /// Setup terminal for TUI
    fn setup_terminal(&self) -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(terminal)
    }

    /// Restore terminal to normal state
    fn restore_terminal(
        &self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        Ok(())
    }

    /// Main event loop
    async fn main_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        let mut events = EventStream::new();
        let mut tick = tokio::time::interval(TICK_RATE);

        loop {
            self.executor.fetch(self.session.observed_queries());
            terminal.draw(|frame| draw(frame, &self.session, &self.theme))?;

            tokio::select! {
                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) => {
                        let work = self.session.handle_key(key);
                        self.executor.run(work);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                    None => break,
                },
                Some(message) = self.rx.recv() => {
                    let work = route(&mut self.session, message);
                    self.executor.run(work);
                }
                _ = tick.tick() => self.session.tick(),
            }

            if self.session.should_quit() {
                break;
            }
        }

        Ok(())
    }
}

/// Apply one runtime message to the session
fn route(session: &mut Session, message: AppMessage) -> Vec<Work> {
    match message {
        AppMessage::QueryResolved(_) => {
            session.on_query_resolved();
            Vec::new()
        }
        AppMessage::MutationCompleted {
            token,
            mutation,
            result,
        } => session.complete_mutation(token, mutation, result),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Draw the whole console: header, focused screen, status line, key help
pub fn draw(frame: &mut Frame, session: &Session, theme: &ConsoleTheme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(5),    // Screen
            Constraint::Length(1), // Status
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    let screen = session.screen();
    let cache = session.cache().as_ref();

    render_header(frame, chunks[0], session, theme);
    screen.render(frame, chunks[1], &RenderContext { cache, theme });
    render_status(frame, chunks[2], session, theme);

    let hints = help_hints(&screen.dispatch_context(cache));
    let mut spans = Vec::new();
    for (i, (key, action)) in hints.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" · ", theme.dimmed()));
        }
        spans.push(Span::styled(key, theme.accent()));
        spans.push(Span::styled(format!(" {}", action), theme.dimmed()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[3]);
}

fn render_header(frame: &mut Frame, area: Rect, session: &Session, theme: &ConsoleTheme) {
    let screen = session.screen();
    let header = Line::from(vec![
        Span::styled(" RBAC Console", theme.header()),
        Span::raw("  │  "),
        Span::styled(screen.title(session.cache()), theme.accent()),
        Span::raw("  │  "),
        Span::styled(screen.mode().to_string(), theme.text()),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn render_status(frame: &mut Frame, area: Rect, session: &Session, theme: &ConsoleTheme) {
    let Some(status) = session.status() else {
        return;
    };
    let icon = match status.kind {
        StatusKind::Success => icons::SUCCESS,
        StatusKind::Error => icons::ERROR,
    };
    let line = Line::from(Span::styled(
        format!(" {} {}", icon, status.message),
        theme.status(status),
    ));
    frame.render_widget(Paragraph::new(line), area);
}
