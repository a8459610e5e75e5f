//! Headless screen driver for tests
//!
//! Mounts a screen over a [`MockApi`], feeds it key presses by name and runs
//! every fetch and mutation to completion inline, so flows read as
//! press-then-assert without a terminal or background tasks.
//!
//! ```rust
//! # tokio_test_block(async {
//! use rbac_console::api::MockApi;
//! use rbac_console::model::EntityKind;
//! use rbac_console::tui::{ScreenHarness, ScreenSpec};
//!
//! let mut h = ScreenHarness::mount(MockApi::demo(), ScreenSpec::List(EntityKind::Role)).await;
//! h.press("down").await;
//! assert_eq!(h.selected_index(), 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::backend::TestBackend;
use ratatui::Terminal;

use super::app::draw;
use super::screen::ScreenSpec;
use super::session::{Session, Work};
use super::state::ModeKind;
use super::status::StatusMessage;
use super::theme::ConsoleTheme;
use crate::api::{MockApi, RbacApi};
use crate::cache::QueryCache;
use crate::config::DEFAULT_PAGE_SIZE;

/// Upper bound on fetch/mutate rounds per settle
const MAX_SETTLE_ROUNDS: usize = 32;

pub struct ScreenHarness {
    api: Arc<MockApi>,
    session: Session,
    pending: VecDeque<Work>,
    theme: ConsoleTheme,
}

impl ScreenHarness {
    pub async fn mount(api: MockApi, spec: ScreenSpec) -> Self {
        Self::mount_with_page_size(api, spec, DEFAULT_PAGE_SIZE).await
    }

    pub async fn mount_with_page_size(api: MockApi, spec: ScreenSpec, page_size: usize) -> Self {
        let mut harness = Self {
            api: Arc::new(api),
            session: Session::new(QueryCache::shared(), page_size, spec),
            pending: VecDeque::new(),
            theme: ConsoleTheme::new(),
        };
        harness.settle().await;
        harness
    }

    pub fn api(&self) -> &MockApi {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        self.session.cache()
    }

    // ─── Input ──────────────────────────────────────────────────────────────

    /// Press a key and run everything it triggers
    pub async fn press(&mut self, key: &str) {
        self.press_only(key);
        self.settle().await;
    }

    /// Press a key without running the work it queues
    pub fn press_only(&mut self, key: &str) {
        let Some(event) = parse_key(key) else {
            tracing::warn!(key, "unknown key name");
            return;
        };
        let work = self.session.handle_key(event);
        self.pending.extend(work);
    }

    /// Type each character of `text`, then settle
    pub async fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            let work = self
                .session
                .handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
            self.pending.extend(work);
        }
        self.settle().await;
    }

    /// Run queued mutations and observed fetches until nothing is left
    pub async fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            let mut progressed = false;

            while let Some(Work::Mutate { token, mutation }) = self.pending.pop_front() {
                let result = self
                    .api
                    .mutate(&mutation)
                    .await
                    .map_err(|err| err.to_string());
                let more = self.session.complete_mutation(token, mutation, result);
                self.pending.extend(more);
                progressed = true;
            }

            let cache = Arc::clone(self.session.cache());
            for query in self.session.observed_queries() {
                let key = query.key();
                if !cache.needs_fetch(&key) {
                    continue;
                }
                let Some(ticket) = cache.begin_fetch(&key) else {
                    continue;
                };
                let result = self.api.query(&query).await;
                cache.resolve(&key, ticket, result);
                self.session.on_query_resolved();
                progressed = true;
            }

            if !progressed {
                break;
            }
        }
    }

    // ─── Inspection ─────────────────────────────────────────────────────────

    pub fn last_status(&self) -> Option<&StatusMessage> {
        self.session.status()
    }

    pub fn clear_last_status(&mut self) {
        self.session.clear_last_status();
    }

    pub fn mode(&self) -> ModeKind {
        self.session.screen().mode()
    }

    pub fn selected_index(&self) -> usize {
        self.session.screen().selected_index()
    }

    pub fn visible_rows(&self) -> Vec<String> {
        self.session.screen().visible_rows(self.cache())
    }

    pub fn title(&self) -> String {
        self.session.screen().title(self.cache())
    }

    /// Number of mounted screens
    pub fn depth(&self) -> usize {
        self.session.depth()
    }

    pub fn should_quit(&self) -> bool {
        self.session.should_quit()
    }

    /// Mutations queued by `press_only` and not yet run
    pub fn pending_mutations(&self) -> usize {
        self.pending.len()
    }

    /// Render to an off-screen buffer and return its text, one line per row
    pub fn render(&self, width: u16, height: u16) -> String {
        let Ok(mut terminal) = Terminal::new(TestBackend::new(width, height)) else {
            return String::new();
        };
        if terminal
            .draw(|frame| draw(frame, &self.session, &self.theme))
            .is_err()
        {
            return String::new();
        }

        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// "enter", "esc", "down", "ctrl+c", or a single character
pub fn parse_key(name: &str) -> Option<KeyEvent> {
    let plain = |code| Some(KeyEvent::new(code, KeyModifiers::NONE));
    match name {
        "enter" => plain(KeyCode::Enter),
        "esc" | "escape" => plain(KeyCode::Esc),
        "tab" => plain(KeyCode::Tab),
        "backspace" => plain(KeyCode::Backspace),
        "up" => plain(KeyCode::Up),
        "down" => plain(KeyCode::Down),
        "left" => plain(KeyCode::Left),
        "right" => plain(KeyCode::Right),
        _ => {
            if let Some(rest) = name.strip_prefix("ctrl+") {
                let mut chars = rest.chars();
                return match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)),
                    _ => None,
                };
            }
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => plain(KeyCode::Char(c)),
                _ => None,
            }
        }
    }
}
