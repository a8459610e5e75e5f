//! Screen contract
//!
//! A screen is a synchronous reducer. It reads server data from the shared
//! cache, turns actions into new local state, and hands back [`Effect`]s for
//! the session to carry out. Screens never touch the network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossterm::event::KeyEvent;
use ratatui::layout::Rect;
use ratatui::Frame;

use super::detail::DetailScreen;
use super::events::{dispatch, Action, DispatchContext};
use super::list::ListScreen;
use super::state::ModeKind;
use super::status::StatusMessage;
use super::theme::ConsoleTheme;
use crate::api::{Mutation, Query};
use crate::cache::{QueryCache, QueryKey};
use crate::model::{Entity, EntityKind};

/// Outcome of a mutation as seen by a screen; errors are already user-facing text
pub type MutationResult = std::result::Result<Option<Entity>, String>;

/// Which screen to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenSpec {
    List(EntityKind),
    Detail { kind: EntityKind, id: String },
}

impl ScreenSpec {
    pub fn detail(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::Detail {
            kind,
            id: id.into(),
        }
    }

    pub fn build(&self, page_size: usize) -> Box<dyn Screen> {
        match self {
            Self::List(kind) => Box::new(ListScreen::new(*kind, page_size)),
            Self::Detail { kind, id } => Box::new(DetailScreen::new(*kind, id.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Push(ScreenSpec),
    Back,
    Quit,
}

/// Work requested by a screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Mutate(Mutation),
    /// Mark cache entries under these prefixes stale
    Invalidate(Vec<QueryKey>),
    Status(StatusMessage),
    Navigate(Navigation),
}

/// Effects every screen emits when one of its mutations settles
pub fn completion_effects(mutation: &Mutation, result: &MutationResult) -> Vec<Effect> {
    match result {
        Ok(_) => vec![
            Effect::Invalidate(mutation.invalidates()),
            Effect::Status(StatusMessage::success(mutation.success_message())),
        ],
        Err(message) => vec![Effect::Status(StatusMessage::error(message.clone()))],
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mount tokens
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness of one mounted screen
///
/// In-flight mutations carry a clone; once the screen is popped, their
/// completions are dropped instead of reaching a reducer that no longer exists.
#[derive(Debug, Clone)]
pub struct MountToken {
    id: u64,
    mounted: Arc<AtomicBool>,
}

impl MountToken {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }
}

impl PartialEq for MountToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MountToken {}

// ─────────────────────────────────────────────────────────────────────────────
// Screen trait
// ─────────────────────────────────────────────────────────────────────────────

pub struct RenderContext<'a> {
    pub cache: &'a QueryCache,
    pub theme: &'a ConsoleTheme,
}

pub trait Screen: Send {
    /// Header text
    fn title(&self, cache: &QueryCache) -> String;

    /// Queries this screen observes; the session keeps them fetched
    fn queries(&self) -> Vec<Query>;

    fn mode(&self) -> ModeKind;

    /// Capabilities the dispatcher needs to interpret a key
    fn dispatch_context(&self, cache: &QueryCache) -> DispatchContext;

    fn handle_action(&mut self, action: Action, cache: &QueryCache) -> Vec<Effect>;

    /// A mutation this screen issued has settled
    fn on_mutation(
        &mut self,
        mutation: &Mutation,
        result: &MutationResult,
        cache: &QueryCache,
    ) -> Vec<Effect>;

    /// Fresh data landed in the cache; re-clamp cursors and pages
    fn sync(&mut self, _cache: &QueryCache) {}

    /// Cursor position in the visible rows
    fn selected_index(&self) -> usize;

    /// Labels of the rows currently shown
    fn visible_rows(&self, cache: &QueryCache) -> Vec<String>;

    fn render(&self, frame: &mut Frame, area: Rect, ctx: &RenderContext);

    fn handle_key(&mut self, key: KeyEvent, cache: &QueryCache) -> Vec<Effect> {
        self.sync(cache);
        let ctx = self.dispatch_context(cache);
        match dispatch(key, &ctx) {
            Some(action) => self.handle_action(action, cache),
            None => Vec::new(),
        }
    }
}
