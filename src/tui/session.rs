//! Screen stack and effect interpreter
//!
//! The session owns the mounted screens and the status slot, and applies the
//! effects screens emit. Anything asynchronous comes back out as [`Work`] for
//! the runtime (or the test harness) to execute, so the session itself stays
//! synchronous and deterministic.

use crossterm::event::KeyEvent;

use super::screen::{Effect, MountToken, MutationResult, Navigation, Screen, ScreenSpec};
use super::status::{StatusMessage, StatusSlot};
use crate::api::{Mutation, Query};
use crate::cache::{QueryKey, SharedCache};

/// Async work requested by a screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Work {
    Mutate { token: MountToken, mutation: Mutation },
}

struct Mounted {
    token: MountToken,
    screen: Box<dyn Screen>,
}

pub struct Session {
    cache: SharedCache,
    page_size: usize,
    /// Never empty
    stack: Vec<Mounted>,
    status: StatusSlot,
    next_mount: u64,
    quit: bool,
}

impl Session {
    pub fn new(cache: SharedCache, page_size: usize, root: ScreenSpec) -> Self {
        let mut session = Self {
            cache,
            page_size,
            stack: Vec::new(),
            status: StatusSlot::default(),
            next_mount: 0,
            quit: false,
        };
        session.push(root);
        session
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    fn top(&self) -> &Mounted {
        // the root screen is never popped
        &self.stack[self.stack.len() - 1]
    }

    /// The focused screen
    pub fn screen(&self) -> &dyn Screen {
        self.top().screen.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.current()
    }

    pub fn clear_last_status(&mut self) {
        self.status.clear_last_status();
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Queries the focused screen is observing
    pub fn observed_queries(&self) -> Vec<Query> {
        self.screen().queries()
    }

    /// Periodic housekeeping: expire the status and drop cache entries no
    /// mounted screen reads
    pub fn tick(&mut self) {
        self.status.tick();
        let keys: Vec<QueryKey> = self
            .stack
            .iter()
            .flat_map(|m| m.screen.queries())
            .map(|q| q.key())
            .collect();
        self.cache.evict_unobserved(&keys);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Work> {
        let Some(top) = self.stack.last_mut() else {
            return Vec::new();
        };
        let token = top.token.clone();
        let effects = top.screen.handle_key(key, &self.cache);
        self.apply(&token, effects)
    }

    /// Let every mounted screen re-read the cache
    pub fn on_query_resolved(&mut self) {
        for mounted in &mut self.stack {
            mounted.screen.sync(&self.cache);
        }
    }

    /// Route a settled mutation back to the screen that issued it
    pub fn complete_mutation(
        &mut self,
        token: MountToken,
        mutation: Mutation,
        result: MutationResult,
    ) -> Vec<Work> {
        if !token.is_mounted() {
            tracing::debug!(mutation = %mutation.label(), "screen unmounted; completion discarded");
            return Vec::new();
        }
        let Some(mounted) = self.stack.iter_mut().find(|m| m.token == token) else {
            return Vec::new();
        };
        let effects = mounted.screen.on_mutation(&mutation, &result, &self.cache);
        self.apply(&token, effects)
    }

    fn apply(&mut self, token: &MountToken, effects: Vec<Effect>) -> Vec<Work> {
        let mut work = Vec::new();
        for effect in effects {
            match effect {
                Effect::Mutate(mutation) => {
                    tracing::info!(mutation = %mutation.label(), "mutation issued");
                    work.push(Work::Mutate {
                        token: token.clone(),
                        mutation,
                    });
                }
                Effect::Invalidate(keys) => {
                    for key in &keys {
                        self.cache.invalidate(key);
                    }
                }
                Effect::Status(status) => self.status.set(status),
                Effect::Navigate(Navigation::Push(spec)) => self.push(spec),
                Effect::Navigate(Navigation::Back) => self.pop(token),
                Effect::Navigate(Navigation::Quit) => self.quit = true,
            }
        }
        work
    }

    fn push(&mut self, spec: ScreenSpec) {
        self.next_mount += 1;
        let mut screen = spec.build(self.page_size);
        screen.sync(&self.cache);
        tracing::debug!(screen = ?spec, depth = self.stack.len() + 1, "screen pushed");
        self.stack.push(Mounted {
            token: MountToken::new(self.next_mount),
            screen,
        });
    }

    /// Pop `token`'s screen if it is on top and not the root
    fn pop(&mut self, token: &MountToken) {
        if self.stack.len() <= 1 || self.top().token != *token {
            return;
        }
        if let Some(mounted) = self.stack.pop() {
            mounted.token.unmount();
        }
        self.on_query_resolved();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::QueryData;
    use crate::cache::QueryCache;
    use crate::model::{Entity, EntityKind};
    use crate::tui::status::STATUS_TTL_TICKS;
    use std::sync::Arc;
    use crate::tui::state::ModeKind;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_escape_on_root_is_noop() {
        let mut session = Session::new(QueryCache::shared(), 12, ScreenSpec::List(EntityKind::Role));
        session.handle_key(key(KeyCode::Esc));
        assert_eq!(session.depth(), 1);
        assert!(!session.should_quit());
    }

    #[test]
    fn test_quit_key_sets_flag() {
        let mut session = Session::new(QueryCache::shared(), 12, ScreenSpec::List(EntityKind::Group));
        session.handle_key(key(KeyCode::Char('q')));
        assert!(session.should_quit());
    }

    #[test]
    fn test_completion_for_unknown_token_is_dropped() {
        let mut session = Session::new(QueryCache::shared(), 12, ScreenSpec::List(EntityKind::Role));
        let stray = MountToken::new(99);
        let work = session.complete_mutation(
            stray,
            Mutation::Delete {
                kind: EntityKind::Role,
                id: "r".into(),
            },
            Ok(None),
        );
        assert!(work.is_empty());
        assert!(session.status().is_none());
        assert_eq!(session.screen().mode(), ModeKind::Browse);
    }

    #[test]
    fn test_tick_evicts_unobserved_stale_entries() {
        let cache = QueryCache::shared();
        let mut session = Session::new(Arc::clone(&cache), 12, ScreenSpec::List(EntityKind::Role));
        let shown = session.observed_queries()[0].key();
        let gone = QueryKey::new(["groups", "detail", "g-1"]);
        let data = QueryData::Entity(Entity::new(EntityKind::Group, "g-1", "Operations"));
        cache.set_data(&shown, data.clone());
        cache.set_data(&gone, data);
        cache.invalidate(&QueryKey::new(["roles"]));
        cache.invalidate(&QueryKey::new(["groups"]));

        session.tick();
        assert!(cache.get(&shown).is_some());
        assert!(cache.get(&gone).is_none());
    }

    #[test]
    fn test_status_clears_after_ticks() {
        let mut session = Session::new(QueryCache::shared(), 12, ScreenSpec::List(EntityKind::Role));
        session.handle_key(key(KeyCode::Char('r')));
        assert!(session.status().is_some());

        for _ in 0..STATUS_TTL_TICKS {
            session.tick();
        }
        assert!(session.status().is_none());
    }
}
