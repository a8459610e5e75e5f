//! Runtime - Connector Layer
//!
//! Runs queries and mutations on tokio tasks. Query results go straight into
//! the shared cache; every completion is announced to the UI loop as an
//! [`AppMessage`] so it can redraw and route mutation outcomes.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::screen::{MountToken, MutationResult};
use super::session::Work;
use crate::api::{Mutation, Query, RbacApi};
use crate::cache::{QueryKey, SharedCache};

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum AppMessage {
    QueryResolved(QueryKey),
    MutationCompleted {
        token: MountToken,
        mutation: Mutation,
        result: MutationResult,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Executor
// ─────────────────────────────────────────────────────────────────────────────

pub struct Executor {
    api: Arc<dyn RbacApi>,
    cache: SharedCache,
    tx: mpsc::UnboundedSender<AppMessage>,
}

impl Executor {
    pub fn new(api: Arc<dyn RbacApi>, cache: SharedCache) -> (Self, mpsc::UnboundedReceiver<AppMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { api, cache, tx }, rx)
    }

    /// Start fetches for every query that is missing or stale
    ///
    /// Queries already in flight are skipped, so calling this on every frame
    /// is safe.
    pub fn fetch(&self, queries: Vec<Query>) {
        for query in queries {
            let key = query.key();
            if !self.cache.needs_fetch(&key) {
                continue;
            }
            let Some(ticket) = self.cache.begin_fetch(&key) else {
                continue;
            };

            let api = Arc::clone(&self.api);
            let cache = Arc::clone(&self.cache);
            let tx = self.tx.clone();
            tokio::spawn(async move {
                tracing::debug!(query = %query.label(), key = %key, "fetching");
                let result = api.query(&query).await;
                cache.resolve(&key, ticket, result);
                let _ = tx.send(AppMessage::QueryResolved(key));
            });
        }
    }

    pub fn run(&self, work: Vec<Work>) {
        for item in work {
            let Work::Mutate { token, mutation } = item;
            let api = Arc::clone(&self.api);
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let result = api.mutate(&mutation).await.map_err(|err| {
                    tracing::warn!(
                        mutation = %mutation.label(),
                        screen = token.id(),
                        error = %err,
                        "mutation failed"
                    );
                    err.to_string()
                });
                if result.is_ok() {
                    tracing::info!(mutation = %mutation.label(), screen = token.id(), "mutation succeeded");
                }
                if !token.is_mounted() {
                    tracing::debug!(
                        mutation = %mutation.label(),
                        screen = token.id(),
                        "screen unmounted; completion discarded"
                    );
                    return;
                }
                let _ = tx.send(AppMessage::MutationCompleted {
                    token,
                    mutation,
                    result,
                });
            });
        }
    }
}
