//! Query cache shared by every screen
//!
//! Keyed store of query results with `loading/success/error` status and a
//! stale flag. Screens only read from it; the runtime writes fetched data
//! and mutations invalidate whole namespaces so every screen observing those
//! keys refetches.
//!
//! Each entry carries a generation counter. A fetch that started before an
//! invalidation still lands its data, but the entry stays stale so the newer
//! state is fetched again.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

use crate::api::QueryData;
use crate::error::RbacError;

pub type SharedCache = Arc<QueryCache>;

/// Fresh entries kept for screens that are no longer on the stack
pub const RETAINED_UNOBSERVED: usize = 32;

// ─────────────────────────────────────────────────────────────────────────────
// Keys
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// First segment (entity namespace)
    pub fn namespace(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entries
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status: QueryStatus,
    pub data: Option<QueryData>,
    pub error: Option<String>,
    pub stale: bool,
    /// A request for this key is in flight
    pub fetching: bool,
    pub updated_at: Option<Instant>,
    generation: u64,
}

impl CacheEntry {
    fn loading() -> Self {
        Self {
            status: QueryStatus::Loading,
            data: None,
            error: None,
            stale: false,
            fetching: false,
            updated_at: None,
            generation: 0,
        }
    }
}

/// Ticket returned by [`QueryCache::begin_fetch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: DashMap<QueryKey, CacheEntry>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedCache {
        Arc::new(Self::new())
    }

    pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    pub fn status(&self, key: &QueryKey) -> Option<QueryStatus> {
        self.entries.get(key).map(|e| e.status)
    }

    /// Last successfully fetched data, also kept while refetching
    pub fn data(&self, key: &QueryKey) -> Option<QueryData> {
        self.entries.get(key).and_then(|e| e.data.clone())
    }

    pub fn error(&self, key: &QueryKey) -> Option<String> {
        self.entries.get(key).and_then(|e| e.error.clone())
    }

    /// Missing, or stale and not already in flight
    pub fn needs_fetch(&self, key: &QueryKey) -> bool {
        match self.entries.get(key) {
            None => true,
            Some(entry) => entry.stale && !entry.fetching,
        }
    }

    /// Mark a request as in flight. `None` when one already is.
    pub fn begin_fetch(&self, key: &QueryKey) -> Option<FetchTicket> {
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(CacheEntry::loading);
        if entry.fetching {
            return None;
        }
        entry.fetching = true;
        if entry.data.is_none() {
            entry.status = QueryStatus::Loading;
        }
        Some(FetchTicket(entry.generation))
    }

    /// Store the outcome of a fetch started with `ticket`
    pub fn resolve(
        &self,
        key: &QueryKey,
        ticket: FetchTicket,
        result: std::result::Result<QueryData, RbacError>,
    ) {
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(CacheEntry::loading);
        entry.fetching = false;
        entry.updated_at = Some(Instant::now());
        let superseded = entry.generation != ticket.0;

        match result {
            Ok(data) => {
                entry.status = QueryStatus::Success;
                entry.data = Some(data);
                entry.error = None;
                entry.stale = superseded;
            }
            Err(err) => {
                tracing::debug!(key = %key, error = %err, "query failed");
                entry.status = QueryStatus::Error;
                entry.error = Some(err.to_string());
                entry.stale = false;
            }
        }
    }

    /// Write data directly, as if a fetch had just succeeded
    pub fn set_data(&self, key: &QueryKey, data: QueryData) {
        let ticket = self.begin_fetch(key).unwrap_or_else(|| self.current_ticket(key));
        self.resolve(key, ticket, Ok(data));
    }

    fn current_ticket(&self, key: &QueryKey) -> FetchTicket {
        FetchTicket(self.entries.get(key).map(|e| e.generation).unwrap_or(0))
    }

    /// Mark every entry under `prefix` stale; returns how many were touched
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut touched = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.key().starts_with(prefix) {
                entry.stale = true;
                entry.generation += 1;
                if entry.status == QueryStatus::Error {
                    entry.error = None;
                }
                touched += 1;
            }
        }
        tracing::debug!(prefix = %prefix, touched, "cache invalidated");
        touched
    }

    /// Snapshot of every entry, ordered by key
    pub fn get_all(&self) -> Vec<(QueryKey, CacheEntry)> {
        let mut all: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Drop entries no mounted screen observes; returns how many went
    ///
    /// Stale and failed entries go first since they would be refetched
    /// anyway. Of the rest, only the `RETAINED_UNOBSERVED` most recent stay
    /// warm for back navigation. In-flight entries are never dropped.
    pub fn evict_unobserved(&self, observed: &[QueryKey]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            entry.fetching
                || observed.contains(key)
                || (!entry.stale && entry.status != QueryStatus::Error)
        });

        let mut idle: Vec<(QueryKey, Option<Instant>)> = self
            .entries
            .iter()
            .filter(|e| !e.fetching && !observed.contains(e.key()))
            .map(|e| (e.key().clone(), e.updated_at))
            .collect();
        if idle.len() > RETAINED_UNOBSERVED {
            idle.sort_by(|a, b| b.1.cmp(&a.1));
            for (key, _) in idle.drain(RETAINED_UNOBSERVED..) {
                self.entries.remove(&key);
            }
        }

        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, "cache entries evicted");
        }
        evicted
    }
}
