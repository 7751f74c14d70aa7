//! Prediction history
//!
//! An append-only log of successful single predictions, owned by the caller
//! rather than the inference engine:
//! - Views return only the most recent entries
//! - Entries are removed only by an explicit clear, or FIFO once the
//!   retention cap is reached
//! - Memory only; nothing survives a restart
//!
//! `HistoryStore` keeps one log per session so concurrent dashboard users
//! never see each other's entries. Clearing a session drops it entirely, and
//! the number of live sessions is capped with least-recently-used eviction.

use crate::models::PredictionRecord;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Number of entries shown by default
pub const DEFAULT_VIEW_LIMIT: usize = 10;

/// Maximum number of entries retained per session
pub const DEFAULT_CAPACITY: usize = 1_000;

/// Maximum number of sessions kept at once
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Session id used when the caller does not supply one
pub const DEFAULT_SESSION: &str = "default";

/// Bounded append-only prediction log
#[derive(Debug, Clone)]
pub struct PredictionHistory {
    records: VecDeque<PredictionRecord>,
    capacity: usize,
    total_recorded: u64,
}

impl Default for PredictionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PredictionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            total_recorded: 0,
        }
    }

    pub fn push(&mut self, record: PredictionRecord) {
        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
        self.total_recorded += 1;
    }

    /// Last `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<&PredictionRecord> {
        let skip = self.records.len().saturating_sub(limit);
        self.records.iter().skip(skip).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PredictionRecord> {
        self.records.iter()
    }

    /// Remove every entry, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let removed = self.records.len();
        self.records.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Entries ever recorded, including evicted ones
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A session's log plus the tick of its last use
#[derive(Debug)]
struct SessionLog {
    history: PredictionHistory,
    last_used: u64,
}

/// Session-scoped histories
///
/// At most `max_sessions` logs are kept; recording into a new session beyond
/// that evicts the least recently used one.
#[derive(Debug)]
pub struct HistoryStore {
    sessions: DashMap<String, SessionLog>,
    capacity: usize,
    max_sessions: usize,
    clock: AtomicU64,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_MAX_SESSIONS)
    }
}

impl HistoryStore {
    pub fn new(capacity: usize, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            capacity,
            max_sessions: max_sessions.max(1),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn record(&self, session: &str, record: PredictionRecord) {
        if !self.sessions.contains_key(session) {
            self.evict_for_new_session();
        }
        let tick = self.tick();
        let mut log = self
            .sessions
            .entry(session.to_string())
            .or_insert_with(|| SessionLog {
                history: PredictionHistory::new(self.capacity),
                last_used: tick,
            });
        log.last_used = tick;
        log.history.push(record);
    }

    fn evict_for_new_session(&self) {
        while self.sessions.len() >= self.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|entry| entry.value().last_used)
                .map(|entry| entry.key().clone());
            let Some(session) = oldest else { break };
            if let Some((_, log)) = self.sessions.remove(&session) {
                debug!(
                    session = %session,
                    dropped = log.history.len(),
                    "Evicted least recently used session"
                );
            }
        }
    }

    /// Last `limit` entries of a session, oldest first
    pub fn recent(&self, session: &str, limit: usize) -> Vec<PredictionRecord> {
        let tick = self.tick();
        self.sessions
            .get_mut(session)
            .map(|mut log| {
                log.last_used = tick;
                log.history.recent(limit).into_iter().cloned().collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self, session: &str) -> usize {
        self.sessions
            .get(session)
            .map(|log| log.history.len())
            .unwrap_or(0)
    }

    /// Drop a session and its entries, returning how many entries it held
    pub fn clear(&self, session: &str) -> usize {
        let removed = self
            .sessions
            .remove(session)
            .map(|(_, log)| log.history.len())
            .unwrap_or(0);
        debug!(session = %session, removed, "Cleared prediction history");
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}
