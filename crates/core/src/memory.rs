use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::intent::ContextFilters;

pub const DEFAULT_CONTEXT_TTL_SECS: i64 = 300;
pub const DEFAULT_CONTEXT_CAPACITY: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryPolicy {
    pub ttl: Duration,
    pub capacity: usize,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(DEFAULT_CONTEXT_TTL_SECS),
            capacity: DEFAULT_CONTEXT_CAPACITY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub filters: ContextFilters,
    pub registered_at: DateTime<Utc>,
}

/// Short-lived per-session memory of the filters the customer asked for.
///
/// The policy is runtime configuration and is not persisted with the entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextualMemory {
    entries: VecDeque<ContextSnapshot>,
    #[serde(skip)]
    policy: MemoryPolicy,
}

impl ContextualMemory {
    pub fn with_policy(policy: MemoryPolicy) -> Self {
        Self { entries: VecDeque::new(), policy }
    }

    pub fn set_policy(&mut self, policy: MemoryPolicy) {
        self.policy = policy;
        self.trim();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops empty fields; an all-empty snapshot is not stored.
    pub fn register(&mut self, filters: ContextFilters, now: DateTime<Utc>) -> bool {
        let filters = filters.compact();
        if filters.is_empty() {
            return false;
        }
        self.entries.push_back(ContextSnapshot { filters, registered_at: now });
        self.trim();
        true
    }

    /// Most recent filters, unless they expired; expiry wipes the whole store.
    pub fn recall(&mut self, now: DateTime<Utc>) -> Option<ContextFilters> {
        let latest = self.entries.back()?;
        if self.is_expired(latest, now) {
            self.entries.clear();
            return None;
        }
        Some(latest.filters.clone())
    }

    pub fn has_valid_context(&self, now: DateTime<Utc>) -> bool {
        self.entries
            .back()
            .is_some_and(|latest| !self.is_expired(latest, now) && !latest.filters.is_empty())
    }

    /// Unforced clears keep a still-valid context.
    pub fn clear(&mut self, force: bool, now: DateTime<Utc>) {
        if force || !self.has_valid_context(now) {
            self.entries.clear();
        }
    }

    fn is_expired(&self, snapshot: &ContextSnapshot, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(snapshot.registered_at) > self.policy.ttl
    }

    fn trim(&mut self) {
        let capacity = self.policy.capacity.max(1);
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }
}
