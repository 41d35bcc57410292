//! Recently-seen event ids.
//!
//! Entries expire after a fixed retention window independent of hop count;
//! the cache is additionally capacity-bounded with oldest-first eviction so
//! a flood of unique ids cannot grow it without limit.

use std::collections::{HashMap, VecDeque};

use shared_types::EventId;

/// Bounded `event id -> expiry` cache.
#[derive(Debug)]
pub struct SeenCache {
    retention_ms: u64,
    cap: usize,
    expiries: HashMap<EventId, u64>,
    insertion_order: VecDeque<EventId>,
}

impl SeenCache {
    pub fn new(retention_ms: u64, cap: usize) -> Self {
        Self {
            retention_ms,
            cap,
            expiries: HashMap::new(),
            insertion_order: VecDeque::new(),
        }
    }

    /// Insert `id` if it is not currently cached. Returns `true` for fresh
    /// ids — the caller may apply and relay exactly when this is true.
    pub fn insert_if_new(&mut self, id: &EventId, now_ms: u64) -> bool {
        if let Some(&expiry) = self.expiries.get(id) {
            if now_ms < expiry {
                return false;
            }
        }
        if self.expiries.len() >= self.cap {
            self.evict_oldest();
        }
        self.expiries.insert(id.clone(), now_ms + self.retention_ms);
        self.insertion_order.push_back(id.clone());
        true
    }

    /// Drop expired entries; called from the periodic tick.
    pub fn gc(&mut self, now_ms: u64) -> usize {
        let before = self.expiries.len();
        self.expiries.retain(|_, &mut expiry| now_ms < expiry);
        self.insertion_order
            .retain(|id| self.expiries.contains_key(id));
        before - self.expiries.len()
    }

    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }

    fn evict_oldest(&mut self) {
        while self.expiries.len() >= self.cap {
            match self.insertion_order.pop_front() {
                Some(oldest) => {
                    self.expiries.remove(&oldest);
                }
                None => break,
            }
        }
    }
}
