//! The gossip engine.

use serde_json::Value;
use tracing::{debug, trace};

use shared_crypto::hashing::sha256_hex;
use shared_types::{EventId, GossipEvent, PeerId};

use crate::cache::SeenCache;
use crate::config::GossipConfig;

/// Hex length of an event id.
const EVENT_ID_LEN: usize = 24;

/// Where deduplicated, in-hop-limit events land. Implemented by the
/// consuming domain logic; `apply` returns `false` when the event was
/// already recorded (e.g. replayed from the store), in which case the
/// engine will not relay it either.
pub trait EventSink {
    fn apply(&mut self, event: &GossipEvent) -> bool;
}

/// What happened to one ingested event.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Applied exactly once. `relay` holds the hop-incremented copy to
    /// re-fan-out, or `None` when the hop ceiling has been reached.
    Applied { relay: Option<GossipEvent> },
    /// Already seen; silently discarded.
    Duplicate,
    /// Arrived with a hop count above the ceiling; discarded unapplied.
    HopExceeded,
}

/// Dedup cache plus hop accounting. Fanout target selection lives in
/// [`crate::FanoutPolicy`]; the engine itself never touches the network.
#[derive(Debug)]
pub struct GossipEngine {
    cfg: GossipConfig,
    cache: SeenCache,
    local_counter: u64,
}

impl GossipEngine {
    pub fn new(cfg: GossipConfig) -> Self {
        Self {
            cache: SeenCache::new(cfg.seen_retention_ms, cfg.seen_cap),
            cfg,
            local_counter: 0,
        }
    }

    pub fn config(&self) -> &GossipConfig {
        &self.cfg
    }

    /// Create a locally originated event at hop zero, with a fresh dedup id
    /// already inserted into the cache.
    pub fn create_event(
        &mut self,
        origin: &PeerId,
        event_type: &str,
        payload: Value,
        now_ms: u64,
    ) -> GossipEvent {
        self.local_counter += 1;
        let event_id = derive_event_id(origin, self.local_counter, now_ms, &payload);
        self.cache.insert_if_new(&event_id, now_ms);
        trace!(%event_id, event_type, "local event created");
        GossipEvent {
            event_id,
            origin: origin.clone(),
            event_type: event_type.to_owned(),
            payload,
            hops: 0,
        }
    }

    /// Process one event received in an `EVENT_BATCH`.
    pub fn ingest(
        &mut self,
        event: &GossipEvent,
        now_ms: u64,
        sink: &mut dyn EventSink,
    ) -> Disposition {
        if event.hops > self.cfg.max_event_hops {
            debug!(event_id = %event.event_id, hops = event.hops, "event over hop ceiling");
            return Disposition::HopExceeded;
        }
        if !self.cache.insert_if_new(&event.event_id, now_ms) {
            return Disposition::Duplicate;
        }
        if !sink.apply(event) {
            // The consuming layer had it already (store replay); treat as
            // a duplicate so it is not relayed a second time.
            return Disposition::Duplicate;
        }

        let next_hops = event.hops + 1;
        let relay = if next_hops < self.cfg.max_event_hops {
            let mut forwarded = event.clone();
            forwarded.hops = next_hops;
            Some(forwarded)
        } else {
            None
        };
        Disposition::Applied { relay }
    }

    /// Expire old dedup entries; called from the periodic tick.
    pub fn gc(&mut self, now_ms: u64) -> usize {
        self.cache.gc(now_ms)
    }

    pub fn seen_len(&self) -> usize {
        self.cache.len()
    }
}

/// Dedup id: SHA-256 over origin, the origin's local counter, creation
/// time, and the canonical payload encoding, truncated to 24 hex chars.
fn derive_event_id(origin: &PeerId, counter: u64, now_ms: u64, payload: &Value) -> EventId {
    let canonical = payload.to_string();
    let raw = format!("{origin}:{counter}:{now_ms}:{canonical}");
    EventId::new(sha256_hex(raw.as_bytes())[..EVENT_ID_LEN].to_owned())
}
